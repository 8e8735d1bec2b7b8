//! Display-rate redraw scheduling

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Calls a tick function at a fixed rate until stopped or until the tick
/// reports that its source has ended.
pub struct RedrawLoop {
    stopped: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl RedrawLoop {
    /// Must be called from within a tokio runtime
    pub fn start<F>(fps: u32, mut tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let stopped = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicU64::new(0));
        let period = Duration::from_secs_f64(1.0 / fps.max(1) as f64);

        let task = {
            let stopped = stopped.clone();
            let ticks = ticks.clone();
            tokio::spawn(async move {
                let mut timer = interval(period);
                timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    timer.tick().await;
                    if stopped.load(Ordering::SeqCst) {
                        break;
                    }
                    ticks.fetch_add(1, Ordering::SeqCst);
                    if !tick() {
                        stopped.store(true, Ordering::SeqCst);
                        log::debug!("Redraw source ended");
                        break;
                    }
                }
            })
        };

        Self {
            stopped,
            ticks,
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    /// Frames drawn so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Returns `false` if the loop had already stopped
    pub fn stop(&mut self) -> bool {
        let was_running = !self.stopped.swap(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        was_running
    }

    /// Wait until the loop ends on its own or is stopped
    pub async fn finished(&mut self) {
        if let Some(task) = self.task.as_mut() {
            let _ = task.await;
        }
        self.task = None;
    }
}

impl Drop for RedrawLoop {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
