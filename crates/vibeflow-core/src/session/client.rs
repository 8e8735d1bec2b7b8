//! Session driver and single-session client

use super::protocol::{ClientAction, ServerMessage};
use super::state::{Applied, MatchSession, SessionState};
use super::transport::{Connector, WsConnector};
use super::{SessionEvent, SessionOutcome, SessionReport, SessionUpdate};
use crate::capture::{AudioInput, CaptureFrame, CaptureStream, CaptureTaps};
use crate::config::VibeflowConfig;
use crate::error::{Result, VibeflowError};
use crate::teardown::Teardown;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, timeout, Instant, MissedTickBehavior};

/// Upper bound for opening the connection
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Listening time before a final search is forced
pub const LISTEN_BUDGET: Duration = Duration::from_secs(30);

/// Wait for the answer to the forced search
pub const FINAL_GRACE: Duration = Duration::from_secs(3);

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// How often the input device is checked for errors
const DEVICE_POLL: Duration = Duration::from_millis(100);

/// Runs listening sessions, at most one at a time
pub struct MatchClient {
    connector: Arc<dyn Connector>,
    url: String,
    frame_size: usize,
    live: Arc<AtomicBool>,
    active: Option<ActiveSession>,
}

struct ActiveSession {
    events: UnboundedSender<SessionEvent>,
    done: watch::Receiver<bool>,
}

impl MatchClient {
    pub fn new(connector: Arc<dyn Connector>, url: impl Into<String>, frame_size: usize) -> Self {
        Self {
            connector,
            url: url.into(),
            frame_size: frame_size.max(1),
            live: Arc::new(AtomicBool::new(false)),
            active: None,
        }
    }

    /// WebSocket client for the configured service
    pub fn from_config(config: &VibeflowConfig) -> Self {
        Self::new(
            Arc::new(WsConnector::new(config.server.token.clone())),
            config.server.stream_url(),
            config.capture.frame_size,
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// A session is running
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Start listening on `input`.
    ///
    /// Fails while another session is outstanding. The frame tap of `taps`
    /// is replaced by the session's own sink; the recorder and spectrum taps
    /// are kept. Must be called from within a tokio runtime.
    pub fn start(&mut self, input: Box<dyn AudioInput>, taps: CaptureTaps) -> Result<SessionHandle> {
        if self
            .live
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(VibeflowError::Validation(
                "a listening session is already running".to_string(),
            ));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = watch::channel(false);

        let driver = SessionDriver {
            connector: self.connector.clone(),
            url: self.url.clone(),
            frame_size: self.frame_size,
            events_tx: events_tx.clone(),
            updates: updates_tx,
        };
        let live = self.live.clone();

        let task = tokio::spawn(async move {
            let report = driver.run(input, taps, events_rx).await;
            live.store(false, Ordering::SeqCst);
            let _ = done_tx.send(true);
            report
        });

        self.active = Some(ActiveSession {
            events: events_tx.clone(),
            done: done_rx,
        });

        Ok(SessionHandle {
            events: events_tx,
            updates: updates_rx,
            task,
        })
    }

    /// Cancel the outstanding session, if any, and wait for its teardown
    pub async fn cancel_active(&mut self) {
        if let Some(active) = self.active.take() {
            let _ = active.events.send(SessionEvent::Cancel);
            let mut done = active.done;
            // An error means the task is gone, which is just as final
            let _ = done.wait_for(|finished| *finished).await;
        }
    }

    /// Cancel and await the previous session, then start a new one
    pub async fn restart(
        &mut self,
        input: Box<dyn AudioInput>,
        taps: CaptureTaps,
    ) -> Result<SessionHandle> {
        self.cancel_active().await;
        self.start(input, taps)
    }
}

/// Cloneable cancel trigger for a running session
#[derive(Debug, Clone)]
pub struct Canceller {
    events: UnboundedSender<SessionEvent>,
}

impl Canceller {
    pub fn cancel(&self) {
        let _ = self.events.send(SessionEvent::Cancel);
    }
}

/// Owner's view of a running session
pub struct SessionHandle {
    events: UnboundedSender<SessionEvent>,
    updates: UnboundedReceiver<SessionUpdate>,
    task: JoinHandle<SessionReport>,
}

impl SessionHandle {
    /// Request cancellation; teardown still runs before the report
    pub fn cancel(&self) {
        let _ = self.events.send(SessionEvent::Cancel);
    }

    pub fn canceller(&self) -> Canceller {
        Canceller {
            events: self.events.clone(),
        }
    }

    /// Next progress update; `None` once the session has ended
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        self.updates.recv().await
    }

    /// Wait for the session to end
    pub async fn wait(self) -> SessionReport {
        match self.task.await {
            Ok(report) => report,
            Err(e) => SessionReport {
                outcome: SessionOutcome::Failed(VibeflowError::Internal(format!(
                    "session task failed: {}",
                    e
                ))),
                frames_sent: 0,
                elapsed: Duration::ZERO,
            },
        }
    }
}

/// State owned by the coordinating task
struct SessionDriver {
    connector: Arc<dyn Connector>,
    url: String,
    frame_size: usize,
    events_tx: UnboundedSender<SessionEvent>,
    updates: UnboundedSender<SessionUpdate>,
}

impl SessionDriver {
    fn notify(&self, update: SessionUpdate) {
        // The owner may have stopped listening for updates
        let _ = self.updates.send(update);
    }

    async fn run(
        self,
        input: Box<dyn AudioInput>,
        taps: CaptureTaps,
        mut events: UnboundedReceiver<SessionEvent>,
    ) -> SessionReport {
        let mut session = MatchSession::new();
        let mut teardown = Teardown::new();

        let outcome = match self
            .drive(input, taps, &mut session, &mut teardown, &mut events)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Listening session failed: {}", e);
                SessionOutcome::Failed(e)
            }
        };

        teardown.run().await;
        session.close();

        let report = SessionReport {
            outcome,
            frames_sent: session.frames_sent(),
            elapsed: session
                .started()
                .map(|at| at.elapsed())
                .unwrap_or_default(),
        };
        log::info!(
            "Session closed after {:.1}s, {} frame(s) sent",
            report.elapsed.as_secs_f64(),
            report.frames_sent
        );
        report
    }

    async fn drive(
        &self,
        input: Box<dyn AudioInput>,
        taps: CaptureTaps,
        session: &mut MatchSession,
        teardown: &mut Teardown,
        events: &mut UnboundedReceiver<SessionEvent>,
    ) -> Result<SessionOutcome> {
        session.begin_connect();
        self.notify(SessionUpdate::Connecting);
        log::info!("Connecting to {}", self.url);

        // Events seen while connecting are replayed once streaming starts
        let mut backlog = VecDeque::new();

        let connect = timeout(
            CONNECT_TIMEOUT,
            self.connector.connect(&self.url, self.events_tx.clone()),
        );
        tokio::pin!(connect);

        let transport = loop {
            tokio::select! {
                result = &mut connect => {
                    break match result {
                        Ok(transport) => transport?,
                        Err(_) => {
                            return Err(VibeflowError::Connection(format!(
                                "timed out connecting to {} after {}s",
                                self.url,
                                CONNECT_TIMEOUT.as_secs()
                            )))
                        }
                    };
                }
                event = events.recv() => match event {
                    Some(SessionEvent::Cancel) | None => return Ok(SessionOutcome::Cancelled),
                    Some(other) => backlog.push_back(other),
                },
            }
        };
        teardown.set_transport(transport);

        session.connected();
        self.notify(SessionUpdate::Connected);

        let frames_tx = self.events_tx.clone();
        let taps = taps.with_frames(move |frame: CaptureFrame| {
            let _ = frames_tx.send(SessionEvent::Frame(frame));
        });
        let capture = CaptureStream::start_blocking(input, self.frame_size, taps).await?;
        teardown.set_capture(capture);

        let budget_at = Instant::now() + LISTEN_BUDGET;
        let mut grace_at: Option<Instant> = None;
        let mut countdown = interval_at(Instant::now() + COUNTDOWN_TICK, COUNTDOWN_TICK);
        countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut device_check = interval_at(Instant::now() + DEVICE_POLL, DEVICE_POLL);
        device_check.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.notify(SessionUpdate::Countdown {
            remaining_secs: LISTEN_BUDGET.as_secs(),
        });

        loop {
            tokio::select! {
                event = next_event(&mut backlog, events) => match event {
                    Some(SessionEvent::Frame(frame)) => {
                        self.send_frame(frame, session, teardown).await?;
                    }
                    Some(SessionEvent::Message(text)) => {
                        if let Some(outcome) = self.handle_message(&text, session) {
                            return Ok(outcome);
                        }
                    }
                    Some(SessionEvent::TransportClosed(reason)) => {
                        return Err(VibeflowError::Connection(
                            reason.unwrap_or_else(|| "connection closed by server".to_string()),
                        ));
                    }
                    Some(SessionEvent::Cancel) | None => {
                        log::info!("Session cancelled");
                        self.send_stop(teardown).await;
                        return Ok(SessionOutcome::Cancelled);
                    }
                },
                _ = device_check.tick() => {
                    if let Some(reason) = teardown.capture().and_then(|capture| capture.failure()) {
                        return Err(VibeflowError::PermissionDenied(format!(
                            "input device lost: {}",
                            reason
                        )));
                    }
                }
                _ = countdown.tick(), if session.state() == SessionState::Streaming => {
                    let remaining = budget_at.saturating_duration_since(Instant::now());
                    self.notify(SessionUpdate::Countdown {
                        remaining_secs: remaining.as_secs_f64().round() as u64,
                    });
                }
                _ = sleep_until(budget_at), if session.state() == SessionState::Streaming => {
                    session.exhaust();
                    self.notify(SessionUpdate::Exhausted);
                    log::info!("Listening budget spent, requesting final search");
                    if let Some(transport) = teardown.transport_mut() {
                        transport.send_text(ClientAction::Search.to_json()).await?;
                    }
                    grace_at = Some(Instant::now() + FINAL_GRACE);
                }
                _ = sleep_until(grace_at.unwrap_or(budget_at)), if grace_at.is_some() => {
                    return Ok(SessionOutcome::NoMatch {
                        best_partial: session.best().cloned(),
                        message: format!(
                            "No match after {} seconds of listening",
                            LISTEN_BUDGET.as_secs()
                        ),
                    });
                }
            }
        }
    }

    /// Tell the service to drop the connection; failures only matter to the log
    async fn send_stop(&self, teardown: &mut Teardown) {
        if let Some(transport) = teardown.transport_mut() {
            if let Err(e) = transport.send_text(ClientAction::Stop.to_json()).await {
                log::debug!("Could not send stop: {}", e);
            }
        }
    }

    async fn send_frame(
        &self,
        frame: CaptureFrame,
        session: &mut MatchSession,
        teardown: &mut Teardown,
    ) -> Result<()> {
        if !session.can_send() {
            return Ok(());
        }
        let seq = frame.seq;
        let wav = frame.to_wav()?;
        drop(frame);

        if let Some(transport) = teardown.transport_mut() {
            transport.send_binary(wav).await?;
            session.record_sent();
            log::trace!("Sent frame {}", seq);
        }
        Ok(())
    }

    /// Returns the outcome when the message settles the session
    fn handle_message(&self, text: &str, session: &mut MatchSession) -> Option<SessionOutcome> {
        let msg = match ServerMessage::parse(text) {
            Ok(msg) => msg,
            Err(e) => {
                log::warn!("Malformed message from service: {}", e);
                self.notify(SessionUpdate::Warning(format!("malformed message: {}", e)));
                return None;
            }
        };

        let exhausted = session.state() == SessionState::Exhausted;
        match session.apply(msg) {
            Applied::Confirmed(candidate) => {
                log::info!("Confirmed: {} - {}", candidate.title, candidate.artist);
                self.notify(SessionUpdate::Confirmed(candidate.clone()));
                Some(SessionOutcome::Confirmed(candidate))
            }
            Applied::Partial(candidate) => {
                log::debug!(
                    "Partial: {} ({}/{} hashes)",
                    candidate.title,
                    candidate.matched_hashes,
                    candidate.min_required
                );
                self.notify(SessionUpdate::Partial(candidate));
                // After the forced search any answer is the final one
                exhausted.then(|| SessionOutcome::NoMatch {
                    best_partial: session.best().cloned(),
                    message: "No confirmed match".to_string(),
                })
            }
            Applied::NoMatch(message) => {
                self.notify(SessionUpdate::NoMatch(message.clone()));
                exhausted.then(|| SessionOutcome::NoMatch {
                    best_partial: session.best().cloned(),
                    message,
                })
            }
            Applied::Error(message) => {
                log::warn!("Service error: {}", message);
                self.notify(SessionUpdate::ServiceError(message));
                None
            }
            Applied::Status(message) => {
                log::debug!("Service status: {}", message);
                self.notify(SessionUpdate::Status(message));
                None
            }
            Applied::Ignored => None,
        }
    }
}

async fn next_event(
    backlog: &mut VecDeque<SessionEvent>,
    events: &mut UnboundedReceiver<SessionEvent>,
) -> Option<SessionEvent> {
    if let Some(event) = backlog.pop_front() {
        return Some(event);
    }
    events.recv().await
}
