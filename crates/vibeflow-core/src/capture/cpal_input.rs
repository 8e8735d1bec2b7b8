//! Default input device through cpal
//!
//! Streams are not `Send` on every host, so the stream lives on a
//! dedicated thread that only exits on stop.

use super::device::{AudioInput, SampleCallback};
use crate::error::{Result, VibeflowError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

pub struct CpalInput {
    sample_rate: u32,
    channels: u16,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    failed: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<String>>>,
}

fn denied(what: &str, err: impl std::fmt::Display) -> VibeflowError {
    VibeflowError::PermissionDenied(format!("{}: {}", what, err))
}

fn default_device() -> Result<Device> {
    cpal::default_host()
        .default_input_device()
        .ok_or_else(|| VibeflowError::PermissionDenied("no input device found".to_string()))
}

impl CpalInput {
    /// Query the default input device without opening a stream
    pub fn open() -> Result<Self> {
        let device = default_device()?;
        let supported = device
            .default_input_config()
            .map_err(|e| denied("input configuration unavailable", e))?;

        if let Ok(name) = device.name() {
            log::info!("Input device: {}", name);
        }

        Ok(Self {
            sample_rate: supported.sample_rate().0,
            channels: supported.channels(),
            stop_tx: None,
            worker: None,
            failed: Arc::new(AtomicBool::new(false)),
            failure: Arc::new(Mutex::new(None)),
        })
    }

    fn build_stream(
        device: &Device,
        config: &StreamConfig,
        format: SampleFormat,
        mut callback: SampleCallback,
        failed: Arc<AtomicBool>,
        failure: Arc<Mutex<Option<String>>>,
    ) -> Result<Stream> {
        let error_callback = move |err: cpal::StreamError| {
            log::error!("Audio stream error: {}", err);
            // Keep the first error, later ones are usually fallout
            failure
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get_or_insert_with(|| err.to_string());
            failed.store(true, Ordering::SeqCst);
        };

        let stream = match format {
            SampleFormat::F32 => device.build_input_stream(
                config,
                move |data: &[f32], _: &_| callback(data),
                error_callback,
                None,
            ),
            SampleFormat::I16 => {
                let mut scratch = Vec::new();
                device.build_input_stream(
                    config,
                    move |data: &[i16], _: &_| {
                        scratch.clear();
                        scratch.extend(data.iter().map(|&s| s as f32 / 32768.0));
                        callback(&scratch);
                    },
                    error_callback,
                    None,
                )
            }
            SampleFormat::U16 => {
                let mut scratch = Vec::new();
                device.build_input_stream(
                    config,
                    move |data: &[u16], _: &_| {
                        scratch.clear();
                        scratch.extend(data.iter().map(|&s| (s as f32 - 32768.0) / 32768.0));
                        callback(&scratch);
                    },
                    error_callback,
                    None,
                )
            }
            other => {
                return Err(VibeflowError::PermissionDenied(format!(
                    "unsupported device sample format {:?}",
                    other
                )))
            }
        };

        stream.map_err(|e| denied("failed to open input stream", e))
    }
}

impl AudioInput for CpalInput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn start(&mut self, callback: SampleCallback) -> Result<()> {
        if self.worker.is_some() {
            return Err(VibeflowError::Validation("input already started".to_string()));
        }

        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let failed = self.failed.clone();
        let failure = self.failure.clone();

        let handle = thread::Builder::new()
            .name("vibeflow-input".to_string())
            .spawn(move || {
                let opened = default_device().and_then(|device| {
                    let supported = device
                        .default_input_config()
                        .map_err(|e| denied("input configuration unavailable", e))?;
                    let config: StreamConfig = supported.config();
                    let stream = Self::build_stream(
                        &device,
                        &config,
                        supported.sample_format(),
                        callback,
                        failed,
                        failure,
                    )?;
                    stream.play().map_err(|e| denied("failed to start input stream", e))?;
                    Ok(stream)
                });

                match opened {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        // Either an explicit stop or the owner being dropped
                        let _ = stop_rx.recv();
                        drop(stream);
                        log::debug!("Input stream closed");
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.stop_tx = Some(stop_tx);
                self.worker = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(VibeflowError::PermissionDenied(
                    "input thread exited before opening the device".to_string(),
                ))
            }
        }
    }

    fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::warn!("Input thread panicked");
            }
        }
    }

    /// A device error ends the stream for good
    fn is_exhausted(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    fn exhaustion_flag(&self) -> Option<Arc<AtomicBool>> {
        Some(self.failed.clone())
    }

    fn failure(&self) -> Option<String> {
        if !self.failed.load(Ordering::SeqCst) {
            return None;
        }
        let failure = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        Some(
            failure
                .clone()
                .unwrap_or_else(|| "input device stopped".to_string()),
        )
    }
}

impl Drop for CpalInput {
    fn drop(&mut self) {
        self.stop();
    }
}
