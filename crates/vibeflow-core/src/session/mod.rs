//! Match session protocol client
//!
//! Streams capture frames to the match service over a WebSocket and
//! follows its partial / confirmed / no-match answers until the song is
//! confirmed, the listening budget runs out, the connection drops or the
//! caller cancels.

mod client;
mod protocol;
mod state;
mod transport;

pub use client::{
    Canceller, MatchClient, SessionHandle, CONNECT_TIMEOUT, FINAL_GRACE, LISTEN_BUDGET,
};
pub use protocol::{ClientAction, ServerMessage};
pub use state::{Applied, MatchSession, SessionState};
pub use transport::{Connector, MatchTransport, WsConnector, WsTransport};

use crate::capture::CaptureFrame;
use crate::error::VibeflowError;
use std::time::Duration;
use vibeflow_api::MatchCandidate;

/// Everything the coordinating task reacts to
#[derive(Debug)]
pub enum SessionEvent {
    Frame(CaptureFrame),
    /// Inbound text message
    Message(String),
    /// The peer closed or the connection failed
    TransportClosed(Option<String>),
    Cancel,
}

/// Progress reported to the session's owner
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Connecting,
    Connected,
    /// Seconds left in the listening budget
    Countdown { remaining_secs: u64 },
    Status(String),
    Partial(MatchCandidate),
    Confirmed(MatchCandidate),
    NoMatch(String),
    /// Reported by the service; the session keeps listening
    ServiceError(String),
    /// Malformed inbound message
    Warning(String),
    /// Budget spent, final search requested
    Exhausted,
}

#[derive(Debug)]
pub enum SessionOutcome {
    Confirmed(MatchCandidate),
    NoMatch {
        best_partial: Option<MatchCandidate>,
        message: String,
    },
    Cancelled,
    Failed(VibeflowError),
}

impl SessionOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, SessionOutcome::Confirmed(_))
    }
}

#[derive(Debug)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub frames_sent: u64,
    pub elapsed: Duration,
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc::UnboundedSender;

    /// What a mock transport saw
    #[derive(Debug, Default)]
    pub struct TransportLog {
        binaries: Mutex<Vec<Vec<u8>>>,
        texts: Mutex<Vec<String>>,
        closes: AtomicUsize,
    }

    impl TransportLog {
        pub fn frames(&self) -> Vec<Vec<u8>> {
            self.binaries.lock().unwrap().clone()
        }

        pub fn texts(&self) -> Vec<String> {
            self.texts.lock().unwrap().clone()
        }

        pub fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    /// Scripted server behaviour
    #[derive(Debug, Clone, Default)]
    pub struct Script {
        /// `(n, text)`: push `text` once the n-th frame arrives
        pub after_frames: Vec<(usize, String)>,
        /// Reply to a forced search
        pub on_search: Option<String>,
        /// Drop the connection once this many frames arrived
        pub close_after: Option<usize>,
    }

    pub struct MockTransport {
        log: Arc<TransportLog>,
        events: Option<UnboundedSender<SessionEvent>>,
        script: Script,
    }

    impl MockTransport {
        pub fn new() -> (Self, Arc<TransportLog>) {
            let log = Arc::new(TransportLog::default());
            (
                Self {
                    log: log.clone(),
                    events: None,
                    script: Script::default(),
                },
                log,
            )
        }

        fn push(&self, event: SessionEvent) {
            if let Some(events) = &self.events {
                let _ = events.send(event);
            }
        }
    }

    #[async_trait]
    impl MatchTransport for MockTransport {
        async fn send_binary(&mut self, data: Vec<u8>) -> Result<()> {
            let count = {
                let mut binaries = self.log.binaries.lock().unwrap();
                binaries.push(data);
                binaries.len()
            };
            for (n, text) in self.script.after_frames.clone() {
                if n == count {
                    self.push(SessionEvent::Message(text));
                }
            }
            if self.script.close_after == Some(count) {
                self.push(SessionEvent::TransportClosed(Some("server went away".into())));
            }
            Ok(())
        }

        async fn send_text(&mut self, text: String) -> Result<()> {
            let is_search = text.contains("search");
            self.log.texts.lock().unwrap().push(text);
            if is_search {
                if let Some(reply) = self.script.on_search.clone() {
                    self.push(SessionEvent::Message(reply));
                }
            }
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            self.log.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    pub enum ConnectBehaviour {
        Succeed,
        Refuse,
        Hang,
    }

    pub struct MockConnector {
        pub behaviour: ConnectBehaviour,
        pub script: Script,
        pub log: Arc<TransportLog>,
    }

    impl MockConnector {
        pub fn new(script: Script) -> (Arc<Self>, Arc<TransportLog>) {
            Self::with_behaviour(ConnectBehaviour::Succeed, script)
        }

        pub fn with_behaviour(
            behaviour: ConnectBehaviour,
            script: Script,
        ) -> (Arc<Self>, Arc<TransportLog>) {
            let log = Arc::new(TransportLog::default());
            (
                Arc::new(Self {
                    behaviour,
                    script,
                    log: log.clone(),
                }),
                log,
            )
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(
            &self,
            _url: &str,
            events: UnboundedSender<SessionEvent>,
        ) -> Result<Box<dyn MatchTransport>> {
            match self.behaviour {
                ConnectBehaviour::Succeed => Ok(Box::new(MockTransport {
                    log: self.log.clone(),
                    events: Some(events),
                    script: self.script.clone(),
                })),
                ConnectBehaviour::Refuse => {
                    Err(VibeflowError::Connection("connection refused".into()))
                }
                ConnectBehaviour::Hang => std::future::pending().await,
            }
        }
    }
}
