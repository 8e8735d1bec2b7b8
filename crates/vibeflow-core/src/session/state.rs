//! Match session state machine
//!
//! `Idle -> Connecting -> Streaming -> {Confirmed | Exhausted} -> Closed`

use super::protocol::ServerMessage;
use tokio::time::Instant;
use vibeflow_api::MatchCandidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Confirmed,
    /// Listening budget spent, waiting for the final answer
    Exhausted,
    Closed,
}

/// Effect of an inbound message on the session
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Status(String),
    Partial(MatchCandidate),
    Confirmed(MatchCandidate),
    NoMatch(String),
    Error(String),
    /// Arrived after the session settled
    Ignored,
}

#[derive(Debug)]
pub struct MatchSession {
    state: SessionState,
    frames_sent: u64,
    best: Option<MatchCandidate>,
    started: Option<Instant>,
}

impl Default for MatchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            frames_sent: 0,
            best: None,
            started: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Last candidate seen, confirmed or not
    pub fn best(&self) -> Option<&MatchCandidate> {
        self.best.as_ref()
    }

    pub fn started(&self) -> Option<Instant> {
        self.started
    }

    pub fn begin_connect(&mut self) {
        if self.state == SessionState::Idle {
            self.state = SessionState::Connecting;
            self.started = Some(Instant::now());
        }
    }

    pub fn connected(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Streaming;
        }
    }

    /// Frames are only transmitted while streaming
    pub fn can_send(&self) -> bool {
        self.state == SessionState::Streaming
    }

    pub fn record_sent(&mut self) {
        if self.can_send() {
            self.frames_sent += 1;
        }
    }

    /// Budget elapsed without confirmation. Returns `true` on the transition.
    pub fn exhaust(&mut self) -> bool {
        if self.state == SessionState::Streaming {
            self.state = SessionState::Exhausted;
            return true;
        }
        false
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    pub fn apply(&mut self, msg: ServerMessage) -> Applied {
        let listening = matches!(self.state, SessionState::Streaming | SessionState::Exhausted);

        match msg {
            ServerMessage::Confirmed { mut data, .. } if listening => {
                data.is_confirmed = true;
                self.best = Some(data.clone());
                self.state = SessionState::Confirmed;
                Applied::Confirmed(data)
            }
            ServerMessage::Partial { mut data, .. } if listening => {
                data.is_confirmed = false;
                self.best = Some(data.clone());
                Applied::Partial(data)
            }
            ServerMessage::NoMatch { message } if listening => Applied::NoMatch(message),
            ServerMessage::Error { message } if self.state != SessionState::Closed => {
                Applied::Error(message)
            }
            ServerMessage::Status { message } if self.state != SessionState::Closed => {
                Applied::Status(message)
            }
            _ => Applied::Ignored,
        }
    }
}
