//! Wire messages of the streaming match endpoint

use serde::Deserialize;
use vibeflow_api::MatchCandidate;

/// Text message pushed by the service
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Diagnostic progress
    Status {
        #[serde(default)]
        message: String,
    },
    /// Best guess so far, below the acceptance threshold
    Partial {
        #[serde(default)]
        message: String,
        data: MatchCandidate,
    },
    Confirmed {
        #[serde(default)]
        message: String,
        data: MatchCandidate,
    },
    NoMatch {
        #[serde(default)]
        message: String,
    },
    Error {
        #[serde(default)]
        message: String,
    },
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Control command sent as a text message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAction {
    /// Run a search over everything buffered so far
    Search,
    /// Ask the service to close the connection
    Stop,
}

impl ClientAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ClientAction::Search => "search",
            ClientAction::Stop => "stop",
        }
    }

    pub fn to_json(self) -> String {
        format!(r#"{{"action":"{}"}}"#, self.as_str())
    }
}
