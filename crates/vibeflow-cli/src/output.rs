//! JSON output formatting

use anyhow::{anyhow, Result};
use serde::Serialize;
use vibeflow_api::{CandidateSummary, MatchCandidate};
use vibeflow_core::pipeline::SearchOutcome;
use vibeflow_core::{SessionOutcome, SessionReport};

#[derive(Serialize)]
struct SearchOutput<'a> {
    query_path: &'a str,
    matched: bool,
    message: &'a str,
    best: Option<&'a MatchCandidate>,
    alternates: &'a [CandidateSummary],
}

#[derive(Serialize)]
struct SessionOutput<'a> {
    outcome: &'static str,
    frames_sent: u64,
    elapsed_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate: Option<&'a MatchCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing output: {}", e),
    }
}

/// Print a file search result, best candidate first
pub fn print_search_outcome(query_path: &str, outcome: &SearchOutcome) {
    let output = match outcome {
        SearchOutcome::Match {
            best,
            alternates,
            message,
        } => SearchOutput {
            query_path,
            matched: true,
            message,
            best: Some(best),
            alternates,
        },
        SearchOutcome::NoMatch { message } => SearchOutput {
            query_path,
            matched: false,
            message,
            best: None,
            alternates: &[],
        },
    };
    print_json(&output);
}

/// Print how a listening session ended
pub fn print_session_report(report: &SessionReport) {
    let (outcome, candidate, message) = match &report.outcome {
        SessionOutcome::Confirmed(candidate) => ("confirmed", Some(candidate), None),
        SessionOutcome::NoMatch {
            best_partial,
            message,
        } => ("no_match", best_partial.as_ref(), Some(message.clone())),
        SessionOutcome::Cancelled => ("cancelled", None, None),
        SessionOutcome::Failed(e) => ("failed", None, Some(e.to_string())),
    };
    print_json(&SessionOutput {
        outcome,
        frames_sent: report.frames_sent,
        elapsed_secs: report.elapsed.as_secs_f64(),
        candidate,
        message,
    });
}

/// Map a finished session to the process result; only a failure is an error
pub fn session_status(report: &SessionReport) -> Result<()> {
    match &report.outcome {
        SessionOutcome::Failed(e) => Err(anyhow!("Listening session failed: {}", e)),
        _ => Ok(()),
    }
}
