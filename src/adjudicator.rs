//! Seam for an external judgment call.
//!
//! When fuzzy matching leaves several lines tied for a heading, a semantic service can be asked
//! to pick one. It only ever sees copies of the tied candidates and answers with an index; it never
//! touches offsets or the resolver's cursor. Each call runs on a helper thread under a timeout and
//! is retried per the [`RetryPolicy`]. Any failure falls back to the deterministic choice.

use crate::retry::{RetryPolicy, Retryable};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
/// A tied line offered for judgment.
pub struct Candidate {
    /// Byte offset of the line in the raw text.
    pub position: usize,
    /// The line's text.
    pub line: String,
    /// Its similarity ratio to the title.
    pub score: f64,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
/// Why an adjudicator gave no answer.
pub enum AdjudicatorError {
    #[error("adjudicator timed out")]
    /// No answer within the per-call timeout.
    Timeout,
    #[error("adjudicator unavailable: {0}")]
    /// Transient failure such as a dropped connection or rate limit.
    Unavailable(String),
    #[error("adjudicator rejected the request: {0}")]
    /// The service refused; asking again will not help.
    Rejected(String),
}

impl Retryable for AdjudicatorError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unavailable(_))
    }
}

/// External collaborator choosing among tied candidates.
pub trait Adjudicator: Send + Sync {
    /// Returns the index of the candidate that is really `title`'s heading.
    ///
    /// # Errors
    ///
    /// Returns an [`AdjudicatorError`] if no judgment could be made.
    fn choose(&self, title: &str, candidates: &[Candidate]) -> Result<usize, AdjudicatorError>;
}

#[derive(Clone)]
/// An adjudicator wrapped in timeout and retry handling.
pub struct Adjudication {
    adjudicator: Arc<dyn Adjudicator>,
    policy: RetryPolicy,
    timeout: Duration,
}

impl Adjudication {
    #[must_use]
    /// Wraps `adjudicator` with a retry policy and a per-call timeout.
    pub fn new(adjudicator: Arc<dyn Adjudicator>, policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            adjudicator,
            policy,
            timeout,
        }
    }

    #[must_use]
    /// Asks for a choice, returning `None` on any failure or an out-of-range answer.
    pub fn choose(&self, title: &str, candidates: &[Candidate]) -> Option<usize> {
        match self.policy.run(|_| self.call_once(title, candidates)) {
            Ok(choice) if choice < candidates.len() => Some(choice),
            Ok(choice) => {
                log::warn!(
                    "adjudicator picked candidate {choice} of {} for {title:?}",
                    candidates.len()
                );
                None
            }
            Err(err) => {
                log::warn!("{err}; falling back to nearest candidate for {title:?}");
                None
            }
        }
    }

    fn call_once(&self, title: &str, candidates: &[Candidate]) -> Result<usize, AdjudicatorError> {
        let (tx, rx) = mpsc::channel();
        let adjudicator = Arc::clone(&self.adjudicator);
        let title = title.to_string();
        let candidates = candidates.to_vec();
        thread::spawn(move || {
            // The receiver is gone if we already timed out
            let _ = tx.send(adjudicator.choose(&title, &candidates));
        });
        match rx.recv_timeout(self.timeout) {
            Ok(answer) => answer,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(AdjudicatorError::Timeout),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(AdjudicatorError::Unavailable(
                "adjudicator thread exited without answering".to_string(),
            )),
        }
    }
}

#[cfg(test)]
#[path = "tests/adjudicator.rs"]
mod tests;
