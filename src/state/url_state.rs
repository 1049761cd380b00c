/// Per-URL crawl state definitions
///
/// A URL moves `Pending -> InFlight -> Done` within a session and never goes back.
use std::fmt;

/// Where a URL is in the frontier's state machine
///
/// URLs the frontier has never admitted are "unseen" and have no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlState {
    /// Admitted and waiting in the queue
    Pending,

    /// Handed to a worker
    InFlight,

    /// Processed; carries how it ended
    Done(Outcome),
}

impl UrlState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Returns true if a transition to `next` is allowed
    pub fn can_transition_to(&self, next: &UrlState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InFlight) | (Self::InFlight, Self::Done(_))
        )
    }
}

/// How processing of a single URL ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Page record written and tokens merged into the index
    Indexed,

    /// Abandoned without index or content side effects
    Failed(FailureKind),

    /// Not fetched because another unit already visited it
    Skipped,
}

impl Outcome {
    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Indexed)
    }

    /// Converts the outcome to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Indexed => "indexed",
            Self::Skipped => "skipped",
            Self::Failed(kind) => kind.to_db_string(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Failure taxonomy for a single URL; none of these are retried within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Connection refused, DNS failure, TLS error, body read failure
    Network,

    /// Per-request timeout elapsed
    Timeout,

    /// Any status other than 200
    HttpStatus(u16),

    /// Response was not an HTML document
    ContentMismatch,

    /// Document could not be parsed
    Parse,

    /// Page record could not be written to the store
    Persistence,
}

impl FailureKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Network => "network_error",
            Self::Timeout => "timeout",
            Self::HttpStatus(_) => "http_status",
            Self::ContentMismatch => "content_mismatch",
            Self::Parse => "parse_error",
            Self::Persistence => "persistence_error",
        }
    }

    /// Returns true for failures of the fetch itself (transient network-side errors)
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::HttpStatus(_))
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpStatus(code) => write!(f, "http_status({})", code),
            other => write!(f, "{}", other.to_db_string()),
        }
    }
}
