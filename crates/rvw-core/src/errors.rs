use std::{fmt, time::Duration};

/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type. Broadcast treats
/// `Directory` and `Formatter` as fatal; `Delivery` is only ever seen per
/// recipient and ends up inside a report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("recipient directory error: {0}")]
    Directory(String),

    #[error("formatter error: {0}")]
    Formatter(String),

    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure category for a single delivery attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeliveryErrorKind {
    /// The transport call did not finish in time.
    Timeout,
    /// The recipient blocked the bot, was deactivated, or no longer exists.
    Blocked,
    /// Flood control; `retry_after` is the server hint when one was given.
    RateLimited { retry_after: Option<Duration> },
    Network,
    /// The API refused this particular payload or recipient.
    Rejected,
    Other,
}

impl DeliveryErrorKind {
    /// Stable category name used in reports and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryErrorKind::Timeout => "timeout",
            DeliveryErrorKind::Blocked => "blocked",
            DeliveryErrorKind::RateLimited { .. } => "rate_limited",
            DeliveryErrorKind::Network => "network",
            DeliveryErrorKind::Rejected => "rejected",
            DeliveryErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for DeliveryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured detail of one failed delivery.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct DeliveryError {
    pub kind: DeliveryErrorKind,
    pub detail: String,
}

impl DeliveryError {
    pub fn new(kind: DeliveryErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::Timeout, detail)
    }

    pub fn is_blocked(&self) -> bool {
        self.kind == DeliveryErrorKind::Blocked
    }
}

impl From<Error> for DeliveryError {
    fn from(e: Error) -> Self {
        match e {
            Error::Delivery(inner) => inner,
            Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
                DeliveryError::timeout(io.to_string())
            }
            other => DeliveryError::new(DeliveryErrorKind::Other, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_errors_keep_their_kind_through_the_core_error() {
        let err: Error = DeliveryError::new(DeliveryErrorKind::Blocked, "bot was blocked").into();
        let back = DeliveryError::from(err);
        assert!(back.is_blocked());
        assert_eq!(back.to_string(), "blocked: bot was blocked");
    }

    #[test]
    fn foreign_errors_become_other() {
        let back = DeliveryError::from(Error::External("boom".to_string()));
        assert_eq!(back.kind, DeliveryErrorKind::Other);
        assert_eq!(back.detail, "external error: boom");
    }

    #[test]
    fn io_timeouts_are_classified() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        assert_eq!(
            DeliveryError::from(Error::Io(io)).kind,
            DeliveryErrorKind::Timeout
        );
    }
}
