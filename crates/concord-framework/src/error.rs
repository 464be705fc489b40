//! Error types for the Concord framework.

use concord_core::EventKind;
use thiserror::Error;

/// Errors raised while normalizing an inbound event.
///
/// These never escape the dispatcher: the offending event is dropped and the
/// error is logged at debug level.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The event payload lacks a field the core requires.
    #[error("malformed {kind} event: {reason}")]
    MalformedEvent {
        /// Kind of the rejected event.
        kind: EventKind,
        /// What was missing or invalid.
        reason: String,
    },
}

impl DispatchError {
    /// Creates a malformed-event error.
    pub fn malformed(kind: EventKind, reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            kind,
            reason: reason.into(),
        }
    }
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        let err = DispatchError::malformed(EventKind::MessageCreate, "message has no author");
        assert_eq!(
            err.to_string(),
            "malformed MESSAGE_CREATE event: message has no author"
        );
    }
}
