//! Error taxonomy for ticket operations.
//!
//! Every failure from an external capability is caught at the boundary of
//! the triggering operation and translated into one of these kinds; raw
//! transport errors never reach an end user. `user_notice()` is the single
//! place that maps a kind to the text shown in the channel.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TicketError {
    /// Actor lacks the staff capability required for this action.
    #[error("actor lacks the required staff capability")]
    Forbidden,

    /// The channel does not resolve to a known case.
    #[error("channel is not bound to any case")]
    NotATicketChannel,

    /// The requester already has a case creation in flight.
    #[error("case creation already in progress for this user")]
    AlreadyInProgress,

    /// The external lookup service does not know the identifier.
    #[error("identifier not found in the case database")]
    LookupMiss,

    /// Language-model call failed. Degrades to a canned fallback for the
    /// user; the raw cause is logged for operators.
    #[error("completion failed: {0}")]
    Completion(String),

    /// A gateway operation (channel create/move/delete, permissions) failed.
    #[error("gateway capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// Persistence failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl TicketError {
    /// Text reported to the actor or channel for this failure.
    pub fn user_notice(&self) -> &'static str {
        match self {
            Self::Forbidden => "You are not a supporter or administrator, this action is not allowed.",
            Self::NotATicketChannel => "This does not look like a valid ticket channel.",
            Self::AlreadyInProgress => {
                "You are already creating a ticket. Please wait a moment."
            }
            Self::LookupMiss => {
                "I do not recognize this ID. Please check it or give me a different one."
            }
            Self::Completion(_) => "Sorry, something went wrong while generating a reply.",
            Self::CapabilityUnavailable(_) => {
                "A platform operation failed. Please try again or contact an administrator."
            }
            Self::Storage(_) => {
                "A platform operation failed. Please try again or contact an administrator."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_never_leak_the_raw_cause() {
        let err = TicketError::Completion("connection reset by peer".into());
        assert!(!err.user_notice().contains("connection reset"));
        let err = TicketError::Storage("db error: relation missing".into());
        assert!(!err.user_notice().contains("relation"));
    }
}
