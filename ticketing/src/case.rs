//! Case registry types — identity newtypes, the `Case` record, and the
//! monotonic status machine.
//!
//! Status follows the invariant: transitions only move forward through
//! `open → claimed → closed`, and any non-deleted status may jump to
//! `deleted`. No transition ever reverses, and `deleted` is terminal —
//! a deleted case keeps its row, only the channel is destroyed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ticket number, assigned as `max(existing) + 1`. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaseId(pub i32);

/// Platform identity of a member (creator, claimer, message author).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Platform identity of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

/// Platform identity of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// Platform identity of a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(pub u64);

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    Claimed,
    Closed,
    Deleted,
}

impl CaseStatus {
    /// Whether this status allows no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Deleted)
    }

    /// Whether the forward-only status machine permits `self → to`.
    pub fn can_transition_to(self, to: CaseStatus) -> bool {
        use CaseStatus::*;

        // Any non-terminal status can be deleted.
        if to == Deleted && !self.is_terminal() {
            return true;
        }

        matches!((self, to), (Open, Claimed) | (Open, Closed) | (Claimed, Closed))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Claimed => "claimed",
            Self::Closed => "closed",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "claimed" => Some(Self::Claimed),
            "closed" => Some(Self::Closed),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ban-appeal ticket, bound 1:1 to its channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    /// Who opened the ticket. Immutable after creation.
    pub owner_user_id: UserId,
    /// Display name of the creator, snapshotted at creation time.
    pub owner_display_name: String,
    /// Channel created for this case. Immutable once set.
    pub channel_id: ChannelId,
    pub status: CaseStatus,
    /// Staff member who claimed the case. Set once, never cleared.
    pub claimed_by: Option<UserId>,
    /// Message carrying the claim/close/delete controls, recorded so the
    /// controls can be reattached after a process restart.
    pub admin_message_id: Option<MessageId>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Case {
    pub fn new(
        id: CaseId,
        owner_user_id: UserId,
        owner_display_name: impl Into<String>,
        channel_id: ChannelId,
    ) -> Self {
        Self {
            id,
            owner_user_id,
            owner_display_name: owner_display_name.into(),
            channel_id,
            status: CaseStatus::Open,
            claimed_by: None,
            admin_message_id: None,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Channel name for a fresh case: display name with spaces dashed, capped
/// at 20 characters, then the case number.
pub fn open_channel_name(display_name: &str, id: CaseId) -> String {
    let base: String = display_name.replace(' ', "-").chars().take(20).collect();
    format!("{base}-{id}")
}

/// Channel name after a claim: creator, claimer, case number.
pub fn claimed_channel_name(creator: &str, claimer: &str, id: CaseId) -> String {
    let creator: String = creator.replace(' ', "-").chars().take(20).collect();
    let claimer: String = claimer.replace(' ', "-").chars().take(20).collect();
    format!("{creator}-{claimer}-{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_legal() {
        assert!(CaseStatus::Open.can_transition_to(CaseStatus::Claimed));
        assert!(CaseStatus::Open.can_transition_to(CaseStatus::Closed));
        assert!(CaseStatus::Claimed.can_transition_to(CaseStatus::Closed));
    }

    #[test]
    fn any_live_status_can_be_deleted() {
        for status in [CaseStatus::Open, CaseStatus::Claimed, CaseStatus::Closed] {
            assert!(status.can_transition_to(CaseStatus::Deleted));
        }
    }

    #[test]
    fn no_status_regresses() {
        assert!(!CaseStatus::Claimed.can_transition_to(CaseStatus::Open));
        assert!(!CaseStatus::Closed.can_transition_to(CaseStatus::Open));
        assert!(!CaseStatus::Closed.can_transition_to(CaseStatus::Claimed));
        assert!(!CaseStatus::Deleted.can_transition_to(CaseStatus::Open));
        assert!(!CaseStatus::Deleted.can_transition_to(CaseStatus::Closed));
    }

    #[test]
    fn deleted_is_terminal() {
        assert!(CaseStatus::Deleted.is_terminal());
        assert!(!CaseStatus::Deleted.can_transition_to(CaseStatus::Deleted));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            CaseStatus::Open,
            CaseStatus::Claimed,
            CaseStatus::Closed,
            CaseStatus::Deleted,
        ] {
            assert_eq!(CaseStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CaseStatus::parse("reopened"), None);
    }

    #[test]
    fn open_channel_name_caps_and_dashes() {
        assert_eq!(
            open_channel_name("Max Mustermann", CaseId(7)),
            "Max-Mustermann-7"
        );
        let long = open_channel_name("a very long display name indeed", CaseId(12));
        assert_eq!(long, "a-very-long-display--12");
    }
}
