//! Per-channel triage state — explicit phases and legal transition guards.
//!
//! The assistant moves a fresh ticket channel through:
//!
//! ```text
//! AwaitingId → AwaitingExplanation → HandedOff
//! ```
//!
//! with `Deactivated` reachable from any non-terminal phase (staff
//! intervention, strike threshold, or an explicit toggle from the
//! lifecycle controller). `HandedOff` and `Deactivated` are terminal for
//! assistant purposes; lifecycle actions on the case continue regardless.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Uncooperative verdicts at or above this count reject the appeal.
pub const STRIKE_THRESHOLD: u32 = 3;

/// Phase of the automated assistant within one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriagePhase {
    /// Waiting for the user to supply a looked-up identifier.
    AwaitingId,
    /// Identifier resolved; collecting the user's self-explanation.
    AwaitingExplanation,
    /// Explanation accepted; human staff take over. Terminal.
    HandedOff,
    /// Assistant switched off without a handoff. Terminal.
    Deactivated,
}

impl TriagePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::HandedOff | Self::Deactivated)
    }
}

impl fmt::Display for TriagePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingId => write!(f, "AwaitingId"),
            Self::AwaitingExplanation => write!(f, "AwaitingExplanation"),
            Self::HandedOff => write!(f, "HandedOff"),
            Self::Deactivated => write!(f, "Deactivated"),
        }
    }
}

fn is_legal_transition(from: TriagePhase, to: TriagePhase) -> bool {
    use TriagePhase::*;

    // Any non-terminal phase can be deactivated.
    if to == Deactivated && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (AwaitingId, AwaitingExplanation) | (AwaitingExplanation, HandedOff)
    )
}

/// Mutable assistant state for one ticket channel.
///
/// Owned by the triage engine behind a per-channel lock; nothing here is
/// shared across channels. All of it is lost on restart by design.
#[derive(Debug, Clone)]
pub struct ChannelState {
    phase: TriagePhase,
    assistant_active: bool,
    /// Once resolved, never reset for the channel's lifetime.
    identifier: Option<String>,
    /// Monotonic — a cooperative verdict never decrements it.
    strikes: u32,
    /// Set when the one-time staff-presence notice has been sent.
    staff_notified: bool,
}

impl ChannelState {
    pub fn new() -> Self {
        Self {
            phase: TriagePhase::AwaitingId,
            assistant_active: true,
            identifier: None,
            strikes: 0,
            staff_notified: false,
        }
    }

    pub fn phase(&self) -> TriagePhase {
        self.phase
    }

    pub fn assistant_active(&self) -> bool {
        self.assistant_active
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn strikes(&self) -> u32 {
        self.strikes
    }

    /// Advance the phase machine, enforcing the legal edges.
    pub fn advance(&mut self, to: TriagePhase) -> bool {
        if !is_legal_transition(self.phase, to) {
            tracing::warn!(from = %self.phase, to = %to, "illegal triage transition ignored");
            return false;
        }
        tracing::debug!(from = %self.phase, to = %to, "triage transition");
        self.phase = to;
        if to.is_terminal() {
            self.assistant_active = false;
        }
        true
    }

    /// Switch the assistant off without a handoff. Idempotent.
    pub fn deactivate(&mut self) {
        if !self.phase.is_terminal() {
            self.advance(TriagePhase::Deactivated);
        }
        self.assistant_active = false;
    }

    /// Record the staff-presence notice; returns true the first time only.
    pub fn mark_staff_notified(&mut self) -> bool {
        if self.staff_notified {
            return false;
        }
        self.staff_notified = true;
        true
    }

    /// Record the resolved identifier and move to the explanation phase.
    pub fn resolve_identifier(&mut self, identifier: impl Into<String>) {
        if self.identifier.is_none() {
            self.identifier = Some(identifier.into());
            self.advance(TriagePhase::AwaitingExplanation);
        }
    }

    /// Count one uncooperative verdict; true once the threshold is hit.
    pub fn record_strike(&mut self) -> bool {
        self.strikes += 1;
        self.strikes >= STRIKE_THRESHOLD
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_awaits_identifier() {
        let state = ChannelState::new();
        assert_eq!(state.phase(), TriagePhase::AwaitingId);
        assert!(state.assistant_active());
        assert_eq!(state.identifier(), None);
        assert_eq!(state.strikes(), 0);
    }

    #[test]
    fn happy_path_to_handoff() {
        let mut state = ChannelState::new();
        state.resolve_identifier("AB12CD34EF56GH78");
        assert_eq!(state.phase(), TriagePhase::AwaitingExplanation);
        assert!(state.advance(TriagePhase::HandedOff));
        assert!(!state.assistant_active());
        assert!(state.phase().is_terminal());
    }

    #[test]
    fn identifier_is_set_once() {
        let mut state = ChannelState::new();
        state.resolve_identifier("AAAA1111BBBB2222");
        state.resolve_identifier("CCCC3333DDDD4444");
        assert_eq!(state.identifier(), Some("AAAA1111BBBB2222"));
    }

    #[test]
    fn deactivation_is_reachable_and_idempotent() {
        let mut state = ChannelState::new();
        state.deactivate();
        assert_eq!(state.phase(), TriagePhase::Deactivated);
        assert!(!state.assistant_active());
        // Second call must not panic or warn its way anywhere else.
        state.deactivate();
        assert_eq!(state.phase(), TriagePhase::Deactivated);
    }

    #[test]
    fn terminal_phases_reject_transitions() {
        let mut state = ChannelState::new();
        state.resolve_identifier("AAAA1111BBBB2222");
        state.advance(TriagePhase::HandedOff);
        assert!(!state.advance(TriagePhase::AwaitingId));
        assert!(!state.advance(TriagePhase::Deactivated));
        assert_eq!(state.phase(), TriagePhase::HandedOff);
    }

    #[test]
    fn cannot_skip_to_handoff_without_identifier() {
        let mut state = ChannelState::new();
        assert!(!state.advance(TriagePhase::HandedOff));
        assert_eq!(state.phase(), TriagePhase::AwaitingId);
    }

    #[test]
    fn strikes_accumulate_to_threshold() {
        let mut state = ChannelState::new();
        assert!(!state.record_strike());
        assert!(!state.record_strike());
        assert!(state.record_strike());
        assert_eq!(state.strikes(), 3);
        // Further strikes stay above threshold; counter never resets.
        assert!(state.record_strike());
    }

    #[test]
    fn staff_notice_fires_once() {
        let mut state = ChannelState::new();
        assert!(state.mark_staff_notified());
        assert!(!state.mark_staff_notified());
    }
}
