//! Ticketing core for the ban-appeal bot.
//!
//! This crate holds everything with real state and policy but no I/O of its
//! own:
//! - the case registry types and the monotonic status machine
//! - the per-channel triage phase machine and its counters
//! - the in-memory conversation log used as the model context window
//! - the screening heuristics (identifier extraction, apology filter,
//!   sufficiency rule, cooperation-verdict parsing)
//! - transcript rendering
//! - the persistence trait with in-memory and Postgres implementations
//!
//! The async runtime in `appeal-bot` drives these against the external
//! capabilities (chat gateway, language model, lookup service, OCR).

pub mod case;
pub mod conversation;
pub mod error;
pub mod postgres;
pub mod screening;
pub mod store;
pub mod transcript;
pub mod triage_state;

pub use case::{Case, CaseId, CaseStatus, ChannelId, MessageId, RoleId, UserId};
pub use conversation::{ConversationLog, Role, Turn};
pub use error::TicketError;
pub use store::{CaseStore, MemoryStore};
pub use transcript::{Transcript, TranscriptLine};
pub use triage_state::{ChannelState, TriagePhase, STRIKE_THRESHOLD};
