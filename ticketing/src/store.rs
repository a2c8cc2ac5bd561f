//! Persistence seam for the case registry.
//!
//! The controller talks to a `CaseStore` trait so storage is substitutable
//! in tests. All writes are single-row updates keyed by case id; no
//! cross-row transactions are required anywhere in the core.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::case::{Case, CaseId, CaseStatus, ChannelId, MessageId, UserId};
use crate::error::TicketError;
use crate::transcript::Transcript;

#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Next case number: `max(existing) + 1`, never reused after deletion.
    async fn next_case_id(&self) -> Result<CaseId, TicketError>;

    async fn insert_case(&self, case: &Case) -> Result<(), TicketError>;

    /// Record the staff control message for restart reattachment.
    async fn set_admin_message(
        &self,
        id: CaseId,
        message: MessageId,
    ) -> Result<(), TicketError>;

    async fn set_status(&self, id: CaseId, status: CaseStatus) -> Result<(), TicketError>;

    /// `status=claimed` plus `claimed_by` in one write.
    async fn set_claimed(&self, id: CaseId, claimer: UserId) -> Result<(), TicketError>;

    async fn case_by_id(&self, id: CaseId) -> Result<Option<Case>, TicketError>;

    /// Authoritative `channel → case` binding. Channel names are display
    /// text and are never parsed for this.
    async fn case_by_channel(&self, channel: ChannelId) -> Result<Option<Case>, TicketError>;

    /// Append a transcript row, returning its id.
    async fn save_transcript(&self, id: CaseId, content: &str) -> Result<i64, TicketError>;

    /// Most recent transcript for a case, by transcript id.
    async fn latest_transcript(&self, id: CaseId) -> Result<Option<Transcript>, TicketError>;

    /// All transcripts for a case, oldest first.
    async fn transcripts(&self, id: CaseId) -> Result<Vec<Transcript>, TicketError>;

    async fn save_setting(&self, key: &str, value: &str) -> Result<(), TicketError>;

    async fn get_setting(&self, key: &str) -> Result<Option<String>, TicketError>;
}

/// In-memory store for tests and local runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    cases: HashMap<CaseId, Case>,
    transcripts: Vec<Transcript>,
    settings: HashMap<String, String>,
    next_transcript_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CaseStore for MemoryStore {
    async fn next_case_id(&self) -> Result<CaseId, TicketError> {
        let inner = self.inner.lock().unwrap();
        let max = inner.cases.keys().map(|c| c.0).max().unwrap_or(0);
        Ok(CaseId(max + 1))
    }

    async fn insert_case(&self, case: &Case) -> Result<(), TicketError> {
        let mut inner = self.inner.lock().unwrap();
        inner.cases.insert(case.id, case.clone());
        Ok(())
    }

    async fn set_admin_message(
        &self,
        id: CaseId,
        message: MessageId,
    ) -> Result<(), TicketError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(case) = inner.cases.get_mut(&id) {
            case.admin_message_id = Some(message);
        }
        Ok(())
    }

    async fn set_status(&self, id: CaseId, status: CaseStatus) -> Result<(), TicketError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(case) = inner.cases.get_mut(&id) {
            case.status = status;
        }
        Ok(())
    }

    async fn set_claimed(&self, id: CaseId, claimer: UserId) -> Result<(), TicketError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(case) = inner.cases.get_mut(&id) {
            case.status = CaseStatus::Claimed;
            case.claimed_by = Some(claimer);
        }
        Ok(())
    }

    async fn case_by_id(&self, id: CaseId) -> Result<Option<Case>, TicketError> {
        Ok(self.inner.lock().unwrap().cases.get(&id).cloned())
    }

    async fn case_by_channel(&self, channel: ChannelId) -> Result<Option<Case>, TicketError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .cases
            .values()
            .find(|c| c.channel_id == channel)
            .cloned())
    }

    async fn save_transcript(&self, id: CaseId, content: &str) -> Result<i64, TicketError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_transcript_id += 1;
        let transcript_id = inner.next_transcript_id;
        inner.transcripts.push(Transcript {
            transcript_id,
            case_id: id,
            content: content.to_string(),
            created_at: chrono::Utc::now(),
        });
        Ok(transcript_id)
    }

    async fn latest_transcript(&self, id: CaseId) -> Result<Option<Transcript>, TicketError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .transcripts
            .iter()
            .filter(|t| t.case_id == id)
            .max_by_key(|t| t.transcript_id)
            .cloned())
    }

    async fn transcripts(&self, id: CaseId) -> Result<Vec<Transcript>, TicketError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .transcripts
            .iter()
            .filter(|t| t.case_id == id)
            .cloned()
            .collect())
    }

    async fn save_setting(&self, key: &str, value: &str) -> Result<(), TicketError> {
        self.inner
            .lock()
            .unwrap()
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, TicketError> {
        Ok(self.inner.lock().unwrap().settings.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn case_ids_are_monotonic_and_never_reused() {
        let store = MemoryStore::new();
        assert_eq!(store.next_case_id().await.unwrap(), CaseId(1));

        let case = Case::new(CaseId(1), UserId(10), "alice", ChannelId(100));
        store.insert_case(&case).await.unwrap();
        assert_eq!(store.next_case_id().await.unwrap(), CaseId(2));

        // Deleting keeps the row, so the id stays burned.
        store.set_status(CaseId(1), CaseStatus::Deleted).await.unwrap();
        assert_eq!(store.next_case_id().await.unwrap(), CaseId(2));
    }

    #[tokio::test]
    async fn channel_binding_resolves_the_case() {
        let store = MemoryStore::new();
        let case = Case::new(CaseId(3), UserId(10), "alice", ChannelId(300));
        store.insert_case(&case).await.unwrap();

        let found = store.case_by_channel(ChannelId(300)).await.unwrap().unwrap();
        assert_eq!(found.id, CaseId(3));
        assert!(store.case_by_channel(ChannelId(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transcripts_are_append_only_and_latest_wins() {
        let store = MemoryStore::new();
        let first = store.save_transcript(CaseId(5), "close capture").await.unwrap();
        let second = store.save_transcript(CaseId(5), "delete capture").await.unwrap();
        assert!(second > first);

        let all = store.transcripts(CaseId(5)).await.unwrap();
        assert_eq!(all.len(), 2);

        let latest = store.latest_transcript(CaseId(5)).await.unwrap().unwrap();
        assert_eq!(latest.content, "delete capture");
    }

    #[tokio::test]
    async fn settings_round_trip() {
        let store = MemoryStore::new();
        store.save_setting("ENTRY_CHANNEL_ID", "42").await.unwrap();
        assert_eq!(
            store.get_setting("ENTRY_CHANNEL_ID").await.unwrap().as_deref(),
            Some("42")
        );
        assert!(store.get_setting("missing").await.unwrap().is_none());
    }
}
