//! Shared in-process fakes for the capability traits.
//!
//! Same pattern throughout: interior `Mutex` state, call recording, and
//! simple scripting knobs per test.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use appeal_bot::completion::{CompletionBudget, CompletionClient, CompletionError};
use appeal_bot::config::{BotConfig, CompletionEndpoint};
use appeal_bot::gateway::{ChatGateway, HistoryEntry, Permissions};
use appeal_bot::lookup::{CaseDetail, LookupClient};
use appeal_bot::ocr::TextExtractor;
use appeal_bot::prompts;
use ticketing::case::{ChannelId, MessageId, RoleId, UserId};
use ticketing::conversation::Turn;
use ticketing::error::TicketError;

pub const SUPPORT_ROLE: RoleId = RoleId(1);
pub const ADMIN_ROLE: RoleId = RoleId(2);
pub const VIEWER_ROLE: RoleId = RoleId(3);

pub fn test_config() -> BotConfig {
    BotConfig {
        gateway_url: "http://localhost:0".into(),
        gateway_token: "test-token".into(),
        completion: CompletionEndpoint {
            url: "http://localhost:0/v1".into(),
            api_key: "k".into(),
            model: "test-model".into(),
        },
        lookup_url: "http://localhost:0".into(),
        database_url: None,
        support_role: SUPPORT_ROLE,
        admin_role: ADMIN_ROLE,
        viewer_role: VIEWER_ROLE,
        open_category: ChannelId(10),
        claimed_category: ChannelId(11),
        closed_category: ChannelId(12),
    }
}

/// Recording chat gateway. Channel creation hands out sequential ids
/// starting at 1000; an optional hold lock lets a test freeze creation
/// mid-flight to provoke races, and operations named via `fail_op` error
/// until cleared.
#[derive(Default)]
pub struct FakeGateway {
    pub sent: Mutex<Vec<(ChannelId, String)>>,
    pub created: Mutex<Vec<(String, ChannelId)>>,
    pub moved: Mutex<Vec<(ChannelId, ChannelId)>>,
    pub renamed: Mutex<Vec<(ChannelId, String)>>,
    pub deleted: Mutex<Vec<ChannelId>>,
    pub member_perms: Mutex<Vec<(ChannelId, UserId, Permissions)>>,
    pub role_perms: Mutex<Vec<(ChannelId, RoleId, Permissions)>>,
    pub history: Mutex<Vec<HistoryEntry>>,
    pub roles: Mutex<HashMap<UserId, Vec<RoleId>>>,
    pub create_hold: Option<Arc<tokio::sync::Mutex<()>>>,
    failures: Mutex<HashSet<&'static str>>,
    next_channel: AtomicU64,
    next_message: AtomicU64,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            next_channel: AtomicU64::new(1000),
            next_message: AtomicU64::new(5000),
            ..Default::default()
        }
    }

    pub fn with_create_hold(mut self, hold: Arc<tokio::sync::Mutex<()>>) -> Self {
        self.create_hold = Some(hold);
        self
    }

    /// Make the named operation fail until `clear_failures`.
    pub fn fail_op(&self, op: &'static str) {
        self.failures.lock().unwrap().insert(op);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    fn check(&self, op: &str) -> Result<(), TicketError> {
        if self.failures.lock().unwrap().contains(op) {
            return Err(TicketError::CapabilityUnavailable(format!(
                "{op} scripted to fail"
            )));
        }
        Ok(())
    }

    pub fn grant_roles(&self, user: UserId, roles: &[RoleId]) {
        self.roles.lock().unwrap().insert(user, roles.to_vec());
    }

    pub fn push_history(&self, entry: HistoryEntry) {
        self.history.lock().unwrap().push(entry);
    }

    /// Messages sent into one channel.
    pub fn messages_for(&self, channel: ChannelId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn count_containing(&self, channel: ChannelId, needle: &str) -> usize {
        self.messages_for(channel)
            .iter()
            .filter(|m| m.contains(needle))
            .count()
    }
}

#[async_trait]
impl ChatGateway for FakeGateway {
    async fn send_message(
        &self,
        channel: ChannelId,
        text: &str,
    ) -> Result<MessageId, TicketError> {
        self.check("send_message")?;
        self.sent.lock().unwrap().push((channel, text.to_string()));
        Ok(MessageId(self.next_message.fetch_add(1, Ordering::SeqCst)))
    }

    async fn create_channel(
        &self,
        name: &str,
        _parent: ChannelId,
    ) -> Result<ChannelId, TicketError> {
        self.check("create_channel")?;
        if let Some(hold) = &self.create_hold {
            let _held = hold.lock().await;
        }
        let id = ChannelId(self.next_channel.fetch_add(1, Ordering::SeqCst));
        self.created.lock().unwrap().push((name.to_string(), id));
        Ok(id)
    }

    async fn set_member_permissions(
        &self,
        channel: ChannelId,
        member: UserId,
        perms: Permissions,
    ) -> Result<(), TicketError> {
        self.check("set_member_permissions")?;
        self.member_perms.lock().unwrap().push((channel, member, perms));
        Ok(())
    }

    async fn set_role_permissions(
        &self,
        channel: ChannelId,
        role: RoleId,
        perms: Permissions,
    ) -> Result<(), TicketError> {
        self.check("set_role_permissions")?;
        self.role_perms.lock().unwrap().push((channel, role, perms));
        Ok(())
    }

    async fn move_channel(
        &self,
        channel: ChannelId,
        parent: ChannelId,
    ) -> Result<(), TicketError> {
        self.check("move_channel")?;
        self.moved.lock().unwrap().push((channel, parent));
        Ok(())
    }

    async fn rename_channel(&self, channel: ChannelId, name: &str) -> Result<(), TicketError> {
        self.check("rename_channel")?;
        self.renamed.lock().unwrap().push((channel, name.to_string()));
        Ok(())
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), TicketError> {
        self.check("delete_channel")?;
        self.deleted.lock().unwrap().push(channel);
        Ok(())
    }

    async fn fetch_history(
        &self,
        _channel: ChannelId,
    ) -> Result<Vec<HistoryEntry>, TicketError> {
        self.check("fetch_history")?;
        Ok(self.history.lock().unwrap().clone())
    }

    async fn member_roles(&self, member: UserId) -> Result<Vec<RoleId>, TicketError> {
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(&member)
            .cloned()
            .unwrap_or_default())
    }
}

/// Scripted completion client. Routes on the system preamble: classifier
/// calls pop from the verdict queue (default "cooperative"); everything
/// else returns a canned reply unless `fail_replies` is set.
#[derive(Default)]
pub struct FakeCompletion {
    pub verdicts: Mutex<Vec<String>>,
    pub fail_replies: Mutex<bool>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue verdicts, consumed oldest first.
    pub fn script_verdicts(&self, verdicts: &[&str]) {
        let mut queue = self.verdicts.lock().unwrap();
        // Stored reversed so pop() yields oldest first.
        *queue = verdicts.iter().rev().map(|v| v.to_string()).collect();
    }

    pub fn set_fail_replies(&self, fail: bool) {
        *self.fail_replies.lock().unwrap() = fail;
    }

    pub fn classifier_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.as_str() == prompts::CLASSIFIER_PREAMBLE)
            .count()
    }
}

#[async_trait]
impl CompletionClient for FakeCompletion {
    async fn complete(
        &self,
        system: &str,
        _history: &[Turn],
        _budget: CompletionBudget,
    ) -> Result<String, CompletionError> {
        self.calls.lock().unwrap().push(system.to_string());

        if system == prompts::CLASSIFIER_PREAMBLE {
            return Ok(self
                .verdicts
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| "cooperative".to_string()));
        }

        if *self.fail_replies.lock().unwrap() {
            return Err(CompletionError::Status(500));
        }

        if system == prompts::ELABORATION_PREAMBLE {
            Ok("That behavior ruins the game for everyone else.".to_string())
        } else if system == prompts::EVIDENCE_SUMMARY_PREAMBLE {
            Ok("A short paraphrase of the evidence.".to_string())
        } else {
            Ok("Can you tell me more about what led to the ban?".to_string())
        }
    }
}

/// Lookup fake backed by a map.
#[derive(Default)]
pub struct FakeLookup {
    pub records: Mutex<HashMap<String, CaseDetail>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, identifier: &str, player_name: &str, reason: &str) {
        self.records.lock().unwrap().insert(
            identifier.to_string(),
            CaseDetail {
                player_name: player_name.to_string(),
                reason: reason.to_string(),
                attachments: Vec::new(),
            },
        );
    }
}

#[async_trait]
impl LookupClient for FakeLookup {
    async fn resolve(&self, identifier: &str) -> Result<Option<CaseDetail>, TicketError> {
        self.calls.lock().unwrap().push(identifier.to_string());
        Ok(self.records.lock().unwrap().get(identifier).cloned())
    }
}

/// Extractor returning a fixed string.
pub struct FakeExtractor(pub String);

#[async_trait]
impl TextExtractor for FakeExtractor {
    async fn extract_text(&self, _image: &[u8]) -> String {
        self.0.clone()
    }
}
