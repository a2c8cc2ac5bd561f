//! Lifecycle controller — opens, claims, closes, and deletes cases.
//!
//! Validates actor capability, drives the case registry through its
//! monotonic status machine, captures transcripts, and toggles triage
//! activation per channel. Gateway failures are translated into the
//! ticket error taxonomy and never partially commit registry state, with
//! one documented exception: a failure after channel creation but before
//! the case row is persisted leaves an orphan channel, which is logged as
//! an inconsistency rather than auto-repaired (no rollback of channel
//! creation is assumed).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use ticketing::case::{self, Case, CaseId, CaseStatus, ChannelId, UserId};
use ticketing::error::TicketError;
use ticketing::store::CaseStore;
use ticketing::transcript::{self, TranscriptLine};
use tracing::{error, info, warn};

use crate::config::BotConfig;
use crate::gateway::{ChatGateway, Permissions};
use crate::prompts;
use crate::triage::TriageEngine;

/// Settings keys for reattaching the entry-point controls after restart.
pub const ENTRY_CHANNEL_KEY: &str = "ENTRY_CHANNEL_ID";
pub const ENTRY_MESSAGE_KEY: &str = "ENTRY_MESSAGE_ID";

/// Per-user guard against double-submission of case creation. Held only
/// while one `open_case` is in flight; released on every exit path via
/// `Drop`. Carries no timeout — a crash mid-creation clears with the
/// process, since the set is in-memory.
struct CreationGuard {
    locks: Arc<Mutex<HashSet<UserId>>>,
    user: UserId,
}

impl CreationGuard {
    fn acquire(locks: &Arc<Mutex<HashSet<UserId>>>, user: UserId) -> Option<Self> {
        let mut held = locks.lock().unwrap();
        if !held.insert(user) {
            return None;
        }
        Some(Self {
            locks: Arc::clone(locks),
            user,
        })
    }
}

impl Drop for CreationGuard {
    fn drop(&mut self) {
        self.locks.lock().unwrap().remove(&self.user);
    }
}

pub struct LifecycleController {
    gateway: Arc<dyn ChatGateway>,
    store: Arc<dyn CaseStore>,
    triage: Arc<TriageEngine>,
    config: Arc<BotConfig>,
    creation_locks: Arc<Mutex<HashSet<UserId>>>,
}

impl LifecycleController {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        store: Arc<dyn CaseStore>,
        triage: Arc<TriageEngine>,
        config: Arc<BotConfig>,
    ) -> Self {
        Self {
            gateway,
            store,
            triage,
            config,
            creation_locks: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Post the "open a ticket" controls into a lobby channel and remember
    /// where they live so they can be reattached after a restart.
    pub async fn publish_entry_message(&self, channel: ChannelId) -> Result<(), TicketError> {
        let message = self
            .gateway
            .send_message(channel, prompts::ENTRY_MESSAGE)
            .await?;
        self.store
            .save_setting(ENTRY_CHANNEL_KEY, &channel.to_string())
            .await?;
        self.store
            .save_setting(ENTRY_MESSAGE_KEY, &message.to_string())
            .await?;
        info!(%channel, %message, "entry controls published");
        Ok(())
    }

    /// Open a new case for `requester`.
    pub async fn open_case(
        &self,
        requester: UserId,
        display_name: &str,
    ) -> Result<CaseId, TicketError> {
        let _guard = CreationGuard::acquire(&self.creation_locks, requester)
            .ok_or(TicketError::AlreadyInProgress)?;

        let case_id = self.store.next_case_id().await?;
        let name = case::open_channel_name(display_name, case_id);
        let channel = self
            .gateway
            .create_channel(&name, self.config.open_category)
            .await?;

        // From here on the channel exists; a failure before the case row
        // lands is the one accepted inconsistency.
        let setup = self.finish_open(case_id, requester, display_name, channel).await;
        if let Err(e) = &setup {
            error!(
                %case_id,
                %channel,
                error = %e,
                "case setup failed after channel creation; orphan channel left behind"
            );
        }
        setup?;

        info!(%case_id, %requester, %channel, "case opened");
        Ok(case_id)
    }

    async fn finish_open(
        &self,
        case_id: CaseId,
        requester: UserId,
        display_name: &str,
        channel: ChannelId,
    ) -> Result<(), TicketError> {
        self.gateway
            .set_member_permissions(channel, requester, Permissions::READ_WRITE)
            .await?;
        self.gateway
            .set_role_permissions(channel, self.config.viewer_role, Permissions::READ_ONLY)
            .await?;

        let case = Case::new(case_id, requester, display_name, channel);
        self.store.insert_case(&case).await?;

        self.triage.activate(channel).await;

        let admin_message = self
            .gateway
            .send_message(channel, &prompts::welcome_message(case_id, display_name))
            .await?;
        self.store.set_admin_message(case_id, admin_message).await?;

        self.gateway.send_message(channel, prompts::GREETING).await?;
        self.triage
            .note_assistant_message(channel, prompts::GREETING)
            .await;
        Ok(())
    }

    /// Claim a case for a staff member.
    pub async fn claim_case(
        &self,
        actor: UserId,
        actor_display_name: &str,
        channel: ChannelId,
    ) -> Result<(), TicketError> {
        self.require_staff(actor).await?;
        let case = self.resolve_case(channel).await?;

        if !case.status.can_transition_to(CaseStatus::Claimed) {
            warn!(case_id = %case.id, status = %case.status, "claim ignored, status cannot advance");
            return Ok(());
        }

        self.gateway
            .move_channel(channel, self.config.claimed_category)
            .await?;
        // Broad staff write goes away; the claimer and the owner keep it.
        self.gateway
            .set_role_permissions(channel, self.config.support_role, Permissions::READ_ONLY)
            .await?;
        self.gateway
            .set_member_permissions(channel, actor, Permissions::READ_WRITE)
            .await?;
        self.gateway
            .set_member_permissions(channel, case.owner_user_id, Permissions::READ_WRITE)
            .await?;
        self.gateway
            .set_role_permissions(channel, self.config.viewer_role, Permissions::READ_ONLY)
            .await?;

        self.store.set_claimed(case.id, actor).await?;

        let name = case::claimed_channel_name(
            &case.owner_display_name,
            actor_display_name,
            case.id,
        );
        self.gateway.rename_channel(channel, &name).await?;

        self.gateway
            .send_message(
                channel,
                &prompts::claim_announcement(case.id, actor_display_name),
            )
            .await?;

        info!(case_id = %case.id, %actor, "case claimed");
        Ok(())
    }

    /// Close a case: persist status and shut triage down, then capture the
    /// transcript and move the channel to the read-restricted grouping.
    pub async fn close_case(&self, actor: UserId, channel: ChannelId) -> Result<(), TicketError> {
        self.require_staff(actor).await?;
        let case = self.resolve_case(channel).await?;

        if !case.status.can_transition_to(CaseStatus::Closed) {
            warn!(case_id = %case.id, status = %case.status, "close ignored, status cannot advance");
            return Ok(());
        }

        // The assistant goes silent the moment the status leaves the live
        // set, even if a later gateway call fails and the close errors out.
        self.store.set_status(case.id, CaseStatus::Closed).await?;
        self.triage.deactivate(channel).await;

        self.gateway
            .send_message(channel, prompts::CLOSING_NOTICE)
            .await?;

        self.capture_transcript(case.id, channel).await?;
        self.gateway
            .send_message(channel, prompts::TRANSCRIPT_SAVED_NOTICE)
            .await?;

        self.gateway
            .move_channel(channel, self.config.closed_category)
            .await?;
        self.gateway
            .set_role_permissions(channel, self.config.viewer_role, Permissions::READ_ONLY)
            .await?;

        self.gateway
            .send_message(channel, prompts::CLOSED_NOTICE)
            .await?;

        info!(case_id = %case.id, %actor, "case closed");
        Ok(())
    }

    /// Delete a case. The final transcript is captured before the channel
    /// is destroyed — channel destruction is irreversible and comes last.
    pub async fn delete_case(&self, actor: UserId, channel: ChannelId) -> Result<(), TicketError> {
        self.require_staff(actor).await?;
        let case = self.resolve_case(channel).await?;

        if !case.status.can_transition_to(CaseStatus::Deleted) {
            warn!(case_id = %case.id, status = %case.status, "delete ignored, already deleted");
            return Ok(());
        }

        // A second capture next to the close-time one is expected.
        self.capture_transcript(case.id, channel).await?;

        // Deactivation pairs with the status write; the notice and channel
        // destruction may still fail without leaving a live assistant in a
        // deleted case.
        self.store.set_status(case.id, CaseStatus::Deleted).await?;
        self.triage.deactivate(channel).await;

        self.gateway
            .send_message(channel, prompts::DELETING_NOTICE)
            .await?;
        self.gateway.delete_channel(channel).await?;

        info!(case_id = %case.id, %actor, "case deleted");
        Ok(())
    }

    async fn capture_transcript(
        &self,
        case_id: CaseId,
        channel: ChannelId,
    ) -> Result<(), TicketError> {
        let history = self.gateway.fetch_history(channel).await?;
        let lines: Vec<TranscriptLine> = history
            .into_iter()
            .map(|entry| TranscriptLine {
                timestamp: entry.timestamp,
                display_name: entry.display_name,
                text: entry.text,
            })
            .collect();
        let content = transcript::render(&lines);
        let transcript_id = self.store.save_transcript(case_id, &content).await?;
        info!(%case_id, transcript_id, lines = lines.len(), "transcript captured");
        Ok(())
    }

    async fn require_staff(&self, actor: UserId) -> Result<(), TicketError> {
        let roles = self.gateway.member_roles(actor).await?;
        if self.config.is_staff(&roles) {
            Ok(())
        } else {
            Err(TicketError::Forbidden)
        }
    }

    async fn resolve_case(&self, channel: ChannelId) -> Result<Case, TicketError> {
        self.store
            .case_by_channel(channel)
            .await?
            .ok_or(TicketError::NotATicketChannel)
    }
}
