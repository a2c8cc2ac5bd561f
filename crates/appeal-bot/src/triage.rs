//! Per-channel triage engine — the state machine driving the assistant.
//!
//! For every inbound user message the engine runs, in strict order: the
//! staff-presence gate, the channel-eligibility gate, normalization and
//! history append, the apology-request filter, the cooperativeness
//! classifier, then either the identifier stage or the
//! explanation-sufficiency stage depending on whether an identifier has
//! been resolved for the channel.
//!
//! Concurrency: each channel owns one session behind a `tokio::sync::Mutex`
//! and a message handler holds that lock for its full duration, so message
//! N+1 never mutates conversation or triage state before message N has
//! completed. Channels are fully independent of each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ticketing::case::{ChannelId, UserId};
use ticketing::conversation::{ConversationLog, Turn};
use ticketing::screening::{self, Verdict};
use ticketing::store::CaseStore;
use ticketing::triage_state::{ChannelState, TriagePhase};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::completion::{CompletionBudget, CompletionClient};
use crate::config::BotConfig;
use crate::evidence::EvidenceSummarizer;
use crate::gateway::ChatGateway;
use crate::lookup::LookupClient;
use crate::prompts;

/// Turns of context handed to the cooperativeness classifier.
const CLASSIFIER_WINDOW: usize = 6;
/// Turns of context handed to the persona for follow-up questions.
const PERSONA_WINDOW: usize = 10;

struct Session {
    state: ChannelState,
    log: ConversationLog,
}

impl Session {
    fn new() -> Self {
        Self {
            state: ChannelState::new(),
            log: ConversationLog::new(),
        }
    }
}

pub struct TriageEngine {
    gateway: Arc<dyn ChatGateway>,
    completion: Arc<dyn CompletionClient>,
    lookup: Arc<dyn LookupClient>,
    evidence: EvidenceSummarizer,
    store: Arc<dyn CaseStore>,
    config: Arc<BotConfig>,
    sessions: Mutex<HashMap<ChannelId, Arc<Mutex<Session>>>>,
    /// Pause before a persona follow-up, to avoid flooding the channel.
    reply_delay: Duration,
}

impl TriageEngine {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        completion: Arc<dyn CompletionClient>,
        lookup: Arc<dyn LookupClient>,
        evidence: EvidenceSummarizer,
        store: Arc<dyn CaseStore>,
        config: Arc<BotConfig>,
    ) -> Self {
        Self {
            gateway,
            completion,
            lookup,
            evidence,
            store,
            config,
            sessions: Mutex::new(HashMap::new()),
            reply_delay: Duration::from_secs(2),
        }
    }

    /// Shorten the anti-flooding pause (tests).
    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    /// Activate the assistant for a freshly created ticket channel.
    pub async fn activate(&self, channel: ChannelId) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(channel, Arc::new(Mutex::new(Session::new())));
        debug!(%channel, "triage activated");
    }

    /// Switch the assistant off for a channel. Idempotent; unknown
    /// channels are a no-op.
    pub async fn deactivate(&self, channel: ChannelId) {
        let session = {
            let sessions = self.sessions.lock().await;
            sessions.get(&channel).cloned()
        };
        if let Some(session) = session {
            session.lock().await.state.deactivate();
            debug!(%channel, "triage deactivated");
        }
    }

    /// Record an assistant-authored message (greeting, composed replies
    /// sent by the lifecycle controller) in the channel history.
    pub async fn note_assistant_message(&self, channel: ChannelId, text: &str) {
        let session = {
            let sessions = self.sessions.lock().await;
            sessions.get(&channel).cloned()
        };
        if let Some(session) = session {
            session.lock().await.log.push(Turn::assistant(text));
        }
    }

    /// Whether the assistant is currently active for a channel.
    pub async fn is_active(&self, channel: ChannelId) -> bool {
        let session = {
            let sessions = self.sessions.lock().await;
            sessions.get(&channel).cloned()
        };
        match session {
            Some(session) => session.lock().await.state.assistant_active(),
            None => false,
        }
    }

    /// Current phase for a channel (tests and diagnostics).
    pub async fn phase(&self, channel: ChannelId) -> Option<TriagePhase> {
        let session = {
            let sessions = self.sessions.lock().await;
            sessions.get(&channel).cloned()
        };
        match session {
            Some(session) => Some(session.lock().await.state.phase()),
            None => None,
        }
    }

    /// Process one inbound user message.
    pub async fn handle_message(&self, channel: ChannelId, author: UserId, body: &str) {
        // Staff-presence gate. Precedes everything, bypasses the phase
        // machine entirely.
        if self.author_is_staff(author).await {
            self.handle_staff_message(channel).await;
            return;
        }

        // Channel-eligibility gate: known case channel with a live session.
        if self
            .store
            .case_by_channel(channel)
            .await
            .ok()
            .flatten()
            .is_none()
        {
            return;
        }
        let session = {
            let sessions = self.sessions.lock().await;
            sessions.get(&channel).cloned()
        };
        let Some(session) = session else {
            return;
        };

        // Per-channel serialization: the session lock is held from here to
        // the end of the handler.
        let mut session = session.lock().await;
        if !session.state.assistant_active() {
            return;
        }

        let text = screening::normalize_text(body);
        session.log.push(Turn::user(&text));
        info!(%channel, chars = text.len(), "triage message");

        // Apology-request filter: refuse without a model call.
        if screening::is_apology_request(&text) {
            self.send(channel, prompts::APOLOGY_REFUSAL).await;
            return;
        }

        // Cooperativeness classification, fail-open.
        if self.classify_uncooperative(&session.log).await {
            let rejected = session.state.record_strike();
            info!(%channel, strikes = session.state.strikes(), "uncooperative verdict");
            if rejected {
                self.send(channel, prompts::REJECTION_NOTICE).await;
                session.state.deactivate();
                return;
            }
        }

        if session.state.identifier().is_none() {
            self.identifier_stage(channel, &mut session, &text).await;
        } else {
            self.explanation_stage(channel, &mut session, &text).await;
        }
    }

    async fn handle_staff_message(&self, channel: ChannelId) {
        let session = {
            let sessions = self.sessions.lock().await;
            sessions.get(&channel).cloned()
        };
        let Some(session) = session else {
            return;
        };
        let mut session = session.lock().await;
        if session.state.assistant_active() {
            session.state.deactivate();
            if session.state.mark_staff_notified() {
                info!(%channel, "staff present, assistant standing down");
                self.send(channel, prompts::STAFF_PRESENT_NOTICE).await;
            }
        }
    }

    async fn author_is_staff(&self, author: UserId) -> bool {
        match self.gateway.member_roles(author).await {
            Ok(roles) => self.config.is_staff(&roles),
            Err(e) => {
                warn!(error = %e, %author, "role lookup failed, treating author as non-staff");
                false
            }
        }
    }

    /// True when the classifier says uncooperative. Any error or
    /// ambiguous output reads as cooperative — strikes lead to rejection,
    /// so the classifier must not produce false positives on a bad day.
    async fn classify_uncooperative(&self, log: &ConversationLog) -> bool {
        let verdict = self
            .completion
            .complete(
                prompts::CLASSIFIER_PREAMBLE,
                log.recent(CLASSIFIER_WINDOW),
                CompletionBudget::CLASSIFIER,
            )
            .await;
        match verdict {
            Ok(reply) => screening::parse_verdict(&reply) == Verdict::Uncooperative,
            Err(e) => {
                warn!(error = %e, "cooperativeness classifier failed, defaulting to cooperative");
                false
            }
        }
    }

    async fn identifier_stage(&self, channel: ChannelId, session: &mut Session, text: &str) {
        let Some(identifier) = screening::extract_identifier(text) else {
            self.send(channel, prompts::ASK_FOR_ID).await;
            return;
        };

        let detail = match self.lookup.resolve(identifier).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!(error = %e, identifier, "lookup failed, treating as miss");
                None
            }
        };
        let Some(detail) = detail else {
            self.send(channel, prompts::UNKNOWN_ID).await;
            return;
        };

        info!(%channel, identifier, player = %detail.player_name, "identifier resolved");

        let mut elaborated = self
            .elaborate_reason(&detail.player_name, &detail.reason)
            .await;

        // Evidence paraphrases land after the elaboration, never verbatim.
        let summaries = self
            .evidence
            .summarize_attachments(&detail.attachments)
            .await;
        if !summaries.is_empty() {
            elaborated.push(' ');
            elaborated.push_str(&summaries);
        }

        let reply = prompts::ban_reply(&detail.player_name, &elaborated);

        session.state.resolve_identifier(identifier);
        session.log.push(Turn::assistant(&reply));
        self.send(channel, &reply).await;
    }

    async fn elaborate_reason(&self, player_name: &str, reason: &str) -> String {
        let request = Turn::user(format!(
            "Player name: {player_name}\nBan reason (short): {reason}\n\n\
             Explain in the second person why this behavior is unacceptable, \
             without opening with a greeting or the player's name."
        ));
        match self
            .completion
            .complete(
                prompts::ELABORATION_PREAMBLE,
                &[request],
                CompletionBudget::REPLY,
            )
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "elaboration failed, using canned fallback");
                prompts::ELABORATION_FALLBACK.to_string()
            }
        }
    }

    async fn explanation_stage(&self, channel: ChannelId, session: &mut Session, text: &str) {
        if screening::is_sufficient_explanation(text) {
            self.send(channel, prompts::HANDOFF_NOTICE).await;
            session.state.advance(TriagePhase::HandedOff);
            info!(%channel, "explanation accepted, handed off to staff");
            return;
        }

        tokio::time::sleep(self.reply_delay).await;

        let reply = self
            .completion
            .complete(
                prompts::PERSONA_PREAMBLE,
                session.log.recent(PERSONA_WINDOW),
                CompletionBudget::REPLY,
            )
            .await;
        match reply {
            Ok(text) => {
                session.log.push(Turn::assistant(&text));
                self.send(channel, &text).await;
            }
            Err(e) => {
                warn!(error = %e, %channel, "persona reply failed");
                self.send(channel, prompts::COMPLETION_ERROR_NOTICE).await;
            }
        }
    }

    async fn send(&self, channel: ChannelId, text: &str) {
        if let Err(e) = self.gateway.send_message(channel, text).await {
            warn!(error = %e, %channel, "failed to send triage message");
        }
    }
}
