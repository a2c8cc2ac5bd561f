//! Event routing — one logical worker per inbound event.
//!
//! Actions go to the lifecycle controller, messages to the triage engine.
//! Failures are reported back into the originating channel using the
//! taxonomy's user notices; nothing here retries.

use std::sync::Arc;

use ticketing::case::ChannelId;
use ticketing::error::TicketError;
use tracing::{info, warn};

use crate::gateway::{ActionKind, ChatGateway, EventSource, GatewayEvent};
use crate::lifecycle::LifecycleController;
use crate::triage::TriageEngine;

pub struct BotRuntime {
    gateway: Arc<dyn ChatGateway>,
    lifecycle: Arc<LifecycleController>,
    triage: Arc<TriageEngine>,
}

impl BotRuntime {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        lifecycle: Arc<LifecycleController>,
        triage: Arc<TriageEngine>,
    ) -> Self {
        Self {
            gateway,
            lifecycle,
            triage,
        }
    }

    /// Drain the event feed until it closes.
    pub async fn run(&self, mut source: impl EventSource) {
        info!("runtime started, draining events");
        while let Some(event) = source.next_event().await {
            self.dispatch(event).await;
        }
        info!("event feed closed, runtime stopping");
    }

    /// Route one event. Message handling for a channel is serialized by
    /// the triage engine's per-channel session lock; cross-channel events
    /// are independent.
    pub async fn dispatch(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::Message {
                channel,
                author,
                body,
                is_bot,
                ..
            } => {
                if is_bot {
                    return;
                }
                self.triage.handle_message(channel, author, &body).await;
            }
            GatewayEvent::Action {
                action,
                actor,
                display_name,
                channel,
            } => {
                let outcome = match action {
                    ActionKind::OpenTicket => self
                        .lifecycle
                        .open_case(actor, &display_name)
                        .await
                        .map(|_| ()),
                    ActionKind::Claim => {
                        self.lifecycle.claim_case(actor, &display_name, channel).await
                    }
                    ActionKind::Close => self.lifecycle.close_case(actor, channel).await,
                    ActionKind::Delete => self.lifecycle.delete_case(actor, channel).await,
                };
                if let Err(e) = outcome {
                    self.report_failure(channel, &e).await;
                }
            }
        }
    }

    async fn report_failure(&self, channel: ChannelId, error: &TicketError) {
        warn!(%channel, error = %error, "action failed");
        if let Err(e) = self
            .gateway
            .send_message(channel, error.user_notice())
            .await
        {
            warn!(%channel, error = %e, "could not report failure to channel");
        }
    }
}
