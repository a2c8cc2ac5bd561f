//! Reqwest-backed implementation of the gateway traits.
//!
//! Talks to the platform adapter's REST surface. The JSON bodies mirror
//! the capability shapes one to one; the adapter owns the actual platform
//! protocol. Events arrive via long-poll on `GET /events?after=<cursor>`.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use ticketing::case::{ChannelId, MessageId, RoleId, UserId};
use ticketing::error::TicketError;
use tracing::warn;

use crate::gateway::{ChatGateway, EventSource, GatewayEvent, HistoryEntry, Permissions};

fn gateway_err(e: reqwest::Error) -> TicketError {
    TicketError::CapabilityUnavailable(e.to_string())
}

fn status_err(status: reqwest::StatusCode) -> TicketError {
    TicketError::CapabilityUnavailable(format!("gateway returned {status}"))
}

#[derive(Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, TicketError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(gateway_err)?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, TicketError> {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(gateway_err)?;
        if !resp.status().is_success() {
            return Err(status_err(resp.status()));
        }
        resp.json::<T>().await.map_err(gateway_err)
    }

    async fn post_ok(&self, path: &str, body: serde_json::Value) -> Result<(), TicketError> {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(gateway_err)?;
        if !resp.status().is_success() {
            return Err(status_err(resp.status()));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct IdReply {
    id: u64,
}

#[async_trait]
impl ChatGateway for HttpGateway {
    async fn send_message(
        &self,
        channel: ChannelId,
        text: &str,
    ) -> Result<MessageId, TicketError> {
        let reply: IdReply = self
            .post_json(
                &format!("/channels/{channel}/messages"),
                serde_json::json!({ "text": text }),
            )
            .await?;
        Ok(MessageId(reply.id))
    }

    async fn create_channel(
        &self,
        name: &str,
        parent: ChannelId,
    ) -> Result<ChannelId, TicketError> {
        let reply: IdReply = self
            .post_json(
                "/channels",
                serde_json::json!({ "name": name, "parent": parent.0 }),
            )
            .await?;
        Ok(ChannelId(reply.id))
    }

    async fn set_member_permissions(
        &self,
        channel: ChannelId,
        member: UserId,
        perms: Permissions,
    ) -> Result<(), TicketError> {
        self.post_ok(
            &format!("/channels/{channel}/permissions"),
            serde_json::json!({
                "member": member.0,
                "can_view": perms.can_view,
                "can_send": perms.can_send,
            }),
        )
        .await
    }

    async fn set_role_permissions(
        &self,
        channel: ChannelId,
        role: RoleId,
        perms: Permissions,
    ) -> Result<(), TicketError> {
        self.post_ok(
            &format!("/channels/{channel}/permissions"),
            serde_json::json!({
                "role": role.0,
                "can_view": perms.can_view,
                "can_send": perms.can_send,
            }),
        )
        .await
    }

    async fn move_channel(
        &self,
        channel: ChannelId,
        parent: ChannelId,
    ) -> Result<(), TicketError> {
        self.post_ok(
            &format!("/channels/{channel}/move"),
            serde_json::json!({ "parent": parent.0 }),
        )
        .await
    }

    async fn rename_channel(&self, channel: ChannelId, name: &str) -> Result<(), TicketError> {
        self.post_ok(
            &format!("/channels/{channel}/rename"),
            serde_json::json!({ "name": name }),
        )
        .await
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), TicketError> {
        let resp = self
            .client
            .delete(self.url(&format!("/channels/{channel}")))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(gateway_err)?;
        if !resp.status().is_success() {
            return Err(status_err(resp.status()));
        }
        Ok(())
    }

    async fn fetch_history(
        &self,
        channel: ChannelId,
    ) -> Result<Vec<HistoryEntry>, TicketError> {
        let resp = self
            .client
            .get(self.url(&format!("/channels/{channel}/history")))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(gateway_err)?;
        if !resp.status().is_success() {
            return Err(status_err(resp.status()));
        }
        resp.json::<Vec<HistoryEntry>>().await.map_err(gateway_err)
    }

    async fn member_roles(&self, member: UserId) -> Result<Vec<RoleId>, TicketError> {
        let resp = self
            .client
            .get(self.url(&format!("/members/{member}/roles")))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(gateway_err)?;
        if !resp.status().is_success() {
            return Err(status_err(resp.status()));
        }
        let ids: Vec<u64> = resp.json().await.map_err(gateway_err)?;
        Ok(ids.into_iter().map(RoleId).collect())
    }
}

/// Long-polling event feed over the same REST surface.
pub struct HttpEventSource {
    client: reqwest::Client,
    base_url: String,
    token: String,
    cursor: u64,
    pending: VecDeque<GatewayEvent>,
}

#[derive(Deserialize)]
struct EventBatch {
    cursor: u64,
    events: Vec<GatewayEvent>,
}

impl HttpEventSource {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, TicketError> {
        let client = reqwest::Client::builder()
            // Long-poll requests hold for up to 60s server-side.
            .timeout(Duration::from_secs(90))
            .build()
            .map_err(gateway_err)?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
            cursor: 0,
            pending: VecDeque::new(),
        })
    }

    async fn poll_once(&mut self) -> Result<Vec<GatewayEvent>, TicketError> {
        let url = format!("{}/events?after={}", self.base_url, self.cursor);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(gateway_err)?;
        if !resp.status().is_success() {
            return Err(status_err(resp.status()));
        }
        let batch: EventBatch = resp.json().await.map_err(gateway_err)?;
        self.cursor = batch.cursor;
        Ok(batch.events)
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn next_event(&mut self) -> Option<GatewayEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        loop {
            match self.poll_once().await {
                Ok(events) if !events.is_empty() => {
                    self.pending.extend(events);
                    return self.pending.pop_front();
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!(error = %e, "event poll failed; backing off");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }
}
