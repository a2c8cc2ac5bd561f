//! Chat-platform capability traits and event types.
//!
//! The bot is a consumer of the platform, never a server: outbound
//! operations go through [`ChatGateway`], inbound traffic arrives through
//! [`EventSource`]. Both are trait objects so tests run entirely
//! in-process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticketing::case::{ChannelId, MessageId, RoleId, UserId};
use ticketing::error::TicketError;

/// View/send grant for one principal on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub can_view: bool,
    pub can_send: bool,
}

impl Permissions {
    pub const READ_WRITE: Self = Self {
        can_view: true,
        can_send: true,
    };
    pub const READ_ONLY: Self = Self {
        can_view: true,
        can_send: false,
    };
    pub const NONE: Self = Self {
        can_view: false,
        can_send: false,
    };
}

/// One message of a fetched channel history, chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub author: UserId,
    pub display_name: String,
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

/// Staff action attached to the admin control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    OpenTicket,
    Claim,
    Close,
    Delete,
}

/// An inbound gateway event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GatewayEvent {
    Message {
        channel: ChannelId,
        author: UserId,
        display_name: String,
        body: String,
        /// Set for messages authored by bots, including this one.
        is_bot: bool,
    },
    Action {
        action: ActionKind,
        actor: UserId,
        display_name: String,
        channel: ChannelId,
    },
}

/// Outbound chat-platform operations.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_message(
        &self,
        channel: ChannelId,
        text: &str,
    ) -> Result<MessageId, TicketError>;

    async fn create_channel(
        &self,
        name: &str,
        parent: ChannelId,
    ) -> Result<ChannelId, TicketError>;

    async fn set_member_permissions(
        &self,
        channel: ChannelId,
        member: UserId,
        perms: Permissions,
    ) -> Result<(), TicketError>;

    async fn set_role_permissions(
        &self,
        channel: ChannelId,
        role: RoleId,
        perms: Permissions,
    ) -> Result<(), TicketError>;

    async fn move_channel(&self, channel: ChannelId, parent: ChannelId)
        -> Result<(), TicketError>;

    async fn rename_channel(&self, channel: ChannelId, name: &str) -> Result<(), TicketError>;

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), TicketError>;

    /// Full channel history, oldest first.
    async fn fetch_history(&self, channel: ChannelId)
        -> Result<Vec<HistoryEntry>, TicketError>;

    /// Role ids carried by a member. Staffness is derived from these.
    async fn member_roles(&self, member: UserId) -> Result<Vec<RoleId>, TicketError>;
}

/// Inbound event feed.
#[async_trait]
pub trait EventSource: Send {
    /// Next event, or `None` once the feed is closed.
    async fn next_event(&mut self) -> Option<GatewayEvent>;
}
