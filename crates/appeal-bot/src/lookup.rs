//! External case-lookup capability.
//!
//! `GET {base}/detail/{identifier}` keyed by the user-supplied identifier.
//! A non-200 status, transport failure, or a record without a reason all
//! read as "not found" — a single attempt, no retry, so the conversation
//! stays responsive. Transient network failures are deliberately not
//! distinguished from true absence.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use ticketing::error::TicketError;
use tracing::debug;

/// Ban record for a resolved identifier.
#[derive(Debug, Clone, Deserialize)]
pub struct CaseDetail {
    #[serde(default = "unknown_player")]
    pub player_name: String,
    pub reason: String,
    #[serde(default)]
    pub attachments: Vec<String>,
}

fn unknown_player() -> String {
    "unknown".to_string()
}

#[async_trait]
pub trait LookupClient: Send + Sync {
    /// `Ok(None)` covers every flavor of miss.
    async fn resolve(&self, identifier: &str) -> Result<Option<CaseDetail>, TicketError>;
}

pub struct HttpLookupClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLookupClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TicketError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| TicketError::CapabilityUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[derive(Deserialize)]
struct WireDetail {
    reason: Option<String>,
    player_name: Option<String>,
    #[serde(default)]
    attachments: Vec<String>,
}

#[async_trait]
impl LookupClient for HttpLookupClient {
    async fn resolve(&self, identifier: &str) -> Result<Option<CaseDetail>, TicketError> {
        let url = format!("{}/detail/{identifier}", self.base_url);
        let resp = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, identifier, "lookup transport failure, treating as miss");
                return Ok(None);
            }
        };

        if !resp.status().is_success() {
            debug!(status = %resp.status(), identifier, "lookup miss");
            return Ok(None);
        }

        let wire: WireDetail = match resp.json().await {
            Ok(w) => w,
            Err(e) => {
                debug!(error = %e, identifier, "lookup body unreadable, treating as miss");
                return Ok(None);
            }
        };

        match wire.reason {
            Some(reason) if !reason.is_empty() => Ok(Some(CaseDetail {
                player_name: wire.player_name.unwrap_or_else(unknown_player),
                reason,
                attachments: wire.attachments,
            })),
            _ => Ok(None),
        }
    }
}
