use anyhow::{bail, Context, Result};
use ticketing::case::{ChannelId, RoleId};

/// Completion endpoint configuration (OpenAI-compatible chat API).
#[derive(Debug, Clone)]
pub struct CompletionEndpoint {
    pub url: String,
    pub api_key: String,
    pub model: String,
}

/// Top-level bot configuration, assembled from the environment.
///
/// The gateway token is the only mandatory piece — the process refuses to
/// start without it rather than run degraded. Everything else has a
/// default or degrades with a warning at the call site.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Platform adapter REST base URL.
    pub gateway_url: String,
    /// Platform credential. Mandatory.
    pub gateway_token: String,
    /// OpenAI-compatible completion endpoint.
    pub completion: CompletionEndpoint,
    /// Case-lookup service base URL (`GET {base}/detail/{id}`).
    pub lookup_url: String,
    /// Postgres connection string. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    /// Roles carrying the staff capability.
    pub support_role: RoleId,
    pub admin_role: RoleId,
    /// Read-only audience granted view access on every ticket channel.
    pub viewer_role: RoleId,
    /// Category groupings for the three live lifecycle stages.
    pub open_category: ChannelId,
    pub claimed_category: ChannelId,
    pub closed_category: ChannelId,
}

fn env_id(key: &str) -> Result<u64> {
    match std::env::var(key) {
        Ok(v) => v
            .parse::<u64>()
            .with_context(|| format!("{key} is not a numeric id: {v:?}")),
        Err(_) => Ok(0),
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        let gateway_token = match std::env::var("APPEAL_GATEWAY_TOKEN") {
            Ok(t) if !t.is_empty() => t,
            _ => bail!("APPEAL_GATEWAY_TOKEN is not set; refusing to start"),
        };

        let completion = CompletionEndpoint {
            url: std::env::var("APPEAL_COMPLETION_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            api_key: std::env::var("APPEAL_COMPLETION_API_KEY").unwrap_or_default(),
            model: std::env::var("APPEAL_COMPLETION_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".into()),
        };
        if completion.api_key.is_empty() {
            tracing::warn!("APPEAL_COMPLETION_API_KEY is not set; completion calls will fail and fall back");
        }

        Ok(Self {
            gateway_url: std::env::var("APPEAL_GATEWAY_URL")
                .unwrap_or_else(|_| "http://localhost:8200".into()),
            gateway_token,
            completion,
            lookup_url: std::env::var("APPEAL_LOOKUP_URL")
                .unwrap_or_else(|_| "http://api.hackletloose.eu".into()),
            database_url: std::env::var("APPEAL_DATABASE_URL").ok(),
            support_role: RoleId(env_id("APPEAL_SUPPORT_ROLE_ID")?),
            admin_role: RoleId(env_id("APPEAL_ADMIN_ROLE_ID")?),
            viewer_role: RoleId(env_id("APPEAL_VIEWER_ROLE_ID")?),
            open_category: ChannelId(env_id("APPEAL_OPEN_CATEGORY_ID")?),
            claimed_category: ChannelId(env_id("APPEAL_CLAIMED_CATEGORY_ID")?),
            closed_category: ChannelId(env_id("APPEAL_CLOSED_CATEGORY_ID")?),
        })
    }

    /// Whether a member carrying these roles has the staff capability.
    pub fn is_staff(&self, roles: &[RoleId]) -> bool {
        roles
            .iter()
            .any(|r| *r == self.support_role || *r == self.admin_role)
    }
}
