//! Postgres-backed `CaseStore`.
//!
//! Identity columns are stored as text — platform ids are 64-bit unsigned
//! snowflakes and do not fit a signed bigint cleanly. Every operation is a
//! single-row statement; the store never opens cross-row transactions.

use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, Row};
use tracing::error;

use crate::case::{Case, CaseId, CaseStatus, ChannelId, MessageId, UserId};
use crate::error::TicketError;
use crate::store::CaseStore;
use crate::transcript::Transcript;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cases (
    id INTEGER PRIMARY KEY,
    owner_user_id TEXT NOT NULL,
    owner_display_name TEXT NOT NULL,
    channel_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'open',
    claimed_by TEXT,
    admin_message_id TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS transcripts (
    transcript_id BIGSERIAL PRIMARY KEY,
    case_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

pub struct PostgresStore {
    client: Client,
}

impl PostgresStore {
    /// Connect and ensure the schema exists. The connection task is
    /// spawned onto the runtime; a broken connection surfaces as storage
    /// errors on the next statement.
    pub async fn connect(url: &str) -> Result<Self, TicketError> {
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| TicketError::Storage(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "postgres connection terminated");
            }
        });

        client
            .batch_execute(SCHEMA)
            .await
            .map_err(|e| TicketError::Storage(e.to_string()))?;

        Ok(Self { client })
    }
}

fn storage_err(e: tokio_postgres::Error) -> TicketError {
    TicketError::Storage(e.to_string())
}

fn parse_id(text: &str) -> u64 {
    text.parse().unwrap_or(0)
}

fn row_to_case(row: &Row) -> Case {
    let owner: String = row.get("owner_user_id");
    let channel: String = row.get("channel_id");
    let claimed: Option<String> = row.get("claimed_by");
    let admin_msg: Option<String> = row.get("admin_message_id");
    let status: String = row.get("status");

    Case {
        id: CaseId(row.get::<_, i32>("id")),
        owner_user_id: UserId(parse_id(&owner)),
        owner_display_name: row.get("owner_display_name"),
        channel_id: ChannelId(parse_id(&channel)),
        status: CaseStatus::parse(&status).unwrap_or(CaseStatus::Open),
        claimed_by: claimed.map(|c| UserId(parse_id(&c))),
        admin_message_id: admin_msg.map(|m| MessageId(parse_id(&m))),
        created_at: row.get("created_at"),
    }
}

fn row_to_transcript(row: &Row) -> Transcript {
    Transcript {
        transcript_id: row.get::<_, i64>("transcript_id"),
        case_id: CaseId(row.get::<_, i32>("case_id")),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl CaseStore for PostgresStore {
    async fn next_case_id(&self) -> Result<CaseId, TicketError> {
        let row = self
            .client
            .query_one("SELECT COALESCE(MAX(id), 0) AS max_id FROM cases", &[])
            .await
            .map_err(storage_err)?;
        Ok(CaseId(row.get::<_, i32>("max_id") + 1))
    }

    async fn insert_case(&self, case: &Case) -> Result<(), TicketError> {
        self.client
            .execute(
                "INSERT INTO cases (id, owner_user_id, owner_display_name, channel_id, status, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
                &[
                    &case.id.0,
                    &case.owner_user_id.to_string(),
                    &case.owner_display_name,
                    &case.channel_id.to_string(),
                    &case.status.as_str(),
                    &case.created_at,
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn set_admin_message(
        &self,
        id: CaseId,
        message: MessageId,
    ) -> Result<(), TicketError> {
        self.client
            .execute(
                "UPDATE cases SET admin_message_id = $1 WHERE id = $2",
                &[&message.to_string(), &id.0],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn set_status(&self, id: CaseId, status: CaseStatus) -> Result<(), TicketError> {
        self.client
            .execute(
                "UPDATE cases SET status = $1 WHERE id = $2",
                &[&status.as_str(), &id.0],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn set_claimed(&self, id: CaseId, claimer: UserId) -> Result<(), TicketError> {
        self.client
            .execute(
                "UPDATE cases SET status = 'claimed', claimed_by = $1 WHERE id = $2",
                &[&claimer.to_string(), &id.0],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn case_by_id(&self, id: CaseId) -> Result<Option<Case>, TicketError> {
        let row = self
            .client
            .query_opt("SELECT * FROM cases WHERE id = $1", &[&id.0])
            .await
            .map_err(storage_err)?;
        Ok(row.as_ref().map(row_to_case))
    }

    async fn case_by_channel(&self, channel: ChannelId) -> Result<Option<Case>, TicketError> {
        let row = self
            .client
            .query_opt(
                "SELECT * FROM cases WHERE channel_id = $1",
                &[&channel.to_string()],
            )
            .await
            .map_err(storage_err)?;
        Ok(row.as_ref().map(row_to_case))
    }

    async fn save_transcript(&self, id: CaseId, content: &str) -> Result<i64, TicketError> {
        let row = self
            .client
            .query_one(
                "INSERT INTO transcripts (case_id, content) VALUES ($1, $2)
                 RETURNING transcript_id",
                &[&id.0, &content],
            )
            .await
            .map_err(storage_err)?;
        Ok(row.get::<_, i64>("transcript_id"))
    }

    async fn latest_transcript(&self, id: CaseId) -> Result<Option<Transcript>, TicketError> {
        let row = self
            .client
            .query_opt(
                "SELECT * FROM transcripts WHERE case_id = $1
                 ORDER BY transcript_id DESC LIMIT 1",
                &[&id.0],
            )
            .await
            .map_err(storage_err)?;
        Ok(row.as_ref().map(row_to_transcript))
    }

    async fn transcripts(&self, id: CaseId) -> Result<Vec<Transcript>, TicketError> {
        let rows = self
            .client
            .query(
                "SELECT * FROM transcripts WHERE case_id = $1 ORDER BY transcript_id ASC",
                &[&id.0],
            )
            .await
            .map_err(storage_err)?;
        Ok(rows.iter().map(row_to_transcript).collect())
    }

    async fn save_setting(&self, key: &str, value: &str) -> Result<(), TicketError> {
        self.client
            .execute(
                "INSERT INTO settings (key, value) VALUES ($1, $2)
                 ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
                &[&key, &value],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, TicketError> {
        let row = self
            .client
            .query_opt("SELECT value FROM settings WHERE key = $1", &[&key])
            .await
            .map_err(storage_err)?;
        Ok(row.map(|r| r.get("value")))
    }
}
