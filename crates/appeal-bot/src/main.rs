use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use appeal_bot::completion::OpenAiClient;
use appeal_bot::config::BotConfig;
use appeal_bot::evidence::EvidenceSummarizer;
use appeal_bot::gateway_http::{HttpEventSource, HttpGateway};
use appeal_bot::lifecycle::LifecycleController;
use appeal_bot::lookup::HttpLookupClient;
use appeal_bot::ocr::TesseractExtractor;
use appeal_bot::runtime::BotRuntime;
use appeal_bot::triage::TriageEngine;
use ticketing::postgres::PostgresStore;
use ticketing::store::{CaseStore, MemoryStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Arc::new(BotConfig::from_env().context("configuration incomplete")?);
    info!(
        gateway = %config.gateway_url,
        completion = %config.completion.url,
        lookup = %config.lookup_url,
        "appeal bot starting"
    );

    let store: Arc<dyn CaseStore> = match &config.database_url {
        Some(url) => Arc::new(
            PostgresStore::connect(url)
                .await
                .context("failed to connect to postgres")?,
        ),
        None => {
            warn!("APPEAL_DATABASE_URL is not set; using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let gateway = Arc::new(HttpGateway::new(&config.gateway_url, &config.gateway_token)?);
    let completion = Arc::new(OpenAiClient::new(
        &config.completion.url,
        &config.completion.api_key,
        &config.completion.model,
    )?);
    let lookup = Arc::new(HttpLookupClient::new(&config.lookup_url)?);
    let evidence = EvidenceSummarizer::new(
        Arc::new(TesseractExtractor::default()),
        completion.clone(),
    )?;

    let triage = Arc::new(TriageEngine::new(
        gateway.clone(),
        completion,
        lookup,
        evidence,
        store.clone(),
        config.clone(),
    ));
    let lifecycle = Arc::new(LifecycleController::new(
        gateway.clone(),
        store,
        triage.clone(),
        config.clone(),
    ));

    let source = HttpEventSource::new(&config.gateway_url, &config.gateway_token)?;
    let runtime = BotRuntime::new(gateway, lifecycle, triage);
    runtime.run(source).await;

    Ok(())
}
