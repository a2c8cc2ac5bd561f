//! Evidence summarizer — OCR plus paraphrase for ban-record attachments.
//!
//! Each attachment is handled independently: fetch bytes, extract text,
//! paraphrase non-empty text through the model. Failures at any step
//! contribute an empty summary and are skipped silently; raw OCR text is
//! never shown to the end user.

use std::sync::Arc;
use std::time::Duration;

use ticketing::conversation::Turn;
use ticketing::error::TicketError;
use tracing::debug;

use crate::completion::{CompletionBudget, CompletionClient};
use crate::ocr::TextExtractor;
use crate::prompts;

pub struct EvidenceSummarizer {
    http: reqwest::Client,
    extractor: Arc<dyn TextExtractor>,
    completion: Arc<dyn CompletionClient>,
}

impl EvidenceSummarizer {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        completion: Arc<dyn CompletionClient>,
    ) -> Result<Self, TicketError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TicketError::CapabilityUnavailable(e.to_string()))?;
        Ok(Self {
            http,
            extractor,
            completion,
        })
    }

    /// Space-joined non-empty paraphrases of all attachments, or an empty
    /// string when nothing usable was found.
    pub async fn summarize_attachments(&self, urls: &[String]) -> String {
        let mut summaries = Vec::new();
        for url in urls {
            let summary = self.summarize_one(url).await;
            if !summary.is_empty() {
                summaries.push(summary);
            }
        }
        summaries.join(" ")
    }

    async fn summarize_one(&self, url: &str) -> String {
        let bytes = match self.http.get(url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.bytes().await {
                Ok(b) => b,
                Err(e) => {
                    debug!(error = %e, url, "attachment body unreadable");
                    return String::new();
                }
            },
            Ok(resp) => {
                debug!(status = %resp.status(), url, "attachment fetch failed");
                return String::new();
            }
            Err(e) => {
                debug!(error = %e, url, "attachment fetch failed");
                return String::new();
            }
        };

        let text = self.extractor.extract_text(&bytes).await;
        if text.trim().is_empty() {
            debug!(url, "no usable text in attachment");
            return String::new();
        }

        let request = Turn::user(format!("OCR text:\n{text}\n\nWrite a short summary:"));
        match self
            .completion
            .complete(
                prompts::EVIDENCE_SUMMARY_PREAMBLE,
                &[request],
                CompletionBudget::SUMMARY,
            )
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                debug!(error = %e, url, "evidence summary failed, skipping");
                String::new()
            }
        }
    }
}
