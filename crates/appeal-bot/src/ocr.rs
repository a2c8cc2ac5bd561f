//! OCR text-extraction capability.
//!
//! Contract: given image bytes, produce extracted text, or an empty string
//! when nothing usable comes out. The shipped implementation shells out to
//! the `tesseract` binary via a temp file; any failure along the way reads
//! as "no text", never as an error the conversation has to handle.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::debug;

static STAGE_COUNTER: AtomicU64 = AtomicU64::new(0);

#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Empty string signals no usable text.
    async fn extract_text(&self, image: &[u8]) -> String;
}

pub struct TesseractExtractor {
    /// Language hint passed to tesseract (`-l`).
    language: String,
}

impl TesseractExtractor {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }
}

impl Default for TesseractExtractor {
    fn default() -> Self {
        Self::new("eng")
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    async fn extract_text(&self, image: &[u8]) -> String {
        let stamp = STAGE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "appeal-ocr-{}-{stamp}.img",
            std::process::id()
        ));

        if let Err(e) = tokio::fs::write(&path, image).await {
            debug!(error = %e, "failed to stage image for OCR");
            return String::new();
        }

        let output = tokio::process::Command::new("tesseract")
            .arg(&path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .await;

        let _ = tokio::fs::remove_file(&path).await;

        match output {
            Ok(out) if out.status.success() => {
                String::from_utf8_lossy(&out.stdout).trim().to_string()
            }
            Ok(out) => {
                debug!(status = %out.status, "tesseract exited non-zero");
                String::new()
            }
            Err(e) => {
                debug!(error = %e, "tesseract not runnable");
                String::new()
            }
        }
    }
}
