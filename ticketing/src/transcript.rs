//! Transcript rendering and the persistent transcript record.
//!
//! A transcript is the newline-joined rendering of every message in the
//! case channel, each line timestamped and attributed to a display name.
//! Captured at close and again at delete — duplicates are expected; the
//! "current" transcript is the one with the highest id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::case::CaseId;

/// One line of a captured channel history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub timestamp: DateTime<Utc>,
    pub display_name: String,
    pub text: String,
}

/// A persisted transcript row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub transcript_id: i64,
    pub case_id: CaseId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Render history lines as `[YYYY-MM-DD HH:MM:SS] name: text`, one per
/// line, chronological order as given.
pub fn render(lines: &[TranscriptLine]) -> String {
    lines
        .iter()
        .map(|l| {
            format!(
                "[{}] {}: {}",
                l.timestamp.format("%Y-%m-%d %H:%M:%S"),
                l.display_name,
                l.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn renders_timestamped_attributed_lines() {
        let lines = vec![
            TranscriptLine {
                timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 5).unwrap(),
                display_name: "Fritz".into(),
                text: "my id is AB12CD34EF56GH78".into(),
            },
            TranscriptLine {
                timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 9).unwrap(),
                display_name: "Secretary".into(),
                text: "thank you".into(),
            },
        ];
        let rendered = render(&lines);
        assert_eq!(
            rendered,
            "[2025-03-01 12:00:05] Fritz: my id is AB12CD34EF56GH78\n\
             [2025-03-01 12:00:09] Secretary: thank you"
        );
    }

    #[test]
    fn empty_history_renders_empty() {
        assert_eq!(render(&[]), "");
    }
}
