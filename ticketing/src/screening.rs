//! Deterministic screening heuristics for the triage engine.
//!
//! These are pure functions over normalized message text: control-character
//! stripping, identifier extraction, the apology-request filter, the
//! explanation-sufficiency rule, and lenient parsing of the cooperation
//! classifier's verdict.

use std::sync::OnceLock;

use regex::Regex;

fn control_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Unicode category C covers control, format (zero-width etc.),
    // surrogate, and unassigned characters. Pasted identifiers routinely
    // carry invisible format characters that defeat the identifier regex.
    RE.get_or_init(|| Regex::new(r"\p{C}").expect("valid regex"))
}

fn identifier_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[a-zA-Z0-9]{16,}\b").expect("valid regex"))
}

/// Strip invisible and control characters so identifier matching works on
/// pasted text.
pub fn normalize_text(text: &str) -> String {
    control_chars().replace_all(text, "").into_owned()
}

/// First word-boundary-delimited alphanumeric run of length >= 16, if any.
pub fn extract_identifier(text: &str) -> Option<&str> {
    identifier_pattern().find(text).map(|m| m.as_str())
}

/// Phrases that indicate the user wants the assistant to draft an apology
/// or statement on their behalf. Matched case-insensitively as substrings.
const APOLOGY_PHRASES: &[&str] = &[
    "write an apology",
    "write me an apology",
    "write a statement",
    "formulate",
    "help me write",
];

/// Whether the user is asking the assistant to draft an apology/statement.
pub fn is_apology_request(text: &str) -> bool {
    let lower = text.to_lowercase();
    APOLOGY_PHRASES.iter().any(|p| lower.contains(p))
}

/// Explanatory connectives that an adequate self-explanation is expected
/// to contain. A crude proxy for "adequate", kept as-is on purpose.
const CONNECTIVE_PHRASES: &[&str] = &["because", "i have"];

/// Sufficiency rule: at least 10 whitespace-delimited tokens and at least
/// one explanatory connective, case-insensitive.
pub fn is_sufficient_explanation(text: &str) -> bool {
    let words = text.split_whitespace().count();
    if words < 10 {
        return false;
    }
    let lower = text.to_lowercase();
    CONNECTIVE_PHRASES.iter().any(|p| lower.contains(p))
}

/// Cooperation verdict from the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Cooperative,
    Uncooperative,
}

/// Lenient parse of the classifier's single-word reply.
///
/// Containment beats prefix, and anything unrecognized counts as
/// cooperative: the classifier fails open so an ambiguous or erroring
/// model never costs the user a strike.
pub fn parse_verdict(reply: &str) -> Verdict {
    let lower = reply.trim().to_lowercase();
    if lower.contains("uncooperative") {
        Verdict::Uncooperative
    } else if lower.contains("cooperative") {
        Verdict::Cooperative
    } else if lower.starts_with("un") {
        Verdict::Uncooperative
    } else {
        Verdict::Cooperative
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_invisible_characters() {
        // Zero-width space and zero-width non-joiner inside an identifier.
        let dirty = "AB12\u{200b}CD34EF56\u{200c}GH78";
        assert_eq!(normalize_text(dirty), "AB12CD34EF56GH78");
    }

    #[test]
    fn normalize_keeps_ordinary_text() {
        assert_eq!(normalize_text("hello wörld 42"), "hello wörld 42");
    }

    #[test]
    fn extracts_exactly_the_qualifying_run() {
        let text = "my id is AB12CD34EF56GH78 thanks";
        assert_eq!(extract_identifier(text), Some("AB12CD34EF56GH78"));
    }

    #[test]
    fn short_runs_do_not_qualify() {
        assert_eq!(extract_identifier("id: ABCDEF123456789"), None); // 15 chars
        assert_eq!(extract_identifier("no id here at all"), None);
    }

    #[test]
    fn first_of_several_runs_wins() {
        let text = "AAAA1111BBBB2222 then CCCC3333DDDD4444";
        assert_eq!(extract_identifier(text), Some("AAAA1111BBBB2222"));
    }

    #[test]
    fn apology_requests_are_detected_case_insensitively() {
        assert!(is_apology_request("Can you WRITE ME AN APOLOGY please"));
        assert!(is_apology_request("please help me write something for the admins"));
        assert!(!is_apology_request("I am sorry for what I did"));
    }

    #[test]
    fn sufficiency_needs_length_and_a_connective() {
        assert!(is_sufficient_explanation(
            "I was banned because I used offensive language towards another player repeatedly"
        ));
        // Connective present but too short.
        assert!(!is_sufficient_explanation("because I was angry"));
        // Long enough but no connective.
        assert!(!is_sufficient_explanation(
            "it just happened and then everyone got upset at me somehow yesterday evening"
        ));
    }

    #[test]
    fn verdict_parsing_is_lenient_and_fails_open() {
        assert_eq!(parse_verdict("uncooperative"), Verdict::Uncooperative);
        assert_eq!(parse_verdict("The user is UNCOOPERATIVE."), Verdict::Uncooperative);
        assert_eq!(parse_verdict("cooperative"), Verdict::Cooperative);
        assert_eq!(parse_verdict("unwilling"), Verdict::Uncooperative);
        assert_eq!(parse_verdict("hmm, hard to say"), Verdict::Cooperative);
        assert_eq!(parse_verdict(""), Verdict::Cooperative);
    }
}
