//! System-prompt and canned-message constants for the triage assistant.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever preamble content
//! changes, so a logged agent reply can be traced to the prompt that
//! produced it.

/// Prompt version. Bump on any preamble content change.
pub const PROMPT_VERSION: &str = "1.2.0";

/// Cooperativeness classifier. Expects a single-word verdict; parsing is
/// lenient and fails open on anything else.
pub const CLASSIFIER_PREAMBLE: &str = "\
You are an evaluation assistant. Review the following messages briefly and \
decide whether the user is 'uncooperative' or not. Insults, aggressive \
behavior, or ignoring every question means uncooperative. If the user is \
reasonably polite and on-topic, they are cooperative. Reply with exactly \
one word: 'uncooperative' or 'cooperative'.";

/// Ban-reason elaboration: second-person, empathetic but firm, no fresh
/// greeting (the surrounding message already addresses the player).
pub const ELABORATION_PREAMBLE: &str = "\
You are a friendly but strict game-community moderator. You are given a \
player's ban reason and must explain to them why the behavior is a problem. \
Address the player directly and informally in the second person, but do not \
open with a greeting or repeat their name.";

/// Persona for follow-up questions while the explanation is insufficient.
pub const PERSONA_PREAMBLE: &str = "\
You are the ticket assistant of a game community, serious but friendly. \
Address the user informally in the second person. Ask for more detail about \
what led to the ban. If the user asks you to write an apology or statement \
for them, refuse.";

/// Evidence summarizer: short paraphrase, never verbatim quotes.
pub const EVIDENCE_SUMMARY_PREAMBLE: &str = "\
You are an assistant that produces a short summary of the following \
OCR-extracted text. Do not quote long passages verbatim; paraphrase in one \
or two sentences.";

// Canned channel messages.

pub const GREETING: &str = "\
Hello, I am the appeal assistant. Please start by giving me your **ID** so \
I can look up your ban reason.";

pub const ASK_FOR_ID: &str = "\
Please give me your **ID** first so I can check your ban reason.";

pub const UNKNOWN_ID: &str = "\
I do not recognize this ID. Please check it or give me a different one.";

pub const APOLOGY_REFUSAL: &str = "\
I'm sorry, but I cannot help you write an apology or statement. Please \
explain in your own words what happened.";

pub const REJECTION_NOTICE: &str = "\
Your answers have repeatedly shown no insight into what happened. We are \
rejecting your unban request. Please understand.";

pub const STAFF_PRESENT_NOTICE: &str = "\
A supporter or administrator is now present. I will stop responding.";

pub const HANDOFF_NOTICE: &str = "\
Thank you for the detailed explanation. I am passing this on to the support \
team now.";

pub const COMPLETION_ERROR_NOTICE: &str = "\
Sorry, something went wrong while generating a reply.";

/// Fallback when the elaboration call fails: a canned explanation so the
/// lookup hit still produces a useful message.
pub const ELABORATION_FALLBACK: &str = "\
Your behavior goes against our community guidelines and damages the \
atmosphere for everyone. Please explain how it came to this from your \
point of view.";

/// Appended to every elaborated ban reason; the appeal prompt is issued in
/// the same message as the reason.
pub const APPEAL_PROMPT: &str = "\
Please submit your **unban request** now: why should you be unbanned, and \
how do you see your behavior?";

pub const ENTRY_MESSAGE: &str = "\
Click the button to open a new ticket. If you were banned, please have your \
ID ready so we can look up your case.";

pub const CLOSING_NOTICE: &str = "Ticket is being closed. Please do not write here anymore.";

pub const TRANSCRIPT_SAVED_NOTICE: &str = "A transcript has been captured and stored.";

pub const CLOSED_NOTICE: &str = "Ticket is now closed.";

pub const DELETING_NOTICE: &str = "Ticket channel is being deleted...";

/// Welcome posted into a fresh ticket channel, above the admin controls.
pub fn welcome_message(case_id: ticketing::case::CaseId, owner_name: &str) -> String {
    format!(
        "**Ticket #{case_id}** — welcome {owner_name}! Please describe your \
         concern briefly. If you were banned, make sure to tell us your ID so \
         we can check the ban reason."
    )
}

/// Handoff line naming the staff audience, mirrored by the handoff notice.
pub fn claim_announcement(case_id: ticketing::case::CaseId, claimer_name: &str) -> String {
    format!("Ticket #{case_id} has been claimed by {claimer_name}.")
}

/// The combined lookup-hit message: player address, elaborated reason,
/// then the appeal prompt — one outbound message by design.
pub fn ban_reply(player_name: &str, elaborated_reason: &str) -> String {
    format!("Hello **{player_name}**,\n\n{elaborated_reason}\n\n{APPEAL_PROMPT}")
}
