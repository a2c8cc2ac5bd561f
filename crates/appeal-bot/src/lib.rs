//! Ban-appeal ticket bot runtime.
//!
//! Wires the deterministic `ticketing` core to the external capabilities:
//! the chat-platform gateway, an OpenAI-compatible completion endpoint,
//! the external case-lookup service, and OCR text extraction. Everything
//! external sits behind a trait so tests substitute it in-process.

#![allow(clippy::uninlined_format_args)]

pub mod completion;
pub mod config;
pub mod evidence;
pub mod gateway;
pub mod gateway_http;
pub mod lifecycle;
pub mod lookup;
pub mod ocr;
pub mod prompts;
pub mod runtime;
pub mod triage;
