//! Natural-language explanations for soil assessments.
//!
//! Generation runs in the background after an assessment is created. Every
//! score ends with a stored explanation: generated text on success, a
//! deterministic fallback otherwise.

mod client;
mod prompt;
mod service;

use thiserror::Error;

pub use client::{Generated, HuggingFaceClient, TextGenerator};
pub use prompt::{build_general_prompt, build_prompt, fallback_explanation, general_advice};
pub use service::ExplanationService;

#[derive(Debug, Error)]
pub enum ExplanationError {
    #[error("text generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("text generation API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("text generation returned an empty response")]
    EmptyResponse,
}
