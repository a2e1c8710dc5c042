#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Conversational retrieval QA over a bounded history.
//!
//! # Key Features
//! - Follow-up questions condensed into standalone queries
//! - Answers grounded in retrieved documents, with their sources
//! - "new search:" marker to drop prior context
//! - Line-oriented interactive loop over any reader and writer

use thiserror::Error;

mod chain;
pub mod prompts;
pub mod render;
mod session;

pub use chain::ConversationalRetrievalChain;
pub use render::{Style, paint};
pub use session::{
    ChatSession, FAREWELL, GREETING, PROMPT_MARKER, PROMPT_MESSAGE, SessionConfig,
};

/// Errors that end a conversation.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("Answering pipeline error: {0}")]
    Pipeline(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid new-search prefix: {0}")]
    InvalidPrefix(#[from] regex::Error),
}
