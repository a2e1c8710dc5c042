#![deny(
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

use std::path::PathBuf;
use thiserror::Error;

mod schema;

pub use schema::{
    AnthropicConfig, ChatConfig, Config, ENV_ANTHROPIC_API_KEY, ENV_ANTHROPIC_BASE_URL,
    ENV_ANTHROPIC_MODEL, ENV_AWS_REGION, ENV_KENDRA_ENDPOINT, ENV_KENDRA_INDEX_ID, KendraConfig,
    ProvidersConfig, RetrievalConfig,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    MissingCredential(&'static str),

    #[error("Cannot find home directory")]
    NoHomeDir,

    #[error("Config file not found at: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Config file already exists at: {}. Please edit it directly.", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
