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

//! Document retrieval from Amazon Kendra.

use thiserror::Error;

mod kendra;
pub mod sigv4;

pub use kendra::KendraRetriever;
pub use sigv4::AwsCredentials;

#[derive(Debug, Error)]
pub enum KendraError {
    #[error(
        "AWS credentials not found (set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY, or configure ~/.aws/credentials)"
    )]
    MissingCredentials,

    #[error("Invalid Kendra endpoint: {0}")]
    Endpoint(String),

    #[error("Kendra request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Kendra {kind} ({status}): {message}")]
    Service {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("Invalid Kendra payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl KendraError {
    /// Build a service error from a JSON-1.1 error body.
    ///
    /// `__type` looks like `com.amazonaws.kendra#ThrottlingException`.
    fn from_response(status: u16, body: &str) -> Self {
        let parsed: serde_json::Value = serde_json::from_str(body).unwrap_or_default();

        let kind = parsed["__type"]
            .as_str()
            .map(|t| t.rsplit('#').next().unwrap_or(t))
            .map(|t| t.split(':').next().unwrap_or(t))
            .unwrap_or("UnknownError")
            .to_string();
        let message = parsed["message"]
            .as_str()
            .or_else(|| parsed["Message"].as_str())
            .unwrap_or(body)
            .to_string();

        Self::Service {
            status,
            kind,
            message,
        }
    }
}
