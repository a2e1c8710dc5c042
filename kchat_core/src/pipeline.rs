//! The answering seam between the session loop and the backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::history::Turn;

/// A supporting document returned by a [`Retriever`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Text handed to the language model.
    pub page_content: String,
    /// Where the document came from, usually a URI.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Backend-specific relevance label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
}

impl Document {
    #[must_use]
    pub fn new(page_content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            source: source.into(),
            title: None,
            score: None,
        }
    }
}

/// Output of one pipeline call.
#[derive(Debug, Clone, Default)]
pub struct AnswerResult {
    pub answer: String,
    pub source_documents: Vec<Document>,
    /// Standalone form of the question that was actually retrieved against.
    pub generated_question: Option<String>,
}

impl AnswerResult {
    #[must_use]
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            ..Self::default()
        }
    }

    /// Source identifiers in retrieval order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.source_documents.iter().map(|d| d.source.as_str())
    }
}

#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> anyhow::Result<Vec<Document>>;
}

/// Turns a question plus prior turns into a grounded answer.
#[async_trait]
pub trait AnsweringPipeline: Send + Sync {
    async fn answer(&self, question: &str, history: &[Turn]) -> anyhow::Result<AnswerResult>;
}
