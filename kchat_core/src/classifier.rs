//! Detects the "new search:" marker that starts a fresh topic.

use regex::{Regex, RegexBuilder};

pub const DEFAULT_NEW_SEARCH_PREFIX: &str = "new search:";

/// What the loop should do with its history before answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Drop prior turns.
    Reset,
    Continue,
}

/// Result of classifying one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub intent: Intent,
    /// Question to send downstream. May be empty.
    pub question: String,
}

/// Matches a case-insensitive reset prefix at the start of a line.
#[derive(Debug, Clone)]
pub struct QueryClassifier {
    marker: Regex,
}

impl QueryClassifier {
    pub fn new(prefix: &str) -> Result<Self, regex::Error> {
        let marker = RegexBuilder::new(&format!("^{}", regex::escape(prefix)))
            .case_insensitive(true)
            .build()?;
        Ok(Self { marker })
    }

    /// Classify a line that the caller has already trimmed.
    ///
    /// Lines without the marker are returned unchanged. With the marker, the
    /// prefix and the whitespace around the remaining text are removed.
    #[must_use]
    pub fn classify(&self, line: &str) -> Classified {
        match self.marker.find(line) {
            Some(m) => Classified {
                intent: Intent::Reset,
                question: line[m.end()..].trim().to_string(),
            },
            None => Classified {
                intent: Intent::Continue,
                question: line.to_string(),
            },
        }
    }
}

impl Default for QueryClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_NEW_SEARCH_PREFIX)
            .unwrap_or_else(|e| unreachable!("escaped literal is a valid pattern: {e}"))
    }
}
