//! The interactive question/answer loop.
//!
//! A session owns one bounded history and one answering pipeline. Each input
//! line is classified, answered against the current history, folded back into
//! the history and rendered. End of input ends the session.

use std::io::{BufRead, Write};

use kchat_core::{
    AnswerResult, AnsweringPipeline, DEFAULT_HISTORY_LIMIT, DEFAULT_NEW_SEARCH_PREFIX,
    HistoryBuffer, Intent, QueryClassifier, Turn,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::ConversationError;
use crate::render::{Style, paint};

pub const GREETING: &str = "Hello! How can I help you?";
pub const PROMPT_MESSAGE: &str = "Ask a question, start a New search: or CTRL-D to exit.";
pub const PROMPT_MARKER: &str = "> ";
pub const FAREWELL: &str = "Bye";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Turns kept as context
    pub history_limit: usize,
    /// Case-insensitive marker that resets the history
    pub new_search_prefix: String,
    /// Emit ANSI colors
    pub color: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            new_search_prefix: DEFAULT_NEW_SEARCH_PREFIX.to_string(),
            color: true,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub const fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    #[must_use]
    pub const fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

/// One conversation: history buffer plus pipeline.
pub struct ChatSession<P> {
    id: Uuid,
    pipeline: P,
    history: HistoryBuffer,
    classifier: QueryClassifier,
    color: bool,
    turns: usize,
}

impl<P: AnsweringPipeline> ChatSession<P> {
    pub fn new(pipeline: P, config: &SessionConfig) -> Result<Self, ConversationError> {
        let id = Uuid::now_v7();
        info!(
            "Creating chat session {id} (history_limit={})",
            config.history_limit
        );

        Ok(Self {
            id,
            pipeline,
            history: HistoryBuffer::new(config.history_limit),
            classifier: QueryClassifier::new(&config.new_search_prefix)?,
            color: config.color,
            turns: 0,
        })
    }

    #[must_use]
    pub const fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Answer one input line and record it in the history.
    ///
    /// Blank lines and a bare reset marker are passed through as empty
    /// questions.
    pub async fn ask(&mut self, line: &str) -> Result<AnswerResult, ConversationError> {
        let classified = self.classifier.classify(line.trim());
        if classified.intent == Intent::Reset {
            info!("New search, clearing {} turns of history", self.history.len());
            self.history.clear();
        }

        self.turns += 1;
        debug!("Processing turn {} for session {}", self.turns, self.id);

        let history = self.history.snapshot();
        let result = self.pipeline.answer(&classified.question, &history).await?;

        self.history
            .append(Turn::new(classified.question, result.answer.clone()));
        Ok(result)
    }

    /// Read questions from `input` until it is exhausted.
    ///
    /// A pipeline failure ends the loop with an error; nothing else does.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<(), ConversationError>
    where
        R: BufRead,
        W: Write,
    {
        writeln!(out, "{}", paint(Style::Greeting, GREETING, self.color))?;
        self.prompt(out)?;

        for line in input.lines() {
            let line = line?;
            let result = self.ask(&line).await?;
            self.render_answer(out, &result)?;
            self.prompt(out)?;
        }

        writeln!(out, "{}", paint(Style::Greeting, FAREWELL, self.color))?;
        info!("Session {} ended after {} turns", self.id, self.turns);
        Ok(())
    }

    fn prompt<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "{}", paint(Style::Prompt, PROMPT_MESSAGE, self.color))?;
        write!(out, "{PROMPT_MARKER}")?;
        out.flush()
    }

    /// Write the answer, then `Sources:` and one source per line when any
    /// documents were retrieved, then a blank line.
    pub fn render_answer<W: Write>(
        &self,
        out: &mut W,
        result: &AnswerResult,
    ) -> std::io::Result<()> {
        writeln!(out, "{}", paint(Style::Answer, &result.answer, self.color))?;

        if !result.source_documents.is_empty() {
            writeln!(out, "{}", paint(Style::Answer, "Sources:", self.color))?;
            for source in result.sources() {
                writeln!(out, "{}", paint(Style::Answer, source, self.color))?;
            }
        }

        writeln!(out)
    }
}
