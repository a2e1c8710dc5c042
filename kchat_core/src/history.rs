//! Bounded conversation history.
//!
//! The buffer keeps the most recent question/answer pairs and silently drops
//! the oldest one once it is full.

use std::collections::VecDeque;

/// Default number of turns kept in the buffer.
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    question: String,
    answer: String,
}

impl Turn {
    #[must_use]
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }
}

/// Fixed-capacity FIFO of [`Turn`]s.
///
/// A capacity of zero is valid and keeps nothing.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    turns: VecDeque<Turn>,
    capacity: usize,
}

impl HistoryBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a turn, evicting the oldest ones while over capacity.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Current turns, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
