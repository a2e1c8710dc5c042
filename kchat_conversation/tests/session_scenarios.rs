//! End-to-end tests for the interactive loop.
//!
//! The answering pipeline is replaced by stubs so the loop, the classifier and
//! the history buffer are exercised together without any network access.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kchat_conversation::{
    ChatSession, ConversationError, FAREWELL, GREETING, PROMPT_MESSAGE, SessionConfig,
};
use kchat_core::{AnswerResult, AnsweringPipeline, Turn};

/// Answers `"answer:" + question` and records the history it was given.
#[derive(Clone, Default)]
struct EchoPipeline {
    calls: Arc<Mutex<Vec<(String, Vec<Turn>)>>>,
}

#[async_trait]
impl AnsweringPipeline for EchoPipeline {
    async fn answer(&self, question: &str, history: &[Turn]) -> anyhow::Result<AnswerResult> {
        self.calls
            .lock()
            .unwrap()
            .push((question.to_string(), history.to_vec()));
        Ok(AnswerResult::new(format!("answer:{question}")))
    }
}

/// Fails on the given call number (1-based).
struct FailingPipeline {
    fail_on: usize,
    calls: Mutex<usize>,
}

#[async_trait]
impl AnsweringPipeline for FailingPipeline {
    async fn answer(&self, question: &str, _history: &[Turn]) -> anyhow::Result<AnswerResult> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if *calls == self.fail_on {
            anyhow::bail!("index unreachable");
        }
        Ok(AnswerResult::new(format!("answer:{question}")))
    }
}

fn plain(history_limit: usize) -> SessionConfig {
    SessionConfig::default()
        .with_history_limit(history_limit)
        .with_color(false)
}

#[tokio::test]
async fn test_new_search_clears_prior_turns() {
    let pipeline = EchoPipeline::default();
    let mut session = ChatSession::new(pipeline.clone(), &plain(5)).unwrap();
    let input = Cursor::new("What is X?\nTell me more\nnew search: What is Y?\n");
    let mut out = Vec::new();

    session.run(input, &mut out).await.unwrap();

    assert_eq!(
        session.history().snapshot(),
        vec![Turn::new("What is Y?", "answer:What is Y?")]
    );

    let calls = pipeline.calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].1.is_empty());
    assert_eq!(calls[1].1, vec![Turn::new("What is X?", "answer:What is X?")]);
    assert_eq!(calls[2].0, "What is Y?");
    assert!(calls[2].1.is_empty(), "reset must happen before the pipeline call");
}

#[tokio::test]
async fn test_oldest_turn_evicted_at_capacity() {
    let mut session = ChatSession::new(EchoPipeline::default(), &plain(2)).unwrap();
    let mut out = Vec::new();

    session
        .run(Cursor::new("first\nsecond\nthird\n"), &mut out)
        .await
        .unwrap();

    assert_eq!(
        session.history().snapshot(),
        vec![
            Turn::new("second", "answer:second"),
            Turn::new("third", "answer:third"),
        ]
    );
}

#[tokio::test]
async fn test_immediate_end_of_input() {
    let pipeline = EchoPipeline::default();
    let mut session = ChatSession::new(pipeline.clone(), &plain(5)).unwrap();
    let mut out = Vec::new();

    session.run(Cursor::new(""), &mut out).await.unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        format!("{GREETING}\n{PROMPT_MESSAGE}\n> {FAREWELL}\n")
    );
    assert!(pipeline.calls.lock().unwrap().is_empty());
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_last_line_without_newline_is_processed() {
    let mut session = ChatSession::new(EchoPipeline::default(), &plain(5)).unwrap();
    let mut out = Vec::new();

    session.run(Cursor::new("only question"), &mut out).await.unwrap();

    assert_eq!(session.history().len(), 1);
    let output = String::from_utf8(out).unwrap();
    assert!(output.contains("answer:only question\n"));
    assert!(output.ends_with(&format!("> {FAREWELL}\n")));
}

#[tokio::test]
async fn test_pipeline_failure_terminates_loop() {
    let pipeline = FailingPipeline {
        fail_on: 2,
        calls: Mutex::new(0),
    };
    let mut session = ChatSession::new(pipeline, &plain(5)).unwrap();
    let mut out = Vec::new();

    let err = session
        .run(Cursor::new("one\ntwo\nthree\n"), &mut out)
        .await
        .unwrap_err();

    assert!(matches!(err, ConversationError::Pipeline(_)));
    assert!(err.to_string().contains("index unreachable"));
    assert_eq!(session.history().len(), 1);

    let output = String::from_utf8(out).unwrap();
    assert!(!output.contains(FAREWELL));
    assert!(!output.contains("answer:three"));
}
