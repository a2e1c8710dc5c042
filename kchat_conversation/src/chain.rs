//! Condense, retrieve, answer.

use async_trait::async_trait;
use kchat_core::{AnswerResult, AnsweringPipeline, ChatMessage, LLMProvider, Retriever, Turn};
use tracing::{debug, info};

use crate::prompts::{QA_SYSTEM_PROMPT, answer_prompt, condense_question_prompt};

/// [`AnsweringPipeline`] over a language model and a retriever.
///
/// Follow-up questions are first rewritten into standalone form using the
/// history, then used both for retrieval and for the answer prompt.
pub struct ConversationalRetrievalChain<P, R> {
    provider: P,
    retriever: R,
    model: String,
}

impl<P, R> ConversationalRetrievalChain<P, R>
where
    P: LLMProvider,
    R: Retriever,
{
    pub const fn new(provider: P, retriever: R, model: String) -> Self {
        Self {
            provider,
            retriever,
            model,
        }
    }

    /// Rewrite `question` so it stands on its own. Without history the
    /// question is returned as is and the model is not called.
    pub async fn condense_question(
        &self,
        question: &str,
        history: &[Turn],
    ) -> anyhow::Result<String> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let prompt = condense_question_prompt(history, question);
        let response = self
            .provider
            .chat(&[ChatMessage::user(prompt)], &self.model)
            .await?;

        let standalone = response.content.trim().to_string();
        debug!("Condensed question: {standalone}");
        Ok(standalone)
    }
}

#[async_trait]
impl<P, R> AnsweringPipeline for ConversationalRetrievalChain<P, R>
where
    P: LLMProvider,
    R: Retriever,
{
    async fn answer(&self, question: &str, history: &[Turn]) -> anyhow::Result<AnswerResult> {
        let standalone = self.condense_question(question, history).await?;

        let documents = self.retriever.retrieve(&standalone).await?;
        info!("Answering with {} supporting documents", documents.len());

        let messages = [
            ChatMessage::system(QA_SYSTEM_PROMPT),
            ChatMessage::user(answer_prompt(&documents, &standalone)),
        ];
        let response = self.provider.chat(&messages, &self.model).await?;

        Ok(AnswerResult {
            answer: response.content.trim().to_string(),
            source_documents: documents,
            generated_question: Some(standalone),
        })
    }
}
