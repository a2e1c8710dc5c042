//! Prompt construction for condensing and answering.

use kchat_core::{Document, Turn};

/// Instruction given to the model for grounded answers.
pub const QA_SYSTEM_PROMPT: &str = "This is a friendly conversation between a human and an AI. \
The AI is talkative and provides specific details from its context but keeps its answer \
under 240 tokens. If the AI does not know the answer to a question, it truthfully says \
it does not know.";

/// Render prior turns as a `Human:` / `Assistant:` transcript.
///
/// Each turn starts on a new line, so the result begins with `\n` when
/// `history` is non-empty.
#[must_use]
pub fn format_chat_history(history: &[Turn]) -> String {
    history
        .iter()
        .map(|turn| format!("\nHuman: {}\nAssistant: {}", turn.question(), turn.answer()))
        .collect()
}

#[must_use]
pub fn condense_question_prompt(history: &[Turn], question: &str) -> String {
    format!(
        "Given the following conversation and a follow up question, rephrase the follow up \
question to be a standalone question.\n\n\
Chat History:\n{}\n\
Follow Up Input: {question}\n\
Standalone question:",
        format_chat_history(history)
    )
}

/// Join document contents with a blank line between them.
#[must_use]
pub fn stuff_documents(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|d| d.page_content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[must_use]
pub fn answer_prompt(documents: &[Document], question: &str) -> String {
    format!(
        "Here are a few documents in <documents> tags:\n\
<documents>\n{}\n</documents>\n\
Based on the above documents, provide a detailed answer for {question}. \
Answer \"don't know\" if not present in the document.",
        stuff_documents(documents)
    )
}
