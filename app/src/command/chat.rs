//! Conversational QA against the configured Kendra index.

use std::path::PathBuf;

use kchat_config::Config;
use kchat_conversation::{ChatSession, ConversationalRetrievalChain, SessionConfig};
use kchat_providers::AnthropicProvider;
use kchat_retrieval::KendraRetriever;
use tracing::info;

use super::load_config;

type KendraChain = ConversationalRetrievalChain<AnthropicProvider, KendraRetriever>;

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone, Default)]
pub struct ChatInput {
    /// Explicit config file (must exist)
    pub config_path: Option<PathBuf>,
    /// Model override
    pub model: Option<String>,
    /// Turns kept as context
    pub history_limit: Option<usize>,
    /// Documents retrieved per question
    pub top_k: Option<usize>,
    /// Disable ANSI colors
    pub no_color: bool,
    /// Single question to answer (non-interactive mode)
    pub message: Option<String>,
}

impl ChatInput {
    /// Apply command-line overrides on top of the loaded config.
    fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.providers.anthropic.model.clone_from(model);
        }
        if let Some(limit) = self.history_limit {
            config.chat.history_limit = limit;
        }
        if let Some(top_k) = self.top_k {
            config.retrieval.kendra.top_k = top_k.max(1);
        }
        if self.no_color {
            config.chat.color = false;
        }
    }
}

/// Validate the config and wire provider, retriever and session together.
///
/// Fails before anything is written to the terminal when the model
/// credential is missing.
fn build_session(config: &Config) -> anyhow::Result<ChatSession<KendraChain>> {
    config.validate()?;

    let anthropic = &config.providers.anthropic;
    let mut provider = AnthropicProvider::new(anthropic.api_key.clone())
        .with_max_tokens(anthropic.max_tokens)
        .with_temperature(anthropic.temperature);
    if let Some(base_url) = &anthropic.base_url {
        provider = provider.with_base_url(base_url.clone());
    }

    let kendra = &config.retrieval.kendra;
    let mut retriever = KendraRetriever::new(kendra.region.clone(), kendra.index_id.clone())
        .with_top_k(kendra.top_k);
    if let Some(endpoint) = &kendra.endpoint {
        retriever = retriever.with_endpoint(endpoint.clone());
    }

    let chain = ConversationalRetrievalChain::new(provider, retriever, anthropic.model.clone());
    let session_config = SessionConfig {
        history_limit: config.chat.history_limit,
        new_search_prefix: config.chat.new_search_prefix.clone(),
        color: config.chat.color,
    };

    Ok(ChatSession::new(chain, &session_config)?)
}

/// Strategy for the Chat command.
///
/// Interactive by default: reads questions from stdin until end of input.
/// With `message`, answers one question and exits.
#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let mut config = load_config(input.config_path.as_deref())?;
        input.apply(&mut config);

        let mut session = build_session(&config)?;
        info!("Starting chat session {}", session.id());

        if let Some(msg) = input.message {
            let result = session.ask(&msg).await?;
            session.render_answer(&mut std::io::stdout(), &result)?;
        } else {
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            session.run(stdin.lock(), &mut stdout).await?;
        }

        Ok(())
    }
}
