use std::path::PathBuf;

use kchat_config::Config;
use kchat_retrieval::AwsCredentials;

use super::load_config;

/// Strategy for displaying the effective configuration.
///
/// Shows what `chat` would run with after the config file and environment
/// are merged. Secrets are masked.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = Option<PathBuf>;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = load_config(input.as_deref())?;
        print!("{}", describe(&config, AwsCredentials::load().as_ref()));
        Ok(())
    }
}

fn describe(config: &Config, aws: Option<&AwsCredentials>) -> String {
    let anthropic = &config.providers.anthropic;
    let kendra = &config.retrieval.kendra;
    let chat = &config.chat;

    let mut lines = vec!["=== kchat Configuration ===".to_string(), String::new()];

    lines.push("Anthropic:".to_string());
    lines.push(format!("  API Key: {}", mask_secret(&anthropic.api_key)));
    lines.push(format!("  Model: {}", anthropic.model));
    lines.push(format!("  Max Tokens: {}", anthropic.max_tokens));
    lines.push(format!("  Temperature: {}", anthropic.temperature));
    if let Some(base_url) = &anthropic.base_url {
        lines.push(format!("  Base URL: {base_url}"));
    }
    lines.push(String::new());

    lines.push("Kendra:".to_string());
    lines.push(format!("  Region: {}", or_unset(&kendra.region)));
    lines.push(format!("  Index: {}", or_unset(&kendra.index_id)));
    lines.push(format!("  Top K: {}", kendra.top_k));
    if let Some(endpoint) = &kendra.endpoint {
        lines.push(format!("  Endpoint: {endpoint}"));
    }
    lines.push(format!(
        "  AWS Credentials: {}",
        aws.map_or_else(
            || "(not set)".to_string(),
            |c| mask_secret(&c.access_key_id)
        )
    ));
    lines.push(String::new());

    lines.push("Chat:".to_string());
    lines.push(format!("  History Limit: {}", chat.history_limit));
    lines.push(format!("  New Search Prefix: {:?}", chat.new_search_prefix));
    lines.push(format!("  Color: {}", chat.color));

    lines.join("\n") + "\n"
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() { "(not set)" } else { value }
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.is_empty() {
        "(not set)".to_string()
    } else if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}
