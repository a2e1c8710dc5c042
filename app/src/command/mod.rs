//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own input type, dispatched
//! statically from `main`.

use std::path::Path;

use kchat_config::Config;
use tracing::info;

mod chat;
mod info;
mod init;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use version::VersionStrategy;

/// Load configuration from the given file (or the default location) and the
/// environment.
fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = Config::load(path)?;
    info!(
        "Config: model={}, region={}, index={}, history_limit={}",
        config.providers.anthropic.model,
        config.retrieval.kendra.region,
        config.retrieval.kendra.index_id,
        config.chat.history_limit
    );
    Ok(config)
}

/// Contract shared by all command strategies.
///
/// Each strategy defines its own input type, so parameters are passed without
/// boxing or runtime casting.
pub trait CommandStrategy: Send + Sync + 'static {
    type Input;

    /// Execute the command with the given input.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}
