#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod command;

use command::{
    ChatInput, ChatStrategy, CommandStrategy, InfoStrategy, InitStrategy, VersionStrategy,
};

#[derive(Parser)]
#[command(name = "kchat")]
#[command(about = "Conversational question answering over an Amazon Kendra index", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask questions interactively (default)
    Chat(ChatArgs),
    /// Create ~/kchat/config.json from a template
    Init,
    /// Show the effective configuration
    Info {
        /// Config file to read instead of ~/kchat/config.json
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show version
    Version,
}

#[derive(Args, Default)]
struct ChatArgs {
    /// Config file to read instead of ~/kchat/config.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model to use
    #[arg(short = 'M', long)]
    model: Option<String>,

    /// Number of previous turns kept as context
    #[arg(long)]
    history_limit: Option<usize>,

    /// Documents retrieved per question
    #[arg(long)]
    top_k: Option<usize>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Answer a single question and exit
    #[arg(short = 'm', long)]
    message: Option<String>,
}

impl From<ChatArgs> for ChatInput {
    fn from(args: ChatArgs) -> Self {
        Self {
            config_path: args.config,
            model: args.model,
            history_limit: args.history_limit,
            top_k: args.top_k,
            no_color: args.no_color,
            message: args.message,
        }
    }
}

/// Logs go to stderr so they never mix with the conversation on stdout.
fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command.unwrap_or_else(|| Commands::Chat(ChatArgs::default())) {
        Commands::Chat(args) => ChatStrategy.execute(args.into()).await,
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Info { config } => InfoStrategy.execute(config).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_chat() {
        let cli = Cli::try_parse_from(["kchat"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_chat_flags() {
        let cli = Cli::try_parse_from([
            "kchat",
            "-v",
            "chat",
            "--history-limit",
            "2",
            "--no-color",
            "-m",
            "What is Kendra?",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Some(Commands::Chat(args)) = cli.command else {
            panic!("expected chat command");
        };
        let input = ChatInput::from(args);
        assert_eq!(input.history_limit, Some(2));
        assert!(input.no_color);
        assert_eq!(input.message.as_deref(), Some("What is Kendra?"));
    }
}
