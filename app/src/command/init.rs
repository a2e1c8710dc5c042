use kchat_config::Config;

/// Strategy for initializing the configuration.
///
/// Writes a template to `~/kchat/config.json`; an existing file is left
/// untouched and reported as an error.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        Config::create_config()?;
        Ok(())
    }
}
