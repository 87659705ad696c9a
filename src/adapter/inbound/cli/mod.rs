//! CLI module graph and command dispatch.

pub mod command;
pub mod diagnostic;
pub mod list;
pub mod output;
pub mod paths;
pub mod shell;
pub mod start;
pub mod stop;

use command::{Cli, Commands};
use output::OutputConfig;

use crate::error::Result;
use crate::infrastructure::config::settings::{Overrides, Settings};

/// Run a parsed command line and return the process exit code.
///
/// # Errors
///
/// Returns any settings, descriptor or controller error; the caller turns
/// it into a diagnostic and a non-zero exit.
pub async fn run(cli: Cli) -> Result<i32> {
    output::configure(
        OutputConfig::new(cli.json, cli.quiet, cli.verbose),
        &cli.color,
    );

    let overrides = match &cli.command {
        Commands::Start(args) => args.overrides(cli.state_dir.clone()),
        Commands::Shell(args) => args.overrides(cli.state_dir.clone()),
        Commands::Stop(_) | Commands::List(_) => Overrides {
            state_dir: cli.state_dir.clone(),
            ..Overrides::default()
        },
    };
    let mut settings = Settings::load_or_default(&cli.settings)?;
    settings.apply(overrides)?;
    settings.init_logging(cli.verbose, cli.quiet);

    let state_dir = paths::state_dir(settings.instance.state_dir.as_deref());
    match &cli.command {
        Commands::Start(args) => start::execute(&settings, &state_dir, args).await,
        Commands::Stop(args) => stop::execute(&settings, &state_dir, args).await,
        Commands::List(args) => list::execute(&settings, &state_dir, args).await,
        Commands::Shell(args) => shell::execute(&settings, &state_dir, args).await,
    }
}
