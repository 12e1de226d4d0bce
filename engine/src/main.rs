// Conductor plan engine
// Main entry point for the conductor binary

use clap::Parser;
use conductor_engine::cli::{Cli, Command};
use conductor_engine::config::Config;
use conductor_engine::handlers::{
    build_conductor, handle_capabilities, handle_run, handle_validate, run_command, OutputFormat,
};
use conductor_engine::telemetry::init_telemetry_with_level;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let config = Config::load(cli.config.as_deref())?;

    // --log wins over the config file; RUST_LOG wins over both
    let level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(level);
    tracing::debug!("Conductor v{}", env!("CARGO_PKG_VERSION"));

    let conductor = build_conductor(&config)?;

    match cli.command {
        Command::Capabilities => handle_capabilities(&conductor, format),

        Command::Validate { plan } => {
            tracing::info!("Validating plan: {}", plan.display());
            handle_validate(&plan, &conductor, format)
        }

        Command::Run { plan, yes, timeout } => {
            tracing::info!("Running plan: {}", plan.display());
            run_command(handle_run(&plan, yes, timeout, conductor, format))?
        }
    }
}
