//! freebusy CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use freebusy_core::{Expander, ExpandOptions, TracingConfig, init_tracing};
use tracing::debug;

use freebusy_cli::cli::{Cli, Command, ConfigAction};
use freebusy_cli::commands::conflict::ConflictRequest;
use freebusy_cli::config::ClientConfig;
use freebusy_cli::error::ClientResult;

/// Exit status when the requested event conflicts.
const EXIT_CONFLICT: u8 = 1;
/// Exit status for errors; distinct from a conflict.
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    };

    let debug = cli.debug || config.as_ref().is_ok_and(|c| c.debug);
    let tracing = if debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::cli()
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: {}", e);
    }

    let result = config.and_then(|config| run(cli, config));
    match result {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(EXIT_CONFLICT),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Runs the selected command; `Ok(true)` reports a conflict.
fn run(cli: Cli, config: ClientConfig) -> ClientResult<bool> {
    let options = if cli.legacy {
        ExpandOptions::legacy()
    } else {
        config.expansion
    };
    debug!(?options, "Expansion options");
    let expander = Expander::new(options);

    match cli.command {
        Command::Expand { file, window, json } => {
            let json = json || config.output.json;
            freebusy_cli::commands::expand::run(&file, &window, json, &config, &expander)?;
            Ok(false)
        }
        Command::Conflict {
            request,
            calendar,
            ignore,
            window,
            json,
        } => {
            let args = ConflictRequest {
                request: &request,
                calendar: &calendar,
                ignore: &ignore,
                window: &window,
            };
            let json = json || config.output.json;
            freebusy_cli::commands::conflict::run(&args, json, &config, &expander)
        }
        Command::Config { action } => {
            let path = cli.config.unwrap_or_else(ClientConfig::default_path);
            match action {
                ConfigAction::Dump => freebusy_cli::commands::config::dump(&config, &path)?,
                ConfigAction::Validate => freebusy_cli::commands::config::validate(&config)?,
                ConfigAction::Path => freebusy_cli::commands::config::path(&path)?,
            }
            Ok(false)
        }
    }
}
