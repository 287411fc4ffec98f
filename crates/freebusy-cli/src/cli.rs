//! Command-line interface definition.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use freebusy_core::TimeWindow;

use crate::error::{ClientError, ClientResult};

/// freebusy - busy periods from iCalendar files
#[derive(Debug, Parser)]
#[command(name = "freebusy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "FREEBUSY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Reproduce historical expansion output (first rejected candidate ends
    /// its cycle, COUNT permits one extra cycle)
    #[arg(long, global = true)]
    pub legacy: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the merged busy periods of a calendar
    Expand {
        /// iCalendar file to expand
        file: PathBuf,

        #[command(flatten)]
        window: WindowArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Check whether an event clashes with a calendar
    ///
    /// Exits with status 1 when a conflict is found.
    Conflict {
        /// iCalendar file holding the requested event
        request: PathBuf,

        /// iCalendar file with the existing events
        #[arg(long, short = 'C')]
        calendar: PathBuf,

        /// Ignore busy time from this event UID (can be repeated)
        #[arg(long, action = clap::ArgAction::Append)]
        ignore: Vec<String>,

        #[command(flatten)]
        window: WindowArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump the effective configuration
    Dump,

    /// Validate the configuration
    Validate,

    /// Show configuration file path
    Path,
}

/// The query window, in whole UTC days.
#[derive(Debug, Clone, Default, Args)]
pub struct WindowArgs {
    /// First day of the window (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day of the window, inclusive (YYYY-MM-DD)
    #[arg(long, conflicts_with = "days")]
    pub to: Option<NaiveDate>,

    /// Number of days in the window
    #[arg(long)]
    pub days: Option<u32>,
}

impl WindowArgs {
    /// Resolves the window, starting at `default_from` and spanning
    /// `default_days` unless the flags say otherwise.
    pub fn resolve(&self, default_from: NaiveDate, default_days: u32) -> ClientResult<TimeWindow> {
        let from = self.from.unwrap_or(default_from);
        let last = match (self.to, self.days.unwrap_or(default_days)) {
            (Some(to), _) => to,
            (None, 0) => {
                return Err(ClientError::Window("the window must span at least one day".into()));
            }
            (None, days) => from
                .checked_add_days(chrono::Days::new(u64::from(days - 1)))
                .ok_or_else(|| {
                    ClientError::Window(format!("{days} days from {from} is out of range"))
                })?,
        };
        if last < from {
            return Err(ClientError::Window(format!("--to {last} is before --from {from}")));
        }
        TimeWindow::for_dates(from, last)
            .ok_or_else(|| ClientError::Window(format!("{from} to {last} is out of range")))
    }
}
