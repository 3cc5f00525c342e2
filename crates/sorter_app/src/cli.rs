use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use sorter_logging::LogDestination;

use crate::config::DEFAULT_CONFIG_FILE;

/// Sort markdown documents into category folders chosen by an LLM.
///
/// While a run is in progress, type `p` to pause, `r` to resume, `q` to stop
/// after the current item, or `s <provider-id>` to switch providers.
#[derive(Debug, Parser)]
#[command(name = "mdsort", version)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log at debug level.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Where log output goes.
    #[arg(long, global = true, value_enum, default_value_t = LogTarget::Both)]
    pub log: LogTarget,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classify and move every unsettled document (the default).
    Run(RunArgs),

    /// Probe every configured provider and print its status.
    Providers,

    /// Print the saved checkpoint.
    Status,

    /// Delete the saved checkpoint so the next run starts over.
    Reset,
}

#[derive(Debug, Default, clap::Args)]
pub struct RunArgs {
    /// Directory holding the documents to sort.
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Directory under which category folders are created.
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// Provider to try first; others are tried if it is unreachable.
    #[arg(long, conflicts_with = "fixed")]
    pub provider: Option<String>,

    /// Use only this provider; fail if it is unreachable.
    #[arg(long)]
    pub fixed: Option<String>,

    /// Attempt previously failed documents again.
    #[arg(long)]
    pub retry_failed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

impl Cli {
    pub fn level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_runs() {
        let cli = Cli::try_parse_from(["mdsort"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert_eq!(cli.level(), LevelFilter::Info);
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "mdsort",
            "run",
            "--source",
            "inbox",
            "--provider",
            "backup",
            "--retry-failed",
            "--verbose",
            "--log",
            "file",
        ])
        .unwrap();
        assert_eq!(cli.log, LogTarget::File);
        assert_eq!(cli.level(), LevelFilter::Debug);
        let Some(Command::Run(args)) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.source, Some(PathBuf::from("inbox")));
        assert_eq!(args.provider.as_deref(), Some("backup"));
        assert!(args.retry_failed);
    }

    #[test]
    fn provider_and_fixed_conflict() {
        assert!(Cli::try_parse_from(["mdsort", "run", "--provider", "a", "--fixed", "b"]).is_err());
    }
}
