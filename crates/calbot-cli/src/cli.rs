//! Command-line interface definition.

use std::net::SocketAddr;
use std::path::PathBuf;

use calbot_core::TracingOutputFormat;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use crate::config::OutputFormat;

/// calbot - Weekend guide events as a calendar feed
#[derive(Debug, Parser)]
#[command(name = "calbot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALBOT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log line format (defaults to json for `serve`, compact otherwise)
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract events from a guide page and print them
    Extract {
        /// File, `-` for stdin, or http(s) URL. Defaults to the current guide.
        source: Option<String>,

        /// Publication Thursday that weekday headings refer to
        ///
        /// Defaults to the most recent Thursday.
        #[arg(long, value_name = "YYYY-MM-DD")]
        anchor: Option<NaiveDate>,

        /// Output format (overrides the config file)
        #[arg(long, short, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Serve the calendar feed over HTTP
    Serve {
        /// Address to listen on (overrides the config file)
        #[arg(long, short)]
        address: Option<SocketAddr>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Show configuration file path
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormat> for TracingOutputFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
            LogFormat::Json => Self::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn extract_with_options() {
        let cli = Cli::try_parse_from([
            "calbot",
            "extract",
            "guide.html",
            "--anchor",
            "2024-05-09",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            Command::Extract {
                source,
                anchor,
                format,
            } => {
                assert_eq!(source.as_deref(), Some("guide.html"));
                assert_eq!(anchor, NaiveDate::from_ymd_opt(2024, 5, 9));
                assert_eq!(format, Some(OutputFormat::Json));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn serve_with_global_flags() {
        let cli = Cli::try_parse_from(["calbot", "serve", "-a", "0.0.0.0:9000", "--debug"]).unwrap();
        assert!(cli.debug);
        assert_eq!(cli.log_format, None);
        match cli.command {
            Command::Serve { address } => assert_eq!(address.unwrap().port(), 9000),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn log_format_flag() {
        let cli = Cli::try_parse_from(["calbot", "--log-format", "pretty", "config", "path"]).unwrap();
        assert_eq!(cli.log_format, Some(LogFormat::Pretty));
    }

    #[test]
    fn bad_anchor_is_rejected() {
        assert!(Cli::try_parse_from(["calbot", "extract", "--anchor", "May 9"]).is_err());
    }
}
