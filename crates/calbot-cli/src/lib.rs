//! The `calbot` command-line tool.
//!
//! - `calbot extract [SOURCE]` prints the events of one guide as iCalendar or JSON
//! - `calbot serve` runs the calendar feed server
//! - `calbot config` inspects the configuration file

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
