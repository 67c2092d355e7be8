//! This module contains code that define the CLI API.

use std::{fs, path::PathBuf};

use clap::{ArgAction, IntoApp, Parser};
use stm8_swim_gtk::{consts::*, notify_method::NotifyMethod};

#[derive(Debug, Clone, Parser)]
#[clap(name = "swimgtk", author, version, about, disable_help_subcommand = true)]
pub struct CliArgs {
    /// Load and store settings from&to a custom file path.
    #[clap(short = 'c', long = "config", value_name = "PATH", default_value_os = CONFIG_FILE_PATH_DEFAULT.as_os_str())]
    pub config_path: PathBuf,

    /// Append programmer output to a custom log file.
    #[clap(short = 'l', long = "log-file", value_name = "PATH", default_value_os = LOG_FILE_PATH_DEFAULT.as_os_str())]
    pub log_path: PathBuf,

    /// How to notify when a programming run finishes.
    #[clap(long = "notify", value_name = "METHOD", value_enum, default_value = "log")]
    pub notify_method: NotifyMethod,

    /// Increase the verbosity level of output.
    /// This is a repeatable flag.
    #[clap(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Decrease the verbosity level of output.
    /// This is a repeatable flag.
    #[clap(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,
}

/// Build a clap app and return matches. Only call once.
pub fn parse_and_validate() -> CliArgs {
    match validate_impl(CliArgs::parse()) {
        Ok(args) => args,
        Err(err) => err.exit(),
    }
}

fn validate_impl(args: CliArgs) -> Result<CliArgs, clap::Error> {
    // validate log_path
    let log_path = &args.log_path;
    match log_path.parent() {
        // if default, then mkdir if absent
        Some(dir) if LOG_FILE_PATH_DEFAULT.eq(log_path) => fs::create_dir_all(dir)?,
        Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => Err(CliArgs::command().error(
            clap::ErrorKind::ValueValidation,
            format!("Directory of log file does not exist: {:?}", dir),
        ))?,
        _ => {}
    }

    // validate config_path
    if args.config_path.is_dir() {
        Err(CliArgs::command().error(
            clap::ErrorKind::ValueValidation,
            format!("Settings path is a directory: {:?}", args.config_path),
        ))?;
    }

    Ok(args)
}
