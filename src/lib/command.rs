//! This module contains the command builder, which turns settings into the
//! exact argument vector the programmer is launched with.

use std::{ffi::OsString, fmt, path::PathBuf};

use duct::{cmd, Expression};
use enum_iterator::all;
use itertools::Itertools;

use crate::{consts::*, input_file::InputRole, settings::Settings};

/// A fully resolved programmer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl fmt::Display for LaunchCommand {
    /// Space-joined argv, for display only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.argv().iter().map(|arg| arg.to_string_lossy()).join(" ");
        write!(f, "{}", text)
    }
}

impl LaunchCommand {
    /// Build the invocation for the given settings.
    ///
    /// Fixed flags and setting-derived flags are always emitted in the same order.
    pub fn build(settings: &Settings) -> Self {
        let mut args: Vec<OsString> = vec![
            format!("-BoardName={}", BOARD_NAME).into(),
            format!("-Port={}", PORT).into(),
            format!("-ProgMode={}", PROG_MODE).into(),
            format!("-Device={}", settings.device_model).into(),
            "-verbose".into(),
            "-no_progOption".into(),
            "-no_loop".into(),
            "-verif".into(),
        ];
        for role in all::<InputRole>() {
            let mut arg = OsString::from(role.flag());
            arg.push(settings.files.get(role));
            args.push(arg);
        }
        Self {
            program: settings.tool_path.clone(),
            args,
        }
    }

    /// The program followed by its arguments.
    pub fn argv(&self) -> Vec<OsString> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.clone().into_os_string());
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// A `duct` expression running this command.
    ///
    /// The program is passed as a plain name so that a bare name is looked up
    /// in `$PATH`, the same way preflight resolves it.
    pub fn to_expression(&self) -> Expression {
        cmd(self.program.clone().into_os_string(), &self.args)
    }
}
