//! This module contains the ways a finished run can be reported to the user.

use clap::ValueEnum;
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};

/// How to tell the user that a programming run has finished?
///
/// The outcome is always visible in the status label and the transcript;
/// this only controls the extra, out-of-window notification.
#[derive(Debug, strum::Display, Clone, Copy, PartialEq, Eq, Sequence, ValueEnum, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum NotifyMethod {
    /// No extra notification.
    #[clap(name = "disable")]
    Disable,

    /// Write the outcome through the application logger.
    #[clap(name = "log")]
    Log,

    /// Pop up a non-blocking message dialog.
    #[clap(name = "prompt")]
    Prompt,

    /// Send a desktop notification, useful when the window is in the background.
    #[clap(name = "toast")]
    Toast,
}

impl Default for NotifyMethod {
    fn default() -> Self {
        Self::Log
    }
}
