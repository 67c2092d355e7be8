//! This module contains predefined shared constants.

use std::{env, path::PathBuf, time::Duration};

use lazy_static::lazy_static;

// Static strings
// ========================================

/// The application's name.
pub const APP_NAME: &str = "stm8-swim-gtk";

/// The title of the main window and of dialogs.
pub const WINDOW_TITLE: &str = "STM8 Programmer (SWIM)";

/// The default name of the settings file, placed beside the executable.
pub const CONFIG_FILE_NAME_DEFAULT: &str = "stm8_config.json";

/// The default name of the persistent log file, placed beside the executable.
pub const LOG_FILE_NAME_DEFAULT: &str = "stm8_programmer.log";

/// The default name of the logo image, placed beside the executable.
pub const LOGO_FILE_NAME_DEFAULT: &str = "logo.png";

/// Written once to the log file every time the application starts.
pub const SESSION_START_MARKER: &str = "--- STM8 programming session started ---";

/// The default programmer binary, if not overridden by settings.
#[cfg(windows)]
pub const CLI_PATH_DEFAULT: &str = r"C:\tools\stvp\STVP_CmdLine.exe";
/// The default programmer binary, if not overridden by settings.
#[cfg(not(windows))]
pub const CLI_PATH_DEFAULT: &str = "STVP_CmdLine";

// Fixed programmer flags
// ========================================

/// Debug probe passed as `-BoardName`.
pub const BOARD_NAME: &str = "ST-LINK";
/// Probe connection passed as `-Port`.
pub const PORT: &str = "USB";
/// Programming interface passed as `-ProgMode`.
pub const PROG_MODE: &str = "SWIM";

// Hard-coded constants
// ========================================

/// Default logging level for the CLI logger.
///
/// 0: `Error`, 1: `Warn`, 2: `Info`, 3: `Debug`, 4: `Trace`
pub const DEFAULT_LOG_LEVEL: i32 = 2;

/// How often the GUI loop drains the log queue and handles events.
pub const LOG_DRAIN_INTERVAL: Duration = Duration::from_millis(100);

/// How often the command preview is recomputed.
pub const PREVIEW_REFRESH_INTERVAL: Duration = Duration::from_millis(500);

/// At most this much of the previous log file is shown in the "Log" tab.
pub const LOG_BACKLOG_MAX_BYTES: u64 = 64 * 1024;

// Static runtime paths
// ========================================

lazy_static! {
    /// The directory containing the running executable.
    pub static ref APP_DIR: PathBuf = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    pub static ref CONFIG_FILE_PATH_DEFAULT: PathBuf = APP_DIR.join(CONFIG_FILE_NAME_DEFAULT);
    pub static ref LOG_FILE_PATH_DEFAULT: PathBuf = APP_DIR.join(LOG_FILE_NAME_DEFAULT);
    pub static ref LOGO_PATH_DEFAULT: PathBuf = APP_DIR.join(LOGO_FILE_NAME_DEFAULT);
}
