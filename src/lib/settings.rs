//! This module defines the user settings, read from disk when the application
//! starts and written back whenever a programming run is started.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use derivative::Derivative;
use log::{debug, error, info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{consts::*, device_model::DeviceModel, input_file::InputRole};

#[derive(Debug)]
pub enum SettingsError {
    ParseError(serde_json::Error),
    /// The document parsed, but its top level is not a JSON object.
    NotAnObject,
    IOError(io::Error),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use SettingsError::*;
        match self {
            ParseError(e) => write!(f, "SettingsError-ParseError: {}", e),
            NotAnObject => write!(f, "SettingsError-NotAnObject"),
            IOError(e) => write!(f, "SettingsError-IOError: {}", e),
        }
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err)
    }
}
impl From<io::Error> for SettingsError {
    fn from(err: io::Error) -> Self {
        Self::IOError(err)
    }
}

/// The three hex files to program. An empty path means "not chosen yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFiles {
    #[serde(rename = "prog")]
    pub program: PathBuf,
    pub data: PathBuf,
    #[serde(rename = "opt")]
    pub options: PathBuf,
}

impl InputFiles {
    pub fn get(&self, role: InputRole) -> &Path {
        match role {
            InputRole::Program => &self.program,
            InputRole::Data => &self.data,
            InputRole::Options => &self.options,
        }
    }

    pub fn set(&mut self, role: InputRole, path: PathBuf) {
        match role {
            InputRole::Program => self.program = path,
            InputRole::Data => self.data = path,
            InputRole::Options => self.options = path,
        }
    }
}

/// Everything the user can configure.
#[derive(Derivative, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[derivative(Debug, Default)]
pub struct Settings {
    /// The programmer binary.
    #[serde(rename = "cli_path")]
    #[derivative(Default(value = "CLI_PATH_DEFAULT.into()"))]
    pub tool_path: PathBuf,
    #[serde(rename = "model")]
    pub device_model: DeviceModel,
    pub files: InputFiles,
    /// Image shown at the top of the window, if it exists.
    #[derivative(Default(value = "LOGO_PATH_DEFAULT.clone()"))]
    pub logo_path: PathBuf,
}

impl Settings {
    /// Load settings from disk, falling back to defaults on any error.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.is_file() {
            debug!("No settings file at {:?}; using defaults", path);
            return Self::default();
        }
        match Self::try_load(path) {
            Ok(settings) => {
                info!("Settings loaded from {:?}", path);
                settings
            }
            Err(err) => {
                warn!("Cannot load settings from {:?}, using defaults: {}", path, err);
                Self::default()
            }
        }
    }

    /// Save settings to disk. Failure is logged and otherwise ignored.
    pub fn save(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        match self.try_save(path) {
            Ok(_) => debug!("Settings saved to {:?}", path),
            Err(err) => error!("Failed to save settings to {:?}: {}", path, err),
        }
    }

    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_merged(&content)
    }

    pub fn try_save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Parse a settings document, overwriting the defaults only with the
    /// top-level keys it contains.
    ///
    /// A key whose value cannot be used keeps its default.
    pub fn from_json_merged(content: &str) -> Result<Self, SettingsError> {
        let doc: Map<String, Value> = match serde_json::from_str(content)? {
            Value::Object(map) => map,
            _ => return Err(SettingsError::NotAnObject),
        };

        let mut settings = Self::default();
        for (key, value) in doc {
            match key.as_str() {
                "cli_path" => merge_field(&mut settings.tool_path, &key, value),
                "model" => merge_field(&mut settings.device_model, &key, value),
                "files" => merge_field(&mut settings.files, &key, value),
                "logo_path" => merge_field(&mut settings.logo_path, &key, value),
                _ => debug!("Ignoring unknown settings key {:?}", key),
            }
        }
        Ok(settings)
    }
}

fn merge_field<T: DeserializeOwned>(slot: &mut T, key: &str, value: Value) {
    match serde_json::from_value(value) {
        Ok(v) => *slot = v,
        Err(err) => warn!("Invalid value for settings key {:?}, keeping default: {}", key, err),
    }
}
