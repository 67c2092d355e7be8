//! This module contains the closed list of target parts the programmer
//! can be asked to flash.

use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};

/// A supported STM8 part, passed to the programmer as `-Device=<name>`.
///
/// The `Display` and `FromStr` representations are the names the
/// programmer expects, and are also what gets stored in the settings file.
#[derive(
    Debug,
    strum::Display,
    strum::EnumString,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Sequence,
    Serialize,
    Deserialize,
)]
pub enum DeviceModel {
    #[strum(serialize = "STM8S003K3")]
    #[serde(rename = "STM8S003K3")]
    Stm8s003k3,
    #[strum(serialize = "STM8S105")]
    #[serde(rename = "STM8S105")]
    Stm8s105,
    #[strum(serialize = "STM8S207")]
    #[serde(rename = "STM8S207")]
    Stm8s207,
    #[strum(serialize = "STM8L151")]
    #[serde(rename = "STM8L151")]
    Stm8l151,
    #[strum(serialize = "STM8L152")]
    #[serde(rename = "STM8L152")]
    Stm8l152,
    #[strum(serialize = "STM8AF52A")]
    #[serde(rename = "STM8AF52A")]
    Stm8af52a,
    #[strum(serialize = "STM8AF6220")]
    #[serde(rename = "STM8AF6220")]
    Stm8af6220,
}

impl Default for DeviceModel {
    /// The first entry of the list.
    fn default() -> Self {
        Self::Stm8s003k3
    }
}
