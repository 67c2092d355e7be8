//! This module defines events passed between the run daemon and GUI elements.

use std::path::PathBuf;

use stm8_swim_gtk::{device_model::DeviceModel, input_file::InputRole};

use crate::core::runner::RunState;

#[derive(Debug, Clone)]
pub enum AppEvent {
    // from GUI
    EditToolPath(PathBuf),
    EditModel(DeviceModel),
    EditInputFile(InputRole, PathBuf),
    StartRequested,
    Quit,

    // from run daemon
    RunStateChanged(RunState),
}
