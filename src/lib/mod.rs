//! This crate contains the parts of `stm8-swim-gtk` that do not depend on GTK:
//! settings, the device model list, preflight checks and the command builder.

// public members
pub mod command;
pub mod consts;
pub mod device_model;
pub mod input_file;
pub mod notify_method;
pub mod preflight;
pub mod settings;
