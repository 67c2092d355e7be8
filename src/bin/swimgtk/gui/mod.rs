//! This module contains code that handles GUI.

pub mod app;
pub mod form;
pub mod notification;
pub mod transcript;
