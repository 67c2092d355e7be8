//! This module contains the non-GUI runtime: the run daemon and the log sink.

// public members
pub mod log_sink;
pub mod runner;
