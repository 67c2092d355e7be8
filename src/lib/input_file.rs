//! This module describes the three hex files handed to the programmer,
//! and the one-line sniff test each of them has to pass.

use enum_iterator::Sequence;

/// Which of the three input files is being referred to.
#[derive(Debug, strum::Display, Clone, Copy, PartialEq, Eq, Hash, Sequence)]
pub enum InputRole {
    /// Firmware image, `-FileProg`.
    #[strum(serialize = "program")]
    Program,
    /// EEPROM content, `-FileData`.
    #[strum(serialize = "data")]
    Data,
    /// Option bytes, `-FileOption`.
    #[strum(serialize = "options")]
    Options,
}

impl InputRole {
    /// The programmer flag this file is passed with, including the `=`.
    pub fn flag(&self) -> &'static str {
        use InputRole::*;
        match self {
            Program => "-FileProg=",
            Data => "-FileData=",
            Options => "-FileOption=",
        }
    }

    /// Label shown next to the entry in the form.
    pub fn label(&self) -> &'static str {
        use InputRole::*;
        match self {
            Program => "Program file (.s19/.hex):",
            Data => "Data file (.hex):",
            Options => "Options file (.hex):",
        }
    }

    /// Name and glob patterns for the file picker filter.
    pub fn file_filter(&self) -> (&'static str, &'static [&'static str]) {
        use InputRole::*;
        match self {
            Program => ("S19/HEX", &["*.s19", "*.hex"]),
            Data | Options => ("HEX", &["*.hex"]),
        }
    }

    /// Whether the first line of a file looks like the expected format.
    ///
    /// Surrounding whitespace is ignored. The program file may be Intel HEX
    /// (`:`) or Motorola S-record (`S`, any case); the others must be Intel HEX.
    pub fn accepts_first_line(&self, line: &str) -> bool {
        let line = line.trim();
        match self {
            InputRole::Program => line.starts_with(':') || line.starts_with(['S', 's']),
            InputRole::Data | InputRole::Options => line.starts_with(':'),
        }
    }
}
