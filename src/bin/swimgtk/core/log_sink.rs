//! This module contains the consumer end of the log queue, which persists
//! every line to the log file and hands it to the GUI.

use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use crossbeam_channel::Receiver;
use log::{debug, error, warn};
use stm8_swim_gtk::consts::*;

#[derive(Debug)]
pub struct LogSink {
    log_rx: Receiver<String>,
    path: PathBuf,
    /// `None` if the log file could not be opened; lines still reach the GUI.
    file: Option<File>,
}

impl LogSink {
    /// Open the log file in append mode and write the session-start marker.
    pub fn open(path: impl AsRef<Path>, log_rx: Receiver<String>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file = match Self::open_impl(&path) {
            Ok(f) => {
                debug!("Appending to log file {:?}", path);
                Some(f)
            }
            Err(err) => {
                error!("Cannot open log file {:?}, output will not be persisted: {}", path, err);
                None
            }
        };
        Self { log_rx, path, file }
    }

    fn open_impl(path: &Path) -> io::Result<File> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file)?;
        writeln!(file, "{}", SESSION_START_MARKER)?;
        file.flush()?;
        Ok(file)
    }

    /// Take every line currently queued, without waiting for new ones.
    ///
    /// Each line is appended to the log file and passed to `on_line`, in queue
    /// order. Returns the number of lines drained.
    pub fn drain(&mut self, mut on_line: impl FnMut(&str)) -> usize {
        let mut count = 0;
        for line in self.log_rx.try_iter() {
            if let Some(file) = self.file.as_mut() {
                if let Err(err) = writeln!(file, "{}", line) {
                    warn!("Failed to write to log file {:?}: {}", self.path, err);
                }
            }
            on_line(&line);
            count += 1;
        }
        if count > 0 {
            if let Some(Err(err)) = self.file.as_mut().map(|f| f.flush()) {
                warn!("Failed to flush log file {:?}: {}", self.path, err);
            }
        }
        count
    }
}

/// Read the last part of a previous log file, starting at a line boundary.
///
/// Returns an empty string if the file does not exist.
pub fn read_backlog(path: impl AsRef<Path>, max_bytes: u64) -> io::Result<String> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(String::new()),
        Err(err) => return Err(err),
    };
    let len = file.metadata()?.len();
    let start = len.saturating_sub(max_bytes);
    file.seek(SeekFrom::Start(start))?;
    let mut raw = vec![];
    file.read_to_end(&mut raw)?;

    // skip the partial first line, unless we started at the top
    let raw = match (start, raw.iter().position(|&b| b == b'\n')) {
        (0, _) => &raw[..],
        (_, Some(nl)) => &raw[nl + 1..],
        (_, None) => &[][..],
    };
    Ok(String::from_utf8_lossy(raw).into_owned())
}
