//! This module contains the daemon that runs the programmer once and streams
//! its output into the log queue.

use std::{
    fmt,
    io::{self, BufRead, BufReader},
    process::ExitStatus,
    thread::{self, JoinHandle},
};

use crossbeam_channel::Sender;
use log::{debug, info, trace, warn};
use stm8_swim_gtk::{command::LaunchCommand, device_model::DeviceModel};

use crate::event::AppEvent;

/// The exit status of a finished programmer process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    /// `-1` if the process did not exit normally (e.g. killed by a signal).
    pub exit_code: i32,
    pub succeeded: bool,
}

impl From<ExitStatus> for ExecutionResult {
    fn from(status: ExitStatus) -> Self {
        let exit_code = status.code().unwrap_or(-1);
        Self {
            exit_code,
            succeeded: exit_code == 0,
        }
    }
}

/// Where a programming run is at.
///
/// `Completed` and `LaunchFailed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Starting,
    Running,
    Completed(ExecutionResult),
    LaunchFailed(String),
}

impl fmt::Display for RunState {
    /// The text of the status label.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RunState::*;
        match self {
            Idle => write!(f, "Idle"),
            Starting => write!(f, "Starting…"),
            Running => write!(f, "Running…"),
            Completed(res) if res.succeeded => write!(f, "OK"),
            Completed(res) => write!(f, "Failed (exit code {})", res.exit_code),
            LaunchFailed(_) => write!(f, "Failed to launch"),
        }
    }
}

impl RunState {
    /// Whether a run is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, RunState::Starting | RunState::Running)
    }

    /// Whether a start request should be acted on.
    pub fn accepts_start(&self) -> bool {
        !self.is_busy()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed(_) | RunState::LaunchFailed(_))
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, RunState::Completed(res) if res.succeeded)
    }

    /// Body text of the completion notification for a run of `model`.
    pub fn completion_message(&self, model: Option<DeviceModel>) -> String {
        match (self, model) {
            (RunState::LaunchFailed(reason), _) => format!("The programmer could not be launched: {}", reason),
            (other, Some(model)) => format!("{} ({})", other, model),
            (other, None) => other.to_string(),
        }
    }
}

/// Spawn the daemon thread for a single run.
///
/// The daemon pushes every output line to `log_tx` and reports
/// `RunStateChanged` events through `events_tx`; its last event is always
/// a terminal state.
pub fn spawn(command: LaunchCommand, log_tx: Sender<String>, events_tx: Sender<AppEvent>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("programmer run daemon".into())
        .spawn(move || {
            trace!("Run daemon started for {:?}", command.program);
            let report = |state: RunState| {
                if let Err(err) = events_tx.send(AppEvent::RunStateChanged(state)) {
                    warn!("Trying to send {:?}, but all receivers have hung up.", err.0);
                }
            };
            let final_state = execute(&command, &log_tx, || report(RunState::Running));
            info!("Programming run finished: {:?}", final_state);
            report(final_state);
        })
}

/// Run the programmer to completion on the current thread.
///
/// `on_running` is called once the process has been spawned.
pub fn execute(command: &LaunchCommand, log_tx: &Sender<String>, on_running: impl FnOnce()) -> RunState {
    enqueue(log_tx, format!("starting command: {}", command));

    let reader = match command.to_expression().stdin_null().stderr_to_stdout().unchecked().reader() {
        Ok(r) => r,
        Err(err) => return launch_failed(command, log_tx, err),
    };
    debug!("Programmer {:?} started", command.program);
    on_running();

    // pipe output
    let mut source = BufReader::new(reader);
    let mut buf = vec![];
    loop {
        buf.clear();
        match source.read_until(b'\n', &mut buf) {
            Ok(0) => break, // EOF; the child has been waited on
            Ok(_) => enqueue(log_tx, decode_line(&buf)),
            Err(err) => {
                warn!("Error reading programmer output: {}", err);
                enqueue(log_tx, format!("error reading process output: {}", err));
                break;
            }
        }
    }

    let result = match source.get_ref().try_wait() {
        Ok(Some(output)) => ExecutionResult::from(output.status),
        Ok(None) => {
            warn!("Programmer output ended before its exit status was available");
            ExecutionResult {
                exit_code: -1,
                succeeded: false,
            }
        }
        Err(err) => {
            warn!("Cannot collect the programmer's exit status: {}", err);
            ExecutionResult {
                exit_code: -1,
                succeeded: false,
            }
        }
    };

    let summary = if result.succeeded {
        "programming completed successfully".to_string()
    } else {
        format!("programming failed (exit code {})", result.exit_code)
    };
    enqueue(log_tx, summary);

    RunState::Completed(result)
}

/// Queue the single diagnostic line of a failed launch.
pub fn launch_failed(command: &LaunchCommand, log_tx: &Sender<String>, err: impl fmt::Display) -> RunState {
    warn!("Failed to launch {:?}: {}", command.program, err);
    enqueue(log_tx, format!("failed to launch {}: {}", command.program.display(), err));
    RunState::LaunchFailed(err.to_string())
}

/// Strip the line terminator and decode lossily.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

fn enqueue(log_tx: &Sender<String>, line: String) {
    trace!("Queueing: {}", line);
    if let Err(err) = log_tx.send(line) {
        // only happens when the GUI is gone
        debug!("Log queue closed, dropping line: {}", err.0);
    }
}

#[cfg(test)]
mod test {
    use crossbeam_channel::unbounded as unbounded_channel;
    use stm8_swim_gtk::{command::LaunchCommand, device_model::DeviceModel, settings::Settings};

    use super::{launch_failed, ExecutionResult, RunState};

    #[test]
    fn completion_message_names_the_run_model() {
        let failed = RunState::Completed(ExecutionResult {
            exit_code: 1,
            succeeded: false,
        });
        assert_eq!(
            failed.completion_message(Some(DeviceModel::Stm8l152)),
            "Failed (exit code 1) (STM8L152)"
        );
        assert_eq!(failed.completion_message(None), "Failed (exit code 1)");
        assert_eq!(
            RunState::LaunchFailed("denied".into()).completion_message(Some(DeviceModel::Stm8s105)),
            "The programmer could not be launched: denied"
        );
    }

    #[test]
    fn start_is_ignored_while_busy() {
        let done = ExecutionResult {
            exit_code: 0,
            succeeded: true,
        };
        assert!(RunState::Idle.accepts_start());
        assert!(!RunState::Starting.accepts_start());
        assert!(!RunState::Running.accepts_start());
        assert!(RunState::Completed(done).accepts_start());
        assert!(RunState::LaunchFailed("gone".into()).accepts_start());
    }

    #[test]
    fn launch_failure_queues_one_line() {
        let command = LaunchCommand::build(&Settings {
            tool_path: "STVP_CmdLine".into(),
            ..Settings::default()
        });
        let (log_tx, log_rx) = unbounded_channel();
        let state = launch_failed(&command, &log_tx, "Resource temporarily unavailable");
        drop(log_tx);

        assert_eq!(state, RunState::LaunchFailed("Resource temporarily unavailable".into()));
        assert_eq!(state.to_string(), "Failed to launch");
        assert_eq!(
            log_rx.iter().collect::<Vec<_>>(),
            ["failed to launch STVP_CmdLine: Resource temporarily unavailable"]
        );
    }
}

#[cfg(all(test, unix))]
mod process_test {
    use std::{
        fs,
        os::unix::fs::PermissionsExt,
        path::{Path, PathBuf},
    };

    use crossbeam_channel::unbounded as unbounded_channel;
    use itertools::Itertools;
    use stm8_swim_gtk::{command::LaunchCommand, settings::Settings};
    use tempfile::TempDir;

    use crate::{core::log_sink::LogSink, event::AppEvent};

    use super::{decode_line, execute, spawn, ExecutionResult, RunState};

    /// Write an executable shell script standing in for the programmer.
    fn fake_tool(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("STVP_CmdLine");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn command_for(tool: &Path) -> LaunchCommand {
        LaunchCommand::build(&Settings {
            tool_path: tool.to_path_buf(),
            ..Settings::default()
        })
    }

    fn run_collect(command: &LaunchCommand) -> (RunState, Vec<String>, bool) {
        let (log_tx, log_rx) = unbounded_channel();
        let mut became_running = false;
        let state = execute(command, &log_tx, || became_running = true);
        drop(log_tx);
        (state, log_rx.iter().collect(), became_running)
    }

    #[test]
    fn exit_0_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(&dir, "echo \"Device: $4\"\necho 'Verify OK'");
        let (state, lines, became_running) = run_collect(&command_for(&tool));

        assert!(became_running);
        assert_eq!(
            state,
            RunState::Completed(ExecutionResult {
                exit_code: 0,
                succeeded: true
            })
        );
        assert!(state.succeeded());
        assert!(lines[0].starts_with("starting command: "));
        assert_eq!(lines[1], "Device: -Device=STM8S003K3");
        assert_eq!(lines[2], "Verify OK");
        assert_eq!(lines.last().unwrap(), "programming completed successfully");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn exit_1_is_failure_with_code() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(&dir, "echo 'Error: no target'\nexit 1");
        let (state, lines, _) = run_collect(&command_for(&tool));

        assert_eq!(
            state,
            RunState::Completed(ExecutionResult {
                exit_code: 1,
                succeeded: false
            })
        );
        assert_eq!(state.to_string(), "Failed (exit code 1)");
        assert_eq!(lines.last().unwrap(), "programming failed (exit code 1)");
    }

    #[test]
    fn not_executable_is_launch_failure() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("STVP_CmdLine");
        fs::write(&tool, "not a program").unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o644)).unwrap();
        let (state, lines, became_running) = run_collect(&command_for(&tool));

        assert!(!became_running);
        assert!(matches!(state, RunState::LaunchFailed(_)));
        assert!(!state.succeeded());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("starting command: "));
        assert!(lines[1].starts_with("failed to launch "));
    }

    #[test]
    fn stderr_is_merged_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(&dir, "echo one\necho two 1>&2\necho three");
        let (_, lines, _) = run_collect(&command_for(&tool));
        assert_eq!(lines[1..4], ["one", "two", "three"]);
    }

    #[test]
    fn crlf_and_missing_final_newline() {
        assert_eq!(decode_line(b"Blank check\r\n"), "Blank check");
        assert_eq!(decode_line(b"no newline"), "no newline");
        assert_eq!(decode_line(b"\n"), "");
        assert_eq!(decode_line(b"bad \xff byte\n"), "bad \u{fffd} byte");
    }

    #[test]
    fn thousand_lines_keep_order() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(&dir, "i=1\nwhile [ $i -le 1000 ]; do echo \"line $i\"; i=$((i+1)); done");
        let (state, lines, _) = run_collect(&command_for(&tool));

        assert!(state.succeeded());
        let output = &lines[1..lines.len() - 1];
        let expected = (1..=1000).map(|i| format!("line {}", i)).collect_vec();
        assert_eq!(output, expected.as_slice());
    }

    #[test]
    fn daemon_reports_running_then_terminal_state() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(&dir, "exit 3");
        let (log_tx, log_rx) = unbounded_channel();
        let (events_tx, events_rx) = unbounded_channel();
        spawn(command_for(&tool), log_tx, events_tx).unwrap().join().unwrap();

        let states = events_rx
            .try_iter()
            .map(|ev| match ev {
                AppEvent::RunStateChanged(s) => s,
                other => panic!("unexpected event {:?}", other),
            })
            .collect_vec();
        assert_eq!(
            states,
            vec![
                RunState::Running,
                RunState::Completed(ExecutionResult {
                    exit_code: 3,
                    succeeded: false
                })
            ]
        );
        assert_eq!(log_rx.try_iter().last().unwrap(), "programming failed (exit code 3)");
    }

    #[test]
    fn daemon_output_reaches_log_file_and_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(&dir, "i=1\nwhile [ $i -le 1000 ]; do echo \"row $i\"; i=$((i+1)); done");
        let log_path = dir.path().join("prog.log");
        let (log_tx, log_rx) = unbounded_channel();
        let (events_tx, _events_rx) = unbounded_channel();
        let mut sink = LogSink::open(&log_path, log_rx);

        let daemon = spawn(command_for(&tool), log_tx, events_tx).unwrap();
        let mut transcript = vec![];
        // drain while the daemon is still producing
        while !daemon.is_finished() {
            sink.drain(|l| transcript.push(l.to_string()));
        }
        daemon.join().unwrap();
        sink.drain(|l| transcript.push(l.to_string()));

        let rows = (1..=1000).map(|i| format!("row {}", i)).collect_vec();
        assert_eq!(transcript.len(), 1002);
        assert_eq!(&transcript[1..1001], rows.as_slice());
        assert_eq!(transcript[1001], "programming completed successfully");

        let persisted = fs::read_to_string(&log_path).unwrap();
        assert_eq!(persisted.lines().filter(|l| l.starts_with("row ")).collect_vec(), rows);
        assert!(persisted.ends_with("programming completed successfully\n"));
    }

    #[test]
    fn daemon_reports_launch_failure_without_running() {
        let dir = tempfile::tempdir().unwrap();
        let (log_tx, _log_rx) = unbounded_channel();
        let (events_tx, events_rx) = unbounded_channel();
        let missing = dir.path().join("nope");
        spawn(command_for(&missing), log_tx, events_tx).unwrap().join().unwrap();

        let events = events_rx.try_iter().collect_vec();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            AppEvent::RunStateChanged(RunState::LaunchFailed(_))
        ));
    }
}
