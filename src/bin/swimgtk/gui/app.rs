//! This module contains code that defines the entire GUI application,
//! and holds all the GUI components.

use std::{
    fmt,
    path::PathBuf,
    process,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::Instant,
};

use crossbeam_channel::{unbounded as unbounded_channel, Receiver, Sender};
use gtk::prelude::*;
use log::{debug, error, info, trace, warn};
use stm8_swim_gtk::{
    command::LaunchCommand,
    consts::*,
    device_model::DeviceModel,
    input_file::InputRole,
    notify_method::NotifyMethod,
    preflight,
    settings::Settings,
};

use crate::{
    clap_def::CliArgs,
    core::{
        log_sink::{self, LogSink},
        runner::{self, RunState},
    },
    event::AppEvent,
};

use super::{
    form::MainForm,
    notification::{self, notify, Level},
};

#[derive(Debug)]
pub enum AppStartError {
    CtrlCError(ctrlc::Error),
    GLibBoolError(glib::BoolError),
}

impl fmt::Display for AppStartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use AppStartError::*;
        match self {
            CtrlCError(e) => write!(f, "AppStartError-CtrlCError: {}", e),
            GLibBoolError(e) => write!(f, "AppStartError-GLibBoolError: {}", e),
        }
    }
}

impl From<ctrlc::Error> for AppStartError {
    fn from(err: ctrlc::Error) -> Self {
        Self::CtrlCError(err)
    }
}
impl From<glib::BoolError> for AppStartError {
    fn from(err: glib::BoolError) -> Self {
        Self::GLibBoolError(err)
    }
}

#[derive(Debug)]
struct GTKApp {
    // core
    config_path: PathBuf,
    /// Only ever mutated by `handle_app_events`, on the GUI thread.
    settings: Settings,
    run_state: RunState,
    run_daemon: Option<JoinHandle<()>>,
    /// The model of the run in flight, as it was when the run started.
    run_model: Option<DeviceModel>,
    events_tx: Sender<AppEvent>,
    events_rx: Receiver<AppEvent>,
    log_tx: Sender<String>,
    log_sink: LogSink,

    // GUI components
    form: MainForm,
    last_preview: Option<Instant>,

    // misc
    notify_method: NotifyMethod,
}

impl GTKApp {
    /// Construct the application.
    fn new(args: &CliArgs) -> Result<Self, AppStartError> {
        let CliArgs {
            config_path,
            log_path,
            notify_method,
            verbose: _,
            quiet: _,
        } = args;

        // init GTK
        gtk::init()?;

        // load settings
        let settings = Settings::load(config_path);
        debug!("Starting with settings: {:?}", settings);

        // previous runs, read before this session's marker is appended
        let backlog = log_sink::read_backlog(log_path, LOG_BACKLOG_MAX_BYTES).unwrap_or_else(|err| {
            warn!("Cannot read previous log file {:?}: {}", log_path, err);
            String::new()
        });

        // core
        let (events_tx, events_rx) = unbounded_channel();
        let (log_tx, log_rx) = unbounded_channel();
        let log_sink = LogSink::open(log_path, log_rx);

        // build permanent GUI components
        let form = MainForm::build_and_show(&settings, &backlog, events_tx.clone());
        form.log_view.follow();

        Ok(Self {
            config_path: config_path.clone(),
            settings,
            run_state: RunState::Idle,
            run_daemon: None,
            run_model: None,
            events_tx,
            events_rx,
            log_tx,
            log_sink,

            form,
            last_preview: None,

            notify_method: *notify_method,
        })
    }

    /// Validate the current settings and launch a run with a snapshot of them.
    fn start(&mut self) {
        if !self.run_state.accepts_start() {
            warn!("A programming run is already in progress; ignoring start request");
            return;
        }

        let snapshot = self.settings.clone();
        let command = match preflight::prepare_run(&snapshot, &self.config_path) {
            Ok(command) => command,
            Err(err) => {
                warn!("Preflight check failed: {}", err);
                notification::blocking_error(&self.form.window, "Cannot start programming", &err.to_string());
                return;
            }
        };

        info!("Starting programming run: {}", command);
        self.run_model = Some(snapshot.device_model);
        self.set_run_state(RunState::Starting);
        match runner::spawn(command.clone(), self.log_tx.clone(), self.events_tx.clone()) {
            Ok(handle) => self.run_daemon = Some(handle),
            Err(err) => {
                error!("Failed to spawn the run daemon: {}", err);
                let state = runner::launch_failed(&command, &self.log_tx, err);
                self.set_run_state(state);
            }
        }
    }

    fn set_run_state(&mut self, state: RunState) {
        debug!("Run state: {:?} -> {:?}", self.run_state, state);
        self.form.show_run_state(&state);

        if state.is_terminal() {
            if let Some(handle) = self.run_daemon.take() {
                // the daemon sends its terminal state as its last action
                if let Err(err) = handle.join() {
                    warn!("The run daemon panicked unexpectedly: {:?}", err);
                }
            }
            let (level, title) = match state.succeeded() {
                true => (Level::Info, "Programming completed"),
                false => (Level::Error, "Programming failed"),
            };
            let text_2 = state.completion_message(self.run_model.take());
            notify(self.notify_method, level, title, text_2);
        }

        self.run_state = state;
    }

    /// Move all queued output lines into both transcripts and the log file.
    fn drain_logs(&mut self) {
        let form = &self.form;
        let count = self.log_sink.drain(|line| {
            form.output.append_line(line);
            form.log_view.append_line(line);
        });
        if count > 0 {
            trace!("Drained {} log lines", count);
            form.output.follow();
            form.log_view.follow();
        }
    }

    /// Recompute the command preview, at most once per `PREVIEW_REFRESH_INTERVAL`.
    fn refresh_preview(&mut self) {
        let due = self
            .last_preview
            .map_or(true, |t| t.elapsed() >= PREVIEW_REFRESH_INTERVAL);
        if due {
            self.form.set_preview(&LaunchCommand::build(&self.settings).to_string());
            self.last_preview = Some(Instant::now());
        }
    }

    fn edit_tool_path(&mut self, path: PathBuf) {
        self.settings.tool_path = path;
    }
    fn edit_model(&mut self, model: DeviceModel) {
        debug!("Device model set to {}", model);
        self.settings.device_model = model;
    }
    fn edit_input_file(&mut self, role: InputRole, path: PathBuf) {
        self.settings.files.set(role, path);
    }

    /// Quit the application.
    ///
    /// A run in progress is not waited for.
    fn quit(&mut self) {
        info!("Quit");
        if self.run_state.is_busy() {
            warn!("Quitting while the programmer is still running");
        }
        // flush whatever is still queued to the log file
        self.drain_logs();
        gtk::main_quit();
    }

    /// Handles the queued incoming app events.
    fn handle_app_events(&mut self) {
        use AppEvent::*;
        // using `while let` rather than `for` due to borrow checker issue
        while let Some(event) = self.events_rx.try_iter().next() {
            trace!("Received an AppEvent: {:?}", event);
            match event {
                EditToolPath(p) => self.edit_tool_path(p),
                EditModel(m) => self.edit_model(m),
                EditInputFile(role, p) => self.edit_input_file(role, p),
                StartRequested => self.start(),
                Quit => {
                    self.quit();
                    return;
                }

                RunStateChanged(state) => {
                    // drain first so the summary line shows before the status changes
                    self.drain_logs();
                    self.set_run_state(state);
                }
            }
        }
    }

    /// One iteration of the GUI loop.
    fn tick(&mut self) {
        self.drain_logs();
        self.handle_app_events();
        if self.run_state.is_busy() {
            self.form.pulse();
        }
        self.refresh_preview();
    }
}

/// Initialise all components and start the GTK main loop.
pub fn run(args: &CliArgs) -> Result<(), AppStartError> {
    // init app
    let mut app = GTKApp::new(args)?;

    // catch signals for soft shutdown
    let shutdown_trigger_count = Arc::new(AtomicUsize::new(0));
    let events_tx = app.events_tx.clone();
    ctrlc::set_handler(move || match shutdown_trigger_count.fetch_add(1, Ordering::SeqCst) {
        0 => {
            info!("Signal received, sending Quit event");
            if events_tx.send(AppEvent::Quit).is_err() {
                error!("Trying to send Quit event for soft shutdown, but all receivers have hung up");
                process::exit(0);
            }
        }
        1 => warn!("Send one more signal for hard shutdown"),
        _ => {
            warn!("Performing hard shutdown");
            process::exit(0);
        }
    })?;

    // starts looping event listeners
    let loop_action_id = glib::timeout_add_local(LOG_DRAIN_INTERVAL, move || {
        app.tick();
        Continue(true)
    });

    // start GTK main loop
    info!("Application started");
    gtk::main(); // blocks until `gtk::main_quit` is called

    // cleanup
    // this is necessary because `app` was moved into the closure
    // and it needs to be dropped for its members to be dropped (hence cleaned up)
    loop_action_id.remove();

    Ok(())
}
