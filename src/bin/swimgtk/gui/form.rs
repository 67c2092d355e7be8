//! This module contains code that builds the main window and forwards
//! user edits to the app as events.

use std::{path::PathBuf, str::FromStr};

use crossbeam_channel::Sender;
use enum_iterator::all;
use gtk::{
    prelude::*, Align, Box as GtkBox, Button, ComboBoxText, Entry, FileChooserAction, FileChooserNative, FileFilter,
    Image, Label, Notebook, Orientation, ProgressBar, ResponseType, TextBuffer, TextTagTable, TextView, Window,
    WrapMode,
};
use log::{debug, error, warn};
use stm8_swim_gtk::{
    consts::*,
    device_model::DeviceModel,
    input_file::InputRole,
    settings::Settings,
};

use crate::{core::runner::RunState, event::AppEvent};

use super::transcript::Transcript;

/// Patterns offered when picking the programmer binary.
const TOOL_FILTERS: &[(&str, &[&str])] = &[("Executable", &["*.exe"]), ("All files", &["*"])];

#[derive(Debug)]
pub struct MainForm {
    pub window: Window,
    start_button: Button,
    progress: ProgressBar,
    status: Label,
    preview: TextBuffer,
    /// Output of the current session's runs.
    pub output: Transcript,
    /// Output of all runs, including previous sessions.
    pub log_view: Transcript,
}

impl MainForm {
    /// Build the main window, populated from `settings`, and show it.
    pub fn build_and_show(settings: &Settings, log_backlog: &str, events_tx: Sender<AppEvent>) -> Self {
        let grid = gtk::Grid::builder().row_spacing(6).column_spacing(6).margin(12).build();
        let mut row = 0;

        // programmer binary
        let tool_entry = Entry::builder()
            .text(&settings.tool_path.to_string_lossy())
            .hexpand(true)
            .build();
        {
            let events_tx = events_tx.clone();
            tool_entry.connect_changed(move |entry| {
                send_event(&events_tx, AppEvent::EditToolPath(PathBuf::from(entry.text().as_str())));
            });
        }
        grid.attach(&left_label("STVP_CmdLine:"), 0, row, 1, 1);
        grid.attach(&tool_entry, 1, row, 1, 1);
        grid.attach(&browse_button(&tool_entry, "Select the STVP programmer", TOOL_FILTERS), 2, row, 1, 1);
        row += 1;

        // device model; only the fixed list can be selected
        let model_combo = ComboBoxText::new();
        for model in all::<DeviceModel>() {
            let name = model.to_string();
            model_combo.append(Some(name.as_str()), &name);
        }
        model_combo.set_active_id(Some(settings.device_model.to_string().as_str()));
        {
            let events_tx = events_tx.clone();
            model_combo.connect_changed(move |combo| {
                let id = match combo.active_id() {
                    Some(id) => id,
                    None => return,
                };
                match DeviceModel::from_str(id.as_str()) {
                    Ok(model) => send_event(&events_tx, AppEvent::EditModel(model)),
                    Err(err) => warn!("Model selector produced unknown id {:?}: {}", id, err),
                }
            });
        }
        model_combo.set_halign(Align::Start);
        grid.attach(&left_label("STM8 model:"), 0, row, 1, 1);
        grid.attach(&model_combo, 1, row, 1, 1);
        row += 1;

        // input files
        for role in all::<InputRole>() {
            let entry = Entry::builder()
                .text(&settings.files.get(role).to_string_lossy())
                .hexpand(true)
                .build();
            {
                let events_tx = events_tx.clone();
                entry.connect_changed(move |entry| {
                    send_event(
                        &events_tx,
                        AppEvent::EditInputFile(role, PathBuf::from(entry.text().as_str())),
                    );
                });
            }
            let filters = [role.file_filter()];
            let title = format!("Select the {} file", role);
            grid.attach(&left_label(role.label()), 0, row, 1, 1);
            grid.attach(&entry, 1, row, 1, 1);
            grid.attach(&browse_button(&entry, &title, &filters), 2, row, 1, 1);
            row += 1;
        }

        // start, progress and status
        let start_button = Button::with_label("Start programming");
        {
            let events_tx = events_tx.clone();
            start_button.connect_clicked(move |_| send_event(&events_tx, AppEvent::StartRequested));
        }
        start_button.set_halign(Align::Start);
        let progress = ProgressBar::builder().pulse_step(0.1).valign(Align::Center).hexpand(true).build();
        let status = Label::new(Some(RunState::Idle.to_string().as_str()));
        status.set_halign(Align::Start);
        let status_box = GtkBox::new(Orientation::Horizontal, 6);
        status_box.pack_start(&progress, true, true, 0);
        status_box.pack_start(&Label::new(Some("Status:")), false, false, 0);
        status_box.pack_start(&status, false, false, 0);
        grid.attach(&start_button, 0, row, 1, 1);
        grid.attach(&status_box, 1, row, 2, 1);
        row += 1;

        // command preview
        let preview = TextBuffer::new(None::<&TextTagTable>);
        let preview_view = TextView::builder()
            .buffer(&preview)
            .cursor_visible(false)
            .editable(false)
            .monospace(true)
            .wrap_mode(WrapMode::WordChar)
            .build();
        grid.attach(&left_label("Command to run:"), 0, row, 1, 1);
        grid.attach(&preview_view, 1, row, 2, 1);
        row += 1;

        // live output
        let output = Transcript::new("Verbose output", WrapMode::None, "");
        output.widget().set_size_request(-1, 280);
        grid.attach(output.widget(), 0, row, 3, 1);

        // tabs
        let log_view = Transcript::new("Log file", WrapMode::WordChar, log_backlog);
        let notebook = Notebook::new();
        notebook.append_page(&grid, Some(&Label::new(Some("Programming"))));
        notebook.append_page(log_view.widget(), Some(&Label::new(Some("Log"))));

        // logo on top, if any
        let root = GtkBox::new(Orientation::Vertical, 6);
        if settings.logo_path.is_file() {
            debug!("Showing logo {:?}", settings.logo_path);
            root.pack_start(&Image::from_file(&settings.logo_path), false, false, 10);
        }
        root.pack_start(&notebook, true, true, 0);

        let window = Window::builder()
            .child(&root)
            .default_height(820)
            .default_width(900)
            .title(WINDOW_TITLE)
            .build();

        // send event on window destroy
        {
            let events_tx = events_tx.clone();
            window.connect_destroy(move |_| send_event(&events_tx, AppEvent::Quit));
        }

        window.show_all(); // render
        window.present(); // bring to foreground

        Self {
            window,
            start_button,
            progress,
            status,
            preview,
            output,
            log_view,
        }
    }

    /// Reflect a run state in the start button, progress bar and status label.
    pub fn show_run_state(&self, state: &RunState) {
        self.start_button.set_sensitive(!state.is_busy());
        self.status.set_text(&state.to_string());
        if !state.is_busy() {
            self.progress.set_fraction(if state.succeeded() { 1.0 } else { 0.0 });
        }
    }

    /// Advance the indeterminate progress animation.
    pub fn pulse(&self) {
        self.progress.pulse();
    }

    /// Replace the command preview, if it changed.
    pub fn set_preview(&self, text: &str) {
        let (start, end) = self.preview.bounds();
        let current = self.preview.text(&start, &end, false);
        if current.as_ref().map(|s| s.as_str()) != Some(text) {
            self.preview.set_text(text);
        }
    }
}

fn send_event(events_tx: &Sender<AppEvent>, event: AppEvent) {
    if let Err(err) = events_tx.send(event) {
        error!("Trying to send {:?}, but all receivers have hung up.", err.0);
    }
}

fn left_label(text: &str) -> Label {
    let label = Label::new(Some(text));
    label.set_halign(Align::Start);
    label
}

/// A "Browse" button that writes the picked path into `entry`.
fn browse_button(entry: &Entry, title: &str, filters: &[(&str, &[&str])]) -> Button {
    let button = Button::with_label("Browse");
    let entry = entry.clone();
    let title = title.to_string();
    let filters: Vec<FileFilter> = filters
        .iter()
        .map(|(name, patterns)| {
            let filter = FileFilter::new();
            filter.set_name(Some(*name));
            patterns.iter().for_each(|p| filter.add_pattern(p));
            filter
        })
        .collect();
    button.connect_clicked(move |button| {
        let parent = button.toplevel().and_then(|w| w.downcast::<Window>().ok());
        let dialog = FileChooserNative::new(
            Some(&title),
            parent.as_ref(),
            FileChooserAction::Open,
            Some("Open"),
            Some("Cancel"),
        );
        filters.iter().for_each(|f| dialog.add_filter(f));
        if let Some(dir) = PathBuf::from(entry.text().as_str()).parent() {
            if dir.is_dir() {
                dialog.set_current_folder(dir);
            }
        }
        if dialog.run() == ResponseType::Accept {
            match dialog.filename() {
                Some(path) => entry.set_text(&path.to_string_lossy()),
                None => warn!("File chooser accepted without a file"),
            }
        }
    });
    button
}
