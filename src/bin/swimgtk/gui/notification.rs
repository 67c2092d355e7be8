use gtk::{prelude::*, ButtonsType, MessageDialog, MessageType, Window};
use log::{debug, error, info, warn};
use notify_rust::{error as notify_error, Hint, Notification, NotificationHandle, Timeout, Urgency};
use stm8_swim_gtk::{consts::{APP_NAME, WINDOW_TITLE}, notify_method::NotifyMethod};

/// Unifies logging levels from `log` crate's macros,
/// `gtk::MessageType` (for prompt) and `notify_rust::Urgency` (for toast).
#[derive(Debug, Clone, Copy)]
pub enum Level {
    Info,
    #[allow(dead_code)]
    Warn,
    Error,
}

impl From<Level> for MessageType {
    fn from(level: Level) -> Self {
        match level {
            Level::Info => MessageType::Info,
            Level::Warn => MessageType::Warning,
            Level::Error => MessageType::Error,
        }
    }
}
impl From<Level> for Urgency {
    fn from(level: Level) -> Self {
        match level {
            Level::Info => Urgency::Low,
            Level::Warn => Urgency::Normal,
            Level::Error => Urgency::Critical,
        }
    }
}

/// Send a simple text notification, using the specified method.
pub fn notify(method: NotifyMethod, level: Level, text_1: impl AsRef<str>, text_2: impl AsRef<str>) {
    use NotifyMethod::*;
    match method {
        Disable => {} // do nothing
        Log => notify_log(level, text_1.as_ref(), text_2.as_ref()),
        Prompt => notify_nonblocking_prompt(level.into(), text_1.as_ref(), text_2.as_ref()),
        Toast => {
            let res = notify_toast(level.into(), text_1.as_ref(), text_2.as_ref());
            if let Err(err) = res {
                error!("Failed to show toast notification: {}", err);
            }
        }
    }
}

/// Notification impl for `NotifyMethod::Log`.
fn notify_log(level: Level, text_1: &str, text_2: &str) {
    use Level::*;
    match level {
        Info => info!("Notify-Info: {}, {}", text_1, text_2),
        Warn => warn!("Notify-Warn: {}, {}", text_1, text_2),
        Error => error!("Notify-Error: {}, {}", text_1, text_2),
    }
}

fn build_dialog(parent: Option<&Window>, level: MessageType, text_1: &str, text_2: &str) -> MessageDialog {
    let dialog = MessageDialog::builder()
        .buttons(ButtonsType::Ok)
        .deletable(true)
        .message_type(level)
        .modal(parent.is_some())
        .secondary_text(text_2)
        .text(text_1)
        .title(WINDOW_TITLE)
        .build();
    dialog.set_transient_for(parent);
    dialog
}

/// Notification impl for `NotifyMethod::Prompt`.
fn notify_nonblocking_prompt(level: MessageType, text_1: &str, text_2: &str) {
    debug!("Showing popup; type: {}, title: {}", level, text_1);
    let dialog = build_dialog(None, level, text_1, text_2);
    dialog.connect_response(|dialog, _| {
        dialog.emit_close();
    }); // handle close
    dialog.show_all(); // render
    dialog.present(); // bring to foreground
}

/// Notification impl for `NotifyMethod::Toast`.
fn notify_toast(urgency: Urgency, text_1: &str, text_2: &str) -> notify_error::Result<NotificationHandle> {
    debug!("Sending system notification: urgency: {:?}, title: {}", urgency, text_1);
    Notification::new()
        .appname(APP_NAME)
        .auto_icon()
        .body(text_2)
        .hint(Hint::Category("device".into()))
        .summary(text_1)
        .timeout(Timeout::Default)
        .urgency(urgency)
        .show()
}

/// Show a modal error dialog and wait until the user dismisses it.
pub fn blocking_error(parent: &Window, text_1: &str, text_2: &str) {
    debug!("Showing blocking error dialog: {}: {}", text_1, text_2);
    let dialog = build_dialog(Some(parent), MessageType::Error, text_1, text_2);
    dialog.run();
    dialog.close();
}
