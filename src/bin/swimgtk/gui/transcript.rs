//! This module contains a read-only, append-only text view used for
//! the live programmer output and for the "Log" tab.

use std::rc::Rc;

use gtk::{prelude::*, CheckButton, Frame, Grid, PolicyType, ScrolledWindow, TextBuffer, TextTagTable, TextView, WrapMode};

#[derive(Debug, Clone)]
pub struct Transcript {
    root: Grid,
    scroll: Rc<ScrolledWindow>,
    buffer: Rc<TextBuffer>,
    auto_scroll: Rc<CheckButton>,
}

impl Transcript {
    /// Create a new `Transcript`, filled with `backlog`.
    pub fn new(title: &str, wrap_mode: WrapMode, backlog: impl AsRef<str>) -> Self {
        let buffer = TextBuffer::new(None::<&TextTagTable>);
        let text_view = TextView::builder()
            .buffer(&buffer)
            .cursor_visible(false)
            .editable(false)
            .monospace(true)
            .wrap_mode(wrap_mode)
            .build();
        let scroll_box = ScrolledWindow::builder()
            .child(&text_view)
            .hscrollbar_policy(PolicyType::Automatic)
            .margin(6)
            .margin_top(0)
            .overlay_scrolling(true)
            .vscrollbar_policy(PolicyType::Always)
            .build();
        let frame = Frame::builder()
            .child(&scroll_box)
            .expand(true)
            .label(title)
            .label_xalign(0.02)
            .build();
        let scroll_checkbox = CheckButton::builder()
            .active(true)
            .hexpand(true)
            .label("Auto-scroll to the newest lines")
            .margin_top(4)
            .build();
        let grid = {
            let grid = Grid::new();
            grid.attach(&frame, 0, 0, 1, 1);
            grid.attach(&scroll_checkbox, 0, 1, 1, 1);
            grid
        };

        let ret = Self {
            root: grid,
            scroll: scroll_box.into(),
            buffer: buffer.into(),
            auto_scroll: scroll_checkbox.into(),
        };

        // insert backlog
        ret.buffer.place_cursor(&ret.buffer.end_iter());
        ret.buffer.insert_at_cursor(backlog.as_ref());

        ret
    }

    /// The widget to pack into a container.
    pub fn widget(&self) -> &Grid {
        &self.root
    }

    /// Append one line; a newline is added.
    pub fn append_line(&self, line: &str) {
        self.buffer.place_cursor(&self.buffer.end_iter());
        self.buffer.insert_at_cursor(line);
        self.buffer.insert_at_cursor("\n");
    }

    /// Scroll to the bottom if auto-scroll is enabled.
    pub fn follow(&self) {
        if self.auto_scroll.is_active() {
            let adjustment = self.scroll.vadjustment();
            adjustment.set_value(adjustment.upper());
        }
    }
}
