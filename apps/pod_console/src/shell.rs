//! Layout state fed by controller shell events.

use crossbeam_channel::Receiver;

use crate::controller::{actions::ActionKind, events::ShellEvent};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellState {
    pub title: String,
    pub page: Option<&'static str>,
    pub location: Option<String>,
    /// Action currently running, if any.
    pub busy: Option<ActionKind>,
}

impl ShellState {
    pub fn apply(&mut self, event: ShellEvent) {
        match event {
            ShellEvent::TitleChanged(title) => self.title = title,
            ShellEvent::PageChanged(page) => self.page = Some(page),
            ShellEvent::Navigate(path) => {
                tracing::debug!(%path, "navigating");
                self.location = Some(path);
            }
            ShellEvent::ActionStarted(kind) => self.busy = Some(kind),
            ShellEvent::ActionFinished(kind) => {
                if self.busy == Some(kind) {
                    self.busy = None;
                }
            }
        }
    }

    pub fn absorb(&mut self, events: &Receiver<ShellEvent>) {
        for event in events.try_iter() {
            self.apply(event);
        }
    }
}
