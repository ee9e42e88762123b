//! Action menu model: descriptors offered for a pod and the current selection.

use crate::controller::events::{ActionError, ActionErrorContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Refresh,
    Delete,
    Compose,
}

impl ActionKind {
    pub fn name(self) -> &'static str {
        match self {
            ActionKind::Refresh => "refresh",
            ActionKind::Delete => "delete",
            ActionKind::Compose => "compose",
        }
    }

    pub fn error_context(self) -> ActionErrorContext {
        match self {
            ActionKind::Refresh => ActionErrorContext::Refresh,
            ActionKind::Delete => ActionErrorContext::Delete,
            ActionKind::Compose => ActionErrorContext::Compose,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub kind: ActionKind,
    pub title: &'static str,
    pub sentence: &'static str,
}

impl ActionDescriptor {
    pub fn refresh() -> Self {
        Self {
            kind: ActionKind::Refresh,
            title: "Refresh",
            sentence: "refresh",
        }
    }

    pub fn delete() -> Self {
        Self {
            kind: ActionKind::Delete,
            title: "Delete",
            sentence: "delete",
        }
    }

    pub fn compose() -> Self {
        Self {
            kind: ActionKind::Compose,
            title: "Compose",
            sentence: "compose",
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSelection {
    pub option: Option<ActionKind>,
    pub options: Vec<ActionDescriptor>,
    /// True only while `action_go` awaits the pods manager. The controller
    /// is borrowed mutably for that whole span, so the shell observes it
    /// through `ShellEvent::ActionStarted`/`ActionFinished` instead.
    pub in_progress: bool,
    pub error: Option<ActionError>,
}

impl Default for ActionSelection {
    fn default() -> Self {
        Self {
            option: None,
            options: vec![ActionDescriptor::refresh(), ActionDescriptor::delete()],
            in_progress: false,
            error: None,
        }
    }
}

impl ActionSelection {
    pub fn offers(&self, kind: ActionKind) -> bool {
        self.options.iter().any(|option| option.kind == kind)
    }

    pub fn selected(&self) -> Option<&ActionDescriptor> {
        let kind = self.option?;
        self.options.iter().find(|option| option.kind == kind)
    }

    /// Puts `descriptor` at the front unless already offered.
    pub(crate) fn offer_first(&mut self, descriptor: ActionDescriptor) {
        if !self.offers(descriptor.kind) {
            self.options.insert(0, descriptor);
        }
    }

    pub(crate) fn withdraw(&mut self, kind: ActionKind) {
        self.options.retain(|option| option.kind != kind);
    }
}
