//! Shell events and error modeling for the pod details controller.

use thiserror::Error;

use crate::controller::actions::ActionKind;

pub const PODS_PAGE: &str = "pods";
pub const PODS_ROUTE: &str = "/pods";

/// Side effects the controller asks the surrounding shell to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    TitleChanged(String),
    PageChanged(&'static str),
    Navigate(String),
    /// An action call is in flight until the matching `ActionFinished`.
    ActionStarted(ActionKind),
    ActionFinished(ActionKind),
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("invalid pod id in route: {0:?}")]
    InvalidRouteId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionErrorCategory {
    Permission,
    NotFound,
    Validation,
    Transport,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionErrorContext {
    Refresh,
    Delete,
    Compose,
}

/// Failure of a pod action, kept on the selection until it is retried or
/// cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionError {
    category: ActionErrorCategory,
    context: ActionErrorContext,
    message: String,
}

impl ActionError {
    pub fn from_message(context: ActionErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        let category = if lower.contains("forbidden")
            || lower.contains("permission")
            || lower.contains("not authorized")
        {
            ActionErrorCategory::Permission
        } else if lower.contains("does not exist") || lower.contains("not found") {
            ActionErrorCategory::NotFound
        } else if lower.contains("invalid")
            || lower.contains("not composable")
            || lower.contains("required")
        {
            ActionErrorCategory::Validation
        } else if lower.contains("timeout")
            || lower.contains("connection")
            || lower.contains("websocket")
            || lower.contains("unavailable")
            || lower.contains("has not loaded")
        {
            ActionErrorCategory::Transport
        } else {
            ActionErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn from_error(context: ActionErrorContext, err: &anyhow::Error) -> Self {
        Self::from_message(context, format!("{err:#}"))
    }

    pub fn category(&self) -> ActionErrorCategory {
        self.category
    }

    pub fn context(&self) -> ActionErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
