use std::sync::Mutex;

use tracing::error;

use crate::ErrorService;

/// Logs raised errors and remembers the most recent one for the shell.
#[derive(Debug, Default)]
pub struct ReportingErrorService {
    last: Mutex<Option<String>>,
}

impl ReportingErrorService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl ErrorService for ReportingErrorService {
    fn raise_error(&self, err: &anyhow::Error) {
        error!("view error: {err:#}");
        if let Ok(mut guard) = self.last.lock() {
            *guard = Some(format!("{err:#}"));
        }
    }
}
