use serde::{Deserialize, Serialize};
use std::fmt;

/// Code carried by errors that the sentence splitter raises for a single document.
pub const SEGMENTATION_FAILURE: &str = "SEGMENT_TEXT_TOO_LONG";

/// Single structured error shape shared by the core, the store and the CLI.
///
/// `code` is a stable SCREAMING_SNAKE identifier namespaced by layer
/// (`CONFIG_*`, `SEGMENT_*`, `FILTER_*`, `SOURCE_*`, `STORE_*`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// True when the error only invalidates one document and the run may continue.
    pub fn is_segmentation_failure(&self) -> bool {
        self.code == SEGMENTATION_FAILURE
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.details.as_deref() {
            Some(d) => write!(f, "[{}] {} ({})", self.code, self.message, d),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

impl std::error::Error for AppError {}
