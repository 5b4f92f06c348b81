//! Outcome of collecting one signal about a site.

use serde::{Deserialize, Serialize};

/// A collected signal: present, present but from a weaker source, or missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Signal<T> {
    /// Obtained from the primary source.
    Present(T),
    /// Obtained from a fallback source; `reason` says which.
    Degraded { value: T, reason: String },
    /// Not obtained. `reason` is for logs, never for scoring.
    Failed(String),
}

impl<T> Signal<T> {
    /// The value if one was obtained from any source.
    pub fn value(&self) -> Option<&T> {
        match self {
            Signal::Present(v) | Signal::Degraded { value: v, .. } => Some(v),
            Signal::Failed(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Signal::Present(v) | Signal::Degraded { value: v, .. } => Some(v),
            Signal::Failed(_) => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Signal::Present(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Signal::Failed(_))
    }
}
