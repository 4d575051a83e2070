//! Enumerations used by task records.

use serde::{Deserialize, Serialize};

/// Task completion status. Moves one way only: `Pending` to `Completed`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Pending,
    Completed,
}

impl Status {
    pub fn is_completed(self) -> bool {
        self == Status::Completed
    }
}

/// Format a task status for display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::Pending => "PENDING",
        Status::Completed => "COMPLETED",
    }
}
