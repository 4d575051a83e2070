//! Task data structure.
//!
//! A `Task` is a single to-do record. Its `id` and `created_date` are fixed at
//! creation; only `status` ever changes afterwards.

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::fields::Status;

/// Format used for `created_date`. Stored strings are kept verbatim on reload.
pub const CREATED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub description: String,
    pub status: Status,
    pub created_date: String,
}

impl Task {
    /// Create a pending task stamped with the current local time.
    pub fn new(id: u64, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            status: Status::Pending,
            created_date: Local::now().format(CREATED_DATE_FORMAT).to_string(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}
