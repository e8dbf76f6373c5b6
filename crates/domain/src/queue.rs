use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::check_type::CheckType;

/// Queue item lifecycle state. Once terminal (`Completed`/`Failed`) a row is
/// never reopened — resubmission creates a new row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl QueueStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Processing => "processing",
            QueueStatus::Completed => "completed",
            QueueStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => QueueStatus::Pending,
            "processing" => QueueStatus::Processing,
            "completed" => QueueStatus::Completed,
            "failed" => QueueStatus::Failed,
            _ => return None,
        })
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, QueueStatus::Completed | QueueStatus::Failed)
    }

    /// Is this row one that counts toward the "at most one row per
    /// (website_id, check_type) in pending/processing" invariant?
    pub fn is_active(self) -> bool {
        matches!(self, QueueStatus::Pending | QueueStatus::Processing)
    }
}

/// Manual (priority 1) always beats scheduled (priority 0).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(pub u8);

impl Priority {
    pub const SCHEDULED: Priority = Priority(0);
    pub const MANUAL: Priority = Priority(1);
}

/// A requested check, queued for the Queue Processor to drain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueItem {
    pub id: String,
    pub website_id: String,
    pub check_type: CheckType,
    pub status: QueueStatus,
    pub priority: Priority,
    pub requested_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub result_payload: Option<serde_json::Value>,
}

impl QueueItem {
    pub fn new(website_id: impl Into<String>, check_type: CheckType, requested_by: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            website_id: website_id.into(),
            check_type,
            status: QueueStatus::Pending,
            priority: Priority::MANUAL,
            requested_by,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
            result_payload: None,
        }
    }
}
