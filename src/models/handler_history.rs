use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HandlerHistoryEntry {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub handler_name: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl HandlerHistoryEntry {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Writes needed to keep the handler history in step with a new activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRotation {
    /// Entry to close with `ended_at = now`.
    pub close: Option<Uuid>,
    /// Handler to open a fresh entry for.
    pub open: Option<String>,
}

impl HandlerRotation {
    /// Plans the rotation given the most recent entry for the ticket.
    ///
    /// The same handler continues their shift and nothing is written. A
    /// different handler (or an empty history) opens a new entry, closing
    /// the previous one if it is still open.
    pub fn plan(latest: Option<&HandlerHistoryEntry>, handler_name: &str) -> Self {
        match latest {
            Some(entry) if entry.handler_name == handler_name => Self {
                close: None,
                open: None,
            },
            Some(entry) => Self {
                close: entry.is_open().then_some(entry.id),
                open: Some(handler_name.to_string()),
            },
            None => Self {
                close: None,
                open: Some(handler_name.to_string()),
            },
        }
    }

    pub fn is_noop(&self) -> bool {
        self.close.is_none() && self.open.is_none()
    }
}
