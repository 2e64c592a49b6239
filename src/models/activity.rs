use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::TicketStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityLog {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub handler_name: String,
    pub action_taken: String,
    pub notes: String,
    pub photo_url: Option<String>,
    pub face_photo_url: String,
    pub created_at: DateTime<Utc>,
}

/// An activity log ready to be recorded, with its photos already uploaded.
#[derive(Debug, Clone)]
pub struct NewActivityLog {
    pub ticket_id: Uuid,
    pub handler_name: String,
    pub action_taken: String,
    pub notes: String,
    pub photo_url: Option<String>,
    pub face_photo_url: String,
    /// Status the ticket is overwritten with in the same transaction.
    pub status: TicketStatus,
}

impl NewActivityLog {
    pub fn into_log(self, id: Uuid, now: DateTime<Utc>) -> ActivityLog {
        ActivityLog {
            id,
            ticket_id: self.ticket_id,
            handler_name: self.handler_name,
            action_taken: self.action_taken,
            notes: self.notes,
            photo_url: self.photo_url,
            face_photo_url: self.face_photo_url,
            created_at: now,
        }
    }
}
