use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Comments are append-only; there is no edit or delete path.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
}

impl NewComment {
    pub fn into_comment(self, id: Uuid, now: DateTime<Utc>) -> Comment {
        Comment {
            id,
            ticket_id: self.ticket_id,
            author_id: self.author_id,
            content: self.content,
            created_at: now,
        }
    }
}
