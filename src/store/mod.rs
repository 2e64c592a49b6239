//! Storage ports.
//!
//! `TicketStore` covers every table the portal reads or writes and
//! `BlobStore` covers uploaded images. Handlers and services only see these
//! traits; Postgres and in-memory backends implement them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    ActivityLog, Comment, HandlerHistoryEntry, NewUser, Session, TeamMember, Ticket,
    TicketStatus, User,
};
use crate::utils::error::AppError;

pub mod blob;
pub mod memory;
pub mod postgres;

pub use blob::{BlobStore, ImageUpload, LocalBlobStore, MemoryBlobStore};
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Everything written by one activity recording.
#[derive(Debug, Clone)]
pub struct ActivityOutcome {
    pub log: ActivityLog,
    pub ticket: Ticket,
    /// Handler-history entry closed because the handler changed.
    pub closed_entry: Option<Uuid>,
    /// Handler-history entry opened for the new handler.
    pub opened_entry: Option<HandlerHistoryEntry>,
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    /// Fails with `Conflict` when the username is taken.
    async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> Result<User, AppError>;

    async fn insert_session(&self, session: Session) -> Result<(), AppError>;
    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>, AppError>;
    async fn delete_session(&self, id: Uuid) -> Result<(), AppError>;
    /// Removes every session expired at `now`, returning how many went.
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError>;

    async fn insert_ticket(&self, ticket: Ticket) -> Result<Ticket, AppError>;
    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, AppError>;
    /// All tickets, newest first.
    async fn list_tickets(&self) -> Result<Vec<Ticket>, AppError>;
    async fn update_ticket_status(
        &self,
        id: Uuid,
        status: TicketStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, AppError>;
    async fn update_ticket_assignee(
        &self,
        id: Uuid,
        assigned_to: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, AppError>;
    async fn update_overdue_settings(
        &self,
        id: Uuid,
        overdue_hours: i32,
        overdue_enabled: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, AppError>;

    async fn insert_comment(&self, comment: Comment) -> Result<Comment, AppError>;
    /// Oldest first.
    async fn list_comments(&self, ticket_id: Uuid) -> Result<Vec<Comment>, AppError>;

    /// Inserts the log, overwrites the ticket status and rotates the handler
    /// history as one atomic unit. Fails with `NotFound` when the ticket does
    /// not exist, in which case nothing is written.
    async fn record_activity(
        &self,
        log: ActivityLog,
        status: TicketStatus,
        now: DateTime<Utc>,
    ) -> Result<ActivityOutcome, AppError>;
    /// Newest first.
    async fn list_activity_logs(&self, ticket_id: Uuid) -> Result<Vec<ActivityLog>, AppError>;
    /// Oldest first.
    async fn list_handler_history(
        &self,
        ticket_id: Uuid,
    ) -> Result<Vec<HandlerHistoryEntry>, AppError>;

    /// Ordered by name.
    async fn list_team_members(&self) -> Result<Vec<TeamMember>, AppError>;
    async fn insert_team_member(&self, member: TeamMember) -> Result<TeamMember, AppError>;
}
