use thiserror::Error;

pub mod activity;
pub mod comment;
pub mod handler_history;
pub mod team_member;
pub mod ticket;
pub mod user;

pub use activity::{ActivityLog, NewActivityLog};
pub use comment::{Comment, NewComment};
pub use handler_history::{HandlerHistoryEntry, HandlerRotation};
pub use team_member::{NewTeamMember, TeamMember};
pub use ticket::{NewTicket, Ticket, TicketPriority, TicketStatus};
pub use user::{NewUser, Session, User, UserProfile, UserRole};

/// Raised when a stored or submitted string is not a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
