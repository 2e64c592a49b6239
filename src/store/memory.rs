use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    ActivityLog, Comment, HandlerHistoryEntry, HandlerRotation, NewUser, Session, TeamMember,
    Ticket, TicketStatus, User,
};
use crate::store::{ActivityOutcome, TicketStore};
use crate::utils::error::AppError;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    sessions: Vec<Session>,
    tickets: Vec<Ticket>,
    comments: Vec<Comment>,
    activity_logs: Vec<ActivityLog>,
    handler_history: Vec<HandlerHistoryEntry>,
    team_members: Vec<TeamMember>,
}

impl Tables {
    fn ticket_mut(&mut self, id: Uuid) -> Option<&mut Ticket> {
        self.tickets.iter_mut().find(|ticket| ticket.id == id)
    }
}

/// Process-local store. Rows live in insertion order; a single lock guards
/// all tables so multi-table writes are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update_ticket<F>(&self, id: Uuid, now: DateTime<Utc>, apply: F) -> Option<Ticket>
    where
        F: FnOnce(&mut Ticket),
    {
        let mut tables = self.tables.write().await;
        let ticket = tables.ticket_mut(id)?;
        apply(ticket);
        ticket.updated_at = now;
        Some(ticket.clone())
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' is already taken",
                user.username
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            password_hash: user.password_hash,
            full_name: user.full_name,
            role: user.role,
            created_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn insert_session(&self, session: Session) -> Result<(), AppError> {
        self.tables.write().await.sessions.push(session);
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .iter()
            .find(|session| session.token_hash == token_hash)
            .cloned())
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), AppError> {
        self.tables
            .write()
            .await
            .sessions
            .retain(|session| session.id != id);
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|session| !session.is_expired(now));
        Ok((before - tables.sessions.len()) as u64)
    }

    async fn insert_ticket(&self, ticket: Ticket) -> Result<Ticket, AppError> {
        self.tables.write().await.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.tickets.iter().find(|ticket| ticket.id == id).cloned())
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>, AppError> {
        let tables = self.tables.read().await;
        // Stable sort over insertion order keeps same-instant tickets newest first.
        let mut tickets: Vec<Ticket> = tables.tickets.iter().rev().cloned().collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    async fn update_ticket_status(
        &self,
        id: Uuid,
        status: TicketStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, AppError> {
        Ok(self
            .update_ticket(id, now, |ticket| ticket.status = status)
            .await)
    }

    async fn update_ticket_assignee(
        &self,
        id: Uuid,
        assigned_to: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, AppError> {
        Ok(self
            .update_ticket(id, now, |ticket| ticket.assigned_to = assigned_to)
            .await)
    }

    async fn update_overdue_settings(
        &self,
        id: Uuid,
        overdue_hours: i32,
        overdue_enabled: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, AppError> {
        Ok(self
            .update_ticket(id, now, |ticket| {
                ticket.overdue_hours = overdue_hours;
                ticket.overdue_enabled = overdue_enabled;
            })
            .await)
    }

    async fn insert_comment(&self, comment: Comment) -> Result<Comment, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.tickets.iter().any(|t| t.id == comment.ticket_id) {
            return Err(AppError::ticket_not_found(comment.ticket_id));
        }
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, ticket_id: Uuid) -> Result<Vec<Comment>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .filter(|comment| comment.ticket_id == ticket_id)
            .cloned()
            .collect())
    }

    async fn record_activity(
        &self,
        log: ActivityLog,
        status: TicketStatus,
        now: DateTime<Utc>,
    ) -> Result<ActivityOutcome, AppError> {
        let mut tables = self.tables.write().await;

        let ticket = {
            let ticket = tables
                .ticket_mut(log.ticket_id)
                .ok_or_else(|| AppError::ticket_not_found(log.ticket_id))?;
            ticket.status = status;
            ticket.updated_at = now;
            ticket.clone()
        };

        let rotation = {
            let latest = tables
                .handler_history
                .iter()
                .rev()
                .find(|entry| entry.ticket_id == log.ticket_id);
            HandlerRotation::plan(latest, &log.handler_name)
        };

        if let Some(closed_id) = rotation.close {
            if let Some(entry) = tables
                .handler_history
                .iter_mut()
                .find(|entry| entry.id == closed_id)
            {
                entry.ended_at = Some(now);
            }
        }

        let opened_entry = rotation.open.map(|handler_name| HandlerHistoryEntry {
            id: Uuid::new_v4(),
            ticket_id: log.ticket_id,
            handler_name,
            started_at: now,
            ended_at: None,
        });
        if let Some(entry) = &opened_entry {
            tables.handler_history.push(entry.clone());
        }

        tables.activity_logs.push(log.clone());

        Ok(ActivityOutcome {
            log,
            ticket,
            closed_entry: rotation.close,
            opened_entry,
        })
    }

    async fn list_activity_logs(&self, ticket_id: Uuid) -> Result<Vec<ActivityLog>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .activity_logs
            .iter()
            .rev()
            .filter(|log| log.ticket_id == ticket_id)
            .cloned()
            .collect())
    }

    async fn list_handler_history(
        &self,
        ticket_id: Uuid,
    ) -> Result<Vec<HandlerHistoryEntry>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .handler_history
            .iter()
            .filter(|entry| entry.ticket_id == ticket_id)
            .cloned()
            .collect())
    }

    async fn list_team_members(&self) -> Result<Vec<TeamMember>, AppError> {
        let tables = self.tables.read().await;
        let mut members = tables.team_members.clone();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }

    async fn insert_team_member(&self, member: TeamMember) -> Result<TeamMember, AppError> {
        self.tables.write().await.team_members.push(member.clone());
        Ok(member)
    }
}
