use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::models::{
    ActivityLog, Comment, HandlerHistoryEntry, HandlerRotation, NewUser, Session, TeamMember,
    Ticket, TicketStatus, User,
};
use crate::store::{ActivityOutcome, TicketStore};
use crate::utils::error::AppError;

const MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and applies pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;

        tracing::info!("Successfully connected to database");

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(format!("Migration failed: {}", e)))?;

        tracing::info!("Migrations run successfully");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl TicketStore for PgStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> Result<User, AppError> {
        let result = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, password_hash, full_name, role, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
                format!("Username '{}' is already taken", user.username),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_session(&self, session: Session) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, created_at, expires_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.token_hash)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_ticket(&self, ticket: Ticket) -> Result<Ticket, AppError> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "INSERT INTO tickets (id, title, description, status, priority, category,
                                  created_by, assigned_to, created_at, updated_at,
                                  overdue_hours, overdue_enabled)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING *",
        )
        .bind(ticket.id)
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(ticket.status.as_str())
        .bind(ticket.priority.as_str())
        .bind(&ticket.category)
        .bind(ticket.created_by)
        .bind(ticket.assigned_to)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .bind(ticket.overdue_hours)
        .bind(ticket.overdue_enabled)
        .fetch_one(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, AppError> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>, AppError> {
        let tickets = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(tickets)
    }

    async fn update_ticket_status(
        &self,
        id: Uuid,
        status: TicketStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, AppError> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "UPDATE tickets SET status = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn update_ticket_assignee(
        &self,
        id: Uuid,
        assigned_to: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, AppError> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "UPDATE tickets SET assigned_to = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(assigned_to)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn update_overdue_settings(
        &self,
        id: Uuid,
        overdue_hours: i32,
        overdue_enabled: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, AppError> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "UPDATE tickets
             SET overdue_hours = $2, overdue_enabled = $3, updated_at = $4
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(overdue_hours)
        .bind(overdue_enabled)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn insert_comment(&self, comment: Comment) -> Result<Comment, AppError> {
        let result = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (id, ticket_id, author_id, content, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(comment.id)
        .bind(comment.ticket_id)
        .bind(comment.author_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(comment) => Ok(comment),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(AppError::ticket_not_found(comment.ticket_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_comments(&self, ticket_id: Uuid) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE ticket_id = $1 ORDER BY created_at ASC",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn record_activity(
        &self,
        log: ActivityLog,
        status: TicketStatus,
        now: DateTime<Utc>,
    ) -> Result<ActivityOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        // Updating the ticket row first also locks it, so concurrent
        // recordings for the same ticket serialize here.
        let ticket = sqlx::query_as::<_, Ticket>(
            "UPDATE tickets SET status = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(log.ticket_id)
        .bind(status.as_str())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::ticket_not_found(log.ticket_id))?;

        let log = sqlx::query_as::<_, ActivityLog>(
            "INSERT INTO activity_logs (id, ticket_id, handler_name, action_taken, notes,
                                        photo_url, face_photo_url, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(log.id)
        .bind(log.ticket_id)
        .bind(&log.handler_name)
        .bind(&log.action_taken)
        .bind(&log.notes)
        .bind(&log.photo_url)
        .bind(&log.face_photo_url)
        .bind(log.created_at)
        .fetch_one(&mut *tx)
        .await?;

        let latest = sqlx::query_as::<_, HandlerHistoryEntry>(
            "SELECT * FROM handler_history
             WHERE ticket_id = $1
             ORDER BY started_at DESC, seq DESC
             LIMIT 1",
        )
        .bind(log.ticket_id)
        .fetch_optional(&mut *tx)
        .await?;

        let rotation = HandlerRotation::plan(latest.as_ref(), &log.handler_name);

        if let Some(closed_id) = rotation.close {
            sqlx::query("UPDATE handler_history SET ended_at = $2 WHERE id = $1")
                .bind(closed_id)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        let opened_entry = match rotation.open {
            Some(handler_name) => Some(
                sqlx::query_as::<_, HandlerHistoryEntry>(
                    "INSERT INTO handler_history (id, ticket_id, handler_name, started_at)
                     VALUES ($1, $2, $3, $4)
                     RETURNING *",
                )
                .bind(Uuid::new_v4())
                .bind(log.ticket_id)
                .bind(handler_name)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?,
            ),
            None => None,
        };

        tx.commit().await?;

        Ok(ActivityOutcome {
            log,
            ticket,
            closed_entry: rotation.close,
            opened_entry,
        })
    }

    async fn list_activity_logs(&self, ticket_id: Uuid) -> Result<Vec<ActivityLog>, AppError> {
        let logs = sqlx::query_as::<_, ActivityLog>(
            "SELECT * FROM activity_logs WHERE ticket_id = $1 ORDER BY created_at DESC",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn list_handler_history(
        &self,
        ticket_id: Uuid,
    ) -> Result<Vec<HandlerHistoryEntry>, AppError> {
        let entries = sqlx::query_as::<_, HandlerHistoryEntry>(
            "SELECT * FROM handler_history WHERE ticket_id = $1 ORDER BY started_at ASC, seq ASC",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn list_team_members(&self) -> Result<Vec<TeamMember>, AppError> {
        let members = sqlx::query_as::<_, TeamMember>("SELECT * FROM team_members ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(members)
    }

    async fn insert_team_member(&self, member: TeamMember) -> Result<TeamMember, AppError> {
        let member = sqlx::query_as::<_, TeamMember>(
            "INSERT INTO team_members (id, name, avatar_url, role)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(member.id)
        .bind(&member.name)
        .bind(&member.avatar_url)
        .bind(&member.role)
        .fetch_one(&self.pool)
        .await?;
        Ok(member)
    }
}
