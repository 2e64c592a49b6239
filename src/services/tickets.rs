use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::filter::TicketFilter;
use crate::models::ticket::{DEFAULT_CATEGORY, DEFAULT_OVERDUE_HOURS};
use crate::models::{
    ActivityLog, Comment, HandlerHistoryEntry, NewActivityLog, NewComment, NewTicket, Ticket,
    TicketPriority, TicketStatus,
};
use crate::overdue::{self, OverdueStatus};
use crate::services::auth::SessionContext;
use crate::store::{blob, BlobStore, ImageUpload, TicketStore};
use crate::utils::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub title: String,
    pub description: String,
    pub priority: Option<TicketPriority>,
    pub category: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub overdue_hours: Option<i32>,
    pub overdue_enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: TicketStatus,
}

#[derive(Debug, Deserialize)]
pub struct AssignTicketRequest {
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct OverdueSettingsRequest {
    pub overdue_hours: Option<i32>,
    pub overdue_enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordActivityRequest {
    pub handler_name: String,
    pub action_taken: String,
    #[serde(default)]
    pub notes: String,
    pub status: TicketStatus,
    pub photo: Option<ImageUpload>,
    pub face_photo: Option<ImageUpload>,
}

/// A ticket as the API returns it: stored fields plus overdue state at `now`.
#[derive(Debug, Clone, Serialize)]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: Ticket,
    #[serde(flatten)]
    pub overdue: OverdueStatus,
}

impl TicketView {
    pub fn new(ticket: Ticket, now: DateTime<Utc>) -> Self {
        let overdue = OverdueStatus::evaluate(&ticket, now);
        Self { ticket, overdue }
    }
}

#[derive(Debug, Serialize)]
pub struct TicketDetail {
    pub ticket: TicketView,
    pub comments: Vec<Comment>,
    pub activity_logs: Vec<ActivityLog>,
    pub handler_history: Vec<HandlerHistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct ActivityRecorded {
    pub log: ActivityLog,
    pub ticket: TicketView,
    pub closed_handler_entry: Option<Uuid>,
    pub opened_handler_entry: Option<HandlerHistoryEntry>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TicketStats {
    pub total: usize,
    pub overdue: usize,
    pub by_status: BTreeMap<&'static str, usize>,
    pub by_priority: BTreeMap<&'static str, usize>,
}

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AppError::ValidationError(format!("{} is required", field)))
    } else {
        Ok(trimmed.to_string())
    }
}

fn validate_overdue_hours(hours: i32) -> Result<i32, AppError> {
    if hours >= 1 {
        Ok(hours)
    } else {
        Err(AppError::ValidationError(
            "overdue_hours must be at least 1".to_string(),
        ))
    }
}

#[derive(Clone)]
pub struct TicketService {
    store: Arc<dyn TicketStore>,
    blobs: Arc<dyn BlobStore>,
    max_upload_bytes: usize,
    upload_attempts: u32,
}

impl TicketService {
    pub fn new(
        store: Arc<dyn TicketStore>,
        blobs: Arc<dyn BlobStore>,
        max_upload_bytes: usize,
        upload_attempts: u32,
    ) -> Self {
        Self {
            store,
            blobs,
            max_upload_bytes,
            upload_attempts,
        }
    }

    async fn load(&self, id: Uuid) -> Result<Ticket, AppError> {
        self.store
            .get_ticket(id)
            .await?
            .ok_or_else(|| AppError::ticket_not_found(id))
    }

    async fn ensure_team_member(&self, member_id: Uuid) -> Result<(), AppError> {
        let known = self
            .store
            .list_team_members()
            .await?
            .iter()
            .any(|member| member.id == member_id);
        if known {
            Ok(())
        } else {
            Err(AppError::ValidationError(format!(
                "Team member '{}' does not exist",
                member_id
            )))
        }
    }

    #[instrument(name = "tickets.create", skip(self, context, request), fields(user_id = %context.user.id))]
    pub async fn create_ticket(
        &self,
        context: &SessionContext,
        request: CreateTicketRequest,
        now: DateTime<Utc>,
    ) -> Result<TicketView, AppError> {
        let title = required(&request.title, "title")?;
        let description = required(&request.description, "description")?;

        if (request.overdue_hours.is_some() || request.overdue_enabled.is_some())
            && !context.is_admin()
        {
            return Err(AppError::Forbidden(
                "Only administrators can configure overdue settings".to_string(),
            ));
        }
        let overdue_hours = match request.overdue_hours {
            Some(hours) => validate_overdue_hours(hours)?,
            None => DEFAULT_OVERDUE_HOURS,
        };

        if let Some(member_id) = request.assigned_to {
            self.ensure_team_member(member_id).await?;
        }

        let category = request
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        let new_ticket = NewTicket {
            title,
            description,
            priority: request.priority.unwrap_or(TicketPriority::Medium),
            category,
            created_by: context.user.id,
            assigned_to: request.assigned_to,
            overdue_hours,
            overdue_enabled: request.overdue_enabled.unwrap_or(true),
        };

        let ticket = self
            .store
            .insert_ticket(new_ticket.into_ticket(Uuid::new_v4(), now))
            .await?;

        info!(ticket_id = %ticket.id, priority = %ticket.priority, "Ticket created");
        Ok(TicketView::new(ticket, now))
    }

    pub async fn list_tickets(
        &self,
        filter: &TicketFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<TicketView>, AppError> {
        let tickets = filter.apply(self.store.list_tickets().await?, now);
        debug!(count = tickets.len(), "Tickets listed");
        Ok(tickets
            .into_iter()
            .map(|ticket| TicketView::new(ticket, now))
            .collect())
    }

    pub async fn get_ticket(&self, id: Uuid, now: DateTime<Utc>) -> Result<TicketView, AppError> {
        Ok(TicketView::new(self.load(id).await?, now))
    }

    /// Ticket together with its comments, activity and handler history.
    pub async fn ticket_detail(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<TicketDetail, AppError> {
        let ticket = self.load(id).await?;
        let (comments, activity_logs, handler_history) = tokio::try_join!(
            self.store.list_comments(id),
            self.store.list_activity_logs(id),
            self.store.list_handler_history(id),
        )?;

        Ok(TicketDetail {
            ticket: TicketView::new(ticket, now),
            comments,
            activity_logs,
            handler_history,
        })
    }

    /// Any status may follow any other.
    #[instrument(name = "tickets.change_status", skip(self))]
    pub async fn change_status(
        &self,
        id: Uuid,
        status: TicketStatus,
        now: DateTime<Utc>,
    ) -> Result<TicketView, AppError> {
        let ticket = self
            .store
            .update_ticket_status(id, status, now)
            .await?
            .ok_or_else(|| AppError::ticket_not_found(id))?;

        info!(ticket_id = %id, status = %status, "Ticket status changed");
        Ok(TicketView::new(ticket, now))
    }

    pub async fn assign(
        &self,
        id: Uuid,
        assigned_to: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<TicketView, AppError> {
        if let Some(member_id) = assigned_to {
            self.ensure_team_member(member_id).await?;
        }

        let ticket = self
            .store
            .update_ticket_assignee(id, assigned_to, now)
            .await?
            .ok_or_else(|| AppError::ticket_not_found(id))?;

        info!(ticket_id = %id, assigned_to = ?assigned_to, "Ticket assignee changed");
        Ok(TicketView::new(ticket, now))
    }

    /// Admin only. Omitted fields keep their current value.
    pub async fn update_overdue_settings(
        &self,
        context: &SessionContext,
        id: Uuid,
        request: OverdueSettingsRequest,
        now: DateTime<Utc>,
    ) -> Result<TicketView, AppError> {
        context.require_admin()?;

        let current = self.load(id).await?;
        let overdue_hours = match request.overdue_hours {
            Some(hours) => validate_overdue_hours(hours)?,
            None => current.overdue_hours,
        };
        let overdue_enabled = request.overdue_enabled.unwrap_or(current.overdue_enabled);

        let ticket = self
            .store
            .update_overdue_settings(id, overdue_hours, overdue_enabled, now)
            .await?
            .ok_or_else(|| AppError::ticket_not_found(id))?;

        info!(
            ticket_id = %id,
            overdue_hours,
            overdue_enabled,
            "Overdue settings updated"
        );
        Ok(TicketView::new(ticket, now))
    }

    pub async fn add_comment(
        &self,
        context: &SessionContext,
        ticket_id: Uuid,
        request: CreateCommentRequest,
        now: DateTime<Utc>,
    ) -> Result<Comment, AppError> {
        let content = required(&request.content, "content")?;
        self.load(ticket_id).await?;

        let new_comment = NewComment {
            ticket_id,
            author_id: context.user.id,
            content,
        };
        let comment = self
            .store
            .insert_comment(new_comment.into_comment(Uuid::new_v4(), now))
            .await?;

        info!(ticket_id = %ticket_id, comment_id = %comment.id, "Comment added");
        Ok(comment)
    }

    pub async fn list_comments(&self, ticket_id: Uuid) -> Result<Vec<Comment>, AppError> {
        self.load(ticket_id).await?;
        self.store.list_comments(ticket_id).await
    }

    /// Uploads the photos, then writes the log, the new status and the
    /// handler rotation in one store transaction.
    #[instrument(
        name = "tickets.record_activity",
        skip(self, request),
        fields(handler = %request.handler_name, status = %request.status)
    )]
    pub async fn record_activity(
        &self,
        ticket_id: Uuid,
        request: RecordActivityRequest,
        now: DateTime<Utc>,
    ) -> Result<ActivityRecorded, AppError> {
        let handler_name = required(&request.handler_name, "handler_name")?;
        let action_taken = required(&request.action_taken, "action_taken")?;
        let face_photo = request.face_photo.as_ref().ok_or_else(|| {
            AppError::ValidationError("A face verification photo is required".to_string())
        })?;

        // Validate every image before anything is uploaded.
        face_photo.prepare(self.max_upload_bytes)?;
        if let Some(photo) = &request.photo {
            photo.prepare(self.max_upload_bytes)?;
        }

        self.load(ticket_id).await?;

        let face_photo_url = blob::upload_image(
            self.blobs.as_ref(),
            face_photo,
            self.max_upload_bytes,
            self.upload_attempts,
        )
        .await?;
        let photo_url = match &request.photo {
            Some(photo) => Some(
                blob::upload_image(
                    self.blobs.as_ref(),
                    photo,
                    self.max_upload_bytes,
                    self.upload_attempts,
                )
                .await?,
            ),
            None => None,
        };

        let new_log = NewActivityLog {
            ticket_id,
            handler_name,
            action_taken,
            notes: request.notes.trim().to_string(),
            photo_url,
            face_photo_url,
            status: request.status,
        };
        let status = new_log.status;
        let log = new_log.into_log(Uuid::new_v4(), now);

        let outcome = self.store.record_activity(log, status, now).await?;

        info!(
            ticket_id = %ticket_id,
            log_id = %outcome.log.id,
            handover = outcome.opened_entry.is_some(),
            "Activity recorded"
        );
        Ok(ActivityRecorded {
            log: outcome.log,
            ticket: TicketView::new(outcome.ticket, now),
            closed_handler_entry: outcome.closed_entry,
            opened_handler_entry: outcome.opened_entry,
        })
    }

    pub async fn list_activity_logs(&self, ticket_id: Uuid) -> Result<Vec<ActivityLog>, AppError> {
        self.load(ticket_id).await?;
        self.store.list_activity_logs(ticket_id).await
    }

    pub async fn handler_history(
        &self,
        ticket_id: Uuid,
    ) -> Result<Vec<HandlerHistoryEntry>, AppError> {
        self.load(ticket_id).await?;
        self.store.list_handler_history(ticket_id).await
    }

    /// Counts behind the dashboard charts.
    pub async fn stats(&self, now: DateTime<Utc>) -> Result<TicketStats, AppError> {
        let tickets = self.store.list_tickets().await?;

        let mut by_status: BTreeMap<&'static str, usize> =
            TicketStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
        let mut by_priority: BTreeMap<&'static str, usize> =
            TicketPriority::ALL.iter().map(|p| (p.as_str(), 0)).collect();
        let mut overdue_count = 0;

        for ticket in &tickets {
            *by_status.entry(ticket.status.as_str()).or_default() += 1;
            *by_priority.entry(ticket.priority.as_str()).or_default() += 1;
            if overdue::is_overdue(ticket, now) {
                overdue_count += 1;
            }
        }

        Ok(TicketStats {
            total: tickets.len(),
            overdue: overdue_count,
            by_status,
            by_priority,
        })
    }
}
