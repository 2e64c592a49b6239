use axum::extract::State;
use axum::response::Response;
use uuid::Uuid;

use crate::filter::TicketFilter;
use crate::services::tickets::{
    AssignTicketRequest, ChangeStatusRequest, CreateCommentRequest, CreateTicketRequest,
    OverdueSettingsRequest, RecordActivityRequest,
};
use crate::services::SessionContext;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{Json, Path, Query};
use crate::utils::response::{created, success};

pub async fn list_tickets(
    State(state): State<AppState>,
    _context: SessionContext,
    Query(filter): Query<TicketFilter>,
) -> Result<Response, AppError> {
    let tickets = state.tickets.list_tickets(&filter, state.now()).await?;
    Ok(success(tickets, "Tickets retrieved"))
}

pub async fn create_ticket(
    State(state): State<AppState>,
    context: SessionContext,
    Json(request): Json<CreateTicketRequest>,
) -> Result<Response, AppError> {
    let ticket = state
        .tickets
        .create_ticket(&context, request, state.now())
        .await?;
    Ok(created(ticket, "Ticket created"))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    _context: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let detail = state.tickets.ticket_detail(id, state.now()).await?;
    Ok(success(detail, "Ticket retrieved"))
}

pub async fn ticket_stats(
    State(state): State<AppState>,
    _context: SessionContext,
) -> Result<Response, AppError> {
    let stats = state.tickets.stats(state.now()).await?;
    Ok(success(stats, "Ticket statistics"))
}

pub async fn change_status(
    State(state): State<AppState>,
    _context: SessionContext,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangeStatusRequest>,
) -> Result<Response, AppError> {
    let ticket = state
        .tickets
        .change_status(id, request.status, state.now())
        .await?;
    Ok(success(ticket, "Ticket status updated"))
}

pub async fn assign_ticket(
    State(state): State<AppState>,
    _context: SessionContext,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignTicketRequest>,
) -> Result<Response, AppError> {
    let ticket = state
        .tickets
        .assign(id, request.assigned_to, state.now())
        .await?;
    Ok(success(ticket, "Ticket assignee updated"))
}

pub async fn update_overdue_settings(
    State(state): State<AppState>,
    context: SessionContext,
    Path(id): Path<Uuid>,
    Json(request): Json<OverdueSettingsRequest>,
) -> Result<Response, AppError> {
    let ticket = state
        .tickets
        .update_overdue_settings(&context, id, request, state.now())
        .await?;
    Ok(success(ticket, "Overdue settings updated"))
}

pub async fn list_comments(
    State(state): State<AppState>,
    _context: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let comments = state.tickets.list_comments(id).await?;
    Ok(success(comments, "Comments retrieved"))
}

pub async fn add_comment(
    State(state): State<AppState>,
    context: SessionContext,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<Response, AppError> {
    let comment = state
        .tickets
        .add_comment(&context, id, request, state.now())
        .await?;
    Ok(created(comment, "Comment added"))
}

pub async fn list_activities(
    State(state): State<AppState>,
    _context: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let logs = state.tickets.list_activity_logs(id).await?;
    Ok(success(logs, "Activity logs retrieved"))
}

pub async fn record_activity(
    State(state): State<AppState>,
    _context: SessionContext,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordActivityRequest>,
) -> Result<Response, AppError> {
    let recorded = state
        .tickets
        .record_activity(id, request, state.now())
        .await?;
    Ok(created(recorded, "Activity recorded"))
}

pub async fn handler_history(
    State(state): State<AppState>,
    _context: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let entries = state.tickets.handler_history(id).await?;
    Ok(success(entries, "Handler history retrieved"))
}
