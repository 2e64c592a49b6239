use axum::extract::State;
use axum::response::Response;

use crate::services::team::CreateTeamMemberRequest;
use crate::services::SessionContext;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::Json;
use crate::utils::response::{created, success};

pub async fn list_members(
    State(state): State<AppState>,
    _context: SessionContext,
) -> Result<Response, AppError> {
    let members = state.team.list().await?;
    Ok(success(members, "Team members retrieved"))
}

pub async fn create_member(
    State(state): State<AppState>,
    context: SessionContext,
    Json(request): Json<CreateTeamMemberRequest>,
) -> Result<Response, AppError> {
    let member = state.team.create(&context, request).await?;
    Ok(created(member, "Team member added"))
}
