use axum::extract::State;
use axum::response::Response;

use crate::services::SessionContext;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::Path;
use crate::utils::response::success;

pub async fn list_entries(State(state): State<AppState>, _context: SessionContext) -> Response {
    success(state.menu.entries(), "Menu retrieved")
}

pub async fn resolve_entry(
    State(state): State<AppState>,
    _context: SessionContext,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let navigation = state
        .menu
        .resolve(&id)
        .ok_or_else(|| AppError::NotFound(format!("Menu entry '{}' was not found", id)))?;
    Ok(success(navigation, "Menu entry resolved"))
}
