use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::Response;

use crate::services::auth::{LoginRequest, SessionContext};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::Json;
use crate::utils::response::{empty_success, success};

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for SessionContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))?;
        state.auth.authenticate(token, state.now()).await
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let response = state.auth.login(request, state.now()).await?;
    Ok(success(response, "Logged in"))
}

pub async fn logout(
    State(state): State<AppState>,
    context: SessionContext,
) -> Result<Response, AppError> {
    state.auth.logout(&context).await?;
    Ok(empty_success("Logged out"))
}

pub async fn me(context: SessionContext) -> Response {
    success(context.user, "Current user")
}
