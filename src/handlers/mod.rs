use axum::response::Response;
use serde::Serialize;

use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod auth;
pub mod menu;
pub mod team;
pub mod tickets;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "portal-api",
    };

    success(payload, "Health check successful")
}

pub async fn unknown_route() -> AppError {
    AppError::NotFound("No such API route".to_string())
}
