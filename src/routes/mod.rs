use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{auth, health_check, menu, team, tickets, unknown_route};
use crate::state::AppState;

/// Room for two base64 images (4/3 overhead each) plus the JSON around them.
fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes.saturating_mul(3).saturating_add(64 * 1024)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/menu", get(menu::list_entries))
        .route("/menu/:id", get(menu::resolve_entry))
        .route("/team", get(team::list_members).post(team::create_member))
        .route(
            "/tickets",
            get(tickets::list_tickets).post(tickets::create_ticket),
        )
        .route("/tickets/stats", get(tickets::ticket_stats))
        .route("/tickets/:id", get(tickets::get_ticket))
        .route("/tickets/:id/status", patch(tickets::change_status))
        .route("/tickets/:id/assignee", patch(tickets::assign_ticket))
        .route("/tickets/:id/overdue", patch(tickets::update_overdue_settings))
        .route(
            "/tickets/:id/comments",
            get(tickets::list_comments).post(tickets::add_comment),
        )
        .route(
            "/tickets/:id/activities",
            get(tickets::list_activities).post(tickets::record_activity),
        )
        .route("/tickets/:id/handlers", get(tickets::handler_history))
        .fallback(unknown_route)
}

pub fn create_routes(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(DefaultBodyLimit::max(body_limit(config.max_upload_bytes)))
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(&config))
        .layer(create_cors_layer(&config))
        .with_state(state)
}
