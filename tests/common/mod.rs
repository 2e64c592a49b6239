#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use portal_server::clock::ManualClock;
use portal_server::config::Config;
use portal_server::menu::Menu;
use portal_server::models::UserRole;
use portal_server::routes::create_routes;
use portal_server::state::AppState;
use portal_server::store::{MemoryBlobStore, MemoryStore};

pub const ADMIN: (&str, &str) = ("admin", "admin-password");
pub const STAFF: (&str, &str) = ("staff", "staff-password");

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub blobs: Arc<MemoryBlobStore>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_menu(Menu::default()).await
    }

    pub async fn with_menu(menu: Menu) -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap(),
        ));
        let blobs = Arc::new(MemoryBlobStore::new());
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            blobs.clone(),
            clock.clone(),
            menu,
            Config::default(),
        );

        let now = state.now();
        state
            .auth
            .register(ADMIN.0, ADMIN.1, "Portal Admin", UserRole::Admin, now)
            .await
            .expect("register admin");
        state
            .auth
            .register(STAFF.0, STAFF.1, "Help Desk", UserRole::Staff, now)
            .await
            .expect("register staff");

        Self {
            router: create_routes(state.clone()),
            state,
            clock,
            blobs,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send(method, uri, token, body.map(|body| body.to_string()))
            .await
    }

    /// Sends `body` verbatim as a JSON request body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body)),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    pub async fn login(&self, credentials: (&str, &str)) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": credentials.0, "password": credentials.1 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["data"]["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    pub async fn create_ticket(&self, token: &str, body: Value) -> Value {
        let (status, body) = self
            .request(Method::POST, "/api/tickets", Some(token), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        body["data"].clone()
    }
}

pub fn image(bytes: &[u8]) -> Value {
    json!({ "content_type": "image/jpeg", "data": B64.encode(bytes) })
}
