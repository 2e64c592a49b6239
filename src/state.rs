use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::config::Config;
use crate::menu::Menu;
use crate::services::{AuthService, TeamService, TicketService};
use crate::store::{BlobStore, TicketStore};

/// Shared handler state. Cloning is cheap; everything sits behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub tickets: TicketService,
    pub team: TeamService,
    pub menu: Arc<Menu>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TicketStore>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        menu: Menu,
        config: Config,
    ) -> Self {
        Self {
            auth: AuthService::new(store.clone(), config.session_ttl_hours),
            tickets: TicketService::new(
                store.clone(),
                blobs,
                config.max_upload_bytes,
                config.upload_retries,
            ),
            team: TeamService::new(store),
            menu: Arc::new(menu),
            clock,
            config: Arc::new(config),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
