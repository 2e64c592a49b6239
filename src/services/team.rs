use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::models::{NewTeamMember, TeamMember};
use crate::services::auth::SessionContext;
use crate::store::TicketStore;
use crate::utils::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CreateTeamMemberRequest {
    pub name: String,
    pub role: String,
}

#[derive(Clone)]
pub struct TeamService {
    store: Arc<dyn TicketStore>,
}

impl TeamService {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<TeamMember>, AppError> {
        self.store.list_team_members().await
    }

    pub async fn create(
        &self,
        context: &SessionContext,
        request: CreateTeamMemberRequest,
    ) -> Result<TeamMember, AppError> {
        context.require_admin()?;

        let name = request.name.trim();
        let role = request.role.trim();
        if name.is_empty() || role.is_empty() {
            return Err(AppError::ValidationError(
                "Team members need a name and a role".to_string(),
            ));
        }

        let member = NewTeamMember {
            name: name.to_string(),
            role: role.to_string(),
        }
        .into_member(Uuid::new_v4());
        let member = self.store.insert_team_member(member).await?;

        info!(member_id = %member.id, "Team member added");
        Ok(member)
    }
}
