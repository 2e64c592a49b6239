use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

const AVATAR_BASE_URL: &str = "https://ui-avatars.com/api/";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeamMember {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: String,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct NewTeamMember {
    pub name: String,
    pub role: String,
}

impl NewTeamMember {
    pub fn into_member(self, id: Uuid) -> TeamMember {
        TeamMember {
            id,
            avatar_url: avatar_url_for(&self.name),
            name: self.name,
            role: self.role,
        }
    }
}

/// Same name, same avatar.
pub fn avatar_url_for(name: &str) -> String {
    format!(
        "{}?name={}&background=0D8ABC&color=fff",
        AVATAR_BASE_URL,
        urlencoding::encode(name.trim())
    )
}
