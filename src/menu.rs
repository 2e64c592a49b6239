//! Dashboard menu as a routing table.
//!
//! Each entry carries one tagged action; the client never decides how to
//! open an entry on its own.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MenuAction {
    ExternalLink { url: String },
    EmbeddedFrame { url: String },
    InternalRoute { path: String },
}

/// What the client does when an entry is clicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "navigation", content = "target", rename_all = "snake_case")]
pub enum Navigation {
    OpenNewTab(String),
    Embed(String),
    Route(String),
}

impl MenuAction {
    pub fn dispatch(&self) -> Navigation {
        match self {
            MenuAction::ExternalLink { url } => Navigation::OpenNewTab(url.clone()),
            MenuAction::EmbeddedFrame { url } => Navigation::Embed(url.clone()),
            MenuAction::InternalRoute { path } => Navigation::Route(path.clone()),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            MenuAction::ExternalLink { url } | MenuAction::EmbeddedFrame { url } => {
                if url.starts_with("https://") || url.starts_with("http://") {
                    Ok(())
                } else {
                    Err(format!("'{}' is not an http(s) url", url))
                }
            }
            MenuAction::InternalRoute { path } => {
                if path.starts_with('/') {
                    Ok(())
                } else {
                    Err(format!("route '{}' must start with '/'", path))
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub action: MenuAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct Menu {
    entries: Vec<MenuEntry>,
}

impl Menu {
    pub fn new(entries: Vec<MenuEntry>) -> Result<Self, AppError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.id.trim().is_empty() || entry.label.trim().is_empty() {
                return Err(AppError::ValidationError(
                    "Menu entries need an id and a label".to_string(),
                ));
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(AppError::ValidationError(format!(
                    "Duplicate menu entry '{}'",
                    entry.id
                )));
            }
            entry.action.validate().map_err(|reason| {
                AppError::ValidationError(format!("Menu entry '{}': {}", entry.id, reason))
            })?;
        }
        Ok(Self { entries })
    }

    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let entries: Vec<MenuEntry> = serde_json::from_str(raw)
            .map_err(|e| AppError::ValidationError(format!("Invalid menu file: {}", e)))?;
        Self::new(entries)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::InternalServerError(format!("Cannot read menu file {}: {}", path.display(), e))
        })?;
        let menu = Self::from_json(&raw)?;
        tracing::info!(path = %path.display(), entries = menu.entries.len(), "Menu loaded");
        Ok(menu)
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn resolve(&self, id: &str) -> Option<Navigation> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.action.dispatch())
    }
}

impl Default for Menu {
    fn default() -> Self {
        Self {
            entries: vec![
                MenuEntry {
                    id: "tickets".into(),
                    label: "Tickets".into(),
                    description: "Create and follow up support tickets".into(),
                    action: MenuAction::InternalRoute {
                        path: "/tickets".into(),
                    },
                },
                MenuEntry {
                    id: "team".into(),
                    label: "Team".into(),
                    description: "People handling tickets".into(),
                    action: MenuAction::InternalRoute {
                        path: "/team".into(),
                    },
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MENU_JSON: &str = r#"[
        {"id": "leave", "label": "Leave request", "action": {"kind": "external_link", "url": "https://forms.example.com/leave"}},
        {"id": "roster", "label": "Roster", "description": "Weekly shifts", "action": {"kind": "embedded_frame", "url": "https://sheets.example.com/roster"}},
        {"id": "tickets", "label": "Tickets", "action": {"kind": "internal_route", "path": "/tickets"}}
    ]"#;

    #[test]
    fn test_dispatch_follows_the_tag() {
        let menu = Menu::from_json(MENU_JSON).unwrap();
        assert_eq!(
            menu.resolve("leave"),
            Some(Navigation::OpenNewTab("https://forms.example.com/leave".into()))
        );
        assert_eq!(
            menu.resolve("roster"),
            Some(Navigation::Embed("https://sheets.example.com/roster".into()))
        );
        assert_eq!(menu.resolve("tickets"), Some(Navigation::Route("/tickets".into())));
        assert_eq!(menu.resolve("missing"), None);
    }

    #[test]
    fn test_rejects_duplicates_and_bad_targets() {
        let duplicate = r#"[
            {"id": "a", "label": "A", "action": {"kind": "internal_route", "path": "/a"}},
            {"id": "a", "label": "B", "action": {"kind": "internal_route", "path": "/b"}}
        ]"#;
        assert!(Menu::from_json(duplicate).is_err());

        let bad_url = r#"[{"id": "a", "label": "A", "action": {"kind": "embedded_frame", "url": "javascript:alert(1)"}}]"#;
        assert!(Menu::from_json(bad_url).is_err());

        let bad_route = r#"[{"id": "a", "label": "A", "action": {"kind": "internal_route", "path": "tickets"}}]"#;
        assert!(Menu::from_json(bad_route).is_err());
    }

    #[test]
    fn test_navigation_serializes_with_tag() {
        let nav = Navigation::Embed("https://sheets.example.com/roster".into());
        let json = serde_json::to_value(&nav).unwrap();
        assert_eq!(json["navigation"], "embed");
        assert_eq!(json["target"], "https://sheets.example.com/roster");
    }

    #[test]
    fn test_default_menu_is_valid() {
        let menu = Menu::default();
        assert!(Menu::new(menu.entries().to_vec()).is_ok());
    }
}
