use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer};
use uuid::Uuid;

use crate::models::{Ticket, TicketPriority, TicketStatus};
use crate::overdue;

/// Ticket list filter. Every predicate that is set must hold.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketFilter {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<TicketStatus>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub priority: Option<TicketPriority>,
    #[serde(default)]
    pub search: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub assigned_to: Option<Uuid>,
    /// Restrict to the overdue view.
    #[serde(default)]
    pub overdue: bool,
}

/// `?status=` selects every status, same as leaving the parameter out.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map(Some).map_err(de::Error::custom)
        }
        _ => Ok(None),
    }
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket, now: DateTime<Utc>) -> bool {
        if self.status.is_some_and(|status| status != ticket.status) {
            return false;
        }
        if self.priority.is_some_and(|priority| priority != ticket.priority) {
            return false;
        }
        if self.assigned_to.is_some() && self.assigned_to != ticket.assigned_to {
            return false;
        }
        if self.overdue && !overdue::is_overdue(ticket, now) {
            return false;
        }
        self.matches_search(ticket)
    }

    fn matches_search(&self, ticket: &Ticket) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        ticket.title.to_lowercase().contains(&needle)
            || ticket.description.to_lowercase().contains(&needle)
            || ticket.id.to_string().contains(&needle)
    }

    pub fn apply(&self, tickets: Vec<Ticket>, now: DateTime<Utc>) -> Vec<Ticket> {
        tickets
            .into_iter()
            .filter(|ticket| self.matches(ticket, now))
            .collect()
    }
}
