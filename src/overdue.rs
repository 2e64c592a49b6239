//! Overdue evaluation for tickets.
//!
//! Everything here is a pure function of a ticket snapshot and the instant
//! it is evaluated at. Nothing is cached; callers recompute on every read.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::Ticket;

const HOURS_PER_DAY: i64 = 24;

/// Time since the ticket was created. A `created_at` in the future (clock
/// skew, bad data) counts as zero elapsed time.
pub fn elapsed_duration(ticket: &Ticket, now: DateTime<Utc>) -> Duration {
    let elapsed = now.signed_duration_since(ticket.created_at);
    if elapsed < Duration::zero() {
        Duration::zero()
    } else {
        elapsed
    }
}

pub fn is_overdue(ticket: &Ticket, now: DateTime<Utc>) -> bool {
    if !ticket.overdue_enabled || ticket.status.is_completed() {
        return false;
    }

    elapsed_duration(ticket, now) >= Duration::hours(ticket.effective_overdue_hours())
}

/// `"{d}d {h}h"` from one day on, `"{h}h {m}m"` below that.
pub fn elapsed(ticket: &Ticket, now: DateTime<Utc>) -> String {
    let elapsed = elapsed_duration(ticket, now);
    let hours = elapsed.num_hours();

    if hours >= HOURS_PER_DAY {
        format!("{}d {}h", hours / HOURS_PER_DAY, hours % HOURS_PER_DAY)
    } else {
        format!("{}h {}m", hours, elapsed.num_minutes() % 60)
    }
}

pub fn threshold_label(ticket: &Ticket) -> String {
    if !ticket.overdue_enabled {
        return String::new();
    }

    let hours = ticket.effective_overdue_hours();
    if hours % HOURS_PER_DAY == 0 {
        format!("{}d", hours / HOURS_PER_DAY)
    } else {
        format!("{}h", hours)
    }
}

/// Overdue fields attached to every ticket the API returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverdueStatus {
    pub is_overdue: bool,
    pub elapsed: String,
    pub threshold_label: String,
}

impl OverdueStatus {
    pub fn evaluate(ticket: &Ticket, now: DateTime<Utc>) -> Self {
        Self {
            is_overdue: is_overdue(ticket, now),
            elapsed: elapsed(ticket, now),
            threshold_label: threshold_label(ticket),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TicketPriority, TicketStatus};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
    }

    fn ticket(status: TicketStatus, overdue_hours: i32, overdue_enabled: bool) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            title: "Printer jammed".into(),
            description: "Second floor printer".into(),
            status,
            priority: TicketPriority::Medium,
            category: "hardware".into(),
            created_by: Uuid::new_v4(),
            assigned_to: None,
            created_at: created_at(),
            updated_at: created_at(),
            overdue_hours,
            overdue_enabled,
        }
    }

    #[test]
    fn test_disabled_is_never_overdue() {
        let t = ticket(TicketStatus::Open, 1, false);
        assert!(!is_overdue(&t, created_at() + Duration::days(365)));
    }

    #[test]
    fn test_completed_is_never_overdue() {
        for status in [TicketStatus::Resolved, TicketStatus::Closed] {
            let t = ticket(status, 1, true);
            assert!(!is_overdue(&t, created_at() + Duration::days(30)));
        }
    }

    #[test]
    fn test_boundary_is_inclusive() {
        for status in [TicketStatus::Open, TicketStatus::InProgress] {
            let t = ticket(status, 24, true);
            assert!(is_overdue(&t, created_at() + Duration::hours(24)));
            // 0.01 hours short of the threshold
            let just_before = created_at() + Duration::hours(24) - Duration::seconds(36);
            assert!(!is_overdue(&t, just_before));
        }
    }

    #[test]
    fn test_invalid_threshold_falls_back_to_default() {
        let t = ticket(TicketStatus::Open, 0, true);
        assert!(!is_overdue(&t, created_at() + Duration::hours(23)));
        assert!(is_overdue(&t, created_at() + Duration::hours(24)));
        assert_eq!(threshold_label(&t), "1d");
    }

    #[test]
    fn test_threshold_labels() {
        assert_eq!(threshold_label(&ticket(TicketStatus::Open, 24, true)), "1d");
        assert_eq!(threshold_label(&ticket(TicketStatus::Open, 36, true)), "36h");
        assert_eq!(threshold_label(&ticket(TicketStatus::Open, 48, true)), "2d");
        assert_eq!(threshold_label(&ticket(TicketStatus::Open, 48, false)), "");
    }

    #[test]
    fn test_elapsed_strings() {
        let t = ticket(TicketStatus::Open, 24, true);
        assert_eq!(elapsed(&t, created_at() + Duration::hours(25)), "1d 1h");
        assert_eq!(elapsed(&t, created_at() + Duration::minutes(90)), "1h 30m");
        assert_eq!(elapsed(&t, created_at()), "0h 0m");
    }

    #[test]
    fn test_future_created_at_clamps_to_zero() {
        let t = ticket(TicketStatus::Open, 1, true);
        let before_creation = created_at() - Duration::hours(5);
        assert_eq!(elapsed(&t, before_creation), "0h 0m");
        assert!(!is_overdue(&t, before_creation));
    }

    #[test]
    fn test_evaluate_bundles_all_fields() {
        let t = ticket(TicketStatus::InProgress, 36, true);
        let status = OverdueStatus::evaluate(&t, created_at() + Duration::hours(40));
        assert_eq!(
            status,
            OverdueStatus {
                is_overdue: true,
                elapsed: "1d 16h".into(),
                threshold_label: "36h".into(),
            }
        );
    }
}
