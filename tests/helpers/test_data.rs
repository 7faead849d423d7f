//! Test data helpers for creating event requests

use chrono::{Duration, Utc};
use charism::models::NewEvent;

/// Event starting in a week, open for self-registration with no window
pub fn event_request(capacity: Option<u32>) -> NewEvent {
    let starts_at = Utc::now() + Duration::days(7);
    NewEvent {
        title: "Community pantry".to_string(),
        description: Some("Sorting and packing donated goods".to_string()),
        starts_at,
        ends_at: starts_at + Duration::hours(4),
        capacity,
        self_registration: true,
        registration_opens_at: None,
        registration_closes_at: None,
        created_by: 1,
    }
}
