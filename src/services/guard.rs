//! Capacity and eligibility guard
//!
//! Pure checks run against an event snapshot before a join is committed.
//! Checks run in a fixed order and the first failure wins.

use chrono::{DateTime, Utc};

use crate::models::{ApprovalState, Event, EventStatus};
use crate::utils::errors::Ineligibility;

/// Decide whether `participant_id` may join `event` at `now`.
///
/// `self_service` marks a participant registering themselves; only those
/// joins are refused when the event is closed to public self-registration.
pub fn check_admission(
    event: &Event,
    participant_id: i64,
    self_service: bool,
    now: DateTime<Utc>,
) -> Result<(), Ineligibility> {
    if event.status != EventStatus::Published || (self_service && !event.self_registration) {
        return Err(Ineligibility::EventNotOpen);
    }
    if !event.registration_window_open(now) {
        return Err(Ineligibility::RegistrationClosed);
    }

    if let Some(entry) = event.attendance.get(participant_id) {
        if entry.approval != ApprovalState::Disapproved {
            return Err(Ineligibility::AlreadyRegistered);
        }
    }

    if let Some(capacity) = event.capacity {
        if event.attendance.active_count() >= capacity as usize {
            return Err(Ineligibility::EventFull);
        }
    }

    Ok(())
}
