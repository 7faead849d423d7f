//! Registration service implementation
//!
//! Handles participants joining and leaving events. The eligibility guard
//! runs inside the store update, so capacity is checked against the record
//! the join is written to and concurrent joins are admitted one at a time.

use chrono::Utc;
use tracing::{debug, info};

use crate::database::StoreGateway;
use crate::models::AttendanceEntry;
use crate::services::auth::{authorize, Actor, Operation};
use crate::services::guard::check_admission;
use crate::utils::errors::{CharismError, Ineligibility, Result};
use crate::utils::logging::log_event_action;

/// Registration service for join/leave requests
#[derive(Clone)]
pub struct RegistrationService {
    gateway: StoreGateway,
}

impl RegistrationService {
    pub fn new(gateway: StoreGateway) -> Self {
        Self { gateway }
    }

    /// Register `participant_id` for an event as a pending entry
    pub async fn join(&self, actor: &Actor, event_id: i64, participant_id: i64) -> Result<AttendanceEntry> {
        authorize(actor, Operation::Join, Some(participant_id))?;
        debug!(event_id = event_id, participant_id = participant_id, "Processing join request");

        // Roster managers register others even where public self-registration is off.
        let self_service = !actor.can(Operation::Join.required_capability());

        let result = self
            .gateway
            .mutate(
                event_id,
                "join",
                |event| {
                    event.check_capacity_invariant()?;

                    let now = Utc::now();
                    match check_admission(event, participant_id, self_service, now) {
                        Ok(()) => {}
                        Err(Ineligibility::AlreadyRegistered) => {
                            return Err(CharismError::AlreadyRegistered { event_id, participant_id });
                        }
                        Err(reason) => return Err(CharismError::NotEligible(reason)),
                    }

                    if event.attendance.archive_disapproved(participant_id) {
                        debug!(event_id = event_id, participant_id = participant_id, "Archived disapproved entry before re-join");
                    }
                    let entry = AttendanceEntry::pending(participant_id, now);
                    event.attendance.push(entry.clone())?;
                    Ok(entry)
                },
                |event, entry| {
                    event
                        .attendance
                        .get(participant_id)
                        .map_or(false, |stored| stored.registered_at == entry.registered_at)
                },
            )
            .await;

        match result {
            Ok((event, entry)) => {
                log_event_action(event_id, "join", actor.id, None);
                info!(
                    event_id = event_id,
                    participant_id = participant_id,
                    seats_remaining = event.seats_remaining(),
                    "Participant registered"
                );
                Ok(entry)
            }
            Err(e) => {
                debug!(event_id = event_id, participant_id = participant_id, error = %e, "Join rejected");
                Err(e.into_client_visible())
            }
        }
    }

    /// Withdraw a registration that has not been decided yet
    pub async fn leave(&self, actor: &Actor, event_id: i64, participant_id: i64) -> Result<AttendanceEntry> {
        authorize(actor, Operation::Leave, Some(participant_id))?;
        debug!(event_id = event_id, participant_id = participant_id, "Processing leave request");

        let (_, removed) = self
            .gateway
            .mutate(
                event_id,
                "leave",
                |event| {
                    let entry = event
                        .attendance
                        .get(participant_id)
                        .ok_or(CharismError::EntryNotFound { event_id, participant_id })?;
                    if !entry.is_pending() {
                        return Err(CharismError::CannotWithdraw { state: entry.approval });
                    }
                    event
                        .attendance
                        .remove(participant_id)
                        .ok_or(CharismError::EntryNotFound { event_id, participant_id })
                },
                |event, _| !event.attendance.contains(participant_id),
            )
            .await
            .map_err(CharismError::into_client_visible)?;

        log_event_action(event_id, "leave", actor.id, None);
        info!(event_id = event_id, participant_id = participant_id, "Participant withdrew");
        Ok(removed)
    }
}
