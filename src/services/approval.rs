//! Approval service implementation
//!
//! Staff decide pending registrations and record attendance for approved
//! ones. Decisions are terminal; the entry's own state machine rejects a
//! second decision, and the serialized store update keeps two racing
//! decisions from both landing. A cancelled event takes no further decisions.

use chrono::Utc;
use tracing::debug;

use crate::database::StoreGateway;
use crate::models::{AttendanceEntry, Event, EventStatus};
use crate::services::auth::{authorize, Actor, Operation};
use crate::services::notification::{NotificationKind, NotificationRequest, NotificationService};
use crate::utils::errors::{CharismError, Ineligibility, Result};
use crate::utils::logging::{log_attendance_decision, log_event_action};

/// Approval service for staff decisions on attendance entries
#[derive(Clone)]
pub struct ApprovalService {
    gateway: StoreGateway,
    notifications: NotificationService,
}

impl ApprovalService {
    pub fn new(gateway: StoreGateway, notifications: NotificationService) -> Self {
        Self { gateway, notifications }
    }

    /// pending -> approved, recording the approver
    pub async fn approve(&self, approver: &Actor, event_id: i64, participant_id: i64) -> Result<AttendanceEntry> {
        authorize(approver, Operation::Approve, Some(participant_id))?;
        debug!(event_id = event_id, participant_id = participant_id, approver_id = approver.id, "Approving entry");

        let (event, entry) = self
            .update_entry(event_id, participant_id, "approve", |entry| {
                entry.approve(approver.id, Utc::now())
            })
            .await?;

        log_attendance_decision(event_id, participant_id, approver.id, "approved");
        self.announce(&event, &entry, NotificationKind::RegistrationApproved).await;
        Ok(entry)
    }

    /// pending -> disapproved, keeping the entry for audit
    pub async fn disapprove(
        &self,
        approver: &Actor,
        event_id: i64,
        participant_id: i64,
        reason: Option<String>,
    ) -> Result<AttendanceEntry> {
        authorize(approver, Operation::Disapprove, Some(participant_id))?;
        debug!(event_id = event_id, participant_id = participant_id, approver_id = approver.id, "Disapproving entry");

        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let (event, entry) = self
            .update_entry(event_id, participant_id, "disapprove", |entry| {
                entry.disapprove(approver.id, reason.clone(), Utc::now())
            })
            .await?;

        log_attendance_decision(event_id, participant_id, approver.id, "disapproved");
        self.announce(&event, &entry, NotificationKind::RegistrationDisapproved).await;
        Ok(entry)
    }

    /// Record whether an approved participant attended
    pub async fn mark_attendance(
        &self,
        actor: &Actor,
        event_id: i64,
        participant_id: i64,
        attended: bool,
    ) -> Result<AttendanceEntry> {
        authorize(actor, Operation::MarkAttendance, Some(participant_id))?;

        let (_, entry) = self
            .update_entry(event_id, participant_id, "mark_attendance", |entry| {
                entry.mark_attendance(attended)
            })
            .await?;

        log_event_action(
            event_id,
            "mark_attendance",
            actor.id,
            Some(if attended { "attended" } else { "absent" }),
        );
        Ok(entry)
    }

    async fn update_entry<F>(
        &self,
        event_id: i64,
        participant_id: i64,
        operation: &'static str,
        mut apply: F,
    ) -> Result<(Event, AttendanceEntry)>
    where
        F: FnMut(&mut AttendanceEntry) -> Result<()> + Send,
    {
        self.gateway
            .mutate(
                event_id,
                operation,
                |event| {
                    if event.status == EventStatus::Cancelled {
                        return Err(CharismError::NotEligible(Ineligibility::EventNotOpen));
                    }
                    let entry = event
                        .attendance
                        .get_mut(participant_id)
                        .ok_or(CharismError::EntryNotFound { event_id, participant_id })?;
                    apply(&mut *entry)?;
                    Ok(entry.clone())
                },
                |event, entry| event.attendance.get(participant_id) == Some(entry),
            )
            .await
            .map_err(CharismError::into_client_visible)
    }

    async fn announce(&self, event: &Event, entry: &AttendanceEntry, kind: NotificationKind) {
        let request = NotificationRequest::for_decision(event, entry, kind);
        self.notifications.dispatch(request).await;
    }
}
