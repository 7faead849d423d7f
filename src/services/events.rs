//! Event lifecycle service
//!
//! Staff create events as drafts and move them through
//! draft -> published -> completed, or cancel them. Events are never deleted;
//! a cancelled or completed event keeps its roster for audit.

use tracing::{debug, info};

use crate::database::StoreGateway;
use crate::models::{AttendanceEntry, Event, EventStatus, NewEvent};
use crate::services::auth::{authorize, Actor, Operation};
use crate::utils::errors::{CharismError, Result};
use crate::utils::logging::log_event_action;

#[derive(Clone)]
pub struct EventService {
    gateway: StoreGateway,
}

impl EventService {
    pub fn new(gateway: StoreGateway) -> Self {
        Self { gateway }
    }

    /// Create a draft event owned by `actor`
    pub async fn create_event(&self, actor: &Actor, mut request: NewEvent) -> Result<Event> {
        authorize(actor, Operation::CreateEvent, None)?;
        request.validate()?;
        request.created_by = actor.id;

        let event = self.gateway.insert(request).await?;
        log_event_action(event.id, "create", actor.id, Some(&event.title));
        Ok(event)
    }

    pub async fn publish(&self, actor: &Actor, event_id: i64) -> Result<Event> {
        self.transition(actor, event_id, EventStatus::Published).await
    }

    pub async fn complete(&self, actor: &Actor, event_id: i64) -> Result<Event> {
        self.transition(actor, event_id, EventStatus::Completed).await
    }

    pub async fn cancel(&self, actor: &Actor, event_id: i64) -> Result<Event> {
        self.transition(actor, event_id, EventStatus::Cancelled).await
    }

    pub async fn get_event(&self, event_id: i64) -> Result<Event> {
        self.gateway.load(event_id).await
    }

    pub async fn list_events(&self, status: Option<EventStatus>) -> Result<Vec<Event>> {
        self.gateway.list(status).await
    }

    /// Live entries in join order
    pub async fn roster(&self, actor: &Actor, event_id: i64) -> Result<Vec<AttendanceEntry>> {
        authorize(actor, Operation::ViewRoster, None)?;
        let event = self.gateway.load(event_id).await?;
        Ok(event.attendance.entries().to_vec())
    }

    /// Entries still awaiting a decision
    pub async fn pending_entries(&self, actor: &Actor, event_id: i64) -> Result<Vec<AttendanceEntry>> {
        authorize(actor, Operation::ViewRoster, None)?;
        let event = self.gateway.load(event_id).await?;
        Ok(event.attendance.pending().cloned().collect())
    }

    async fn transition(&self, actor: &Actor, event_id: i64, target: EventStatus) -> Result<Event> {
        authorize(actor, Operation::ChangeEventStatus, None)?;
        debug!(event_id = event_id, to = %target, "Changing event status");

        let (event, from) = self
            .gateway
            .mutate(
                event_id,
                "change_status",
                |event| {
                    let from = event.status;
                    if !from.can_transition_to(target) {
                        return Err(CharismError::InvalidStateTransition { from, to: target });
                    }
                    event.status = target;
                    Ok(from)
                },
                |event, _| event.status == target,
            )
            .await?;

        log_event_action(event_id, target.as_str(), actor.id, None);
        info!(event_id = event_id, from = %from, to = %target, "Event status changed");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::database::MemoryEventStore;
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn service() -> EventService {
        let gateway = StoreGateway::new(Arc::new(MemoryEventStore::new()), Settings::default().store);
        EventService::new(gateway)
    }

    fn request() -> NewEvent {
        let now = Utc::now();
        NewEvent {
            title: "River cleanup".to_string(),
            description: Some("Bring gloves".to_string()),
            starts_at: now + Duration::days(7),
            ends_at: now + Duration::days(7) + Duration::hours(3),
            capacity: Some(30),
            self_registration: true,
            registration_opens_at: None,
            registration_closes_at: None,
            created_by: 0,
        }
    }

    #[tokio::test]
    async fn test_create_sets_owner_and_draft() {
        let service = service();
        let event = service.create_event(&Actor::admin(3), request()).await.unwrap();
        assert_eq!(event.created_by, 3);
        assert_eq!(event.status, EventStatus::Draft);
    }

    #[tokio::test]
    async fn test_staff_without_manage_events_cannot_create() {
        let service = service();
        let result = service.create_event(&Actor::staff(3), request()).await;
        assert_matches!(result, Err(CharismError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let service = service();
        let admin = Actor::admin(1);
        let event = service.create_event(&admin, request()).await.unwrap();

        assert_matches!(
            service.complete(&admin, event.id).await,
            Err(CharismError::InvalidStateTransition { from: EventStatus::Draft, to: EventStatus::Completed })
        );

        let published = service.publish(&admin, event.id).await.unwrap();
        assert_eq!(published.status, EventStatus::Published);
        let completed = service.complete(&admin, event.id).await.unwrap();
        assert_eq!(completed.status, EventStatus::Completed);

        assert_matches!(service.cancel(&admin, event.id).await, Err(CharismError::InvalidStateTransition { .. }));
        assert_eq!(service.list_events(Some(EventStatus::Completed)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_rejected() {
        let service = service();
        let mut bad = request();
        bad.title = String::new();
        assert_matches!(service.create_event(&Actor::admin(1), bad).await, Err(CharismError::InvalidInput(_)));
    }
}
