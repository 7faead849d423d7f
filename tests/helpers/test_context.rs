//! Test context for unified test setup

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use charism::config::Settings;
use charism::database::{EventStore, MemoryEventStore};
use charism::models::Event;
use charism::services::{Actor, NotificationRequest, NotificationService, Notifier, ServiceFactory};
use charism::{CharismError, Result};

use super::test_data::event_request;

/// Notifier that keeps every request and can be told to fail
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<NotificationRequest>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self { sent: Mutex::new(Vec::new()), fail: true }
    }

    pub fn requests(&self) -> Vec<NotificationRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, request: &NotificationRequest) -> Result<()> {
        self.sent.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(CharismError::Notification("notifier offline".to_string()));
        }
        Ok(())
    }
}

/// Unified test context that manages all test components
pub struct TestContext {
    pub store: Arc<MemoryEventStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub services: ServiceFactory,
    pub admin: Actor,
    pub staff: Actor,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_notifier(RecordingNotifier::default())
    }

    pub fn with_notifier(notifier: RecordingNotifier) -> Self {
        // Initialize logging once; later calls fail harmlessly.
        let _ = charism::utils::logging::init_logging(&Settings::default().logging);

        let store = Arc::new(MemoryEventStore::new());
        let notifier = Arc::new(notifier);
        let notifications = NotificationService::new(notifier.clone(), Duration::from_secs(1));
        let services = ServiceFactory::new(store.clone(), notifications, &Settings::default());

        Self {
            store,
            notifier,
            services,
            admin: Actor::admin(1),
            staff: Actor::staff(2),
        }
    }

    /// Create and publish an event with the given capacity
    pub async fn published_event(&self, capacity: Option<u32>) -> Event {
        let events = &self.services.event_service;
        let event = events
            .create_event(&self.admin, event_request(capacity))
            .await
            .expect("Failed to create event");
        events.publish(&self.admin, event.id).await.expect("Failed to publish event")
    }

    pub async fn reload(&self, event_id: i64) -> Event {
        self.store
            .find_by_id(event_id)
            .await
            .expect("Store read failed")
            .expect("Event missing")
    }
}
