//! Services module
//!
//! This module contains the registration and approval workflow services

pub mod approval;
pub mod auth;
pub mod events;
pub mod guard;
pub mod notification;
pub mod registration;

// Re-export commonly used services
pub use approval::ApprovalService;
pub use auth::{authorize, Actor, Capability, Operation, Role};
pub use events::EventService;
pub use guard::check_admission;
pub use notification::{LogNotifier, NotificationKind, NotificationRequest, NotificationService, Notifier, WebhookNotifier};
pub use registration::RegistrationService;

use std::sync::Arc;

use tracing::info;

use crate::config::settings::{Settings, StoreBackend};
use crate::database::{create_pool, run_migrations, EventRepository, EventStore, MemoryEventStore, StoreGateway};
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub registration_service: RegistrationService,
    pub approval_service: ApprovalService,
    pub event_service: EventService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory over an existing store and notifier
    pub fn new(store: Arc<dyn EventStore>, notifications: NotificationService, settings: &Settings) -> Self {
        let gateway = StoreGateway::new(store, settings.store.clone());

        Self {
            registration_service: RegistrationService::new(gateway.clone()),
            approval_service: ApprovalService::new(gateway.clone(), notifications),
            event_service: EventService::new(gateway),
        }
    }

    /// Build the store and notifier described by `settings` and wire the services
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;

        let store: Arc<dyn EventStore> = match settings.store.backend {
            StoreBackend::Postgres => {
                info!("Connecting to database...");
                let pool = create_pool(&settings.database).await?;
                run_migrations(&pool).await?;
                Arc::new(EventRepository::new(pool))
            }
            StoreBackend::Memory => {
                info!("Using in-memory event store");
                Arc::new(MemoryEventStore::new())
            }
        };

        let notifications = NotificationService::from_config(&settings.notifier)?;
        info!("ServiceFactory created successfully");
        Ok(Self::new(store, notifications, settings))
    }
}
