//! CHARISM event registration core
//!
//! Students register for community-service events; staff approve or
//! disapprove registrations and record attendance. This library provides the
//! event and attendance models, the eligibility guard, the registration,
//! approval and lifecycle services, and the stores they persist through.

pub mod config;
pub mod services;
pub mod models;
pub mod database;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{CharismError, Ineligibility, Result};

// Re-export main components for easy access
pub use database::{EventStore, MemoryEventStore, EventRepository, StoreGateway};
pub use services::{Actor, ApprovalService, EventService, RegistrationService, ServiceFactory};
