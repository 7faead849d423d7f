//! Database module
//!
//! This module handles event persistence: the store seam, its Postgres and
//! in-memory implementations, and bounded access through the gateway

pub mod connection;
pub mod gateway;
pub mod memory;
pub mod repositories;
pub mod store;

// Re-export commonly used database components
pub use connection::{DatabasePool, create_pool, run_migrations, health_check};
pub use gateway::StoreGateway;
pub use memory::MemoryEventStore;
pub use repositories::EventRepository;
pub use store::{EventChange, EventStore};
