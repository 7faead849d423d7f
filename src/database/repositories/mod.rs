//! Database repositories module
//! 
//! This module contains the Postgres repository implementations

pub mod event;

pub use event::EventRepository;
