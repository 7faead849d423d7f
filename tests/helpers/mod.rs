//! Test helpers module
//!
//! Shared setup for the integration tests: an in-memory service stack, a
//! notifier that records what it was asked to send, and event fixtures.

#![allow(dead_code)]

pub mod test_context;
pub mod test_data;

pub use test_context::*;
pub use test_data::*;
