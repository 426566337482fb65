//! Shared test utilities for sweep crates
//!
//! This crate provides:
//! - **Fixtures**: Pre-built plans, instances and configs
//! - **Builders**: Fluent builders for configs and director tasks
//! - **Mocks**: In-memory collaborators and wiremock HTTP servers
//! - **Assertions**: Helpers for checking operator output and run reports
//! - **Harness**: Wires a config and fakes into an orchestrator
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sweep_tests::{fixtures, mocks, Harness};
//!
//! #[tokio::test]
//! async fn test_recreate_all() {
//!     let inventory = Arc::new(mocks::FakeInventory::new(fixtures::instance::many(2)));
//!     let director = Arc::new(mocks::FakeDirector::new());
//!     let harness = Harness::new(fixtures::config::recreate(), inventory, director);
//!
//!     let (report, output) = harness.run().await;
//!     assert_eq!(report.unwrap().exit_code(), 0);
//!     assert!(output.contains("FINISHED PROCESSING Status: SUCCESS"));
//! }
//! ```

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod harness;
pub mod mocks;

// Re-export commonly used items
pub use builders::{BoshTaskBuilder, IteratorConfigBuilder};
pub use fixtures::{config, instance, plan};
pub use harness::Harness;
pub use mocks::{FakeBroker, FakeDirector, FakeInventory, MockBrokerServer, MockDirectorServer};
