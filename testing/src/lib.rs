//! # Batch Query Testing
//!
//! Testing utilities for the batch query cache.
//!
//! This crate provides:
//! - In-memory implementations of the store and ticket-count provider
//! - Call counters and failure injection for asserting query behaviour
//! - Ticket builders
//! - Tracing setup for tests
//!
//! ## Example
//!
//! ```ignore
//! use batch_query_core::{BatchQueryManager, ParentId};
//! use batch_query_testing::{InMemoryTicketCountProvider, InMemoryTicketStore, ticket};
//!
//! #[tokio::test]
//! async fn preload_runs_one_ticket_query() {
//!     let store = InMemoryTicketStore::new();
//!     store.insert_ticket(ticket(1, 10).build());
//!
//!     let mut manager = BatchQueryManager::new(store.clone(), InMemoryTicketCountProvider::new());
//!     manager.add_many([ParentId::new(10), ParentId::new(20)]);
//!     manager.preload().await.unwrap();
//!
//!     assert_eq!(store.ticket_query_count(), 1);
//! }
//! ```

pub mod fixtures;
pub mod store_mocks;

pub use fixtures::{TicketBuilder, ticket};
pub use store_mocks::{AttendeeRecord, InMemoryTicketCountProvider, InMemoryTicketStore};

use batch_query_core::BatchQueryManager;
use tracing_subscriber::EnvFilter;

/// Manager over the in-memory store and provider.
pub type InMemoryManager = BatchQueryManager<InMemoryTicketStore, InMemoryTicketCountProvider>;

/// Build a manager over clones of `store` and `provider`.
///
/// The caller keeps the originals for assertions; clones share data and
/// counters.
#[must_use]
pub fn in_memory_manager(
    store: &InMemoryTicketStore,
    provider: &InMemoryTicketCountProvider,
) -> InMemoryManager {
    BatchQueryManager::new(store.clone(), provider.clone())
}

/// Install a test subscriber honouring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}
