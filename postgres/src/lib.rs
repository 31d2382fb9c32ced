//! `PostgreSQL` backend for the batch query cache.
//!
//! This crate implements the `TicketStore` and `TicketCountProvider` traits
//! from `batch-query-core` on top of sqlx:
//!
//! - [`PostgresTicketStore`]: the two consolidated batch queries
//! - [`PostgresTicketCountProvider`]: per-parent availability summaries
//! - [`PostgresConfig`]: connection pool settings from the environment
//!
//! # Example
//!
//! ```ignore
//! use batch_query_core::{BatchQueryConfig, BatchQueryManager, ParentId};
//! use batch_query_postgres::{PostgresConfig, PostgresTicketCountProvider, PostgresTicketStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchQueryConfig::from_env()?;
//!     let pool = PostgresConfig::from_env().connect().await?;
//!
//!     let store = PostgresTicketStore::new(pool.clone());
//!     store.migrate().await?;
//!     let counts = PostgresTicketCountProvider::new(pool, &config);
//!
//!     let mut manager = BatchQueryManager::new(store, counts).with_config(config);
//!     let mut scope = manager.begin_render([ParentId::new(10)]).await?;
//!     let tickets = scope.get_tickets(ParentId::new(10)).await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod counts;
pub mod store;

pub use config::PostgresConfig;
pub use counts::PostgresTicketCountProvider;
pub use store::PostgresTicketStore;
