//! # Batch Query Core
//!
//! Request-scoped memoization of ticket data for listing pages.
//!
//! A page that lists many events would otherwise run one ticket query, one
//! ticket-count lookup and one attendee-count query per event. This crate
//! collects the event ids of a render pass into a *batch* and answers every
//! per-event lookup from consolidated queries.
//!
//! ## Core Concepts
//!
//! - **Batch**: ordered, de-duplicated parent ids for one render pass
//! - **Preload**: one ticket query, one count lookup per parent, one attendee-count query
//! - **Accessors**: per-parent lookups that preload lazily
//! - **Render scope**: guard that clears the cache when a render pass ends
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  add / begin_render   ┌───────────────────┐
//! │ Render pass  │ ────────────────────► │ BatchQueryManager │
//! │ (templates)  │ ◄──────────────────── │  batch + 3 maps   │
//! └──────────────┘  get_* (lazy preload) └────────┬──────────┘
//!                                                 │ TicketQuery / AttendeeCountQuery
//!                                        ┌────────▼──────────┐ ┌─────────────────────┐
//!                                        │   TicketStore     │ │ TicketCountProvider │
//!                                        └───────────────────┘ └─────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use batch_query_core::{BatchQueryManager, ParentId};
//!
//! let mut manager = BatchQueryManager::new(store, counts_provider);
//! {
//!     let mut scope = manager.begin_render([ParentId::new(10), ParentId::new(20)]).await?;
//!     let tickets = scope.get_tickets(ParentId::new(10)).await?;
//!     let attendees = scope.get_attendee_count(ParentId::new(10)).await?;
//! } // batch cleared
//! ```

pub use chrono::{DateTime, Utc};

pub mod batch;
pub mod config;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod scope;
pub mod store;
pub mod types;

pub use batch::{Batch, PreloadState};
pub use config::BatchQueryConfig;
pub use error::{BatchQueryError, Result};
pub use manager::BatchQueryManager;
pub use scope::{ListingQuery, ListingWatch, RenderScope};
pub use store::{AttendeeCountQuery, TicketCountProvider, TicketQuery, TicketStore};
pub use types::{KindCounts, ParentId, TicketCountSummary, TicketId, TicketRecord, TicketStatus};
