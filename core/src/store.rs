//! Data-access seams used by the batch cache.
//!
//! The cache never talks to a database directly. It builds a query
//! description (the parent set plus the allow-lists from
//! [`BatchQueryConfig`](crate::config::BatchQueryConfig)) and hands it to a
//! [`TicketStore`]. Ticket-count summaries come from a separate
//! [`TicketCountProvider`], which may keep its own cache.
//!
//! # Implementations
//!
//! - `PostgresTicketStore` / `PostgresTicketCountProvider` (in
//!   `batch-query-postgres`): production implementations
//! - `InMemoryTicketStore` / `InMemoryTicketCountProvider` (in
//!   `batch-query-testing`): deterministic test doubles with call counters

use crate::error::Result;
use crate::types::{ParentId, TicketRecord, TicketStatus};
use std::future::Future;

/// Consolidated ticket query for a batch.
#[derive(Clone, Copy, Debug)]
pub struct TicketQuery<'a> {
    /// Parents whose tickets are wanted.
    pub parents: &'a [ParentId],
    /// Ticket kinds to include.
    pub kinds: &'a [String],
    /// Ticket statuses to include.
    pub statuses: &'a [TicketStatus],
}

/// Consolidated attendee-count query for a batch.
#[derive(Clone, Copy, Debug)]
pub struct AttendeeCountQuery<'a> {
    /// Parents to count attendees for.
    pub parents: &'a [ParentId],
    /// Attendee kinds to count.
    pub kinds: &'a [String],
    /// Meta keys whose value references the parent.
    pub event_meta_keys: &'a [String],
    /// Attendee statuses to leave out of the count.
    pub excluded_statuses: &'a [&'a str],
}

/// Relational store backing the batched queries.
///
/// Each method runs exactly one query for the whole parent set.
pub trait TicketStore: Send + Sync {
    /// Fetch every ticket matching `query`.
    ///
    /// Rows may come back in any order; the manager sorts each parent's
    /// tickets by `(menu_order, id)`. Parents without matching tickets simply
    /// contribute no rows.
    ///
    /// # Errors
    ///
    /// Returns [`BatchQueryError::Storage`](crate::error::BatchQueryError::Storage)
    /// if the query fails.
    fn fetch_tickets(
        &self,
        query: &TicketQuery<'_>,
    ) -> impl Future<Output = Result<Vec<TicketRecord>>> + Send;

    /// Count distinct attendees per parent.
    ///
    /// Parents with no attendees may be omitted from the result.
    ///
    /// # Errors
    ///
    /// Returns [`BatchQueryError::Storage`](crate::error::BatchQueryError::Storage)
    /// if the query fails.
    fn count_attendees(
        &self,
        query: &AttendeeCountQuery<'_>,
    ) -> impl Future<Output = Result<Vec<(ParentId, u64)>>> + Send;
}

/// Per-parent ticket availability summary.
///
/// The summary shape belongs to the provider; the cache stores it without
/// looking inside.
pub trait TicketCountProvider: Send + Sync {
    /// Summary type produced for each parent.
    type Counts: Clone + Send + Sync;

    /// Compute the summary for one parent.
    ///
    /// # Errors
    ///
    /// Returns [`BatchQueryError::CountProvider`](crate::error::BatchQueryError::CountProvider)
    /// or [`BatchQueryError::Storage`](crate::error::BatchQueryError::Storage)
    /// if the summary cannot be computed.
    fn ticket_counts(
        &self,
        parent_id: ParentId,
    ) -> impl Future<Output = Result<Self::Counts>> + Send;
}

impl<T: TicketStore> TicketStore for std::sync::Arc<T> {
    fn fetch_tickets(
        &self,
        query: &TicketQuery<'_>,
    ) -> impl Future<Output = Result<Vec<TicketRecord>>> + Send {
        T::fetch_tickets(self, query)
    }

    fn count_attendees(
        &self,
        query: &AttendeeCountQuery<'_>,
    ) -> impl Future<Output = Result<Vec<(ParentId, u64)>>> + Send {
        T::count_attendees(self, query)
    }
}

impl<T: TicketCountProvider> TicketCountProvider for std::sync::Arc<T> {
    type Counts = T::Counts;

    fn ticket_counts(
        &self,
        parent_id: ParentId,
    ) -> impl Future<Output = Result<Self::Counts>> + Send {
        T::ticket_counts(self, parent_id)
    }
}
