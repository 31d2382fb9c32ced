//! `BatchQueryManager`: request-scoped memoization of tickets, ticket
//! counts and attendee counts.
//!
//! # Overview
//!
//! Rendering a listing of N events naively costs N ticket queries, N
//! ticket-count lookups and N attendee-count queries. The manager collects
//! the event ids up front and answers every per-event lookup from three
//! consolidated queries:
//!
//! ```text
//! add / add_many ──► Batch ──► preload() ──► tickets          (1 query)
//!                                        ──► ticket counts    (provider, once per id)
//!                                        ──► attendee counts  (1 query)
//! get_* (lazy preload) ◄── result maps ◄──┘
//! clear() at the render boundary
//! ```
//!
//! # Freshness
//!
//! Adding a key that is not yet in the batch marks the results dirty; the
//! next accessor call re-runs the consolidated queries for the whole batch.
//! Results are committed only when all three steps succeed, so a failed
//! preload never leaves a half-populated cache behind.
//!
//! # Example
//!
//! ```ignore
//! let mut manager = BatchQueryManager::new(store, counts_provider);
//!
//! manager.add_many([ParentId::new(10), ParentId::new(20)]);
//! manager.preload().await?;
//!
//! let tickets = manager.get_tickets(ParentId::new(10)).await?;   // Some(rows)
//! let unknown = manager.get_tickets(ParentId::new(99)).await?;   // None
//!
//! manager.clear();
//! ```

use crate::batch::{Batch, PreloadState};
use crate::config::{BatchQueryConfig, EXCLUDED_ATTENDEE_STATUSES};
use crate::error::Result;
use crate::metrics::{
    BATCH_SIZE, KEYS_REGISTERED_TOTAL, PRELOADS_TOTAL, PRELOAD_DURATION_SECONDS,
    PRELOAD_FAILURES_TOTAL, TICKET_COUNTS_CACHE_TOTAL,
};
use crate::store::{AttendeeCountQuery, TicketCountProvider, TicketQuery, TicketStore};
use crate::types::{ParentId, TicketRecord, TicketStatus};
use std::collections::HashMap;
use std::time::Instant;

/// Results of one complete preload, committed as a unit.
struct Preloaded<C> {
    tickets: HashMap<ParentId, Vec<TicketRecord>>,
    ticket_counts: HashMap<ParentId, C>,
    attendee_counts: HashMap<ParentId, u64>,
}

/// Per-request cache over a [`TicketStore`] and a [`TicketCountProvider`].
///
/// The manager is owned by a single render pass. Every method takes
/// `&self` or `&mut self`; there is no interior locking and nothing is
/// shared between requests.
///
/// Lookups distinguish three outcomes:
///
/// - `Ok(None)`: the parent was never registered in the batch
/// - `Ok(Some(empty))`: registered, queried, nothing found
/// - `Err(_)`: the preload failed; earlier results are dropped and nothing
///   is served until a preload succeeds
pub struct BatchQueryManager<S, P>
where
    P: TicketCountProvider,
{
    store: S,
    counts_provider: P,
    config: BatchQueryConfig,
    batch: Batch,
    state: PreloadState,
    tickets: HashMap<ParentId, Vec<TicketRecord>>,
    ticket_counts: HashMap<ParentId, P::Counts>,
    attendee_counts: HashMap<ParentId, u64>,
}

impl<S, P> BatchQueryManager<S, P>
where
    S: TicketStore,
    P: TicketCountProvider,
{
    /// Create a manager with the default configuration.
    #[must_use]
    pub fn new(store: S, counts_provider: P) -> Self {
        Self {
            store,
            counts_provider,
            config: BatchQueryConfig::default(),
            batch: Batch::new(),
            state: PreloadState::Empty,
            tickets: HashMap::new(),
            ticket_counts: HashMap::new(),
            attendee_counts: HashMap::new(),
        }
    }

    /// Replace the configuration.
    ///
    /// Existing results were produced under the old allow-lists, so a
    /// non-empty batch is marked dirty.
    #[must_use]
    pub fn with_config(mut self, config: BatchQueryConfig) -> Self {
        self.config = config;
        if !self.batch.is_empty() {
            self.state = PreloadState::Dirty;
        }
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &BatchQueryConfig {
        &self.config
    }

    /// Current freshness of the cached results.
    #[must_use]
    pub const fn state(&self) -> PreloadState {
        self.state
    }

    /// Registered parent ids, in first-seen order.
    #[must_use]
    pub fn batch(&self) -> &[ParentId] {
        self.batch.keys()
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The ticket-count provider.
    #[must_use]
    pub const fn counts_provider(&self) -> &P {
        &self.counts_provider
    }

    /// Register a parent id. No-op if it is already registered.
    ///
    /// Returns `true` if the id was new, in which case cached results are
    /// marked dirty.
    pub fn add(&mut self, parent_id: ParentId) -> bool {
        if !self.batch.insert(parent_id) {
            return false;
        }
        self.state = PreloadState::Dirty;
        metrics::counter!(KEYS_REGISTERED_TOTAL).increment(1);
        tracing::trace!(parent_id = %parent_id, "Registered parent in batch");
        true
    }

    /// Register several parent ids, preserving first-seen order.
    ///
    /// Returns the number of ids that were new.
    pub fn add_many<I>(&mut self, parent_ids: I) -> usize
    where
        I: IntoIterator<Item = ParentId>,
    {
        let added = parent_ids
            .into_iter()
            .filter(|parent_id| self.add(*parent_id))
            .count();
        if added > 0 {
            tracing::debug!(added, batch_size = self.batch.len(), "Added parents to batch");
        }
        added
    }

    /// Run the consolidated queries for the current batch.
    ///
    /// No-op when the batch is empty or the results are already fresh.
    /// Otherwise runs the ticket query, the ticket-count provider once per
    /// registered parent, and the attendee-count query, in that order. Every
    /// registered parent receives an entry: parents with no rows get an empty
    /// ticket list and an attendee count of zero.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the store or the provider. On error
    /// every previously cached result is dropped, the state stays dirty, and
    /// the next accessor call retries.
    pub async fn preload(&mut self) -> Result<()> {
        if self.batch.is_empty() || self.state == PreloadState::Fresh {
            return Ok(());
        }

        let batch_size = self.batch.len();
        tracing::debug!(batch_size, "Preloading batch");
        let started = Instant::now();

        match self.run_queries().await {
            Ok(preloaded) => {
                self.tickets = preloaded.tickets;
                self.ticket_counts = preloaded.ticket_counts;
                self.attendee_counts = preloaded.attendee_counts;
                self.state = PreloadState::Fresh;

                metrics::counter!(PRELOADS_TOTAL).increment(1);
                metrics::histogram!(PRELOAD_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
                #[allow(clippy::cast_precision_loss)] // Batch sizes are far below 2^52
                metrics::histogram!(BATCH_SIZE).record(batch_size as f64);
                tracing::debug!(
                    batch_size,
                    elapsed = ?started.elapsed(),
                    "Batch preloaded"
                );
                Ok(())
            }
            Err(error) => {
                self.tickets.clear();
                self.ticket_counts.clear();
                self.attendee_counts.clear();
                metrics::counter!(PRELOAD_FAILURES_TOTAL).increment(1);
                tracing::warn!(batch_size, error = %error, "Batch preload failed");
                Err(error)
            }
        }
    }

    async fn run_queries(&self) -> Result<Preloaded<P::Counts>> {
        let keys = self.batch.keys();
        let tickets = self.load_tickets(keys).await?;
        let ticket_counts = self.load_ticket_counts(keys).await?;
        let attendee_counts = self.load_attendee_counts(keys).await?;
        Ok(Preloaded {
            tickets,
            ticket_counts,
            attendee_counts,
        })
    }

    async fn load_tickets(&self, keys: &[ParentId]) -> Result<HashMap<ParentId, Vec<TicketRecord>>> {
        let query = TicketQuery {
            parents: keys,
            kinds: &self.config.ticket_kinds,
            statuses: &TicketStatus::VISIBLE,
        };
        let rows = self.store.fetch_tickets(&query).await?;

        let mut grouped: HashMap<ParentId, Vec<TicketRecord>> =
            keys.iter().map(|key| (*key, Vec::new())).collect();
        for row in rows {
            match grouped.get_mut(&row.parent_id) {
                Some(tickets) => tickets.push(row),
                None => tracing::debug!(
                    parent_id = %row.parent_id,
                    ticket_id = %row.id,
                    "Ignoring ticket outside the batch"
                ),
            }
        }
        for tickets in grouped.values_mut() {
            tickets.sort_by_key(|t| (t.menu_order, t.id));
        }
        Ok(grouped)
    }

    async fn load_ticket_counts(&self, keys: &[ParentId]) -> Result<HashMap<ParentId, P::Counts>> {
        let mut counts = HashMap::with_capacity(keys.len());
        for key in keys {
            let summary = self.counts_provider.ticket_counts(*key).await?;
            counts.insert(*key, summary);
        }
        Ok(counts)
    }

    async fn load_attendee_counts(&self, keys: &[ParentId]) -> Result<HashMap<ParentId, u64>> {
        let query = AttendeeCountQuery {
            parents: keys,
            kinds: &self.config.attendee_kinds,
            event_meta_keys: &self.config.attendee_event_meta_keys,
            excluded_statuses: EXCLUDED_ATTENDEE_STATUSES,
        };
        let rows = self.store.count_attendees(&query).await?;

        let mut counts: HashMap<ParentId, u64> = keys.iter().map(|key| (*key, 0)).collect();
        for (parent_id, count) in rows {
            if let Some(slot) = counts.get_mut(&parent_id) {
                *slot = count;
            }
        }
        Ok(counts)
    }

    async fn ensure_fresh(&mut self) -> Result<()> {
        if self.state == PreloadState::Fresh {
            return Ok(());
        }
        self.preload().await
    }

    /// Tickets for `parent_id`, ordered by menu order.
    ///
    /// Preloads first if the results are not fresh.
    ///
    /// # Errors
    ///
    /// Returns the preload error if the consolidated queries fail.
    pub async fn get_tickets(&mut self, parent_id: ParentId) -> Result<Option<Vec<TicketRecord>>> {
        self.ensure_fresh().await?;
        Ok(self.tickets.get(&parent_id).cloned())
    }

    /// Ticket-count summary for `parent_id`.
    ///
    /// Preloads first if the results are not fresh.
    ///
    /// # Errors
    ///
    /// Returns the preload error if the consolidated queries fail.
    pub async fn get_ticket_counts(&mut self, parent_id: ParentId) -> Result<Option<P::Counts>> {
        self.ensure_fresh().await?;
        Ok(self.ticket_counts.get(&parent_id).cloned())
    }

    /// Number of non-trashed attendees for `parent_id`.
    ///
    /// Preloads first if the results are not fresh.
    ///
    /// # Errors
    ///
    /// Returns the preload error if the consolidated queries fail.
    pub async fn get_attendee_count(&mut self, parent_id: ParentId) -> Result<Option<u64>> {
        self.ensure_fresh().await?;
        Ok(self.attendee_counts.get(&parent_id).copied())
    }

    /// Cached ticket counts for `parent_id`, without triggering a preload.
    ///
    /// Returns `None` unless the results are fresh and hold an entry for the
    /// parent.
    #[must_use]
    pub fn cached_ticket_counts(&self, parent_id: ParentId) -> Option<&P::Counts> {
        if self.state != PreloadState::Fresh {
            return None;
        }
        self.ticket_counts.get(&parent_id)
    }

    /// Ticket counts for `parent_id`, served from the cache when possible.
    ///
    /// Falls through to the provider's uncached computation when the cache
    /// is not fresh or the parent is not in the batch. Never preloads.
    ///
    /// # Errors
    ///
    /// Returns the provider error on a cache miss that fails.
    pub async fn resolve_ticket_counts(&self, parent_id: ParentId) -> Result<P::Counts> {
        if let Some(counts) = self.cached_ticket_counts(parent_id) {
            metrics::counter!(TICKET_COUNTS_CACHE_TOTAL, "result" => "hit").increment(1);
            return Ok(counts.clone());
        }
        metrics::counter!(TICKET_COUNTS_CACHE_TOTAL, "result" => "miss").increment(1);
        self.counts_provider.ticket_counts(parent_id).await
    }

    /// Forget the batch and every cached result.
    pub fn clear(&mut self) {
        if self.state != PreloadState::Empty {
            tracing::debug!(batch_size = self.batch.len(), "Clearing batch");
        }
        self.batch.clear();
        self.tickets.clear();
        self.ticket_counts.clear();
        self.attendee_counts.clear();
        self.state = PreloadState::Empty;
    }
}
