//! In-memory store and ticket-count provider for batch cache tests.
//!
//! Provides fast, deterministic testing infrastructure:
//! - [`InMemoryTicketStore`]: Vec-backed tickets and attendees with query counters
//! - [`InMemoryTicketCountProvider`]: fixed per-parent summaries with call counters
//!
//! Both can be told to fail, which is how tests exercise preload errors.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only happens after a test already panicked

use batch_query_core::config::{BatchQueryConfig, EXCLUDED_ATTENDEE_STATUSES};
use batch_query_core::error::{BatchQueryError, Result};
use batch_query_core::store::{AttendeeCountQuery, TicketCountProvider, TicketQuery, TicketStore};
use batch_query_core::types::{ParentId, TicketCountSummary, TicketId, TicketRecord};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// A ticket as stored, with its raw status.
///
/// The raw status may be one the batch query never returns (`trash`,
/// `pending`, ...), which is what lets tests check the status filter.
#[derive(Clone, Debug)]
struct StoredTicket {
    record: TicketRecord,
    raw_status: String,
}

/// An attendee row plus its meta entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttendeeRecord {
    /// Attendee identifier.
    pub id: i64,
    /// Attendee kind (storage type name).
    pub kind: String,
    /// Raw status (`publish`, `trash`, `auto-draft`, ...).
    pub status: String,
    /// Ticket the attendee holds.
    pub ticket_id: Option<TicketId>,
    /// `(meta_key, meta_value)` pairs; event references live here.
    pub meta: Vec<(String, i64)>,
}

impl AttendeeRecord {
    /// Published attendee of `kind` referencing `parent` through `meta_key`.
    #[must_use]
    pub fn new(id: i64, kind: &str, meta_key: &str, parent: ParentId) -> Self {
        Self {
            id,
            kind: kind.to_string(),
            status: "publish".to_string(),
            ticket_id: None,
            meta: vec![(meta_key.to_string(), parent.get())],
        }
    }

    /// Replace the status.
    #[must_use]
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    /// Attach the held ticket.
    #[must_use]
    pub const fn with_ticket(mut self, ticket_id: TicketId) -> Self {
        self.ticket_id = Some(ticket_id);
        self
    }

    /// Add a meta entry.
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: i64) -> Self {
        self.meta.push((key.to_string(), value));
        self
    }
}

#[derive(Debug, Default)]
struct StoreData {
    tickets: Vec<StoredTicket>,
    attendees: Vec<AttendeeRecord>,
    last_ticket_query: Vec<ParentId>,
}

/// In-memory ticket store for fast, deterministic testing.
///
/// Clones share the same data and counters, so a test can hand one clone to
/// the manager and keep another for assertions.
///
/// # Example
///
/// ```
/// use batch_query_testing::{InMemoryTicketStore, ticket};
///
/// let store = InMemoryTicketStore::new();
/// store.insert_ticket(ticket(1, 10).menu_order(2).build());
/// assert_eq!(store.ticket_query_count(), 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryTicketStore {
    data: Arc<RwLock<StoreData>>,
    ticket_queries: Arc<AtomicUsize>,
    attendee_queries: Arc<AtomicUsize>,
    fail_tickets: Arc<AtomicBool>,
    fail_attendees: Arc<AtomicBool>,
}

impl InMemoryTicketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a ticket under its own status.
    pub fn insert_ticket(&self, record: TicketRecord) {
        let raw_status = record.status.as_str().to_string();
        self.insert_ticket_with_status(record, &raw_status);
    }

    /// Store a ticket under an arbitrary raw status.
    pub fn insert_ticket_with_status(&self, record: TicketRecord, raw_status: &str) {
        self.data.write().unwrap().tickets.push(StoredTicket {
            record,
            raw_status: raw_status.to_string(),
        });
    }

    /// Store an attendee.
    pub fn insert_attendee(&self, attendee: AttendeeRecord) {
        self.data.write().unwrap().attendees.push(attendee);
    }

    /// Change the raw status of an attendee, e.g. to move it to the trash.
    pub fn set_attendee_status(&self, attendee_id: i64, status: &str) {
        let mut data = self.data.write().unwrap();
        for attendee in data.attendees.iter_mut().filter(|a| a.id == attendee_id) {
            attendee.status = status.to_string();
        }
    }

    /// Number of ticket queries run so far.
    #[must_use]
    pub fn ticket_query_count(&self) -> usize {
        self.ticket_queries.load(Ordering::SeqCst)
    }

    /// Number of attendee-count queries run so far.
    #[must_use]
    pub fn attendee_query_count(&self) -> usize {
        self.attendee_queries.load(Ordering::SeqCst)
    }

    /// Parent ids passed to the most recent ticket query.
    #[must_use]
    pub fn last_ticket_query_parents(&self) -> Vec<ParentId> {
        self.data.read().unwrap().last_ticket_query.clone()
    }

    /// Make ticket queries fail (or succeed again).
    pub fn fail_ticket_queries(&self, fail: bool) {
        self.fail_tickets.store(fail, Ordering::SeqCst);
    }

    /// Make attendee-count queries fail (or succeed again).
    pub fn fail_attendee_queries(&self, fail: bool) {
        self.fail_attendees.store(fail, Ordering::SeqCst);
    }

    /// Ticket-count summary computed from the stored rows.
    ///
    /// Mirrors the Postgres provider: published tickets of `ticket_kinds`
    /// only, stock is capacity minus non-trashed attendees holding the ticket.
    #[must_use]
    pub fn summarize(
        &self,
        parent_id: ParentId,
        ticket_kinds: &[String],
        rsvp_kinds: &[String],
    ) -> TicketCountSummary {
        let data = self.data.read().unwrap();
        let mut summary = TicketCountSummary::default();
        for stored in data
            .tickets
            .iter()
            .filter(|t| t.record.parent_id == parent_id && t.raw_status == "publish")
            .filter(|t| ticket_kinds.contains(&t.record.kind))
        {
            let sold = data
                .attendees
                .iter()
                .filter(|a| a.ticket_id == Some(stored.record.id))
                .filter(|a| !EXCLUDED_ATTENDEE_STATUSES.contains(&a.status.as_str()))
                .count() as u64;
            let family = if rsvp_kinds.contains(&stored.record.kind) {
                &mut summary.rsvp
            } else {
                &mut summary.tickets
            };
            family.record(stored.record.capacity, sold);
        }
        summary
    }
}

impl TicketStore for InMemoryTicketStore {
    async fn fetch_tickets(&self, query: &TicketQuery<'_>) -> Result<Vec<TicketRecord>> {
        self.ticket_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_tickets.load(Ordering::SeqCst) {
            return Err(BatchQueryError::Storage(
                "Failed to fetch tickets: injected failure".to_string(),
            ));
        }

        let mut data = self.data.write().unwrap();
        data.last_ticket_query = query.parents.to_vec();

        let parents: HashSet<ParentId> = query.parents.iter().copied().collect();
        let statuses: Vec<&str> = query.statuses.iter().map(|s| s.as_str()).collect();
        let mut rows: Vec<TicketRecord> = data
            .tickets
            .iter()
            .filter(|t| parents.contains(&t.record.parent_id))
            .filter(|t| query.kinds.contains(&t.record.kind))
            .filter(|t| statuses.contains(&t.raw_status.as_str()))
            .map(|t| t.record.clone())
            .collect();
        rows.sort_by_key(|t| (t.parent_id, t.menu_order, t.id));
        Ok(rows)
    }

    async fn count_attendees(&self, query: &AttendeeCountQuery<'_>) -> Result<Vec<(ParentId, u64)>> {
        self.attendee_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_attendees.load(Ordering::SeqCst) {
            return Err(BatchQueryError::Storage(
                "Failed to count attendees: injected failure".to_string(),
            ));
        }

        let data = self.data.read().unwrap();
        let parents: HashSet<i64> = query.parents.iter().map(|p| p.get()).collect();
        let mut distinct: BTreeMap<ParentId, HashSet<i64>> = BTreeMap::new();
        for attendee in data
            .attendees
            .iter()
            .filter(|a| query.kinds.contains(&a.kind))
            .filter(|a| !query.excluded_statuses.contains(&a.status.as_str()))
        {
            for (key, value) in &attendee.meta {
                if query.event_meta_keys.contains(key) && parents.contains(value) {
                    distinct
                        .entry(ParentId::new(*value))
                        .or_default()
                        .insert(attendee.id);
                }
            }
        }

        Ok(distinct
            .into_iter()
            .map(|(parent, ids)| (parent, ids.len() as u64))
            .collect())
    }
}

/// Store rows a provider summarises when no fixed summary is set.
#[derive(Clone, Debug)]
struct SummarySource {
    store: InMemoryTicketStore,
    ticket_kinds: Vec<String>,
    rsvp_ticket_kinds: Vec<String>,
}

/// In-memory ticket-count provider with per-parent call counters.
///
/// A summary set with [`set_summary`](Self::set_summary) wins. Otherwise a
/// provider built with [`backed_by`](Self::backed_by) summarises the store's
/// rows, and any other provider returns [`TicketCountSummary::default`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryTicketCountProvider {
    summaries: Arc<RwLock<HashMap<ParentId, TicketCountSummary>>>,
    calls: Arc<RwLock<HashMap<ParentId, usize>>>,
    failing: Arc<RwLock<HashSet<ParentId>>>,
    source: Option<SummarySource>,
}

impl InMemoryTicketCountProvider {
    /// Create a provider with no configured summaries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider that summarises `store` using the ticket kinds from
    /// `config`.
    #[must_use]
    pub fn backed_by(store: &InMemoryTicketStore, config: &BatchQueryConfig) -> Self {
        Self {
            source: Some(SummarySource {
                store: store.clone(),
                ticket_kinds: config.ticket_kinds.clone(),
                rsvp_ticket_kinds: config.rsvp_ticket_kinds.clone(),
            }),
            ..Self::default()
        }
    }

    /// Configure the summary returned for `parent_id`.
    pub fn set_summary(&self, parent_id: ParentId, summary: TicketCountSummary) {
        self.summaries.write().unwrap().insert(parent_id, summary);
    }

    /// Make lookups for `parent_id` fail.
    pub fn fail_for(&self, parent_id: ParentId) {
        self.failing.write().unwrap().insert(parent_id);
    }

    /// Let lookups for `parent_id` succeed again.
    pub fn recover(&self, parent_id: ParentId) {
        self.failing.write().unwrap().remove(&parent_id);
    }

    /// Number of lookups made for `parent_id`.
    #[must_use]
    pub fn calls_for(&self, parent_id: ParentId) -> usize {
        self.calls.read().unwrap().get(&parent_id).copied().unwrap_or(0)
    }

    /// Number of lookups made for all parents.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.read().unwrap().values().sum()
    }
}

impl TicketCountProvider for InMemoryTicketCountProvider {
    type Counts = TicketCountSummary;

    async fn ticket_counts(&self, parent_id: ParentId) -> Result<TicketCountSummary> {
        *self.calls.write().unwrap().entry(parent_id).or_insert(0) += 1;
        if self.failing.read().unwrap().contains(&parent_id) {
            return Err(BatchQueryError::CountProvider {
                parent_id,
                message: "injected failure".to_string(),
            });
        }
        if let Some(summary) = self.summaries.read().unwrap().get(&parent_id) {
            return Ok(*summary);
        }
        Ok(self.source.as_ref().map_or_else(TicketCountSummary::default, |source| {
            source
                .store
                .summarize(parent_id, &source.ticket_kinds, &source.rsvp_ticket_kinds)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::ticket;
    use batch_query_core::types::{KindCounts, TicketStatus};

    const META_KEY: &str = "_tec_tickets_commerce_event";

    fn kinds(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn fetch_tickets_filters_kind_status_and_orders_by_menu_order() {
        let store = InMemoryTicketStore::new();
        store.insert_ticket(ticket(1, 10).menu_order(3).build());
        store.insert_ticket(ticket(2, 10).menu_order(1).build());
        store.insert_ticket(ticket(3, 10).kind("unknown_kind").build());
        store.insert_ticket_with_status(ticket(4, 10).build(), "trash");
        store.insert_ticket(ticket(5, 30).build());

        let parents = [ParentId::new(10)];
        let ticket_kinds = kinds(&["tec_tc_ticket"]);
        let rows = store
            .fetch_tickets(&TicketQuery {
                parents: &parents,
                kinds: &ticket_kinds,
                statuses: &TicketStatus::VISIBLE,
            })
            .await
            .unwrap();

        let ids: Vec<i64> = rows.iter().map(|t| t.id.get()).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(store.ticket_query_count(), 1);
    }

    #[tokio::test]
    async fn count_attendees_counts_distinct_ids_and_skips_trash() {
        let store = InMemoryTicketStore::new();
        let parent = ParentId::new(10);
        store.insert_attendee(AttendeeRecord::new(1, "tec_tc_attendee", META_KEY, parent).with_meta(META_KEY, 10));
        store.insert_attendee(AttendeeRecord::new(2, "tec_tc_attendee", META_KEY, parent));
        store.insert_attendee(AttendeeRecord::new(3, "tec_tc_attendee", META_KEY, parent).with_status("trash"));
        store.insert_attendee(AttendeeRecord::new(4, "other_kind", META_KEY, parent));

        let parents = [parent];
        let attendee_kinds = kinds(&["tec_tc_attendee"]);
        let meta_keys = kinds(&[META_KEY]);
        let counts = store
            .count_attendees(&AttendeeCountQuery {
                parents: &parents,
                kinds: &attendee_kinds,
                event_meta_keys: &meta_keys,
                excluded_statuses: &["trash", "auto-draft"],
            })
            .await
            .unwrap();

        assert_eq!(counts, vec![(parent, 2)]);
    }

    #[tokio::test]
    async fn provider_counts_calls_and_fails_on_demand() {
        let provider = InMemoryTicketCountProvider::new();
        let parent = ParentId::new(7);

        assert_eq!(provider.ticket_counts(parent).await.unwrap(), TicketCountSummary::default());
        provider.fail_for(parent);
        assert!(provider.ticket_counts(parent).await.is_err());
        provider.recover(parent);
        assert!(provider.ticket_counts(parent).await.is_ok());

        assert_eq!(provider.calls_for(parent), 3);
        assert_eq!(provider.total_calls(), 3);
    }

    #[test]
    fn summarize_splits_rsvp_and_tickets() {
        let store = InMemoryTicketStore::new();
        let parent = ParentId::new(10);
        store.insert_ticket(ticket(1, 10).kind("tribe_rsvp_tickets").capacity(Some(20)).build());
        store.insert_ticket(ticket(2, 10).capacity(Some(5)).build());
        store.insert_ticket(ticket(3, 10).capacity(None).build());
        store.insert_attendee(
            AttendeeRecord::new(1, "tec_tc_attendee", META_KEY, parent).with_ticket(TicketId::new(2)),
        );

        let config = BatchQueryConfig::default();
        let summary = store.summarize(parent, &config.ticket_kinds, &config.rsvp_ticket_kinds);
        assert_eq!(summary.rsvp.count, 1);
        assert_eq!(summary.rsvp.stock, 20);
        assert_eq!(summary.tickets.count, 2);
        assert_eq!(summary.tickets.stock, 4);
        assert!(summary.tickets.unlimited);
    }

    #[test]
    fn summarize_skips_kinds_outside_the_allow_list() {
        let store = InMemoryTicketStore::new();
        store.insert_ticket(ticket(1, 10).kind("not_a_ticket_kind").capacity(Some(5)).build());

        let config = BatchQueryConfig::default();
        let summary = store.summarize(ParentId::new(10), &config.ticket_kinds, &config.rsvp_ticket_kinds);
        assert_eq!(summary.total_count(), 0);
        assert_eq!(summary.tickets.stock, 0);
    }

    #[tokio::test]
    async fn backed_provider_summarises_store_unless_overridden() {
        let store = InMemoryTicketStore::new();
        store.insert_ticket(ticket(1, 10).capacity(Some(5)).build());
        store.insert_ticket(ticket(2, 10).kind("not_a_ticket_kind").capacity(Some(50)).build());
        let provider = InMemoryTicketCountProvider::backed_by(&store, &BatchQueryConfig::default());

        let summary = provider.ticket_counts(ParentId::new(10)).await.unwrap();
        assert_eq!(summary.tickets.count, 1);
        assert_eq!(summary.tickets.stock, 5);

        let fixed = TicketCountSummary {
            rsvp: KindCounts::default(),
            tickets: KindCounts {
                count: 9,
                ..KindCounts::default()
            },
        };
        provider.set_summary(ParentId::new(10), fixed);
        assert_eq!(provider.ticket_counts(ParentId::new(10)).await.unwrap(), fixed);
    }
}
