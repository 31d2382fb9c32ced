//! `PostgreSQL` ticket-count provider.
//!
//! Computes the availability summary for one parent: published tickets of
//! the configured kinds, split into RSVPs and everything else, with stock
//! derived from capacity minus the non-trashed attendees holding each ticket.

use batch_query_core::config::{BatchQueryConfig, EXCLUDED_ATTENDEE_STATUSES};
use batch_query_core::error::{BatchQueryError, Result};
use batch_query_core::metrics::STORE_QUERIES_TOTAL;
use batch_query_core::store::TicketCountProvider;
use batch_query_core::types::{ParentId, TicketCountSummary, TicketStatus};
use sqlx::PgPool;

/// PostgreSQL-backed ticket-count provider.
///
/// Runs one aggregate query per parent. The batch cache calls it once per
/// registered parent; outside a batch it serves uncached lookups.
#[derive(Clone, Debug)]
pub struct PostgresTicketCountProvider {
    pool: PgPool,
    ticket_kinds: Vec<String>,
    rsvp_ticket_kinds: Vec<String>,
}

impl PostgresTicketCountProvider {
    /// Create a provider using the ticket kinds from `config`.
    #[must_use]
    pub fn new(pool: PgPool, config: &BatchQueryConfig) -> Self {
        Self {
            pool,
            ticket_kinds: config.ticket_kinds.clone(),
            rsvp_ticket_kinds: config.rsvp_ticket_kinds.clone(),
        }
    }
}

impl TicketCountProvider for PostgresTicketCountProvider {
    type Counts = TicketCountSummary;

    async fn ticket_counts(&self, parent_id: ParentId) -> Result<TicketCountSummary> {
        let rows: Vec<(String, Option<i64>, i64)> = sqlx::query_as(
            "SELECT t.kind, t.capacity, COUNT(a.id)
             FROM tickets t
             LEFT JOIN attendees a ON a.ticket_id = t.id AND a.status <> ALL($4)
             WHERE t.parent_id = $1 AND t.kind = ANY($2) AND t.status = $3
             GROUP BY t.id, t.kind, t.capacity
             ORDER BY t.id",
        )
        .bind(parent_id.get())
        .bind(&self.ticket_kinds)
        .bind(TicketStatus::Published.as_str())
        .bind(EXCLUDED_ATTENDEE_STATUSES)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BatchQueryError::CountProvider {
            parent_id,
            message: format!("Failed to summarise tickets: {e}"),
        })?;

        metrics::counter!(STORE_QUERIES_TOTAL, "query" => "ticket_counts").increment(1);

        let mut summary = TicketCountSummary::default();
        for (kind, capacity, sold) in rows {
            let family = if self.rsvp_ticket_kinds.contains(&kind) {
                &mut summary.rsvp
            } else {
                &mut summary.tickets
            };
            family.record(capacity, u64::try_from(sold).unwrap_or(0));
        }
        Ok(summary)
    }
}
