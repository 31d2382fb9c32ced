//! `PostgreSQL` ticket store.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE tickets (
//!     id BIGINT PRIMARY KEY,
//!     parent_id BIGINT NOT NULL,
//!     kind TEXT NOT NULL,
//!     title TEXT NOT NULL,
//!     status TEXT NOT NULL,
//!     menu_order INTEGER NOT NULL DEFAULT 0,
//!     price_cents BIGINT,
//!     capacity BIGINT,
//!     sale_start TIMESTAMPTZ,
//!     sale_end TIMESTAMPTZ,
//!     provider TEXT NOT NULL
//! );
//!
//! CREATE TABLE attendees (id BIGINT PRIMARY KEY, kind TEXT, status TEXT, ticket_id BIGINT);
//! CREATE TABLE attendee_meta (attendee_id BIGINT, meta_key TEXT, meta_value BIGINT);
//! ```
//!
//! The full DDL, with the indexes both batch queries rely on, ships in
//! `migrations/` and is applied by [`PostgresTicketStore::migrate`].

use batch_query_core::error::{BatchQueryError, Result};
use batch_query_core::metrics::STORE_QUERIES_TOTAL;
use batch_query_core::store::{AttendeeCountQuery, TicketQuery, TicketStore};
use batch_query_core::types::{ParentId, TicketId, TicketRecord, TicketStatus};
use batch_query_core::{DateTime, Utc};
use sqlx::PgPool;

/// Ticket row as selected by the batched query.
#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: i64,
    parent_id: i64,
    kind: String,
    title: String,
    status: String,
    menu_order: i32,
    price_cents: Option<i64>,
    capacity: Option<i64>,
    sale_start: Option<DateTime<Utc>>,
    sale_end: Option<DateTime<Utc>>,
    provider: String,
}

impl TryFrom<TicketRow> for TicketRecord {
    type Error = BatchQueryError;

    fn try_from(row: TicketRow) -> Result<Self> {
        let status: TicketStatus = row
            .status
            .parse()
            .map_err(|e| BatchQueryError::Storage(format!("Ticket {}: {e}", row.id)))?;
        Ok(Self {
            id: TicketId::new(row.id),
            parent_id: ParentId::new(row.parent_id),
            kind: row.kind,
            title: row.title,
            status,
            menu_order: row.menu_order,
            price_cents: row.price_cents,
            capacity: row.capacity,
            sale_start: row.sale_start,
            sale_end: row.sale_end,
            provider: row.provider,
        })
    }
}

/// PostgreSQL-backed ticket store.
///
/// Each trait method issues a single statement over the whole parent set.
#[derive(Clone, Debug)]
pub struct PostgresTicketStore {
    pool: PgPool,
}

impl PostgresTicketStore {
    /// Create a store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the ticket, attendee and attendee meta tables if missing.
    ///
    /// # Errors
    ///
    /// Returns [`BatchQueryError::Storage`] if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| BatchQueryError::Storage(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn raw_ids(parents: &[ParentId]) -> Vec<i64> {
    parents.iter().map(|p| p.get()).collect()
}

impl TicketStore for PostgresTicketStore {
    async fn fetch_tickets(&self, query: &TicketQuery<'_>) -> Result<Vec<TicketRecord>> {
        let parents = raw_ids(query.parents);
        let statuses: Vec<&str> = query.statuses.iter().map(|s| s.as_str()).collect();

        let rows: Vec<TicketRow> = sqlx::query_as(
            "SELECT id, parent_id, kind, title, status, menu_order, price_cents,
                    capacity, sale_start, sale_end, provider
             FROM tickets
             WHERE parent_id = ANY($1) AND kind = ANY($2) AND status = ANY($3)
             ORDER BY parent_id, menu_order, id",
        )
        .bind(&parents)
        .bind(query.kinds)
        .bind(&statuses)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BatchQueryError::Storage(format!("Failed to fetch tickets: {e}")))?;

        metrics::counter!(STORE_QUERIES_TOTAL, "query" => "tickets").increment(1);
        tracing::trace!(parents = parents.len(), rows = rows.len(), "Fetched batched tickets");

        rows.into_iter().map(TicketRecord::try_from).collect()
    }

    async fn count_attendees(&self, query: &AttendeeCountQuery<'_>) -> Result<Vec<(ParentId, u64)>> {
        let parents = raw_ids(query.parents);

        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT m.meta_value, COUNT(DISTINCT a.id)
             FROM attendees a
             JOIN attendee_meta m ON m.attendee_id = a.id
             WHERE m.meta_key = ANY($1)
               AND m.meta_value = ANY($2)
               AND a.kind = ANY($3)
               AND a.status <> ALL($4)
             GROUP BY m.meta_value",
        )
        .bind(query.event_meta_keys)
        .bind(&parents)
        .bind(query.kinds)
        .bind(query.excluded_statuses)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BatchQueryError::Storage(format!("Failed to count attendees: {e}")))?;

        metrics::counter!(STORE_QUERIES_TOTAL, "query" => "attendee_counts").increment(1);

        Ok(rows
            .into_iter()
            .map(|(parent, count)| (ParentId::new(parent), u64::try_from(count).unwrap_or(0)))
            .collect())
    }
}
