//! Domain types shared by the batch cache and its store implementations.
//!
//! A *parent* is the entity (a calendar event) that owns a set of tickets.
//! Tickets and attendees both point at their parent, and the cache is keyed
//! by [`ParentId`].

use crate::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of the parent entity (event) that owns tickets.
///
/// This is the batch key: every registration, lookup and result map in the
/// cache is keyed by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParentId(i64);

impl ParentId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for ParentId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ParentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a single ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TicketId(i64);

impl TicketId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Publication status of a ticket visible to the batch query.
///
/// Tickets in any other status (trash, auto-draft, pending, ...) never reach
/// the cache, so they have no variant here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Live and purchasable.
    #[serde(rename = "publish")]
    Published,
    /// Saved but not published.
    Draft,
    /// Visible only to privileged users.
    Private,
}

impl TicketStatus {
    /// Every status the ticket query admits.
    pub const VISIBLE: [Self; 3] = [Self::Published, Self::Draft, Self::Private];

    /// Stable storage form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Published => "publish",
            Self::Draft => "draft",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "publish" => Ok(Self::Published),
            "draft" => Ok(Self::Draft),
            "private" => Ok(Self::Private),
            other => Err(format!("unknown ticket status: {other}")),
        }
    }
}

/// Denormalized ticket row as returned by the batched ticket query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    /// Ticket identifier.
    pub id: TicketId,
    /// Event the ticket belongs to.
    pub parent_id: ParentId,
    /// Ticket kind (storage type name, e.g. `tec_tc_ticket`).
    pub kind: String,
    /// Display title.
    pub title: String,
    /// Publication status.
    pub status: TicketStatus,
    /// Position within the parent's ticket list (ascending).
    pub menu_order: i32,
    /// Price in minor currency units, if priced.
    pub price_cents: Option<i64>,
    /// Capacity; `None` means unlimited.
    pub capacity: Option<i64>,
    /// Start of the sale window.
    pub sale_start: Option<DateTime<Utc>>,
    /// End of the sale window.
    pub sale_end: Option<DateTime<Utc>>,
    /// Commerce provider handling the ticket.
    pub provider: String,
}

impl TicketRecord {
    /// Whether the ticket is on sale at `now` according to its sale window.
    ///
    /// Open-ended windows are treated as unbounded on that side.
    #[must_use]
    pub fn on_sale_at(&self, now: DateTime<Utc>) -> bool {
        self.sale_start.is_none_or(|start| start <= now) && self.sale_end.is_none_or(|end| now <= end)
    }

    /// Whether the ticket has no capacity limit.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.capacity.is_none()
    }
}

/// Availability figures for one family of tickets under a parent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    /// Number of tickets.
    pub count: u64,
    /// Remaining stock across capped tickets.
    pub stock: u64,
    /// Whether at least one ticket has unlimited capacity.
    pub unlimited: bool,
    /// Tickets still available; equals `stock` unless `unlimited`.
    pub available: u64,
}

impl KindCounts {
    /// Fold one ticket into the running figures.
    ///
    /// `capacity` of `None` means unlimited; `sold` is clamped so stock never
    /// goes negative.
    pub fn record(&mut self, capacity: Option<i64>, sold: u64) {
        self.count += 1;
        match capacity {
            None => self.unlimited = true,
            Some(capacity) => {
                let capacity = u64::try_from(capacity).unwrap_or(0);
                self.stock += capacity.saturating_sub(sold);
            }
        }
        self.available = self.stock;
    }
}

/// Ticket-count summary for a parent, split into RSVPs and paid tickets.
///
/// This is the counts shape produced by the bundled providers. The cache
/// itself treats counts as opaque and is generic over the provider's type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketCountSummary {
    /// RSVP tickets.
    pub rsvp: KindCounts,
    /// Every other ticket kind.
    pub tickets: KindCounts,
}

impl TicketCountSummary {
    /// Total number of tickets of both families.
    #[must_use]
    pub const fn total_count(&self) -> u64 {
        self.rsvp.count + self.tickets.count
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ticket() -> TicketRecord {
        TicketRecord {
            id: TicketId::new(1),
            parent_id: ParentId::new(10),
            kind: "tec_tc_ticket".to_string(),
            title: "General admission".to_string(),
            status: TicketStatus::Published,
            menu_order: 0,
            price_cents: Some(2500),
            capacity: Some(100),
            sale_start: None,
            sale_end: None,
            provider: "tickets-commerce".to_string(),
        }
    }

    #[test]
    fn ticket_status_round_trips_through_storage_form() {
        for status in TicketStatus::VISIBLE {
            assert_eq!(status.as_str().parse::<TicketStatus>().unwrap(), status);
        }
        assert!("trash".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn ticket_status_serializes_as_storage_form() {
        let json = serde_json::to_string(&TicketStatus::Published).unwrap();
        assert_eq!(json, "\"publish\"");
    }

    #[test]
    fn sale_window_bounds_are_inclusive() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let mut record = ticket();
        record.sale_start = Some(start);
        record.sale_end = Some(end);

        assert!(record.on_sale_at(start));
        assert!(record.on_sale_at(end));
        assert!(!record.on_sale_at(start - chrono::Duration::seconds(1)));
        assert!(!record.on_sale_at(end + chrono::Duration::seconds(1)));
    }

    #[test]
    fn open_sale_window_is_always_on_sale() {
        let now = Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap();
        assert!(ticket().on_sale_at(now));
    }

    #[test]
    fn kind_counts_track_stock_and_unlimited() {
        let mut counts = KindCounts::default();
        counts.record(Some(10), 3);
        counts.record(Some(5), 9);
        counts.record(None, 4);

        assert_eq!(counts.count, 3);
        assert_eq!(counts.stock, 7);
        assert!(counts.unlimited);
        assert_eq!(counts.available, 7);
    }
}
