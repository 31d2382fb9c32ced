//! Builders for test ticket rows.

use batch_query_core::types::{ParentId, TicketId, TicketRecord, TicketStatus};
use batch_query_core::{DateTime, Utc};

/// Builder for [`TicketRecord`] with test-friendly defaults.
///
/// Defaults: Tickets Commerce ticket, published, menu order 0, unlimited,
/// no price, open sale window.
#[derive(Clone, Debug)]
pub struct TicketBuilder {
    record: TicketRecord,
}

/// Start building ticket `id` under `parent`.
#[must_use]
pub fn ticket(id: i64, parent: i64) -> TicketBuilder {
    TicketBuilder {
        record: TicketRecord {
            id: TicketId::new(id),
            parent_id: ParentId::new(parent),
            kind: "tec_tc_ticket".to_string(),
            title: format!("Ticket {id}"),
            status: TicketStatus::Published,
            menu_order: 0,
            price_cents: None,
            capacity: None,
            sale_start: None,
            sale_end: None,
            provider: "tickets-commerce".to_string(),
        },
    }
}

impl TicketBuilder {
    /// Set the ticket kind.
    #[must_use]
    pub fn kind(mut self, kind: &str) -> Self {
        self.record.kind = kind.to_string();
        self
    }

    /// Set the title.
    #[must_use]
    pub fn title(mut self, title: &str) -> Self {
        self.record.title = title.to_string();
        self
    }

    /// Set the status.
    #[must_use]
    pub const fn status(mut self, status: TicketStatus) -> Self {
        self.record.status = status;
        self
    }

    /// Set the menu order.
    #[must_use]
    pub const fn menu_order(mut self, menu_order: i32) -> Self {
        self.record.menu_order = menu_order;
        self
    }

    /// Set the price in minor units.
    #[must_use]
    pub const fn price_cents(mut self, price_cents: i64) -> Self {
        self.record.price_cents = Some(price_cents);
        self
    }

    /// Set the capacity (`None` = unlimited).
    #[must_use]
    pub const fn capacity(mut self, capacity: Option<i64>) -> Self {
        self.record.capacity = capacity;
        self
    }

    /// Set the sale window.
    #[must_use]
    pub const fn sale_window(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.record.sale_start = start;
        self.record.sale_end = end;
        self
    }

    /// Set the commerce provider.
    #[must_use]
    pub fn provider(mut self, provider: &str) -> Self {
        self.record.provider = provider.to_string();
        self
    }

    /// Finish the record.
    #[must_use]
    pub fn build(self) -> TicketRecord {
        self.record
    }
}
