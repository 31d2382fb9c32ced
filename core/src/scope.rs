//! Render-boundary lifecycle.
//!
//! A render pass registers the events it is about to show, preloads them, and
//! must clear the cache when it ends so nothing leaks into the next pass.
//! [`RenderScope`] ties the clear to scope exit, so early returns, `?` and
//! unwinding all release the batch.
//!
//! Listings whose ids are only known once their query has run go through a
//! [`ListingWatch`]: a one-shot token obtained before the query and consumed
//! when its results are known.
//!
//! # Example
//!
//! ```ignore
//! async fn render_listing(manager: &mut Manager, ids: Vec<ParentId>) -> Result<String> {
//!     let mut scope = manager.begin_render(ids.iter().copied()).await?;
//!     let mut html = String::new();
//!     for id in ids {
//!         let tickets = scope.get_tickets(id).await?.unwrap_or_default();
//!         html.push_str(&render_tickets(&tickets));
//!     }
//!     Ok(html)
//!     // scope dropped here: batch cleared
//! }
//! ```

use crate::error::Result;
use crate::manager::BatchQueryManager;
use crate::store::{TicketCountProvider, TicketStore};
use crate::types::ParentId;
use std::ops::{Deref, DerefMut};

/// Guard over a manager for the duration of one render pass.
///
/// Dereferences to the manager. Dropping the guard clears the batch and every
/// cached result.
#[must_use = "dropping the scope clears the batch"]
pub struct RenderScope<'m, S, P>
where
    S: TicketStore,
    P: TicketCountProvider,
{
    manager: &'m mut BatchQueryManager<S, P>,
}

impl<S, P> Deref for RenderScope<'_, S, P>
where
    S: TicketStore,
    P: TicketCountProvider,
{
    type Target = BatchQueryManager<S, P>;

    fn deref(&self) -> &Self::Target {
        &*self.manager
    }
}

impl<S, P> DerefMut for RenderScope<'_, S, P>
where
    S: TicketStore,
    P: TicketCountProvider,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.manager
    }
}

impl<S, P> Drop for RenderScope<'_, S, P>
where
    S: TicketStore,
    P: TicketCountProvider,
{
    fn drop(&mut self) {
        self.manager.clear();
    }
}

impl<S, P> BatchQueryManager<S, P>
where
    S: TicketStore,
    P: TicketCountProvider,
{
    /// Start a render pass over `parent_ids`.
    ///
    /// Registers the ids, preloads, and returns a guard that clears the cache
    /// when dropped.
    ///
    /// # Errors
    ///
    /// Returns the preload error. The batch is cleared before returning, so a
    /// failed start leaves nothing behind.
    pub async fn begin_render<I>(&mut self, parent_ids: I) -> Result<RenderScope<'_, S, P>>
    where
        I: IntoIterator<Item = ParentId>,
    {
        self.add_many(parent_ids);
        if let Err(error) = self.preload().await {
            self.clear();
            return Err(error);
        }
        Ok(RenderScope { manager: self })
    }

    /// Decide whether a listing query should feed the batch.
    ///
    /// Returns a watch when the query lists at least one configured event
    /// post type and batching has not been suppressed for it.
    #[must_use]
    pub fn watch_listing(&self, query: &ListingQuery) -> Option<ListingWatch> {
        if query.suppress_batching {
            return None;
        }
        let matched = query
            .post_types
            .iter()
            .find(|post_type| self.config().event_post_types.contains(*post_type))?;
        tracing::trace!(post_type = %matched, "Watching listing query for batch ids");
        Some(ListingWatch {
            post_type: matched.clone(),
        })
    }
}

/// Description of an in-flight listing query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListingQuery {
    /// Post types the listing returns.
    pub post_types: Vec<String>,
    /// Opt-out for queries that must not touch the batch (counts, exports).
    pub suppress_batching: bool,
}

impl ListingQuery {
    /// Listing over the given post types.
    #[must_use]
    pub fn new<I, T>(post_types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            post_types: post_types.into_iter().map(Into::into).collect(),
            suppress_batching: false,
        }
    }

    /// Keep this listing out of the batch.
    #[must_use]
    pub const fn suppressed(mut self) -> Self {
        self.suppress_batching = true;
        self
    }
}

/// One-shot token for a listing whose ids are not known yet.
///
/// Obtained from [`BatchQueryManager::watch_listing`] and consumed by
/// [`results_known`](Self::results_known), so a listing can feed the batch at
/// most once.
#[derive(Debug)]
#[must_use = "a listing watch does nothing until its results are known"]
pub struct ListingWatch {
    post_type: String,
}

impl ListingWatch {
    /// The configured event post type that matched the listing.
    #[must_use]
    pub fn post_type(&self) -> &str {
        &self.post_type
    }

    /// Feed the listing's result ids into the batch and preload.
    ///
    /// Returns the number of ids that were new to the batch.
    ///
    /// # Errors
    ///
    /// Returns the preload error; the ids stay registered and the next
    /// accessor call retries.
    pub async fn results_known<S, P, I>(
        self,
        manager: &mut BatchQueryManager<S, P>,
        parent_ids: I,
    ) -> Result<usize>
    where
        S: TicketStore,
        P: TicketCountProvider,
        I: IntoIterator<Item = ParentId>,
    {
        let added = manager.add_many(parent_ids);
        tracing::debug!(post_type = %self.post_type, added, "Listing results added to batch");
        manager.preload().await?;
        Ok(added)
    }
}
