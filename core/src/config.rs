//! Configuration for the batch query cache.
//!
//! Loads configuration from environment variables with sensible defaults.
//! The defaults are the Event Tickets storage type names; deployments that
//! register extra ticket providers extend the allow-lists.

use crate::error::{BatchQueryError, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Default ticket kinds admitted by the batched ticket query.
pub const DEFAULT_TICKET_KINDS: &[&str] = &[
    "tribe_rsvp_tickets",
    "tec_tc_ticket",
    "tribe_tpp_tickets",
    "product",
    "download",
];

/// Default ticket kinds counted as RSVPs by the bundled count providers.
pub const DEFAULT_RSVP_TICKET_KINDS: &[&str] = &["tribe_rsvp_tickets"];

/// Default attendee kinds counted by the attendee-count query.
pub const DEFAULT_ATTENDEE_KINDS: &[&str] = &[
    "tribe_rsvp_attendees",
    "tec_tc_attendee",
    "tribe_tpp_attendees",
    "tribe_wooticket",
    "tribe_eddticket",
];

/// Default attendee meta keys whose value references the parent event.
pub const DEFAULT_ATTENDEE_EVENT_META_KEYS: &[&str] = &[
    "_tribe_rsvp_event",
    "_tec_tickets_commerce_event",
    "_tribe_tpp_event",
    "_tribe_wooticket_event",
    "_tribe_eddticket_event",
];

/// Default post types whose listings trigger batching.
pub const DEFAULT_EVENT_POST_TYPES: &[&str] = &["tribe_events"];

/// Attendee statuses excluded from attendee counts.
pub const EXCLUDED_ATTENDEE_STATUSES: &[&str] = &["trash", "auto-draft"];

/// Allow-lists and listing rules used by the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchQueryConfig {
    /// Ticket kinds returned by the ticket query.
    pub ticket_kinds: Vec<String>,
    /// Subset of ticket kinds summarised as RSVPs.
    pub rsvp_ticket_kinds: Vec<String>,
    /// Attendee kinds counted by the attendee-count query.
    pub attendee_kinds: Vec<String>,
    /// Attendee meta keys that hold the parent event id.
    pub attendee_event_meta_keys: Vec<String>,
    /// Listing post types that should be batched.
    pub event_post_types: Vec<String>,
}

impl Default for BatchQueryConfig {
    fn default() -> Self {
        Self {
            ticket_kinds: owned(DEFAULT_TICKET_KINDS),
            rsvp_ticket_kinds: owned(DEFAULT_RSVP_TICKET_KINDS),
            attendee_kinds: owned(DEFAULT_ATTENDEE_KINDS),
            attendee_event_meta_keys: owned(DEFAULT_ATTENDEE_EVENT_META_KEYS),
            event_post_types: owned(DEFAULT_EVENT_POST_TYPES),
        }
    }
}

impl BatchQueryConfig {
    /// Load configuration from environment variables.
    ///
    /// Each variable holds a comma-separated list; unset or blank variables
    /// fall back to the defaults:
    ///
    /// - `BATCH_QUERY_TICKET_KINDS`
    /// - `BATCH_QUERY_RSVP_TICKET_KINDS`
    /// - `BATCH_QUERY_ATTENDEE_KINDS`
    /// - `BATCH_QUERY_ATTENDEE_EVENT_META_KEYS`
    /// - `BATCH_QUERY_EVENT_POST_TYPES`
    ///
    /// # Errors
    ///
    /// Returns [`BatchQueryError::Config`] if the resulting configuration
    /// fails [`validate`](Self::validate).
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            ticket_kinds: list_from_env("BATCH_QUERY_TICKET_KINDS")
                .unwrap_or(defaults.ticket_kinds),
            rsvp_ticket_kinds: list_from_env("BATCH_QUERY_RSVP_TICKET_KINDS")
                .unwrap_or(defaults.rsvp_ticket_kinds),
            attendee_kinds: list_from_env("BATCH_QUERY_ATTENDEE_KINDS")
                .unwrap_or(defaults.attendee_kinds),
            attendee_event_meta_keys: list_from_env("BATCH_QUERY_ATTENDEE_EVENT_META_KEYS")
                .unwrap_or(defaults.attendee_event_meta_keys),
            event_post_types: list_from_env("BATCH_QUERY_EVENT_POST_TYPES")
                .unwrap_or(defaults.event_post_types),
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the ticket kind allow-list.
    #[must_use]
    pub fn with_ticket_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ticket_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the RSVP ticket kinds.
    #[must_use]
    pub fn with_rsvp_ticket_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rsvp_ticket_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the attendee kind allow-list.
    #[must_use]
    pub fn with_attendee_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attendee_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the attendee event meta keys.
    #[must_use]
    pub fn with_attendee_event_meta_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attendee_event_meta_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the batched listing post types.
    #[must_use]
    pub fn with_event_post_types<I, S>(mut self, post_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_post_types = post_types.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `kind` is summarised as an RSVP.
    #[must_use]
    pub fn is_rsvp_kind(&self, kind: &str) -> bool {
        self.rsvp_ticket_kinds.iter().any(|k| k == kind)
    }

    /// Check that every allow-list the queries depend on is non-empty.
    ///
    /// An empty allow-list would make a query match nothing, silently turning
    /// every batch into empty results.
    ///
    /// # Errors
    ///
    /// Returns [`BatchQueryError::Config`] naming the first empty list.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("ticket_kinds", &self.ticket_kinds),
            ("attendee_kinds", &self.attendee_kinds),
            ("attendee_event_meta_keys", &self.attendee_event_meta_keys),
            ("event_post_types", &self.event_post_types),
        ];
        for (name, list) in required {
            if list.is_empty() {
                return Err(BatchQueryError::Config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn list_from_env(key: &str) -> Option<Vec<String>> {
    env::var(key).ok().and_then(|raw| parse_list(&raw))
}

fn parse_list(raw: &str) -> Option<Vec<String>> {
    let items: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect();
    (!items.is_empty()).then_some(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(BatchQueryConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_allow_list_is_rejected() {
        let config = BatchQueryConfig::default().with_attendee_kinds(Vec::<String>::new());
        let error = config.validate().err().map(|e| e.to_string()).unwrap_or_default();
        assert!(error.contains("attendee_kinds"));
    }

    #[test]
    fn rsvp_kinds_may_be_empty() {
        let config = BatchQueryConfig::default().with_rsvp_ticket_kinds(Vec::<String>::new());
        assert!(config.validate().is_ok());
        assert!(!config.is_rsvp_kind("tribe_rsvp_tickets"));
    }

    #[test]
    fn parse_list_trims_and_drops_blanks() {
        assert_eq!(
            parse_list(" a, b ,,c "),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(parse_list(" , "), None);
    }

    #[test]
    fn builders_replace_lists() {
        let config = BatchQueryConfig::default()
            .with_ticket_kinds(["custom_ticket"])
            .with_event_post_types(["tribe_events", "tribe_venue"]);

        assert_eq!(config.ticket_kinds, vec!["custom_ticket".to_string()]);
        assert_eq!(config.event_post_types.len(), 2);
        assert!(config.is_rsvp_kind("tribe_rsvp_tickets"));
    }
}
