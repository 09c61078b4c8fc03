//! Site configuration for the DOI service

use crate::identifiers::GroupRef;
use serde::{Deserialize, Serialize};

/// Default bound on suffix reservation attempts
pub const DEFAULT_ALLOCATION_ATTEMPTS: u32 = 5;

/// Deployment-wide configuration
///
/// `review_mode` selects the alternative site configuration in which DOIs
/// pass through the multi-party review workflow before minting; with it off
/// every review transition is rejected regardless of caller role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoiConfig {
    /// Registrar account prefix, e.g. `10.11570`
    pub account_prefix: String,
    /// Prefix prepended to every generated suffix; may be empty
    pub identifier_prefix: String,
    /// Prefix for per-DOI group names
    pub group_prefix: String,
    /// Landing page base URL; the registrar resolves a DOI to
    /// `{landing_url}?doi={suffix}`
    pub landing_url: String,
    /// Enable the review workflow
    pub review_mode: bool,
    /// Generate random `.test` suffixes instead of year counters
    pub random_test_id: bool,
    /// Group with review/approval authority, when configured
    pub publisher_group: Option<GroupRef>,
    /// Bound on suffix reservation retries
    pub max_allocation_attempts: u32,
}

impl DoiConfig {
    /// Configuration with the given registrar account prefix and landing
    /// page URL; review mode off, counter-based allocation
    pub fn new(account_prefix: impl Into<String>, landing_url: impl Into<String>) -> Self {
        Self {
            account_prefix: account_prefix.into(),
            identifier_prefix: String::new(),
            group_prefix: "doi-".to_string(),
            landing_url: landing_url.into(),
            review_mode: false,
            random_test_id: false,
            publisher_group: None,
            max_allocation_attempts: DEFAULT_ALLOCATION_ATTEMPTS,
        }
    }

    /// Name of the per-DOI administration group for a suffix
    pub fn doi_group_name(&self, suffix: &str) -> String {
        format!("{}{}", self.group_prefix, suffix)
    }

    /// The fully qualified identifier registered for a suffix
    pub fn doi_identifier(&self, suffix: &str) -> String {
        format!("{}/{}", self.account_prefix, suffix)
    }

    /// Landing page URL submitted to the registrar for a suffix
    pub fn landing_page(&self, suffix: &str) -> String {
        format!("{}?doi={}", self.landing_url, suffix)
    }
}
