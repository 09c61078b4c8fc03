//! Read-side listing filters
//!
//! DOIs are listed from the container hierarchy and filtered by caller
//! identity, caller roles, a requested role constraint, and an optional
//! status set. The filter is a pure function over nodes so it can be
//! exercised without a storage backend.

use crate::errors::DoiResult;
use crate::identifiers::{DoiSuffix, Principal};
use crate::node::{Node, PropertyKey};
use crate::status::DoiStatus;
use std::collections::BTreeSet;
use tracing::debug;

/// Role constraint a caller can attach to a listing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchRole {
    /// Only DOIs the caller requested
    Owner,
    /// Only DOIs the caller could act on as a publisher
    Publisher,
}

/// Listing request parameters
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Optional role constraint; ignored for admins
    pub role: Option<SearchRole>,
    /// When non-empty, only these statuses are returned
    pub statuses: BTreeSet<DoiStatus>,
}

impl SearchFilter {
    /// No constraints
    pub fn all() -> Self {
        Self::default()
    }

    fn status_matches(&self, status: DoiStatus) -> bool {
        self.statuses.is_empty() || self.statuses.contains(&status)
    }
}

/// Caller identity as the listing filter sees it
#[derive(Debug, Clone)]
pub struct SearchContext {
    /// The caller's principal
    pub caller: Principal,
    /// Service administrator; sees everything the status filter allows
    pub admin: bool,
    /// Member of the publisher group
    pub publisher: bool,
    /// Whether a publisher group is configured at all; without one the
    /// publisher role degrades to owner
    pub publisher_group_configured: bool,
}

/// One row of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoiListing {
    /// DOI suffix (the container node name)
    pub suffix: DoiSuffix,
    /// Current lifecycle status
    pub status: DoiStatus,
    /// Citation title, when recorded on the container
    pub title: Option<String>,
    /// Principal that created the DOI
    pub requester: Principal,
}

/// Filter DOI container nodes down to the listing visible to the caller
///
/// Nodes without a requester property are not DOI records and are skipped.
pub fn filter_records(
    nodes: impl IntoIterator<Item = Node>,
    ctx: &SearchContext,
    filter: &SearchFilter,
) -> DoiResult<Vec<DoiListing>> {
    let role = effective_role(ctx, filter);
    if matches!(role, Some(SearchRole::Publisher)) && !ctx.publisher {
        debug!(caller = %ctx.caller, "publisher listing requested by non-publisher");
        return Ok(Vec::new());
    }

    let mut listing = Vec::new();
    for node in nodes {
        let Some(requester) = node.property(PropertyKey::Requester) else {
            continue;
        };
        let requester = Principal::new(requester);
        let status = node.status()?;
        if !filter.status_matches(status) {
            continue;
        }
        if !role_admits(role, ctx, &requester, status, filter) {
            continue;
        }
        listing.push(DoiListing {
            suffix: DoiSuffix::new(node.name())?,
            status,
            title: node.property(PropertyKey::Title).map(str::to_string),
            requester,
        });
    }
    Ok(listing)
}

/// The role constraint actually applied: admins are exempt, and the
/// publisher role means owner when no publisher group exists
fn effective_role(ctx: &SearchContext, filter: &SearchFilter) -> Option<SearchRole> {
    if ctx.admin {
        return None;
    }
    match filter.role {
        Some(SearchRole::Publisher) if !ctx.publisher_group_configured => {
            Some(SearchRole::Owner)
        }
        other => other,
    }
}

fn role_admits(
    role: Option<SearchRole>,
    ctx: &SearchContext,
    requester: &Principal,
    status: DoiStatus,
    filter: &SearchFilter,
) -> bool {
    match role {
        Some(SearchRole::Owner) => requester == &ctx.caller,
        Some(SearchRole::Publisher) => {
            // a publisher reviews other people's submissions; already-minted
            // records are noise unless explicitly asked for
            requester != &ctx.caller
                && (status != DoiStatus::Minted || filter.statuses.contains(&DoiStatus::Minted))
        }
        None => {
            ctx.admin
                || ctx.publisher
                || requester == &ctx.caller
                || status == DoiStatus::Minted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(suffix: &str, requester: &str, status: DoiStatus) -> Node {
        let mut node = Node::container(suffix);
        node.set_property(PropertyKey::Requester, requester);
        node.set_property(PropertyKey::Title, format!("Dataset {suffix}"));
        node.set_status(status);
        node
    }

    fn corpus() -> Vec<Node> {
        vec![
            record("25.0001", "alice", DoiStatus::Draft),
            record("25.0002", "alice", DoiStatus::Minted),
            record("25.0003", "bob", DoiStatus::InReview),
            record("25.0004", "bob", DoiStatus::Minted),
            // not a DOI record, no requester property
            Node::container("scratch"),
        ]
    }

    fn ctx(caller: &str, admin: bool, publisher: bool) -> SearchContext {
        SearchContext {
            caller: Principal::new(caller),
            admin,
            publisher,
            publisher_group_configured: true,
        }
    }

    fn suffixes(listing: &[DoiListing]) -> Vec<&str> {
        listing.iter().map(|row| row.suffix.as_str()).collect()
    }

    #[test]
    fn test_plain_caller_sees_own_and_minted() {
        let listing = filter_records(corpus(), &ctx("alice", false, false), &SearchFilter::all())
            .unwrap();
        assert_eq!(suffixes(&listing), ["25.0001", "25.0002", "25.0004"]);
    }

    #[test]
    fn test_stranger_sees_only_minted() {
        let listing = filter_records(corpus(), &ctx("carol", false, false), &SearchFilter::all())
            .unwrap();
        assert_eq!(suffixes(&listing), ["25.0002", "25.0004"]);
    }

    #[test]
    fn test_admin_and_publisher_see_everything() {
        for context in [ctx("carol", true, false), ctx("carol", false, true)] {
            let listing = filter_records(corpus(), &context, &SearchFilter::all()).unwrap();
            assert_eq!(listing.len(), 4);
        }
    }

    #[test]
    fn test_owner_role_keeps_only_callers_records() {
        let filter = SearchFilter {
            role: Some(SearchRole::Owner),
            statuses: BTreeSet::new(),
        };
        let listing = filter_records(corpus(), &ctx("alice", false, false), &filter).unwrap();
        assert_eq!(suffixes(&listing), ["25.0001", "25.0002"]);
    }

    #[test]
    fn test_publisher_role_excludes_own_and_minted() {
        let filter = SearchFilter {
            role: Some(SearchRole::Publisher),
            statuses: BTreeSet::new(),
        };
        let listing = filter_records(corpus(), &ctx("alice", false, true), &filter).unwrap();
        assert_eq!(suffixes(&listing), ["25.0003"]);
    }

    #[test]
    fn test_publisher_role_shows_minted_when_asked() {
        let filter = SearchFilter {
            role: Some(SearchRole::Publisher),
            statuses: BTreeSet::from([DoiStatus::Minted]),
        };
        let listing = filter_records(corpus(), &ctx("alice", false, true), &filter).unwrap();
        assert_eq!(suffixes(&listing), ["25.0004"]);
    }

    #[test]
    fn test_publisher_role_from_non_publisher_is_empty() {
        let filter = SearchFilter {
            role: Some(SearchRole::Publisher),
            statuses: BTreeSet::new(),
        };
        let listing = filter_records(corpus(), &ctx("alice", false, false), &filter).unwrap();
        assert!(listing.is_empty());
    }

    #[test]
    fn test_publisher_role_degrades_to_owner_without_group() {
        let filter = SearchFilter {
            role: Some(SearchRole::Publisher),
            statuses: BTreeSet::new(),
        };
        let mut context = ctx("alice", false, false);
        context.publisher_group_configured = false;
        let listing = filter_records(corpus(), &context, &filter).unwrap();
        assert_eq!(suffixes(&listing), ["25.0001", "25.0002"]);
    }

    #[test]
    fn test_admin_ignores_role_constraint() {
        let filter = SearchFilter {
            role: Some(SearchRole::Owner),
            statuses: BTreeSet::new(),
        };
        let listing = filter_records(corpus(), &ctx("carol", true, false), &filter).unwrap();
        assert_eq!(listing.len(), 4);
    }

    #[test]
    fn test_status_filter_applies_everywhere() {
        let filter = SearchFilter {
            role: None,
            statuses: BTreeSet::from([DoiStatus::Draft, DoiStatus::InReview]),
        };
        let listing = filter_records(corpus(), &ctx("carol", true, false), &filter).unwrap();
        assert_eq!(suffixes(&listing), ["25.0001", "25.0003"]);
    }

    #[test]
    fn test_listing_carries_title_and_requester() {
        let listing = filter_records(corpus(), &ctx("alice", false, false), &SearchFilter::all())
            .unwrap();
        let row = &listing[0];
        assert_eq!(row.title.as_deref(), Some("Dataset 25.0001"));
        assert_eq!(row.requester, Principal::new("alice"));
    }
}
