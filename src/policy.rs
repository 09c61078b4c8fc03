//! Transition permission policy
//!
//! A pure function from (current status, requested status, caller roles,
//! review mode) to the access-control lists the transition leaves behind.
//! Review-workflow transitions exist only in review mode; with the flag off
//! every row of the table is rejected regardless of role.

use crate::errors::{DoiError, DoiResult};
use crate::identifiers::GroupRef;
use crate::node::Acl;
use crate::status::DoiStatus;

/// Roles the caller holds with respect to one DOI
///
/// Admin subsumes everything; a caller can be requester and publisher at
/// the same time. A caller with none of the flags is "other".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleSet {
    /// Caller created this DOI
    pub requester: bool,
    /// Caller is a member of the publisher group
    pub publisher: bool,
    /// Caller is a service administrator
    pub admin: bool,
}

impl RoleSet {
    /// No roles at all
    pub fn none() -> Self {
        Self::default()
    }

    /// Requester only
    pub fn requester() -> Self {
        Self {
            requester: true,
            ..Self::default()
        }
    }

    /// Publisher only
    pub fn publisher() -> Self {
        Self {
            publisher: true,
            ..Self::default()
        }
    }

    /// Admin only
    pub fn admin() -> Self {
        Self {
            admin: true,
            ..Self::default()
        }
    }

    fn requester_or_admin(&self) -> bool {
        self.requester || self.admin
    }

    fn publisher_or_admin(&self) -> bool {
        self.publisher || self.admin
    }
}

/// Whether the caller may set the reviewer property
///
/// Narrower than the transition table: publisher or admin only, in every
/// state.
pub fn can_set_reviewer(roles: &RoleSet) -> bool {
    roles.publisher || roles.admin
}

/// Access-control lists applied to a DOI's container and data area at
/// creation: the per-DOI group and, when configured, the publisher group
/// hold read and write access; nothing is public.
pub fn initial_acl(doi_group: &GroupRef, publisher_group: Option<&GroupRef>) -> Acl {
    let mut acl = Acl::private();
    acl.read_only.insert(doi_group.clone());
    acl.read_write.insert(doi_group.clone());
    if let Some(publisher) = publisher_group {
        acl.read_only.insert(publisher.clone());
        acl.read_write.insert(publisher.clone());
    }
    acl
}

/// Evaluate one requested status transition
///
/// Returns `Ok(None)` when the requested status equals the current status
/// (a no-op, never an error), `Ok(Some(acl))` with the recomputed ACL when
/// the transition is permitted, and the invalid-state-change error naming
/// both statuses otherwise.
pub fn evaluate(
    current: DoiStatus,
    requested: DoiStatus,
    roles: &RoleSet,
    review_mode: bool,
    doi_group: &GroupRef,
    publisher_group: Option<&GroupRef>,
) -> DoiResult<Option<Acl>> {
    if current == requested {
        return Ok(None);
    }

    let reject = || {
        Err(DoiError::InvalidStateTransition {
            from: current.as_str().to_string(),
            to: requested.as_str().to_string(),
        })
    };

    // every row of the table is a review-workflow transition
    if !review_mode {
        return reject();
    }

    let allowed = match (current, requested) {
        (DoiStatus::Draft, DoiStatus::ReviewReady) => roles.requester_or_admin(),
        (DoiStatus::ReviewReady, DoiStatus::InReview) => roles.publisher_or_admin(),
        (DoiStatus::ReviewReady, DoiStatus::Draft) => roles.requester_or_admin(),
        (DoiStatus::InReview, DoiStatus::Draft) => {
            roles.requester || roles.publisher || roles.admin
        }
        (DoiStatus::InReview, DoiStatus::Approved) => roles.publisher_or_admin(),
        (DoiStatus::InReview, DoiStatus::Rejected) => roles.publisher_or_admin(),
        (DoiStatus::Rejected, DoiStatus::Draft) => roles.requester_or_admin(),
        (DoiStatus::Approved, DoiStatus::Draft) => roles.requester_or_admin(),
        _ => return reject(),
    };
    if !allowed {
        return reject();
    }

    let acl = match (current, requested) {
        // submission for review also exposes the record to the publisher
        // group, read-only
        (DoiStatus::Draft, DoiStatus::ReviewReady) => {
            let mut groups = vec![doi_group.clone()];
            if let Some(publisher) = publisher_group {
                groups.push(publisher.clone());
            }
            Acl::read_only(groups)
        }
        (DoiStatus::ReviewReady, DoiStatus::InReview)
        | (DoiStatus::InReview, DoiStatus::Approved) => Acl::read_only([doi_group.clone()]),
        // every road back to draft, and a rejection, reopens write access
        (DoiStatus::ReviewReady, DoiStatus::Draft)
        | (DoiStatus::InReview, DoiStatus::Draft)
        | (DoiStatus::InReview, DoiStatus::Rejected)
        | (DoiStatus::Rejected, DoiStatus::Draft)
        | (DoiStatus::Approved, DoiStatus::Draft) => Acl::read_write([doi_group.clone()]),
        _ => unreachable!("legality match above is exhaustive over table rows"),
    };

    Ok(Some(acl))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn doi_group() -> GroupRef {
        GroupRef::new("doi-25.0001")
    }

    fn publisher_group() -> GroupRef {
        GroupRef::new("publishers")
    }

    fn eval(
        current: DoiStatus,
        requested: DoiStatus,
        roles: RoleSet,
        review_mode: bool,
    ) -> DoiResult<Option<Acl>> {
        let publisher = publisher_group();
        evaluate(
            current,
            requested,
            &roles,
            review_mode,
            &doi_group(),
            Some(&publisher),
        )
    }

    #[test_case(DoiStatus::Draft, DoiStatus::ReviewReady, RoleSet::requester())]
    #[test_case(DoiStatus::Draft, DoiStatus::ReviewReady, RoleSet::admin())]
    #[test_case(DoiStatus::ReviewReady, DoiStatus::InReview, RoleSet::publisher())]
    #[test_case(DoiStatus::ReviewReady, DoiStatus::Draft, RoleSet::requester())]
    #[test_case(DoiStatus::InReview, DoiStatus::Draft, RoleSet::requester())]
    #[test_case(DoiStatus::InReview, DoiStatus::Draft, RoleSet::publisher())]
    #[test_case(DoiStatus::InReview, DoiStatus::Approved, RoleSet::publisher())]
    #[test_case(DoiStatus::InReview, DoiStatus::Rejected, RoleSet::publisher())]
    #[test_case(DoiStatus::Rejected, DoiStatus::Draft, RoleSet::requester())]
    #[test_case(DoiStatus::Approved, DoiStatus::Draft, RoleSet::requester())]
    fn test_table_rows_allowed(current: DoiStatus, requested: DoiStatus, roles: RoleSet) {
        let acl = eval(current, requested, roles, true).unwrap();
        assert!(acl.is_some());
    }

    #[test_case(DoiStatus::Draft, DoiStatus::ReviewReady, RoleSet::publisher())]
    #[test_case(DoiStatus::ReviewReady, DoiStatus::InReview, RoleSet::requester())]
    #[test_case(DoiStatus::ReviewReady, DoiStatus::Draft, RoleSet::publisher())]
    #[test_case(DoiStatus::InReview, DoiStatus::Approved, RoleSet::requester())]
    #[test_case(DoiStatus::InReview, DoiStatus::Rejected, RoleSet::requester())]
    #[test_case(DoiStatus::Rejected, DoiStatus::Draft, RoleSet::publisher())]
    #[test_case(DoiStatus::Approved, DoiStatus::Draft, RoleSet::publisher())]
    #[test_case(DoiStatus::Draft, DoiStatus::ReviewReady, RoleSet::none())]
    fn test_wrong_role_rejected(current: DoiStatus, requested: DoiStatus, roles: RoleSet) {
        let err = eval(current, requested, roles, true).unwrap_err();
        assert!(matches!(err, DoiError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_review_mode_disabled_rejects_everything() {
        for current in DoiStatus::ALL {
            for requested in DoiStatus::ALL {
                if current == requested {
                    continue;
                }
                let result = eval(current, requested, RoleSet::admin(), false);
                assert!(
                    matches!(result, Err(DoiError::InvalidStateTransition { .. })),
                    "{current} -> {requested} should be rejected without review mode"
                );
            }
        }
    }

    #[test]
    fn test_pairs_outside_table_rejected_for_admin() {
        let in_table = [
            (DoiStatus::Draft, DoiStatus::ReviewReady),
            (DoiStatus::ReviewReady, DoiStatus::InReview),
            (DoiStatus::ReviewReady, DoiStatus::Draft),
            (DoiStatus::InReview, DoiStatus::Draft),
            (DoiStatus::InReview, DoiStatus::Approved),
            (DoiStatus::InReview, DoiStatus::Rejected),
            (DoiStatus::Rejected, DoiStatus::Draft),
            (DoiStatus::Approved, DoiStatus::Draft),
        ];
        for current in DoiStatus::ALL {
            for requested in DoiStatus::ALL {
                if current == requested || in_table.contains(&(current, requested)) {
                    continue;
                }
                let err = eval(current, requested, RoleSet::admin(), true).unwrap_err();
                match err {
                    DoiError::InvalidStateTransition { from, to } => {
                        assert_eq!(from, current.as_str());
                        assert_eq!(to, requested.as_str());
                    }
                    other => panic!("expected InvalidStateTransition, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_same_status_is_noop() {
        for status in DoiStatus::ALL {
            // never an error, even for role-less callers without review mode
            let result = eval(status, status, RoleSet::none(), false).unwrap();
            assert!(result.is_none());
        }
    }

    #[test]
    fn test_review_ready_acl_includes_publisher_group() {
        let acl = eval(
            DoiStatus::Draft,
            DoiStatus::ReviewReady,
            RoleSet::requester(),
            true,
        )
        .unwrap()
        .unwrap();

        assert!(acl.read_only.contains(&doi_group()));
        assert!(acl.read_only.contains(&publisher_group()));
        assert!(acl.read_write.is_empty());
        assert!(!acl.is_public);
    }

    #[test]
    fn test_review_ready_acl_without_publisher_group() {
        let acl = evaluate(
            DoiStatus::Draft,
            DoiStatus::ReviewReady,
            &RoleSet::requester(),
            true,
            &doi_group(),
            None,
        )
        .unwrap()
        .unwrap();

        assert_eq!(acl, Acl::read_only([doi_group()]));
    }

    #[test]
    fn test_back_to_draft_reopens_write_access() {
        for current in [
            DoiStatus::ReviewReady,
            DoiStatus::InReview,
            DoiStatus::Rejected,
            DoiStatus::Approved,
        ] {
            let acl = eval(current, DoiStatus::Draft, RoleSet::admin(), true)
                .unwrap()
                .unwrap();
            assert_eq!(acl, Acl::read_write([doi_group()]), "from {current}");
        }
    }

    #[test]
    fn test_rejection_reopens_write_access() {
        let acl = eval(
            DoiStatus::InReview,
            DoiStatus::Rejected,
            RoleSet::publisher(),
            true,
        )
        .unwrap()
        .unwrap();
        assert_eq!(acl, Acl::read_write([doi_group()]));
    }

    #[test]
    fn test_initial_acl() {
        let acl = initial_acl(&doi_group(), Some(&publisher_group()));
        assert!(acl.read_only.contains(&doi_group()));
        assert!(acl.read_write.contains(&doi_group()));
        assert!(acl.read_only.contains(&publisher_group()));
        assert!(acl.read_write.contains(&publisher_group()));
        assert!(!acl.is_public);

        let acl = initial_acl(&doi_group(), None);
        assert_eq!(acl.read_write.len(), 1);
    }

    #[test]
    fn test_reviewer_check() {
        assert!(can_set_reviewer(&RoleSet::publisher()));
        assert!(can_set_reviewer(&RoleSet::admin()));
        assert!(!can_set_reviewer(&RoleSet::requester()));
        assert!(!can_set_reviewer(&RoleSet::none()));
    }
}
