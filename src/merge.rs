//! Metadata document merge
//!
//! Reconciles a caller-submitted document with the stored one. A caller may
//! edit creators, titles, publication year, and language; everything that
//! defines the document's identity must match the stored values exactly,
//! and each immutable field is checked on its own so the error names the
//! specific offender.

use crate::errors::{DoiError, DoiResult};
use crate::resource::Resource;
use tracing::debug;

/// Merge a submitted document into the stored one
///
/// On success the stored document is returned with the caller-editable
/// fields overwritten; the submitted document's identifier, namespace,
/// publisher, and resource type are never written back.
pub fn merge(submitted: &Resource, mut stored: Resource) -> DoiResult<Resource> {
    verify_immutable_fields(submitted, &stored)?;

    stored.creators = submitted.creators.clone();
    stored.titles = submitted.titles.clone();
    stored.publication_year = submitted.publication_year;
    stored.language = submitted.language.clone();

    debug!(identifier = %stored.identifier().value(), "merged metadata document");
    Ok(stored)
}

fn verify_immutable_fields(submitted: &Resource, stored: &Resource) -> DoiResult<()> {
    verify_value(
        "namespace prefix",
        &submitted.namespace.prefix,
        &stored.namespace.prefix,
    )?;
    verify_value("namespace URI", &submitted.namespace.uri, &stored.namespace.uri)?;
    verify_value("publisher", &submitted.publisher, &stored.publisher)?;
    verify_value(
        "identifier",
        submitted.identifier().value(),
        stored.identifier().value(),
    )?;
    verify_value(
        "identifier type",
        submitted.identifier().identifier_type(),
        stored.identifier().identifier_type(),
    )?;
    verify_value(
        "resource type",
        submitted.resource_type.general.as_str(),
        stored.resource_type.general.as_str(),
    )?;
    verify_optional(
        "resource type description",
        submitted.resource_type.description.as_deref(),
        stored.resource_type.description.as_deref(),
    )?;
    Ok(())
}

fn verify_value(field: &str, submitted: &str, stored: &str) -> DoiResult<()> {
    if submitted != stored {
        return Err(DoiError::ImmutableField {
            field: field.to_string(),
            expected: stored.to_string(),
            actual: submitted.to_string(),
        });
    }
    Ok(())
}

/// Like [`verify_value`] but a missing value on one side is its own
/// violation, reported as `null` rather than as a value mismatch
fn verify_optional(field: &str, submitted: Option<&str>, stored: Option<&str>) -> DoiResult<()> {
    match (submitted, stored) {
        (None, None) => Ok(()),
        (Some(s), Some(t)) => verify_value(field, s, t),
        (None, Some(t)) => Err(DoiError::ImmutableField {
            field: field.to_string(),
            expected: t.to_string(),
            actual: "null".to_string(),
        }),
        (Some(s), None) => Err(DoiError::ImmutableField {
            field: field.to_string(),
            expected: "null".to_string(),
            actual: s.to_string(),
        }),
    }
}
