//! The DOI metadata document (citation record)
//!
//! The identifier is fixed at construction: there is no mutator, so a
//! document's identity cannot be rewritten after the orchestrator assigns
//! it. Updates flow through [`crate::merge`], which copies only the
//! caller-editable fields onto the stored document.

use crate::errors::{DoiError, DoiResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata schema namespace; immutable across updates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    /// Namespace prefix
    pub prefix: String,
    /// Namespace URI
    pub uri: String,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.uri)
    }
}

/// The registered identifier; value and type are set once at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    value: String,
    identifier_type: String,
}

impl Identifier {
    /// Create an identifier; the only way to set its value
    pub fn new(value: impl Into<String>, identifier_type: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            identifier_type: identifier_type.into(),
        }
    }

    /// The identifier value, e.g. `10.11570/25.0001`
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The identifier type, e.g. `DOI`
    pub fn identifier_type(&self) -> &str {
        &self.identifier_type
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value, self.identifier_type)
    }
}

/// A citation title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    /// Title text
    pub value: String,
    /// Optional language tag
    pub lang: Option<String>,
}

impl Title {
    /// Title with no language tag
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            lang: None,
        }
    }
}

/// A dataset creator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    /// Creator name, `Family, Given`
    pub name: String,
    /// Optional affiliation
    pub affiliation: Option<String>,
}

impl Creator {
    /// Creator with no affiliation
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            affiliation: None,
        }
    }
}

/// General resource classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceTypeGeneral {
    /// A dataset
    Dataset,
    /// Software
    Software,
    /// Textual material
    Text,
    /// Anything else
    Other,
}

impl ResourceTypeGeneral {
    /// Stable token for the classification
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceTypeGeneral::Dataset => "dataset",
            ResourceTypeGeneral::Software => "software",
            ResourceTypeGeneral::Text => "text",
            ResourceTypeGeneral::Other => "other",
        }
    }
}

/// Resource type: classification plus free-text description, both immutable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    /// General classification
    pub general: ResourceTypeGeneral,
    /// Free-text description
    pub description: Option<String>,
}

/// Kind of dated event in the document history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateType {
    /// The DOI was created
    Created,
    /// The DOI was issued by the registrar
    Issued,
    /// The metadata was updated
    Updated,
}

/// A dated event attached to the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateEvent {
    /// ISO-8601 local date
    pub date: String,
    /// Event kind
    pub date_type: DateType,
    /// Optional free-text information
    pub information: Option<String>,
}

/// The DOI's citation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    identifier: Identifier,
    /// Schema namespace; immutable
    pub namespace: Namespace,
    /// Titles; caller-editable
    pub titles: Vec<Title>,
    /// Creators; caller-editable
    pub creators: Vec<Creator>,
    /// Publishing organization; immutable
    pub publisher: String,
    /// Classification; immutable
    pub resource_type: ResourceType,
    /// Publication year; caller-editable
    pub publication_year: u16,
    /// Optional language tag; caller-editable
    pub language: Option<String>,
    /// Dated events
    pub dates: Vec<DateEvent>,
}

impl Resource {
    /// Create a citation record around a fixed identifier
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identifier: Identifier,
        namespace: Namespace,
        titles: Vec<Title>,
        creators: Vec<Creator>,
        publisher: impl Into<String>,
        resource_type: ResourceType,
        publication_year: u16,
    ) -> Self {
        Self {
            identifier,
            namespace,
            titles,
            creators,
            publisher: publisher.into(),
            resource_type,
            publication_year,
            language: None,
            dates: Vec::new(),
        }
    }

    /// The registered identifier
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Rebuild this document around a different identifier
    ///
    /// Consumes the document; used exactly once, when the orchestrator
    /// assigns the allocated identifier to a caller-submitted document.
    pub fn with_identifier(self, identifier: Identifier) -> Self {
        Self { identifier, ..self }
    }

    /// First title with non-blank text
    pub fn primary_title(&self) -> DoiResult<&Title> {
        self.titles
            .iter()
            .find(|t| !t.value.trim().is_empty())
            .ok_or_else(|| {
                DoiError::validation("DOI metadata must include a title with text content")
            })
    }
}

/// Serializes the metadata document for storage and registrar submission
pub trait MetadataCodec: Send + Sync {
    /// Encode a document
    fn serialize(&self, resource: &Resource) -> DoiResult<Vec<u8>>;

    /// Decode a document
    fn deserialize(&self, bytes: &[u8]) -> DoiResult<Resource>;
}

/// JSON codec for the metadata document
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl MetadataCodec for JsonCodec {
    fn serialize(&self, resource: &Resource) -> DoiResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(resource)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> DoiResult<Resource> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Name of the metadata document node for a suffix
pub fn doi_filename(suffix: &str) -> String {
    format!("{suffix}.json")
}
