//! External DOI registrar collaborator
//!
//! The registrar is the service of record that resolves a DOI to its
//! landing page. Registration is two synchronous calls: post the metadata
//! document, then set the landing page URL ("make findable"). A 401/403
//! from the registrar means misconfigured credentials, not transient
//! unavailability, and converts to an authorization failure.

use crate::errors::DoiError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors reported by the registrar collaborator
#[derive(Debug, Clone, Error)]
pub enum RegistrarError {
    /// 401/403 response; credentials are wrong or lack permission
    #[error("registrar denied access: {0}")]
    AccessDenied(String),

    /// Any other non-2xx response, carrying the response body
    #[error("registrar error (HTTP {status}): {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The request never produced a response
    #[error("registrar unreachable: {0}")]
    Transport(String),
}

impl From<RegistrarError> for DoiError {
    fn from(err: RegistrarError) -> Self {
        match err {
            RegistrarError::AccessDenied(message) => DoiError::Authorization(message),
            RegistrarError::Http { status, body } => DoiError::Remote {
                service: "registrar".to_string(),
                message: format!("HTTP {status}: {body}"),
            },
            RegistrarError::Transport(message) => DoiError::Remote {
                service: "registrar".to_string(),
                message,
            },
        }
    }
}

/// Narrow interface to the external DOI registrar
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Registrar: Send + Sync {
    /// Register the serialized metadata document under
    /// `{account_prefix}/{suffix}`
    async fn register_metadata(
        &self,
        account_prefix: &str,
        suffix: &str,
        body: Vec<u8>,
    ) -> Result<(), RegistrarError>;

    /// Point the registered DOI at its landing page, making it findable
    async fn set_landing_page(
        &self,
        account_prefix: &str,
        suffix: &str,
        url: &str,
    ) -> Result<(), RegistrarError>;
}

/// In-memory registrar for tests; records registrations and landing pages
#[derive(Debug, Default)]
pub struct InMemoryRegistrar {
    registered: RwLock<BTreeMap<String, Vec<u8>>>,
    landing_pages: RwLock<BTreeMap<String, String>>,
}

impl InMemoryRegistrar {
    /// Empty registrar
    pub fn new() -> Self {
        Self::default()
    }

    /// The metadata registered for `{account_prefix}/{suffix}`, if any
    pub async fn registered(&self, doi: &str) -> Option<Vec<u8>> {
        self.registered.read().await.get(doi).cloned()
    }

    /// The landing page set for `{account_prefix}/{suffix}`, if any
    pub async fn landing_page(&self, doi: &str) -> Option<String> {
        self.landing_pages.read().await.get(doi).cloned()
    }
}

#[async_trait]
impl Registrar for InMemoryRegistrar {
    async fn register_metadata(
        &self,
        account_prefix: &str,
        suffix: &str,
        body: Vec<u8>,
    ) -> Result<(), RegistrarError> {
        self.registered
            .write()
            .await
            .insert(format!("{account_prefix}/{suffix}"), body);
        Ok(())
    }

    async fn set_landing_page(
        &self,
        account_prefix: &str,
        suffix: &str,
        url: &str,
    ) -> Result<(), RegistrarError> {
        let doi = format!("{account_prefix}/{suffix}");
        if !self.registered.read().await.contains_key(&doi) {
            return Err(RegistrarError::Http {
                status: 404,
                body: format!("DOI {doi} is not registered"),
            });
        }
        self.landing_pages.write().await.insert(doi, url.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_then_findable() {
        let registrar = InMemoryRegistrar::new();
        registrar
            .register_metadata("10.11570", "25.0001", b"{}".to_vec())
            .await
            .unwrap();
        registrar
            .set_landing_page("10.11570", "25.0001", "https://example.org?doi=25.0001")
            .await
            .unwrap();

        assert_eq!(
            registrar.registered("10.11570/25.0001").await.unwrap(),
            b"{}".to_vec()
        );
        assert_eq!(
            registrar.landing_page("10.11570/25.0001").await.unwrap(),
            "https://example.org?doi=25.0001"
        );
    }

    #[tokio::test]
    async fn test_landing_page_requires_registration() {
        let registrar = InMemoryRegistrar::new();
        let err = registrar
            .set_landing_page("10.11570", "25.0001", "https://example.org")
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrarError::Http { status: 404, .. }));
    }

    #[test]
    fn test_access_denied_maps_to_authorization() {
        let err: DoiError = RegistrarError::AccessDenied("bad credentials".to_string()).into();
        assert!(err.is_authorization());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_http_error_maps_to_remote() {
        let err: DoiError = RegistrarError::Http {
            status: 500,
            body: "oops".to_string(),
        }
        .into();
        assert!(err.is_transient());
        assert_eq!(
            err.to_string(),
            "Remote service error: registrar - HTTP 500: oops"
        );
    }
}
