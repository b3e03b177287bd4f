//! npm registry client.
//!
//! Two endpoints are used: the version listing (`/{pkg}`, where `pkg` may
//! contain `/` for scoped packages) and the tarball
//! (`/{name}/-/{name}-{version}.tgz`). No auth, no conditional requests.

use crate::error::InstallError;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Default npm registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Environment variable overriding the registry URL. Tests point this at
/// an in-process mock registry.
pub const REGISTRY_ENV: &str = "SPRIG_NPM_REGISTRY";

/// Registry client shared by one install session.
///
/// No request timeouts are set: the session's cancellation token is the
/// only liveness control.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: String,
    http: Client,
}

impl RegistryClient {
    /// Create a new registry client with the given base URL.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot
    /// be created.
    pub fn new(base_url: &str) -> Result<Self, InstallError> {
        let parsed = Url::parse(base_url).map_err(|e| {
            InstallError::metadata_fetch(format!("invalid registry URL '{base_url}': {e}"))
        })?;

        let http = Client::builder()
            .user_agent(concat!("sprig/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                InstallError::metadata_fetch(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Create a client using the registry URL from the environment or the
    /// default.
    ///
    /// # Errors
    /// Returns an error if the client cannot be created.
    pub fn from_env() -> Result<Self, InstallError> {
        let url = std::env::var(REGISTRY_ENV).unwrap_or_else(|_| DEFAULT_REGISTRY.to_string());
        Self::new(&url)
    }

    /// Get the base URL (no trailing slash).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the version listing document for a package.
    ///
    /// `name` is the full registry name (`@scope/name` for scoped
    /// packages).
    ///
    /// # Errors
    /// Returns `METADATA_FETCH_FAILED` on network failure, non-200 status
    /// or an unparseable body, and `CANCELLED` if the token trips first.
    pub async fn fetch_packument(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, InstallError> {
        let url = format!("{}/{name}", self.base_url);
        debug!(url = %url, "fetching package metadata");

        let response = tokio::select! {
            () = cancel.cancelled() => return Err(InstallError::cancelled()),
            response = self.http.get(&url).send() => response
                .map_err(|e| InstallError::metadata_fetch(format!("GET {url}: {e}")))?,
        };

        if response.status() != StatusCode::OK {
            return Err(InstallError::metadata_fetch(format!(
                "unexpected status {} for {url}",
                response.status()
            )));
        }

        let body = tokio::select! {
            () = cancel.cancelled() => return Err(InstallError::cancelled()),
            body = response.bytes() => body
                .map_err(|e| InstallError::metadata_fetch(format!("reading body of {url}: {e}")))?,
        };

        serde_json::from_slice(&body)
            .map_err(|e| InstallError::metadata_fetch(format!("invalid JSON from {url}: {e}")))
    }

    /// Download a package tarball.
    ///
    /// # Errors
    /// Returns `TARBALL_FETCH_FAILED` on network failure or non-200
    /// status, and `CANCELLED` if the token trips first.
    pub async fn fetch_tarball(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Bytes, InstallError> {
        debug!(url = %url, "downloading tarball");

        let response = tokio::select! {
            () = cancel.cancelled() => return Err(InstallError::cancelled()),
            response = self.http.get(url).send() => response
                .map_err(|e| InstallError::tarball_fetch(format!("GET {url}: {e}")))?,
        };

        if response.status() != StatusCode::OK {
            return Err(InstallError::tarball_fetch(format!(
                "unexpected status {} for {url}",
                response.status()
            )));
        }

        let bytes = tokio::select! {
            () = cancel.cancelled() => return Err(InstallError::cancelled()),
            bytes = response.bytes() => bytes
                .map_err(|e| InstallError::tarball_fetch(format!("reading body of {url}: {e}")))?,
        };

        debug!(url = %url, size = bytes.len(), "downloaded tarball");
        Ok(bytes)
    }
}
