//! # Resilient HTTP Fetching
//!
//! Every network read in the report (NOAA, Open-Meteo, recipient lists) goes through
//! [`ResilientFetcher`]. It performs a plain HTTP GET with strict certificate
//! verification and, only when that attempt fails because of a certificate problem,
//! retries exactly once with verification disabled.
//!
//! ## Why a second, unverified attempt
//! Some deployment hosts ship incomplete CA bundles. The retry trades confidentiality
//! for availability, so it is always logged at `warn` as a degraded-trust request.
//!
//! ## Failure handling
//! - Certificate failure on the strict attempt: one unverified retry
//! - Anything else (timeout, DNS, refused connection, HTTP status): returned as-is
//! - There is no backoff and no further retry; each caller applies its own policy
//!
//! The actual I/O sits behind the [`HttpTransport`] trait so the retry policy and
//! every feed parser can be exercised without a network.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::HttpConfig;

/// Transport-level failures, classified so the fetcher can decide on a retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// TLS certificate could not be verified (unknown issuer, expired, self-signed)
    #[error("certificate verification failed: {0}")]
    Certificate(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// DNS resolution or TCP connection failure
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("server returned HTTP {0}")]
    Status(u16),

    #[error("HTTP error: {0}")]
    Other(String),
}

/// Whether the TLS peer certificate is checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verification {
    Strict,
    Disabled,
}

/// A single GET request.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    pub params: Vec<(String, String)>,
    pub timeout: Duration,
}

impl FetchRequest {
    /// Value of a query parameter, if present
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Performs one GET and returns the response body as text.
///
/// Implementations must be safe to share across concurrent fetches.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(
        &self,
        request: &FetchRequest,
        verification: Verification,
    ) -> Result<String, FetchError>;
}

/// `reqwest` transport holding one verifying and one non-verifying client.
///
/// Both clients are connection-pooled and cheap to share.
pub struct ReqwestTransport {
    strict: reqwest::Client,
    insecure: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, FetchError> {
        let user_agent = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

        let strict = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Other(error_chain(&e)))?;

        let insecure = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent(user_agent)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| FetchError::Other(error_chain(&e)))?;

        Ok(ReqwestTransport { strict, insecure })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        request: &FetchRequest,
        verification: Verification,
    ) -> Result<String, FetchError> {
        let client = match verification {
            Verification::Strict => &self.strict,
            Verification::Disabled => &self.insecure,
        };

        let response = client
            .get(&request.url)
            .query(&request.params)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.text().await.map_err(classify)
    }
}

/// Map a `reqwest` error onto [`FetchError`], checking for certificate trouble first
/// because TLS failures also surface as connect errors.
///
/// The URL is stripped before matching so a path such as `/ssl/list.txt` cannot
/// pass for a TLS failure.
fn classify(err: reqwest::Error) -> FetchError {
    let err = err.without_url();
    let detail = error_chain(&err);
    if is_certificate_failure(&detail) {
        FetchError::Certificate(detail)
    } else if err.is_timeout() {
        FetchError::Timeout(detail)
    } else if err.is_connect() {
        FetchError::Connect(detail)
    } else if let Some(status) = err.status() {
        FetchError::Status(status.as_u16())
    } else {
        FetchError::Other(detail)
    }
}

/// Flatten an error and all of its sources into one line.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut detail = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}

/// True when an error description points at certificate verification.
///
/// rustls reports these as `invalid peer certificate: UnknownIssuer` and similar.
pub fn is_certificate_failure(detail: &str) -> bool {
    let detail = detail.to_ascii_lowercase();
    ["certificate", "unknownissuer", "self signed", "self-signed"]
        .iter()
        .any(|marker| detail.contains(marker))
}

/// HTTP GET with a single certificate-verification fallback.
#[derive(Clone)]
pub struct ResilientFetcher {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl ResilientFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, timeout: Duration) -> Self {
        ResilientFetcher { transport, timeout }
    }

    /// Build a fetcher backed by `reqwest` using the configured timeout.
    pub fn from_config(config: &HttpConfig) -> Result<Self, FetchError> {
        Ok(Self::new(Arc::new(ReqwestTransport::new()?), config.timeout()))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` with query `params` and return the body text.
    ///
    /// # Returns
    /// - `Ok(body)`: 2xx response from either attempt
    /// - `Err(FetchError)`: the strict attempt failed for a non-certificate reason,
    ///   or the unverified retry failed for any reason
    pub async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<String, FetchError> {
        let request = FetchRequest {
            url: url.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            timeout: self.timeout,
        };

        debug!(url, "HTTP GET");
        match self.transport.get(&request, Verification::Strict).await {
            Err(FetchError::Certificate(detail)) => {
                warn!(
                    url,
                    %detail,
                    "Certificate verification failed; retrying once WITHOUT verification (degraded trust)"
                );
                self.transport.get(&request, Verification::Disabled).await
            }
            result => result,
        }
    }
}
