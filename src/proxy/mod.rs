//! Safe fetch proxy
//!
//! Validates a caller-supplied document URL against a fixed policy before any
//! network activity, then streams the upstream response through without
//! buffering it. The host allow-list is the SSRF defense: without it the
//! proxy would let a caller make the server issue arbitrary outbound
//! requests. Upstream headers are never trusted; the HTTP layer forces the
//! document content type on the way out.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::error::AppError;

/// Content type forced onto every proxied response
pub const DOCUMENT_MIME: &str = "application/pdf";

/// Disposition hint with a generic filename; the upstream's declared
/// filename is attacker-influenced if the allow-list were ever misconfigured.
pub const DOCUMENT_DISPOSITION: &str = "inline; filename=\"document.pdf\"";

/// Validated fetch target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTarget {
    /// Same-origin static asset path; redirect, no network fetch
    Local(String),
    /// Remote document passing scheme and allow-list checks
    Remote(Url),
}

/// Policy the proxy enforces before touching the network
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Hosts the proxy may contact
    allowed_hosts: Vec<String>,
    /// Local path prefix that short-circuits to a redirect
    static_prefix: String,
    /// Upstream fetch timeout
    timeout: Duration,
    /// Test-only escape hatch; production policies always require https
    allow_insecure: bool,
}

impl FetchPolicy {
    pub fn new(allowed_hosts: Vec<String>, static_prefix: String, timeout: Duration) -> Self {
        Self {
            allowed_hosts,
            static_prefix,
            timeout,
            allow_insecure: false,
        }
    }

    /// Admit plain-http targets so tests can run against a loopback stub
    #[cfg(test)]
    pub(crate) fn allow_insecure_for_tests(mut self) -> Self {
        self.allow_insecure = true;
        self
    }

    /// Validate a raw URL string into a fetch target
    pub fn validate(&self, raw: &str) -> Result<FetchTarget, AppError> {
        if raw.is_empty() {
            return Err(AppError::BadRequest("no URL provided".to_string()));
        }

        if raw.starts_with(&self.static_prefix) {
            return Ok(FetchTarget::Local(raw.to_string()));
        }

        let url = Url::parse(raw)
            .map_err(|e| AppError::BadRequest(format!("malformed URL: {e}")))?;

        let secure = url.scheme() == "https" || (self.allow_insecure && url.scheme() == "http");
        if !secure {
            return Err(AppError::BadRequest("only secure URLs allowed".to_string()));
        }

        let host = url
            .host_str()
            .ok_or_else(|| AppError::BadRequest("URL has no host".to_string()))?;
        if !self.allowed_hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
            warn!(host = host, "Proxy target host not on allow-list");
            return Err(AppError::Forbidden(format!("host not allowed: {host}")));
        }

        Ok(FetchTarget::Remote(url))
    }
}

/// Outbound fetcher for validated remote targets
pub struct FetchProxy {
    http_client: Client,
    policy: FetchPolicy,
}

impl FetchProxy {
    pub fn new(policy: FetchPolicy) -> Result<Self> {
        // Redirects are never followed: the allow-list only gates the
        // initial URL, so following one would let an allowed host bounce
        // the proxy to an arbitrary one. A 3xx surfaces as BadRequest
        // through the non-200 check in fetch().
        let http_client = Client::builder()
            .timeout(policy.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to create proxy HTTP client")?;
        Ok(Self { http_client, policy })
    }

    /// Validate a raw URL against the policy
    pub fn validate(&self, raw: &str) -> Result<FetchTarget, AppError> {
        self.policy.validate(raw)
    }

    /// Fetch a validated remote target, returning the streaming response.
    ///
    /// The body is consumed chunk-by-chunk by the caller; dropping the
    /// response aborts the upstream read.
    pub async fn fetch(&self, url: Url) -> Result<reqwest::Response, AppError> {
        debug!(url = %url, "Proxying upstream fetch");
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_transport_error)?;

        if response.status() != StatusCode::OK {
            let status = response.status().as_u16();
            warn!(url = %url, status = status, "Upstream rejected proxied fetch");
            return Err(AppError::BadRequest(format!(
                "upstream returned status {status}"
            )));
        }

        Ok(response)
    }
}

fn classify_transport_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::GatewayTimeout
    } else {
        AppError::BadGateway(e.to_string())
    }
}
