//! Remote boundary source retrieval
//!
//! URLs are checked against a [`UrlPolicy`] before any request is made: HTTPS only, a
//! trusted host, and a path that looks like GeoJSON.

use crate::config::UrlPolicy;
use crate::{BoundaryDocument, GeofenceError, Result, parse_boundary};
use reqwest::{Client, Url, header};
use std::time::Duration;

/// Content types a boundary response is expected to carry
const EXPECTED_CONTENT_TYPES: &[&str] = &["application/json", "application/geo+json"];

/// Fetches boundary sources over HTTPS
#[derive(Debug, Clone)]
pub struct BoundaryFetcher {
    client: Client,
    policy: UrlPolicy,
    timeout: Duration,
}

impl BoundaryFetcher {
    pub fn new(policy: UrlPolicy, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            policy,
            timeout,
        }
    }

    /// Use an existing client (shared connection pool)
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    #[inline]
    pub fn policy(&self) -> &UrlPolicy {
        &self.policy
    }

    /// Check a URL against the policy
    pub fn validate_url(&self, raw: &str) -> Result<Url> {
        let rejected = |reason: &str| GeofenceError::UrlRejected {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw.trim()).map_err(|_| rejected("not a valid URL"))?;
        if url.scheme() != "https" {
            return Err(rejected("only https is allowed"));
        }

        let host = url
            .host_str()
            .ok_or_else(|| rejected("missing host"))?
            .to_ascii_lowercase();
        let trusted = self.policy.trusted_domains.iter().any(|domain| {
            let domain = domain.to_ascii_lowercase();
            host == domain || host.ends_with(&format!(".{domain}"))
        });
        if !trusted {
            return Err(rejected("host is not a trusted domain"));
        }

        let path = url.path().to_ascii_lowercase();
        let has_extension = self
            .policy
            .allowed_extensions
            .iter()
            .any(|ext| path.ends_with(&ext.to_ascii_lowercase()));
        let is_api = self
            .policy
            .api_path_markers
            .iter()
            .any(|marker| path.contains(&marker.to_ascii_lowercase()));
        if !has_extension && !is_api {
            return Err(rejected("path is neither a GeoJSON file nor a known API endpoint"));
        }

        Ok(url)
    }

    /// Download the boundary source at `raw`
    ///
    /// The whole exchange (connect, headers and body) has to finish within the timeout.
    pub async fn fetch(&self, raw: &str) -> Result<String> {
        let url = self.validate_url(raw)?;
        tracing::info!("Fetching boundary source from {}", url);

        match tokio::time::timeout(self.timeout, self.download(url)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Boundary fetch timed out after {:?}", self.timeout);
                Err(GeofenceError::Timeout(self.timeout))
            }
        }
    }

    /// [`BoundaryFetcher::fetch`] followed by [`parse_boundary`]
    pub async fn fetch_document(&self, raw: &str) -> Result<BoundaryDocument> {
        let payload = self.fetch(raw).await?;
        parse_boundary(&payload)
    }

    async fn download(&self, url: Url) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .header(header::ACCEPT, EXPECTED_CONTENT_TYPES.join(", "))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(GeofenceError::HttpStatus(resp.status().as_u16()));
        }

        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !EXPECTED_CONTENT_TYPES
            .iter()
            .any(|expected| content_type.starts_with(expected))
        {
            // Plenty of static hosts serve .geojson as text/plain
            tracing::warn!("Unexpected boundary content type {:?}", content_type);
        }

        let body = resp.text().await?;
        tracing::debug!("Boundary source downloaded ({} bytes)", body.len());
        Ok(body)
    }
}

impl Default for BoundaryFetcher {
    fn default() -> Self {
        Self::new(UrlPolicy::default(), crate::config::DEFAULT_FETCH_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(result: Result<Url>) -> String {
        match result {
            Err(GeofenceError::UrlRejected { reason, .. }) => reason,
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_accepts_trusted_geojson() {
        let fetcher = BoundaryFetcher::default();
        let url = fetcher
            .validate_url("https://raw.githubusercontent.com/org/repo/main/regions.geojson")
            .unwrap();
        assert_eq!(url.host_str(), Some("raw.githubusercontent.com"));

        // Subdomains of a trusted domain and case-insensitive extensions
        assert!(
            fetcher
                .validate_url("https://service.pdok.nl/data/Provinces.JSON")
                .is_ok()
        );
    }

    #[test]
    fn test_accepts_api_endpoints() {
        let fetcher = BoundaryFetcher::default();
        assert!(
            fetcher
                .validate_url("https://service.pdok.nl/cbs/gebiedsindelingen/2023/wfs/v1_0/api/collections?f=json")
                .is_ok()
        );
        assert!(
            fetcher
                .validate_url("https://services.arcgis.com/abc/arcgis/rest/services/Zones/FeatureServer/0/query")
                .is_ok()
        );
    }

    #[test]
    fn test_rejects_plain_http() {
        let fetcher = BoundaryFetcher::default();
        let result = fetcher.validate_url("http://raw.githubusercontent.com/a/b.geojson");
        assert!(reason(result).contains("https"));
    }

    #[test]
    fn test_rejects_untrusted_host() {
        let fetcher = BoundaryFetcher::default();
        assert!(reason(fetcher.validate_url("https://evil.example.com/a.geojson")).contains("trusted"));
        // A suffix match without a dot boundary is not a subdomain
        assert!(fetcher.validate_url("https://notpdok.nl/a.geojson").is_err());
    }

    #[test]
    fn test_rejects_unknown_path() {
        let fetcher = BoundaryFetcher::default();
        assert!(fetcher.validate_url("https://pdok.nl/index.html").is_err());
        assert!(fetcher.validate_url("not a url").is_err());
    }

    #[test]
    fn test_custom_policy() {
        let policy = UrlPolicy {
            trusted_domains: vec!["example.org".to_string()],
            allowed_extensions: vec![".geojson".to_string()],
            api_path_markers: Vec::new(),
        };
        let fetcher = BoundaryFetcher::new(policy, Duration::from_secs(1));
        assert!(fetcher.validate_url("https://maps.example.org/zones.geojson").is_ok());
        assert!(fetcher.validate_url("https://maps.example.org/zones.json").is_err());
    }

    #[tokio::test]
    async fn test_fetch_rejects_before_request() {
        let fetcher = BoundaryFetcher::default();
        let result = fetcher.fetch("ftp://pdok.nl/a.geojson").await;
        assert!(matches!(result, Err(GeofenceError::UrlRejected { .. })));
    }
}
