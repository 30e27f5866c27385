//! `HttpClient` — an immutable, UID-identified HTTP client configuration
//! with SSRF-safe request dispatch (spec.md §4.5).

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use security::SsrfPolicy;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::HttpClientError;
use crate::transport::{PreparedRequest, RawResponse, Transport};

/// Authentication mode for an [`HttpClient`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AuthMode {
    None,
    Basic { username: String, password: String },
    Bearer { token: String },
}

/// Immutable per-client configuration, referenced by [`AuthMode::uid`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    pub auth: AuthMode,
    /// Duplicate keys are preserved — necessary for headers like `Accept`
    /// and multi-value query parameters.
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub timeout: Duration,
    pub policy: SsrfPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            auth: AuthMode::None,
            headers: Vec::new(),
            query: Vec::new(),
            timeout: Duration::from_secs(30),
            policy: SsrfPolicy::default(),
        }
    }
}

impl HttpClientConfig {
    /// Clamp the configured timeout to the spec's 60s hard ceiling.
    pub fn clamped_timeout(&self) -> Duration {
        self.timeout.min(Duration::from_secs(60))
    }
}

/// The result of a successful request, capped at `max_response_size`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub redirects_followed: u32,
}

/// An immutable HTTP client referenced by a stable UID.
pub struct HttpClient {
    pub uid: Uuid,
    pub config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Self {
        Self { uid: Uuid::new_v4(), config }
    }

    pub fn with_uid(uid: Uuid, config: HttpClientConfig) -> Self {
        Self { uid, config }
    }

    /// Execute a request against `url`, validating the SSRF policy on
    /// the initial hop and on every redirect, up to `max_redirects`, and
    /// capping the response body at `max_response_size` bytes.
    pub async fn request(
        &self,
        transport: &dyn Transport,
        method: &str,
        url: &str,
        body: Option<Vec<u8>>,
        max_redirects: u32,
        max_response_size: u64,
    ) -> Result<HttpResponse, HttpClientError> {
        let mut current_url = url.to_string();
        let mut redirects_followed = 0u32;

        loop {
            let parsed = self.validate_and_parse(&current_url).await?;
            let resolved_ips = Self::resolve(&parsed).await?;
            self.config.policy.classify_resolved(&resolved_ips)?;

            let prepared = self.prepare_request(method, &parsed, body.clone());
            let response = transport.send(&prepared).await?;

            if response.is_redirect() && redirects_followed < max_redirects {
                let Some(location) = response.header("location") else {
                    return Ok(Self::finish(response, redirects_followed, max_response_size)?);
                };
                current_url = resolve_redirect(&current_url, location)?;
                redirects_followed += 1;
                continue;
            }

            if response.is_redirect() && redirects_followed >= max_redirects {
                return Err(HttpClientError::TooManyRedirects(max_redirects));
            }

            return Self::finish(response, redirects_followed, max_response_size);
        }
    }

    fn finish(
        response: RawResponse,
        redirects_followed: u32,
        max_response_size: u64,
    ) -> Result<HttpResponse, HttpClientError> {
        if response.body.len() as u64 > max_response_size {
            return Err(HttpClientError::ResponseTooLarge { limit: max_response_size });
        }
        Ok(HttpResponse {
            status: response.status,
            headers: response.headers,
            body: response.body,
            redirects_followed,
        })
    }

    async fn validate_and_parse(&self, url: &str) -> Result<Url, HttpClientError> {
        let parsed = Url::parse(url).map_err(|_| HttpClientError::InvalidUrl(url.to_string()))?;

        if !self.config.policy.scheme_allowed(parsed.scheme()) {
            return Err(HttpClientError::InvalidScheme(parsed.scheme().to_string()));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| HttpClientError::InvalidUrl(url.to_string()))?;

        if let Some(reason) = self.config.policy.classify_hostname(host) {
            let ip = host.parse::<IpAddr>().unwrap_or(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));
            return Err((reason, ip).into());
        }

        if !self.config.policy.domain_allowed(host) {
            return Err(HttpClientError::HostBlocked(host.to_string()));
        }

        Ok(parsed)
    }

    async fn resolve(url: &Url) -> Result<Vec<IpAddr>, HttpClientError> {
        let host = url.host_str().expect("validated above");
        let port = url.port_or_known_default().unwrap_or(80);

        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| HttpClientError::DnsResolutionFailed {
                host: host.to_string(),
                message: e.to_string(),
            })?
            .collect();

        if addrs.is_empty() {
            return Err(HttpClientError::DnsResolutionFailed {
                host: host.to_string(),
                message: "no addresses returned".to_string(),
            });
        }

        Ok(addrs.into_iter().map(|a| a.ip()).collect())
    }

    fn prepare_request(&self, method: &str, url: &Url, body: Option<Vec<u8>>) -> PreparedRequest {
        let mut url = url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for (k, v) in &self.config.query {
                pairs.append_pair(k, v);
            }
        }
        if url.query().map_or(true, str::is_empty) {
            url.set_query(None);
        }

        let mut headers = self.config.headers.clone();
        match &self.config.auth {
            AuthMode::None => {}
            AuthMode::Basic { username, password } => {
                use base64::Engine as _;
                let token = base64::engine::general_purpose::STANDARD
                    .encode(format!("{username}:{password}"));
                headers.push(("Authorization".to_string(), format!("Basic {token}")));
            }
            AuthMode::Bearer { token } => {
                headers.push(("Authorization".to_string(), format!("Bearer {token}")));
            }
        }

        PreparedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers,
            body,
            timeout: self.config.clamped_timeout(),
        }
    }
}

fn resolve_redirect(base: &str, location: &str) -> Result<String, HttpClientError> {
    let base_url = Url::parse(base).map_err(|_| HttpClientError::InvalidUrl(base.to_string()))?;
    let resolved = base_url
        .join(location)
        .map_err(|_| HttpClientError::InvalidUrl(location.to_string()))?;
    Ok(resolved.to_string())
}

trait ClassifyResolved {
    fn classify_resolved(&self, ips: &[IpAddr]) -> Result<(), HttpClientError>;
}

impl ClassifyResolved for SsrfPolicy {
    fn classify_resolved(&self, ips: &[IpAddr]) -> Result<(), HttpClientError> {
        for ip in ips {
            if let Some(reason) = self.classify_ip(ip) {
                return Err(HttpClientError::from((reason, *ip)));
            }
        }
        Ok(())
    }
}

impl From<(security::BlockReason, IpAddr)> for HttpClientError {
    fn from((reason, ip): (security::BlockReason, IpAddr)) -> Self {
        match reason {
            security::BlockReason::Localhost => HttpClientError::LocalhostBlocked(ip),
            security::BlockReason::PrivateIp => HttpClientError::PrivateIpBlocked(ip),
            security::BlockReason::LinkLocal => HttpClientError::LinkLocalBlocked(ip),
            security::BlockReason::CloudMetadata => HttpClientError::MetadataBlocked(ip),
        }
    }
}
