//! Error taxonomy for the HTTP client subsystem (spec.md §7, Security + Runtime).

use std::net::IpAddr;

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum HttpClientError {
    #[error("URL blocked by policy: {0}")]
    UrlBlocked(String),

    #[error("host blocked by domain policy: {0}")]
    HostBlocked(String),

    #[error("private IP address blocked: {0}")]
    PrivateIpBlocked(IpAddr),

    #[error("localhost/loopback address blocked: {0}")]
    LocalhostBlocked(IpAddr),

    #[error("link-local address blocked: {0}")]
    LinkLocalBlocked(IpAddr),

    #[error("cloud metadata address blocked: {0}")]
    MetadataBlocked(IpAddr),

    #[error("scheme '{0}' is not allowed")]
    InvalidScheme(String),

    #[error("could not parse URL '{0}'")]
    InvalidUrl(String),

    #[error("DNS resolution failed for '{host}': {message}")]
    DnsResolutionFailed { host: String, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("response exceeded max size of {limit} bytes")]
    ResponseTooLarge { limit: u64 },

    #[error("exceeded maximum of {0} redirects")]
    TooManyRedirects(u32),

    #[error("upstream returned status {0}")]
    UpstreamStatus(u16),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("no HTTP client registered for UID {0}")]
    UnknownClient(uuid::Uuid),
}
