//! `http_client` crate — the SSRF-safe HTTP client subsystem (spec.md §4.5).

mod client;
mod error;
mod registry;
pub mod transport;

pub use client::{AuthMode, HttpClient, HttpClientConfig, HttpResponse};
pub use error::HttpClientError;
pub use registry::HttpClientRegistry;
pub use transport::{MockTransport, PreparedRequest, RawResponse, ReqwestTransport, Transport};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config_blocking_localhost() -> HttpClientConfig {
        let mut cfg = HttpClientConfig::default();
        cfg.policy.block_localhost = true;
        cfg.policy.allowed_schemes = vec!["http".into(), "https".into()];
        cfg
    }

    #[tokio::test]
    async fn localhost_request_is_blocked_before_network() {
        let client = HttpClient::new(config_blocking_localhost());
        let transport = MockTransport::new();

        let result = client
            .request(&transport, "GET", "http://localhost:8080/", None, 10, 10 * 1024 * 1024)
            .await;

        assert!(matches!(result, Err(HttpClientError::LocalhostBlocked(_))));
        assert_eq!(transport.call_count(), 0, "no network call should have been issued");
    }

    #[tokio::test]
    async fn allowed_request_reaches_transport() {
        let mut cfg = HttpClientConfig::default();
        cfg.policy.block_localhost = false;
        cfg.policy.block_private_ips = false;
        cfg.policy.allowed_schemes = vec!["http".into()];
        let client = HttpClient::new(cfg);
        let transport = MockTransport::new();
        transport.queue_response(RawResponse {
            status: 200,
            headers: vec![],
            body: b"ok".to_vec(),
        });

        let result = client
            .request(&transport, "GET", "http://127.0.0.1:9/", None, 10, 1024)
            .await
            .unwrap();

        assert_eq!(result.status, 200);
        assert_eq!(result.body, b"ok");
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn response_over_cap_is_rejected() {
        let mut cfg = HttpClientConfig::default();
        cfg.policy.block_localhost = false;
        cfg.policy.allowed_schemes = vec!["http".into()];
        let client = HttpClient::new(cfg);
        let transport = MockTransport::new();
        transport.queue_response(RawResponse {
            status: 200,
            headers: vec![],
            body: vec![0u8; 100],
        });

        let result = client
            .request(&transport, "GET", "http://127.0.0.1/", None, 10, 10)
            .await;

        assert!(matches!(result, Err(HttpClientError::ResponseTooLarge { limit: 10 })));
    }

    #[tokio::test]
    async fn redirect_is_followed_and_revalidated() {
        let mut cfg = HttpClientConfig::default();
        cfg.policy.block_localhost = false;
        cfg.policy.allowed_schemes = vec!["http".into()];
        let client = HttpClient::new(cfg);
        let transport = MockTransport::new();
        transport.queue_response(RawResponse {
            status: 302,
            headers: vec![("location".to_string(), "http://127.0.0.1/next".to_string())],
            body: vec![],
        });
        transport.queue_response(RawResponse { status: 200, headers: vec![], body: b"done".to_vec() });

        let result = client
            .request(&transport, "GET", "http://127.0.0.1/", None, 5, 1024)
            .await
            .unwrap();

        assert_eq!(result.status, 200);
        assert_eq!(result.redirects_followed, 1);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn redirect_to_localhost_is_blocked() {
        let mut cfg = HttpClientConfig::default();
        cfg.policy.block_localhost = false;
        cfg.policy.allowed_schemes = vec!["http".into()];
        let client = HttpClient::new(cfg);
        let transport = MockTransport::new();
        transport.queue_response(RawResponse {
            status: 302,
            headers: vec![("location".to_string(), "http://169.254.169.254/".to_string())],
            body: vec![],
        });

        let result = client
            .request(&transport, "GET", "http://127.0.0.1/", None, 5, 1024)
            .await;

        assert!(matches!(result, Err(HttpClientError::MetadataBlocked(_))));
        assert_eq!(transport.call_count(), 1, "the redirect target must never be fetched");
    }

    #[tokio::test]
    async fn disallowed_scheme_rejected() {
        let client = HttpClient::new(HttpClientConfig::default());
        let transport = MockTransport::new();
        let result = client.request(&transport, "GET", "ftp://example.com/", None, 5, 1024).await;
        assert!(matches!(result, Err(HttpClientError::InvalidScheme(_))));
    }

    #[test]
    fn timeout_is_clamped_to_60s() {
        let mut cfg = HttpClientConfig::default();
        cfg.timeout = Duration::from_secs(120);
        assert_eq!(cfg.clamped_timeout(), Duration::from_secs(60));
    }
}
