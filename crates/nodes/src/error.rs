//! Node-level error type.
//!
//! Every built-in executor fails with a stable [`NodeErrorKind`] rather than
//! a bare string, so the engine (and `try_catch`) can branch on what went
//! wrong instead of pattern-matching messages.

use thiserror::Error;

/// Stable taxonomy of node failures. Mirrors the executor-specific and
/// security error families; resource/structural failures are raised by the
/// engine itself and never constructed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeErrorKind {
    InvalidPayload,
    DivisionByZero,
    InsufficientInputs,
    InvalidOperation,
    VariableNotFound,
    CacheMiss,
    UrlBlocked,
    HostBlocked,
    PrivateIpBlocked,
    LocalhostBlocked,
    LinkLocalBlocked,
    MetadataBlocked,
    InvalidScheme,
    Timeout,
    ResponseTooLarge,
    NetworkError,
    UpstreamStatus,
    UnknownNodeKind,
    ExpressionError,
    IterationLimitExceeded,
}

impl std::fmt::Display for NodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InvalidPayload => "invalid_payload",
            Self::DivisionByZero => "division_by_zero",
            Self::InsufficientInputs => "insufficient_inputs",
            Self::InvalidOperation => "invalid_operation",
            Self::VariableNotFound => "variable_not_found",
            Self::CacheMiss => "cache_miss",
            Self::UrlBlocked => "url_blocked",
            Self::HostBlocked => "host_blocked",
            Self::PrivateIpBlocked => "private_ip_blocked",
            Self::LocalhostBlocked => "localhost_blocked",
            Self::LinkLocalBlocked => "link_local_blocked",
            Self::MetadataBlocked => "metadata_blocked",
            Self::InvalidScheme => "invalid_scheme",
            Self::Timeout => "timeout",
            Self::ResponseTooLarge => "response_too_large",
            Self::NetworkError => "network_error",
            Self::UpstreamStatus => "upstream_status",
            Self::UnknownNodeKind => "unknown_node_kind",
            Self::ExpressionError => "expression_error",
            Self::IterationLimitExceeded => "iteration_limit_exceeded",
        };
        f.write_str(s)
    }
}

/// Error returned by a node's `validate`/`execute` method.
#[derive(Debug, Error, Clone)]
#[error("{kind}: {message}")]
pub struct NodeError {
    pub kind: NodeErrorKind,
    pub message: String,
}

impl NodeError {
    pub fn new(kind: NodeErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::new(NodeErrorKind::InvalidPayload, message)
    }

    pub fn unknown_kind(kind: &str) -> Self {
        Self::new(NodeErrorKind::UnknownNodeKind, format!("no executor registered for kind '{kind}'"))
    }
}

impl From<http_client::HttpClientError> for NodeError {
    fn from(err: http_client::HttpClientError) -> Self {
        use http_client::HttpClientError as H;
        let kind = match &err {
            H::UrlBlocked(_) => NodeErrorKind::UrlBlocked,
            H::HostBlocked(_) => NodeErrorKind::HostBlocked,
            H::PrivateIpBlocked(_) => NodeErrorKind::PrivateIpBlocked,
            H::LocalhostBlocked(_) => NodeErrorKind::LocalhostBlocked,
            H::LinkLocalBlocked(_) => NodeErrorKind::LinkLocalBlocked,
            H::MetadataBlocked(_) => NodeErrorKind::MetadataBlocked,
            H::InvalidScheme(_) => NodeErrorKind::InvalidScheme,
            H::Timeout => NodeErrorKind::Timeout,
            H::ResponseTooLarge { .. } => NodeErrorKind::ResponseTooLarge,
            H::UpstreamStatus(_) => NodeErrorKind::UpstreamStatus,
            _ => NodeErrorKind::NetworkError,
        };
        Self::new(kind, err.to_string())
    }
}
