//! `security` crate — pure SSRF classification.
//!
//! These functions never perform I/O. They classify an already-resolved
//! `IpAddr` (or a literal hostname form, ahead of DNS resolution) against
//! the categories spec.md §4.6 names: localhost, private, link-local,
//! and cloud metadata. Hostname-form checks run *before* resolution so a
//! request to a hostname that is itself a literal metadata address can't
//! slip through DNS rebinding; IP-form checks run on every address a
//! multi-record lookup returns.
//!
//! Grounded on the pack's `dashflow-webscrape` SSRF module
//! (RFC1918/loopback/link-local/metadata classification over
//! `std::net::IpAddr`), generalized into a standalone, policy-driven
//! classifier shared by the HTTP client subsystem.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

/// AWS IMDSv2 link-local metadata address.
pub const METADATA_IPV4: Ipv4Addr = Ipv4Addr::new(169, 254, 169, 254);
/// AWS IMDSv2 IPv6 metadata address.
pub const METADATA_IPV6: &str = "fd00:ec2::254";

const METADATA_HOSTNAMES: &[&str] = &["metadata.google.internal", "metadata.azure.com"];

/// The category an address or hostname was classified into, if blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockReason {
    Localhost,
    PrivateIp,
    LinkLocal,
    CloudMetadata,
}

/// Zero-trust SSRF policy. Every field defaults to the most restrictive
/// setting (block everything not explicitly allowed).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SsrfPolicy {
    pub block_private_ips: bool,
    pub block_localhost: bool,
    pub block_link_local: bool,
    pub block_cloud_metadata: bool,
    /// Non-empty ⇒ allowlist: only these domains (or `*.domain` wildcard
    /// suffixes) may be requested.
    pub allowed_domains: Vec<String>,
    pub blocked_domains: Vec<String>,
    pub allowed_schemes: Vec<String>,
}

impl Default for SsrfPolicy {
    fn default() -> Self {
        Self {
            block_private_ips: true,
            block_localhost: true,
            block_link_local: true,
            block_cloud_metadata: true,
            allowed_domains: Vec::new(),
            blocked_domains: Vec::new(),
            allowed_schemes: vec!["https".to_string()],
        }
    }
}

impl SsrfPolicy {
    /// Classify a hostname literal (no DNS lookup performed). Returns a
    /// `BlockReason` if the policy would reject it outright, without
    /// needing resolution at all.
    pub fn classify_hostname(&self, host: &str) -> Option<BlockReason> {
        let lower = host.to_ascii_lowercase();

        if self.block_cloud_metadata && METADATA_HOSTNAMES.contains(&lower.as_str()) {
            return Some(BlockReason::CloudMetadata);
        }
        // A hostname that is itself a literal IP is classified via `classify_ip`.
        if let Ok(ip) = host.parse::<IpAddr>() {
            return self.classify_ip(&ip);
        }
        None
    }

    /// Classify a resolved IP address against this policy.
    pub fn classify_ip(&self, ip: &IpAddr) -> Option<BlockReason> {
        if self.block_cloud_metadata && is_cloud_metadata(ip) {
            return Some(BlockReason::CloudMetadata);
        }
        if self.block_localhost && is_localhost(ip) {
            return Some(BlockReason::Localhost);
        }
        if self.block_link_local && is_link_local(ip) {
            return Some(BlockReason::LinkLocal);
        }
        if self.block_private_ips && is_private(ip) {
            return Some(BlockReason::PrivateIp);
        }
        None
    }

    /// Check a domain name against `allowed_domains` (allowlist if
    /// non-empty) and `blocked_domains`.
    pub fn domain_allowed(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();

        if self.blocked_domains.iter().any(|d| domain_matches(&host, d)) {
            return false;
        }
        if self.allowed_domains.is_empty() {
            return true;
        }
        self.allowed_domains.iter().any(|d| domain_matches(&host, d))
    }

    /// Check a URL scheme against `allowed_schemes`.
    pub fn scheme_allowed(&self, scheme: &str) -> bool {
        self.allowed_schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme))
    }
}

fn domain_matches(host: &str, pattern: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    if let Some(suffix) = pattern.strip_prefix("*.") {
        host == suffix || host.ends_with(&format!(".{suffix}"))
    } else {
        host == pattern
    }
}

/// *localhost*: loopback, 0.0.0.0/32.
pub fn is_localhost(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || *v4 == Ipv4Addr::UNSPECIFIED,
        IpAddr::V6(v6) => v6.is_loopback() || *v6 == Ipv6Addr::UNSPECIFIED,
    }
}

/// *private*: 10/8, 172.16/12, 192.168/16, IPv6 ULA fc00::/7.
pub fn is_private(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private(),
        IpAddr::V6(v6) => {
            let seg = v6.segments();
            (seg[0] & 0xfe00) == 0xfc00
        }
    }
}

/// *link-local*: 169.254/16, IPv6 fe80::/10.
pub fn is_link_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_link_local(),
        IpAddr::V6(v6) => {
            let seg = v6.segments();
            (seg[0] & 0xffc0) == 0xfe80
        }
    }
}

/// *cloud metadata*: exact 169.254.169.254, IPv6 AWS IMDSv2 `fd00:ec2::254`.
pub fn is_cloud_metadata(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => *v4 == METADATA_IPV4,
        IpAddr::V6(v6) => v6.to_string() == METADATA_IPV6,
    }
}
