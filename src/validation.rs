// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Validation primitives shared by the annotation parsers and the converters.
//!
//! Annotation values end up verbatim in the rendered load-balancer configuration,
//! so every free-form string field is checked against a narrow pattern before use.

use crate::errors::StatusError;
use ipnet::IpNet;
use regex::Regex;
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::LazyLock;

/// Empty, `*`, or `http(s)://host[:port]`.
pub static CORS_ORIGIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://[A-Za-z0-9\-\.]*(:[0-9]+)?|\*)?$").expect("valid regex")
});

/// Comma/space separated list of HTTP method names.
pub static CORS_METHODS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+,?\s?)+$").expect("valid regex"));

/// Comma/space separated list of header names.
pub static CORS_HEADERS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9\-_]+,?\s?)+$").expect("valid regex"));

/// Empty, a bare integer, or an integer with a `k`, `m` or `g` suffix.
pub static BODY_SIZE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(|([0-9]+[kmg]?))$").expect("valid regex"));

/// Session affinity cookie hash algorithm.
pub static AFFINITY_COOKIE_HASH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(index|md5|sha1)$").expect("valid regex"));

/// Session affinity cookie strategy.
pub static AFFINITY_COOKIE_STRATEGY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(insert|rewrite|prefix)$").expect("valid regex"));

/// Check a CORS origin value.
#[must_use]
pub fn is_valid_cors_origin(value: &str) -> bool {
    CORS_ORIGIN_REGEX.is_match(value)
}

/// Check a CORS method list.
#[must_use]
pub fn is_valid_cors_methods(value: &str) -> bool {
    CORS_METHODS_REGEX.is_match(value)
}

/// Check a CORS header list (allowed or exposed headers).
#[must_use]
pub fn is_valid_cors_headers(value: &str) -> bool {
    CORS_HEADERS_REGEX.is_match(value)
}

/// Check a proxy body size value. `unlimited` is handled by the caller.
#[must_use]
pub fn is_valid_body_size(value: &str) -> bool {
    BODY_SIZE_REGEX.is_match(value)
}

/// Permissive boolean parse.
///
/// Accepts `1`, `t`, `T`, `TRUE`, `true`, `True` and their false counterparts.
/// Anything else is `None`.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Result of parsing a list of IP and CIDR literals.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedRanges {
    /// Canonical network strings, e.g. `10.0.0.0/24`
    pub networks: BTreeSet<String>,
    /// Canonical address strings, e.g. `192.168.1.1`
    pub addresses: BTreeSet<String>,
    /// Entries that are neither a network nor an address
    pub invalid: Vec<String>,
}

impl ParsedRanges {
    /// Whether at least one entry parsed.
    #[must_use]
    pub fn has_valid(&self) -> bool {
        !self.networks.is_empty() || !self.addresses.is_empty()
    }

    /// All valid entries, sorted and deduplicated.
    #[must_use]
    pub fn into_sorted(self) -> Vec<String> {
        let mut all: Vec<String> = self.networks.into_iter().chain(self.addresses).collect();
        all.sort();
        all.dedup();
        all
    }
}

/// Parse IP networks and addresses.
///
/// Networks are normalised to their network address (`10.0.0.1/24` becomes
/// `10.0.0.0/24`). Blank entries are ignored.
#[must_use]
pub fn parse_ip_nets<'a, I>(specs: I) -> ParsedRanges
where
    I: IntoIterator<Item = &'a str>,
{
    let mut parsed = ParsedRanges::default();

    for spec in specs {
        let spec = spec.trim();
        if spec.is_empty() {
            continue;
        }
        if let Ok(net) = spec.parse::<IpNet>() {
            parsed.networks.insert(net.trunc().to_string());
        } else if let Ok(ip) = spec.parse::<IpAddr>() {
            parsed.addresses.insert(ip.to_string());
        } else {
            parsed.invalid.push(spec.to_string());
        }
    }

    parsed
}

/// Split a `namespace/name` reference.
///
/// # Errors
///
/// Returns [`StatusError::InvalidName`] unless the input has exactly one `/`
/// separating two non-empty parts.
pub fn parse_name_ns(input: &str) -> Result<(String, String), StatusError> {
    match input.split_once('/') {
        Some((ns, name)) if !ns.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((ns.to_string(), name.to_string()))
        }
        _ => Err(StatusError::InvalidName(input.to_string())),
    }
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod validation_tests;
