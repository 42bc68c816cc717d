// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster-wide fallback configuration.
//!
//! The default backend holds the values every annotation parser falls back to
//! when an Ingress does not set (or sets an invalid) annotation. It is sourced
//! from a designated `ConfigMap` whose keys use the kebab-case field names,
//! e.g. `proxy-connect-timeout: "10"`.

use crate::constants::{
    DEFAULT_HEALTH_CHECK_INTERVAL, DEFAULT_PROXY_BODY_SIZE, DEFAULT_PROXY_BUFFER_SIZE,
    DEFAULT_PROXY_CONNECT_TIMEOUT_SECS, DEFAULT_PROXY_COOKIE_DOMAIN, DEFAULT_PROXY_COOKIE_PATH,
    DEFAULT_PROXY_NEXT_UPSTREAM, DEFAULT_PROXY_READ_TIMEOUT_SECS, DEFAULT_PROXY_REQUEST_BUFFERING,
    DEFAULT_PROXY_SEND_TIMEOUT_SECS,
};
use crate::validation::parse_bool;
use serde::de::value::{Error as ValueError, MapDeserializer};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::warn;

/// Cluster-wide fallback values consumed by the annotation parsers.
///
/// `ConfigMap` values are strings. Numeric and boolean fields that fail to
/// parse keep their built-in default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DefaultBackend {
    pub proxy_body_size: String,
    #[serde(deserialize_with = "lenient_int::<_, DEFAULT_PROXY_CONNECT_TIMEOUT_SECS>")]
    pub proxy_connect_timeout: i32,
    #[serde(deserialize_with = "lenient_int::<_, DEFAULT_PROXY_SEND_TIMEOUT_SECS>")]
    pub proxy_send_timeout: i32,
    #[serde(deserialize_with = "lenient_int::<_, DEFAULT_PROXY_READ_TIMEOUT_SECS>")]
    pub proxy_read_timeout: i32,
    pub proxy_buffer_size: String,
    pub proxy_cookie_path: String,
    pub proxy_cookie_domain: String,
    pub proxy_next_upstream: String,
    pub proxy_pass_params: String,
    pub proxy_request_buffering: String,

    /// Redirect HTTP to HTTPS when the Ingress carries a TLS section
    #[serde(deserialize_with = "lenient_bool::<_, true>")]
    pub ssl_redirect: bool,

    /// Keep the listening port in redirects
    #[serde(deserialize_with = "lenient_bool::<_, false>")]
    pub use_port_in_redirects: bool,

    /// CIDRs allowed when an Ingress has no (valid) whitelist annotation
    #[serde(deserialize_with = "comma_list")]
    pub whitelist_source_range: Vec<String>,

    pub health_check_uri: String,
    pub health_check_addr: String,
    pub health_check_port: String,
    pub health_check_interval: String,
    pub health_check_rise_count: String,
    pub health_check_fall_count: String,
}

impl Default for DefaultBackend {
    fn default() -> Self {
        Self {
            proxy_body_size: DEFAULT_PROXY_BODY_SIZE.to_string(),
            proxy_connect_timeout: DEFAULT_PROXY_CONNECT_TIMEOUT_SECS,
            proxy_send_timeout: DEFAULT_PROXY_SEND_TIMEOUT_SECS,
            proxy_read_timeout: DEFAULT_PROXY_READ_TIMEOUT_SECS,
            proxy_buffer_size: DEFAULT_PROXY_BUFFER_SIZE.to_string(),
            proxy_cookie_path: DEFAULT_PROXY_COOKIE_PATH.to_string(),
            proxy_cookie_domain: DEFAULT_PROXY_COOKIE_DOMAIN.to_string(),
            proxy_next_upstream: DEFAULT_PROXY_NEXT_UPSTREAM.to_string(),
            proxy_pass_params: String::new(),
            proxy_request_buffering: DEFAULT_PROXY_REQUEST_BUFFERING.to_string(),
            ssl_redirect: true,
            use_port_in_redirects: false,
            whitelist_source_range: Vec::new(),
            health_check_uri: String::new(),
            health_check_addr: String::new(),
            health_check_port: String::new(),
            health_check_interval: DEFAULT_HEALTH_CHECK_INTERVAL.to_string(),
            health_check_rise_count: String::new(),
            health_check_fall_count: String::new(),
        }
    }
}

impl DefaultBackend {
    /// Build the default backend from `ConfigMap` data.
    ///
    /// Values are trimmed and unknown keys are ignored.
    #[must_use]
    pub fn from_config_map_data(data: &BTreeMap<String, String>) -> Self {
        let pairs = data.iter().map(|(k, v)| (k.as_str(), v.trim()));

        match Self::deserialize(MapDeserializer::<_, ValueError>::new(pairs)) {
            Ok(backend) => backend,
            Err(e) => {
                warn!(error = %e, "invalid default backend configuration, using built-in defaults");
                Self::default()
            }
        }
    }
}

fn lenient_int<'de, D, const DEFAULT: i32>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().parse().unwrap_or_else(|e| {
        warn!(value = %raw, error = %e, "ignoring invalid default backend value");
        DEFAULT
    }))
}

fn lenient_bool<'de, D, const DEFAULT: bool>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(parse_bool(raw.trim()).unwrap_or_else(|| {
        warn!(value = %raw, "ignoring invalid default backend value");
        DEFAULT
    }))
}

fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect())
}

/// Capability returning the current default backend configuration.
pub trait DefaultBackendResolver: Send + Sync {
    /// Snapshot of the default backend for one resolution pass.
    fn default_backend(&self) -> DefaultBackend;
}

impl DefaultBackendResolver for DefaultBackend {
    fn default_backend(&self) -> DefaultBackend {
        self.clone()
    }
}

/// Default backend that can be swapped while resolvers hold a reference.
///
/// The binary replaces the value whenever the default backend `ConfigMap`
/// changes; parsers always read the latest snapshot.
#[derive(Debug, Default, Clone)]
pub struct SharedDefaultBackend {
    inner: Arc<RwLock<DefaultBackend>>,
}

impl SharedDefaultBackend {
    #[must_use]
    pub fn new(backend: DefaultBackend) -> Self {
        Self {
            inner: Arc::new(RwLock::new(backend)),
        }
    }

    /// Replace the current snapshot.
    pub fn replace(&self, backend: DefaultBackend) {
        match self.inner.write() {
            Ok(mut guard) => *guard = backend,
            Err(poisoned) => *poisoned.into_inner() = backend,
        }
    }
}

impl DefaultBackendResolver for SharedDefaultBackend {
    fn default_backend(&self) -> DefaultBackend {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
#[path = "defaults_tests.rs"]
mod defaults_tests;
