// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! TCP services converter.
//!
//! Turns the TCP services table (public port to directive) into [`TcpBackend`]s
//! against the live caches. A directive has the form
//!
//! ```text
//! namespace/service:port[:proxy][:proxy|proxy-v1|proxy-v2][:namespace/secret]
//! ```
//!
//! The third field enables decoding of an incoming proxy protocol header, the
//! fourth encodes an outgoing one and the fifth terminates TLS with the given
//! secret. Every call rebuilds the whole backend set.
//!
//! A bad entry never blocks the others: it is logged and reported as a
//! [`TcpSkip`]. Only a failing cache aborts the pass.

pub mod cache;
pub mod types;

pub use cache::TcpCache;
pub use types::{ProxyProt, ProxyVersion, TcpBackend, TcpEndpoint, TcpSsl};

use crate::constants::{
    TCP_DIRECTIVE_FIELDS, TCP_ENDPOINT_NAME_PREFIX, TCP_PROXY_MARKER, TCP_PROXY_V1_MARKER,
    TCP_PROXY_V2_MARKER,
};
use crate::errors::CacheError;
use crate::metrics;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// A parsed TCP services table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpServiceDirective {
    pub public_port: i32,
    /// `namespace/service`
    pub service: String,
    /// Service port name or number
    pub port: String,
    pub proxy_prot: ProxyProt,
    /// `namespace/secret`, empty without TLS
    pub secret: String,
}

impl TcpServiceDirective {
    /// Parse one table entry.
    ///
    /// # Errors
    ///
    /// Returns [`TcpSkip::InvalidPort`] or [`TcpSkip::EmptyServiceName`].
    pub fn parse(public_port: &str, directive: &str) -> Result<Self, TcpSkip> {
        let port: i32 = public_port
            .parse::<u16>()
            .map(i32::from)
            .map_err(|_| TcpSkip::InvalidPort {
                value: public_port.to_string(),
            })?;

        let fields: Vec<&str> = directive.split(':').take(TCP_DIRECTIVE_FIELDS).collect();
        let field = |i: usize| fields.get(i).copied().unwrap_or_default().trim();

        if field(0).is_empty() {
            return Err(TcpSkip::EmptyServiceName { port });
        }

        let encode_version = match field(3) {
            TCP_PROXY_MARKER | TCP_PROXY_V2_MARKER => Some(ProxyVersion::V2),
            TCP_PROXY_V1_MARKER => Some(ProxyVersion::V1),
            _ => None,
        };

        Ok(Self {
            public_port: port,
            service: field(0).to_string(),
            port: field(1).to_string(),
            proxy_prot: ProxyProt {
                decode: field(2) == TCP_PROXY_MARKER,
                encode_version,
            },
            secret: field(4).to_string(),
        })
    }
}

/// Why a table entry produced no backend.
///
/// The `Display` form is the logged warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TcpSkip {
    InvalidPort { value: String },
    EmptyServiceName { port: i32 },
    ServiceNotFound { port: i32, service: String },
    PortNotFound { port: i32, service: String, service_port: String },
    SecretNotFound { port: i32, secret: String },
}

impl TcpSkip {
    /// Metric label of the skip reason.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            TcpSkip::InvalidPort { .. } => "invalid_port",
            TcpSkip::EmptyServiceName { .. } => "empty_service_name",
            TcpSkip::ServiceNotFound { .. } => "service_not_found",
            TcpSkip::PortNotFound { .. } => "port_not_found",
            TcpSkip::SecretNotFound { .. } => "secret_not_found",
        }
    }
}

impl fmt::Display for TcpSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TcpSkip::InvalidPort { value } => {
                write!(f, "skipping invalid public listening port of TCP service: {value}")
            }
            TcpSkip::EmptyServiceName { port } => {
                write!(f, "skipping empty TCP service name on public port {port}")
            }
            TcpSkip::ServiceNotFound { port, service } => write!(
                f,
                "skipping TCP service on public port {port}: service not found: '{service}'"
            ),
            TcpSkip::PortNotFound {
                port,
                service,
                service_port,
            } => write!(
                f,
                "skipping TCP service on public port {port}: port not found: {service}:{service_port}"
            ),
            TcpSkip::SecretNotFound { port, secret } => write!(
                f,
                "skipping TCP service on public port {port}: secret not found: '{secret}'"
            ),
        }
    }
}

/// Result of one sync pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TcpSyncOutcome {
    /// Backends ordered by name, then public port
    pub backends: Vec<TcpBackend>,
    /// Entries that were skipped, in table order
    pub skipped: Vec<TcpSkip>,
}

/// Converts the TCP services table against a [`TcpCache`].
pub struct TcpServicesConverter<'a> {
    cache: &'a dyn TcpCache,
}

impl<'a> TcpServicesConverter<'a> {
    #[must_use]
    pub fn new(cache: &'a dyn TcpCache) -> Self {
        Self { cache }
    }

    /// Rebuild the backend set from the table.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if any lookup capability fails. Missing services,
    /// ports and secrets are skips, not errors.
    pub fn sync(&self, services: &BTreeMap<String, String>) -> Result<TcpSyncOutcome, CacheError> {
        let mut outcome = TcpSyncOutcome::default();

        for (public_port, directive) in services {
            match self.convert(public_port, directive)? {
                Ok(backend) => outcome.backends.push(backend),
                Err(skip) => {
                    warn!("{skip}");
                    metrics::record_tcp_skip(skip.reason());
                    outcome.skipped.push(skip);
                }
            }
        }

        outcome
            .backends
            .sort_by(|a, b| a.name.cmp(&b.name).then(a.port.cmp(&b.port)));
        metrics::record_tcp_backends(outcome.backends.len());
        debug!(
            backends = outcome.backends.len(),
            skipped = outcome.skipped.len(),
            "TCP services synchronised"
        );

        Ok(outcome)
    }

    fn convert(
        &self,
        public_port: &str,
        directive: &str,
    ) -> Result<Result<TcpBackend, TcpSkip>, CacheError> {
        let parsed = match TcpServiceDirective::parse(public_port, directive) {
            Ok(parsed) => parsed,
            Err(skip) => return Ok(Err(skip)),
        };
        let port = parsed.public_port;

        let service = match parsed.service.split_once('/') {
            Some((namespace, name)) => self.cache.get_service(namespace, name)?,
            None => None,
        };
        let Some(service) = service else {
            return Ok(Err(TcpSkip::ServiceNotFound {
                port,
                service: parsed.service,
            }));
        };

        let Some(service_port) = cache::find_service_port(&service, &parsed.port) else {
            return Ok(Err(TcpSkip::PortNotFound {
                port,
                service: parsed.service,
                service_port: parsed.port,
            }));
        };

        let mut ssl = TcpSsl::default();
        if !parsed.secret.is_empty() {
            match self.cache.get_tls_secret_path(&parsed.secret)? {
                Some(filename) => ssl.filename = filename,
                None => {
                    return Ok(Err(TcpSkip::SecretNotFound {
                        port,
                        secret: parsed.secret,
                    }))
                }
            }
        }

        let addresses = match self.cache.get_endpoints(&service)? {
            Some(endpoints) => cache::endpoint_addresses(&endpoints, service_port),
            None => Vec::new(),
        };
        let endpoints = addresses
            .into_iter()
            .enumerate()
            .map(|(i, address)| TcpEndpoint {
                name: format!("{TCP_ENDPOINT_NAME_PREFIX}{:03}", i + 1),
                ip: address.ip,
                port: address.port,
                target: address.target,
            })
            .collect();

        Ok(Ok(TcpBackend {
            name: TcpBackend::name_for(&parsed.service),
            port,
            endpoints,
            proxy_prot: parsed.proxy_prot,
            ssl,
        }))
    }
}
