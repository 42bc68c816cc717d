// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Backend model synthesised from the TCP services table.

use serde::Serialize;
use std::fmt;

/// Version of the proxy protocol header sent to the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProxyVersion {
    /// Text header
    V1,
    /// Binary header
    V2,
}

impl ProxyVersion {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProxyVersion::V1 => "v1",
            ProxyVersion::V2 => "v2",
        }
    }
}

impl fmt::Display for ProxyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proxy protocol framing of a TCP backend.
///
/// Decoding the incoming header and encoding an outgoing one are independent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyProt {
    pub decode: bool,
    pub encode_version: Option<ProxyVersion>,
}

/// TLS termination of a TCP backend.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TcpSsl {
    /// Certificate file path, empty when the backend is plain TCP
    pub filename: String,
}

/// One resolved upstream of a TCP backend.
#[derive(Debug, Clone, Serialize)]
pub struct TcpEndpoint {
    /// `srv001`, `srv002`, ... in discovery order
    pub name: String,
    pub ip: String,
    pub port: i32,
    /// Opaque reference for the renderer (`namespace/pod`), ignored by equality
    pub target: String,
}

impl PartialEq for TcpEndpoint {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.ip == other.ip && self.port == other.port
    }
}

impl Eq for TcpEndpoint {}

/// A public TCP listener and its upstreams.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpBackend {
    /// `namespace_service`
    pub name: String,
    /// Public listening port
    pub port: i32,
    pub endpoints: Vec<TcpEndpoint>,
    pub proxy_prot: ProxyProt,
    pub ssl: TcpSsl,
}

impl TcpBackend {
    /// Backend name for a `namespace/service` reference.
    #[must_use]
    pub fn name_for(service: &str) -> String {
        service.replace('/', "_")
    }
}
