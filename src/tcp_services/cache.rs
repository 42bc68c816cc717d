// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Lookup capabilities used by the TCP services converter and the rules it
//! applies to the objects they return.

use crate::errors::CacheError;
use k8s_openapi::api::core::v1::{Endpoints, Service, ServicePort};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::sync::Arc;

/// Read access to the service, endpoint and secret caches.
///
/// `Ok(None)` means the object does not exist; `Err` means the cache itself
/// failed and the whole sync pass must be aborted.
pub trait TcpCache: Send + Sync {
    /// Look up a service by namespace and name.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the service cache is unavailable.
    fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Arc<Service>>, CacheError>;

    /// Look up the endpoints of a service.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the endpoints cache is unavailable.
    fn get_endpoints(&self, service: &Service) -> Result<Option<Arc<Endpoints>>, CacheError>;

    /// Resolve a `namespace/name` TLS secret to the certificate file path.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the secret cache is unavailable.
    fn get_tls_secret_path(&self, secret: &str) -> Result<Option<String>, CacheError>;
}

/// One upstream address resolved from an `Endpoints` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointAddress {
    pub ip: String,
    pub port: i32,
    /// `namespace/pod` of the target, empty when the address has no target
    pub target: String,
}

/// Find a service port by the directive's port reference.
///
/// The reference is matched against the port name and the target port text
/// first, then against the numeric service port.
#[must_use]
pub fn find_service_port<'a>(service: &'a Service, port: &str) -> Option<&'a ServicePort> {
    let ports = service.spec.as_ref()?.ports.as_ref()?;

    ports
        .iter()
        .find(|p| {
            p.name.as_deref() == Some(port)
                || p.target_port.as_ref().is_some_and(|t| match t {
                    IntOrString::Int(n) => n.to_string() == port,
                    IntOrString::String(s) => s == port,
                })
        })
        .or_else(|| {
            let number: i32 = port.parse().ok()?;
            ports.iter().find(|p| p.port == number)
        })
}

/// Addresses of `endpoints` serving `service_port`, in cache order.
///
/// A subset port matches when its name equals the service port name (both may
/// be unset). Not-ready addresses are excluded.
#[must_use]
pub fn endpoint_addresses(endpoints: &Endpoints, service_port: &ServicePort) -> Vec<EndpointAddress> {
    let wanted = service_port.name.as_deref().unwrap_or_default();
    let mut addresses = Vec::new();

    for subset in endpoints.subsets.iter().flatten() {
        let Some(port) = subset
            .ports
            .iter()
            .flatten()
            .find(|p| p.name.as_deref().unwrap_or_default() == wanted)
        else {
            continue;
        };

        for address in subset.addresses.iter().flatten() {
            let target = address
                .target_ref
                .as_ref()
                .map(|r| {
                    format!(
                        "{}/{}",
                        r.namespace.as_deref().unwrap_or_default(),
                        r.name.as_deref().unwrap_or_default()
                    )
                })
                .unwrap_or_default();
            addresses.push(EndpointAddress {
                ip: address.ip.clone(),
                port: port.port,
                target,
            });
        }
    }

    addresses
}
