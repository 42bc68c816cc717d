// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context with reflector stores.
//!
//! The binary runs one reflector per watched kind and hands the read sides to
//! [`Stores`]. The stores back every read-only capability the library defines:
//! [`TcpCache`] for the TCP services converter, [`IngressLister`] for the status
//! reconciler and [`AuthCertificateResolver`] for the annotation parsers.
//!
//! Lookups are served from memory. Until the binary marks the stores synced,
//! cache capabilities fail with [`CacheError`] so that no pass runs against a
//! half-populated cache.

use crate::annotations::secureupstream::{AuthCertificate, AuthCertificateResolver};
use crate::errors::CacheError;
use crate::status::IngressLister;
use crate::tcp_services::TcpCache;
use k8s_openapi::api::core::v1::{ConfigMap, Endpoints, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::reflector::Store;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Key of the CA bundle inside a secret referenced for upstream verification.
const CA_CERT_KEY: &str = "ca.crt";

/// Collection of reflector stores.
///
/// Each store is populated by a dedicated reflector task.
#[derive(Clone)]
pub struct Stores {
    pub ingresses: Store<Ingress>,
    pub services: Store<Service>,
    pub endpoints: Store<Endpoints>,
    pub secrets: Store<Secret>,
    pub config_maps: Store<ConfigMap>,

    /// Directory where certificates extracted from secrets are written
    pub ssl_dir: String,

    synced: Arc<AtomicBool>,
}

impl Stores {
    #[must_use]
    pub fn new(
        ingresses: Store<Ingress>,
        services: Store<Service>,
        endpoints: Store<Endpoints>,
        secrets: Store<Secret>,
        config_maps: Store<ConfigMap>,
        ssl_dir: impl Into<String>,
    ) -> Self {
        Self {
            ingresses,
            services,
            endpoints,
            secrets,
            config_maps,
            ssl_dir: ssl_dir.into(),
            synced: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark every store as having completed its initial list.
    pub fn mark_synced(&self) {
        self.synced.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    fn ensure_synced(&self, kind: &'static str) -> Result<(), CacheError> {
        if self.is_synced() {
            Ok(())
        } else {
            Err(CacheError {
                kind,
                reason: "cache not synced yet".to_string(),
            })
        }
    }

    /// Get a `Service` by name and namespace from the store.
    #[must_use]
    pub fn find_service(&self, name: &str, namespace: &str) -> Option<Arc<Service>> {
        self.services
            .state()
            .iter()
            .find(|svc| svc.name_any() == name && svc.namespace().as_deref() == Some(namespace))
            .cloned()
    }

    /// Get a `Secret` by name and namespace from the store.
    #[must_use]
    pub fn find_secret(&self, name: &str, namespace: &str) -> Option<Arc<Secret>> {
        self.secrets
            .state()
            .iter()
            .find(|s| s.name_any() == name && s.namespace().as_deref() == Some(namespace))
            .cloned()
    }

    /// Data of a `ConfigMap` referenced as `namespace/name`.
    ///
    /// `None` when the reference is malformed or the `ConfigMap` does not exist.
    #[must_use]
    pub fn config_map_data(&self, reference: &str) -> Option<BTreeMap<String, String>> {
        let (namespace, name) = reference.split_once('/')?;

        self.config_maps
            .state()
            .iter()
            .find(|cm| cm.name_any() == name && cm.namespace().as_deref() == Some(namespace))
            .map(|cm| cm.data.clone().unwrap_or_default())
    }

    /// File holding the certificate of a `namespace/name` TLS secret.
    #[must_use]
    pub fn tls_secret_path(&self, namespace: &str, name: &str) -> String {
        format!("{}/{namespace}_{name}.pem", self.ssl_dir)
    }

    /// File holding the CA bundle of a `namespace/name` secret.
    #[must_use]
    pub fn ca_secret_path(&self, namespace: &str, name: &str) -> String {
        format!("{}/ca/{namespace}_{name}.pem", self.ssl_dir)
    }
}

impl TcpCache for Stores {
    fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Arc<Service>>, CacheError> {
        self.ensure_synced("service")?;
        Ok(self.find_service(name, namespace))
    }

    fn get_endpoints(&self, service: &Service) -> Result<Option<Arc<Endpoints>>, CacheError> {
        self.ensure_synced("endpoints")?;
        let name = service.name_any();
        let namespace = service.namespace();

        Ok(self
            .endpoints
            .state()
            .iter()
            .find(|ep| ep.name_any() == name && ep.namespace() == namespace)
            .cloned())
    }

    fn get_tls_secret_path(&self, secret: &str) -> Result<Option<String>, CacheError> {
        self.ensure_synced("secret")?;
        let Some((namespace, name)) = secret.split_once('/') else {
            return Ok(None);
        };

        Ok(self
            .find_secret(name, namespace)
            .map(|_| self.tls_secret_path(namespace, name)))
    }
}

impl IngressLister for Stores {
    fn list_ingresses(&self) -> Vec<Arc<Ingress>> {
        self.ingresses.state()
    }
}

impl AuthCertificateResolver for Stores {
    fn auth_certificate(&self, secret: &str) -> Option<AuthCertificate> {
        let (namespace, name) = secret.split_once('/')?;
        let found = self.find_secret(name, namespace)?;

        let has_ca = found
            .data
            .as_ref()
            .is_some_and(|data| data.contains_key(CA_CERT_KEY));
        if !has_ca {
            return None;
        }

        Some(AuthCertificate {
            secret: secret.to_string(),
            ca_file_name: self.ca_secret_path(namespace, name),
        })
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
