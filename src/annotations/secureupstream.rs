// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! TLS towards the upstream servers, optionally verified against a CA secret.
//!
//! Unlike most features a missing secret is a hard error: silently talking
//! TLS without the requested verification would weaken the configuration.

use super::parser::{get_bool, get_string};
use super::ConfigEqual;
use crate::constants::{ANN_SECURE_BACKENDS, ANN_SECURE_VERIFY_CA_SECRET};
use crate::errors::AnnotationError;
use k8s_openapi::api::networking::v1::Ingress;
use serde::Serialize;

/// A CA bundle extracted from a secret and written to disk.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCertificate {
    /// `namespace/name` of the source secret
    pub secret: String,
    /// Path of the PEM file holding the CA bundle
    pub ca_file_name: String,
}

/// Capability resolving secret references used by annotations.
pub trait AuthCertificateResolver: Send + Sync {
    /// Qualify `name` with `namespace`. An empty name stays empty.
    fn full_resource_name(&self, name: &str, namespace: &str) -> String {
        if name.is_empty() {
            String::new()
        } else {
            format!("{namespace}/{name}")
        }
    }

    /// Look up a CA certificate by its `namespace/name` secret reference.
    fn auth_certificate(&self, secret: &str) -> Option<AuthCertificate>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureUpstream {
    pub secure: bool,
    pub ca_cert: AuthCertificate,
}

impl ConfigEqual for SecureUpstream {
    fn config_eq(&self, other: &Self) -> bool {
        self == other
    }
}

/// Resolve upstream TLS settings.
///
/// # Errors
///
/// - [`AnnotationError::Configuration`] when a CA secret is set on a non secure backend
/// - [`AnnotationError::SecretNotFound`] when the CA secret cannot be resolved
pub fn parse(
    ing: &Ingress,
    resolver: &dyn AuthCertificateResolver,
) -> Result<SecureUpstream, AnnotationError> {
    let secure = get_bool(ANN_SECURE_BACKENDS, ing).unwrap_or(false);
    let ca = get_string(ANN_SECURE_VERIFY_CA_SECRET, ing).unwrap_or_default();
    let namespace = ing.metadata.namespace.as_deref().unwrap_or_default();

    if ca.is_empty() {
        return Ok(SecureUpstream {
            secure,
            ca_cert: AuthCertificate::default(),
        });
    }

    let secret = resolver.full_resource_name(&ca, namespace);
    if !secure {
        return Err(AnnotationError::Configuration(format!(
            "trying to use CA from secret {secret} on a non secure backend"
        )));
    }

    let ca_cert = resolver
        .auth_certificate(&secret)
        .ok_or(AnnotationError::SecretNotFound { name: secret })?;

    Ok(SecureUpstream { secure, ca_cert })
}

#[cfg(test)]
#[path = "secureupstream_tests.rs"]
mod secureupstream_tests;
