// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Whether redirects keep the listening port.
//!
//! Unset and `false` mean different things here: unset inherits the default
//! backend, `false` turns the feature off regardless of it. A value that is not
//! a boolean counts as unset.

use super::parser::{get_bool, ingress_key};
use crate::constants::ANN_USE_PORT_IN_REDIRECTS;
use crate::defaults::DefaultBackendResolver;
use crate::errors::AnnotationError;
use k8s_openapi::api::networking::v1::Ingress;
use tracing::warn;

/// # Errors
///
/// Never fails; every invalid or missing value resolves to the default backend.
pub fn parse(ing: &Ingress, resolver: &dyn DefaultBackendResolver) -> Result<bool, AnnotationError> {
    match get_bool(ANN_USE_PORT_IN_REDIRECTS, ing) {
        Ok(value) => Ok(value),
        Err(e) => {
            if !e.is_missing_annotation() {
                warn!(ingress = %ingress_key(ing), error = %e, "using default backend value");
            }
            Ok(resolver.default_backend().use_port_in_redirects)
        }
    }
}

#[cfg(test)]
#[path = "portinredirect_tests.rs"]
mod portinredirect_tests;
