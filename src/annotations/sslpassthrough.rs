// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! TLS passthrough to the upstream with an optional plain HTTP port.

use super::parser::{get_bool, get_int, ingress_key};
use super::ConfigEqual;
use crate::constants::{ANN_SSL_PASSTHROUGH, ANN_SSL_PASSTHROUGH_HTTP_PORT};
use crate::errors::AnnotationError;
use k8s_openapi::api::networking::v1::Ingress;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SslPassthrough {
    pub has_ssl_passthrough: bool,
    /// Plain HTTP port served next to the passthrough, 0 when unset
    pub http_port: i32,
}

impl ConfigEqual for SslPassthrough {
    fn config_eq(&self, other: &Self) -> bool {
        self == other
    }
}

/// # Errors
///
/// Returns [`AnnotationError::MissingAnnotations`] when the passthrough
/// annotation is unset or not a boolean.
pub fn parse(ing: &Ingress) -> Result<SslPassthrough, AnnotationError> {
    let has_ssl_passthrough = get_bool(ANN_SSL_PASSTHROUGH, ing).map_err(|e| {
        if !e.is_missing_annotation() {
            warn!(ingress = %ingress_key(ing), error = %e, "ignoring ssl passthrough annotation");
        }
        AnnotationError::MissingAnnotations
    })?;

    Ok(SslPassthrough {
        has_ssl_passthrough,
        http_port: get_int(ANN_SSL_PASSTHROUGH_HTTP_PORT, ing).unwrap_or(0),
    })
}
