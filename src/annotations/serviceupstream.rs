// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Route to the service cluster IP instead of individual endpoints.

use super::parser::{get_bool, ingress_key};
use crate::constants::ANN_SERVICE_UPSTREAM;
use crate::errors::AnnotationError;
use k8s_openapi::api::networking::v1::Ingress;
use tracing::warn;

/// # Errors
///
/// Returns [`AnnotationError::MissingAnnotations`] when unset or not a
/// boolean (callers treat it as `false`).
pub fn parse(ing: &Ingress) -> Result<bool, AnnotationError> {
    get_bool(ANN_SERVICE_UPSTREAM, ing).map_err(|e| {
        if !e.is_missing_annotation() {
            warn!(ingress = %ingress_key(ing), error = %e, "ignoring service upstream annotation");
        }
        AnnotationError::MissingAnnotations
    })
}
