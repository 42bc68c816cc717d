// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ingress class membership.

use crate::constants::ANN_INGRESS_CLASS;
use k8s_openapi::api::networking::v1::Ingress;
use tracing::trace;

/// Class requested by an Ingress.
///
/// The legacy annotation wins over `spec.ingressClassName`. Empty when neither is set.
#[must_use]
pub fn ingress_class(ing: &Ingress) -> &str {
    ing.metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(ANN_INGRESS_CLASS))
        .map(String::as_str)
        .or_else(|| {
            ing.spec
                .as_ref()
                .and_then(|s| s.ingress_class_name.as_deref())
        })
        .unwrap_or_default()
}

/// Whether this controller manages `ing`.
///
/// An Ingress without a class belongs to the controller running the default
/// class (or running without a class). Otherwise the classes must match.
#[must_use]
pub fn is_valid(ing: &Ingress, controller_class: &str, default_class: &str) -> bool {
    let requested = ingress_class(ing);

    if requested.is_empty() {
        trace!(ingress = ?ing.metadata.name, "ingress without class");
        return controller_class.is_empty() || controller_class == default_class;
    }

    requested == controller_class
}
