// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Source IP allow-list.
//!
//! The annotation is a comma separated list of addresses and networks. Entries
//! that fail to parse are dropped with a warning; if none parse, the request path
//! is denied and the cluster-wide list is substituted.

use super::parser::{get_string, ingress_key};
use super::ConfigEqual;
use crate::constants::ANN_WHITELIST_SOURCE_RANGE;
use crate::defaults::DefaultBackendResolver;
use crate::errors::AnnotationError;
use crate::validation::parse_ip_nets;
use k8s_openapi::api::networking::v1::Ingress;
use serde::Serialize;
use tracing::warn;

/// Allowed client networks, sorted.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRange {
    pub cidr: Vec<String>,
}

impl ConfigEqual for SourceRange {
    /// Set equality: order is irrelevant.
    fn config_eq(&self, other: &Self) -> bool {
        self.cidr.len() == other.cidr.len() && self.cidr.iter().all(|c| other.cidr.contains(c))
    }
}

/// Resolve the allow-list.
///
/// # Errors
///
/// Returns [`AnnotationError::LocationDenied`] carrying the default backend list
/// when the annotation is present but contains no valid entry.
pub fn parse(
    ing: &Ingress,
    resolver: &dyn DefaultBackendResolver,
) -> Result<SourceRange, AnnotationError> {
    let mut fallback = resolver.default_backend().whitelist_source_range;
    fallback.sort();

    let Ok(value) = get_string(ANN_WHITELIST_SOURCE_RANGE, ing) else {
        return Ok(SourceRange { cidr: fallback });
    };

    let parsed = parse_ip_nets(value.split(','));
    if !parsed.has_valid() {
        return Err(AnnotationError::LocationDenied {
            reason: format!(
                "the annotation does not contain a valid IP address or network: {value}"
            ),
            fallback: SourceRange { cidr: fallback },
        });
    }
    if !parsed.invalid.is_empty() {
        warn!(
            ingress = %ingress_key(ing),
            invalid = ?parsed.invalid,
            "error parsing whitelist-source-range, ignoring invalid entries"
        );
    }

    Ok(SourceRange {
        cidr: parsed.into_sorted(),
    })
}

#[cfg(test)]
#[path = "ipwhitelist_tests.rs"]
mod ipwhitelist_tests;
