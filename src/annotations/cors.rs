// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cross-origin resource sharing policy.
//!
//! Every header value is checked against a narrow pattern so an annotation
//! cannot make the proxy echo internal variables back to the client. Invalid
//! values fall back to the built-in defaults.

use super::parser::{get_bool, get_int, get_string, ingress_key};
use super::ConfigEqual;
use crate::constants::{
    ANN_CORS_ALLOW_CREDENTIALS, ANN_CORS_ALLOW_HEADERS, ANN_CORS_ALLOW_METHODS,
    ANN_CORS_ALLOW_ORIGIN, ANN_CORS_ENABLE, ANN_CORS_ENABLE_DEPRECATED, ANN_CORS_EXPOSE_HEADERS,
    ANN_CORS_MAX_AGE, DEFAULT_CORS_HEADERS, DEFAULT_CORS_MAX_AGE_SECS, DEFAULT_CORS_METHODS,
    DEFAULT_CORS_ORIGIN,
};
use crate::validation::{is_valid_cors_headers, is_valid_cors_methods, is_valid_cors_origin};
use k8s_openapi::api::networking::v1::Ingress;
use serde::Serialize;
use tracing::warn;

/// Resolved CORS policy of an Ingress.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsConfig {
    pub cors_enabled: bool,
    pub cors_allow_origin: String,
    pub cors_allow_methods: String,
    pub cors_allow_headers: String,
    pub cors_allow_credentials: bool,
    pub cors_expose_headers: String,
    pub cors_max_age: i32,
}

impl ConfigEqual for CorsConfig {
    fn config_eq(&self, other: &Self) -> bool {
        self == other
    }
}

/// Resolve the CORS policy.
///
/// A disabled policy carries no other field; enabling it fills every field,
/// substituting the built-in default for absent or invalid values.
#[must_use]
pub fn parse(ing: &Ingress) -> CorsConfig {
    let enabled = get_bool(ANN_CORS_ENABLE, ing)
        .or_else(|_| get_bool(ANN_CORS_ENABLE_DEPRECATED, ing))
        .unwrap_or(false);

    if !enabled {
        return CorsConfig::default();
    }

    let allow_origin = validated(ing, ANN_CORS_ALLOW_ORIGIN, DEFAULT_CORS_ORIGIN, is_valid_cors_origin);
    let allow_headers = validated(ing, ANN_CORS_ALLOW_HEADERS, DEFAULT_CORS_HEADERS, is_valid_cors_headers);
    let allow_methods = validated(ing, ANN_CORS_ALLOW_METHODS, DEFAULT_CORS_METHODS, is_valid_cors_methods);
    let expose_headers = validated(ing, ANN_CORS_EXPOSE_HEADERS, "", is_valid_cors_headers);

    CorsConfig {
        cors_enabled: true,
        cors_allow_origin: allow_origin,
        cors_allow_methods: allow_methods,
        cors_allow_headers: allow_headers,
        cors_allow_credentials: get_bool(ANN_CORS_ALLOW_CREDENTIALS, ing).unwrap_or(true),
        cors_expose_headers: expose_headers,
        cors_max_age: get_int(ANN_CORS_MAX_AGE, ing).unwrap_or(DEFAULT_CORS_MAX_AGE_SECS),
    }
}

fn validated(ing: &Ingress, name: &str, default: &str, is_valid: fn(&str) -> bool) -> String {
    match get_string(name, ing) {
        Ok(value) if value.is_empty() => default.to_string(),
        Ok(value) if is_valid(&value) => value,
        Ok(value) => {
            warn!(
                ingress = %ingress_key(ing),
                annotation = name,
                value = %value,
                "ignoring invalid CORS annotation value, using default"
            );
            default.to_string()
        }
        Err(_) => default.to_string(),
    }
}

#[cfg(test)]
#[path = "cors_tests.rs"]
mod cors_tests;
