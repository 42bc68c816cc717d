// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reverse proxy timeouts, buffers and cookie rewriting.

use super::parser::{get_int, get_string, ingress_key};
use super::ConfigEqual;
use crate::constants::{
    ANN_PROXY_BODY_SIZE, ANN_PROXY_BUFFER_SIZE, ANN_PROXY_CONNECT_TIMEOUT,
    ANN_PROXY_COOKIE_DOMAIN, ANN_PROXY_COOKIE_PATH, ANN_PROXY_NEXT_UPSTREAM,
    ANN_PROXY_PASS_PARAMS, ANN_PROXY_READ_TIMEOUT, ANN_PROXY_REQUEST_BUFFERING,
    ANN_PROXY_SEND_TIMEOUT, PROXY_BODY_SIZE_UNLIMITED,
};
use crate::defaults::DefaultBackendResolver;
use crate::validation::is_valid_body_size;
use k8s_openapi::api::networking::v1::Ingress;
use serde::Serialize;
use tracing::warn;

/// Resolved reverse proxy settings of an Ingress.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    /// Maximum request body size; empty means no limit
    pub body_size: String,
    pub connect_timeout: i32,
    pub send_timeout: i32,
    pub read_timeout: i32,
    pub buffer_size: String,
    pub cookie_domain: String,
    pub cookie_path: String,
    pub next_upstream: String,
    pub pass_params: String,
    pub request_buffering: String,
}

impl ConfigEqual for ProxyConfig {
    fn config_eq(&self, other: &Self) -> bool {
        self == other
    }
}

/// Resolve the proxy settings, falling back field by field to the default backend.
#[must_use]
pub fn parse(ing: &Ingress, resolver: &dyn DefaultBackendResolver) -> ProxyConfig {
    let backend = resolver.default_backend();

    let string_or = |name: &str, fallback: &str| match get_string(name, ing) {
        Ok(value) if !value.is_empty() => value,
        _ => fallback.to_string(),
    };

    let mut body_size = string_or(ANN_PROXY_BODY_SIZE, &backend.proxy_body_size);
    if !is_valid_body_size(&body_size) {
        if body_size != PROXY_BODY_SIZE_UNLIMITED {
            warn!(
                ingress = %ingress_key(ing),
                value = %body_size,
                "ignoring invalid body size"
            );
        }
        body_size = String::new();
    }

    ProxyConfig {
        body_size,
        connect_timeout: get_int(ANN_PROXY_CONNECT_TIMEOUT, ing)
            .unwrap_or(backend.proxy_connect_timeout),
        send_timeout: get_int(ANN_PROXY_SEND_TIMEOUT, ing).unwrap_or(backend.proxy_send_timeout),
        read_timeout: get_int(ANN_PROXY_READ_TIMEOUT, ing).unwrap_or(backend.proxy_read_timeout),
        buffer_size: string_or(ANN_PROXY_BUFFER_SIZE, &backend.proxy_buffer_size),
        cookie_domain: string_or(ANN_PROXY_COOKIE_DOMAIN, &backend.proxy_cookie_domain),
        cookie_path: string_or(ANN_PROXY_COOKIE_PATH, &backend.proxy_cookie_path),
        next_upstream: string_or(ANN_PROXY_NEXT_UPSTREAM, &backend.proxy_next_upstream),
        pass_params: string_or(ANN_PROXY_PASS_PARAMS, &backend.proxy_pass_params),
        request_buffering: string_or(ANN_PROXY_REQUEST_BUFFERING, &backend.proxy_request_buffering),
    }
}

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod proxy_tests;
