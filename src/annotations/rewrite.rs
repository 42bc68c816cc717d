// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! URI rewrite and HTTPS redirect policy.

use super::parser::{get_bool, get_string};
use super::ConfigEqual;
use crate::constants::{ANN_APP_ROOT, ANN_FORCE_SSL_REDIRECT, ANN_REWRITE_TARGET, ANN_SSL_REDIRECT};
use crate::defaults::DefaultBackendResolver;
use k8s_openapi::api::networking::v1::Ingress;
use serde::Serialize;

/// Resolved rewrite and redirect policy of an Ingress.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    /// URI the matched path is rewritten to
    pub target: String,
    /// Redirect to HTTPS when the server has TLS
    pub ssl_redirect: bool,
    /// Redirect to HTTPS even without TLS on this Ingress
    pub force_ssl_redirect: bool,
    /// Location requests for `/` are redirected to
    pub app_root: String,
}

impl ConfigEqual for Redirect {
    fn config_eq(&self, other: &Self) -> bool {
        self == other
    }
}

#[must_use]
pub fn parse(ing: &Ingress, resolver: &dyn DefaultBackendResolver) -> Redirect {
    Redirect {
        target: get_string(ANN_REWRITE_TARGET, ing).unwrap_or_default(),
        ssl_redirect: get_bool(ANN_SSL_REDIRECT, ing)
            .unwrap_or_else(|_| resolver.default_backend().ssl_redirect),
        force_ssl_redirect: get_bool(ANN_FORCE_SSL_REDIRECT, ing).unwrap_or(false),
        app_root: get_string(ANN_APP_ROOT, ing).unwrap_or_default(),
    }
}

#[cfg(test)]
#[path = "rewrite_tests.rs"]
mod rewrite_tests;
