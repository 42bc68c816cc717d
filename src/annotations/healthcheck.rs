// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Upstream health check parameters.
//!
//! Values are passed through to the renderer as-is; an empty annotation
//! inherits the default backend.

use super::parser::get_string;
use super::ConfigEqual;
use crate::constants::{
    ANN_HEALTH_CHECK_ADDR, ANN_HEALTH_CHECK_FALL_COUNT, ANN_HEALTH_CHECK_INTERVAL,
    ANN_HEALTH_CHECK_PORT, ANN_HEALTH_CHECK_RISE_COUNT, ANN_HEALTH_CHECK_URI,
};
use crate::defaults::DefaultBackendResolver;
use k8s_openapi::api::networking::v1::Ingress;
use serde::Serialize;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub uri: String,
    pub addr: String,
    pub port: String,
    pub interval: String,
    pub rise_count: String,
    pub fall_count: String,
}

impl ConfigEqual for HealthCheck {
    fn config_eq(&self, other: &Self) -> bool {
        self == other
    }
}

#[must_use]
pub fn parse(ing: &Ingress, resolver: &dyn DefaultBackendResolver) -> HealthCheck {
    let backend = resolver.default_backend();
    let value = |name: &str, fallback: &str| match get_string(name, ing) {
        Ok(v) if !v.is_empty() => v,
        _ => fallback.to_string(),
    };

    HealthCheck {
        uri: value(ANN_HEALTH_CHECK_URI, &backend.health_check_uri),
        addr: value(ANN_HEALTH_CHECK_ADDR, &backend.health_check_addr),
        port: value(ANN_HEALTH_CHECK_PORT, &backend.health_check_port),
        interval: value(ANN_HEALTH_CHECK_INTERVAL, &backend.health_check_interval),
        rise_count: value(ANN_HEALTH_CHECK_RISE_COUNT, &backend.health_check_rise_count),
        fall_count: value(ANN_HEALTH_CHECK_FALL_COUNT, &backend.health_check_fall_count),
    }
}
