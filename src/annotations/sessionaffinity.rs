// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Sticky session policy.
//!
//! Only `cookie` affinity is supported; the cookie fields are resolved only
//! when it is selected.

use super::parser::{get_bool, get_string};
use super::ConfigEqual;
use crate::constants::{
    ANN_AFFINITY, ANN_SESSION_COOKIE_DYNAMIC, ANN_SESSION_COOKIE_HASH, ANN_SESSION_COOKIE_NAME,
    ANN_SESSION_COOKIE_STRATEGY, DEFAULT_AFFINITY_COOKIE_HASH, DEFAULT_AFFINITY_COOKIE_NAME,
    DEFAULT_AFFINITY_COOKIE_STRATEGY,
};
use crate::validation::{AFFINITY_COOKIE_HASH_REGEX, AFFINITY_COOKIE_STRATEGY_REGEX};
use k8s_openapi::api::networking::v1::Ingress;
use serde::Serialize;
use tracing::debug;

/// Affinity type selecting cookie based stickiness
pub const AFFINITY_TYPE_COOKIE: &str = "cookie";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieConfig {
    pub name: String,
    pub hash: String,
    pub strategy: String,
    pub dynamic: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffinityConfig {
    /// Affinity type, empty when disabled
    pub affinity_type: String,
    pub cookie_config: CookieConfig,
}

impl ConfigEqual for AffinityConfig {
    fn config_eq(&self, other: &Self) -> bool {
        self == other
    }
}

#[must_use]
pub fn parse(ing: &Ingress) -> AffinityConfig {
    let affinity_type = get_string(ANN_AFFINITY, ing).unwrap_or_default();

    let cookie_config = if affinity_type == AFFINITY_TYPE_COOKIE {
        parse_cookie(ing)
    } else {
        debug!(
            ingress = ?ing.metadata.name,
            affinity = %affinity_type,
            "no cookie affinity configured"
        );
        CookieConfig::default()
    };

    AffinityConfig {
        affinity_type,
        cookie_config,
    }
}

fn parse_cookie(ing: &Ingress) -> CookieConfig {
    let name = match get_string(ANN_SESSION_COOKIE_NAME, ing) {
        Ok(name) if !name.is_empty() => name,
        _ => DEFAULT_AFFINITY_COOKIE_NAME.to_string(),
    };
    let hash = match get_string(ANN_SESSION_COOKIE_HASH, ing) {
        Ok(hash) if AFFINITY_COOKIE_HASH_REGEX.is_match(&hash) => hash,
        _ => DEFAULT_AFFINITY_COOKIE_HASH.to_string(),
    };
    let strategy = match get_string(ANN_SESSION_COOKIE_STRATEGY, ing) {
        Ok(strategy) if AFFINITY_COOKIE_STRATEGY_REGEX.is_match(&strategy) => strategy,
        _ => DEFAULT_AFFINITY_COOKIE_STRATEGY.to_string(),
    };

    CookieConfig {
        name,
        hash,
        strategy,
        dynamic: get_bool(ANN_SESSION_COOKIE_DYNAMIC, ing).unwrap_or(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::test_support::ingress_with;

    #[test]
    fn test_ingress_affinity_cookie_config() {
        let ing = ingress_with(&[
            (ANN_AFFINITY, "cookie"),
            (ANN_SESSION_COOKIE_HASH, "sha123"),
            (ANN_SESSION_COOKIE_NAME, "INGRESSCOOKIE"),
            (ANN_SESSION_COOKIE_STRATEGY, "insert"),
            (ANN_SESSION_COOKIE_DYNAMIC, "false"),
        ]);

        let affinity = parse(&ing);

        assert_eq!(affinity.affinity_type, "cookie");
        assert_eq!(affinity.cookie_config.hash, "md5");
        assert_eq!(affinity.cookie_config.name, "INGRESSCOOKIE");
        assert_eq!(affinity.cookie_config.strategy, "insert");
        assert!(!affinity.cookie_config.dynamic);
    }

    #[test]
    fn test_cookie_defaults() {
        let affinity = parse(&ingress_with(&[
            (ANN_AFFINITY, "cookie"),
            (ANN_SESSION_COOKIE_STRATEGY, "append"),
        ]));

        assert_eq!(affinity.cookie_config.name, "INGRESSCOOKIE");
        assert_eq!(affinity.cookie_config.strategy, "insert");
        assert!(affinity.cookie_config.dynamic);
    }

    #[test]
    fn test_non_cookie_affinity_skips_cookie_fields() {
        let affinity = parse(&ingress_with(&[
            (ANN_AFFINITY, "source"),
            (ANN_SESSION_COOKIE_NAME, "SERVERID"),
        ]));

        assert_eq!(affinity.affinity_type, "source");
        assert_eq!(affinity.cookie_config, CookieConfig::default());
    }
}
