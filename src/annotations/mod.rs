// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Annotation resolution engine.
//!
//! Each feature module turns the raw annotations of one Ingress into a typed,
//! validated configuration, falling back to the default backend and then to a
//! built-in literal. Parsers are plain functions; [`Feature`] is the closed set
//! of registered features and [`AnnotationExtractor`] runs all of them for one
//! Ingress.
//!
//! # Example
//!
//! ```rust,no_run
//! use haproxy_ingress::annotations::AnnotationExtractor;
//! use haproxy_ingress::defaults::DefaultBackend;
//! # use haproxy_ingress::annotations::secureupstream::{AuthCertificate, AuthCertificateResolver};
//! # struct NoCerts;
//! # impl AuthCertificateResolver for NoCerts {
//! #     fn auth_certificate(&self, _: &str) -> Option<AuthCertificate> { None }
//! # }
//! # fn example(ing: &k8s_openapi::api::networking::v1::Ingress) {
//! use std::sync::Arc;
//!
//! let extractor = AnnotationExtractor::new(Arc::new(DefaultBackend::default()), Arc::new(NoCerts));
//! let resolved = extractor.extract(ing);
//! if resolved.is_degraded() {
//!     // report the Ingress as degraded
//! }
//! # }
//! ```

pub mod cors;
pub mod healthcheck;
pub mod ipwhitelist;
pub mod parser;
pub mod portinredirect;
pub mod proxy;
pub mod rewrite;
pub mod secureupstream;
pub mod serviceupstream;
pub mod sessionaffinity;
pub mod sslpassthrough;

use crate::defaults::DefaultBackendResolver;
use crate::errors::AnnotationError;
use crate::metrics;
use cors::CorsConfig;
use healthcheck::HealthCheck;
use ipwhitelist::SourceRange;
use k8s_openapi::api::networking::v1::Ingress;
use proxy::ProxyConfig;
use rewrite::Redirect;
use secureupstream::{AuthCertificateResolver, SecureUpstream};
use sessionaffinity::AffinityConfig;
use sslpassthrough::SslPassthrough;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Value equality used to detect no-op updates.
///
/// Implemented for `Option<T>` so that `None == None` and `None != Some(_)`.
pub trait ConfigEqual {
    fn config_eq(&self, other: &Self) -> bool;
}

impl<T: ConfigEqual> ConfigEqual for Option<T> {
    fn config_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.config_eq(b),
            _ => false,
        }
    }
}

impl ConfigEqual for bool {
    fn config_eq(&self, other: &Self) -> bool {
        self == other
    }
}

/// Registered annotation features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    Cors,
    Proxy,
    Whitelist,
    Rewrite,
    PortInRedirect,
    SecureUpstream,
    ServiceUpstream,
    SessionAffinity,
    SslPassthrough,
    HealthCheck,
}

impl Feature {
    /// Every registered feature, in extraction order.
    pub const ALL: [Feature; 10] = [
        Feature::Cors,
        Feature::Proxy,
        Feature::Whitelist,
        Feature::Rewrite,
        Feature::PortInRedirect,
        Feature::SecureUpstream,
        Feature::ServiceUpstream,
        Feature::SessionAffinity,
        Feature::SslPassthrough,
        Feature::HealthCheck,
    ];

    /// Stable name used in logs and metric labels.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Feature::Cors => "cors",
            Feature::Proxy => "proxy",
            Feature::Whitelist => "whitelist",
            Feature::Rewrite => "rewrite",
            Feature::PortInRedirect => "port-in-redirect",
            Feature::SecureUpstream => "secure-upstream",
            Feature::ServiceUpstream => "service-upstream",
            Feature::SessionAffinity => "session-affinity",
            Feature::SslPassthrough => "ssl-passthrough",
            Feature::HealthCheck => "health-check",
        }
    }

    /// Run this feature's parser.
    ///
    /// # Errors
    ///
    /// Propagates the parser's [`AnnotationError`] unchanged.
    pub fn parse(
        self,
        ing: &Ingress,
        backend: &dyn DefaultBackendResolver,
        certs: &dyn AuthCertificateResolver,
    ) -> Result<FeatureConfig, AnnotationError> {
        Ok(match self {
            Feature::Cors => FeatureConfig::Cors(cors::parse(ing)),
            Feature::Proxy => FeatureConfig::Proxy(proxy::parse(ing, backend)),
            Feature::Whitelist => FeatureConfig::Whitelist(ipwhitelist::parse(ing, backend)?),
            Feature::Rewrite => FeatureConfig::Rewrite(rewrite::parse(ing, backend)),
            Feature::PortInRedirect => {
                FeatureConfig::PortInRedirect(portinredirect::parse(ing, backend)?)
            }
            Feature::SecureUpstream => {
                FeatureConfig::SecureUpstream(secureupstream::parse(ing, certs)?)
            }
            Feature::ServiceUpstream => {
                FeatureConfig::ServiceUpstream(serviceupstream::parse(ing)?)
            }
            Feature::SessionAffinity => {
                FeatureConfig::SessionAffinity(sessionaffinity::parse(ing))
            }
            Feature::SslPassthrough => FeatureConfig::SslPassthrough(sslpassthrough::parse(ing)?),
            Feature::HealthCheck => FeatureConfig::HealthCheck(healthcheck::parse(ing, backend)),
        })
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output of one feature parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureConfig {
    Cors(CorsConfig),
    Proxy(ProxyConfig),
    Whitelist(SourceRange),
    Rewrite(Redirect),
    PortInRedirect(bool),
    SecureUpstream(SecureUpstream),
    ServiceUpstream(bool),
    SessionAffinity(AffinityConfig),
    SslPassthrough(SslPassthrough),
    HealthCheck(HealthCheck),
}

/// Every typed configuration of one Ingress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngressAnnotations {
    pub cors: CorsConfig,
    pub proxy: ProxyConfig,
    pub whitelist: SourceRange,
    pub rewrite: Redirect,
    pub port_in_redirect: bool,
    pub secure_upstream: SecureUpstream,
    pub service_upstream: bool,
    pub session_affinity: AffinityConfig,
    pub ssl_passthrough: SslPassthrough,
    pub health_check: HealthCheck,

    /// Features whose annotation could not be honoured
    pub errors: BTreeMap<Feature, AnnotationError>,
}

impl IngressAnnotations {
    fn set(&mut self, config: FeatureConfig) {
        match config {
            FeatureConfig::Cors(c) => self.cors = c,
            FeatureConfig::Proxy(c) => self.proxy = c,
            FeatureConfig::Whitelist(c) => self.whitelist = c,
            FeatureConfig::Rewrite(c) => self.rewrite = c,
            FeatureConfig::PortInRedirect(c) => self.port_in_redirect = c,
            FeatureConfig::SecureUpstream(c) => self.secure_upstream = c,
            FeatureConfig::ServiceUpstream(c) => self.service_upstream = c,
            FeatureConfig::SessionAffinity(c) => self.session_affinity = c,
            FeatureConfig::SslPassthrough(c) => self.ssl_passthrough = c,
            FeatureConfig::HealthCheck(c) => self.health_check = c,
        }
    }

    /// Whether any feature failed and the orchestrator should report the Ingress.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether a feature requires the locations of this Ingress to be denied.
    #[must_use]
    pub fn is_location_denied(&self) -> bool {
        self.errors.values().any(AnnotationError::is_location_denied)
    }
}

impl ConfigEqual for IngressAnnotations {
    fn config_eq(&self, other: &Self) -> bool {
        self.cors.config_eq(&other.cors)
            && self.proxy.config_eq(&other.proxy)
            && self.whitelist.config_eq(&other.whitelist)
            && self.rewrite.config_eq(&other.rewrite)
            && self.port_in_redirect.config_eq(&other.port_in_redirect)
            && self.secure_upstream.config_eq(&other.secure_upstream)
            && self.service_upstream.config_eq(&other.service_upstream)
            && self.session_affinity.config_eq(&other.session_affinity)
            && self.ssl_passthrough.config_eq(&other.ssl_passthrough)
            && self.health_check.config_eq(&other.health_check)
    }
}

/// Runs every registered feature parser against an Ingress.
#[derive(Clone)]
pub struct AnnotationExtractor {
    backend: Arc<dyn DefaultBackendResolver>,
    certs: Arc<dyn AuthCertificateResolver>,
}

impl AnnotationExtractor {
    #[must_use]
    pub fn new(
        backend: Arc<dyn DefaultBackendResolver>,
        certs: Arc<dyn AuthCertificateResolver>,
    ) -> Self {
        Self { backend, certs }
    }

    /// Resolve every feature of `ing`.
    ///
    /// A missing annotation leaves the feature default. A denied location keeps
    /// the fallback carried by the error. Any other error leaves the feature
    /// default and is recorded in [`IngressAnnotations::errors`].
    #[must_use]
    pub fn extract(&self, ing: &Ingress) -> IngressAnnotations {
        let mut resolved = IngressAnnotations::default();

        for feature in Feature::ALL {
            match feature.parse(ing, self.backend.as_ref(), self.certs.as_ref()) {
                Ok(config) => resolved.set(config),
                Err(e) if e.is_missing_annotation() => {}
                Err(e) => {
                    warn!(
                        ingress = %parser::ingress_key(ing),
                        feature = %feature,
                        error = %e,
                        "error reading annotation"
                    );
                    metrics::record_annotation_error(feature.name());
                    if let AnnotationError::LocationDenied { fallback, .. } = &e {
                        resolved.whitelist = fallback.clone();
                    }
                    resolved.errors.insert(feature, e);
                }
            }
        }

        resolved
    }
}


#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
