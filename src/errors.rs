// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for annotation resolution, cache lookups and status sync.
//!
//! The three subsystems fail differently:
//! - Annotation parsers report per-Ingress problems through [`AnnotationError`];
//!   the caller decides whether the Ingress is degraded.
//! - The TCP services converter only fails a whole pass when a lookup capability
//!   itself breaks ([`CacheError`]); missing services, ports or secrets are skips.
//! - The status reconciler surfaces API failures through [`StatusError`].

use crate::annotations::ipwhitelist::SourceRange;
use thiserror::Error;

/// Errors produced while resolving annotations of a single Ingress.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    /// The annotation is not present on the Ingress.
    ///
    /// This is not a failure for most features: the caller falls back to the
    /// default backend or a built-in default. Features where "unset" and "false"
    /// mean different things use it to pick the right tier.
    #[error("ingress rule without annotations")]
    MissingAnnotations,

    /// The annotation is present but its value cannot be parsed.
    #[error("annotation {name} contains invalid value '{value}'")]
    InvalidContent {
        /// Annotation key
        name: String,
        /// Raw value found on the Ingress
        value: String,
    },

    /// The annotation is unusable and the location depending on it must be denied.
    ///
    /// `fallback` holds the configuration substituted in its place so callers
    /// can keep rendering the rest of the Ingress.
    #[error("location denied, reason: {reason}")]
    LocationDenied {
        /// Why the annotation was rejected
        reason: String,
        /// Configuration used instead
        fallback: SourceRange,
    },

    /// A secret referenced by an annotation does not exist.
    #[error("secret not found: {name}")]
    SecretNotFound {
        /// Namespace qualified secret name
        name: String,
    },

    /// Annotations contradict each other.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AnnotationError {
    /// Whether this is the distinguished "no annotation" condition.
    #[must_use]
    pub fn is_missing_annotation(&self) -> bool {
        matches!(self, Self::MissingAnnotations)
    }

    /// Whether this error denies access to the location using the annotation.
    #[must_use]
    pub fn is_location_denied(&self) -> bool {
        matches!(self, Self::LocationDenied { .. })
    }
}

/// A lookup capability (service, endpoint or secret cache) failed.
///
/// Unlike a missing object, this aborts the whole TCP services pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} cache lookup failed: {reason}")]
pub struct CacheError {
    /// Which cache failed (`service`, `endpoints`, `secret`)
    pub kind: &'static str,
    /// Underlying failure
    pub reason: String,
}

/// Errors raised by the status reconciler and its bootstrap.
#[derive(Error, Debug)]
pub enum StatusError {
    /// `POD_NAME` or `POD_NAMESPACE` is not set.
    #[error("unable to get POD information (missing POD_NAME or POD_NAMESPACE environment variable)")]
    MissingPodIdentity,

    /// The pod named by the environment does not exist.
    #[error("unable to get POD information: pod {namespace}/{name} not found")]
    PodNotFound {
        /// Pod namespace
        namespace: String,
        /// Pod name
        name: String,
    },

    /// A `namespace/name` reference could not be parsed.
    #[error("invalid format (namespace/name) found in '{0}'")]
    InvalidName(String),

    /// The Kubernetes API returned an error.
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// The leader election client could not be created or failed.
    #[error("leader election failed: {0}")]
    LeaderElection(String),
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
