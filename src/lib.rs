// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # HAProxy Ingress - control plane core
//!
//! The Kubernetes-facing half of a HAProxy ingress controller. It watches
//! Ingresses, Services, Endpoints, Secrets and `ConfigMaps`, and turns them into
//! the typed configuration a HAProxy renderer consumes.
//!
//! ## Overview
//!
//! - Resolves the `ingress.kubernetes.io/*` annotations of every Ingress into
//!   validated feature configs with default backend fallbacks
//! - Converts the TCP services `ConfigMap` into TCP backends
//! - Publishes the controller addresses on `status.loadBalancer` of managed
//!   Ingresses, with a single writer chosen by leader election
//!
//! ## Modules
//!
//! - [`annotations`] - Annotation parsers and the [`annotations::AnnotationExtractor`]
//! - [`tcp_services`] - TCP services table to backend conversion
//! - [`status`] - Ingress status reconciler, work queue and worker pool
//! - [`leader`] - Lease based leader election
//! - [`context`] - Reflector stores backing the read capabilities
//! - [`k8s`] - API access used by the status reconciler
//! - [`defaults`] - Default backend configuration
//! - [`class`] - Ingress class membership
//!
//! ## Example
//!
//! ```rust,no_run
//! use haproxy_ingress::tcp_services::{TcpCache, TcpServicesConverter};
//! use std::collections::BTreeMap;
//!
//! # fn example(cache: &dyn TcpCache) -> Result<(), haproxy_ingress::errors::CacheError> {
//! let table = BTreeMap::from([(
//!     "5432".to_string(),
//!     "default/pg:5432".to_string(),
//! )]);
//!
//! let outcome = TcpServicesConverter::new(cache).sync(&table)?;
//! for backend in &outcome.backends {
//!     println!("{} -> {} endpoints", backend.port, backend.endpoints.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod annotations;
pub mod class;
pub mod constants;
pub mod context;
pub mod defaults;
pub mod errors;
pub mod k8s;
pub mod leader;
pub mod metrics;
pub mod status;
pub mod tcp_services;
pub mod validation;
