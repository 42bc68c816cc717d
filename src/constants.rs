// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the ingress controller core.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Annotation Keys
// ============================================================================

/// Enables CORS on all locations of the Ingress
pub const ANN_CORS_ENABLE: &str = "ingress.kubernetes.io/cors-enable";

/// Deprecated spelling of [`ANN_CORS_ENABLE`], read only when the canonical key is absent
pub const ANN_CORS_ENABLE_DEPRECATED: &str = "ingress.kubernetes.io/enable-cors";

/// Value of the `Access-Control-Allow-Origin` response header
pub const ANN_CORS_ALLOW_ORIGIN: &str = "ingress.kubernetes.io/cors-allow-origin";

/// Value of the `Access-Control-Allow-Methods` response header
pub const ANN_CORS_ALLOW_METHODS: &str = "ingress.kubernetes.io/cors-allow-methods";

/// Value of the `Access-Control-Allow-Headers` response header
pub const ANN_CORS_ALLOW_HEADERS: &str = "ingress.kubernetes.io/cors-allow-headers";

/// Value of the `Access-Control-Allow-Credentials` response header
pub const ANN_CORS_ALLOW_CREDENTIALS: &str = "ingress.kubernetes.io/cors-allow-credentials";

/// Value of the `Access-Control-Expose-Headers` response header
pub const ANN_CORS_EXPOSE_HEADERS: &str = "ingress.kubernetes.io/cors-expose-headers";

/// Value of the `Access-Control-Max-Age` response header
pub const ANN_CORS_MAX_AGE: &str = "ingress.kubernetes.io/cors-max-age";

/// Comma separated list of client CIDRs allowed to reach the Ingress
pub const ANN_WHITELIST_SOURCE_RANGE: &str = "ingress.kubernetes.io/whitelist-source-range";

pub const ANN_PROXY_BODY_SIZE: &str = "ingress.kubernetes.io/proxy-body-size";
pub const ANN_PROXY_CONNECT_TIMEOUT: &str = "ingress.kubernetes.io/proxy-connect-timeout";
pub const ANN_PROXY_SEND_TIMEOUT: &str = "ingress.kubernetes.io/proxy-send-timeout";
pub const ANN_PROXY_READ_TIMEOUT: &str = "ingress.kubernetes.io/proxy-read-timeout";
pub const ANN_PROXY_BUFFER_SIZE: &str = "ingress.kubernetes.io/proxy-buffer-size";
pub const ANN_PROXY_COOKIE_PATH: &str = "ingress.kubernetes.io/proxy-cookie-path";
pub const ANN_PROXY_COOKIE_DOMAIN: &str = "ingress.kubernetes.io/proxy-cookie-domain";
pub const ANN_PROXY_NEXT_UPSTREAM: &str = "ingress.kubernetes.io/proxy-next-upstream";
pub const ANN_PROXY_PASS_PARAMS: &str = "ingress.kubernetes.io/proxy-pass-params";
pub const ANN_PROXY_REQUEST_BUFFERING: &str = "ingress.kubernetes.io/proxy-request-buffering";

/// Path the request URI is rewritten to before reaching the upstream
pub const ANN_REWRITE_TARGET: &str = "ingress.kubernetes.io/rewrite-target";

/// Redirect plain HTTP requests to HTTPS when the Ingress has TLS
pub const ANN_SSL_REDIRECT: &str = "ingress.kubernetes.io/ssl-redirect";

/// Redirect plain HTTP requests to HTTPS even without a TLS section
pub const ANN_FORCE_SSL_REDIRECT: &str = "ingress.kubernetes.io/force-ssl-redirect";

/// Redirect requests for `/` to this path
pub const ANN_APP_ROOT: &str = "ingress.kubernetes.io/app-root";

/// Keep the listening port in redirect `Location` headers
pub const ANN_USE_PORT_IN_REDIRECTS: &str = "ingress.kubernetes.io/use-port-in-redirects";

/// Talk TLS to the upstream servers
pub const ANN_SECURE_BACKENDS: &str = "ingress.kubernetes.io/secure-backends";

/// Secret holding the CA used to verify upstream certificates
pub const ANN_SECURE_VERIFY_CA_SECRET: &str = "ingress.kubernetes.io/secure-verify-ca-secret";

/// Use the service cluster IP as the single upstream instead of endpoints
pub const ANN_SERVICE_UPSTREAM: &str = "ingress.kubernetes.io/service-upstream";

pub const ANN_AFFINITY: &str = "ingress.kubernetes.io/affinity";
pub const ANN_SESSION_COOKIE_NAME: &str = "ingress.kubernetes.io/session-cookie-name";
pub const ANN_SESSION_COOKIE_HASH: &str = "ingress.kubernetes.io/session-cookie-hash";
pub const ANN_SESSION_COOKIE_STRATEGY: &str = "ingress.kubernetes.io/session-cookie-strategy";
pub const ANN_SESSION_COOKIE_DYNAMIC: &str = "ingress.kubernetes.io/session-cookie-dynamic";

/// Pass TLS connections through to the upstream without terminating them
pub const ANN_SSL_PASSTHROUGH: &str = "ingress.kubernetes.io/ssl-passthrough";

/// Plain HTTP port used alongside SSL passthrough
pub const ANN_SSL_PASSTHROUGH_HTTP_PORT: &str = "ingress.kubernetes.io/ssl-passthrough-http-port";

pub const ANN_HEALTH_CHECK_URI: &str = "ingress.kubernetes.io/health-check-uri";
pub const ANN_HEALTH_CHECK_ADDR: &str = "ingress.kubernetes.io/health-check-addr";
pub const ANN_HEALTH_CHECK_PORT: &str = "ingress.kubernetes.io/health-check-port";
pub const ANN_HEALTH_CHECK_INTERVAL: &str = "ingress.kubernetes.io/health-check-interval";
pub const ANN_HEALTH_CHECK_RISE_COUNT: &str = "ingress.kubernetes.io/health-check-rise-count";
pub const ANN_HEALTH_CHECK_FALL_COUNT: &str = "ingress.kubernetes.io/health-check-fall-count";

/// Legacy ingress class annotation
pub const ANN_INGRESS_CLASS: &str = "kubernetes.io/ingress.class";

// ============================================================================
// Built-in Annotation Defaults
// ============================================================================

/// Methods allowed by CORS when the annotation is missing or invalid
pub const DEFAULT_CORS_METHODS: &str = "GET, PUT, POST, DELETE, PATCH, OPTIONS";

/// Headers allowed by CORS when the annotation is missing or invalid
pub const DEFAULT_CORS_HEADERS: &str = "DNT,X-CustomHeader,Keep-Alive,User-Agent,X-Requested-With,If-Modified-Since,Cache-Control,Content-Type,Authorization";

/// Origin allowed by CORS when the annotation is missing or invalid
pub const DEFAULT_CORS_ORIGIN: &str = "*";

/// CORS preflight cache duration (1 day)
pub const DEFAULT_CORS_MAX_AGE_SECS: i32 = 86400;

/// Default session affinity cookie name
pub const DEFAULT_AFFINITY_COOKIE_NAME: &str = "INGRESSCOOKIE";

/// Default session affinity cookie hash
pub const DEFAULT_AFFINITY_COOKIE_HASH: &str = "md5";

/// Default session affinity cookie strategy
pub const DEFAULT_AFFINITY_COOKIE_STRATEGY: &str = "insert";

/// Literal accepted as a proxy body size meaning "no limit"
pub const PROXY_BODY_SIZE_UNLIMITED: &str = "unlimited";

// ============================================================================
// Default Backend Built-in Values
// ============================================================================

pub const DEFAULT_PROXY_CONNECT_TIMEOUT_SECS: i32 = 5;
pub const DEFAULT_PROXY_SEND_TIMEOUT_SECS: i32 = 60;
pub const DEFAULT_PROXY_READ_TIMEOUT_SECS: i32 = 60;
pub const DEFAULT_PROXY_BUFFER_SIZE: &str = "4k";
pub const DEFAULT_PROXY_BODY_SIZE: &str = "1m";
pub const DEFAULT_PROXY_COOKIE_PATH: &str = "off";
pub const DEFAULT_PROXY_COOKIE_DOMAIN: &str = "off";
pub const DEFAULT_PROXY_NEXT_UPSTREAM: &str = "error timeout invalid_header http_502 http_503 http_504";
pub const DEFAULT_PROXY_REQUEST_BUFFERING: &str = "on";
pub const DEFAULT_HEALTH_CHECK_INTERVAL: &str = "2s";

// ============================================================================
// TCP Services Constants
// ============================================================================

/// Number of `:` separated fields in a TCP service directive
pub const TCP_DIRECTIVE_FIELDS: usize = 5;

/// Proxy protocol marker: decode incoming header, or encode v2 when in the encode field
pub const TCP_PROXY_MARKER: &str = "proxy";

/// Proxy protocol marker: encode outgoing v1 (text) header
pub const TCP_PROXY_V1_MARKER: &str = "proxy-v1";

/// Proxy protocol marker: encode outgoing v2 (binary) header
pub const TCP_PROXY_V2_MARKER: &str = "proxy-v2";

/// Prefix of generated endpoint names (`srv001`, `srv002`, ...)
pub const TCP_ENDPOINT_NAME_PREFIX: &str = "srv";

/// Default directory holding rendered certificate files
pub const DEFAULT_SSL_DIR: &str = "/var/haproxy/ssl";

/// Default interval between TCP services conversions in the binary (5 seconds)
pub const DEFAULT_TCP_SYNC_INTERVAL_SECS: u64 = 5;

// ============================================================================
// Status Sync Constants
// ============================================================================

/// Interval between periodic status sync triggers (60 seconds)
pub const STATUS_UPDATE_INTERVAL_SECS: u64 = 60;

/// Width of the worker pool updating Ingress status in parallel
pub const STATUS_UPDATE_WORKERS: usize = 10;

/// Constant queue key used by the periodic status sync trigger
pub const STATUS_SYNC_KEY: &str = "sync status";

/// Default prefix of the leader election lock name
pub const DEFAULT_ELECTION_ID: &str = "ingress-controller-leader";

/// Default ingress class handled by this controller
pub const DEFAULT_INGRESS_CLASS: &str = "haproxy";

/// Page size used when listing pods through the API
pub const KUBE_LIST_PAGE_SIZE: u32 = 100;

// ============================================================================
// Leader Election Constants
// ============================================================================

/// Default leader election lease duration (30 seconds)
pub const DEFAULT_LEASE_DURATION_SECS: u64 = 30;

/// Default leader election grace period before the lease is renewed (15 seconds)
pub const DEFAULT_LEASE_GRACE_SECS: u64 = 15;

/// Field manager recorded on the lease object
pub const LEASE_FIELD_MANAGER: &str = "ingress-leader-elector";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Environment variable carrying this pod's name
pub const ENV_POD_NAME: &str = "POD_NAME";

/// Environment variable carrying this pod's namespace
pub const ENV_POD_NAMESPACE: &str = "POD_NAMESPACE";

/// Number of Tokio worker threads
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
