// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use clap::Parser;
use futures::StreamExt;
use haproxy_ingress::{
    annotations::AnnotationExtractor,
    class,
    constants::{
        DEFAULT_ELECTION_ID, DEFAULT_INGRESS_CLASS, DEFAULT_LEASE_DURATION_SECS,
        DEFAULT_LEASE_GRACE_SECS, DEFAULT_SSL_DIR, DEFAULT_TCP_SYNC_INTERVAL_SECS,
        METRICS_SERVER_BIND_ADDRESS, METRICS_SERVER_PATH, METRICS_SERVER_PORT,
        STATUS_UPDATE_INTERVAL_SECS, TOKIO_WORKER_THREADS,
    },
    context::Stores,
    defaults::{DefaultBackend, SharedDefaultBackend},
    errors::StatusError,
    k8s::{get_pod_details, KubeClusterClient},
    leader::{election_id, LeaderElector, LeadershipState, LeaseConfig, LeaseElector, LoggingCallbacks},
    metrics,
    status::{IngressLister, StatusConfig, StatusSync},
    tcp_services::{TcpBackend, TcpServicesConverter},
};
use k8s_openapi::api::core::v1::{ConfigMap, Endpoints, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::{
    runtime::{reflector, reflector::Store, watcher, WatchStreamExt},
    Api, Client, Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// HAProxy ingress controller.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
struct Args {
    /// `namespace/name` of the ConfigMap holding the TCP services table
    #[arg(long, env = "TCP_SERVICES_CONFIGMAP")]
    tcp_services_configmap: Option<String>,

    /// `namespace/name` of the ConfigMap holding default backend settings
    #[arg(long, env = "DEFAULT_BACKEND_CONFIGMAP")]
    default_backend_configmap: Option<String>,

    /// `namespace/name` of the Service whose addresses are published on Ingresses
    #[arg(long, env = "PUBLISH_SERVICE", default_value = "")]
    publish_service: String,

    /// Prefix of the leader election lock name
    #[arg(long, default_value = DEFAULT_ELECTION_ID)]
    election_id: String,

    /// Ingress class handled by this controller
    #[arg(long, env = "INGRESS_CLASS", default_value = "")]
    ingress_class: String,

    /// Class assumed for Ingresses without one
    #[arg(long, default_value = DEFAULT_INGRESS_CLASS)]
    default_ingress_class: String,

    /// Publish controller addresses on Ingress status
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    update_status: bool,

    /// Withdraw published addresses when the last controller pod stops
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    update_status_on_shutdown: bool,

    /// Publish node internal IPs instead of external IPs
    #[arg(long)]
    use_node_internal_ip: bool,

    /// Seconds between Ingress status syncs
    #[arg(long, default_value_t = STATUS_UPDATE_INTERVAL_SECS)]
    status_update_interval: u64,

    /// Seconds between TCP services and annotation syncs
    #[arg(long, default_value_t = DEFAULT_TCP_SYNC_INTERVAL_SECS)]
    tcp_sync_interval: u64,

    /// Directory of certificate files extracted from secrets
    #[arg(long, default_value = DEFAULT_SSL_DIR)]
    ssl_dir: String,

    /// Port of the Prometheus metrics server
    #[arg(long, env = "METRICS_PORT", default_value_t = METRICS_SERVER_PORT)]
    metrics_port: u16,

    /// Seconds a leader lease stays valid without renewal
    #[arg(long, default_value_t = DEFAULT_LEASE_DURATION_SECS)]
    lease_duration: u64,

    /// Seconds before lease expiry at which the leader renews
    #[arg(long, default_value_t = DEFAULT_LEASE_GRACE_SECS)]
    lease_grace: u64,
}

impl Args {
    fn status_config(&self) -> StatusConfig {
        StatusConfig {
            publish_service: self.publish_service.clone(),
            ingress_class: self.ingress_class.clone(),
            default_ingress_class: self.default_ingress_class.clone(),
            update_status_on_shutdown: self.update_status_on_shutdown,
            use_node_internal_ip: self.use_node_internal_ip,
            interval: Duration::from_secs(self.status_update_interval.max(1)),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("haproxy-ingress")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

fn init_tracing() {
    // Respects RUST_LOG if set, otherwise defaults to INFO level.
    // RUST_LOG_FORMAT=json switches to JSON output.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(args: Args) -> Result<()> {
    init_tracing();
    info!("Starting HAProxy Ingress controller");
    debug!(?args, "configuration");

    let client = Client::try_default()
        .await
        .context("unable to create Kubernetes client")?;
    let token = CancellationToken::new();

    let stores = Stores::new(
        spawn_reflector(Api::<Ingress>::all(client.clone()), token.clone()),
        spawn_reflector(Api::<Service>::all(client.clone()), token.clone()),
        spawn_reflector(Api::<Endpoints>::all(client.clone()), token.clone()),
        spawn_reflector(Api::<Secret>::all(client.clone()), token.clone()),
        spawn_reflector(Api::<ConfigMap>::all(client.clone()), token.clone()),
        args.ssl_dir.clone(),
    );
    wait_for_stores(&stores).await?;
    stores.mark_synced();
    info!("caches synced");

    let metrics_server = tokio::spawn(serve_metrics(args.metrics_port, token.clone()));

    let mut config_sync = ConfigSync::new(stores.clone(), &args);
    let config_task = {
        let token = token.clone();
        let interval = Duration::from_secs(args.tcp_sync_interval.max(1));
        tokio::spawn(async move { config_sync.run(interval, token).await })
    };

    let mut status = None;
    let mut elector_task = None;

    if args.update_status {
        let cluster = Arc::new(KubeClusterClient::new(client.clone()));
        let pod = get_pod_details(cluster.as_ref())
            .await
            .context("unable to get POD information")?;
        info!(pod = %pod.name, namespace = %pod.namespace, node_ip = %pod.node_ip, "controller pod identified");

        let lock = election_id(&args.election_id, &args.ingress_class, &args.default_ingress_class);
        let leadership = Arc::new(LeadershipState::new(pod.name.clone(), Arc::new(LoggingCallbacks)));
        let elector = LeaseElector::new(
            client.clone(),
            LeaseConfig {
                duration: args.lease_duration,
                grace: args.lease_grace,
                ..LeaseConfig::new(lock, pod.namespace.clone())
            },
            leadership.clone(),
        );
        elector_task = Some({
            let token = token.clone();
            tokio::spawn(async move { elector.run(token).await })
        });

        let lister: Arc<dyn IngressLister> = Arc::new(stores.clone());
        let leader: Arc<dyn LeaderElector> = leadership;
        let sync = Arc::new(StatusSync::new(args.status_config(), pod, cluster, lister, leader));
        let runner = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.run().await })
        };
        status = Some((sync, runner));
    }

    let (outcome, elector_stopped) = match elector_task.as_mut() {
        Some(task) => tokio::select! {
            res = shutdown_signal() => (res, false),
            res = task => (Err(election_stopped(res)), true),
        },
        None => (shutdown_signal().await, false),
    };
    if elector_stopped {
        elector_task = None;
    }

    info!("shutting down");
    if let Some((sync, runner)) = status {
        sync.shutdown().await;
        if let Err(e) = runner.await {
            error!("status sync task failed: {e}");
        }
    }

    token.cancel();
    if let Some(task) = elector_task {
        match task.await {
            Ok(Err(e)) => warn!("leader election stopped with error: {e}"),
            Err(e) => error!("leader election task failed: {e}"),
            Ok(Ok(())) => {}
        }
    }
    if let Err(e) = config_task.await {
        error!("config sync task failed: {e}");
    }
    match metrics_server.await {
        Ok(Err(e)) => error!("metrics server failed: {e:#}"),
        Err(e) => error!("metrics server task failed: {e}"),
        Ok(Ok(())) => {}
    }

    outcome
}

fn election_stopped(res: Result<Result<(), StatusError>, tokio::task::JoinError>) -> anyhow::Error {
    match res {
        Ok(Ok(())) => anyhow::anyhow!("leader election stopped unexpectedly"),
        Ok(Err(e)) => anyhow::Error::new(e).context("leader election failed"),
        Err(e) => anyhow::Error::new(e).context("leader election task failed"),
    }
}

/// Start a reflector feeding a new store until `token` is cancelled.
fn spawn_reflector<K>(api: Api<K>, token: CancellationToken) -> Store<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    let (reader, writer) = reflector::store();
    let kind = K::kind(&()).to_string();

    tokio::spawn(async move {
        let stream = reflector(writer, watcher(api, watcher::Config::default()))
            .default_backoff()
            .touched_objects()
            .for_each(|event| {
                if let Err(e) = event {
                    warn!(kind = %kind, error = %e, "watch error");
                }
                futures::future::ready(())
            });

        tokio::select! {
            () = stream => warn!("watch stream ended"),
            () = token.cancelled() => {}
        }
    });

    reader
}

async fn wait_for_stores(stores: &Stores) -> Result<()> {
    info!("waiting for caches to sync");
    stores
        .ingresses
        .wait_until_ready()
        .await
        .context("Ingress cache")?;
    stores
        .services
        .wait_until_ready()
        .await
        .context("Service cache")?;
    stores
        .endpoints
        .wait_until_ready()
        .await
        .context("Endpoints cache")?;
    stores
        .secrets
        .wait_until_ready()
        .await
        .context("Secret cache")?;
    stores
        .config_maps
        .wait_until_ready()
        .await
        .context("ConfigMap cache")?;
    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("unable to install SIGTERM handler")?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("unable to listen for SIGINT")?;
            info!("received SIGINT");
        }
        _ = sigterm.recv() => info!("received SIGTERM"),
    }

    Ok(())
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn serve_metrics(port: u16, token: CancellationToken) -> Result<()> {
    let app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));
    let addr = format!("{METRICS_SERVER_BIND_ADDRESS}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("unable to bind metrics server to {addr}"))?;

    info!(addr = %addr, path = METRICS_SERVER_PATH, "serving metrics");
    axum::serve(listener, app)
        .with_graceful_shutdown(token.cancelled_owned())
        .await
        .context("metrics server")
}

/// Periodic rebuild of the configuration handed to the renderer.
///
/// Each pass refreshes the default backend, rebuilds the TCP backends and
/// resolves the annotations of Ingresses that changed since the last pass.
struct ConfigSync {
    stores: Stores,
    default_backend: SharedDefaultBackend,
    extractor: AnnotationExtractor,
    tcp_services_configmap: Option<String>,
    default_backend_configmap: Option<String>,
    ingress_class: String,
    default_ingress_class: String,

    default_backend_data: Option<BTreeMap<String, String>>,
    tcp_backends: Vec<TcpBackend>,
    /// `namespace/name` to resource version of resolved Ingresses
    resolved: BTreeMap<String, String>,
    degraded: BTreeSet<String>,
}

impl ConfigSync {
    fn new(stores: Stores, args: &Args) -> Self {
        let default_backend = SharedDefaultBackend::new(DefaultBackend::default());
        let extractor = AnnotationExtractor::new(
            Arc::new(default_backend.clone()),
            Arc::new(stores.clone()),
        );

        Self {
            stores,
            default_backend,
            extractor,
            tcp_services_configmap: args.tcp_services_configmap.clone(),
            default_backend_configmap: args.default_backend_configmap.clone(),
            ingress_class: args.ingress_class.clone(),
            default_ingress_class: args.default_ingress_class.clone(),
            default_backend_data: None,
            tcp_backends: Vec::new(),
            resolved: BTreeMap::new(),
            degraded: BTreeSet::new(),
        }
    }

    async fn run(&mut self, interval: Duration, token: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticker.tick() => self.refresh(),
            }
        }
    }

    fn refresh(&mut self) {
        self.refresh_default_backend();
        self.refresh_tcp_services();
        self.resolve_annotations();
    }

    fn refresh_default_backend(&mut self) {
        let Some(reference) = &self.default_backend_configmap else {
            return;
        };

        let data = self.stores.config_map_data(reference).unwrap_or_default();
        if self.default_backend_data.as_ref() == Some(&data) {
            return;
        }

        info!(configmap = %reference, "default backend configuration changed");
        self.default_backend
            .replace(DefaultBackend::from_config_map_data(&data));
        self.default_backend_data = Some(data);
        // Every Ingress depends on the default backend.
        self.resolved.clear();
    }

    fn refresh_tcp_services(&mut self) {
        let Some(reference) = &self.tcp_services_configmap else {
            return;
        };

        let table = self.stores.config_map_data(reference).unwrap_or_default();
        match TcpServicesConverter::new(&self.stores).sync(&table) {
            Ok(outcome) => {
                if outcome.backends != self.tcp_backends {
                    info!(
                        backends = outcome.backends.len(),
                        skipped = outcome.skipped.len(),
                        "TCP services changed"
                    );
                    self.tcp_backends = outcome.backends;
                }
            }
            Err(e) => warn!("TCP services sync aborted: {e}"),
        }
    }

    fn resolve_annotations(&mut self) {
        let mut seen = BTreeSet::new();

        for ing in self.stores.list_ingresses() {
            if !class::is_valid(&ing, &self.ingress_class, &self.default_ingress_class) {
                continue;
            }

            let key = format!("{}/{}", ing.namespace().unwrap_or_default(), ing.name_any());
            let version = ing.resource_version().unwrap_or_default();
            seen.insert(key.clone());

            if self.resolved.get(&key) == Some(&version) {
                continue;
            }

            let resolved = self.extractor.extract(&ing);
            if resolved.is_degraded() {
                if self.degraded.insert(key.clone()) {
                    warn!(ingress = %key, errors = resolved.errors.len(), "Ingress has invalid annotations");
                }
            } else if self.degraded.remove(&key) {
                info!(ingress = %key, "Ingress annotations are valid again");
            }
            self.resolved.insert(key, version);
        }

        self.resolved.retain(|key, _| seen.contains(key));
        self.degraded.retain(|key| seen.contains(key));
    }
}
