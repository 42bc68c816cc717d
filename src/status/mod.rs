// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ingress status reconciler.
//!
//! Keeps `status.loadBalancer.ingress` of every managed Ingress equal to the
//! addresses the controller is reachable on. Only the elected leader writes.
//!
//! A timer enqueues a constant key on a [`SyncQueue`]; a single consumer runs
//! [`StatusSync::sync`], which computes the running addresses and fans the
//! per-Ingress update out over a [`WorkerPool`]. Steady state issues no writes:
//! an Ingress whose published addresses already match is skipped.
//!
//! The address source is either a publish Service (its load balancer entries
//! plus external IPs) or the nodes hosting the pods that share this pod's labels.

pub mod pool;
pub mod queue;

pub use pool::{WorkUnit, WorkerPool};
pub use queue::SyncQueue;

use crate::annotations::parser::ingress_key;
use crate::class;
use crate::constants::{
    DEFAULT_INGRESS_CLASS, STATUS_SYNC_KEY, STATUS_UPDATE_INTERVAL_SECS, STATUS_UPDATE_WORKERS,
};
use crate::errors::StatusError;
use crate::k8s::{get_node_ip, ClusterClient, PodInfo};
use crate::leader::LeaderElector;
use crate::metrics;
use crate::validation::parse_name_ns;
use k8s_openapi::api::networking::v1::{Ingress, IngressLoadBalancerIngress};
use std::cmp::Ordering;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Read access to the Ingress cache.
pub trait IngressLister: Send + Sync {
    fn list_ingresses(&self) -> Vec<Arc<Ingress>>;
}

/// Per-Ingress override of the published addresses.
///
/// A `Some` result replaces the computed addresses for that Ingress.
pub type CustomIngressStatus =
    Arc<dyn Fn(&Ingress) -> Option<Vec<IngressLoadBalancerIngress>> + Send + Sync>;

/// Settings of the status reconciler.
#[derive(Debug, Clone)]
pub struct StatusConfig {
    /// `namespace/name` of the Service whose addresses are published, empty to
    /// publish node addresses
    pub publish_service: String,
    pub ingress_class: String,
    pub default_ingress_class: String,
    /// Clear published addresses when the last controller pod stops
    pub update_status_on_shutdown: bool,
    pub use_node_internal_ip: bool,
    pub interval: Duration,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            publish_service: String::new(),
            ingress_class: String::new(),
            default_ingress_class: DEFAULT_INGRESS_CLASS.to_string(),
            update_status_on_shutdown: true,
            use_node_internal_ip: false,
            interval: Duration::from_secs(STATUS_UPDATE_INTERVAL_SECS),
        }
    }
}

/// What happened to one Ingress during a status pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    Unchanged,
    Failed,
}

impl UpdateOutcome {
    /// Metric label of the outcome.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateOutcome::Updated => "updated",
            UpdateOutcome::Unchanged => "skipped",
            UpdateOutcome::Failed => "failed",
        }
    }
}

pub struct StatusSync {
    config: StatusConfig,
    pod: PodInfo,
    client: Arc<dyn ClusterClient>,
    lister: Arc<dyn IngressLister>,
    elector: Arc<dyn LeaderElector>,
    custom_status: Option<CustomIngressStatus>,
    queue: SyncQueue,
    pool: WorkerPool,
    stop: CancellationToken,
}

impl StatusSync {
    #[must_use]
    pub fn new(
        config: StatusConfig,
        pod: PodInfo,
        client: Arc<dyn ClusterClient>,
        lister: Arc<dyn IngressLister>,
        elector: Arc<dyn LeaderElector>,
    ) -> Self {
        Self {
            config,
            pod,
            client,
            lister,
            elector,
            custom_status: None,
            queue: SyncQueue::new(),
            pool: WorkerPool::new(STATUS_UPDATE_WORKERS),
            stop: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_custom_status(mut self, hook: CustomIngressStatus) -> Self {
        self.custom_status = Some(hook);
        self
    }

    #[must_use]
    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    /// Trigger a sync every interval and process triggers until [`shutdown`](Self::shutdown).
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            interval_secs = self.config.interval.as_secs(),
            publish_service = %self.config.publish_service,
            "starting Ingress status sync"
        );

        loop {
            tokio::select! {
                () = self.stop.cancelled() => break,
                _ = ticker.tick() => {
                    self.queue.enqueue(STATUS_SYNC_KEY);
                }
                more = self.queue.next() => {
                    if !more {
                        break;
                    }
                    let started = Instant::now();
                    let result = self.sync().await;
                    metrics::record_status_sync(result.is_ok(), started.elapsed());
                    if let Err(e) = result {
                        warn!("error syncing Ingress status: {e}");
                    }
                }
            }
        }

        debug!("Ingress status sync stopped");
    }

    /// One reconciliation pass.
    ///
    /// # Errors
    ///
    /// Returns the error of the address lookup; per-Ingress write failures are
    /// only logged.
    pub async fn sync(&self) -> Result<(), StatusError> {
        if self.queue.is_shutting_down() {
            debug!("skipping Ingress status update (shutting down in progress)");
            return Ok(());
        }

        if !self.elector.is_leader() {
            debug!("skipping Ingress status update (I am not the current leader)");
            return Ok(());
        }

        let addrs = self.running_addresses().await?;
        let batch = self.stop.child_token();
        let outcomes = self.update_status(&slice_to_status(&addrs), &batch).await;

        debug!(
            ingresses = outcomes.len(),
            updated = outcomes
                .iter()
                .filter(|o| **o == UpdateOutcome::Updated)
                .count(),
            "Ingress status pass finished"
        );

        Ok(())
    }

    /// Stop syncing and, as the last leader standing, withdraw the published addresses.
    pub async fn shutdown(&self) {
        self.queue.shutdown();
        self.stop.cancel();

        if !self.elector.is_leader() {
            return;
        }

        if !self.config.update_status_on_shutdown {
            warn!("skipping update of status of Ingress rules");
            return;
        }

        info!("updating status of Ingress rules (remove)");

        let addrs = match self.running_addresses().await {
            Ok(addrs) => addrs,
            Err(e) => {
                error!("error obtaining running IPs: {e}");
                return;
            }
        };

        if addrs.len() > 1 {
            info!("leaving status update for next leader ({})", addrs.len());
            return;
        }

        if self.is_running_multiple_pods().await {
            info!("skipping Ingress status update (multiple pods running - another one will be elected as master)");
            return;
        }

        info!("removing address from ingress status ({addrs:?})");
        self.update_status(&[], &CancellationToken::new()).await;
    }

    /// Addresses the controller is currently reachable on, in discovery order.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError`] if the publish Service or the pod list cannot be read.
    pub async fn running_addresses(&self) -> Result<Vec<String>, StatusError> {
        if !self.config.publish_service.is_empty() {
            let (namespace, name) = parse_name_ns(&self.config.publish_service)?;
            let service = self.client.get_service(&namespace, &name).await?;

            let mut addrs: Vec<String> = service
                .status
                .and_then(|s| s.load_balancer)
                .and_then(|lb| lb.ingress)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|entry| {
                    entry
                        .ip
                        .filter(|ip| !ip.is_empty())
                        .or(entry.hostname)
                        .filter(|a| !a.is_empty())
                })
                .collect();
            addrs.extend(
                service
                    .spec
                    .and_then(|s| s.external_ips)
                    .unwrap_or_default(),
            );

            return Ok(addrs);
        }

        let pods = self
            .client
            .list_pods(&self.pod.namespace, &self.pod.label_selector())
            .await?;

        let mut addrs: Vec<String> = Vec::new();
        for pod in pods {
            let node_name = pod
                .spec
                .and_then(|s| s.node_name)
                .unwrap_or_default();
            let Some(ip) =
                get_node_ip(self.client.as_ref(), &node_name, self.config.use_node_internal_ip).await
            else {
                continue;
            };
            if !addrs.contains(&ip) {
                addrs.push(ip);
            }
        }

        Ok(addrs)
    }

    /// Whether more than one controller pod is running. `false` if unknown.
    pub async fn is_running_multiple_pods(&self) -> bool {
        match self
            .client
            .list_pods(&self.pod.namespace, &self.pod.label_selector())
            .await
        {
            Ok(pods) => pods.len() > 1,
            Err(e) => {
                warn!("unable to list controller pods: {e}");
                false
            }
        }
    }

    /// Publish `addrs` on every managed Ingress and wait for all updates.
    pub async fn update_status(
        &self,
        addrs: &[IngressLoadBalancerIngress],
        token: &CancellationToken,
    ) -> Vec<UpdateOutcome> {
        let ingresses: Vec<Arc<Ingress>> = self
            .lister
            .list_ingresses()
            .into_iter()
            .filter(|ing| {
                class::is_valid(
                    ing,
                    &self.config.ingress_class,
                    &self.config.default_ingress_class,
                )
            })
            .collect();

        self.pool
            .run_batch(token, ingresses, |unit, ing| self.run_update(unit, ing, addrs))
            .await
    }

    async fn run_update(
        &self,
        unit: WorkUnit,
        ing: Arc<Ingress>,
        status: &[IngressLoadBalancerIngress],
    ) -> Option<UpdateOutcome> {
        if unit.is_cancelled() {
            return None;
        }

        let mut addrs = self
            .custom_status
            .as_ref()
            .and_then(|hook| hook(ing.as_ref()))
            .unwrap_or_else(|| status.to_vec());
        sort_addresses(&mut addrs);

        let mut current = ing
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.clone())
            .unwrap_or_default();
        sort_addresses(&mut current);

        let key = ingress_key(&ing);
        let outcome = if addresses_equal(&addrs, &current) {
            debug!("skipping update of Ingress {key} (no change)");
            UpdateOutcome::Unchanged
        } else {
            self.write_status(&ing, &key, addrs).await
        };

        metrics::record_status_update(outcome.as_str());
        Some(outcome)
    }

    async fn write_status(
        &self,
        ing: &Ingress,
        key: &str,
        addrs: Vec<IngressLoadBalancerIngress>,
    ) -> UpdateOutcome {
        let namespace = ing.metadata.namespace.as_deref().unwrap_or_default();
        let name = ing.metadata.name.as_deref().unwrap_or_default();

        let mut latest = match self.client.get_ingress(namespace, name).await {
            Ok(latest) => latest,
            Err(e) => {
                warn!("unexpected error searching Ingress {key}: {e}");
                return UpdateOutcome::Failed;
            }
        };

        info!("updating Ingress {key} status to {}", format_addresses(&addrs));
        latest
            .status
            .get_or_insert_default()
            .load_balancer
            .get_or_insert_default()
            .ingress = Some(addrs);

        match self.client.update_ingress_status(&latest).await {
            Ok(()) => UpdateOutcome::Updated,
            Err(e) => {
                warn!("error updating ingress rule: {e}");
                UpdateOutcome::Failed
            }
        }
    }
}

/// Convert addresses to status entries: IPs go to `ip`, anything else to
/// `hostname`. Ordered by IP, stable.
#[must_use]
pub fn slice_to_status(addrs: &[String]) -> Vec<IngressLoadBalancerIngress> {
    let mut status: Vec<IngressLoadBalancerIngress> = addrs
        .iter()
        .map(|addr| {
            if addr.parse::<IpAddr>().is_ok() {
                IngressLoadBalancerIngress {
                    ip: Some(addr.clone()),
                    ..IngressLoadBalancerIngress::default()
                }
            } else {
                IngressLoadBalancerIngress {
                    hostname: Some(addr.clone()),
                    ..IngressLoadBalancerIngress::default()
                }
            }
        })
        .collect();

    status.sort_by(|a, b| field(&a.ip).cmp(field(&b.ip)));
    status
}

/// Stable sort by hostname, then IP.
pub fn sort_addresses(addrs: &mut [IngressLoadBalancerIngress]) {
    addrs.sort_by(compare_addresses);
}

fn compare_addresses(a: &IngressLoadBalancerIngress, b: &IngressLoadBalancerIngress) -> Ordering {
    field(&a.hostname)
        .cmp(field(&b.hostname))
        .then_with(|| field(&a.ip).cmp(field(&b.ip)))
}

/// Element-wise equality by IP and hostname.
#[must_use]
pub fn addresses_equal(a: &[IngressLoadBalancerIngress], b: &[IngressLoadBalancerIngress]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| field(&x.ip) == field(&y.ip) && field(&x.hostname) == field(&y.hostname))
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

fn format_addresses(addrs: &[IngressLoadBalancerIngress]) -> String {
    let list: Vec<&str> = addrs
        .iter()
        .map(|a| a.ip.as_deref().or(a.hostname.as_deref()).unwrap_or_default())
        .collect();
    format!("[{}]", list.join(" "))
}
