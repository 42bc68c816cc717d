// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Leader election for the status reconciler.
//!
//! Only the leader writes Ingress status. The reconciler sees leadership through
//! the [`LeaderElector`] capability and must re-check it on every sync, since a
//! lease can be lost at any time.
//!
//! [`LeaseElector`] runs the election on a `coordination.k8s.io/v1` Lease via
//! `kube-lease-manager` and feeds transitions into a [`LeadershipState`], which
//! invokes the [`LeaderCallbacks`] exactly once per transition.

use crate::constants::{
    DEFAULT_LEASE_DURATION_SECS, DEFAULT_LEASE_GRACE_SECS, LEASE_FIELD_MANAGER,
};
use crate::errors::StatusError;
use crate::metrics;
use k8s_openapi::api::coordination::v1::Lease;
use kube::{Api, Client};
use kube_lease_manager::LeaseManagerBuilder;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Synchronous leadership query.
pub trait LeaderElector: Send + Sync {
    fn is_leader(&self) -> bool;
}

/// Notifications about leadership changes.
pub trait LeaderCallbacks: Send + Sync {
    fn on_started_leading(&self);
    fn on_stopped_leading(&self);
    fn on_new_leader(&self, identity: &str);
}

/// Callbacks that log the transition and update the leader gauge.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCallbacks;

impl LeaderCallbacks for LoggingCallbacks {
    fn on_started_leading(&self) {
        info!("I am the new status update leader");
        metrics::set_leader_status(true);
    }

    fn on_stopped_leading(&self) {
        info!("I am not status update leader anymore");
        metrics::set_leader_status(false);
    }

    fn on_new_leader(&self, identity: &str) {
        info!("new leader elected: {identity}");
    }
}

/// Current leadership of this process and the last known leader.
pub struct LeadershipState {
    identity: String,
    leading: AtomicBool,
    leader: Mutex<String>,
    callbacks: Arc<dyn LeaderCallbacks>,
}

impl LeadershipState {
    #[must_use]
    pub fn new(identity: impl Into<String>, callbacks: Arc<dyn LeaderCallbacks>) -> Self {
        Self {
            identity: identity.into(),
            leading: AtomicBool::new(false),
            leader: Mutex::new(String::new()),
            callbacks,
        }
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Record whether this process holds the lease.
    ///
    /// Callbacks only fire when the value changes.
    pub fn set_leading(&self, leading: bool) {
        if self.leading.swap(leading, Ordering::SeqCst) == leading {
            return;
        }

        if leading {
            self.callbacks.on_started_leading();
            self.observe_leader(&self.identity);
        } else {
            self.callbacks.on_stopped_leading();
        }
    }

    /// Record the current lease holder. Empty identities are ignored.
    pub fn observe_leader(&self, holder: &str) {
        if holder.is_empty() {
            return;
        }

        let mut current = match self.leader.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *current != holder {
            *current = holder.to_string();
            drop(current);
            self.callbacks.on_new_leader(holder);
        }
    }

    /// Last known lease holder, empty before the first observation.
    #[must_use]
    pub fn leader(&self) -> String {
        match self.leader.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LeaderElector for LeadershipState {
    fn is_leader(&self) -> bool {
        self.leading.load(Ordering::SeqCst)
    }
}

/// Name of the election lock.
///
/// Controllers serving different ingress classes elect independent leaders.
#[must_use]
pub fn election_id(prefix: &str, ingress_class: &str, default_class: &str) -> String {
    if ingress_class.is_empty() {
        format!("{prefix}-{default_class}")
    } else {
        format!("{prefix}-{ingress_class}")
    }
}

/// Lease settings of a [`LeaseElector`].
#[derive(Debug, Clone)]
pub struct LeaseConfig {
    pub name: String,
    pub namespace: String,
    /// Seconds a lease is valid without renewal
    pub duration: u64,
    /// Seconds before expiry at which the holder renews
    pub grace: u64,
}

impl LeaseConfig {
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            duration: DEFAULT_LEASE_DURATION_SECS,
            grace: DEFAULT_LEASE_GRACE_SECS,
        }
    }
}

/// Lease based leader election.
pub struct LeaseElector {
    client: Client,
    config: LeaseConfig,
    state: Arc<LeadershipState>,
}

impl LeaseElector {
    #[must_use]
    pub fn new(client: Client, config: LeaseConfig, state: Arc<LeadershipState>) -> Self {
        Self {
            client,
            config,
            state,
        }
    }

    /// Leadership as seen by this elector.
    #[must_use]
    pub fn state(&self) -> Arc<LeadershipState> {
        Arc::clone(&self.state)
    }

    /// Take part in the election until `token` is cancelled.
    ///
    /// The lease is released on return and leadership is reported as lost.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError::LeaderElection`] if the lease manager cannot be
    /// built or stops unexpectedly.
    pub async fn run(&self, token: CancellationToken) -> Result<(), StatusError> {
        let manager = LeaseManagerBuilder::new(self.client.clone(), &self.config.name)
            .with_namespace(&self.config.namespace)
            .with_identity(self.state.identity())
            .with_duration(self.config.duration)
            .with_grace(self.config.grace)
            .with_field_manager(LEASE_FIELD_MANAGER.to_string())
            .build()
            .await
            .map_err(|e| StatusError::LeaderElection(e.to_string()))?;

        info!(
            lease = %self.config.name,
            namespace = %self.config.namespace,
            identity = %self.state.identity(),
            "starting leader election"
        );

        let (mut channel, task) = manager.watch().await;
        let mut poll = tokio::time::interval(Duration::from_secs(self.config.grace.max(1)));
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let result = loop {
            tokio::select! {
                () = token.cancelled() => break Ok(()),
                changed = channel.changed() => {
                    if let Err(e) = changed {
                        break Err(StatusError::LeaderElection(e.to_string()));
                    }
                    let leading = *channel.borrow_and_update();
                    self.state.set_leading(leading);
                    self.observe_holder().await;
                }
                _ = poll.tick() => self.observe_holder().await,
            }
        };

        // Dropping the receiver makes the manager release the lease.
        drop(channel);
        match task.await {
            Ok(Ok(_)) => debug!(lease = %self.config.name, "lease released"),
            Ok(Err(e)) => warn!(lease = %self.config.name, error = %e, "lease manager stopped with error"),
            Err(e) => error!(lease = %self.config.name, error = %e, "lease manager task failed"),
        }
        self.state.set_leading(false);

        result
    }

    async fn observe_holder(&self) {
        let api: Api<Lease> = Api::namespaced(self.client.clone(), &self.config.namespace);

        match api.get_opt(&self.config.name).await {
            Ok(Some(lease)) => {
                let holder = lease
                    .spec
                    .and_then(|s| s.holder_identity)
                    .unwrap_or_default();
                self.state.observe_leader(&holder);
            }
            Ok(None) => debug!(lease = %self.config.name, "lease not created yet"),
            Err(e) => debug!(lease = %self.config.name, error = %e, "unable to read lease"),
        }
    }
}

#[cfg(test)]
#[path = "leader_tests.rs"]
mod leader_tests;
