// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes API access used by the status reconciler.
//!
//! The reconciler talks to the cluster only through [`ClusterClient`], so it
//! can be driven by an in-memory fake in tests. [`KubeClusterClient`] is the
//! implementation backed by a live [`kube::Client`].

use crate::constants::{ENV_POD_NAME, ENV_POD_NAMESPACE, KUBE_LIST_PAGE_SIZE};
use crate::errors::StatusError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::{debug, warn};

const NODE_INTERNAL_IP: &str = "InternalIP";
const NODE_EXTERNAL_IP: &str = "ExternalIP";

/// Identity of the pod running this controller.
///
/// Built once at startup by [`get_pod_details`] and passed to whoever needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    /// Internal IP of the node the pod is scheduled on, empty if unknown
    pub node_ip: String,
    pub labels: BTreeMap<String, String>,
}

impl PodInfo {
    /// Equality label selector matching every pod carrying this pod's labels.
    #[must_use]
    pub fn label_selector(&self) -> String {
        self.labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Cluster operations needed by the status reconciler.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, kube::Error>;

    /// List pods in `namespace` matching an equality label selector.
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, kube::Error>;

    async fn get_node(&self, name: &str) -> Result<Node, kube::Error>;

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, kube::Error>;

    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Ingress, kube::Error>;

    /// Write the load balancer status of `ingress` through the status subresource.
    async fn update_ingress_status(&self, ingress: &Ingress) -> Result<(), kube::Error>;
}

/// [`ClusterClient`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, kube::Error> {
        Api::<Pod>::namespaced(self.client.clone(), namespace)
            .get(name)
            .await
    }

    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, kube::Error> {
        let api = Api::<Pod>::namespaced(self.client.clone(), namespace);
        list_all_paginated(&api, ListParams::default().labels(selector)).await
    }

    async fn get_node(&self, name: &str) -> Result<Node, kube::Error> {
        Api::<Node>::all(self.client.clone()).get(name).await
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, kube::Error> {
        Api::<Service>::namespaced(self.client.clone(), namespace)
            .get(name)
            .await
    }

    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Ingress, kube::Error> {
        Api::<Ingress>::namespaced(self.client.clone(), namespace)
            .get(name)
            .await
    }

    async fn update_ingress_status(&self, ingress: &Ingress) -> Result<(), kube::Error> {
        let namespace = ingress.namespace().unwrap_or_default();
        let api = Api::<Ingress>::namespaced(self.client.clone(), &namespace);

        // Merge patches replace lists wholesale, so an empty list clears the status.
        let patch = json!({
            "status": ingress.status
        });

        api.patch_status(
            &ingress.name_any(),
            &PatchParams::default(),
            &Patch::Merge(&patch),
        )
        .await?;

        Ok(())
    }
}

/// List all resources matching `list_params`, one page at a time.
///
/// # Errors
///
/// Returns the first API error encountered.
pub async fn list_all_paginated<K>(
    api: &Api<K>,
    mut list_params: ListParams,
) -> Result<Vec<K>, kube::Error>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    list_params.limit = Some(KUBE_LIST_PAGE_SIZE);

    let mut all_items = Vec::new();
    let mut page_count = 0;

    loop {
        page_count += 1;
        let result = api.list(&list_params).await?;
        all_items.extend(result.items);

        match result.metadata.continue_ {
            Some(token) if !token.is_empty() => list_params.continue_token = Some(token),
            _ => break,
        }
    }

    debug!(
        kind = %K::kind(&()),
        total_pages = page_count,
        total_items = all_items.len(),
        "Completed paginated list operation"
    );

    Ok(all_items)
}

/// Address of `node` of the requested kind.
///
/// With `use_internal_ip` only `InternalIP` entries are considered, otherwise
/// only `ExternalIP` entries. The first non-empty match wins.
#[must_use]
pub fn node_address(node: &Node, use_internal_ip: bool) -> Option<String> {
    let wanted = if use_internal_ip {
        NODE_INTERNAL_IP
    } else {
        NODE_EXTERNAL_IP
    };

    node.status
        .as_ref()?
        .addresses
        .as_ref()?
        .iter()
        .find(|a| a.type_ == wanted && !a.address.is_empty())
        .map(|a| a.address.clone())
}

/// IP of the named node, `None` when the node cannot be read or has no such address.
pub async fn get_node_ip(
    client: &dyn ClusterClient,
    node_name: &str,
    use_internal_ip: bool,
) -> Option<String> {
    match client.get_node(node_name).await {
        Ok(node) => node_address(&node, use_internal_ip),
        Err(e) => {
            warn!(node = %node_name, error = %e, "unable to read node");
            None
        }
    }
}

/// Load the identity of the running pod from `POD_NAME`/`POD_NAMESPACE`.
///
/// # Errors
///
/// Returns [`StatusError::MissingPodIdentity`] when either variable is unset or
/// empty, [`StatusError::PodNotFound`] when the pod does not exist and
/// [`StatusError::Kube`] for other API failures.
pub async fn get_pod_details(client: &dyn ClusterClient) -> Result<PodInfo, StatusError> {
    let name = std::env::var(ENV_POD_NAME).unwrap_or_default();
    let namespace = std::env::var(ENV_POD_NAMESPACE).unwrap_or_default();

    if name.is_empty() || namespace.is_empty() {
        return Err(StatusError::MissingPodIdentity);
    }

    let pod = match client.get_pod(&namespace, &name).await {
        Ok(pod) => pod,
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            return Err(StatusError::PodNotFound { namespace, name })
        }
        Err(e) => return Err(e.into()),
    };

    let node_name = pod
        .spec
        .as_ref()
        .and_then(|s| s.node_name.clone())
        .unwrap_or_default();
    let node_ip = get_node_ip(client, &node_name, true)
        .await
        .unwrap_or_default();

    Ok(PodInfo {
        name,
        namespace,
        node_ip,
        labels: pod.labels().clone(),
    })
}

#[cfg(test)]
#[path = "k8s_tests.rs"]
mod k8s_tests;

#[cfg(test)]
#[path = "k8s_fake.rs"]
pub(crate) mod fake;
