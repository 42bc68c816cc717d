// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`ClusterClient`] for unit tests.

use super::ClusterClient;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    LoadBalancerIngress, LoadBalancerStatus, Node, NodeAddress, NodeStatus, Pod, PodSpec, Service,
    ServiceSpec, ServiceStatus,
};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(kube::core::Status::failure(reason, reason).with_code(code).boxed())
}

fn not_found() -> kube::Error {
    api_error(404, "NotFound")
}

fn key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

pub fn pod(namespace: &str, name: &str, node: &str, labels: &[(&str, &str)]) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(
                labels
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            ),
            ..ObjectMeta::default()
        },
        spec: Some(PodSpec {
            node_name: Some(node.to_string()),
            ..PodSpec::default()
        }),
        status: None,
    }
}

pub fn node(name: &str, addresses: &[(&str, &str)]) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..ObjectMeta::default()
        },
        spec: None,
        status: Some(NodeStatus {
            addresses: Some(
                addresses
                    .iter()
                    .map(|(type_, address)| NodeAddress {
                        type_: (*type_).to_string(),
                        address: (*address).to_string(),
                    })
                    .collect(),
            ),
            ..NodeStatus::default()
        }),
    }
}

/// Service publishing `lb` (`(ip, hostname)` pairs) and `external_ips`.
pub fn service(namespace: &str, name: &str, lb: &[(&str, &str)], external_ips: &[&str]) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..ObjectMeta::default()
        },
        spec: Some(ServiceSpec {
            external_ips: Some(external_ips.iter().map(|s| (*s).to_string()).collect()),
            ..ServiceSpec::default()
        }),
        status: Some(ServiceStatus {
            load_balancer: Some(LoadBalancerStatus {
                ingress: Some(
                    lb.iter()
                        .map(|(ip, hostname)| LoadBalancerIngress {
                            ip: (!ip.is_empty()).then(|| (*ip).to_string()),
                            hostname: (!hostname.is_empty()).then(|| (*hostname).to_string()),
                            ..LoadBalancerIngress::default()
                        })
                        .collect(),
                ),
            }),
            ..ServiceStatus::default()
        }),
    }
}

#[derive(Default)]
pub struct FakeCluster {
    pub pods: Mutex<Vec<Pod>>,
    pub nodes: Mutex<BTreeMap<String, Node>>,
    pub services: Mutex<BTreeMap<String, Service>>,
    pub ingresses: Mutex<BTreeMap<String, Ingress>>,
    /// Every status write, in call order
    pub status_writes: Mutex<Vec<Ingress>>,
    /// `namespace/name` of ingresses whose status write fails
    pub failing_writes: Mutex<BTreeSet<String>>,
    pub fail_pod_list: AtomicBool,
    pub pod_lists: AtomicUsize,
}

impl FakeCluster {
    pub fn with_pod(self, pod: Pod) -> Self {
        self.pods.lock().unwrap().push(pod);
        self
    }

    pub fn with_node(self, node: Node) -> Self {
        self.nodes.lock().unwrap().insert(node.name_any(), node);
        self
    }

    pub fn with_service(self, service: Service) -> Self {
        let k = key(&service.namespace().unwrap_or_default(), &service.name_any());
        self.services.lock().unwrap().insert(k, service);
        self
    }

    pub fn with_ingress(self, ingress: Ingress) -> Self {
        let k = key(&ingress.namespace().unwrap_or_default(), &ingress.name_any());
        self.ingresses.lock().unwrap().insert(k, ingress);
        self
    }

    pub fn failing_write(self, namespace: &str, name: &str) -> Self {
        self.failing_writes
            .lock()
            .unwrap()
            .insert(key(namespace, name));
        self
    }

    pub fn writes(&self) -> Vec<Ingress> {
        self.status_writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, kube::Error> {
        self.pods
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.namespace().as_deref() == Some(namespace) && p.name_any() == name)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, kube::Error> {
        self.pod_lists.fetch_add(1, Ordering::SeqCst);
        if self.fail_pod_list.load(Ordering::SeqCst) {
            return Err(api_error(500, "InternalError"));
        }

        let wanted: Vec<(&str, &str)> = selector
            .split(',')
            .filter_map(|pair| pair.split_once('='))
            .collect();

        Ok(self
            .pods
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.namespace().as_deref() == Some(namespace))
            .filter(|p| {
                wanted
                    .iter()
                    .all(|(k, v)| p.labels().get(*k).map(String::as_str) == Some(*v))
            })
            .cloned()
            .collect())
    }

    async fn get_node(&self, name: &str) -> Result<Node, kube::Error> {
        self.nodes
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, kube::Error> {
        self.services
            .lock()
            .unwrap()
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(not_found)
    }

    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Ingress, kube::Error> {
        self.ingresses
            .lock()
            .unwrap()
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(not_found)
    }

    async fn update_ingress_status(&self, ingress: &Ingress) -> Result<(), kube::Error> {
        let k = key(&ingress.namespace().unwrap_or_default(), &ingress.name_any());
        if self.failing_writes.lock().unwrap().contains(&k) {
            return Err(api_error(409, "Conflict"));
        }

        self.status_writes.lock().unwrap().push(ingress.clone());
        self.ingresses.lock().unwrap().insert(k, ingress.clone());
        Ok(())
    }
}
