// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Integration tests for the TCP services converter running on reflector stores.
//!
//! The stores are fed through reflector writers the same way the controller's
//! watchers feed them, so these tests need no cluster.

use haproxy_ingress::context::Stores;
use haproxy_ingress::tcp_services::{ProxyVersion, TcpServicesConverter};
use k8s_openapi::api::core::v1::{
    ConfigMap, EndpointAddress, EndpointPort, EndpointSubset, Endpoints, ObjectReference, Secret,
    Service, ServicePort, ServiceSpec,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::runtime::reflector::store;
use kube::runtime::watcher::Event;
use std::collections::BTreeMap;

// ============================================================================
// Helper Functions
// ============================================================================

fn meta(namespace: &str, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

fn service(namespace: &str, name: &str, port: i32, port_name: Option<&str>) -> Service {
    Service {
        metadata: meta(namespace, name),
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                name: port_name.map(String::from),
                port,
                target_port: Some(IntOrString::Int(port)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    }
}

fn endpoints(namespace: &str, name: &str, port: i32, port_name: Option<&str>, ips: &[&str]) -> Endpoints {
    Endpoints {
        metadata: meta(namespace, name),
        subsets: Some(vec![EndpointSubset {
            addresses: Some(
                ips.iter()
                    .enumerate()
                    .map(|(i, ip)| EndpointAddress {
                        ip: (*ip).to_string(),
                        target_ref: Some(ObjectReference {
                            kind: Some("Pod".to_string()),
                            namespace: Some(namespace.to_string()),
                            name: Some(format!("{name}-{i}")),
                            ..Default::default()
                        }),
                        ..Default::default()
                    })
                    .collect(),
            ),
            ports: Some(vec![EndpointPort {
                name: port_name.map(String::from),
                port,
                ..Default::default()
            }]),
            ..Default::default()
        }]),
    }
}

fn tls_secret(namespace: &str, name: &str) -> Secret {
    Secret {
        metadata: meta(namespace, name),
        data: Some(BTreeMap::from([
            ("tls.crt".to_string(), ByteString(b"cert".to_vec())),
            ("tls.key".to_string(), ByteString(b"key".to_vec())),
        ])),
        ..Default::default()
    }
}

fn stores(services: Vec<Service>, eps: Vec<Endpoints>, secrets: Vec<Secret>) -> Stores {
    let (ingress_reader, _) = store::<Ingress>();
    let (service_reader, mut service_writer) = store::<Service>();
    let (endpoints_reader, mut endpoints_writer) = store::<Endpoints>();
    let (secret_reader, mut secret_writer) = store::<Secret>();
    let (cm_reader, _) = store::<ConfigMap>();

    for svc in services {
        service_writer.apply_watcher_event(&Event::Apply(svc));
    }
    for ep in eps {
        endpoints_writer.apply_watcher_event(&Event::Apply(ep));
    }
    for secret in secrets {
        secret_writer.apply_watcher_event(&Event::Apply(secret));
    }

    let stores = Stores::new(
        ingress_reader,
        service_reader,
        endpoints_reader,
        secret_reader,
        cm_reader,
        "/var/haproxy/ssl",
    );
    stores.mark_synced();
    stores
}

fn table(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_full_table_against_stores() {
    let stores = stores(
        vec![
            service("db", "postgres", 5432, None),
            service("cache", "redis", 6379, Some("redis")),
        ],
        vec![
            endpoints("db", "postgres", 5432, None, &["10.1.0.1", "10.1.0.2"]),
            endpoints("cache", "redis", 6379, Some("redis"), &["10.2.0.1"]),
        ],
        vec![tls_secret("db", "pg-tls")],
    );

    let outcome = TcpServicesConverter::new(&stores)
        .sync(&table(&[
            ("5432", "db/postgres:5432:proxy:proxy-v2:db/pg-tls"),
            ("6379", "cache/redis:redis"),
            ("9000", "missing/service:9000"),
        ]))
        .unwrap();

    assert_eq!(outcome.backends.len(), 2);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].reason(), "service_not_found");

    let redis = &outcome.backends[0];
    assert_eq!(redis.name, "cache_redis");
    assert_eq!(redis.port, 6379);
    assert_eq!(redis.endpoints.len(), 1);
    assert!(redis.ssl.filename.is_empty());

    let pg = &outcome.backends[1];
    assert_eq!(pg.name, "db_postgres");
    assert_eq!(pg.port, 5432);
    assert!(pg.proxy_prot.decode);
    assert_eq!(pg.proxy_prot.encode_version, Some(ProxyVersion::V2));
    assert_eq!(pg.ssl.filename, "/var/haproxy/ssl/db_pg-tls.pem");

    let names: Vec<_> = pg.endpoints.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["srv001", "srv002"]);
    assert_eq!(pg.endpoints[0].ip, "10.1.0.1");
    assert_eq!(pg.endpoints[0].target, "db/postgres-0");
}

#[test]
fn test_unsynced_stores_abort_pass() {
    let (ingress_reader, _) = store::<Ingress>();
    let (service_reader, _) = store::<Service>();
    let (endpoints_reader, _) = store::<Endpoints>();
    let (secret_reader, _) = store::<Secret>();
    let (cm_reader, _) = store::<ConfigMap>();
    let stores = Stores::new(
        ingress_reader,
        service_reader,
        endpoints_reader,
        secret_reader,
        cm_reader,
        "/var/haproxy/ssl",
    );

    let result = TcpServicesConverter::new(&stores).sync(&table(&[("5432", "db/postgres:5432")]));

    assert!(result.is_err(), "sync must fail before caches are synced");
}

#[test]
fn test_missing_secret_skips_only_that_entry() {
    let stores = stores(
        vec![service("db", "postgres", 5432, None)],
        vec![endpoints("db", "postgres", 5432, None, &["10.1.0.1"])],
        Vec::new(),
    );

    let outcome = TcpServicesConverter::new(&stores)
        .sync(&table(&[
            ("5432", "db/postgres:5432:::db/missing"),
            ("5433", "db/postgres:5432"),
        ]))
        .unwrap();

    assert_eq!(outcome.backends.len(), 1);
    assert_eq!(outcome.backends[0].port, 5433);
    assert_eq!(outcome.skipped[0].reason(), "secret_not_found");
}

#[test]
fn test_repeated_sync_yields_equal_backends() {
    let stores = stores(
        vec![service("db", "postgres", 5432, None)],
        vec![endpoints("db", "postgres", 5432, None, &["10.1.0.1", "10.1.0.2"])],
        Vec::new(),
    );
    let entries = table(&[("5432", "db/postgres:5432")]);
    let converter = TcpServicesConverter::new(&stores);

    let first = converter.sync(&entries).unwrap();
    let second = converter.sync(&entries).unwrap();

    assert_eq!(first.backends, second.backends);
}
