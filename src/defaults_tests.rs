// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the default backend.

#[cfg(test)]
mod tests {
    use crate::defaults::*;
    use std::collections::BTreeMap;

    fn data(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_builtin_defaults() {
        let backend = DefaultBackend::default();

        assert_eq!(backend.proxy_connect_timeout, 5);
        assert_eq!(backend.proxy_body_size, "1m");
        assert!(backend.ssl_redirect);
        assert!(!backend.use_port_in_redirects);
        assert!(backend.whitelist_source_range.is_empty());
    }

    #[test]
    fn test_from_config_map_data_overrides_known_keys() {
        let backend = DefaultBackend::from_config_map_data(&data(&[
            ("proxy-connect-timeout", "10"),
            ("proxy-buffer-size", "10k"),
            ("ssl-redirect", "false"),
            ("whitelist-source-range", "10.0.0.0/8, 192.168.0.0/16,"),
            ("unknown-key", "whatever"),
        ]));

        assert_eq!(backend.proxy_connect_timeout, 10);
        assert_eq!(backend.proxy_buffer_size, "10k");
        assert!(!backend.ssl_redirect);
        assert_eq!(
            backend.whitelist_source_range,
            vec!["10.0.0.0/8".to_string(), "192.168.0.0/16".to_string()]
        );
    }

    #[test]
    fn test_from_config_map_data_keeps_default_on_invalid_value() {
        let backend = DefaultBackend::from_config_map_data(&data(&[
            ("proxy-read-timeout", "sixty"),
            ("use-port-in-redirects", "maybe"),
        ]));

        assert_eq!(backend.proxy_read_timeout, 60);
        assert!(!backend.use_port_in_redirects);
    }

    #[test]
    fn test_from_config_map_data_bad_value_only_affects_its_field() {
        let backend = DefaultBackend::from_config_map_data(&data(&[
            ("proxy-connect-timeout", "ten"),
            ("proxy-send-timeout", " 15 "),
            ("ssl-redirect", "nah"),
            ("use-port-in-redirects", "true"),
            ("not-a-backend-key", "42"),
        ]));

        assert_eq!(backend.proxy_connect_timeout, 5);
        assert_eq!(backend.proxy_send_timeout, 15);
        assert!(backend.ssl_redirect);
        assert!(backend.use_port_in_redirects);
        assert_eq!(backend.proxy_read_timeout, 60);
    }

    #[test]
    fn test_from_config_map_data_empty() {
        assert_eq!(
            DefaultBackend::from_config_map_data(&BTreeMap::new()),
            DefaultBackend::default()
        );
    }

    #[test]
    fn test_shared_default_backend_replace() {
        let shared = SharedDefaultBackend::new(DefaultBackend::default());
        let reader = shared.clone();

        shared.replace(DefaultBackend {
            proxy_connect_timeout: 42,
            ..DefaultBackend::default()
        });

        assert_eq!(reader.default_backend().proxy_connect_timeout, 42);
    }
}
