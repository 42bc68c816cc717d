// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::annotations::proxy::*;
    use crate::annotations::test_support::ingress_with;
    use crate::defaults::DefaultBackend;

    fn mock_backend() -> DefaultBackend {
        DefaultBackend {
            proxy_connect_timeout: 10,
            proxy_send_timeout: 15,
            proxy_read_timeout: 20,
            proxy_buffer_size: "10k".to_string(),
            proxy_body_size: "3k".to_string(),
            proxy_next_upstream: "error".to_string(),
            proxy_pass_params: "nocanon keepalive=On".to_string(),
            proxy_request_buffering: "on".to_string(),
            ..DefaultBackend::default()
        }
    }

    #[test]
    fn test_proxy_annotations() {
        let ing = ingress_with(&[
            (ANN_PROXY_CONNECT_TIMEOUT, "1"),
            (ANN_PROXY_SEND_TIMEOUT, "2"),
            (ANN_PROXY_READ_TIMEOUT, "3"),
            (ANN_PROXY_BUFFER_SIZE, "1k"),
            (ANN_PROXY_BODY_SIZE, "2k"),
            (ANN_PROXY_NEXT_UPSTREAM, "off"),
            (ANN_PROXY_PASS_PARAMS, "smax=5 max=10"),
            (ANN_PROXY_REQUEST_BUFFERING, "off"),
        ]);

        let proxy = parse(&ing, &mock_backend());

        assert_eq!(proxy.connect_timeout, 1);
        assert_eq!(proxy.send_timeout, 2);
        assert_eq!(proxy.read_timeout, 3);
        assert_eq!(proxy.buffer_size, "1k");
        assert_eq!(proxy.body_size, "2k");
        assert_eq!(proxy.next_upstream, "off");
        assert_eq!(proxy.pass_params, "smax=5 max=10");
        assert_eq!(proxy.request_buffering, "off");
    }

    #[test]
    fn test_proxy_falls_back_to_default_backend() {
        let proxy = parse(&ingress_with(&[]), &mock_backend());

        assert_eq!(proxy.connect_timeout, 10);
        assert_eq!(proxy.send_timeout, 15);
        assert_eq!(proxy.read_timeout, 20);
        assert_eq!(proxy.buffer_size, "10k");
        assert_eq!(proxy.body_size, "3k");
        assert_eq!(proxy.next_upstream, "error");
        assert_eq!(proxy.pass_params, "nocanon keepalive=On");
        assert_eq!(proxy.request_buffering, "on");
    }

    #[test]
    fn test_proxy_invalid_int_falls_back() {
        let ing = ingress_with(&[(ANN_PROXY_CONNECT_TIMEOUT, "10s")]);

        assert_eq!(parse(&ing, &mock_backend()).connect_timeout, 10);
    }

    #[test]
    fn test_proxy_empty_string_falls_back() {
        let ing = ingress_with(&[(ANN_PROXY_BUFFER_SIZE, "")]);

        assert_eq!(parse(&ing, &mock_backend()).buffer_size, "10k");
    }

    #[test]
    fn test_proxy_body_size_validation() {
        for (value, expected) in [
            ("10", "10"),
            ("1g", "1g"),
            ("unlimited", ""),
            ("10M", ""),
            ("1m;return 200", ""),
        ] {
            let ing = ingress_with(&[(ANN_PROXY_BODY_SIZE, value)]);
            assert_eq!(parse(&ing, &mock_backend()).body_size, expected, "{value}");
        }
    }

    #[test]
    fn test_proxy_removing_annotation_reverts_to_default_tier() {
        let with = parse(&ingress_with(&[(ANN_PROXY_READ_TIMEOUT, "99")]), &mock_backend());
        let without = parse(&ingress_with(&[]), &mock_backend());

        assert_eq!(with.read_timeout, 99);
        assert_eq!(without.read_timeout, 20);
        assert_ne!(with, without);
    }
}
