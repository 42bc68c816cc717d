// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::annotations::portinredirect::parse;
    use crate::annotations::test_support::ingress_with;
    use crate::annotations::secureupstream::{AuthCertificate, AuthCertificateResolver};
    use crate::annotations::AnnotationExtractor;
    use crate::constants::{ANN_SERVICE_UPSTREAM, ANN_SSL_PASSTHROUGH, ANN_USE_PORT_IN_REDIRECTS};
    use crate::defaults::DefaultBackend;
    use std::sync::Arc;

    struct NoCerts;

    impl AuthCertificateResolver for NoCerts {
        fn auth_certificate(&self, _secret: &str) -> Option<AuthCertificate> {
            None
        }
    }

    #[test]
    fn test_port_in_redirect() {
        let cases = [
            ("false - default false", Some("false"), false, false),
            ("false - default true", Some("false"), true, false),
            ("no annotation - default false", None, false, false),
            ("no annotation - default true", None, true, true),
            ("true - default true", Some("true"), true, true),
            ("true - default false", Some("true"), false, true),
        ];

        for (title, annotation, default, expected) in cases {
            let ing = match annotation {
                Some(value) => ingress_with(&[(ANN_USE_PORT_IN_REDIRECTS, value)]),
                None => ingress_with(&[]),
            };
            let backend = DefaultBackend {
                use_port_in_redirects: default,
                ..DefaultBackend::default()
            };

            assert_eq!(parse(&ing, &backend), Ok(expected), "{title}");
        }
    }

    #[test]
    fn test_port_in_redirect_invalid_value_uses_default_backend() {
        let ing = ingress_with(&[(ANN_USE_PORT_IN_REDIRECTS, "yes")]);

        for default in [false, true] {
            let backend = DefaultBackend {
                use_port_in_redirects: default,
                ..DefaultBackend::default()
            };

            assert_eq!(parse(&ing, &backend), Ok(default), "default {default}");
        }
    }

    #[test]
    fn test_port_in_redirect_invalid_value_not_degraded() {
        let ing = ingress_with(&[
            (ANN_USE_PORT_IN_REDIRECTS, "yes"),
            (ANN_SERVICE_UPSTREAM, "nope"),
            (ANN_SSL_PASSTHROUGH, "on-ish"),
        ]);
        let backend = DefaultBackend {
            use_port_in_redirects: true,
            ..DefaultBackend::default()
        };
        let extractor = AnnotationExtractor::new(Arc::new(backend), Arc::new(NoCerts));

        let resolved = extractor.extract(&ing);

        assert!(resolved.port_in_redirect);
        assert!(!resolved.service_upstream);
        assert!(!resolved.ssl_passthrough.has_ssl_passthrough);
        assert!(!resolved.is_degraded(), "errors: {:?}", resolved.errors);
    }
}
