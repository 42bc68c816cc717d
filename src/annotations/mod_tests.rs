// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the annotation registry and extractor.

#[cfg(test)]
mod tests {
    use crate::annotations::secureupstream::{AuthCertificate, AuthCertificateResolver};
    use crate::annotations::test_support::ingress_with;
    use crate::annotations::*;
    use crate::constants::*;
    use crate::defaults::DefaultBackend;
    use std::sync::Arc;

    struct NoCerts;

    impl AuthCertificateResolver for NoCerts {
        fn auth_certificate(&self, _secret: &str) -> Option<AuthCertificate> {
            None
        }
    }

    fn extractor(backend: DefaultBackend) -> AnnotationExtractor {
        AnnotationExtractor::new(Arc::new(backend), Arc::new(NoCerts))
    }

    #[test]
    fn test_feature_names_are_unique() {
        let mut names: Vec<&str> = Feature::ALL.iter().map(|f| f.name()).collect();
        names.sort_unstable();
        names.dedup();

        assert_eq!(names.len(), Feature::ALL.len());
    }

    #[test]
    fn test_extract_without_annotations_uses_defaults() {
        let backend = DefaultBackend {
            use_port_in_redirects: true,
            whitelist_source_range: vec!["10.0.0.0/8".to_string()],
            ..DefaultBackend::default()
        };

        let resolved = extractor(backend).extract(&ingress_with(&[]));

        assert!(!resolved.is_degraded());
        assert!(!resolved.cors.cors_enabled);
        assert_eq!(resolved.proxy.connect_timeout, 5);
        assert!(resolved.port_in_redirect);
        assert!(!resolved.service_upstream);
        assert!(!resolved.ssl_passthrough.has_ssl_passthrough);
        assert_eq!(resolved.whitelist.cidr, vec!["10.0.0.0/8".to_string()]);
        assert!(resolved.rewrite.ssl_redirect);
    }

    #[test]
    fn test_extract_records_errors_per_feature() {
        let ing = ingress_with(&[
            (ANN_SECURE_BACKENDS, "true"),
            (ANN_SECURE_VERIFY_CA_SECRET, "missing-ca"),
            (ANN_WHITELIST_SOURCE_RANGE, "not-an-ip"),
            (ANN_SERVICE_UPSTREAM, "true"),
        ]);
        let backend = DefaultBackend {
            whitelist_source_range: vec!["192.168.0.0/16".to_string()],
            ..DefaultBackend::default()
        };

        let resolved = extractor(backend).extract(&ing);

        assert!(resolved.is_degraded());
        assert!(resolved.is_location_denied());
        assert_eq!(resolved.errors.len(), 2);
        assert!(resolved.errors.contains_key(&Feature::SecureUpstream));
        assert!(resolved.errors.contains_key(&Feature::Whitelist));
        assert_eq!(resolved.whitelist.cidr, vec!["192.168.0.0/16".to_string()]);
        assert!(resolved.service_upstream);
    }

    #[test]
    fn test_feature_parse_returns_tagged_config() {
        let ing = ingress_with(&[(ANN_SSL_PASSTHROUGH, "true")]);

        let config = Feature::SslPassthrough
            .parse(&ing, &DefaultBackend::default(), &NoCerts)
            .unwrap();

        assert!(matches!(
            config,
            FeatureConfig::SslPassthrough(sslpassthrough::SslPassthrough {
                has_ssl_passthrough: true,
                ..
            })
        ));
    }

    #[test]
    fn test_resolved_annotations_equality() {
        let ex = extractor(DefaultBackend::default());
        let a = ex.extract(&ingress_with(&[(ANN_WHITELIST_SOURCE_RANGE, "1.1.1.1,2.2.2.2")]));
        let b = ex.extract(&ingress_with(&[(ANN_WHITELIST_SOURCE_RANGE, "2.2.2.2,1.1.1.1")]));
        let c = ex.extract(&ingress_with(&[(ANN_PROXY_READ_TIMEOUT, "1")]));

        assert!(a.config_eq(&a));
        assert!(a.config_eq(&b));
        assert!(!a.config_eq(&c));
        assert!(None::<IngressAnnotations>.config_eq(&None));
        assert!(!Some(a).config_eq(&None));
    }
}
