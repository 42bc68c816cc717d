// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::annotations::secureupstream::*;
    use crate::annotations::test_support::ingress_with;
    use crate::constants::{ANN_SECURE_BACKENDS, ANN_SECURE_VERIFY_CA_SECRET};
    use crate::errors::AnnotationError;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MockCerts {
        certs: HashMap<String, AuthCertificate>,
    }

    impl MockCerts {
        fn with(secret: &str) -> Self {
            let mut certs = HashMap::new();
            certs.insert(
                secret.to_string(),
                AuthCertificate {
                    secret: secret.to_string(),
                    ca_file_name: "/var/haproxy/ssl/ca/default_secure-verify-ca.pem".to_string(),
                },
            );
            Self { certs }
        }
    }

    impl AuthCertificateResolver for MockCerts {
        fn auth_certificate(&self, secret: &str) -> Option<AuthCertificate> {
            self.certs.get(secret).cloned()
        }
    }

    #[test]
    fn test_secure_with_ca() {
        let ing = ingress_with(&[
            (ANN_SECURE_BACKENDS, "true"),
            (ANN_SECURE_VERIFY_CA_SECRET, "secure-verify-ca"),
        ]);

        let upstream = parse(&ing, &MockCerts::with("default/secure-verify-ca")).unwrap();

        assert!(upstream.secure);
        assert_eq!(upstream.ca_cert.secret, "default/secure-verify-ca");
    }

    #[test]
    fn test_secret_not_found() {
        let ing = ingress_with(&[
            (ANN_SECURE_BACKENDS, "true"),
            (ANN_SECURE_VERIFY_CA_SECRET, "secure-verify-ca"),
        ]);

        assert_eq!(
            parse(&ing, &MockCerts::default()),
            Err(AnnotationError::SecretNotFound {
                name: "default/secure-verify-ca".to_string()
            })
        );
    }

    #[test]
    fn test_secret_on_non_secure() {
        let ing = ingress_with(&[
            (ANN_SECURE_BACKENDS, "false"),
            (ANN_SECURE_VERIFY_CA_SECRET, "secure-verify-ca"),
        ]);

        let err = parse(&ing, &MockCerts::with("default/secure-verify-ca")).unwrap_err();

        assert_eq!(
            err.to_string(),
            "configuration error: trying to use CA from secret default/secure-verify-ca on a non secure backend"
        );
    }

    #[test]
    fn test_secure_without_ca() {
        let upstream = parse(
            &ingress_with(&[(ANN_SECURE_BACKENDS, "true")]),
            &MockCerts::default(),
        )
        .unwrap();

        assert!(upstream.secure);
        assert_eq!(upstream.ca_cert, AuthCertificate::default());
    }

    #[test]
    fn test_full_resource_name() {
        let certs = MockCerts::default();

        assert_eq!(certs.full_resource_name("ca", "default"), "default/ca");
        assert_eq!(certs.full_resource_name("", "default"), "");
    }
}
