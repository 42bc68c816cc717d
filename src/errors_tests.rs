// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for error types.

#[cfg(test)]
mod tests {
    use crate::annotations::ipwhitelist::SourceRange;
    use crate::errors::*;

    #[test]
    fn test_missing_annotation_is_distinguished() {
        assert!(AnnotationError::MissingAnnotations.is_missing_annotation());
        assert!(!AnnotationError::Configuration("x".to_string()).is_missing_annotation());
    }

    #[test]
    fn test_location_denied_message() {
        let error = AnnotationError::LocationDenied {
            reason: "the annotation does not contain a valid IP address or network".to_string(),
            fallback: SourceRange::default(),
        };

        assert!(error.is_location_denied());
        assert_eq!(
            error.to_string(),
            "location denied, reason: the annotation does not contain a valid IP address or network"
        );
    }

    #[test]
    fn test_secret_not_found_message() {
        let error = AnnotationError::SecretNotFound {
            name: "default/secure-verify-ca".to_string(),
        };

        assert_eq!(error.to_string(), "secret not found: default/secure-verify-ca");
    }

    #[test]
    fn test_invalid_content_message() {
        let error = AnnotationError::InvalidContent {
            name: "ingress.kubernetes.io/cors-max-age".to_string(),
            value: "abc".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "annotation ingress.kubernetes.io/cors-max-age contains invalid value 'abc'"
        );
    }

    #[test]
    fn test_cache_error_message() {
        let error = CacheError {
            kind: "service",
            reason: "store not ready".to_string(),
        };

        assert_eq!(error.to_string(), "service cache lookup failed: store not ready");
    }

    #[test]
    fn test_status_error_messages() {
        assert_eq!(
            StatusError::MissingPodIdentity.to_string(),
            "unable to get POD information (missing POD_NAME or POD_NAMESPACE environment variable)"
        );
        assert_eq!(
            StatusError::InvalidName("ingress".to_string()).to_string(),
            "invalid format (namespace/name) found in 'ingress'"
        );
        assert_eq!(
            StatusError::PodNotFound {
                namespace: "ingress".to_string(),
                name: "haproxy-0".to_string(),
            }
            .to_string(),
            "unable to get POD information: pod ingress/haproxy-0 not found"
        );
    }
}
