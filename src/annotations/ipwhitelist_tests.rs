// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::annotations::ipwhitelist::*;
    use crate::annotations::test_support::ingress_with;
    use crate::annotations::ConfigEqual;
    use crate::constants::ANN_WHITELIST_SOURCE_RANGE;
    use crate::defaults::DefaultBackend;
    use crate::errors::AnnotationError;

    fn backend(cidrs: &[&str]) -> DefaultBackend {
        DefaultBackend {
            whitelist_source_range: cidrs.iter().map(|c| (*c).to_string()).collect(),
            ..DefaultBackend::default()
        }
    }

    fn cidrs(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn test_whitelist_valid_entries_sorted() {
        let ing = ingress_with(&[(ANN_WHITELIST_SOURCE_RANGE, "2.2.2.2/32, 1.1.1.1/32")]);

        let range = parse(&ing, &backend(&[])).unwrap();

        assert_eq!(range.cidr, cidrs(&["1.1.1.1/32", "2.2.2.2/32"]));
    }

    #[test]
    fn test_whitelist_accepts_plain_addresses() {
        let ing = ingress_with(&[(ANN_WHITELIST_SOURCE_RANGE, "10.0.0.0/24,192.168.0.1")]);

        let range = parse(&ing, &backend(&[])).unwrap();

        assert_eq!(range.cidr, cidrs(&["10.0.0.0/24", "192.168.0.1"]));
    }

    #[test]
    fn test_whitelist_partial_failure_drops_invalid() {
        let ing = ingress_with(&[(ANN_WHITELIST_SOURCE_RANGE, "1.1.1.1/32, www, 2.2.2.2")]);

        let range = parse(&ing, &backend(&[])).unwrap();

        assert_eq!(range.cidr, cidrs(&["1.1.1.1/32", "2.2.2.2"]));
    }

    #[test]
    fn test_whitelist_all_invalid_denies_with_default() {
        let ing = ingress_with(&[(ANN_WHITELIST_SOURCE_RANGE, "www, 0.0.0")]);

        let err = parse(&ing, &backend(&["4.4.4.0/24", "3.3.3.0/24"])).unwrap_err();

        match err {
            AnnotationError::LocationDenied { reason, fallback } => {
                assert!(reason.starts_with("the annotation does not contain a valid IP address or network"));
                assert_eq!(fallback.cidr, cidrs(&["3.3.3.0/24", "4.4.4.0/24"]));
            }
            other => panic!("expected LocationDenied, got {other:?}"),
        }
    }

    #[test]
    fn test_whitelist_missing_uses_sorted_default() {
        let range = parse(&ingress_with(&[]), &backend(&["4.4.4.0/24", "3.3.3.0/24"])).unwrap();

        assert_eq!(range.cidr, cidrs(&["3.3.3.0/24", "4.4.4.0/24"]));
    }

    #[test]
    fn test_source_range_equality_ignores_order() {
        let a = SourceRange {
            cidr: cidrs(&["1.1.1.1/32", "2.2.2.2/32"]),
        };
        let b = SourceRange {
            cidr: cidrs(&["2.2.2.2/32", "1.1.1.1/32"]),
        };
        let c = SourceRange {
            cidr: cidrs(&["2.2.2.2/32"]),
        };

        assert!(a.config_eq(&b));
        assert!(b.config_eq(&a));
        assert!(!a.config_eq(&c));
        assert!(Some(a.clone()).config_eq(&Some(b)));
        assert!(!None::<SourceRange>.config_eq(&Some(a)));
    }
}
