// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the annotation accessors.

#[cfg(test)]
mod tests {
    use crate::annotations::parser::*;
    use crate::annotations::test_support::ingress_with;
    use crate::errors::AnnotationError;

    #[test]
    fn test_missing_annotations() {
        let ing = ingress_with(&[]);

        assert_eq!(get_string("a", &ing), Err(AnnotationError::MissingAnnotations));
        assert_eq!(get_bool("a", &ing), Err(AnnotationError::MissingAnnotations));
        assert_eq!(get_int("a", &ing), Err(AnnotationError::MissingAnnotations));
    }

    #[test]
    fn test_get_bool() {
        let ing = ingress_with(&[("yes", "True"), ("no", "0"), ("bad", "nope")]);

        assert_eq!(get_bool("yes", &ing), Ok(true));
        assert_eq!(get_bool("no", &ing), Ok(false));
        assert_eq!(
            get_bool("bad", &ing),
            Err(AnnotationError::InvalidContent {
                name: "bad".to_string(),
                value: "nope".to_string(),
            })
        );
    }

    #[test]
    fn test_get_int() {
        let ing = ingress_with(&[("port", "8080"), ("bad", "80a")]);

        assert_eq!(get_int("port", &ing), Ok(8080));
        assert!(matches!(
            get_int("bad", &ing),
            Err(AnnotationError::InvalidContent { .. })
        ));
    }

    #[test]
    fn test_get_string_keeps_empty_value() {
        let ing = ingress_with(&[("empty", "")]);

        assert_eq!(get_string("empty", &ing), Ok(String::new()));
    }

    #[test]
    fn test_ingress_key() {
        assert_eq!(ingress_key(&ingress_with(&[])), "default/foo");
    }
}
