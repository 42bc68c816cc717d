// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed accessors over the raw annotation map of an Ingress.
//!
//! Every accessor reports an absent key as [`AnnotationError::MissingAnnotations`]
//! so callers can tell "unset" apart from "set to an invalid value".

use crate::errors::AnnotationError;
use crate::validation::parse_bool;
use k8s_openapi::api::networking::v1::Ingress;

/// Look up the raw value of an annotation.
///
/// # Errors
///
/// Returns [`AnnotationError::MissingAnnotations`] when the Ingress carries no
/// annotations or does not carry `name`.
pub fn get_raw<'a>(name: &str, ing: &'a Ingress) -> Result<&'a str, AnnotationError> {
    ing.metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(name))
        .map(String::as_str)
        .ok_or(AnnotationError::MissingAnnotations)
}

/// Read a string annotation.
///
/// # Errors
///
/// Returns [`AnnotationError::MissingAnnotations`] if the key is absent.
pub fn get_string(name: &str, ing: &Ingress) -> Result<String, AnnotationError> {
    get_raw(name, ing).map(str::to_string)
}

/// Read a boolean annotation using the permissive parse.
///
/// # Errors
///
/// Returns [`AnnotationError::MissingAnnotations`] if the key is absent and
/// [`AnnotationError::InvalidContent`] if the value is not a boolean.
pub fn get_bool(name: &str, ing: &Ingress) -> Result<bool, AnnotationError> {
    let value = get_raw(name, ing)?;
    parse_bool(value).ok_or_else(|| AnnotationError::InvalidContent {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Read an integer annotation.
///
/// # Errors
///
/// Returns [`AnnotationError::MissingAnnotations`] if the key is absent and
/// [`AnnotationError::InvalidContent`] if the value is not a 32-bit integer.
pub fn get_int(name: &str, ing: &Ingress) -> Result<i32, AnnotationError> {
    let value = get_raw(name, ing)?;
    value
        .parse()
        .map_err(|_| AnnotationError::InvalidContent {
            name: name.to_string(),
            value: value.to_string(),
        })
}

/// `namespace/name` of an Ingress for log fields.
#[must_use]
pub fn ingress_key(ing: &Ingress) -> String {
    format!(
        "{}/{}",
        ing.metadata.namespace.as_deref().unwrap_or_default(),
        ing.metadata.name.as_deref().unwrap_or_default()
    )
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod parser_tests;
