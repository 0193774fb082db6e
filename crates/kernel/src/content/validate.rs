//! Block value validation.
//!
//! Checks a parsed value against the constraints of its schema. Shape errors
//! are caught earlier by `to_value`; this pass covers presence, occurrence
//! counts and scalar bounds.

use url::Url;

use super::schema::{BlockKind, BlockType, ScalarKind};
use super::value::{BlockValue, ScalarValue, StreamChild};

/// Validate `value` against `schema`.
///
/// Returns a list of error messages (empty if valid).
pub fn validate_value(schema: &BlockType, value: &BlockValue) -> Vec<String> {
    let mut errors = Vec::new();
    check(schema, value, &schema.name, &mut errors);
    errors
}

fn check(schema: &BlockType, value: &BlockValue, path: &str, errors: &mut Vec<String>) {
    if schema.constraints.required && value.is_empty() {
        errors.push(format!("{path}: this field is required"));
        return;
    }

    match (&schema.kind, value) {
        (BlockKind::Struct(fields), BlockValue::Struct(values)) => {
            for field in fields {
                if let Some((_, v)) = values.iter().find(|(name, _)| *name == field.name) {
                    check(field, v, &format!("{path}.{}", field.name), errors);
                }
            }
        }
        (BlockKind::Stream(variants), BlockValue::Stream(children)) => {
            check_count(schema, children.len(), path, errors);
            for variant in variants {
                let count = children.iter().filter(|c| c.block_type == variant.name).count();
                check_variant_count(variant, count, path, errors);
            }
            for (i, child) in children.iter().enumerate() {
                match variants.iter().find(|v| v.name == child.block_type) {
                    Some(variant) => check_child(variant, child, &format!("{path}[{i}]"), errors),
                    None => errors.push(format!(
                        "{path}[{i}]: unknown block type '{}'",
                        child.block_type
                    )),
                }
            }
        }
        (BlockKind::List(item), BlockValue::List(children)) => {
            check_count(schema, children.len(), path, errors);
            for (i, child) in children.iter().enumerate() {
                check(item, &child.value, &format!("{path}[{i}]"), errors);
            }
        }
        (BlockKind::Scalar(kind), BlockValue::Scalar(scalar)) => {
            check_scalar(kind, scalar, path, errors);
        }
        _ => errors.push(format!("{path}: value does not match the block shape")),
    }
}

fn check_child(variant: &BlockType, child: &StreamChild, path: &str, errors: &mut Vec<String>) {
    check(variant, &child.value, &format!("{path}.{}", variant.name), errors);
}

fn check_count(schema: &BlockType, count: usize, path: &str, errors: &mut Vec<String>) {
    if let Some(min) = schema.constraints.min_num.filter(|&m| count < m) {
        errors.push(format!(
            "{path}: requires at least {min} block(s), found {count}"
        ));
    }
    if let Some(max) = schema.constraints.max_num.filter(|&m| count > m) {
        errors.push(format!(
            "{path}: allows at most {max} block(s), found {count}"
        ));
    }
}

fn check_variant_count(variant: &BlockType, count: usize, path: &str, errors: &mut Vec<String>) {
    let name = &variant.name;
    if let Some(min) = variant.constraints.min_num.filter(|&m| count < m) {
        errors.push(format!(
            "{path}: requires at least {min} '{name}' block(s), found {count}"
        ));
    }
    if let Some(max) = variant.constraints.max_num.filter(|&m| count > m) {
        errors.push(format!(
            "{path}: allows at most {max} '{name}' block(s), found {count}"
        ));
    }
}

fn check_scalar(kind: &ScalarKind, scalar: &ScalarValue, path: &str, errors: &mut Vec<String>) {
    match (kind, scalar) {
        (ScalarKind::Text { max_length: Some(max) }, ScalarValue::Text(s)) => {
            // Count chars, not bytes
            let len = s.chars().count();
            if len > *max {
                errors.push(format!(
                    "{path}: must be at most {max} characters, found {len}"
                ));
            }
        }
        (ScalarKind::Integer { min, max }, ScalarValue::Integer(n)) => {
            if let Some(min) = min.filter(|m| n < m) {
                errors.push(format!("{path}: must be at least {min}, found {n}"));
            }
            if let Some(max) = max.filter(|m| n > m) {
                errors.push(format!("{path}: must be at most {max}, found {n}"));
            }
        }
        (ScalarKind::Choice { choices }, ScalarValue::Choice(s)) => {
            if !s.is_empty() && !choices.iter().any(|c| c.value == *s) {
                errors.push(format!("{path}: '{s}' is not a valid choice"));
            }
        }
        (ScalarKind::Url, ScalarValue::Url(s)) => {
            if !s.is_empty() && !is_acceptable_url(s) {
                errors.push(format!("{path}: '{s}' is not a valid URL"));
            }
        }
        _ => {}
    }
}

/// Absolute http(s)/mailto URLs, or site-relative paths and fragments.
fn is_acceptable_url(s: &str) -> bool {
    let s = s.trim();
    if s.starts_with('/') || s.starts_with('#') {
        return true;
    }
    match Url::parse(s) {
        Ok(url) => matches!(url.scheme(), "http" | "https" | "mailto"),
        Err(_) => false,
    }
}
