//! Reference location and rewriting.
//!
//! Two flavours live here. The structural helpers work on raw JSON and
//! match reference positions by key name, which is what a foreign export
//! gives us before it has been parsed. The typed helpers walk a parsed
//! [`BlockValue`] and find references by their declared schema kind.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::schema::ReferenceKind;
use super::value::{BlockValue, ExternalReference, ReferenceId, ScalarValue};
use crate::error::{ImportError, ImportResult};

/// Keys whose scalar values are image references in raw content.
pub const IMAGE_KEYS: &[&str] = &["image", "bg_image"];

/// Collect image ids found under [`IMAGE_KEYS`], depth first.
///
/// Scalar values under a matching key are terminal. Object or array values
/// under a matching key are walked like any other container. Ids are
/// de-duplicated, first occurrence wins.
pub fn locate_references(tree: &Value) -> Vec<ReferenceId> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    locate_into(tree, &mut found, &mut seen);
    found
}

fn locate_into(node: &Value, found: &mut Vec<ReferenceId>, seen: &mut HashSet<ReferenceId>) {
    match node {
        Value::Object(obj) => {
            for (key, value) in obj {
                if IMAGE_KEYS.contains(&key.as_str()) && !value.is_object() && !value.is_array() {
                    if let Some(id) = ReferenceId::from_json(value) {
                        if seen.insert(id.clone()) {
                            found.push(id);
                        }
                    }
                } else {
                    locate_into(value, found, seen);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                locate_into(item, found, seen);
            }
        }
        _ => {}
    }
}

/// Copy of `tree` with every `id` key removed from every object.
pub fn strip_ephemeral_ids(tree: &Value) -> Value {
    match tree {
        Value::Object(obj) => Value::Object(
            obj.iter()
                .filter(|(key, _)| key.as_str() != "id")
                .map(|(key, value)| (key.clone(), strip_ephemeral_ids(value)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_ephemeral_ids).collect()),
        other => other.clone(),
    }
}

/// What to do with a reference that has no local counterpart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingReferencePolicy {
    /// Fail the whole page.
    #[default]
    Strict,
    /// Drop the reference and log a warning.
    Lenient,
}

impl FromStr for MissingReferencePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(MissingReferencePolicy::Strict),
            "lenient" => Ok(MissingReferencePolicy::Lenient),
            other => anyhow::bail!("unknown missing-reference policy '{other}'"),
        }
    }
}

impl fmt::Display for MissingReferencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MissingReferencePolicy::Strict => "strict",
            MissingReferencePolicy::Lenient => "lenient",
        })
    }
}

/// Source id to local id, per reference kind.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMap {
    entries: HashMap<(ReferenceKind, ReferenceId), ReferenceId>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map every reference to itself (same-store round trips).
    pub fn identity<'a>(refs: impl IntoIterator<Item = &'a ExternalReference>) -> Self {
        let mut map = Self::new();
        for r in refs {
            map.insert(r.kind, r.id.clone(), r.id.clone());
        }
        map
    }

    pub fn insert(&mut self, kind: ReferenceKind, source: ReferenceId, local: ReferenceId) {
        self.entries.insert((kind, source), local);
    }

    pub fn get(&self, kind: ReferenceKind, source: &ReferenceId) -> Option<&ReferenceId> {
        self.entries.get(&(kind, source.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `other` into `self`; entries in `other` win.
    pub fn extend(&mut self, other: ReferenceMap) {
        self.entries.extend(other.entries);
    }
}

/// Every typed reference in `value`, in tree order, duplicates included.
pub fn collect_references(value: &BlockValue) -> Vec<ExternalReference> {
    let mut refs = Vec::new();
    collect_into(value, &mut refs);
    refs
}

fn collect_into(value: &BlockValue, refs: &mut Vec<ExternalReference>) {
    match value {
        BlockValue::Struct(fields) => {
            for (_, field) in fields {
                collect_into(field, refs);
            }
        }
        BlockValue::Stream(children) | BlockValue::List(children) => {
            for child in children {
                collect_into(&child.value, refs);
            }
        }
        BlockValue::Scalar(ScalarValue::Reference(r)) => refs.push(r.clone()),
        BlockValue::Scalar(_) => {}
    }
}

/// Rewrite every typed reference in `value` through `map`.
///
/// Returns the number of references that were dropped under
/// [`MissingReferencePolicy::Lenient`]. Under `Strict` the first unmapped
/// reference aborts with [`ImportError::MissingReference`]; `value` may be
/// partially rewritten at that point and should be discarded.
pub fn remap_references(
    value: &mut BlockValue,
    map: &ReferenceMap,
    policy: MissingReferencePolicy,
) -> ImportResult<usize> {
    remap_references_of(value, map, policy, |_| true)
}

/// [`remap_references`] restricted to the kinds `select` accepts. Other
/// references are left untouched.
pub fn remap_references_of(
    value: &mut BlockValue,
    map: &ReferenceMap,
    policy: MissingReferencePolicy,
    select: impl Fn(ReferenceKind) -> bool + Copy,
) -> ImportResult<usize> {
    let mut dropped = 0;
    remap_in(value, map, policy, select, &mut dropped)?;
    Ok(dropped)
}

fn remap_in(
    value: &mut BlockValue,
    map: &ReferenceMap,
    policy: MissingReferencePolicy,
    select: impl Fn(ReferenceKind) -> bool + Copy,
    dropped: &mut usize,
) -> ImportResult<()> {
    match value {
        BlockValue::Struct(fields) => {
            for (_, field) in fields.iter_mut() {
                remap_in(field, map, policy, select, dropped)?;
            }
        }
        BlockValue::Stream(children) | BlockValue::List(children) => {
            for child in children.iter_mut() {
                remap_in(&mut child.value, map, policy, select, dropped)?;
            }
        }
        BlockValue::Scalar(ScalarValue::Reference(r)) if select(r.kind) => {
            match map.get(r.kind, &r.id) {
                Some(local) => r.id = local.clone(),
                None => match policy {
                    MissingReferencePolicy::Strict => {
                        return Err(ImportError::MissingReference {
                            kind: r.kind,
                            id: r.id.clone(),
                        });
                    }
                    MissingReferencePolicy::Lenient => {
                        warn!(kind = %r.kind, id = %r.id, "dropping unmapped reference");
                        *dropped += 1;
                        *value = BlockValue::null();
                    }
                },
            }
        }
        BlockValue::Scalar(_) => {}
    }
    Ok(())
}

/// Null out every reference of `kind`. Returns how many were cleared.
pub fn clear_references(value: &mut BlockValue, kind: ReferenceKind) -> usize {
    match value {
        BlockValue::Struct(fields) => fields
            .iter_mut()
            .map(|(_, field)| clear_references(field, kind))
            .sum(),
        BlockValue::Stream(children) | BlockValue::List(children) => children
            .iter_mut()
            .map(|child| clear_references(&mut child.value, kind))
            .sum(),
        BlockValue::Scalar(ScalarValue::Reference(r)) if r.kind == kind => {
            *value = BlockValue::null();
            1
        }
        BlockValue::Scalar(_) => 0,
    }
}
