//! Block value model.
//!
//! A [`BlockValue`] is one concrete instance of a [`BlockType`]. Values are
//! parsed from the raw JSON exchanged with the editor and the read API
//! ([`to_value`]) and written back in the same canonical form
//! ([`BlockValue::to_json`]).

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::schema::{BlockKind, BlockType, ReferenceKind, ScalarKind};
use crate::error::SchemaMismatch;

static NULL: Value = Value::Null;

/// Opaque identifier of an entity, local to the store that minted it.
///
/// Source stores hand out integer ids, so numeric JSON is accepted and
/// written back as a number whenever the id round-trips through `i64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceId(String);

impl ReferenceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Normalise a JSON scalar into an id.
    ///
    /// Returns `None` for null, blank strings, booleans and containers.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_string())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self.0.parse::<i64>() {
            Ok(n) if n.to_string() == self.0 => Value::from(n),
            _ => Value::String(self.0.clone()),
        }
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for ReferenceId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ReferenceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for ReferenceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ReferenceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ReferenceId::from_json(&value)
            .ok_or_else(|| D::Error::custom("expected a string or integer reference id"))
    }
}

/// Weak link from content to an independently owned entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalReference {
    pub kind: ReferenceKind,
    pub id: ReferenceId,
}

/// Value held by a scalar leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Text(String),
    RichText(String),
    Markdown(String),
    RawHtml(String),
    Url(String),
    Choice(String),
    Integer(i64),
    Boolean(bool),
    Reference(ExternalReference),
}

/// One tagged entry of a stream or list.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamChild {
    /// Variant name (`item` for list entries).
    pub block_type: String,
    pub value: BlockValue,
    /// Editor-side identifier; not portable across stores.
    pub id: Option<String>,
}

impl StreamChild {
    pub fn new(block_type: &str, value: BlockValue) -> Self {
        Self {
            block_type: block_type.to_string(),
            value,
            id: None,
        }
    }
}

/// A concrete content tree.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockValue {
    /// Field values in schema declaration order.
    Struct(Vec<(String, BlockValue)>),
    Stream(Vec<StreamChild>),
    List(Vec<StreamChild>),
    Scalar(ScalarValue),
}

impl BlockValue {
    pub fn null() -> Self {
        BlockValue::Scalar(ScalarValue::Null)
    }

    /// Look up a struct field.
    pub fn field(&self, name: &str) -> Option<&BlockValue> {
        match self {
            BlockValue::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Entries of a stream or list; empty for anything else.
    pub fn children(&self) -> &[StreamChild] {
        match self {
            BlockValue::Stream(children) | BlockValue::List(children) => children,
            _ => &[],
        }
    }

    /// String content of a text-like scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BlockValue::Scalar(
                ScalarValue::Text(s)
                | ScalarValue::RichText(s)
                | ScalarValue::Markdown(s)
                | ScalarValue::RawHtml(s)
                | ScalarValue::Url(s)
                | ScalarValue::Choice(s),
            ) => Some(s),
            _ => None,
        }
    }

    /// Whether the value counts as absent for `required` checks.
    pub fn is_empty(&self) -> bool {
        match self {
            BlockValue::Scalar(ScalarValue::Null) => true,
            BlockValue::Scalar(_) => self.as_str().is_some_and(|s| s.trim().is_empty()),
            BlockValue::Stream(children) | BlockValue::List(children) => children.is_empty(),
            BlockValue::Struct(_) => false,
        }
    }

    /// Canonical JSON form (the shape the read API returns).
    pub fn to_json(&self) -> Value {
        match self {
            BlockValue::Struct(fields) => {
                let mut obj = Map::new();
                for (name, value) in fields {
                    obj.insert(name.clone(), value.to_json());
                }
                Value::Object(obj)
            }
            BlockValue::Stream(children) | BlockValue::List(children) => {
                Value::Array(children.iter().map(child_to_json).collect())
            }
            BlockValue::Scalar(scalar) => match scalar {
                ScalarValue::Null => Value::Null,
                ScalarValue::Text(s)
                | ScalarValue::RichText(s)
                | ScalarValue::Markdown(s)
                | ScalarValue::RawHtml(s)
                | ScalarValue::Url(s)
                | ScalarValue::Choice(s) => Value::String(s.clone()),
                ScalarValue::Integer(n) => Value::from(*n),
                ScalarValue::Boolean(b) => Value::Bool(*b),
                ScalarValue::Reference(r) => r.id.to_json(),
            },
        }
    }
}

fn child_to_json(child: &StreamChild) -> Value {
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::String(child.block_type.clone()));
    obj.insert("value".to_string(), child.value.to_json());
    if let Some(id) = &child.id {
        obj.insert("id".to_string(), Value::String(id.clone()));
    }
    Value::Object(obj)
}

/// Parse raw JSON into a value conforming to `schema`.
///
/// Streams accept `{"type", "value", "id"}` objects or `[type, value]`
/// pairs. Missing optional struct fields become empty values; missing
/// required fields fall back to the field default, or fail.
pub fn to_value(schema: &BlockType, raw: &Value) -> Result<BlockValue, SchemaMismatch> {
    parse(schema, raw, &schema.name)
}

fn parse(schema: &BlockType, raw: &Value, path: &str) -> Result<BlockValue, SchemaMismatch> {
    match &schema.kind {
        BlockKind::Struct(fields) => parse_struct(fields, raw, path),
        BlockKind::Stream(variants) => {
            let entries = sequence(raw, path)?;
            let mut children = Vec::with_capacity(entries.len());
            for (i, entry) in entries.iter().enumerate() {
                let entry_path = format!("{path}[{i}]");
                let (name, value, id) = stream_entry(entry, &entry_path)?;
                let variant = variants.iter().find(|v| v.name == name).ok_or_else(|| {
                    SchemaMismatch::UnknownVariant {
                        path: entry_path.clone(),
                        variant: name.to_string(),
                    }
                })?;
                let value = parse(variant, value, &format!("{entry_path}.{name}"))?;
                children.push(StreamChild {
                    block_type: name.to_string(),
                    value,
                    id,
                });
            }
            Ok(BlockValue::Stream(children))
        }
        BlockKind::List(item) => {
            let entries = sequence(raw, path)?;
            let mut children = Vec::with_capacity(entries.len());
            for (i, entry) in entries.iter().enumerate() {
                let (value, id) = list_entry(entry);
                let value = parse(item, value, &format!("{path}[{i}]"))?;
                children.push(StreamChild {
                    block_type: item.name.clone(),
                    value,
                    id,
                });
            }
            Ok(BlockValue::List(children))
        }
        BlockKind::Scalar(kind) => parse_scalar(kind, raw, path),
    }
}

fn parse_struct(fields: &[BlockType], raw: &Value, path: &str) -> Result<BlockValue, SchemaMismatch> {
    let empty = Map::new();
    let obj = match raw {
        Value::Object(obj) => obj,
        Value::Null => &empty,
        _ => {
            return Err(SchemaMismatch::InvalidValue {
                path: path.to_string(),
                expected: "an object",
            });
        }
    };

    let mut values = Vec::with_capacity(fields.len());
    for field in fields {
        let field_path = format!("{path}.{}", field.name);
        let value = match obj.get(&field.name) {
            Some(v) => parse(field, v, &field_path)?,
            None => match &field.default {
                Some(default) => parse(field, default, &field_path)?,
                None if field.constraints.required => {
                    return Err(SchemaMismatch::MissingField {
                        path: path.to_string(),
                        field: field.name.clone(),
                    });
                }
                None => empty_value(field),
            },
        };
        values.push((field.name.clone(), value));
    }
    Ok(BlockValue::Struct(values))
}

fn sequence<'a>(raw: &'a Value, path: &str) -> Result<&'a [Value], SchemaMismatch> {
    match raw {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(&[]),
        _ => Err(SchemaMismatch::InvalidValue {
            path: path.to_string(),
            expected: "an array",
        }),
    }
}

fn stream_entry<'a>(
    entry: &'a Value,
    path: &str,
) -> Result<(&'a str, &'a Value, Option<String>), SchemaMismatch> {
    if let Some(name) = entry.get("type").and_then(Value::as_str) {
        let value = entry.get("value").unwrap_or(&NULL);
        return Ok((name, value, entry.get("id").and_then(block_id)));
    }
    if let Some([Value::String(name), value]) = entry.as_array().map(Vec::as_slice) {
        return Ok((name.as_str(), value, None));
    }
    Err(SchemaMismatch::InvalidValue {
        path: path.to_string(),
        expected: "a {type, value} object or a [type, value] pair",
    })
}

fn list_entry(entry: &Value) -> (&Value, Option<String>) {
    match entry.get("value") {
        Some(value) if entry.get("type").and_then(Value::as_str) == Some("item") => {
            (value, entry.get("id").and_then(block_id))
        }
        _ => (entry, None),
    }
}

fn block_id(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_scalar(kind: &ScalarKind, raw: &Value, path: &str) -> Result<BlockValue, SchemaMismatch> {
    if raw.is_null() || matches!(kind, ScalarKind::Static) {
        return Ok(BlockValue::null());
    }

    let invalid = |expected: &'static str| SchemaMismatch::InvalidValue {
        path: path.to_string(),
        expected,
    };

    let scalar = match kind {
        ScalarKind::Text { .. }
        | ScalarKind::RichText
        | ScalarKind::Markdown
        | ScalarKind::RawHtml
        | ScalarKind::Url
        | ScalarKind::Choice { .. } => {
            let s = raw.as_str().ok_or_else(|| invalid("a string"))?.to_string();
            match kind {
                ScalarKind::RichText => ScalarValue::RichText(s),
                ScalarKind::Markdown => ScalarValue::Markdown(s),
                ScalarKind::RawHtml => ScalarValue::RawHtml(s),
                ScalarKind::Url => ScalarValue::Url(s),
                ScalarKind::Choice { .. } => ScalarValue::Choice(s),
                _ => ScalarValue::Text(s),
            }
        }
        ScalarKind::Integer { .. } => {
            let n = raw
                .as_i64()
                .or_else(|| raw.as_str().and_then(|s| s.trim().parse().ok()))
                .ok_or_else(|| invalid("an integer"))?;
            ScalarValue::Integer(n)
        }
        ScalarKind::Boolean => ScalarValue::Boolean(raw.as_bool().ok_or_else(|| invalid("a boolean"))?),
        ScalarKind::Reference { target } => {
            // The read API sometimes expands a reference into an object.
            let id_value = match raw {
                Value::Object(obj) => obj.get("id").unwrap_or(&NULL),
                other => other,
            };
            if id_value.as_str().is_some_and(|s| s.trim().is_empty()) {
                return Ok(BlockValue::null());
            }
            let id = ReferenceId::from_json(id_value).ok_or_else(|| invalid("a reference id"))?;
            ScalarValue::Reference(ExternalReference { kind: *target, id })
        }
        ScalarKind::Static => ScalarValue::Null,
    };
    Ok(BlockValue::Scalar(scalar))
}

/// Empty value for an absent optional field.
fn empty_value(schema: &BlockType) -> BlockValue {
    match &schema.kind {
        BlockKind::Struct(fields) => BlockValue::Struct(
            fields
                .iter()
                .map(|f| (f.name.clone(), empty_value(f)))
                .collect(),
        ),
        BlockKind::Stream(_) => BlockValue::Stream(Vec::new()),
        BlockKind::List(_) => BlockValue::List(Vec::new()),
        BlockKind::Scalar(_) => BlockValue::null(),
    }
}

/// Minimal deterministic value that satisfies `schema`.
///
/// Free text is empty, choices take their first declared value, references
/// are left null for the caller to fill. A stream gets each variant repeated
/// to its own `min_num`, then the first declared variant until the stream's
/// `min_num` is reached.
pub fn sample(schema: &BlockType) -> BlockValue {
    match &schema.kind {
        BlockKind::Struct(fields) => BlockValue::Struct(
            fields
                .iter()
                .map(|f| (f.name.clone(), sample(f)))
                .collect(),
        ),
        BlockKind::Stream(variants) => {
            let mut children = Vec::new();
            for variant in variants {
                for _ in 0..variant.constraints.min_num.unwrap_or(0) {
                    children.push(StreamChild::new(&variant.name, sample(variant)));
                }
            }
            if let (Some(min), Some(first)) = (schema.constraints.min_num, variants.first()) {
                while children.len() < min {
                    children.push(StreamChild::new(&first.name, sample(first)));
                }
            }
            BlockValue::Stream(children)
        }
        BlockKind::List(item) => {
            let count = schema.constraints.min_num.unwrap_or(0);
            BlockValue::List(
                (0..count)
                    .map(|_| StreamChild::new(&item.name, sample(item)))
                    .collect(),
            )
        }
        BlockKind::Scalar(kind) => BlockValue::Scalar(match kind {
            ScalarKind::Text { .. } => ScalarValue::Text(String::new()),
            ScalarKind::RichText => ScalarValue::RichText(String::new()),
            ScalarKind::Markdown => ScalarValue::Markdown(String::new()),
            ScalarKind::RawHtml => ScalarValue::RawHtml(String::new()),
            ScalarKind::Url => ScalarValue::Url(String::new()),
            ScalarKind::Choice { choices } => {
                ScalarValue::Choice(choices.first().map(|c| c.value.clone()).unwrap_or_default())
            }
            ScalarKind::Integer { min, max } => {
                let n = min.unwrap_or(0);
                ScalarValue::Integer(max.map_or(n, |m| n.min(m)))
            }
            ScalarKind::Boolean => ScalarValue::Boolean(false),
            ScalarKind::Reference { .. } | ScalarKind::Static => ScalarValue::Null,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn alert() -> BlockType {
        BlockType::structure(
            "alert",
            vec![
                BlockType::text("title").optional(),
                BlockType::text("description").optional(),
                BlockType::choice("level", &[("error", "Error"), ("info", "Info")]),
            ],
        )
    }

    fn body() -> BlockType {
        BlockType::stream(
            "body",
            vec![
                BlockType::rich_text("paragraph"),
                alert(),
                BlockType::structure(
                    "image",
                    vec![
                        BlockType::reference("image", ReferenceKind::Image),
                        BlockType::text("alt_text").optional(),
                        BlockType::boolean("decorative"),
                    ],
                ),
            ],
        )
    }

    #[test]
    fn parses_api_stream_form() {
        let raw = json!([
            { "type": "paragraph", "value": "<p>Hi</p>", "id": "a1" },
            { "type": "alert", "value": { "title": "T", "level": "info" }, "id": "a2" }
        ]);
        let value = to_value(&body(), &raw).unwrap();
        let children = value.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].block_type, "paragraph");
        assert_eq!(children[0].id.as_deref(), Some("a1"));
        assert_eq!(children[0].value.as_str(), Some("<p>Hi</p>"));
        assert_eq!(children[1].value.field("level").unwrap().as_str(), Some("info"));
        assert!(children[1].value.field("description").unwrap().is_empty());
    }

    #[test]
    fn parses_pair_form() {
        let raw = json!([["paragraph", "<p>Hi</p>"]]);
        let value = to_value(&body(), &raw).unwrap();
        assert_eq!(value.children()[0].block_type, "paragraph");
        assert_eq!(value.children()[0].id, None);
    }

    #[test]
    fn unknown_variant_is_rejected() {
        let raw = json!([{ "type": "carousel", "value": {} }]);
        let err = to_value(&body(), &raw).unwrap_err();
        assert_eq!(
            err,
            SchemaMismatch::UnknownVariant {
                path: "body[0]".to_string(),
                variant: "carousel".to_string()
            }
        );
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let raw = json!([{ "type": "alert", "value": { "title": "No level" } }]);
        let err = to_value(&body(), &raw).unwrap_err();
        assert!(matches!(err, SchemaMismatch::MissingField { ref field, .. } if field == "level"));
        assert_eq!(err.path(), "body[0].alert");
    }

    #[test]
    fn missing_required_field_uses_default() {
        let schema = BlockType::structure(
            "alert",
            vec![BlockType::choice("level", &[("error", "Error"), ("info", "Info")])
                .with_default(json!("info"))],
        );
        let value = to_value(&schema, &json!({})).unwrap();
        assert_eq!(value.field("level").unwrap().as_str(), Some("info"));
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let err = to_value(&body(), &json!({ "type": "paragraph" })).unwrap_err();
        assert!(matches!(err, SchemaMismatch::InvalidValue { expected: "an array", .. }));

        let raw = json!([{ "type": "image", "value": { "image": true } }]);
        let err = to_value(&body(), &raw).unwrap_err();
        assert!(matches!(err, SchemaMismatch::InvalidValue { expected: "a reference id", .. }));
    }

    #[test]
    fn references_accept_numbers_strings_and_objects() {
        let schema = BlockType::reference("image", ReferenceKind::Image);
        for raw in [json!(12), json!("12"), json!({ "id": 12, "title": "x" })] {
            let value = to_value(&schema, &raw).unwrap();
            assert_eq!(
                value,
                BlockValue::Scalar(ScalarValue::Reference(ExternalReference {
                    kind: ReferenceKind::Image,
                    id: ReferenceId::from(12),
                }))
            );
        }
        assert!(to_value(&schema, &json!("")).unwrap().is_empty());
    }

    #[test]
    fn list_accepts_item_objects_and_bare_values() {
        let schema = BlockType::list("tags", BlockType::text("tag"));
        let raw = json!([{ "type": "item", "value": "a", "id": "x" }, "b"]);
        let value = to_value(&schema, &raw).unwrap();
        let items = value.children();
        assert_eq!(items[0].value.as_str(), Some("a"));
        assert_eq!(items[0].id.as_deref(), Some("x"));
        assert_eq!(items[1].value.as_str(), Some("b"));
    }

    #[test]
    fn to_json_round_trips_through_parse() {
        let raw = json!([
            { "type": "paragraph", "value": "<p>Hi</p>", "id": "a1" },
            { "type": "image", "value": { "image": 5, "alt_text": "", "decorative": true } }
        ]);
        let value = to_value(&body(), &raw).unwrap();
        let json = value.to_json();
        assert_eq!(json, raw);
        assert_eq!(to_value(&body(), &json).unwrap(), value);
    }

    #[test]
    fn sample_stream_with_min_num_has_one_entry_of_first_variant() {
        let schema = BlockType::stream(
            "choices",
            vec![BlockType::text("a"), BlockType::text("b")],
        )
        .min_num(1);
        let value = sample(&schema);
        assert_eq!(value.children().len(), 1);
        assert_eq!(value.children()[0].block_type, "a");
    }

    #[test]
    fn sample_honours_per_variant_minimums() {
        let schema = BlockType::stream(
            "accordions",
            vec![
                BlockType::text("title").optional(),
                BlockType::structure("accordion", vec![BlockType::text("title")]).min_num(2),
            ],
        );
        let value = sample(&schema);
        let names: Vec<_> = value.children().iter().map(|c| c.block_type.as_str()).collect();
        assert_eq!(names, vec!["accordion", "accordion"]);
    }

    #[test]
    fn sample_scalars_are_minimal() {
        let schema = BlockType::structure(
            "s",
            vec![
                BlockType::text("title"),
                BlockType::choice("level", &[("error", "Error"), ("info", "Info")]),
                BlockType::integer("height", Some(100), None),
                BlockType::integer("below", None, Some(-1)),
                BlockType::reference("image", ReferenceKind::Image),
                BlockType::boolean("flag"),
            ],
        );
        let value = sample(&schema);
        assert_eq!(value.field("title").unwrap().as_str(), Some(""));
        assert_eq!(value.field("level").unwrap().as_str(), Some("error"));
        assert_eq!(value.field("height"), Some(&BlockValue::Scalar(ScalarValue::Integer(100))));
        assert_eq!(value.field("below"), Some(&BlockValue::Scalar(ScalarValue::Integer(-1))));
        assert!(value.field("image").unwrap().is_empty());
        assert_eq!(value.field("flag"), Some(&BlockValue::Scalar(ScalarValue::Boolean(false))));
    }

    #[test]
    fn sample_parses_back() {
        let schema = body().min_num(1);
        let value = sample(&schema);
        assert_eq!(to_value(&schema, &value.to_json()).unwrap(), value);
    }

    #[test]
    fn every_catalog_block_samples_and_parses_back() {
        use crate::content::catalog::{common_blocks, hero_blocks};

        let blocks: Vec<BlockType> = common_blocks().into_iter().chain(hero_blocks()).collect();
        assert!(!blocks.is_empty());
        for block in &blocks {
            let value = sample(block);
            let parsed = to_value(block, &value.to_json())
                .unwrap_or_else(|e| panic!("sample of {} does not parse: {e}", block.name));
            assert_eq!(parsed, value, "sample of {} changed on parse", block.name);
        }
    }

    #[test]
    fn reference_id_serde() {
        let ids: Vec<ReferenceId> = serde_json::from_value(json!([3, "abc", "007"])).unwrap();
        assert_eq!(ids[0].as_str(), "3");
        assert_eq!(serde_json::to_value(&ids).unwrap(), json!([3, "abc", "007"]));
        assert!(serde_json::from_value::<ReferenceId>(json!(null)).is_err());
    }
}
