//! Block schema nodes.
//!
//! A [`BlockType`] describes one content unit: a struct of named fields, a
//! stream of tagged variants, a list of repeated items, or a scalar. Schema
//! graphs are owned trees, so cycles cannot be expressed.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of entity an external reference points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Image,
    Document,
    Page,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceKind::Image => "image",
            ReferenceKind::Document => "document",
            ReferenceKind::Page => "page",
        };
        f.write_str(name)
    }
}

/// One entry of a choice field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

/// Shape of a scalar leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScalarKind {
    /// Single-line or multi-line plain text.
    Text { max_length: Option<usize> },
    /// Rich-text HTML document.
    RichText,
    Markdown,
    /// Raw HTML, rendered unsanitized.
    RawHtml,
    Url,
    Integer { min: Option<i64>, max: Option<i64> },
    Boolean,
    Choice { choices: Vec<Choice> },
    Reference { target: ReferenceKind },
    /// Placeholder block with no editable value.
    Static,
}

/// Structural kind of a block type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "of", rename_all = "snake_case")]
pub enum BlockKind {
    /// Named fields, all present, in declaration order.
    Struct(Vec<BlockType>),
    /// Ordered sequence of variants chosen from the allowed children.
    Stream(Vec<BlockType>),
    /// Ordered sequence of one repeated item type.
    List(Box<BlockType>),
    Scalar(ScalarKind),
}

/// Occurrence and presence constraints.
///
/// For struct fields `required` means the value must be present and
/// non-empty. For stream variants `min_num`/`max_num` bound how many times
/// the variant may occur; on a stream or list itself they bound the total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    pub required: bool,
    pub min_num: Option<usize>,
    pub max_num: Option<usize>,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            required: true,
            min_num: None,
            max_num: None,
        }
    }
}

/// A named schema node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockType {
    /// Machine name, unique within the parent schema.
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Editor grouping (e.g. "DSFR components").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub kind: BlockKind,
    pub constraints: Constraints,
    /// Raw value used when a required struct field is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl BlockType {
    fn new(name: &str, kind: BlockKind) -> Self {
        Self {
            name: name.to_string(),
            label: default_label(name),
            group: None,
            kind,
            constraints: Constraints::default(),
            default: None,
        }
    }

    /// Struct of named fields.
    pub fn structure(name: &str, fields: Vec<BlockType>) -> Self {
        Self::new(name, BlockKind::Struct(fields))
    }

    /// Stream of allowed variants.
    pub fn stream(name: &str, variants: Vec<BlockType>) -> Self {
        Self::new(name, BlockKind::Stream(variants))
    }

    /// List of repeated items. The item type is renamed to `item`.
    pub fn list(name: &str, mut item: BlockType) -> Self {
        item.name = "item".to_string();
        Self::new(name, BlockKind::List(Box::new(item)))
    }

    pub fn scalar(name: &str, kind: ScalarKind) -> Self {
        Self::new(name, BlockKind::Scalar(kind))
    }

    pub fn text(name: &str) -> Self {
        Self::scalar(name, ScalarKind::Text { max_length: None })
    }

    pub fn rich_text(name: &str) -> Self {
        Self::scalar(name, ScalarKind::RichText)
    }

    pub fn markdown(name: &str) -> Self {
        Self::scalar(name, ScalarKind::Markdown)
    }

    pub fn raw_html(name: &str) -> Self {
        Self::scalar(name, ScalarKind::RawHtml)
    }

    pub fn url(name: &str) -> Self {
        Self::scalar(name, ScalarKind::Url)
    }

    pub fn integer(name: &str, min: Option<i64>, max: Option<i64>) -> Self {
        Self::scalar(name, ScalarKind::Integer { min, max })
    }

    pub fn boolean(name: &str) -> Self {
        // Unchecked checkboxes are a value, not an absence.
        Self::scalar(name, ScalarKind::Boolean).optional()
    }

    /// Choice field built from `(value, label)` pairs.
    pub fn choice(name: &str, choices: &[(&str, &str)]) -> Self {
        let choices = choices
            .iter()
            .map(|(value, label)| Choice {
                value: value.to_string(),
                label: label.to_string(),
            })
            .collect();
        Self::scalar(name, ScalarKind::Choice { choices })
    }

    pub fn reference(name: &str, target: ReferenceKind) -> Self {
        Self::scalar(name, ScalarKind::Reference { target })
    }

    pub fn static_block(name: &str) -> Self {
        Self::scalar(name, ScalarKind::Static).optional()
    }

    /// Set the human-readable label.
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Set the editor group.
    pub fn in_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    /// Mark as not required.
    pub fn optional(mut self) -> Self {
        self.constraints.required = false;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn min_num(mut self, n: usize) -> Self {
        self.constraints.min_num = Some(n);
        self
    }

    pub fn max_num(mut self, n: usize) -> Self {
        self.constraints.max_num = Some(n);
        self
    }

    /// Rename (used when one definition is reused under several names).
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Look up a struct field or stream variant by name.
    pub fn child(&self, name: &str) -> Option<&BlockType> {
        match &self.kind {
            BlockKind::Struct(children) | BlockKind::Stream(children) => {
                children.iter().find(|c| c.name == name)
            }
            BlockKind::List(item) if item.name == name => Some(item.as_ref()),
            _ => None,
        }
    }

    /// Names of struct fields or stream variants, in declaration order.
    pub fn child_names(&self) -> Vec<&str> {
        match &self.kind {
            BlockKind::Struct(children) | BlockKind::Stream(children) => {
                children.iter().map(|c| c.name.as_str()).collect()
            }
            BlockKind::List(item) => vec![item.name.as_str()],
            BlockKind::Scalar(_) => Vec::new(),
        }
    }
}

/// "bg_image" -> "Bg image"
fn default_label(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
