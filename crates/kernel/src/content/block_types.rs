//! Block type registry.
//!
//! Provides:
//! - `BlockTypeRegistry`: named block types, named catalogs, and types
//!   contributed at runtime through `register_type`
//! - `BlockDefinition`: the trait runtime-registered types implement
//! - `StreamField`: a page field whose stream schema is resolved on first
//!   use and never persisted
//!
//! The registry is an ordinary value. Build it once at startup, register
//! extra types, then share it behind an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::catalog::{self, COMMON_CATALOG, HERO_CATALOG};
use super::schema::BlockType;
use super::validate::validate_value;
use super::value::to_value;
use crate::error::RegistryError;

/// A block type contributed at runtime.
pub trait BlockDefinition: Send + Sync + fmt::Debug {
    /// CamelCase type name, e.g. `ContactCardBlock`.
    fn type_name(&self) -> &str;

    /// Build the schema node. Called on every schema lookup.
    fn build(&self, options: &RegistrationOptions) -> BlockType;
}

/// Options given to `register_type`, passed back to `build`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOptions {
    pub name: String,
    pub label: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug, Clone)]
struct Registration {
    definition: Arc<dyn BlockDefinition>,
    options: RegistrationOptions,
}

/// Registry of block types and catalogs, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct BlockTypeRegistry {
    types: HashMap<String, BlockType>,
    catalogs: HashMap<String, Vec<String>>,
    registrations: Vec<Registration>,
}

impl BlockTypeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the standard block library and its
    /// `common` and `hero` catalogs.
    pub fn with_standard_types() -> Self {
        let mut registry = Self::new();
        registry.register_standard_types();
        registry
    }

    /// Register a block type. A type already registered under the same name
    /// is replaced.
    pub fn register(&mut self, block: BlockType) {
        if self.types.contains_key(&block.name) {
            warn!(name = %block.name, "block type registered twice, replacing");
        }
        self.types.insert(block.name.clone(), block);
    }

    /// Look up a block type by name.
    pub fn get(&self, type_name: &str) -> Option<&BlockType> {
        self.types.get(type_name)
    }

    /// Check whether a block type is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Return the number of registered block types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// List all registered type names, sorted.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.keys().cloned().collect();
        names.sort();
        names
    }

    /// Define (or redefine) a named catalog as an ordered list of type names.
    pub fn define_catalog<I, S>(&mut self, name: &str, type_names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = type_names.into_iter().map(Into::into).collect();
        self.catalogs.insert(name.to_string(), names);
    }

    /// Names of all defined catalogs, sorted.
    pub fn catalog_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.catalogs.keys().cloned().collect();
        names.sort();
        names
    }

    /// Register the standard library and define its catalogs.
    pub fn register_standard_types(&mut self) {
        let common = catalog::common_blocks();
        let hero = catalog::hero_blocks();

        self.define_catalog(COMMON_CATALOG, common.iter().map(|b| b.name.clone()));
        self.define_catalog(HERO_CATALOG, hero.iter().map(|b| b.name.clone()));

        for block in common.into_iter().chain(hero) {
            self.register(block);
        }
    }

    /// Add a runtime block type. It joins the `common` catalog on the next
    /// schema lookup. Returns the resolved name: `name`, or the snake_case
    /// form of the definition's type name.
    pub fn register_type<D>(
        &mut self,
        definition: D,
        name: Option<&str>,
        label: Option<&str>,
        group: Option<&str>,
    ) -> String
    where
        D: BlockDefinition + 'static,
    {
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| snake_case(definition.type_name()));
        debug!(name = %name, type_name = %definition.type_name(), "block type registered");

        self.registrations.push(Registration {
            definition: Arc::new(definition),
            options: RegistrationOptions {
                name: name.clone(),
                label: label.map(str::to_string),
                group: group.map(str::to_string),
            },
        });
        name
    }

    /// Build every runtime-registered type, in registration order.
    pub fn get_registered_types(&self) -> Vec<BlockType> {
        self.registrations
            .iter()
            .map(|registration| {
                let options = &registration.options;
                let mut block = registration.definition.build(options).named(&options.name);
                if let Some(label) = &options.label {
                    block.label = label.clone();
                }
                if options.group.is_some() {
                    block.group = options.group.clone();
                }
                block
            })
            .collect()
    }

    /// Drop all runtime registrations.
    pub fn clear_registered_types(&mut self) {
        self.registrations.clear();
    }

    /// Ordered members of `catalog`.
    ///
    /// For the `common` catalog runtime-registered types follow the static
    /// members; one that reuses a static name replaces it in place.
    pub fn get_schema(&self, catalog: &str) -> Result<Vec<BlockType>, RegistryError> {
        let names = self
            .catalogs
            .get(catalog)
            .ok_or_else(|| RegistryError::UnknownCatalog(catalog.to_string()))?;

        let mut blocks = Vec::with_capacity(names.len());
        for name in names {
            let block = self.types.get(name).ok_or_else(|| RegistryError::UnknownType {
                catalog: catalog.to_string(),
                name: name.clone(),
            })?;
            blocks.push(block.clone());
        }

        if catalog == COMMON_CATALOG {
            for block in self.get_registered_types() {
                match blocks.iter_mut().find(|b| b.name == block.name) {
                    Some(existing) => {
                        warn!(name = %block.name, "registered block type shadows a catalog member");
                        *existing = block;
                    }
                    None => blocks.push(block),
                }
            }
        }
        Ok(blocks)
    }

    /// Stream schema over the members of `catalog`, named after the catalog.
    pub fn stream_schema(&self, catalog: &str) -> Result<BlockType, RegistryError> {
        Ok(BlockType::stream(catalog, self.get_schema(catalog)?))
    }

    /// SHA-256 hex digest of the serialized catalog schema.
    ///
    /// Pages record the fingerprint they were validated against, so a
    /// schema change is detectable without rewriting stored bodies.
    pub fn fingerprint(&self, catalog: &str) -> Result<String, RegistryError> {
        let blocks = self.get_schema(catalog)?;
        let bytes = serde_json::to_vec(&blocks)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// Validate one block's raw value against the registered type.
    ///
    /// Returns a list of validation error messages. An empty list means the
    /// block is valid.
    pub fn validate_block(&self, type_name: &str, data: &Value) -> Vec<String> {
        let Some(block) = self.get(type_name) else {
            return vec![format!("unknown block type '{type_name}'")];
        };
        match to_value(block, data) {
            Ok(value) => validate_value(block, &value),
            Err(e) => vec![e.to_string()],
        }
    }
}

/// `ContactCardBlock` -> `contact_card_block`
fn snake_case(type_name: &str) -> String {
    let mut out = String::with_capacity(type_name.len() + 4);
    for c in type_name.chars() {
        if c.is_uppercase() {
            out.push('_');
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out.trim_start_matches('_').to_string()
}

/// Persisted description of a stream field. The block type list is always
/// empty; the schema lives in code and is tracked by fingerprint instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub catalog: String,
    pub blank: bool,
    pub block_types: Vec<String>,
}

/// A page field holding a stream over a catalog.
///
/// The stream schema is resolved from the registry on first use and cached.
#[derive(Debug)]
pub struct StreamField {
    name: String,
    catalog: String,
    blank: bool,
    resolved: OnceLock<BlockType>,
}

impl StreamField {
    pub fn new(name: &str, catalog: &str) -> Self {
        Self {
            name: name.to_string(),
            catalog: catalog.to_string(),
            blank: false,
            resolved: OnceLock::new(),
        }
    }

    /// Allow an empty stream.
    pub fn blank(mut self, blank: bool) -> Self {
        self.blank = blank;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    /// Resolved stream schema.
    pub fn block(&self, registry: &BlockTypeRegistry) -> Result<&BlockType, RegistryError> {
        if let Some(block) = self.resolved.get() {
            return Ok(block);
        }
        let mut block = registry.stream_schema(&self.catalog)?.named(&self.name);
        block.constraints.required = !self.blank;
        Ok(self.resolved.get_or_init(|| block))
    }

    pub fn describe(&self) -> FieldDescriptor {
        FieldDescriptor {
            name: self.name.clone(),
            catalog: self.catalog.clone(),
            blank: self.blank,
            block_types: Vec::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug)]
    struct ContactCardBlock;

    impl BlockDefinition for ContactCardBlock {
        fn type_name(&self) -> &str {
            "ContactCardBlock"
        }

        fn build(&self, options: &RegistrationOptions) -> BlockType {
            BlockType::structure(
                &options.name,
                vec![BlockType::text("name"), BlockType::text("role").optional()],
            )
        }
    }

    #[test]
    fn standard_catalogs_are_defined() {
        let registry = BlockTypeRegistry::with_standard_types();
        assert_eq!(registry.catalog_names(), vec!["common", "hero"]);
        assert_eq!(registry.get_schema("common").unwrap().len(), 26);
        assert_eq!(registry.get_schema("hero").unwrap().len(), 4);
        assert!(registry.contains("paragraph"));
        assert!(registry.contains("hero_text_image"));
    }

    #[test]
    fn unknown_catalog_is_an_error() {
        let registry = BlockTypeRegistry::with_standard_types();
        assert!(matches!(
            registry.get_schema("sidebar"),
            Err(RegistryError::UnknownCatalog(ref name)) if name == "sidebar"
        ));
    }

    #[test]
    fn catalog_with_missing_type_is_an_error() {
        let mut registry = BlockTypeRegistry::new();
        registry.define_catalog("broken", ["nope"]);
        assert!(matches!(
            registry.get_schema("broken"),
            Err(RegistryError::UnknownType { .. })
        ));
    }

    #[test]
    fn second_registration_wins() {
        let mut registry = BlockTypeRegistry::new();
        registry.register(BlockType::text("intro").with_label("First"));
        registry.register(BlockType::text("intro").with_label("Second"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("intro").unwrap().label, "Second");
    }

    #[test]
    fn register_type_defaults_to_snake_case_name() {
        let mut registry = BlockTypeRegistry::new();
        let name = registry.register_type(ContactCardBlock, None, Some("Contact"), Some("Extra"));
        assert_eq!(name, "contact_card_block");

        let types = registry.get_registered_types();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].name, "contact_card_block");
        assert_eq!(types[0].label, "Contact");
        assert_eq!(types[0].group.as_deref(), Some("Extra"));
    }

    #[test]
    fn registered_types_join_common_catalog() {
        let mut registry = BlockTypeRegistry::with_standard_types();
        registry.register_type(ContactCardBlock, Some("contact"), None, None);

        let common = registry.get_schema("common").unwrap();
        assert_eq!(common.len(), 27);
        assert_eq!(common.last().unwrap().name, "contact");
        assert_eq!(registry.get_schema("hero").unwrap().len(), 4);

        registry.clear_registered_types();
        assert_eq!(registry.get_schema("common").unwrap().len(), 26);
    }

    #[test]
    fn registered_type_replaces_static_member_in_place() {
        let mut registry = BlockTypeRegistry::with_standard_types();
        registry.register_type(ContactCardBlock, Some("alert"), None, None);
        let common = registry.get_schema("common").unwrap();
        assert_eq!(common.len(), 26);
        let alert = common.iter().find(|b| b.name == "alert").unwrap();
        assert_eq!(alert.child_names(), vec!["name", "role"]);
    }

    #[test]
    fn fingerprint_tracks_schema_changes() {
        let mut registry = BlockTypeRegistry::with_standard_types();
        let before = registry.fingerprint("common").unwrap();
        assert_eq!(before.len(), 64);
        assert_eq!(before, registry.fingerprint("common").unwrap());

        registry.register_type(ContactCardBlock, None, None, None);
        assert_ne!(before, registry.fingerprint("common").unwrap());
    }

    #[test]
    fn stream_field_resolves_lazily_and_caches() {
        let mut registry = BlockTypeRegistry::with_standard_types();
        let field = StreamField::new("body", "common").blank(true);

        // registered after the field exists, before first use
        registry.register_type(ContactCardBlock, None, None, None);
        let block = field.block(&registry).unwrap();
        assert_eq!(block.name, "body");
        assert!(!block.constraints.required);
        assert!(block.child("contact_card_block").is_some());

        registry.register_type(ContactCardBlock, Some("late"), None, None);
        assert!(field.block(&registry).unwrap().child("late").is_none());
    }

    #[test]
    fn stream_field_describes_no_block_types() {
        let field = StreamField::new("body", "common");
        let descriptor = field.describe();
        assert_eq!(descriptor.catalog, "common");
        assert!(descriptor.block_types.is_empty());
        assert_eq!(
            serde_json::to_value(&descriptor).unwrap()["block_types"],
            json!([])
        );
    }

    #[test]
    fn validate_block_reports_unknown_and_malformed() {
        let registry = BlockTypeRegistry::with_standard_types();
        assert_eq!(
            registry.validate_block("carousel", &json!({})),
            vec!["unknown block type 'carousel'"]
        );

        let errors = registry.validate_block("alert", &json!({ "title": "x" }));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("level"), "got: {errors:?}");

        let ok = registry.validate_block(
            "alert",
            &json!({ "title": "Heads up", "description": "", "level": "info", "heading_tag": "h3" }),
        );
        assert!(ok.is_empty(), "got: {ok:?}");
    }

    #[test]
    fn snake_case_conversion() {
        assert_eq!(snake_case("MyCustomBlock"), "my_custom_block");
        assert_eq!(snake_case("HTMLBlock"), "h_t_m_l_block");
        assert_eq!(snake_case("plain"), "plain");
    }
}
