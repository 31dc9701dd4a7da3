//! Class field-order tables.
//!
//! Each fieldmapper class has a fixed field order that defines the meaning of
//! every index in its positional wire form. The tables are schema data owned
//! by the ILS, so they are injected here rather than hardcoded at call sites.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::error::{GatewayError, Result};

/// Mutation flag: the entity should be created.
pub const FLAG_IS_NEW: &str = "isnew";
/// Mutation flag: the entity should be updated.
pub const FLAG_IS_CHANGED: &str = "ischanged";
/// Mutation flag: the entity should be deleted.
pub const FLAG_IS_DELETED: &str = "isdeleted";

/// Flag fields appended to every class table.
pub const MUTATION_FLAG_FIELDS: [&str; 3] = [FLAG_IS_NEW, FLAG_IS_CHANGED, FLAG_IS_DELETED];

/// Default primary key field name.
pub const DEFAULT_PKEY: &str = "id";

/// Field table for one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    tag: String,
    fields: Vec<String>,
    positions: HashMap<String, usize>,
    pkey: String,
    links: BTreeMap<String, String>,
}

impl ClassDef {
    /// Build a table from the class's data fields, in wire order.
    ///
    /// The mutation flag fields are appended unless the list already places
    /// them. Duplicate names are rejected since they would make two indices
    /// claim the same field.
    pub fn new<I, S>(tag: &str, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered: Vec<String> = fields.into_iter().map(Into::into).collect();
        for flag in MUTATION_FLAG_FIELDS {
            if !ordered.iter().any(|f| f == flag) {
                ordered.push(flag.to_string());
            }
        }

        let mut positions = HashMap::with_capacity(ordered.len());
        for (index, name) in ordered.iter().enumerate() {
            if name.is_empty() {
                return Err(GatewayError::Config(format!(
                    "class '{tag}' has an empty field name at index {index}"
                )));
            }
            if positions.insert(name.clone(), index).is_some() {
                return Err(GatewayError::Config(format!(
                    "class '{tag}' lists field '{name}' twice"
                )));
            }
        }

        Ok(Self {
            tag: tag.to_string(),
            fields: ordered,
            positions,
            pkey: DEFAULT_PKEY.to_string(),
            links: BTreeMap::new(),
        })
    }

    /// Set the primary key field name.
    pub fn with_pkey(mut self, pkey: &str) -> Self {
        self.pkey = pkey.to_string();
        self
    }

    /// Declare that `field` references entities of class `class`.
    pub fn with_link(mut self, field: &str, class: &str) -> Self {
        self.links.insert(field.to_string(), class.to_string());
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// All fields in wire order, flags included.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Fields that carry data, in wire order.
    pub fn data_fields(&self) -> impl Iterator<Item = (usize, &str)> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, name)| !is_mutation_flag(name))
            .map(|(index, name)| (index, name.as_str()))
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.positions.get(field).copied()
    }

    pub fn pkey(&self) -> &str {
        &self.pkey
    }

    /// Class referenced by a link field, if declared.
    pub fn link(&self, field: &str) -> Option<&str> {
        self.links.get(field).map(String::as_str)
    }
}

/// True for the three reserved mutation flag field names.
pub fn is_mutation_flag(field: &str) -> bool {
    MUTATION_FLAG_FIELDS.contains(&field)
}

/// One class entry in a table file.
#[derive(Debug, Clone, Deserialize)]
struct ClassSpec {
    fields: Vec<String>,
    #[serde(default)]
    pkey: Option<String>,
    #[serde(default)]
    links: BTreeMap<String, String>,
}

/// On-disk table file layout (YAML or JSON).
#[derive(Debug, Clone, Deserialize)]
struct TableFile {
    #[serde(default)]
    version: Option<String>,
    classes: BTreeMap<String, ClassSpec>,
}

/// Fieldmapper table configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldmapperConfig {
    /// Extra table file extending or overriding the built-in tables.
    pub table_path: Option<PathBuf>,
    /// Start from the built-in tables.
    pub include_builtin: bool,
}

impl Default for FieldmapperConfig {
    fn default() -> Self {
        Self {
            table_path: None,
            include_builtin: true,
        }
    }
}

/// Lookup from class tag to field table.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    classes: HashMap<String, Arc<ClassDef>>,
    version: Option<String>,
}

impl FieldRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in core tables.
    pub fn builtin() -> Self {
        super::builtin::registry()
    }

    /// Build a registry from configuration.
    pub fn from_config(config: &FieldmapperConfig) -> Result<Self> {
        let mut registry = if config.include_builtin {
            Self::builtin()
        } else {
            Self::new()
        };
        if let Some(path) = &config.table_path {
            registry.merge(Self::load_file(path)?);
        }
        Ok(registry)
    }

    /// Parse a table file (YAML, or JSON since YAML is a superset).
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let file: TableFile = serde_yaml::from_str(source)
            .map_err(|e| GatewayError::Config(format!("invalid field table: {e}")))?;

        let mut registry = Self {
            classes: HashMap::with_capacity(file.classes.len()),
            version: file.version,
        };
        for (tag, spec) in file.classes {
            let mut def = ClassDef::new(&tag, spec.fields)?;
            if let Some(pkey) = spec.pkey {
                def = def.with_pkey(&pkey);
            }
            for (field, class) in spec.links {
                def = def.with_link(&field, &class);
            }
            registry.register(def);
        }
        Ok(registry)
    }

    /// Load a table file from disk.
    pub fn load_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!("cannot read field table {}: {e}", path.display()))
        })?;
        let registry = Self::from_yaml_str(&source)?;
        debug!(
            path = %path.display(),
            classes = registry.len(),
            version = registry.version().unwrap_or("unversioned"),
            "Loaded fieldmapper tables"
        );
        Ok(registry)
    }

    /// Add or replace a class table.
    pub fn register(&mut self, def: ClassDef) {
        self.classes.insert(def.tag.clone(), Arc::new(def));
    }

    /// Overlay another registry; its tables win on conflicts.
    pub fn merge(&mut self, other: FieldRegistry) {
        if other.version.is_some() {
            self.version = other.version;
        }
        self.classes.extend(other.classes);
    }

    pub fn get(&self, tag: &str) -> Option<&ClassDef> {
        self.classes.get(tag).map(Arc::as_ref)
    }

    /// Like [`get`](Self::get) but fails with `UnknownClass`.
    pub fn require(&self, tag: &str) -> Result<&ClassDef> {
        self.get(tag)
            .ok_or_else(|| GatewayError::UnknownClass(tag.to_string()))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.classes.contains_key(tag)
    }

    /// Registered class tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Schema version the tables describe, when known.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub(crate) fn set_version(&mut self, version: &str) {
        self.version = Some(version.to_string());
    }
}
