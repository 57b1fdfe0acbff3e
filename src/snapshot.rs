//! Snapshot adapter for the host application's routing table and ORM registry.
//!
//! A snapshot is a JSON or YAML dump taken inside the running application:
//!
//! ```json
//! {
//!   "routes": [
//!     { "verb": "GET", "path": "/widgets/:id(.:format)",
//!       "requirements": { "controller": "widgets", "action": "show" } }
//!   ],
//!   "models": [
//!     { "name": "Widget", "table_name": "widgets",
//!       "columns": { "error": "PG::ConnectionBad" } }
//!   ]
//! }
//! ```
//!
//! Any reflected model field may be replaced by `{ "error": "..." }` to record
//! that this one capability failed. A field of an unexpected shape counts as
//! failed the same way. A route entry that cannot be read is dropped, and a
//! model entry that cannot be read is kept as an unresolvable model. A
//! missing `routes` or `models` key means the whole registry was unavailable.

use crate::error::ReflectionError;
use crate::extractor::models::{
    AssociationReflection, ColumnInfo, ModelIntrospector, OrmRegistry, ValidatorReflection,
};
use crate::extractor::routes::{RouteEntry, RoutingTable};
use crate::scanner::SourceTree;
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A reflected value, or the message of the failure that replaced it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Reflected<T> {
    Failed { error: String },
    Value(T),
    /// Anything not shaped like a value or a failure
    Unreadable(serde_json::Value),
}

impl<T: Clone> Reflected<T> {
    pub fn to_result(&self) -> Result<T, ReflectionError> {
        match self {
            Reflected::Failed { error } => Err(ReflectionError::new(error.clone())),
            Reflected::Value(value) => Ok(value.clone()),
            Reflected::Unreadable(raw) => {
                Err(ReflectionError::new(format!("unexpected value {}", raw)))
            }
        }
    }
}

impl<T: Default> Default for Reflected<T> {
    fn default() -> Self {
        Reflected::Value(T::default())
    }
}

fn table_exists_by_default() -> Reflected<bool> {
    Reflected::Value(true)
}

fn conventional_primary_key() -> Reflected<Option<String>> {
    Reflected::Value(Some("id".to_string()))
}

/// Reflection data of one ORM class.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelSnapshot {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// The class could not be reflected at all
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub table_name: Reflected<Option<String>>,
    #[serde(default = "conventional_primary_key")]
    pub primary_key: Reflected<Option<String>>,
    #[serde(default = "table_exists_by_default")]
    pub table_exists: Reflected<bool>,
    #[serde(default)]
    pub columns: Reflected<Vec<ColumnInfo>>,
    #[serde(default)]
    pub associations: Reflected<Vec<AssociationReflection>>,
    #[serde(default)]
    pub validators: Reflected<Vec<ValidatorReflection>>,
    /// Present only when the ORM keeps a scope registry
    #[serde(default)]
    pub defined_scopes: Option<Reflected<Vec<String>>>,
    #[serde(default)]
    pub methods: Reflected<Vec<String>>,
    #[serde(default)]
    pub singleton_methods: Reflected<Vec<String>>,
    #[serde(default)]
    pub method_arities: BTreeMap<String, i32>,
}

impl ModelSnapshot {
    /// A model entry that could not be read; only its name survives.
    pub fn unreadable(name: Option<String>, message: impl Into<String>) -> Self {
        Self {
            name,
            is_abstract: false,
            error: Some(message.into()),
            table_name: Reflected::default(),
            primary_key: conventional_primary_key(),
            table_exists: table_exists_by_default(),
            columns: Reflected::default(),
            associations: Reflected::default(),
            validators: Reflected::default(),
            defined_scopes: None,
            methods: Reflected::default(),
            singleton_methods: Reflected::default(),
            method_arities: BTreeMap::new(),
        }
    }

    fn from_value(value: serde_json::Value) -> Self {
        let name = value
            .get("name")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(
                "Unreadable snapshot entry for model {}: {}",
                name.as_deref().unwrap_or("<unnamed>"),
                e
            );
            Self::unreadable(name, format!("unreadable snapshot entry: {}", e))
        })
    }
}

impl ModelIntrospector for ModelSnapshot {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    fn resolve(&self) -> Result<(), ReflectionError> {
        match &self.error {
            Some(message) => Err(ReflectionError::new(message.clone())),
            None => Ok(()),
        }
    }

    fn table_name(&self) -> Result<Option<String>, ReflectionError> {
        self.table_name.to_result()
    }

    fn primary_key(&self) -> Result<Option<String>, ReflectionError> {
        self.primary_key.to_result()
    }

    fn table_exists(&self) -> Result<bool, ReflectionError> {
        self.table_exists.to_result()
    }

    fn columns(&self) -> Result<Vec<ColumnInfo>, ReflectionError> {
        self.columns.to_result()
    }

    fn associations(&self) -> Result<Vec<AssociationReflection>, ReflectionError> {
        self.associations.to_result()
    }

    fn validators(&self) -> Result<Vec<ValidatorReflection>, ReflectionError> {
        self.validators.to_result()
    }

    fn scope_registry(&self) -> Option<Result<Vec<String>, ReflectionError>> {
        self.defined_scopes.as_ref().map(Reflected::to_result)
    }

    fn method_names(&self) -> Result<Vec<String>, ReflectionError> {
        self.methods.to_result()
    }

    fn singleton_methods(&self) -> Result<Vec<String>, ReflectionError> {
        self.singleton_methods.to_result()
    }

    fn method_arity(&self, name: &str) -> Result<i32, ReflectionError> {
        self.method_arities
            .get(name)
            .copied()
            .ok_or_else(|| ReflectionError::new(format!("arity of {} not recorded", name)))
    }
}

/// Routing table and ORM registry of a host application, as dumped to disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppSnapshot {
    pub routes: Option<Vec<RouteEntry>>,
    pub models: Option<Vec<ModelSnapshot>>,
}

/// File layout before the entries are read one by one.
#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    routes: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    models: Option<Vec<serde_json::Value>>,
}

impl From<RawSnapshot> for AppSnapshot {
    fn from(raw: RawSnapshot) -> Self {
        let routes = raw.routes.map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .filter_map(|(index, value)| match serde_json::from_value(value) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("Dropping unreadable route entry #{}: {}", index, e);
                        None
                    }
                })
                .collect()
        });
        let models = raw
            .models
            .map(|entries| entries.into_iter().map(ModelSnapshot::from_value).collect());
        Self { routes, models }
    }
}

impl AppSnapshot {
    /// Loads a snapshot file, choosing YAML for `.yml`/`.yaml` and JSON otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading snapshot from {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        );
        let snapshot = if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
        .with_context(|| format!("Failed to parse snapshot file: {}", path.display()))?;

        debug!(
            "Snapshot has {} routes and {} models",
            snapshot.routes.as_ref().map_or(0, Vec::len),
            snapshot.models.as_ref().map_or(0, Vec::len)
        );
        Ok(snapshot)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let raw: RawSnapshot = serde_json::from_str(content).context("Invalid JSON snapshot")?;
        Ok(raw.into())
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let raw: RawSnapshot = serde_yaml::from_str(content).context("Invalid YAML snapshot")?;
        Ok(raw.into())
    }
}

impl RoutingTable for AppSnapshot {
    fn entries(&self) -> Result<Vec<RouteEntry>, ReflectionError> {
        self.routes
            .clone()
            .ok_or_else(|| ReflectionError::new("snapshot has no routing table"))
    }
}

impl OrmRegistry for AppSnapshot {
    /// Classes in a snapshot are already loaded; only reports what the source
    /// tree holds.
    fn eager_load(&self, source: &SourceTree) -> Result<(), ReflectionError> {
        if self.models.is_none() {
            return Err(ReflectionError::new("snapshot has no ORM registry"));
        }
        let model_files = source.model_files();
        debug!(
            "Snapshot taken with {} model source files under {} ({} unreadable paths)",
            model_files.ruby_files.len(),
            source.models_dir().display(),
            model_files.warnings.len()
        );
        Ok(())
    }

    fn models(&self) -> Result<Vec<&dyn ModelIntrospector>, ReflectionError> {
        let models = self
            .models
            .as_ref()
            .ok_or_else(|| ReflectionError::new("snapshot has no ORM registry"))?;
        Ok(models.iter().map(|m| m as &dyn ModelIntrospector).collect())
    }
}
