use crate::config::Configuration;
use crate::error::ReflectionError;
use crate::extractor::routes::scalar_to_string;
use crate::inflect::classify;
use crate::scanner::SourceTree;
use log::{debug, info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Model namespaces owned by well-known libraries and engines.
const EXCLUDED_MODEL_NAMESPACES: &[&str] = &[
    "RailsMap",
    "ActionMailbox",
    "ActionText",
    "ActiveStorage",
    "Turbo",
    "Devise",
    "Sidekiq",
    "SolidQueue",
    "SolidCache",
    "GoodJob",
    "Que",
    "Delayed",
    "Flipper",
    "PgHero",
    "Blazer",
    "Avo",
    "MissionControl",
    "Administrate",
    "RailsAdmin",
    "Ahoy",
];

/// Prefix of generated join-table classes.
const JOIN_TABLE_PREFIX: &str = "HABTM_";

/// Naming convention of methods backing a declared scope.
const SCOPE_METHOD_PREFIX: &str = "_scope_";

/// Class-level methods that are never scopes.
const STRUCTURAL_METHODS: &[&str] = &["table_name", "primary_key", "inheritance_column"];

/// Validator options that only control when a validation runs.
const CONDITIONAL_OPTIONS: &[&str] = &["if", "unless"];

/// Reflective access to one ORM-mapped class.
///
/// Every capability is independently fallible so one broken reflection
/// (a missing table, a relation pointing at an unloaded class, ...) never
/// hides the rest of the model.
pub trait ModelIntrospector {
    /// Fully qualified class name (`Admin::UserProfile`), if the class has one.
    fn name(&self) -> Option<String>;

    fn is_abstract(&self) -> bool;

    /// Confirms the class can be reflected at all. An `Err` skips the model.
    fn resolve(&self) -> Result<(), ReflectionError> {
        Ok(())
    }

    fn table_name(&self) -> Result<Option<String>, ReflectionError>;

    fn primary_key(&self) -> Result<Option<String>, ReflectionError>;

    fn table_exists(&self) -> Result<bool, ReflectionError>;

    fn columns(&self) -> Result<Vec<ColumnInfo>, ReflectionError>;

    fn associations(&self) -> Result<Vec<AssociationReflection>, ReflectionError>;

    fn validators(&self) -> Result<Vec<ValidatorReflection>, ReflectionError>;

    /// Declared scope names, when the ORM keeps a registry of them.
    fn scope_registry(&self) -> Option<Result<Vec<String>, ReflectionError>> {
        None
    }

    /// All class-level method names, inherited ones included.
    fn method_names(&self) -> Result<Vec<String>, ReflectionError>;

    /// Class-level methods defined directly on this class.
    fn singleton_methods(&self) -> Result<Vec<String>, ReflectionError>;

    fn method_arity(&self, name: &str) -> Result<i32, ReflectionError>;
}

/// The set of ORM-mapped classes of a running application.
pub trait OrmRegistry {
    /// Forces the host application's model classes to load so that
    /// [`models`](OrmRegistry::models) sees them.
    fn eager_load(&self, source: &SourceTree) -> Result<(), ReflectionError>;

    /// Every mapped class known to the ORM. An `Err` means the ORM is
    /// unavailable as a whole.
    fn models(&self) -> Result<Vec<&dyn ModelIntrospector>, ReflectionError>;
}

/// One column of a model's backing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default, deserialize_with = "scalar_text")]
    pub default: Option<String>,
    #[serde(default = "nullable_by_default")]
    pub nullable: bool,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub precision: Option<u32>,
    #[serde(default)]
    pub scale: Option<u32>,
}

fn nullable_by_default() -> bool {
    true
}

/// Text form of whatever scalar the ORM reported; `null` stays absent.
fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_null()).map(|v| scalar_to_string(&v)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    BelongsTo,
    HasOne,
    HasMany,
    HasAndBelongsToMany,
}

impl AssociationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssociationKind::BelongsTo => "belongs_to",
            AssociationKind::HasOne => "has_one",
            AssociationKind::HasMany => "has_many",
            AssociationKind::HasAndBelongsToMany => "has_and_belongs_to_many",
        }
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relation as the ORM reflects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationReflection {
    pub name: String,
    #[serde(rename = "macro")]
    pub kind: AssociationKind,
    /// Explicit target class, when the declaration overrides the convention
    #[serde(default)]
    pub class_name: Option<String>,
    /// Composite keys keep their list notation (`["shop_id","order_id"]`)
    #[serde(default, deserialize_with = "scalar_text")]
    pub foreign_key: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
}

/// A validator as the ORM reflects it; one validator may cover several
/// attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorReflection {
    pub kind: String,
    pub attributes: Vec<String>,
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
}

/// Options of a relation that matter to a reader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssociationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub through: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub polymorphic: bool,
    /// Inverse role name of a polymorphic relation (`as:`)
    #[serde(rename = "as", skip_serializing_if = "Option::is_none")]
    pub inverse_as: Option<String>,
}

impl AssociationOptions {
    fn from_reflection(options: &BTreeMap<String, serde_json::Value>) -> Self {
        let text = |key: &str| {
            options
                .get(key)
                .filter(|v| is_truthy(v))
                .map(scalar_to_string)
        };
        Self {
            dependent: text("dependent"),
            through: text("through"),
            polymorphic: options.get("polymorphic").is_some_and(is_truthy),
            inverse_as: text("as"),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    !matches!(value, serde_json::Value::Null | serde_json::Value::Bool(false))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssociationInfo {
    pub name: String,
    pub kind: AssociationKind,
    pub target_class_name: String,
    pub foreign_key: Option<String>,
    pub options: AssociationOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationInfo {
    pub attribute: String,
    pub kind: String,
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeInfo {
    pub name: String,
    pub arity: i32,
}

/// Everything documented about one host-owned model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelRecord {
    pub name: String,
    pub table_name: Option<String>,
    pub primary_key: Option<String>,
    /// Sorted by name
    pub columns: Vec<ColumnInfo>,
    /// Sorted by name
    pub associations: Vec<AssociationInfo>,
    /// Sorted by `(attribute, kind)`; empty when validations are disabled
    pub validations: Vec<ValidationInfo>,
    /// Sorted by name; empty when scopes are disabled
    pub scopes: Vec<ScopeInfo>,
}

/// Enumerates ORM classes and reflects the host-owned ones into
/// [`ModelRecord`]s.
pub struct ModelExtractor {
    include_validations: bool,
    include_scopes: bool,
}

impl ModelExtractor {
    pub fn new(config: &Configuration) -> Self {
        Self {
            include_validations: config.include_validations,
            include_scopes: config.include_scopes,
        }
    }

    /// Reflects every host-owned model, keyed and sorted by model name.
    ///
    /// Never fails: an unavailable registry yields an empty map, and a model
    /// that cannot be reflected is skipped with a warning.
    pub fn extract(
        &self,
        registry: &dyn OrmRegistry,
        source: &SourceTree,
    ) -> BTreeMap<String, ModelRecord> {
        if let Err(e) = registry.eager_load(source) {
            warn!("Could not eager load models: {}", e);
        }

        let classes = match registry.models() {
            Ok(classes) => classes,
            Err(e) => {
                warn!("ORM registry unavailable: {}", e);
                return BTreeMap::new();
            }
        };
        debug!("ORM registry has {} classes", classes.len());

        let mut models = BTreeMap::new();
        for class in classes {
            let Some(name) = self.host_model_name(class, source) else {
                continue;
            };
            match self.reflect_model(class, &name) {
                Ok(record) => {
                    models.insert(name, record);
                }
                Err(e) => warn!("Could not parse model {}: {}", name, e),
            }
        }

        info!("Collected {} models", models.len());
        models
    }

    /// The class name, if the class is a concrete, host-owned model.
    fn host_model_name(&self, class: &dyn ModelIntrospector, source: &SourceTree) -> Option<String> {
        if class.is_abstract() {
            return None;
        }
        let name = class.name().filter(|n| !n.is_empty())?;
        if is_join_table(&name) || is_excluded_model(&name) {
            debug!("Skipping library model {}", name);
            return None;
        }
        if !source.has_model(&name) {
            debug!("Skipping model {} without a source file", name);
            return None;
        }
        Some(name)
    }

    fn reflect_model(
        &self,
        model: &dyn ModelIntrospector,
        name: &str,
    ) -> Result<ModelRecord, ReflectionError> {
        model.resolve()?;

        let table_name = model.table_name().unwrap_or_else(|e| {
            warn!("Could not read table name of {}: {}", name, e);
            None
        });
        let primary_key = model.primary_key().unwrap_or_else(|e| {
            warn!("Could not read primary key of {}: {}", name, e);
            Some("id".to_string())
        });

        Ok(ModelRecord {
            name: name.to_string(),
            table_name,
            primary_key,
            columns: reflect_columns(model, name),
            associations: reflect_associations(model, name),
            validations: if self.include_validations {
                reflect_validations(model, name)
            } else {
                Vec::new()
            },
            scopes: if self.include_scopes {
                reflect_scopes(model, name)
            } else {
                Vec::new()
            },
        })
    }
}

/// True for classes in a library/engine namespace.
pub fn is_excluded_model(name: &str) -> bool {
    let first_namespace = name.split("::").next().unwrap_or(name);
    EXCLUDED_MODEL_NAMESPACES
        .iter()
        .any(|ns| first_namespace == *ns || name.starts_with(&format!("{}::", ns)))
}

/// True for auto-generated join-table classes such as `User::HABTM_Roles`.
pub fn is_join_table(name: &str) -> bool {
    name.split("::").any(|segment| segment.starts_with(JOIN_TABLE_PREFIX))
}

fn reflect_columns(model: &dyn ModelIntrospector, name: &str) -> Vec<ColumnInfo> {
    match model.table_exists() {
        Ok(true) => {}
        Ok(false) => {
            debug!("Table of {} does not exist", name);
            return Vec::new();
        }
        Err(e) => {
            warn!("Could not check table of {}: {}", name, e);
            return Vec::new();
        }
    }

    match model.columns() {
        Ok(mut columns) => {
            columns.sort_by(|a, b| a.name.cmp(&b.name));
            columns
        }
        Err(e) => {
            warn!("Could not read columns of {}: {}", name, e);
            Vec::new()
        }
    }
}

fn reflect_associations(model: &dyn ModelIntrospector, name: &str) -> Vec<AssociationInfo> {
    let reflections = match model.associations() {
        Ok(reflections) => reflections,
        Err(e) => {
            warn!("Could not read associations of {}: {}", name, e);
            return Vec::new();
        }
    };

    let mut associations: Vec<AssociationInfo> = reflections
        .into_iter()
        .map(|assoc| AssociationInfo {
            target_class_name: assoc
                .class_name
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| classify(&assoc.name)),
            foreign_key: assoc.foreign_key.clone().filter(|fk| !fk.is_empty()),
            options: AssociationOptions::from_reflection(&assoc.options),
            kind: assoc.kind,
            name: assoc.name,
        })
        .collect();
    associations.sort_by(|a, b| a.name.cmp(&b.name));
    associations
}

fn reflect_validations(model: &dyn ModelIntrospector, name: &str) -> Vec<ValidationInfo> {
    let validators = match model.validators() {
        Ok(validators) => validators,
        Err(e) => {
            warn!("Could not read validations of {}: {}", name, e);
            return Vec::new();
        }
    };

    let mut validations: Vec<ValidationInfo> = validators
        .iter()
        .flat_map(|validator| {
            let options: BTreeMap<String, String> = validator
                .options
                .iter()
                .filter(|(key, _)| !CONDITIONAL_OPTIONS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), scalar_to_string(value)))
                .collect();
            validator.attributes.iter().map(move |attribute| ValidationInfo {
                attribute: attribute.clone(),
                kind: validator.kind.clone(),
                options: options.clone(),
            })
        })
        .collect();
    validations.sort_by(|a, b| (&a.attribute, &a.kind).cmp(&(&b.attribute, &b.kind)));
    validations
}

/// Discovers scopes with three strategies, first applicable wins:
/// the ORM's scope registry, `_scope_*` methods, then singleton methods
/// minus structural ones.
fn reflect_scopes(model: &dyn ModelIntrospector, name: &str) -> Vec<ScopeInfo> {
    let mut names = discover_scope_names(model, name);
    names.sort();
    names.dedup();

    names
        .into_iter()
        .map(|scope| {
            let arity = model.method_arity(&scope).unwrap_or_else(|e| {
                debug!("Could not read arity of {}.{}: {}", name, scope, e);
                0
            });
            ScopeInfo { name: scope, arity }
        })
        .collect()
}

fn discover_scope_names(model: &dyn ModelIntrospector, name: &str) -> Vec<String> {
    match model.scope_registry() {
        Some(Ok(names)) => return names,
        Some(Err(e)) => debug!("Scope registry of {} unavailable: {}", name, e),
        None => {}
    }

    match model.method_names() {
        Ok(methods) => {
            let names: Vec<String> = methods
                .iter()
                .filter_map(|m| m.strip_prefix(SCOPE_METHOD_PREFIX))
                .filter(|scope| !scope.is_empty())
                .map(str::to_string)
                .collect();
            if !names.is_empty() {
                return names;
            }
        }
        Err(e) => debug!("Could not list methods of {}: {}", name, e),
    }

    match model.singleton_methods() {
        Ok(methods) => methods
            .into_iter()
            .filter(|m| !STRUCTURAL_METHODS.contains(&m.as_str()))
            .collect(),
        Err(e) => {
            warn!("Could not discover scopes of {}: {}", name, e);
            Vec::new()
        }
    }
}
