use crate::document::HandlerGroups;
use crate::error::ReflectionError;
use crate::extractor::param_types::ParamTypeInferencer;
use crate::extractor::source_params::{ParamGuess, PermittedParamsScanner, SourceParamScanner};
use crate::extractor::{HandlerGroup, ParamInfo, ParamLocation, RouteRecord};
use crate::scanner::SourceTree;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

/// Paths under this prefix belong to the framework itself.
const RESERVED_PATH_PREFIX: &str = "/rails/";

/// Format suffix the framework appends to most path patterns.
const FORMAT_SUFFIX: &str = "(.:format)";

/// Handler namespaces owned by well-known libraries and engines.
const EXCLUDED_HANDLER_NAMESPACES: &[&str] = &[
    "rails_map",
    "action_mailbox",
    "action_cable",
    "active_storage",
    "action_text",
    "turbo",
    "devise",
    "sidekiq",
    "letter_opener",
    "better_errors",
    "web_console",
    "solid_queue",
    "solid_cache",
    "mission_control",
    "rails",
    "graphiql",
    "pghero",
    "blazer",
    "flipper",
    "rswag",
    "swagger",
    "avo",
    "administrate",
    "rails_admin",
    "good_job",
    "que",
    "delayed",
];

/// Source of raw routing-table entries.
pub trait RoutingTable {
    /// Returns every entry of the routing table, in declaration order.
    ///
    /// An `Err` means the routing table is unavailable as a whole.
    fn entries(&self) -> Result<Vec<RouteEntry>, ReflectionError>;
}

impl RoutingTable for Vec<RouteEntry> {
    fn entries(&self) -> Result<Vec<RouteEntry>, ReflectionError> {
        Ok(self.clone())
    }
}

/// One raw routing-table entry as the framework exposes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    #[serde(default)]
    pub verb: Option<VerbMatcher>,
    /// Path pattern as printed by the framework, e.g. `/widgets/:id(.:format)`
    pub path: String,
    #[serde(default)]
    pub requirements: BTreeMap<String, RequirementValue>,
    #[serde(default)]
    pub defaults: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub internal: bool,
}

/// HTTP verb of an entry: either a literal (`"GET"`, `"GET|POST"`) or a
/// matcher pattern (`^GET$`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerbMatcher {
    Pattern { pattern: String },
    Literal(String),
}

/// Value of a named requirement: a regular expression or a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequirementValue {
    Regexp { regexp: String },
    Literal(serde_json::Value),
}

impl RequirementValue {
    /// Matcher source for regular expressions, string form otherwise.
    pub fn to_constraint_string(&self) -> String {
        match self {
            RequirementValue::Regexp { regexp } => regexp.clone(),
            RequirementValue::Literal(value) => scalar_to_string(value),
        }
    }

    fn as_name(&self) -> Option<String> {
        match self {
            RequirementValue::Literal(serde_json::Value::String(s)) if !s.is_empty() => {
                Some(s.clone())
            }
            _ => None,
        }
    }
}

impl RouteEntry {
    /// Creates an entry routed to `handler#action` with no constraints.
    pub fn new(verb: &str, path: &str, handler_name: &str, action_name: &str) -> Self {
        let mut requirements = BTreeMap::new();
        requirements.insert(
            "controller".to_string(),
            RequirementValue::Literal(serde_json::Value::String(handler_name.to_string())),
        );
        requirements.insert(
            "action".to_string(),
            RequirementValue::Literal(serde_json::Value::String(action_name.to_string())),
        );
        Self {
            verb: Some(VerbMatcher::Literal(verb.to_string())),
            path: path.to_string(),
            requirements,
            defaults: BTreeMap::new(),
            name: None,
            internal: false,
        }
    }

    pub fn handler_name(&self) -> Option<String> {
        self.routing_target("controller")
    }

    pub fn action_name(&self) -> Option<String> {
        self.routing_target("action")
    }

    /// Reads `key` from the requirements, falling back to the defaults.
    fn routing_target(&self, key: &str) -> Option<String> {
        self.requirements
            .get(key)
            .and_then(RequirementValue::as_name)
            .or_else(|| match self.defaults.get(key) {
                Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
    }
}

/// Walks a routing table and builds per-handler route documentation.
///
/// Framework-internal routes, routes under the reserved `/rails/` prefix,
/// routes of known library namespaces, and routes whose handler has no source
/// file in the host application are skipped.
pub struct RouteExtractor {
    scanner: Box<dyn SourceParamScanner>,
}

impl Default for RouteExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteExtractor {
    /// Creates an extractor using the [`PermittedParamsScanner`].
    pub fn new() -> Self {
        Self::with_scanner(Box::new(PermittedParamsScanner))
    }

    pub fn with_scanner(scanner: Box<dyn SourceParamScanner>) -> Self {
        Self { scanner }
    }

    /// Extracts and groups every host-owned route.
    ///
    /// Never fails: an unavailable routing table yields an empty map, and a
    /// handler source file that cannot be read yields routes without
    /// query/body parameters.
    pub fn extract(&self, table: &dyn RoutingTable, source: &SourceTree) -> HandlerGroups {
        let entries = match table.entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Routing table unavailable: {}", e);
                return HandlerGroups::new();
            }
        };
        debug!("Routing table has {} entries", entries.len());

        let records: Vec<RouteRecord> = entries
            .iter()
            .filter_map(|entry| self.build_record(entry, source))
            .collect();
        info!("Collected {} routes", records.len());

        let groups = group_by_handler(records);
        info!("Grouped into {} handlers", groups.len());
        groups
    }

    fn build_record(&self, entry: &RouteEntry, source: &SourceTree) -> Option<RouteRecord> {
        let (Some(handler_name), Some(action_name)) = (entry.handler_name(), entry.action_name())
        else {
            debug!("Skipping route without handler/action: {}", entry.path);
            return None;
        };

        if is_excluded(entry, &handler_name, source) {
            debug!("Skipping excluded route: {} -> {}#{}", entry.path, handler_name, action_name);
            return None;
        }

        let path = strip_format_suffix(&entry.path);
        let guesses = self.scan_action_params(&handler_name, &action_name, source);

        Some(RouteRecord {
            verb: extract_verb(entry.verb.as_ref()),
            base_path: extract_base_path(&path),
            path_params: extract_path_params(&path),
            query_params: to_params(&guesses, ParamLocation::Query),
            body_params: to_params(&guesses, ParamLocation::Body),
            constraints: extract_constraints(entry),
            defaults: extract_defaults(entry),
            route_name: entry.name.clone().filter(|n| !n.is_empty()),
            handler_name,
            action_name,
            path,
        })
    }

    /// Query and body parameters come from the same source scan.
    fn scan_action_params(
        &self,
        handler_name: &str,
        action_name: &str,
        source: &SourceTree,
    ) -> Vec<ParamGuess> {
        let file = source.controller_file(handler_name);
        match fs::read_to_string(&file) {
            Ok(content) => self.scanner.scan(&content, action_name),
            Err(e) => {
                warn!(
                    "Could not read params for {}#{} from {}: {}",
                    handler_name,
                    action_name,
                    file.display(),
                    e
                );
                Vec::new()
            }
        }
    }
}

fn is_excluded(entry: &RouteEntry, handler_name: &str, source: &SourceTree) -> bool {
    entry.internal
        || entry.path.starts_with(RESERVED_PATH_PREFIX)
        || is_excluded_handler(handler_name)
        || !source.has_controller(handler_name)
}

/// True for handlers in a library/engine namespace.
pub fn is_excluded_handler(handler_name: &str) -> bool {
    if handler_name.is_empty() {
        return true;
    }
    let lowered = handler_name.to_lowercase();
    let first_segment = lowered.split('/').next().unwrap_or("");
    EXCLUDED_HANDLER_NAMESPACES
        .iter()
        .any(|ns| first_segment == *ns || lowered.starts_with(&format!("{}/", ns)))
}

/// Literal verbs are kept, matcher patterns lose their anchors, and anything
/// empty means every verb.
pub fn extract_verb(verb: Option<&VerbMatcher>) -> String {
    let verb = match verb {
        Some(VerbMatcher::Literal(literal)) => literal.clone(),
        Some(VerbMatcher::Pattern { pattern }) => pattern.replace(['^', '$'], ""),
        None => String::new(),
    };
    if verb.is_empty() {
        "ANY".to_string()
    } else {
        verb
    }
}

pub fn strip_format_suffix(path: &str) -> String {
    path.strip_suffix(FORMAT_SUFFIX).unwrap_or(path).to_string()
}

/// Longest segment prefix of `path` that contains no parameter markers.
///
/// `/widgets/:id` -> `/widgets`, `/:locale/posts` -> `/`.
pub fn extract_base_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .take_while(|s| !s.contains([':', '*', '(']))
        .collect();
    format!("/{}", segments.join("/"))
}

/// Named segments (`:name` and `*name`) of `path`, left to right.
///
/// Segments inside an optional group `( ... )` are not required.
pub fn extract_path_params(path: &str) -> Vec<ParamInfo> {
    let mut params = Vec::new();
    let mut depth = 0usize;
    let mut chars = path.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ':' | '*' => {
                let start = idx + c.len_utf8();
                let mut end = start;
                while let Some(&(next_idx, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        end = next_idx + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                if end > start {
                    let name = &path[start..end];
                    params.push(ParamInfo {
                        name: name.to_string(),
                        inferred_type: ParamTypeInferencer::infer(name),
                        required: depth == 0,
                        location: ParamLocation::Path,
                    });
                }
            }
            _ => {}
        }
    }

    params
}

fn to_params(guesses: &[ParamGuess], location: ParamLocation) -> Vec<ParamInfo> {
    guesses
        .iter()
        .map(|g| ParamInfo {
            name: g.name.clone(),
            inferred_type: g.inferred_type,
            required: g.required,
            location,
        })
        .collect()
}

fn is_routing_key(key: &str) -> bool {
    key == "controller" || key == "action"
}

fn extract_constraints(entry: &RouteEntry) -> BTreeMap<String, String> {
    entry
        .requirements
        .iter()
        .filter(|(key, _)| !is_routing_key(key))
        .map(|(key, value)| (key.clone(), value.to_constraint_string()))
        .collect()
}

fn extract_defaults(entry: &RouteEntry) -> BTreeMap<String, String> {
    entry
        .defaults
        .iter()
        .filter(|(key, _)| !is_routing_key(key))
        .map(|(key, value)| (key.clone(), scalar_to_string(value)))
        .collect()
}

/// Strings verbatim, null as empty, everything else in JSON notation.
pub(crate) fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// GET < POST < PUT < PATCH < DELETE < anything else.
pub fn verb_rank(verb: &str) -> u8 {
    match verb.to_uppercase().as_str() {
        "GET" => 0,
        "POST" => 1,
        "PUT" => 2,
        "PATCH" => 3,
        "DELETE" => 4,
        _ => 5,
    }
}

fn group_by_handler(records: Vec<RouteRecord>) -> HandlerGroups {
    let mut by_handler: BTreeMap<String, Vec<RouteRecord>> = BTreeMap::new();
    for record in records {
        by_handler
            .entry(record.handler_name.clone())
            .or_default()
            .push(record);
    }

    let mut groups = HandlerGroups::new();
    for (handler_name, mut routes) in by_handler {
        routes.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then_with(|| verb_rank(&a.verb).cmp(&verb_rank(&b.verb)))
        });

        let mut actions: Vec<String> = routes.iter().map(|r| r.action_name.clone()).collect();
        actions.sort();
        actions.dedup();

        let base_path = common_base_path(routes.iter().map(|r| r.base_path.as_str()));

        groups.insert(
            handler_name,
            HandlerGroup {
                routes,
                actions,
                base_path,
            },
        );
    }
    groups
}

/// Longest segment prefix shared by every base path; `/` when they diverge
/// at the first segment.
pub fn common_base_path<'a>(base_paths: impl IntoIterator<Item = &'a str>) -> String {
    let mut common: Option<Vec<&str>> = None;
    for base_path in base_paths {
        let segments: Vec<&str> = base_path.split('/').filter(|s| !s.is_empty()).collect();
        common = Some(match common {
            None => segments,
            Some(prefix) => prefix
                .iter()
                .zip(segments.iter())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| *a)
                .collect(),
        });
    }
    format!("/{}", common.unwrap_or_default().join("/"))
}
