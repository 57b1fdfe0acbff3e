//! Extraction of documentation records from a host application's live state.
//!
//! Two independent extractors feed the [`DocumentTree`](crate::document::DocumentTree):
//!
//! - [`routes::RouteExtractor`] walks a [`routes::RoutingTable`] and groups the
//!   resulting [`RouteRecord`]s into [`HandlerGroup`]s.
//! - [`models::ModelExtractor`] walks an [`models::OrmRegistry`] and reflects
//!   each host-owned class into a [`models::ModelRecord`].
//!
//! Both tolerate failures from their inputs: a capability that errors is
//! logged and degraded to an empty or default value, never propagated.
//!
//! # Example
//!
//! ```no_run
//! use rails_map::extractor::routes::RouteExtractor;
//! use rails_map::scanner::SourceTree;
//! use rails_map::snapshot::AppSnapshot;
//! use std::path::Path;
//!
//! let snapshot = AppSnapshot::load(Path::new("tmp/rails_map.json")).unwrap();
//! let source = SourceTree::new(".");
//! let groups = RouteExtractor::new().extract(&snapshot, &source);
//! println!("Found {} handlers", groups.len());
//! ```

pub mod models;
pub mod param_types;
pub mod routes;
pub mod source_params;

use param_types::SemanticType;
use serde::Serialize;
use std::collections::BTreeMap;

/// The location where a parameter value is read from in an HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    /// Named segment of the path pattern (e.g. `/users/:id`)
    Path,
    /// Query string parameter
    Query,
    /// Request body parameter
    Body,
}

/// A single parameter of a route, with its guessed type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub inferred_type: SemanticType,
    pub required: bool,
    pub location: ParamLocation,
}

/// One routing-table entry exposed by the host application.
///
/// Records are only built for entries with a resolvable handler and action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteRecord {
    /// HTTP method, or `"ANY"` when the route matches every verb
    pub verb: String,
    /// Path pattern with the optional format suffix removed
    pub path: String,
    /// Path-qualified handler name (e.g. `admin/users`)
    pub handler_name: String,
    pub action_name: String,
    /// Name used for reverse-URL generation, if any
    pub route_name: Option<String>,
    /// Segment name -> matcher source
    pub constraints: BTreeMap<String, String>,
    /// Segment name -> default value
    pub defaults: BTreeMap<String, String>,
    /// Longest path prefix without parameter segments
    pub base_path: String,
    /// One entry per named segment of `path`, in order of appearance
    pub path_params: Vec<ParamInfo>,
    pub query_params: Vec<ParamInfo>,
    pub body_params: Vec<ParamInfo>,
}

/// All routes owned by one handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerGroup {
    /// Ordered by `(path, verb rank)`
    pub routes: Vec<RouteRecord>,
    /// Deduplicated, alphabetically sorted action names
    pub actions: Vec<String>,
    /// Common prefix of the member routes' base paths
    pub base_path: String,
}
