//! In-memory aggregate handed from the extractors to the site generator.

use crate::extractor::models::ModelRecord;
use crate::extractor::HandlerGroup;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Handler name used as a map key.
///
/// Keys stay case-sensitive (`Admin` and `admin` are different handlers) but
/// order case-insensitively, with the exact spelling as a tie-breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerKey(String);

impl HandlerKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for HandlerKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .to_lowercase()
            .cmp(&other.0.to_lowercase())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for HandlerKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for HandlerKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Handler groups keyed by handler name, iterated case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HandlerGroups {
    groups: BTreeMap<HandlerKey, HandlerGroup>,
}

impl HandlerGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handler_name: impl Into<String>, group: HandlerGroup) {
        self.groups.insert(HandlerKey(handler_name.into()), group);
    }

    pub fn get(&self, handler_name: &str) -> Option<&HandlerGroup> {
        self.groups.get(&HandlerKey(handler_name.to_string()))
    }

    pub fn contains(&self, handler_name: &str) -> bool {
        self.get(handler_name).is_some()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HandlerGroup)> {
        self.groups.iter().map(|(key, group)| (key.as_str(), group))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(HandlerKey::as_str)
    }

    /// Total number of routes across every group.
    pub fn route_count(&self) -> usize {
        self.groups.values().map(|g| g.routes.len()).sum()
    }
}

/// Everything one generation pass documents.
///
/// Both maps iterate in a fixed order so that rendering the same tree twice
/// produces identical output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentTree {
    pub handler_groups: HandlerGroups,
    pub models: BTreeMap<String, ModelRecord>,
}

impl DocumentTree {
    pub fn new(handler_groups: HandlerGroups, models: BTreeMap<String, ModelRecord>) -> Self {
        Self {
            handler_groups,
            models,
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handler_groups.len()
    }

    pub fn route_count(&self) -> usize {
        self.handler_groups.route_count()
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }
}
