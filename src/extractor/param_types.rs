use serde::Serialize;
use std::fmt;

/// Best-effort semantic type of a request parameter, guessed from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Integer,
    Boolean,
    Datetime,
    Decimal,
    Email,
    Url,
    String,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Integer => "integer",
            SemanticType::Boolean => "boolean",
            SemanticType::Datetime => "datetime",
            SemanticType::Decimal => "decimal",
            SemanticType::Email => "email",
            SemanticType::Url => "url",
            SemanticType::String => "string",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a parameter name to a semantic type guess.
///
/// Rules are checked in order and the first match wins; anything unmatched
/// is a [`SemanticType::String`]. A bare `id`/`ids` counts as an id suffix.
pub struct ParamTypeInferencer;

impl ParamTypeInferencer {
    pub fn infer(name: &str) -> SemanticType {
        if matches!(name, "id" | "ids") || ends_with_any(name, &["_id", "_ids"]) {
            SemanticType::Integer
        } else if starts_with_any(name, &["is_", "has_"])
            || ends_with_any(name, &["_flag", "_enabled"])
        {
            SemanticType::Boolean
        } else if ends_with_any(name, &["_at", "_date"]) {
            SemanticType::Datetime
        } else if ends_with_any(name, &["_count", "_number"])
            || starts_with_any(name, &["count_", "num_"])
        {
            SemanticType::Integer
        } else if ends_with_any(name, &["_price", "_amount", "_total"]) {
            SemanticType::Decimal
        } else if ends_with_any(name, &["_email"]) {
            SemanticType::Email
        } else if ends_with_any(name, &["_url"]) {
            SemanticType::Url
        } else {
            SemanticType::String
        }
    }
}

fn ends_with_any(name: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|s| name.ends_with(s))
}

fn starts_with_any(name: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| name.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_examples() {
        assert_eq!(ParamTypeInferencer::infer("user_id"), SemanticType::Integer);
        assert_eq!(ParamTypeInferencer::infer("is_active"), SemanticType::Boolean);
        assert_eq!(ParamTypeInferencer::infer("created_at"), SemanticType::Datetime);
        assert_eq!(ParamTypeInferencer::infer("total_price"), SemanticType::Decimal);
        assert_eq!(ParamTypeInferencer::infer("contact_email"), SemanticType::Email);
        assert_eq!(ParamTypeInferencer::infer("homepage_url"), SemanticType::Url);
        assert_eq!(ParamTypeInferencer::infer("name"), SemanticType::String);
    }

    #[test]
    fn test_bare_primary_key_is_integer() {
        assert_eq!(ParamTypeInferencer::infer("id"), SemanticType::Integer);
        assert_eq!(ParamTypeInferencer::infer("ids"), SemanticType::Integer);
        assert_eq!(ParamTypeInferencer::infer("valid"), SemanticType::String);
    }

    #[test]
    fn test_rule_priority() {
        // "_ids" beats the boolean prefix
        assert_eq!(ParamTypeInferencer::infer("has_tag_ids"), SemanticType::Integer);
        // boolean prefix beats the datetime suffix
        assert_eq!(ParamTypeInferencer::infer("is_published_at"), SemanticType::Boolean);
        // datetime suffix beats the counter prefix
        assert_eq!(ParamTypeInferencer::infer("count_updated_at"), SemanticType::Datetime);
        assert_eq!(ParamTypeInferencer::infer("num_pages"), SemanticType::Integer);
        assert_eq!(ParamTypeInferencer::infer("order_total"), SemanticType::Decimal);
        assert_eq!(ParamTypeInferencer::infer("feature_enabled"), SemanticType::Boolean);
        assert_eq!(ParamTypeInferencer::infer("release_date"), SemanticType::Datetime);
    }

    #[test]
    fn test_total_on_odd_input() {
        assert_eq!(ParamTypeInferencer::infer(""), SemanticType::String);
        assert_eq!(ParamTypeInferencer::infer("_id"), SemanticType::Integer);
        assert_eq!(ParamTypeInferencer::infer("ID"), SemanticType::String);
        assert_eq!(ParamTypeInferencer::infer("post[title]"), SemanticType::String);
    }

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_string(&SemanticType::Datetime).unwrap();
        assert_eq!(json, "\"datetime\"");
        assert_eq!(SemanticType::Url.to_string(), "url");
    }
}
