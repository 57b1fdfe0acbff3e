//! Heuristic scan of handler source for the request parameters an action reads.
//!
//! This is the least precise part of route extraction: it pattern-matches
//! strong-parameter idioms in raw source text instead of evaluating code.
//! It sits behind [`SourceParamScanner`] so callers can swap or stub it.

use crate::extractor::param_types::{ParamTypeInferencer, SemanticType};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

/// Keys the framework injects into every request; never reported.
const RESERVED_KEYS: &[&str] = &["controller", "action", "format", "id"];

static ACTION_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\s*def\s|\n\s*private\s|\n\s*protected\s|\nend\s*\z")
        .expect("valid action terminator regex")
});
static REQUIRE_PERMIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)params\.require\(:(\w+)\)\.permit\((.*?)\)")
        .expect("valid require/permit regex")
});
static BARE_PERMIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)params\.permit\((.*?)\)").expect("valid permit regex"));
static BRACKET_ACCESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"params\[['"]?:?(\w+)['"]?\]"#).expect("valid params access regex")
});
static SYMBOL: Lazy<Regex> = Lazy::new(|| Regex::new(r":(\w+)").expect("valid symbol regex"));

/// One parameter an action appears to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamGuess {
    pub name: String,
    pub inferred_type: SemanticType,
    pub required: bool,
}

/// Strategy that guesses an action's parameters from handler source text.
pub trait SourceParamScanner {
    /// Returns the parameters `action` appears to read, in order of first
    /// appearance, without duplicate names.
    fn scan(&self, source: &str, action: &str) -> Vec<ParamGuess>;
}

/// Recognises three idioms inside the action body:
///
/// 1. `params.require(:post).permit(:title, :body)` -> `post[title]`, `post[body]` (required)
/// 2. `params.permit(:page, :per_page)` -> `page`, `per_page` (optional)
/// 3. `params[:q]` / `params["q"]` -> `q` (optional)
pub struct PermittedParamsScanner;

impl SourceParamScanner for PermittedParamsScanner {
    fn scan(&self, source: &str, action: &str) -> Vec<ParamGuess> {
        let Some(body) = action_body(source, action) else {
            debug!("No body found for action `{}`", action);
            return Vec::new();
        };

        let mut params: Vec<ParamGuess> = Vec::new();

        // Only the first require/permit chain of an action is considered
        if let Some(caps) = REQUIRE_PERMIT.captures(body) {
            let model_key = &caps[1];
            for attr in symbols(&caps[2]) {
                push_unique(
                    &mut params,
                    ParamGuess {
                        name: format!("{}[{}]", model_key, attr),
                        inferred_type: ParamTypeInferencer::infer(attr),
                        required: true,
                    },
                );
            }
        }

        for caps in BARE_PERMIT.captures_iter(body) {
            let permitted = caps.get(1).map_or("", |m| m.as_str());
            for attr in symbols(permitted) {
                if !already_covered(&params, attr) {
                    push_unique(&mut params, optional(attr));
                }
            }
        }

        for caps in BRACKET_ACCESS.captures_iter(body) {
            let key = caps.get(1).map_or("", |m| m.as_str());
            if RESERVED_KEYS.contains(&key) || already_covered(&params, key) {
                continue;
            }
            push_unique(&mut params, optional(key));
        }

        params
    }
}

/// Isolates the text of `def <action>` up to the next method definition,
/// visibility section, or the class-closing `end` at end of file.
pub fn action_body<'a>(source: &'a str, action: &str) -> Option<&'a str> {
    let def = Regex::new(&format!(r"def\s+{}\b", regex::escape(action))).ok()?;
    let start = def.find(source)?;
    let end = ACTION_END.find(&source[start.end()..])?;
    Some(&source[start.start()..start.end() + end.start()])
}

fn symbols(list: &str) -> impl Iterator<Item = &str> {
    SYMBOL
        .captures_iter(list)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

fn optional(name: &str) -> ParamGuess {
    ParamGuess {
        name: name.to_string(),
        inferred_type: ParamTypeInferencer::infer(name),
        required: false,
    }
}

/// True when `attr` is already reported, either verbatim or as a nested
/// `key[attr]` / `attr[...]` entry.
fn already_covered(params: &[ParamGuess], attr: &str) -> bool {
    let nested_leaf = format!("[{}]", attr);
    let nested_root = format!("{}[", attr);
    params.iter().any(|p| {
        p.name == attr || p.name.ends_with(&nested_leaf) || p.name.starts_with(&nested_root)
    })
}

fn push_unique(params: &mut Vec<ParamGuess>, guess: ParamGuess) {
    if !params.iter().any(|p| p.name == guess.name) {
        params.push(guess);
    }
}
