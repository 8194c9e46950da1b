//! Path template handling.
//!
//! ISS path templates mark parameters as `[name]` segments, e.g.
//! `engines/[engine]/markets/[market]/securities`. Substitution is plain
//! substring replacement; templates never nest or escape placeholders.

use crate::error::{IssError, IssResult};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// A concrete request path plus the parameters left for the query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPath {
    pub path: String,
    pub query: BTreeMap<String, String>,
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(\w+)\]").expect("placeholder regex is valid"))
}

/// Placeholder names in `path`, left to right, first occurrence wins.
pub fn required_args(path: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for cap in placeholder_re().captures_iter(path) {
        let name = &cap[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Substitute every required parameter into `template`.
///
/// Each value comes from `supplied`, falling back to `defaults`. Supplied
/// entries that are not consumed by the path are returned as query
/// parameters.
pub fn resolve(
    template: &str,
    required: &[String],
    supplied: &BTreeMap<String, String>,
    defaults: &BTreeMap<String, String>,
) -> IssResult<ResolvedPath> {
    let mut path = template.to_string();
    let mut query = supplied.clone();

    for name in required {
        let value = supplied
            .get(name)
            .or_else(|| defaults.get(name))
            .ok_or_else(|| IssError::MissingRequiredParameter(name.clone()))?;
        path = path.replacen(&format!("[{name}]"), value, 1);
        query.remove(name);
    }

    Ok(ResolvedPath { path, query })
}

/// Substitute only the given values, leaving other placeholders intact.
pub fn substitute(template: &str, values: &BTreeMap<String, String>) -> String {
    values.iter().fold(template.to_string(), |path, (name, value)| {
        path.replacen(&format!("[{name}]"), value, 1)
    })
}
