//! Identifier transforms for generated schema names.
//!
//! ISS block and column names are lower- or upper-case tokens
//! (`boardgroups`, `SECID`); the schema wants camelCase fields, PascalCase
//! singular type names and snake_case row fields.

use crate::config::ReferenceSource;

/// Words that read the same in singular and plural.
const UNCOUNTABLE: &[&str] = &["data", "news", "series", "info", "history"];

/// Plural endings the suffix rules get wrong. Each pair starts with the
/// same letter so the caller's capitalisation of that letter survives.
const IRREGULAR: &[(&str, &str)] = &[
    ("indices", "index"),
    ("vertices", "vertex"),
    ("codices", "codex"),
    ("matrices", "matrix"),
    ("appendices", "appendix"),
    ("aliases", "alias"),
    ("atlases", "atlas"),
    ("gases", "gas"),
    ("people", "person"),
    ("children", "child"),
];

/// Split an identifier into words at separators, lower→upper transitions
/// and the end of an upper-case run (`XMLHttp` → `XML`, `Http`).
fn split_words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// `turnovers_prev_date` → `turnoversPrevDate`.
pub fn camel_case(s: &str) -> String {
    let words = split_words(s);
    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        if i == 0 {
            out.push_str(&word.to_lowercase());
        } else {
            out.push_str(&capitalize(word));
        }
    }
    out
}

/// `boardGroups` → `BoardGroups`.
pub fn pascal_case(s: &str) -> String {
    split_words(s).iter().map(|w| capitalize(w)).collect()
}

/// `PREVDATE` → `prevdate`, `boardGroups` → `board_groups`.
pub fn snake_case(s: &str) -> String {
    split_words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Singular form of an English plural, applied to the trailing word.
pub fn singular(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    let len = word.len();

    if UNCOUNTABLE.iter().any(|u| lower.ends_with(u)) {
        return word.to_string();
    }
    if IRREGULAR.iter().any(|(_, one)| lower.ends_with(one)) {
        return word.to_string();
    }
    if let Some((many, one)) = IRREGULAR.iter().find(|(many, _)| lower.ends_with(many)) {
        let keep = len - many.len() + 1;
        return format!("{}{}", &word[..keep], &one[1..]);
    }
    if lower.ends_with("ies") && len > 3 {
        return format!("{}y", &word[..len - 3]);
    }
    if ["sses", "xes", "ches", "shes"].iter().any(|s| lower.ends_with(s)) {
        return word[..len - 2].to_string();
    }
    // statuses, buses; but not causes or houses
    if lower.ends_with("uses")
        && len > 4
        && !matches!(lower.as_bytes()[len - 5], b'a' | b'o' | b'u')
    {
        return word[..len - 2].to_string();
    }
    if lower.ends_with('s') && !["ss", "us", "is"].iter().any(|s| lower.ends_with(s)) {
        return word[..len - 1].to_string();
    }
    word.to_string()
}

/// Query field name for a block: replacement first, then the prefix.
pub fn query_field_name(source: &ReferenceSource, block: &str) -> String {
    let replaced = source
        .name_replaces
        .get(block)
        .map(String::as_str)
        .unwrap_or(block);

    match &source.prefix {
        Some(prefix) => format!("{}{}", camel_case(prefix), pascal_case(replaced)),
        None => replaced.to_string(),
    }
}

/// Row type name for a query field: `securityBoards` → `SecurityBoard`.
pub fn row_type_name(query_field: &str) -> String {
    pascal_case(&singular(query_field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words() {
        assert_eq!(split_words("boardGroups"), vec!["board", "Groups"]);
        assert_eq!(split_words("XMLHttpRequest"), vec!["XML", "Http", "Request"]);
        assert_eq!(split_words("is_traded"), vec!["is", "traded"]);
        assert_eq!(split_words("SECID"), vec!["SECID"]);
    }

    #[test]
    fn test_case_transforms() {
        assert_eq!(camel_case("security"), "security");
        assert_eq!(camel_case("turnovers_prev_date"), "turnoversPrevDate");
        assert_eq!(pascal_case("boardgroups"), "Boardgroups");
        assert_eq!(pascal_case("boardGroups"), "BoardGroups");
        assert_eq!(snake_case("SECID"), "secid");
        assert_eq!(snake_case("boardGroups"), "board_groups");
        assert_eq!(snake_case("LOTSIZE"), "lotsize");
    }

    #[test]
    fn test_transforms_idempotent() {
        for s in [
            "turnoversPreviousDate",
            "board_groups",
            "SecurityBoard",
            "SECID",
            "securityIndices",
            "statuses",
            "aliases",
        ] {
            assert_eq!(camel_case(&camel_case(s)), camel_case(s));
            assert_eq!(pascal_case(&pascal_case(s)), pascal_case(s));
            assert_eq!(snake_case(&snake_case(s)), snake_case(s));
            assert_eq!(singular(&singular(s)), singular(s));
        }
    }

    #[test]
    fn test_singular() {
        assert_eq!(singular("boards"), "board");
        assert_eq!(singular("securities"), "security");
        assert_eq!(singular("boxes"), "box");
        assert_eq!(singular("classes"), "class");
        assert_eq!(singular("status"), "status");
        assert_eq!(singular("marketdata"), "marketdata");
        assert_eq!(singular("index"), "index");
        assert_eq!(singular("securityIndices"), "securityIndex");
        assert_eq!(singular("indices"), "index");
        assert_eq!(singular("statuses"), "status");
        assert_eq!(singular("buses"), "bus");
        assert_eq!(singular("causes"), "cause");
        assert_eq!(singular("aliases"), "alias");
        assert_eq!(singular("alias"), "alias");
        assert_eq!(singular("prices"), "price");
    }

    #[test]
    fn test_query_field_name() {
        let plain = ReferenceSource::new(28).with_replace("boardgroups", "boardGroups");
        assert_eq!(query_field_name(&plain, "boardgroups"), "boardGroups");
        assert_eq!(query_field_name(&plain, "engines"), "engines");

        let prefixed = ReferenceSource::new(13).with_prefix("security");
        assert_eq!(query_field_name(&prefixed, "boards"), "securityBoards");
        assert_eq!(query_field_name(&prefixed, "description"), "securityDescription");
    }

    #[test]
    fn test_row_type_name() {
        assert_eq!(row_type_name("securityBoards"), "SecurityBoard");
        assert_eq!(row_type_name("boardGroups"), "BoardGroup");
        assert_eq!(row_type_name("securities"), "Security");
        assert_eq!(row_type_name("turnoversPreviousDate"), "TurnoversPreviousDate");
        assert_eq!(row_type_name("securityIndices"), "SecurityIndex");
        assert_eq!(row_type_name("statuses"), "Status");
        assert_eq!(row_type_name("securityAliases"), "SecurityAlias");
    }
}
