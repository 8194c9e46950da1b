//! Parse ISS reference pages into endpoint descriptions.
//!
//! A reference page (`/iss/reference/<id>`) is loosely structured HTML:
//!
//! ```text
//! <h1>/iss/engines/[engine]/markets/[market]/securities</h1>
//! <dl>
//!   <dt>securities (Securities)</dt>
//!   <dd>
//!     <pre>block description</pre>
//!     <dl>
//!       <dt>limit</dt>
//!       <dd><pre>argument description</pre><strong>Type:</strong>int32</dd>
//!     </dl>
//!   </dd>
//! </dl>
//! ```
//!
//! Each structural anchor is looked up explicitly and its absence is a
//! [`IssError::MalformedReference`].

use crate::error::{IssError, IssResult};
use crate::path::required_args;
use crate::types::PrimitiveType;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

/// One documented ISS endpoint family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Path template relative to `/iss/`, e.g. `engines/[engine]/turnovers`.
    pub path: String,
    /// Placeholder names in `path`, in order of first appearance.
    pub required_args: Vec<String>,
    /// Data blocks in document order.
    pub blocks: Vec<Block>,
}

/// A named data block (ISS table) served by a reference path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub description: String,
    pub args: Vec<Argument>,
}

/// An optional, typed query argument accepted by a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub ty: PrimitiveType,
}

impl Reference {
    /// Look up a block by its ISS name.
    pub fn block(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.name == name)
    }
}

/// Parse a reference page.
pub fn parse(markup: &str) -> IssResult<Reference> {
    let document = Html::parse_document(markup);

    let path = extract_path(&document)?;
    let required_args = required_args(&path);
    let blocks = extract_blocks(&document)?;

    debug!(
        path = %path,
        required = required_args.len(),
        blocks = blocks.len(),
        "parsed ISS reference"
    );

    Ok(Reference {
        path,
        required_args,
        blocks,
    })
}

// ── Anchors ─────────────────────────────────────────────────────────────────

fn heading_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("body > h1").expect("heading selector is valid"))
}

fn list_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("body > dl").expect("list selector is valid"))
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/iss/(.*)").expect("heading regex is valid"))
}

fn malformed(what: impl Into<String>) -> IssError {
    IssError::MalformedReference(what.into())
}

/// `<h1>/iss/<path></h1>` directly under `<body>`.
fn extract_path(document: &Html) -> IssResult<String> {
    let heading = document
        .select(heading_selector())
        .next()
        .ok_or_else(|| malformed("missing top-level <h1> heading"))?;

    let text: String = heading.text().collect();
    let caps = heading_re()
        .captures(&text)
        .ok_or_else(|| malformed(format!("heading {:?} does not name an /iss/ path", text.trim())))?;

    Ok(caps[1].trim().to_string())
}

/// Top-level `<dl>`: each `<dt>` names a block, the following `<dd>` holds
/// its description and argument list.
fn extract_blocks(document: &Html) -> IssResult<Vec<Block>> {
    let mut lists = document.select(list_selector()).peekable();
    if lists.peek().is_none() {
        return Err(malformed("missing top-level <dl> block list"));
    }

    let mut blocks = Vec::new();
    for list in lists {
        for header in child_elements(list, "dt") {
            blocks.push(parse_block(header)?);
        }
    }
    Ok(blocks)
}

fn parse_block(header: ElementRef<'_>) -> IssResult<Block> {
    let label: String = header.text().collect();
    let name = label
        .trim()
        .split(' ')
        .next()
        .unwrap_or_default()
        .to_string();
    if name.is_empty() {
        return Err(malformed("empty block name"));
    }

    let meta = definition_for(header)
        .ok_or_else(|| malformed(format!("block {name} has no <dd> definition")))?;

    let mut args = Vec::new();
    for list in child_elements(meta, "dl") {
        for arg_header in child_elements(list, "dt") {
            args.push(parse_argument(arg_header, &name)?);
        }
    }

    debug!(block = %name, args = args.len(), "parsed block");

    Ok(Block {
        description: preformatted_text(meta),
        name,
        args,
    })
}

fn parse_argument(header: ElementRef<'_>, block: &str) -> IssResult<Argument> {
    let name: String = header.text().collect::<String>().trim().to_string();
    if name.is_empty() {
        return Err(malformed(format!("block {block} has an unnamed argument")));
    }

    let meta = definition_for(header)
        .ok_or_else(|| malformed(format!("argument {block}.{name} has no <dd> definition")))?;

    let type_name = type_label_value(meta)
        .ok_or_else(|| malformed(format!("argument {block}.{name} has no Type: label")))?;
    if type_name.is_empty() {
        return Err(malformed(format!(
            "argument {block}.{name} has an empty Type: value"
        )));
    }
    let ty = type_name.parse::<PrimitiveType>()?;

    Ok(Argument {
        name,
        description: preformatted_text(meta),
        ty,
    })
}

// ── Tree helpers ────────────────────────────────────────────────────────────

/// Direct element children with the given tag name.
fn child_elements<'a>(
    parent: ElementRef<'a>,
    tag: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == tag)
}

/// The `<dd>` immediately following a `<dt>`.
fn definition_for(term: ElementRef<'_>) -> Option<ElementRef<'_>> {
    term.next_siblings()
        .filter_map(ElementRef::wrap)
        .next()
        .filter(|el| el.value().name() == "dd")
}

/// Text of the direct `<pre>` children, trimmed. Empty when there are none.
fn preformatted_text(parent: ElementRef<'_>) -> String {
    child_elements(parent, "pre")
        .flat_map(|pre| pre.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Trimmed text node right after the `<strong>Type:</strong>` label.
///
/// `None` when there is no label; an empty string when the label is not
/// followed by text.
fn type_label_value(parent: ElementRef<'_>) -> Option<String> {
    let label = child_elements(parent, "strong")
        .find(|el| el.text().collect::<String>().contains("Type:"))?;
    let value = label
        .next_sibling()
        .and_then(|node| node.value().as_text().map(|t| t.trim().to_string()))
        .unwrap_or_default();
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECURITIES_PAGE: &str = r#"
    <html><head><title>ISS Reference</title></head><body>
    <h1>/iss/engines/[engine]/markets/[market]/securities</h1>
    <p>Securities traded on a market.</p>
    <dl>
      <dt>securities (Securities)</dt>
      <dd>
        <pre>
          Instruments of the market.
        </pre>
        <dl>
          <dt>securities</dt>
          <dd><pre>Comma separated tickers, up to 10</pre><strong>Type:</strong>string<br><strong>Default:</strong></dd>
          <dt>first</dt>
          <dd><pre> Number of rows </pre><strong>Type:</strong> int32 <br></dd>
          <dt>date</dt>
          <dd><strong>Type:</strong>date</dd>
        </dl>
      </dd>
      <dt>dataversion</dt>
      <dd>
        <dl></dl>
      </dd>
    </dl>
    </body></html>
    "#;

    #[test]
    fn test_parse_path_and_required_args() {
        let r = parse(SECURITIES_PAGE).unwrap();
        assert_eq!(r.path, "engines/[engine]/markets/[market]/securities");
        assert_eq!(r.required_args, vec!["engine", "market"]);
    }

    #[test]
    fn test_parse_blocks_in_order() {
        let r = parse(SECURITIES_PAGE).unwrap();
        let names: Vec<&str> = r.blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["securities", "dataversion"]);
        assert_eq!(r.blocks[0].description, "Instruments of the market.");
    }

    #[test]
    fn test_parse_arguments() {
        let r = parse(SECURITIES_PAGE).unwrap();
        let args = &r.blocks[0].args;
        assert_eq!(args.len(), 3);
        assert_eq!(args[0].name, "securities");
        assert_eq!(args[0].description, "Comma separated tickers, up to 10");
        assert_eq!(args[0].ty, PrimitiveType::String);
        assert_eq!(args[1].name, "first");
        assert_eq!(args[1].description, "Number of rows");
        assert_eq!(args[1].ty, PrimitiveType::Int32);
        assert_eq!(args[2].description, "");
        assert_eq!(args[2].ty, PrimitiveType::Date);
    }

    #[test]
    fn test_block_without_args_or_description() {
        let r = parse(SECURITIES_PAGE).unwrap();
        let block = r.block("dataversion").unwrap();
        assert!(block.args.is_empty());
        assert_eq!(block.description, "");
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(parse(SECURITIES_PAGE).unwrap(), parse(SECURITIES_PAGE).unwrap());
    }

    #[test]
    fn test_path_without_placeholders() {
        let html = r#"<html><body>
        <h1>/iss/index</h1>
        <dl><dt>engines</dt><dd><pre>   </pre></dd></dl>
        </body></html>"#;
        let r = parse(html).unwrap();
        assert_eq!(r.path, "index");
        assert!(r.required_args.is_empty());
        assert_eq!(r.blocks[0].description, "");
    }

    #[test]
    fn test_missing_heading() {
        let html = r#"<html><body><dl><dt>engines</dt><dd></dd></dl></body></html>"#;
        assert!(matches!(parse(html), Err(IssError::MalformedReference(_))));
    }

    #[test]
    fn test_heading_without_iss_path() {
        let html = r#"<html><body><h1>Not found</h1><dl></dl></body></html>"#;
        assert!(matches!(parse(html), Err(IssError::MalformedReference(_))));
    }

    #[test]
    fn test_missing_block_list() {
        let html = r#"<html><body><h1>/iss/index</h1><p>nothing here</p></body></html>"#;
        assert!(matches!(parse(html), Err(IssError::MalformedReference(_))));
    }

    #[test]
    fn test_missing_type_label() {
        let html = r#"<html><body>
        <h1>/iss/index</h1>
        <dl><dt>engines</dt><dd><dl>
          <dt>lang</dt><dd><pre>Language</pre>string</dd>
        </dl></dd></dl>
        </body></html>"#;
        let err = parse(html).unwrap_err();
        assert!(matches!(err, IssError::MalformedReference(ref m) if m.contains("engines.lang")));
        assert!(err.to_string().contains("no Type: label"));
    }

    #[test]
    fn test_empty_type_value() {
        for dd in [
            "<dd><strong>Type:</strong></dd>",
            "<dd><strong>Type:</strong>   </dd>",
            "<dd><strong>Type:</strong><pre>Language</pre></dd>",
        ] {
            let html = format!(
                "<html><body><h1>/iss/index</h1>\
                 <dl><dt>b</dt><dd><dl><dt>x</dt>{dd}</dl></dd></dl>\
                 </body></html>"
            );
            assert_eq!(
                parse(&html).unwrap_err(),
                IssError::MalformedReference("argument b.x has an empty Type: value".to_string()),
                "{dd}"
            );
        }
    }

    #[test]
    fn test_unknown_argument_type() {
        let html = r#"<html><body>
        <h1>/iss/index</h1>
        <dl><dt>engines</dt><dd><dl>
          <dt>lang</dt><dd><strong>Type:</strong>boolean</dd>
        </dl></dd></dl>
        </body></html>"#;
        assert_eq!(
            parse(html).unwrap_err(),
            IssError::UnknownPrimitiveType("boolean".to_string())
        );
    }

    #[test]
    fn test_serializes_type_field() {
        let r = parse(SECURITIES_PAGE).unwrap();
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["blocks"][0]["args"][1]["type"], "int32");
        assert_eq!(v["required_args"][0], "engine");
    }
}
