//! Query schema assembled from ISS reference pages.
//!
//! One [`QueryField`] per reference block. Each field knows how to rebuild
//! its request path and how to shape the rows ISS returns for it.

pub mod assembly;
pub mod sdl;

use chrono::{DateTime, Utc};
use iss_reference::{PrimitiveType, ScalarKind};
use serde::Serialize;
use std::collections::BTreeMap;

pub use assembly::{assemble, build_fields, compose};
pub use sdl::render_sdl;

/// Name of the root query type.
pub const QUERY_TYPE_NAME: &str = "MoexIssQueries";

/// The composed, immutable query schema.
#[derive(Debug, Clone, Serialize)]
pub struct QuerySchema {
    pub fields: Vec<QueryField>,
    pub skipped: Vec<SkippedReference>,
    pub generated_at: DateTime<Utc>,
}

/// A reference that was left out of the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedReference {
    pub id: u32,
    pub reason: String,
}

/// One list-valued query field, backed by one ISS block.
#[derive(Debug, Clone, Serialize)]
pub struct QueryField {
    pub name: String,
    pub description: String,
    pub reference_id: u32,
    /// ISS block name (`iss.only`).
    pub block: String,
    /// Path template from the reference page.
    pub path: String,
    /// Placeholders of `path`, in order.
    pub path_args: Vec<PathArgument>,
    /// Optional typed arguments passed as query parameters.
    pub args: Vec<FieldArgument>,
    pub row_type: RowType,
}

/// A path placeholder exposed as a string argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathArgument {
    pub name: String,
    /// Configured default; the argument is non-null without one.
    pub default: Option<String>,
}

/// A documented block argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldArgument {
    pub name: String,
    pub description: String,
    pub primitive: PrimitiveType,
    pub kind: ScalarKind,
}

/// Object type of the rows returned by a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowType {
    pub name: String,
    pub fields: Vec<RowField>,
}

/// A row column: snake_case schema name plus the ISS column it reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowField {
    pub name: String,
    pub column: String,
    pub primitive: PrimitiveType,
    pub kind: ScalarKind,
}

impl QuerySchema {
    pub fn field(&self, name: &str) -> Option<&QueryField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl PathArgument {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

impl QueryField {
    /// Names of the path placeholders, in template order.
    pub fn required_names(&self) -> Vec<String> {
        self.path_args.iter().map(|a| a.name.clone()).collect()
    }

    /// Configured defaults for path placeholders.
    pub fn defaults(&self) -> BTreeMap<String, String> {
        self.path_args
            .iter()
            .filter_map(|a| a.default.clone().map(|d| (a.name.clone(), d)))
            .collect()
    }

    pub fn path_arg(&self, name: &str) -> Option<&PathArgument> {
        self.path_args.iter().find(|a| a.name == name)
    }

    pub fn arg(&self, name: &str) -> Option<&FieldArgument> {
        self.args.iter().find(|a| a.name == name)
    }
}
