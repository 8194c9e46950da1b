//! ISS reference — turns MOEX ISS documentation pages into typed endpoint
//! descriptions, and resolves path templates and field types against them.

pub mod error;
pub mod path;
pub mod reference;
pub mod types;

pub use error::{IssError, IssResult};
pub use path::{required_args, resolve, substitute, ResolvedPath};
pub use reference::{parse, Argument, Block, Reference};
pub use types::{normalize, scalar_kind, PrimitiveType, ScalarKind};
