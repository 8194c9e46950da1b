//! Error taxonomy for reference parsing and request resolution.

/// Errors raised by the reference parser and the path/type resolvers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IssError {
    /// The documentation markup lacks an expected structural anchor.
    #[error("Malformed reference: {0}")]
    MalformedReference(String),

    /// A declared type name is outside the known primitive set.
    #[error("Unknown primitive type: {0}")]
    UnknownPrimitiveType(String),

    /// A required path parameter reached resolution without a value.
    #[error("Missing required parameter: {0}")]
    MissingRequiredParameter(String),
}

/// Convenience result type.
pub type IssResult<T> = Result<T, IssError>;
