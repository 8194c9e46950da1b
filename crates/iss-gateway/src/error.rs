//! Error types for the gateway.

use axum::http::StatusCode;
use iss_reference::IssError;

/// All errors that can occur while assembling or serving the schema.
#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Reference(#[from] IssError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ISS returned status {status} for {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Invalid ISS response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error("No metadata for block {block} at {path}")]
    MissingMetadata { path: String, block: String },

    #[error("Block {block} at {path} has no columns")]
    EmptyBlock { path: String, block: String },

    #[error("Name collision: {kind} {name} is produced by both {first} and {second}")]
    NameCollision {
        kind: &'static str,
        name: String,
        first: String,
        second: String,
    },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown argument {argument} for field {field}")]
    UnknownArgument { field: String, argument: String },

    #[error("Invalid value for argument {argument}: expected {expected}")]
    InvalidArgument {
        argument: String,
        expected: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl GatewayError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Reference(IssError::MalformedReference(_)) => "E_MALFORMED_REFERENCE",
            GatewayError::Reference(IssError::UnknownPrimitiveType(_)) => "E_UNKNOWN_TYPE",
            GatewayError::Reference(IssError::MissingRequiredParameter(_)) => "E_MISSING_PARAMETER",
            GatewayError::Http(_) => "E_HTTP",
            GatewayError::UnexpectedStatus { .. } => "E_UPSTREAM_STATUS",
            GatewayError::InvalidResponse { .. } => "E_UPSTREAM_RESPONSE",
            GatewayError::MissingMetadata { .. } => "E_MISSING_METADATA",
            GatewayError::EmptyBlock { .. } => "E_EMPTY_BLOCK",
            GatewayError::NameCollision { .. } => "E_NAME_COLLISION",
            GatewayError::UnknownField(_) => "E_UNKNOWN_FIELD",
            GatewayError::UnknownArgument { .. } => "E_UNKNOWN_ARGUMENT",
            GatewayError::InvalidArgument { .. } => "E_INVALID_ARGUMENT",
            GatewayError::Config(_) => "E_CONFIG",
            GatewayError::Io(_) => "E_INTERNAL",
            GatewayError::Json(_) | GatewayError::InvalidBody(_) => "E_INVALID_JSON",
        }
    }

    /// HTTP status used when this error ends a REST request.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::UnknownField(_) => StatusCode::NOT_FOUND,
            GatewayError::UnknownArgument { .. }
            | GatewayError::InvalidArgument { .. }
            | GatewayError::Json(_)
            | GatewayError::InvalidBody(_)
            | GatewayError::Reference(IssError::MissingRequiredParameter(_)) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::Http(_)
            | GatewayError::UnexpectedStatus { .. }
            | GatewayError::InvalidResponse { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON error body for REST responses.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": { "code": self.code(), "message": self.to_string() }
        })
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_codes() {
        let e: GatewayError = IssError::MalformedReference("no h1".into()).into();
        assert_eq!(e.code(), "E_MALFORMED_REFERENCE");
        assert_eq!(e.to_string(), "Malformed reference: no h1");
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_missing_parameter_is_bad_request() {
        let e: GatewayError = IssError::MissingRequiredParameter("security".into()).into();
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.to_json()["error"]["code"], "E_MISSING_PARAMETER");
    }

    #[test]
    fn test_upstream_status_is_bad_gateway() {
        let e = GatewayError::UnexpectedStatus {
            url: "https://iss.moex.com/iss/index.json".into(),
            status: 503,
        };
        assert_eq!(e.status(), StatusCode::BAD_GATEWAY);
    }
}
