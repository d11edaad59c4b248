//! A2A error types — JSON-RPC error codes + A2A-specific errors.
//!
//! Standard JSON-RPC 2.0 errors (-32700 through -32603) plus the A2A error
//! taxonomy (-32001 through -32010).

use crate::types::JsonRpcError;

// ---------------------------------------------------------------------------
// Standard JSON-RPC 2.0 error codes
// ---------------------------------------------------------------------------

/// Invalid JSON was received by the server.
pub const PARSE_ERROR: i64 = -32700;

/// The JSON sent is not a valid Request object.
pub const INVALID_REQUEST: i64 = -32600;

/// The method does not exist / is not available.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Invalid method parameter(s).
pub const INVALID_PARAMS: i64 = -32602;

/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;

// ---------------------------------------------------------------------------
// A2A-specific error codes
// ---------------------------------------------------------------------------

/// The requested task was not found.
pub const TASK_NOT_FOUND: i64 = -32001;

/// The task cannot be canceled in its current state.
pub const TASK_NOT_CANCELABLE: i64 = -32002;

/// Illegal task state transition.
pub const INVALID_TASK_STATE: i64 = -32003;

/// Missing credentials.
pub const AUTHENTICATION_REQUIRED: i64 = -32004;

/// Credentials valid but insufficient.
pub const AUTHORIZATION_FAILED: i64 = -32005;

/// Server-side throttling.
pub const RATE_LIMIT_EXCEEDED: i64 = -32006;

/// Circuit open / transport down.
pub const AGENT_UNAVAILABLE: i64 = -32007;

/// Incompatible `protocol_version`.
pub const PROTOCOL_VERSION_MISMATCH: i64 = -32008;

/// Operation requires a disabled capability.
pub const CAPABILITY_NOT_SUPPORTED: i64 = -32009;

/// Queue/backlog full.
pub const RESOURCE_EXHAUSTED: i64 = -32010;

// ---------------------------------------------------------------------------
// A2AError enum
// ---------------------------------------------------------------------------

/// Unified error type for all A2A and JSON-RPC errors.
///
/// Each protocol variant carries an optional human-readable message and
/// optional structured data payload. Also includes transport/client-side
/// error variants that are not part of the A2A wire taxonomy but are needed
/// for a complete Rust SDK.
#[derive(Debug, Clone, thiserror::Error)]
pub enum A2AError {
    /// Invalid JSON payload (code -32700).
    #[error("Parse error: {message}")]
    ParseError {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Request payload validation error (code -32600).
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Method not found (code -32601).
    #[error("Method not found: {message}")]
    MethodNotFound {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Invalid parameters (code -32602).
    #[error("Invalid params: {message}")]
    InvalidParams {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Internal error (code -32603).
    #[error("Internal error: {message}")]
    InternalError {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Task not found (code -32001).
    #[error("Task not found: {message}")]
    TaskNotFound {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Task cannot be canceled (code -32002).
    #[error("Task not cancelable: {message}")]
    TaskNotCancelable {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Illegal state transition (code -32003).
    #[error("Invalid task state: {message}")]
    InvalidTaskState {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Missing credentials (code -32004).
    #[error("Authentication required: {message}")]
    AuthenticationRequired {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Credentials valid but insufficient (code -32005).
    #[error("Authorization failed: {message}")]
    AuthorizationFailed {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Server-side throttling (code -32006).
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Circuit open / transport down (code -32007).
    #[error("Agent unavailable: {message}")]
    AgentUnavailable {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Incompatible protocol version (code -32008).
    #[error("Protocol version mismatch: {message}")]
    ProtocolVersionMismatch {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Operation requires a disabled capability (code -32009).
    ///
    /// Covers the teacher's former `PushNotificationNotSupported`,
    /// `UnsupportedOperation`, `ContentTypeNotSupported`, and
    /// `AuthenticatedExtendedCardNotConfigured` variants — all of these are
    /// "this capability is not enabled/supported" conditions and share one
    /// code per the taxonomy.
    #[error("Capability not supported: {message}")]
    CapabilityNotSupported {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Queue/backlog full (code -32010).
    #[error("Resource exhausted: {message}")]
    ResourceExhausted {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Invalid agent response (no dedicated A2A code — reported as internal).
    #[error("Invalid agent response: {message}")]
    InvalidAgentResponse {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    // -- Client/transport-side errors (not A2A error codes) --
    /// Transport-level error (connection failed, request failed, etc.).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request or stream timed out.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// HTTP error with status code and response body.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// Invalid JSON received from remote (parse or deserialization failure).
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// A JSON-RPC error response was received from the remote agent.
    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Catch-all for errors that don't fit other categories.
    #[error("{0}")]
    Other(String),
}

/// Convenience result type for A2A operations.
pub type A2AResult<T> = Result<T, A2AError>;

impl A2AError {
    // -- Convenience constructors (message-only, no data) --

    /// Create a `ParseError` with a message and no data.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            data: None,
        }
    }

    /// Create an `InvalidRequest` with a message and no data.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            data: None,
        }
    }

    /// Create a `MethodNotFound` with a message and no data.
    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::MethodNotFound {
            message: message.into(),
            data: None,
        }
    }

    /// Create an `InvalidParams` with a message and no data.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
            data: None,
        }
    }

    /// Create an `InternalError` with a message and no data.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
            data: None,
        }
    }

    /// Create a `TaskNotFound` with a message and no data.
    pub fn task_not_found(message: impl Into<String>) -> Self {
        Self::TaskNotFound {
            message: message.into(),
            data: None,
        }
    }

    /// Create a `TaskNotCancelable` with a message and no data.
    pub fn task_not_cancelable(message: impl Into<String>) -> Self {
        Self::TaskNotCancelable {
            message: message.into(),
            data: None,
        }
    }

    /// Create an `InvalidTaskState` with a message and no data.
    pub fn invalid_task_state(message: impl Into<String>) -> Self {
        Self::InvalidTaskState {
            message: message.into(),
            data: None,
        }
    }

    /// Create an `AuthenticationRequired` with a message and no data.
    pub fn authentication_required(message: impl Into<String>) -> Self {
        Self::AuthenticationRequired {
            message: message.into(),
            data: None,
        }
    }

    /// Create an `AuthorizationFailed` with a message and no data.
    pub fn authorization_failed(message: impl Into<String>) -> Self {
        Self::AuthorizationFailed {
            message: message.into(),
            data: None,
        }
    }

    /// Create a `RateLimitExceeded` with a message and no data.
    pub fn rate_limit_exceeded(message: impl Into<String>) -> Self {
        Self::RateLimitExceeded {
            message: message.into(),
            data: None,
        }
    }

    /// Create an `AgentUnavailable` with a message and no data.
    pub fn agent_unavailable(message: impl Into<String>) -> Self {
        Self::AgentUnavailable {
            message: message.into(),
            data: None,
        }
    }

    /// Create an `AgentUnavailable` signaling a deadline was exceeded.
    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::AgentUnavailable {
            message: message.into(),
            data: Some(serde_json::json!({ "reason": "deadline_exceeded" })),
        }
    }

    /// Create a `ProtocolVersionMismatch` with a message and no data.
    pub fn protocol_version_mismatch(message: impl Into<String>) -> Self {
        Self::ProtocolVersionMismatch {
            message: message.into(),
            data: None,
        }
    }

    /// Create a `CapabilityNotSupported` with a message and no data.
    pub fn capability_not_supported(message: impl Into<String>) -> Self {
        Self::CapabilityNotSupported {
            message: message.into(),
            data: None,
        }
    }

    /// Create a `ResourceExhausted` with a message and no data.
    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            message: message.into(),
            data: None,
        }
    }

    /// Create an `InvalidAgentResponse` with a message and no data.
    pub fn invalid_agent_response(message: impl Into<String>) -> Self {
        Self::InvalidAgentResponse {
            message: message.into(),
            data: None,
        }
    }

    /// Returns the JSON-RPC error code for this error variant.
    ///
    /// For transport/client-side errors that don't map to A2A codes,
    /// returns -32603 (internal error).
    pub fn code(&self) -> i64 {
        match self {
            A2AError::ParseError { .. } => PARSE_ERROR,
            A2AError::InvalidRequest { .. } => INVALID_REQUEST,
            A2AError::MethodNotFound { .. } => METHOD_NOT_FOUND,
            A2AError::InvalidParams { .. } => INVALID_PARAMS,
            A2AError::InternalError { .. } => INTERNAL_ERROR,
            A2AError::TaskNotFound { .. } => TASK_NOT_FOUND,
            A2AError::TaskNotCancelable { .. } => TASK_NOT_CANCELABLE,
            A2AError::InvalidTaskState { .. } => INVALID_TASK_STATE,
            A2AError::AuthenticationRequired { .. } => AUTHENTICATION_REQUIRED,
            A2AError::AuthorizationFailed { .. } => AUTHORIZATION_FAILED,
            A2AError::RateLimitExceeded { .. } => RATE_LIMIT_EXCEEDED,
            A2AError::AgentUnavailable { .. } => AGENT_UNAVAILABLE,
            A2AError::ProtocolVersionMismatch { .. } => PROTOCOL_VERSION_MISMATCH,
            A2AError::CapabilityNotSupported { .. } => CAPABILITY_NOT_SUPPORTED,
            A2AError::ResourceExhausted { .. } => RESOURCE_EXHAUSTED,
            // No dedicated wire code; surfaces as an internal error.
            A2AError::InvalidAgentResponse { .. } => INTERNAL_ERROR,
            // Client/transport errors map to internal error.
            A2AError::Transport(_)
            | A2AError::Timeout(_)
            | A2AError::Http { .. }
            | A2AError::InvalidJson(_)
            | A2AError::Other(_) => INTERNAL_ERROR,
            A2AError::JsonRpc { code, .. } => *code,
        }
    }

    /// Returns the default human-readable message for this error variant.
    pub fn default_message(&self) -> &str {
        match self {
            A2AError::ParseError { .. } => "Invalid JSON payload",
            A2AError::InvalidRequest { .. } => "Request payload validation error",
            A2AError::MethodNotFound { .. } => "Method not found",
            A2AError::InvalidParams { .. } => "Invalid parameters",
            A2AError::InternalError { .. } => "Internal error",
            A2AError::TaskNotFound { .. } => "Task not found",
            A2AError::TaskNotCancelable { .. } => "Task cannot be canceled",
            A2AError::InvalidTaskState { .. } => "Illegal task state transition",
            A2AError::AuthenticationRequired { .. } => "Authentication required",
            A2AError::AuthorizationFailed { .. } => "Authorization failed",
            A2AError::RateLimitExceeded { .. } => "Rate limit exceeded",
            A2AError::AgentUnavailable { .. } => "Agent unavailable",
            A2AError::ProtocolVersionMismatch { .. } => "Protocol version mismatch",
            A2AError::CapabilityNotSupported { .. } => "Capability not supported",
            A2AError::ResourceExhausted { .. } => "Resource exhausted",
            A2AError::InvalidAgentResponse { .. } => "Invalid agent response",
            A2AError::Transport(_) => "Transport error",
            A2AError::Timeout(_) => "Request timed out",
            A2AError::Http { .. } => "HTTP error",
            A2AError::InvalidJson(_) => "Invalid JSON",
            A2AError::JsonRpc { .. } => "JSON-RPC error",
            A2AError::Other(_) => "Error",
        }
    }

    /// Returns `true` if a client should retry the call that produced this
    /// error — transport failures and HTTP 408/429/5xx only.
    pub fn is_retryable(&self) -> bool {
        match self {
            A2AError::Transport(_) | A2AError::Timeout(_) | A2AError::AgentUnavailable { .. } => {
                true
            }
            A2AError::Http { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            A2AError::RateLimitExceeded { .. } => true,
            _ => false,
        }
    }
}

impl From<A2AError> for JsonRpcError {
    fn from(err: A2AError) -> Self {
        let code = err.code();
        let message = err.to_string();
        let data = match &err {
            A2AError::ParseError { data, .. }
            | A2AError::InvalidRequest { data, .. }
            | A2AError::MethodNotFound { data, .. }
            | A2AError::InvalidParams { data, .. }
            | A2AError::InternalError { data, .. }
            | A2AError::TaskNotFound { data, .. }
            | A2AError::TaskNotCancelable { data, .. }
            | A2AError::InvalidTaskState { data, .. }
            | A2AError::AuthenticationRequired { data, .. }
            | A2AError::AuthorizationFailed { data, .. }
            | A2AError::RateLimitExceeded { data, .. }
            | A2AError::AgentUnavailable { data, .. }
            | A2AError::ProtocolVersionMismatch { data, .. }
            | A2AError::CapabilityNotSupported { data, .. }
            | A2AError::ResourceExhausted { data, .. }
            | A2AError::InvalidAgentResponse { data, .. }
            | A2AError::JsonRpc { data, .. } => data.clone(),
            _ => None,
        };
        JsonRpcError {
            code,
            message,
            data,
        }
    }
}

impl From<serde_json::Error> for A2AError {
    fn from(err: serde_json::Error) -> Self {
        A2AError::ParseError {
            message: err.to_string(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_match_spec() {
        assert_eq!(PARSE_ERROR, -32700);
        assert_eq!(INVALID_REQUEST, -32600);
        assert_eq!(METHOD_NOT_FOUND, -32601);
        assert_eq!(INVALID_PARAMS, -32602);
        assert_eq!(INTERNAL_ERROR, -32603);
        assert_eq!(TASK_NOT_FOUND, -32001);
        assert_eq!(TASK_NOT_CANCELABLE, -32002);
        assert_eq!(INVALID_TASK_STATE, -32003);
        assert_eq!(AUTHENTICATION_REQUIRED, -32004);
        assert_eq!(AUTHORIZATION_FAILED, -32005);
        assert_eq!(RATE_LIMIT_EXCEEDED, -32006);
        assert_eq!(AGENT_UNAVAILABLE, -32007);
        assert_eq!(PROTOCOL_VERSION_MISMATCH, -32008);
        assert_eq!(CAPABILITY_NOT_SUPPORTED, -32009);
        assert_eq!(RESOURCE_EXHAUSTED, -32010);
    }

    #[test]
    fn a2a_error_to_json_rpc_error() {
        let err = A2AError::TaskNotFound {
            message: "task-123".to_string(),
            data: None,
        };
        let rpc_err: JsonRpcError = err.into();
        assert_eq!(rpc_err.code, -32001);
        assert!(rpc_err.message.contains("task-123"));
        assert!(rpc_err.data.is_none());
    }

    #[test]
    fn transport_error_maps_to_internal() {
        let err = A2AError::Transport("connection refused".to_string());
        assert_eq!(err.code(), INTERNAL_ERROR);
    }

    #[test]
    fn json_rpc_error_preserves_code() {
        let err = A2AError::JsonRpc {
            code: -32001,
            message: "Task not found".to_string(),
            data: None,
        };
        assert_eq!(err.code(), -32001);
    }

    #[test]
    fn deadline_exceeded_sets_reason() {
        let err = A2AError::deadline_exceeded("request took too long");
        assert_eq!(err.code(), AGENT_UNAVAILABLE);
        match &err {
            A2AError::AgentUnavailable { data, .. } => {
                assert_eq!(
                    data.as_ref().and_then(|d| d.get("reason")).and_then(|r| r.as_str()),
                    Some("deadline_exceeded")
                );
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn retryability_matches_status_code_table() {
        assert!(A2AError::Http {
            status: 429,
            body: String::new()
        }
        .is_retryable());
        assert!(A2AError::Http {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!A2AError::Http {
            status: 404,
            body: String::new()
        }
        .is_retryable());
        assert!(!A2AError::Http {
            status: 400,
            body: String::new()
        }
        .is_retryable());
        assert!(A2AError::Timeout("slow".to_string()).is_retryable());
    }

    #[test]
    fn protocol_error_data_propagates_to_json_rpc() {
        let validation_data = serde_json::json!([
            {"loc": ["params", "message"], "msg": "field required", "type": "value_error.missing"}
        ]);
        let err = A2AError::InvalidParams {
            message: "Invalid parameters".to_string(),
            data: Some(validation_data.clone()),
        };
        let rpc_err: JsonRpcError = err.into();
        assert_eq!(rpc_err.code, INVALID_PARAMS);
        assert_eq!(rpc_err.data, Some(validation_data));
    }

    #[test]
    fn convenience_constructor_sets_data_none() {
        let err = A2AError::task_not_found("task-abc");
        match &err {
            A2AError::TaskNotFound { message, data } => {
                assert_eq!(message, "task-abc");
                assert!(data.is_none());
            }
            _ => panic!("wrong variant"),
        }
        let rpc_err: JsonRpcError = err.into();
        assert_eq!(rpc_err.code, TASK_NOT_FOUND);
        assert!(rpc_err.data.is_none());
    }
}
