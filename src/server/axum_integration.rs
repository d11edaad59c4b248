//! Axum integration — ready-made HTTP routes for A2A servers.
//!
//! Provides an [`a2a_router`] function that creates an axum `Router` with:
//! - `POST /a2a` — JSON-RPC 2.0 dispatch for all A2A methods, accepting a
//!   single request object or a non-empty batch array per JSON-RPC 2.0 §6;
//!   requests with no `id` are notifications and get no response body
//! - `GET /.well-known/agent-card.json` — agent card discovery (current)
//! - `GET /.well-known/agent.json` — agent card discovery (prior path, kept)
//! - `GET /capabilities` — the card's capability listing alone
//! - `GET /agent-card.jws` — signed agent card, via [`a2a_router_with_jws`]
//!
//! Mirrors Python SDK's `JSONRPCApplication` from
//! `a2a.server.apps.jsonrpc.jsonrpc_app`.
//!
//! # Supported JSON-RPC Methods
//!
//! | Method | Description |
//! |--------|-------------|
//! | `message/send` | Send a message and get a task or message |
//! | `message/stream` | Send a message with SSE streaming |
//! | `tasks/get` | Retrieve a task by ID |
//! | `tasks/list` | List tasks with filtering |
//! | `tasks/cancel` | Cancel a running task |
//! | `tasks/subscribe` | Subscribe to task updates (SSE) |
//! | `tasks/resubscribe` | Re-subscribe to a running task's stream |
//! | `tasks/pushNotificationConfig/set` | Set push notification config |
//! | `tasks/pushNotificationConfig/get` | Get push notification config |
//! | `tasks/pushNotificationConfig/list` | List push notification configs |
//! | `tasks/pushNotificationConfig/delete` | Delete push notification config |
//! | `agent/getCard` | Public agent card (unauthenticated) |
//! | `agent/getAuthenticatedExtendedCard` | Extended agent card, requires a caller |
//!
//! # Example
//!
//! ```rust,ignore
//! use a2a_rs::server::{a2a_router, DefaultRequestHandler, InMemoryTaskStore};
//! use a2a_rs::types::AgentCard;
//! use std::sync::Arc;
//!
//! let handler = Arc::new(DefaultRequestHandler::new(executor, store));
//! let app = a2a_router(handler, agent_card);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::stream::Stream;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::error::{self, A2AError};
use crate::types::{AgentCard, JsonRpcError as A2AJsonRpcError, StreamResponse};

use super::agent_executor::ServerCallContext;
use super::request_handler::{
    CancelTaskParams, GetTaskParams, RequestHandler, SendMessageConfiguration, SendMessageParams,
    SubscribeToTaskParams,
};
use super::task_store::TaskListParams;

/// Build a [`ServerCallContext`] from the inbound `Authorization` header.
///
/// There is no real identity/session layer here — this only distinguishes
/// "a bearer credential was presented" from "anonymous" so
/// `agent/getAuthenticatedExtendedCard` can enforce the
/// `AuthenticationRequired` check. The presented token is carried through as
/// the card cache key via `caller_id`, not validated.
fn call_context_from_headers(headers: &HeaderMap) -> Option<ServerCallContext> {
    let auth = headers.get(axum::http::header::AUTHORIZATION)?;
    let token = auth.to_str().ok()?.strip_prefix("Bearer ")?.to_string();

    let mut ctx = ServerCallContext::default();
    ctx.state
        .insert("caller_id".to_string(), Value::String(token));
    Some(ctx)
}

/// Shared state for the axum routes.
struct AppState {
    handler: Arc<dyn RequestHandler>,
    agent_card: AgentCard,
    sse_buffer: Arc<super::sse_buffer::SseBuffer>,
    heartbeat_interval: std::time::Duration,
    default_timeout: std::time::Duration,
    #[cfg(feature = "jws")]
    jws_key: Option<jsonwebtoken::EncodingKey>,
}

/// The task id a `StreamResponse` carries, when it has one.
///
/// Used to key the per-task SSE ring buffer. A bare `Message` (no
/// `task_id`) is not replayable by task id and is only delivered live.
fn stream_response_task_id(event: &StreamResponse) -> Option<&str> {
    match event {
        StreamResponse::Task(t) => Some(t.id.as_str()),
        StreamResponse::StatusUpdate(u) => Some(u.task_id.as_str()),
        StreamResponse::ArtifactUpdate(u) => Some(u.task_id.as_str()),
        StreamResponse::Message(m) => m.task_id.as_deref(),
    }
}

/// Parse the `Last-Event-ID` header (SSE reconnection resume point).
fn last_event_id_from_headers(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("Last-Event-ID")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
}

/// Create an axum Router with A2A protocol routes.
///
/// # Routes
///
/// - `POST /a2a` — JSON-RPC 2.0 dispatch for all A2A methods
/// - `GET /.well-known/agent-card.json` — agent card discovery endpoint (current)
/// - `GET /.well-known/agent.json` — agent card discovery endpoint (prior well-known path, kept)
/// - `GET /.well-known/agent` — deprecated agent card path (with warning)
/// - `GET /capabilities` — the card's capability listing alone
///
/// Unsigned — use [`a2a_router_with_jws`] to also serve `/agent-card.jws`.
///
/// # Parameters
///
/// - `handler` — the request handler implementing A2A logic
/// - `agent_card` — the agent card to serve at the well-known endpoint
pub fn a2a_router(handler: Arc<dyn RequestHandler>, agent_card: AgentCard) -> Router {
    build_router(
        handler,
        agent_card,
        #[cfg(feature = "jws")]
        None,
    )
}

/// Like [`a2a_router`], but also serves `GET /agent-card.jws` — the card as a
/// compact JWS (`header.payload.signature`) signed with `jws_key`.
#[cfg(feature = "jws")]
pub fn a2a_router_with_jws(
    handler: Arc<dyn RequestHandler>,
    agent_card: AgentCard,
    jws_key: jsonwebtoken::EncodingKey,
) -> Router {
    build_router(handler, agent_card, Some(jws_key))
}

fn build_router(
    handler: Arc<dyn RequestHandler>,
    agent_card: AgentCard,
    #[cfg(feature = "jws")] jws_key: Option<jsonwebtoken::EncodingKey>,
) -> Router {
    let config = crate::config::Config::default();
    let state = Arc::new(AppState {
        handler,
        agent_card,
        sse_buffer: Arc::new(super::sse_buffer::SseBuffer::with_default_capacity()),
        heartbeat_interval: config.heartbeat_interval,
        default_timeout: config.default_timeout,
        #[cfg(feature = "jws")]
        jws_key,
    });

    let router = Router::new()
        .route("/.well-known/agent-card.json", get(handle_agent_card))
        .route("/.well-known/agent.json", get(handle_agent_card))
        .route("/.well-known/agent", get(handle_agent_card_deprecated))
        .route("/capabilities", get(handle_capabilities))
        .route("/a2a", post(handle_jsonrpc));

    #[cfg(feature = "jws")]
    let router = router.route("/agent-card.jws", get(handle_agent_card_jws));

    router.with_state(state)
}

/// Serve the agent card at the well-known endpoint.
async fn handle_agent_card(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(&state.agent_card).into_response()
}

/// Serve the agent card at the deprecated path (with warning).
///
/// Mirrors Python SDK's support for `/.well-known/agent` alongside `/.well-known/agent.json`.
async fn handle_agent_card_deprecated(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    warn!(
        "Deprecated agent card endpoint '/.well-known/agent' accessed. \
         Please use '/.well-known/agent.json' instead."
    );
    Json(&state.agent_card).into_response()
}

/// Serve just the capability listing from the agent card.
async fn handle_capabilities(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(&state.agent_card.capabilities).into_response()
}

/// Serve the agent card as a signed JWS, when a signing key is configured.
#[cfg(feature = "jws")]
async fn handle_agent_card_jws(State(state): State<Arc<AppState>>) -> Response {
    use jsonwebtoken::{encode, Header};

    let Some(key) = state.jws_key.as_ref() else {
        return Json(JsonRpcResponse::error(
            None,
            error::INTERNAL_ERROR,
            "no JWS signing key configured for this server".to_string(),
        ))
        .into_response();
    };

    match encode(&Header::default(), &state.agent_card, key) {
        Ok(jws) => jws.into_response(),
        Err(e) => Json(JsonRpcResponse::error(
            None,
            error::INTERNAL_ERROR,
            format!("failed to sign agent card: {e}"),
        ))
        .into_response(),
    }
}

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, serde::Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, serde::Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<A2AJsonRpcError>,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, code: i64, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(A2AJsonRpcError {
                code,
                message,
                data: None,
            }),
        }
    }

    fn from_a2a_error(id: Option<Value>, err: A2AError) -> Self {
        let rpc_err: A2AJsonRpcError = err.into();
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(rpc_err),
        }
    }
}

/// Main JSON-RPC dispatch handler.
///
/// Accepts either a single request object or a non-empty batch (array) of
/// them, per JSON-RPC 2.0 §6. Parses the incoming JSON-RPC request(s), routes
/// each to the appropriate handler method, and returns either a JSON response,
/// a JSON array of responses, or an SSE stream.
///
/// Mirrors Python SDK's `_handle_requests` method routing.
async fn handle_jsonrpc(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(value): Json<Value>,
) -> Response {
    match value {
        Value::Array(items) => handle_batch(state, headers, items).await,
        Value::Object(_) => handle_single(state, headers, value).await,
        _ => Json(JsonRpcResponse::error(
            None,
            error::INVALID_REQUEST,
            "Request must be a JSON object or a non-empty array of requests".to_string(),
        ))
        .into_response(),
    }
}

/// Parse a single JSON value into a [`JsonRpcRequest`], validating the
/// `jsonrpc` version field. Extracts `id` up front so a malformed request
/// can still be correlated to its caller when possible.
fn parse_request(value: Value) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let id = value.get("id").cloned();
    match serde_json::from_value::<JsonRpcRequest>(value) {
        Ok(request) if request.jsonrpc == "2.0" => Ok(request),
        Ok(request) => Err(JsonRpcResponse::error(
            request.id,
            error::INVALID_REQUEST,
            "Invalid JSON-RPC version — must be \"2.0\"".to_string(),
        )),
        Err(e) => Err(JsonRpcResponse::error(
            id,
            error::INVALID_REQUEST,
            format!("Malformed JSON-RPC request: {}", e),
        )),
    }
}

/// Handle a single (non-batch) JSON-RPC request object.
async fn handle_single(state: Arc<AppState>, headers: HeaderMap, value: Value) -> Response {
    let request = match parse_request(value) {
        Ok(r) => r,
        Err(resp) => return Json(resp).into_response(),
    };

    debug!(method = %request.method, "JSON-RPC request received");

    // A request with no `id` is a notification: it is still executed for its
    // side effects, but the caller gets no response body at all, success or
    // error, per JSON-RPC 2.0 §4.
    let is_notification = request.id.is_none();

    // Streaming methods open a long-lived SSE response and are exempt from
    // the per-call deadline below — the deadline is for bounding a single
    // request/response round trip, not a subscription's lifetime.
    let is_streaming = matches!(
        request.method.as_str(),
        "message/stream" | "tasks/subscribe" | "tasks/resubscribe"
    );

    if is_streaming {
        return dispatch(state, request, &headers).await;
    }

    let id = request.id.clone();
    let timeout = state.default_timeout;
    let response = match tokio::time::timeout(timeout, dispatch(state, request, &headers)).await {
        Ok(response) => response,
        Err(_) => Json(JsonRpcResponse::from_a2a_error(
            id,
            A2AError::deadline_exceeded(format!("request exceeded {:?} deadline", timeout)),
        ))
        .into_response(),
    };

    if is_notification {
        return axum::http::StatusCode::NO_CONTENT.into_response();
    }
    response
}

/// Handle a JSON-RPC batch: an array of request objects, each processed
/// independently. An empty array is itself an `InvalidRequest`. Notifications
/// within the batch contribute no entry to the response array; if every item
/// was a notification, no response body is returned at all.
async fn handle_batch(state: Arc<AppState>, headers: HeaderMap, items: Vec<Value>) -> Response {
    if items.is_empty() {
        return Json(JsonRpcResponse::error(
            None,
            error::INVALID_REQUEST,
            "Batch request must not be empty".to_string(),
        ))
        .into_response();
    }

    let mut responses = Vec::with_capacity(items.len());
    for item in items {
        if let Some(value) = handle_batch_item(Arc::clone(&state), &headers, item).await {
            responses.push(value);
        }
    }

    if responses.is_empty() {
        return axum::http::StatusCode::NO_CONTENT.into_response();
    }
    Json(Value::Array(responses)).into_response()
}

/// Dispatch one item of a batch, returning its JSON-RPC response value unless
/// it was a notification, in which case there is nothing to return.
///
/// Streaming methods are rejected inside a batch — an SSE stream can't be
/// folded into one array element alongside ordinary JSON responses.
async fn handle_batch_item(state: Arc<AppState>, headers: &HeaderMap, value: Value) -> Option<Value> {
    let request = match parse_request(value) {
        Ok(r) => r,
        Err(resp) => return Some(serde_json::to_value(&resp).unwrap_or(Value::Null)),
    };

    let is_notification = request.id.is_none();
    let is_streaming = matches!(
        request.method.as_str(),
        "message/stream" | "tasks/subscribe" | "tasks/resubscribe"
    );
    if is_streaming {
        if is_notification {
            return None;
        }
        let resp = JsonRpcResponse::error(
            request.id,
            error::INVALID_REQUEST,
            "streaming methods are not supported inside a JSON-RPC batch".to_string(),
        );
        return Some(serde_json::to_value(&resp).unwrap_or(Value::Null));
    }

    let id = request.id.clone();
    let timeout = state.default_timeout;
    let response = match tokio::time::timeout(timeout, dispatch(state, request, headers)).await {
        Ok(response) => response,
        Err(_) => Json(JsonRpcResponse::from_a2a_error(
            id,
            A2AError::deadline_exceeded(format!("request exceeded {:?} deadline", timeout)),
        ))
        .into_response(),
    };

    if is_notification {
        return None;
    }
    Some(response_to_json(response).await)
}

/// Re-parse a dispatched handler's HTTP response body back into a JSON value
/// for inclusion in a batch response array.
async fn response_to_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_default();
    serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": null,
            "error": {
                "code": error::INTERNAL_ERROR,
                "message": "internal error serializing batch response"
            }
        })
    })
}

/// Route a parsed JSON-RPC request to its handler.
async fn dispatch(state: Arc<AppState>, request: JsonRpcRequest, headers: &HeaderMap) -> Response {
    match request.method.as_str() {
        "message/send" => handle_message_send(state, request).await,
        "message/stream" => handle_message_stream(state, request, headers).await,
        "tasks/get" => handle_tasks_get(state, request).await,
        "tasks/list" => handle_tasks_list(state, request).await,
        "tasks/cancel" => handle_tasks_cancel(state, request).await,
        "tasks/subscribe" => handle_tasks_subscribe(state, request, headers).await,
        "tasks/resubscribe" => handle_tasks_resubscribe(state, request, headers).await,
        "tasks/pushNotificationConfig/set" => {
            handle_push_notification_config_set(state, request).await
        }
        "tasks/pushNotificationConfig/get" => {
            handle_push_notification_config_get(state, request).await
        }
        "tasks/pushNotificationConfig/list" => {
            handle_push_notification_config_list(state, request).await
        }
        "tasks/pushNotificationConfig/delete" => {
            handle_push_notification_config_delete(state, request).await
        }
        "agent/getCard" => handle_get_agent_card(state, request).await,
        "agent/getAuthenticatedExtendedCard" => {
            handle_get_authenticated_extended_card(state, request, headers).await
        }
        "agent/authenticatedExtendedCard" => {
            // Deprecated alias for `agent/getAuthenticatedExtendedCard`.
            warn!("Deprecated JSON-RPC method 'agent/authenticatedExtendedCard' called. Use 'agent/getAuthenticatedExtendedCard' instead.");
            handle_get_authenticated_extended_card(state, request, headers).await
        }
        method => {
            warn!(method = %method, "Unknown JSON-RPC method");
            Json(JsonRpcResponse::error(
                request.id,
                error::METHOD_NOT_FOUND,
                format!("Method not found: {}", method),
            ))
            .into_response()
        }
    }
}

/// Parse `SendMessageParams` from JSON-RPC params.
fn parse_send_message_params(params: Value) -> Result<SendMessageParams, String> {
    let obj = params.as_object().ok_or("params must be an object")?;

    let message: crate::types::Message = serde_json::from_value(
        obj.get("message")
            .cloned()
            .ok_or("missing 'message' field")?,
    )
    .map_err(|e| format!("invalid message: {}", e))?;

    let configuration = obj
        .get("configuration")
        .and_then(|v| {
            if v.is_null() {
                None
            } else {
                Some(parse_send_config(v.clone()))
            }
        })
        .transpose()?;

    let metadata = obj
        .get("metadata")
        .and_then(|v| if v.is_null() { None } else { Some(v.clone()) });

    let tenant = obj.get("tenant").and_then(|v| v.as_str().map(String::from));

    Ok(SendMessageParams {
        message,
        configuration,
        metadata,
        tenant,
    })
}

/// Parse `SendMessageConfiguration` from a JSON value.
fn parse_send_config(value: Value) -> Result<SendMessageConfiguration, String> {
    let obj = value.as_object().ok_or("configuration must be an object")?;

    Ok(SendMessageConfiguration {
        accepted_output_modes: obj.get("acceptedOutputModes").and_then(|v| {
            v.as_array().map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
        }),
        blocking: obj.get("blocking").and_then(|v| v.as_bool()),
        history_length: obj
            .get("historyLength")
            .and_then(|v| v.as_u64().map(|n| n as usize)),
        push_notification_config: obj.get("pushNotificationConfig").cloned(),
    })
}

/// Handle `message/send` — synchronous execution.
///
/// Returns either a Task or Message in the response, matching Python SDK's
/// `SendMessageResponse` which is `Task | Message`.
async fn handle_message_send(state: Arc<AppState>, request: JsonRpcRequest) -> Response {
    let params = match parse_send_message_params(request.params) {
        Ok(p) => p,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                request.id,
                error::INVALID_PARAMS,
                format!("Invalid params: {}", e),
            ))
            .into_response();
        }
    };

    match state.handler.on_message_send(params).await {
        Ok(response) => {
            let result = serde_json::to_value(&response);
            match result {
                Ok(v) => Json(JsonRpcResponse::success(request.id, v)).into_response(),
                Err(e) => {
                    error!(error = %e, "Failed to serialize response");
                    Json(JsonRpcResponse::error(
                        request.id,
                        error::INTERNAL_ERROR,
                        format!("Internal error: {}", e),
                    ))
                    .into_response()
                }
            }
        }
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `message/stream` — SSE streaming.
///
/// Mirrors Python SDK's `JSONRPCHandler.on_message_send_stream` which:
/// 1. Validates streaming is supported via agent card capabilities
/// 2. Wraps each event in a JSON-RPC success response envelope
/// 3. Catches errors and yields them as JSON-RPC error responses
async fn handle_message_stream(
    state: Arc<AppState>,
    request: JsonRpcRequest,
    headers: &HeaderMap,
) -> Response {
    // Check streaming capability (mirrors Python SDK's @validate decorator).
    if !state.agent_card.capabilities.streaming.unwrap_or(false) {
        return Json(JsonRpcResponse::error(
            request.id,
            error::CAPABILITY_NOT_SUPPORTED,
            "Streaming is not supported by the agent".to_string(),
        ))
        .into_response();
    }

    let params = match parse_send_message_params(request.params) {
        Ok(p) => p,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                request.id,
                error::INVALID_PARAMS,
                format!("Invalid params: {}", e),
            ))
            .into_response();
        }
    };

    // message/stream creates the task as part of dispatch, so there is no
    // task id to resume from — a reconnect should re-issue message/send or
    // fall back to tasks/subscribe once the task id is known.
    let last_event_id = last_event_id_from_headers(headers);

    match state.handler.on_message_send_stream(params).await {
        Ok(rx) => {
            let stream = make_sse_stream(
                request.id,
                rx,
                Arc::clone(&state.sse_buffer),
                None,
                last_event_id,
                state.heartbeat_interval,
            );
            Sse::new(stream)
                .keep_alive(KeepAlive::default())
                .into_response()
        }
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `tasks/get`.
async fn handle_tasks_get(state: Arc<AppState>, request: JsonRpcRequest) -> Response {
    let params = match parse_get_task_params(request.params) {
        Ok(p) => p,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                request.id,
                error::INVALID_PARAMS,
                format!("Invalid params: {}", e),
            ))
            .into_response();
        }
    };

    match state.handler.on_get_task(params).await {
        Ok(task) => match serde_json::to_value(&task) {
            Ok(v) => Json(JsonRpcResponse::success(request.id, v)).into_response(),
            Err(e) => Json(JsonRpcResponse::error(
                request.id,
                error::INTERNAL_ERROR,
                format!("Internal error: {}", e),
            ))
            .into_response(),
        },
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `tasks/list`.
async fn handle_tasks_list(state: Arc<AppState>, request: JsonRpcRequest) -> Response {
    let params = match parse_list_tasks_params(request.params) {
        Ok(p) => p,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                request.id,
                error::INVALID_PARAMS,
                format!("Invalid params: {}", e),
            ))
            .into_response();
        }
    };

    match state.handler.on_list_tasks(params).await {
        Ok(response) => match serde_json::to_value(&response.tasks) {
            Ok(v) => {
                let mut result = serde_json::Map::new();
                result.insert("tasks".to_string(), v);
                if let Some(token) = response.next_page_token {
                    result.insert("nextPageToken".to_string(), Value::String(token));
                }
                Json(JsonRpcResponse::success(request.id, Value::Object(result))).into_response()
            }
            Err(e) => Json(JsonRpcResponse::error(
                request.id,
                error::INTERNAL_ERROR,
                format!("Internal error: {}", e),
            ))
            .into_response(),
        },
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `tasks/cancel`.
async fn handle_tasks_cancel(state: Arc<AppState>, request: JsonRpcRequest) -> Response {
    let params = match parse_cancel_task_params(request.params) {
        Ok(p) => p,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                request.id,
                error::INVALID_PARAMS,
                format!("Invalid params: {}", e),
            ))
            .into_response();
        }
    };

    match state.handler.on_cancel_task(params).await {
        Ok(task) => match serde_json::to_value(&task) {
            Ok(v) => Json(JsonRpcResponse::success(request.id, v)).into_response(),
            Err(e) => Json(JsonRpcResponse::error(
                request.id,
                error::INTERNAL_ERROR,
                format!("Internal error: {}", e),
            ))
            .into_response(),
        },
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `tasks/subscribe` — SSE streaming for an existing task.
async fn handle_tasks_subscribe(
    state: Arc<AppState>,
    request: JsonRpcRequest,
    headers: &HeaderMap,
) -> Response {
    let params = match parse_subscribe_params(request.params) {
        Ok(p) => p,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                request.id,
                error::INVALID_PARAMS,
                format!("Invalid params: {}", e),
            ))
            .into_response();
        }
    };

    let task_id = params.id.clone();
    let last_event_id = last_event_id_from_headers(headers);

    match state.handler.on_subscribe_to_task(params).await {
        Ok(rx) => {
            let stream = make_sse_stream(
                request.id,
                rx,
                Arc::clone(&state.sse_buffer),
                Some(task_id),
                last_event_id,
                state.heartbeat_interval,
            );
            Sse::new(stream)
                .keep_alive(KeepAlive::default())
                .into_response()
        }
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `tasks/resubscribe` — re-subscribe to a running task's event stream.
///
/// Mirrors Python SDK's `on_resubscribe_to_task`.
async fn handle_tasks_resubscribe(
    state: Arc<AppState>,
    request: JsonRpcRequest,
    headers: &HeaderMap,
) -> Response {
    let params = match parse_subscribe_params(request.params) {
        Ok(p) => p,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                request.id,
                error::INVALID_PARAMS,
                format!("Invalid params: {}", e),
            ))
            .into_response();
        }
    };

    let task_id = params.id.clone();
    let last_event_id = last_event_id_from_headers(headers);

    match state.handler.on_resubscribe_to_task(params).await {
        Ok(rx) => {
            let stream = make_sse_stream(
                request.id,
                rx,
                Arc::clone(&state.sse_buffer),
                Some(task_id),
                last_event_id,
                state.heartbeat_interval,
            );
            Sse::new(stream)
                .keep_alive(KeepAlive::default())
                .into_response()
        }
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `tasks/pushNotificationConfig/set`.
async fn handle_push_notification_config_set(
    state: Arc<AppState>,
    request: JsonRpcRequest,
) -> Response {
    match state
        .handler
        .on_set_task_push_notification_config(request.params)
        .await
    {
        Ok(result) => Json(JsonRpcResponse::success(request.id, result)).into_response(),
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `tasks/pushNotificationConfig/get`.
async fn handle_push_notification_config_get(
    state: Arc<AppState>,
    request: JsonRpcRequest,
) -> Response {
    match state
        .handler
        .on_get_task_push_notification_config(request.params)
        .await
    {
        Ok(result) => Json(JsonRpcResponse::success(request.id, result)).into_response(),
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `tasks/pushNotificationConfig/list`.
async fn handle_push_notification_config_list(
    state: Arc<AppState>,
    request: JsonRpcRequest,
) -> Response {
    match state
        .handler
        .on_list_task_push_notification_config(request.params)
        .await
    {
        Ok(result) => Json(JsonRpcResponse::success(request.id, result)).into_response(),
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `tasks/pushNotificationConfig/delete`.
async fn handle_push_notification_config_delete(
    state: Arc<AppState>,
    request: JsonRpcRequest,
) -> Response {
    match state
        .handler
        .on_delete_task_push_notification_config(request.params)
        .await
    {
        Ok(()) => Json(JsonRpcResponse::success(request.id, Value::Null)).into_response(),
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `agent/getCard` — the public, unauthenticated agent card.
///
/// Falls back to the card passed to [`a2a_router`] when the handler has no
/// [`super::AgentCardServer`] wired up.
async fn handle_get_agent_card(state: Arc<AppState>, request: JsonRpcRequest) -> Response {
    match state.handler.on_get_agent_card().await {
        Ok(card) => respond_with_card(request.id, &card),
        Err(A2AError::CapabilityNotSupported { .. }) => {
            respond_with_card(request.id, &state.agent_card)
        }
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `agent/getAuthenticatedExtendedCard`.
///
/// Mirrors Python SDK's `get_authenticated_extended_card` method. Falls back
/// to the public agent card when the handler has no
/// [`super::AgentCardServer`] wired up, matching the pre-extended-card
/// behavior this endpoint used to have.
async fn handle_get_authenticated_extended_card(
    state: Arc<AppState>,
    request: JsonRpcRequest,
    headers: &HeaderMap,
) -> Response {
    let call_context = call_context_from_headers(headers);
    match state
        .handler
        .on_get_authenticated_extended_card(call_context.as_ref())
        .await
    {
        Ok(card) => respond_with_card(request.id, &card),
        Err(A2AError::CapabilityNotSupported { .. }) => {
            respond_with_card(request.id, &state.agent_card)
        }
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

fn respond_with_card(id: Option<Value>, card: &AgentCard) -> Response {
    match serde_json::to_value(card) {
        Ok(v) => Json(JsonRpcResponse::success(id, v)).into_response(),
        Err(e) => Json(JsonRpcResponse::error(
            id,
            error::INTERNAL_ERROR,
            format!("Internal error: {}", e),
        ))
        .into_response(),
    }
}

// ---- Parameter parsing helpers ----

fn parse_get_task_params(params: Value) -> Result<GetTaskParams, String> {
    let obj = params.as_object().ok_or("params must be an object")?;
    let id = obj
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or("missing 'id' field")?
        .to_string();
    let history_length = obj
        .get("historyLength")
        .and_then(|v| v.as_u64().map(|n| n as usize));
    let metadata = obj
        .get("metadata")
        .and_then(|v| if v.is_null() { None } else { Some(v.clone()) });

    let tenant = obj.get("tenant").and_then(|v| v.as_str().map(String::from));

    Ok(GetTaskParams {
        id,
        history_length,
        metadata,
        tenant,
    })
}

fn parse_list_tasks_params(params: Value) -> Result<TaskListParams, String> {
    let obj = params.as_object().ok_or("params must be an object")?;

    let context_id = obj
        .get("contextId")
        .and_then(|v| v.as_str().map(String::from));
    let status = obj.get("status").and_then(|v| {
        v.as_array().map(|arr| {
            arr.iter()
                .filter_map(|v| {
                    v.as_str()
                        .and_then(|s| serde_json::from_value(Value::String(s.to_string())).ok())
                })
                .collect()
        })
    });
    let page_size = obj
        .get("pageSize")
        .and_then(|v| v.as_u64().map(|n| n as usize));
    let page_token = obj
        .get("pageToken")
        .and_then(|v| v.as_str().map(String::from));

    Ok(TaskListParams {
        context_id,
        status,
        page_size,
        page_token,
    })
}

fn parse_cancel_task_params(params: Value) -> Result<CancelTaskParams, String> {
    let obj = params.as_object().ok_or("params must be an object")?;
    let id = obj
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or("missing 'id' field")?
        .to_string();
    let metadata = obj
        .get("metadata")
        .and_then(|v| if v.is_null() { None } else { Some(v.clone()) });

    let tenant = obj.get("tenant").and_then(|v| v.as_str().map(String::from));

    Ok(CancelTaskParams {
        id,
        metadata,
        tenant,
    })
}

fn parse_subscribe_params(params: Value) -> Result<SubscribeToTaskParams, String> {
    let obj = params.as_object().ok_or("params must be an object")?;
    let id = obj
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or("missing 'id' field")?
        .to_string();
    let metadata = obj
        .get("metadata")
        .and_then(|v| if v.is_null() { None } else { Some(v.clone()) });

    let tenant = obj.get("tenant").and_then(|v| v.as_str().map(String::from));

    Ok(SubscribeToTaskParams {
        id,
        metadata,
        tenant,
    })
}

// ---- SSE streaming ----

/// Turn a recorded [`super::event::Event`] into a wire-level SSE `Event`,
/// wrapping its `StreamResponse` payload in the JSON-RPC envelope.
fn to_sse_event(request_id: Option<&Value>, recorded: &super::event::Event) -> Option<Event> {
    let data = recorded.data.as_ref()?;
    let event_type = match data {
        StreamResponse::StatusUpdate(_) => "statusUpdate",
        StreamResponse::ArtifactUpdate(_) => "artifactUpdate",
        StreamResponse::Task(_) => "task",
        StreamResponse::Message(_) => "message",
    };
    let result_value = serde_json::to_value(data)
        .map_err(|e| error!(error = %e, "Failed to serialize SSE event"))
        .ok()?;
    let rpc_response = JsonRpcResponse::success(request_id.cloned(), result_value);
    let json = serde_json::to_string(&rpc_response)
        .map_err(|e| error!(error = %e, "Failed to serialize SSE JSON-RPC response"))
        .ok()?;
    Some(
        Event::default()
            .id(recorded.id.to_string())
            .event(event_type)
            .data(json),
    )
}

/// Create an SSE stream from a broadcast receiver.
///
/// Each `StreamResponse` event is assigned a monotonic id (scoped to its
/// task) and recorded into `buffer` before being wrapped in a JSON-RPC 2.0
/// success response envelope and sent as an SSE event, mirroring the Python
/// SDK's `JSONRPCHandler.on_message_send_stream`. `resume_task_id`/
/// `last_event_id` replay already-seen events (via `Last-Event-ID`) before
/// the live loop starts; `heartbeat_interval` sends an empty `heartbeat`
/// event on idle connections so intermediaries don't time them out.
///
/// The stream ends when the channel is closed or a terminal status update is received.
fn make_sse_stream(
    request_id: Option<Value>,
    mut rx: broadcast::Receiver<StreamResponse>,
    buffer: Arc<super::sse_buffer::SseBuffer>,
    resume_task_id: Option<String>,
    last_event_id: Option<u64>,
    heartbeat_interval: std::time::Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        if let (Some(task_id), Some(last_id)) = (resume_task_id.as_deref(), last_event_id) {
            for recorded in buffer.replay_after(task_id, last_id).await {
                if let Some(sse_event) = to_sse_event(request_id.as_ref(), &recorded) {
                    yield Ok(sse_event);
                }
            }
        }

        let mut heartbeat = tokio::time::interval(heartbeat_interval);
        heartbeat.tick().await; // first tick fires immediately — consume it

        loop {
            tokio::select! {
                received = rx.recv() => {
                    match received {
                        Ok(event) => {
                            let is_terminal = match &event {
                                StreamResponse::StatusUpdate(update) => update.r#final,
                                _ => false,
                            };

                            let task_id = stream_response_task_id(&event)
                                .map(str::to_string)
                                .or_else(|| resume_task_id.clone());

                            if let Some(task_id) = task_id {
                                let counter = buffer.counter_for(&task_id).await;
                                let recorded = super::event::Event::from_stream_response(
                                    counter.next(),
                                    event,
                                );
                                buffer.record(&task_id, recorded.clone()).await;
                                if let Some(sse_event) = to_sse_event(request_id.as_ref(), &recorded) {
                                    yield Ok(sse_event);
                                }
                            }

                            if is_terminal {
                                yield Ok(Event::default().event("done").data(""));
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            yield Ok(Event::default().event("done").data(""));
                            break;
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(missed = n, "SSE stream lagged — some events were missed");
                        }
                    }
                }
                _ = heartbeat.tick() => {
                    yield Ok(Event::default().event("heartbeat").data(""));
                }
            }
        }
    }
}
