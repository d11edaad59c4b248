//! Derives and serves `AgentCard`s from a capability registry.
//!
//! The teacher has [`crate::builders::AgentCardBuilder`] for ergonomic
//! manual construction and a static `/.well-known/agent.json` route, but no
//! `CapabilityRegistry → AgentCard` derivation, no caching, and no JWS
//! signing (`AgentCardSignature` exists in `types.rs` as an inert type with
//! nothing that populates it). Built fresh here: mode inference from schema
//! shape, a TTL cache in the same mutex-guarded idiom as [`super::cache`],
//! and optional JWS signing via `jsonwebtoken` (behind the `jws` feature).

use std::time::Duration;

use serde_json::Value;

use crate::builders::AgentCardBuilder;
use crate::error::{A2AError, A2AResult};
use crate::types::{AgentCard, AgentSkill, SecurityRequirement};

use super::cache::TtlCache;

/// One capability a server-hosted agent exposes, prior to being turned into
/// an `AgentSkill` on the served card.
#[derive(Debug, Clone)]
pub struct CapabilitySkill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub examples: Option<Vec<String>>,
    pub input_schema: Option<Value>,
    pub output_schema: Option<Value>,
    pub security_requirements: Option<Vec<SecurityRequirement>>,
}

/// The source of truth `AgentCardServer` derives `AgentCard`s from.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    pub name: String,
    pub description: String,
    pub version: String,
    pub url: String,
    pub streaming: bool,
    pub push_notifications: bool,
    pub skills: Vec<CapabilitySkill>,
}

/// Infers a MIME-ish mode string from a JSON Schema fragment's shape.
///
/// - a file-shaped property (string with `format: "binary"`, or a
///   `contentEncoding`/`contentMediaType` keyword) → `"file"`
/// - object or array schemas → `"application/json"` (structured data)
/// - anything else → `"text/plain"`
fn infer_mode(schema: &Value) -> &'static str {
    let is_file_shaped = schema
        .get("format")
        .and_then(Value::as_str)
        .map(|f| f == "binary")
        .unwrap_or(false)
        || schema.get("contentEncoding").is_some()
        || schema.get("contentMediaType").is_some();

    if is_file_shaped {
        return "file";
    }

    match schema.get("type").and_then(Value::as_str) {
        Some("object") | Some("array") => "application/json",
        _ => "text/plain",
    }
}

fn infer_modes(schema: &Option<Value>) -> Vec<String> {
    match schema {
        Some(s) => vec![infer_mode(s).to_string()],
        None => vec!["text/plain".to_string()],
    }
}

/// Builds, caches, and optionally signs `AgentCard`s.
///
/// Cards are cached per caller key (default `"default"`, used when the
/// caller has no distinguishing identity) so repeated `agent/getCard` calls
/// don't re-derive the same card on every request.
pub struct AgentCardServer {
    registry: CapabilityRegistry,
    cache: TtlCache<String, AgentCard>,
    #[cfg(feature = "jws")]
    jws_key: Option<jsonwebtoken::EncodingKey>,
}

impl AgentCardServer {
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self {
            registry,
            cache: TtlCache::with_defaults(),
            #[cfg(feature = "jws")]
            jws_key: None,
        }
    }

    pub fn with_cache_ttl(registry: CapabilityRegistry, ttl: Duration) -> Self {
        Self {
            registry,
            cache: TtlCache::new(super::cache::DEFAULT_CACHE_SIZE, ttl),
            #[cfg(feature = "jws")]
            jws_key: None,
        }
    }

    /// Enable JWS signing for cards served via [`Self::get_signed_card`].
    #[cfg(feature = "jws")]
    pub fn with_jws_key(mut self, key: jsonwebtoken::EncodingKey) -> Self {
        self.jws_key = Some(key);
        self
    }

    fn derive_card(&self) -> AgentCard {
        let mut builder = AgentCardBuilder::new(
            self.registry.name.clone(),
            self.registry.description.clone(),
            self.registry.version.clone(),
        )
        .with_jsonrpc_interface(self.registry.url.clone())
        .with_streaming(self.registry.streaming)
        .with_push_notifications(self.registry.push_notifications);

        for skill in &self.registry.skills {
            builder = builder.with_skill_object(AgentSkill {
                id: skill.id.clone(),
                name: skill.name.clone(),
                description: skill.description.clone(),
                tags: skill.tags.clone(),
                examples: skill.examples.clone(),
                input_modes: Some(infer_modes(&skill.input_schema)),
                output_modes: Some(infer_modes(&skill.output_schema)),
                security_requirements: skill.security_requirements.clone(),
                security: None,
            });
        }

        builder.build()
    }

    /// Get the plain JSON `AgentCard` for the given caller key, deriving and
    /// caching it on first access.
    pub async fn get_card(&self, caller: &str) -> AgentCard {
        if let Some(cached) = self.cache.get(&caller.to_string()).await {
            return cached;
        }
        let card = self.derive_card();
        self.cache.put(caller.to_string(), card.clone()).await;
        card
    }

    /// Invalidate the cached card for a caller, forcing re-derivation on the
    /// next [`Self::get_card`].
    pub async fn invalidate(&self, caller: &str) {
        self.cache.invalidate(&caller.to_string()).await;
    }

    /// Get the card as a compact JWS (`header.payload.signature`, base64url)
    /// using the configured signing key.
    #[cfg(feature = "jws")]
    pub async fn get_signed_card(&self, caller: &str) -> A2AResult<String> {
        use jsonwebtoken::{encode, Header};

        let key = self.jws_key.as_ref().ok_or_else(|| A2AError::InternalError {
            message: "AgentCardServer has no JWS signing key configured".to_string(),
            data: None,
        })?;

        let card = self.get_card(caller).await;
        encode(&Header::default(), &card, key).map_err(|e| A2AError::InternalError {
            message: format!("Failed to sign agent card: {e}"),
            data: None,
        })
    }

    #[cfg(not(feature = "jws"))]
    pub async fn get_signed_card(&self, _caller: &str) -> A2AResult<String> {
        Err(A2AError::CapabilityNotSupported {
            message: "JWS signing requires the `jws` feature".to_string(),
            data: None,
        })
    }
}
