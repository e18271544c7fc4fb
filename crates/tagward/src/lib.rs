//! Tagward Root Library
//!
//! Orchestration layer for the Tagward RFID read shield. Ties together the
//! registration source (config + registry), the physical-read evaluator, the
//! policy engine and its audit log, and exposes them through a JSON-RPC 2.0
//! request handler used by the stdio server.
//!
//! # Architecture
//!
//! A read attempt flows through two gates:
//!
//! 1. `tagward_core::attempt_read` decides whether the reader hears the tag
//!    at all (range, silenced tag). A miss is `NoSignal` and is not audited.
//! 2. `tagward_policy::PolicyEngine` classifies the reader and decides what
//!    it receives, appending one event to the shared `AuditLog`.

pub mod config;
pub mod error;
pub mod registry;

pub use config::{AttemptConfig, CredentialConfig, DeviceConfig, RootConfig, VaultConfig};
pub use error::{RootError, RootResult};
pub use registry::Registry;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tagward_core::{attempt_read, Cipher, CredentialId, DeviceId, RawPayload};
use tagward_policy::{Action, AuditLog, PolicyEngine};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// JSON-RPC types
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
    pub id: serde_json::Value,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: serde_json::Value,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, code: i64, message: String) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError { code, message }),
            id,
        }
    }
}

/// JSON-RPC error codes (standard + Tagward-specific).
pub mod rpc_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Tagward-specific: device id not registered.
    pub const UNKNOWN_DEVICE: i64 = -32001;
    /// Tagward-specific: credential id not registered.
    pub const UNKNOWN_CREDENTIAL: i64 = -32002;
}

// ---------------------------------------------------------------------------
// Attempt outcome
// ---------------------------------------------------------------------------

/// What the caller of a read attempt gets back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Out of range or tag silenced. Nothing audited.
    NoSignal,
    /// The reader received a payload (full or redacted).
    Delivered { action: Action, payload: RawPayload },
    /// The reader received nothing.
    Blocked { action: Action },
}

impl AttemptOutcome {
    pub fn action(&self) -> Option<Action> {
        match self {
            AttemptOutcome::NoSignal => None,
            AttemptOutcome::Delivered { action, .. } | AttemptOutcome::Blocked { action } => {
                Some(*action)
            }
        }
    }

    pub fn payload(&self) -> Option<&RawPayload> {
        match self {
            AttemptOutcome::Delivered { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Shield state
// ---------------------------------------------------------------------------

/// Runtime state: registry, policy engine and the audit log it writes to.
///
/// `process_attempt` takes `&self`, so the state can be shared across
/// threads behind an `Arc` and attempts evaluated concurrently.
pub struct ShieldState {
    pub config: RootConfig,
    pub registry: Registry,
    pub audit_log: Arc<AuditLog>,
    pub engine: PolicyEngine,
}

/// Build the runtime state from a validated configuration.
pub fn initialize(config: RootConfig) -> RootResult<ShieldState> {
    config.validate()?;

    let registry = Registry::from_config(&config)?;
    let audit_log = Arc::new(AuditLog::new());
    let engine = PolicyEngine::new(config.policy.clone(), audit_log.clone())?;

    info!(
        devices = registry.device_count(),
        credentials = registry.credential_count(),
        "tagward initialized"
    );

    Ok(ShieldState {
        config,
        registry,
        audit_log,
        engine,
    })
}

impl ShieldState {
    /// Run one read attempt through both gates.
    pub fn process_attempt(
        &self,
        device_id: &DeviceId,
        credential_id: &CredentialId,
        distance_m: f64,
    ) -> RootResult<AttemptOutcome> {
        if !distance_m.is_finite() || distance_m < 0.0 {
            return Err(RootError::InvalidAttempt(format!(
                "distance must be a finite value >= 0, got {}",
                distance_m
            )));
        }
        let device = self.registry.device(device_id)?;
        let credential = self.registry.credential(credential_id)?;

        let Some(payload) = attempt_read(device, credential, distance_m) else {
            debug!(
                device_id = %device_id,
                credential_id = %credential_id,
                distance_m,
                range_meters = device.range_meters(),
                "no signal"
            );
            return Ok(AttemptOutcome::NoSignal);
        };

        let decision = self.engine.decide(device, payload);
        Ok(match decision.disclosure {
            Some(payload) => AttemptOutcome::Delivered {
                action: decision.action,
                payload,
            },
            None => AttemptOutcome::Blocked {
                action: decision.action,
            },
        })
    }

    /// Administrative update of a device's trust flag. Takes effect for the
    /// next decision, including ones already queued on other threads.
    pub fn set_device_authorization(
        &self,
        device_id: &DeviceId,
        authorized: bool,
    ) -> RootResult<()> {
        let device = self.registry.device(device_id)?;
        device.set_authorized(authorized);
        info!(device_id = %device_id, authorized, "device authorization updated");
        Ok(())
    }

    /// Replay the scripted attempts from the configuration, in order.
    pub fn run_scripted_attempts(&self) -> RootResult<Vec<(AttemptConfig, AttemptOutcome)>> {
        self.config
            .attempts
            .iter()
            .map(|attempt| {
                let outcome = self.process_attempt(
                    &DeviceId::new(attempt.device_id.as_str()),
                    &CredentialId::new(attempt.credential_id.as_str()),
                    attempt.distance_m,
                )?;
                Ok((attempt.clone(), outcome))
            })
            .collect()
    }

    /// Serialize the audit log to JSON and seal it with `cipher`.
    pub fn export_audit(&self, cipher: &dyn Cipher) -> RootResult<Vec<u8>> {
        self.audit_log.verify_chain()?;
        let json = self.audit_log.export_json()?;
        let token = cipher.encrypt(&json)?;
        info!(events = self.audit_log.len(), "audit log exported");
        Ok(token)
    }
}

// ---------------------------------------------------------------------------
// Request handling
// ---------------------------------------------------------------------------

/// Route a JSON-RPC request to its handler.
pub fn handle_request(state: &ShieldState, request: &JsonRpcRequest) -> JsonRpcResponse {
    if request.jsonrpc != "2.0" {
        return JsonRpcResponse::error(
            request.id.clone(),
            rpc_codes::INVALID_REQUEST,
            format!("unsupported JSON-RPC version: {}", request.jsonrpc),
        );
    }

    debug!(method = %request.method, "handling request");

    match request.method.as_str() {
        "read/attempt" => handle_read_attempt(state, request),
        "device/authorize" => handle_device_authorize(state, request),
        "audit/list" => handle_audit_list(state, request),
        "audit/render" => handle_audit_render(state, request),
        "audit/verify" => handle_audit_verify(state, request),
        _ => {
            warn!(method = %request.method, "unknown method");
            JsonRpcResponse::error(
                request.id.clone(),
                rpc_codes::METHOD_NOT_FOUND,
                format!("unknown method: {}", request.method),
            )
        }
    }
}

fn error_response(id: serde_json::Value, err: RootError) -> JsonRpcResponse {
    let code = match err {
        RootError::UnknownDevice(_) => rpc_codes::UNKNOWN_DEVICE,
        RootError::UnknownCredential(_) => rpc_codes::UNKNOWN_CREDENTIAL,
        RootError::InvalidAttempt(_) => rpc_codes::INVALID_PARAMS,
        _ => rpc_codes::INTERNAL_ERROR,
    };
    JsonRpcResponse::error(id, code, err.to_string())
}

fn parse_params<T: for<'de> Deserialize<'de>>(
    request: &JsonRpcRequest,
) -> Result<T, JsonRpcResponse> {
    let params = request.params.clone().unwrap_or(serde_json::Value::Null);
    serde_json::from_value(params).map_err(|e| {
        JsonRpcResponse::error(
            request.id.clone(),
            rpc_codes::INVALID_PARAMS,
            format!("invalid params: {}", e),
        )
    })
}

#[derive(Debug, Deserialize)]
struct ReadAttemptParams {
    device_id: DeviceId,
    credential_id: CredentialId,
    distance_m: f64,
}

#[derive(Debug, Deserialize)]
struct AuthorizeParams {
    device_id: DeviceId,
    authorized: bool,
}

#[derive(Debug, Default, Deserialize)]
struct AuditListParams {
    #[serde(default)]
    limit: Option<usize>,
}

fn handle_read_attempt(state: &ShieldState, request: &JsonRpcRequest) -> JsonRpcResponse {
    let params: ReadAttemptParams = match parse_params(request) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let outcome = match state.process_attempt(
        &params.device_id,
        &params.credential_id,
        params.distance_m,
    ) {
        Ok(o) => o,
        Err(e) => return error_response(request.id.clone(), e),
    };
    match serde_json::to_value(&outcome) {
        Ok(v) => JsonRpcResponse::success(request.id.clone(), v),
        Err(e) => error_response(request.id.clone(), e.into()),
    }
}

fn handle_device_authorize(state: &ShieldState, request: &JsonRpcRequest) -> JsonRpcResponse {
    let params: AuthorizeParams = match parse_params(request) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Err(e) = state.set_device_authorization(&params.device_id, params.authorized) {
        return error_response(request.id.clone(), e);
    }
    JsonRpcResponse::success(
        request.id.clone(),
        serde_json::json!({
            "device_id": params.device_id,
            "authorized": params.authorized,
        }),
    )
}

fn handle_audit_list(state: &ShieldState, request: &JsonRpcRequest) -> JsonRpcResponse {
    let params: AuditListParams = if request.params.is_none() {
        AuditListParams::default()
    } else {
        match parse_params(request) {
            Ok(p) => p,
            Err(resp) => return resp,
        }
    };
    let total = state.audit_log.len();
    let entries = match params.limit {
        Some(limit) => state.audit_log.recent(limit),
        None => state.audit_log.events(),
    };
    JsonRpcResponse::success(
        request.id.clone(),
        serde_json::json!({
            "entries": entries,
            "total": total,
        }),
    )
}

fn handle_audit_render(state: &ShieldState, request: &JsonRpcRequest) -> JsonRpcResponse {
    JsonRpcResponse::success(
        request.id.clone(),
        serde_json::json!({ "text": state.audit_log.render() }),
    )
}

fn handle_audit_verify(state: &ShieldState, request: &JsonRpcRequest) -> JsonRpcResponse {
    let valid = state.audit_log.verify_chain().is_ok();
    JsonRpcResponse::success(
        request.id.clone(),
        serde_json::json!({
            "valid": valid,
            "head": state.audit_log.head(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
