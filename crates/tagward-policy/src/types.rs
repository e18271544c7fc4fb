use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use tagward_core::{CredentialId, DeviceId, RawPayload, Timestamp};

use crate::error::{PolicyError, PolicyResult};

// ---------------------------------------------------------------------------
// Action: closed taxonomy of policy outcomes
// ---------------------------------------------------------------------------

/// What the engine did with a physically successful read.
///
/// Closed set. A new trust tier must map onto one of these or add a variant;
/// every match over `Action` is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    AllowedWhitelist,
    AllowedAuthorized,
    RedactedPartial,
    BlockedNoData,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::AllowedWhitelist => "allowed_whitelist",
            Action::AllowedAuthorized => "allowed_authorized",
            Action::RedactedPartial => "redacted_partial",
            Action::BlockedNoData => "blocked_no_data",
        }
    }

    /// Whether any credential data reaches the reader.
    pub fn discloses_data(&self) -> bool {
        !matches!(self, Action::BlockedNoData)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TrustClass: how the engine classifies a reading device
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustClass {
    Whitelisted,
    Authorized,
    Unauthorized,
}

impl TrustClass {
    /// Whitelist membership wins over the authorization flag.
    pub fn from_flags(whitelisted: bool, authorized: bool) -> Self {
        if whitelisted {
            TrustClass::Whitelisted
        } else if authorized {
            TrustClass::Authorized
        } else {
            TrustClass::Unauthorized
        }
    }
}

impl fmt::Display for TrustClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrustClass::Whitelisted => write!(f, "whitelisted"),
            TrustClass::Authorized => write!(f, "authorized"),
            TrustClass::Unauthorized => write!(f, "unauthorized"),
        }
    }
}

// ---------------------------------------------------------------------------
// DisclosurePolicy: singleton configuration consulted by every decision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosurePolicy {
    /// Devices released the full payload regardless of their trust flag.
    #[serde(default)]
    pub whitelisted_device_ids: HashSet<DeviceId>,

    /// Hand unauthorized readers a masked copy instead of nothing.
    #[serde(default = "default_true")]
    pub redact_on_unauthorized: bool,

    /// Attach an alert to audit events for unauthorized reads.
    #[serde(default = "default_true")]
    pub alert_on_unauthorized: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DisclosurePolicy {
    fn default() -> Self {
        Self {
            whitelisted_device_ids: HashSet::new(),
            redact_on_unauthorized: true,
            alert_on_unauthorized: true,
        }
    }
}

impl DisclosurePolicy {
    pub fn new<I, D>(
        whitelist: I,
        redact_on_unauthorized: bool,
        alert_on_unauthorized: bool,
    ) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<DeviceId>,
    {
        Self {
            whitelisted_device_ids: whitelist.into_iter().map(Into::into).collect(),
            redact_on_unauthorized,
            alert_on_unauthorized,
        }
    }

    /// Exact id match; no prefix or case folding.
    pub fn is_whitelisted(&self, device_id: &DeviceId) -> bool {
        self.whitelisted_device_ids.contains(device_id)
    }

    pub fn validate(&self) -> PolicyResult<()> {
        if self.whitelisted_device_ids.iter().any(|id| id.is_empty()) {
            return Err(PolicyError::ValidationError(
                "whitelist contains an empty device id".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AuditEvent: one decision, snapshotted at decision time
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: Timestamp,
    pub device_id: DeviceId,
    pub device_name: String,
    pub device_authorized: bool,
    pub was_whitelisted: bool,
    pub credential_id: CredentialId,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_message: Option<String>,
}

impl AuditEvent {
    /// Human-readable rendering: the summary line, plus an indented alert
    /// line when an alert was raised.
    pub fn render(&self) -> String {
        let mut out = format!(
            "{} | Device:{} ({}) | Action:{} | Credential:{}",
            self.timestamp.to_log_string(),
            self.device_name,
            self.device_id,
            self.action,
            self.credential_id
        );
        if let Some(ref alert) = self.alert_message {
            out.push_str("\n  ALERT: ");
            out.push_str(alert);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Decision: what the caller gets back from the engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Decision {
    pub trust: TrustClass,
    pub action: Action,
    /// Payload released to the reader; `None` when blocked.
    pub disclosure: Option<RawPayload>,
    pub alert_message: Option<String>,
}
