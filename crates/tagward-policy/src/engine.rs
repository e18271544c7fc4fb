use std::sync::Arc;

use tagward_core::{RawPayload, ReaderDevice, Timestamp};

use crate::error::PolicyResult;
use crate::redact::redact_payload;
use crate::types::{Action, AuditEvent, Decision, DisclosurePolicy, TrustClass};

// ---------------------------------------------------------------------------
// AuditSink trait: where decision events go
// ---------------------------------------------------------------------------

/// Destination for decision events.
///
/// `append` is infallible: an event handed to the sink is recorded before the
/// engine returns its decision.
pub trait AuditSink: Send + Sync {
    fn append(&self, event: AuditEvent);
}

// ---------------------------------------------------------------------------
// PolicyEngine: disclosure decisions for physically successful reads
// ---------------------------------------------------------------------------

/// Decides what a reader gets from a tag it has physically read.
///
/// Rules, first match wins:
/// 1. whitelisted device id: full payload (`allowed_whitelist`)
/// 2. device flagged authorized: full payload (`allowed_authorized`)
/// 3. anything else: redacted copy (`redacted_partial`) or nothing
///    (`blocked_no_data`), optionally with an alert
///
/// Every decision appends exactly one event to the audit sink.
pub struct PolicyEngine {
    policy: DisclosurePolicy,
    audit_sink: Arc<dyn AuditSink>,
}

impl PolicyEngine {
    pub fn new(policy: DisclosurePolicy, audit_sink: Arc<dyn AuditSink>) -> PolicyResult<Self> {
        policy.validate()?;
        tracing::info!(
            whitelisted = policy.whitelisted_device_ids.len(),
            redact_on_unauthorized = policy.redact_on_unauthorized,
            alert_on_unauthorized = policy.alert_on_unauthorized,
            "policy engine initialized"
        );
        Ok(Self { policy, audit_sink })
    }

    /// Classify a device against the policy, reading its current trust flag.
    pub fn classify(&self, device: &ReaderDevice) -> TrustClass {
        TrustClass::from_flags(self.policy.is_whitelisted(device.id()), device.is_authorized())
    }

    /// Evaluate a read and return only what the reader receives.
    pub fn evaluate(&self, device: &ReaderDevice, payload: RawPayload) -> Option<RawPayload> {
        self.decide(device, payload).disclosure
    }

    /// Evaluate a read and return the full decision.
    pub fn decide(&self, device: &ReaderDevice, payload: RawPayload) -> Decision {
        // Read the flag once so classification and the audit snapshot agree.
        let was_whitelisted = self.policy.is_whitelisted(device.id());
        let device_authorized = device.is_authorized();
        let trust = TrustClass::from_flags(was_whitelisted, device_authorized);
        let credential_id = payload.credential_id.clone();

        let (action, disclosure, alert_message) = match trust {
            TrustClass::Whitelisted => (Action::AllowedWhitelist, Some(payload), None),
            TrustClass::Authorized => (Action::AllowedAuthorized, Some(payload), None),
            TrustClass::Unauthorized => {
                let (action, disclosure) = if self.policy.redact_on_unauthorized {
                    (Action::RedactedPartial, Some(redact_payload(&payload)))
                } else {
                    (Action::BlockedNoData, None)
                };
                let alert = self
                    .policy
                    .alert_on_unauthorized
                    .then(|| format!("Unauthorized read attempt by {}", device.name()));
                (action, disclosure, alert)
            }
        };

        debug_assert_eq!(disclosure.is_some(), action.discloses_data());

        if let Some(ref alert) = alert_message {
            tracing::warn!(
                device_id = %device.id(),
                credential_id = %credential_id,
                action = %action,
                "{}",
                alert
            );
        } else {
            tracing::info!(
                device_id = %device.id(),
                credential_id = %credential_id,
                trust = %trust,
                action = %action,
                "read decision"
            );
        }

        self.audit_sink.append(AuditEvent {
            timestamp: Timestamp::now(),
            device_id: device.id().clone(),
            device_name: device.name().to_string(),
            device_authorized,
            was_whitelisted,
            credential_id,
            action,
            alert_message: alert_message.clone(),
        });

        Decision {
            trust,
            action,
            disclosure,
            alert_message,
        }
    }
}
