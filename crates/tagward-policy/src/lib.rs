//! Tagward Policy Engine
//!
//! Decides what an RFID reader receives once it has physically read a tag.
//! Devices are classified as whitelisted, authorized, or unauthorized, in
//! that order, and each classification maps onto exactly one action:
//!
//! - `allowed_whitelist` / `allowed_authorized`: full payload released
//! - `redacted_partial`: masked account number, owner name replaced
//! - `blocked_no_data`: nothing released
//!
//! Every decision lands in the audit log, which is append-only, serialized
//! under a mutex and hash-chained for tamper evidence.

pub mod audit;
pub mod engine;
pub mod error;
pub mod redact;
pub mod types;

pub use audit::AuditLog;
pub use engine::{AuditSink, PolicyEngine};
pub use error::{PolicyError, PolicyResult};
pub use redact::{mask_account_number, redact_payload, ACCOUNT_MASK_PREFIX, REDACTION_MARKER};
pub use types::{Action, AuditEvent, Decision, DisclosurePolicy, TrustClass};
