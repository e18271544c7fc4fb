//! Redaction of credential payloads released to unauthorized readers.
//!
//! The account number keeps only its trailing four characters behind a fixed
//! mask; the owner name is replaced outright. Credential id and expiry pass
//! through untouched.

use tagward_core::RawPayload;

/// Fixed prefix that replaces everything but the last four characters.
pub const ACCOUNT_MASK_PREFIX: &str = "XXXX-XXXX-XXXX-";

/// Replacement for the owner name.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Mask an account number down to its last four characters.
///
/// Numbers shorter than four characters keep whatever they have
/// (`"12"` becomes `"XXXX-XXXX-XXXX-12"`). Works on characters, not bytes.
pub fn mask_account_number(account_number: &str) -> String {
    let count = account_number.chars().count();
    let tail: String = account_number.chars().skip(count.saturating_sub(4)).collect();
    format!("{}{}", ACCOUNT_MASK_PREFIX, tail)
}

/// Build the redacted copy of a payload.
pub fn redact_payload(payload: &RawPayload) -> RawPayload {
    RawPayload {
        credential_id: payload.credential_id.clone(),
        owner_name: REDACTION_MARKER.to_string(),
        account_number: mask_account_number(&payload.account_number),
        expiry: payload.expiry.clone(),
    }
}
