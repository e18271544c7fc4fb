use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use zeroize::Zeroize;

use crate::error::{TagwardError, TagwardResult};

// ---------------------------------------------------------------------------
// Timestamp: canonical time representation (seconds + nanoseconds)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds_since_epoch: u64,
    pub nanoseconds: u32,
}

impl Timestamp {
    pub fn now() -> Self {
        let now = chrono::Utc::now();
        Self {
            seconds_since_epoch: now.timestamp() as u64,
            nanoseconds: now.timestamp_subsec_nanos(),
        }
    }

    pub fn from_seconds(seconds: u64) -> Self {
        Self {
            seconds_since_epoch: seconds,
            nanoseconds: 0,
        }
    }

    /// Second-resolution UTC rendering used in audit log lines,
    /// e.g. `2024-05-01 13:37:00`.
    pub fn to_log_string(&self) -> String {
        self.to_datetime()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "invalid".to_string())
    }

    fn to_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.seconds_since_epoch as i64, self.nanoseconds)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_log_string())
    }
}

// ---------------------------------------------------------------------------
// Typed identifiers: prevent stringly-typed confusion
// ---------------------------------------------------------------------------

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

define_id!(DeviceId, "Unique identifier for a registered reading device.");
define_id!(CredentialId, "Unique identifier for a credential carried by a tag.");

// ---------------------------------------------------------------------------
// Credential: identity record carried by a tag
// ---------------------------------------------------------------------------

/// An identity record carried by an RFID tag.
///
/// Fields are fixed at issuance. The only knob is `can_be_read`, which is
/// chosen while building the credential (a deliberately silenced tag never
/// answers a reader).
#[derive(Clone)]
pub struct Credential {
    id: CredentialId,
    owner_name: String,
    account_number: String,
    expiry: String,
    can_be_read: bool,
}

impl Credential {
    /// Build a credential with a caller-supplied id.
    pub fn new(
        id: impl Into<CredentialId>,
        owner_name: impl Into<String>,
        account_number: impl Into<String>,
        expiry: impl Into<String>,
    ) -> TagwardResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(TagwardError::InvalidCredential(
                "credential id must not be empty".into(),
            ));
        }
        Ok(Self {
            id,
            owner_name: owner_name.into(),
            account_number: account_number.into(),
            expiry: expiry.into(),
            can_be_read: true,
        })
    }

    /// Issue a credential under a fresh random (v4 UUID) id.
    pub fn issue(
        owner_name: impl Into<String>,
        account_number: impl Into<String>,
        expiry: impl Into<String>,
    ) -> Self {
        Self {
            id: CredentialId::new(uuid::Uuid::new_v4().to_string()),
            owner_name: owner_name.into(),
            account_number: account_number.into(),
            expiry: expiry.into(),
            can_be_read: true,
        }
    }

    /// Set whether the tag answers readers at all.
    pub fn with_readable(mut self, can_be_read: bool) -> Self {
        self.can_be_read = can_be_read;
        self
    }

    pub fn id(&self) -> &CredentialId {
        &self.id
    }

    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    pub fn expiry(&self) -> &str {
        &self.expiry
    }

    pub fn can_be_read(&self) -> bool {
        self.can_be_read
    }

    /// The full, unredacted field set the tag transmits.
    pub fn payload(&self) -> RawPayload {
        RawPayload {
            credential_id: self.id.clone(),
            owner_name: self.owner_name.clone(),
            account_number: self.account_number.clone(),
            expiry: self.expiry.clone(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("owner_name", &self.owner_name)
            .field("account_number", &"<hidden>")
            .field("expiry", &self.expiry)
            .field("can_be_read", &self.can_be_read)
            .finish()
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        self.account_number.zeroize();
    }
}

// ---------------------------------------------------------------------------
// ReaderDevice: a registered reading device
// ---------------------------------------------------------------------------

/// A registered reading device.
///
/// `authorized` lives behind an atomic so an administrator can flip it while
/// evaluations are running; every read of the flag observes the latest store.
pub struct ReaderDevice {
    id: DeviceId,
    name: String,
    authorized: AtomicBool,
    range_meters: f64,
}

impl ReaderDevice {
    pub fn new(
        id: impl Into<DeviceId>,
        name: impl Into<String>,
        authorized: bool,
        range_meters: f64,
    ) -> TagwardResult<Self> {
        let id = id.into();
        let name = name.into();
        if id.is_empty() {
            return Err(TagwardError::InvalidDevice(
                "device id must not be empty".into(),
            ));
        }
        if name.trim().is_empty() {
            return Err(TagwardError::InvalidDevice(format!(
                "device '{}' must have a display name",
                id
            )));
        }
        if !range_meters.is_finite() || range_meters < 0.0 {
            return Err(TagwardError::InvalidDevice(format!(
                "device '{}' has invalid range {} (must be a finite value >= 0)",
                id, range_meters
            )));
        }
        Ok(Self {
            id,
            name,
            authorized: AtomicBool::new(authorized),
            range_meters,
        })
    }

    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range_meters(&self) -> f64 {
        self.range_meters
    }

    /// Current value of the static trust flag.
    pub fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::Acquire)
    }

    /// Administrative update of the trust flag.
    pub fn set_authorized(&self, authorized: bool) {
        self.authorized.store(authorized, Ordering::Release);
    }
}

impl fmt::Debug for ReaderDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderDevice")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("authorized", &self.is_authorized())
            .field("range_meters", &self.range_meters)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RawPayload: the field set released by a tag (or a redacted copy of it)
// ---------------------------------------------------------------------------

/// Credential fields as transmitted to, or disclosed to, a reader.
///
/// The account number is masked in `Debug` output and wiped on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPayload {
    pub credential_id: CredentialId,
    pub owner_name: String,
    pub account_number: String,
    pub expiry: String,
}

impl fmt::Debug for RawPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawPayload")
            .field("credential_id", &self.credential_id)
            .field("owner_name", &self.owner_name)
            .field("account_number", &"<hidden>")
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl Drop for RawPayload {
    fn drop(&mut self) {
        self.account_number.zeroize();
        self.owner_name.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_ordering() {
        let t1 = Timestamp::from_seconds(100);
        let t2 = Timestamp::from_seconds(200);
        assert!(t1 < t2);
    }

    #[test]
    fn test_timestamp_log_string() {
        let t = Timestamp::from_seconds(1_700_000_000);
        assert_eq!(t.to_log_string(), "2023-11-14 22:13:20");
        assert_eq!(t.to_string(), t.to_log_string());
    }

    #[test]
    fn test_typed_ids() {
        let device = DeviceId::new("POS-001");
        let cred = CredentialId::from("tag-1");
        assert_eq!(device.as_str(), "POS-001");
        assert_eq!(cred.to_string(), "tag-1");
        assert!(DeviceId::new("  ").is_empty());
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = DeviceId::new("POS-001");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"POS-001\"");
    }

    #[test]
    fn test_credential_new_rejects_empty_id() {
        let result = Credential::new("", "Alice", "4111222233334444", "12/27");
        assert!(matches!(result, Err(TagwardError::InvalidCredential(_))));
    }

    #[test]
    fn test_credential_issue_generates_unique_ids() {
        let a = Credential::issue("Alice", "4111222233334444", "12/27");
        let b = Credential::issue("Alice", "4111222233334444", "12/27");
        assert_ne!(a.id(), b.id());
        assert!(a.can_be_read());
    }

    #[test]
    fn test_credential_payload_is_full_field_set() {
        let cred = Credential::new("tag-1", "Alice", "4111222233334444", "12/27").unwrap();
        let payload = cred.payload();
        assert_eq!(payload.credential_id.as_str(), "tag-1");
        assert_eq!(payload.owner_name, "Alice");
        assert_eq!(payload.account_number, "4111222233334444");
        assert_eq!(payload.expiry, "12/27");
    }

    #[test]
    fn test_credential_debug_hides_account_number() {
        let cred = Credential::new("tag-1", "Alice", "4111222233334444", "12/27").unwrap();
        let dbg = format!("{:?}", cred);
        assert!(!dbg.contains("4111222233334444"));
        let dbg = format!("{:?}", cred.payload());
        assert!(!dbg.contains("4111222233334444"));
    }

    #[test]
    fn test_device_rejects_negative_range() {
        let result = ReaderDevice::new("SHADY-999", "MallFreeReader", false, -0.1);
        assert!(matches!(result, Err(TagwardError::InvalidDevice(_))));
    }

    #[test]
    fn test_device_rejects_nan_range() {
        let result = ReaderDevice::new("SHADY-999", "MallFreeReader", false, f64::NAN);
        assert!(result.is_err());
    }

    #[test]
    fn test_device_rejects_empty_id_and_name() {
        assert!(ReaderDevice::new("", "Reader", true, 1.0).is_err());
        assert!(ReaderDevice::new("R-1", " ", true, 1.0).is_err());
    }

    #[test]
    fn test_device_zero_range_is_valid() {
        let device = ReaderDevice::new("R-0", "Contact", true, 0.0).unwrap();
        assert_eq!(device.range_meters(), 0.0);
    }

    #[test]
    fn test_device_authorization_update_is_observed() {
        let device = ReaderDevice::new("POS-001", "CoffeeShopPOS", true, 0.5).unwrap();
        assert!(device.is_authorized());
        device.set_authorized(false);
        assert!(!device.is_authorized());
        device.set_authorized(true);
        assert!(device.is_authorized());
    }
}
