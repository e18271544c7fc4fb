//! Physical-read evaluation: can this reader hear this tag at all?
//!
//! A miss here is the absence of a signal, not a policy decision, so nothing
//! is audited at this stage.

use crate::types::{Credential, RawPayload, ReaderDevice};

/// Attempt a physical read of `credential` by `device` at `distance_m` meters.
///
/// Returns the full unredacted payload when `0 <= distance_m <= range` and
/// the tag has not been silenced, `None` otherwise.
pub fn attempt_read(
    device: &ReaderDevice,
    credential: &Credential,
    distance_m: f64,
) -> Option<RawPayload> {
    // NaN fails both comparisons and counts as out of range.
    let in_range = distance_m >= 0.0 && distance_m <= device.range_meters();
    if !in_range || !credential.can_be_read() {
        return None;
    }
    Some(credential.payload())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> ReaderDevice {
        ReaderDevice::new("POS-001", "CoffeeShopPOS", true, 0.5).unwrap()
    }

    fn alice() -> Credential {
        Credential::new("tag-alice", "Alice", "4111222233334444", "12/27").unwrap()
    }

    #[test]
    fn test_read_within_range() {
        let payload = attempt_read(&pos(), &alice(), 0.4).unwrap();
        assert_eq!(payload, alice().payload());
    }

    #[test]
    fn test_read_at_exact_range_boundary() {
        assert!(attempt_read(&pos(), &alice(), 0.5).is_some());
    }

    #[test]
    fn test_read_out_of_range() {
        assert!(attempt_read(&pos(), &alice(), 0.6).is_none());
    }

    #[test]
    fn test_read_silenced_tag() {
        let silent = alice().with_readable(false);
        assert!(attempt_read(&pos(), &silent, 0.1).is_none());
    }

    #[test]
    fn test_read_nan_distance_is_no_signal() {
        assert!(attempt_read(&pos(), &alice(), f64::NAN).is_none());
    }

    #[test]
    fn test_read_negative_distance_is_no_signal() {
        assert!(attempt_read(&pos(), &alice(), -1.0).is_none());
        assert!(attempt_read(&pos(), &alice(), f64::NEG_INFINITY).is_none());
    }

    #[test]
    fn test_read_ignores_authorization() {
        let device = pos();
        device.set_authorized(false);
        assert!(attempt_read(&device, &alice(), 0.2).is_some());
    }
}
