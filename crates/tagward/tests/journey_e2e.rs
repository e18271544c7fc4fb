//! End-to-end journeys through the read shield.
//!
//! Journey 1: Whitelisted terminal at the counter
//! Journey 2: Skimming attempt by an unauthorized long-range reader
//! Journey 3: Card held just out of range
//! Journey 4: Strict policy blocks instead of redacting
//! Journey 5: Silenced tag

use tagward::{initialize, AttemptOutcome, CredentialConfig, RootConfig, ShieldState};
use tagward_core::{CredentialId, DeviceId};
use tagward_policy::Action;

fn demo_state() -> (ShieldState, CredentialId, CredentialId) {
    let config = RootConfig::demo();
    let alice = CredentialId::new(config.credentials[0].id.clone().unwrap());
    let bob = CredentialId::new(config.credentials[1].id.clone().unwrap());
    (initialize(config).unwrap(), alice, bob)
}

fn pos() -> DeviceId {
    DeviceId::new("POS-001")
}

fn shady() -> DeviceId {
    DeviceId::new("SHADY-999")
}

// ============================================================================
// Journey 1: Whitelisted terminal
// ============================================================================

#[test]
fn test_journey_whitelisted_terminal_gets_full_payload() {
    let (state, alice, _) = demo_state();

    let outcome = state.process_attempt(&pos(), &alice, 0.4).unwrap();
    let AttemptOutcome::Delivered { action, payload } = outcome else {
        panic!("expected delivery");
    };
    assert_eq!(action, Action::AllowedWhitelist);
    assert_eq!(payload.owner_name, "Alice");
    assert_eq!(payload.account_number, "4111222233334444");
    assert_eq!(payload.expiry, "12/27");
    assert_eq!(payload.credential_id, alice);

    let events = state.audit_log.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].was_whitelisted);
    assert!(events[0].alert_message.is_none());
    assert_eq!(events[0].device_name, "CoffeeShopPOS");
}

#[test]
fn test_journey_exact_range_boundary_is_readable() {
    let (state, alice, _) = demo_state();
    let outcome = state.process_attempt(&pos(), &alice, 0.5).unwrap();
    assert_eq!(outcome.action(), Some(Action::AllowedWhitelist));
}

// ============================================================================
// Journey 2: Skimming attempt
// ============================================================================

#[test]
fn test_journey_unauthorized_reader_gets_redacted_payload() {
    let (state, alice, _) = demo_state();

    let outcome = state.process_attempt(&shady(), &alice, 1.0).unwrap();
    let payload = outcome.payload().expect("redacted payload delivered");
    assert_eq!(outcome.action(), Some(Action::RedactedPartial));
    assert_eq!(payload.owner_name, "[REDACTED]");
    assert_eq!(payload.account_number, "XXXX-XXXX-XXXX-4444");
    assert_eq!(payload.expiry, "12/27");
    assert_eq!(payload.credential_id, alice);

    let events = state.audit_log.events();
    assert_eq!(events.len(), 1);
    assert!(!events[0].device_authorized);
    assert!(!events[0].was_whitelisted);
    assert_eq!(
        events[0].alert_message.as_deref(),
        Some("Unauthorized read attempt by MallFreeReader")
    );

    let rendered = state.audit_log.render();
    assert!(rendered.contains("Device:MallFreeReader (SHADY-999)"));
    assert!(rendered.contains("Action:redacted_partial"));
    assert!(rendered.contains(&format!("Credential:{}", alice)));
    assert!(rendered.ends_with("  ALERT: Unauthorized read attempt by MallFreeReader"));
    assert!(!rendered.contains("4111222233334444"));
}

#[test]
fn test_journey_full_demo_script() {
    let (state, _, bob) = demo_state();
    let results = state.run_scripted_attempts().unwrap();
    assert_eq!(results.len(), 4);

    // Third attempt: Bob's card at 0.3m from the shady reader
    let (attempt, outcome) = &results[2];
    assert_eq!(attempt.credential_id, bob.as_str());
    assert_eq!(outcome.payload().unwrap().account_number, "XXXX-XXXX-XXXX-2233");

    let events = state.audit_log.events();
    let actions: Vec<Action> = events.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            Action::AllowedWhitelist,
            Action::RedactedPartial,
            Action::RedactedPartial
        ]
    );
    assert!(state.audit_log.verify_chain().is_ok());
}

// ============================================================================
// Journey 3: Out of range
// ============================================================================

#[test]
fn test_journey_out_of_range_is_not_audited() {
    let (state, _, bob) = demo_state();
    let outcome = state.process_attempt(&pos(), &bob, 0.6).unwrap();
    assert!(matches!(outcome, AttemptOutcome::NoSignal));
    assert!(state.audit_log.is_empty());
}

// ============================================================================
// Journey 4: Strict policy
// ============================================================================

#[test]
fn test_journey_strict_policy_blocks_unauthorized() {
    let mut config = RootConfig::demo();
    config.policy.redact_on_unauthorized = false;
    config.policy.alert_on_unauthorized = false;
    let alice = CredentialId::new(config.credentials[0].id.clone().unwrap());
    let state = initialize(config).unwrap();

    let outcome = state.process_attempt(&shady(), &alice, 1.0).unwrap();
    assert!(matches!(
        outcome,
        AttemptOutcome::Blocked {
            action: Action::BlockedNoData
        }
    ));

    let events = state.audit_log.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].alert_message.is_none());
}

#[test]
fn test_journey_authorized_but_not_whitelisted() {
    let (state, alice, _) = demo_state();
    state.set_device_authorization(&shady(), true).unwrap();

    let outcome = state.process_attempt(&shady(), &alice, 2.0).unwrap();
    assert_eq!(outcome.action(), Some(Action::AllowedAuthorized));
    assert_eq!(outcome.payload().unwrap().account_number, "4111222233334444");
}

#[test]
fn test_journey_whitelist_ignores_authorization_flag() {
    let (state, alice, _) = demo_state();
    state.set_device_authorization(&pos(), false).unwrap();

    let outcome = state.process_attempt(&pos(), &alice, 0.1).unwrap();
    assert_eq!(outcome.action(), Some(Action::AllowedWhitelist));
    assert!(!state.audit_log.events()[0].device_authorized);
}

// ============================================================================
// Journey 5: Silenced tag
// ============================================================================

#[test]
fn test_journey_silenced_tag_is_never_read() {
    let mut config = RootConfig::demo();
    config.credentials.push(CredentialConfig {
        id: Some("tag-shielded".into()),
        owner_name: "Carol".into(),
        account_number: "6011000099998888".into(),
        expiry: "01/28".into(),
        can_be_read: false,
    });
    let state = initialize(config).unwrap();
    let carol = CredentialId::new("tag-shielded");

    assert!(matches!(
        state.process_attempt(&pos(), &carol, 0.1).unwrap(),
        AttemptOutcome::NoSignal
    ));
    assert!(matches!(
        state.process_attempt(&shady(), &carol, 0.1).unwrap(),
        AttemptOutcome::NoSignal
    ));
    assert!(state.audit_log.is_empty());
}
