use std::time::Duration;

use uuid::Uuid;
use vaultkeeper::{
    Clock,
    token::{Identity, JwtManager, TokenManager},
};

use crate::helpers::{Subject, TEST_SECRET, test_tokens};

#[test]
fn test_round_trip_preserves_identity() {
    let (tokens, _) = test_tokens();

    for subject in [
        Uuid::new_v4().to_string(),
        "plain-subject".to_string(),
        "ünïcödé".to_string(),
        String::new(),
    ] {
        let identity = Subject(subject);
        let token = tokens.issue(&identity, Duration::from_secs(60)).unwrap();
        let claims = tokens.decode(&token).unwrap();
        assert_eq!(claims.identity(), identity.identity());
    }
}

#[test]
fn test_expiry_enforced_after_lifetime() {
    let (tokens, clock) = test_tokens();
    let lifetime = Duration::from_secs(600);
    let token = tokens
        .issue(&Subject("user".to_string()), lifetime)
        .unwrap();

    clock.advance(lifetime - Duration::from_secs(1));
    assert!(tokens.decode(&token).is_ok());

    clock.advance(Duration::from_secs(1));
    assert!(tokens.decode(&token).unwrap_err().is_invalid_token());

    clock.advance(Duration::from_secs(3600));
    assert!(tokens.decode(&token).unwrap_err().is_invalid_token());
}

#[test]
fn test_claims_use_manager_clock() {
    let (tokens, clock) = test_tokens();
    let token = tokens
        .issue(&Subject("user".to_string()), Duration::from_secs(10))
        .unwrap();

    let claims = tokens.decode(&token).unwrap();
    assert_eq!(claims.iat, clock.now_secs());
    assert_eq!(claims.exp, clock.now_secs() + 10);
}

#[test]
fn test_any_single_bit_flip_is_rejected() {
    let (tokens, _) = test_tokens();
    let token = tokens
        .issue(
            &Subject(Uuid::new_v4().to_string()),
            Duration::from_secs(3600),
        )
        .unwrap();
    assert!(tokens.decode(&token).is_ok());

    let bytes = token.as_bytes();
    let mut checked = 0;
    for index in 0..bytes.len() {
        for bit in 0..8 {
            let mut mutated = bytes.to_vec();
            mutated[index] ^= 1 << bit;

            // Only mutations that still form a string can be presented.
            let Ok(mutated) = String::from_utf8(mutated) else {
                continue;
            };
            assert!(
                tokens.decode(&mutated).is_err(),
                "bit {bit} of byte {index} flipped yet token still decoded"
            );
            checked += 1;
        }
    }
    assert!(checked > bytes.len());
}

#[test]
fn test_token_from_other_key_rejected() {
    let (tokens, clock) = test_tokens();
    let other = JwtManager::with_clock(format!("{TEST_SECRET}-other"), clock).unwrap();
    let token = other
        .issue(&Subject("user".to_string()), Duration::from_secs(60))
        .unwrap();

    assert!(tokens.decode(&token).unwrap_err().is_invalid_token());
}

#[test]
fn test_validate_against_target() {
    let (tokens, _) = test_tokens();
    let alice = Subject(Uuid::new_v4().to_string());
    let bob = Subject(Uuid::new_v4().to_string());
    let token = tokens.issue(&alice, Duration::from_secs(60)).unwrap();

    tokens.validate(&token, &alice).unwrap();
    assert!(tokens.validate(&token, &bob).unwrap_err().is_invalid_token());
}
