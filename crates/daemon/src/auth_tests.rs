use super::*;

fn gate() -> Gate {
    Gate::new(Some("123456".to_string()), 3_600_000, 10)
}

#[test]
fn correct_pin_mints_source_bound_token() {
    let gate = gate();
    let token = gate.attempt_login("1.1.1.1", "123456", 0).unwrap();
    assert_eq!(token.source, "1.1.1.1");
    assert_eq!(token.token.len(), 64);
    assert!(gate.validate(&token.token, "1.1.1.1", 1_000).is_ok());
}

#[test]
fn token_rejected_from_different_source() {
    let gate = gate();
    let token = gate.attempt_login("1.1.1.1", "123456", 0).unwrap();
    assert!(gate.validate(&token.token, "2.2.2.2", 1_000).is_err());
}

#[test]
fn token_expires_after_ttl() {
    let gate = Gate::new(Some("123456".to_string()), 1_000, 10);
    let token = gate.attempt_login("1.1.1.1", "123456", 0).unwrap();
    assert!(gate.validate(&token.token, "1.1.1.1", 500).is_ok());
    assert!(gate.validate(&token.token, "1.1.1.1", 2_000).is_err());
}

#[test]
fn three_failed_attempts_block_the_source() {
    let gate = gate();
    assert!(gate.attempt_login("1.1.1.1", "000000", 0).is_err());
    assert!(gate.attempt_login("1.1.1.1", "000000", 1).is_err());
    assert!(gate.attempt_login("1.1.1.1", "000000", 2).is_err());
    assert_eq!(gate.blocked_count(), 1);
    let err = gate.attempt_login("1.1.1.1", "123456", 3).unwrap_err();
    assert!(matches!(err, ErrorKind::Forbidden(_)));
}

#[test]
fn distinct_blocked_sources_trigger_global_lockdown() {
    let gate = Gate::new(Some("123456".to_string()), 3_600_000, 2);
    for source in ["1.1.1.1", "2.2.2.2"] {
        for attempt in 0..3 {
            let _ = gate.attempt_login(source, "000000", attempt);
        }
    }
    assert!(gate.global_lockdown());
}

#[test]
fn logout_invalidates_token() {
    let gate = gate();
    let token = gate.attempt_login("1.1.1.1", "123456", 0).unwrap();
    gate.logout(&token.token);
    assert!(gate.validate(&token.token, "1.1.1.1", 1).is_err());
}

#[test]
fn disabled_gate_accepts_every_token() {
    let gate = Gate::new(None, 3_600_000, 10);
    assert!(gate.validate("anything", "1.1.1.1", 0).is_ok());
    assert!(gate.attempt_login("1.1.1.1", "000000", 0).is_err());
}

#[test]
fn rate_limit_trips_after_bucket_max() {
    let gate = gate();
    for i in 0..5 {
        assert!(gate.check_rate_limit(Bucket::Login, "1.1.1.1", i).is_ok());
    }
    let err = gate.check_rate_limit(Bucket::Login, "1.1.1.1", 5).unwrap_err();
    assert!(matches!(err, ErrorKind::RateLimited { .. }));
}

#[test]
fn resolves_source_from_header_priority_chain() {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", "9.9.9.9, 8.8.8.8".parse().unwrap());
    assert_eq!(resolve_source(&headers, "127.0.0.1"), "9.9.9.9");

    headers.insert("x-real-ip", "7.7.7.7".parse().unwrap());
    assert_eq!(resolve_source(&headers, "127.0.0.1"), "7.7.7.7");

    headers.insert("cf-connecting-ip", "6.6.6.6".parse().unwrap());
    assert_eq!(resolve_source(&headers, "127.0.0.1"), "6.6.6.6");
}

#[test]
fn falls_back_to_remote_addr_with_no_headers() {
    let headers = HeaderMap::new();
    assert_eq!(resolve_source(&headers, "127.0.0.1"), "127.0.0.1");
}
