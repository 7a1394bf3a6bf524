// SPDX-License-Identifier: MIT

//! Auth/Rate-limit Gate (§4.J): PIN attempt model with per-source lockout,
//! a global circuit-breaker, opaque session tokens bound to source address,
//! and categorized token-bucket rate limits.
//!
//! Grounded on the teacher's single-mutex-per-owned-map idiom (one map per
//! entity, mutation only through this type's methods); the constant-time PIN
//! compare and OS-RNG token minting follow the CloudLLM toolkit's own
//! PIN-style comparisons (§4.J implementation note).

use std::collections::{HashMap, HashSet, VecDeque};

use axum::http::HeaderMap;
use dc_core::{Event, ErrorKind, GlobalLockdown, SessionToken, SourceRecord};
use parking_lot::Mutex;
use rand::RngCore;
use subtle::ConstantTimeEq;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Failed attempts from a single source before it is blocked outright.
const BLOCK_AFTER_FAILURES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Login,
    General,
    Strict,
    OrchestratorCreate,
}

impl Bucket {
    const fn window_ms(self) -> i64 {
        match self {
            Bucket::Login => 15 * 60 * 1000,
            Bucket::General => 60 * 1000,
            Bucket::Strict => 60 * 1000,
            Bucket::OrchestratorCreate => 60 * 1000,
        }
    }

    const fn max(self) -> usize {
        match self {
            Bucket::Login => 5,
            Bucket::General => 200,
            Bucket::Strict => 10,
            Bucket::OrchestratorCreate => 10,
        }
    }
}

/// Resolves the source address for rate-limit/lockout bookkeeping: first
/// non-empty of `cf-connecting-ip`, `x-real-ip`, the first entry of
/// `x-forwarded-for`, else the connection's remote address (§4.J).
pub fn resolve_source(headers: &HeaderMap, remote_addr: &str) -> String {
    if let Some(v) = header_str(headers, "cf-connecting-ip") {
        return v;
    }
    if let Some(v) = header_str(headers, "x-real-ip") {
        return v;
    }
    if let Some(v) = header_str(headers, "x-forwarded-for") {
        if let Some(first) = v.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    remote_addr.to_string()
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn mint_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

struct RateLimiter {
    hits: Mutex<HashMap<(Bucket, String), VecDeque<i64>>>,
}

impl RateLimiter {
    fn new() -> Self {
        Self { hits: Mutex::new(HashMap::new()) }
    }

    /// Returns `Ok(())` when under the bucket's limit, else the number of ms
    /// until the oldest hit in the window expires.
    fn check(&self, bucket: Bucket, source: &str, now_ms: i64) -> Result<(), u64> {
        let mut hits = self.hits.lock();
        let entry = hits.entry((bucket, source.to_string())).or_default();
        while let Some(&oldest) = entry.front() {
            if now_ms - oldest >= bucket.window_ms() {
                entry.pop_front();
            } else {
                break;
            }
        }
        if entry.len() >= bucket.max() {
            let retry_after = (bucket.window_ms() - (now_ms - entry[0])).max(0) as u64;
            return Err(retry_after);
        }
        entry.push_back(now_ms);
        Ok(())
    }
}

/// Guards the HTTP boundary: PIN login, token validation, source lockout,
/// global lockdown, and rate limiting (§4.J). `pin = None` disables the
/// Gate entirely (every `validate` succeeds, no rate limits apply).
pub struct Gate {
    pin: Option<String>,
    token_ttl_ms: i64,
    lockdown_threshold: u32,
    tokens: Mutex<HashMap<String, SessionToken>>,
    sources: Mutex<HashMap<String, SourceRecord>>,
    distinct_failures: Mutex<HashSet<String>>,
    lockdown: Mutex<GlobalLockdown>,
    limiter: RateLimiter,
    events: broadcast::Sender<Event>,
}

impl Gate {
    pub fn new(pin: Option<String>, token_ttl_ms: i64, lockdown_threshold: u32) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            pin,
            token_ttl_ms,
            lockdown_threshold,
            tokens: Mutex::new(HashMap::new()),
            sources: Mutex::new(HashMap::new()),
            distinct_failures: Mutex::new(HashSet::new()),
            lockdown: Mutex::new(GlobalLockdown::default()),
            limiter: RateLimiter::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn enabled(&self) -> bool {
        self.pin.is_some()
    }

    pub fn check_rate_limit(&self, bucket: Bucket, source: &str, now_ms: i64) -> Result<(), ErrorKind> {
        if !self.enabled() {
            return Ok(());
        }
        self.limiter.check(bucket, source, now_ms).map_err(|retry_after_ms| ErrorKind::RateLimited { retry_after_ms })
    }

    fn is_blocked(&self, source: &str) -> bool {
        self.sources.lock().get(source).map(|r| r.blocked).unwrap_or(false)
    }

    /// `attemptLogin(source, pin)` (§4.J).
    pub fn attempt_login(&self, source: &str, pin: &str, now_ms: i64) -> Result<SessionToken, ErrorKind> {
        let Some(configured) = &self.pin else {
            return Err(ErrorKind::Forbidden("auth gate disabled, login not accepted".into()));
        };

        if self.is_blocked(source) {
            return Err(ErrorKind::Forbidden("source blocked".into()));
        }
        if self.lockdown.lock().active {
            return Err(ErrorKind::Forbidden("global lockdown in effect".into()));
        }

        let matches: bool = configured.as_bytes().ct_eq(pin.as_bytes()).into();
        if !matches {
            let mut sources = self.sources.lock();
            let record = sources.entry(source.to_string()).or_default();
            record.failed_attempts += 1;
            let attempts_remaining = BLOCK_AFTER_FAILURES.saturating_sub(record.failed_attempts);
            let just_blocked = record.failed_attempts >= BLOCK_AFTER_FAILURES;
            if just_blocked {
                record.blocked = true;
            }
            drop(sources);

            let _ = self.events.send(Event::SecurityLoginFailed { source: source.to_string(), attempts_remaining });
            if just_blocked {
                warn!(%source, "source blocked after repeated failed logins");
                let _ = self.events.send(Event::SecurityIpBlocked { source: source.to_string() });
                let distinct = {
                    let mut failures = self.distinct_failures.lock();
                    failures.insert(source.to_string());
                    failures.len() as u32
                };
                if distinct >= self.lockdown_threshold {
                    let reason = format!("{distinct} distinct sources blocked");
                    *self.lockdown.lock() = GlobalLockdown { active: true, reason: Some(reason.clone()) };
                    warn!(%reason, "global lockdown engaged");
                    let _ = self.events.send(Event::GlobalLockdown { reason });
                }
            }
            return Err(ErrorKind::Unauthenticated(format!("incorrect pin, {attempts_remaining} attempts remaining")));
        }

        self.sources.lock().remove(source);
        let token = SessionToken { token: mint_token(), source: source.to_string(), created_at_ms: now_ms };
        self.tokens.lock().insert(token.token.clone(), token.clone());
        info!(%source, "login succeeded, token minted");
        Ok(token)
    }

    /// `validate(token, source)` (§4.J): source must match and the token
    /// must not be expired, else it is purged.
    pub fn validate(&self, token: &str, source: &str, now_ms: i64) -> Result<SessionToken, ErrorKind> {
        if !self.enabled() {
            return Ok(SessionToken { token: token.to_string(), source: source.to_string(), created_at_ms: now_ms });
        }
        let mut tokens = self.tokens.lock();
        let Some(record) = tokens.get(token).cloned() else {
            return Err(ErrorKind::Unauthenticated("token not found".into()));
        };
        if record.source != source {
            return Err(ErrorKind::Unauthenticated("token source mismatch".into()));
        }
        if record.is_expired(now_ms, self.token_ttl_ms) {
            tokens.remove(token);
            return Err(ErrorKind::Unauthenticated("token expired".into()));
        }
        Ok(record)
    }

    /// `refresh(token, source)`: re-stamps `created_at_ms`.
    pub fn refresh(&self, token: &str, source: &str, now_ms: i64) -> Result<SessionToken, ErrorKind> {
        let validated = self.validate(token, source, now_ms)?;
        let mut tokens = self.tokens.lock();
        if let Some(record) = tokens.get_mut(token) {
            record.created_at_ms = now_ms;
            return Ok(record.clone());
        }
        Ok(validated)
    }

    /// `logout(token)`.
    pub fn logout(&self, token: &str) {
        self.tokens.lock().remove(token);
    }

    pub fn blocked_count(&self) -> usize {
        self.sources.lock().values().filter(|r| r.blocked).count()
    }

    pub fn active_token_count(&self) -> usize {
        self.tokens.lock().len()
    }

    pub fn global_lockdown(&self) -> bool {
        self.lockdown.lock().active
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
