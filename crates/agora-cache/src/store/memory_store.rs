//! In-process cache store.
//!
//! Honours the [`CacheStore`] contract against a map guarded by a mutex.
//! Expiry is evaluated lazily against `tokio::time::Instant`, so paused-clock
//! tests can move past a TTL with `tokio::time::advance`.

use super::{CacheStore, Pipeline, ScanPage, StoreOp};
use crate::{CacheError, CacheResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use shaku::Component;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;

/// How long an unfinished scan cursor may sit unused before it is dropped.
const CURSOR_IDLE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    unavailable: bool,
    /// Scan pages served successfully before injected failures begin.
    scan_fail_after: Option<usize>,
    /// Number of injected scan failures still to serve.
    scan_failures_left: usize,
    scan_pages_served: usize,
    /// Open cursors, each resuming after the stored key.
    cursors: HashMap<u64, OpenCursor>,
    next_cursor: u64,
    pipelines_executed: usize,
}

#[derive(Debug)]
struct OpenCursor {
    resume_after: String,
    issued_at: Instant,
}

impl State {
    fn check_available(&self) -> CacheResult<()> {
        if self.unavailable {
            Err(CacheError::unavailable("memory store marked unavailable"))
        } else {
            Ok(())
        }
    }

    fn live(&self, key: &str, now: Instant) -> Option<&Entry> {
        self.entries.get(key).filter(|entry| entry.is_live(now))
    }

    fn set(&mut self, key: String, value: String, ttl: Duration, now: Instant) {
        self.prune_expired(now);
        let ttl = Duration::from_secs(super::ttl_secs(ttl));
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    fn prune_expired(&mut self, now: Instant) {
        self.entries.retain(|_, entry| entry.is_live(now));
    }

    fn prune_idle_cursors(&mut self, now: Instant) {
        self.cursors
            .retain(|_, cursor| now.saturating_duration_since(cursor.issued_at) < CURSOR_IDLE);
    }

    fn delete(&mut self, keys: &[String], now: Instant) -> u64 {
        keys.iter()
            .filter_map(|key| self.entries.remove(key))
            .filter(|entry| entry.is_live(now))
            .count() as u64
    }
}

/// In-memory cache store.
#[derive(Component, Default)]
#[shaku(interface = CacheStore)]
pub struct MemoryCacheStore {
    #[shaku(default)]
    state: Mutex<State>,
}

impl MemoryCacheStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as unavailable, or recover.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Serve `after` scan pages normally, then fail the next `times` scan calls.
    pub fn fail_scan_pages(&self, after: usize, times: usize) {
        let mut state = self.state.lock();
        state.scan_fail_after = Some(state.scan_pages_served + after);
        state.scan_failures_left = times;
    }

    /// Returns true if a live entry exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().live(key, Instant::now()).is_some()
    }

    /// Returns the raw value for `key`, bypassing availability checks.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<String> {
        self.state
            .lock()
            .live(key, Instant::now())
            .map(|entry| entry.value.clone())
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.state.lock().entries.values().filter(|e| e.is_live(now)).count()
    }

    /// Returns true if no live entries exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live keys in lexical order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.state
            .lock()
            .entries
            .iter()
            .filter(|(_, e)| e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Remaining time to live for `key`.
    #[must_use]
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.state
            .lock()
            .live(key, now)
            .map(|entry| entry.expires_at.saturating_duration_since(now))
    }

    /// Number of entries held, expired or not, and of open scan cursors.
    #[cfg(test)]
    fn footprint(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.entries.len(), state.cursors.len())
    }

    /// Number of pipelines executed so far.
    #[must_use]
    pub fn pipelines_executed(&self) -> usize {
        self.state.lock().pipelines_executed
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let state = self.state.lock();
        state.check_available()?;
        Ok(state.live(key, Instant::now()).map(|entry| entry.value.clone()))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut state = self.state.lock();
        state.check_available()?;
        state.set(key.to_string(), value.to_string(), ttl, Instant::now());
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        let mut state = self.state.lock();
        state.check_available()?;
        Ok(state.delete(keys, Instant::now()))
    }

    async fn scan_page(&self, pattern: &str, cursor: u64, count: usize) -> CacheResult<ScanPage> {
        let mut state = self.state.lock();
        state.check_available()?;

        if let Some(after) = state.scan_fail_after {
            if state.scan_pages_served >= after && state.scan_failures_left > 0 {
                state.scan_failures_left -= 1;
                return Err(CacheError::unavailable("injected scan failure"));
            }
        }

        let now = Instant::now();
        let resume_after = if cursor == 0 {
            // A fresh walk: drop what abandoned walks and expired keys left behind.
            state.prune_idle_cursors(now);
            state.prune_expired(now);
            None
        } else {
            match state.cursors.remove(&cursor) {
                Some(open) => Some(open.resume_after),
                None => return Err(CacheError::unavailable(format!("unknown scan cursor {}", cursor))),
            }
        };

        // Each call examines up to `count` keys, matching or not, like Redis.
        let mut examined = Vec::with_capacity(count.max(1));
        let range = match &resume_after {
            Some(last) => state
                .entries
                .range::<String, _>((std::ops::Bound::Excluded(last), std::ops::Bound::Unbounded)),
            None => state.entries.range::<String, _>(..),
        };
        for (key, entry) in range.take(count.max(1)) {
            examined.push((key.clone(), entry.is_live(now)));
        }

        let last_examined = examined.last().map(|(key, _)| key.clone());
        let more = match &last_examined {
            Some(last) => state
                .entries
                .range::<String, _>((std::ops::Bound::Excluded(last), std::ops::Bound::Unbounded))
                .next()
                .is_some(),
            None => false,
        };

        let keys = examined
            .into_iter()
            .filter(|(key, live)| *live && glob_match(pattern, key))
            .map(|(key, _)| key)
            .collect();

        let next_cursor = match (more, last_examined) {
            (true, Some(last)) => {
                state.next_cursor += 1;
                let id = state.next_cursor;
                state.cursors.insert(
                    id,
                    OpenCursor {
                        resume_after: last,
                        issued_at: now,
                    },
                );
                id
            }
            _ => 0,
        };

        state.scan_pages_served += 1;
        Ok(ScanPage {
            cursor: next_cursor,
            keys,
        })
    }

    async fn execute(&self, pipeline: Pipeline) -> CacheResult<()> {
        let mut state = self.state.lock();
        state.check_available()?;

        let now = Instant::now();
        for op in pipeline.into_ops() {
            match op {
                StoreOp::Set { key, value, ttl } => state.set(key, value, ttl, now),
                StoreOp::Delete { keys } => {
                    state.delete(&keys, now);
                }
            }
        }
        state.pipelines_executed += 1;
        Ok(())
    }
}

/// Redis-style glob match supporting `*` and `?`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some('?') => {
                p += 1;
                t += 1;
            }
            Some(c) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
