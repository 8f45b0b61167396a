/*!
 * Expiring Keyspace
 *
 * The process-wide key/value map. Every key may carry a monotonic
 * expiration deadline; expiration is lazy — swept on every `get`/`set`
 * rather than on a background timer — which is sufficient to guarantee a
 * stale value is never observed, per spec.
 */

use std::time::{Duration, Instant};

use hashbrown::HashMap;

use crate::value::Value;

/// One keyspace row.
pub struct Entry {
    pub value: Value,
    pub expires_at: Option<Instant>,
}

/// `map` holds every live entry; `expiries` indexes the subset that carries
/// a deadline. Every key in `expiries` is always also a key in `map`.
#[derive(Default)]
pub struct Keyspace {
    map: HashMap<Vec<u8>, Entry, ahash::RandomState>,
    expiries: HashMap<Vec<u8>, Instant, ahash::RandomState>,
}

impl Keyspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sweeps expired keys, then looks up `key`.
    pub fn get(&mut self, key: &[u8]) -> Option<&Value> {
        self.expire_keys();
        self.map.get(key).map(|e| &e.value)
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut Value> {
        self.expire_keys();
        self.map.get_mut(key).map(|e| &mut e.value)
    }

    /// Inserts or overwrites `key`. When `expire_in` is given, it replaces
    /// any existing deadline with `now + expire_in`; when it's `None`, any
    /// existing deadline is left untouched (this mirrors the source this
    /// spec was distilled from, not stock Redis — see DESIGN.md).
    pub fn set(&mut self, key: Vec<u8>, value: Value, expire_in: Option<Duration>) {
        self.expire_keys();
        match expire_in {
            Some(duration) => {
                let deadline = Instant::now() + duration;
                self.expiries.insert(key.clone(), deadline);
                self.map.insert(
                    key,
                    Entry {
                        value,
                        expires_at: Some(deadline),
                    },
                );
            }
            None => match self.map.get_mut(&key) {
                Some(entry) => entry.value = value,
                None => {
                    self.map.insert(
                        key,
                        Entry {
                            value,
                            expires_at: None,
                        },
                    );
                }
            },
        }
    }

    /// Removes every entry whose deadline has passed.
    pub fn expire_keys(&mut self) {
        if self.expiries.is_empty() {
            return;
        }
        let now = Instant::now();
        let expired: Vec<Vec<u8>> = self
            .expiries
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.expiries.remove(&key);
            self.map.remove(&key);
        }
    }
}
