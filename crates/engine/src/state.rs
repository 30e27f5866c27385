//! `StateManager` — the five mutex-guarded execution-scoped substores
//! (spec.md §4.4), exposed to executors through [`nodes::StateHandle`].

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use nodes::StateHandle;

struct CacheEntry {
    value: Value,
    expires_at: Instant,
    last_used: u64,
}

pub struct StateManager {
    variables: Mutex<HashMap<String, Value>>,
    constants: Mutex<HashMap<String, Value>>,
    accumulator: Mutex<Value>,
    counter: Mutex<f64>,
    cache: Mutex<HashMap<String, CacheEntry>>,
    cache_clock: Mutex<u64>,
    max_cache_size: usize,
}

impl StateManager {
    pub fn new(max_cache_size: usize) -> Self {
        Self {
            variables: Mutex::new(HashMap::new()),
            constants: Mutex::new(HashMap::new()),
            accumulator: Mutex::new(Value::Null),
            counter: Mutex::new(0.0),
            cache: Mutex::new(HashMap::new()),
            cache_clock: Mutex::new(0),
            max_cache_size,
        }
    }

    pub fn with_constants(max_cache_size: usize, constants: HashMap<String, Value>) -> Self {
        let manager = Self::new(max_cache_size);
        *manager.constants.lock().unwrap() = constants;
        manager
    }

    /// Sweep every cache entry past its TTL. Safe to call between node
    /// executions; `cache_get` also expires lazily on read.
    pub fn clean_expired(&self) {
        let now = Instant::now();
        self.cache.lock().unwrap().retain(|_, entry| entry.expires_at > now);
    }

    fn evict_lru_if_needed(cache: &mut HashMap<String, CacheEntry>, max_size: usize) {
        while cache.len() >= max_size {
            let Some(oldest_key) = cache.iter().min_by_key(|(_, e)| e.last_used).map(|(k, _)| k.clone()) else {
                break;
            };
            cache.remove(&oldest_key);
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let now = Instant::now();
        StateSnapshot {
            variables: self.variables.lock().unwrap().clone(),
            constants: self.constants.lock().unwrap().clone(),
            accumulator: self.accumulator.lock().unwrap().clone(),
            counter: *self.counter.lock().unwrap(),
            cache: self
                .cache
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, e)| e.expires_at > now)
                .map(|(k, e)| (k.clone(), CacheSnapshotEntry { value: e.value.clone(), ttl_remaining: e.expires_at.saturating_duration_since(now) }))
                .collect(),
        }
    }

    pub fn restore(snapshot: StateSnapshot, max_cache_size: usize) -> Self {
        let manager = Self::new(max_cache_size);
        *manager.variables.lock().unwrap() = snapshot.variables;
        *manager.constants.lock().unwrap() = snapshot.constants;
        *manager.accumulator.lock().unwrap() = snapshot.accumulator;
        *manager.counter.lock().unwrap() = snapshot.counter;
        let now = Instant::now();
        let mut cache = manager.cache.lock().unwrap();
        let mut clock = manager.cache_clock.lock().unwrap();
        for (k, entry) in snapshot.cache {
            *clock += 1;
            cache.insert(k, CacheEntry { value: entry.value, expires_at: now + entry.ttl_remaining, last_used: *clock });
        }
        drop(cache);
        drop(clock);
        manager
    }
}

impl StateHandle for StateManager {
    fn get_variable(&self, name: &str) -> Option<Value> {
        self.variables.lock().unwrap().get(name).cloned()
    }

    fn set_variable(&self, name: &str, value: Value) {
        self.variables.lock().unwrap().insert(name.to_string(), value);
    }

    fn list_variables(&self) -> HashMap<String, Value> {
        self.variables.lock().unwrap().clone()
    }

    fn accumulator_get(&self) -> Value {
        self.accumulator.lock().unwrap().clone()
    }

    fn accumulator_set(&self, value: Value) {
        *self.accumulator.lock().unwrap() = value;
    }

    fn counter_get(&self) -> f64 {
        *self.counter.lock().unwrap()
    }

    fn counter_increment(&self, delta: f64) -> f64 {
        let mut c = self.counter.lock().unwrap();
        *c += delta;
        *c
    }

    fn counter_reset(&self) {
        *self.counter.lock().unwrap() = 0.0;
    }

    fn cache_get(&self, key: &str) -> Option<Value> {
        let mut cache = self.cache.lock().unwrap();
        let now = Instant::now();
        match cache.get(key) {
            Some(entry) if entry.expires_at > now => {
                let mut clock = self.cache_clock.lock().unwrap();
                *clock += 1;
                let new_tick = *clock;
                drop(clock);
                cache.get_mut(key).unwrap().last_used = new_tick;
                Some(cache.get(key).unwrap().value.clone())
            }
            Some(_) => {
                cache.remove(key);
                None
            }
            None => None,
        }
    }

    fn cache_set(&self, key: &str, value: Value, ttl: Duration) {
        let mut cache = self.cache.lock().unwrap();
        let mut clock = self.cache_clock.lock().unwrap();
        *clock += 1;
        let tick = *clock;
        if !cache.contains_key(key) {
            Self::evict_lru_if_needed(&mut cache, self.max_cache_size);
        }
        cache.insert(key.to_string(), CacheEntry { value, expires_at: Instant::now() + ttl, last_used: tick });
    }

    fn context_get_all(&self) -> HashMap<String, Value> {
        let mut merged = self.constants.lock().unwrap().clone();
        merged.extend(self.variables.lock().unwrap().clone());
        merged
    }
}

/// A losslessly round-trippable snapshot of state contents. Cache entries
/// carry their *remaining* TTL, not an absolute deadline, since `Instant`
/// cannot be serialized across a process boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub variables: HashMap<String, Value>,
    pub constants: HashMap<String, Value>,
    pub accumulator: Value,
    pub counter: f64,
    pub cache: HashMap<String, CacheSnapshotEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshotEntry {
    pub value: Value,
    pub ttl_remaining: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_roundtrip() {
        let state = StateManager::new(10);
        state.set_variable("x", Value::from(1.0));
        assert_eq!(state.get_variable("x"), Some(Value::from(1.0)));
    }

    #[test]
    fn context_union_shadows_constants_with_variables() {
        let mut constants = HashMap::new();
        constants.insert("x".to_string(), Value::from(1.0));
        let state = StateManager::with_constants(10, constants);
        state.set_variable("x", Value::from(2.0));
        assert_eq!(state.context_get_all().get("x"), Some(&Value::from(2.0)));
    }

    #[test]
    fn cache_expires_lazily() {
        let state = StateManager::new(10);
        state.cache_set("k", Value::from(1.0), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(state.cache_get("k"), None);
    }

    #[test]
    fn cache_evicts_least_recently_used_past_capacity() {
        let state = StateManager::new(2);
        state.cache_set("a", Value::from(1.0), Duration::from_secs(60));
        state.cache_set("b", Value::from(2.0), Duration::from_secs(60));
        state.cache_get("a");
        state.cache_set("c", Value::from(3.0), Duration::from_secs(60));

        assert_eq!(state.cache_get("a"), Some(Value::from(1.0)));
        assert_eq!(state.cache_get("b"), None, "b was least recently used and should be evicted");
        assert_eq!(state.cache_get("c"), Some(Value::from(3.0)));
    }

    #[test]
    fn snapshot_restore_roundtrips_variables_and_cache() {
        let state = StateManager::new(10);
        state.set_variable("x", Value::from(5.0));
        state.cache_set("k", Value::String("v".into()), Duration::from_secs(60));
        state.counter_increment(3.0);

        let snapshot = state.snapshot();
        let restored = StateManager::restore(snapshot, 10);

        assert_eq!(restored.get_variable("x"), Some(Value::from(5.0)));
        assert_eq!(restored.cache_get("k"), Some(Value::String("v".into())));
        assert_eq!(restored.counter_get(), 3.0);
    }
}
