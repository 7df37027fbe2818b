//! Normalized response cache.
//!
//! Objects carrying both `__typename` and `id` are stored once under
//! `Typename:id`; query results keep `{"__ref": "Typename:id"}` links to them.
//! Writing a response merges entity fields, so every query that references an
//! entity sees the newest copy. Watchers registered per query key are told
//! whenever their denormalized result changes.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Weak};

use bizdesk_shared::ErrorDescriptor;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::lock;

const REF_KEY: &str = "__ref";
const TYPENAME_KEY: &str = "__typename";
const MAX_DEPTH: usize = 32;

static GLOBAL: Lazy<CacheHandle> = Lazy::new(CacheHandle::new);

/// Identity of one logical query: operation name plus canonical variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new(operation: &str, variables: &Value) -> Self {
        // serde_json maps are ordered, so this string is canonical.
        Self(format!("{operation}({variables})"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn operation(&self) -> &str {
        self.0.split('(').next().unwrap_or_default()
    }
}

/// What a watcher is told about its query.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    Loading,
    Data(Value),
    Error(ErrorDescriptor),
}

/// Returns `false` once the receiving side is gone, which unregisters it.
pub type Watcher = Arc<dyn Fn(&CacheEvent) -> bool + Send + Sync>;

/// Weak handle on whatever a watcher reports into. Once it is gone the entry
/// can be dropped without waiting for an event.
pub type Liveness = Weak<dyn Any + Send + Sync>;

struct WatchEntry {
    watcher: Watcher,
    alive: Option<Liveness>,
    last: Option<Value>,
}

impl WatchEntry {
    fn is_dead(&self) -> bool {
        self.alive.as_ref().is_some_and(|alive| alive.strong_count() == 0)
    }
}

#[derive(Default)]
pub struct NormalizedCache {
    entities: HashMap<String, Map<String, Value>>,
    queries: HashMap<QueryKey, Value>,
    watchers: HashMap<QueryKey, Vec<WatchEntry>>,
}

/// Cache identity of an object, if it has one.
pub fn entity_key(object: &Map<String, Value>) -> Option<String> {
    let typename = object.get(TYPENAME_KEY)?.as_str()?;
    let id = match object.get("id")? {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(format!("{typename}:{id}"))
}

impl NormalizedCache {
    /// Drop watchers whose receiver is known to be gone.
    fn sweep(&mut self) {
        for entries in self.watchers.values_mut() {
            entries.retain(|entry| !entry.is_dead());
        }
        self.watchers.retain(|_, entries| !entries.is_empty());
    }

    fn normalize(&mut self, value: &Value, touched: &mut HashSet<String>) -> Value {
        match value {
            Value::Object(object) => {
                let mut fields = Map::new();
                for (k, v) in object {
                    fields.insert(k.clone(), self.normalize(v, touched));
                }
                match entity_key(object) {
                    Some(key) => {
                        let entry = self.entities.entry(key.clone()).or_default();
                        for (k, v) in fields {
                            entry.insert(k, v);
                        }
                        touched.insert(key.clone());
                        let mut link = Map::new();
                        link.insert(REF_KEY.to_string(), Value::String(key));
                        Value::Object(link)
                    }
                    None => Value::Object(fields),
                }
            }
            Value::Array(items) => Value::Array(items.iter().map(|v| self.normalize(v, touched)).collect()),
            other => other.clone(),
        }
    }

    /// Resolve links. `None` if any referenced entity is missing.
    fn denormalize(&self, value: &Value, depth: usize) -> Option<Value> {
        if depth > MAX_DEPTH {
            return Some(Value::Null);
        }
        match value {
            Value::Object(object) => {
                if let Some(Value::String(key)) = object.get(REF_KEY) {
                    let entity = self.entities.get(key)?;
                    let mut out = Map::new();
                    for (k, v) in entity {
                        out.insert(k.clone(), self.denormalize(v, depth + 1)?);
                    }
                    return Some(Value::Object(out));
                }
                let mut out = Map::new();
                for (k, v) in object {
                    out.insert(k.clone(), self.denormalize(v, depth + 1)?);
                }
                Some(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|v| self.denormalize(v, depth + 1))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            other => Some(other.clone()),
        }
    }

    fn read_query(&self, key: &QueryKey) -> Option<Value> {
        self.denormalize(self.queries.get(key)?, 0)
    }

    /// Collect notifications for every watched query whose result changed.
    fn pending_notifications(&mut self) -> Vec<(Watcher, CacheEvent)> {
        let keys: Vec<QueryKey> = self.watchers.keys().cloned().collect();
        let mut out = Vec::new();
        for key in keys {
            let Some(current) = self.read_query(&key) else {
                continue;
            };
            if let Some(entries) = self.watchers.get_mut(&key) {
                for entry in entries.iter_mut() {
                    if entry.last.as_ref() != Some(&current) {
                        entry.last = Some(current.clone());
                        out.push((entry.watcher.clone(), CacheEvent::Data(current.clone())));
                    }
                }
            }
        }
        out
    }
}

/// Shared handle to a cache. Clones share state; the process-wide instance is
/// [`CacheHandle::global`].
#[derive(Clone, Default)]
pub struct CacheHandle {
    inner: Arc<Mutex<NormalizedCache>>,
}

impl CacheHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> CacheHandle {
        GLOBAL.clone()
    }

    /// Store a query result and notify watchers whose results changed.
    pub fn write_query(&self, key: &QueryKey, data: &Value) {
        let notifications = {
            let mut cache = lock(&self.inner);
            let mut touched = HashSet::new();
            let normalized = cache.normalize(data, &mut touched);
            cache.queries.insert(key.clone(), normalized);
            crate::log_debug!("Cache write {} ({} entities)", key.as_str(), touched.len());
            cache.pending_notifications()
        };
        self.dispatch(notifications);
    }

    /// Merge the entities of a mutation payload without storing a query result.
    pub fn write_entities(&self, data: &Value) {
        let notifications = {
            let mut cache = lock(&self.inner);
            let mut touched = HashSet::new();
            cache.normalize(data, &mut touched);
            if touched.is_empty() {
                return;
            }
            crate::log_debug!("Cache merged {} entities", touched.len());
            cache.pending_notifications()
        };
        self.dispatch(notifications);
    }

    /// Fully resolved result for `key`, or `None` if absent or incomplete.
    pub fn read_query(&self, key: &QueryKey) -> Option<Value> {
        lock(&self.inner).read_query(key)
    }

    /// One entity by cache identity (`Typename:id`).
    pub fn read_entity(&self, key: &str) -> Option<Value> {
        let cache = lock(&self.inner);
        let entity = cache.entities.get(key)?;
        let mut link = Map::new();
        link.insert(REF_KEY.to_string(), Value::String(key.to_string()));
        cache.denormalize(&Value::Object(link), 0).filter(|_| !entity.is_empty())
    }

    /// Register a watcher for `key`. It is told about the current result (if
    /// any) on the next change only.
    pub fn watch(&self, key: &QueryKey, watcher: Watcher) {
        self.register(key, watcher, None);
    }

    /// Like [`CacheHandle::watch`], but the entry is dropped as soon as
    /// `alive` can no longer be upgraded, even if `key` never changes again.
    pub fn watch_while(&self, key: &QueryKey, watcher: Watcher, alive: Liveness) {
        self.register(key, watcher, Some(alive));
    }

    fn register(&self, key: &QueryKey, watcher: Watcher, alive: Option<Liveness>) {
        let mut cache = lock(&self.inner);
        cache.sweep();
        let last = cache.read_query(key);
        cache
            .watchers
            .entry(key.clone())
            .or_default()
            .push(WatchEntry { watcher, alive, last });
    }

    /// Send a non-data event (loading, failure) to the watchers of `key`.
    pub fn broadcast(&self, key: &QueryKey, event: CacheEvent) {
        let watchers: Vec<Watcher> = lock(&self.inner)
            .watchers
            .get(key)
            .map(|entries| entries.iter().map(|e| e.watcher.clone()).collect())
            .unwrap_or_default();
        let dead: Vec<Watcher> = watchers.into_iter().filter(|w| !w(&event)).collect();
        if !dead.is_empty() {
            self.prune(&dead);
        }
    }

    /// Drop every cached entity and result. Watchers stay registered.
    pub fn reset(&self) {
        let mut cache = lock(&self.inner);
        cache.entities.clear();
        cache.queries.clear();
        for entries in cache.watchers.values_mut() {
            for entry in entries.iter_mut() {
                entry.last = None;
            }
        }
        crate::log_info!("Cache reset");
    }

    /// Copy of the entity table, for equality checks.
    pub fn entities_snapshot(&self) -> HashMap<String, Map<String, Value>> {
        lock(&self.inner).entities.clone()
    }

    pub fn watcher_count(&self, key: &QueryKey) -> usize {
        lock(&self.inner).watchers.get(key).map(Vec::len).unwrap_or(0)
    }

    /// Number of keys with at least one registered watcher.
    pub fn watched_keys(&self) -> usize {
        lock(&self.inner).watchers.len()
    }

    /// Remove watchers whose receivers have gone away.
    fn prune(&self, dead: &[Watcher]) {
        let mut cache = lock(&self.inner);
        for entries in cache.watchers.values_mut() {
            entries.retain(|e| !dead.iter().any(|d| Arc::ptr_eq(d, &e.watcher)));
        }
        cache.watchers.retain(|_, entries| !entries.is_empty());
    }

    fn dispatch(&self, notifications: Vec<(Watcher, CacheEvent)>) {
        let dead: Vec<Watcher> = notifications
            .into_iter()
            .filter(|(watcher, event)| !watcher(event))
            .map(|(watcher, _)| watcher)
            .collect();
        if !dead.is_empty() {
            self.prune(&dead);
        }
    }
}
