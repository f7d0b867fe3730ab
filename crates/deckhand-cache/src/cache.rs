//! Keyed query cache with loud-failure patch operations.

use std::collections::HashMap;
use std::fmt::Display;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use deckhand_kernel::{Generation, GenerationCounter};

use crate::error::CacheError;
use crate::key::{QueryDomain, QueryKey};
use crate::list::{remove_list_item_from_array, replace_list_item_in_array};

/// Restores the value a key held before an optimistic patch.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "an optimistic patch should be rolled back if its mutation fails"]
pub struct Rollback {
    key: QueryKey,
    previous: Value,
}

impl Rollback {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Put the pre-patch value back.
    pub fn apply(self, cache: &mut QueryCache) {
        tracing::debug!(command = %self.key.command, domain = %self.key.domain, "rolling back optimistic patch");
        cache.entries.insert(self.key, self.previous);
    }
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<QueryKey, Value>,
    fetches: HashMap<QueryKey, GenerationCounter>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &QueryKey) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &QueryKey) -> Result<Option<T>, CacheError> {
        self.entries
            .get(key)
            .map(|v| decode(key, v.clone()))
            .transpose()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Populate an entry from a completed read.
    pub fn set_query_data(&mut self, key: QueryKey, data: Value) {
        self.entries.insert(key, data);
    }

    /// Drop an entry and stale any in-flight fetch for it.
    pub fn invalidate(&mut self, key: &QueryKey) {
        self.entries.remove(key);
        if let Some(counter) = self.fetches.get_mut(key) {
            counter.invalidate();
        }
    }

    /// Record that a fetch for `key` is starting. A newer fetch or an
    /// invalidation makes the returned ticket stale.
    pub fn begin_fetch(&mut self, key: &QueryKey) -> Generation {
        self.fetches.entry(key.clone()).or_default().issue()
    }

    /// Store a fetch result if its ticket is still current. Returns whether
    /// the result was applied.
    pub fn complete_fetch(&mut self, key: QueryKey, ticket: Generation, data: Value) -> bool {
        let current = self
            .fetches
            .get(&key)
            .is_some_and(|counter| counter.is_current(ticket));
        if !current {
            tracing::debug!(command = %key.command, domain = %key.domain, "discarding stale fetch result");
            return false;
        }
        self.entries.insert(key, data);
        true
    }

    fn existing_mut(&mut self, key: &QueryKey) -> Result<&mut Value, CacheError> {
        self.entries
            .get_mut(key)
            .ok_or_else(|| CacheError::MissingQuery {
                command: key.command.clone(),
                domain: key.domain,
            })
    }

    /// Overwrite an existing entry.
    pub fn replace_query_data(&mut self, key: &QueryKey, data: Value) -> Result<(), CacheError> {
        *self.existing_mut(key)? = data;
        Ok(())
    }

    /// Overwrite an existing entry and return a token restoring the prior value.
    pub fn replace_query_data_optimistically(
        &mut self,
        key: &QueryKey,
        data: Value,
    ) -> Result<Rollback, CacheError> {
        let slot = self.existing_mut(key)?;
        let previous = std::mem::replace(slot, data);
        Ok(Rollback {
            key: key.clone(),
            previous,
        })
    }

    fn cached_list<T: DeserializeOwned>(&self, key: &QueryKey) -> Result<Vec<T>, CacheError> {
        let value = self.entries.get(key).ok_or_else(|| CacheError::MissingQuery {
            command: key.command.clone(),
            domain: key.domain,
        })?;
        decode(key, value.clone())
    }

    fn patched_list<T, K, F>(
        &self,
        domain: QueryDomain,
        command: &str,
        item: T,
        get_key: F,
        entity_label: &str,
    ) -> Result<(QueryKey, Value), CacheError>
    where
        T: Clone + Serialize + DeserializeOwned,
        K: PartialEq + Display,
        F: Fn(&T) -> K,
    {
        let key = QueryKey::list(domain, command);
        let items: Vec<T> = self.cached_list(&key)?;
        let next = replace_list_item_in_array(&items, item, get_key, entity_label)?;
        let value = encode(&key, &next)?;
        Ok((key, value))
    }

    /// Replace one item of the cached list stored under `(domain, command)`.
    pub fn replace_list_item_in_query_cache<T, K, F>(
        &mut self,
        domain: QueryDomain,
        command: &str,
        item: T,
        get_key: F,
        entity_label: &str,
    ) -> Result<(), CacheError>
    where
        T: Clone + Serialize + DeserializeOwned,
        K: PartialEq + Display,
        F: Fn(&T) -> K,
    {
        let (key, value) = self.patched_list(domain, command, item, get_key, entity_label)?;
        self.entries.insert(key, value);
        Ok(())
    }

    /// Optimistic variant of [`replace_list_item_in_query_cache`](Self::replace_list_item_in_query_cache).
    pub fn replace_list_item_in_query_cache_optimistically<T, K, F>(
        &mut self,
        domain: QueryDomain,
        command: &str,
        item: T,
        get_key: F,
        entity_label: &str,
    ) -> Result<Rollback, CacheError>
    where
        T: Clone + Serialize + DeserializeOwned,
        K: PartialEq + Display,
        F: Fn(&T) -> K,
    {
        let (key, value) = self.patched_list(domain, command, item, get_key, entity_label)?;
        self.replace_query_data_optimistically(&key, value)
    }

    /// Remove one item from the cached list stored under `(domain, command)`.
    pub fn remove_list_item_from_query_cache<T, K, F>(
        &mut self,
        domain: QueryDomain,
        command: &str,
        item_key: &K,
        get_key: F,
        entity_label: &str,
    ) -> Result<(), CacheError>
    where
        T: Clone + Serialize + DeserializeOwned,
        K: PartialEq + Display,
        F: Fn(&T) -> K,
    {
        let key = QueryKey::list(domain, command);
        let items: Vec<T> = self.cached_list(&key)?;
        let next = remove_list_item_from_array(&items, item_key, get_key, entity_label)?;
        let value = encode(&key, &next)?;
        self.entries.insert(key, value);
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(key: &QueryKey, value: Value) -> Result<T, CacheError> {
    serde_json::from_value(value).map_err(|e| CacheError::Shape {
        command: key.command.clone(),
        detail: e.to_string(),
    })
}

fn encode<T: Serialize>(key: &QueryKey, value: &T) -> Result<Value, CacheError> {
    serde_json::to_value(value).map_err(|e| CacheError::Shape {
        command: key.command.clone(),
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Task {
        id: u32,
        #[serde(default)]
        title: String,
    }

    const LIST: &str = "list_tasks";

    fn seeded() -> QueryCache {
        let mut cache = QueryCache::new();
        cache.set_query_data(
            QueryKey::list(QueryDomain::Workspace, LIST),
            json!([{"id": 1}, {"id": 2}]),
        );
        cache
    }

    #[test]
    fn list_round_trip_replace_then_remove() {
        let mut cache = seeded();
        cache
            .replace_list_item_in_query_cache(
                QueryDomain::Workspace,
                LIST,
                Task { id: 2, title: "patched".into() },
                |t: &Task| t.id,
                "task",
            )
            .expect("seeded");
        cache
            .remove_list_item_from_query_cache(QueryDomain::Workspace, LIST, &1, |t: &Task| t.id, "task")
            .expect("seeded");

        let key = QueryKey::list(QueryDomain::Workspace, LIST);
        assert_eq!(cache.get(&key), Some(&json!([{"id": 2, "title": "patched"}])));
    }

    #[test]
    fn patching_unseeded_cache_names_command_and_domain() {
        let mut cache = QueryCache::new();
        let key = QueryKey::new(QueryDomain::App, "get_task", Some(&json!({"id": 1})));
        let err = cache.replace_query_data(&key, json!({})).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("get_task") && msg.contains("app"), "{msg}");

        let err = cache
            .remove_list_item_from_query_cache(QueryDomain::Workspace, LIST, &1, |t: &Task| t.id, "task")
            .unwrap_err();
        assert_eq!(
            err,
            CacheError::MissingQuery {
                command: LIST.into(),
                domain: QueryDomain::Workspace
            }
        );
        assert!(cache.replace_query_data_optimistically(&key, json!(1)).is_err());
        assert!(!cache.contains(&key));
    }

    #[test]
    fn other_domain_is_not_patched() {
        let mut cache = seeded();
        let err = cache
            .replace_list_item_in_query_cache(
                QueryDomain::App,
                LIST,
                Task { id: 1, title: String::new() },
                |t: &Task| t.id,
                "task",
            )
            .unwrap_err();
        assert!(matches!(err, CacheError::MissingQuery { domain: QueryDomain::App, .. }));
    }

    #[test]
    fn missing_list_item_is_loud() {
        let mut cache = seeded();
        let err = cache
            .remove_list_item_from_query_cache(QueryDomain::Workspace, LIST, &5, |t: &Task| t.id, "task")
            .unwrap_err();
        assert!(err.to_string().contains("task"));
    }

    #[test]
    fn optimistic_rollback_restores_exact_value() {
        let mut cache = QueryCache::new();
        let key = QueryKey::new(QueryDomain::App, "get_task", Some(&json!({"id": 1})));
        let original = json!({"id": 1, "title": "draft", "tags": ["a", "b"], "due": null});
        cache.set_query_data(key.clone(), original.clone());

        let rollback = cache
            .replace_query_data_optimistically(&key, json!({"id": 1, "title": "final"}))
            .expect("seeded");
        assert_eq!(cache.get(&key), Some(&json!({"id": 1, "title": "final"})));

        rollback.apply(&mut cache);
        assert_eq!(cache.get(&key), Some(&original));
        assert_eq!(
            serde_json::to_vec(cache.get(&key).expect("present")).expect("encode"),
            serde_json::to_vec(&original).expect("encode")
        );
    }

    #[test]
    fn optimistic_list_patch_rolls_back() {
        let mut cache = seeded();
        let key = QueryKey::list(QueryDomain::Workspace, LIST);
        let before = cache.get(&key).cloned();
        let rollback = cache
            .replace_list_item_in_query_cache_optimistically(
                QueryDomain::Workspace,
                LIST,
                Task { id: 1, title: "renamed".into() },
                |t: &Task| t.id,
                "task",
            )
            .expect("seeded");
        assert_ne!(cache.get(&key).cloned(), before);
        rollback.apply(&mut cache);
        assert_eq!(cache.get(&key).cloned(), before);
    }

    #[test]
    fn stale_fetch_results_are_discarded() {
        let mut cache = QueryCache::new();
        let key = QueryKey::list(QueryDomain::Workspace, LIST);
        let first = cache.begin_fetch(&key);
        let second = cache.begin_fetch(&key);

        assert!(!cache.complete_fetch(key.clone(), first, json!(["old"])));
        assert!(!cache.contains(&key));
        assert!(cache.complete_fetch(key.clone(), second, json!(["new"])));
        assert_eq!(cache.get(&key), Some(&json!(["new"])));

        let third = cache.begin_fetch(&key);
        cache.invalidate(&key);
        assert!(!cache.complete_fetch(key.clone(), third, json!(["late"])));
        assert!(!cache.contains(&key));
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let mut cache = QueryCache::new();
        cache.set_query_data(QueryKey::list(QueryDomain::Workspace, LIST), json!({"not": "a list"}));
        let err = cache
            .remove_list_item_from_query_cache(QueryDomain::Workspace, LIST, &1, |t: &Task| t.id, "task")
            .unwrap_err();
        assert!(matches!(err, CacheError::Shape { .. }));
    }
}
