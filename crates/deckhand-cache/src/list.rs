//! Targeted patches on fully loaded lists.

use std::fmt::Display;

use crate::error::CacheError;

fn missing<K: Display>(entity_label: &str, key: K) -> CacheError {
    CacheError::MissingListItem {
        entity: entity_label.to_string(),
        key: key.to_string(),
    }
}

/// Return a copy of `items` with the element sharing `item`'s key replaced.
pub fn replace_list_item_in_array<T, K, F>(
    items: &[T],
    item: T,
    get_key: F,
    entity_label: &str,
) -> Result<Vec<T>, CacheError>
where
    T: Clone,
    K: PartialEq + Display,
    F: Fn(&T) -> K,
{
    let key = get_key(&item);
    let idx = items
        .iter()
        .position(|existing| get_key(existing) == key)
        .ok_or_else(|| missing(entity_label, &key))?;
    let mut next = items.to_vec();
    next[idx] = item;
    Ok(next)
}

/// Return a copy of `items` without the element whose key is `key`.
pub fn remove_list_item_from_array<T, K, F>(
    items: &[T],
    key: &K,
    get_key: F,
    entity_label: &str,
) -> Result<Vec<T>, CacheError>
where
    T: Clone,
    K: PartialEq + Display,
    F: Fn(&T) -> K,
{
    let idx = items
        .iter()
        .position(|existing| get_key(existing) == *key)
        .ok_or_else(|| missing(entity_label, key))?;
    let mut next = items.to_vec();
    next.remove(idx);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Task {
        id: u32,
        title: &'static str,
    }

    fn tasks() -> Vec<Task> {
        vec![Task { id: 1, title: "one" }, Task { id: 2, title: "two" }]
    }

    #[test]
    fn replace_swaps_matching_item_in_place() {
        let next = replace_list_item_in_array(&tasks(), Task { id: 2, title: "TWO" }, |t| t.id, "task")
            .expect("present");
        assert_eq!(next[0].title, "one");
        assert_eq!(next[1], Task { id: 2, title: "TWO" });
    }

    #[test]
    fn remove_drops_matching_item() {
        let next = remove_list_item_from_array(&tasks(), &1, |t| t.id, "task").expect("present");
        assert_eq!(next, vec![Task { id: 2, title: "two" }]);
    }

    #[test]
    fn missing_key_names_entity_and_key() {
        let err = remove_list_item_from_array(&tasks(), &9, |t| t.id, "task").unwrap_err();
        assert_eq!(
            err,
            CacheError::MissingListItem {
                entity: "task".into(),
                key: "9".into()
            }
        );
        let msg = err.to_string();
        assert!(msg.contains("task") && msg.contains("9"), "{msg}");

        let err = replace_list_item_in_array(&tasks(), Task { id: 7, title: "x" }, |t| t.id, "task")
            .unwrap_err();
        assert!(err.to_string().contains("\"7\""));
    }
}
