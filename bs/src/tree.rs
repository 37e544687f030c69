//! Pure operations on the store's JSON tree
//!
//! The tree root is always a JSON object; interior nodes are objects and
//! leaves are arbitrary JSON values. Empty objects never persist: deletes
//! prune empty ancestors so "subtree absent" and "subtree empty" are the
//! same observable state (`Null` snapshots).

use serde_json::{Map, Value};

use crate::messages::StoreError;
use crate::path::StorePath;

/// Get a reference to the subtree at `path`, if present
pub fn get<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.segments() {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

/// Snapshot of the subtree at `path`: a clone, `Null` when absent
pub fn snapshot(root: &Value, path: &StorePath) -> Value {
    get(root, path).cloned().unwrap_or(Value::Null)
}

/// Replace the subtree at `path` with `value`, creating intermediate
/// objects as needed
///
/// Writing `Null` is a delete. Non-object ancestors are overwritten with
/// objects (last-writer-wins, matching realtime-store semantics).
pub fn set(root: &mut Value, path: &StorePath, value: Value) {
    if value.is_null() {
        delete(root, path);
        return;
    }
    if path.is_root() {
        *root = value;
        return;
    }
    let mut node = root;
    let segments = path.segments();
    for segment in &segments[..segments.len() - 1] {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = node
            .as_object_mut()
            .unwrap()
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    node.as_object_mut()
        .unwrap()
        .insert(segments[segments.len() - 1].clone(), value);
}

/// Shallow-merge `fields` into the object at `path`
///
/// Fails when nothing exists at `path`: a partial update must never
/// create a record, so a merge against a deleted subtree surfaces as
/// `NotFound` instead of resurrecting it. Fails if the existing value
/// is a non-object leaf. A `Null` field value removes that field.
pub fn merge_fields(root: &mut Value, path: &StorePath, fields: Map<String, Value>) -> Result<(), StoreError> {
    match get(root, path).map(Value::is_object) {
        Some(true) => {}
        Some(false) => return Err(StoreError::NotAnObject(path.to_string())),
        None => return Err(StoreError::NotFound(path.to_string())),
    }
    let mut node = &mut *root;
    for segment in path.segments() {
        node = node
            .as_object_mut()
            .ok_or_else(|| StoreError::NotAnObject(path.to_string()))?
            .get_mut(segment)
            .ok_or_else(|| StoreError::NotAnObject(path.to_string()))?;
    }
    let obj = node
        .as_object_mut()
        .ok_or_else(|| StoreError::NotAnObject(path.to_string()))?;
    for (key, value) in fields {
        if value.is_null() {
            obj.remove(&key);
        } else {
            obj.insert(key, value);
        }
    }
    // Merging nothing but Null removals can empty the object
    if obj.is_empty() {
        delete(root, path);
    }
    Ok(())
}

/// Delete the subtree at `path`, pruning ancestors left empty
///
/// Returns whether anything was removed.
pub fn delete(root: &mut Value, path: &StorePath) -> bool {
    if path.is_root() {
        let was_empty = root.as_object().is_none_or(Map::is_empty);
        *root = Value::Object(Map::new());
        return !was_empty;
    }
    delete_in(root, path.segments())
}

fn delete_in(node: &mut Value, segments: &[String]) -> bool {
    let Some(obj) = node.as_object_mut() else {
        return false;
    };
    if segments.len() == 1 {
        return obj.remove(&segments[0]).is_some();
    }
    let Some(child) = obj.get_mut(&segments[0]) else {
        return false;
    };
    let removed = delete_in(child, &segments[1..]);
    if removed && child.as_object().is_some_and(Map::is_empty) {
        obj.remove(&segments[0]);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> StorePath {
        StorePath::parse(s).unwrap()
    }

    #[test]
    fn test_set_and_get() {
        let mut root = json!({});
        set(&mut root, &path("presence/r1"), json!({"display_name": "Ada"}));
        assert_eq!(get(&root, &path("presence/r1/display_name")), Some(&json!("Ada")));
        assert_eq!(snapshot(&root, &path("presence")), json!({"r1": {"display_name": "Ada"}}));
    }

    #[test]
    fn test_set_replaces_subtree() {
        let mut root = json!({"a": {"b": 1, "c": 2}});
        set(&mut root, &path("a"), json!({"d": 3}));
        assert_eq!(root, json!({"a": {"d": 3}}));
    }

    #[test]
    fn test_set_null_deletes() {
        let mut root = json!({"a": {"b": 1}});
        set(&mut root, &path("a/b"), Value::Null);
        assert_eq!(snapshot(&root, &path("a")), Value::Null);
    }

    #[test]
    fn test_merge_fields_preserves_siblings() {
        let mut root = json!({"r": {"severity": "low", "note": "", "updated_at": 1}});
        let fields = json!({"severity": "high", "updated_at": 2});
        merge_fields(&mut root, &path("r"), fields.as_object().unwrap().clone()).unwrap();
        assert_eq!(root, json!({"r": {"severity": "high", "note": "", "updated_at": 2}}));
    }

    #[test]
    fn test_merge_fields_fails_when_absent() {
        let mut root = json!({});
        let fields = json!({"x": 1});
        let err = merge_fields(&mut root, &path("a/b"), fields.as_object().unwrap().clone());
        assert!(matches!(err, Err(StoreError::NotFound(_))));
        assert_eq!(root, json!({}));
    }

    #[test]
    fn test_merge_null_removals_prune_emptied_object() {
        let mut root = json!({"a": {"b": {"x": 1}}});
        let fields = json!({"x": null});
        merge_fields(&mut root, &path("a/b"), fields.as_object().unwrap().clone()).unwrap();
        assert_eq!(snapshot(&root, &path("a")), Value::Null);
    }

    #[test]
    fn test_merge_fields_rejects_leaf() {
        let mut root = json!({"a": 5});
        let fields = json!({"x": 1});
        let err = merge_fields(&mut root, &path("a"), fields.as_object().unwrap().clone());
        assert!(matches!(err, Err(StoreError::NotAnObject(_))));
    }

    #[test]
    fn test_delete_prunes_empty_ancestors() {
        let mut root = json!({"requests": {"r1": {"s1": {"note": ""}}}});
        assert!(delete(&mut root, &path("requests/r1/s1")));
        assert_eq!(root, json!({}));
        assert_eq!(snapshot(&root, &path("requests/r1")), Value::Null);
    }

    #[test]
    fn test_delete_keeps_populated_ancestors() {
        let mut root = json!({"requests": {"r1": {"s1": 1, "s2": 2}}});
        assert!(delete(&mut root, &path("requests/r1/s1")));
        assert_eq!(root, json!({"requests": {"r1": {"s2": 2}}}));
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let mut root = json!({"a": 1});
        assert!(!delete(&mut root, &path("b/c")));
        assert_eq!(root, json!({"a": 1}));
    }
}
