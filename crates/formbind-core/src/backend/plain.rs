#![forbid(unsafe_code)]

//! Backend over ordinary owned JSON structures.

use serde_json::{Map, Value};

use super::Backend;

/// Backend whose nodes are plain `serde_json::Value` trees.
///
/// Writes mutate the owned tree in place; a caller that needs the previous
/// snapshot keeps a deep clone (this is what the store does before every
/// reduction).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlainBackend;

impl Backend for PlainBackend {
    type Node = Value;

    const NAME: &'static str = "plain";

    fn empty_map() -> Value {
        Value::Object(Map::new())
    }

    fn from_plain(value: &Value) -> Value {
        value.clone()
    }

    fn to_plain(node: &Value) -> Value {
        node.clone()
    }

    fn get_in<'a>(node: &'a Value, path: &[&str]) -> Option<&'a Value> {
        path.iter()
            .try_fold(node, |current, key| current.as_object()?.get(*key))
    }

    fn set_in(mut node: Value, path: &[&str], value: Value) -> Value {
        set_in_place(&mut node, path, value);
        node
    }

    fn delete_in(mut node: Value, path: &[&str]) -> Value {
        delete_in_place(&mut node, path);
        node
    }

    fn merge(base: Value, overlay: &Value) -> Value {
        match (base, overlay) {
            (Value::Object(mut base), Value::Object(overlay)) => {
                for (key, value) in overlay {
                    base.insert(key.clone(), value.clone());
                }
                Value::Object(base)
            }
            (_, overlay) => overlay.clone(),
        }
    }

    fn keys(node: &Value) -> Vec<String> {
        node.as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn is_map(node: &Value) -> bool {
        node.is_object()
    }

    fn list(items: Vec<Value>) -> Value {
        Value::Array(items)
    }

    fn is_list(node: &Value) -> bool {
        node.is_array()
    }

    fn list_len(node: &Value) -> usize {
        node.as_array().map_or(0, Vec::len)
    }

    fn list_items(node: &Value) -> Vec<Value> {
        node.as_array().cloned().unwrap_or_default()
    }

    fn list_contains(list: &Value, item: &Value) -> bool {
        list.as_array().is_some_and(|items| items.contains(item))
    }

    fn list_push(list: Value, item: Value) -> Value {
        let mut items = match list {
            Value::Array(items) => items,
            _ => Vec::new(),
        };
        items.push(item);
        Value::Array(items)
    }

    fn list_remove(list: Value, item: &Value) -> Value {
        match list {
            Value::Array(mut items) => {
                items.retain(|existing| existing != item);
                Value::Array(items)
            }
            _ => Value::Array(Vec::new()),
        }
    }

    fn null() -> Value {
        Value::Null
    }

    fn bool(value: bool) -> Value {
        Value::Bool(value)
    }

    fn string(value: &str) -> Value {
        Value::String(value.to_owned())
    }

    fn as_bool(node: &Value) -> Option<bool> {
        node.as_bool()
    }

    fn as_str(node: &Value) -> Option<&str> {
        node.as_str()
    }

    fn is_null(node: &Value) -> bool {
        node.is_null()
    }
}

fn set_in_place(node: &mut Value, path: &[&str], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let slot = map.entry((*head).to_owned()).or_insert(Value::Null);
        set_in_place(slot, rest, value);
    }
}

fn delete_in_place(node: &mut Value, path: &[&str]) {
    match path {
        [] => {}
        [last] => {
            if let Value::Object(map) = node {
                map.remove(*last);
            }
        }
        [head, rest @ ..] => {
            if let Some(child) = node.as_object_mut().and_then(|map| map.get_mut(*head)) {
                delete_in_place(child, rest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    type P = PlainBackend;

    #[test]
    fn get_in_walks_nested_maps() {
        let node = json!({"forms": {"signup": {"valid": true}}});
        assert_eq!(
            P::get_in(&node, &["forms", "signup", "valid"]),
            Some(&json!(true))
        );
        assert_eq!(P::get_in(&node, &["forms", "login"]), None);
        assert_eq!(P::get_in(&node, &[]), Some(&node));
    }

    #[test]
    fn get_in_does_not_index_into_scalars() {
        let node = json!({"a": "text"});
        assert_eq!(P::get_in(&node, &["a", "b"]), None);
    }

    #[test]
    fn set_in_creates_intermediate_maps() {
        let node = P::set_in(P::empty_map(), &["a", "b", "c"], json!(1));
        assert_eq!(node, json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn set_in_replaces_scalar_on_path() {
        let node = P::set_in(json!({"a": 5}), &["a", "b"], json!("x"));
        assert_eq!(node, json!({"a": {"b": "x"}}));
    }

    #[test]
    fn delete_in_missing_path_is_noop() {
        let node = json!({"a": {"b": 1}});
        assert_eq!(P::delete_in(node.clone(), &["a", "z"]), node);
        assert_eq!(P::delete_in(node.clone(), &["q", "z"]), node);
        assert_eq!(P::delete_in(node.clone(), &["a", "b"]), json!({"a": {}}));
    }

    #[test]
    fn merge_is_shallow() {
        let base = json!({"a": {"x": 1}, "b": 2});
        let overlay = json!({"a": {"y": 2}});
        assert_eq!(P::merge(base, &overlay), json!({"a": {"y": 2}, "b": 2}));
    }

    #[test]
    fn keys_are_sorted() {
        let node = json!({"zeta": 1, "alpha": 2, "mid": 3});
        assert_eq!(P::keys(&node), vec!["alpha", "mid", "zeta"]);
        assert!(P::keys(&json!(3)).is_empty());
    }

    #[test]
    fn list_operations() {
        let list = P::list(vec![json!(1), json!(2)]);
        assert_eq!(P::list_len(&list), 2);
        assert!(P::list_contains(&list, &json!(2)));
        let list = P::list_push(list, json!(3));
        let list = P::list_remove(list, &json!(1));
        assert_eq!(list, json!([2, 3]));
        assert_eq!(P::list_push(json!("x"), json!(1)), json!([1]));
        assert_eq!(P::list_len(&json!("x")), 0);
    }
}
