#![forbid(unsafe_code)]

//! Backend over persistent (structurally shared) collections.
//!
//! Maps are `im::OrdMap` and lists are `im::Vector`. Cloning a node is O(1);
//! a write copies only the path from the root to the modified entry, so
//! successive snapshots held by the store share everything else.

use im::{OrdMap, Vector};
use serde_json::{Map, Number, Value};

use super::Backend;

/// A node of the persistent state tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PersistentNode {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vector<PersistentNode>),
    Map(OrdMap<String, PersistentNode>),
}

/// Backend whose nodes are [`PersistentNode`] trees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PersistentBackend;

impl Backend for PersistentBackend {
    type Node = PersistentNode;

    const NAME: &'static str = "persistent";

    fn empty_map() -> PersistentNode {
        PersistentNode::Map(OrdMap::new())
    }

    fn from_plain(value: &Value) -> PersistentNode {
        match value {
            Value::Null => PersistentNode::Null,
            Value::Bool(b) => PersistentNode::Bool(*b),
            Value::Number(n) => PersistentNode::Number(n.clone()),
            Value::String(s) => PersistentNode::String(s.clone()),
            Value::Array(items) => {
                PersistentNode::List(items.iter().map(Self::from_plain).collect())
            }
            Value::Object(map) => PersistentNode::Map(
                map.iter()
                    .map(|(key, value)| (key.clone(), Self::from_plain(value)))
                    .collect(),
            ),
        }
    }

    fn to_plain(node: &PersistentNode) -> Value {
        match node {
            PersistentNode::Null => Value::Null,
            PersistentNode::Bool(b) => Value::Bool(*b),
            PersistentNode::Number(n) => Value::Number(n.clone()),
            PersistentNode::String(s) => Value::String(s.clone()),
            PersistentNode::List(items) => Value::Array(items.iter().map(Self::to_plain).collect()),
            PersistentNode::Map(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), Self::to_plain(value)))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

    fn get_in<'a>(node: &'a PersistentNode, path: &[&str]) -> Option<&'a PersistentNode> {
        path.iter().try_fold(node, |current, key| match current {
            PersistentNode::Map(map) => map.get(*key),
            _ => None,
        })
    }

    fn set_in(node: PersistentNode, path: &[&str], value: PersistentNode) -> PersistentNode {
        let Some((head, rest)) = path.split_first() else {
            return value;
        };
        let mut map = match node {
            PersistentNode::Map(map) => map,
            _ => OrdMap::new(),
        };
        let child = map.remove(*head).unwrap_or(PersistentNode::Null);
        map.insert((*head).to_owned(), Self::set_in(child, rest, value));
        PersistentNode::Map(map)
    }

    fn delete_in(node: PersistentNode, path: &[&str]) -> PersistentNode {
        match (node, path) {
            (node, []) => node,
            (PersistentNode::Map(mut map), [last]) => {
                map.remove(*last);
                PersistentNode::Map(map)
            }
            (PersistentNode::Map(mut map), [head, rest @ ..]) => {
                if let Some(child) = map.remove(*head) {
                    map.insert((*head).to_owned(), Self::delete_in(child, rest));
                }
                PersistentNode::Map(map)
            }
            (node, _) => node,
        }
    }

    fn merge(base: PersistentNode, overlay: &PersistentNode) -> PersistentNode {
        match (base, overlay) {
            (PersistentNode::Map(base), PersistentNode::Map(overlay)) => {
                PersistentNode::Map(overlay.clone().union(base))
            }
            (_, overlay) => overlay.clone(),
        }
    }

    fn keys(node: &PersistentNode) -> Vec<String> {
        match node {
            PersistentNode::Map(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    fn is_map(node: &PersistentNode) -> bool {
        matches!(node, PersistentNode::Map(_))
    }

    fn list(items: Vec<PersistentNode>) -> PersistentNode {
        PersistentNode::List(items.into_iter().collect())
    }

    fn is_list(node: &PersistentNode) -> bool {
        matches!(node, PersistentNode::List(_))
    }

    fn list_len(node: &PersistentNode) -> usize {
        match node {
            PersistentNode::List(items) => items.len(),
            _ => 0,
        }
    }

    fn list_items(node: &PersistentNode) -> Vec<PersistentNode> {
        match node {
            PersistentNode::List(items) => items.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    fn list_contains(list: &PersistentNode, item: &PersistentNode) -> bool {
        match list {
            PersistentNode::List(items) => items.iter().any(|existing| existing == item),
            _ => false,
        }
    }

    fn list_push(list: PersistentNode, item: PersistentNode) -> PersistentNode {
        let mut items = match list {
            PersistentNode::List(items) => items,
            _ => Vector::new(),
        };
        items.push_back(item);
        PersistentNode::List(items)
    }

    fn list_remove(list: PersistentNode, item: &PersistentNode) -> PersistentNode {
        match list {
            PersistentNode::List(items) => PersistentNode::List(
                items
                    .into_iter()
                    .filter(|existing| existing != item)
                    .collect(),
            ),
            _ => PersistentNode::List(Vector::new()),
        }
    }

    fn null() -> PersistentNode {
        PersistentNode::Null
    }

    fn bool(value: bool) -> PersistentNode {
        PersistentNode::Bool(value)
    }

    fn string(value: &str) -> PersistentNode {
        PersistentNode::String(value.to_owned())
    }

    fn as_bool(node: &PersistentNode) -> Option<bool> {
        match node {
            PersistentNode::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn as_str(node: &PersistentNode) -> Option<&str> {
        match node {
            PersistentNode::String(s) => Some(s),
            _ => None,
        }
    }

    fn is_null(node: &PersistentNode) -> bool {
        matches!(node, PersistentNode::Null)
    }
}
