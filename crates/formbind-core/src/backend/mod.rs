#![forbid(unsafe_code)]

//! Data-access capability set.
//!
//! Every piece of form logic is written against [`Backend`], a fixed set of
//! structural operations over an opaque [`Backend::Node`] tree. Two
//! implementations exist and are chosen once, at wiring time, through a
//! generic parameter:
//!
//! - [`PlainBackend`]: ordinary owned structures (`serde_json::Value`).
//!   Snapshots are taken by deep clone.
//! - [`PersistentBackend`] (feature `persistent`): `im` persistent maps and
//!   vectors with structural sharing, so snapshots are O(1).
//!
//! # Invariants
//!
//! 1. Both backends enumerate map keys in ascending order.
//! 2. `get_in` on a path that does not resolve returns `None`. There is no
//!    implicit default; callers choose one explicitly.
//! 3. `set_in` creates intermediate maps as needed, replacing any non-map node
//!    found along the path.
//! 4. `delete_in` and the list operations never fail: a missing path leaves
//!    the node unchanged, and a non-list node behaves as an empty list.
//! 5. `from_plain(to_plain(n)) == n` for every node.

mod plain;
#[cfg(feature = "persistent")]
mod persistent;

pub use plain::PlainBackend;
#[cfg(feature = "persistent")]
pub use persistent::{PersistentBackend, PersistentNode};

use core::fmt;

use serde_json::Value;

/// Structural operations the form core needs from a data representation.
///
/// All operations are associated functions: a backend is a type-level choice,
/// never a runtime value. Mutating operations take the node by value and
/// return the updated node, which lets the plain backend reuse the allocation
/// and the persistent backend share structure.
pub trait Backend: 'static {
    /// A node in the state tree (map, list or scalar).
    type Node: Clone + fmt::Debug + PartialEq + 'static;

    /// Human-readable backend name, used in logs and test output.
    const NAME: &'static str;

    /// An empty map node.
    fn empty_map() -> Self::Node;

    /// Materialize a plain value as a node.
    fn from_plain(value: &Value) -> Self::Node;

    /// Materialize a node as a plain value.
    fn to_plain(node: &Self::Node) -> Value;

    /// Read the node at `path`.
    fn get_in<'a>(node: &'a Self::Node, path: &[&str]) -> Option<&'a Self::Node>;

    /// Write `value` at `path`, creating intermediate maps.
    fn set_in(node: Self::Node, path: &[&str], value: Self::Node) -> Self::Node;

    /// Remove the entry at `path`, if present.
    fn delete_in(node: Self::Node, path: &[&str]) -> Self::Node;

    /// Whether `path` resolves to a node.
    fn has_in(node: &Self::Node, path: &[&str]) -> bool {
        Self::get_in(node, path).is_some()
    }

    /// Shallow merge: every top-level entry of `overlay` replaces the entry of
    /// the same key in `base`. A non-map on either side yields `overlay`.
    fn merge(base: Self::Node, overlay: &Self::Node) -> Self::Node;

    /// Keys of a map node in ascending order; empty for non-maps.
    fn keys(node: &Self::Node) -> Vec<String>;

    /// Whether the node is a map.
    fn is_map(node: &Self::Node) -> bool;

    /// Build a list node.
    fn list(items: Vec<Self::Node>) -> Self::Node;

    /// Whether the node is a list.
    fn is_list(node: &Self::Node) -> bool;

    /// Number of list elements; zero for non-lists.
    fn list_len(node: &Self::Node) -> usize;

    /// Clone out the list elements; empty for non-lists.
    fn list_items(node: &Self::Node) -> Vec<Self::Node>;

    /// Whether `list` contains an element equal to `item`.
    fn list_contains(list: &Self::Node, item: &Self::Node) -> bool;

    /// Append `item` to `list`.
    fn list_push(list: Self::Node, item: Self::Node) -> Self::Node;

    /// Remove every element equal to `item` from `list`.
    fn list_remove(list: Self::Node, item: &Self::Node) -> Self::Node;

    /// Structural equality.
    fn deep_equal(a: &Self::Node, b: &Self::Node) -> bool {
        a == b
    }

    /// The null scalar.
    fn null() -> Self::Node;

    /// A boolean scalar.
    fn bool(value: bool) -> Self::Node;

    /// A string scalar.
    fn string(value: &str) -> Self::Node;

    /// Read a boolean scalar.
    fn as_bool(node: &Self::Node) -> Option<bool>;

    /// Read a string scalar.
    fn as_str(node: &Self::Node) -> Option<&str>;

    /// Whether the node is null.
    fn is_null(node: &Self::Node) -> bool;
}

/// Read a boolean at `path`, falling back to `default` when the path is
/// missing or not a boolean.
pub fn get_bool<B: Backend>(node: &B::Node, path: &[&str], default: bool) -> bool {
    B::get_in(node, path).and_then(B::as_bool).unwrap_or(default)
}

/// Whether a node counts as "no value" for collection coercion: null or the
/// empty string.
pub fn is_blank<B: Backend>(node: &B::Node) -> bool {
    B::is_null(node) || B::as_str(node).is_some_and(str::is_empty)
}

/// Coerce a node into a collection.
///
/// Lists are returned as-is, blank scalars become the empty list and any other
/// scalar becomes a singleton list.
pub fn into_collection<B: Backend>(node: &B::Node) -> B::Node {
    if B::is_list(node) {
        node.clone()
    } else if is_blank::<B>(node) {
        B::list(Vec::new())
    } else {
        B::list(vec![node.clone()])
    }
}
