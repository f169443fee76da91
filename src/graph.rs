//! Arena storage for loaded documents.
//!
//! Every node of every cached document lives in one [`Graph`]. Composite
//! nodes hold [`NodeId`]s of their children instead of owning them, so a
//! reference marker can be resolved by turning its slot into an alias: every
//! holder of that id then observes the target value, and the graph may share
//! substructure or contain cycles.

use std::collections::HashSet;

use serde_json::{Map, Number, Value};
use url::Url;

use crate::error::{DocsError, Result};
use crate::types::DEFAULT_REF_PROP;

/// Index of a slot in a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A value stored in the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<NodeId>),
    /// Fields in document order.
    Object(Vec<(String, NodeId)>),
    /// Unresolved reference marker holding its absolute target URI.
    Ref(Url),
}

impl Node {
    pub fn is_composite(&self) -> bool {
        matches!(self, Node::Array(_) | Node::Object(_))
    }

    /// Looks up an object field by name.
    pub fn field(&self, key: &str) -> Option<NodeId> {
        match self {
            Node::Object(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, id)| *id),
            _ => None,
        }
    }

    /// Child ids of a composite node, in order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Node::Array(items) => items.clone(),
            Node::Object(fields) => fields.iter().map(|(_, id)| *id).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Node(Node),
    Alias(NodeId),
}

/// Arena of nodes shared by all documents of one cache.
#[derive(Debug, Default)]
pub struct Graph {
    slots: Vec<Slot>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots, aliases included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drops every node. Ids handed out before the call are dangling
    /// afterwards: looking them up panics, or designates a node stored later.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Drops every slot allocated at or after `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.slots.truncate(len);
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.slots.push(Slot::Node(node));
        NodeId(self.slots.len() - 1)
    }

    /// Stores a decoded value, returning the id of its root.
    pub fn import(&mut self, value: Value) -> NodeId {
        let node = match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(n),
            Value::String(s) => Node::String(s),
            Value::Array(items) => {
                Node::Array(items.into_iter().map(|item| self.import(item)).collect())
            }
            Value::Object(map) => Node::Object(
                map.into_iter()
                    .map(|(key, value)| (key, self.import(value)))
                    .collect(),
            ),
        };
        self.alloc(node)
    }

    /// Follows alias links to the slot that actually holds a node.
    pub fn resolve(&self, mut id: NodeId) -> NodeId {
        while let Slot::Alias(next) = self.slots[id.0] {
            id = next;
        }
        id
    }

    /// The node a location designates.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this graph (for example after `clear`).
    pub fn node(&self, id: NodeId) -> &Node {
        match &self.slots[self.resolve(id).0] {
            Slot::Node(node) => node,
            Slot::Alias(_) => unreachable!("resolve always ends on a node"),
        }
    }

    /// Object field lookup through aliases.
    pub fn get(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.node(id).field(key).map(|child| self.resolve(child))
    }

    /// Array element lookup through aliases.
    pub fn index(&self, id: NodeId, index: usize) -> Option<NodeId> {
        match self.node(id) {
            Node::Array(items) => items.get(index).map(|child| self.resolve(*child)),
            _ => None,
        }
    }

    pub fn is_marker(&self, id: NodeId) -> bool {
        matches!(self.node(id), Node::Ref(_))
    }

    /// Target URI of an unresolved marker.
    pub fn marker_target(&self, id: NodeId) -> Option<&Url> {
        match self.node(id) {
            Node::Ref(target) => Some(target),
            _ => None,
        }
    }

    /// Turns the slot at `id` into a reference marker.
    pub(crate) fn mark(&mut self, id: NodeId, target: Url) {
        let id = self.resolve(id);
        self.slots[id.0] = Slot::Node(Node::Ref(target));
    }

    /// Binds the marker slot at `marker` to `target`.
    pub(crate) fn alias(&mut self, marker: NodeId, target: NodeId) {
        let marker = self.resolve(marker);
        let target = self.resolve(target);
        if marker != target {
            self.slots[marker.0] = Slot::Alias(target);
        }
    }

    /// Overwrites the value at a location. Every alias of the location
    /// observes the new value.
    pub fn replace(&mut self, id: NodeId, value: Value) {
        let slot = self.resolve(id);
        let fresh = self.import(value);
        self.slots.swap(slot.0, fresh.0);
        // The fresh root now sits at the end of the arena and is unreachable.
        self.slots[fresh.0] = Slot::Node(Node::Null);
    }

    /// Materializes a location as a plain JSON value.
    ///
    /// Shared substructure is copied. Unresolved markers come out as
    /// `{"$ref": "<absolute uri>"}`.
    ///
    /// # Errors
    ///
    /// Returns `DocsError::Cycle` if the location reaches itself.
    pub fn to_value(&self, id: NodeId) -> Result<Value> {
        let mut path = String::new();
        self.to_value_inner(id, &mut HashSet::new(), &mut path)
    }

    fn to_value_inner(
        &self,
        id: NodeId,
        on_path: &mut HashSet<NodeId>,
        path: &mut String,
    ) -> Result<Value> {
        let id = self.resolve(id);
        let value = match self.node(id) {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Number(n) => Value::Number(n.clone()),
            Node::String(s) => Value::String(s.clone()),
            Node::Ref(target) => {
                let mut map = Map::new();
                map.insert(
                    DEFAULT_REF_PROP.to_string(),
                    Value::String(target.to_string()),
                );
                Value::Object(map)
            }
            Node::Array(items) => {
                if !on_path.insert(id) {
                    return Err(cycle(path));
                }
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let len = path.len();
                    path.push_str(&format!("/{}", i));
                    out.push(self.to_value_inner(*item, on_path, path)?);
                    path.truncate(len);
                }
                on_path.remove(&id);
                Value::Array(out)
            }
            Node::Object(fields) => {
                if !on_path.insert(id) {
                    return Err(cycle(path));
                }
                let mut out = Map::new();
                for (key, child) in fields {
                    let len = path.len();
                    path.push('/');
                    path.push_str(&key.replace('~', "~0").replace('/', "~1"));
                    out.insert(key.clone(), self.to_value_inner(*child, on_path, path)?);
                    path.truncate(len);
                }
                on_path.remove(&id);
                Value::Object(out)
            }
        };
        Ok(value)
    }
}

fn cycle(path: &str) -> DocsError {
    DocsError::Cycle {
        pointer: if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn import_round_trips_plain_values() {
        let mut graph = Graph::new();
        let doc = json!({"a": 1, "b": {"c": [true, null, "x"]}});
        let root = graph.import(doc.clone());
        assert_eq!(graph.to_value(root).unwrap(), doc);
    }

    #[test]
    fn object_key_order_is_preserved() {
        let mut graph = Graph::new();
        let root = graph.import(json!({"z": 1, "a": 2, "m": 3}));
        let Node::Object(fields) = graph.node(root) else {
            panic!("expected object");
        };
        let keys: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn alias_is_observed_by_every_holder() {
        let mut graph = Graph::new();
        let root = graph.import(json!({"a": {"x": 1}, "b": null}));
        let a = graph.get(root, "a").unwrap();
        let b = graph.get(root, "b").unwrap();
        graph.mark(b, Url::parse("file:///doc.json#/a").unwrap());
        assert!(graph.is_marker(b));

        graph.alias(b, a);
        assert!(!graph.is_marker(b));
        assert_eq!(graph.resolve(b), a);

        graph.replace(a, json!({"x": 2}));
        assert_eq!(
            graph.to_value(root).unwrap(),
            json!({"a": {"x": 2}, "b": {"x": 2}})
        );
    }

    #[test]
    fn replace_keeps_slot_identity() {
        let mut graph = Graph::new();
        let root = graph.import(json!({"a": 1}));
        let a = graph.get(root, "a").unwrap();
        graph.replace(a, json!(87));
        assert_eq!(graph.get(root, "a"), Some(a));
        assert_eq!(graph.to_value(a).unwrap(), json!(87));
    }

    #[test]
    fn cyclic_values_are_rejected() {
        let mut graph = Graph::new();
        let root = graph.import(json!({"a": {"self": null}}));
        let a = graph.get(root, "a").unwrap();
        let inner = graph.get(a, "self").unwrap();
        graph.alias(inner, a);

        let err = graph.to_value(root).unwrap_err();
        assert!(matches!(err, DocsError::Cycle { pointer } if pointer == "/a/self"));
    }

    #[test]
    fn shared_substructure_is_not_a_cycle() {
        let mut graph = Graph::new();
        let root = graph.import(json!({"a": [1], "b": null}));
        let a = graph.get(root, "a").unwrap();
        let b = graph.get(root, "b").unwrap();
        graph.alias(b, a);
        assert_eq!(graph.to_value(root).unwrap(), json!({"a": [1], "b": [1]}));
    }

    #[test]
    fn unresolved_markers_render_as_refs() {
        let mut graph = Graph::new();
        let root = graph.import(json!({"a": null}));
        let a = graph.get(root, "a").unwrap();
        graph.mark(a, Url::parse("file:///other.json#/x").unwrap());
        assert_eq!(
            graph.to_value(root).unwrap(),
            json!({"a": {"$ref": "file:///other.json#/x"}})
        );
    }

    #[test]
    #[should_panic]
    fn ids_dangle_after_clear() {
        let mut graph = Graph::new();
        let root = graph.import(json!({"a": 1}));
        graph.clear();
        graph.node(root);
    }

    #[test]
    fn index_lookup() {
        let mut graph = Graph::new();
        let root = graph.import(json!(["a", "b"]));
        let b = graph.index(root, 1).unwrap();
        assert_eq!(graph.node(b), &Node::String("b".into()));
        assert!(graph.index(root, 2).is_none());
        assert!(graph.get(root, "0").is_none());
    }
}
