//! Reference discovery.
//!
//! Walks one freshly imported document, records its ids, rewrites every
//! reference into a marker holding the absolute target URI, and queues
//! the markers for resolution. Never crosses into other documents.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, trace};
use url::Url;

use crate::error::{DocsError, Result};
use crate::graph::{Graph, Node, NodeId};
use crate::pointer::{fragment_pointer, pointer_depth};
use crate::queue::RefQueue;
use crate::types::{DocsOptions, ID_PROP_OVERRIDE, REF_PROP_OVERRIDE, STRICT_ID_PATTERN};

/// Document-local id → node carrying that id.
pub type Identities = HashMap<String, NodeId>;

/// What discovery found in one document.
#[derive(Debug, Default)]
pub struct Discovery {
    pub identities: Identities,
    /// Fragment-stripped URIs of every referenced document, in discovery order.
    pub ref_uris: Vec<Url>,
}

fn strict_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!("(?i){}", STRICT_ID_PATTERN)).expect("strict id pattern is valid")
    })
}

/// Discover ids and references in the document rooted at `root`.
///
/// `$idProp` and `$refProp` on the root object override the configured
/// property names for the whole document.
///
/// # Errors
///
/// Returns a reference error for an object with both an id and a reference,
/// a duplicate id, or (with strict ids) a malformed non-root id, and
/// `DocsError::InvalidUri` for a reference that cannot be resolved against
/// `base_uri`.
pub fn discover(
    graph: &mut Graph,
    root: NodeId,
    base_uri: &Url,
    options: &DocsOptions,
    queue: &mut RefQueue,
) -> Result<Discovery> {
    let id_prop =
        meta_prop(graph, root, ID_PROP_OVERRIDE).unwrap_or_else(|| options.id_prop.clone());
    let ref_prop =
        meta_prop(graph, root, REF_PROP_OVERRIDE).unwrap_or_else(|| options.ref_prop.clone());
    debug!(%base_uri, %id_prop, %ref_prop, "discovering references");

    let mut walker = Walker {
        graph,
        base_uri,
        strict_ids: options.strict_ids,
        id_prop,
        ref_prop,
        queue,
        found: Discovery::default(),
    };
    if walker.graph.node(root).is_composite() {
        walker.walk(root, 0)?;
    }
    Ok(walker.found)
}

fn meta_prop(graph: &Graph, root: NodeId, key: &str) -> Option<String> {
    match graph.node(graph.get(root, key)?) {
        Node::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

struct Walker<'a> {
    graph: &'a mut Graph,
    base_uri: &'a Url,
    strict_ids: bool,
    id_prop: String,
    ref_prop: String,
    queue: &'a mut RefQueue,
    found: Discovery,
}

impl Walker<'_> {
    fn walk(&mut self, id: NodeId, depth: usize) -> Result<()> {
        self.push_id(id, depth)?;

        for child in self.graph.node(id).children() {
            if let Some(reference) = self.reference(child) {
                // Reference objects are not walked, but their id still counts.
                self.push_id(child, depth + 1)?;
                let target = self
                    .base_uri
                    .join(&reference)
                    .map_err(|source| DocsError::InvalidUri {
                        uri: reference.clone(),
                        source,
                    })?;
                let pointer = fragment_pointer(&target)?;
                trace!(%target, depth, "found reference");

                self.graph.mark(child, target.clone());
                self.queue
                    .push(child, target.clone(), pointer_depth(&pointer), depth);

                let mut document = target;
                document.set_fragment(None);
                self.found.ref_uris.push(document);
            } else if self.graph.node(child).is_composite() {
                self.walk(child, depth + 1)?;
            }
        }
        Ok(())
    }

    /// The reference string carried by `id`, if it is a reference object.
    fn reference(&self, id: NodeId) -> Option<String> {
        match self.graph.node(self.graph.get(id, &self.ref_prop)?) {
            Node::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    fn push_id(&mut self, node: NodeId, depth: usize) -> Result<()> {
        let Some(id) = self
            .graph
            .get(node, &self.id_prop)
            .and_then(|id| match self.graph.node(id) {
                Node::String(s) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
        else {
            return Ok(());
        };

        // Root ids conventionally hold an absolute URI.
        if depth > 0 && self.strict_ids && !strict_id_regex().is_match(&id) {
            return Err(DocsError::IllegalId {
                id,
                pattern: STRICT_ID_PATTERN,
            });
        }
        let has_ref = self
            .graph
            .get(node, &self.ref_prop)
            .is_some_and(|r| !matches!(self.graph.node(r), Node::Null));
        if has_ref {
            return Err(DocsError::IdWithRef {
                id_prop: self.id_prop.clone(),
                ref_prop: self.ref_prop.clone(),
            });
        }
        if self.found.identities.contains_key(&id) {
            return Err(DocsError::DuplicateId { id });
        }

        trace!(%id, depth, "found id");
        self.found.identities.insert(id, node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("file:///data/basic-refs.json").unwrap()
    }

    fn run(
        doc: serde_json::Value,
        options: &DocsOptions,
    ) -> Result<(Graph, NodeId, Discovery, RefQueue)> {
        let mut graph = Graph::new();
        let root = graph.import(doc);
        let mut queue = RefQueue::new();
        let found = discover(&mut graph, root, &base(), options, &mut queue)?;
        Ok((graph, root, found, queue))
    }

    #[test]
    fn plain_document_has_nothing_to_discover() {
        let (graph, root, found, queue) =
            run(json!({"a": 1, "b": [1, {"c": 2}]}), &DocsOptions::new()).unwrap();
        assert!(found.identities.is_empty());
        assert!(found.ref_uris.is_empty());
        assert!(queue.is_empty());
        assert_eq!(graph.to_value(root).unwrap(), json!({"a": 1, "b": [1, {"c": 2}]}));
    }

    #[test]
    fn references_are_rewritten_and_queued_in_priority_order() {
        let doc = json!({
            "A": {"$ref": "#"},
            "B": {"C": {"$ref": "#/D"}},
            "D": {"$id": "foo", "Value": "D-Value"},
            "E": [{"$ref": "other.json"}],
            "F": {"$ref": "#foo"}
        });
        let (graph, root, found, mut queue) = run(doc, &DocsOptions::new()).unwrap();
        assert_eq!(queue.len(), 4);

        let a = queue.pop().unwrap();
        assert_eq!(a.marker, graph.get(root, "A").unwrap());
        assert_eq!(a.target.as_str(), "file:///data/basic-refs.json#");
        let f = queue.pop().unwrap();
        assert_eq!(f.marker, graph.get(root, "F").unwrap());
        assert_eq!(f.target.fragment(), Some("foo"));
        let e = queue.pop().unwrap();
        assert_eq!(e.target.as_str(), "file:///data/other.json");
        assert_eq!(e.depth, 1);
        let c = queue.pop().unwrap();
        assert_eq!(c.pointer_depth, 1);

        assert!(graph.is_marker(a.marker));
        assert_eq!(found.identities.len(), 1);
        assert_eq!(found.identities["foo"], graph.get(root, "D").unwrap());
        assert_eq!(found.ref_uris.len(), 4);
        assert!(found
            .ref_uris
            .iter()
            .all(|uri| uri.fragment().is_none()));
    }

    #[test]
    fn duplicate_ids_fail() {
        let doc = json!({"a": {"$id": "x"}, "b": [{"c": {"$id": "x"}}]});
        let err = run(doc, &DocsOptions::new()).unwrap_err();
        assert!(matches!(err, DocsError::DuplicateId { id } if id == "x"));
    }

    #[test]
    fn id_with_ref_fails() {
        let doc = json!({"a": {"b": {"$id": "x", "$ref": "#/a"}}});
        let err = run(doc, &DocsOptions::new()).unwrap_err();
        assert!(matches!(err, DocsError::IdWithRef { .. }));
    }

    #[test]
    fn reference_objects_still_have_their_id_checked() {
        let doc = json!({"a": {"$id": "x", "$ref": "#/b"}, "b": 1});
        let err = run(doc, &DocsOptions::new()).unwrap_err();
        assert!(matches!(err, DocsError::IdWithRef { .. }));

        // Id syntax is checked before the id/ref conflict.
        let doc = json!({"a": {"$id": "1bad", "$ref": "#/b"}, "b": 1});
        let err = run(doc, &DocsOptions::new().strict_ids(true)).unwrap_err();
        assert!(matches!(err, DocsError::IllegalId { id, .. } if id == "1bad"));
    }

    #[test]
    fn empty_reference_is_not_a_marker() {
        let (graph, root, found, queue) =
            run(json!({"a": {"$ref": "", "b": 1}}), &DocsOptions::new()).unwrap();
        assert!(queue.is_empty());
        assert!(found.ref_uris.is_empty());
        assert!(!graph.is_marker(graph.get(root, "a").unwrap()));
    }

    #[test]
    fn strict_ids_check_non_root_only() {
        let doc = json!({"$id": "http://example.com/root.json", "a": {"$id": "1-bad"}});
        let err = run(doc.clone(), &DocsOptions::new().strict_ids(true)).unwrap_err();
        assert!(matches!(err, DocsError::IllegalId { id, .. } if id == "1-bad"));

        assert!(run(doc, &DocsOptions::new()).is_ok());

        let doc = json!({"$id": "http://example.com/root.json", "a": {"$id": "Good.id:1_-"}});
        assert!(run(doc, &DocsOptions::new().strict_ids(true)).is_ok());
    }

    #[test]
    fn meta_properties_override_names() {
        let doc = json!({
            "$idProp": "id",
            "$refProp": "ref",
            "a": {"id": "x", "b": 1},
            "c": {"ref": "#x"},
            "d": {"$ref": "#/a"}
        });
        let (graph, root, found, queue) = run(doc, &DocsOptions::new()).unwrap();
        assert!(found.identities.contains_key("x"));
        assert_eq!(queue.len(), 1);
        assert!(graph.is_marker(graph.get(root, "c").unwrap()));
        assert!(!graph.is_marker(graph.get(root, "d").unwrap()));
    }

    #[test]
    fn non_string_properties_are_ignored() {
        let doc = json!({"properties": {"$ref": {"type": "string"}, "$id": {"type": "string"}}});
        let (_, _, found, queue) = run(doc, &DocsOptions::new()).unwrap();
        assert!(queue.is_empty());
        assert!(found.identities.is_empty());
    }

    #[test]
    fn root_reference_is_not_a_marker() {
        let (graph, root, _, queue) = run(json!({"$ref": "#/x"}), &DocsOptions::new()).unwrap();
        assert!(queue.is_empty());
        assert!(!graph.is_marker(root));
    }
}
