//! JSON Pointer evaluation over the graph.
//!
//! Pointers follow RFC 6901 with two relaxations inherited from JSON Schema
//! usage: empty segments are skipped (so `/`, `""` and `/////` all designate
//! the root), and a pointer that does not start with `/` begins with a
//! document-local identifier (`foo/bar` is `bar` inside the node whose id
//! is `foo`).

use url::Url;

use crate::discover::Identities;
use crate::error::{DocsError, Result};
use crate::graph::{Graph, Node, NodeId};

/// Decode one pointer segment. `~1` is decoded before `~0` so that an
/// escaped `~01` yields `~1` rather than `/`.
pub fn decode_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Number of path segments below the root or identified node.
///
/// Zero for the whole document and for a lone identifier.
pub fn pointer_depth(pointer: &str) -> usize {
    let segments = pointer.split('/').filter(|s| !s.is_empty()).count();
    if !pointer.is_empty() && !pointer.starts_with('/') {
        segments.saturating_sub(1)
    } else {
        segments
    }
}

/// Percent-decoded fragment of `uri`, or `""` when it has none.
pub fn fragment_pointer(uri: &Url) -> Result<String> {
    let Some(fragment) = uri.fragment() else {
        return Ok(String::new());
    };
    urlencoding::decode(fragment)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| DocsError::InvalidFragment {
            fragment: fragment.to_string(),
        })
}

/// Evaluate `pointer` against a document.
///
/// When the walk must pass through a node that is still an unresolved
/// reference marker, that marker is returned if `allow_unresolved` is set,
/// otherwise the lookup fails. A marker at the end of the path is always
/// returned as-is.
///
/// # Errors
///
/// Returns `DocsError::IdNotFound` for an unknown identifier and
/// `DocsError::PointerNotFound` / `DocsError::ThroughReference` when a
/// segment cannot be followed.
pub fn evaluate(
    graph: &Graph,
    root: NodeId,
    identities: &Identities,
    pointer: &str,
    allow_unresolved: bool,
) -> Result<NodeId> {
    let (start, path, id) = match pointer.chars().next() {
        Some(c) if c != '/' => {
            let (id, rest) = pointer.split_once('/').unwrap_or((pointer, ""));
            let node = identities
                .get(id)
                .ok_or_else(|| DocsError::IdNotFound { id: id.to_string() })?;
            (*node, rest, id)
        }
        _ => (root, pointer, ""),
    };

    let mut current = graph.resolve(start);
    let mut at = format!("#{}", id);

    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let part = decode_segment(segment);
        at.push('/');
        at.push_str(&part);

        current = match graph.node(current) {
            Node::Ref(_) if allow_unresolved => return Ok(current),
            Node::Ref(_) => {
                return Err(DocsError::ThroughReference {
                    pointer: pointer.to_string(),
                    at,
                })
            }
            Node::Object(_) => graph.get(current, &part),
            Node::Array(_) => parse_index(&part).and_then(|i| graph.index(current, i)),
            _ => None,
        }
        .ok_or_else(|| DocsError::PointerNotFound {
            pointer: pointer.to_string(),
            at: at.clone(),
        })?;
    }

    Ok(current)
}

/// Array index per RFC 6901: digits only, no leading zeros.
fn parse_index(part: &str) -> Option<usize> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if part.len() > 1 && part.starts_with('0') {
        return None;
    }
    part.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn basic() -> (Graph, NodeId) {
        let mut graph = Graph::new();
        let root = graph.import(json!({"a": 1, "b": {"c": 2}, "list": [10, 20]}));
        (graph, root)
    }

    #[test]
    fn nested_field() {
        let (graph, root) = basic();
        let found = evaluate(&graph, root, &Identities::new(), "/b/c", false).unwrap();
        assert_eq!(graph.to_value(found).unwrap(), json!(2));
    }

    #[test]
    fn empty_pointers_designate_root() {
        let (graph, root) = basic();
        for pointer in ["", "/", "/////"] {
            let found = evaluate(&graph, root, &Identities::new(), pointer, false).unwrap();
            assert_eq!(found, root, "pointer {:?}", pointer);
        }
    }

    #[test]
    fn missing_field_is_not_found() {
        let (graph, root) = basic();
        let err = evaluate(&graph, root, &Identities::new(), "/dne", false).unwrap_err();
        assert!(matches!(err, DocsError::PointerNotFound { ref at, .. } if at == "#/dne"));
        assert!(err.is_not_found());
    }

    #[test]
    fn scalar_is_not_traversable() {
        let (graph, root) = basic();
        let err = evaluate(&graph, root, &Identities::new(), "/a/x", false).unwrap_err();
        assert!(matches!(err, DocsError::PointerNotFound { .. }));
    }

    #[test]
    fn array_indices() {
        let (graph, root) = basic();
        let ids = Identities::new();
        let found = evaluate(&graph, root, &ids, "/list/1", false).unwrap();
        assert_eq!(graph.to_value(found).unwrap(), json!(20));
        assert!(evaluate(&graph, root, &ids, "/list/2", false).is_err());
        assert!(evaluate(&graph, root, &ids, "/list/01", false).is_err());
        assert!(evaluate(&graph, root, &ids, "/list/-", false).is_err());
    }

    #[test]
    fn escaped_segments() {
        let mut graph = Graph::new();
        let root = graph.import(json!({"a/b": 1, "a~b": 2, "~1": 3}));
        let ids = Identities::new();
        let slash = evaluate(&graph, root, &ids, "/a~1b", false).unwrap();
        let tilde = evaluate(&graph, root, &ids, "/a~0b", false).unwrap();
        let both = evaluate(&graph, root, &ids, "/~01", false).unwrap();
        assert_eq!(graph.to_value(slash).unwrap(), json!(1));
        assert_eq!(graph.to_value(tilde).unwrap(), json!(2));
        assert_eq!(graph.to_value(both).unwrap(), json!(3));
    }

    #[test]
    fn identifier_prefix() {
        let (graph, root) = basic();
        let b = graph.get(root, "b").unwrap();
        let mut ids = Identities::new();
        ids.insert("bee".to_string(), b);

        assert_eq!(evaluate(&graph, root, &ids, "bee", false).unwrap(), b);
        let c = evaluate(&graph, root, &ids, "bee/c", false).unwrap();
        assert_eq!(graph.to_value(c).unwrap(), json!(2));

        let err = evaluate(&graph, root, &ids, "wasp/c", false).unwrap_err();
        assert!(matches!(err, DocsError::IdNotFound { id } if id == "wasp"));
    }

    #[test]
    fn unresolved_marker_mid_path() {
        let mut graph = Graph::new();
        let root = graph.import(json!({"a": null}));
        let a = graph.get(root, "a").unwrap();
        graph.mark(a, Url::parse("file:///doc.json#/b").unwrap());
        let ids = Identities::new();

        assert_eq!(evaluate(&graph, root, &ids, "/a/x", true).unwrap(), a);
        let err = evaluate(&graph, root, &ids, "/a/x", false).unwrap_err();
        assert!(matches!(err, DocsError::ThroughReference { .. }));
        // A marker at the end of the path is returned either way.
        assert_eq!(evaluate(&graph, root, &ids, "/a", false).unwrap(), a);
    }

    #[test]
    fn depth_counts_segments() {
        assert_eq!(pointer_depth(""), 0);
        assert_eq!(pointer_depth("/"), 0);
        assert_eq!(pointer_depth("foo"), 0);
        assert_eq!(pointer_depth("/D"), 1);
        assert_eq!(pointer_depth("//a///b"), 2);
        assert_eq!(pointer_depth("foo/bar"), 1);
    }

    #[test]
    fn fragments_are_percent_decoded() {
        let uri = Url::parse("file:///doc.json#/definitions/per%25cent").unwrap();
        assert_eq!(fragment_pointer(&uri).unwrap(), "/definitions/per%cent");

        let uri = Url::parse("file:///doc.json").unwrap();
        assert_eq!(fragment_pointer(&uri).unwrap(), "");
    }
}
