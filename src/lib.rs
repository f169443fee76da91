//! JSON Reference resolution
//!
//! Loads JSON documents that point into each other (and into themselves)
//! through `$ref` URIs with JSON Pointer fragments, and turns them into a
//! graph where every reference has been replaced by an alias to the value it
//! designates, ready for direct traversal by consumers such as JSON Schema
//! validators.
//!
//! # Example
//!
//! ```
//! use jsondocs::JsonDocs;
//! use serde_json::json;
//!
//! let mut docs = JsonDocs::new();
//! let root = docs
//!     .load_doc(
//!         r##"{"definitions": {"id": {"type": "integer"}},
//!             "properties": {"id": {"$ref": "#/definitions/id"}}}"##,
//!         "file:///schemas/user.json",
//!     )
//!     .unwrap();
//!
//! let id = docs.pointer("file:///schemas/user.json#/properties/id", false).unwrap();
//! assert_eq!(docs.to_value(id).unwrap(), json!({"type": "integer"}));
//!
//! // The reference is now an alias of its target.
//! let graph = docs.graph();
//! let definition = graph.get(graph.get(root, "definitions").unwrap(), "id");
//! assert_eq!(Some(id), definition);
//! ```
//!
//! # Conventions
//!
//! | Property | Meaning |
//! |----------|---------|
//! | `$ref` | Reference to another value: a URI, optionally with a JSON Pointer fragment |
//! | `$id` | Document-local identifier, usable as the first segment of a fragment (`#foo/bar`) |
//! | `$idProp` / `$refProp` | On a document root, rename the two properties above for that document |
//!
//! Pointer segments use `~1` for `/` and `~0` for `~`.
//!
//! External documents are only fetched through an explicit [`Loader`]; the
//! default [`NullLoader`] refuses every fetch.

mod discover;
mod docs;
mod error;
mod graph;
mod loader;
mod pointer;
mod queue;
mod resolver;
mod types;

pub use discover::{discover, Discovery, Identities};
pub use docs::{normalize, Document, DocumentMap, JsonDocs};
pub use error::{DocsError, ErrorKind, Result};
pub use graph::{Graph, Node, NodeId};
pub use loader::{
    is_url, read_file, AutoLoader, FileLoader, Loader, MemoryLoader, NullLoader, Source,
};
pub use pointer::{decode_segment, evaluate, fragment_pointer, pointer_depth};
pub use queue::{PendingRef, RefQueue};
pub use resolver::drain;
pub use types::{
    DocsOptions, DEFAULT_ID_PROP, DEFAULT_REF_PROP, ID_PROP_OVERRIDE, REF_PROP_OVERRIDE,
    STRICT_ID_PATTERN,
};

#[cfg(feature = "remote")]
pub use loader::HttpLoader;
