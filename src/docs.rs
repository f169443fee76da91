//! Document cache and load orchestration.
//!
//! [`JsonDocs`] keeps every loaded document keyed by its fragment-stripped
//! URI. Loading a document discovers its references, loads every document
//! they point to (recursively, through the configured [`Loader`]) and then
//! replaces each reference with an alias to its target. References may cross
//! documents, so all documents share one [`Graph`].
//!
//! Loads take `&mut self`: discovery and resolution rewrite shared documents
//! in place, so an instance shared between threads belongs behind a `Mutex`
//! held for the whole load call.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::discover::{discover, Identities};
use crate::error::{DocsError, Result};
use crate::graph::{Graph, NodeId};
use crate::loader::{Loader, NullLoader, Source};
use crate::pointer::{evaluate, fragment_pointer};
use crate::queue::RefQueue;
use crate::resolver;
use crate::types::DocsOptions;

/// Cached documents by normalized URI.
pub type DocumentMap = BTreeMap<Url, Document>;

/// A loaded document.
#[derive(Debug, Clone)]
pub struct Document {
    root: NodeId,
    identities: Identities,
    source: String,
}

impl Document {
    pub(crate) fn new(root: NodeId, identities: Identities, source: String) -> Self {
        Self {
            root,
            identities,
            source,
        }
    }

    /// Root of the (dereferenced) value.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Ids declared in this document.
    pub fn identities(&self) -> &Identities {
        &self.identities
    }

    /// Text the document was loaded from. Not updated by resolution.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// State owned by one top-level load call.
#[derive(Debug, Default)]
struct LoadContext {
    queue: RefQueue,
}

/// Cache of decoded, dereferenced JSON documents.
pub struct JsonDocs {
    graph: Graph,
    docs: DocumentMap,
    loader: Box<dyn Loader + Send>,
    options: DocsOptions,
}

impl Default for JsonDocs {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JsonDocs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonDocs")
            .field(
                "documents",
                &self.docs.keys().map(Url::as_str).collect::<Vec<_>>(),
            )
            .field("nodes", &self.graph.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl JsonDocs {
    /// A cache that refuses to load external resources.
    pub fn new() -> Self {
        Self::with_options(NullLoader, DocsOptions::default())
    }

    pub fn with_loader(loader: impl Loader + Send + 'static) -> Self {
        Self::with_options(loader, DocsOptions::default())
    }

    pub fn with_options(loader: impl Loader + Send + 'static, options: DocsOptions) -> Self {
        Self {
            graph: Graph::new(),
            docs: DocumentMap::new(),
            loader: Box::new(loader),
            options,
        }
    }

    pub fn options(&self) -> &DocsOptions {
        &self.options
    }

    /// Load, decode and dereference the document at `uri` through the loader.
    ///
    /// A document already in the cache is returned as-is.
    ///
    /// # Errors
    ///
    /// Returns the loader's error, `DocsError::Decode` for malformed JSON, or
    /// any discovery or resolution error.
    pub fn load_uri(&mut self, uri: &str) -> Result<NodeId> {
        let uri = parse_uri(uri)?;
        self.load(uri, None)
    }

    /// Decode and dereference `source`, caching it under `uri`.
    ///
    /// `uri` identifies the document and is the base for its relative
    /// references. A document already cached under `uri` is returned instead.
    ///
    /// # Errors
    ///
    /// Same as [`JsonDocs::load_uri`].
    pub fn load_doc(&mut self, source: impl Into<Source>, uri: &str) -> Result<NodeId> {
        let uri = parse_uri(uri)?;
        self.load(uri, Some(source.into()))
    }

    fn load(&mut self, uri: Url, source: Option<Source>) -> Result<NodeId> {
        let key = normalize(&uri);
        if let Some(doc) = self.docs.get(&key) {
            return Ok(doc.root);
        }

        let mut ctx = LoadContext::default();
        let root = self.load_inner(key, source, &mut ctx)?;
        resolver::drain(&mut self.graph, &self.docs, &mut ctx.queue)?;
        Ok(root)
    }

    /// Load one document and, recursively, everything it references.
    fn load_inner(
        &mut self,
        key: Url,
        source: Option<Source>,
        ctx: &mut LoadContext,
    ) -> Result<NodeId> {
        if let Some(doc) = self.docs.get(&key) {
            return Ok(doc.root);
        }
        debug!(uri = %key, "loading document");

        let source = match source {
            Some(source) => source,
            None => self.loader.load(&key)?,
        };
        let (value, text) = match source {
            Source::Text(text) => {
                let value: Value =
                    serde_json::from_str(&text).map_err(|source| DocsError::Decode {
                        uri: key.to_string(),
                        source,
                    })?;
                (value, text)
            }
            Source::Value(value) => {
                let text = value.to_string();
                (value, text)
            }
        };

        let mark = self.graph.len();
        let root = self.graph.import(value);
        let found = match discover(&mut self.graph, root, &key, &self.options, &mut ctx.queue) {
            Ok(found) => found,
            Err(err) => {
                self.graph.truncate(mark);
                return Err(err);
            }
        };

        // Cached before its references are followed so that cycles between
        // documents end here.
        self.docs
            .insert(key.clone(), Document::new(root, found.identities, text));

        for uri in found.ref_uris {
            if !self.docs.contains_key(&uri) {
                debug!(from = %key, to = %uri, "following reference");
                self.load_inner(uri, None, ctx)?;
            }
        }
        Ok(root)
    }

    /// Whether the document at `uri` is cached. The fragment is ignored.
    pub fn exists(&self, uri: &str) -> bool {
        self.document(uri).is_some()
    }

    /// The cached document at `uri`. The fragment is ignored.
    pub fn document(&self, uri: &str) -> Option<&Document> {
        let uri = Url::parse(uri).ok()?;
        self.docs.get(&normalize(&uri))
    }

    /// Text of the cached document at `uri`, before dereferencing.
    /// The fragment is ignored.
    pub fn source(&self, uri: &str) -> Option<&str> {
        self.document(uri).map(Document::source)
    }

    /// The location `uri` designates: its document, then its fragment as a
    /// pointer.
    ///
    /// # Errors
    ///
    /// Returns `DocsError::NotLoaded` if the document is not cached, or a
    /// pointer error if the fragment cannot be followed.
    pub fn pointer(&self, uri: &str, allow_unresolved: bool) -> Result<NodeId> {
        let uri = parse_uri(uri)?;
        evaluate_uri(&self.graph, &self.docs, &uri, allow_unresolved)
    }

    /// Materialize a location as a plain JSON value.
    ///
    /// # Errors
    ///
    /// Returns `DocsError::Cycle` if the value contains itself.
    pub fn to_value(&self, id: NodeId) -> Result<Value> {
        self.graph.to_value(id)
    }

    /// Number of cached documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Drop every cached document.
    ///
    /// Every [`NodeId`] obtained before the call is invalidated along with
    /// the graph; reload and query again instead of reusing old ids.
    pub fn clear(&mut self) {
        self.docs.clear();
        self.graph.clear();
    }

    /// Cached documents in URI order.
    pub fn iter(&self) -> impl Iterator<Item = (&Url, &Document)> {
        self.docs.iter()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable access to the values, e.g. to write through a location
    /// returned by [`JsonDocs::pointer`].
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }
}

/// Evaluate `uri` against the cached documents.
pub(crate) fn evaluate_uri(
    graph: &Graph,
    docs: &DocumentMap,
    uri: &Url,
    allow_unresolved: bool,
) -> Result<NodeId> {
    let key = normalize(uri);
    let doc = docs.get(&key).ok_or_else(|| DocsError::NotLoaded {
        uri: key.to_string(),
    })?;
    let pointer = fragment_pointer(uri)?;
    evaluate(graph, doc.root, &doc.identities, &pointer, allow_unresolved)
}

/// Cache key for a URI: the URI without its fragment.
pub fn normalize(uri: &Url) -> Url {
    let mut key = uri.clone();
    key.set_fragment(None);
    key
}

fn parse_uri(uri: &str) -> Result<Url> {
    Url::parse(uri).map_err(|source| DocsError::InvalidUri {
        uri: uri.to_string(),
        source,
    })
}
