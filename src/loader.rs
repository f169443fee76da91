//! Fetching raw documents.
//!
//! A [`Loader`] turns a fragment-stripped URI into document content. The
//! default [`NullLoader`] refuses everything, so a document can only pull in
//! external resources when the caller opts in with another loader.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{DocsError, Result};

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Document content: raw JSON text, or an already decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Text(String),
    Value(Value),
}

impl From<&str> for Source {
    fn from(text: &str) -> Self {
        Source::Text(text.to_string())
    }
}

impl From<String> for Source {
    fn from(text: String) -> Self {
        Source::Text(text)
    }
}

impl From<Value> for Source {
    fn from(value: Value) -> Self {
        Source::Value(value)
    }
}

/// Fetches the content of a document.
pub trait Loader {
    /// Load the document at `uri`. The URI never carries a fragment.
    ///
    /// # Errors
    ///
    /// Should return a not-found error when the resource cannot, or must not,
    /// be fetched.
    fn load(&self, uri: &Url) -> Result<Source>;
}

impl<F> Loader for F
where
    F: Fn(&Url) -> Result<Source>,
{
    fn load(&self, uri: &Url) -> Result<Source> {
        self(uri)
    }
}

/// Refuses to load anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLoader;

impl Loader for NullLoader {
    fn load(&self, uri: &Url) -> Result<Source> {
        Err(DocsError::LoaderRefused {
            uri: uri.to_string(),
        })
    }
}

/// Loads `file:` URIs from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl Loader for FileLoader {
    fn load(&self, uri: &Url) -> Result<Source> {
        if uri.scheme() != "file" {
            return Err(DocsError::LoaderRefused {
                uri: uri.to_string(),
            });
        }
        let path = uri.to_file_path().map_err(|()| DocsError::LoaderRefused {
            uri: uri.to_string(),
        })?;
        read_file(&path).map(Source::Text)
    }
}

/// Read a file to a string.
///
/// # Errors
///
/// Returns `DocsError::FileNotFound` if the file doesn't exist,
/// or `DocsError::ReadError` if it can't be read.
pub fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(DocsError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    debug!(path = %path.display(), "reading file");
    std::fs::read_to_string(path).map_err(|source| DocsError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads `http:` and `https:` URIs with a blocking client.
///
/// Requires the `remote` feature (enabled by default).
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct HttpLoader {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "remote")]
impl HttpLoader {
    /// Build a loader with the default 10 second timeout.
    ///
    /// # Errors
    ///
    /// Returns `DocsError::NetworkError` if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_timeout(HTTP_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| DocsError::NetworkError {
                url: String::new(),
                source,
            })?;
        Ok(Self { client })
    }
}

#[cfg(feature = "remote")]
impl Loader for HttpLoader {
    fn load(&self, uri: &Url) -> Result<Source> {
        if !is_url(uri.as_str()) {
            return Err(DocsError::LoaderRefused {
                uri: uri.to_string(),
            });
        }
        debug!(%uri, "fetching");
        let network_error = |source| DocsError::NetworkError {
            url: uri.to_string(),
            source,
        };

        let response = self
            .client
            .get(uri.as_str())
            .send()
            .map_err(network_error)?;

        // Check for HTTP errors before reading the body
        let response = response.error_for_status().map_err(network_error)?;

        response.text().map(Source::Text).map_err(network_error)
    }
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Dispatches on the URI scheme: `file:` to [`FileLoader`], `http(s):` to
/// [`HttpLoader`] when remote loading is enabled. Anything else is refused.
#[derive(Debug, Clone, Default)]
pub struct AutoLoader {
    #[cfg(feature = "remote")]
    http: Option<HttpLoader>,
}

impl AutoLoader {
    /// Loader for local files only.
    pub fn local() -> Self {
        Self::default()
    }

    /// Loader for local files and HTTP resources.
    #[cfg(feature = "remote")]
    pub fn remote() -> Result<Self> {
        Ok(Self {
            http: Some(HttpLoader::new()?),
        })
    }
}

impl Loader for AutoLoader {
    fn load(&self, uri: &Url) -> Result<Source> {
        match uri.scheme() {
            "file" => FileLoader.load(uri),
            #[cfg(feature = "remote")]
            "http" | "https" => match &self.http {
                Some(http) => http.load(uri),
                None => NullLoader.load(uri),
            },
            _ => NullLoader.load(uri),
        }
    }
}

/// Serves documents registered in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    documents: HashMap<Url, Source>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document. Any fragment on `uri` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `DocsError::InvalidUri` if `uri` is not an absolute URI.
    pub fn insert(&mut self, uri: &str, source: impl Into<Source>) -> Result<&mut Self> {
        let mut key = Url::parse(uri).map_err(|source| DocsError::InvalidUri {
            uri: uri.to_string(),
            source,
        })?;
        key.set_fragment(None);
        self.documents.insert(key, source.into());
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl Loader for MemoryLoader {
    fn load(&self, uri: &Url) -> Result<Source> {
        self.documents
            .get(uri)
            .cloned()
            .ok_or_else(|| DocsError::NotLoaded {
                uri: uri.to_string(),
            })
    }
}
