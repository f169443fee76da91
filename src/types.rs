//! Core types and options for document loading.

/// Default identity property.
pub const DEFAULT_ID_PROP: &str = "$id";

/// Default reference property.
pub const DEFAULT_REF_PROP: &str = "$ref";

/// Root meta-property overriding the identity property for one document.
pub const ID_PROP_OVERRIDE: &str = "$idProp";

/// Root meta-property overriding the reference property for one document.
pub const REF_PROP_OVERRIDE: &str = "$refProp";

/// Syntax non-root ids must follow when strict ids are enabled.
pub const STRICT_ID_PATTERN: &str = "^[a-z][a-z0-9_.:-]*$";

/// Options for loading documents.
#[derive(Debug, Clone)]
pub struct DocsOptions {
    /// When true, non-root ids must match [`STRICT_ID_PATTERN`]
    /// (case-insensitive). Root ids conventionally hold an absolute URI
    /// and are never checked.
    pub strict_ids: bool,
    /// Identity property used when a document does not set `$idProp`.
    pub id_prop: String,
    /// Reference property used when a document does not set `$refProp`.
    pub ref_prop: String,
}

impl Default for DocsOptions {
    fn default() -> Self {
        Self {
            strict_ids: false,
            id_prop: DEFAULT_ID_PROP.to_string(),
            ref_prop: DEFAULT_REF_PROP.to_string(),
        }
    }
}

impl DocsOptions {
    /// Create options with strict ids disabled and the standard `$id`/`$ref` properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the id syntax check.
    pub fn strict_ids(mut self, strict_ids: bool) -> Self {
        self.strict_ids = strict_ids;
        self
    }

    /// Set the default identity property.
    pub fn id_prop(mut self, id_prop: impl Into<String>) -> Self {
        self.id_prop = id_prop.into();
        self
    }

    /// Set the default reference property.
    pub fn ref_prop(mut self, ref_prop: impl Into<String>) -> Self {
        self.ref_prop = ref_prop.into();
        self
    }
}
