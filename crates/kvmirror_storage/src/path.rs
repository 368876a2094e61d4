//! Typed logical addresses with dual rendering.
//!
//! A [`Path`] carries one component sequence per backend addressing scheme.
//! Which sequence is rendered depends on the active [`PathConfig`], so one
//! logical child can map to different literal names in the document store
//! and in the tree store.
//!
//! The phantom kind parameter restricts what can be done with a path at
//! compile time: only collection paths have [`Path::child`] and
//! [`Path::limit`].

use kvmirror_codec::CodecOptions;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// The two remote addressing schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Hierarchical collection/document store.
    DocumentStore,
    /// Flat key-ordered tree store.
    TreeStore,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::DocumentStore => f.write_str("document-store"),
            BackendKind::TreeStore => f.write_str("tree-store"),
        }
    }
}

/// Configuration of a document-store backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DocumentStoreConfig {
    /// Named database, or the default database when `None`.
    pub database: Option<String>,
    /// Codec options forwarded to payload encode/decode.
    pub codec: CodecOptions,
}

impl DocumentStoreConfig {
    /// Creates a configuration for the default database.
    pub fn new() -> Self {
        Self {
            database: None,
            codec: CodecOptions::document_store_default(),
        }
    }

    /// Sets the database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sets the codec options.
    pub fn with_codec(mut self, codec: CodecOptions) -> Self {
        self.codec = codec;
        self
    }
}

/// Configuration of a tree-store backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TreeStoreConfig {
    /// Hosting region of the instance.
    pub region: Option<String>,
    /// Instance name, or the default instance when `None`.
    pub instance: Option<String>,
    /// Codec options forwarded to payload encode/decode.
    pub codec: CodecOptions,
}

impl TreeStoreConfig {
    /// Creates a configuration for the default instance.
    pub fn new() -> Self {
        Self {
            region: None,
            instance: None,
            codec: CodecOptions::tree_store_default(),
        }
    }

    /// Sets the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the instance name.
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Sets the codec options.
    pub fn with_codec(mut self, codec: CodecOptions) -> Self {
        self.codec = codec;
        self
    }
}

/// Selects the backend a path renders for and is dispatched to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathConfig {
    /// Address the document store.
    DocumentStore(DocumentStoreConfig),
    /// Address the tree store.
    TreeStore(TreeStoreConfig),
}

impl PathConfig {
    /// Document store with default settings.
    pub fn document_store() -> Self {
        PathConfig::DocumentStore(DocumentStoreConfig::new())
    }

    /// Tree store with default settings.
    pub fn tree_store() -> Self {
        PathConfig::TreeStore(TreeStoreConfig::new())
    }

    /// Returns the addressing scheme.
    pub fn backend(&self) -> BackendKind {
        match self {
            PathConfig::DocumentStore(_) => BackendKind::DocumentStore,
            PathConfig::TreeStore(_) => BackendKind::TreeStore,
        }
    }

    /// Returns the codec options carried by this configuration.
    pub fn codec(&self) -> &CodecOptions {
        match self {
            PathConfig::DocumentStore(config) => &config.codec,
            PathConfig::TreeStore(config) => &config.codec,
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self::tree_store()
    }
}

impl fmt::Display for PathConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathConfig::DocumentStore(config) => match &config.database {
                Some(database) => write!(f, "document-store({database})"),
                None => f.write_str("document-store"),
            },
            PathConfig::TreeStore(config) => match (&config.instance, &config.region) {
                (Some(instance), Some(region)) => write!(f, "tree-store({instance}@{region})"),
                (Some(instance), None) => write!(f, "tree-store({instance})"),
                _ => f.write_str("tree-store"),
            },
        }
    }
}

/// Query modifiers for collection reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Query {
    /// Deliver at most this many records, counted from the start of the
    /// backend's order.
    pub limit: Option<usize>,
}

/// A path with its kind erased; this is what storage backends receive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawPath {
    document: Vec<String>,
    tree: Vec<String>,
    config: PathConfig,
    query: Option<Query>,
}

impl RawPath {
    /// Returns the component sequence of the active backend.
    pub fn components(&self) -> &[String] {
        match self.config.backend() {
            BackendKind::DocumentStore => &self.document,
            BackendKind::TreeStore => &self.tree,
        }
    }

    /// Joins the active backend's components with `/`.
    ///
    /// No escaping or validation is performed.
    pub fn rendered(&self) -> String {
        self.components().join("/")
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &PathConfig {
        &self.config
    }

    /// Returns the attached query, if any.
    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    /// Returns the result-count limit of the attached query.
    pub fn limit(&self) -> Option<usize> {
        self.query.and_then(|q| q.limit)
    }

    /// Returns a new path extended by `key` in both sequences.
    pub fn child(&self, key: &str) -> RawPath {
        let mut child = self.extended(&[key], &[key], None);
        child.query = None;
        child
    }

    fn extended(&self, document: &[&str], tree: &[&str], config: Option<PathConfig>) -> RawPath {
        let mut next = self.clone();
        next.document.extend(document.iter().map(|s| (*s).to_string()));
        next.tree.extend(tree.iter().map(|s| (*s).to_string()));
        if let Some(config) = config {
            next.config = config;
        }
        next
    }
}

impl fmt::Display for RawPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered())
    }
}

/// Kind marker for the root path.
#[derive(Debug)]
pub enum Root {}

/// Kind marker for a collection of `T` records.
#[derive(Debug)]
pub struct Collection<T>(PhantomData<fn() -> T>);

/// Kind marker for a single `T` record.
#[derive(Debug)]
pub struct Document<T>(PhantomData<fn() -> T>);

/// A path addressing a collection of `T` records.
pub type CollectionPath<T> = Path<Collection<T>>;

/// A path addressing a single `T` record.
pub type DocumentPath<T> = Path<Document<T>>;

/// An immutable, kind-typed logical address.
pub struct Path<K> {
    raw: RawPath,
    _kind: PhantomData<fn() -> K>,
}

impl Path<Root> {
    /// The empty address under the default tree-store configuration.
    pub fn root() -> Self {
        Self::from_raw(RawPath {
            document: Vec::new(),
            tree: Vec::new(),
            config: PathConfig::default(),
            query: None,
        })
    }
}

impl<K> Path<K> {
    fn from_raw(raw: RawPath) -> Self {
        Self {
            raw,
            _kind: PhantomData,
        }
    }

    /// Appends the same segments to both component sequences.
    pub fn append<N>(&self, segments: &[&str]) -> Path<N> {
        Path::from_raw(self.raw.extended(segments, segments, None))
    }

    /// Appends segments and switches to another backend configuration.
    pub fn append_with<N>(&self, segments: &[&str], config: PathConfig) -> Path<N> {
        Path::from_raw(self.raw.extended(segments, segments, Some(config)))
    }

    /// Appends different segments per backend.
    pub fn append_split<N>(&self, document: &[&str], tree: &[&str]) -> Path<N> {
        Path::from_raw(self.raw.extended(document, tree, None))
    }

    /// Appends one segment naming a collection of `T`.
    pub fn collection<T>(&self, segment: &str) -> CollectionPath<T> {
        self.append(&[segment])
    }

    /// Appends one segment naming a single `T` record.
    pub fn document<T>(&self, segment: &str) -> DocumentPath<T> {
        self.append(&[segment])
    }

    /// Returns the same address under another backend configuration.
    pub fn with_config(&self, config: PathConfig) -> Self {
        let mut raw = self.raw.clone();
        raw.config = config;
        Self::from_raw(raw)
    }

    /// Joins the active backend's components with `/`.
    pub fn rendered(&self) -> String {
        self.raw.rendered()
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &PathConfig {
        &self.raw.config
    }

    /// Returns the attached query, if any.
    pub fn query(&self) -> Option<&Query> {
        self.raw.query()
    }

    /// Returns the kind-erased path.
    pub fn raw(&self) -> &RawPath {
        &self.raw
    }
}

impl<T> Path<Collection<T>> {
    /// Addresses the member record stored under `key`.
    pub fn child(&self, key: &str) -> DocumentPath<T> {
        Path::from_raw(self.raw.child(key))
    }

    /// Caps the number of records delivered for this collection.
    pub fn limit(&self, limit: usize) -> Self {
        let mut raw = self.raw.clone();
        let mut query = raw.query.unwrap_or_default();
        query.limit = Some(limit);
        raw.query = Some(query);
        Self::from_raw(raw)
    }
}

impl<K> Clone for Path<K> {
    fn clone(&self) -> Self {
        Self::from_raw(self.raw.clone())
    }
}

impl<K> fmt::Debug for Path<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Path")
            .field("rendered", &self.rendered())
            .field("config", &self.raw.config)
            .field("query", &self.raw.query)
            .finish()
    }
}

impl<K> fmt::Display for Path<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered())
    }
}

impl<K> PartialEq for Path<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K> Eq for Path<K> {}

impl<K> Hash for Path<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Todo;

    #[test]
    fn root_renders_empty() {
        let root = Path::root();
        assert_eq!(root.rendered(), "");
        assert_eq!(root.config().backend(), BackendKind::TreeStore);
    }

    #[test]
    fn child_of_collection_renders_joined() {
        let todo = Path::root().collection::<Todo>("a").child("b");
        assert_eq!(todo.rendered(), "a/b");
    }

    #[test]
    fn split_append_renders_per_backend() {
        let users = Path::root().append_split::<Collection<Todo>>(&["users"], &["people"]);
        assert_eq!(users.rendered(), "people");

        let users = users.with_config(PathConfig::document_store());
        assert_eq!(users.rendered(), "users");
        assert_eq!(users.child("7").rendered(), "users/7");
    }

    #[test]
    fn append_with_switches_config() {
        let config = PathConfig::DocumentStore(DocumentStoreConfig::new().with_database("audit"));
        let events: CollectionPath<Todo> =
            Path::root().append_with(&["orgs", "acme", "events"], config.clone());
        assert_eq!(events.config(), &config);
        assert_eq!(events.rendered(), "orgs/acme/events");
    }

    #[test]
    fn composition_never_mutates() {
        let todos = Path::root().collection::<Todo>("todos");
        let limited = todos.limit(10);
        let _child = todos.child("x");

        assert_eq!(todos.query(), None);
        assert_eq!(limited.query().and_then(|q| q.limit), Some(10));
        assert_eq!(todos.rendered(), "todos");
        assert_ne!(todos, limited);
    }

    #[test]
    fn child_inherits_config() {
        let todos = Path::root()
            .collection::<Todo>("todos")
            .with_config(PathConfig::document_store());
        assert_eq!(todos.child("1").config().backend(), BackendKind::DocumentStore);
    }

    #[test]
    fn raw_child_matches_typed_child() {
        let todos = Path::root().collection::<Todo>("todos");
        assert_eq!(todos.raw().child("9"), *todos.child("9").raw());
    }

    #[test]
    fn config_display() {
        assert_eq!(PathConfig::tree_store().to_string(), "tree-store");
        let config = PathConfig::TreeStore(
            TreeStoreConfig::new()
                .with_instance("demo")
                .with_region("europe-west1"),
        );
        assert_eq!(config.to_string(), "tree-store(demo@europe-west1)");
        let config = PathConfig::DocumentStore(DocumentStoreConfig::new().with_database("audit"));
        assert_eq!(config.to_string(), "document-store(audit)");
    }
}
