//! Schema registry: fetches, syntax-checks and caches schema documents, and
//! hands out [`SchemaNode`] views into them.
//!
//! Documents are cached by locator. Each locator owns a slot that is filled
//! exactly once, so concurrent lookups of a document that is still loading
//! wait for the one in-flight fetch instead of starting their own. Failed
//! loads are cached as well. The cache lives as long as the registry (shared
//! across validation runs) until [`SchemaRegistry::clear`] is called.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::RwLock;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{FetchError, ResolveError};
use crate::loader::{FileFetcher, JarFetcher, UriFetcher};
use crate::reference::{JsonRef, ARCHIVE_SCHEMES};
use crate::syntax::{has_fatal, SyntaxRegistry};
use crate::types::unescape_token;

#[cfg(feature = "remote")]
use crate::loader::HttpFetcher;

type Slot = Arc<OnceLock<Result<Arc<Value>, ResolveError>>>;

static NULL: Value = Value::Null;

/// Options for building a registry.
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Timeout for the built-in `http` fetcher.
    pub http_timeout: Duration,
    /// Install the built-in `file`, `jar`, `archive` (and, with `remote`,
    /// `http`) fetchers.
    pub default_fetchers: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(10),
            default_fetchers: true,
        }
    }
}

impl RegistryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout used by the built-in `http` fetcher.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Enable or disable the built-in fetchers.
    pub fn default_fetchers(mut self, enabled: bool) -> Self {
        self.default_fetchers = enabled;
        self
    }
}

/// Builder for [`SchemaRegistry`].
pub struct RegistryBuilder {
    options: RegistryOptions,
    fetchers: HashMap<String, Arc<dyn UriFetcher>>,
    syntax: SyntaxRegistry,
}

impl RegistryBuilder {
    pub fn options(mut self, options: RegistryOptions) -> Self {
        self.options = options;
        self
    }

    /// Serve `scheme` with `fetcher`, replacing any built-in one.
    pub fn with_fetcher(mut self, scheme: &str, fetcher: impl UriFetcher + 'static) -> Self {
        self.fetchers
            .insert(scheme.to_ascii_lowercase(), Arc::new(fetcher));
        self
    }

    /// Use a custom syntax rule table.
    pub fn syntax(mut self, syntax: SyntaxRegistry) -> Self {
        self.syntax = syntax;
        self
    }

    pub fn build(self) -> SchemaRegistry {
        let mut fetchers: HashMap<String, Arc<dyn UriFetcher>> = HashMap::new();
        if self.options.default_fetchers {
            fetchers.insert("file".to_string(), Arc::new(FileFetcher));
            for scheme in ARCHIVE_SCHEMES {
                fetchers.insert(scheme.to_string(), Arc::new(JarFetcher));
            }
            #[cfg(feature = "remote")]
            fetchers.insert(
                "http".to_string(),
                Arc::new(HttpFetcher::new(self.options.http_timeout)),
            );
        }
        fetchers.extend(self.fetchers);

        SchemaRegistry {
            inner: Arc::new(RegistryInner {
                fetchers,
                syntax: self.syntax,
                cache: RwLock::new(HashMap::new()),
                patterns: RwLock::new(HashMap::new()),
            }),
        }
    }
}

struct RegistryInner {
    fetchers: HashMap<String, Arc<dyn UriFetcher>>,
    syntax: SyntaxRegistry,
    cache: RwLock<HashMap<String, Slot>>,
    /// Compiled `pattern`/`patternProperties` regexes, keyed by source.
    patterns: RwLock<HashMap<String, Regex>>,
}

/// Shared handle to a schema cache. Cloning is cheap and shares the cache.
#[derive(Clone)]
pub struct SchemaRegistry {
    inner: Arc<RegistryInner>,
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut schemes: Vec<&String> = self.inner.fetchers.keys().collect();
        schemes.sort();
        f.debug_struct("SchemaRegistry")
            .field("schemes", &schemes)
            .field("cached", &self.inner.cache.read().len())
            .finish()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    /// A registry with the default options and fetchers.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// A registry with the default fetchers configured by `options`.
    pub fn with_options(options: RegistryOptions) -> Self {
        Self::builder().options(options).build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            options: RegistryOptions::default(),
            fetchers: HashMap::new(),
            syntax: SyntaxRegistry::default(),
        }
    }

    pub fn syntax(&self) -> &SyntaxRegistry {
        &self.inner.syntax
    }

    /// Look up the schema node a reference points to, loading its document
    /// on first use.
    ///
    /// # Errors
    ///
    /// `Fetch`/`InvalidJson`/`Syntax` if the document cannot be loaded,
    /// `DanglingReference` if the fragment addresses nothing.
    pub fn get_schema(&self, reference: &JsonRef) -> Result<SchemaNode, ResolveError> {
        let locator = reference.to_locator();
        let document = self.document(&locator)?;

        let (pointer, _) = reference.fragment().resolve(&document).ok_or_else(|| {
            ResolveError::DanglingReference {
                reference: reference.to_string(),
            }
        })?;
        let base = resolution_scope(&locator, &document, &pointer);

        Ok(SchemaNode {
            registry: self.clone(),
            document,
            locator,
            pointer,
            base,
        })
    }

    /// Put an in-memory document in the cache under `reference`'s locator,
    /// replacing whatever was there.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Syntax` if the document is not a valid schema.
    pub fn register(&self, reference: &JsonRef, document: Value) -> Result<(), ResolveError> {
        let locator = reference.to_locator();
        let document = self.checked(&locator, document)?;

        let alias = id_alias(&locator, &document);
        self.insert(&locator, Arc::clone(&document));
        if let Some(alias) = alias {
            tracing::debug!(locator = %locator, alias = %alias, "aliased schema document by id");
            self.insert(&alias, document);
        }
        tracing::debug!(locator = %locator, "registered schema document");
        Ok(())
    }

    /// Register a root schema supplied by the caller.
    ///
    /// The document is filed under its absolute `id` when it has one, else
    /// under the empty reference. Returns the reference it was filed under.
    /// A relative root `id` is filed as an alias too, so the document's own
    /// fragment references still find it.
    pub fn register_root(&self, document: Value) -> Result<JsonRef, ResolveError> {
        let locator = match document.get("id") {
            Some(id) => {
                let id = JsonRef::from_node(id)?;
                if id.scheme().is_some() {
                    id.to_locator()
                } else {
                    JsonRef::empty()
                }
            }
            None => JsonRef::empty(),
        };
        self.register(&locator, document)?;
        Ok(locator)
    }

    /// True if the locator's document has been loaded (or failed to load).
    pub fn is_cached(&self, reference: &JsonRef) -> bool {
        self.inner
            .cache
            .read()
            .get(reference.locator())
            .map(|slot| slot.get().is_some())
            .unwrap_or(false)
    }

    /// Drop every cached document.
    pub fn clear(&self) {
        self.inner.cache.write().clear();
    }

    fn slot(&self, locator: &str) -> Slot {
        if let Some(slot) = self.inner.cache.read().get(locator) {
            return Arc::clone(slot);
        }
        Arc::clone(
            self.inner
                .cache
                .write()
                .entry(locator.to_string())
                .or_default(),
        )
    }

    fn insert(&self, locator: &JsonRef, document: Arc<Value>) {
        let slot: Slot = Arc::new(OnceLock::new());
        let _ = slot.set(Ok(document));
        self.inner
            .cache
            .write()
            .insert(locator.locator().to_string(), slot);
    }

    fn document(&self, locator: &JsonRef) -> Result<Arc<Value>, ResolveError> {
        let slot = self.slot(locator.locator());
        let mut loaded = false;
        let result = slot
            .get_or_init(|| {
                loaded = true;
                self.load(locator)
            })
            .clone();

        // Aliases are filed only after our own slot is settled, so two
        // documents naming each other never wait on each other's load.
        if loaded {
            if let Ok(document) = &result {
                self.alias_by_id(locator, document);
            }
        }
        result
    }

    /// Compile a regex once per registry.
    ///
    /// # Errors
    ///
    /// Returns the compile error for an invalid pattern. Invalid patterns are
    /// not cached.
    pub fn pattern(&self, source: &str) -> Result<Regex, regex::Error> {
        if let Some(re) = self.inner.patterns.read().get(source) {
            return Ok(re.clone());
        }
        let re = Regex::new(source)?;
        self.inner
            .patterns
            .write()
            .insert(source.to_string(), re.clone());
        Ok(re)
    }

    fn load(&self, locator: &JsonRef) -> Result<Arc<Value>, ResolveError> {
        tracing::debug!(locator = %locator, "fetching schema document");
        let fetch_error = |source: FetchError| ResolveError::Fetch {
            locator: locator.to_string(),
            source: Arc::new(source),
        };

        let Some(scheme) = locator.scheme() else {
            return Err(fetch_error(FetchError::InvalidLocator {
                locator: locator.to_string(),
                message: "relative locator has no document to fetch".to_string(),
            }));
        };
        let fetcher = self.inner.fetchers.get(scheme).ok_or_else(|| {
            fetch_error(FetchError::UnsupportedScheme {
                scheme: scheme.to_string(),
            })
        })?;

        let bytes = fetcher.fetch(locator).map_err(fetch_error)?;
        let document: Value =
            serde_json::from_slice(&bytes).map_err(|e| ResolveError::InvalidJson {
                locator: locator.to_string(),
                message: e.to_string(),
            })?;
        self.checked(locator, document)
    }

    fn checked(&self, locator: &JsonRef, document: Value) -> Result<Arc<Value>, ResolveError> {
        let messages = self.inner.syntax.check(&document);
        if has_fatal(&messages) {
            tracing::debug!(locator = %locator, count = messages.len(), "schema failed syntax check");
            return Err(ResolveError::Syntax {
                locator: locator.to_string(),
                messages,
            });
        }
        Ok(Arc::new(document))
    }

    /// File a fetched document under its root `id` as well, unless something
    /// is already cached there.
    fn alias_by_id(&self, locator: &JsonRef, document: &Arc<Value>) {
        let Some(alias) = id_alias(locator, document) else {
            return;
        };
        let slot = self.slot(alias.locator());
        if slot.set(Ok(Arc::clone(document))).is_ok() {
            tracing::debug!(locator = %locator, alias = %alias, "aliased schema document by id");
        }
    }
}

/// Locator named by a document's root `id`, when it differs from `locator`.
fn id_alias(locator: &JsonRef, document: &Value) -> Option<JsonRef> {
    let id = document
        .get("id")
        .filter(|id| id.is_string())
        .map(JsonRef::from_node)?
        .ok()?;
    let alias = locator.resolve(&id).to_locator();
    if alias.is_empty() || alias.contains(locator) {
        return None;
    }
    Some(alias)
}

/// Compute a node's resolution scope: the document locator refined by every
/// `id` from the root down to the node.
fn resolution_scope(locator: &JsonRef, document: &Value, pointer: &str) -> JsonRef {
    let mut base = locator.clone();
    let mut node = document;
    base = apply_id(&base, node);

    for token in pointer.split('/').skip(1) {
        let token = unescape_token(token);
        let next = match node {
            Value::Object(map) => map.get(&token),
            Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        let Some(next) = next else {
            break;
        };
        node = next;
        base = apply_id(&base, node);
    }
    base
}

fn apply_id(base: &JsonRef, node: &Value) -> JsonRef {
    match node.get("id").filter(|id| id.is_string()).map(JsonRef::from_node) {
        Some(Ok(id)) => base.resolve(&id),
        _ => base.clone(),
    }
}

/// A view of one schema object inside a cached document.
#[derive(Clone)]
pub struct SchemaNode {
    registry: SchemaRegistry,
    document: Arc<Value>,
    locator: JsonRef,
    pointer: String,
    base: JsonRef,
}

impl fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaNode")
            .field("locator", &self.locator)
            .field("pointer", &self.pointer)
            .field("base", &self.base)
            .finish()
    }
}

impl SchemaNode {
    /// The raw schema value.
    pub fn raw(&self) -> &Value {
        self.document.pointer(&self.pointer).unwrap_or(&NULL)
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        self.raw().as_object()
    }

    /// Value of a keyword, if present.
    pub fn get(&self, keyword: &str) -> Option<&Value> {
        self.raw().get(keyword)
    }

    /// JSON Pointer of this node within its document.
    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    /// Reference that addresses exactly this node.
    pub fn reference(&self) -> JsonRef {
        self.locator.with_pointer(&self.pointer)
    }

    /// Base against which relative references inside this node resolve.
    pub fn base(&self) -> &JsonRef {
        &self.base
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Compiled regex for a pattern found in this schema.
    pub fn pattern(&self, source: &str) -> Result<Regex, regex::Error> {
        self.registry.pattern(source)
    }

    /// Look up a node below this one by (unescaped) pointer tokens.
    ///
    /// # Errors
    ///
    /// `DanglingReference` if nothing is there.
    pub fn descend(&self, tokens: &[&str]) -> Result<SchemaNode, ResolveError> {
        let mut pointer = self.pointer.clone();
        for token in tokens {
            pointer.push('/');
            pointer.push_str(&crate::types::escape_token(token));
        }
        self.registry.get_schema(&self.locator.with_pointer(&pointer))
    }

    /// Follow a reference value (`$ref`, an `extends` entry) found in this
    /// node, resolving it against the node's scope.
    pub fn follow(&self, value: &Value) -> Result<SchemaNode, ResolveError> {
        let reference = JsonRef::from_node(value)?;
        self.registry.get_schema(&self.base.resolve(&reference))
    }
}
