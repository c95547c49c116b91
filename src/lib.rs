//! Schemawalk
//!
//! JSON Schema (draft-03) reference resolution and recursive validation.
//!
//! Schemas are loaded into a [`SchemaRegistry`], which fetches documents by
//! URI, checks their syntax once and caches them. Validation walks the
//! instance tree in lock-step with the schema: every node is checked against
//! the keywords that apply to its type, `$ref`/`extends` defer to other
//! schemas, and children are matched to their schemas by array index or
//! member name.
//!
//! # Example
//!
//! ```
//! use schemawalk::{validate, ValidateError};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "a": { "type": "integer" }
//!     }
//! });
//!
//! assert!(validate(&schema, &json!({ "a": 5, "b": true })).is_ok());
//!
//! match validate(&schema, &json!({ "a": "x" })) {
//!     Err(ValidateError::Invalid { errors }) => assert_eq!(errors[0].path, "/a"),
//!     other => panic!("unexpected result: {:?}", other),
//! }
//! ```
//!
//! # Shared registries
//!
//! Documents referenced by URI are fetched through per-scheme
//! [`UriFetcher`]s. `file` and the `jar`/`archive` zip schemes are always
//! available and `http` comes with the `remote` feature; anything else
//! (including `https`) needs a custom fetcher:
//!
//! ```
//! use schemawalk::{validate_with, JsonRef, MemoryFetcher, SchemaRegistry};
//! use serde_json::json;
//!
//! let root: JsonRef = "mem:/schemas/root.json".parse().unwrap();
//! let fetcher = MemoryFetcher::new().with(
//!     &root,
//!     r#"{ "items": { "$ref": "item.json" } }"#,
//! ).with(
//!     &"mem:/schemas/item.json".parse().unwrap(),
//!     r#"{ "type": "string" }"#,
//! );
//! let registry = SchemaRegistry::builder().with_fetcher("mem", fetcher).build();
//!
//! let report = validate_with(&registry, &root, &json!(["x", 1])).unwrap();
//! assert!(!report.is_valid());
//! assert_eq!(report.errors[0].path, "/1");
//! ```

mod error;
mod instance;
mod keyword;
mod linter;
mod loader;
mod path;
mod reference;
mod registry;
mod syntax;
mod types;
mod uri;
mod validator;

pub use error::{FetchError, ResolveError, ValidateError, ValidationMessage};
pub use instance::Instance;
pub use keyword::{get_validators, KeywordValidator, Status, TypeUnion};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{
    is_url, load_json, load_json_str, source_to_reference, FileFetcher, JarFetcher, MemoryFetcher,
    UriFetcher,
};
pub use path::{select_path_provider, PathProvider};
pub use reference::{Fragment, JsonRef, ARCHIVE_SCHEMES};
pub use registry::{RegistryBuilder, RegistryOptions, SchemaNode, SchemaRegistry};
pub use syntax::{has_fatal, SyntaxContext, SyntaxMessage, SyntaxMessageKind, SyntaxRegistry, SyntaxRule};
pub use types::{NodeType, PathElement};
pub use uri::{Uri, UriError};
pub use validator::{
    validate, validate_node, validate_with, ValidationReport, ValidationState, Validator,
};

#[cfg(feature = "remote")]
pub use loader::{HttpFetcher, HTTP_TIMEOUT};
