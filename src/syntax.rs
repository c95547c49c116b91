//! Schema syntax checking, independent of any instance.
//!
//! Every keyword maps to a [`SyntaxRule`]. Checking collects messages
//! instead of stopping at the first problem. Unknown keywords are reported
//! but are not fatal. Keywords are visited in document order.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::reference::JsonRef;
use crate::types::{escape_token, json_equal, json_type_name, NodeType};

/// Machine-readable category of a syntax message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntaxMessageKind {
    /// The value where a schema was expected is not an object.
    NotASchema,
    /// No rule is registered for the keyword. Not fatal.
    UnknownKeyword,
    /// The keyword's value is malformed.
    InvalidKeyword,
    /// The rule itself blew up while checking.
    CheckerFailed,
}

/// One finding of a syntax check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxMessage {
    /// JSON Pointer to the schema object the message is about.
    pub pointer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    pub kind: SyntaxMessageKind,
    pub message: String,
}

impl SyntaxMessage {
    pub fn new(
        pointer: &str,
        keyword: Option<&str>,
        kind: SyntaxMessageKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            pointer: pointer.to_string(),
            keyword: keyword.map(str::to_string),
            kind,
            message: message.into(),
        }
    }

    /// Whether this message makes the schema unusable.
    pub fn is_fatal(&self) -> bool {
        self.kind != SyntaxMessageKind::UnknownKeyword
    }
}

impl std::fmt::Display for SyntaxMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pointer = if self.pointer.is_empty() { "/" } else { &self.pointer };
        match &self.keyword {
            Some(keyword) => write!(f, "{}: [{}] {}", pointer, keyword, self.message),
            None => write!(f, "{}: {}", pointer, self.message),
        }
    }
}

/// True if any message in the list is fatal.
pub fn has_fatal(messages: &[SyntaxMessage]) -> bool {
    messages.iter().any(SyntaxMessage::is_fatal)
}

/// A syntax rule: inspects `value` (the keyword's value) within `schema`.
pub type SyntaxRule = fn(&mut SyntaxContext<'_>, &Value, &Map<String, Value>);

/// What a rule sees while checking one keyword of one schema object.
pub struct SyntaxContext<'a> {
    registry: &'a SyntaxRegistry,
    pointer: &'a str,
    keyword: &'a str,
    messages: &'a mut Vec<SyntaxMessage>,
}

impl SyntaxContext<'_> {
    /// Record a problem with the current keyword.
    pub fn error(&mut self, message: impl Into<String>) {
        self.messages.push(SyntaxMessage::new(
            self.pointer,
            Some(self.keyword),
            SyntaxMessageKind::InvalidKeyword,
            message,
        ));
    }

    /// Check a nested schema found under the current keyword.
    ///
    /// `tokens` are the (unescaped) pointer tokens below the keyword.
    pub fn check_subschema(&mut self, tokens: &[&str], value: &Value) {
        let mut pointer = format!("{}/{}", self.pointer, escape_token(self.keyword));
        for token in tokens {
            pointer.push('/');
            pointer.push_str(&escape_token(token));
        }
        self.registry.check_at(&pointer, value, self.messages);
    }
}

/// Keyword name to syntax rule table.
#[derive(Clone)]
pub struct SyntaxRegistry {
    rules: HashMap<String, SyntaxRule>,
}

impl std::fmt::Debug for SyntaxRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keywords: Vec<&String> = self.rules.keys().collect();
        keywords.sort();
        f.debug_struct("SyntaxRegistry")
            .field("keywords", &keywords)
            .finish()
    }
}

impl Default for SyntaxRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for (keyword, rule) in BUILTIN_RULES {
            registry.register(keyword, *rule);
        }
        registry
    }
}

impl SyntaxRegistry {
    /// A registry with no rules: every keyword is unknown.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Add or replace the rule for a keyword.
    pub fn register(&mut self, keyword: &str, rule: SyntaxRule) {
        self.rules.insert(keyword.to_string(), rule);
    }

    pub fn is_known(&self, keyword: &str) -> bool {
        self.rules.contains_key(keyword)
    }

    /// Check a whole schema document, nested schemas included.
    pub fn check(&self, document: &Value) -> Vec<SyntaxMessage> {
        let mut messages = Vec::new();
        self.check_at("", document, &mut messages);
        messages
    }

    fn check_at(&self, pointer: &str, schema: &Value, messages: &mut Vec<SyntaxMessage>) {
        let Value::Object(map) = schema else {
            messages.push(SyntaxMessage::new(
                pointer,
                None,
                SyntaxMessageKind::NotASchema,
                format!("not a schema: expected object, got {}", json_type_name(schema)),
            ));
            return;
        };

        for (keyword, value) in map {
            let Some(rule) = self.rules.get(keyword) else {
                tracing::debug!(pointer, keyword = %keyword, "unknown schema keyword");
                messages.push(SyntaxMessage::new(
                    pointer,
                    Some(keyword),
                    SyntaxMessageKind::UnknownKeyword,
                    format!("unknown keyword \"{}\"", keyword),
                ));
                continue;
            };

            let mut context = SyntaxContext {
                registry: self,
                pointer,
                keyword,
                messages: &mut *messages,
            };
            let outcome = catch_unwind(AssertUnwindSafe(|| rule(&mut context, value, map)));
            if let Err(payload) = outcome {
                let cause = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::warn!(pointer, keyword = %keyword, %cause, "syntax checker failed");
                messages.push(SyntaxMessage::new(
                    pointer,
                    Some(keyword),
                    SyntaxMessageKind::CheckerFailed,
                    format!("cannot run checker for keyword {}: {}", keyword, cause),
                ));
            }
        }
    }
}

const BUILTIN_RULES: &[(&str, SyntaxRule)] = &[
    ("$schema", check_uri),
    ("$ref", check_uri),
    ("id", check_uri),
    ("title", check_string),
    ("description", check_string),
    ("format", check_string),
    ("default", check_any),
    ("type", check_type_union),
    ("disallow", check_type_union),
    ("enum", check_enum),
    ("extends", check_extends),
    ("properties", check_schema_map),
    ("definitions", check_schema_map),
    ("patternProperties", check_pattern_properties),
    ("additionalProperties", check_bool_or_schema),
    ("additionalItems", check_bool_or_schema),
    ("items", check_items),
    ("dependencies", check_dependencies),
    ("minimum", check_number),
    ("maximum", check_number),
    ("divisibleBy", check_divisible_by),
    ("exclusiveMinimum", check_exclusive),
    ("exclusiveMaximum", check_exclusive),
    ("minLength", check_size_bound),
    ("maxLength", check_size_bound),
    ("minItems", check_size_bound),
    ("maxItems", check_size_bound),
    ("pattern", check_pattern),
    ("uniqueItems", check_boolean),
    ("required", check_boolean),
];

fn check_any(_: &mut SyntaxContext<'_>, _: &Value, _: &Map<String, Value>) {}

fn expect_type(ctx: &mut SyntaxContext<'_>, value: &Value, expected: &[NodeType]) -> bool {
    let actual = NodeType::of(value);
    if expected.contains(&actual) {
        return true;
    }
    let names: Vec<&str> = expected.iter().map(NodeType::name).collect();
    ctx.error(format!(
        "expected {}, got {}",
        names.join(" or "),
        actual.name()
    ));
    false
}

fn check_string(ctx: &mut SyntaxContext<'_>, value: &Value, _: &Map<String, Value>) {
    expect_type(ctx, value, &[NodeType::String]);
}

fn check_boolean(ctx: &mut SyntaxContext<'_>, value: &Value, _: &Map<String, Value>) {
    expect_type(ctx, value, &[NodeType::Boolean]);
}

fn check_number(ctx: &mut SyntaxContext<'_>, value: &Value, _: &Map<String, Value>) {
    expect_type(ctx, value, NodeType::NUMERIC);
}

fn check_uri(ctx: &mut SyntaxContext<'_>, value: &Value, _: &Map<String, Value>) {
    if !expect_type(ctx, value, &[NodeType::String]) {
        return;
    }
    if let Err(e) = JsonRef::from_node(value) {
        ctx.error(e.to_string());
    }
}

fn check_type_union(ctx: &mut SyntaxContext<'_>, value: &Value, _: &Map<String, Value>) {
    fn check_name(ctx: &mut SyntaxContext<'_>, name: &str) {
        if name != "any" && NodeType::parse(name).is_none() {
            ctx.error(format!("unknown type name \"{}\"", name));
        }
    }

    match value {
        Value::String(name) => check_name(ctx, name),
        Value::Array(items) => {
            if items.is_empty() {
                ctx.error("type array must not be empty");
            }
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::String(name) => check_name(ctx, name),
                    Value::Object(_) => ctx.check_subschema(&[&i.to_string()], item),
                    other => ctx.error(format!(
                        "element {} must be a type name or a schema, got {}",
                        i,
                        json_type_name(other)
                    )),
                }
            }
            if has_duplicates(items) {
                ctx.error("type array elements must be unique");
            }
        }
        other => {
            expect_type(ctx, other, &[NodeType::String, NodeType::Array]);
        }
    }
}

fn check_enum(ctx: &mut SyntaxContext<'_>, value: &Value, _: &Map<String, Value>) {
    if !expect_type(ctx, value, &[NodeType::Array]) {
        return;
    }
    if let Value::Array(items) = value {
        if items.is_empty() {
            ctx.error("enum must have at least one element");
        }
        if has_duplicates(items) {
            ctx.error("enum elements must be unique");
        }
    }
}

fn check_extends(ctx: &mut SyntaxContext<'_>, value: &Value, _: &Map<String, Value>) {
    match value {
        Value::Object(_) => ctx.check_subschema(&[], value),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                ctx.check_subschema(&[&i.to_string()], item);
            }
        }
        other => {
            expect_type(ctx, other, &[NodeType::Object, NodeType::Array]);
        }
    }
}

fn check_schema_map(ctx: &mut SyntaxContext<'_>, value: &Value, _: &Map<String, Value>) {
    if let Value::Object(map) = value {
        for (name, schema) in map {
            ctx.check_subschema(&[name], schema);
        }
    } else {
        expect_type(ctx, value, &[NodeType::Object]);
    }
}

fn check_pattern_properties(ctx: &mut SyntaxContext<'_>, value: &Value, _: &Map<String, Value>) {
    if let Value::Object(map) = value {
        for (pattern, schema) in map {
            if let Err(e) = regex::Regex::new(pattern) {
                ctx.error(format!("invalid regex \"{}\": {}", pattern, e));
            }
            ctx.check_subschema(&[pattern], schema);
        }
    } else {
        expect_type(ctx, value, &[NodeType::Object]);
    }
}

fn check_bool_or_schema(ctx: &mut SyntaxContext<'_>, value: &Value, _: &Map<String, Value>) {
    match value {
        Value::Bool(_) => {}
        Value::Object(_) => ctx.check_subschema(&[], value),
        other => {
            expect_type(ctx, other, &[NodeType::Boolean, NodeType::Object]);
        }
    }
}

fn check_items(ctx: &mut SyntaxContext<'_>, value: &Value, _: &Map<String, Value>) {
    match value {
        Value::Object(_) => ctx.check_subschema(&[], value),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                ctx.check_subschema(&[&i.to_string()], item);
            }
        }
        other => {
            expect_type(ctx, other, &[NodeType::Object, NodeType::Array]);
        }
    }
}

fn check_dependencies(ctx: &mut SyntaxContext<'_>, value: &Value, _: &Map<String, Value>) {
    let Value::Object(map) = value else {
        expect_type(ctx, value, &[NodeType::Object]);
        return;
    };
    for (name, dependency) in map {
        match dependency {
            Value::String(_) => {}
            Value::Array(items) => {
                if !items.iter().all(Value::is_string) {
                    ctx.error(format!(
                        "dependency list of \"{}\" must contain only property names",
                        name
                    ));
                }
            }
            Value::Object(_) => ctx.check_subschema(&[name], dependency),
            other => ctx.error(format!(
                "dependency of \"{}\" must be a string, array or schema, got {}",
                name,
                json_type_name(other)
            )),
        }
    }
}

fn check_divisible_by(ctx: &mut SyntaxContext<'_>, value: &Value, _: &Map<String, Value>) {
    if !expect_type(ctx, value, NodeType::NUMERIC) {
        return;
    }
    if value.as_f64().map(|n| n <= 0.0).unwrap_or(true) {
        ctx.error("divisibleBy must be strictly positive");
    }
}

fn check_exclusive(ctx: &mut SyntaxContext<'_>, value: &Value, schema: &Map<String, Value>) {
    if !expect_type(ctx, value, &[NodeType::Boolean]) {
        return;
    }
    let keyword = ctx.keyword;
    let bound = if keyword == "exclusiveMinimum" {
        "minimum"
    } else {
        "maximum"
    };
    if !schema.contains_key(bound) {
        ctx.error(format!("{} requires {} to be present", keyword, bound));
    }
}

fn check_size_bound(ctx: &mut SyntaxContext<'_>, value: &Value, schema: &Map<String, Value>) {
    if value.as_u64().is_none() {
        if value.as_i64().is_some() {
            ctx.error("must not be negative");
        } else {
            ctx.error(format!(
                "expected non-negative integer, got {}",
                json_type_name(value)
            ));
        }
        return;
    }

    // Only the lower bound compares, so each pair is reported once.
    let keyword = ctx.keyword;
    let upper = match keyword {
        "minLength" => "maxLength",
        "minItems" => "maxItems",
        _ => return,
    };
    if let (Some(min), Some(max)) = (value.as_u64(), schema.get(upper).and_then(Value::as_u64)) {
        if min > max {
            ctx.error(format!("{} ({}) is greater than {} ({})", keyword, min, upper, max));
        }
    }
}

fn check_pattern(ctx: &mut SyntaxContext<'_>, value: &Value, _: &Map<String, Value>) {
    if let Value::String(pattern) = value {
        if let Err(e) = regex::Regex::new(pattern) {
            ctx.error(format!("invalid regex \"{}\": {}", pattern, e));
        }
    } else {
        expect_type(ctx, value, &[NodeType::String]);
    }
}

fn has_duplicates(items: &[Value]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, a)| items[i + 1..].iter().any(|b| json_equal(a, b)))
}
