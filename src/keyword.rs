//! Keyword validators and the provider that selects them per instance type.
//!
//! A validator checks one instance node against one keyword. Keywords that
//! point at another schema (`$ref`, `extends`, schema dependencies) do not
//! validate anything themselves; they return [`Status::DeferTo`] and the
//! recursive validator checks the same node against the target. Schemas
//! inside a `type` or `disallow` union come back as [`Status::AnyOf`] and
//! [`Status::NoneOf`] for the same reason.

use std::cmp::Ordering;
use std::net::{Ipv4Addr, Ipv6Addr};

use regex::Regex;
use serde_json::{Map, Number, Value};

use crate::error::ResolveError;
use crate::registry::SchemaNode;
use crate::types::{json_equal, NodeType};

const ANY: &[NodeType] = NodeType::ALL;
const NUMERIC: &[NodeType] = NodeType::NUMERIC;
const STRING: &[NodeType] = &[NodeType::String];
const ARRAY: &[NodeType] = &[NodeType::Array];
const OBJECT: &[NodeType] = &[NodeType::Object];

/// Outcome of one keyword check.
#[derive(Debug, Clone)]
pub enum Status {
    Success,
    Failure(Vec<String>),
    /// Validate the same instance node against this schema instead.
    DeferTo(SchemaNode),
    /// Passes if the node validates against at least one of `schemas`.
    AnyOf {
        schemas: Vec<SchemaNode>,
        message: String,
    },
    /// Passes if the node validates against none of `schemas`.
    NoneOf {
        schemas: Vec<SchemaNode>,
        message: String,
    },
}

impl Status {
    fn fail(message: impl Into<String>) -> Self {
        Status::Failure(vec![message.into()])
    }

    fn check(ok: bool, message: impl FnOnce() -> String) -> Self {
        if ok {
            Status::Success
        } else {
            Status::fail(message())
        }
    }
}

/// The value of `type` or `disallow`: type names plus the array positions
/// that hold schemas.
#[derive(Debug, Clone)]
pub struct TypeUnion {
    schema: SchemaNode,
    keyword: &'static str,
    names: Vec<String>,
    alternatives: Vec<usize>,
}

impl TypeUnion {
    fn new(schema: &SchemaNode, keyword: &'static str, value: &Value) -> Self {
        let mut names = Vec::new();
        let mut alternatives = Vec::new();
        match value {
            Value::String(name) => names.push(name.clone()),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    match item {
                        Value::String(name) => names.push(name.clone()),
                        Value::Object(_) => alternatives.push(i),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        Self {
            schema: schema.clone(),
            keyword,
            names,
            alternatives,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    fn matches(&self, ty: NodeType) -> bool {
        self.names.iter().any(|n| ty.matches_name(n))
    }

    fn schemas(&self) -> Result<Vec<SchemaNode>, ResolveError> {
        self.alternatives
            .iter()
            .map(|i| self.schema.descend(&[self.keyword, i.to_string().as_str()]))
            .collect()
    }

    fn describe(&self) -> String {
        let mut parts: Vec<&str> = self.names.iter().map(String::as_str).collect();
        if !self.alternatives.is_empty() {
            parts.push("a matching schema");
        }
        parts.join(" or ")
    }
}

/// One keyword of one schema, ready to run against instance nodes.
#[derive(Debug, Clone)]
pub enum KeywordValidator {
    Type(TypeUnion),
    Disallow(TypeUnion),
    Enum(Vec<Value>),
    Ref { schema: SchemaNode, target: Value },
    /// `extends`; `index` is set when the keyword holds an array.
    Extends { schema: SchemaNode, index: Option<usize> },
    Minimum { limit: Number, exclusive: bool },
    Maximum { limit: Number, exclusive: bool },
    DivisibleBy(Number),
    MinLength(u64),
    MaxLength(u64),
    Pattern {
        source: String,
        regex: Result<Regex, regex::Error>,
    },
    Format(String),
    MinItems(u64),
    MaxItems(u64),
    UniqueItems,
    /// `additionalItems: false` after a tuple of `max` items.
    AdditionalItems { max: usize },
    /// Members declared `"required": true` under `properties`.
    Required(Vec<String>),
    AdditionalProperties {
        properties: Vec<String>,
        patterns: Vec<Regex>,
    },
    PropertyDependency { property: String, required: Vec<String> },
    SchemaDependency { schema: SchemaNode, property: String },
}

impl KeywordValidator {
    /// Keyword name used in validation messages.
    pub fn keyword(&self) -> &'static str {
        match self {
            KeywordValidator::Type(_) => "type",
            KeywordValidator::Disallow(_) => "disallow",
            KeywordValidator::Enum(_) => "enum",
            KeywordValidator::Ref { .. } => "$ref",
            KeywordValidator::Extends { .. } => "extends",
            KeywordValidator::Minimum { .. } => "minimum",
            KeywordValidator::Maximum { .. } => "maximum",
            KeywordValidator::DivisibleBy(_) => "divisibleBy",
            KeywordValidator::MinLength(_) => "minLength",
            KeywordValidator::MaxLength(_) => "maxLength",
            KeywordValidator::Pattern { .. } => "pattern",
            KeywordValidator::Format(_) => "format",
            KeywordValidator::MinItems(_) => "minItems",
            KeywordValidator::MaxItems(_) => "maxItems",
            KeywordValidator::UniqueItems => "uniqueItems",
            KeywordValidator::AdditionalItems { .. } => "additionalItems",
            KeywordValidator::Required(_) => "required",
            KeywordValidator::AdditionalProperties { .. } => "additionalProperties",
            KeywordValidator::PropertyDependency { .. }
            | KeywordValidator::SchemaDependency { .. } => "dependencies",
        }
    }

    /// Instance types this keyword constrains. Other types skip it.
    pub fn applies_to(&self) -> &'static [NodeType] {
        match self {
            KeywordValidator::Type(_)
            | KeywordValidator::Disallow(_)
            | KeywordValidator::Enum(_)
            | KeywordValidator::Ref { .. }
            | KeywordValidator::Extends { .. }
            | KeywordValidator::Format(_) => ANY,
            KeywordValidator::Minimum { .. }
            | KeywordValidator::Maximum { .. }
            | KeywordValidator::DivisibleBy(_) => NUMERIC,
            KeywordValidator::MinLength(_)
            | KeywordValidator::MaxLength(_)
            | KeywordValidator::Pattern { .. } => STRING,
            KeywordValidator::MinItems(_)
            | KeywordValidator::MaxItems(_)
            | KeywordValidator::UniqueItems
            | KeywordValidator::AdditionalItems { .. } => ARRAY,
            KeywordValidator::Required(_)
            | KeywordValidator::AdditionalProperties { .. }
            | KeywordValidator::PropertyDependency { .. }
            | KeywordValidator::SchemaDependency { .. } => OBJECT,
        }
    }

    /// Check `value` against this keyword.
    ///
    /// # Errors
    ///
    /// Only deferring keywords fail, when their target cannot be resolved.
    pub fn validate(&self, value: &Value) -> Result<Status, ResolveError> {
        let ty = NodeType::of(value);
        let status = match self {
            KeywordValidator::Type(union) => {
                let message = || format!("expected {}, got {}", union.describe(), ty);
                if union.matches(ty) {
                    Status::Success
                } else if union.alternatives.is_empty() {
                    Status::fail(message())
                } else {
                    Status::AnyOf {
                        schemas: union.schemas()?,
                        message: message(),
                    }
                }
            }
            KeywordValidator::Disallow(union) => {
                if union.matches(ty) {
                    Status::fail(format!("instance type {} is disallowed", ty))
                } else if union.alternatives.is_empty() {
                    Status::Success
                } else {
                    Status::NoneOf {
                        schemas: union.schemas()?,
                        message: "instance matches a disallowed schema".to_string(),
                    }
                }
            }
            KeywordValidator::Enum(allowed) => {
                Status::check(allowed.iter().any(|v| json_equal(v, value)), || {
                    format!("{} is not one of the enumerated values", value)
                })
            }
            KeywordValidator::Ref { schema, target } => Status::DeferTo(schema.follow(target)?),
            KeywordValidator::Extends { schema, index } => {
                let node = match index {
                    Some(i) => schema.descend(&["extends", i.to_string().as_str()])?,
                    None => schema.descend(&["extends"])?,
                };
                Status::DeferTo(node)
            }
            KeywordValidator::Minimum { limit, exclusive } => {
                bound(value, limit, *exclusive, Ordering::Less, "lower", "minimum")
            }
            KeywordValidator::Maximum { limit, exclusive } => {
                bound(value, limit, *exclusive, Ordering::Greater, "greater", "maximum")
            }
            KeywordValidator::DivisibleBy(divisor) => divisible_by(value, divisor),
            KeywordValidator::MinLength(min) => {
                let len = string_length(value);
                Status::check(len >= *min, || {
                    format!("string has length {}, minimum is {}", len, min)
                })
            }
            KeywordValidator::MaxLength(max) => {
                let len = string_length(value);
                Status::check(len <= *max, || {
                    format!("string has length {}, maximum is {}", len, max)
                })
            }
            KeywordValidator::Pattern { source, regex } => match regex {
                Ok(re) => {
                    let text = value.as_str().unwrap_or_default();
                    Status::check(re.is_match(text), || {
                        format!("\"{}\" does not match pattern \"{}\"", text, source)
                    })
                }
                Err(e) => Status::fail(format!("invalid regex \"{}\": {}", source, e)),
            },
            KeywordValidator::Format(format) => check_format(format, value),
            KeywordValidator::MinItems(min) => {
                let len = array_length(value);
                Status::check(len >= *min, || {
                    format!("array has {} items, minimum is {}", len, min)
                })
            }
            KeywordValidator::MaxItems(max) => {
                let len = array_length(value);
                Status::check(len <= *max, || {
                    format!("array has {} items, maximum is {}", len, max)
                })
            }
            KeywordValidator::UniqueItems => unique_items(value),
            KeywordValidator::AdditionalItems { max } => {
                let len = value.as_array().map(Vec::len).unwrap_or(0);
                Status::check(len <= *max, || {
                    format!("array has {} items but only {} are allowed", len, max)
                })
            }
            KeywordValidator::Required(names) => {
                let missing: Vec<String> = names
                    .iter()
                    .filter(|name| value.get(name.as_str()).is_none())
                    .map(|name| format!("missing required property \"{}\"", name))
                    .collect();
                if missing.is_empty() {
                    Status::Success
                } else {
                    Status::Failure(missing)
                }
            }
            KeywordValidator::AdditionalProperties {
                properties,
                patterns,
            } => additional_properties(value, properties, patterns),
            KeywordValidator::PropertyDependency { property, required } => {
                if value.get(property).is_none() {
                    return Ok(Status::Success);
                }
                let missing: Vec<String> = required
                    .iter()
                    .filter(|name| value.get(name.as_str()).is_none())
                    .map(|name| format!("property \"{}\" requires \"{}\"", property, name))
                    .collect();
                if missing.is_empty() {
                    Status::Success
                } else {
                    Status::Failure(missing)
                }
            }
            KeywordValidator::SchemaDependency { schema, property } => {
                if value.get(property).is_none() {
                    return Ok(Status::Success);
                }
                Status::DeferTo(schema.descend(&["dependencies", property.as_str()])?)
            }
        };
        Ok(status)
    }
}

/// Validators for the keywords of `schema` that apply to an instance of type
/// `ty`, in the order the keywords appear in the schema.
pub fn get_validators(schema: &SchemaNode, ty: NodeType) -> Vec<KeywordValidator> {
    let Some(map) = schema.as_object() else {
        return Vec::new();
    };

    let mut validators = Vec::new();
    for (keyword, value) in map {
        build(schema, map, keyword, value, &mut validators);
    }
    validators.retain(|v| v.applies_to().contains(&ty));
    validators
}

fn build(
    schema: &SchemaNode,
    map: &Map<String, Value>,
    keyword: &str,
    value: &Value,
    out: &mut Vec<KeywordValidator>,
) {
    let exclusive = |flag: &str| map.get(flag).and_then(Value::as_bool).unwrap_or(false);

    match (keyword, value) {
        ("type", _) => out.push(KeywordValidator::Type(TypeUnion::new(schema, "type", value))),
        ("disallow", _) => out.push(KeywordValidator::Disallow(TypeUnion::new(
            schema, "disallow", value,
        ))),
        ("enum", Value::Array(items)) => out.push(KeywordValidator::Enum(items.clone())),
        ("$ref", _) => out.push(KeywordValidator::Ref {
            schema: schema.clone(),
            target: value.clone(),
        }),
        ("extends", Value::Object(_)) => out.push(KeywordValidator::Extends {
            schema: schema.clone(),
            index: None,
        }),
        ("extends", Value::Array(items)) => {
            out.extend((0..items.len()).map(|i| KeywordValidator::Extends {
                schema: schema.clone(),
                index: Some(i),
            }))
        }
        ("minimum", Value::Number(limit)) => out.push(KeywordValidator::Minimum {
            limit: limit.clone(),
            exclusive: exclusive("exclusiveMinimum"),
        }),
        ("maximum", Value::Number(limit)) => out.push(KeywordValidator::Maximum {
            limit: limit.clone(),
            exclusive: exclusive("exclusiveMaximum"),
        }),
        ("divisibleBy", Value::Number(divisor)) => {
            out.push(KeywordValidator::DivisibleBy(divisor.clone()))
        }
        ("minLength", _) => push_size(out, value, KeywordValidator::MinLength),
        ("maxLength", _) => push_size(out, value, KeywordValidator::MaxLength),
        ("minItems", _) => push_size(out, value, KeywordValidator::MinItems),
        ("maxItems", _) => push_size(out, value, KeywordValidator::MaxItems),
        ("pattern", Value::String(p)) => out.push(KeywordValidator::Pattern {
            source: p.clone(),
            regex: schema.pattern(p),
        }),
        ("format", Value::String(f)) => out.push(KeywordValidator::Format(f.clone())),
        ("uniqueItems", Value::Bool(true)) => out.push(KeywordValidator::UniqueItems),
        ("additionalItems", Value::Bool(false)) => {
            if let Some(Value::Array(tuple)) = map.get("items") {
                out.push(KeywordValidator::AdditionalItems { max: tuple.len() });
            }
        }
        ("properties", Value::Object(properties)) => {
            let required: Vec<String> = properties
                .iter()
                .filter(|(_, s)| s.get("required").and_then(Value::as_bool) == Some(true))
                .map(|(name, _)| name.clone())
                .collect();
            if !required.is_empty() {
                out.push(KeywordValidator::Required(required));
            }
        }
        ("additionalProperties", Value::Bool(false)) => {
            out.push(KeywordValidator::AdditionalProperties {
                properties: object_keys(map.get("properties")),
                patterns: object_keys(map.get("patternProperties"))
                    .iter()
                    .filter_map(|p| schema.pattern(p).ok())
                    .collect(),
            })
        }
        ("dependencies", Value::Object(dependencies)) => {
            for (property, dependency) in dependencies {
                let property = property.clone();
                match dependency {
                    Value::String(name) => out.push(KeywordValidator::PropertyDependency {
                        property,
                        required: vec![name.clone()],
                    }),
                    Value::Array(names) => out.push(KeywordValidator::PropertyDependency {
                        property,
                        required: names
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect(),
                    }),
                    Value::Object(_) => out.push(KeywordValidator::SchemaDependency {
                        schema: schema.clone(),
                        property,
                    }),
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

fn push_size(out: &mut Vec<KeywordValidator>, value: &Value, make: fn(u64) -> KeywordValidator) {
    if let Some(n) = value.as_u64() {
        out.push(make(n));
    }
}

fn object_keys(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_object)
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}

/// Compare two JSON numbers by mathematical value.
fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return Some(x.cmp(&y));
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

fn bound(
    value: &Value,
    limit: &Number,
    exclusive: bool,
    outside: Ordering,
    word: &str,
    keyword: &str,
) -> Status {
    let Value::Number(n) = value else {
        return Status::Success;
    };
    match compare_numbers(n, limit) {
        Some(Ordering::Equal) if exclusive => Status::fail(format!(
            "{} is equal to the exclusive {} {}",
            n, keyword, limit
        )),
        Some(ord) if ord == outside => Status::fail(format!(
            "{} is {} than the required {} {}",
            n, word, keyword, limit
        )),
        Some(_) => Status::Success,
        None => Status::fail(format!("cannot compare {} with {}", n, limit)),
    }
}

fn divisible_by(value: &Value, divisor: &Number) -> Status {
    let Value::Number(n) = value else {
        return Status::Success;
    };
    let divisible = match (n.as_i64(), divisor.as_i64()) {
        (Some(x), Some(d)) if d != 0 => x % d == 0,
        _ => match (n.as_f64(), divisor.as_f64()) {
            (Some(x), Some(d)) if d != 0.0 => {
                let q = x / d;
                (q - q.round()).abs() <= f64::EPSILON * q.abs().max(1.0) * 4.0
            }
            _ => false,
        },
    };
    Status::check(divisible, || format!("{} is not divisible by {}", n, divisor))
}

fn string_length(value: &Value) -> u64 {
    value.as_str().map(|s| s.chars().count() as u64).unwrap_or(0)
}

fn array_length(value: &Value) -> u64 {
    value.as_array().map(|a| a.len() as u64).unwrap_or(0)
}

fn unique_items(value: &Value) -> Status {
    let Value::Array(items) = value else {
        return Status::Success;
    };
    for (i, a) in items.iter().enumerate() {
        if let Some(j) = items[i + 1..].iter().position(|b| json_equal(a, b)) {
            return Status::fail(format!(
                "items at index {} and {} are equal",
                i,
                i + 1 + j
            ));
        }
    }
    Status::Success
}

fn additional_properties(value: &Value, properties: &[String], patterns: &[Regex]) -> Status {
    let Value::Object(map) = value else {
        return Status::Success;
    };
    let extra: Vec<String> = map
        .keys()
        .filter(|name| !properties.contains(name))
        .filter(|name| !patterns.iter().any(|re| re.is_match(name)))
        .map(|name| format!("additional property \"{}\" is not allowed", name))
        .collect();
    if extra.is_empty() {
        Status::Success
    } else {
        Status::Failure(extra)
    }
}

fn check_format(format: &str, value: &Value) -> Status {
    let valid = match (format, value) {
        ("utc-millisec", _) => value.is_number(),
        (_, Value::String(s)) => match format {
            "date-time" => is_date_time(s),
            "date" => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
            "time" => chrono::NaiveTime::parse_from_str(s, "%H:%M:%S").is_ok(),
            "regex" => Regex::new(s).is_ok(),
            "uri" => url::Url::parse(s).is_ok(),
            "email" => is_email(s),
            "ip-address" => s.parse::<Ipv4Addr>().is_ok(),
            "ipv6" => s.parse::<Ipv6Addr>().is_ok(),
            "host-name" => is_host_name(s),
            _ => true,
        },
        _ => true,
    };
    Status::check(valid, || format!("{} is not a valid {}", value, format))
}

fn is_date_time(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ").is_ok()
}

fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !s.chars().any(char::is_whitespace)
}

fn is_host_name(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 255
        && s.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::JsonRef;
    use crate::registry::SchemaRegistry;
    use serde_json::json;

    fn node(schema: Value) -> SchemaNode {
        let registry = SchemaRegistry::new();
        let reference = registry.register_root(schema).unwrap();
        registry.get_schema(&reference).unwrap()
    }

    fn run(schema: Value, instance: Value) -> Vec<Status> {
        let schema = node(schema);
        get_validators(&schema, NodeType::of(&instance))
            .iter()
            .map(|v| v.validate(&instance).unwrap())
            .collect()
    }

    fn failures(schema: Value, instance: Value) -> Vec<String> {
        run(schema, instance)
            .into_iter()
            .flat_map(|s| match s {
                Status::Failure(messages) => messages,
                _ => Vec::new(),
            })
            .collect()
    }

    #[test]
    fn inapplicable_keywords_are_skipped() {
        let schema = node(json!({"minimum": 0, "maxLength": 2, "type": "any"}));
        let for_string = get_validators(&schema, NodeType::String);
        let names: Vec<&str> = for_string.iter().map(KeywordValidator::keyword).collect();
        assert_eq!(names, vec!["maxLength", "type"]);

        let for_number = get_validators(&schema, NodeType::Integer);
        let names: Vec<&str> = for_number.iter().map(KeywordValidator::keyword).collect();
        assert_eq!(names, vec!["minimum", "type"]);
    }

    #[test]
    fn minimum_and_maximum() {
        assert!(failures(json!({"minimum": 0}), json!(0)).is_empty());
        assert_eq!(
            failures(json!({"minimum": 0}), json!(-1)),
            vec!["-1 is lower than the required minimum 0"]
        );
        assert_eq!(
            failures(json!({"minimum": 0, "exclusiveMinimum": true}), json!(0)).len(),
            1
        );
        assert!(failures(json!({"maximum": 1.5}), json!(1)).is_empty());
        assert_eq!(failures(json!({"maximum": 1.5}), json!(2)).len(), 1);
    }

    #[test]
    fn type_and_disallow() {
        assert!(failures(json!({"type": "number"}), json!(3)).is_empty());
        assert_eq!(
            failures(json!({"type": ["string", "null"]}), json!(3)),
            vec!["expected string or null, got integer"]
        );
        assert!(failures(json!({"type": "any"}), json!({})).is_empty());
        assert_eq!(failures(json!({"disallow": "integer"}), json!(3)).len(), 1);
        assert!(failures(json!({"disallow": "integer"}), json!(3.5)).is_empty());
    }

    #[test]
    fn type_union_with_schemas() {
        let schema = json!({"type": ["string", {"type": "integer"}]});
        assert!(matches!(run(schema.clone(), json!("x")).as_slice(), [Status::Success]));
        match run(schema, json!(true)).as_slice() {
            [Status::AnyOf { schemas, message }] => {
                let pointers: Vec<&str> = schemas.iter().map(SchemaNode::pointer).collect();
                assert_eq!(pointers, vec!["/type/1"]);
                assert_eq!(message, "expected string or a matching schema, got boolean");
            }
            other => panic!("expected a schema alternative, got {:?}", other),
        }

        let schema = json!({"disallow": ["null", {"type": "integer"}]});
        assert_eq!(failures(schema.clone(), json!(null)).len(), 1);
        assert!(matches!(
            run(schema, json!(1)).as_slice(),
            [Status::NoneOf { schemas, .. }] if schemas.len() == 1
        ));
        assert!(failures(json!({"disallow": [{"type": "integer"}]}), json!(1)).is_empty());
    }

    #[test]
    fn enum_compares_numbers_by_value() {
        assert!(failures(json!({"enum": [1, "a"]}), json!(1.0)).is_empty());
        assert_eq!(failures(json!({"enum": [1, "a"]}), json!("b")).len(), 1);
    }

    #[test]
    fn divisible_by() {
        assert!(failures(json!({"divisibleBy": 3}), json!(9)).is_empty());
        assert_eq!(failures(json!({"divisibleBy": 3}), json!(10)).len(), 1);
        assert!(failures(json!({"divisibleBy": 0.1}), json!(0.3)).is_empty());
        assert_eq!(failures(json!({"divisibleBy": 0.5}), json!(0.7)).len(), 1);
    }

    #[test]
    fn string_keywords() {
        assert!(failures(json!({"minLength": 2}), json!("éé")).is_empty());
        assert_eq!(failures(json!({"maxLength": 1}), json!("ab")).len(), 1);
        assert!(failures(json!({"pattern": "^a+$"}), json!("aaa")).is_empty());
        assert_eq!(failures(json!({"pattern": "^a+$"}), json!("ab")).len(), 1);
        assert!(failures(json!({"pattern": "b"}), json!("abc")).is_empty());
    }

    #[test]
    fn formats() {
        let ok = [
            ("date-time", json!("2012-04-01T10:00:00Z")),
            ("date", json!("2012-04-01")),
            ("time", json!("23:59:59")),
            ("regex", json!("^[a-z]+$")),
            ("uri", json!("http://example.com/a?b#c")),
            ("email", json!("someone@example.com")),
            ("ip-address", json!("192.168.0.1")),
            ("ipv6", json!("::1")),
            ("host-name", json!("www.example.com")),
            ("utc-millisec", json!(1333274400000u64)),
            ("color", json!("no such format")),
        ];
        for (format, value) in ok {
            assert!(
                failures(json!({ "format": format }), value.clone()).is_empty(),
                "{} {}",
                format,
                value
            );
        }

        let bad = [
            ("date-time", json!("yesterday")),
            ("date", json!("2012-13-01")),
            ("time", json!("25:00:00")),
            ("regex", json!("(")),
            ("uri", json!("a b")),
            ("email", json!("no-at-sign")),
            ("ip-address", json!("256.1.1.1")),
            ("ipv6", json!("1.2.3.4")),
            ("host-name", json!("-bad-.com")),
            ("utc-millisec", json!("now")),
            ("utc-millisec", json!(true)),
            ("utc-millisec", json!(null)),
            ("utc-millisec", json!({})),
            ("uri", json!("relative/path")),
        ];
        for (format, value) in bad {
            assert_eq!(
                failures(json!({ "format": format }), value.clone()).len(),
                1,
                "{} {}",
                format,
                value
            );
        }
    }

    #[test]
    fn array_keywords() {
        assert_eq!(failures(json!({"minItems": 2}), json!([1])).len(), 1);
        assert_eq!(failures(json!({"maxItems": 1}), json!([1, 2])).len(), 1);
        assert_eq!(
            failures(json!({"uniqueItems": true}), json!([1, 2, 1.0])),
            vec!["items at index 0 and 2 are equal"]
        );
        assert!(failures(json!({"uniqueItems": false}), json!([1, 1])).is_empty());

        let tuple = json!({"items": [{}, {}], "additionalItems": false});
        assert!(failures(tuple.clone(), json!([1, 2])).is_empty());
        assert_eq!(failures(tuple, json!([1, 2, 3])).len(), 1);
        assert!(failures(json!({"items": {}, "additionalItems": false}), json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn object_keywords() {
        let schema = json!({
            "properties": { "a": { "required": true }, "b": {} },
            "patternProperties": { "^x-": {} },
            "additionalProperties": false
        });
        assert!(failures(schema.clone(), json!({"a": 1, "x-extra": 2})).is_empty());
        assert_eq!(
            failures(schema.clone(), json!({"b": 1})),
            vec!["missing required property \"a\""]
        );
        assert_eq!(
            failures(schema, json!({"a": 1, "c": 2})),
            vec!["additional property \"c\" is not allowed"]
        );
    }

    #[test]
    fn property_dependencies() {
        let schema = json!({"dependencies": {"a": "b", "c": ["d", "e"]}});
        assert!(failures(schema.clone(), json!({"b": 1})).is_empty());
        assert_eq!(failures(schema.clone(), json!({"a": 1})).len(), 1);
        assert_eq!(failures(schema, json!({"c": 1, "d": 2})).len(), 1);
    }

    #[test]
    fn deferring_keywords() {
        let statuses = run(
            json!({
                "$ref": "#/definitions/x",
                "extends": [{"type": "integer"}, {"minimum": 1}],
                "dependencies": {"a": {"type": "object"}},
                "definitions": {"x": {"type": "integer"}}
            }),
            json!({"a": 1}),
        );
        let targets: Vec<String> = statuses
            .iter()
            .map(|s| match s {
                Status::DeferTo(node) => node.pointer().to_string(),
                other => panic!("expected deferral, got {:?}", other),
            })
            .collect();
        assert_eq!(
            targets,
            vec!["/definitions/x", "/extends/0", "/extends/1", "/dependencies/a"]
        );
    }

    #[test]
    fn schema_dependency_without_property_succeeds() {
        let statuses = run(json!({"dependencies": {"a": {"type": "string"}}}), json!({}));
        assert!(matches!(statuses.as_slice(), [Status::Success]));
    }

    #[test]
    fn dangling_ref_is_an_error() {
        let schema = node(json!({"$ref": "#/definitions/missing"}));
        let validators = get_validators(&schema, NodeType::Null);
        let err = validators[0].validate(&Value::Null).unwrap_err();
        assert!(matches!(err, ResolveError::DanglingReference { .. }));
        assert_eq!(schema.reference(), JsonRef::empty());
    }
}
