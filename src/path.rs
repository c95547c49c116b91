//! Path providers: which schemas govern a child of the current instance node.

use serde_json::Value;

use crate::error::ResolveError;
use crate::registry::SchemaNode;
use crate::types::{NodeType, PathElement};

/// How children of an instance node find their schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathProvider {
    /// No child has a governing schema (scalars, or nothing to descend into).
    Scalar,
    /// Array elements, by index.
    Array,
    /// Object members, by name.
    Object,
}

/// Pick the path provider for an instance of type `ty` under `schema`.
pub fn select_path_provider(ty: NodeType, schema: &SchemaNode) -> PathProvider {
    let has = |keyword: &str| schema.get(keyword).is_some();
    match ty {
        NodeType::Array if has("items") => PathProvider::Array,
        NodeType::Object
            if has("properties")
                || has("patternProperties")
                || schema.get("additionalProperties").is_some_and(Value::is_object) =>
        {
            PathProvider::Object
        }
        _ => PathProvider::Scalar,
    }
}

impl PathProvider {
    /// Schemas the child at `element` must satisfy. Empty when the child is
    /// unconstrained.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures from the registry.
    pub fn child_schemas(
        &self,
        schema: &SchemaNode,
        element: &PathElement,
    ) -> Result<Vec<SchemaNode>, ResolveError> {
        let paths = match (self, element) {
            (PathProvider::Array, PathElement::Index(i)) => array_paths(schema, *i),
            (PathProvider::Object, PathElement::Field(name)) => object_paths(schema, name),
            _ => Vec::new(),
        };
        paths
            .iter()
            .map(|tokens| {
                let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
                schema.descend(&tokens)
            })
            .collect()
    }
}

fn array_paths(schema: &SchemaNode, index: usize) -> Vec<Vec<String>> {
    match schema.get("items") {
        Some(Value::Object(_)) => vec![vec!["items".to_string()]],
        Some(Value::Array(tuple)) if index < tuple.len() => {
            vec![vec!["items".to_string(), index.to_string()]]
        }
        Some(Value::Array(_)) if schema.get("additionalItems").is_some_and(Value::is_object) => {
            vec![vec!["additionalItems".to_string()]]
        }
        _ => Vec::new(),
    }
}

fn object_paths(schema: &SchemaNode, name: &str) -> Vec<Vec<String>> {
    let mut paths = Vec::new();

    if schema
        .get("properties")
        .and_then(|p| p.get(name))
        .is_some()
    {
        paths.push(vec!["properties".to_string(), name.to_string()]);
    }

    if let Some(Value::Object(patterns)) = schema.get("patternProperties") {
        for pattern in patterns.keys() {
            let matched = schema
                .pattern(pattern)
                .is_ok_and(|re| re.is_match(name));
            if matched {
                paths.push(vec!["patternProperties".to_string(), pattern.clone()]);
            }
        }
    }

    if paths.is_empty() && schema.get("additionalProperties").is_some_and(Value::is_object) {
        paths.push(vec!["additionalProperties".to_string()]);
    }
    paths
}
