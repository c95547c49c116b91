//! Recursive validation of instances against schemas.
//!
//! Each node is checked against every applicable keyword of its schema. A
//! failing keyword does not stop the others at the same node, but a node that
//! failed is not descended into. Every child of a passing node is visited.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use crate::error::{ResolveError, ValidateError, ValidationMessage};
use crate::instance::Instance;
use crate::keyword::{get_validators, Status};
use crate::path::{select_path_provider, PathProvider};
use crate::reference::JsonRef;
use crate::registry::{SchemaNode, SchemaRegistry};

/// Messages accumulated by one top-level validation call.
#[derive(Debug, Default)]
pub struct ValidationState {
    messages: Vec<ValidationMessage>,
    /// Schema/instance pairs currently being evaluated, to stop `$ref` loops.
    active: HashSet<(JsonRef, String)>,
}

impl ValidationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ValidationMessage] {
        &self.messages
    }

    fn record(&mut self, instance: &Instance<'_>, keyword: &str, messages: Vec<String>) {
        self.messages
            .extend(messages.into_iter().map(|message| ValidationMessage {
                path: instance.pointer().to_string(),
                keyword: keyword.to_string(),
                message,
            }));
    }
}

/// Result of validating one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationMessage>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// `Ok(())` when valid, otherwise `ValidateError::Invalid`.
    pub fn into_result(self) -> Result<(), ValidateError> {
        if self.valid {
            Ok(())
        } else {
            Err(ValidateError::Invalid {
                errors: self.errors,
            })
        }
    }
}

/// A schema bound to a registry, reusable across instances.
#[derive(Debug, Clone)]
pub struct Validator {
    root: SchemaNode,
}

impl Validator {
    /// Resolve `schema` in `registry`.
    ///
    /// # Errors
    ///
    /// Fails if the schema document cannot be loaded or the fragment dangles.
    pub fn new(registry: &SchemaRegistry, schema: &JsonRef) -> Result<Self, ResolveError> {
        Ok(Self {
            root: registry.get_schema(schema)?,
        })
    }

    /// Register `schema` as the root of a fresh registry.
    pub fn from_value(schema: Value) -> Result<Self, ResolveError> {
        let registry = SchemaRegistry::new();
        let reference = registry.register_root(schema)?;
        Self::new(&registry, &reference)
    }

    pub fn schema(&self) -> &SchemaNode {
        &self.root
    }

    /// Validate one instance.
    ///
    /// # Errors
    ///
    /// Returns a `ResolveError` if a schema reached during validation cannot
    /// be resolved. Keyword failures are reported in the returned report.
    pub fn validate(&self, instance: &Value) -> Result<ValidationReport, ResolveError> {
        let mut state = ValidationState::new();
        let valid = validate_node(&mut state, &self.root, &Instance::root(instance))?;
        Ok(ValidationReport {
            valid,
            errors: state.messages,
        })
    }
}

/// Validate an instance against an in-memory schema.
///
/// # Errors
///
/// Returns `ValidateError::Resolve` if the schema is malformed or one of its
/// references cannot be resolved, or `ValidateError::Invalid` if the instance
/// doesn't match the schema.
pub fn validate(schema: &Value, instance: &Value) -> Result<(), ValidateError> {
    Validator::from_value(schema.clone())?
        .validate(instance)?
        .into_result()
}

/// Validate an instance against the schema `reference` names in `registry`.
pub fn validate_with(
    registry: &SchemaRegistry,
    reference: &JsonRef,
    instance: &Value,
) -> Result<ValidationReport, ResolveError> {
    Validator::new(registry, reference)?.validate(instance)
}

/// Validate `instance` against `schema`, appending failures to `state`.
///
/// Returns whether the instance node (and all its descendants) passed.
pub fn validate_node(
    state: &mut ValidationState,
    schema: &SchemaNode,
    instance: &Instance<'_>,
) -> Result<bool, ResolveError> {
    let key = (schema.reference(), instance.pointer().to_string());
    if !state.active.insert(key.clone()) {
        tracing::trace!(schema = %key.0, path = instance.pointer(), "schema cycle, skipping");
        return Ok(true);
    }
    let result = evaluate(state, schema, instance);
    state.active.remove(&key);
    result
}

fn evaluate(
    state: &mut ValidationState,
    schema: &SchemaNode,
    instance: &Instance<'_>,
) -> Result<bool, ResolveError> {
    let ty = instance.node_type();
    let mut valid = true;

    for validator in get_validators(schema, ty) {
        tracing::trace!(
            keyword = validator.keyword(),
            path = instance.pointer(),
            "evaluating keyword"
        );
        match validator.validate(instance.value())? {
            Status::Success => {}
            Status::Failure(messages) => {
                state.record(instance, validator.keyword(), messages);
                valid = false;
            }
            Status::DeferTo(target) => {
                if !validate_node(state, &target, instance)? {
                    valid = false;
                }
            }
            Status::AnyOf { schemas, message } => {
                if !any_accepts(state, &schemas, instance)? {
                    state.record(instance, validator.keyword(), vec![message]);
                    valid = false;
                }
            }
            Status::NoneOf { schemas, message } => {
                if any_accepts(state, &schemas, instance)? {
                    state.record(instance, validator.keyword(), vec![message]);
                    valid = false;
                }
            }
        }
    }

    if !valid {
        return Ok(false);
    }

    let provider = select_path_provider(ty, schema);
    if provider == PathProvider::Scalar {
        return Ok(true);
    }

    for child in instance.children() {
        let Some(element) = child.path_element() else {
            continue;
        };
        for child_schema in provider.child_schemas(schema, element)? {
            if !validate_node(state, &child_schema, &child)? {
                valid = false;
            }
        }
    }
    Ok(valid)
}

/// Whether `instance` passes any of `schemas`. Messages from the attempts are
/// discarded.
fn any_accepts(
    state: &ValidationState,
    schemas: &[SchemaNode],
    instance: &Instance<'_>,
) -> Result<bool, ResolveError> {
    for schema in schemas {
        let mut scratch = ValidationState {
            messages: Vec::new(),
            active: state.active.clone(),
        };
        if validate_node(&mut scratch, schema, instance)? {
            return Ok(true);
        }
    }
    Ok(false)
}
