//! Read-only view of an instance node and how it was reached.

use serde_json::Value;

use crate::types::{NodeType, PathElement};

/// A node of the data tree under validation.
#[derive(Debug, Clone)]
pub struct Instance<'a> {
    value: &'a Value,
    pointer: String,
    element: Option<PathElement>,
}

impl<'a> Instance<'a> {
    /// The root of an instance tree.
    pub fn root(value: &'a Value) -> Self {
        Self {
            value,
            pointer: String::new(),
            element: None,
        }
    }

    pub fn value(&self) -> &'a Value {
        self.value
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::of(self.value)
    }

    /// JSON Pointer from the instance root to this node.
    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    /// How this node was reached from its parent; `None` at the root.
    pub fn path_element(&self) -> Option<&PathElement> {
        self.element.as_ref()
    }

    /// Direct children: array elements by index, object members by name.
    /// Scalars have none.
    pub fn children(&self) -> Vec<Instance<'a>> {
        match self.value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.child(PathElement::Index(i), item))
                .collect(),
            Value::Object(map) => map
                .iter()
                .map(|(name, item)| self.child(PathElement::Field(name.clone()), item))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn child(&self, element: PathElement, value: &'a Value) -> Instance<'a> {
        Instance {
            value,
            pointer: format!("{}/{}", self.pointer, element.to_pointer_token()),
            element: Some(element),
        }
    }
}
