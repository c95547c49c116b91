//! Core types shared by the schema and instance sides of the engine.

use std::fmt;

use serde_json::Value;

/// Runtime type of a JSON node, as seen by keyword validators.
///
/// Integers and reals are distinct: `1` is an integer, `1.0` is a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl NodeType {
    /// Every node type, in declaration order.
    pub const ALL: &'static [NodeType] = &[
        NodeType::Null,
        NodeType::Boolean,
        NodeType::Integer,
        NodeType::Number,
        NodeType::String,
        NodeType::Array,
        NodeType::Object,
    ];

    /// Numeric node types.
    pub const NUMERIC: &'static [NodeType] = &[NodeType::Integer, NodeType::Number];

    /// Returns the runtime type of a value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => NodeType::Null,
            Value::Bool(_) => NodeType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => NodeType::Integer,
            Value::Number(_) => NodeType::Number,
            Value::String(_) => NodeType::String,
            Value::Array(_) => NodeType::Array,
            Value::Object(_) => NodeType::Object,
        }
    }

    /// Parse a schema type name. `any` is not a node type and yields `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "null" => Some(NodeType::Null),
            "boolean" => Some(NodeType::Boolean),
            "integer" => Some(NodeType::Integer),
            "number" => Some(NodeType::Number),
            "string" => Some(NodeType::String),
            "array" => Some(NodeType::Array),
            "object" => Some(NodeType::Object),
            _ => None,
        }
    }

    /// Returns the schema type name.
    pub fn name(&self) -> &'static str {
        match self {
            NodeType::Null => "null",
            NodeType::Boolean => "boolean",
            NodeType::Integer => "integer",
            NodeType::Number => "number",
            NodeType::String => "string",
            NodeType::Array => "array",
            NodeType::Object => "object",
        }
    }

    /// Whether a schema type name admits a node of this type.
    ///
    /// `any` admits everything and `number` also admits integers.
    pub fn matches_name(&self, name: &str) -> bool {
        match name {
            "any" => true,
            "number" => matches!(self, NodeType::Integer | NodeType::Number),
            other => self.name() == other,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a child node was reached from its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElement {
    Index(usize),
    Field(String),
}

impl PathElement {
    /// Returns this element as an escaped JSON Pointer token.
    pub fn to_pointer_token(&self) -> String {
        match self {
            PathElement::Index(i) => i.to_string(),
            PathElement::Field(name) => escape_token(name),
        }
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Index(i) => write!(f, "{}", i),
            PathElement::Field(name) => f.write_str(name),
        }
    }
}

/// Escape a JSON Pointer reference token (`~` to `~0`, `/` to `~1`).
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Unescape a JSON Pointer reference token.
pub fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    NodeType::of(value).name()
}

/// Structural equality where numbers compare by mathematical value.
///
/// `serde_json` treats `1` and `1.0` as different values; schemas do not.
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                return x == y;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).map(|w| json_equal(v, w)).unwrap_or(false))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_type_of_distinguishes_integers() {
        assert_eq!(NodeType::of(&json!(1)), NodeType::Integer);
        assert_eq!(NodeType::of(&json!(1.0)), NodeType::Number);
        assert_eq!(NodeType::of(&json!(u64::MAX)), NodeType::Integer);
        assert_eq!(NodeType::of(&json!(null)), NodeType::Null);
        assert_eq!(NodeType::of(&json!({})), NodeType::Object);
    }

    #[test]
    fn number_name_admits_integers() {
        assert!(NodeType::Integer.matches_name("number"));
        assert!(NodeType::Number.matches_name("number"));
        assert!(!NodeType::Number.matches_name("integer"));
        assert!(NodeType::Null.matches_name("any"));
        assert!(!NodeType::String.matches_name("object"));
    }

    #[test]
    fn parse_round_trips_names() {
        for ty in NodeType::ALL {
            assert_eq!(NodeType::parse(ty.name()), Some(*ty));
        }
        assert_eq!(NodeType::parse("any"), None);
    }

    #[test]
    fn pointer_tokens_are_escaped() {
        let elem = PathElement::Field("a/b~c".into());
        assert_eq!(elem.to_pointer_token(), "a~1b~0c");
        assert_eq!(unescape_token("a~1b~0c"), "a/b~c");
        assert_eq!(PathElement::Index(3).to_pointer_token(), "3");
    }

    #[test]
    fn json_equal_ignores_number_representation() {
        assert!(json_equal(&json!(1), &json!(1.0)));
        assert!(json_equal(&json!({"a": [1, 2.0]}), &json!({"a": [1.0, 2]})));
        assert!(!json_equal(&json!([1]), &json!([1, 2])));
        assert!(!json_equal(&json!("1"), &json!(1)));
    }
}
