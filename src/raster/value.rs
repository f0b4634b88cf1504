//! Annotation values and the fragment layers that carry them

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Integer,
    Float,
    Text,
    Duration,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Duration => "duration",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw annotation value attached to a markable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum AnnotationValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Duration(Duration),
}

impl AnnotationValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            AnnotationValue::Integer(_) => ValueKind::Integer,
            AnnotationValue::Float(_) => ValueKind::Float,
            AnnotationValue::Text(_) => ValueKind::Text,
            AnnotationValue::Duration(_) => ValueKind::Duration,
        }
    }
}

/// Layer of derived values rasterized alongside its container
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FragmentLayer {
    pub id: String,
    pub value_kind: ValueKind,
}

impl FragmentLayer {
    pub fn new(id: impl Into<String>, value_kind: ValueKind) -> Self {
        Self {
            id: id.into(),
            value_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kinds() {
        assert_eq!(AnnotationValue::Text("x".into()).kind(), ValueKind::Text);
        assert_eq!(
            AnnotationValue::Duration(Duration::from_millis(5)).kind(),
            ValueKind::Duration
        );
    }

    #[test]
    fn test_value_json_shape() {
        let json = serde_json::to_value(AnnotationValue::Float(0.5)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "float", "value": 0.5}));
    }
}
