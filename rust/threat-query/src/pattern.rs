//! Filter-expression tree handed over by the pattern parser.

use crate::error::{Result, TranslateError};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    In,
    Like,
    Matches,
    IsSubset,
    IsSuperset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationOperator {
    And,
    Or,
    FollowedBy,
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl fmt::Display for BooleanOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl fmt::Display for ObservationOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Literal>),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(value) => f.write_str(value),
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Float(value) => write!(f, "{value}"),
            Literal::Bool(value) => write!(f, "{value}"),
            Literal::List(items) => {
                f.write_str("(")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

/// `object-type:field.subfield`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPath(String);

impl ObjectPath {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits into `(object_type, field)` at the first colon.
    pub fn split(&self) -> Result<(&str, &str)> {
        match self.0.split_once(':') {
            Some((object, field)) if !object.is_empty() && !field.is_empty() => {
                Ok((object, field))
            }
            _ => Err(TranslateError::InvalidObjectPath(self.0.clone())),
        }
    }
}

/// Raw qualifier text, e.g. `START t'2020-06-01T08:43:10Z' STOP t'2020-08-31T10:43:10Z'`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualifier(String);

impl Qualifier {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn between(start: &str, stop: &str) -> Self {
        Self(format!("START {start} STOP {stop}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterNode {
    Comparison {
        object_path: ObjectPath,
        operator: ComparisonOperator,
        value: Literal,
        #[serde(default)]
        negated: bool,
    },
    CombinedComparison {
        op: BooleanOperator,
        left: Box<FilterNode>,
        right: Box<FilterNode>,
    },
    Observation {
        comparison: Box<FilterNode>,
    },
    QualifiedObservation {
        observation: Box<FilterNode>,
        #[serde(default)]
        qualifier: Option<Qualifier>,
    },
    CombinedObservation {
        op: ObservationOperator,
        left: Box<FilterNode>,
        right: Box<FilterNode>,
    },
    Pattern {
        root: Box<FilterNode>,
    },
}

impl FilterNode {
    pub fn equals(path: &str, value: impl Into<Literal>) -> Self {
        Self::compare(path, ComparisonOperator::Equal, value)
    }

    pub fn compare(path: &str, operator: ComparisonOperator, value: impl Into<Literal>) -> Self {
        FilterNode::Comparison {
            object_path: ObjectPath::new(path),
            operator,
            value: value.into(),
            negated: false,
        }
    }

    pub fn and(left: FilterNode, right: FilterNode) -> Self {
        FilterNode::CombinedComparison {
            op: BooleanOperator::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn observe(comparison: FilterNode) -> Self {
        FilterNode::Observation {
            comparison: Box::new(comparison),
        }
    }

    pub fn qualify(observation: FilterNode, qualifier: Qualifier) -> Self {
        FilterNode::QualifiedObservation {
            observation: Box::new(observation),
            qualifier: Some(qualifier),
        }
    }

    pub fn combine(op: ObservationOperator, left: FilterNode, right: FilterNode) -> Self {
        FilterNode::CombinedObservation {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn pattern(root: FilterNode) -> Self {
        FilterNode::Pattern {
            root: Box::new(root),
        }
    }

    /// True when the node bottoms out in a combined comparison once observation wrappers are peeled.
    pub fn is_combined_comparison(&self) -> bool {
        match self {
            FilterNode::CombinedComparison { .. } => true,
            FilterNode::Observation { comparison } => comparison.is_combined_comparison(),
            FilterNode::QualifiedObservation { observation, .. } => {
                observation.is_combined_comparison()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_object_path_on_first_colon() {
        let path = ObjectPath::new("x-infoblox-dns-event:extensions.dns-ext.question.domain_ref.value");
        let (object, field) = path.split().unwrap();
        assert_eq!(object, "x-infoblox-dns-event");
        assert_eq!(field, "extensions.dns-ext.question.domain_ref.value");
    }

    #[test]
    fn rejects_path_without_field() {
        let err = ObjectPath::new("ipv4-addr").split().unwrap_err();
        assert!(matches!(err, TranslateError::InvalidObjectPath(_)));
        let err = ObjectPath::new("ipv4-addr:").split().unwrap_err();
        assert!(matches!(err, TranslateError::InvalidObjectPath(_)));
    }

    #[test]
    fn literal_display() {
        assert_eq!(Literal::from("example.com").to_string(), "example.com");
        assert_eq!(Literal::Int(3).to_string(), "3");
        let list = Literal::List(vec![Literal::from("a"), Literal::Int(2)]);
        assert_eq!(list.to_string(), "(a, 2)");
    }

    #[test]
    fn decodes_tree_from_json() {
        let node: FilterNode = serde_json::from_str(
            r#"{"kind": "pattern", "root": {"kind": "observation", "comparison":
                {"kind": "comparison", "object_path": "ipv4-addr:value", "operator": "equal", "value": "1.1.1.1"}}}"#,
        )
        .unwrap();
        assert_eq!(
            node,
            FilterNode::pattern(FilterNode::observe(FilterNode::equals("ipv4-addr:value", "1.1.1.1")))
        );
    }

    #[test]
    fn detects_combined_comparison_through_wrappers() {
        let inner = FilterNode::and(
            FilterNode::equals("ipv4-addr:value", "1.1.1.1"),
            FilterNode::equals("domain-name:value", "example.com"),
        );
        let node = FilterNode::qualify(
            FilterNode::observe(inner),
            Qualifier::between("t'2020-01-01T00:00:00Z'", "t'2020-01-02T00:00:00Z'"),
        );
        assert!(node.is_combined_comparison());
        assert!(!FilterNode::observe(FilterNode::equals("ipv4-addr:value", "1.1.1.1"))
            .is_combined_comparison());
    }
}
