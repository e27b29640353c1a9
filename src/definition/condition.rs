use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A visibility condition attached to a node or a conditional branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VisibilityCondition {
    Compound {
        op: LogicalOp,
        conditions: Vec<VisibilityCondition>,
    },
    Simple {
        field: String,
        operator: ConditionOperator,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<JsonValue>,
    },
}

impl VisibilityCondition {
    pub fn simple(field: &str, operator: ConditionOperator, value: Option<JsonValue>) -> Self {
        VisibilityCondition::Simple {
            field: field.to_string(),
            operator,
            value,
        }
    }

    pub fn and(conditions: Vec<VisibilityCondition>) -> Self {
        VisibilityCondition::Compound {
            op: LogicalOp::And,
            conditions,
        }
    }

    pub fn or(conditions: Vec<VisibilityCondition>) -> Self {
        VisibilityCondition::Compound {
            op: LogicalOp::Or,
            conditions,
        }
    }
}

/// Comparison operators of a simple condition.
///
/// Unrecognized names are kept so they can be reported instead of rejected
/// at load time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    IsEmpty,
    IsNotEmpty,
    GreaterThan,
    LessThan,
    Contains,
    Unknown(String),
}

impl ConditionOperator {
    pub fn as_str(&self) -> &str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::NotEquals => "notEquals",
            ConditionOperator::IsEmpty => "isEmpty",
            ConditionOperator::IsNotEmpty => "isNotEmpty",
            ConditionOperator::GreaterThan => "greaterThan",
            ConditionOperator::LessThan => "lessThan",
            ConditionOperator::Contains => "contains",
            ConditionOperator::Unknown(name) => name,
        }
    }
}

impl From<String> for ConditionOperator {
    fn from(name: String) -> Self {
        match name.as_str() {
            "equals" => ConditionOperator::Equals,
            "notEquals" => ConditionOperator::NotEquals,
            "isEmpty" => ConditionOperator::IsEmpty,
            "isNotEmpty" => ConditionOperator::IsNotEmpty,
            "greaterThan" => ConditionOperator::GreaterThan,
            "lessThan" => ConditionOperator::LessThan,
            "contains" => ConditionOperator::Contains,
            _ => ConditionOperator::Unknown(name),
        }
    }
}

impl From<ConditionOperator> for String {
    fn from(operator: ConditionOperator) -> Self {
        operator.as_str().to_string()
    }
}

/// Combinator of a compound condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogicalOp {
    And,
    Or,
    Unknown(String),
}

impl LogicalOp {
    pub fn as_str(&self) -> &str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
            LogicalOp::Unknown(name) => name,
        }
    }
}

impl From<String> for LogicalOp {
    fn from(name: String) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "and" => LogicalOp::And,
            "or" => LogicalOp::Or,
            _ => LogicalOp::Unknown(name),
        }
    }
}

impl From<LogicalOp> for String {
    fn from(op: LogicalOp) -> Self {
        op.as_str().to_string()
    }
}
