//! The serializable form definition: layout tree, fragments, computed fields.

pub mod condition;
pub mod form;
pub mod node;

pub use condition::{ConditionOperator, LogicalOp, VisibilityCondition};
pub use form::{
    FormComputedField, FormDefinition, FormFragment, FormIdentity, FragmentParameter,
    ParameterKind, ResultType,
};
pub use node::{
    ActionNode, ComputedNode, ConditionalNode, ContainerNode, DividerNode, FieldNode, FieldType,
    FieldValidation, FragmentArgument, FragmentRefNode, LayoutNode, NodeMeta, RepeaterNode,
    SpacerNode, StaticNode, TabEntry, TabsNode,
};
