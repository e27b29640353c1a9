//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the yoshiki crate.
//! Import this module to get access to the core functionality without having to import
//! each type individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use yoshiki::prelude::*;
//! use std::sync::Arc;
//!
//! # fn run_example() -> Result<()> {
//! let definition = FormDefinition::from_file("path/to/form.json")?;
//! let engine = FormEngine::new(definition);
//!
//! let entity: serde_json::Value =
//!     serde_json::from_str(&std::fs::read_to_string("path/to/entity.json")?)?;
//! let resolution = engine.resolve(&entity, Arc::new(NoopSink));
//!
//! println!("Resolved {} top-level nodes", resolution.nodes.len());
//! # Ok(())
//! # }
//! ```

// Engine entry points
pub use crate::engine::{ComputedValue, ComputedValues, FormEngine, FormEngineBuilder};
pub use crate::walker::{ResolveOptions, Resolution, ResolvedNode, Viewport};

// Definition model
pub use crate::definition::{FormDefinition, LayoutNode, VisibilityCondition};

// Host integration
pub use crate::change::{ChangeHandle, ChangeSink, NoopSink};
pub use crate::formula::{FormulaFunction, FunctionRegistry};
pub use crate::path::RepeaterContext;
pub use crate::repeater::{RepeaterHandle, VirtualWindow};
pub use crate::value::Value;

// Error and diagnostic types
pub use crate::diagnostics::{Diagnostic, Severity};
pub use crate::error::{DefinitionError, EvalError, FormulaError, PathError, RepeaterError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
