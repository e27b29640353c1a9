//! Dotted data paths into entity documents.
//!
//! A binding path is a dotted string such as `attributes.strength.value` or
//! `inventory.items[{{index}}].name`. Resolution never fails on missing data:
//! a missing key, an out-of-range index or a step through `null` all yield
//! `None` (Undefined). Errors are reserved for paths that cannot be made
//! concrete, e.g. `{{index}}` outside any repeater.

pub mod context;
pub mod segment;
pub mod template;

pub use context::{RepeaterContext, enter};
pub use segment::{PathSegment, parse_segments};
pub use template::{Template, TemplatePart};

use crate::error::PathError;
use serde_json::Value as JsonValue;

/// The placeholder bound to the innermost repeater index.
pub const INDEX_PLACEHOLDER: &str = "index";

/// Replaces `{{index}}` with the innermost repeater index.
pub fn concretize(path: &str, context: Option<&RepeaterContext<'_>>) -> Result<String, PathError> {
    let template = Template::parse(path);
    let mut out = String::with_capacity(path.len());
    for part in template.parts() {
        match part {
            TemplatePart::Literal(text) => out.push_str(text),
            TemplatePart::Placeholder(name) if name == INDEX_PLACEHOLDER => {
                let context = context.ok_or_else(|| PathError::MissingRepeaterContext {
                    path: path.to_string(),
                })?;
                out.push_str(&context.index.to_string());
            }
            TemplatePart::Placeholder(name) => {
                return Err(PathError::UnknownPlaceholder {
                    path: path.to_string(),
                    name: name.clone(),
                });
            }
        }
    }
    Ok(out)
}

/// Resolves `path` against `entity` under an optional repeater context.
pub fn resolve<'e>(
    entity: &'e JsonValue,
    path: &str,
    context: Option<&RepeaterContext<'_>>,
) -> Result<Option<&'e JsonValue>, PathError> {
    let concrete = concretize(path, context)?;
    Ok(lookup(entity, &concrete))
}

/// Looks up an already concrete path. The empty path is the entity itself.
pub fn lookup<'e>(entity: &'e JsonValue, path: &str) -> Option<&'e JsonValue> {
    parse_segments(path)
        .iter()
        .try_fold(entity, |current, segment| step(current, segment))
}

fn step<'e>(current: &'e JsonValue, segment: &PathSegment) -> Option<&'e JsonValue> {
    match (current, segment) {
        (JsonValue::Object(map), PathSegment::Key(key)) => map.get(key),
        (JsonValue::Object(map), PathSegment::Index(index)) => map.get(&index.to_string()),
        (JsonValue::Array(items), PathSegment::Index(index)) => items.get(*index),
        _ => None,
    }
}

/// True when one path is a segment-wise prefix of the other.
///
/// A write to `a.b` touches a reader of `a.b.c`, and a write to `a.b.c`
/// touches a reader of `a.b`. `a.bc` overlaps neither.
pub fn overlaps(a: &str, b: &str) -> bool {
    let a = parse_segments(a);
    let b = parse_segments(b);
    a.iter().zip(b.iter()).all(|(x, y)| x == y)
}

/// True when `prefix` is a segment-wise prefix of (or equal to) `path`.
pub fn is_prefix(prefix: &str, path: &str) -> bool {
    let prefix = parse_segments(prefix);
    let path = parse_segments(path);
    prefix.len() <= path.len() && prefix.iter().zip(path.iter()).all(|(x, y)| x == y)
}

/// The part of a path before its first placeholder, without a dangling
/// separator: `items[{{index}}].weight` -> `items`.
pub fn static_prefix(path: &str) -> &str {
    let head = match path.find("{{") {
        Some(start) => &path[..start],
        None => path,
    };
    head.trim_end_matches(['.', '['])
}
