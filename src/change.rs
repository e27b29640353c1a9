//! The one-way channel from resolved output back to the host.
//!
//! The engine never mutates an entity. Every edit made through a resolved
//! field, action or repeater is emitted as `(concrete path, new value)` and
//! the host decides what to do with it.

use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// Receives mutation requests. Closures `Fn(&str, JsonValue)` implement it.
pub trait ChangeSink: Send + Sync {
    fn on_change(&self, path: &str, value: JsonValue);
}

impl<F> ChangeSink for F
where
    F: Fn(&str, JsonValue) + Send + Sync,
{
    fn on_change(&self, path: &str, value: JsonValue) {
        self(path, value)
    }
}

/// A sink that drops every change, for read-only rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ChangeSink for NoopSink {
    fn on_change(&self, _path: &str, _value: JsonValue) {}
}

/// Emits changes for one concrete path.
#[derive(Clone)]
pub struct ChangeHandle {
    path: String,
    sink: Arc<dyn ChangeSink>,
}

impl ChangeHandle {
    pub fn new(path: impl Into<String>, sink: Arc<dyn ChangeSink>) -> Self {
        Self {
            path: path.into(),
            sink,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn emit(&self, value: JsonValue) {
        self.sink.on_change(&self.path, value);
    }
}

impl fmt::Debug for ChangeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeHandle")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Handles are equal when they write to the same path.
impl PartialEq for ChangeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}
