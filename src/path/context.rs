use serde_json::Value as JsonValue;

/// The stack of enclosing repeater iterations at a point of the walk.
///
/// Frames borrow each other, so a nested frame lives exactly as long as the
/// recursion that created it. The innermost frame is the one `{{index}}`
/// refers to.
#[derive(Debug, Clone, Copy)]
pub struct RepeaterContext<'a> {
    pub index: usize,
    pub item: &'a JsonValue,
    parent: Option<&'a RepeaterContext<'a>>,
}

impl<'a> RepeaterContext<'a> {
    /// The outermost repeater frame.
    pub fn root(index: usize, item: &'a JsonValue) -> Self {
        Self {
            index,
            item,
            parent: None,
        }
    }

    /// Opens a nested frame inside this one.
    pub fn push<'s>(&'s self, index: usize, item: &'s JsonValue) -> RepeaterContext<'s> {
        RepeaterContext {
            index,
            item,
            parent: Some(self),
        }
    }

    pub fn parent(&self) -> Option<&'a RepeaterContext<'a>> {
        self.parent
    }

    pub fn depth(&self) -> usize {
        1 + self.parent.map_or(0, |parent| parent.depth())
    }

    /// Indices of every frame, outermost first.
    pub fn indices(&self) -> Vec<usize> {
        let mut indices = self.parent.map(|parent| parent.indices()).unwrap_or_default();
        indices.push(self.index);
        indices
    }
}

/// Opens a frame under an optional parent.
pub fn enter<'s>(
    parent: Option<&'s RepeaterContext<'s>>,
    index: usize,
    item: &'s JsonValue,
) -> RepeaterContext<'s> {
    match parent {
        Some(parent) => parent.push(index, item),
        None => RepeaterContext::root(index, item),
    }
}
