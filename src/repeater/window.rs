use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Fixed-height virtualization of a repeater.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualWindow {
    pub item_height: f64,
    /// Extra items materialized on each side of the visible range.
    #[serde(default)]
    pub overscan: usize,
}

impl VirtualWindow {
    pub fn new(item_height: f64) -> Self {
        Self {
            item_height,
            overscan: 0,
        }
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    /// Indices of the items intersecting `[scroll_offset, scroll_offset + viewport_size)`,
    /// widened by the overscan and clamped to `0..total`.
    ///
    /// A non-positive item height disables virtualization. An offset past the
    /// end yields an empty range at `total`.
    pub fn visible_window(&self, total: usize, scroll_offset: f64, viewport_size: f64) -> Range<usize> {
        if total == 0 {
            return 0..0;
        }
        if !(self.item_height > 0.0 && self.item_height.is_finite()) {
            return 0..total;
        }

        let offset = scroll_offset.max(0.0);
        let viewport = viewport_size.max(0.0);
        let first = (offset / self.item_height).floor() as usize;
        if first >= total {
            return total..total;
        }
        let last = ((offset + viewport) / self.item_height).ceil() as usize;

        let start = first.saturating_sub(self.overscan);
        let end = last.saturating_add(self.overscan).min(total);
        start..end
    }

    /// Height standing in for the items before `window`.
    pub fn leading_space(&self, window: &Range<usize>) -> f64 {
        window.start as f64 * self.item_height.max(0.0)
    }

    /// Height standing in for the items after `window`.
    pub fn trailing_space(&self, window: &Range<usize>, total: usize) -> f64 {
        total.saturating_sub(window.end) as f64 * self.item_height.max(0.0)
    }
}
