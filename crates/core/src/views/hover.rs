//! Edge-triggered hover state.

use serde::Serialize;
use state_timeline_protocol::{BoxId, Rect};
use tracing::trace;

/// A transition of the box under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HoverEvent {
    /// The cursor moved onto a different box. `rect` is in device pixels
    /// relative to the plot.
    Hover { id: BoxId, rect: Rect },
    /// The cursor left the last hovered box.
    Leave,
}

/// Per-lane found boxes plus the box at the cursor.
///
/// Lanes only drive the visual hover marks. Events fire on the at-cursor
/// box alone: `None -> Some(b)` and `Some(a) -> Some(b)` fire `Hover(b)`,
/// `Some(_) -> None` fires `Leave`, and anything else fires nothing.
#[derive(Debug, Clone, Default)]
pub struct HoverTracker {
    lanes: Vec<Option<(BoxId, Rect)>>,
    at_cursor: Option<BoxId>,
}

impl HoverTracker {
    pub fn new(lanes: usize) -> Self {
        Self {
            lanes: vec![None; lanes],
            at_cursor: None,
        }
    }

    /// Match the lane count, keeping the state of surviving lanes.
    pub fn resize(&mut self, lanes: usize) {
        self.lanes.resize(lanes, None);
    }

    /// Record what lane `lane` found. Returns `true` when its mark moved.
    pub fn update_lane(&mut self, lane: usize, found: Option<(BoxId, Rect)>) -> bool {
        let Some(slot) = self.lanes.get_mut(lane) else {
            return false;
        };
        if *slot == found {
            return false;
        }
        *slot = found;
        true
    }

    /// Settle the at-cursor box for this query and report the transition.
    pub fn settle(&mut self, at_cursor: Option<(BoxId, Rect)>) -> Option<HoverEvent> {
        let next = at_cursor.map(|(id, _)| id);
        if next == self.at_cursor {
            return None;
        }
        self.at_cursor = next;
        let event = match at_cursor {
            Some((id, rect)) => HoverEvent::Hover { id, rect },
            None => HoverEvent::Leave,
        };
        trace!(?event, "hover transition");
        Some(event)
    }

    pub fn at_cursor(&self) -> Option<BoxId> {
        self.at_cursor
    }

    /// Found box per lane, device pixels relative to the plot.
    pub fn lanes(&self) -> &[Option<(BoxId, Rect)>] {
        &self.lanes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(series: usize, sample: usize) -> Option<(BoxId, Rect)> {
        Some((BoxId::new(series, sample), Rect::new(0.0, 0.0, 10.0, 10.0)))
    }

    #[test]
    fn same_box_fires_once() {
        let mut hover = HoverTracker::new(1);
        assert!(matches!(hover.settle(found(0, 1)), Some(HoverEvent::Hover { .. })));
        assert_eq!(hover.settle(found(0, 1)), None);
        assert_eq!(hover.settle(found(0, 1)), None);
    }

    #[test]
    fn leave_fires_once() {
        let mut hover = HoverTracker::new(1);
        hover.settle(found(0, 1));
        assert_eq!(hover.settle(None), Some(HoverEvent::Leave));
        assert_eq!(hover.settle(None), None);
    }

    #[test]
    fn switching_boxes_fires_hover_for_the_new_box() {
        let mut hover = HoverTracker::new(2);
        hover.settle(found(0, 1));
        let event = hover.settle(found(1, 3));
        assert!(matches!(event, Some(HoverEvent::Hover { id, .. }) if id == BoxId::new(1, 3)));
        assert_eq!(hover.at_cursor(), Some(BoxId::new(1, 3)));
    }

    #[test]
    fn lane_marks_track_changes() {
        let mut hover = HoverTracker::new(2);
        assert!(hover.update_lane(0, found(0, 1)));
        assert!(!hover.update_lane(0, found(0, 1)));
        assert!(hover.update_lane(0, None));
        assert!(!hover.update_lane(5, found(0, 1)));
        hover.resize(3);
        assert_eq!(hover.lanes().len(), 3);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_string(&HoverEvent::Leave).unwrap_or_default();
        assert_eq!(json, r#"{"type":"leave"}"#);
    }
}
