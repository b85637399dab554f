//! Tooltip placement and content.

use serde::Serialize;
use state_timeline_protocol::{BoxId, Color, Point};

use crate::format::{display_value, fmt_duration};
use crate::model::AlignedFrame;
use crate::prepare::find_next_state_index;
use crate::theme::ColorResolver;

/// Place an overlay of `width` x `height` next to the cursor without
/// leaving the viewport.
///
/// Per axis: to the right of (below) the cursor when it fits there, to
/// the left of (above) it when only that side overflows, and flush against
/// the viewport edge with the smaller overflow when both sides overflow.
/// Equal overflow goes flush right (bottom).
#[allow(clippy::too_many_arguments)]
pub fn calculate_tooltip_position(
    cursor_x: f64,
    cursor_y: f64,
    width: f64,
    height: f64,
    x_offset: f64,
    y_offset: f64,
    viewport_width: f64,
    viewport_height: f64,
) -> Point {
    Point::new(
        place_on_axis(cursor_x, width, x_offset, viewport_width),
        place_on_axis(cursor_y, height, y_offset, viewport_height),
    )
}

fn place_on_axis(cursor: f64, size: f64, offset: f64, extent: f64) -> f64 {
    let overflow_after = (cursor + offset + size - (extent - offset)).max(0.0);
    let overflow_before = (cursor - offset - size - offset).min(0.0).abs();

    if overflow_after > 0.0 && overflow_before > 0.0 {
        if overflow_after > overflow_before {
            offset
        } else {
            extent - offset - size
        }
    } else if overflow_after > 0.0 {
        cursor - offset - size
    } else {
        cursor + offset
    }
}

/// What a tooltip shows for a hovered box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipContent {
    pub series: String,
    pub state: String,
    pub color: Option<Color>,
    /// Sample time, epoch milliseconds.
    pub time: f64,
    /// Time until the next state change; `None` for the last state.
    pub duration: Option<f64>,
    pub duration_text: Option<String>,
}

pub fn tooltip_content(
    frame: &AlignedFrame,
    id: BoxId,
    theme: &dyn ColorResolver,
) -> Option<TooltipContent> {
    let field = frame.fields.get(id.series)?;
    let value = field.values.get(id.sample)?;
    let time = *frame.time.get(id.sample)?;
    let shown = display_value(field, id.series, value, theme);
    let duration = find_next_state_index(&field.values, id.sample)
        .and_then(|next| frame.time.get(next))
        .map(|next| next - time);

    Some(TooltipContent {
        series: field.display_name().to_string(),
        state: shown.text,
        color: shown.color,
        time,
        duration,
        duration_text: duration.map(fmt_duration),
    })
}
