use serde::{Deserialize, Serialize};

use crate::theme::ThemeToken;
use crate::types::{BoxId, Color, Point, Rect};

/// How a command is colored: a semantic token resolved by the renderer's
/// theme, or a concrete color computed by the view (state colors).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Paint {
    Token(ThemeToken),
    Solid(Color),
}

impl From<ThemeToken> for Paint {
    fn from(token: ThemeToken) -> Self {
        Paint::Token(token)
    }
}

impl From<Color> for Paint {
    fn from(color: Color) -> Self {
        Paint::Solid(color)
    }
}

/// A single, stateless render instruction.
///
/// Views emit a `Vec<RenderCommand>` per draw pass. Renderers consume
/// this list sequentially; each command carries all the data it needs.
/// Coordinates are device pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderCommand {
    /// Fill a rectangle, optionally with a tooltip label and the timeline
    /// box it belongs to (for hit-testing by renderers that want it).
    DrawRect {
        rect: Rect,
        fill: Paint,
        label: Option<String>,
        box_id: Option<BoxId>,
    },

    /// Outline a rectangle. The stroke is centered on the rect edges.
    StrokeRect {
        rect: Rect,
        color: Paint,
        width: f64,
    },

    /// Draw a text string anchored at a position (vertically centered).
    DrawText {
        position: Point,
        text: String,
        color: Paint,
        font_size: f64,
        align: TextAlign,
    },

    /// Restrict subsequent drawing to a rectangular region.
    SetClip { rect: Rect },

    /// Remove the active clip region.
    ClearClip,

    /// Begin a logical group (e.g. one series). Renderers may use this for
    /// batching or layer separation.
    BeginGroup { id: String, label: Option<String> },

    /// End the current group.
    EndGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}
