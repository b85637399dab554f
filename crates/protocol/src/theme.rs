use serde::{Deserialize, Serialize};

/// Semantic color tokens resolved by the renderer's active theme.
///
/// State colors are computed by the views and travel as concrete colors;
/// tokens cover the chart chrome around them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemeToken {
    Background,
    PlotBackground,

    TextPrimary,
    TextMuted,

    HoverHighlight,

    TooltipBackground,
    TooltipBorder,
    TooltipText,

    LegendText,
}
