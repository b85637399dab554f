//! Color resolution: named palette colors, CSS color strings, contrast
//! text and the semantic chrome tokens.

use serde::{Deserialize, Serialize};
use state_timeline_protocol::{Color, ThemeToken};

/// Color used when a value has no resolvable color.
pub const FALLBACK_COLOR: &str = "gray";

/// The color collaborator consumed by preparation and layout.
pub trait ColorResolver {
    /// Resolve a palette name (`"green"`, `"dark-red"`) or CSS color string.
    fn color_by_name(&self, name: &str) -> Color;

    /// Text color readable on `background` with at least `ratio` contrast
    /// against white, otherwise black.
    fn contrast_text(&self, background: Color, ratio: f64) -> Color;

    fn token(&self, token: ThemeToken) -> Color;

    /// Classic palette color for the series at `index`.
    fn series_color(&self, index: usize) -> Color;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Theme {
    pub mode: ThemeMode,
}

impl Theme {
    pub fn new(mode: ThemeMode) -> Self {
        Self { mode }
    }

    pub fn dark() -> Self {
        Self::new(ThemeMode::Dark)
    }

    pub fn light() -> Self {
        Self::new(ThemeMode::Light)
    }

    pub fn is_dark(&self) -> bool {
        self.mode == ThemeMode::Dark
    }
}

impl ColorResolver for Theme {
    fn color_by_name(&self, name: &str) -> Color {
        let name = name.trim();
        match name {
            "transparent" => return Color::TRANSPARENT,
            "text" => return self.token(ThemeToken::TextPrimary),
            _ => {}
        }
        palette_color(name)
            .or_else(|| parse_css_color(name))
            .unwrap_or_else(|| Color::rgb8(0x80, 0x80, 0x80))
    }

    fn contrast_text(&self, background: Color, ratio: f64) -> Color {
        let opaque = background.over(self.token(ThemeToken::Background));
        if opaque.contrast_ratio(&Color::WHITE) >= ratio {
            Color::WHITE
        } else {
            Color::BLACK
        }
    }

    fn token(&self, token: ThemeToken) -> Color {
        match self.mode {
            ThemeMode::Dark => resolve_dark(token),
            ThemeMode::Light => resolve_light(token),
        }
    }

    fn series_color(&self, index: usize) -> Color {
        let (r, g, b) = CLASSIC_PALETTE[index % CLASSIC_PALETTE.len()];
        Color::rgb8(r, g, b)
    }
}

fn resolve_dark(token: ThemeToken) -> Color {
    // Catppuccin Mocha
    use ThemeToken::*;
    match token {
        Background => Color::rgb8(0x11, 0x11, 0x1b),     // Crust
        PlotBackground => Color::rgb8(0x1e, 0x1e, 0x2e), // Base

        TextPrimary => Color::rgb8(0xcd, 0xd6, 0xf4), // Text
        TextMuted => Color::rgb8(0xa6, 0xad, 0xc8),   // Subtext0

        HoverHighlight => Color::rgb8(0xcd, 0xd6, 0xf4).with_alpha(0.6),

        TooltipBackground => Color::rgb8(0x18, 0x18, 0x25), // Mantle
        TooltipBorder => Color::rgb8(0x45, 0x47, 0x5a),     // Surface1
        TooltipText => Color::rgb8(0xcd, 0xd6, 0xf4),
        LegendText => Color::rgb8(0xba, 0xc2, 0xde), // Subtext1
    }
}

fn resolve_light(token: ThemeToken) -> Color {
    // Catppuccin Latte
    use ThemeToken::*;
    match token {
        Background => Color::rgb8(0xdc, 0xe0, 0xe8),     // Crust
        PlotBackground => Color::rgb8(0xef, 0xf1, 0xf5), // Base

        TextPrimary => Color::rgb8(0x4c, 0x4f, 0x69), // Text
        TextMuted => Color::rgb8(0x6c, 0x6f, 0x85),   // Subtext0

        HoverHighlight => Color::rgb8(0x4c, 0x4f, 0x69).with_alpha(0.6),

        TooltipBackground => Color::rgb8(0xe6, 0xe9, 0xef), // Mantle
        TooltipBorder => Color::rgb8(0xbc, 0xc0, 0xcc),     // Surface1
        TooltipText => Color::rgb8(0x4c, 0x4f, 0x69),
        LegendText => Color::rgb8(0x5c, 0x5f, 0x77), // Subtext1
    }
}

const CLASSIC_PALETTE: [(u8, u8, u8); 10] = [
    (0x7e, 0xb2, 0x6d),
    (0xea, 0xb8, 0x39),
    (0x6e, 0xd0, 0xe0),
    (0xef, 0x84, 0x3c),
    (0xe2, 0x4d, 0x42),
    (0x1f, 0x78, 0xc1),
    (0xba, 0x43, 0xa6),
    (0x70, 0x5d, 0xa0),
    (0x50, 0x86, 0x42),
    (0xcc, 0xa3, 0x00),
];

/// Hue families of the visualization palette, darkest shade first:
/// `dark-`, `semi-dark-`, primary, `light-`, `super-light-`.
const PALETTE: [(&str, [&str; 5]); 6] = [
    ("red", ["#C4162A", "#E02F44", "#F2495C", "#FF7383", "#FFA6B0"]),
    ("orange", ["#FA6400", "#FF780A", "#FF9830", "#FFB357", "#FFCB7D"]),
    ("yellow", ["#E0B400", "#F2CC0C", "#FADE2A", "#FFEE52", "#FFF899"]),
    ("green", ["#37872D", "#56A64B", "#73BF69", "#96D98D", "#C8F2C2"]),
    ("blue", ["#1F60C4", "#3274D9", "#5794F2", "#8AB8FF", "#C0D8FF"]),
    ("purple", ["#8F3BB8", "#A352CC", "#B877D9", "#CA95E5", "#DEB6F2"]),
];

fn palette_color(name: &str) -> Option<Color> {
    let (shade, hue) = if let Some(hue) = name.strip_prefix("super-light-") {
        (4, hue)
    } else if let Some(hue) = name.strip_prefix("semi-dark-") {
        (1, hue)
    } else if let Some(hue) = name.strip_prefix("dark-") {
        (0, hue)
    } else if let Some(hue) = name.strip_prefix("light-") {
        (3, hue)
    } else {
        (2, name)
    };
    if hue == "gray" || hue == "grey" {
        return Some(Color::rgb8(0x80, 0x80, 0x80));
    }
    PALETTE
        .iter()
        .find(|(family, _)| *family == hue)
        .and_then(|(_, shades)| Color::from_hex(shades[shade]))
}

/// Parse `#hex`, `rgb(r, g, b)` or `rgba(r, g, b, a)`.
pub fn parse_css_color(text: &str) -> Option<Color> {
    if text.starts_with('#') {
        return Color::from_hex(text);
    }
    let (args, has_alpha) = if let Some(rest) = text.strip_prefix("rgba(") {
        (rest.strip_suffix(')')?, true)
    } else if let Some(rest) = text.strip_prefix("rgb(") {
        (rest.strip_suffix(')')?, false)
    } else {
        return None;
    };
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let expected = if has_alpha { 4 } else { 3 };
    if parts.len() != expected {
        return None;
    }
    let channel = |s: &str| s.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0) as u8);
    let mut color = Color::rgb8(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?);
    if has_alpha {
        color.a = parts[3].parse::<f32>().ok()?.clamp(0.0, 1.0);
    }
    Some(color)
}
