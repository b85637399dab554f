use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Inclusive point containment on all four edges.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// Shrink the rect by `d` on every side.
    pub fn inset(&self, d: f64) -> Self {
        Self::new(self.x + d, self.y + d, self.w - 2.0 * d, self.h - 2.0 * d)
    }
}

/// The plotting area handed to a view, plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub dpr: f64,
}

impl Viewport {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            dpr: 1.0,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Straight (non-premultiplied) RGBA color, channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            1.0,
        )
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match digits.len() {
            3 => {
                let mut out = [0u8; 3];
                for (slot, c) in out.iter_mut().zip(digits.chars()) {
                    let v = c.to_digit(16)? as u8;
                    *slot = v * 16 + v;
                }
                Some(Self::rgb8(out[0], out[1], out[2]))
            }
            6 | 8 => {
                let r = channel(digits.get(0..2)?)?;
                let g = channel(digits.get(2..4)?)?;
                let b = channel(digits.get(4..6)?)?;
                let mut color = Self::rgb8(r, g, b);
                if digits.len() == 8 {
                    color.a = f32::from(channel(digits.get(6..8)?)?) / 255.0;
                }
                Some(color)
            }
            _ => None,
        }
    }

    pub fn to_rgb8(&self) -> (u8, u8, u8) {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        (q(self.r), q(self.g), q(self.b))
    }

    /// CSS notation: `#rrggbb` when opaque, `rgba(...)` otherwise.
    pub fn to_css(&self) -> String {
        let (r, g, b) = self.to_rgb8();
        if self.a >= 1.0 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("rgba({r},{g},{b},{:.3})", self.a.max(0.0))
        }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Alpha-composite `self` over an opaque `background`.
    pub fn over(&self, background: Color) -> Color {
        let mix = |fg: f32, bg: f32| fg * self.a + bg * (1.0 - self.a);
        Color::rgba(
            mix(self.r, background.r),
            mix(self.g, background.g),
            mix(self.b, background.b),
            1.0,
        )
    }

    /// WCAG relative luminance of the (opaque) color.
    pub fn luminance(&self) -> f64 {
        let lin = |c: f32| {
            let c = f64::from(c);
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        0.2126 * lin(self.r) + 0.7152 * lin(self.g) + 0.0722 * lin(self.b)
    }

    /// WCAG contrast ratio between two opaque colors, in `1.0..=21.0`.
    pub fn contrast_ratio(&self, other: &Color) -> f64 {
        let (a, b) = (self.luminance(), other.luminance());
        (a.max(b) + 0.05) / (a.min(b) + 0.05)
    }
}

/// Identifies one box of the timeline layout: a (series, sample) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoxId {
    pub series: usize,
    pub sample: usize,
}

impl BoxId {
    pub fn new(series: usize, sample: usize) -> Self {
        Self { series, sample }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(Color::from_hex("#fff"), Some(Color::WHITE));
        assert_eq!(Color::from_hex("#000000"), Some(Color::BLACK));
        let half = Color::from_hex("#ff000080").unwrap_or(Color::BLACK);
        assert_eq!(half.to_rgb8(), (255, 0, 0));
        assert!((half.a - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(Color::from_hex("red"), None);
        assert_eq!(Color::from_hex("#12"), None);
    }

    #[test]
    fn css_round_trip() {
        let c = Color::rgb8(0x73, 0xbf, 0x69);
        assert_eq!(c.to_css(), "#73bf69");
        assert_eq!(c.with_alpha(0.5).to_css(), "rgba(115,191,105,0.500)");
    }

    #[test]
    fn contrast_extremes() {
        assert!((Color::WHITE.contrast_ratio(&Color::BLACK) - 21.0).abs() < 1e-9);
        assert!((Color::WHITE.contrast_ratio(&Color::WHITE) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rect_contains_is_inclusive() {
        let r = Rect::new(10.0, 10.0, 5.0, 5.0);
        assert!(r.contains(10.0, 10.0));
        assert!(r.contains(15.0, 15.0));
        assert!(!r.contains(15.1, 12.0));
    }
}
