//! Lane partitioning and pixel rounding.

/// Round half up, the way canvas code rounds pixel positions.
pub fn round_px(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Round to `places` decimals.
pub fn round_dec(v: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    round_px(v * scale) / scale
}

/// Offset and size of lane `index` of `count`, as fractions of the plot
/// height, packed space-between.
///
/// Each lane gets `row_height / count`; the rest of the height is spread
/// as equal gaps between lanes (none around the outside).
pub fn lane_span(count: usize, row_height: f64, index: usize) -> (f64, f64) {
    let n = count as f64;
    let mut gap = (1.0 - row_height) / (n - 1.0);
    if !gap.is_finite() {
        gap = 0.0;
    }
    let size = row_height / n;
    (index as f64 * (size + gap), round_dec(size, 6))
}

pub fn lane_spans(count: usize, row_height: f64) -> Vec<(f64, f64)> {
    (0..count).map(|i| lane_span(count, row_height, i)).collect()
}
