//! Value and duration formatting shared by labels, legends and tooltips.

use state_timeline_protocol::Color;

use crate::model::{ColorMode, DisplayValue, Field, ThresholdsMode, Value, map_value};
use crate::prepare::thresholds::{active_threshold, percentage_bounds};
use crate::theme::{ColorResolver, FALLBACK_COLOR};

/// Format a number with optional fixed decimals.
///
/// Without explicit decimals integers print bare and fractions keep at most
/// two digits, trailing zeros trimmed.
pub fn format_number(value: f64, decimals: Option<u32>) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }
    match decimals {
        Some(d) => format!("{value:.prec$}", prec = d as usize),
        None if value.fract() == 0.0 => format!("{value}"),
        None => {
            let text = format!("{value:.2}");
            text.trim_end_matches('0').trim_end_matches('.').to_string()
        }
    }
}

/// Format a number and append its unit.
pub fn format_value(value: f64, unit: Option<&str>, decimals: Option<u32>) -> String {
    let text = format_number(value, decimals);
    match unit {
        None | Some("" | "none" | "short") => text,
        Some("percent") => format!("{text}%"),
        Some(unit) => format!("{text} {unit}"),
    }
}

/// Human duration such as `1h 45m` or `2y 1mo 3w 5d`.
///
/// Shows the two most significant non-zero units below a week and up to
/// four from years down to days. Negative input formats as an empty string.
pub fn fmt_duration(ms: f64) -> String {
    if ms < 0.0 || !ms.is_finite() {
        return String::new();
    }
    let mut seconds = (ms / 1000.0).floor() as u64;
    let millis = ((ms % 1000.0) * 1000.0).round() / 1000.0;

    let mut minutes = seconds / 60;
    seconds %= 60;
    let mut hours = minutes / 60;
    minutes %= 60;
    let mut days = hours / 24;
    hours %= 24;

    let years = days / 365;
    if years > 0 {
        days %= 365;
    }
    let months = days / 30;
    if months > 0 {
        days %= 30;
    }
    let weeks = days / 7;
    if weeks > 0 {
        days %= 7;
    }

    let whole = |n: u64| n as f64;
    let parts: Vec<(f64, &str)> = if years > 0 {
        vec![
            (whole(years), "y"),
            (whole(months), "mo"),
            (whole(weeks), "w"),
            (whole(days), "d"),
        ]
    } else if months > 0 {
        vec![(whole(months), "mo"), (whole(weeks), "w"), (whole(days), "d")]
    } else if weeks > 0 {
        vec![(whole(weeks), "w"), (whole(days), "d")]
    } else if days > 0 {
        vec![(whole(days), "d"), (whole(hours), "h")]
    } else if hours > 0 {
        vec![(whole(hours), "h"), (whole(minutes), "m")]
    } else if minutes > 0 {
        vec![(whole(minutes), "m"), (whole(seconds), "s")]
    } else if seconds > 0 {
        vec![(whole(seconds), "s"), (millis, "ms")]
    } else if millis > 0.0 {
        vec![(millis, "ms")]
    } else {
        return "0".to_string();
    };

    parts
        .into_iter()
        .filter(|(n, _)| *n > 0.0)
        .map(|(n, unit)| format!("{n}{unit}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve how one cell of `field` displays: text, color and numeric value.
///
/// Value mappings win over unit formatting and color modes. `series` picks
/// the classic palette color.
pub fn display_value(
    field: &Field,
    series: usize,
    value: &Value,
    theme: &dyn ColorResolver,
) -> DisplayValue {
    let config = &field.config;
    let mapped = map_value(&config.mappings, value).unwrap_or_default();
    let text = match (mapped.text, value) {
        (Some(text), _) => text,
        (None, Value::Number(n)) => format_value(*n, config.unit.as_deref(), config.decimals),
        (None, other) => other.to_string(),
    };
    let numeric = match value {
        Value::Number(n) => *n,
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => f64::NAN,
    };
    let mapped_color = mapped.color.as_deref().map(|name| theme.color_by_name(name));
    if value.is_nullish() || mapped_color.is_some() {
        return DisplayValue {
            text,
            color: mapped_color,
            numeric,
        };
    }

    let color = match config.color_mode().unwrap_or(ColorMode::Classic) {
        ColorMode::Fixed => config
            .color
            .as_ref()
            .and_then(|c| c.fixed_color.as_deref())
            .map_or_else(|| theme.series_color(series), |name| theme.color_by_name(name)),
        ColorMode::Thresholds => threshold_color(field, numeric, theme),
        ColorMode::Continuous => continuous_color(field, numeric, theme),
        ColorMode::Classic => theme.series_color(series),
    };

    DisplayValue {
        text,
        color: Some(color),
        numeric,
    }
}

fn threshold_color(field: &Field, numeric: f64, theme: &dyn ColorResolver) -> Color {
    let Some(thresholds) = field.config.thresholds.as_ref() else {
        return theme.color_by_name(FALLBACK_COLOR);
    };
    let value = match thresholds.mode {
        ThresholdsMode::Absolute => numeric,
        ThresholdsMode::Percentage => {
            let (min, max) = percentage_bounds(field);
            (numeric - min) / (max - min) * 100.0
        }
    };
    active_threshold(value, &thresholds.steps)
        .map_or_else(
            || theme.color_by_name(FALLBACK_COLOR),
            |i| theme.color_by_name(&thresholds.steps[i].color),
        )
}

/// Green to red through yellow across the field's min/max.
fn continuous_color(field: &Field, numeric: f64, theme: &dyn ColorResolver) -> Color {
    let (min, max) = percentage_bounds(field);
    let t = ((numeric - min) / (max - min)).clamp(0.0, 1.0);
    let t = if t.is_nan() { 0.0 } else { t };
    let green = theme.color_by_name("green");
    let yellow = theme.color_by_name("yellow");
    let red = theme.color_by_name("red");
    if t < 0.5 {
        lerp(green, yellow, (t * 2.0) as f32)
    } else {
        lerp(yellow, red, ((t - 0.5) * 2.0) as f32)
    }
}

fn lerp(a: Color, b: Color, t: f32) -> Color {
    let mix = |x: f32, y: f32| x + (y - x) * t;
    Color::rgba(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b), mix(a.a, b.a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::model::mapping::{RangeMapping, SpecialMapping};
    use crate::model::{
        FieldColor, FieldConfig, FieldType, MappingResult, SpecialValueMatch, Threshold,
        ThresholdsConfig, ValueMapping,
    };
    use crate::theme::Theme;

    #[test]
    fn formats_numbers() {
        assert_eq!(format_number(80.0, None), "80");
        assert_eq!(format_number(1.5, None), "1.5");
        assert_eq!(format_number(1.234_56, None), "1.23");
        assert_eq!(format_number(1.0, Some(2)), "1.00");
        assert_eq!(format_number(f64::INFINITY, None), "∞");
        assert_eq!(format_number(f64::NEG_INFINITY, None), "-∞");
    }

    #[test]
    fn appends_units() {
        assert_eq!(format_value(80.0, Some("percent"), None), "80%");
        assert_eq!(format_value(3.0, Some("ms"), None), "3 ms");
        assert_eq!(format_value(3.0, Some("short"), None), "3");
        assert_eq!(format_value(3.0, None, None), "3");
    }

    #[test]
    fn duration_table() {
        let cases: &[(f64, &str)] = &[
            (-1.0, ""),
            (20.0, "20ms"),
            (1000.0, "1s"),
            (1020.0, "1s 20ms"),
            (60000.0, "1m"),
            (61020.0, "1m 1s"),
            (3_600_000.0, "1h"),
            (6_600_000.0, "1h 50m"),
            (86_400_000.0, "1d"),
            (96_640_000.0, "1d 2h"),
            (604_800_000.0, "1w"),
            (691_200_000.0, "1w 1d"),
            (2_419_200_000.0, "4w"),
            (2_678_400_000.0, "1mo 1d"),
            (3_196_800_000.0, "1mo 1w"),
            (3_456_000_000.0, "1mo 1w 3d"),
            (6_739_200_000.0, "2mo 2w 4d"),
            (31_536_000_000.0, "1y"),
            (31_968_000_000.0, "1y 5d"),
            (32_140_800_000.0, "1y 1w"),
            (67_910_400_000.0, "2y 1mo 3w 5d"),
            (40_420_800_000.0, "1y 3mo 1w 5d"),
            (9_007_199_254_740_991.0, "285616y 5mo 1d"),
        ];
        for (ms, expected) in cases {
            assert_eq!(fmt_duration(*ms), *expected, "fmt_duration({ms})");
        }
    }

    #[test]
    fn threshold_mode_colors_by_step() {
        let theme = Theme::dark();
        let config = FieldConfig {
            color: Some(FieldColor {
                mode: ColorMode::Thresholds,
                fixed_color: None,
            }),
            thresholds: Some(ThresholdsConfig {
                mode: ThresholdsMode::Absolute,
                steps: vec![
                    Threshold::new(f64::NEG_INFINITY, "green"),
                    Threshold::new(80.0, "red"),
                ],
            }),
            ..FieldConfig::default()
        };
        let field = Field::new("cpu", FieldType::Number, vec![]).with_config(config);
        let low = display_value(&field, 0, &Value::from(10.0), &theme);
        let high = display_value(&field, 0, &Value::from(95.0), &theme);
        assert_eq!(low.color, Some(theme.color_by_name("green")));
        assert_eq!(high.color, Some(theme.color_by_name("red")));
        assert_eq!(high.text, "95");
        assert!((high.numeric - 95.0).abs() < f64::EPSILON);
    }

    #[test]
    fn null_cells_have_no_color() {
        let theme = Theme::dark();
        let field = Field::new("s", FieldType::String, vec![]);
        let shown = display_value(&field, 0, &Value::Null, &theme);
        assert_eq!(shown.text, "");
        assert_eq!(shown.color, None);
        assert!(shown.numeric.is_nan());
    }

    #[test]
    fn mappings_apply_before_unit_formatting() {
        let theme = Theme::dark();
        let mapped = |text: &str, color: Option<&str>| MappingResult {
            text: Some(text.to_string()),
            color: color.map(str::to_string),
            index: None,
        };
        let config = FieldConfig {
            unit: Some("ms".to_string()),
            mappings: vec![
                ValueMapping::Value(BTreeMap::from([("0".to_string(), mapped("idle", Some("blue")))])),
                ValueMapping::Range(RangeMapping {
                    from: Some(500.0),
                    to: None,
                    result: mapped("slow", None),
                }),
            ],
            ..FieldConfig::default()
        };
        let field = Field::new("latency", FieldType::Number, vec![]).with_config(config);

        let idle = display_value(&field, 0, &Value::from(0.0), &theme);
        assert_eq!(idle.text, "idle");
        assert_eq!(idle.color, Some(theme.color_by_name("blue")));
        assert!(idle.numeric.abs() < f64::EPSILON);

        let slow = display_value(&field, 2, &Value::from(900.0), &theme);
        assert_eq!(slow.text, "slow");
        assert_eq!(slow.color, Some(theme.series_color(2)));

        let plain = display_value(&field, 0, &Value::from(40.0), &theme);
        assert_eq!(plain.text, "40 ms");
    }

    #[test]
    fn mapped_nulls_take_the_mapping_text_and_color() {
        let theme = Theme::dark();
        let config = FieldConfig {
            mappings: vec![ValueMapping::Special(SpecialMapping {
                target: SpecialValueMatch::Null,
                result: MappingResult {
                    text: Some("no data".to_string()),
                    color: Some("red".to_string()),
                    index: None,
                },
            })],
            ..FieldConfig::default()
        };
        let field = Field::new("s", FieldType::String, vec![]).with_config(config);
        let shown = display_value(&field, 0, &Value::Null, &theme);
        assert_eq!(shown.text, "no data");
        assert_eq!(shown.color, Some(theme.color_by_name("red")));
    }
}
