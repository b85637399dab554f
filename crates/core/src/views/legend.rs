//! Legend items with optional state statistics.

use serde::Serialize;
use state_timeline_protocol::Color;

use crate::format::{display_value, fmt_duration};
use crate::model::{
    AlignedFrame, ColorMode, LegendDisplayMode, LegendOptions, LegendValue, TimeRange, Value,
};
use crate::prepare::{find_next_state_index, threshold_items};
use crate::theme::{ColorResolver, FALLBACK_COLOR};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendDisplayValue {
    pub text: String,
    pub numeric: f64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendItem {
    pub label: String,
    pub color: Color,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub display_values: Vec<LegendDisplayValue>,
}

#[derive(Debug, Clone, Copy, Default)]
struct StateStats {
    duration: f64,
    occurrences: usize,
}

/// Build the legend for a joined frame.
///
/// Threshold-colored data lists its bands. Otherwise every distinct state
/// gets one item per series, in order of first appearance.
pub fn prepare_legend_items(
    frame: &AlignedFrame,
    options: &LegendOptions,
    theme: &dyn ColorResolver,
    range: TimeRange,
) -> Vec<LegendItem> {
    if !options.show_legend || options.display_mode == LegendDisplayMode::Hidden {
        return Vec::new();
    }
    let Some(first) = frame.fields.first() else {
        return Vec::new();
    };

    match first.config.color_mode() {
        Some(ColorMode::Thresholds)
            if first
                .config
                .thresholds
                .as_ref()
                .is_some_and(|t| t.steps.len() > 1) =>
        {
            return threshold_items(&first.config, theme)
                .into_iter()
                .map(|t| LegendItem {
                    label: t.label,
                    color: t.color,
                    display_values: Vec::new(),
                })
                .collect();
        }
        Some(ColorMode::Continuous) => return Vec::new(),
        _ => {}
    }

    let prefix_series = frame.fields.len() > 1;
    let mut items = Vec::new();
    for (series, field) in frame.fields.iter().enumerate() {
        let mut states: Vec<(String, Color, StateStats)> = Vec::new();
        let mut prev: Option<&Value> = None;

        for (i, value) in field.values.iter().enumerate() {
            if value.is_unset() {
                continue;
            }
            let run_start = !prev.is_some_and(|p| p.strict_eq(value));
            prev = Some(value);
            if value.is_null() || !run_start {
                continue;
            }

            let shown = display_value(field, series, value, theme);
            if shown.text.is_empty() {
                continue;
            }
            let end = find_next_state_index(&field.values, i)
                .and_then(|next| frame.time.get(next).copied())
                .unwrap_or(range.to)
                .min(range.to);
            let start = frame.time.get(i).copied().unwrap_or(range.from).max(range.from);
            let duration = (end - start).max(0.0);

            let slot = match states.iter().position(|(text, ..)| *text == shown.text) {
                Some(pos) => pos,
                None => {
                    let color = shown
                        .color
                        .unwrap_or_else(|| theme.color_by_name(FALLBACK_COLOR));
                    states.push((shown.text, color, StateStats::default()));
                    states.len() - 1
                }
            };
            states[slot].2.duration += duration;
            states[slot].2.occurrences += 1;
        }

        for (text, color, stats) in states {
            let label = if prefix_series {
                format!("{}: {text}", field.display_name())
            } else {
                text
            };
            items.push(legend_item(label, color, stats, options, range));
        }
    }
    items
}

fn legend_item(
    label: String,
    color: Color,
    stats: StateStats,
    options: &LegendOptions,
    range: TimeRange,
) -> LegendItem {
    let values: Vec<LegendDisplayValue> = options
        .values
        .iter()
        .map(|kind| match kind {
            LegendValue::Duration => LegendDisplayValue {
                text: fmt_duration(stats.duration),
                numeric: stats.duration,
                title: "Duration".to_string(),
            },
            LegendValue::Percentage => {
                let pct = stats.duration / range.span() * 100.0;
                LegendDisplayValue {
                    text: format!("{pct:.2}%"),
                    numeric: pct,
                    title: "Percentage".to_string(),
                }
            }
            LegendValue::Occurrences => LegendDisplayValue {
                text: stats.occurrences.to_string(),
                numeric: stats.occurrences as f64,
                title: "Occurrences".to_string(),
            },
        })
        .collect();

    match options.display_mode {
        LegendDisplayMode::List if !values.is_empty() => {
            let parts: Vec<String> = values
                .iter()
                .map(|v| match v.title.as_str() {
                    "Occurrences" if stats.occurrences == 1 => "1 time".to_string(),
                    "Occurrences" => format!("{} times", v.text),
                    _ => v.text.clone(),
                })
                .collect();
            LegendItem {
                label: format!("{label} ({})", parts.join(", ")),
                color,
                display_values: Vec::new(),
            }
        }
        LegendDisplayMode::Table => LegendItem {
            label,
            color,
            display_values: values,
        },
        _ => LegendItem {
            label,
            color,
            display_values: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Field, FieldColor, FieldConfig, FieldType, Threshold, ThresholdsConfig, ThresholdsMode,
    };
    use crate::theme::Theme;

    const START: f64 = 1_749_614_400_000.0;
    const END: f64 = 1_749_625_200_000.0;
    const STEP: f64 = 15.0 * 60_000.0;
    const STATES: [&str; 12] = [
        "Low", "Low", "Low", "Low", "Medium", "Medium", "Low", "Low", "High", "High", "Low", "High",
    ];

    fn states_frame(series: &[&str]) -> AlignedFrame {
        let time = (0..STATES.len()).map(|i| START + i as f64 * STEP).collect();
        let fields = series
            .iter()
            .map(|name| {
                let config = FieldConfig {
                    display_name: Some((*name).to_string()),
                    ..FieldConfig::default()
                };
                Field::new("state", FieldType::String, STATES.iter().map(|s| Value::from(*s)).collect())
                    .with_config(config)
            })
            .collect();
        AlignedFrame { time, fields }
    }

    fn all_values(mode: LegendDisplayMode) -> LegendOptions {
        LegendOptions {
            show_legend: true,
            display_mode: mode,
            values: vec![
                LegendValue::Duration,
                LegendValue::Percentage,
                LegendValue::Occurrences,
            ],
        }
    }

    #[test]
    fn list_mode_appends_statistics() {
        let theme = Theme::dark();
        let items = prepare_legend_items(
            &states_frame(&["Service A"]),
            &all_values(LegendDisplayMode::List),
            &theme,
            TimeRange::new(START, END),
        );
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Low (1h 45m, 58.33%, 3 times)",
                "Medium (30m, 16.67%, 1 time)",
                "High (45m, 25.00%, 2 times)",
            ]
        );
    }

    #[test]
    fn table_mode_exposes_display_values() {
        let theme = Theme::dark();
        let items = prepare_legend_items(
            &states_frame(&["Service A"]),
            &all_values(LegendDisplayMode::Table),
            &theme,
            TimeRange::new(START, END),
        );
        assert_eq!(items[0].label, "Low");
        let values = &items[0].display_values;
        assert_eq!(values.len(), 3);
        assert_eq!((values[0].text.as_str(), values[0].title.as_str()), ("1h 45m", "Duration"));
        assert!((values[0].numeric - 6_300_000.0).abs() < 1e-6);
        assert_eq!(values[1].text, "58.33%");
        assert!((values[1].numeric - 58.333_333_333_333_336).abs() < 1e-9);
        assert_eq!((values[2].text.as_str(), values[2].numeric), ("3", 3.0));
    }

    #[test]
    fn multiple_series_prefix_labels() {
        let theme = Theme::dark();
        let options = LegendOptions::default();
        let items = prepare_legend_items(
            &states_frame(&["Service A", "Service B"]),
            &options,
            &theme,
            TimeRange::new(START, END),
        );
        assert_eq!(items.len(), 6);
        assert_eq!(items[0].label, "Service A: Low");
        assert_eq!(items[3].label, "Service B: Low");
        assert!(items.iter().all(|i| i.display_values.is_empty()));
    }

    #[test]
    fn threshold_colored_data_lists_bands() {
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
        let frame = AlignedFrame {
            time: vec![0.0],
            fields: vec![Field::new("cpu", FieldType::Number, vec![Value::from(1.0)]).with_config(config)],
        };
        let items = prepare_legend_items(&frame, &LegendOptions::default(), &theme, TimeRange::new(0.0, 1.0));
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["< 80", "80+"]);
        assert_eq!(items[1].color, theme.color_by_name("red"));
    }

    #[test]
    fn hidden_legend_is_empty() {
        let theme = Theme::dark();
        let options = LegendOptions {
            display_mode: LegendDisplayMode::Hidden,
            ..LegendOptions::default()
        };
        let items = prepare_legend_items(&states_frame(&["A"]), &options, &theme, TimeRange::new(START, END));
        assert!(items.is_empty());
    }

    #[test]
    fn merged_values_give_the_same_statistics() {
        let theme = Theme::dark();
        let mut frame = states_frame(&["Service A"]);
        let merged = crate::prepare::unset_same_future_values(&frame.fields[0].values).into_owned();
        frame.fields[0] = frame.fields[0].with_values(merged);
        let items = prepare_legend_items(
            &frame,
            &all_values(LegendDisplayMode::List),
            &theme,
            TimeRange::new(START, END),
        );
        assert_eq!(items[0].label, "Low (1h 45m, 58.33%, 3 times)");
    }
}
