//! Turn query frames into timeline-ready frames.

pub mod join;
pub mod merge;
pub mod series;
pub mod thresholds;

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::model::{ColorMode, DataFrame, Field, FieldType, SpanNulls, Value};
use crate::theme::ColorResolver;

pub use join::join_frames;
pub use merge::{find_next_state_index, unset_same_future_values};
pub use series::make_frame_per_series;
pub use thresholds::{ThresholdItem, active_threshold, merge_threshold_values, threshold_items};

/// Why a set of frames cannot be shown as a timeline. The message is meant
/// to be displayed verbatim in place of the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimelineWarning {
    #[error("No data in response")]
    NoData,
    #[error("Data does not have a time field")]
    NoTimeField,
    #[error("No graphable fields")]
    NoGraphableFields,
}

/// How the preparer treats a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldRole {
    Time,
    Value,
    Unsupported,
}

impl FieldRole {
    fn of(field: &Field, has_time: bool) -> Self {
        match field.field_type {
            FieldType::Time if !has_time => FieldRole::Time,
            FieldType::Number | FieldType::Boolean | FieldType::String => FieldRole::Value,
            FieldType::Time | FieldType::Other => FieldRole::Unsupported,
        }
    }
}

/// Prepare frames for the timeline.
///
/// Per frame: keep the first time field, keep number/boolean/string
/// fields, drop everything else. A second time field holds state end
/// times (see [`apply_end_times`]). Threshold-colored numeric fields are
/// bucketed into their bands and, with `merge_values`, repeated states are
/// collapsed. Every kept value field is marked `spanNulls: never`.
///
/// Frames that need no change are returned as the same `Arc`.
pub fn prepare_timeline_fields(
    frames: &[Arc<DataFrame>],
    merge_values: bool,
    theme: &dyn ColorResolver,
) -> Result<Vec<Arc<DataFrame>>, TimelineWarning> {
    if frames.is_empty() {
        debug!("prepare: no frames");
        return Err(TimelineWarning::NoData);
    }

    let mut any_time = false;
    let mut prepared = Vec::with_capacity(frames.len());

    for (index, original) in frames.iter().enumerate() {
        let sorted = sort_by_time(original);
        let frame = sorted.as_ref().unwrap_or(original.as_ref());
        let closed = apply_end_times(frame);
        let frame = closed.as_ref().unwrap_or(frame);
        let mut changed = sorted.is_some() || closed.is_some();
        let mut has_time = false;
        let mut has_value = false;
        let mut fields = Vec::with_capacity(frame.fields.len());

        for field in &frame.fields {
            match FieldRole::of(field, has_time) {
                FieldRole::Time => {
                    has_time = true;
                    fields.push(field.clone());
                }
                FieldRole::Value => {
                    let (mut field, rewritten) = prepare_value_field(field, merge_values, theme);
                    changed |= rewritten;
                    if field.config.custom.span_nulls != Some(SpanNulls::Never) {
                        field.config.custom.span_nulls = Some(SpanNulls::Never);
                        changed = true;
                    }
                    has_value = true;
                    fields.push(field);
                }
                FieldRole::Unsupported => {
                    debug!(frame = index, field = %field.name, "prepare: dropping unsupported field");
                    changed = true;
                }
            }
        }

        any_time |= has_time;
        if !(has_time && has_value) {
            debug!(frame = index, has_time, has_value, "prepare: dropping frame");
            continue;
        }
        prepared.push(if changed {
            Arc::new(DataFrame {
                name: frame.name.clone(),
                ref_id: frame.ref_id.clone(),
                fields,
            })
        } else {
            Arc::clone(original)
        });
    }

    if !any_time {
        debug!("prepare: no time field in any frame");
        return Err(TimelineWarning::NoTimeField);
    }
    if prepared.is_empty() {
        debug!("prepare: no graphable fields");
        return Err(TimelineWarning::NoGraphableFields);
    }
    Ok(prepared)
}

/// Bucket or merge one value field. The flag reports a rewrite.
fn prepare_value_field(field: &Field, merge_values: bool, theme: &dyn ColorResolver) -> (Field, bool) {
    if !merge_values {
        return (field.clone(), false);
    }
    if field.field_type == FieldType::Number
        && field.config.color_mode() == Some(ColorMode::Thresholds)
        && let Some(bucketed) = merge_threshold_values(field, theme)
    {
        return (bucketed, true);
    }
    match unset_same_future_values(&field.values) {
        std::borrow::Cow::Owned(values) => (field.with_values(values), true),
        std::borrow::Cow::Borrowed(_) => (field.clone(), false),
    }
}

/// Stably reorder a frame's rows when its time field decreases anywhere.
fn sort_by_time(frame: &DataFrame) -> Option<DataFrame> {
    let time = frame.time_field()?.time_values();
    if time.windows(2).all(|w| w[0].total_cmp(&w[1]).is_le()) {
        return None;
    }
    let mut order: Vec<usize> = (0..time.len()).collect();
    order.sort_by(|&a, &b| time[a].total_cmp(&time[b]));
    debug!(rows = time.len(), "prepare: sorting frame by time");

    let fields = frame
        .fields
        .iter()
        .map(|field| {
            let values: Vec<Value> = order
                .iter()
                .map(|&i| field.values.get(i).cloned().unwrap_or_default())
                .collect();
            field.with_values(values)
        })
        .collect();
    Some(DataFrame {
        name: frame.name.clone(),
        ref_id: frame.ref_id.clone(),
        fields,
    })
}

/// Close states at the frame's end times, given by its second time field.
///
/// The rows are outer-joined with the end timestamps: an end time reads as
/// `Null` in every value field unless a state starts at the same instant.
/// Missing and nullish cells all become `Null`. The end field is removed.
fn apply_end_times(frame: &DataFrame) -> Option<DataFrame> {
    let mut time_fields = frame
        .fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.field_type == FieldType::Time)
        .map(|(i, _)| i);
    let start_index = time_fields.next()?;
    let end_index = time_fields.next()?;

    let starts = frame.fields[start_index].time_values();
    let ends = frame.fields[end_index].time_values();
    let mut time: Vec<f64> = starts
        .iter()
        .chain(&ends)
        .copied()
        .filter(|t| !t.is_nan())
        .collect();
    time.sort_by(f64::total_cmp);
    time.dedup();
    let rows: Vec<Option<usize>> = starts
        .iter()
        .map(|t| time.binary_search_by(|x| x.total_cmp(t)).ok())
        .collect();
    debug!(rows = starts.len(), joined = time.len(), "prepare: closing states at end times");

    let fields = frame
        .fields
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != end_index)
        .map(|(i, field)| {
            if i == start_index {
                return field.with_values(time.iter().copied().map(Value::Number).collect());
            }
            let mut values = vec![Value::Null; time.len()];
            for (row, slot) in rows.iter().enumerate() {
                if let (Some(j), Some(v)) = (slot, field.values.get(row))
                    && !v.is_nullish()
                {
                    values[*j] = v.clone();
                }
            }
            field.with_values(values)
        })
        .collect();
    Some(DataFrame {
        name: frame.name.clone(),
        ref_id: frame.ref_id.clone(),
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldColor, FieldConfig, Threshold, ThresholdsConfig, ThresholdsMode};
    use crate::theme::Theme;

    fn frame(fields: Vec<Field>) -> Arc<DataFrame> {
        Arc::new(DataFrame::new(fields))
    }

    fn strings(values: &[&str]) -> Vec<Value> {
        values.iter().map(|s| Value::from(*s)).collect()
    }

    #[test]
    fn empty_input_is_no_data() {
        let theme = Theme::dark();
        assert_eq!(
            prepare_timeline_fields(&[], true, &theme).err(),
            Some(TimelineWarning::NoData)
        );
        assert_eq!(TimelineWarning::NoData.to_string(), "No data in response");
    }

    #[test]
    fn frames_without_time_warn_first() {
        let theme = Theme::dark();
        let frames = [frame(vec![Field::new("a", FieldType::Number, vec![Value::from(1.0)])])];
        let warn = prepare_timeline_fields(&frames, true, &theme).err();
        assert_eq!(warn, Some(TimelineWarning::NoTimeField));
        assert_eq!(
            warn.map(|w| w.to_string()).as_deref(),
            Some("Data does not have a time field")
        );
    }

    #[test]
    fn time_with_only_other_fields_is_not_graphable() {
        let theme = Theme::dark();
        let other = Field::new(
            "obj",
            FieldType::Other,
            vec![Value::Other(serde_json::json!({"a": 1}))],
        );
        let frames = [frame(vec![Field::time("time", &[1.0]), other])];
        let warn = prepare_timeline_fields(&frames, true, &theme).err();
        assert_eq!(warn.map(|w| w.to_string()).as_deref(), Some("No graphable fields"));
    }

    #[test]
    fn merges_values_and_marks_span_nulls() {
        let theme = Theme::dark();
        let frames = [frame(vec![
            Field::time("time", &[1.0, 2.0, 3.0, 4.0]),
            Field::new("state", FieldType::String, strings(&["a", "a", "b", "b"])),
            Field::new("flag", FieldType::Boolean, vec![Value::from(true); 4]),
        ])];
        let out = prepare_timeline_fields(&frames, true, &theme).unwrap_or_default();
        assert_eq!(out.len(), 1);
        let state = &out[0].fields[1];
        assert_eq!(
            state.values.as_ref(),
            &[Value::from("a"), Value::Unset, Value::from("b"), Value::Unset]
        );
        assert_eq!(state.config.custom.span_nulls, Some(SpanNulls::Never));
        let flag = &out[0].fields[2];
        assert_eq!(flag.values.iter().filter(|v| v.is_unset()).count(), 3);
    }

    #[test]
    fn without_merge_values_are_untouched() {
        let theme = Theme::dark();
        let frames = [frame(vec![
            Field::time("time", &[1.0, 2.0]),
            Field::new("state", FieldType::String, strings(&["a", "a"])),
        ])];
        let out = prepare_timeline_fields(&frames, false, &theme).unwrap_or_default();
        assert!(Arc::ptr_eq(&out[0].fields[1].values, &frames[0].fields[1].values));
    }

    #[test]
    fn prepared_output_is_reused_as_is() {
        let theme = Theme::dark();
        let frames = [frame(vec![
            Field::time("time", &[1.0, 2.0, 3.0]),
            Field::new("state", FieldType::String, strings(&["a", "a", "b"])),
        ])];
        let once = prepare_timeline_fields(&frames, true, &theme).unwrap_or_default();
        let twice = prepare_timeline_fields(&once, true, &theme).unwrap_or_default();
        assert_eq!(twice.len(), 1);
        assert!(Arc::ptr_eq(&once[0], &twice[0]));
    }

    #[test]
    fn drops_unsupported_fields_and_frames() {
        let theme = Theme::dark();
        let good = frame(vec![
            Field::time("time", &[1.0]),
            Field::new("state", FieldType::String, strings(&["a"])),
            Field::new("blob", FieldType::Other, vec![Value::Null]),
        ]);
        let only_time = frame(vec![Field::time("time", &[1.0])]);
        let out = prepare_timeline_fields(&[good, only_time], true, &theme).unwrap_or_default();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].fields.len(), 2);
    }

    #[test]
    fn buckets_threshold_colored_numbers() {
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
        let cpu = Field::new(
            "cpu",
            FieldType::Number,
            [10.0, 50.0, 90.0].iter().copied().map(Value::Number).collect(),
        )
        .with_config(config);
        let frames = [frame(vec![Field::time("time", &[1.0, 2.0, 3.0]), cpu])];
        let out = prepare_timeline_fields(&frames, true, &theme).unwrap_or_default();
        let cpu = &out[0].fields[1];
        assert_eq!(cpu.field_type, FieldType::String);
        assert_eq!(
            cpu.values.as_ref(),
            &[Value::from("< 80"), Value::Unset, Value::from("80+")]
        );
        assert_eq!(cpu.config.mappings.len(), 1);
    }

    #[test]
    fn sorts_rows_by_time() {
        let theme = Theme::dark();
        let frames = [frame(vec![
            Field::time("time", &[3.0, 1.0, 2.0]),
            Field::new("state", FieldType::String, strings(&["c", "a", "b"])),
        ])];
        let out = prepare_timeline_fields(&frames, true, &theme).unwrap_or_default();
        assert_eq!(out[0].fields[0].time_values(), vec![1.0, 2.0, 3.0]);
        assert_eq!(out[0].fields[1].values.as_ref(), strings(&["a", "b", "c"]).as_slice());
    }

    #[test]
    fn second_time_field_closes_states() {
        let theme = Theme::dark();
        let frames = [frame(vec![
            Field::time("start", &[0.0, 10.0]),
            Field::time("end", &[10.0, 20.0]),
            Field::new("state", FieldType::String, strings(&["a", "b"])),
        ])];
        let out = prepare_timeline_fields(&frames, true, &theme).unwrap_or_default();
        assert_eq!(out[0].fields.len(), 2);
        assert_eq!(out[0].fields[0].time_values(), vec![0.0, 10.0, 20.0]);
        // a state starting where the previous one ends wins over the null
        assert_eq!(
            out[0].fields[1].values.as_ref(),
            &[Value::from("a"), Value::from("b"), Value::Null]
        );
    }

    #[test]
    fn end_times_join_across_channels() {
        let theme = Theme::dark();
        let channel = |starts: &[f64], ends: &[f64], states: &[&str]| {
            frame(vec![
                Field::time("time", starts),
                Field::time("endTime", ends),
                Field::new("state", FieldType::String, strings(states)),
            ])
        };
        let frames = [
            channel(
                &[1_709_107_200_000.0, 1_709_118_000_000.0],
                &[1_709_114_400_000.0, 1_709_128_800_000.0],
                &["OK", "NO_DATA"],
            ),
            channel(
                &[1_709_110_800_000.0, 1_709_123_400_000.0],
                &[1_709_116_200_000.0, 1_709_127_000_000.0],
                &["ERROR", "WARNING"],
            ),
        ];
        let prepared = prepare_timeline_fields(&frames, true, &theme).unwrap_or_default();
        let joined = join_frames(&prepared);
        assert_eq!(
            joined.time,
            vec![
                1_709_107_200_000.0,
                1_709_110_800_000.0,
                1_709_114_400_000.0,
                1_709_116_200_000.0,
                1_709_118_000_000.0,
                1_709_123_400_000.0,
                1_709_127_000_000.0,
                1_709_128_800_000.0,
            ]
        );
        let (u, null) = (Value::Unset, Value::Null);
        assert_eq!(
            joined.fields[0].values.as_ref(),
            &[
                Value::from("OK"),
                u.clone(),
                null.clone(),
                u.clone(),
                Value::from("NO_DATA"),
                u.clone(),
                u.clone(),
                null.clone(),
            ]
        );
        assert_eq!(
            joined.fields[1].values.as_ref(),
            &[
                u.clone(),
                Value::from("ERROR"),
                u.clone(),
                null.clone(),
                u.clone(),
                Value::from("WARNING"),
                null,
                u,
            ]
        );
    }
}
