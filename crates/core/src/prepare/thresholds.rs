use std::collections::BTreeMap;
use std::sync::Arc;

use state_timeline_protocol::Color;

use super::merge::unset_same_future_values;
use crate::format::format_value;
use crate::model::{
    Field, FieldConfig, FieldType, MappingResult, Threshold, ThresholdsMode, Value, ValueMapping,
};
use crate::theme::ColorResolver;

/// A labelled threshold band, as shown in legends and bucketed cells.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdItem {
    pub label: String,
    pub color: Color,
    pub threshold: Threshold,
}

/// Derive one label per step.
///
/// The base step (minus infinity) reads `< next`; every other step reads
/// `value+`. Percentage thresholds format with a `%` unit.
pub fn threshold_items(config: &FieldConfig, theme: &dyn ColorResolver) -> Vec<ThresholdItem> {
    let Some(thresholds) = config.thresholds.as_ref() else {
        return Vec::new();
    };
    let unit = match thresholds.mode {
        ThresholdsMode::Percentage => Some("percent"),
        ThresholdsMode::Absolute => config.unit.as_deref(),
    };
    let fmt = |v: f64| format_value(v, unit, config.decimals);
    let steps = &thresholds.steps;

    steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let label = match steps.get(i + 1) {
                Some(next) if step.value == f64::NEG_INFINITY => format!("< {}", fmt(next.value)),
                _ => format!("{}+", fmt(step.value)),
            };
            ThresholdItem {
                label,
                color: theme.color_by_name(&step.color),
                threshold: step.clone(),
            }
        })
        .collect()
}

/// Index of the step that applies to `value`: the last step whose lower
/// bound is `<= value`, clamped to the first step.
pub fn active_threshold(value: f64, steps: &[Threshold]) -> Option<usize> {
    if steps.is_empty() {
        return None;
    }
    let mut active = 0;
    for (i, step) in steps.iter().enumerate().skip(1) {
        if value >= step.value {
            active = i;
        } else {
            break;
        }
    }
    Some(active)
}

/// Min and max used to rescale a field into percent: config bounds first,
/// then the finite data extremes.
pub fn percentage_bounds(field: &Field) -> (f64, f64) {
    let (data_min, data_max) = field
        .values
        .iter()
        .filter_map(Value::as_f64)
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    (
        field.config.min.unwrap_or(data_min),
        field.config.max.unwrap_or(data_max),
    )
}

/// Replace a numeric field's values with their threshold band labels.
///
/// The result is a string field, already run-merged, whose config gains a
/// leading value mapping from each band label to its color. Returns `None`
/// (keep the original field) when the field is not numeric or has fewer
/// than two steps.
pub fn merge_threshold_values(field: &Field, theme: &dyn ColorResolver) -> Option<Field> {
    if field.field_type != FieldType::Number {
        return None;
    }
    let thresholds = field.config.thresholds.as_ref()?;
    if thresholds.steps.len() < 2 {
        return None;
    }
    let items = threshold_items(&field.config, theme);
    if items.len() != thresholds.steps.len() {
        return None;
    }

    let labels: Vec<Arc<str>> = items.iter().map(|t| Arc::from(t.label.as_str())).collect();
    let rescale: Box<dyn Fn(f64) -> f64> = match thresholds.mode {
        ThresholdsMode::Absolute => Box::new(|v| v),
        ThresholdsMode::Percentage => {
            let (min, max) = percentage_bounds(field);
            Box::new(move |v| (v - min) / (max - min) * 100.0)
        }
    };

    let bucketed: Vec<Value> = field
        .values
        .iter()
        .map(|v| match v {
            Value::Number(n) => {
                let i = active_threshold(rescale(*n), &thresholds.steps).unwrap_or(0);
                Value::Text(Arc::clone(&labels[i]))
            }
            other => other.clone(),
        })
        .collect();
    let merged = unset_same_future_values(&bucketed).into_owned();

    let bands: BTreeMap<String, MappingResult> = items
        .iter()
        .zip(0u32..)
        .map(|(item, index)| {
            let result = MappingResult {
                text: Some(item.label.clone()),
                color: Some(item.threshold.color.clone()),
                index: Some(index),
            };
            (item.label.clone(), result)
        })
        .collect();
    let mut config = field.config.clone();
    config.mappings.insert(0, ValueMapping::Value(bands));

    Some(Field::new(field.name.clone(), FieldType::String, merged).with_config(config))
}
