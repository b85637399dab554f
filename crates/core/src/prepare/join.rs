use std::sync::Arc;

use crate::model::{AlignedFrame, DataFrame, Field, Value};

/// Outer-join frames on their time columns.
///
/// The shared axis is the sorted union of all timestamps. Explicit `Null`
/// cells are kept; rows a frame lacks become `Unset` so they never break a
/// state span. Frames without a time column are skipped.
pub fn join_frames(frames: &[Arc<DataFrame>]) -> AlignedFrame {
    let mut time: Vec<f64> = frames
        .iter()
        .filter_map(|f| f.time_field())
        .flat_map(Field::time_values)
        .filter(|t| !t.is_nan())
        .collect();
    time.sort_by(f64::total_cmp);
    time.dedup();

    let mut fields = Vec::new();
    for frame in frames {
        let Some(time_index) = frame.time_field_index() else {
            continue;
        };
        let frame_time = frame.fields[time_index].time_values();
        let aligned = frame_time == time;
        let rows: Vec<Option<usize>> = frame_time
            .iter()
            .map(|t| time.binary_search_by(|x| x.total_cmp(t)).ok())
            .collect();
        let value_count = frame.value_fields().count();

        for field in frame.value_fields() {
            let mut joined = if aligned {
                field.clone()
            } else {
                let mut values = vec![Value::Unset; time.len()];
                for (row, slot) in rows.iter().enumerate() {
                    if let (Some(j), Some(v)) = (slot, field.values.get(row)) {
                        values[*j] = v.clone();
                    }
                }
                field.with_values(values)
            };
            if joined.config.display_name.is_none()
                && let Some(name) = frame.name.as_deref()
            {
                joined.config.display_name = Some(if value_count == 1 {
                    name.to_string()
                } else {
                    format!("{name} {}", field.name)
                });
            }
            fields.push(joined);
        }
    }

    AlignedFrame { time, fields }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldType;

    fn frame(time: &[f64], values: Vec<Value>) -> Arc<DataFrame> {
        Arc::new(DataFrame::new(vec![
            Field::time("time", time),
            Field::new("state", FieldType::String, values),
        ]))
    }

    #[test]
    fn single_aligned_frame_shares_values() {
        let f = frame(&[1.0, 2.0], vec![Value::from("a"), Value::from("b")]);
        let joined = join_frames(&[Arc::clone(&f)]);
        assert_eq!(joined.time, vec![1.0, 2.0]);
        assert!(Arc::ptr_eq(&joined.fields[0].values, &f.fields[1].values));
    }

    #[test]
    fn keeps_nulls_and_fills_missing_rows_with_unset() {
        let a = frame(&[1.0, 3.0], vec![Value::from("a"), Value::Null]);
        let b = frame(&[2.0, 3.0], vec![Value::from("x"), Value::from("y")]);
        let joined = join_frames(&[a, b]);
        assert_eq!(joined.time, vec![1.0, 2.0, 3.0]);
        assert_eq!(joined.series_count(), 2);
        assert_eq!(
            joined.fields[0].values.as_ref(),
            &[Value::from("a"), Value::Unset, Value::Null]
        );
        assert_eq!(
            joined.fields[1].values.as_ref(),
            &[Value::Unset, Value::from("x"), Value::from("y")]
        );
    }

    #[test]
    fn names_series_after_their_frame() {
        let a = Arc::new(
            DataFrame::new(vec![
                Field::time("time", &[1.0]),
                Field::new("state", FieldType::String, vec![Value::from("up")]),
            ])
            .with_name("Service A"),
        );
        let joined = join_frames(&[a]);
        assert_eq!(joined.fields[0].display_name(), "Service A");
    }

    #[test]
    fn skips_frames_without_time() {
        let no_time = Arc::new(DataFrame::new(vec![Field::new(
            "state",
            FieldType::String,
            vec![Value::from("a")],
        )]));
        let joined = join_frames(&[no_time]);
        assert!(joined.is_empty());
        assert_eq!(joined.series_count(), 0);
    }
}
