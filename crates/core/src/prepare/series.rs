use std::sync::Arc;

use crate::model::DataFrame;

/// Split every frame into one `[time, value]` frame per value field.
///
/// Frames without a time field are dropped. Each output frame keeps the
/// source frame's name and ref id.
pub fn make_frame_per_series(frames: &[Arc<DataFrame>]) -> Vec<Arc<DataFrame>> {
    let mut out = Vec::new();
    for frame in frames {
        let Some(time) = frame.time_field() else {
            continue;
        };
        for field in frame.value_fields() {
            out.push(Arc::new(DataFrame {
                name: frame.name.clone(),
                ref_id: frame.ref_id.clone(),
                fields: vec![time.clone(), field.clone()],
            }));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, FieldType, Value};

    #[test]
    fn one_frame_per_value_field() {
        let frame = Arc::new(DataFrame::new(vec![
            Field::time("time", &[1.0, 2.0]),
            Field::new("a", FieldType::Number, vec![Value::from(1.0), Value::from(2.0)]),
            Field::new("b", FieldType::String, vec![Value::from("x"), Value::from("y")]),
        ]));
        let no_time = Arc::new(DataFrame::new(vec![Field::new(
            "c",
            FieldType::Number,
            vec![Value::from(3.0)],
        )]));
        let split = make_frame_per_series(&[frame, no_time]);
        assert_eq!(split.len(), 2);
        assert_eq!(split[0].fields.len(), 2);
        assert_eq!(split[0].fields[0].field_type, FieldType::Time);
        assert_eq!(split[1].fields[1].name, "b");
    }
}
