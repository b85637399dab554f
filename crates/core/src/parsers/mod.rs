pub mod columnar;
pub mod simple;

use crate::model::DataFrame;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("simple frame: {0}")]
    Simple(#[from] simple::SimpleFrameError),
    #[error("columnar frame: {0}")]
    Columnar(#[from] columnar::ColumnarFrameError),
    #[error("frame {frame}: field `{field}` has {actual} values, expected {expected}")]
    LengthMismatch {
        frame: usize,
        field: String,
        expected: usize,
        actual: usize,
    },
    #[error("unable to detect frame format")]
    UnknownFormat,
}

/// Auto-detect the frame layout and parse it.
///
/// Detection strategy:
/// 1. A top-level array holds frames of either shape.
/// 2. An object with `frames` holds frames of either shape.
/// 3. An object with `schema` is a single columnar frame.
/// 4. An object with `fields` is a single simple frame.
pub fn parse_frames(data: &[u8]) -> Result<Vec<DataFrame>, ParseError> {
    let value: serde_json::Value = serde_json::from_slice(data)?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut obj) => match obj.remove("frames") {
            Some(serde_json::Value::Array(items)) => items,
            Some(_) => return Err(ParseError::UnknownFormat),
            None => vec![serde_json::Value::Object(obj)],
        },
        _ => return Err(ParseError::UnknownFormat),
    };

    let frames = items
        .into_iter()
        .map(parse_frame_value)
        .collect::<Result<Vec<_>, _>>()?;

    for (index, frame) in frames.iter().enumerate() {
        validate_lengths(index, frame)?;
    }
    Ok(frames)
}

fn parse_frame_value(value: serde_json::Value) -> Result<DataFrame, ParseError> {
    let Some(obj) = value.as_object() else {
        return Err(ParseError::UnknownFormat);
    };
    if obj.contains_key("schema") {
        return Ok(columnar::parse_columnar_frame(value)?);
    }
    if obj.contains_key("fields") {
        return Ok(simple::parse_simple_frame(value)?);
    }
    Err(ParseError::UnknownFormat)
}

fn validate_lengths(index: usize, frame: &DataFrame) -> Result<(), ParseError> {
    let expected = frame.len();
    match frame.fields.iter().find(|f| f.len() != expected) {
        Some(field) => Err(ParseError::LengthMismatch {
            frame: index,
            field: field.name.clone(),
            expected,
            actual: field.len(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_each_shape() {
        let simple = br#"{"fields": [{"name": "time", "type": "time", "values": [1]}]}"#;
        let array = br#"[{"fields": []}, {"fields": []}]"#;
        let wrapped = br#"{"frames": [{"schema": {"fields": [{"name": "t", "type": "time"}]},
            "data": {"values": [[1, 2]]}}]}"#;
        assert_eq!(parse_frames(simple).map(|f| f.len()).unwrap_or(0), 1);
        assert_eq!(parse_frames(array).map(|f| f.len()).unwrap_or(0), 2);
        let frames = parse_frames(wrapped).unwrap_or_default();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 2);
    }

    #[test]
    fn rejects_ragged_frames() {
        let data = br#"{"fields": [
            {"name": "time", "type": "time", "values": [1, 2, 3]},
            {"name": "state", "values": ["a", "b"]}
        ]}"#;
        assert!(matches!(
            parse_frames(data),
            Err(ParseError::LengthMismatch { ref field, expected: 3, actual: 2, .. }) if field == "state"
        ));
    }

    #[test]
    fn rejects_unknown_shapes() {
        assert!(matches!(parse_frames(b"42"), Err(ParseError::UnknownFormat)));
        assert!(matches!(parse_frames(br#"{"a": 1}"#), Err(ParseError::UnknownFormat)));
        assert!(matches!(parse_frames(b"not json"), Err(ParseError::Json(_))));
    }
}
