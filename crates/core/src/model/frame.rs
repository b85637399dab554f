use serde::{Deserialize, Serialize};

use super::field::{Field, FieldType};

/// A named collection of equal-length fields sharing one time axis.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFrame {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ref_id: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl DataFrame {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            name: None,
            ref_id: None,
            fields,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Number of rows (length of the first field).
    pub fn len(&self) -> usize {
        self.fields.first().map_or(0, Field::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the first time field.
    pub fn time_field_index(&self) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.field_type == FieldType::Time)
    }

    pub fn time_field(&self) -> Option<&Field> {
        self.time_field_index().map(|i| &self.fields[i])
    }

    /// Non-time fields, in order.
    pub fn value_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .filter(|f| f.field_type != FieldType::Time)
    }
}

/// Visible time window in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: f64,
    pub to: f64,
}

impl TimeRange {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    pub fn span(&self) -> f64 {
        self.to - self.from
    }
}

/// Prepared frames outer-joined on time: every field has `time.len()`
/// values. Rows a frame did not have read as `Value::Unset`.
#[derive(Debug, Clone, Default)]
pub struct AlignedFrame {
    pub time: Vec<f64>,
    pub fields: Vec<Field>,
}

impl AlignedFrame {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn series_count(&self) -> usize {
        self.fields.len()
    }

    /// Time range covered by the data; `None` when empty.
    pub fn data_range(&self) -> Option<TimeRange> {
        let first = *self.time.first()?;
        let last = *self.time.last()?;
        Some(TimeRange::new(first, last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    #[test]
    fn locates_time_field() {
        let frame = DataFrame::new(vec![
            Field::new("state", FieldType::String, vec![Value::from("a")]),
            Field::time("time", &[1.0]),
        ]);
        assert_eq!(frame.time_field_index(), Some(1));
        assert_eq!(frame.value_fields().count(), 1);
        assert_eq!(frame.len(), 1);
    }

    #[test]
    fn deserializes_ref_id() {
        let json = r#"{"refId": "A", "fields": []}"#;
        let frame: DataFrame = serde_json::from_str(json).unwrap_or_default();
        assert_eq!(frame.ref_id.as_deref(), Some("A"));
        assert!(frame.is_empty());
    }
}
