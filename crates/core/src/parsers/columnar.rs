use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{DataFrame, Field, FieldConfig, FieldType, Value};

#[derive(Debug, Error)]
pub enum ColumnarFrameError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("schema declares {fields} fields but data has {columns} value columns")]
    ColumnCount { fields: usize, columns: usize },
}

#[derive(Deserialize)]
struct FrameJson {
    schema: SchemaJson,
    #[serde(default)]
    data: Option<DataJson>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaJson {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    ref_id: Option<String>,
    #[serde(default)]
    fields: Vec<FieldSchemaJson>,
}

#[derive(Deserialize)]
struct FieldSchemaJson {
    name: String,
    #[serde(rename = "type", default)]
    field_type: Option<String>,
    #[serde(default)]
    config: FieldConfig,
}

#[derive(Deserialize, Default)]
struct DataJson {
    #[serde(default)]
    values: Vec<Vec<Value>>,
    #[serde(default)]
    entities: Vec<Option<EntitiesJson>>,
}

/// Per-field indices of values plain JSON cannot carry.
#[derive(Serialize, Deserialize, Default)]
struct EntitiesJson {
    #[serde(rename = "NaN", default, skip_serializing_if = "Vec::is_empty")]
    nan: Vec<usize>,
    #[serde(rename = "Inf", default, skip_serializing_if = "Vec::is_empty")]
    inf: Vec<usize>,
    #[serde(rename = "NegInf", default, skip_serializing_if = "Vec::is_empty")]
    neg_inf: Vec<usize>,
    #[serde(rename = "Undef", default, skip_serializing_if = "Vec::is_empty")]
    undef: Vec<usize>,
}

impl EntitiesJson {
    /// Record the cells that serialize as plain `null` but are not null.
    fn collect(values: &[Value]) -> Option<Self> {
        let mut entities = Self::default();
        for (i, value) in values.iter().enumerate() {
            match value {
                Value::Unset => entities.undef.push(i),
                Value::Number(n) if n.is_nan() => entities.nan.push(i),
                Value::Number(n) if *n == f64::INFINITY => entities.inf.push(i),
                Value::Number(n) if *n == f64::NEG_INFINITY => entities.neg_inf.push(i),
                _ => {}
            }
        }
        let empty = entities.nan.is_empty()
            && entities.inf.is_empty()
            && entities.neg_inf.is_empty()
            && entities.undef.is_empty();
        (!empty).then_some(entities)
    }

    fn apply(&self, values: &mut [Value]) {
        let replacements = [
            (&self.nan, Value::Number(f64::NAN)),
            (&self.inf, Value::Number(f64::INFINITY)),
            (&self.neg_inf, Value::Number(f64::NEG_INFINITY)),
            (&self.undef, Value::Unset),
        ];
        for (indices, replacement) in replacements {
            for &i in indices {
                if let Some(slot) = values.get_mut(i) {
                    *slot = replacement.clone();
                }
            }
        }
    }
}

/// Parse the schema + columnar data wire shape:
/// `{schema: {name?, refId?, fields: [{name, type, config?}]},
///   data: {values: [[...]], entities?: [...]}}`.
pub fn parse_columnar_frame(value: serde_json::Value) -> Result<DataFrame, ColumnarFrameError> {
    let frame: FrameJson = serde_json::from_value(value)?;
    let data = frame.data.unwrap_or_default();

    let field_count = frame.schema.fields.len();
    if !data.values.is_empty() && data.values.len() != field_count {
        return Err(ColumnarFrameError::ColumnCount {
            fields: field_count,
            columns: data.values.len(),
        });
    }

    let mut columns = data.values.into_iter();
    let fields = frame
        .schema
        .fields
        .into_iter()
        .enumerate()
        .map(|(i, schema)| {
            let mut values = columns.next().unwrap_or_default();
            if let Some(Some(entities)) = data.entities.get(i) {
                entities.apply(&mut values);
            }
            let field_type = schema.field_type.as_deref().map_or_else(
                || FieldType::guess(&schema.name, &values),
                FieldType::from_name,
            );
            Field::new(schema.name, field_type, values).with_config(schema.config)
        })
        .collect();

    Ok(DataFrame {
        name: frame.schema.name,
        ref_id: frame.schema.ref_id,
        fields,
    })
}

/// Columnar wire form of a frame, readable by [`parse_columnar_frame`].
///
/// Unset cells, NaN and infinities are written as `null` plus an entity
/// index, so a prepared frame survives the trip with its merged runs and
/// its config (value mappings included).
#[derive(Serialize)]
pub struct ColumnarFrame<'a> {
    schema: SchemaOut<'a>,
    data: DataOut<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SchemaOut<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ref_id: Option<&'a str>,
    fields: Vec<FieldSchemaOut<'a>>,
}

#[derive(Serialize)]
struct FieldSchemaOut<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    field_type: FieldType,
    config: &'a FieldConfig,
}

#[derive(Serialize)]
struct DataOut<'a> {
    values: Vec<&'a [Value]>,
    entities: Vec<Option<EntitiesJson>>,
}

impl<'a> ColumnarFrame<'a> {
    pub fn new(frame: &'a DataFrame) -> Self {
        let fields = frame
            .fields
            .iter()
            .map(|f| FieldSchemaOut {
                name: &f.name,
                field_type: f.field_type,
                config: &f.config,
            })
            .collect();
        Self {
            schema: SchemaOut {
                name: frame.name.as_deref(),
                ref_id: frame.ref_id.as_deref(),
                fields,
            },
            data: DataOut {
                values: frame.fields.iter().map(|f| f.values.as_ref()).collect(),
                entities: frame
                    .fields
                    .iter()
                    .map(|f| EntitiesJson::collect(&f.values))
                    .collect(),
            },
        }
    }
}
