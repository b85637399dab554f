use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use state_timeline_protocol::Color;

use super::mapping::ValueMapping;
use super::value::Value;

/// Column type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Time,
    Number,
    Boolean,
    String,
    Other,
}

impl FieldType {
    /// Map a wire type name; unknown names (`enum`, `frame`, ...) are `Other`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "time" => FieldType::Time,
            "number" => FieldType::Number,
            "boolean" => FieldType::Boolean,
            "string" => FieldType::String,
            _ => FieldType::Other,
        }
    }

    /// Guess the type of an untyped field: a field named `time` or `date`
    /// is a time column, otherwise the first non-null value decides.
    pub fn guess(name: &str, values: &[Value]) -> Self {
        if name.eq_ignore_ascii_case("time") || name.eq_ignore_ascii_case("date") {
            return FieldType::Time;
        }
        Self::infer(values)
    }

    /// Guess the type from the first cell that carries a value.
    pub fn infer(values: &[Value]) -> Self {
        values
            .iter()
            .find(|v| !v.is_nullish())
            .map_or(FieldType::Other, |v| match v {
                Value::Number(_) => FieldType::Number,
                Value::Bool(_) => FieldType::Boolean,
                Value::Text(_) => FieldType::String,
                Value::Unset | Value::Null | Value::Other(_) => FieldType::Other,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdsMode {
    #[default]
    Absolute,
    Percentage,
}

/// One threshold band: `value` is the inclusive lower bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    #[serde(
        default = "base_step_value",
        serialize_with = "serialize_step_value",
        deserialize_with = "deserialize_step_value"
    )]
    pub value: f64,
    pub color: String,
}

impl Threshold {
    pub fn new(value: f64, color: impl Into<String>) -> Self {
        Self {
            value,
            color: color.into(),
        }
    }
}

fn base_step_value() -> f64 {
    f64::NEG_INFINITY
}

/// The base step of a threshold list is written as `null` (minus infinity).
fn deserialize_step_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
}

fn serialize_step_value<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    #[serde(default)]
    pub mode: ThresholdsMode,
    pub steps: Vec<Threshold>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Thresholds,
    Fixed,
    #[default]
    Classic,
    Continuous,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldColor {
    pub mode: ColorMode,
    pub fixed_color: Option<String>,
}

/// How the draw path treats null gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanNulls {
    /// Interpolate across gaps.
    Connect,
    /// Consecutive nulls form one gap; never connect across it.
    Never,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomConfig {
    /// Box fill opacity in percent.
    pub fill_opacity: Option<f64>,
    pub line_width: Option<f64>,
    pub span_nulls: Option<SpanNulls>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldConfig {
    pub display_name: Option<String>,
    pub unit: Option<String>,
    pub decimals: Option<u32>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub color: Option<FieldColor>,
    pub thresholds: Option<ThresholdsConfig>,
    pub mappings: Vec<ValueMapping>,
    pub custom: CustomConfig,
}

impl FieldConfig {
    pub fn color_mode(&self) -> Option<ColorMode> {
        self.color.as_ref().map(|c| c.mode)
    }
}

/// Result of formatting one cell for display.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayValue {
    pub text: String,
    pub color: Option<Color>,
    pub numeric: f64,
}

/// A named, typed column. Cloning is cheap: values are shared.
///
/// Frames go back on the wire in columnar form (see
/// `parsers::columnar::ColumnarFrame`), which keeps `Unset` apart from `Null`.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawField")]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub values: Arc<[Value]>,
    pub config: FieldConfig,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            field_type,
            values: Arc::from(values),
            config: FieldConfig::default(),
        }
    }

    /// A time column from epoch-millisecond timestamps.
    pub fn time(name: impl Into<String>, millis: &[f64]) -> Self {
        Self::new(
            name,
            FieldType::Time,
            millis.iter().copied().map(Value::Number).collect(),
        )
    }

    pub fn with_config(mut self, config: FieldConfig) -> Self {
        self.config = config;
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Display name, falling back to the field name.
    pub fn display_name(&self) -> &str {
        self.config.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Time values as floats; non-numeric cells read as NaN.
    pub fn time_values(&self) -> Vec<f64> {
        self.values
            .iter()
            .map(|v| v.as_f64().unwrap_or(f64::NAN))
            .collect()
    }

    /// Same field with different cells and the same config.
    pub fn with_values(&self, values: Vec<Value>) -> Self {
        Self {
            values: Arc::from(values),
            ..self.clone()
        }
    }
}

/// Wire form of a field: `type` may be omitted and is then inferred.
#[derive(Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type", default)]
    field_type: Option<String>,
    #[serde(default)]
    values: Vec<Value>,
    #[serde(default)]
    config: FieldConfig,
}

impl From<RawField> for Field {
    fn from(raw: RawField) -> Self {
        let field_type = raw.field_type.as_deref().map_or_else(
            || FieldType::guess(&raw.name, &raw.values),
            FieldType::from_name,
        );
        Field::new(raw.name, field_type, raw.values).with_config(raw.config)
    }
}
