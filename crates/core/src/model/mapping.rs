//! Value mappings: turn raw cells into state text and colors.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::field::Field;
use super::value::Value;

/// What a matched cell displays as. Unset parts keep the formatted value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MappingResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Palette name or CSS color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeMapping {
    #[serde(default)]
    pub from: Option<f64>,
    #[serde(default)]
    pub to: Option<f64>,
    pub result: MappingResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexMapping {
    pub pattern: MappingPattern,
    pub result: MappingResult,
}

/// Special cells a mapping can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialValueMatch {
    #[serde(rename = "true")]
    True,
    #[serde(rename = "false")]
    False,
    #[serde(rename = "null")]
    Null,
    #[serde(rename = "nan")]
    NaN,
    #[serde(rename = "null+nan")]
    NullAndNaN,
    #[serde(rename = "empty")]
    Empty,
}

impl SpecialValueMatch {
    fn matches(self, value: &Value) -> bool {
        let nan = matches!(value, Value::Number(n) if n.is_nan());
        match self {
            SpecialValueMatch::Null => value.is_nullish(),
            SpecialValueMatch::NaN => nan,
            SpecialValueMatch::NullAndNaN => value.is_nullish() || nan,
            SpecialValueMatch::True => match value {
                Value::Bool(b) => *b,
                Value::Text(s) => s.as_ref() == "true",
                _ => false,
            },
            SpecialValueMatch::False => match value {
                Value::Bool(b) => !*b,
                Value::Text(s) => s.as_ref() == "false",
                _ => false,
            },
            SpecialValueMatch::Empty => matches!(value, Value::Text(s) if s.is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialMapping {
    #[serde(rename = "match")]
    pub target: SpecialValueMatch,
    pub result: MappingResult,
}

/// One entry of a field's `mappings` list, tried in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "options", rename_all = "lowercase")]
pub enum ValueMapping {
    /// Exact match on the cell's text form.
    Value(BTreeMap<String, MappingResult>),
    /// Inclusive numeric range; open ends match everything.
    Range(RangeMapping),
    /// Regex over text cells; the result text may use `$1` captures.
    Regex(RegexMapping),
    Special(SpecialMapping),
}

impl ValueMapping {
    fn apply(&self, value: &Value) -> Option<MappingResult> {
        match self {
            ValueMapping::Value(options) => {
                if value.is_nullish() || matches!(value, Value::Other(_)) {
                    return None;
                }
                options.get(&value.to_string()).cloned()
            }
            ValueMapping::Range(range) => {
                let n = match value {
                    Value::Number(n) => *n,
                    Value::Text(s) => s.trim().parse().ok()?,
                    _ => return None,
                };
                if n.is_nan()
                    || range.from.is_some_and(|from| n < from)
                    || range.to.is_some_and(|to| n > to)
                {
                    return None;
                }
                Some(range.result.clone())
            }
            ValueMapping::Regex(mapping) => {
                let Value::Text(text) = value else {
                    return None;
                };
                let regex = mapping.pattern.regex.as_ref()?;
                if !regex.is_match(text) {
                    return None;
                }
                let mut result = mapping.result.clone();
                if let Some(replacement) = mapping.result.text.as_deref() {
                    result.text = Some(if mapping.pattern.global {
                        regex.replace_all(text, replacement).into_owned()
                    } else {
                        regex.replace(text, replacement).into_owned()
                    });
                }
                Some(result)
            }
            ValueMapping::Special(special) => special
                .target
                .matches(value)
                .then(|| special.result.clone()),
        }
    }
}

/// Result of the first mapping that matches `value`.
pub fn map_value(mappings: &[ValueMapping], value: &Value) -> Option<MappingResult> {
    mappings.iter().find_map(|m| m.apply(value))
}

/// Whether `field` maps the special value `target`.
pub fn has_special_mapped_value(field: &Field, target: SpecialValueMatch) -> bool {
    field
        .config
        .mappings
        .iter()
        .any(|m| matches!(m, ValueMapping::Special(s) if s.target == target))
}

/// A regex mapping pattern: plain (`^err`) or slash form with flags
/// (`/^err/i`). Patterns that fail to compile never match.
#[derive(Debug, Clone)]
pub struct MappingPattern {
    source: String,
    regex: Option<Regex>,
    global: bool,
}

impl MappingPattern {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let (body, flags) = match source.strip_prefix('/').and_then(|rest| rest.rsplit_once('/')) {
            Some((body, flags)) => (body, flags),
            None => (source.as_str(), ""),
        };
        let inline: String = flags
            .chars()
            .filter(|c| matches!(c, 'i' | 'm' | 's'))
            .collect();
        let pattern = if inline.is_empty() {
            body.to_string()
        } else {
            format!("(?{inline}){body}")
        };
        Self {
            regex: Regex::new(&pattern).ok(),
            global: flags.contains('g'),
            source,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for MappingPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for MappingPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for MappingPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(MappingPattern::new)
    }
}
