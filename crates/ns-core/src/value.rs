use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NsValue {
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<NsValue>),
    Map(BTreeMap<String, NsValue>),
}

impl NsValue {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[NsValue]> {
        match self {
            Self::Array(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, NsValue>> {
        match self {
            Self::Map(values) => Some(values),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
        }
    }

    /// Template truthiness: `false`, `0`, `NaN`, `""` and `[]` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Number(value) => *value != 0.0 && !value.is_nan(),
            Self::String(value) => !value.is_empty(),
            Self::Array(values) => !values.is_empty(),
            Self::Map(_) => true,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Self::Bool(value) => value.to_string(),
            Self::Number(value) => format_number(*value),
            Self::String(value) => value.clone(),
            Self::Array(values) => values
                .iter()
                .map(NsValue::to_text)
                .collect::<Vec<_>>()
                .join(","),
            Self::Map(_) => self.to_json().to_string(),
        }
    }

    /// Converts a document value. `null` has no counterpart and is treated as
    /// absent, including inside lists and maps.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(value) => Some(Self::Bool(*value)),
            serde_json::Value::Number(value) => value.as_f64().map(Self::Number),
            serde_json::Value::String(value) => Some(Self::String(value.clone())),
            serde_json::Value::Array(values) => Some(Self::Array(
                values.iter().filter_map(NsValue::from_json).collect(),
            )),
            serde_json::Value::Object(entries) => Some(Self::Map(
                entries
                    .iter()
                    .filter_map(|(key, value)| {
                        NsValue::from_json(value).map(|value| (key.clone(), value))
                    })
                    .collect(),
            )),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(value) => serde_json::Value::Bool(*value),
            Self::Number(value) => {
                if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
                    serde_json::Value::from(*value as i64)
                } else {
                    serde_json::Number::from_f64(*value)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Self::String(value) => serde_json::Value::String(value.clone()),
            Self::Array(values) => {
                serde_json::Value::Array(values.iter().map(NsValue::to_json).collect())
            }
            Self::Map(values) => serde_json::Value::Object(
                values
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for NsValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for NsValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for NsValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for NsValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for NsValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<NsValue>> for NsValue {
    fn from(values: Vec<NsValue>) -> Self {
        Self::Array(values)
    }
}

pub fn format_number(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON && value.abs() < i64::MAX as f64 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}
