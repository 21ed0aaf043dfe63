use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::SchemaError;

const VALUE_OBJECT: &str = "ValueObject";
const ARRAY_VALUE_OBJECT: &str = "ArrayValueObject";
const CELL_OBJECT: &str = "CellObject";

/// One reading with its unit and display precision, as published per sample.
///
/// Wire keys are `v`, `u`, `d` and optional `max`; `value`, `unit` and
/// `digits` are accepted on input. `max` is a display ceiling only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct MeasuredValue {
    #[serde(rename = "v")]
    pub value: f64,
    #[serde(rename = "u")]
    pub unit: String,
    #[serde(rename = "d")]
    pub digits: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl MeasuredValue {
    pub fn new(value: f64, unit: impl Into<String>, digits: u8) -> Self {
        Self {
            value,
            unit: unit.into(),
            digits,
            max: None,
        }
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn from_json(raw: &Value) -> Result<Self, SchemaError> {
        let object = raw
            .as_object()
            .ok_or_else(|| SchemaError::mismatch(VALUE_OBJECT, "expected a JSON object"))?;

        let value = lookup(object, "v", "value")
            .ok_or_else(|| SchemaError::missing(VALUE_OBJECT, "v"))?
            .as_f64()
            .ok_or_else(|| SchemaError::mismatch("v", "expected a number"))?;
        let unit = read_unit(object, VALUE_OBJECT)?;
        let digits = read_digits(object, VALUE_OBJECT)?;
        let max = match object.get("max") {
            None | Some(Value::Null) => None,
            Some(max) => Some(
                max.as_f64()
                    .ok_or_else(|| SchemaError::mismatch("max", "expected a number"))?,
            ),
        };

        Ok(Self {
            value,
            unit,
            digits,
            max,
        })
    }

    /// The value rounded to its display precision.
    pub fn rounded(&self) -> f64 {
        let factor = 10f64.powi(i32::from(self.digits));
        (self.value * factor).round() / factor
    }
}

impl TryFrom<Value> for MeasuredValue {
    type Error = SchemaError;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        Self::from_json(&raw)
    }
}

/// Homogeneous repeated readings, e.g. hourly yield.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct MeasuredArray {
    pub values: Vec<f64>,
    #[serde(rename = "u")]
    pub unit: String,
    #[serde(rename = "d")]
    pub digits: u8,
}

impl MeasuredArray {
    pub fn from_json(raw: &Value) -> Result<Self, SchemaError> {
        let object = raw
            .as_object()
            .ok_or_else(|| SchemaError::mismatch(ARRAY_VALUE_OBJECT, "expected a JSON object"))?;

        let values = object
            .get("values")
            .ok_or_else(|| SchemaError::missing(ARRAY_VALUE_OBJECT, "values"))?
            .as_array()
            .ok_or_else(|| SchemaError::mismatch("values", "expected an array"))?
            .iter()
            .map(|item| {
                item.as_f64()
                    .ok_or_else(|| SchemaError::mismatch("values", "expected numbers only"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            values,
            unit: read_unit(object, ARRAY_VALUE_OBJECT)?,
            digits: read_digits(object, ARRAY_VALUE_OBJECT)?,
        })
    }
}

impl TryFrom<Value> for MeasuredArray {
    type Error = SchemaError;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        Self::from_json(&raw)
    }
}

/// A status channel is either a physical quantity or a textual manufacturer field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, try_from = "Value")]
pub enum LiveValue {
    Measured(MeasuredValue),
    Text(String),
}

impl LiveValue {
    pub fn from_json(raw: &Value) -> Result<Self, SchemaError> {
        match raw {
            Value::String(text) => Ok(LiveValue::Text(text.clone())),
            // Text channels may also arrive wrapped, e.g. `{"value": "yes", "translate": true}`.
            Value::Object(object) => match lookup(object, "v", "value") {
                Some(Value::String(text)) => Ok(LiveValue::Text(text.clone())),
                _ => MeasuredValue::from_json(raw).map(LiveValue::Measured),
            },
            _ => Err(SchemaError::mismatch(
                VALUE_OBJECT,
                "expected a value object or a string",
            )),
        }
    }

    pub fn as_measured(&self) -> Option<&MeasuredValue> {
        match self {
            LiveValue::Measured(value) => Some(value),
            LiveValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            LiveValue::Measured(_) => None,
            LiveValue::Text(text) => Some(text),
        }
    }
}

impl TryFrom<Value> for LiveValue {
    type Error = SchemaError;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        Self::from_json(&raw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    pub name: Option<String>,
    pub value: LiveValue,
}

/// A `values`/`parameters` collection.
///
/// Accepted either as an array of unnamed entries or as an object keyed by
/// channel name. Serializes as an object when every entry is named.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct LiveValues(pub Vec<NamedValue>);

impl LiveValues {
    pub fn from_json(raw: &Value) -> Result<Self, SchemaError> {
        match raw {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    LiveValue::from_json(item).map(|value| NamedValue { name: None, value })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(LiveValues),
            Value::Object(entries) => entries
                .iter()
                .map(|(name, item)| {
                    LiveValue::from_json(item).map(|value| NamedValue {
                        name: Some(name.clone()),
                        value,
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(LiveValues),
            _ => Err(SchemaError::mismatch(
                "values",
                "expected an array or an object of values",
            )),
        }
    }

    pub fn get(&self, name: &str) -> Option<&LiveValue> {
        self.0
            .iter()
            .find(|entry| entry.name.as_deref() == Some(name))
            .map(|entry| &entry.value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedValue> {
        self.0.iter()
    }
}

impl TryFrom<Value> for LiveValues {
    type Error = SchemaError;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        Self::from_json(&raw)
    }
}

impl Serialize for LiveValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !self.0.is_empty() && self.0.iter().all(|entry| entry.name.is_some()) {
            let mut map = serializer.serialize_map(Some(self.0.len()))?;
            for entry in &self.0 {
                map.serialize_entry(entry.name.as_deref().unwrap_or_default(), &entry.value)?;
            }
            map.end()
        } else {
            serializer.collect_seq(self.0.iter().map(|entry| &entry.value))
        }
    }
}

/// Per-cell voltages of one pack. Min, max and diff are always derived from the cells.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct CellAggregate {
    cells: Vec<MeasuredValue>,
}

impl CellAggregate {
    pub fn new(cells: Vec<MeasuredValue>) -> Self {
        Self { cells }
    }

    pub fn from_json(raw: &Value) -> Result<Self, SchemaError> {
        let object = raw
            .as_object()
            .ok_or_else(|| SchemaError::mismatch(CELL_OBJECT, "expected a JSON object"))?;
        let cells = object
            .get("voltage")
            .ok_or_else(|| SchemaError::missing(CELL_OBJECT, "voltage"))?
            .as_array()
            .ok_or_else(|| SchemaError::mismatch("voltage", "expected an array"))?
            .iter()
            .map(MeasuredValue::from_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { cells })
    }

    pub fn cells(&self) -> &[MeasuredValue] {
        &self.cells
    }

    pub fn min(&self) -> Option<&MeasuredValue> {
        self.cells
            .iter()
            .min_by(|a, b| a.value.total_cmp(&b.value))
    }

    pub fn max(&self) -> Option<&MeasuredValue> {
        self.cells
            .iter()
            .max_by(|a, b| a.value.total_cmp(&b.value))
    }

    pub fn diff(&self) -> Option<MeasuredValue> {
        let (min, max) = (self.min()?, self.max()?);
        Some(MeasuredValue::new(
            max.value - min.value,
            max.unit.clone(),
            max.digits.max(min.digits),
        ))
    }
}

impl TryFrom<Value> for CellAggregate {
    type Error = SchemaError;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        Self::from_json(&raw)
    }
}

impl Serialize for CellAggregate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("voltage", &self.cells)?;
        if let (Some(min), Some(max), Some(diff)) = (self.min(), self.max(), self.diff()) {
            map.serialize_entry("cellMinVoltage", min)?;
            map.serialize_entry("cellMaxVoltage", max)?;
            map.serialize_entry("cellDiffVoltage", &diff)?;
        }
        map.end()
    }
}

fn lookup<'a>(
    object: &'a serde_json::Map<String, Value>,
    short: &str,
    long: &str,
) -> Option<&'a Value> {
    object.get(short).or_else(|| object.get(long))
}

fn read_unit(object: &serde_json::Map<String, Value>, entity: &str) -> Result<String, SchemaError> {
    lookup(object, "u", "unit")
        .ok_or_else(|| SchemaError::missing(entity, "u"))?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SchemaError::mismatch("u", "expected a string"))
}

fn read_digits(object: &serde_json::Map<String, Value>, entity: &str) -> Result<u8, SchemaError> {
    lookup(object, "d", "digits")
        .ok_or_else(|| SchemaError::missing(entity, "d"))?
        .as_u64()
        .and_then(|digits| u8::try_from(digits).ok())
        .ok_or_else(|| SchemaError::mismatch("d", "expected a non-negative integer precision"))
}
