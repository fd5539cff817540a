use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{ElementId, Literal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueType {
    Null,
    Undefined,
    String,
    Number,
    Boolean,
    Element,
    ElementList,
    Array,
    Object,
    Function,
    Event,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Element => "element",
            Self::ElementList => "element-list",
            Self::Array => "array",
            Self::Object => "object",
            Self::Function => "function",
            Self::Event => "event",
        }
    }
}

/// A named callable. The runtime resolves the name against its function table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventValue {
    pub name: String,
    pub target: Option<ElementId>,
    pub detail: Value,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Null,
    #[default]
    Undefined,
    String(String),
    Number(f64),
    Boolean(bool),
    Element(ElementId),
    ElementList(Vec<ElementId>),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    Function(FunctionRef),
    Event(Box<EventValue>),
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Type tag of the value. Total: every value has exactly one tag.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Undefined => ValueType::Undefined,
            Self::String(_) => ValueType::String,
            Self::Number(_) => ValueType::Number,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Element(_) => ValueType::Element,
            Self::ElementList(_) => ValueType::ElementList,
            Self::Array(_) => ValueType::Array,
            Self::Object(_) => ValueType::Object,
            Self::Function(_) => ValueType::Function,
            Self::Event(_) => ValueType::Event,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.value_type().as_str()
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Null | Self::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<ElementId> {
        match self {
            Self::Element(id) => Some(*id),
            _ => None,
        }
    }

    /// Falsy set is `false`, `0`, `-0`, `""`, `null`, `undefined` and `NaN`.
    /// Arrays, objects and element lists are truthy even when empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null | Self::Undefined => false,
            Self::Boolean(value) => *value,
            Self::Number(value) => *value != 0.0 && !value.is_nan(),
            Self::String(value) => !value.is_empty(),
            Self::Element(_)
            | Self::ElementList(_)
            | Self::Array(_)
            | Self::Object(_)
            | Self::Function(_)
            | Self::Event(_) => true,
        }
    }

    /// Numeric coercion. Returns `None` instead of failing, and never yields a non-finite number.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) if value.is_finite() => Some(*value),
            Self::Boolean(value) => Some(if *value { 1.0 } else { 0.0 }),
            Self::String(value) => parse_decimal(value),
            _ => None,
        }
    }

    /// Text rendering used by `put`, `log` and string concatenation.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Undefined => "undefined".to_string(),
            Self::String(value) => value.clone(),
            Self::Number(value) => format_number(*value),
            Self::Boolean(value) => value.to_string(),
            Self::Element(id) => format!("[element {}]", id.0),
            Self::ElementList(ids) => ids
                .iter()
                .map(|id| format!("[element {}]", id.0))
                .collect::<Vec<_>>()
                .join(","),
            Self::Array(items) => items
                .iter()
                .map(|item| match item {
                    Self::Null | Self::Undefined => String::new(),
                    other => other.to_text(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Self::Object(_) => self.to_json().to_string(),
            Self::Function(function) => format!("[function {}]", function.name),
            Self::Event(event) => format!("[event {}]", event.name),
        }
    }

    /// Loose equality used by `is`/`==`: numbers compare against numeric strings and booleans,
    /// `null` equals `undefined`, everything else compares structurally.
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (left, right) if left.is_nullish() && right.is_nullish() => true,
            (Self::Number(_), Self::String(_) | Self::Boolean(_))
            | (Self::String(_) | Self::Boolean(_), Self::Number(_)) => {
                match (self.to_number(), other.to_number()) {
                    (Some(left), Some(right)) => left == right,
                    _ => false,
                }
            }
            (Self::Element(left), Self::ElementList(right))
            | (Self::ElementList(right), Self::Element(left)) => {
                right.len() == 1 && right[0] == *left
            }
            _ => self == other,
        }
    }

    pub fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Null => Self::Null,
            Literal::Boolean(value) => Self::Boolean(*value),
            Literal::Number(value) => Self::Number(*value),
            Literal::String(value) => Self::String(value.clone()),
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(value) => Self::Boolean(*value),
            serde_json::Value::Number(value) => Self::Number(value.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(value) => Self::String(value.clone()),
            serde_json::Value::Array(items) => Self::Array(items.iter().map(Self::from_json).collect()),
            serde_json::Value::Object(entries) => Self::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), Self::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// JSON projection for host-level reporting. Elements appear as `{"element": <id>}`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null | Self::Undefined => serde_json::Value::Null,
            Self::String(value) => serde_json::Value::String(value.clone()),
            Self::Number(value) if value.fract() == 0.0 && value.abs() < 9.0e15 => {
                serde_json::Value::from(*value as i64)
            }
            Self::Number(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Boolean(value) => serde_json::Value::Bool(*value),
            Self::Element(id) => serde_json::json!({ "element": id.0 }),
            Self::ElementList(ids) => serde_json::Value::Array(
                ids.iter()
                    .map(|id| serde_json::json!({ "element": id.0 }))
                    .collect(),
            ),
            Self::Array(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Self::Function(function) => serde_json::json!({ "function": function.name }),
            Self::Event(event) => serde_json::json!({
                "event": event.name,
                "target": event.target.map(|id| id.0),
                "detail": event.detail.to_json(),
            }),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<ElementId> for Value {
    fn from(value: ElementId) -> Self {
        Self::Element(value)
    }
}

/// Standalone form of [`Value::value_type`].
pub fn infer_type(value: &Value) -> ValueType {
    value.value_type()
}

fn decimal_regex() -> &'static Regex {
    static DECIMAL: OnceLock<Regex> = OnceLock::new();
    DECIMAL.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("decimal regex must compile")
    })
}

fn parse_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if !decimal_regex().is_match(trimmed) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        // -0 renders as 0
        return format!("{}", value as i64);
    }
    format!("{}", value)
}
