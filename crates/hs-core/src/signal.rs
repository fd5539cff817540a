use serde::Serialize;

use crate::error::ErrorDescriptor;
use crate::value::{Value, ValueType};

/// Out-of-band control flow raised by `break`, `continue`, `return` and `halt`.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlSignal {
    Break,
    Continue,
    Return(Value),
    Halt,
}

impl ControlSignal {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Break => "break",
            Self::Continue => "continue",
            Self::Return(_) => "return",
            Self::Halt => "halt",
        }
    }

    /// Loop-scoped signals stop at the nearest enclosing loop.
    pub fn is_loop_scoped(&self) -> bool {
        matches!(self, Self::Break | Self::Continue)
    }
}

/// What one step of execution produced: a value, or a signal unwinding through its callers.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Normal(Value),
    Signal(ControlSignal),
}

impl Completion {
    pub fn normal(value: impl Into<Value>) -> Self {
        Self::Normal(value.into())
    }

    pub fn undefined() -> Self {
        Self::Normal(Value::Undefined)
    }

    pub fn signal(&self) -> Option<&ControlSignal> {
        match self {
            Self::Signal(signal) => Some(signal),
            Self::Normal(_) => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Normal(value) | Self::Signal(ControlSignal::Return(value)) => value,
            Self::Signal(_) => Value::Undefined,
        }
    }
}

pub type EvalResult<T = Value> = Result<T, ErrorDescriptor>;
pub type CommandResult = Result<Completion, ErrorDescriptor>;

/// Serializable `{success, value, type}` / `{success, error}` form of a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDescriptor>,
}

impl ResultEnvelope {
    pub fn success(value: &Value) -> Self {
        Self {
            success: true,
            value: Some(value.to_json()),
            value_type: Some(value.value_type()),
            error: None,
        }
    }

    pub fn failure(error: ErrorDescriptor) -> Self {
        Self {
            success: false,
            value: None,
            value_type: None,
            error: Some(error),
        }
    }
}

impl From<&EvalResult> for ResultEnvelope {
    fn from(result: &EvalResult) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(error) => Self::failure(error.clone()),
        }
    }
}
