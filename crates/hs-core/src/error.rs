use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SourceSpan;

/// Closed vocabulary of failure kinds shared by validation and execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    ValidationError,
    MissingArgument,
    TypeMismatch,
    InvalidArgument,
    SyntaxError,
    RuntimeError,
    ContextError,
    TargetNotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "validation-error",
            Self::MissingArgument => "missing-argument",
            Self::TypeMismatch => "type-mismatch",
            Self::InvalidArgument => "invalid-argument",
            Self::SyntaxError => "syntax-error",
            Self::RuntimeError => "runtime-error",
            Self::ContextError => "context-error",
            Self::TargetNotFound => "target-not-found",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<SourceSpan>,
}

impl ErrorDescriptor {
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            suggestions: Vec::new(),
            span: None,
        }
    }

    pub fn with_span(
        kind: ErrorKind,
        code: impl Into<String>,
        message: impl Into<String>,
        span: SourceSpan,
    ) -> Self {
        Self {
            span: Some(span),
            ..Self::new(kind, code, message)
        }
    }

    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn suggest_all<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions
            .extend(suggestions.into_iter().map(Into::into));
        self
    }

    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, code, message)
    }

    pub fn missing_argument(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingArgument, code, message)
    }

    pub fn type_mismatch(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, code, message)
    }

    pub fn invalid_argument(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, code, message)
    }

    pub fn syntax(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SyntaxError, code, message)
    }

    pub fn runtime(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RuntimeError, code, message)
    }

    pub fn context(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ContextError, code, message)
    }

    pub fn target_not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TargetNotFound, code, message)
    }
}
