//! Error types.
//!
//! Every failure that originates from user-supplied markup is contained at
//! one binding: the render loop turns these into `tracing` warnings and moves
//! on to the next directive.

use thiserror::Error;

/// Expression source could not be parsed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at offset {offset}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Failure while evaluating a compiled expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("{0} is not defined")]
    Reference(String),

    #[error("{0}")]
    Type(String),

    #[error("invalid assignment target")]
    NotAssignable,

    #[error("{0} is not a function")]
    NotCallable(String),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Failure while writing into reactive state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("cannot set properties of {found} (setting '{path}')")]
    NotAContainer { path: String, found: &'static str },

    #[error("{path} is {found}, not an array")]
    NotAnArray { path: String, found: &'static str },

    #[error("invalid array length {len} (setting '{path}')")]
    InvalidLength { path: String, len: f64 },

    #[error("array at '{path}' would grow to {len} items, limit is {limit}")]
    ArrayTooLong { path: String, len: usize, limit: usize },

    #[error("cannot write an empty path")]
    EmptyPath,
}

/// Failure while turning a markup attribute into a binding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    #[error("cannot compile `{source_text}`: {error}")]
    Compile {
        source_text: String,
        #[source]
        error: ParseError,
    },

    #[error("empty event name in `{0}`")]
    EmptyEventName(String),

    #[error("`:model` needs a plain state key, got `{0}`")]
    ModelTarget(String),
}
