use std::fmt::Display;

use cinder_backend::LoweringError;
use cinder_parser::{ast::Program, ParseFailure};

/// Failure of one phase of [`compile`](crate::compile), with what that phase received.
#[derive(Debug)]
pub enum CompileError {
    Syntax {
        failure: ParseFailure,
        /// The failure with its source excerpt, as shown to users
        rendered: String,
    },
    Lowering {
        error: LoweringError,
        ast: Program,
    },
    Transform {
        error: anyhow::Error,
        /// Generated statements without helper materialization
        statements: Vec<String>,
    },
    Format {
        error: anyhow::Error,
        /// The unformatted output
        text: String,
    },
}

impl CompileError {
    pub fn phase(&self) -> &'static str {
        match self {
            CompileError::Syntax { .. } => "parse",
            CompileError::Lowering { .. } => "lowering",
            CompileError::Transform { .. } => "helper materialization",
            CompileError::Format { .. } => "formatting",
        }
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Syntax { rendered, .. } => f.write_str(rendered),
            CompileError::Lowering { error, .. } => write!(f, "Invalid program: {error}"),
            CompileError::Transform { error, .. } | CompileError::Format { error, .. } => {
                write!(f, "{} failed: {error}", self.phase())
            }
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Syntax { failure, .. } => Some(failure),
            CompileError::Lowering { error, .. } => Some(error),
            CompileError::Transform { error, .. } | CompileError::Format { error, .. } => {
                Some(error.as_ref())
            }
        }
    }
}
