//! Parser error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{filename}:{line}:{column}: invalid syntax: {message}")]
    InvalidSyntax {
        filename: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("failed to load the Python grammar: {0}")]
    Grammar(String),

    #[error("{filename}: parsing was aborted")]
    Aborted { filename: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidSyntax,
    Grammar,
    Aborted,
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::InvalidSyntax { .. } => ErrorKind::InvalidSyntax,
            ParseError::Grammar(_) => ErrorKind::Grammar,
            ParseError::Aborted { .. } => ErrorKind::Aborted,
        }
    }

    /// 1-based line and column of a syntax error
    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            ParseError::InvalidSyntax { line, column, .. } => Some((*line, *column)),
            _ => None,
        }
    }
}
