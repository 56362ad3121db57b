//! Literal parsing errors

use thiserror::Error;

/// Errors raised while parsing a data literal.
///
/// Every variant is a syntax-class error: the parse that raised it has
/// already released everything it allocated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Lexical or grammatical failure, or a type mismatch
    #[error("line {line}: {message}")]
    Syntax {
        /// 1-based line of the offending token
        line: u32,
        /// Human-readable description
        message: String,
    },

    /// A struct literal left out a field whose type has no zero value
    #[error("line {line}: no default value possible for missing struct elements")]
    DefaultingImpossible {
        /// 1-based line of the closing brace
        line: u32,
    },
}

impl ParseError {
    /// Create a syntax error
    pub fn syntax(line: u32, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    /// Line the error was raised on
    pub fn line(&self) -> u32 {
        match self {
            Self::Syntax { line, .. } | Self::DefaultingImpossible { line } => *line,
        }
    }
}

/// Result type for literal parsing
pub type Result<T> = std::result::Result<T, ParseError>;
