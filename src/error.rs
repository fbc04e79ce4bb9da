// ABOUTME: Error and control-transfer types for parsing and evaluation

use crate::token::Token;
use crate::value::Value;
use thiserror::Error;

/// A runtime failure, carrying the line of the token responsible so the
/// reporter can point back into the source.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct RuntimeError {
    pub line: usize,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: &Token, message: impl Into<String>) -> Self {
        RuntimeError {
            line: token.line,
            message: message.into(),
        }
    }

    pub fn undefined_variable(name: &Token) -> Self {
        RuntimeError::new(name, format!("Undefined variable: {}", name.lexeme))
    }

    /// Arity mismatches report at the closing paren of the call.
    pub fn arity(paren: &Token, expected: usize, actual: usize) -> Self {
        RuntimeError::new(
            paren,
            format!("Expected {} arguments but got {}", expected, actual),
        )
    }
}

/// Marker raised out of a failed declaration so the parser can synchronize.
/// The diagnostic itself is emitted at the raise site via the reporter.
#[derive(Error, Debug, Clone)]
#[error("parse error")]
pub struct ParseError;

/// Non-local transfer out of statement execution.
///
/// `Return` unwinds through nested block executions and is absorbed exactly
/// at the boundary of the function call executing the body; `Error`
/// propagates all the way to `interpret`.
#[derive(Debug)]
pub enum Unwind {
    Return(Value),
    Error(RuntimeError),
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Unwind::Error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    #[test]
    fn test_runtime_error_carries_line() {
        let token = Token::new(TokenType::Plus, "+", None, 7);
        let error = RuntimeError::new(&token, "Operands must be numbers");
        assert_eq!(error.line, 7);
        assert_eq!(format!("{}", error), "Operands must be numbers");
    }

    #[test]
    fn test_arity_error_message() {
        let paren = Token::new(TokenType::RightParen, ")", None, 2);
        let error = RuntimeError::arity(&paren, 2, 3);
        assert_eq!(format!("{}", error), "Expected 2 arguments but got 3");
        assert_eq!(error.line, 2);
    }
}
