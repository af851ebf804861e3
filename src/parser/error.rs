//! Parser Errors
//!
//! A parse error carries a message and the source position where the current
//! complete command was abandoned.

use thiserror::Error;

use crate::ast::Position;

#[derive(Debug, Clone, Error)]
#[error("{}:{}: syntax error: {}", .position.line, .position.column, .message)]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: Position) -> ParseError {
        ParseError { message: message.into(), position }
    }
}
