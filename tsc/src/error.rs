use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lex,
    Parse,
    Codegen,
}

/// Stable machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "E_LEX_UNK_CHAR")]
    LexUnknownChar,
    #[serde(rename = "E_LEX_INT_RANGE")]
    LexIntRange,
    #[serde(rename = "E_PARSE_EXPECT")]
    ParseExpect,
    #[serde(rename = "E_PARSE_PRIMARY")]
    ParsePrimary,
    #[serde(rename = "E_PARSE_STMT")]
    ParseStatement,
    #[serde(rename = "E_PARSE_DEPTH")]
    ParseDepth,
    #[serde(rename = "E_CODEGEN")]
    Codegen,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LexUnknownChar => "E_LEX_UNK_CHAR",
            Self::LexIntRange => "E_LEX_INT_RANGE",
            Self::ParseExpect => "E_PARSE_EXPECT",
            Self::ParsePrimary => "E_PARSE_PRIMARY",
            Self::ParseStatement => "E_PARSE_STMT",
            Self::ParseDepth => "E_PARSE_DEPTH",
            Self::Codegen => "E_CODEGEN",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Lexer error at {line}:{col} [{code}]: {message}")]
    LexerError {
        line: usize,
        col: usize,
        code: ErrorCode,
        message: String,
    },

    #[error("Syntax error at {line}:{col} [{code}]: {message}")]
    SyntaxError {
        line: usize,
        col: usize,
        code: ErrorCode,
        message: String,
    },

    #[error("Codegen error [{code}]: {message}")]
    CodegenError { code: ErrorCode, message: String },
}

impl CompileError {
    pub fn phase(&self) -> Phase {
        match self {
            Self::LexerError { .. } => Phase::Lex,
            Self::SyntaxError { .. } => Phase::Parse,
            Self::CodegenError { .. } => Phase::Codegen,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::LexerError { code, .. }
            | Self::SyntaxError { code, .. }
            | Self::CodegenError { code, .. } => *code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::LexerError { message, .. }
            | Self::SyntaxError { message, .. }
            | Self::CodegenError { message, .. } => message,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            Self::LexerError { line, .. } | Self::SyntaxError { line, .. } => Some(*line),
            Self::CodegenError { .. } => None,
        }
    }

    pub fn col(&self) -> Option<usize> {
        match self {
            Self::LexerError { col, .. } | Self::SyntaxError { col, .. } => Some(*col),
            Self::CodegenError { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_phase_and_location() {
        let err = CompileError::SyntaxError {
            line: 3,
            col: 7,
            code: ErrorCode::ParseExpect,
            message: "Expected SEMICOLON, got EOF".to_string(),
        };
        assert_eq!(err.phase(), Phase::Parse);
        assert_eq!((err.line(), err.col()), (Some(3), Some(7)));
        assert_eq!(
            err.to_string(),
            "Syntax error at 3:7 [E_PARSE_EXPECT]: Expected SEMICOLON, got EOF"
        );

        let err = CompileError::CodegenError {
            code: ErrorCode::Codegen,
            message: "Undeclared name: x".to_string(),
        };
        assert_eq!(err.phase(), Phase::Codegen);
        assert_eq!(err.line(), None);
    }

    #[test]
    fn codes_serialize_to_wire_names() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::ParseStatement).unwrap(),
            "\"E_PARSE_STMT\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::ParseDepth).unwrap(),
            "\"E_PARSE_DEPTH\""
        );
        assert_eq!(serde_json::to_string(&Phase::Codegen).unwrap(), "\"codegen\"");
    }
}
