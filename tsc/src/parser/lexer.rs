use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CompileError, ErrorCode};
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // Ключевые слова
    #[serde(rename = "KW_LET")]
    KwLet,
    #[serde(rename = "KW_IF")]
    KwIf,
    #[serde(rename = "KW_ELSE")]
    KwElse,
    #[serde(rename = "KW_WHILE")]
    KwWhile,
    #[serde(rename = "KW_PRINT")]
    KwPrint,
    // Литералы и идентификаторы
    #[serde(rename = "INT")]
    Int,
    #[serde(rename = "IDENT")]
    Ident,
    // Операторы
    #[serde(rename = "PLUS")]
    Plus, // +
    #[serde(rename = "MINUS")]
    Minus, // -
    #[serde(rename = "STAR")]
    Star, // *
    #[serde(rename = "SLASH")]
    Slash, // /
    #[serde(rename = "PERCENT")]
    Percent, // %
    #[serde(rename = "LT")]
    Lt, // <
    #[serde(rename = "LE")]
    Le, // <=
    #[serde(rename = "GT")]
    Gt, // >
    #[serde(rename = "GE")]
    Ge, // >=
    #[serde(rename = "EQEQ")]
    EqEq, // ==
    #[serde(rename = "BANGEQ")]
    BangEq, // !=
    #[serde(rename = "AND")]
    And, // &&
    #[serde(rename = "OR")]
    Or, // ||
    #[serde(rename = "EQUAL")]
    Equal, // =
    #[serde(rename = "BANG")]
    Bang, // !
    #[serde(rename = "LPAREN")]
    LParen,
    #[serde(rename = "RPAREN")]
    RParen,
    // Пунктуация
    #[serde(rename = "LBRACE")]
    LBrace,
    #[serde(rename = "RBRACE")]
    RBrace,
    #[serde(rename = "SEMICOLON")]
    Semicolon,
    #[serde(rename = "COMMA")]
    Comma,
    #[serde(rename = "EOF")]
    Eof,
}

impl TokenKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::KwLet => "KW_LET",
            Self::KwIf => "KW_IF",
            Self::KwElse => "KW_ELSE",
            Self::KwWhile => "KW_WHILE",
            Self::KwPrint => "KW_PRINT",
            Self::Int => "INT",
            Self::Ident => "IDENT",
            Self::Plus => "PLUS",
            Self::Minus => "MINUS",
            Self::Star => "STAR",
            Self::Slash => "SLASH",
            Self::Percent => "PERCENT",
            Self::Lt => "LT",
            Self::Le => "LE",
            Self::Gt => "GT",
            Self::Ge => "GE",
            Self::EqEq => "EQEQ",
            Self::BangEq => "BANGEQ",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Equal => "EQUAL",
            Self::Bang => "BANG",
            Self::LParen => "LPAREN",
            Self::RParen => "RPAREN",
            Self::LBrace => "LBRACE",
            Self::RBrace => "RBRACE",
            Self::Semicolon => "SEMICOLON",
            Self::Comma => "COMMA",
            Self::Eof => "EOF",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub lexeme: String,
    #[serde(flatten)]
    pub span: Span,
    /// Decoded value, only for `INT`.
    #[serde(default)]
    pub value: Option<i64>,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
            value: None,
        }
    }

    /// Synthetic end-of-input marker placed right after `last`.
    pub fn eof_after(last: Option<&Token>) -> Self {
        let span = match last {
            Some(token) => token.span.advance(&token.lexeme),
            None => Span::default(),
        };
        Self::new(TokenKind::Eof, "", span)
    }
}

/// Lexeme categories in the order they are tried at each position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Keyword,
    Integer,
    Identifier,
    Comment,
    Operator,
    Punctuation,
    Whitespace,
}

const RULES: [Rule; 7] = [
    Rule::Keyword,
    Rule::Integer,
    Rule::Identifier,
    Rule::Comment,
    Rule::Operator,
    Rule::Punctuation,
    Rule::Whitespace,
];

const KEYWORDS: [(&str, TokenKind); 5] = [
    ("let", TokenKind::KwLet),
    ("if", TokenKind::KwIf),
    ("else", TokenKind::KwElse),
    ("while", TokenKind::KwWhile),
    ("print", TokenKind::KwPrint),
];

// Двухсимвольные операторы идут раньше своих односимвольных префиксов
const OPERATORS: [(&str, TokenKind); 17] = [
    ("==", TokenKind::EqEq),
    ("!=", TokenKind::BangEq),
    ("<=", TokenKind::Le),
    (">=", TokenKind::Ge),
    ("&&", TokenKind::And),
    ("||", TokenKind::Or),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
    ("=", TokenKind::Equal),
    ("!", TokenKind::Bang),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
];

const PUNCTUATION: [(&str, TokenKind); 4] = [
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    (";", TokenKind::Semicolon),
    (",", TokenKind::Comma),
];

impl Rule {
    /// Byte length of this rule's match at the start of `rest`, plus the
    /// token kind it produces (`None` for skipped categories).
    fn scan(self, rest: &str) -> Option<(usize, Option<TokenKind>)> {
        match self {
            Self::Keyword => {
                let word = word_len(rest);
                KEYWORDS
                    .iter()
                    .find(|(keyword, _)| *keyword == &rest[..word])
                    .map(|(_, kind)| (word, Some(*kind)))
            }
            Self::Integer => {
                let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
                let literal = match digits {
                    0 => return None,
                    _ if rest.starts_with('0') => 1,
                    _ => digits,
                };
                // 12abc и 007 не являются литералами
                if rest[literal..].starts_with(is_word_char) {
                    return None;
                }
                Some((literal, Some(TokenKind::Int)))
            }
            Self::Identifier => {
                if !rest.starts_with(|ch: char| ch.is_ascii_alphabetic() || ch == '_') {
                    return None;
                }
                Some((word_len(rest), Some(TokenKind::Ident)))
            }
            Self::Comment => {
                if !rest.starts_with("//") {
                    return None;
                }
                Some((rest.find('\n').unwrap_or(rest.len()), None))
            }
            Self::Operator => fixed(rest, &OPERATORS),
            Self::Punctuation => fixed(rest, &PUNCTUATION),
            Self::Whitespace => {
                let len = rest
                    .bytes()
                    .take_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
                    .count();
                (len > 0).then_some((len, None))
            }
        }
    }
}

fn fixed(rest: &str, table: &[(&str, TokenKind)]) -> Option<(usize, Option<TokenKind>)> {
    table
        .iter()
        .find(|(lexeme, _)| rest.starts_with(lexeme))
        .map(|(lexeme, kind)| (lexeme.len(), Some(*kind)))
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn word_len(rest: &str) -> usize {
    rest.find(|ch: char| !is_word_char(ch)).unwrap_or(rest.len())
}

/// Splits `source` into tokens. Whitespace and `//` comments are dropped and
/// no `EOF` token is appended.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    let mut position = 0;
    let mut span = Span::default();

    while position < source.len() {
        let rest = &source[position..];
        let Some((len, kind)) = RULES.iter().find_map(|rule| rule.scan(rest)) else {
            let ch = rest.chars().next().unwrap_or_default();
            return Err(CompileError::LexerError {
                line: span.line,
                col: span.col,
                code: ErrorCode::LexUnknownChar,
                message: format!("Unexpected '{}'", ch),
            });
        };

        let lexeme = &rest[..len];
        if let Some(kind) = kind {
            let mut token = Token::new(kind, lexeme, span);
            if kind == TokenKind::Int {
                token.value = Some(lexeme.parse().map_err(|_| CompileError::LexerError {
                    line: span.line,
                    col: span.col,
                    code: ErrorCode::LexIntRange,
                    message: format!("Integer literal {} is out of range", lexeme),
                })?);
            }
            tokens.push(token);
        }

        span = span.advance(lexeme);
        position += len;
    }

    debug!(tokens = tokens.len(), "tokenized source");
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_declaration_with_positions() {
        let tokens = tokenize("let x = 1;").unwrap();
        let summary: Vec<_> = tokens
            .iter()
            .map(|t| (t.kind, t.lexeme.as_str(), t.span.line, t.span.col, t.value))
            .collect();
        assert_eq!(
            summary,
            vec![
                (TokenKind::KwLet, "let", 1, 1, None),
                (TokenKind::Ident, "x", 1, 5, None),
                (TokenKind::Equal, "=", 1, 7, None),
                (TokenKind::Int, "1", 1, 9, Some(1)),
                (TokenKind::Semicolon, ";", 1, 10, None),
            ]
        );
    }

    #[test]
    fn unknown_character_is_reported_where_it_appears() {
        let err = tokenize("let a = 1;\n  a = @;").unwrap_err();
        assert_eq!(
            err,
            CompileError::LexerError {
                line: 2,
                col: 7,
                code: ErrorCode::LexUnknownChar,
                message: "Unexpected '@'".to_string(),
            }
        );
    }

    #[test]
    fn keywords_need_a_word_boundary() {
        assert_eq!(
            kinds("letter if_ while print else"),
            vec![
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::KwWhile,
                TokenKind::KwPrint,
                TokenKind::KwElse,
            ]
        );
    }

    #[test]
    fn two_char_operators_win_over_prefixes() {
        assert_eq!(
            kinds("<= < >= > == = != ! && || ( ) { } , %"),
            vec![
                TokenKind::Le,
                TokenKind::Lt,
                TokenKind::Ge,
                TokenKind::Gt,
                TokenKind::EqEq,
                TokenKind::Equal,
                TokenKind::BangEq,
                TokenKind::Bang,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Comma,
                TokenKind::Percent,
            ]
        );
    }

    #[test]
    fn comments_and_newlines_are_skipped_and_tracked() {
        let tokens = tokenize("// header\nprint(x); // trailing\n\n  y").unwrap();
        let positions: Vec<_> = tokens.iter().map(|t| (t.kind, t.span.line, t.span.col)).collect();
        assert_eq!(
            positions,
            vec![
                (TokenKind::KwPrint, 2, 1),
                (TokenKind::LParen, 2, 6),
                (TokenKind::Ident, 2, 7),
                (TokenKind::RParen, 2, 8),
                (TokenKind::Semicolon, 2, 9),
                (TokenKind::Ident, 4, 3),
            ]
        );
    }

    #[test]
    fn division_is_not_a_comment() {
        assert_eq!(kinds("a / b"), vec![TokenKind::Ident, TokenKind::Slash, TokenKind::Ident]);
    }

    #[test]
    fn integer_literals_reject_leading_zeros() {
        let tokens = tokenize("0 10 907").unwrap();
        let values: Vec<_> = tokens.iter().map(|t| t.value).collect();
        assert_eq!(values, vec![Some(0), Some(10), Some(907)]);

        let err = tokenize("x = 007;").unwrap_err();
        assert_eq!((err.code(), err.line(), err.col()), (ErrorCode::LexUnknownChar, Some(1), Some(5)));

        let err = tokenize("12abc").unwrap_err();
        assert_eq!(err.code(), ErrorCode::LexUnknownChar);
    }

    #[test]
    fn oversized_integer_is_out_of_range() {
        let err = tokenize("print(99999999999999999999);").unwrap_err();
        assert_eq!((err.code(), err.line(), err.col()), (ErrorCode::LexIntRange, Some(1), Some(7)));
    }

    #[test]
    fn non_ascii_input_is_an_unknown_character() {
        let err = tokenize("let é = 1;").unwrap_err();
        assert_eq!(err.message(), "Unexpected 'é'");
        assert_eq!(err.col(), Some(5));
    }

    #[test]
    fn eof_sits_after_the_last_token() {
        let tokens = tokenize("let x;\nx").unwrap();
        let eof = Token::eof_after(tokens.last());
        assert_eq!((eof.kind, eof.span), (TokenKind::Eof, Span::new(2, 2)));
        assert_eq!(Token::eof_after(None).span, Span::default());
    }

    #[test]
    fn tokens_serialize_in_wire_shape() {
        let tokens = tokenize("x 5").unwrap();
        let json = serde_json::to_value(&tokens).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"type": "IDENT", "lexeme": "x", "line": 1, "col": 1, "value": null},
                {"type": "INT", "lexeme": "5", "line": 1, "col": 3, "value": 5},
            ])
        );
    }
}
