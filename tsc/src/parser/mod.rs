pub mod lexer;
pub mod parser;

use crate::error::CompileError;
use crate::ir::ast;

use lexer::Token;

/// Source text to AST: tokenize, terminate with `EOF`, parse.
pub fn parse(source: &str) -> Result<ast::Program, CompileError> {
    let mut tokens = lexer::tokenize(source)?;
    tokens.push(Token::eof_after(tokens.last()));
    parser::parse_tokens(tokens)
}
