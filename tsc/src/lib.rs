//! Compiler for a small imperative language targeting the tsvm stack machine.
//!
//! The pipeline is three pure stages: [`tokenize`], [`parse`] and
//! [`generate`]. [`compile`] chains them. No stage keeps state between calls,
//! so they can run concurrently from any number of threads.

pub mod backends;
pub mod envelope;
pub mod error;
pub mod ir;
pub mod parser;
pub mod span;

pub use backends::Artifact;
pub use envelope::Envelope;
pub use error::{CompileError, ErrorCode, Phase};
pub use ir::ast::Program;
pub use parser::lexer::{Token, TokenKind};

/// Source text to tokens, without the trailing `EOF`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    parser::lexer::tokenize(source)
}

/// Tokens to AST. The caller terminates `tokens` with an `EOF` token.
pub fn parse(tokens: Vec<Token>) -> Result<Program, CompileError> {
    parser::parser::parse_tokens(tokens)
}

/// AST to a `.tsi` listing.
pub fn generate(program: &Program) -> Result<Artifact, CompileError> {
    backends::stack::generate(program)
}

/// Full pipeline from source text to a `.tsi` listing.
pub fn compile(source: &str) -> Result<Artifact, CompileError> {
    let program = parser::parse(source)?;
    generate(&program)
}

/// Full pipeline, stopping at typed instructions instead of text. Feeds
/// [`tsvm::Program::from_instructions`] without a render/parse round trip.
pub fn compile_instructions(source: &str) -> Result<Vec<tsvm::Instruction>, CompileError> {
    let program = parser::parse(source)?;
    backends::stack::emit(&program)
}
