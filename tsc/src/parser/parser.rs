use tracing::debug;

use super::lexer::{Token, TokenKind};
use crate::error::{CompileError, ErrorCode};
use crate::ir::ast::{self, BinaryOperator, Expression, Statement, UnaryOperator};

/// Builds the AST from a token sequence terminated by `EOF`.
///
/// Reading past the last token yields a synthetic `EOF`, so a missing
/// terminator is tolerated. Names are not resolved here: assignment to an
/// undeclared variable parses fine and is rejected by the backend.
/// Deepest allowed nesting of blocks, parentheses and unary operators.
pub const MAX_NESTING: usize = 256;

pub fn parse_tokens(tokens: Vec<Token>) -> Result<ast::Program, CompileError> {
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program()?;
    debug!(statements = program.body.len(), "parsed program");
    Ok(program)
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    eof: Token,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        let eof = match tokens.last() {
            Some(token) if token.kind == TokenKind::Eof => token.clone(),
            last => Token::eof_after(last),
        };
        Self {
            tokens,
            position: 0,
            eof,
            depth: 0,
        }
    }

    fn parse_program(&mut self) -> Result<ast::Program, CompileError> {
        let mut body = Vec::new();

        while !self.check(TokenKind::Eof) {
            body.push(self.parse_statement()?);
        }

        Ok(ast::Program { body })
    }

    fn parse_statement(&mut self) -> Result<Statement, CompileError> {
        match self.peek().kind {
            TokenKind::KwLet => self.parse_var_decl(),
            // Присваивание только если за именем идёт '='
            TokenKind::Ident if self.lookahead(1).kind == TokenKind::Equal => self.parse_assign(),
            TokenKind::KwPrint => self.parse_print(),
            TokenKind::KwIf => self.parse_if(),
            TokenKind::KwWhile => self.parse_while(),
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                Ok(Statement::Block { body: block.body })
            }
            kind => Err(self.error_here(ErrorCode::ParseStatement, format!("Unexpected {}", kind))),
        }
    }

    fn parse_var_decl(&mut self) -> Result<Statement, CompileError> {
        self.expect(TokenKind::KwLet)?;
        let id = self.expect(TokenKind::Ident)?.lexeme.clone();

        let init = if self.matches(TokenKind::Equal) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        self.expect(TokenKind::Semicolon)?;
        Ok(Statement::VarDecl { id, init })
    }

    fn parse_assign(&mut self) -> Result<Statement, CompileError> {
        let id = self.expect(TokenKind::Ident)?.lexeme.clone();
        self.expect(TokenKind::Equal)?;
        let expr = self.parse_expression()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Statement::Assign { id, expr })
    }

    fn parse_print(&mut self) -> Result<Statement, CompileError> {
        self.expect(TokenKind::KwPrint)?;
        let expr = self.parse_condition()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Statement::Print { expr })
    }

    fn parse_if(&mut self) -> Result<Statement, CompileError> {
        self.expect(TokenKind::KwIf)?;
        let test = self.parse_condition()?;
        let then = self.parse_block()?;

        let otherwise = if self.matches(TokenKind::KwElse) {
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Statement::If {
            test,
            then,
            otherwise,
        })
    }

    fn parse_while(&mut self) -> Result<Statement, CompileError> {
        self.expect(TokenKind::KwWhile)?;
        let test = self.parse_condition()?;
        let body = self.parse_block()?;
        Ok(Statement::While { test, body })
    }

    /// `( expr )` after `print`, `if` and `while`.
    fn parse_condition(&mut self) -> Result<Expression, CompileError> {
        self.expect(TokenKind::LParen)?;
        let expr = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        Ok(expr)
    }

    fn parse_block(&mut self) -> Result<ast::Block, CompileError> {
        self.nested(|parser| {
            parser.expect(TokenKind::LBrace)?;

            let mut body = Vec::new();
            while !parser.check(TokenKind::RBrace) {
                body.push(parser.parse_statement()?);
            }

            parser.expect(TokenKind::RBrace)?;
            Ok(ast::Block { body })
        })
    }

    fn parse_expression(&mut self) -> Result<Expression, CompileError> {
        self.parse_binary(1)
    }

    /// Precedence climbing: the right operand is parsed one level above the
    /// operator, which makes every operator left-associative.
    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expression, CompileError> {
        let mut left = self.parse_unary()?;

        while let Some(op) = binary_operator(self.peek().kind) {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary(precedence + 1)?;
            left = Expression::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, CompileError> {
        let op = match self.peek().kind {
            TokenKind::Bang => UnaryOperator::Not,
            TokenKind::Minus => UnaryOperator::Neg,
            _ => return self.parse_primary(),
        };
        self.advance();
        let expr = self.nested(Self::parse_unary)?;
        Ok(Expression::unary(op, expr))
    }

    fn parse_primary(&mut self) -> Result<Expression, CompileError> {
        match self.peek().kind {
            TokenKind::Int => {
                let token = self.advance();
                let value = token.value.or_else(|| token.lexeme.parse().ok());
                match value {
                    Some(value) => Ok(Expression::int(value)),
                    None => {
                        let message = format!("Bad integer literal '{}'", token.lexeme);
                        Err(self.error_at_previous(ErrorCode::ParsePrimary, message))
                    }
                }
            }
            TokenKind::Ident => Ok(Expression::ident(self.advance().lexeme.clone())),
            TokenKind::LParen => self.nested(Self::parse_condition),
            kind => Err(self.error_here(ErrorCode::ParsePrimary, format!("Bad token {}", kind))),
        }
    }

    // Вспомогательные методы

    /// Runs `parse` one nesting level deeper, failing with
    /// [`ErrorCode::ParseDepth`] past [`MAX_NESTING`].
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        if self.depth >= MAX_NESTING {
            let message = format!("Nesting deeper than {} levels", MAX_NESTING);
            return Err(self.error_here(ErrorCode::ParseDepth, message));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> &Token {
        self.lookahead(0)
    }

    fn lookahead(&self, n: usize) -> &Token {
        self.tokens.get(self.position + n).unwrap_or(&self.eof)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        let index = self.position;
        if index < self.tokens.len() {
            self.position += 1;
        }
        self.tokens.get(index).unwrap_or(&self.eof)
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<&Token, CompileError> {
        self.expect_with(expected, ErrorCode::ParseExpect)
    }

    fn expect_with(&mut self, expected: TokenKind, code: ErrorCode) -> Result<&Token, CompileError> {
        if !self.check(expected) {
            let message = format!("Expected {}, got {}", expected, self.peek().kind);
            return Err(self.error_here(code, message));
        }
        Ok(self.advance())
    }

    fn error_here(&self, code: ErrorCode, message: String) -> CompileError {
        let span = self.peek().span;
        CompileError::SyntaxError {
            line: span.line,
            col: span.col,
            code,
            message,
        }
    }

    fn error_at_previous(&self, code: ErrorCode, message: String) -> CompileError {
        let token = self
            .position
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .unwrap_or(&self.eof);
        CompileError::SyntaxError {
            line: token.span.line,
            col: token.span.col,
            code,
            message,
        }
    }
}

fn binary_operator(kind: TokenKind) -> Option<BinaryOperator> {
    let op = match kind {
        TokenKind::Or => BinaryOperator::Or,
        TokenKind::And => BinaryOperator::And,
        TokenKind::EqEq => BinaryOperator::Equal,
        TokenKind::BangEq => BinaryOperator::NotEqual,
        TokenKind::Lt => BinaryOperator::Less,
        TokenKind::Le => BinaryOperator::LessEqual,
        TokenKind::Gt => BinaryOperator::Greater,
        TokenKind::Ge => BinaryOperator::GreaterEqual,
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Minus => BinaryOperator::Subtract,
        TokenKind::Star => BinaryOperator::Multiply,
        TokenKind::Slash => BinaryOperator::Divide,
        TokenKind::Percent => BinaryOperator::Modulo,
        _ => return None,
    };
    Some(op)
}
