use serde::{Deserialize, Serialize};

/// Root of a parsed source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Program")]
pub struct Program {
    pub body: Vec<Statement>,
}

/// `{ ... }` body of an `if`/`else` branch or a `while` loop.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Block")]
pub struct Block {
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Statement {
    /// let x = 10;  или  let x;
    VarDecl {
        id: String,
        init: Option<Expression>,
    },
    /// x = x + 1;
    Assign { id: String, expr: Expression },
    /// print(x);
    Print { expr: Expression },
    /// Вложенный блок без новой области видимости
    Block { body: Vec<Statement> },
    If {
        test: Expression,
        then: Block,
        #[serde(rename = "else")]
        otherwise: Option<Block>,
    },
    While { test: Expression, body: Block },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expression {
    Int { value: i64 },
    Ident { name: String },
    UnOp {
        op: UnaryOperator,
        expr: Box<Expression>,
    },
    BinOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn int(value: i64) -> Self {
        Self::Int { value }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident { name: name.into() }
    }

    pub fn unary(op: UnaryOperator, expr: Expression) -> Self {
        Self::UnOp {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Self::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Moves the children of `self` into `pending`, leaving leaves behind.
    fn detach_children(&mut self, pending: &mut Vec<Expression>) {
        match self {
            Self::UnOp { expr, .. } => pending.push(detach(expr)),
            Self::BinOp { left, right, .. } => {
                pending.push(detach(left));
                pending.push(detach(right));
            }
            Self::Int { .. } | Self::Ident { .. } => {}
        }
    }
}

fn detach(child: &mut Box<Expression>) -> Expression {
    std::mem::replace(&mut **child, Expression::Int { value: 0 })
}

// `1 + 1 + ... + 1` is as deep as it is long; tear it down without recursion.
impl Drop for Expression {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut expr) = pending.pop() {
            expr.detach_children(&mut pending);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnaryOperator {
    Not, // !
    Neg, // -
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
    #[serde(rename = "%")]
    Modulo,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
}

impl BinaryOperator {
    /// Binding power; higher binds tighter. All operators are left-associative.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Equal | Self::NotEqual => 3,
            Self::Less | Self::LessEqual | Self::Greater | Self::GreaterEqual => 4,
            Self::Add | Self::Subtract => 5,
            Self::Multiply | Self::Divide | Self::Modulo => 6,
        }
    }
}
