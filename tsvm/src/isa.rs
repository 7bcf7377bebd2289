use std::fmt;

use crate::error::LoadError;

/// One line of a `.tsi` program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Push(i64),
    Load(String),
    Store(String),
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    CmpLt,
    CmpLe,
    CmpGt,
    CmpGe,
    CmpEq,
    CmpNe,
    And,
    Or,
    Not,
    Neg,
    Print,
    Jmp(String),
    Jz(String),
    /// `name:` - marks a jump target, does nothing when executed
    Label(String),
    Halt,
}

impl Instruction {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Push(_) => "PUSH",
            Self::Load(_) => "LOAD",
            Self::Store(_) => "STORE",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::CmpLt => "CMPLT",
            Self::CmpLe => "CMPLE",
            Self::CmpGt => "CMPGT",
            Self::CmpGe => "CMPGE",
            Self::CmpEq => "CMPEQ",
            Self::CmpNe => "CMPNE",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Neg => "NEG",
            Self::Print => "PRINT",
            Self::Jmp(_) => "JMP",
            Self::Jz(_) => "JZ",
            Self::Label(_) => "LABEL",
            Self::Halt => "HALT",
        }
    }

    /// Decodes a single source line. Blank lines decode to `None`.
    pub fn parse_line(line: usize, text: &str) -> Result<Option<Self>, LoadError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        if let Some(name) = text.strip_suffix(':') {
            if !is_name(name) {
                return Err(LoadError::InvalidOperand {
                    line,
                    mnemonic: "LABEL".to_string(),
                    operand: name.to_string(),
                });
            }
            return Ok(Some(Self::Label(name.to_string())));
        }

        let mut parts = text.split_whitespace();
        let mnemonic = parts.next().unwrap_or_default();
        let operand = parts.next();
        if let Some(extra) = parts.next() {
            return Err(LoadError::UnexpectedOperand {
                line,
                mnemonic: mnemonic.to_string(),
                operand: extra.to_string(),
            });
        }

        let instruction = match mnemonic {
            "PUSH" => {
                let operand = required(line, mnemonic, operand, "an integer")?;
                let value = operand.parse().map_err(|_| LoadError::InvalidOperand {
                    line,
                    mnemonic: mnemonic.to_string(),
                    operand: operand.to_string(),
                })?;
                Self::Push(value)
            }
            "LOAD" => Self::Load(name_operand(line, mnemonic, operand, "a variable name")?),
            "STORE" => Self::Store(name_operand(line, mnemonic, operand, "a variable name")?),
            "JMP" => Self::Jmp(name_operand(line, mnemonic, operand, "a label")?),
            "JZ" => Self::Jz(name_operand(line, mnemonic, operand, "a label")?),
            _ => {
                let bare = match mnemonic {
                    "ADD" => Self::Add,
                    "SUB" => Self::Sub,
                    "MUL" => Self::Mul,
                    "DIV" => Self::Div,
                    "MOD" => Self::Mod,
                    "CMPLT" => Self::CmpLt,
                    "CMPLE" => Self::CmpLe,
                    "CMPGT" => Self::CmpGt,
                    "CMPGE" => Self::CmpGe,
                    "CMPEQ" => Self::CmpEq,
                    "CMPNE" => Self::CmpNe,
                    "AND" => Self::And,
                    "OR" => Self::Or,
                    "NOT" => Self::Not,
                    "NEG" => Self::Neg,
                    "PRINT" => Self::Print,
                    "HALT" => Self::Halt,
                    _ => {
                        return Err(LoadError::UnknownInstruction {
                            line,
                            mnemonic: mnemonic.to_string(),
                        });
                    }
                };
                if let Some(extra) = operand {
                    return Err(LoadError::UnexpectedOperand {
                        line,
                        mnemonic: mnemonic.to_string(),
                        operand: extra.to_string(),
                    });
                }
                bare
            }
        };

        Ok(Some(instruction))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push(value) => write!(f, "PUSH {}", value),
            Self::Load(name) | Self::Store(name) | Self::Jmp(name) | Self::Jz(name) => {
                write!(f, "{} {}", self.mnemonic(), name)
            }
            Self::Label(name) => write!(f, "{}:", name),
            _ => f.write_str(self.mnemonic()),
        }
    }
}

fn required<'a>(
    line: usize,
    mnemonic: &str,
    operand: Option<&'a str>,
    expected: &'static str,
) -> Result<&'a str, LoadError> {
    operand.ok_or_else(|| LoadError::MissingOperand {
        line,
        mnemonic: mnemonic.to_string(),
        expected,
    })
}

fn name_operand(
    line: usize,
    mnemonic: &str,
    operand: Option<&str>,
    expected: &'static str,
) -> Result<String, LoadError> {
    let operand = required(line, mnemonic, operand, expected)?;
    if !is_name(operand) {
        return Err(LoadError::InvalidOperand {
            line,
            mnemonic: mnemonic.to_string(),
            operand: operand.to_string(),
        });
    }
    Ok(operand.to_string())
}

fn is_name(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_operands_and_labels() {
        assert_eq!(Instruction::parse_line(1, "PUSH -42").unwrap(), Some(Instruction::Push(-42)));
        assert_eq!(
            Instruction::parse_line(1, "  STORE counter ").unwrap(),
            Some(Instruction::Store("counter".to_string()))
        );
        assert_eq!(
            Instruction::parse_line(1, "L3:").unwrap(),
            Some(Instruction::Label("L3".to_string()))
        );
        assert_eq!(Instruction::parse_line(1, "   ").unwrap(), None);
    }

    #[test]
    fn display_matches_listing_format() {
        assert_eq!(Instruction::Push(7).to_string(), "PUSH 7");
        assert_eq!(Instruction::Jz("L1".to_string()).to_string(), "JZ L1");
        assert_eq!(Instruction::Label("L0".to_string()).to_string(), "L0:");
        assert_eq!(Instruction::CmpNe.to_string(), "CMPNE");
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(
            Instruction::parse_line(4, "JUMP L0"),
            Err(LoadError::UnknownInstruction { line: 4, mnemonic: "JUMP".to_string() })
        );
        assert!(matches!(
            Instruction::parse_line(2, "PUSH"),
            Err(LoadError::MissingOperand { line: 2, .. })
        ));
        assert!(matches!(
            Instruction::parse_line(2, "PUSH x"),
            Err(LoadError::InvalidOperand { line: 2, .. })
        ));
        assert!(matches!(
            Instruction::parse_line(3, "ADD 1"),
            Err(LoadError::UnexpectedOperand { line: 3, .. })
        ));
        assert!(matches!(
            Instruction::parse_line(5, "LOAD 1x"),
            Err(LoadError::InvalidOperand { line: 5, .. })
        ));
    }
}
