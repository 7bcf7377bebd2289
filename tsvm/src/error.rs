use thiserror::Error;

/// Problems found while decoding a `.tsi` listing. Lines are 1-based.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("line {line}: unknown instruction '{mnemonic}'")]
    UnknownInstruction { line: usize, mnemonic: String },

    #[error("line {line}: {mnemonic} expects {expected}")]
    MissingOperand {
        line: usize,
        mnemonic: String,
        expected: &'static str,
    },

    #[error("line {line}: invalid operand '{operand}' for {mnemonic}")]
    InvalidOperand {
        line: usize,
        mnemonic: String,
        operand: String,
    },

    #[error("line {line}: unexpected operand '{operand}' after {mnemonic}")]
    UnexpectedOperand {
        line: usize,
        mnemonic: String,
        operand: String,
    },

    #[error("line {line}: label '{label}' defined twice")]
    DuplicateLabel { line: usize, label: String },

    #[error("line {line}: jump to undefined label '{label}'")]
    UndefinedLabel { line: usize, label: String },
}

#[derive(Error, Debug)]
pub enum VmError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Stack underflow at pc={pc}")]
    StackUnderflow { pc: usize },

    #[error("Division by zero at pc={pc}")]
    DivisionByZero { pc: usize },

    #[error("Program ran past its last instruction without HALT")]
    MissingHalt,

    #[error("Step limit of {limit} exceeded")]
    StepLimit { limit: u64 },

    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}
