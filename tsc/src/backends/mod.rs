pub mod stack;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::ir::ast;

/// Compiled output of one backend run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_name: String,
    pub program: String,
}

/// A code generator. Implementations keep no state between `compile` calls.
pub trait Backend {
    fn compile(&self, program: &ast::Program) -> Result<Artifact, CompileError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Tsi,
}

impl BackendType {
    pub fn all() -> Vec<Self> {
        vec![Self::Tsi]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|b| b.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Tsi => "tsi",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Tsi => "Text listing for the tsvm stack machine",
        }
    }

    /// File extension of the produced artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Tsi => "tsi",
        }
    }

    pub fn create(&self) -> Box<dyn Backend> {
        match self {
            Self::Tsi => Box::new(stack::StackBackend),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_backends_by_name() {
        assert_eq!(BackendType::from_name("tsi"), Some(BackendType::Tsi));
        assert_eq!(BackendType::from_name("z80"), None);
    }

    #[test]
    fn created_backend_compiles() {
        let program = ast::Program { body: vec![] };
        let artifact = BackendType::Tsi.create().compile(&program).unwrap();
        assert_eq!(artifact.artifact_name, "program.tsi");
        assert_eq!(artifact.program, "HALT\n");
    }
}
