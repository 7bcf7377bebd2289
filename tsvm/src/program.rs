use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::error::{LoadError, VmError};
use crate::isa::Instruction;

/// A decoded program with every label resolved to an instruction index.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    instructions: Vec<Instruction>,
    labels: HashMap<String, usize>,
}

impl Program {
    /// Builds a program from already decoded instructions; line numbers in
    /// errors are positions in `instructions`, starting at 1.
    pub fn from_instructions(instructions: Vec<Instruction>) -> Result<Self, LoadError> {
        let numbered = instructions
            .into_iter()
            .enumerate()
            .map(|(index, instruction)| (index + 1, instruction))
            .collect();
        Self::assemble(numbered)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, VmError> {
        let text = fs::read_to_string(path.as_ref())?;
        let program = text.parse::<Program>()?;
        debug!(
            path = %path.as_ref().display(),
            instructions = program.len(),
            "program loaded"
        );
        Ok(program)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    fn assemble(numbered: Vec<(usize, Instruction)>) -> Result<Self, LoadError> {
        // Первый проход - собираем метки
        let mut labels = HashMap::new();
        for (index, (line, instruction)) in numbered.iter().enumerate() {
            if let Instruction::Label(name) = instruction {
                if labels.insert(name.clone(), index).is_some() {
                    return Err(LoadError::DuplicateLabel {
                        line: *line,
                        label: name.clone(),
                    });
                }
            }
        }

        // Второй проход - проверяем что все прыжки ведут на известные метки
        for (line, instruction) in &numbered {
            if let Instruction::Jmp(target) | Instruction::Jz(target) = instruction {
                if !labels.contains_key(target) {
                    return Err(LoadError::UndefinedLabel {
                        line: *line,
                        label: target.clone(),
                    });
                }
            }
        }

        let instructions = numbered.into_iter().map(|(_, instruction)| instruction).collect();
        Ok(Self { instructions, labels })
    }
}

impl FromStr for Program {
    type Err = LoadError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut numbered = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if let Some(instruction) = Instruction::parse_line(index + 1, line)? {
                numbered.push((index + 1, instruction));
            }
        }
        Self::assemble(numbered)
    }
}
