use std::collections::HashMap;
use std::io::Write;

use tracing::{debug, trace};

use crate::error::VmError;
use crate::isa::Instruction;
use crate::program::Program;

/// Stack machine executing a decoded [`Program`].
///
/// `PRINT` writes each popped value followed by a newline to `out`.
pub struct Machine<W: Write> {
    program: Program,
    // Стек операндов
    stack: Vec<i64>,
    // Переменные, записанные через STORE
    variables: HashMap<String, i64>,
    pc: usize,
    steps: u64,
    step_limit: Option<u64>,
    halted: bool,
    out: W,
}

impl<W: Write> Machine<W> {
    pub fn new(program: Program, out: W) -> Self {
        Self {
            program,
            stack: Vec::new(),
            variables: HashMap::new(),
            pc: 0,
            steps: 0,
            step_limit: None,
            halted: false,
            out,
        }
    }

    /// Fails the run with [`VmError::StepLimit`] once more than `limit`
    /// instructions have executed.
    pub fn with_step_limit(mut self, limit: Option<u64>) -> Self {
        self.step_limit = limit;
        self
    }

    /// Runs until `HALT`; returns the number of executed instructions.
    pub fn run(&mut self) -> Result<u64, VmError> {
        while !self.halted {
            self.step()?;
        }
        self.out.flush()?;
        debug!(steps = self.steps, "machine halted");
        Ok(self.steps)
    }

    /// Executes one instruction.
    pub fn step(&mut self) -> Result<(), VmError> {
        if self.halted {
            return Ok(());
        }
        if let Some(limit) = self.step_limit {
            if self.steps >= limit {
                return Err(VmError::StepLimit { limit });
            }
        }

        let instruction = self
            .program
            .instructions()
            .get(self.pc)
            .cloned()
            .ok_or(VmError::MissingHalt)?;
        trace!(pc = self.pc, %instruction, depth = self.stack.len(), "step");

        self.pc += 1;
        self.steps += 1;
        self.execute(instruction)
    }

    fn execute(&mut self, instruction: Instruction) -> Result<(), VmError> {
        match instruction {
            Instruction::Push(value) => self.stack.push(value),
            Instruction::Load(name) => {
                // let x; без инициализатора ничего не сохраняет
                let value = self.variables.get(&name).copied().unwrap_or(0);
                self.stack.push(value);
            }
            Instruction::Store(name) => {
                let value = self.pop()?;
                self.variables.insert(name, value);
            }
            Instruction::Add => self.binary(|a, b| Ok(a.wrapping_add(b)))?,
            Instruction::Sub => self.binary(|a, b| Ok(a.wrapping_sub(b)))?,
            Instruction::Mul => self.binary(|a, b| Ok(a.wrapping_mul(b)))?,
            Instruction::Div => {
                let pc = self.pc - 1;
                self.binary(|a, b| {
                    if b == 0 {
                        Err(VmError::DivisionByZero { pc })
                    } else {
                        Ok(a.wrapping_div(b))
                    }
                })?
            }
            Instruction::Mod => {
                let pc = self.pc - 1;
                self.binary(|a, b| {
                    if b == 0 {
                        Err(VmError::DivisionByZero { pc })
                    } else {
                        Ok(a.wrapping_rem(b))
                    }
                })?
            }
            Instruction::CmpLt => self.binary(|a, b| Ok(truth(a < b)))?,
            Instruction::CmpLe => self.binary(|a, b| Ok(truth(a <= b)))?,
            Instruction::CmpGt => self.binary(|a, b| Ok(truth(a > b)))?,
            Instruction::CmpGe => self.binary(|a, b| Ok(truth(a >= b)))?,
            Instruction::CmpEq => self.binary(|a, b| Ok(truth(a == b)))?,
            Instruction::CmpNe => self.binary(|a, b| Ok(truth(a != b)))?,
            Instruction::And => self.binary(|a, b| Ok(truth(a != 0 && b != 0)))?,
            Instruction::Or => self.binary(|a, b| Ok(truth(a != 0 || b != 0)))?,
            Instruction::Not => {
                let value = self.pop()?;
                self.stack.push(truth(value == 0));
            }
            Instruction::Neg => {
                let value = self.pop()?;
                self.stack.push(value.wrapping_neg());
            }
            Instruction::Print => {
                let value = self.pop()?;
                writeln!(self.out, "{}", value)?;
            }
            Instruction::Jmp(label) => self.jump(&label),
            Instruction::Jz(label) => {
                if self.pop()? == 0 {
                    self.jump(&label);
                }
            }
            Instruction::Label(_) => {}
            Instruction::Halt => self.halted = true,
        }
        Ok(())
    }

    fn binary(&mut self, op: impl FnOnce(i64, i64) -> Result<i64, VmError>) -> Result<(), VmError> {
        let right = self.pop()?;
        let left = self.pop()?;
        self.stack.push(op(left, right)?);
        Ok(())
    }

    fn pop(&mut self) -> Result<i64, VmError> {
        self.stack.pop().ok_or(VmError::StackUnderflow { pc: self.pc - 1 })
    }

    fn jump(&mut self, label: &str) {
        // Метки проверены при загрузке программы
        if let Some(target) = self.program.label(label) {
            self.pc = target;
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn stack(&self) -> &[i64] {
        &self.stack
    }

    pub fn variable(&self, name: &str) -> Option<i64> {
        self.variables.get(name).copied()
    }

    pub fn into_output(self) -> W {
        self.out
    }
}

fn truth(condition: bool) -> i64 {
    condition as i64
}
