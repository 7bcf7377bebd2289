use std::collections::HashSet;

use tracing::debug;
use tsvm::Instruction;

use super::{Artifact, Backend};
use crate::error::{CompileError, ErrorCode};
use crate::ir::ast::{self, BinaryOperator, Expression, Statement, UnaryOperator};

pub const ARTIFACT_NAME: &str = "program.tsi";

/// Emits `.tsi` text for the tsvm stack machine.
pub struct StackBackend;

impl Backend for StackBackend {
    fn compile(&self, program: &ast::Program) -> Result<Artifact, CompileError> {
        generate(program)
    }
}

/// Walks `program` once, depth first and left to right, and renders the
/// instructions one per line with a trailing newline.
pub fn generate(program: &ast::Program) -> Result<Artifact, CompileError> {
    let artifact = render(&emit(program)?);
    debug!(bytes = artifact.program.len(), "generated program");
    Ok(artifact)
}

/// Same walk as [`generate`], returning the typed instructions.
pub fn emit(program: &ast::Program) -> Result<Vec<Instruction>, CompileError> {
    let mut generator = Generator::default();
    generator.compile_program(program)?;
    Ok(generator.emitter.code)
}

fn render(code: &[Instruction]) -> Artifact {
    let mut program = String::new();
    for instruction in code {
        program.push_str(&instruction.to_string());
        program.push('\n');
    }
    Artifact {
        artifact_name: ARTIFACT_NAME.to_string(),
        program,
    }
}

/// Names declared so far. Flat: blocks do not open a scope.
#[derive(Default)]
struct Environment {
    declared: HashSet<String>,
}

impl Environment {
    fn declare(&mut self, name: &str) {
        self.declared.insert(name.to_string());
    }

    fn require(&self, name: &str) -> Result<(), CompileError> {
        if self.declared.contains(name) {
            Ok(())
        } else {
            Err(CompileError::CodegenError {
                code: ErrorCode::Codegen,
                message: format!("Undeclared name: {}", name),
            })
        }
    }
}

#[derive(Default)]
struct Emitter {
    code: Vec<Instruction>,
    next_label: usize,
}

impl Emitter {
    fn emit(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    /// Fresh label, `L0`, `L1`, ... in allocation order.
    fn label(&mut self) -> String {
        let label = format!("L{}", self.next_label);
        self.next_label += 1;
        label
    }
}

#[derive(Default)]
struct Generator {
    env: Environment,
    emitter: Emitter,
}

impl Generator {
    fn compile_program(&mut self, program: &ast::Program) -> Result<(), CompileError> {
        self.compile_statements(&program.body)?;
        self.emitter.emit(Instruction::Halt);
        Ok(())
    }

    fn compile_statements(&mut self, statements: &[Statement]) -> Result<(), CompileError> {
        for statement in statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    fn compile_statement(&mut self, statement: &Statement) -> Result<(), CompileError> {
        match statement {
            Statement::VarDecl { id, init } => {
                if let Some(init) = init {
                    self.compile_expression(init)?;
                    self.emitter.emit(Instruction::Store(id.clone()));
                }
                // Имя видно только со следующего оператора
                self.env.declare(id);
            }
            Statement::Assign { id, expr } => {
                self.env.require(id)?;
                self.compile_expression(expr)?;
                self.emitter.emit(Instruction::Store(id.clone()));
            }
            Statement::Print { expr } => {
                self.compile_expression(expr)?;
                self.emitter.emit(Instruction::Print);
            }
            Statement::Block { body } => {
                self.compile_statements(body)?;
            }
            Statement::If {
                test,
                then,
                otherwise,
            } => {
                self.compile_if(test, then, otherwise.as_ref())?;
            }
            Statement::While { test, body } => {
                self.compile_while(test, body)?;
            }
        }
        Ok(())
    }

    fn compile_if(
        &mut self,
        test: &Expression,
        then: &ast::Block,
        otherwise: Option<&ast::Block>,
    ) -> Result<(), CompileError> {
        // Метки выделяются до вложенных узлов
        let else_label = self.emitter.label();
        let end_label = self.emitter.label();

        self.compile_expression(test)?;
        self.emitter.emit(Instruction::Jz(else_label.clone()));
        self.compile_statements(&then.body)?;
        self.emitter.emit(Instruction::Jmp(end_label.clone()));
        self.emitter.emit(Instruction::Label(else_label));
        if let Some(otherwise) = otherwise {
            self.compile_statements(&otherwise.body)?;
        }
        self.emitter.emit(Instruction::Label(end_label));
        Ok(())
    }

    fn compile_while(&mut self, test: &Expression, body: &ast::Block) -> Result<(), CompileError> {
        let start_label = self.emitter.label();
        let end_label = self.emitter.label();

        self.emitter.emit(Instruction::Label(start_label.clone()));
        self.compile_expression(test)?;
        self.emitter.emit(Instruction::Jz(end_label.clone()));
        self.compile_statements(&body.body)?;
        self.emitter.emit(Instruction::Jmp(start_label));
        self.emitter.emit(Instruction::Label(end_label));
        Ok(())
    }

    /// Post-order walk with an explicit work list, so long operator chains
    /// do not grow the call stack.
    fn compile_expression(&mut self, expr: &Expression) -> Result<(), CompileError> {
        let mut work = vec![Work::Visit(expr)];

        while let Some(item) = work.pop() {
            let expr = match item {
                Work::Visit(expr) => expr,
                Work::Emit(instruction) => {
                    self.emitter.emit(instruction);
                    continue;
                }
            };

            match expr {
                Expression::Int { value } => {
                    self.emitter.emit(Instruction::Push(*value));
                }
                Expression::Ident { name } => {
                    self.env.require(name)?;
                    self.emitter.emit(Instruction::Load(name.clone()));
                }
                Expression::UnOp { op, expr } => {
                    work.push(Work::Emit(match op {
                        UnaryOperator::Not => Instruction::Not,
                        UnaryOperator::Neg => Instruction::Neg,
                    }));
                    work.push(Work::Visit(expr));
                }
                Expression::BinOp { op, left, right } => {
                    // Стек LIFO: левый операнд должен выйти первым
                    work.push(Work::Emit(opcode(*op)));
                    work.push(Work::Visit(right));
                    work.push(Work::Visit(left));
                }
            }
        }
        Ok(())
    }
}

enum Work<'a> {
    Visit(&'a Expression),
    Emit(Instruction),
}

fn opcode(op: BinaryOperator) -> Instruction {
    match op {
        BinaryOperator::Add => Instruction::Add,
        BinaryOperator::Subtract => Instruction::Sub,
        BinaryOperator::Multiply => Instruction::Mul,
        BinaryOperator::Divide => Instruction::Div,
        BinaryOperator::Modulo => Instruction::Mod,
        BinaryOperator::Less => Instruction::CmpLt,
        BinaryOperator::LessEqual => Instruction::CmpLe,
        BinaryOperator::Greater => Instruction::CmpGt,
        BinaryOperator::GreaterEqual => Instruction::CmpGe,
        BinaryOperator::Equal => Instruction::CmpEq,
        BinaryOperator::NotEqual => Instruction::CmpNe,
        BinaryOperator::And => Instruction::And,
        BinaryOperator::Or => Instruction::Or,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn listing(source: &str) -> Vec<String> {
        let program = parser::parse(source).unwrap();
        generate(&program)
            .unwrap()
            .program
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn codegen_error(source: &str) -> CompileError {
        let program = parser::parse(source).unwrap();
        generate(&program).unwrap_err()
    }

    #[test]
    fn multiplication_is_emitted_before_addition() {
        assert_eq!(
            listing("print(1 + 2 * 3);"),
            ["PUSH 1", "PUSH 2", "PUSH 3", "MUL", "ADD", "PRINT", "HALT"]
        );
    }

    #[test]
    fn negation_applies_before_binary_operator() {
        assert_eq!(
            listing("print(-1 + 2);"),
            ["PUSH 1", "NEG", "PUSH 2", "ADD", "PRINT", "HALT"]
        );
    }

    #[test]
    fn every_binary_operator_has_an_opcode() {
        assert_eq!(
            listing("let a = 1; print(a % 2 != 0 || !a && a >= 1 == a < a);"),
            [
                "PUSH 1", "STORE a", "LOAD a", "PUSH 2", "MOD", "PUSH 0", "CMPNE", "LOAD a", "NOT",
                "LOAD a", "PUSH 1", "CMPGE", "LOAD a", "LOAD a", "CMPLT", "CMPEQ", "AND", "OR",
                "PRINT", "HALT",
            ]
        );
    }

    #[test]
    fn if_else_allocates_labels_before_branches() {
        assert_eq!(
            listing("let x = 1; if (x) { print(1); } else { while (x) { x = 0; } }"),
            [
                "PUSH 1", "STORE x", "LOAD x", "JZ L0", "PUSH 1", "PRINT", "JMP L1", "L0:", "L2:",
                "LOAD x", "JZ L3", "PUSH 0", "STORE x", "JMP L2", "L3:", "L1:", "HALT",
            ]
        );
    }

    #[test]
    fn if_without_else_still_emits_both_labels() {
        assert_eq!(
            listing("if (0) { }"),
            ["PUSH 0", "JZ L0", "JMP L1", "L0:", "L1:", "HALT"]
        );
    }

    #[test]
    fn while_loop_layout() {
        assert_eq!(
            listing("let x=1; while (x) { print(x); x = x - 1; }"),
            [
                "PUSH 1", "STORE x", "L0:", "LOAD x", "JZ L1", "LOAD x", "PRINT", "LOAD x", "PUSH 1",
                "SUB", "STORE x", "JMP L0", "L1:", "HALT",
            ]
        );
    }

    #[test]
    fn declaration_without_initializer_emits_nothing() {
        assert_eq!(listing("let x; x = 2;"), ["PUSH 2", "STORE x", "HALT"]);
    }

    #[test]
    fn block_declarations_stay_visible() {
        assert_eq!(
            listing("{ let y = 5; } print(y);"),
            ["PUSH 5", "STORE y", "LOAD y", "PRINT", "HALT"]
        );
    }

    #[test]
    fn assignment_to_undeclared_name_fails() {
        let err = codegen_error("x = 1;");
        assert_eq!(
            err,
            CompileError::CodegenError {
                code: ErrorCode::Codegen,
                message: "Undeclared name: x".to_string(),
            }
        );
    }

    #[test]
    fn initializer_cannot_see_its_own_name() {
        let err = codegen_error("let x = x + 1;");
        assert_eq!(err.code(), ErrorCode::Codegen);
        assert_eq!(err.message(), "Undeclared name: x");
    }

    #[test]
    fn use_before_declaration_fails() {
        let err = codegen_error("print(y); let y = 1;");
        assert_eq!(err.message(), "Undeclared name: y");
    }

    #[test]
    fn output_ends_with_single_halt_and_newline() {
        let artifact = generate(&parser::parse("let a = 2; while (a) { a = a - 1; }").unwrap()).unwrap();
        assert!(artifact.program.ends_with("HALT\n"));
        assert_eq!(artifact.program.matches("HALT").count(), 1);
        assert_eq!(artifact.artifact_name, ARTIFACT_NAME);
    }

    #[test]
    fn long_sum_compiles_without_deep_recursion() {
        let source = format!("print({}1);", "1 + ".repeat(50_000));
        let code = emit(&parser::parse(&source).unwrap()).unwrap();
        assert_eq!(code.len(), 50_001 + 50_000 + 2);
        assert_eq!(code[..3], [Instruction::Push(1), Instruction::Push(1), Instruction::Add]);
        assert_eq!(code[code.len() - 2..], [Instruction::Print, Instruction::Halt]);
    }

    #[test]
    fn emit_matches_rendered_listing() {
        let program = parser::parse("let i = 3; while (i > 0) { print(-i); i = i - 1; }").unwrap();
        let rendered: Vec<String> = emit(&program).unwrap().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, listing("let i = 3; while (i > 0) { print(-i); i = i - 1; }"));
    }
}
