//! Lowering of the syntax tree to MIPS assembly (SPIM/MARS dialect).
//!
//! Register conventions:
//! - `$v0` holds the value of the most recently compiled expression.
//! - `$t0` is the test register for branches and the left operand of binary ops.
//! - Globals live in `.data` as `var_<name>`; procedure parameters, the result
//!   slot and procedure-only locals live in a `$fp`-relative frame.
//!
//! Booleans are materialised as `1`/`0`, so "equals one" is the only truth
//! test needed and matches `Value::is_truthy`.

use std::collections::BTreeSet;
use std::io::Write;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::ast::{BinaryOperator, Block, Expression, ProcedureDeclaration, Program, Statement};
use crate::emitter::Emitter;
use crate::environment::Environment;

mod error;

pub use error::{CompileError, CompileResult};

pub const EXIT_SEQUENCE: [&str; 2] = ["li $v0, 10", "syscall"];

const DIVISION_GUARD: &str = "div_by_zero";
const WORD: i32 = 4;

/// Where names resolve while compiling one routine.
pub struct CompileScope<'a> {
    environment: &'a Environment,
    frame: FxHashMap<String, i32>,
}

impl<'a> CompileScope<'a> {
    pub fn global(environment: &'a Environment) -> Self {
        Self {
            environment,
            frame: FxHashMap::default(),
        }
    }

    fn for_procedure(
        environment: &'a Environment,
        declaration: &'a ProcedureDeclaration,
        locals: &[String],
    ) -> Self {
        let mut frame = FxHashMap::default();
        // A parameter named after the procedure takes over the result slot.
        frame.insert(declaration.name.clone(), -WORD);
        let count = declaration.params.len() as i32;
        for (index, param) in declaration.params.iter().enumerate() {
            frame.insert(param.clone(), 2 * WORD + WORD * (count - 1 - index as i32));
        }
        for (index, local) in locals.iter().enumerate() {
            frame.insert(local.clone(), -WORD * (index as i32 + 2));
        }
        Self {
            environment,
            frame,
        }
    }

    fn location(&self, name: &str) -> String {
        match self.frame.get(name) {
            Some(offset) => format!("{offset}($fp)"),
            None => global_label(name),
        }
    }
}

impl Program {
    /// Emits the complete program: data section, main body, exit sequence,
    /// procedure routines and the division guard.
    pub fn compile<W: Write>(&self, emitter: &mut Emitter<W>) -> CompileResult<()> {
        let top_level = assigned_names(&self.block);
        let frames: Vec<(&ProcedureDeclaration, Vec<String>)> = self
            .environment
            .procedures()
            .iter()
            .map(|declaration| {
                let locals = procedure_locals(declaration, &top_level);
                (declaration.as_ref(), locals)
            })
            .collect();

        let mut globals: BTreeSet<String> = self
            .environment
            .declared_variables()
            .iter()
            .filter(|name| !frames.iter().any(|(_, locals)| locals.contains(*name)))
            .cloned()
            .collect();
        referenced_names(&self.block, &mut globals);
        for (declaration, locals) in &frames {
            let mut used = BTreeSet::new();
            referenced_names(&declaration.body, &mut used);
            for name in used {
                let in_frame = name == declaration.name
                    || declaration.params.contains(&name)
                    || locals.contains(&name);
                if !in_frame {
                    globals.insert(name);
                }
            }
        }
        debug!(
            globals = globals.len(),
            procedures = frames.len(),
            "compiling program"
        );

        emitter.emit(".data")?;
        emitter.emit("newline: .asciiz \"\\n\"")?;
        emitter.emit("div_zero_message: .asciiz \"Division by zero\\n\"")?;
        for name in &globals {
            emitter.emit(format!("{}: .word 0", global_label(name)))?;
        }
        emitter.emit(".text")?;
        emitter.emit(".globl main")?;
        emitter.emit("main:")?;
        self.block
            .compile(emitter, &CompileScope::global(&self.environment))?;
        for line in EXIT_SEQUENCE {
            emitter.emit(line)?;
        }

        for (declaration, locals) in frames {
            let scope = CompileScope::for_procedure(&self.environment, declaration, &locals);
            compile_procedure(declaration, locals.len(), emitter, &scope)?;
        }

        emitter.emit(format!("{DIVISION_GUARD}:"))?;
        emitter.emit("la $a0, div_zero_message")?;
        emitter.emit("li $v0, 4")?;
        emitter.emit("syscall")?;
        emitter.emit("li $a0, 1")?;
        emitter.emit("li $v0, 17")?;
        emitter.emit("syscall")?;
        Ok(())
    }
}

fn compile_procedure<W: Write>(
    declaration: &ProcedureDeclaration,
    local_count: usize,
    emitter: &mut Emitter<W>,
    scope: &CompileScope<'_>,
) -> CompileResult<()> {
    emitter.emit(format!("{}:", procedure_label(&declaration.name)))?;
    emitter.emit(format!("subu $sp, $sp, {}", 2 * WORD))?;
    emitter.emit("sw $ra, 4($sp)")?;
    emitter.emit("sw $fp, 0($sp)")?;
    emitter.emit("move $fp, $sp")?;
    emitter.emit(format!("subu $sp, $sp, {}", WORD * (local_count as i32 + 1)))?;
    for slot in 0..=local_count as i32 {
        emitter.emit(format!("sw $zero, {}($fp)", -WORD * (slot + 1)))?;
    }

    declaration.body.compile(emitter, scope)?;

    emitter.emit(format!("lw $v0, {}", scope.location(&declaration.name)))?;
    emitter.emit("move $sp, $fp")?;
    emitter.emit("lw $fp, 0($sp)")?;
    emitter.emit("lw $ra, 4($sp)")?;
    emitter.emit(format!("addu $sp, $sp, {}", 2 * WORD))?;
    emitter.emit("jr $ra")?;
    Ok(())
}

impl Block {
    pub fn compile<W: Write>(
        &self,
        emitter: &mut Emitter<W>,
        scope: &CompileScope<'_>,
    ) -> CompileResult<()> {
        for statement in &self.statements {
            statement.compile(emitter, scope)?;
        }
        Ok(())
    }
}

impl Statement {
    pub fn compile<W: Write>(
        &self,
        emitter: &mut Emitter<W>,
        scope: &CompileScope<'_>,
    ) -> CompileResult<()> {
        match self {
            Statement::Assignment { name, value } => {
                value.compile(emitter, scope)?;
                emitter.emit(format!("sw $v0, {}", scope.location(name)))?;
            }
            Statement::Block(block) => block.compile(emitter, scope)?,
            Statement::If {
                condition,
                then_block,
                else_block,
            } => {
                let else_label = emitter.label();
                compile_branch_if_false(condition, &else_label, emitter, scope)?;
                then_block.compile(emitter, scope)?;
                if else_block.statements.is_empty() {
                    emitter.emit(format!("{else_label}:"))?;
                } else {
                    let end_label = emitter.label();
                    emitter.emit(format!("j {end_label}"))?;
                    emitter.emit(format!("{else_label}:"))?;
                    else_block.compile(emitter, scope)?;
                    emitter.emit(format!("{end_label}:"))?;
                }
            }
            Statement::WhileLoop { condition, body } => {
                let top_label = emitter.label();
                let end_label = emitter.label();
                emitter.emit(format!("{top_label}:"))?;
                compile_branch_if_false(condition, &end_label, emitter, scope)?;
                body.compile(emitter, scope)?;
                emitter.emit(format!("j {top_label}"))?;
                emitter.emit(format!("{end_label}:"))?;
            }
            Statement::Read(_) => {
                return Err(CompileError::UnsupportedOperation { node: "read" });
            }
            Statement::Writeln(expression) => {
                expression.compile(emitter, scope)?;
                emitter.emit("move $a0, $v0")?;
                emitter.emit("li $v0, 1")?;
                emitter.emit("syscall")?;
                emitter.emit("la $a0, newline")?;
                emitter.emit("li $v0, 4")?;
                emitter.emit("syscall")?;
            }
            // Evaluated for its effects only, like the interpreter.
            Statement::Return(expression) => expression.compile(emitter, scope)?,
            // Bodies are emitted as routines after the exit sequence.
            Statement::ProcedureDeclaration(_) => {}
        }
        Ok(())
    }
}

impl Expression {
    pub fn compile<W: Write>(
        &self,
        emitter: &mut Emitter<W>,
        scope: &CompileScope<'_>,
    ) -> CompileResult<()> {
        match self {
            Expression::Number(value) => emitter.emit(format!("li $v0, {value}"))?,
            Expression::Variable(name) => {
                emitter.emit(format!("lw $v0, {}", scope.location(name)))?
            }
            Expression::BinOp { left, op, right } => {
                left.compile(emitter, scope)?;
                push_accumulator(emitter)?;
                right.compile(emitter, scope)?;
                emitter.emit("lw $t0, 0($sp)")?;
                emitter.emit(format!("addu $sp, $sp, {WORD}"))?;
                compile_operator(*op, emitter)?;
            }
            Expression::ProcedureCall { name, args } => {
                let declaration = scope.environment.get_procedure(name).map_err(|_| {
                    CompileError::UndefinedProcedure {
                        name: name.to_string(),
                    }
                })?;
                if declaration.params.len() != args.len() {
                    return Err(CompileError::ArityMismatch {
                        name: name.to_string(),
                        expected: declaration.params.len(),
                        found: args.len(),
                    });
                }
                for arg in args {
                    arg.compile(emitter, scope)?;
                    push_accumulator(emitter)?;
                }
                emitter.emit(format!("jal {}", procedure_label(name)))?;
                if !args.is_empty() {
                    emitter.emit(format!("addu $sp, $sp, {}", WORD * args.len() as i32))?;
                }
            }
        }
        Ok(())
    }
}

fn compile_branch_if_false<W: Write>(
    condition: &Expression,
    target: &str,
    emitter: &mut Emitter<W>,
    scope: &CompileScope<'_>,
) -> CompileResult<()> {
    condition.compile(emitter, scope)?;
    emitter.emit("li $t0, 1")?;
    emitter.emit(format!("bne $v0, $t0, {target}"))?;
    Ok(())
}

fn compile_operator<W: Write>(op: BinaryOperator, emitter: &mut Emitter<W>) -> CompileResult<()> {
    let mnemonic = match op {
        BinaryOperator::Add => "addu",
        BinaryOperator::Subtract => "subu",
        BinaryOperator::Multiply => "mul",
        BinaryOperator::Divide => {
            emitter.emit(format!("beq $v0, $zero, {DIVISION_GUARD}"))?;
            emitter.emit("div $t0, $v0")?;
            emitter.emit("mflo $v0")?;
            return Ok(());
        }
        BinaryOperator::Equal => "seq",
        BinaryOperator::NotEqual => "sne",
        BinaryOperator::Less => "slt",
        BinaryOperator::LessEqual => "sle",
        BinaryOperator::Greater => "sgt",
        BinaryOperator::GreaterEqual => "sge",
    };
    emitter.emit(format!("{mnemonic} $v0, $t0, $v0"))?;
    Ok(())
}

fn push_accumulator<W: Write>(emitter: &mut Emitter<W>) -> CompileResult<()> {
    emitter.emit(format!("subu $sp, $sp, {WORD}"))?;
    emitter.emit("sw $v0, 0($sp)")?;
    Ok(())
}

fn global_label(name: &str) -> String {
    format!("var_{name}")
}

fn procedure_label(name: &str) -> String {
    format!("proc_{name}")
}

/// Names assigned inside a procedure that the main program never assigns
/// get a frame slot of their own.
fn procedure_locals(
    declaration: &ProcedureDeclaration,
    top_level: &BTreeSet<String>,
) -> Vec<String> {
    assigned_names(&declaration.body)
        .into_iter()
        .filter(|name| {
            *name != declaration.name
                && !declaration.params.contains(name)
                && !top_level.contains(name)
        })
        .collect()
}

fn assigned_names(block: &Block) -> BTreeSet<String> {
    fn visit(block: &Block, names: &mut BTreeSet<String>) {
        for statement in &block.statements {
            match statement {
                Statement::Assignment { name, .. } | Statement::Read(name) => {
                    names.insert(name.clone());
                }
                Statement::Block(inner) => visit(inner, names),
                Statement::If {
                    then_block,
                    else_block,
                    ..
                } => {
                    visit(then_block, names);
                    visit(else_block, names);
                }
                Statement::WhileLoop { body, .. } => visit(body, names),
                Statement::Writeln(_)
                | Statement::Return(_)
                | Statement::ProcedureDeclaration(_) => {}
            }
        }
    }

    let mut names = BTreeSet::new();
    visit(block, &mut names);
    names
}

fn referenced_names(block: &Block, names: &mut BTreeSet<String>) {
    fn visit_expression(expression: &Expression, names: &mut BTreeSet<String>) {
        match expression {
            Expression::Number(_) => {}
            Expression::Variable(name) => {
                names.insert(name.clone());
            }
            Expression::BinOp { left, right, .. } => {
                visit_expression(left, names);
                visit_expression(right, names);
            }
            Expression::ProcedureCall { args, .. } => {
                for arg in args {
                    visit_expression(arg, names);
                }
            }
        }
    }

    for statement in &block.statements {
        match statement {
            Statement::Assignment { name, value } => {
                names.insert(name.clone());
                visit_expression(value, names);
            }
            Statement::Read(name) => {
                names.insert(name.clone());
            }
            Statement::Block(inner) => referenced_names(inner, names),
            Statement::If {
                condition,
                then_block,
                else_block,
            } => {
                visit_expression(condition, names);
                referenced_names(then_block, names);
                referenced_names(else_block, names);
            }
            Statement::WhileLoop { condition, body } => {
                visit_expression(condition, names);
                referenced_names(body, names);
            }
            Statement::Writeln(expression) | Statement::Return(expression) => {
                visit_expression(expression, names);
            }
            Statement::ProcedureDeclaration(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Console;
    use crate::parser::parse;
    use indoc::indoc;

    fn compile_source(source: &str) -> CompileResult<String> {
        let program = parse(source).expect("parse failed");
        let mut emitter = Emitter::new(Vec::new());
        program.compile(&mut emitter)?;
        let out = emitter.close()?;
        Ok(String::from_utf8(out).expect("assembly is utf8"))
    }

    fn assert_contains_in_order(assembly: &str, expected: &[&str]) {
        let lines: Vec<&str> = assembly.lines().collect();
        let mut position = 0;
        for line in expected {
            match lines[position..].iter().position(|candidate| candidate == line) {
                Some(offset) => position += offset + 1,
                None => panic!("missing '{line}' after line {position} in:\n{assembly}"),
            }
        }
    }

    #[test]
    fn compiles_straight_line_program() {
        let assembly = compile_source("assign x = 2 display x + 1").expect("compile failed");
        let expected = indoc! {r#"
            .data
            newline: .asciiz "\n"
            div_zero_message: .asciiz "Division by zero\n"
            var_x: .word 0
            .text
            .globl main
            main:
            li $v0, 2
            sw $v0, var_x
            lw $v0, var_x
            subu $sp, $sp, 4
            sw $v0, 0($sp)
            li $v0, 1
            lw $t0, 0($sp)
            addu $sp, $sp, 4
            addu $v0, $t0, $v0
            move $a0, $v0
            li $v0, 1
            syscall
            la $a0, newline
            li $v0, 4
            syscall
            li $v0, 10
            syscall
            div_by_zero:
            la $a0, div_zero_message
            li $v0, 4
            syscall
            li $a0, 1
            li $v0, 17
            syscall
        "#};
        assert_eq!(assembly, expected);
    }

    #[test]
    fn if_emits_both_branches() {
        let assembly =
            compile_source("if 0 then display 5 else display 6 end").expect("compile failed");
        assert_contains_in_order(
            &assembly,
            &[
                "li $v0, 0",
                "li $t0, 1",
                "bne $v0, $t0, L1",
                "li $v0, 5",
                "j L2",
                "L1:",
                "li $v0, 6",
                "L2:",
                "li $v0, 10",
            ],
        );
    }

    #[test]
    fn if_without_else_branches_past_then_block() {
        let assembly = compile_source("if 1 then display 5 end").expect("compile failed");
        assert_contains_in_order(
            &assembly,
            &["bne $v0, $t0, L1", "li $v0, 5", "L1:", "li $v0, 10"],
        );
        assert!(!assembly.contains("L2"));
    }

    #[test]
    fn while_jumps_back_to_top() {
        let assembly = compile_source("assign n = 3 while n > 0 do assign n = n - 1 end")
            .expect("compile failed");
        assert_contains_in_order(
            &assembly,
            &[
                "L1:",
                "lw $v0, var_n",
                "sgt $v0, $t0, $v0",
                "bne $v0, $t0, L2",
                "subu $v0, $t0, $v0",
                "sw $v0, var_n",
                "j L1",
                "L2:",
            ],
        );
    }

    #[test]
    fn division_is_guarded() {
        let assembly = compile_source("display 8 / 2").expect("compile failed");
        assert_contains_in_order(
            &assembly,
            &["beq $v0, $zero, div_by_zero", "div $t0, $v0", "mflo $v0"],
        );
    }

    #[test]
    fn read_is_unsupported() {
        let error = compile_source("read x display x").expect_err("expected failure");
        assert!(matches!(
            error,
            CompileError::UnsupportedOperation { node: "read" }
        ));
    }

    #[test]
    fn procedures_use_frames_and_globals() {
        let source = indoc! {"
            PROCEDURE add(a, b)
                assign tmp = a + b
                assign add = tmp + offset
            end
            assign offset = 10
            display add(1, 2)
        "};
        let assembly = compile_source(source).expect("compile failed");
        assert!(assembly.contains("var_offset: .word 0"));
        assert!(!assembly.contains("var_tmp"));
        assert!(!assembly.contains("var_a:"));
        assert_contains_in_order(
            &assembly,
            &[
                "main:",
                "li $v0, 1",
                "sw $v0, 0($sp)",
                "li $v0, 2",
                "sw $v0, 0($sp)",
                "jal proc_add",
                "addu $sp, $sp, 8",
                "li $v0, 10",
                "syscall",
                "proc_add:",
                "move $fp, $sp",
                "subu $sp, $sp, 8",
                "sw $zero, -4($fp)",
                "sw $zero, -8($fp)",
                "lw $v0, 12($fp)",
                "lw $v0, 8($fp)",
                "sw $v0, -8($fp)",
                "lw $v0, var_offset",
                "sw $v0, -4($fp)",
                "lw $v0, -4($fp)",
                "jr $ra",
                "div_by_zero:",
            ],
        );
    }

    #[test]
    fn return_leaves_result_slot_alone() {
        let assembly =
            compile_source("PROCEDURE one() return 1 end display one()").expect("compile failed");
        assert_contains_in_order(
            &assembly,
            &["proc_one:", "sw $zero, -4($fp)", "li $v0, 1", "lw $v0, -4($fp)", "jr $ra"],
        );
        assert!(!assembly.contains("sw $v0, -4($fp)"));
    }

    #[test]
    fn parameter_named_after_procedure_is_returned() {
        let assembly =
            compile_source("PROCEDURE echo(echo) end display echo(5)").expect("compile failed");
        assert_contains_in_order(&assembly, &["proc_echo:", "lw $v0, 8($fp)", "jr $ra"]);
    }

    #[test]
    fn mixed_equality_takes_the_interpreted_branch() {
        let source = "if (2 < 3) = 1 then display 7 else display 8 end";
        let program = parse(source).expect("parse failed");
        let mut output = Vec::new();
        program
            .run(&mut Console::new("".as_bytes(), &mut output))
            .expect("run failed");
        assert_eq!(String::from_utf8(output).expect("utf8"), "7\n");

        // `slt` leaves 1 in $v0, so `seq` against 1 falls through to the then-branch.
        let assembly = compile_source(source).expect("compile failed");
        assert_contains_in_order(
            &assembly,
            &[
                "slt $v0, $t0, $v0",
                "li $v0, 1",
                "seq $v0, $t0, $v0",
                "li $t0, 1",
                "bne $v0, $t0, L1",
                "li $v0, 7",
                "j L2",
                "L1:",
                "li $v0, 8",
                "L2:",
            ],
        );
    }

    #[test]
    fn calls_are_checked_against_declarations() {
        assert!(matches!(
            compile_source("display nope()").expect_err("expected failure"),
            CompileError::UndefinedProcedure { ref name } if name == "nope"
        ));
        assert!(matches!(
            compile_source("PROCEDURE f(a) end display f()").expect_err("expected failure"),
            CompileError::ArityMismatch {
                expected: 1,
                found: 0,
                ..
            }
        ));
    }

    #[test]
    fn failed_compile_keeps_partial_output() {
        let program = parse("display 1 read x").expect("parse failed");
        let mut emitter = Emitter::new(Vec::new());
        assert!(program.compile(&mut emitter).is_err());
        assert!(emitter.lines() > 0);
        let out = emitter.close().expect("close");
        assert!(String::from_utf8_lossy(&out).contains("main:"));
    }
}
