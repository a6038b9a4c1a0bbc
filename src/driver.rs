//! Glue between source text, the front end and the two back ends.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::ast::Program;
use crate::config::{EmitConfig, RunConfig};
use crate::emitter::Emitter;
use crate::environment::Environment;
use crate::interpreter::Console;
use crate::lexer;
use crate::parser;

fn parse_source(source: &str, print_tree: bool) -> Result<Program> {
    let program = parser::parse(source).context("Parsing program")?;
    debug!(tree = ?program.block, "parsed syntax tree");
    if print_tree {
        eprintln!("{:#?}", program.block);
    }
    Ok(program)
}

pub fn run_source(
    source: &str,
    config: &RunConfig,
    console: &mut Console<'_>,
) -> Result<Environment> {
    let program = parse_source(source, config.print_tree)?;
    let environment = program.run(console).context("Running program")?;
    Ok(environment)
}

/// Compiles `source` into `out` and hands the sink back once it is flushed.
pub fn emit_source<W: Write>(source: &str, config: &EmitConfig, out: W) -> Result<W> {
    let program = parse_source(source, config.print_tree)?;
    let mut emitter = Emitter::new(out);
    program
        .compile(&mut emitter)
        .context("Generating assembly")?;
    debug!(lines = emitter.lines(), "generated assembly");
    let out = emitter.close().context("Flushing assembly")?;
    Ok(out)
}

pub fn run_file(path: &Path, config: &RunConfig) -> Result<()> {
    let source = read_source(path)?;
    let mut console = Console::stdio();
    run_source(&source, config, &mut console)?;
    Ok(())
}

pub fn emit_file(path: &Path, config: &EmitConfig) -> Result<PathBuf> {
    let source = read_source(path)?;
    let program = parse_source(&source, config.print_tree)?;
    let mut emitter = Emitter::create(&config.output_path)
        .with_context(|| format!("Creating {}", config.output_path.display()))?;
    program
        .compile(&mut emitter)
        .with_context(|| format!("Compiling {}", path.display()))?;
    emitter
        .close()
        .with_context(|| format!("Writing {}", config.output_path.display()))?;
    info!(output = %config.output_path.display(), "wrote assembly");
    Ok(config.output_path.clone())
}

/// Writes one token per line with its position, for inspecting the scanner.
pub fn dump_tokens(source: &str, out: &mut impl Write) -> Result<()> {
    for token in lexer::tokenize(source).context("Tokenizing program")? {
        let span = token.span();
        writeln!(out, "{}:{} {}", span.line, span.column + 1, token.kind())?;
    }
    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))
}
