use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use tracing_subscriber::EnvFilter;

use minipas::config::{DEFAULT_OUTPUT_PATH, EmitConfig, RunConfig};
use minipas::driver;

#[derive(ClapParser)]
#[command(name = "minipas")]
#[command(about = "Interpreter and MIPS compiler for a small Pascal-like language")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print the parsed syntax tree to stderr
    #[arg(long, global = true)]
    print_tree: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Interpret a program; `read` consumes stdin
    Run { source: PathBuf },
    /// Compile a program to MIPS assembly
    Emit {
        source: PathBuf,
        #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
        output: PathBuf,
    },
    /// Print the token stream of a program
    Tokens { source: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Command::Run { source } => {
            let config = RunConfig {
                print_tree: cli.print_tree,
            };
            driver::run_file(&source, &config)?;
        }
        Command::Emit { source, output } => {
            let config = EmitConfig {
                output_path: output,
                print_tree: cli.print_tree,
            };
            driver::emit_file(&source, &config)?;
        }
        Command::Tokens { source } => {
            let text = std::fs::read_to_string(&source)
                .with_context(|| format!("Reading {}", source.display()))?;
            driver::dump_tokens(&text, &mut io::stdout().lock())?;
        }
    }

    Ok(())
}
