use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{Level, info};

use tsc::backends::{BackendType, stack::ARTIFACT_NAME};
use tsc::{CompileError, Envelope, Token};

#[derive(Parser)]
#[command(name = "tsc")]
#[command(about = "Compiler for a tiny imperative language targeting the tsvm stack machine", version)]
struct Cli {
    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a source file into tokens
    Lex {
        /// Source file, `-` for stdin
        input: String,

        /// Print the JSON envelope instead of a listing
        #[arg(long)]
        json: bool,
    },

    /// Parse and show the AST without generating code
    Parse {
        /// Source file, `-` for stdin
        input: String,

        /// Input is a JSON token list as printed by `lex --json`
        #[arg(long)]
        tokens: bool,

        /// Print the JSON envelope instead of a debug dump
        #[arg(long)]
        json: bool,
    },

    /// Generate code from a JSON AST as printed by `parse --json`
    Generate {
        /// AST file, `-` for stdin
        input: String,

        /// Output file
        #[arg(short, long)]
        output: Option<String>,

        /// Print the JSON envelope instead of writing a file
        #[arg(long)]
        json: bool,
    },

    /// Compile a source file for the chosen target
    Compile {
        /// Source file, `-` for stdin
        input: String,

        /// Target backend
        #[arg(short, long, default_value = "tsi")]
        target: String,

        /// Output file
        #[arg(short, long)]
        output: Option<String>,

        /// Show the AST
        #[arg(long)]
        show_ast: bool,

        /// Print the JSON envelope instead of writing a file
        #[arg(long)]
        json: bool,
    },

    /// Compile a source file and execute it on the stack machine
    Run {
        /// Source file, `-` for stdin
        input: String,

        /// Abort after this many executed instructions
        #[arg(long)]
        max_steps: Option<u64>,
    },

    /// List supported targets
    Targets,
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Lex { input, json } => {
            let source = read_input(&input)?;
            let result = tsc::tokenize(&source);
            if json {
                return print_envelope(result);
            }
            match result {
                Ok(tokens) => {
                    for token in &tokens {
                        println!("{:?}", token);
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => Ok(report(&e)),
            }
        }
        Commands::Parse { input, tokens, json } => {
            let text = read_input(&input)?;
            let result = if tokens {
                let mut tokens: Vec<Token> = serde_json::from_str(&text)?;
                tokens.push(Token::eof_after(tokens.last()));
                tsc::parse(tokens)
            } else {
                tsc::parser::parse(&text)
            };
            if json {
                return print_envelope(result);
            }
            match result {
                Ok(program) => {
                    println!("{:#?}", program);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => Ok(report(&e)),
            }
        }
        Commands::Generate { input, output, json } => {
            let text = read_input(&input)?;
            let program: tsc::Program = serde_json::from_str(&text)?;
            let result = tsc::generate(&program);
            if json {
                return print_envelope(result);
            }
            match result {
                Ok(artifact) => {
                    let output_path = output.unwrap_or(artifact.artifact_name);
                    if overwrites_input(&input, &output_path) {
                        eprintln!("Refusing to overwrite input file: {}", input);
                        return Ok(ExitCode::FAILURE);
                    }
                    fs::write(&output_path, &artifact.program)?;
                    println!("Generated: {}", output_path);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => Ok(report(&e)),
            }
        }
        Commands::Compile { input, target, output, show_ast, json } => {
            let Some(backend_type) = BackendType::from_name(&target) else {
                eprintln!("Unknown target: {}", target);
                return Ok(ExitCode::FAILURE);
            };
            info!(%input, target = backend_type.name(), "compiling");

            let source = read_input(&input)?;
            let result = tsc::parser::parse(&source).and_then(|program| {
                if show_ast {
                    eprintln!("=== AST ===");
                    eprintln!("{:#?}", program);
                }
                backend_type.create().compile(&program)
            });
            if json {
                return print_envelope(result);
            }

            let artifact = match result {
                Ok(artifact) => artifact,
                Err(e) => return Ok(report(&e)),
            };

            let output_path =
                output.unwrap_or_else(|| default_output(&input, backend_type.extension()));
            if overwrites_input(&input, &output_path) {
                eprintln!("Refusing to overwrite input file: {}", input);
                return Ok(ExitCode::FAILURE);
            }
            fs::write(&output_path, &artifact.program)?;
            println!("Compiled to: {}", output_path);
            println!("Code size: {} lines", artifact.program.lines().count());

            println!("Listing:");
            for (i, line) in artifact.program.lines().enumerate() {
                println!("  {:4}: {}", i + 1, line);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run { input, max_steps } => {
            let source = read_input(&input)?;
            let instructions = match tsc::compile_instructions(&source) {
                Ok(instructions) => instructions,
                Err(e) => return Ok(report(&e)),
            };

            let program = tsvm::Program::from_instructions(instructions)?;
            let stdout = io::stdout();
            let mut machine = tsvm::Machine::new(program, stdout.lock()).with_step_limit(max_steps);
            let steps = machine.run()?;
            info!(steps, "execution finished");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Targets => {
            println!("Supported targets:");
            for backend in BackendType::all() {
                println!("  {:8} - {}", backend.name(), backend.description());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// `foo.src` -> `foo.tsi`. An input that already carries the target
/// extension gets it appended instead of being replaced by its own output.
fn default_output(input: &str, extension: &str) -> String {
    if input == "-" {
        return ARTIFACT_NAME.to_string();
    }
    let path = Path::new(input).with_extension(extension);
    if path == Path::new(input) {
        format!("{}.{}", input, extension)
    } else {
        path.to_string_lossy().into_owned()
    }
}

fn overwrites_input(input: &str, output: &str) -> bool {
    if input == "-" {
        return false;
    }
    if Path::new(input) == Path::new(output) {
        return true;
    }
    // Разные написания одного файла: ./a.tsi и a.tsi
    match (fs::canonicalize(input), fs::canonicalize(output)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn read_input(input: &str) -> io::Result<String> {
    if input == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        fs::read_to_string(input)
    }
}

fn print_envelope<T: Serialize>(
    result: Result<T, CompileError>,
) -> Result<ExitCode, Box<dyn Error>> {
    let envelope = Envelope::from_result(result);
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(if envelope.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn report(error: &CompileError) -> ExitCode {
    eprintln!("Error: {}", error);
    ExitCode::FAILURE
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(io::stderr)
        .with_max_level(level)
        .init();
}
