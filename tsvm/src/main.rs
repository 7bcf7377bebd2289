use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{Level, info};

use tsvm::{Machine, Program};

#[derive(Parser)]
#[command(name = "tsvm")]
#[command(about = "Stack machine for .tsi programs", version)]
struct Cli {
    /// Program listing (.tsi)
    program: PathBuf,

    /// Abort after this many executed instructions
    #[arg(long)]
    max_steps: Option<u64>,

    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), tsvm::VmError> {
    let program = Program::load(&cli.program)?;
    info!(path = %cli.program.display(), instructions = program.len(), "running program");

    let stdout = io::stdout();
    let mut machine = Machine::new(program, stdout.lock()).with_step_limit(cli.max_steps);
    let steps = machine.run()?;

    info!(steps, "execution finished");
    Ok(())
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
