use std::path::PathBuf;

use clap::Parser;
use miette::{bail, IntoDiagnostic, Result};

use lc3vm::output::{self, file_message, message, MsgColor};
use lc3vm::term::Terminal;
use lc3vm::{Image, RunState, Status};

/// Run a binary LC3 program image until it halts.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// `.obj` file to run: a big-endian origin word followed by the program
    path: PathBuf,
    /// Produce minimal output, suited for blackbox tests
    #[arg(short, long)]
    minimal: bool,
    /// Stop with an error after this many instructions
    #[arg(short, long, value_name = "COUNT")]
    step_limit: Option<u64>,
    /// Print the register file once the program stops
    #[arg(short, long)]
    registers: bool,
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    lc3vm::env::init();
    output::set_minimal(args.minimal || lc3vm::env::is_minimal());

    let step_limit = args.step_limit.or_else(lc3vm::env::step_limit);
    run(&args.path, step_limit, args.registers)
}

fn run(path: &PathBuf, step_limit: Option<u64>, show_registers: bool) -> Result<()> {
    file_message(MsgColor::Green, "Loading", path);
    if !path.exists() {
        bail!("File does not exist. Exiting...");
    }
    let image = Image::read(path)?;
    let mut program = RunState::from_image(&image);

    message(
        MsgColor::Green,
        "Running",
        &format!("{} words at 0x{:04x}", image.words().len(), image.orig()),
    );

    let result = {
        let mut console = Terminal::new(output::is_minimal()).into_diagnostic()?;
        match step_limit {
            Some(limit) => program.run_for(&mut console, limit),
            None => program.run(&mut console).map(|_| program.status()),
        }
        // Console dropped here, leaving raw mode before anything else is printed
    };

    if show_registers {
        output::print_registers(program.registers());
    }

    match result {
        Ok(Status::Halted) => {
            file_message(MsgColor::Green, "Completed", path);
            Ok(())
        }
        Ok(Status::Running) => {
            message(MsgColor::Red, "Stopped", "step limit reached");
            bail!(
                "Program did not halt within {} instructions (PC at 0x{:04x})",
                program.steps(),
                program.pc()
            )
        }
        Err(error) => {
            message(MsgColor::Red, "Failed", &format!("after {} instructions", program.steps()));
            Err(error.into())
        }
    }
}
