use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, ExitCode},
    time::Instant,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ktlang::{
    compiler::compiler::generate, display_error, errors::errors::Error, init_tracing,
    interpreter::{interpreter::execute, output::PrintHandler},
    parse_source,
};

/// Interpreter and x86-64 compiler for a small Kotlin-like language.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Print how long each phase took
    #[arg(long, global = true)]
    timings: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a program directly
    Run {
        file: PathBuf,
    },
    /// Emit AT&T assembly for a program
    Build {
        file: PathBuf,

        /// Assembly output, defaults to the input with a `.s` extension
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Assemble and link an executable next to the assembly
        #[arg(long)]
        link: bool,

        /// C compiler used for `--link`
        #[arg(long, value_name = "CC", default_value = "cc")]
        cc: String,
    },
}

/// A source file loaded for one command.
struct Source {
    name: String,
    text: String,
}

impl Source {
    fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read source file {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Source { name, text })
    }

    fn report(&self, error: &Error) {
        display_error(error, &self.text, &self.name);
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match execute_command(&cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {:#}", error);
            ExitCode::FAILURE
        }
    }
}

fn execute_command(cli: &Cli) -> Result<ExitCode> {
    match &cli.command {
        Commands::Run { file } => run(file, cli.timings),
        Commands::Build {
            file,
            output,
            link,
            cc,
        } => {
            let output = output
                .clone()
                .unwrap_or_else(|| file.with_extension("s"));
            build(file, &output, link.then_some(cc.as_str()), cli.timings)
        }
    }
}

fn run(path: &Path, timings: bool) -> Result<ExitCode> {
    let source = Source::read(path)?;
    let start = Instant::now();

    let program = match parse_source(&source.text, &source.name) {
        Ok(program) => program,
        Err(error) => {
            source.report(&error);
            return Ok(ExitCode::FAILURE);
        }
    };
    if timings {
        eprintln!("Parsed in {:?}", start.elapsed());
    }

    let run_start = Instant::now();
    let result = execute(&program, PrintHandler::stdout());
    if timings {
        eprintln!("Ran in {:?}", run_start.elapsed());
    }

    match result {
        Ok(result) => {
            for diagnostic in &result.diagnostics {
                source.report(diagnostic);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            source.report(&error);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn build(path: &Path, output: &Path, cc: Option<&str>, timings: bool) -> Result<ExitCode> {
    let source = Source::read(path)?;
    let start = Instant::now();

    let assembly = match parse_source(&source.text, &source.name).and_then(|program| {
        if timings {
            eprintln!("Parsed in {:?}", start.elapsed());
        }
        generate(&program)
    }) {
        Ok(assembly) => assembly,
        Err(error) => {
            source.report(&error);
            return Ok(ExitCode::FAILURE);
        }
    };
    if timings {
        eprintln!("Generated in {:?}", start.elapsed());
    }

    for diagnostic in &assembly.diagnostics {
        source.report(diagnostic);
    }

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    fs::write(output, &assembly.text)
        .with_context(|| format!("failed to write assembly to {}", output.display()))?;
    tracing::debug!(output = %output.display(), "wrote assembly");

    if let Some(cc) = cc {
        let link_start = Instant::now();
        link(cc, output)?;
        if timings {
            eprintln!("Linked in {:?}", link_start.elapsed());
        }
    }

    if timings {
        eprintln!("Total time: {:?}", start.elapsed());
    }
    Ok(ExitCode::SUCCESS)
}

/// Assembles and links `assembly` into an executable beside it.
fn link(cc: &str, assembly: &Path) -> Result<()> {
    let mut executable = assembly.with_extension("");
    if executable == assembly {
        executable = assembly.with_extension("out");
    }

    let result = Command::new(cc)
        .arg("-o")
        .arg(&executable)
        .arg(assembly)
        .arg("-lm")
        .output()
        .with_context(|| format!("failed to run {}", cc))?;

    if !result.status.success() {
        bail!(
            "{} failed to link {}:\n{}",
            cc,
            assembly.display(),
            String::from_utf8_lossy(&result.stderr)
        );
    }

    tracing::debug!(executable = %executable.display(), "linked");
    Ok(())
}
