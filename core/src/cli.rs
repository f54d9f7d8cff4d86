use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::interpreter::{
    lint_lines, literal_eval, parse_program_with, run_program, validate_structure, ParseOptions,
    Program, StdHost, StdoutSink, Value,
};

#[derive(Parser)]
#[command(name = "stepwise")]
#[command(about = "Stepwise - run programs written in structured-algorithm notation", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a program and print its result
    Run {
        /// Program file
        file: PathBuf,

        /// Input value, in INPUT order (repeatable). Literals are parsed, anything else is a string
        #[arg(short = 'i', long = "input")]
        inputs: Vec<String>,

        /// Reject malformed or unbalanced programs
        #[arg(long)]
        strict: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report structural problems without running
    Check {
        /// Program file
        file: PathBuf,
    },

    /// Print the parsed program as JSON
    Ast {
        /// Program file
        file: PathBuf,

        /// Reject malformed or unbalanced programs
        #[arg(long)]
        strict: bool,
    },

    /// Print the program in canonical form, steps renumbered from 1
    Fmt {
        /// Program file
        file: PathBuf,
    },
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with provided arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

/// Internal function that handles CLI commands
fn run_cli_with_args(cli: Cli) -> Result<()> {
    let strict_flag = match &cli.command {
        Commands::Run { strict, .. } | Commands::Ast { strict, .. } => strict.then_some(true),
        Commands::Check { .. } => Some(true),
        Commands::Fmt { .. } => None,
    };

    // Load configuration before doing any work so config errors surface first
    let config = Config::builder()
        .config_path(cli.config.as_deref().map(PathBuf::from))
        .strict(strict_flag)
        .build()?;
    init_tracing(&config);

    match cli.command {
        Commands::Run {
            file,
            inputs,
            json,
            ..
        } => {
            let program = load_program(&file, config.parser.strict)?;
            let inputs = collect_inputs(&program, inputs)?;
            let result = run_program(&program, inputs, &mut StdoutSink, &mut StdHost::new())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result.to_json())?);
            } else if config.run.print_result && result != Value::None {
                println!("{}", result);
            }
        }

        Commands::Check { file } => {
            let source = read_source(&file)?;
            let mut issues = lint_lines(&source);
            match parse_program_with(&source, ParseOptions::default()) {
                Ok(program) => {
                    for issue in validate_structure(&program) {
                        if !issues.contains(&issue) {
                            issues.push(issue);
                        }
                    }
                }
                Err(err) => {
                    println!("{}: {}", file.display(), err);
                    anyhow::bail!("{} could not be parsed", file.display());
                }
            }

            issues.sort_by_key(|issue| issue.line);
            for issue in &issues {
                println!("{}: {}", file.display(), issue);
            }
            if !issues.is_empty() {
                anyhow::bail!("{} problem(s) found in {}", issues.len(), file.display());
            }
            println!("{}: ok", file.display());
        }

        Commands::Ast { file, .. } => {
            let program = load_program(&file, config.parser.strict)?;
            println!("{}", serde_json::to_string_pretty(&program)?);
        }

        Commands::Fmt { file } => {
            let program = load_program(&file, config.parser.strict)?;
            print!("{}", program.to_source());
        }
    }

    Ok(())
}

/// Install the stderr subscriber: `RUST_LOG` wins over the configured filter
fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.filter));

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_source(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn load_program(file: &Path, strict: bool) -> Result<Program> {
    let source = read_source(file)?;
    let program = parse_program_with(&source, ParseOptions { strict })
        .with_context(|| format!("Failed to parse {}", file.display()))?;
    Ok(program)
}

/// Literal when it parses as one, plain string otherwise
pub fn parse_input(raw: &str) -> Value {
    literal_eval(raw.trim()).unwrap_or_else(|_| Value::Str(raw.to_string()))
}

/// Values for every declared input: flags first, then prompts on stdin
fn collect_inputs(program: &Program, given: Vec<String>) -> Result<Vec<Value>> {
    if given.len() > program.inputs.len() {
        anyhow::bail!(
            "{} takes {} input(s), {} given",
            program.name,
            program.inputs.len(),
            given.len()
        );
    }

    let mut values: Vec<Value> = given.iter().map(|raw| parse_input(raw)).collect();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    for name in &program.inputs[values.len()..] {
        print!("Enter {}: ", name);
        io::stdout().flush()?;
        let line = lines
            .next()
            .with_context(|| format!("No value given for input '{}'", name))?
            .context("Failed to read from stdin")?;
        values.push(parse_input(&line));
    }
    Ok(values)
}
