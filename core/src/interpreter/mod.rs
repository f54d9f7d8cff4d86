//! Structured-algorithm interpreter
//!
//! Source text is parsed into a [`Program`]: a header plus a flat list of
//! statements. The VM walks that list with an instruction pointer and a stack
//! of loop/try frames; there is no nested block tree.
//!
//! ```no_run
//! use stepwise_core::interpreter::{parse_program, run_program, StdHost, Value};
//!
//! let program = parse_program("ALGORITHM Double\nINPUT: n\nSTEP 1: RETURN n * 2\nEND ALGORITHM")?;
//! let mut output: Vec<String> = Vec::new();
//! let result = run_program(&program, vec![Value::Int(21)], &mut output, &mut StdHost::new())?;
//! assert_eq!(result, Value::Int(42));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod env;
pub mod errors;
pub mod exec_loop;
pub mod expressions;
pub mod host;
pub mod parser;
pub mod statements;
pub mod types;
pub mod vm;

#[cfg(test)]
mod tests;

pub use env::{Environment, HostObject};
pub use errors::{FaultKind, HostFault, RuntimeFault, SyntaxError};
pub use exec_loop::{run_program, run_until_done, step};
pub use expressions::literal_eval;
pub use host::{Host, Module, OutputSink, Pipeline, StdHost, StdoutSink};
pub use parser::validator::{lint_lines, validate_structure, ValidationError};
pub use parser::{parse_program, parse_program_with, ParseOptions};
pub use types::{Control, Dict, HeaderKind, Instance, Location, ModelHandle, Program, Statement, Value};
pub use vm::{Step, VM};
