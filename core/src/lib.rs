pub mod cli;
pub mod config;
pub mod interpreter;

// Re-export the entry points
pub use interpreter::{parse_program, run_program, Program, Value};
