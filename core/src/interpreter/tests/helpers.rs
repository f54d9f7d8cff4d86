//! Test helpers for interpreter tests
//!
//! Common utilities for parsing programs and running them to completion

use crate::interpreter::{
    parse_program, run_until_done, Control, Environment, FaultKind, Program, StdHost, Value, VM,
};

/// What a finished run left behind
pub struct Outcome {
    pub control: Control,
    pub env: Environment,
    pub output: Vec<String>,
}

impl Outcome {
    pub fn returned(&self) -> Option<&Value> {
        match &self.control {
            Control::Return(value) => Some(value),
            _ => None,
        }
    }

    pub fn var(&self, name: &str) -> Option<&Value> {
        self.env.get(name)
    }

    /// The uncaught fault kind; panics if the run did not fault
    pub fn fault(&self) -> &FaultKind {
        match &self.control {
            Control::Throw(fault) => &fault.kind,
            other => panic!("expected a fault, run ended with {:?}", other),
        }
    }
}

/// Parse program source, serialize/deserialize it, and run it with a default host
///
/// The JSON round trip checks that every statement kind survives serialization.
pub fn parse_and_run(source: &str, inputs: Vec<Value>) -> Outcome {
    parse_and_run_with(source, inputs, StdHost::new())
}

/// Same as [`parse_and_run`] with a caller-built host
pub fn parse_and_run_with(source: &str, inputs: Vec<Value>, mut host: StdHost) -> Outcome {
    let program = parse_program(source).expect("Parse program failed");
    let json = serde_json::to_string(&program).expect("Program serialization failed");
    let program: Program = serde_json::from_str(&json).expect("Program deserialization failed");

    let mut output: Vec<String> = Vec::new();
    let (control, env) = {
        let mut vm = VM::new(&program, &mut host, &mut output);
        vm.bind_inputs(inputs).expect("Binding inputs failed");
        run_until_done(&mut vm);
        (vm.control, vm.env)
    };

    Outcome {
        control,
        env,
        output,
    }
}

/// Wrap STEP lines in an ALGORITHM header and terminator, numbering from 1
pub fn algorithm(inputs: &str, steps: &[&str]) -> String {
    let mut source = String::from("ALGORITHM Test\n");
    if !inputs.is_empty() {
        source.push_str(&format!("INPUT: {}\n", inputs));
    }
    for (i, step) in steps.iter().enumerate() {
        source.push_str(&format!("STEP {}: {}\n", i + 1, step));
    }
    source.push_str("END ALGORITHM\n");
    source
}
