//! Core execution loop
//!
//! The body is a flat statement array. `step()` executes the statement at the
//! instruction pointer and moves the pointer: to the next statement, to a jump
//! target computed from block matching, or off the end when the run stops.
//!
//! ## Function Organization
//! 1. run_program() - Entry point (bind inputs, run, collect the result)
//! 2. run_until_done() - Driver (calls step repeatedly)
//! 3. step() - Executes one statement
//! 4. raise() - Routes a fault to the nearest CATCH or stops the run

use super::errors::RuntimeFault;
use super::host::{Host, OutputSink};
use super::statements::execute;
use super::types::{Control, FrameKind, Program, Statement, Value};
use super::vm::{Flow, Step, VM};

/* ===================== Public API ===================== */

/// Run a program to completion
///
/// Inputs bind to the declared INPUT names in order. Returns the first RETURN
/// value, or `Value::None` when execution runs off the end of the body.
pub fn run_program(
    program: &Program,
    inputs: Vec<Value>,
    output: &mut dyn OutputSink,
    host: &mut dyn Host,
) -> Result<Value, RuntimeFault> {
    tracing::info!(
        program = %program.name,
        statements = program.body.len(),
        "run started"
    );

    let mut vm = VM::new(program, host, output);
    vm.bind_inputs(inputs)?;
    run_until_done(&mut vm);

    let result = vm.result();
    match &result {
        Ok(value) => tracing::info!(program = %program.name, result = %value, "run finished"),
        Err(fault) => tracing::info!(program = %program.name, error = %fault, "run failed"),
    }
    result
}

/// Run the VM until it completes
///
/// After completion, inspect `vm.control` for the final state.
pub fn run_until_done(vm: &mut VM) {
    loop {
        match step(vm) {
            Step::Continue => continue,
            Step::Done => break,
        }
    }
}

/// Execute one statement
pub fn step(vm: &mut VM) -> Step {
    if !matches!(vm.control, Control::None) {
        return Step::Done;
    }

    let program = vm.program;
    let Some(stmt) = program.body.get(vm.ip) else {
        return Step::Done;
    };

    tracing::debug!(ip = vm.ip, statement = stmt.keyword(), "dispatch");

    match execute(vm, stmt) {
        Ok(Flow::Next) => vm.ip += 1,
        Ok(Flow::Jump(target)) => vm.ip = target,
        Ok(Flow::Return(value)) => {
            vm.control = Control::Return(value);
            return Step::Done;
        }
        Err(kind) => {
            let fault = RuntimeFault::new(kind).at(program.location(vm.ip));
            return raise(vm, fault);
        }
    }

    Step::Continue
}

/* ===================== Faults ===================== */

/// Unwind to the innermost TRY that has a CATCH, or stop the run
fn raise(vm: &mut VM, fault: RuntimeFault) -> Step {
    let handler = vm
        .frames
        .iter()
        .enumerate()
        .rev()
        .find_map(|(pos, frame)| match frame.kind {
            FrameKind::Try { catch: Some(catch) } => Some((pos, catch)),
            _ => None,
        });

    let Some((pos, catch)) = handler else {
        tracing::debug!(error = %fault, "uncaught fault");
        vm.control = Control::Throw(fault);
        return Step::Done;
    };

    // The try frame goes too; END TRY tolerates its absence
    vm.frames.truncate(pos);

    let error_var = match vm.program.body.get(catch) {
        Some(Statement::Catch { error_var }) => error_var.as_str(),
        _ => "error",
    };
    tracing::debug!(error = %fault, catch, error_var, "fault caught");

    vm.env.set(error_var, Value::Str(fault.kind.to_string()));
    vm.ip = catch + 1;
    Step::Continue
}
