//! Virtual Machine state
//!
//! The VM holds all execution state for one run:
//! - ip: index of the next statement in the flat body
//! - frames: active loop and try blocks
//! - control: whether the run is still going, returned, or faulted

use std::rc::Rc;

use super::env::Environment;
use super::errors::{FaultKind, RuntimeFault};
use super::expressions::{evaluate, Expr, ExprCache};
use super::host::{Host, OutputSink};
use super::types::{Control, Frame, ModelHandle, Program, Value};

/* ===================== VM ===================== */

pub struct VM<'a> {
    pub program: &'a Program,

    pub env: Environment,

    /// Stack of active loop and try frames
    pub frames: Vec<Frame>,

    /// Index of the statement to execute next
    pub ip: usize,

    pub control: Control,

    pub(crate) host: &'a mut dyn Host,
    pub(crate) output: &'a mut dyn OutputSink,

    /// Most recent LOAD_MODEL result, used by PREDICT when `model` is unset
    pub(crate) last_model: Option<ModelHandle>,

    cache: ExprCache,
}

impl<'a> VM<'a> {
    pub fn new(program: &'a Program, host: &'a mut dyn Host, output: &'a mut dyn OutputSink) -> Self {
        VM {
            program,
            env: Environment::new(),
            frames: Vec::new(),
            ip: 0,
            control: Control::None,
            host,
            output,
            last_model: None,
            cache: ExprCache::new(),
        }
    }

    /// Bind positional inputs to the program's declared INPUT names
    pub fn bind_inputs(&mut self, inputs: Vec<Value>) -> Result<(), RuntimeFault> {
        if inputs.len() != self.program.inputs.len() {
            return Err(FaultKind::Arity {
                expected: self.program.inputs.len(),
                given: inputs.len(),
            }
            .into());
        }
        for (name, value) in self.program.inputs.iter().zip(inputs) {
            self.env.set(name.clone(), value);
        }
        Ok(())
    }

    /// Parse (once) and evaluate expression text
    pub fn eval(&mut self, text: &str) -> Result<Value, FaultKind> {
        let expr = self.parse(text)?;
        evaluate(&expr, &mut self.env)
    }

    pub(crate) fn parse(&mut self, text: &str) -> Result<Rc<Expr>, FaultKind> {
        self.cache.get(text)
    }

    /// Final outcome once execution stopped
    pub fn result(&self) -> Result<Value, RuntimeFault> {
        match &self.control {
            Control::Return(value) => Ok(value.clone()),
            Control::None => Ok(Value::None),
            Control::Throw(fault) => Err(fault.clone()),
        }
    }
}

/* ===================== Step Result ===================== */

/// Result of executing one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Continue to next step
    Continue,
    /// Execution complete
    Done,
}

/// Where execution goes after a statement
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Next,
    Jump(usize),
    Return(Value),
}
