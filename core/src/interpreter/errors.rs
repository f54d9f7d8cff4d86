//! Error types for parsing and execution

use super::types::ast::Location;
use thiserror::Error;

/* ===================== Parse Errors ===================== */

/// Parse-time failure. Nothing executes when parsing fails.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error("empty program: expected an ALGORITHM, MODEL or API_CALL header")]
    Empty,

    #[error("line {line}: expected ALGORITHM, MODEL or API_CALL header, found '{found}'")]
    MissingHeader { line: usize, found: String },

    #[error("line {line}: header is missing a program name")]
    MissingName { line: usize },

    #[error("line {line}: malformed {keyword} statement: '{content}'")]
    Malformed {
        line: usize,
        keyword: String,
        content: String,
    },

    #[error("line {line}: {message}")]
    Unbalanced { line: usize, message: String },

    #[error("line {line}: not a STEP line: '{content}'")]
    Unrecognized { line: usize, content: String },
}

/* ===================== Runtime Faults ===================== */

/// Failure reported by the host bridge
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostFault {
    #[error("No module named '{0}'")]
    ModuleNotFound(String),

    #[error("unknown model '{0}'")]
    UnknownModel(String),

    #[error("no model loaded")]
    NoModel,

    #[error("{task} pipeline failed: {message}")]
    Pipeline { task: String, message: String },

    #[error("{name}() failed: {message}")]
    Call { name: String, message: String },
}

/// What went wrong at runtime
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FaultKind {
    #[error("name '{0}' is not defined")]
    Undefined(String),

    #[error("{0}")]
    Type(String),

    #[error("{0}")]
    Value(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid expression '{expr}': {message}")]
    Syntax { expr: String, message: String },

    #[error("malformed block structure: {0}")]
    Structure(String),

    #[error("expected {expected} input value(s), got {given}")]
    Arity { expected: usize, given: usize },

    #[error(transparent)]
    Host(#[from] HostFault),
}

/// Runtime fault, tagged with the statement that raised it
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}{kind}", describe_location(.location))]
pub struct RuntimeFault {
    pub kind: FaultKind,
    pub location: Option<Location>,
}

impl RuntimeFault {
    pub fn new(kind: FaultKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    pub fn at(mut self, location: Option<Location>) -> Self {
        if self.location.is_none() {
            self.location = location;
        }
        self
    }
}

impl From<FaultKind> for RuntimeFault {
    fn from(kind: FaultKind) -> Self {
        RuntimeFault::new(kind)
    }
}

impl From<HostFault> for RuntimeFault {
    fn from(fault: HostFault) -> Self {
        RuntimeFault::new(FaultKind::Host(fault))
    }
}

fn describe_location(location: &Option<Location>) -> String {
    match location {
        Some(loc) => format!("STEP {} (line {}): ", loc.step, loc.line),
        None => String::new(),
    }
}
