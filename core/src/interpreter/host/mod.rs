//! Host dispatch bridge
//!
//! The VM never loads modules or runs model pipelines itself. Those requests go
//! through the [`Host`] trait, and printed output goes to an [`OutputSink`].

use std::collections::HashMap;
use std::fmt;

use super::env::{HostObject, NativeFn};
use super::errors::HostFault;
use super::types::{ModelHandle, Value};

pub mod std_host;

pub use std_host::{Pipeline, StdHost};

/* ===================== Host ===================== */

/// Capabilities the VM needs from its surroundings
pub trait Host {
    /// Load a module by dotted name
    fn import(&mut self, module: &str) -> Result<Module, HostFault>;

    /// Look up a function or class the program calls but never defined
    fn resolve(&mut self, _name: &str) -> Option<HostObject> {
        None
    }

    /// Build a model pipeline for a task name
    fn load_model(&mut self, task: &str) -> Result<ModelHandle, HostFault>;

    fn predict(&mut self, model: &ModelHandle, input: &Value) -> Result<Value, HostFault>;

    fn train(&mut self, model: &ModelHandle, data: &Value) -> Result<(), HostFault>;

    /// Called for `KEY:` statements
    fn set_api_key(&mut self, _key: &str) {}
}

/* ===================== Modules ===================== */

/// Imported module: named functions plus constants
#[derive(Clone, Default)]
pub struct Module {
    pub name: String,
    pub functions: HashMap<String, NativeFn>,
    pub constants: HashMap<String, Value>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_function(
        mut self,
        name: &str,
        f: impl Fn(&[Value]) -> Result<Value, HostFault> + 'static,
    ) -> Self {
        self.functions.insert(name.to_string(), std::rc::Rc::new(f));
        self
    }

    pub fn with_constant(mut self, name: &str, value: Value) -> Self {
        self.constants.insert(name.to_string(), value);
        self
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut functions: Vec<&String> = self.functions.keys().collect();
        functions.sort();
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("functions", &functions)
            .field("constants", &self.constants)
            .finish()
    }
}

/* ===================== Output ===================== */

/// Receives one line per PRINT
pub trait OutputSink {
    fn emit(&mut self, line: &str);
}

/// Collects printed lines in memory
impl OutputSink for Vec<String> {
    fn emit(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Writes printed lines to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn emit(&mut self, line: &str) {
        println!("{}", line);
    }
}
