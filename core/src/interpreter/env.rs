//! Execution environment
//!
//! One flat variable namespace per run, plus the table of host objects
//! (functions and classes) and imported modules that expressions may call into.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::errors::{FaultKind, HostFault};
use super::host::Module;
use super::types::Value;

/// Native callable supplied by the host
pub type NativeFn = Rc<dyn Fn(&[Value]) -> Result<Value, HostFault>>;

/// Callable or instantiable object registered by the host
#[derive(Clone)]
pub enum HostObject {
    Function(NativeFn),
    Class(NativeFn),
}

impl HostObject {
    pub fn function(f: impl Fn(&[Value]) -> Result<Value, HostFault> + 'static) -> Self {
        HostObject::Function(Rc::new(f))
    }

    pub fn class(f: impl Fn(&[Value]) -> Result<Value, HostFault> + 'static) -> Self {
        HostObject::Class(Rc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, HostFault> {
        match self {
            HostObject::Function(f) | HostObject::Class(f) => f(args),
        }
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostObject::Function(_) => write!(f, "HostObject::Function"),
            HostObject::Class(_) => write!(f, "HostObject::Class"),
        }
    }
}

/* ===================== Environment ===================== */

#[derive(Debug, Default)]
pub struct Environment {
    vars: HashMap<String, Value>,
    objects: HashMap<String, HostObject>,
    modules: HashMap<String, Module>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /* ---------- variables ---------- */

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.vars.get_mut(name)
    }

    /// Variable value, or an undefined-name fault
    pub fn lookup(&self, name: &str) -> Result<&Value, FaultKind> {
        self.vars
            .get(name)
            .ok_or_else(|| FaultKind::Undefined(name.to_string()))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Result<&mut Value, FaultKind> {
        self.vars
            .get_mut(name)
            .ok_or_else(|| FaultKind::Undefined(name.to_string()))
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.vars.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn vars(&self) -> &HashMap<String, Value> {
        &self.vars
    }

    /// Current values of `names`, for restoring after a temporary binding
    pub fn save(&self, names: &[&str]) -> Vec<(String, Option<Value>)> {
        names
            .iter()
            .map(|name| (name.to_string(), self.vars.get(*name).cloned()))
            .collect()
    }

    pub fn restore(&mut self, saved: Vec<(String, Option<Value>)>) {
        for (name, value) in saved {
            match value {
                Some(value) => self.vars.insert(name, value),
                None => self.vars.remove(&name),
            };
        }
    }

    /* ---------- host objects ---------- */

    pub fn register(&mut self, name: impl Into<String>, object: HostObject) {
        self.objects.insert(name.into(), object);
    }

    pub fn object(&self, name: &str) -> Option<&HostObject> {
        self.objects.get(name)
    }

    /* ---------- modules ---------- */

    pub fn add_module(&mut self, module: Module) {
        self.modules.insert(module.name.clone(), module);
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }
}
