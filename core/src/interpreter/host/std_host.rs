//! Default host: a small standard library plus registrable pipelines

use std::collections::HashMap;

use super::super::env::HostObject;
use super::super::errors::HostFault;
use super::super::types::{ModelHandle, Value};
use super::{Host, Module};

/// A loaded model pipeline
pub trait Pipeline {
    fn predict(&mut self, input: &Value) -> Result<Value, HostFault>;

    fn train(&mut self, _data: &Value) -> Result<(), HostFault> {
        Err(HostFault::Pipeline {
            task: "pipeline".to_string(),
            message: "training is not supported".to_string(),
        })
    }
}

type PipelineFactory = Box<dyn Fn() -> Box<dyn Pipeline>>;

/* ===================== StdHost ===================== */

/// Host with the `math` and `statistics` modules preinstalled
pub struct StdHost {
    modules: HashMap<String, Module>,
    objects: HashMap<String, HostObject>,
    pipelines: HashMap<String, PipelineFactory>,
    loaded: Vec<Box<dyn Pipeline>>,
    api_key: Option<String>,
}

impl Default for StdHost {
    fn default() -> Self {
        Self::new()
    }
}

impl StdHost {
    pub fn new() -> Self {
        let mut host = Self {
            modules: HashMap::new(),
            objects: HashMap::new(),
            pipelines: HashMap::new(),
            loaded: Vec::new(),
            api_key: None,
        };
        host.modules.insert("math".to_string(), math_module());
        host.modules.insert("statistics".to_string(), statistics_module());
        host
    }

    pub fn with_module(mut self, module: Module) -> Self {
        self.modules.insert(module.name.clone(), module);
        self
    }

    /// Register a function that `CALL` and expressions can resolve by name
    pub fn with_function(
        mut self,
        name: &str,
        f: impl Fn(&[Value]) -> Result<Value, HostFault> + 'static,
    ) -> Self {
        self.objects.insert(name.to_string(), HostObject::function(f));
        self
    }

    /// Register a class constructor for `CREATE`
    pub fn with_class(
        mut self,
        name: &str,
        f: impl Fn(&[Value]) -> Result<Value, HostFault> + 'static,
    ) -> Self {
        self.objects.insert(name.to_string(), HostObject::class(f));
        self
    }

    /// Register a pipeline factory for a task name used by `LOAD_MODEL`
    pub fn with_pipeline<P, F>(mut self, task: &str, factory: F) -> Self
    where
        P: Pipeline + 'static,
        F: Fn() -> P + 'static,
    {
        self.pipelines.insert(
            task.to_string(),
            Box::new(move || Box::new(factory()) as Box<dyn Pipeline>),
        );
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    fn pipeline(&mut self, model: &ModelHandle) -> Result<&mut Box<dyn Pipeline>, HostFault> {
        self.loaded
            .get_mut(model.id)
            .ok_or_else(|| HostFault::UnknownModel(model.task.clone()))
    }
}

impl Host for StdHost {
    fn import(&mut self, module: &str) -> Result<Module, HostFault> {
        self.modules
            .get(module)
            .cloned()
            .ok_or_else(|| HostFault::ModuleNotFound(module.to_string()))
    }

    fn resolve(&mut self, name: &str) -> Option<HostObject> {
        self.objects.get(name).cloned()
    }

    fn load_model(&mut self, task: &str) -> Result<ModelHandle, HostFault> {
        let factory = self
            .pipelines
            .get(task)
            .ok_or_else(|| HostFault::UnknownModel(task.to_string()))?;
        self.loaded.push(factory());
        tracing::debug!(task, id = self.loaded.len() - 1, "model loaded");
        Ok(ModelHandle {
            id: self.loaded.len() - 1,
            task: task.to_string(),
        })
    }

    fn predict(&mut self, model: &ModelHandle, input: &Value) -> Result<Value, HostFault> {
        self.pipeline(model)?.predict(input)
    }

    fn train(&mut self, model: &ModelHandle, data: &Value) -> Result<(), HostFault> {
        self.pipeline(model)?.train(data)
    }

    fn set_api_key(&mut self, key: &str) {
        self.api_key = Some(key.to_string());
    }
}

/* ===================== Standard Modules ===================== */

fn call_fault(name: &str, message: impl Into<String>) -> HostFault {
    HostFault::Call {
        name: name.to_string(),
        message: message.into(),
    }
}

fn number(name: &str, args: &[Value], i: usize) -> Result<f64, HostFault> {
    let value = args
        .get(i)
        .ok_or_else(|| call_fault(name, format!("missing argument {}", i + 1)))?;
    value
        .as_f64()
        .ok_or_else(|| call_fault(name, format!("must be a real number, not {}", value.type_name())))
}

fn unary(name: &'static str, f: fn(f64) -> f64) -> impl Fn(&[Value]) -> Result<Value, HostFault> {
    move |args| {
        let result = f(number(name, args, 0)?);
        if result.is_nan() {
            return Err(call_fault(name, "math domain error"));
        }
        Ok(Value::Float(result))
    }
}

fn rounding(name: &'static str, f: fn(f64) -> f64) -> impl Fn(&[Value]) -> Result<Value, HostFault> {
    move |args| match args.first() {
        Some(Value::Int(n)) => Ok(Value::Int(*n)),
        _ => {
            let x = f(number(name, args, 0)?);
            if !x.is_finite() {
                return Err(call_fault(name, "cannot convert to integer"));
            }
            Ok(Value::Int(x as i64))
        }
    }
}

fn math_module() -> Module {
    Module::new("math")
        .with_function("sqrt", unary("sqrt", f64::sqrt))
        .with_function("exp", unary("exp", f64::exp))
        .with_function("sin", unary("sin", f64::sin))
        .with_function("cos", unary("cos", f64::cos))
        .with_function("fabs", unary("fabs", f64::abs))
        .with_function("floor", rounding("floor", f64::floor))
        .with_function("ceil", rounding("ceil", f64::ceil))
        .with_function("pow", |args| {
            Ok(Value::Float(number("pow", args, 0)?.powf(number("pow", args, 1)?)))
        })
        .with_function("log", |args| {
            let x = number("log", args, 0)?;
            if x <= 0.0 {
                return Err(call_fault("log", "math domain error"));
            }
            match args.get(1) {
                Some(_) => Ok(Value::Float(x.ln() / number("log", args, 1)?.ln())),
                None => Ok(Value::Float(x.ln())),
            }
        })
        .with_constant("pi", Value::Float(std::f64::consts::PI))
        .with_constant("e", Value::Float(std::f64::consts::E))
}

fn data_points(name: &str, args: &[Value]) -> Result<Vec<f64>, HostFault> {
    let data = args
        .first()
        .ok_or_else(|| call_fault(name, "missing data argument"))?
        .to_items()
        .map_err(|err| call_fault(name, err.to_string()))?;
    if data.is_empty() {
        return Err(call_fault(name, format!("{} requires at least one data point", name)));
    }
    data.iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| call_fault(name, format!("cannot use {} as a number", v.type_name())))
        })
        .collect()
}

fn statistics_module() -> Module {
    Module::new("statistics")
        .with_function("mean", |args| {
            let data = data_points("mean", args)?;
            Ok(Value::Float(data.iter().sum::<f64>() / data.len() as f64))
        })
        .with_function("median", |args| {
            let mut data = data_points("median", args)?;
            data.sort_by(f64::total_cmp);
            let mid = data.len() / 2;
            let median = if data.len() % 2 == 1 {
                data[mid]
            } else {
                (data[mid - 1] + data[mid]) / 2.0
            };
            Ok(Value::Float(median))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl Pipeline for Upper {
        fn predict(&mut self, input: &Value) -> Result<Value, HostFault> {
            Ok(Value::Str(input.to_string().to_uppercase()))
        }
    }

    #[test]
    fn test_import_known_and_unknown_modules() {
        let mut host = StdHost::new();
        let math = host.import("math").unwrap();
        assert!(math.functions.contains_key("sqrt"));
        assert_eq!(math.constants.get("pi"), Some(&Value::Float(std::f64::consts::PI)));

        assert_eq!(
            host.import("numpy").unwrap_err(),
            HostFault::ModuleNotFound("numpy".to_string())
        );
    }

    #[test]
    fn test_math_functions() {
        let math = math_module();
        let sqrt = &math.functions["sqrt"];
        assert_eq!(sqrt(&[Value::Int(16)]).unwrap(), Value::Float(4.0));
        assert!(sqrt(&[Value::Int(-1)]).is_err());

        let floor = &math.functions["floor"];
        assert_eq!(floor(&[Value::Float(2.7)]).unwrap(), Value::Int(2));
        assert_eq!(floor(&[Value::Float(-2.5)]).unwrap(), Value::Int(-3));
    }

    #[test]
    fn test_statistics() {
        let stats = statistics_module();
        let data = Value::List(vec![Value::Int(3), Value::Int(1), Value::Int(2), Value::Int(10)]);
        assert_eq!(stats.functions["mean"](&[data.clone()]).unwrap(), Value::Float(4.0));
        assert_eq!(stats.functions["median"](&[data]).unwrap(), Value::Float(2.5));
        assert!(stats.functions["mean"](&[Value::List(vec![])]).is_err());
    }

    #[test]
    fn test_pipelines() {
        let mut host = StdHost::new().with_pipeline("shout", || Upper);
        let model = host.load_model("shout").unwrap();
        assert_eq!(model.task, "shout");
        assert_eq!(
            host.predict(&model, &Value::from("hi")).unwrap(),
            Value::from("HI")
        );
        assert!(host.train(&model, &Value::None).is_err());
        assert_eq!(
            host.load_model("translate").unwrap_err(),
            HostFault::UnknownModel("translate".to_string())
        );
    }

    #[test]
    fn test_api_key_and_resolve() {
        let mut host = StdHost::new().with_function("twice", |args| {
            Ok(Value::Int(args[0].as_i64().unwrap_or(0) * 2))
        });
        host.set_api_key("secret");
        assert_eq!(host.api_key(), Some("secret"));
        let twice = host.resolve("twice").unwrap();
        assert_eq!(twice.call(&[Value::Int(4)]).unwrap(), Value::Int(8));
        assert!(host.resolve("missing").is_none());
    }
}
