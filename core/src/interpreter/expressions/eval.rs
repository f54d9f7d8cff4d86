//! Expression evaluation
//!
//! Semantics follow the notation's Python heritage: `/` always yields a float,
//! `//` and `%` round towards negative infinity, `and`/`or` short-circuit and
//! return one of their operands.

use super::super::env::Environment;
use super::super::errors::FaultKind;
use super::super::types::{Dict, Value};
use super::builtins::{call_builtin, Builtin};
use super::{BinaryOp, Expr, UnaryOp};

pub type EvalResult = Result<Value, FaultKind>;

/* ===================== Evaluation ===================== */

/// Evaluate an expression against the environment
///
/// The environment is mutable because list and dict methods called on a
/// variable (`xs.append(4)`) update it in place.
pub fn evaluate(expr: &Expr, env: &mut Environment) -> EvalResult {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::Name(name) => lookup_name(env, name),

        Expr::List(items) => items
            .iter()
            .map(|item| evaluate(item, env))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),

        Expr::Dict(entries) => {
            let mut dict = Dict::new();
            for (key, value) in entries {
                let key = evaluate(key, env)?;
                let value = evaluate(value, env)?;
                dict.insert(key, value);
            }
            Ok(Value::Dict(dict))
        }

        Expr::Unary { op, expr } => {
            let value = evaluate(expr, env)?;
            unary_op(*op, &value)
        }

        Expr::Binary {
            op: BinaryOp::And,
            left,
            right,
        } => {
            let left = evaluate(left, env)?;
            if left.is_truthy() {
                evaluate(right, env)
            } else {
                Ok(left)
            }
        }

        Expr::Binary {
            op: BinaryOp::Or,
            left,
            right,
        } => {
            let left = evaluate(left, env)?;
            if left.is_truthy() {
                Ok(left)
            } else {
                evaluate(right, env)
            }
        }

        Expr::Binary { op, left, right } => {
            let left = evaluate(left, env)?;
            let right = evaluate(right, env)?;
            binary_op(*op, &left, &right)
        }

        Expr::Call { callee, args } => {
            if let Expr::Field { value, field } = callee.as_ref() {
                return call_method(value, field, args, env);
            }
            let target = evaluate(callee, env)?;
            let args = evaluate_all(args, env)?;
            call_value(env, &target, &args)
        }

        Expr::Index { value, index } => {
            let container = evaluate(value, env)?;
            let index = evaluate(index, env)?;
            index_value(&container, &index)
        }

        Expr::Slice { value, lo, hi } => {
            let container = evaluate(value, env)?;
            let lo = slice_bound(lo.as_deref(), env)?;
            let hi = slice_bound(hi.as_deref(), env)?;
            slice_value(&container, lo, hi)
        }

        Expr::Field { value, field } => {
            let object = evaluate(value, env)?;
            field_value(env, &object, field)
        }
    }
}

pub fn evaluate_all(exprs: &[Expr], env: &mut Environment) -> Result<Vec<Value>, FaultKind> {
    exprs.iter().map(|expr| evaluate(expr, env)).collect()
}

fn lookup_name(env: &Environment, name: &str) -> EvalResult {
    if let Some(value) = env.get(name) {
        return Ok(value.clone());
    }
    if env.object(name).is_some() || Builtin::from_name(name).is_some() {
        return Ok(Value::Callable(name.to_string()));
    }
    Err(FaultKind::Undefined(name.to_string()))
}

/* ===================== Calls ===================== */

/// Call a value that should be callable
pub fn call_value(env: &Environment, target: &Value, args: &[Value]) -> EvalResult {
    match target {
        Value::Callable(name) => call_named(env, name, args),
        other => Err(FaultKind::Type(format!(
            "'{}' object is not callable",
            other.type_name()
        ))),
    }
}

/// Call a function by name: registered host objects first, then module
/// members (`module.function`), then builtins
pub fn call_named(env: &Environment, name: &str, args: &[Value]) -> EvalResult {
    if let Some(object) = env.object(name) {
        return Ok(object.call(args)?);
    }
    if let Some((module, member)) = name.rsplit_once('.') {
        if let Some(f) = env.module(module).and_then(|m| m.functions.get(member)) {
            return Ok(f(args)?);
        }
    }
    match Builtin::from_name(name) {
        Some(builtin) => call_builtin(builtin, args),
        None => Err(FaultKind::Undefined(name.to_string())),
    }
}

fn call_method(receiver: &Expr, method: &str, args: &[Expr], env: &mut Environment) -> EvalResult {
    let object = evaluate(receiver, env)?;
    let args = evaluate_all(args, env)?;

    match &object {
        Value::Module(_) | Value::Instance(_) => {
            let target = field_value(env, &object, method)?;
            return call_value(env, &target, &args);
        }
        Value::List(_) | Value::Dict(_) if is_mutating(method) => {
            // Mutate the variable itself when the receiver names one
            if let Expr::Name(name) = receiver {
                return mutate(env.lookup_mut(name)?, method, &args);
            }
            let mut temporary = object.clone();
            return mutate(&mut temporary, method, &args);
        }
        _ => {}
    }

    pure_method(&object, method, &args)
}

fn is_mutating(method: &str) -> bool {
    matches!(
        method,
        "append" | "extend" | "insert" | "pop" | "remove" | "clear" | "update"
    )
}

fn no_attribute(object: &Value, name: &str) -> FaultKind {
    FaultKind::Type(format!(
        "'{}' object has no attribute '{}'",
        object.type_name(),
        name
    ))
}

fn arg<'a>(args: &'a [Value], i: usize, method: &str) -> Result<&'a Value, FaultKind> {
    args.get(i).ok_or_else(|| {
        FaultKind::Type(format!("{}() missing required argument {}", method, i + 1))
    })
}

fn mutate(target: &mut Value, method: &str, args: &[Value]) -> EvalResult {
    match target {
        Value::List(items) => match method {
            "append" => {
                items.push(arg(args, 0, method)?.clone());
                Ok(Value::None)
            }
            "extend" => {
                items.extend(arg(args, 0, method)?.to_items()?);
                Ok(Value::None)
            }
            "insert" => {
                let at = arg(args, 0, method)?
                    .as_i64()
                    .ok_or_else(|| FaultKind::Type("insert() index must be an integer".to_string()))?;
                let len = items.len() as i64;
                let at = if at < 0 { (at + len).max(0) } else { at.min(len) };
                items.insert(at as usize, arg(args, 1, method)?.clone());
                Ok(Value::None)
            }
            "pop" => {
                let at = match args.first() {
                    Some(i) => i.as_i64().ok_or_else(|| {
                        FaultKind::Type("pop() index must be an integer".to_string())
                    })?,
                    None => -1,
                };
                let idx = normalize_index(items.len(), at)
                    .ok_or_else(|| FaultKind::Value("pop index out of range".to_string()))?;
                Ok(items.remove(idx))
            }
            "remove" => {
                let needle = arg(args, 0, method)?;
                let idx = items
                    .iter()
                    .position(|item| item.loose_eq(needle))
                    .ok_or_else(|| FaultKind::Value("list.remove(x): x not in list".to_string()))?;
                items.remove(idx);
                Ok(Value::None)
            }
            "clear" => {
                items.clear();
                Ok(Value::None)
            }
            _ => Err(FaultKind::Type(format!("'list' object has no attribute '{}'", method))),
        },
        Value::Dict(dict) => match method {
            "pop" => {
                let key = arg(args, 0, method)?;
                match (dict.remove(key), args.get(1)) {
                    (Some(value), _) => Ok(value),
                    (None, Some(default)) => Ok(default.clone()),
                    (None, None) => Err(key_error(key)),
                }
            }
            "update" => {
                let Value::Dict(other) = arg(args, 0, method)? else {
                    return Err(FaultKind::Type("update() argument must be a dict".to_string()));
                };
                for (k, v) in other.iter() {
                    dict.insert(k.clone(), v.clone());
                }
                Ok(Value::None)
            }
            "clear" => {
                *dict = Dict::new();
                Ok(Value::None)
            }
            _ => Err(FaultKind::Type(format!("'dict' object has no attribute '{}'", method))),
        },
        other => Err(no_attribute(other, method)),
    }
}

fn pure_method(object: &Value, method: &str, args: &[Value]) -> EvalResult {
    match (object, method) {
        (Value::Str(s), "upper") => Ok(Value::Str(s.to_uppercase())),
        (Value::Str(s), "lower") => Ok(Value::Str(s.to_lowercase())),
        (Value::Str(s), "strip") => Ok(Value::Str(s.trim().to_string())),
        (Value::Str(s), "split") => {
            let parts: Vec<Value> = match args.first() {
                Some(Value::Str(sep)) if !sep.is_empty() => s.split(sep.as_str()).map(Value::from).collect(),
                Some(Value::Str(_)) => return Err(FaultKind::Value("empty separator".to_string())),
                _ => s.split_whitespace().map(Value::from).collect(),
            };
            Ok(Value::List(parts))
        }
        (Value::Str(s), "replace") => match (arg(args, 0, method)?, arg(args, 1, method)?) {
            (Value::Str(from), Value::Str(to)) => Ok(Value::Str(s.replace(from.as_str(), to))),
            _ => Err(FaultKind::Type("replace() arguments must be str".to_string())),
        },
        (Value::Str(s), "startswith" | "endswith") => {
            let Value::Str(affix) = arg(args, 0, method)? else {
                return Err(FaultKind::Type(format!("{}() argument must be str", method)));
            };
            let hit = if method == "startswith" {
                s.starts_with(affix.as_str())
            } else {
                s.ends_with(affix.as_str())
            };
            Ok(Value::Bool(hit))
        }
        (Value::Str(sep), "join") => {
            let parts = arg(args, 0, method)?
                .to_items()?
                .into_iter()
                .map(|item| match item {
                    Value::Str(s) => Ok(s),
                    other => Err(FaultKind::Type(format!(
                        "sequence item: expected str instance, {} found",
                        other.type_name()
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Str(parts.join(sep)))
        }
        (Value::List(items), "count") => {
            let needle = arg(args, 0, method)?;
            Ok(Value::Int(items.iter().filter(|item| item.loose_eq(needle)).count() as i64))
        }
        (Value::List(items), "index") => {
            let needle = arg(args, 0, method)?;
            items
                .iter()
                .position(|item| item.loose_eq(needle))
                .map(|i| Value::Int(i as i64))
                .ok_or_else(|| FaultKind::Value(format!("{} is not in list", needle.repr())))
        }
        (Value::List(_) | Value::Dict(_), "copy") => Ok(object.clone()),
        (Value::Dict(dict), "keys") => Ok(Value::List(dict.keys().cloned().collect())),
        (Value::Dict(dict), "values") => Ok(Value::List(dict.values().cloned().collect())),
        (Value::Dict(dict), "items") => Ok(Value::List(
            dict.iter()
                .map(|(k, v)| Value::List(vec![k.clone(), v.clone()]))
                .collect(),
        )),
        (Value::Dict(dict), "get") => {
            let key = arg(args, 0, method)?;
            Ok(dict
                .get(key)
                .cloned()
                .unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::None)))
        }
        _ => Err(no_attribute(object, method)),
    }
}

/* ===================== Attributes & Indexing ===================== */

fn field_value(env: &Environment, object: &Value, field: &str) -> EvalResult {
    match object {
        Value::Module(name) => module_attribute(env, name, field),
        Value::Instance(instance) => instance.fields.get(field).cloned().ok_or_else(|| {
            FaultKind::Type(format!(
                "'{}' object has no attribute '{}'",
                instance.class, field
            ))
        }),
        other => Err(no_attribute(other, field)),
    }
}

fn module_attribute(env: &Environment, module: &str, field: &str) -> EvalResult {
    if let Some(m) = env.module(module) {
        if m.functions.contains_key(field) {
            return Ok(Value::Callable(format!("{}.{}", module, field)));
        }
        if let Some(value) = m.constants.get(field) {
            return Ok(value.clone());
        }
    }
    let submodule = format!("{}.{}", module, field);
    if env.has_module(&submodule) {
        return Ok(Value::Module(submodule));
    }
    Err(FaultKind::Type(format!(
        "module '{}' has no attribute '{}'",
        module, field
    )))
}

/// Resolve a possibly negative index against a length
pub fn normalize_index(len: usize, index: i64) -> Option<usize> {
    let len = len as i64;
    let idx = if index < 0 { index + len } else { index };
    (0..len).contains(&idx).then_some(idx as usize)
}

fn key_error(key: &Value) -> FaultKind {
    FaultKind::Value(format!("key {} not found", key.repr()))
}

pub fn index_value(container: &Value, index: &Value) -> EvalResult {
    match container {
        Value::Dict(dict) => dict.get(index).cloned().ok_or_else(|| key_error(index)),
        Value::List(items) => {
            let i = integer_index(container, index)?;
            normalize_index(items.len(), i)
                .map(|idx| items[idx].clone())
                .ok_or_else(|| FaultKind::Value("list index out of range".to_string()))
        }
        Value::Str(s) => {
            let i = integer_index(container, index)?;
            let chars: Vec<char> = s.chars().collect();
            normalize_index(chars.len(), i)
                .map(|idx| Value::Str(chars[idx].to_string()))
                .ok_or_else(|| FaultKind::Value("string index out of range".to_string()))
        }
        other => Err(FaultKind::Type(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn integer_index(container: &Value, index: &Value) -> Result<i64, FaultKind> {
    index.as_i64().ok_or_else(|| {
        FaultKind::Type(format!(
            "{} indices must be integers, not {}",
            container.type_name(),
            index.type_name()
        ))
    })
}

fn slice_bound(bound: Option<&Expr>, env: &mut Environment) -> Result<Option<i64>, FaultKind> {
    let Some(expr) = bound else {
        return Ok(None);
    };
    match evaluate(expr, env)? {
        Value::None => Ok(None),
        value => value.as_i64().map(Some).ok_or_else(|| {
            FaultKind::Type("slice indices must be integers or None".to_string())
        }),
    }
}

fn slice_range(len: usize, lo: Option<i64>, hi: Option<i64>) -> (usize, usize) {
    let len = len as i64;
    let clamp = |i: i64| {
        if i < 0 {
            (i + len).max(0)
        } else {
            i.min(len)
        }
    };
    let lo = lo.map_or(0, clamp);
    let hi = hi.map_or(len, clamp);
    (lo as usize, hi.max(lo) as usize)
}

fn slice_value(container: &Value, lo: Option<i64>, hi: Option<i64>) -> EvalResult {
    match container {
        Value::List(items) => {
            let (lo, hi) = slice_range(items.len(), lo, hi);
            Ok(Value::List(items[lo..hi].to_vec()))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (lo, hi) = slice_range(chars.len(), lo, hi);
            Ok(Value::Str(chars[lo..hi].iter().collect()))
        }
        other => Err(FaultKind::Type(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/* ===================== Assignment ===================== */

enum Accessor {
    Index(Value),
    Field(String),
}

/// Store a value into an assignment target: `name`, `name[i]...` or `obj.field`
pub fn assign(target: &Expr, value: Value, env: &mut Environment) -> Result<(), FaultKind> {
    let mut path = Vec::new();
    let mut current = target;
    let root = loop {
        match current {
            Expr::Name(name) => break name,
            Expr::Index { value, index } => {
                path.push(Accessor::Index(evaluate(index, env)?));
                current = value;
            }
            Expr::Field { value, field } => {
                path.push(Accessor::Field(field.clone()));
                current = value;
            }
            _ => return Err(FaultKind::Type("cannot assign to expression".to_string())),
        }
    };
    path.reverse();

    let Some((last, parents)) = path.split_last() else {
        env.set(root.clone(), value);
        return Ok(());
    };

    let mut slot = env.lookup_mut(root)?;
    for accessor in parents {
        slot = child_mut(slot, accessor)?;
    }
    store(slot, last, value)
}

fn child_mut<'v>(slot: &'v mut Value, accessor: &Accessor) -> Result<&'v mut Value, FaultKind> {
    match (slot, accessor) {
        (Value::List(items), Accessor::Index(index)) => {
            let i = index
                .as_i64()
                .ok_or_else(|| FaultKind::Type("list indices must be integers".to_string()))?;
            let idx = normalize_index(items.len(), i)
                .ok_or_else(|| FaultKind::Value("list index out of range".to_string()))?;
            Ok(&mut items[idx])
        }
        (Value::Dict(dict), Accessor::Index(key)) => {
            let missing = key_error(key);
            dict.get_mut(key).ok_or(missing)
        }
        (Value::Instance(instance), Accessor::Field(field)) => {
            let missing = FaultKind::Type(format!(
                "'{}' object has no attribute '{}'",
                instance.class, field
            ));
            instance.fields.get_mut(field).ok_or(missing)
        }
        (other, Accessor::Field(field)) => Err(no_attribute(other, field)),
        (other, Accessor::Index(_)) => Err(FaultKind::Type(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn store(slot: &mut Value, accessor: &Accessor, value: Value) -> Result<(), FaultKind> {
    match (slot, accessor) {
        (Value::List(items), Accessor::Index(index)) => {
            let i = index
                .as_i64()
                .ok_or_else(|| FaultKind::Type("list indices must be integers".to_string()))?;
            let idx = normalize_index(items.len(), i).ok_or_else(|| {
                FaultKind::Value("list assignment index out of range".to_string())
            })?;
            items[idx] = value;
            Ok(())
        }
        (Value::Dict(dict), Accessor::Index(key)) => {
            dict.insert(key.clone(), value);
            Ok(())
        }
        (Value::Instance(instance), Accessor::Field(field)) => {
            instance.fields.insert(field.clone(), value);
            Ok(())
        }
        (other, Accessor::Field(field)) => Err(no_attribute(other, field)),
        (other, Accessor::Index(_)) => Err(FaultKind::Type(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

/* ===================== Operators ===================== */

fn unary_op(op: UnaryOp, value: &Value) -> EvalResult {
    match (op, value) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!v.is_truthy())),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Pos, Value::Float(x)) => Ok(Value::Float(*x)),
        (UnaryOp::Neg, v) if v.as_i64().is_some() => v
            .as_i64()
            .and_then(i64::checked_neg)
            .map(Value::Int)
            .ok_or_else(overflow),
        (UnaryOp::Pos, v) if v.as_i64().is_some() => Ok(Value::Int(v.as_i64().unwrap_or_default())),
        (op, v) => Err(FaultKind::Type(format!(
            "bad operand type for unary {}: '{}'",
            if op == UnaryOp::Neg { "-" } else { "+" },
            v.type_name()
        ))),
    }
}

fn overflow() -> FaultKind {
    FaultKind::Value("integer overflow".to_string())
}

fn unsupported(op: BinaryOp, left: &Value, right: &Value) -> FaultKind {
    FaultKind::Type(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

pub fn binary_op(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    match op {
        BinaryOp::And | BinaryOp::Or => {
            // Short-circuiting happens in `evaluate`; this is the eager form
            let pick_left = left.is_truthy() == (op == BinaryOp::Or);
            Ok(if pick_left { left.clone() } else { right.clone() })
        }
        BinaryOp::Eq => Ok(Value::Bool(left.loose_eq(right))),
        BinaryOp::Ne => Ok(Value::Bool(!left.loose_eq(right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ord = left.compare(right).ok_or_else(|| {
                FaultKind::Type(format!(
                    "'{}' not supported between instances of '{}' and '{}'",
                    op.symbol(),
                    left.type_name(),
                    right.type_name()
                ))
            })?;
            let result = match op {
                BinaryOp::Lt => ord.is_lt(),
                BinaryOp::Le => ord.is_le(),
                BinaryOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::In => contains(right, left).map(Value::Bool),
        BinaryOp::NotIn => contains(right, left).map(|hit| Value::Bool(!hit)),
        BinaryOp::Add => match (left, right) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
            (Value::List(a), Value::List(b)) => {
                Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
            }
            _ => arithmetic(op, left, right),
        },
        BinaryOp::Mul => match (left, right) {
            (Value::Str(s), n) | (n, Value::Str(s)) if n.as_i64().is_some() => {
                let times = repeat_count(s.len(), n)?;
                Ok(Value::Str(s.repeat(times)))
            }
            (Value::List(items), n) | (n, Value::List(items)) if n.as_i64().is_some() => {
                let times = repeat_count(items.len(), n)?;
                Ok(Value::List(
                    std::iter::repeat(items.iter().cloned())
                        .take(times)
                        .flatten()
                        .collect(),
                ))
            }
            _ => arithmetic(op, left, right),
        },
        _ => arithmetic(op, left, right),
    }
}

/// Upper bound on the length of a sequence built by `*`
const MAX_REPEAT_LEN: usize = 1 << 28;

/// Repetition count for `seq * n`, refusing results that would not fit in memory
fn repeat_count(len: usize, n: &Value) -> Result<usize, FaultKind> {
    let times = usize::try_from(n.as_i64().unwrap_or_default().max(0)).unwrap_or(usize::MAX);
    if len == 0 {
        return Ok(0);
    }
    match len.checked_mul(times) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(times),
        _ => Err(FaultKind::Value("repeated sequence is too long".to_string())),
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, FaultKind> {
    match container {
        Value::List(items) => Ok(items.iter().any(|x| x.loose_eq(item))),
        Value::Dict(dict) => Ok(dict.contains_key(item)),
        Value::Str(s) => match item {
            Value::Str(needle) => Ok(s.contains(needle.as_str())),
            other => Err(FaultKind::Type(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        other => Err(FaultKind::Type(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        return int_arithmetic(op, a, b);
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => float_arithmetic(op, a, b),
        _ => Err(unsupported(op, left, right)),
    }
}

fn int_arithmetic(op: BinaryOp, a: i64, b: i64) -> EvalResult {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(FaultKind::DivisionByZero);
            }
            return Ok(Value::Float(a as f64 / b as f64));
        }
        BinaryOp::FloorDiv => {
            if b == 0 {
                return Err(FaultKind::DivisionByZero);
            }
            a.checked_div(b).map(|q| {
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    q - 1
                } else {
                    q
                }
            })
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(FaultKind::DivisionByZero);
            }
            a.checked_rem(b).map(|r| {
                if r != 0 && ((r < 0) != (b < 0)) {
                    r + b
                } else {
                    r
                }
            })
        }
        BinaryOp::Pow => {
            if b < 0 {
                if a == 0 {
                    return Err(FaultKind::DivisionByZero);
                }
                return Ok(Value::Float((a as f64).powf(b as f64)));
            }
            u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp))
        }
        _ => return Err(unsupported(op, &Value::Int(a), &Value::Int(b))),
    };
    result.map(Value::Int).ok_or_else(overflow)
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> EvalResult {
    let zero_divisor = b == 0.0 && matches!(op, BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod);
    if zero_divisor {
        return Err(FaultKind::DivisionByZero);
    }
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Mod => {
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        BinaryOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(FaultKind::DivisionByZero);
            }
            a.powf(b)
        }
        _ => return Err(unsupported(op, &Value::Float(a), &Value::Float(b))),
    };
    Ok(Value::Float(result))
}
