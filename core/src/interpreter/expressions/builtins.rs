//! Built-in functions available to every expression

use std::cmp::Ordering;

use super::super::errors::FaultKind;
use super::super::types::Value;

pub type BuiltinResult = Result<Value, FaultKind>;

/* ===================== Builtin Function Types ===================== */

/// Built-in function identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Len,
    Str,
    Int,
    Float,
    Bool,
    Abs,
    Min,
    Max,
    Sum,
    Round,
    Range,
    Sorted,
    List,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        let builtin = match name {
            "len" => Builtin::Len,
            "str" => Builtin::Str,
            "int" => Builtin::Int,
            "float" => Builtin::Float,
            "bool" => Builtin::Bool,
            "abs" => Builtin::Abs,
            "min" => Builtin::Min,
            "max" => Builtin::Max,
            "sum" => Builtin::Sum,
            "round" => Builtin::Round,
            "range" => Builtin::Range,
            "sorted" => Builtin::Sorted,
            "list" => Builtin::List,
            _ => return None,
        };
        Some(builtin)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::Str => "str",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Bool => "bool",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Sum => "sum",
            Builtin::Round => "round",
            Builtin::Range => "range",
            Builtin::Sorted => "sorted",
            Builtin::List => "list",
        }
    }
}

/* ===================== Builtin Dispatcher ===================== */

/// Call a built-in function with evaluated arguments
pub fn call_builtin(builtin: Builtin, args: &[Value]) -> BuiltinResult {
    match builtin {
        Builtin::Len => len(args),
        Builtin::Str => Ok(Value::Str(
            args.first().map(|v| v.to_string()).unwrap_or_default(),
        )),
        Builtin::Int => int(args),
        Builtin::Float => float(args),
        Builtin::Bool => Ok(Value::Bool(args.first().is_some_and(Value::is_truthy))),
        Builtin::Abs => abs(args),
        Builtin::Min => extreme(builtin, args, Ordering::Less),
        Builtin::Max => extreme(builtin, args, Ordering::Greater),
        Builtin::Sum => sum(args),
        Builtin::Round => round(args),
        Builtin::Range => range(args),
        Builtin::Sorted => Ok(Value::List(sort_values(one_arg(builtin, args)?.to_items()?)?)),
        Builtin::List => Ok(Value::List(match args.first() {
            Some(v) => v.to_items()?,
            None => Vec::new(),
        })),
    }
}

fn one_arg(builtin: Builtin, args: &[Value]) -> Result<&Value, FaultKind> {
    match args {
        [value] => Ok(value),
        _ => Err(FaultKind::Type(format!(
            "{}() takes exactly one argument ({} given)",
            builtin.name(),
            args.len()
        ))),
    }
}

fn len(args: &[Value]) -> BuiltinResult {
    let n = match one_arg(Builtin::Len, args)? {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Dict(dict) => dict.len(),
        other => {
            return Err(FaultKind::Type(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Value::Int(n as i64))
}

fn int(args: &[Value]) -> BuiltinResult {
    let Some(value) = args.first() else {
        return Ok(Value::Int(0));
    };
    match value {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Float(x) if x.is_finite() => Ok(Value::Int(x.trunc() as i64)),
        Value::Float(x) => Err(FaultKind::Value(format!(
            "cannot convert float {} to integer",
            Value::Float(*x)
        ))),
        Value::Str(s) => s.trim().parse().map(Value::Int).map_err(|_| {
            FaultKind::Value(format!("invalid literal for int() with base 10: {}", value.repr()))
        }),
        other => Err(FaultKind::Type(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn float(args: &[Value]) -> BuiltinResult {
    let Some(value) = args.first() else {
        return Ok(Value::Float(0.0));
    };
    match value {
        Value::Str(s) => s.trim().parse().map(Value::Float).map_err(|_| {
            FaultKind::Value(format!("could not convert string to float: {}", value.repr()))
        }),
        other => other.as_f64().map(Value::Float).ok_or_else(|| {
            FaultKind::Type(format!(
                "float() argument must be a string or a number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn abs(args: &[Value]) -> BuiltinResult {
    match one_arg(Builtin::Abs, args)? {
        Value::Int(n) => n
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| FaultKind::Value("integer overflow".to_string())),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Float(x) => Ok(Value::Float(x.abs())),
        other => Err(FaultKind::Type(format!(
            "bad operand type for abs(): '{}'",
            other.type_name()
        ))),
    }
}

/// `min` / `max`: one iterable argument, or several values
fn extreme(builtin: Builtin, args: &[Value], wanted: Ordering) -> BuiltinResult {
    let items = match args {
        [single] => single.to_items()?,
        _ => args.to_vec(),
    };
    let mut best: Option<Value> = None;
    for item in items {
        best = Some(match best {
            None => item,
            Some(current) => match item.compare(&current) {
                Some(ord) if ord == wanted => item,
                Some(_) => current,
                None => return Err(not_comparable(&item, &current)),
            },
        });
    }
    best.ok_or_else(|| FaultKind::Value(format!("{}() arg is an empty sequence", builtin.name())))
}

fn sum(args: &[Value]) -> BuiltinResult {
    let (iterable, start) = match args {
        [iterable] => (iterable, Value::Int(0)),
        [iterable, start] => (iterable, start.clone()),
        _ => {
            return Err(FaultKind::Type(format!(
                "sum() takes 1 or 2 arguments ({} given)",
                args.len()
            )))
        }
    };
    iterable
        .to_items()?
        .iter()
        .try_fold(start, |acc, item| add_numbers(&acc, item))
}

fn add_numbers(a: &Value, b: &Value) -> BuiltinResult {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x
            .checked_add(y)
            .map(Value::Int)
            .ok_or_else(|| FaultKind::Value("integer overflow".to_string())),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Ok(Value::Float(x + y)),
            _ => Err(FaultKind::Type(format!(
                "unsupported operand type(s) for +: '{}' and '{}'",
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

/// Python rounding: halves go to the even neighbour
fn round(args: &[Value]) -> BuiltinResult {
    let (value, digits) = match args {
        [value] => (value, None),
        [value, digits] => (value, digits.as_i64()),
        _ => {
            return Err(FaultKind::Type(format!(
                "round() takes 1 or 2 arguments ({} given)",
                args.len()
            )))
        }
    };
    let x = match value {
        Value::Int(n) => return Ok(Value::Int(*n)),
        other => other.as_f64().ok_or_else(|| {
            FaultKind::Type(format!(
                "type {} doesn't define __round__ method",
                other.type_name()
            ))
        })?,
    };
    match digits {
        None => float_to_int(x.round_ties_even()).map(Value::Int),
        Some(_) if !x.is_finite() => Ok(Value::Float(x)),
        Some(d) => {
            let d = d.clamp(-MAX_ROUND_DIGITS, MAX_ROUND_DIGITS) as i32;
            let scale = 10f64.powi(d);
            let scaled = x * scale;
            if !scaled.is_finite() || scale == 0.0 {
                // More digits than an f64 carries
                return Ok(Value::Float(x));
            }
            Ok(Value::Float(scaled.round_ties_even() / scale))
        }
    }
}

const MAX_ROUND_DIGITS: i64 = 308;

fn float_to_int(x: f64) -> Result<i64, FaultKind> {
    // Exclusive upper bound: i64::MAX is not representable, 2^63 is
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if x.is_nan() {
        return Err(FaultKind::Value("cannot convert float NaN to integer".to_string()));
    }
    if x.is_infinite() {
        return Err(FaultKind::Value("cannot convert float infinity to integer".to_string()));
    }
    if x >= LIMIT || x < -LIMIT {
        return Err(FaultKind::Value("integer overflow".to_string()));
    }
    Ok(x as i64)
}

fn range(args: &[Value]) -> BuiltinResult {
    let ints = args
        .iter()
        .map(|v| {
            v.as_i64().ok_or_else(|| {
                FaultKind::Type(format!(
                    "'{}' object cannot be interpreted as an integer",
                    v.type_name()
                ))
            })
        })
        .collect::<Result<Vec<i64>, _>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => {
            return Err(FaultKind::Type(format!(
                "range expected 1 to 3 arguments, got {}",
                ints.len()
            )))
        }
    };
    if step == 0 {
        return Err(FaultKind::Value("range() arg 3 must not be zero".to_string()));
    }

    let mut items = Vec::new();
    let mut n = start;
    while (step > 0 && n < stop) || (step < 0 && n > stop) {
        items.push(Value::Int(n));
        match n.checked_add(step) {
            Some(next) => n = next,
            None => break,
        }
    }
    Ok(Value::List(items))
}

fn not_comparable(a: &Value, b: &Value) -> FaultKind {
    FaultKind::Type(format!(
        "'<' not supported between instances of '{}' and '{}'",
        a.type_name(),
        b.type_name()
    ))
}

/// Ascending stable sort; fails when two elements cannot be ordered
///
/// The comparator is a total order over every value (NaN included), so the
/// sort itself never sees an inconsistent answer. Pairs that `<` would reject
/// are recorded and reported once the sort is done.
pub fn sort_values(mut items: Vec<Value>) -> Result<Vec<Value>, FaultKind> {
    let mut failure = None;
    items.sort_by(|a, b| {
        let mut orderable = true;
        let ord = total_cmp(a, b, &mut orderable);
        if !orderable {
            failure.get_or_insert_with(|| not_comparable(a, b));
        }
        ord
    });
    match failure {
        Some(fault) => Err(fault),
        None => Ok(items),
    }
}

/// Sort rank: numbers, then strings, then lists, then everything else
fn sort_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) | Value::Int(_) | Value::Float(_) => 0,
        Value::Str(_) => 1,
        Value::List(_) => 2,
        _ => 3,
    }
}

fn total_cmp(a: &Value, b: &Value, orderable: &mut bool) -> Ordering {
    let (rank_a, rank_b) = (sort_rank(a), sort_rank(b));
    if rank_a != rank_b {
        *orderable = false;
        return rank_a.cmp(&rank_b);
    }
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        (Value::List(xs), Value::List(ys)) => {
            for (x, y) in xs.iter().zip(ys) {
                match total_cmp(x, y, orderable) {
                    Ordering::Equal => continue,
                    unequal => return unequal,
                }
            }
            xs.len().cmp(&ys.len())
        }
        _ if rank_a == 0 => number_cmp(a, b),
        _ => {
            *orderable = false;
            a.type_name().cmp(b.type_name())
        }
    }
}

/// Exact numeric order; `-0.0 == 0.0`, NaNs sort after (or, when negative, before) every number
fn number_cmp(a: &Value, b: &Value) -> Ordering {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(x), None) => int_float_cmp(x, b.as_f64().unwrap_or(f64::NAN)),
        (None, Some(y)) => int_float_cmp(y, a.as_f64().unwrap_or(f64::NAN)).reverse(),
        (None, None) => {
            let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            if x == y {
                Ordering::Equal
            } else {
                x.total_cmp(&y)
            }
        }
    }
}

fn int_float_cmp(n: i64, x: f64) -> Ordering {
    // i64::MIN is exactly -2^63; i64::MAX rounds up to 2^63
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    if x.is_nan() {
        return if x.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if x >= TWO_POW_63 {
        return Ordering::Less;
    }
    if x < -TWO_POW_63 {
        return Ordering::Greater;
    }
    let whole = x.trunc();
    match n.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0f64.partial_cmp(&(x - whole)).unwrap_or(Ordering::Equal),
        unequal => unequal,
    }
}
