//! Statement execution
//!
//! Each handler runs one statement and returns where the instruction pointer
//! goes next. Block openers find their partners with `match_block`, so a
//! missing END or ELSE only faults when a jump actually needs it.

use super::env::Environment;
use super::errors::{FaultKind, HostFault};
use super::expressions::eval::binary_op;
use super::expressions::{assign, call_named, evaluate, sort_values, BinaryOp, Builtin, Expr};
use super::types::{match_block, match_middle, Frame, FrameKind, Statement, Value};
use super::vm::{Flow, VM};

type ExecResult = Result<Flow, FaultKind>;

/* ===================== Dispatch ===================== */

pub fn execute(vm: &mut VM, stmt: &Statement) -> ExecResult {
    match stmt {
        Statement::Assign { target, expr } => {
            let value = vm.eval(expr)?;
            assign_to(vm, target, value)?;
            Ok(Flow::Next)
        }
        Statement::Import { module } => execute_import(vm, module),
        Statement::ApiKey { value } => {
            let key = unquote(value);
            vm.host.set_api_key(key);
            vm.env.set("api_key", Value::Str(key.to_string()));
            Ok(Flow::Next)
        }

        Statement::ForRange { var, start, end } => execute_for(vm, var, start, end),
        Statement::EndFor => execute_end_for(vm),
        Statement::ForEach { var, iterable } => execute_foreach(vm, var, iterable),
        Statement::EndForEach => execute_end_foreach(vm),
        Statement::While { cond } => execute_while(vm, cond),
        Statement::EndWhile => execute_end_while(vm),
        Statement::Break => execute_break(vm),
        Statement::Continue => execute_continue(vm),

        Statement::If { cond } => {
            let span = match_block(&vm.program.body, vm.ip)?;
            if vm.eval(cond)?.is_truthy() {
                Ok(Flow::Next)
            } else {
                Ok(Flow::Jump(span.middle.unwrap_or(span.end) + 1))
            }
        }
        // Reached only when the IF branch ran to completion
        Statement::Else => Ok(Flow::Jump(match_middle(&vm.program.body, vm.ip)? + 1)),
        Statement::EndIf => Ok(Flow::Next),

        Statement::Return { expr } => {
            let value = if expr.trim().is_empty() {
                Value::None
            } else {
                vm.eval(expr)?
            };
            Ok(Flow::Return(value))
        }
        Statement::Print { expr } => {
            let line = print_line(vm, expr)?;
            vm.output.emit(&line);
            Ok(Flow::Next)
        }

        Statement::ListCreate { name, expr }
        | Statement::DictCreate { name, expr }
        | Statement::GetValue {
            source: expr,
            target: name,
        } => {
            let value = vm.eval(expr)?;
            vm.env.set(name.clone(), value);
            Ok(Flow::Next)
        }
        Statement::ListAppend { list, expr } => {
            let value = vm.eval(expr)?;
            match vm.env.lookup_mut(list)? {
                Value::List(items) => items.push(value),
                other => return Err(no_method(other, "append")),
            }
            Ok(Flow::Next)
        }
        Statement::ListRemove { list, expr } => {
            let value = vm.eval(expr)?;
            match vm.env.lookup_mut(list)? {
                Value::List(items) => {
                    let idx = items.iter().position(|item| item.loose_eq(&value)).ok_or_else(|| {
                        FaultKind::Value("list.remove(x): x not in list".to_string())
                    })?;
                    items.remove(idx);
                }
                other => return Err(no_method(other, "remove")),
            }
            Ok(Flow::Next)
        }
        Statement::Sort { source, target } => {
            let sorted = sort_values(vm.env.lookup(source)?.to_items()?)?;
            vm.env.set(target.clone(), Value::List(sorted));
            Ok(Flow::Next)
        }
        Statement::Filter {
            source,
            predicate,
            target,
        } => execute_filter(vm, source, predicate, target),
        Statement::Map {
            source,
            transform,
            target,
        } => execute_map(vm, source, transform, target),
        Statement::Reduce {
            source,
            combine,
            target,
        } => execute_reduce(vm, source, combine, target),

        Statement::Try => {
            let span = match_block(&vm.program.body, vm.ip)?;
            vm.frames.push(Frame {
                kind: FrameKind::Try { catch: span.middle },
                start: vm.ip,
                end: span.end,
            });
            tracing::debug!(ip = vm.ip, end = span.end, "push try frame");
            Ok(Flow::Next)
        }
        // Reached only when the TRY body finished without a fault
        Statement::Catch { .. } => Ok(Flow::Jump(match_middle(&vm.program.body, vm.ip)?)),
        Statement::EndTry => {
            let ip = vm.ip;
            if matches!(
                vm.frames.last(),
                Some(Frame { kind: FrameKind::Try { .. }, end, .. }) if *end == ip
            ) {
                vm.frames.pop();
                tracing::debug!(ip, "pop try frame");
            }
            Ok(Flow::Next)
        }

        Statement::Call { func, args, result } => {
            let Some(callee) = resolve_callable(vm, func) else {
                tracing::warn!(function = %func, "CALL target not found, skipping");
                return Ok(Flow::Next);
            };
            let args = eval_args(vm, args)?;
            let value = call_named(&vm.env, &callee, &args)?;
            if let Some(result) = result {
                vm.env.set(result.clone(), value);
            }
            Ok(Flow::Next)
        }
        Statement::CreateInstance { var, class, args } => {
            let Some(callee) = resolve_callable(vm, class) else {
                tracing::warn!(class = %class, "CREATE class not found, skipping");
                return Ok(Flow::Next);
            };
            let args = eval_args(vm, args)?;
            let instance = call_named(&vm.env, &callee, &args)?;
            vm.env.set(var.clone(), instance);
            Ok(Flow::Next)
        }

        Statement::LoadModel { model, var } => {
            let handle = vm.host.load_model(model)?;
            vm.env.set(var.clone(), Value::Model(handle.clone()));
            vm.last_model = Some(handle);
            Ok(Flow::Next)
        }
        Statement::Predict { input, output } => {
            let input = vm.eval(input)?;
            let model = match vm.env.get("model") {
                Some(Value::Model(handle)) => handle.clone(),
                _ => vm.last_model.clone().ok_or(HostFault::NoModel)?,
            };
            let prediction = vm.host.predict(&model, &input)?;
            vm.env.set(output.clone(), prediction);
            Ok(Flow::Next)
        }
        Statement::Train { model, data } => {
            let handle = match vm.env.lookup(model)? {
                Value::Model(handle) => handle.clone(),
                other => {
                    return Err(FaultKind::Type(format!(
                        "'{}' is a {}, not a model",
                        model,
                        other.type_name()
                    )))
                }
            };
            let data = vm.eval(data)?;
            vm.host.train(&handle, &data)?;
            Ok(Flow::Next)
        }

        Statement::Raw { text } => execute_raw(vm, text),
    }
}

fn no_method(value: &Value, method: &str) -> FaultKind {
    FaultKind::Type(format!(
        "'{}' object has no attribute '{}'",
        value.type_name(),
        method
    ))
}

fn unquote(text: &str) -> &str {
    let text = text.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    text
}

fn eval_args(vm: &mut VM, args: &[String]) -> Result<Vec<Value>, FaultKind> {
    args.iter().map(|arg| vm.eval(arg)).collect()
}

/// Store into a `Set` target: a name, an indexed element or an instance field
fn assign_to(vm: &mut VM, target: &str, value: Value) -> Result<(), FaultKind> {
    let target = vm.parse(target)?;
    assign(&target, value, &mut vm.env)
}

/// `PRINT a, b` prints its operands separated by a space
fn print_line(vm: &mut VM, expr: &str) -> Result<String, FaultKind> {
    let values = match vm.eval(&format!("[{}]", expr))? {
        Value::List(values) => values,
        other => vec![other],
    };
    Ok(values
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" "))
}

fn execute_import(vm: &mut VM, name: &str) -> ExecResult {
    let module = vm.host.import(name)?;
    let root = name.split_once('.').map_or(name, |(head, _)| head);
    tracing::debug!(module = %name, binding = %root, "imported module");
    vm.env.add_module(module);
    vm.env.set(root, Value::Module(root.to_string()));
    Ok(Flow::Next)
}

/// Callable name for CALL/CREATE, asking the host when the environment has none
fn resolve_callable(vm: &mut VM, name: &str) -> Option<String> {
    if let Some(Value::Callable(target)) = vm.env.get(name) {
        return Some(target.clone());
    }
    if vm.env.object(name).is_some() || Builtin::from_name(name).is_some() {
        return Some(name.to_string());
    }
    if let Some((module, member)) = name.rsplit_once('.') {
        if vm
            .env
            .module(module)
            .is_some_and(|m| m.functions.contains_key(member))
        {
            return Some(name.to_string());
        }
    }
    let object = vm.host.resolve(name)?;
    vm.env.register(name, object);
    Some(name.to_string())
}

/* ===================== Loops ===================== */

fn loop_bound(value: Value) -> Result<i64, FaultKind> {
    value.as_i64().ok_or_else(|| {
        FaultKind::Type(format!(
            "'{}' object cannot be interpreted as an integer",
            value.type_name()
        ))
    })
}

fn execute_for(vm: &mut VM, var: &str, start: &str, end: &str) -> ExecResult {
    let span = match_block(&vm.program.body, vm.ip)?;
    let first = loop_bound(vm.eval(start)?)?;
    let last = loop_bound(vm.eval(end)?)?;

    // The body always runs once; END FOR does the bound check
    vm.env.set(var, Value::Int(first));
    vm.frames.push(Frame {
        kind: FrameKind::For {
            var: var.to_string(),
            last,
        },
        start: vm.ip,
        end: span.end,
    });
    tracing::debug!(ip = vm.ip, var, first, last, "push for frame");
    Ok(Flow::Next)
}

/// The top frame, which must be the loop closed by the statement at `ip`
fn closing_frame<'f>(frames: &'f mut [Frame], ip: usize, closer: &str) -> Result<&'f mut Frame, FaultKind> {
    match frames.last_mut() {
        Some(frame) if frame.end == ip => Ok(frame),
        _ => Err(FaultKind::Structure(format!(
            "{} at statement {} has no active loop",
            closer,
            ip + 1
        ))),
    }
}

fn execute_end_for(vm: &mut VM) -> ExecResult {
    let frame = closing_frame(&mut vm.frames, vm.ip, "END FOR")?;
    let FrameKind::For { var, last } = &frame.kind else {
        return Err(FaultKind::Structure(format!(
            "END FOR at statement {} closes a different block",
            vm.ip + 1
        )));
    };
    let (start, last) = (frame.start, *last);
    let var = var.clone();

    let next = loop_bound(vm.env.lookup(&var)?.clone())?
        .checked_add(1)
        .ok_or_else(|| FaultKind::Value("integer overflow".to_string()))?;
    vm.env.set(var, Value::Int(next));

    if next <= last {
        Ok(Flow::Jump(start + 1))
    } else {
        vm.frames.pop();
        Ok(Flow::Next)
    }
}

fn execute_foreach(vm: &mut VM, var: &str, iterable: &str) -> ExecResult {
    let span = match_block(&vm.program.body, vm.ip)?;
    let items = vm.eval(iterable)?.to_items()?;
    let Some(first) = items.first() else {
        return Ok(Flow::Jump(span.end + 1));
    };

    vm.env.set(var, first.clone());
    tracing::debug!(ip = vm.ip, var, len = items.len(), "push foreach frame");
    vm.frames.push(Frame {
        kind: FrameKind::ForEach {
            var: var.to_string(),
            items,
            cursor: 0,
        },
        start: vm.ip,
        end: span.end,
    });
    Ok(Flow::Next)
}

fn execute_end_foreach(vm: &mut VM) -> ExecResult {
    let frame = closing_frame(&mut vm.frames, vm.ip, "END FOREACH")?;
    let start = frame.start;
    let FrameKind::ForEach { var, items, cursor } = &mut frame.kind else {
        return Err(FaultKind::Structure(format!(
            "END FOREACH at statement {} closes a different block",
            vm.ip + 1
        )));
    };

    *cursor += 1;
    match items.get(*cursor) {
        Some(item) => {
            vm.env.set(var.clone(), item.clone());
            Ok(Flow::Jump(start + 1))
        }
        None => {
            vm.frames.pop();
            Ok(Flow::Next)
        }
    }
}

fn execute_while(vm: &mut VM, cond: &str) -> ExecResult {
    let span = match_block(&vm.program.body, vm.ip)?;
    if !vm.eval(cond)?.is_truthy() {
        return Ok(Flow::Jump(span.end + 1));
    }
    vm.frames.push(Frame {
        kind: FrameKind::While,
        start: vm.ip,
        end: span.end,
    });
    Ok(Flow::Next)
}

/// Pops the frame and goes back to the WHILE, which re-checks its guard
fn execute_end_while(vm: &mut VM) -> ExecResult {
    let frame = closing_frame(&mut vm.frames, vm.ip, "END WHILE")?;
    if frame.kind != FrameKind::While {
        return Err(FaultKind::Structure(format!(
            "END WHILE at statement {} closes a different block",
            vm.ip + 1
        )));
    }
    let start = frame.start;
    vm.frames.pop();
    Ok(Flow::Jump(start))
}

fn nearest_loop(vm: &VM, keyword: &str) -> Result<usize, FaultKind> {
    vm.frames
        .iter()
        .rposition(|frame| frame.kind.is_loop())
        .ok_or_else(|| FaultKind::Structure(format!("{} outside of a loop", keyword)))
}

/// Leave the innermost loop, dropping any TRY frames opened inside it
fn execute_break(vm: &mut VM) -> ExecResult {
    let pos = nearest_loop(vm, "BREAK")?;
    let end = vm.frames[pos].end;
    vm.frames.truncate(pos);
    Ok(Flow::Jump(end + 1))
}

/// Jump to the innermost loop's closer, which advances or finishes the loop
fn execute_continue(vm: &mut VM) -> ExecResult {
    let pos = nearest_loop(vm, "CONTINUE")?;
    let end = vm.frames[pos].end;
    vm.frames.truncate(pos + 1);
    Ok(Flow::Jump(end))
}

/* ===================== Collections ===================== */

/// Run `f` with `names` free for temporary bindings, restoring them afterwards
fn with_bindings<T>(
    env: &mut Environment,
    names: &[&str],
    f: impl FnOnce(&mut Environment) -> Result<T, FaultKind>,
) -> Result<T, FaultKind> {
    let saved = env.save(names);
    let result = f(env);
    env.restore(saved);
    result
}

fn execute_filter(vm: &mut VM, source: &str, predicate: &str, target: &str) -> ExecResult {
    let items = vm.env.lookup(source)?.to_items()?;
    let predicate = vm.parse(predicate)?;
    let kept = with_bindings(&mut vm.env, &["x"], |env| {
        let mut kept = Vec::new();
        for item in items {
            env.set("x", item.clone());
            if evaluate(&predicate, env)?.is_truthy() {
                kept.push(item);
            }
        }
        Ok(kept)
    })?;
    vm.env.set(target, Value::List(kept));
    Ok(Flow::Next)
}

fn execute_map(vm: &mut VM, source: &str, transform: &str, target: &str) -> ExecResult {
    let items = vm.env.lookup(source)?.to_items()?;
    let transform = vm.parse(transform)?;
    let mapped = with_bindings(&mut vm.env, &["x"], |env| {
        items
            .into_iter()
            .map(|item| {
                env.set("x", item);
                evaluate(&transform, env)
            })
            .collect::<Result<Vec<_>, _>>()
    })?;
    vm.env.set(target, Value::List(mapped));
    Ok(Flow::Next)
}

/// Left fold seeded with the first element; `acc` is the running value
fn execute_reduce(vm: &mut VM, source: &str, combine: &str, target: &str) -> ExecResult {
    let mut items = vm.env.lookup(source)?.to_items()?.into_iter();
    let Some(seed) = items.next() else {
        return Err(FaultKind::Type(
            "reduce() of empty iterable with no initial value".to_string(),
        ));
    };
    let combine = vm.parse(combine)?;
    let reduced = with_bindings(&mut vm.env, &["acc", "x"], |env| {
        items.try_fold(seed, |acc, item| {
            env.set("acc", acc);
            env.set("x", item);
            evaluate(&combine, env)
        })
    })?;
    vm.env.set(target, reduced);
    Ok(Flow::Next)
}

/* ===================== Raw Lines ===================== */

/// Unclassified STEP content: an assignment, a `print(...)` call, or an
/// expression evaluated for its side effects
fn execute_raw(vm: &mut VM, text: &str) -> ExecResult {
    if let Some((target, op, expr)) = split_assignment(text) {
        if let Ok(place) = vm.parse(target) {
            if matches!(*place, Expr::Name(_) | Expr::Index { .. } | Expr::Field { .. }) {
                let mut value = vm.eval(expr)?;
                if let Some(op) = op {
                    let current = evaluate(&place, &mut vm.env)?;
                    value = binary_op(op, &current, &value)?;
                }
                assign(&place, value, &mut vm.env)?;
                return Ok(Flow::Next);
            }
        }
    }

    let expr = vm.parse(text)?;
    if let Expr::Call { callee, args } = expr.as_ref() {
        let is_print = matches!(callee.as_ref(), Expr::Name(name) if name == "print")
            && !vm.env.contains("print");
        if is_print {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, &mut vm.env))
                .collect::<Result<Vec<_>, _>>()?;
            let line = values
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            vm.output.emit(&line);
            return Ok(Flow::Next);
        }
    }

    evaluate(&expr, &mut vm.env)?;
    Ok(Flow::Next)
}

/// Split `target = expr` / `target += expr` at the first top-level `=` that
/// is not part of a comparison
fn split_assignment(text: &str) -> Option<(&str, Option<BinaryOp>, &str)> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if let Some(q) = quote {
            if c == b'\\' {
                i += 1;
            } else if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            b'"' | b'\'' => quote = Some(c),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'=' if depth == 0 => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 2;
                    continue;
                }
                let prev = if i > 0 { bytes[i - 1] } else { 0 };
                let before = if i > 1 { bytes[i - 2] } else { 0 };
                let (op, op_len) = match (before, prev) {
                    (b'/', b'/') => (Some(BinaryOp::FloorDiv), 2),
                    (b'*', b'*') => (Some(BinaryOp::Pow), 2),
                    (_, b'+') => (Some(BinaryOp::Add), 1),
                    (_, b'-') => (Some(BinaryOp::Sub), 1),
                    (_, b'*') => (Some(BinaryOp::Mul), 1),
                    (_, b'/') => (Some(BinaryOp::Div), 1),
                    (_, b'%') => (Some(BinaryOp::Mod), 1),
                    (_, b'!' | b'<' | b'>') => return None,
                    _ => (None, 0),
                };
                let target = text[..i - op_len].trim();
                let expr = text[i + 1..].trim();
                if target.is_empty() || expr.is_empty() {
                    return None;
                }
                return Some((target, op, expr));
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_assignment() {
        assert_eq!(split_assignment("x = 1"), Some(("x", None, "1")));
        assert_eq!(
            split_assignment("total += x * 2"),
            Some(("total", Some(BinaryOp::Add), "x * 2"))
        );
        assert_eq!(
            split_assignment("n //= 2"),
            Some(("n", Some(BinaryOp::FloorDiv), "2"))
        );
        assert_eq!(
            split_assignment("grid[0][1] = 'a=b'"),
            Some(("grid[0][1]", None, "'a=b'"))
        );
        assert_eq!(split_assignment("x == 1"), None);
        assert_eq!(split_assignment("x <= 1"), None);
        assert_eq!(split_assignment("f(a=1)"), None);
        assert_eq!(split_assignment("print(x)"), None);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote(" 'abc' "), "abc");
        assert_eq!(unquote("abc"), "abc");
        assert_eq!(unquote("\"abc'"), "\"abc'");
    }
}
