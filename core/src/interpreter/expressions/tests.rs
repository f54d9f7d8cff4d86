use super::*;
use crate::interpreter::types::Dict;

fn eval(text: &str) -> Result<Value, FaultKind> {
    evaluate(&parse_expression(text)?, &mut Environment::new())
}

fn eval_ok(text: &str) -> Value {
    eval(text).unwrap_or_else(|err| panic!("{} failed: {}", text, err))
}

fn ints(values: &[i64]) -> Value {
    Value::List(values.iter().map(|n| Value::Int(*n)).collect())
}

/* ===================== Parsing ===================== */

#[test]
fn test_precedence() {
    assert_eq!(eval_ok("1 + 2 * 3"), Value::Int(7));
    assert_eq!(eval_ok("(1 + 2) * 3"), Value::Int(9));
    assert_eq!(eval_ok("2 ** 3 ** 2"), Value::Int(512));
    assert_eq!(eval_ok("-2 ** 2"), Value::Int(-4));
    assert_eq!(eval_ok("10 - 4 - 3"), Value::Int(3));
    assert_eq!(eval_ok("not 1 == 2"), Value::Bool(true));
    assert_eq!(eval_ok("1 < 2 and 3 > 4 or 5 >= 5"), Value::Bool(true));
}

#[test]
fn test_parse_tree_shape() {
    let expr = parse_expression("a.b(1)[0]").unwrap();
    let Expr::Index { value, index } = expr else {
        panic!("expected an index expression");
    };
    assert_eq!(*index, Expr::Literal(Value::Int(0)));
    let Expr::Call { callee, args } = *value else {
        panic!("expected call");
    };
    assert_eq!(args, vec![Expr::Literal(Value::Int(1))]);
    assert_eq!(
        *callee,
        Expr::Field {
            value: Box::new(Expr::Name("a".to_string())),
            field: "b".to_string(),
        }
    );
}

#[test]
fn test_keyword_prefixed_identifiers() {
    let mut env = Environment::new();
    env.set("order", Value::Int(2));
    env.set("android", Value::Int(3));
    env.set("index", Value::Int(4));
    let expr = parse_expression("order + android + index").unwrap();
    assert_eq!(evaluate(&expr, &mut env), Ok(Value::Int(9)));
}

#[test]
fn test_syntax_errors() {
    for text in ["1 +", "(1", "[1, 2", "x ==", "", "'open"] {
        assert!(
            matches!(parse_expression(text), Err(FaultKind::Syntax { .. })),
            "{:?} should not parse",
            text
        );
    }
}

#[test]
fn test_literals() {
    assert_eq!(eval_ok("3.5e1"), Value::Float(35.0));
    assert_eq!(eval_ok("'it\\'s'"), Value::from("it's"));
    assert_eq!(eval_ok("\"tab\\there\""), Value::from("tab\there"));
    assert_eq!(eval_ok("true"), Value::Bool(true));
    assert_eq!(eval_ok("null"), Value::None);
    assert_eq!(eval_ok("[1, [2, 3],]"), Value::List(vec![Value::Int(1), ints(&[2, 3])]));
    assert_eq!(
        eval_ok("{'a': 1, 'b': [True]}"),
        Value::Dict(Dict::from_iter([
            (Value::from("a"), Value::Int(1)),
            (Value::from("b"), Value::List(vec![Value::Bool(true)])),
        ]))
    );
}

/* ===================== Arithmetic ===================== */

#[test]
fn test_division_semantics() {
    assert_eq!(eval_ok("7 / 2"), Value::Float(3.5));
    assert_eq!(eval_ok("6 / 3"), Value::Float(2.0));
    assert_eq!(eval_ok("7 // 2"), Value::Int(3));
    assert_eq!(eval_ok("-7 // 2"), Value::Int(-4));
    assert_eq!(eval_ok("7 // -2"), Value::Int(-4));
    assert_eq!(eval_ok("-7 % 2"), Value::Int(1));
    assert_eq!(eval_ok("7 % -3"), Value::Int(-2));
    assert_eq!(eval_ok("7.5 // 2"), Value::Float(3.0));
    assert_eq!(eval_ok("-1.5 % 1"), Value::Float(0.5));
    assert_eq!(eval("1 / 0"), Err(FaultKind::DivisionByZero));
    assert_eq!(eval("1 % 0"), Err(FaultKind::DivisionByZero));
    assert_eq!(eval("1.0 // 0"), Err(FaultKind::DivisionByZero));
}

#[test]
fn test_mixed_numbers_and_overflow() {
    assert_eq!(eval_ok("1 + 2.5"), Value::Float(3.5));
    assert_eq!(eval_ok("True + 1"), Value::Int(2));
    assert_eq!(eval_ok("2 ** -1"), Value::Float(0.5));
    assert!(matches!(eval("9223372036854775807 + 1"), Err(FaultKind::Value(_))));
    assert!(matches!(eval("2 ** 64"), Err(FaultKind::Value(_))));
}

#[test]
fn test_sequence_operators() {
    assert_eq!(eval_ok("'ab' + 'cd'"), Value::from("abcd"));
    assert_eq!(eval_ok("'ab' * 3"), Value::from("ababab"));
    assert_eq!(eval_ok("2 * [0]"), ints(&[0, 0]));
    assert_eq!(eval_ok("[1] + [2, 3]"), ints(&[1, 2, 3]));
    assert_eq!(
        eval("'a' + 1"),
        Err(FaultKind::Type(
            "unsupported operand type(s) for +: 'str' and 'int'".to_string()
        ))
    );
}

#[test]
fn test_oversized_repetition_faults() {
    let too_long = FaultKind::Value("repeated sequence is too long".to_string());
    assert_eq!(eval("'ab' * 9223372036854775807"), Err(too_long.clone()));
    assert_eq!(eval("[0, 1] * 4611686018427387904"), Err(too_long.clone()));
    assert_eq!(eval("'x' * 1000000000"), Err(too_long));
    assert_eq!(eval_ok("'' * 9223372036854775807"), Value::from(""));
    assert_eq!(eval_ok("[] * 9223372036854775807"), ints(&[]));
    assert_eq!(eval_ok("'ab' * -3"), Value::from(""));
}

/* ===================== Comparison & Logic ===================== */

#[test]
fn test_comparisons() {
    assert_eq!(eval_ok("1 == 1.0"), Value::Bool(true));
    assert_eq!(eval_ok("'abc' < 'abd'"), Value::Bool(true));
    assert_eq!(eval_ok("[1, 2] < [1, 3]"), Value::Bool(true));
    assert_eq!(eval_ok("None == None"), Value::Bool(true));
    assert_eq!(eval_ok("1 != 'a'"), Value::Bool(true));
    assert!(matches!(eval("1 < 'a'"), Err(FaultKind::Type(_))));
}

#[test]
fn test_membership() {
    assert_eq!(eval_ok("2 in [1, 2]"), Value::Bool(true));
    assert_eq!(eval_ok("'k' in {'k': 1}"), Value::Bool(true));
    assert_eq!(eval_ok("'ell' in 'hello'"), Value::Bool(true));
    assert_eq!(eval_ok("3 not in [1, 2]"), Value::Bool(true));
    assert!(matches!(eval("1 in 5"), Err(FaultKind::Type(_))));
}

#[test]
fn test_and_or_return_operands_and_short_circuit() {
    assert_eq!(eval_ok("0 or 'fallback'"), Value::from("fallback"));
    assert_eq!(eval_ok("'first' or missing"), Value::from("first"));
    assert_eq!(eval_ok("[] and missing"), Value::List(vec![]));
    assert_eq!(eval_ok("1 and 2"), Value::Int(2));
    assert_eq!(eval("1 and missing"), Err(FaultKind::Undefined("missing".to_string())));
}

/* ===================== Indexing & Calls ===================== */

#[test]
fn test_indexing_and_slicing() {
    assert_eq!(eval_ok("[10, 20, 30][-1]"), Value::Int(30));
    assert_eq!(eval_ok("'hello'[1]"), Value::from("e"));
    assert_eq!(eval_ok("{'a': 5}['a']"), Value::Int(5));
    assert_eq!(eval_ok("[1, 2, 3, 4][1:3]"), ints(&[2, 3]));
    assert_eq!(eval_ok("[1, 2, 3, 4][:-1]"), ints(&[1, 2, 3]));
    assert_eq!(eval_ok("[1, 2, 3][5:]"), ints(&[]));
    assert_eq!(eval_ok("'hello'[1:]"), Value::from("ello"));
    assert_eq!(
        eval("[1][3]"),
        Err(FaultKind::Value("list index out of range".to_string()))
    );
    assert_eq!(
        eval("{'a': 1}['b']"),
        Err(FaultKind::Value("key 'b' not found".to_string()))
    );
    assert!(matches!(eval("5[0]"), Err(FaultKind::Type(_))));
}

#[test]
fn test_builtins() {
    assert_eq!(eval_ok("len([1, 2, 3])"), Value::Int(3));
    assert_eq!(eval_ok("str(2.0) + str(None)"), Value::from("2.0None"));
    assert_eq!(eval_ok("int('42') + int(3.9)"), Value::Int(45));
    assert_eq!(eval_ok("float('1.5')"), Value::Float(1.5));
    assert_eq!(eval_ok("abs(-3)"), Value::Int(3));
    assert_eq!(eval_ok("min(4, 2, 8)"), Value::Int(2));
    assert_eq!(eval_ok("max([4, 2, 8])"), Value::Int(8));
    assert_eq!(eval_ok("sum([1, 2, 3.5])"), Value::Float(6.5));
    assert_eq!(eval_ok("round(2.5)"), Value::Int(2));
    assert_eq!(eval_ok("round(3.5)"), Value::Int(4));
    assert_eq!(eval_ok("range(3)"), ints(&[0, 1, 2]));
    assert_eq!(eval_ok("range(5, 0, -2)"), ints(&[5, 3, 1]));
    assert_eq!(eval_ok("sorted('cab')"), Value::List(vec!["a".into(), "b".into(), "c".into()]));
    assert_eq!(eval_ok("list('ab')"), Value::List(vec!["a".into(), "b".into()]));
    assert_eq!(eval_ok("bool([])"), Value::Bool(false));
    assert!(matches!(eval("int('x')"), Err(FaultKind::Value(_))));
    assert!(matches!(eval("max([])"), Err(FaultKind::Value(_))));
    assert_eq!(eval("nope(1)"), Err(FaultKind::Undefined("nope".to_string())));
}

#[test]
fn test_round_edge_cases() {
    assert_eq!(
        eval("round(float('nan'))"),
        Err(FaultKind::Value("cannot convert float NaN to integer".to_string()))
    );
    assert_eq!(
        eval("round(float('inf'))"),
        Err(FaultKind::Value("cannot convert float infinity to integer".to_string()))
    );
    assert!(matches!(eval("round(1e300)"), Err(FaultKind::Value(_))));
    assert_eq!(eval_ok("round(2.25, 1)"), Value::Float(2.2));
    assert_eq!(eval_ok("round(2.5, 4294967296)"), Value::Float(2.5));
    assert_eq!(eval_ok("round(1234.5, -4294967296)"), Value::Float(0.0));
    assert!(matches!(eval_ok("round(float('nan'), 2)"), Value::Float(x) if x.is_nan()));
}

#[test]
fn test_sorted_long_sequences() {
    let mixed = format!(
        "sorted([{}])",
        (0..30)
            .map(|n| if n % 4 == 0 { "'s'".to_string() } else { n.to_string() })
            .collect::<Vec<_>>()
            .join(", ")
    );
    assert!(matches!(eval(&mixed), Err(FaultKind::Type(_))));

    let numbers = format!(
        "sorted([{}, float('nan'), -0.0, 0])",
        (0..30).rev().map(|n| format!("{}.5", n)).collect::<Vec<_>>().join(", ")
    );
    let Value::List(sorted) = eval_ok(&numbers) else {
        panic!("sorted() should return a list");
    };
    assert_eq!(sorted.len(), 33);
    assert_eq!(sorted[2], Value::Float(0.5));
    assert_eq!(sorted[31], Value::Float(29.5));
    assert!(matches!(sorted[32], Value::Float(x) if x.is_nan()));
}

#[test]
fn test_string_methods() {
    assert_eq!(eval_ok("' Hi '.strip().lower()"), Value::from("hi"));
    assert_eq!(eval_ok("'a,b'.split(',')"), Value::List(vec!["a".into(), "b".into()]));
    assert_eq!(eval_ok("'-'.join(['x', 'y'])"), Value::from("x-y"));
    assert_eq!(eval_ok("'banana'.replace('a', 'o')"), Value::from("bonono"));
    assert_eq!(eval_ok("'report.txt'.endswith('.txt')"), Value::Bool(true));
    assert!(matches!(eval("'x'.frobnicate()"), Err(FaultKind::Type(_))));
}

#[test]
fn test_list_methods_mutate_variables() {
    let mut env = Environment::new();
    env.set("xs", ints(&[3, 1]));
    for text in ["xs.append(5)", "xs.insert(0, 9)", "xs.remove(1)"] {
        evaluate(&parse_expression(text).unwrap(), &mut env).unwrap();
    }
    assert_eq!(env.get("xs"), Some(&ints(&[9, 3, 5])));

    let popped = evaluate(&parse_expression("xs.pop()").unwrap(), &mut env).unwrap();
    assert_eq!(popped, Value::Int(5));
    assert_eq!(env.get("xs"), Some(&ints(&[9, 3])));
    assert_eq!(
        evaluate(&parse_expression("xs.index(3)").unwrap(), &mut env),
        Ok(Value::Int(1))
    );
}

#[test]
fn test_assign_targets() {
    let mut env = Environment::new();
    env.set("grid", Value::List(vec![ints(&[0, 0]), ints(&[0, 0])]));
    env.set("d", Value::Dict(Dict::new()));

    assign(&parse_expression("grid[0][1]").unwrap(), Value::Int(7), &mut env).unwrap();
    assign(&parse_expression("d['k']").unwrap(), Value::Int(1), &mut env).unwrap();
    assign(&parse_expression("fresh").unwrap(), Value::Bool(true), &mut env).unwrap();

    assert_eq!(env.get("grid").map(ToString::to_string), Some("[[0, 7], [0, 0]]".to_string()));
    assert_eq!(env.get("d").map(ToString::to_string), Some("{'k': 1}".to_string()));
    assert_eq!(env.get("fresh"), Some(&Value::Bool(true)));

    assert_eq!(
        assign(&parse_expression("grid[5][0]").unwrap(), Value::None, &mut env),
        Err(FaultKind::Value("list index out of range".to_string()))
    );
    assert!(matches!(
        assign(&parse_expression("f(x)").unwrap(), Value::None, &mut env),
        Err(FaultKind::Type(_))
    ));
    assert_eq!(
        assign(&parse_expression("ghost[0]").unwrap(), Value::None, &mut env),
        Err(FaultKind::Undefined("ghost".to_string()))
    );
}

/* ===================== Cache & Literals ===================== */

#[test]
fn test_expression_cache_parses_once() {
    let mut cache = ExprCache::new();
    let first = cache.get("a + 1").unwrap();
    let second = cache.get("a + 1").unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
    assert!(cache.get("a +").is_err());
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_literal_eval() {
    assert_eq!(literal_eval("-3"), Ok(Value::Int(-3)));
    assert_eq!(literal_eval("[1, 'a', None]").map(|v| v.to_string()), Ok("[1, 'a', None]".to_string()));
    assert!(literal_eval("1 + 2").is_err());
    assert!(literal_eval("name").is_err());
    assert!(literal_eval("print('x')").is_err());
}
