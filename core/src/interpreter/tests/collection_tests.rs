//! Tests for LIST, DICT, APPEND, REMOVE, GET, SORT, FILTER, MAP and REDUCE

use super::super::*;
use super::helpers::{algorithm, parse_and_run};

fn ints(values: &[i64]) -> Value {
    Value::List(values.iter().map(|n| Value::Int(*n)).collect())
}

#[test]
fn test_list_and_dict_operations() {
    let source = algorithm(
        "",
        &[
            "LIST nums ← [3, 1, 2]",
            "APPEND nums ← 5",
            "REMOVE nums ← 1",
            "DICT ages ← {'ann': 31, 'bob': 27}",
            "GET ages['bob'] → bob_age",
            "GET nums[-1] -> last",
        ],
    );

    let outcome = parse_and_run(&source, vec![]);

    assert_eq!(outcome.var("nums"), Some(&ints(&[3, 2, 5])));
    assert_eq!(outcome.var("bob_age"), Some(&Value::Int(27)));
    assert_eq!(outcome.var("last"), Some(&Value::Int(5)));
}

#[test]
fn test_remove_missing_element_faults() {
    let source = algorithm("", &["LIST nums ← [1]", "REMOVE nums ← 9"]);

    let outcome = parse_and_run(&source, vec![]);

    assert_eq!(
        outcome.fault(),
        &FaultKind::Value("list.remove(x): x not in list".to_string())
    );
}

#[test]
fn test_append_to_non_list_faults() {
    let source = algorithm("", &["Set n ← 1", "APPEND n ← 2"]);

    let outcome = parse_and_run(&source, vec![]);

    assert!(matches!(outcome.fault(), FaultKind::Type(_)));
}

#[test]
fn test_sort_in_place_and_into_target() {
    let source = algorithm(
        "",
        &[
            "LIST nums ← [3, 1, 2]",
            "SORT nums → ordered",
            "LIST words ← ['pear', 'apple']",
            "SORT words",
        ],
    );

    let outcome = parse_and_run(&source, vec![]);

    assert_eq!(outcome.var("ordered"), Some(&ints(&[1, 2, 3])));
    assert_eq!(outcome.var("nums"), Some(&ints(&[3, 1, 2])));
    assert_eq!(
        outcome.var("words").map(ToString::to_string),
        Some("['apple', 'pear']".to_string())
    );
}

#[test]
fn test_sort_mixed_types_faults() {
    let source = algorithm("", &["LIST xs ← [1, 'a']", "SORT xs"]);

    let outcome = parse_and_run(&source, vec![]);

    assert!(matches!(outcome.fault(), FaultKind::Type(_)));
}

fn list_literal(items: impl Iterator<Item = String>) -> String {
    format!("[{}]", items.collect::<Vec<_>>().join(", "))
}

#[test]
fn test_sort_long_mixed_list_is_catchable() {
    let items = list_literal((0..40).map(|n| {
        if n % 3 == 0 {
            format!("'s{}'", n)
        } else {
            n.to_string()
        }
    }));
    let source = algorithm(
        "",
        &[
            format!("Set xs ← {}", items).as_str(),
            "TRY",
            "SORT xs → ys",
            "CATCH e",
            "RETURN e",
            "END TRY",
        ],
    );

    let outcome = parse_and_run(&source, vec![]);

    let Some(Value::Str(message)) = outcome.returned() else {
        panic!("expected the sort fault to be caught");
    };
    assert!(message.contains("not supported between instances of"));
    assert_eq!(outcome.var("ys"), None);
}

#[test]
fn test_sort_long_list_with_nan() {
    let items = list_literal((0..40).map(|n| {
        if n == 17 {
            "float('nan')".to_string()
        } else {
            ((n * 7) % 40).to_string()
        }
    }));
    let source = algorithm("", &[format!("Set xs ← {}", items).as_str(), "SORT xs → ys", "RETURN len(ys)"]);

    let outcome = parse_and_run(&source, vec![]);

    assert_eq!(outcome.returned(), Some(&Value::Int(40)));
    let Some(Value::List(sorted)) = outcome.var("ys") else {
        panic!("expected a sorted list");
    };
    assert!(matches!(sorted.last(), Some(Value::Float(x)) if x.is_nan()));
    let numbers: Vec<f64> = sorted[..39].iter().filter_map(Value::as_f64).collect();
    assert_eq!(numbers.len(), 39);
    assert!(numbers.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn test_filter_map_reduce() {
    let source = algorithm(
        "",
        &[
            "LIST nums ← [1, 2, 3, 4]",
            "FILTER nums WHERE x > 2 → big",
            "MAP nums WITH x * 2 → doubled",
            "REDUCE nums WITH acc + x → total",
        ],
    );

    let outcome = parse_and_run(&source, vec![]);

    assert_eq!(outcome.var("big"), Some(&ints(&[3, 4])));
    assert_eq!(outcome.var("doubled"), Some(&ints(&[2, 4, 6, 8])));
    assert_eq!(outcome.var("total"), Some(&Value::Int(10)));
    assert_eq!(outcome.var("nums"), Some(&ints(&[1, 2, 3, 4])));
}

#[test]
fn test_placeholders_are_restored() {
    let source = algorithm(
        "",
        &[
            "Set x ← 'keep'",
            "LIST words ← ['a', 'bb', 'ccc']",
            "MAP words WITH len(x) → lengths",
            "REDUCE lengths WITH max(acc, x) → longest",
        ],
    );

    let outcome = parse_and_run(&source, vec![]);

    assert_eq!(outcome.var("lengths"), Some(&ints(&[1, 2, 3])));
    assert_eq!(outcome.var("longest"), Some(&Value::Int(3)));
    assert_eq!(outcome.var("x"), Some(&Value::from("keep")));
    assert_eq!(outcome.var("acc"), None);
}

#[test]
fn test_reduce_single_element_and_empty() {
    let single = algorithm("", &["LIST xs ← [7]", "REDUCE xs WITH acc * x → product"]);
    let outcome = parse_and_run(&single, vec![]);
    assert_eq!(outcome.var("product"), Some(&Value::Int(7)));

    let empty = algorithm("", &["LIST xs ← []", "REDUCE xs WITH acc + x → total"]);
    let outcome = parse_and_run(&empty, vec![]);
    assert!(matches!(outcome.fault(), FaultKind::Type(_)));
    assert_eq!(outcome.var("total"), None);
}

#[test]
fn test_filter_fault_restores_placeholder() {
    let source = algorithm(
        "",
        &[
            "LIST xs ← [1, 'two']",
            "TRY",
            "FILTER xs WHERE x > 0 → positive",
            "CATCH e",
            "END TRY",
        ],
    );

    let outcome = parse_and_run(&source, vec![]);

    assert_eq!(outcome.var("x"), None);
    assert_eq!(
        outcome.var("e"),
        Some(&Value::from("'>' not supported between instances of 'str' and 'int'"))
    );
}

#[test]
fn test_field_assignment_on_list_faults() {
    let source = algorithm(
        "",
        &[
            "Set words ← 'b a c'.split()",
            "words.sort_me = 1",
        ],
    );

    let outcome = parse_and_run(&source, vec![]);

    assert!(matches!(outcome.fault(), FaultKind::Type(_)));
    assert_eq!(
        outcome.var("words").map(ToString::to_string),
        Some("['b', 'a', 'c']".to_string())
    );
}

#[test]
fn test_dict_methods() {
    let source = algorithm(
        "",
        &[
            "DICT stock ← {'apple': 3}",
            "Set stock['pear'] ← 0",
            "Set count ← stock.get('plum', -1)",
            "Set names ← sorted(stock.keys())",
            "Set popped ← stock.pop('apple')",
            "Set has_apple ← 'apple' in stock",
        ],
    );

    let outcome = parse_and_run(&source, vec![]);

    assert_eq!(outcome.var("count"), Some(&Value::Int(-1)));
    assert_eq!(
        outcome.var("names").map(ToString::to_string),
        Some("['apple', 'pear']".to_string())
    );
    assert_eq!(outcome.var("popped"), Some(&Value::Int(3)));
    assert_eq!(outcome.var("has_apple"), Some(&Value::Bool(false)));
}
