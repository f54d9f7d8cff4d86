//! Tests for FOR range loops, BREAK and CONTINUE

use super::super::*;
use super::helpers::{algorithm, parse_and_run};

fn ints(values: &[i64]) -> Value {
    Value::List(values.iter().map(|n| Value::Int(*n)).collect())
}

#[test]
fn test_range_end_is_inclusive() {
    let source = algorithm(
        "",
        &["Set seen ← []", "FOR i ← 0 to 3 DO", "APPEND seen ← i", "END FOR", "RETURN seen"],
    );

    let outcome = parse_and_run(&source, vec![]);

    assert_eq!(outcome.returned(), Some(&ints(&[0, 1, 2, 3])));
    // increment-then-test leaves the variable one past the end
    assert_eq!(outcome.var("i"), Some(&Value::Int(4)));
}

#[test]
fn test_range_bounds_are_expressions() {
    let source = algorithm(
        "xs",
        &[
            "Set total ← 0",
            "FOR k <- 1 to len(xs) - 1 DO",
            "Set total ← total + xs[k]",
            "END FOR",
            "RETURN total",
        ],
    );

    let outcome = parse_and_run(&source, vec![ints(&[100, 1, 2, 3])]);

    assert_eq!(outcome.returned(), Some(&Value::Int(6)));
}

#[test]
fn test_descending_range_runs_body_once() {
    let source = algorithm(
        "",
        &[
            "Set runs ← 0",
            "Set seen ← []",
            "FOR i ← 5 to 3 DO",
            "Set runs ← runs + 1",
            "APPEND seen ← i",
            "END FOR",
            "RETURN runs",
        ],
    );

    let outcome = parse_and_run(&source, vec![]);

    assert_eq!(outcome.returned(), Some(&Value::Int(1)));
    assert_eq!(outcome.var("seen"), Some(&ints(&[5])));
    assert_eq!(outcome.var("i"), Some(&Value::Int(6)));
}

#[test]
fn test_single_iteration_range() {
    let source = algorithm("", &["Set runs ← 0", "FOR i ← 2 to 2 DO", "Set runs ← runs + 1", "END FOR"]);

    let outcome = parse_and_run(&source, vec![]);

    assert_eq!(outcome.var("runs"), Some(&Value::Int(1)));
    assert!(outcome.returned().is_none());
}

#[test]
fn test_nested_ranges() {
    let source = algorithm(
        "",
        &[
            "Set pairs ← []",
            "FOR i ← 1 to 2 DO",
            "FOR j ← 1 to 2 DO",
            "APPEND pairs ← [i, j]",
            "END FOR",
            "END FOR",
        ],
    );

    let outcome = parse_and_run(&source, vec![]);

    assert_eq!(
        outcome.var("pairs").map(ToString::to_string),
        Some("[[1, 1], [1, 2], [2, 1], [2, 2]]".to_string())
    );
}

#[test]
fn test_break_leaves_only_the_inner_loop() {
    let source = algorithm(
        "",
        &[
            "Set pairs ← []",
            "FOR i ← 1 to 3 DO",
            "FOR j ← 1 to 3 DO",
            "IF j == 2 THEN",
            "BREAK",
            "END IF",
            "APPEND pairs ← [i, j]",
            "END FOR",
            "END FOR",
            "RETURN pairs",
        ],
    );

    let outcome = parse_and_run(&source, vec![]);

    assert_eq!(
        outcome.returned().map(ToString::to_string),
        Some("[[1, 1], [2, 1], [3, 1]]".to_string())
    );
}

#[test]
fn test_continue_increments_once() {
    let source = algorithm(
        "",
        &[
            "Set odds ← []",
            "Set iterations ← 0",
            "FOR i ← 1 to 5 DO",
            "Set iterations ← iterations + 1",
            "IF i % 2 == 0 THEN",
            "CONTINUE",
            "END IF",
            "APPEND odds ← i",
            "END FOR",
        ],
    );

    let outcome = parse_and_run(&source, vec![]);

    assert_eq!(outcome.var("odds"), Some(&ints(&[1, 3, 5])));
    assert_eq!(outcome.var("iterations"), Some(&Value::Int(5)));
}

#[test]
fn test_return_inside_loop() {
    let source = algorithm(
        "target",
        &[
            "FOR i ← 0 to 100 DO",
            "IF i * i >= target THEN",
            "RETURN i",
            "END IF",
            "END FOR",
            "RETURN -1",
        ],
    );

    let outcome = parse_and_run(&source, vec![Value::Int(50)]);

    assert_eq!(outcome.returned(), Some(&Value::Int(8)));
}

#[test]
fn test_non_integer_bound_is_a_type_fault() {
    let source = algorithm("", &["FOR i ← 0 to 'three' DO", "END FOR"]);

    let outcome = parse_and_run(&source, vec![]);

    assert!(matches!(outcome.fault(), FaultKind::Type(_)));
}
