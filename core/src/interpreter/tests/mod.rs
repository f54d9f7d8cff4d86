//! Tests for the interpreter
//!
//! Organized by feature area

mod helpers;

mod collection_tests;
mod for_tests;
