//! Program and statement types
//!
//! A program body is a flat list of statements. Block structure is implied by
//! opener/closer markers (`If`..`EndIf`, `ForRange`..`EndFor`, ...) and resolved
//! by the VM with index arithmetic, never by nesting.

use serde::{Deserialize, Serialize};
use std::fmt;

/* ===================== Program ===================== */

/// Header keyword that opens a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderKind {
    Algorithm,
    Model,
    ApiCall,
}

impl HeaderKind {
    pub const ALL: [HeaderKind; 3] = [HeaderKind::Algorithm, HeaderKind::Model, HeaderKind::ApiCall];

    pub fn keyword(self) -> &'static str {
        match self {
            HeaderKind::Algorithm => "ALGORITHM",
            HeaderKind::Model => "MODEL",
            HeaderKind::ApiCall => "API_CALL",
        }
    }

    /// Header kind of a line that starts with one of the header keywords
    pub fn from_line(line: &str) -> Option<HeaderKind> {
        Self::ALL.into_iter().find(|kind| line.starts_with(kind.keyword()))
    }

    /// The `END ...` line that closes this kind of program
    pub fn terminator(self) -> String {
        format!("END {}", self.keyword())
    }
}

/// Where a statement came from in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// 1-based source line
    pub line: usize,
    /// Number written after `STEP`
    pub step: u64,
}

/// Parsed program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    pub kind: HeaderKind,
    /// Input parameter names, in argument binding order
    pub inputs: Vec<String>,
    /// Text of the `OUTPUT:` line. Documentation only.
    pub output: Option<String>,
    pub body: Vec<Statement>,
    /// `locations[i]` is the origin of `body[i]`
    pub locations: Vec<Location>,
}

impl Program {
    pub fn location(&self, index: usize) -> Option<Location> {
        self.locations.get(index).copied()
    }

    /// Render the program back to source, numbering steps from 1
    pub fn to_source(&self) -> String {
        let mut out = format!("{} {}\n", self.kind.keyword(), self.name);
        if !self.inputs.is_empty() {
            out.push_str(&format!("INPUT: {}\n", self.inputs.join(", ")));
        }
        if let Some(output) = &self.output {
            out.push_str(&format!("OUTPUT: {}\n", output));
        }
        for (i, stmt) in self.body.iter().enumerate() {
            out.push_str(&format!("STEP {}: {}\n", i + 1, stmt));
        }
        out.push_str(&self.kind.terminator());
        out.push('\n');
        out
    }
}

/* ===================== Statement ===================== */

/// Statement AST node
///
/// Expression operands are kept as source text and handed to the expression
/// evaluator when the statement runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Statement {
    Assign { target: String, expr: String },
    Import { module: String },
    ApiKey { value: String },

    ForRange { var: String, start: String, end: String },
    ForEach { var: String, iterable: String },
    While { cond: String },
    EndFor,
    EndForEach,
    EndWhile,
    If { cond: String },
    Else,
    EndIf,
    Return { expr: String },
    Print { expr: String },
    Break,
    Continue,

    ListCreate { name: String, expr: String },
    DictCreate { name: String, expr: String },
    ListAppend { list: String, expr: String },
    ListRemove { list: String, expr: String },
    GetValue { source: String, target: String },

    Sort { source: String, target: String },
    Filter { source: String, predicate: String, target: String },
    Map { source: String, transform: String, target: String },
    Reduce { source: String, combine: String, target: String },

    Try,
    Catch { error_var: String },
    EndTry,

    Call { func: String, args: Vec<String>, result: Option<String> },
    CreateInstance { var: String, class: String, args: Vec<String> },

    LoadModel { model: String, var: String },
    Predict { input: String, output: String },
    Train { model: String, data: String },

    /// Unclassified content, executed verbatim
    Raw { text: String },
}

impl Statement {
    /// Short name used in logs and diagnostics
    pub fn keyword(&self) -> &'static str {
        match self {
            Statement::Assign { .. } => "Set",
            Statement::Import { .. } => "Import",
            Statement::ApiKey { .. } => "KEY",
            Statement::ForRange { .. } => "FOR",
            Statement::ForEach { .. } => "FOREACH",
            Statement::While { .. } => "WHILE",
            Statement::EndFor => "END FOR",
            Statement::EndForEach => "END FOREACH",
            Statement::EndWhile => "END WHILE",
            Statement::If { .. } => "IF",
            Statement::Else => "ELSE",
            Statement::EndIf => "END IF",
            Statement::Return { .. } => "RETURN",
            Statement::Print { .. } => "PRINT",
            Statement::Break => "BREAK",
            Statement::Continue => "CONTINUE",
            Statement::ListCreate { .. } => "LIST",
            Statement::DictCreate { .. } => "DICT",
            Statement::ListAppend { .. } => "APPEND",
            Statement::ListRemove { .. } => "REMOVE",
            Statement::GetValue { .. } => "GET",
            Statement::Sort { .. } => "SORT",
            Statement::Filter { .. } => "FILTER",
            Statement::Map { .. } => "MAP",
            Statement::Reduce { .. } => "REDUCE",
            Statement::Try => "TRY",
            Statement::Catch { .. } => "CATCH",
            Statement::EndTry => "END TRY",
            Statement::Call { .. } => "CALL",
            Statement::CreateInstance { .. } => "CREATE",
            Statement::LoadModel { .. } => "LOAD_MODEL",
            Statement::Predict { .. } => "PREDICT",
            Statement::Train { .. } => "TRAIN",
            Statement::Raw { .. } => "raw",
        }
    }
}

fn with_operand(f: &mut fmt::Formatter<'_>, keyword: &str, operand: &str) -> fmt::Result {
    if operand.is_empty() {
        write!(f, "{}", keyword)
    } else {
        write!(f, "{} {}", keyword, operand)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assign { target, expr } => write!(f, "Set {} ← {}", target, expr),
            Statement::Import { module } => write!(f, "Import {}", module),
            Statement::ApiKey { value } => write!(f, "KEY: {}", value),
            Statement::ForRange { var, start, end } => {
                write!(f, "FOR {} ← {} to {} DO", var, start, end)
            }
            Statement::ForEach { var, iterable } => write!(f, "FOREACH {} IN {} DO", var, iterable),
            Statement::While { cond } => write!(f, "WHILE {} DO", cond),
            Statement::If { cond } => write!(f, "IF {} THEN", cond),
            Statement::Return { expr } => with_operand(f, "RETURN", expr),
            Statement::Print { expr } => with_operand(f, "PRINT", expr),
            Statement::ListCreate { name, expr } => write!(f, "LIST {} ← {}", name, expr),
            Statement::DictCreate { name, expr } => write!(f, "DICT {} ← {}", name, expr),
            Statement::ListAppend { list, expr } => write!(f, "APPEND {} ← {}", list, expr),
            Statement::ListRemove { list, expr } => write!(f, "REMOVE {} ← {}", list, expr),
            Statement::GetValue { source, target } => write!(f, "GET {} → {}", source, target),
            Statement::Sort { source, target } if source == target => write!(f, "SORT {}", source),
            Statement::Sort { source, target } => write!(f, "SORT {} → {}", source, target),
            Statement::Filter { source, predicate, target } => {
                write!(f, "FILTER {} WHERE {} → {}", source, predicate, target)
            }
            Statement::Map { source, transform, target } => {
                write!(f, "MAP {} WITH {} → {}", source, transform, target)
            }
            Statement::Reduce { source, combine, target } => {
                write!(f, "REDUCE {} WITH {} → {}", source, combine, target)
            }
            Statement::Catch { error_var } => write!(f, "CATCH {}", error_var),
            Statement::Call { func, args, result } => {
                write!(f, "CALL {}({})", func, args.join(", "))?;
                match result {
                    Some(result) => write!(f, " → {}", result),
                    None => Ok(()),
                }
            }
            Statement::CreateInstance { var, class, args } => {
                write!(f, "CREATE {} ← {}({})", var, class, args.join(", "))
            }
            Statement::LoadModel { model, var } => write!(f, "LOAD_MODEL \"{}\" → {}", model, var),
            Statement::Predict { input, output } => write!(f, "PREDICT {} → {}", input, output),
            Statement::Train { model, data } => write!(f, "TRAIN {} ON {}", model, data),
            Statement::Raw { text } => write!(f, "{}", text),
            marker => write!(f, "{}", marker.keyword()),
        }
    }
}
