//! Structural validation for step programs
//!
//! The parser is permissive: it accepts unbalanced blocks and leaves the VM to
//! fault when a jump has no partner. These checks report such problems up
//! front, for `stepwise check` and for strict parsing.

use thiserror::Error;

use super::classify;
use crate::interpreter::types::{Block, HeaderKind, Program, Statement};

/* ===================== Error Types ===================== */

/// One diagnostic, tied to a 1-based source line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ValidationError {
    pub line: usize,
    pub message: String,
}

impl ValidationError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/* ===================== Line Checks ===================== */

/// Check raw source lines without parsing them
///
/// Reports a missing header or terminator, `Set` lines without a left arrow
/// and `IF` lines without `THEN`.
pub fn lint_lines(source: &str) -> Vec<ValidationError> {
    let mut issues = Vec::new();
    let lines: Vec<(usize, &str)> = source
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .collect();

    let Some(&(first_line, first)) = lines.first() else {
        issues.push(ValidationError::new(1, "empty program"));
        return issues;
    };

    match HeaderKind::from_line(first) {
        Some(kind) => {
            let terminator = kind.terminator();
            if !lines.iter().any(|(_, line)| line.starts_with(&terminator)) {
                let last = lines.last().map_or(first_line, |(n, _)| *n);
                issues.push(ValidationError::new(last, format!("missing '{}'", terminator)));
            }
        }
        None => issues.push(ValidationError::new(
            first_line,
            "file must start with ALGORITHM, MODEL or API_CALL",
        )),
    }

    for &(line_no, line) in &lines {
        let content = step_content(line);
        match classify(content).map(|(keyword, _)| keyword) {
            Some("Set") if !content.contains('←') && !content.contains("<-") => {
                issues.push(ValidationError::new(line_no, "missing assignment operator '←'"));
            }
            Some("IF") if !content.contains("THEN") => {
                issues.push(ValidationError::new(line_no, "missing THEN in IF statement"));
            }
            _ => {}
        }
    }

    issues
}

/// Content after `STEP <n>:`, or the whole line when it is not a STEP line
fn step_content(line: &str) -> &str {
    let Some(rest) = line.strip_prefix("STEP") else {
        return line;
    };
    let rest = rest.trim_start();
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    rest.strip_prefix(':').unwrap_or(rest).trim_start()
}

/* ===================== Block Structure ===================== */

struct OpenBlock {
    block: Block,
    line: usize,
    keyword: &'static str,
    seen_middle: bool,
}

/// Check that every block opener has exactly one closer of its own kind,
/// that blocks do not cross, and that BREAK/CONTINUE sit inside a loop
pub fn validate_structure(program: &Program) -> Vec<ValidationError> {
    let mut issues = Vec::new();
    let mut open: Vec<OpenBlock> = Vec::new();

    for (i, stmt) in program.body.iter().enumerate() {
        let line = program.location(i).map_or(0, |loc| loc.line);

        if let Some(block) = Block::opener(stmt) {
            open.push(OpenBlock {
                block,
                line,
                keyword: stmt.keyword(),
                seen_middle: false,
            });
        } else if let Some(block) = Block::middle(stmt) {
            match open.last_mut() {
                Some(top) if top.block == block && !top.seen_middle => top.seen_middle = true,
                Some(top) if top.block == block => {
                    issues.push(ValidationError::new(
                        line,
                        format!("second {} in {} block", stmt.keyword(), top.keyword),
                    ));
                }
                _ => issues.push(ValidationError::new(
                    line,
                    format!("{} outside of a matching block", stmt.keyword()),
                )),
            }
        } else if let Some(block) = Block::closer(stmt) {
            match open.iter().rposition(|b| b.block == block) {
                Some(pos) => {
                    for inner in open.drain(pos + 1..) {
                        issues.push(ValidationError::new(
                            inner.line,
                            format!(
                                "{} is not closed before {} on line {}",
                                inner.keyword,
                                stmt.keyword(),
                                line
                            ),
                        ));
                    }
                    open.pop();
                }
                None => issues.push(ValidationError::new(
                    line,
                    format!("{} without a matching opener", stmt.keyword()),
                )),
            }
        } else if matches!(stmt, Statement::Break | Statement::Continue)
            && !open.iter().any(|b| b.block != Block::If && b.block != Block::Try)
        {
            issues.push(ValidationError::new(
                line,
                format!("{} outside of a loop", stmt.keyword()),
            ));
        }
    }

    for unclosed in open {
        issues.push(ValidationError::new(
            unclosed.line,
            format!(
                "{} has no matching {}",
                unclosed.keyword,
                unclosed.block.closer_keyword()
            ),
        ));
    }

    issues
}
