//! Control flow state, loop/try frames and block matching

use super::super::errors::{FaultKind, RuntimeFault};
use super::ast::Statement;
use super::values::Value;

/* ===================== Control Flow ===================== */

/// Control flow state
///
/// `None` while running. Any other state halts the VM.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    None,
    Return(Value),
    Throw(RuntimeFault),
}

/* ===================== Frames ===================== */

/// Frame kind, with the per-kind loop state
#[derive(Debug, Clone, PartialEq)]
pub enum FrameKind {
    For { var: String, last: i64 },
    ForEach { var: String, items: Vec<Value>, cursor: usize },
    While,
    Try { catch: Option<usize> },
}

impl FrameKind {
    pub fn is_loop(&self) -> bool {
        !matches!(self, FrameKind::Try { .. })
    }
}

/// Active loop or try block on the control stack
///
/// `start` is the index of the opener, `end` the index of its closer.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: FrameKind,
    pub start: usize,
    pub end: usize,
}

/* ===================== Block Matching ===================== */

/// The block family a statement opens, continues or closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    If,
    For,
    ForEach,
    While,
    Try,
}

impl Block {
    pub fn opener(stmt: &Statement) -> Option<Block> {
        match stmt {
            Statement::If { .. } => Some(Block::If),
            Statement::ForRange { .. } => Some(Block::For),
            Statement::ForEach { .. } => Some(Block::ForEach),
            Statement::While { .. } => Some(Block::While),
            Statement::Try => Some(Block::Try),
            _ => None,
        }
    }

    pub fn closer(stmt: &Statement) -> Option<Block> {
        match stmt {
            Statement::EndIf => Some(Block::If),
            Statement::EndFor => Some(Block::For),
            Statement::EndForEach => Some(Block::ForEach),
            Statement::EndWhile => Some(Block::While),
            Statement::EndTry => Some(Block::Try),
            _ => None,
        }
    }

    /// `ELSE` for IF blocks, `CATCH` for TRY blocks
    pub fn middle(stmt: &Statement) -> Option<Block> {
        match stmt {
            Statement::Else => Some(Block::If),
            Statement::Catch { .. } => Some(Block::Try),
            _ => None,
        }
    }

    pub fn closer_keyword(self) -> &'static str {
        match self {
            Block::If => "END IF",
            Block::For => "END FOR",
            Block::ForEach => "END FOREACH",
            Block::While => "END WHILE",
            Block::Try => "END TRY",
        }
    }
}

/// Partners of a block opener found by scanning forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    /// `ELSE` or `CATCH` at the opener's depth, if any
    pub middle: Option<usize>,
    pub end: usize,
}

/// Find the middle and closer of the block opened at `open`
///
/// Only statements of the same block family count towards depth, so an
/// `END IF` never closes a `FOR`. A missing closer is a structure fault.
pub fn match_block(body: &[Statement], open: usize) -> Result<BlockSpan, FaultKind> {
    let block = body
        .get(open)
        .and_then(Block::opener)
        .ok_or_else(|| FaultKind::Structure(format!("statement {} does not open a block", open)))?;

    let mut depth = 0usize;
    let mut middle = None;
    for (i, stmt) in body.iter().enumerate().skip(open + 1) {
        if Block::opener(stmt) == Some(block) {
            depth += 1;
        } else if Block::closer(stmt) == Some(block) {
            if depth == 0 {
                return Ok(BlockSpan { middle, end: i });
            }
            depth -= 1;
        } else if depth == 0 && middle.is_none() && Block::middle(stmt) == Some(block) {
            middle = Some(i);
        }
    }

    Err(FaultKind::Structure(format!(
        "{} at statement {} has no matching {}",
        body[open].keyword(),
        open + 1,
        block.closer_keyword()
    )))
}

/// Find the closer for a middle marker (`ELSE` or `CATCH`) at `at`
pub fn match_middle(body: &[Statement], at: usize) -> Result<usize, FaultKind> {
    let block = body
        .get(at)
        .and_then(Block::middle)
        .ok_or_else(|| FaultKind::Structure(format!("statement {} is not ELSE or CATCH", at)))?;

    let mut depth = 0usize;
    for (i, stmt) in body.iter().enumerate().skip(at + 1) {
        if Block::opener(stmt) == Some(block) {
            depth += 1;
        } else if Block::closer(stmt) == Some(block) {
            if depth == 0 {
                return Ok(i);
            }
            depth -= 1;
        }
    }

    Err(FaultKind::Structure(format!(
        "{} at statement {} has no matching {}",
        body[at].keyword(),
        at + 1,
        block.closer_keyword()
    )))
}
