//! Type definitions shared by the parser and the VM
//!
//! - Program and statement AST (Program, Statement)
//! - Runtime values (Value, Dict)
//! - Control flow (Control, Frame, FrameKind) and block matching

pub mod ast;
pub mod control;
pub mod values;

pub use ast::{HeaderKind, Location, Program, Statement};
pub use control::{match_block, match_middle, Block, BlockSpan, Control, Frame, FrameKind};
pub use values::{Dict, Instance, ModelHandle, Value};
