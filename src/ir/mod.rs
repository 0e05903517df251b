//! Structured shader IR

mod block;
mod debug_info;
mod decoration;
mod function;
mod instruction;
mod module;
mod opcode;
mod operand;
mod validation;

pub mod analysis;
pub mod optimization;

pub use self::block::Block;
pub use self::debug_info::{DebugEntity, DebugInfo, DebugScope, InlinedAtRecord, SourceLocation};
pub use self::decoration::{Decoration, DecorationKind};
pub use self::function::{Function, Parameter};
pub use self::instruction::Instruction;
pub use self::module::Module;
pub use self::opcode::Opcode;
pub use self::operand::{Operand, StorageClass};

/// Result ids, type ids, block labels and debug entity ids share one id space.
pub type Id = u32;
