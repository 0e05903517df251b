use crate::error::Result;
use crate::ir::Module;
use std::fs;
use std::path::Path;

mod parser;

pub use parser::parse_module;

/// Loads a module from a textual IR file.
pub fn load_module(path: &Path) -> Result<Module> {
    let source = fs::read_to_string(path)?;
    parse_module(&source)
}
