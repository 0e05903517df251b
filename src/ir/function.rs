use crate::ir::{Block, Id, Instruction};
use std::fmt;

/// A formal parameter of a function.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct Parameter {
    id: Id,
    type_id: Id,
}

impl Parameter {
    pub fn new(id: Id, type_id: Id) -> Self {
        Self { id, type_id }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn type_id(&self) -> Id {
        self.type_id
    }
}

/// A function of the module.
///
/// A function without blocks is a declaration. Debug declarations are kept
/// separate from the entry block so they survive block restructuring.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Function {
    id: Id,
    return_type: Id,
    function_type: Id,
    parameters: Vec<Parameter>,
    debug_declarations: Vec<Instruction>,
    blocks: Vec<Block>,
}

impl Function {
    pub fn new(id: Id, return_type: Id, function_type: Id) -> Self {
        Self {
            id,
            return_type,
            function_type,
            parameters: Vec::new(),
            debug_declarations: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn return_type(&self) -> Id {
        self.return_type
    }

    pub fn function_type(&self) -> Id {
        self.function_type
    }

    pub fn add_parameter(&mut self, id: Id, type_id: Id) {
        self.parameters.push(Parameter::new(id, type_id));
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn add_debug_declaration(&mut self, declaration: Instruction) {
        self.debug_declarations.push(declaration);
    }

    pub fn debug_declarations(&self) -> &[Instruction] {
        &self.debug_declarations
    }

    pub fn add_block(&mut self, block: Block) -> &mut Block {
        self.blocks.push(block);
        self.blocks.last_mut().unwrap()
    }

    pub fn new_block(&mut self, label: Id) -> &mut Block {
        self.add_block(Block::new(label))
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    pub fn block(&self, label: Id) -> Option<&Block> {
        self.blocks.iter().find(|block| block.label() == label)
    }

    pub fn block_mut(&mut self, label: Id) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|block| block.label() == label)
    }

    /// The entry block, `None` for declarations.
    pub fn entry(&self) -> Option<&Block> {
        self.blocks.first()
    }

    pub fn entry_mut(&mut self) -> Option<&mut Block> {
        self.blocks.first_mut()
    }

    /// Returns whether this function has no body.
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "function %{} type %{} returns %{} {{",
            self.id, self.function_type, self.return_type
        )?;
        for parameter in &self.parameters {
            writeln!(f, "    param %{} : %{}", parameter.id(), parameter.type_id())?;
        }
        for declaration in &self.debug_declarations {
            writeln!(f, "    {}", declaration)?;
        }
        for block in &self.blocks {
            for line in block.to_string().lines() {
                writeln!(f, "    {}", line)?;
            }
        }
        write!(f, "}}")
    }
}
