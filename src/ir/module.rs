use crate::error::{ErrorKind, Result};
use crate::ir::{
    DebugEntity, DebugInfo, Decoration, Function, Id, InlinedAtRecord, Instruction, Opcode,
    Operand, StorageClass,
};
use crate::util::RenderGraph;
use derivative::Derivative;
use std::collections::BTreeMap;
use std::fmt;

/// A shader IR module.
///
/// Result ids, type ids, block labels and debug entity ids share one id
/// space. `next_id` tracks the lowest id that is not in use yet.
#[derive(Clone, Debug, Derivative)]
#[derivative(Eq, PartialEq)]
pub struct Module {
    names: BTreeMap<Id, String>,
    decorations: Vec<Decoration>,
    debug_info: DebugInfo,
    globals: Vec<Instruction>,
    functions: Vec<Function>,
    // The next id to use when allocating a fresh id.
    #[derivative(PartialEq = "ignore")]
    next_id: Id,
}

impl Module {
    pub fn new() -> Self {
        Self {
            names: BTreeMap::new(),
            decorations: Vec::new(),
            debug_info: DebugInfo::new(),
            globals: Vec::new(),
            functions: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocates a previously unused id.
    pub fn fresh_id(&mut self) -> Result<Id> {
        if self.next_id == std::u32::MAX {
            bail!(ErrorKind::IdSpaceExhausted);
        }
        let id = self.next_id;
        self.next_id += 1;
        Ok(id)
    }

    /// Marks `id` as in use, bumping the fresh id counter past it.
    pub fn register_id(&mut self, id: Id) {
        if id >= self.next_id {
            self.next_id = id.saturating_add(1);
        }
    }

    /// The lowest id that `fresh_id` may hand out next.
    pub fn id_bound(&self) -> Id {
        self.next_id
    }

    pub fn add_global(&mut self, global: Instruction) -> &mut Instruction {
        if let Some(result) = global.result() {
            self.register_id(result);
        }
        self.globals.push(global);
        self.globals.last_mut().unwrap()
    }

    pub fn globals(&self) -> &[Instruction] {
        &self.globals
    }

    pub fn global(&self, id: Id) -> Option<&Instruction> {
        self.globals
            .iter()
            .find(|global| global.result() == Some(id))
    }

    pub fn add_function(&mut self, function: Function) -> &mut Function {
        self.register_id(function.id());
        for parameter in function.parameters() {
            self.register_id(parameter.id());
        }
        for block in function.blocks() {
            self.register_id(block.label());
            for instruction in block.instructions() {
                if let Some(result) = instruction.result() {
                    self.register_id(result);
                }
            }
        }
        self.functions.push(function);
        self.functions.last_mut().unwrap()
    }

    pub fn function(&self, id: Id) -> Option<&Function> {
        self.functions.iter().find(|function| function.id() == id)
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut Vec<Function> {
        &mut self.functions
    }

    pub fn name(&self, id: Id) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn names(&self) -> &BTreeMap<Id, String> {
        &self.names
    }

    pub fn set_name(&mut self, id: Id, name: &str) {
        self.register_id(id);
        self.names.insert(id, name.to_owned());
    }

    pub fn remove_name(&mut self, id: Id) {
        self.names.remove(&id);
    }

    pub fn add_decoration(&mut self, decoration: Decoration) {
        self.register_id(decoration.target());
        self.decorations.push(decoration);
    }

    pub fn decorations(&self) -> &[Decoration] {
        &self.decorations
    }

    pub fn decorations_of(&self, id: Id) -> Vec<&Decoration> {
        self.decorations
            .iter()
            .filter(|decoration| decoration.target() == id)
            .collect()
    }

    /// Clones all decorations of `source` onto `target`, in declaration order.
    pub fn clone_decorations(&mut self, source: Id, target: Id) {
        let cloned: Vec<Decoration> = self
            .decorations
            .iter()
            .filter(|decoration| decoration.target() == source)
            .map(|decoration| decoration.retargeted(target))
            .collect();
        self.decorations.extend(cloned);
    }

    pub fn remove_decorations(&mut self, id: Id) {
        self.decorations
            .retain(|decoration| decoration.target() != id);
    }

    pub fn debug_info(&self) -> &DebugInfo {
        &self.debug_info
    }

    pub fn debug_info_mut(&mut self) -> &mut DebugInfo {
        &mut self.debug_info
    }

    pub fn add_debug_entity(&mut self, id: Id, entity: DebugEntity) {
        self.register_id(id);
        self.debug_info.add_entity(id, entity);
    }

    /// Creates a fresh `InlinedAt` record and returns its id.
    pub fn add_debug_inlined_at(
        &mut self,
        line: u32,
        scope: Id,
        inlined: Option<Id>,
    ) -> Result<Id> {
        let id = self.fresh_id()?;
        self.debug_info
            .add_entity(id, DebugEntity::InlinedAt(InlinedAtRecord::new(line, scope, inlined)));
        Ok(id)
    }

    /// The function storage pointer type for `pointee`, created on demand.
    pub fn function_pointer_type(&mut self, pointee: Id) -> Result<Id> {
        let existing = self.globals.iter().find_map(|global| {
            if global.opcode() == Opcode::TypePointer
                && global.storage_class() == Some(StorageClass::Function)
                && global.operands().get(1).and_then(Operand::id) == Some(pointee)
            {
                global.result()
            } else {
                None
            }
        });
        if let Some(id) = existing {
            return Ok(id);
        }
        let id = self.fresh_id()?;
        self.add_global(Instruction::type_pointer(id, StorageClass::Function, pointee));
        Ok(id)
    }

    /// The boolean `false` constant, created on demand together with the
    /// boolean type it needs.
    pub fn false_constant(&mut self) -> Result<Id> {
        let existing = self
            .globals
            .iter()
            .find_map(|global| match global.opcode() {
                Opcode::ConstantFalse => global.result(),
                _ => None,
            });
        if let Some(id) = existing {
            return Ok(id);
        }
        let bool_type = self
            .globals
            .iter()
            .find_map(|global| match global.opcode() {
                Opcode::TypeBool => global.result(),
                _ => None,
            });
        let bool_type = match bool_type {
            Some(id) => id,
            None => {
                let id = self.fresh_id()?;
                self.add_global(Instruction::type_bool(id));
                id
            }
        };
        let id = self.fresh_id()?;
        self.add_global(Instruction::constant_false(id, bool_type));
        Ok(id)
    }

    pub fn is_void_type(&self, id: Id) -> bool {
        self.globals
            .iter()
            .any(|global| global.result() == Some(id) && global.opcode() == Opcode::TypeVoid)
    }
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderGraph for Module {
    fn render_to_str(&self) -> String {
        let mut lines = vec!["digraph module {".to_owned()];
        for function in &self.functions {
            lines.push(format!("    subgraph cluster_{} {{", function.id()));
            lines.push(format!("        label = \"function %{}\";", function.id()));
            for block in function.blocks() {
                lines.push(format!(
                    "        b{} [shape=box, label=\"%{}\"];",
                    block.label(),
                    block.label()
                ));
            }
            for block in function.blocks() {
                for successor in block.successor_labels() {
                    lines.push(format!("        b{} -> b{};", block.label(), successor));
                }
            }
            lines.push("    }".to_owned());
        }
        lines.push("}".to_owned());
        lines.join("\n")
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, name) in &self.names {
            writeln!(f, "name %{} \"{}\"", id, name)?;
        }
        for decoration in &self.decorations {
            writeln!(f, "{}", decoration)?;
        }
        write!(f, "{}", self.debug_info)?;
        for global in &self.globals {
            writeln!(f, "{}", global)?;
        }
        for function in &self.functions {
            writeln!(f)?;
            writeln!(f, "{}", function)?;
        }
        Ok(())
    }
}
