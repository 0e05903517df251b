//! Structural module validation

use crate::error::{ErrorKind, Result};
use crate::ir::{DebugEntity, Function, Id, Instruction, Module, Opcode, Operand};
use crate::util::Validate;
use std::collections::{BTreeMap, BTreeSet};

impl Validate for Module {
    /// Validates the module.
    ///
    /// Checks:
    ///   - Each id is defined exactly once and stays below the id bound
    ///   - Blocks are properly shaped (terminator last, phis first)
    ///   - All referenced ids are defined
    ///   - Phi incoming edges match the actual predecessors
    ///   - Loop headers declare distinct merge and continue targets
    fn validate(&self) -> Result<()> {
        let defined = collect_defined_ids(self)?;
        validate_block_shape(self)?;
        validate_references(self, &defined)?;
        validate_phi_nodes(self)?;
        validate_loop_headers(self)?;
        Ok(())
    }
}

fn define(module: &Module, defined: &mut BTreeSet<Id>, id: Id) -> Result<()> {
    if id >= module.id_bound() {
        return Err(
            ErrorKind::MalformedModule(format!("id %{} exceeds the module id bound", id)).into(),
        );
    }
    if !defined.insert(id) {
        return Err(
            ErrorKind::MalformedModule(format!("id %{} is defined more than once", id)).into(),
        );
    }
    Ok(())
}

fn collect_defined_ids(module: &Module) -> Result<BTreeSet<Id>> {
    let mut defined = BTreeSet::new();

    for global in module.globals() {
        match global.result() {
            Some(result) => define(module, &mut defined, result)?,
            None => {
                return Err(ErrorKind::MalformedModule(
                    "global instruction without result".to_owned(),
                )
                .into());
            }
        }
    }

    for id in module.debug_info().entities().keys() {
        define(module, &mut defined, *id)?;
    }

    for function in module.functions() {
        define(module, &mut defined, function.id())?;
        for parameter in function.parameters() {
            define(module, &mut defined, parameter.id())?;
        }
        for block in function.blocks() {
            define(module, &mut defined, block.label())?;
            for instruction in block.instructions() {
                if let Some(result) = instruction.result() {
                    define(module, &mut defined, result)?;
                }
            }
        }
    }

    Ok(defined)
}

fn validate_block_shape(module: &Module) -> Result<()> {
    for function in module.functions() {
        for block in function.blocks() {
            if !block.terminator().opcode().is_terminator() {
                bail!(ErrorKind::MalformedModule(format!(
                    "block %{} is not terminated",
                    block.label()
                )));
            }
            if let Some(merge) = block.merge() {
                if !merge.opcode().is_merge() {
                    bail!(ErrorKind::MalformedModule(format!(
                        "block %{} declares a non-merge instruction as merge",
                        block.label()
                    )));
                }
                match block.terminator().opcode() {
                    Opcode::Branch | Opcode::BranchConditional => {}
                    _ => bail!(ErrorKind::MalformedModule(format!(
                        "merge declaration of block %{} requires a branching terminator",
                        block.label()
                    ))),
                }
            }
            let mut body_started = false;
            for instruction in block.instructions() {
                let opcode = instruction.opcode();
                if opcode.is_terminator() || opcode.is_merge() {
                    bail!(ErrorKind::MalformedModule(format!(
                        "{} must not appear in the body of block %{}",
                        opcode,
                        block.label()
                    )));
                }
                if opcode == Opcode::Phi {
                    if body_started {
                        bail!(ErrorKind::MalformedModule(format!(
                            "Phi after non-phi instruction in block %{}",
                            block.label()
                        )));
                    }
                } else {
                    body_started = true;
                }
            }
        }
    }
    Ok(())
}

fn check_id(defined: &BTreeSet<Id>, id: Id, role: &str) -> Result<()> {
    if !defined.contains(&id) {
        return Err(
            ErrorKind::MalformedModule(format!("{} references undefined id %{}", role, id)).into(),
        );
    }
    Ok(())
}

fn check_instruction(
    module: &Module,
    defined: &BTreeSet<Id>,
    labels: &BTreeSet<Id>,
    instruction: &Instruction,
) -> Result<()> {
    if let Some(result_type) = instruction.result_type() {
        check_id(defined, result_type, "result type")?;
    }
    for operand in instruction.operands() {
        match operand {
            Operand::Id(id) => check_id(defined, *id, "operand")?,
            Operand::Block(label) => {
                if !labels.contains(label) {
                    bail!(ErrorKind::MalformedModule(format!(
                        "operand references label %{} outside the enclosing function",
                        label
                    )));
                }
            }
            Operand::Literal(_) | Operand::Storage(_) => {}
        }
    }
    if let Some(scope) = instruction.scope() {
        if module.debug_info().entity(scope.lexical_scope()).is_none() {
            bail!(ErrorKind::MalformedModule(format!(
                "scope references undefined debug entity %{}",
                scope.lexical_scope()
            )));
        }
        if let Some(inlined_at) = scope.inlined_at() {
            if module.debug_info().inlined_at(inlined_at).is_none() {
                bail!(ErrorKind::MalformedModule(format!(
                    "scope references %{} which is not an inlining record",
                    inlined_at
                )));
            }
        }
    }
    Ok(())
}

fn validate_references(module: &Module, defined: &BTreeSet<Id>) -> Result<()> {
    for id in module.names().keys() {
        check_id(defined, *id, "name")?;
    }
    for decoration in module.decorations() {
        check_id(defined, decoration.target(), "decoration")?;
    }

    for (id, entity) in module.debug_info().entities() {
        match entity {
            DebugEntity::Function { function, .. } => {
                check_id(defined, *function, "debug function entity")?
            }
            DebugEntity::LexicalBlock { parent, .. } | DebugEntity::LocalVariable { parent, .. } => {
                check_id(defined, *parent, "debug entity parent")?
            }
            DebugEntity::InlinedAt(record) => {
                check_id(defined, record.scope(), "inlining record scope")?;
                if let Some(inlined) = record.inlined() {
                    if module.debug_info().inlined_at(inlined).is_none() {
                        bail!(ErrorKind::MalformedModule(format!(
                            "inlining record %{} chains to %{} which is not an inlining record",
                            id, inlined
                        )));
                    }
                }
            }
        }
    }

    let no_labels = BTreeSet::new();
    for global in module.globals() {
        check_instruction(module, defined, &no_labels, global)?;
    }

    for function in module.functions() {
        check_id(defined, function.return_type(), "function return type")?;
        check_id(defined, function.function_type(), "function type")?;
        for parameter in function.parameters() {
            check_id(defined, parameter.type_id(), "parameter type")?;
        }

        let labels: BTreeSet<Id> = function.blocks().iter().map(|block| block.label()).collect();
        for declaration in function.debug_declarations() {
            check_instruction(module, defined, &labels, declaration)?;
        }
        for block in function.blocks() {
            for instruction in block.instructions() {
                check_instruction(module, defined, &labels, instruction)?;
            }
            if let Some(merge) = block.merge() {
                check_instruction(module, defined, &labels, merge)?;
            }
            check_instruction(module, defined, &labels, block.terminator())?;
        }
    }

    Ok(())
}

fn predecessors(function: &Function) -> BTreeMap<Id, BTreeSet<Id>> {
    let mut predecessors: BTreeMap<Id, BTreeSet<Id>> = BTreeMap::new();
    for block in function.blocks() {
        for successor in block.successor_labels() {
            predecessors.entry(successor).or_default().insert(block.label());
        }
    }
    predecessors
}

fn validate_phi_nodes(module: &Module) -> Result<()> {
    for function in module.functions() {
        let predecessors = predecessors(function);
        for block in function.blocks() {
            let expected = predecessors.get(&block.label()).cloned().unwrap_or_default();
            for instruction in block.instructions() {
                if instruction.opcode() != Opcode::Phi {
                    continue;
                }
                let operands = instruction.operands();
                if operands.len() % 2 != 0 {
                    bail!(ErrorKind::MalformedModule(format!(
                        "Phi in block %{} has an unpaired operand",
                        block.label()
                    )));
                }
                let mut incoming = BTreeSet::new();
                for pair in operands.chunks_exact(2) {
                    match pair {
                        [Operand::Id(_), Operand::Block(predecessor)] => {
                            if !incoming.insert(*predecessor) {
                                bail!(ErrorKind::MalformedModule(format!(
                                    "Phi in block %{} lists predecessor %{} twice",
                                    block.label(),
                                    predecessor
                                )));
                            }
                        }
                        _ => bail!(ErrorKind::MalformedModule(format!(
                            "Phi in block %{} has malformed incoming pairs",
                            block.label()
                        ))),
                    }
                }
                if incoming != expected {
                    bail!(ErrorKind::MalformedModule(format!(
                        "Phi in block %{} does not cover its predecessors",
                        block.label()
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_loop_headers(module: &Module) -> Result<()> {
    for function in module.functions() {
        let mut continue_targets = BTreeSet::new();
        for block in function.blocks() {
            let merge = match block.merge() {
                Some(merge) if merge.opcode() == Opcode::LoopMerge => merge,
                _ => continue,
            };
            let merge_target = merge.operands().get(0).and_then(Operand::block);
            let continue_target = merge.operands().get(1).and_then(Operand::block);
            match (merge_target, continue_target) {
                (Some(merge_target), Some(continue_target)) => {
                    if merge_target == continue_target {
                        bail!(ErrorKind::MalformedModule(format!(
                            "loop header %{} declares the same merge and continue target",
                            block.label()
                        )));
                    }
                    if !continue_targets.insert(continue_target) {
                        bail!(ErrorKind::MalformedModule(format!(
                            "continue target %{} serves more than one loop",
                            continue_target
                        )));
                    }
                }
                _ => bail!(ErrorKind::MalformedModule(format!(
                    "loop header %{} lacks merge or continue target",
                    block.label()
                ))),
            }
        }
    }
    Ok(())
}
