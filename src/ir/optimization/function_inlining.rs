//! Function Call Inlining
//!
//! Replaces calls to module functions with a copy of the callee's body,
//! repeatedly, until no eligible call site remains. Recursive functions,
//! declarations and callees that return from inside a loop are left alone.
//! Callees that return from inside another construct are wrapped in a
//! single-trip loop so that every early return becomes a branch to the
//! loop merge.

use crate::error::{ErrorKind, Result};
use crate::ir::analysis::{CallGraph, StructuredControlFlow};
use crate::ir::optimization::{Optimization, OptimizationResult};
use crate::ir::{
    Block, DebugScope, Function, Id, Instruction, Module, Opcode, Operand, StorageClass,
};
use std::collections::{BTreeMap, BTreeSet};

pub struct FunctionInlining {}

impl FunctionInlining {
    pub fn new() -> Self {
        Self {}
    }
}

impl Optimization for FunctionInlining {
    /// Inlines all eligible call sites of all functions, in module order.
    fn optimize(&self, module: &mut Module) -> Result<OptimizationResult> {
        let recursive = CallGraph::new(module).recursive_functions();
        let mut profiles = CalleeProfiles::new();
        let mut changed = false;

        for function_index in 0..module.functions().len() {
            let function_id = module.functions()[function_index].id();
            if inline_function(module, function_index, &recursive, &mut profiles)? {
                changed = true;
            }
            // The function body just changed, cached facts about it are stale.
            profiles.remove(&function_id);
        }

        if changed {
            Ok(OptimizationResult::Changed)
        } else {
            Ok(OptimizationResult::Unchanged)
        }
    }
}

/// Eligibility facts about a callee, valid until the callee is modified.
#[derive(Clone, Copy)]
struct CalleeProfile {
    inlinable: bool,
    early_return: bool,
    contains_kill: bool,
}

type CalleeProfiles = BTreeMap<Id, CalleeProfile>;

impl CalleeProfile {
    fn new(callee: &Function) -> Self {
        if callee.is_declaration() {
            return Self {
                inlinable: false,
                early_return: false,
                contains_kill: false,
            };
        }

        let flow = StructuredControlFlow::new(callee);
        let mut early_return = false;
        let mut return_in_loop = false;
        let mut contains_kill = false;
        for block in callee.blocks() {
            let opcode = block.terminator().opcode();
            if opcode.is_return() {
                if flow.is_in_construct(block.label()) {
                    early_return = true;
                }
                if flow.is_in_loop(block.label()) {
                    return_in_loop = true;
                }
            }
            if opcode.is_kill() {
                contains_kill = true;
            }
        }

        Self {
            inlinable: !return_in_loop,
            early_return,
            contains_kill,
        }
    }
}

struct CallSite {
    call_index: usize,
    callee: Id,
    early_return: bool,
}

fn inline_function(
    module: &mut Module,
    function_index: usize,
    recursive: &BTreeSet<Id>,
    profiles: &mut CalleeProfiles,
) -> Result<bool> {
    let mut changed = false;
    let mut block_index = 0;
    while block_index < module.functions()[function_index].blocks().len() {
        match find_eligible_call(module, function_index, block_index, recursive, profiles)? {
            Some(site) => {
                let callee = module
                    .function(site.callee)
                    .ok_or_else(|| {
                        ErrorKind::MalformedModule(format!(
                            "call to unknown function %{}",
                            site.callee
                        ))
                    })?
                    .clone();
                let mut function = module.functions_mut().remove(function_index);
                let result = inline_call(
                    module,
                    &mut function,
                    block_index,
                    site.call_index,
                    &callee,
                    site.early_return,
                );
                module.functions_mut().insert(function_index, function);
                result?;
                changed = true;
                // The spliced body may contain further calls, rescan the block.
            }
            None => block_index += 1,
        }
    }
    Ok(changed)
}

fn find_eligible_call(
    module: &Module,
    function_index: usize,
    block_index: usize,
    recursive: &BTreeSet<Id>,
    profiles: &mut CalleeProfiles,
) -> Result<Option<CallSite>> {
    let function = &module.functions()[function_index];
    let block = &function.blocks()[block_index];
    let mut caller_flow: Option<StructuredControlFlow> = None;

    for (call_index, instruction) in block.instructions().iter().enumerate() {
        if instruction.opcode() != Opcode::FunctionCall {
            continue;
        }
        let callee_id = instruction.call_target().ok_or_else(|| {
            ErrorKind::MalformedModule("call without callee operand".to_owned())
        })?;
        let callee = module.function(callee_id).ok_or_else(|| {
            ErrorKind::MalformedModule(format!("call to unknown function %{}", callee_id))
        })?;
        let arguments = instruction
            .call_arguments()
            .ok_or_else(|| ErrorKind::MalformedModule("call with non-id argument".to_owned()))?;
        if arguments.len() != callee.parameters().len() {
            bail!(ErrorKind::MalformedModule(format!(
                "call to %{} passes {} arguments but the function takes {}",
                callee_id,
                arguments.len(),
                callee.parameters().len()
            )));
        }
        if !module.is_void_type(callee.return_type()) && instruction.result().is_none() {
            bail!(ErrorKind::MalformedModule(format!(
                "call to non-void function %{} without result",
                callee_id
            )));
        }

        if recursive.contains(&callee_id) {
            continue;
        }
        let profile = *profiles
            .entry(callee_id)
            .or_insert_with(|| CalleeProfile::new(callee));
        if !profile.inlinable {
            continue;
        }
        if profile.contains_kill {
            // A kill must not end up inside a continue construct.
            let flow = caller_flow.get_or_insert_with(|| StructuredControlFlow::new(function));
            if flow.is_in_continue_construct(block.label()) {
                continue;
            }
        }

        return Ok(Some(CallSite {
            call_index,
            callee: callee_id,
            early_return: profile.early_return,
        }));
    }

    Ok(None)
}

struct Wrapper {
    header: Id,
    merge: Id,
    continue_target: Id,
    false_constant: Id,
}

fn inline_call(
    module: &mut Module,
    function: &mut Function,
    block_index: usize,
    call_index: usize,
    callee: &Function,
    early_return: bool,
) -> Result<()> {
    let mut first_half = function.blocks_mut().remove(block_index);
    let b_label = first_half.label();

    // Producers of block-local results ahead of the call. If the call splits
    // the block, uses behind the split need freshly emitted copies.
    let mut same_block_templates: BTreeMap<Id, Instruction> = BTreeMap::new();
    for instruction in first_half.instructions().iter().take(call_index) {
        if instruction.opcode().is_same_block_op() {
            if let Some(result) = instruction.result() {
                same_block_templates.insert(result, instruction.clone());
            }
        }
    }

    let mut post_call = first_half.split_off_instructions_at(call_index)?;
    if post_call.is_empty() {
        return Err(ErrorKind::Analysis("call site index out of bounds".to_owned()).into());
    }
    let call = post_call.remove(0);

    let mut b_merge = first_half.take_merge();
    let mut b_terminator = first_half.take_terminator();
    let b_successor_labels: Vec<Id> = b_terminator
        .operands()
        .iter()
        .filter_map(Operand::block)
        .collect();

    let arguments = call
        .call_arguments()
        .ok_or_else(|| ErrorKind::MalformedModule("call with non-id argument".to_owned()))?;
    let returns_value = !module.is_void_type(callee.return_type());
    let call_result = call.result();

    let callee_entry = callee
        .entry()
        .ok_or_else(|| ErrorKind::Analysis(format!("function %{} has no body", callee.id())))?;

    let mut ctx = InlineContext::new(module, callee, &arguments, &call)?;

    // Callee locals move to the caller's entry block. Initializers become
    // explicit stores at the top of the inlined body.
    let mut hoisted: Vec<Instruction> = Vec::new();
    let mut initializer_stores: Vec<Instruction> = Vec::new();
    for instruction in callee_entry.instructions() {
        if instruction.opcode() != Opcode::Variable {
            continue;
        }
        let mut variable = ctx.clone_instruction(module, instruction)?;
        if let Some(initializer) = variable.take_variable_initializer() {
            let pointer = variable.result().ok_or_else(|| {
                ErrorKind::MalformedModule("variable without result".to_owned())
            })?;
            let mut store = Instruction::store(pointer, initializer);
            store.set_scope(variable.scope());
            store.set_line(variable.line());
            initializer_stores.push(store);
        }
        hoisted.push(variable);
    }

    let return_variable = if returns_value {
        let pointer_type = module.function_pointer_type(callee.return_type())?;
        let variable = module.fresh_id()?;
        module.clone_decorations(callee.id(), variable);
        hoisted.push(Instruction::variable(
            variable,
            pointer_type,
            StorageClass::Function,
            None,
        ));
        Some(variable)
    } else {
        None
    };

    let wrapper = if early_return {
        let header = module.fresh_id()?;
        let merge = module.fresh_id()?;
        let continue_target = module.fresh_id()?;
        let false_constant = module.false_constant()?;
        Some(Wrapper {
            header,
            merge,
            continue_target,
            false_constant,
        })
    } else {
        None
    };

    let b_is_loop_header = b_merge
        .as_ref()
        .map_or(false, |merge| merge.opcode() == Opcode::LoopMerge);
    let needs_fresh_entry =
        wrapper.is_some() || (b_is_loop_header && callee_entry.merge().is_some());

    let mut replacement: Vec<Block> = Vec::new();
    let mut carried_merge: Option<Instruction> = None;
    let mut back_half_label: Option<Id> = None;
    let mut open_tail: Option<Block> = None;

    let mut entry_receptacle = if needs_fresh_entry {
        let fresh = module.fresh_id()?;
        ctx.map_label(callee_entry.label(), fresh);
        let target = match &wrapper {
            Some(wrapper) => wrapper.header,
            None => fresh,
        };
        first_half.branch(target);
        finish_block(
            &mut replacement,
            first_half,
            b_label,
            &mut b_merge,
            &mut carried_merge,
        );
        if let Some(wrapper) = &wrapper {
            let mut header = Block::new(wrapper.header);
            header.loop_merge(wrapper.merge, wrapper.continue_target);
            header.branch(fresh);
            replacement.push(header);
        }
        Some(Block::new(fresh))
    } else {
        ctx.map_label(callee_entry.label(), b_label);
        Some(first_half)
    };

    let block_count = callee.blocks().len();
    for (index, callee_block) in callee.blocks().iter().enumerate() {
        let is_last = index + 1 == block_count;
        let mut current = match entry_receptacle.take() {
            Some(block) => block,
            None => {
                let label = ctx.map_id(module, callee_block.label())?;
                Block::new(label)
            }
        };

        if index == 0 {
            for declaration in callee.debug_declarations() {
                let clone = ctx.clone_instruction(module, declaration)?;
                current.add_instruction(clone);
            }
            for store in initializer_stores.drain(..) {
                current.add_instruction(store);
            }
        }

        for instruction in callee_block.instructions() {
            if index == 0 && instruction.opcode() == Opcode::Variable {
                continue;
            }
            let clone = ctx.clone_instruction(module, instruction)?;
            current.add_instruction(clone);
        }

        if let Some(merge) = callee_block.merge() {
            let clone = ctx.clone_instruction(module, merge)?;
            current.set_merge(clone);
        }

        let terminator = callee_block.terminator();
        match terminator.opcode() {
            Opcode::Return | Opcode::ReturnValue => {
                if terminator.opcode() == Opcode::ReturnValue {
                    let value = terminator
                        .operands()
                        .first()
                        .and_then(Operand::id)
                        .ok_or_else(|| {
                            ErrorKind::MalformedModule("ReturnValue without value".to_owned())
                        })?;
                    let variable = return_variable.ok_or_else(|| {
                        ErrorKind::MalformedModule(format!(
                            "function %{} returns a value but has a void return type",
                            callee.id()
                        ))
                    })?;
                    let value = ctx.map_id(module, value)?;
                    let mut store = Instruction::store(variable, value);
                    store.set_scope(ctx.inlined_body_scope(module)?);
                    store.set_line(terminator.line());
                    current.add_instruction(store);
                }
                let target = match &wrapper {
                    Some(wrapper) => Some(wrapper.merge),
                    None if !is_last => {
                        let label = match back_half_label {
                            Some(label) => label,
                            None => {
                                let fresh = module.fresh_id()?;
                                back_half_label = Some(fresh);
                                fresh
                            }
                        };
                        Some(label)
                    }
                    None => back_half_label,
                };
                match target {
                    Some(target) => {
                        current.branch(target);
                        finish_block(
                            &mut replacement,
                            current,
                            b_label,
                            &mut b_merge,
                            &mut carried_merge,
                        );
                    }
                    None => open_tail = Some(current),
                }
            }
            Opcode::Branch
            | Opcode::BranchConditional
            | Opcode::Kill
            | Opcode::TerminateInvocation
            | Opcode::Unreachable => {
                let clone = ctx.clone_instruction(module, terminator)?;
                current.set_terminator(clone);
                finish_block(
                    &mut replacement,
                    current,
                    b_label,
                    &mut b_merge,
                    &mut carried_merge,
                );
            }
            _ => bail!(ErrorKind::MalformedModule(format!(
                "block %{} of function %{} is not terminated",
                callee_block.label(),
                callee.id()
            ))),
        }
    }

    if let Some(wrapper) = &wrapper {
        let mut continue_block = Block::new(wrapper.continue_target);
        continue_block.branch_conditional(wrapper.false_constant, wrapper.header, wrapper.merge);
        replacement.push(continue_block);
    }

    let mut tail = match open_tail {
        Some(block) => block,
        None => {
            let label = match (&wrapper, back_half_label) {
                (Some(wrapper), _) => wrapper.merge,
                (None, Some(label)) => label,
                (None, None) => module.fresh_id()?,
            };
            Block::new(label)
        }
    };
    let split = tail.label() != b_label;

    if let Some(variable) = return_variable {
        let result = call_result.ok_or_else(|| {
            ErrorKind::MalformedModule("call to non-void function without result".to_owned())
        })?;
        let mut load = Instruction::load(result, callee.return_type(), variable);
        load.set_scope(ctx.inlined_body_scope(module)?);
        load.set_line(call.line());
        tail.add_instruction(load);
    }

    if split {
        let mut duplicates: Vec<Instruction> = Vec::new();
        let mut duplicate_ids: BTreeMap<Id, Id> = BTreeMap::new();
        for instruction in post_call.iter_mut() {
            rewrite_same_block_uses(
                module,
                &same_block_templates,
                &mut duplicate_ids,
                &mut duplicates,
                instruction,
            )?;
        }
        rewrite_same_block_uses(
            module,
            &same_block_templates,
            &mut duplicate_ids,
            &mut duplicates,
            &mut b_terminator,
        )?;
        for duplicate in duplicates {
            tail.add_instruction(duplicate);
        }
    }

    tail.instructions_mut().extend(post_call);
    if let Some(merge) = carried_merge.take().or_else(|| b_merge.take()) {
        tail.set_merge(merge);
    }
    tail.set_terminator(b_terminator);

    let tail_label = tail.label();
    replacement.push(tail);
    function
        .blocks_mut()
        .splice(block_index..block_index, replacement);

    if split {
        for successor in b_successor_labels {
            if let Some(block) = function.block_mut(successor) {
                for instruction in block.instructions_mut() {
                    if instruction.opcode() != Opcode::Phi {
                        continue;
                    }
                    for operand in instruction.operands_mut() {
                        if let Operand::Block(label) = operand {
                            if *label == b_label {
                                *label = tail_label;
                            }
                        }
                    }
                }
            }
        }
    }

    if !hoisted.is_empty() {
        if let Some(entry) = function.entry_mut() {
            entry.instructions_mut().splice(0..0, hoisted);
        }
    }

    if return_variable.is_none() {
        if let Some(result) = call_result {
            module.remove_name(result);
            module.remove_decorations(result);
        }
    }

    Ok(())
}

/// Pushes a finished block. The call block's merge declaration stays with it
/// only while it still ends in a branch and declares a loop, otherwise the
/// declaration travels to the block that receives the original terminator.
fn finish_block(
    replacement: &mut Vec<Block>,
    mut block: Block,
    b_label: Id,
    b_merge: &mut Option<Instruction>,
    carried_merge: &mut Option<Instruction>,
) {
    if block.label() == b_label {
        if let Some(merge) = b_merge.take() {
            let ends_in_branch = matches!(
                block.terminator().opcode(),
                Opcode::Branch | Opcode::BranchConditional
            );
            if merge.opcode() == Opcode::LoopMerge && ends_in_branch {
                block.set_merge(merge);
            } else {
                *carried_merge = Some(merge);
            }
        }
    }
    replacement.push(block);
}

struct InlineContext {
    callee_id: Id,
    callee_ids: BTreeSet<Id>,
    mapping: BTreeMap<Id, Id>,
    rebuilder: InlinedAtRebuilder,
}

impl InlineContext {
    fn new(
        module: &Module,
        callee: &Function,
        arguments: &[Id],
        call: &Instruction,
    ) -> Result<Self> {
        let mut callee_ids = BTreeSet::new();
        for parameter in callee.parameters() {
            callee_ids.insert(parameter.id());
        }
        for block in callee.blocks() {
            callee_ids.insert(block.label());
            for instruction in block.instructions() {
                if let Some(result) = instruction.result() {
                    callee_ids.insert(result);
                }
            }
        }

        if arguments.len() != callee.parameters().len() {
            bail!(ErrorKind::MalformedModule(format!(
                "call to %{} passes {} arguments but the function takes {}",
                callee.id(),
                arguments.len(),
                callee.parameters().len()
            )));
        }
        let mut mapping = BTreeMap::new();
        for (parameter, argument) in callee.parameters().iter().zip(arguments) {
            mapping.insert(parameter.id(), *argument);
        }

        Ok(Self {
            callee_id: callee.id(),
            callee_ids,
            mapping,
            rebuilder: InlinedAtRebuilder::new(module, call),
        })
    }

    fn map_label(&mut self, label: Id, target: Id) {
        self.mapping.insert(label, target);
    }

    /// Ids defined by the callee map to fresh ids, everything else passes
    /// through. Fresh ids take over the decorations of their originals.
    fn map_id(&mut self, module: &mut Module, id: Id) -> Result<Id> {
        if let Some(mapped) = self.mapping.get(&id) {
            return Ok(*mapped);
        }
        if !self.callee_ids.contains(&id) {
            return Ok(id);
        }
        let fresh = module.fresh_id()?;
        module.clone_decorations(id, fresh);
        self.mapping.insert(id, fresh);
        Ok(fresh)
    }

    fn clone_instruction(
        &mut self,
        module: &mut Module,
        instruction: &Instruction,
    ) -> Result<Instruction> {
        let mut clone = instruction.clone();
        for operand in clone.operands_mut() {
            match operand {
                Operand::Id(id) => *id = self.map_id(module, *id)?,
                Operand::Block(label) => *label = self.map_id(module, *label)?,
                Operand::Literal(_) | Operand::Storage(_) => {}
            }
        }
        if let Some(result) = instruction.result() {
            clone.set_result(Some(self.map_id(module, result)?));
        }
        let scope = self.rebuild_scope(module, instruction.scope())?;
        clone.set_scope(scope);
        Ok(clone)
    }

    fn rebuild_scope(
        &mut self,
        module: &mut Module,
        scope: Option<DebugScope>,
    ) -> Result<Option<DebugScope>> {
        match scope {
            Some(scope) if self.rebuilder.active => {
                let inlined = self.rebuilder.rebuild(module, scope.inlined_at())?;
                Ok(Some(DebugScope::new(scope.lexical_scope(), Some(inlined))))
            }
            other => Ok(other),
        }
    }

    /// The scope for the return value plumbing, attributing the stores and
    /// the load to the callee at this call site.
    fn inlined_body_scope(&mut self, module: &mut Module) -> Result<Option<DebugScope>> {
        if !self.rebuilder.active {
            return Ok(None);
        }
        match module.debug_info().function_entity(self.callee_id) {
            Some(entity) => {
                let inlined = self.rebuilder.rebuild(module, None)?;
                Ok(Some(DebugScope::new(entity, Some(inlined))))
            }
            None => Ok(None),
        }
    }
}

/// Rebuilds inlining chains for one call site.
///
/// Cloned instructions keep their lexical scope. Their inlining chain gets
/// one new base record for this call site appended, which requires cloning
/// every link of the original chain. Chains are shared within a call site
/// but never across call sites.
struct InlinedAtRebuilder {
    active: bool,
    line: u32,
    scope: Id,
    inlined: Option<Id>,
    memo: BTreeMap<Option<Id>, Id>,
}

impl InlinedAtRebuilder {
    fn new(module: &Module, call: &Instruction) -> Self {
        match call.scope() {
            Some(scope) => {
                let line = call
                    .line()
                    .map(|location| location.line())
                    .or_else(|| module.debug_info().entity_line(scope.lexical_scope()))
                    .unwrap_or(0);
                Self {
                    active: true,
                    line,
                    scope: scope.lexical_scope(),
                    inlined: scope.inlined_at(),
                    memo: BTreeMap::new(),
                }
            }
            None => Self {
                active: false,
                line: 0,
                scope: 0,
                inlined: None,
                memo: BTreeMap::new(),
            },
        }
    }

    fn rebuild(&mut self, module: &mut Module, original: Option<Id>) -> Result<Id> {
        if let Some(rebuilt) = self.memo.get(&original) {
            return Ok(*rebuilt);
        }
        let rebuilt = match original {
            None => module.add_debug_inlined_at(self.line, self.scope, self.inlined)?,
            Some(id) => {
                // The base record comes first so that record ids follow the
                // chain from its head to its tail.
                self.rebuild(module, None)?;
                let record = *module.debug_info().inlined_at(id).ok_or_else(|| {
                    ErrorKind::MalformedModule(format!("%{} is not an inlining record", id))
                })?;
                let clone = module.add_debug_inlined_at(record.line(), record.scope(), None)?;
                let parent = self.rebuild(module, record.inlined())?;
                module.debug_info_mut().set_inlined_parent(clone, Some(parent));
                clone
            }
        };
        self.memo.insert(original, rebuilt);
        Ok(rebuilt)
    }
}

fn rewrite_same_block_uses(
    module: &mut Module,
    templates: &BTreeMap<Id, Instruction>,
    duplicate_ids: &mut BTreeMap<Id, Id>,
    duplicates: &mut Vec<Instruction>,
    instruction: &mut Instruction,
) -> Result<()> {
    for operand in instruction.operands_mut() {
        if let Operand::Id(id) = operand {
            if let Some(replacement) =
                ensure_duplicate(module, templates, duplicate_ids, duplicates, *id)?
            {
                *id = replacement;
            }
        }
    }
    Ok(())
}

/// Re-emits the producer of a block-local result, and transitively the
/// producers it depends on, in dependency order. Each producer is duplicated
/// at most once.
fn ensure_duplicate(
    module: &mut Module,
    templates: &BTreeMap<Id, Instruction>,
    duplicate_ids: &mut BTreeMap<Id, Id>,
    duplicates: &mut Vec<Instruction>,
    id: Id,
) -> Result<Option<Id>> {
    if let Some(duplicate) = duplicate_ids.get(&id) {
        return Ok(Some(*duplicate));
    }
    let mut duplicate = match templates.get(&id) {
        Some(template) => template.clone(),
        None => return Ok(None),
    };
    for operand in duplicate.operands_mut() {
        if let Operand::Id(id) = operand {
            if let Some(replacement) =
                ensure_duplicate(module, templates, duplicate_ids, duplicates, *id)?
            {
                *id = replacement;
            }
        }
    }
    let fresh = module.fresh_id()?;
    duplicate.set_result(Some(fresh));
    duplicates.push(duplicate);
    duplicate_ids.insert(id, fresh);
    Ok(Some(fresh))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        DebugEntity, Decoration, DecorationKind, InlinedAtRecord, SourceLocation,
    };
    use crate::util::Validate;

    fn inline(module: &mut Module) -> OptimizationResult {
        FunctionInlining::new().optimize(module).unwrap()
    }

    #[test]
    fn test_single_block_callee_should_be_spliced_in_place() {
        // GIVEN
        // %10 : %12 { %13 = Load %11; ReturnValue %13 }
        // %20 : %21 { %22 = Variable; %23 = call %10(%22); Store %22 %23; Return }
        let mut module = Module::new();
        module.add_global(Instruction::type_float(1, 32));
        module.add_global(Instruction::type_pointer(2, StorageClass::Function, 1));
        module.add_global(Instruction::type_function(3, 1, &[2]));
        module.add_global(Instruction::type_void(4));
        module.add_global(Instruction::type_function(5, 4, &[]));

        let mut callee = Function::new(10, 1, 3);
        callee.add_parameter(11, 2);
        let body = callee.new_block(12);
        body.load(13, 1, 11);
        body.return_value(13);
        module.add_function(callee);

        let mut caller = Function::new(20, 4, 5);
        let block = caller.new_block(21);
        block.variable(22, 2, StorageClass::Function, None);
        block.call(23, 1, 10, &[22]);
        block.store(22, 23);
        block.return_();
        module.add_function(caller);

        // WHEN
        let result = inline(&mut module);

        // THEN
        // %20 : %21 { %24 = Variable; %22 = Variable; %25 = Load %22;
        //             Store %24 %25; %23 = Load %24; Store %22 %23; Return }
        assert_eq!(result, OptimizationResult::Changed);

        let expected = {
            let mut caller = Function::new(20, 4, 5);
            let block = caller.new_block(21);
            block.variable(24, 2, StorageClass::Function, None);
            block.variable(22, 2, StorageClass::Function, None);
            block.load(25, 1, 22);
            block.store(24, 25);
            block.load(23, 1, 24);
            block.store(22, 23);
            block.return_();
            caller
        };
        assert_eq!(module.function(20), Some(&expected));
        assert_eq!(module.function(10).unwrap().blocks().len(), 1);
        assert!(module.validate().is_ok());
    }

    #[test]
    fn test_an_accessor_callee_should_inline_to_its_access_chains() {
        // GIVEN
        // %15 sums both components of a vec2 behind a pointer.
        let mut module = Module::new();
        module.add_global(Instruction::type_float(1, 32));
        module.add_global(Instruction::type_vector(2, 1, 2));
        module.add_global(Instruction::type_pointer(3, StorageClass::Function, 2));
        module.add_global(Instruction::type_pointer(4, StorageClass::Function, 1));
        module.add_global(Instruction::type_function(5, 1, &[3]));
        module.add_global(Instruction::type_void(6));
        module.add_global(Instruction::type_function(7, 6, &[]));
        module.add_global(Instruction::type_int(8, 32, false));
        module.add_global(Instruction::constant(9, 8, 0));
        module.add_global(Instruction::constant(10, 8, 1));

        let mut callee = Function::new(15, 1, 5);
        callee.add_parameter(16, 3);
        let body = callee.new_block(17);
        body.access_chain(18, 4, 16, &[9]);
        body.load(19, 1, 18);
        body.access_chain(20, 4, 16, &[10]);
        body.load(21, 1, 20);
        body.f_add(22, 1, 19, 21);
        body.return_value(22);
        module.add_function(callee);

        let mut caller = Function::new(25, 6, 7);
        let block = caller.new_block(26);
        block.variable(27, 3, StorageClass::Function, None);
        block.variable(28, 4, StorageClass::Function, None);
        block.call(29, 1, 15, &[27]);
        block.store(28, 29);
        block.return_();
        module.add_function(caller);
        module.set_name(29, "sum");

        // WHEN
        let result = inline(&mut module);

        // THEN
        // The chains and loads survive on the argument pointer, the sum is
        // stored to a fresh return variable and reloaded as %29.
        assert_eq!(result, OptimizationResult::Changed);

        let expected = {
            let mut caller = Function::new(25, 6, 7);
            let block = caller.new_block(26);
            block.variable(30, 4, StorageClass::Function, None);
            block.variable(27, 3, StorageClass::Function, None);
            block.variable(28, 4, StorageClass::Function, None);
            block.access_chain(31, 4, 27, &[9]);
            block.load(32, 1, 31);
            block.access_chain(33, 4, 27, &[10]);
            block.load(34, 1, 33);
            block.f_add(35, 1, 32, 34);
            block.store(30, 35);
            block.load(29, 1, 30);
            block.store(28, 29);
            block.return_();
            caller
        };
        assert_eq!(module.function(25), Some(&expected));
        assert_eq!(module.name(29), Some("sum"));
        assert!(module.validate().is_ok());
    }

    #[test]
    fn test_void_call_result_should_lose_name_and_decorations() {
        // GIVEN
        let mut module = Module::new();
        module.add_global(Instruction::type_void(1));
        module.add_global(Instruction::type_function(2, 1, &[]));

        let mut callee = Function::new(10, 1, 2);
        callee.new_block(11).return_();
        module.add_function(callee);

        let mut caller = Function::new(20, 1, 2);
        let block = caller.new_block(21);
        block.call(22, 1, 10, &[]);
        block.return_();
        module.add_function(caller);
        module.set_name(22, "tmp");
        module.add_decoration(Decoration::new(22, DecorationKind::RelaxedPrecision, vec![]));

        // WHEN
        inline(&mut module);

        // THEN
        let caller = module.function(20).unwrap();
        assert!(caller.blocks()[0].is_empty());
        assert_eq!(caller.blocks()[0].terminator().opcode(), Opcode::Return);
        assert_eq!(module.name(22), None);
        assert!(module.decorations_of(22).is_empty());
    }

    #[test]
    fn test_middle_return_should_branch_to_a_lazily_created_back_half() {
        // GIVEN
        // %10 : %11 { Branch %12 }
        //       %12 { ReturnValue %5 }
        //       %13 { ReturnValue %6 }    (unreachable)
        // %20 : %21 { %22 = call %10(); Return }
        let mut module = Module::new();
        module.add_global(Instruction::type_int(1, 32, true));
        module.add_global(Instruction::type_function(2, 1, &[]));
        module.add_global(Instruction::type_void(3));
        module.add_global(Instruction::type_function(4, 3, &[]));
        module.add_global(Instruction::constant(5, 1, 7));
        module.add_global(Instruction::constant(6, 1, 9));

        let mut callee = Function::new(10, 1, 2);
        callee.new_block(11).branch(12);
        callee.new_block(12).return_value(5);
        callee.new_block(13).return_value(6);
        module.add_function(callee);

        let mut caller = Function::new(20, 3, 4);
        let block = caller.new_block(21);
        block.call(22, 1, 10, &[]);
        block.return_();
        module.add_function(caller);

        // WHEN
        inline(&mut module);

        // THEN
        // %21 { %24 = Variable; Branch %25 }
        // %25 { Store %24 %5; Branch %26 }
        // %27 { Store %24 %6; Branch %26 }
        // %26 { %22 = Load %24; Return }
        let caller = module.function(20).unwrap();
        let labels: Vec<Id> = caller.blocks().iter().map(Block::label).collect();
        assert_eq!(labels, vec![21, 25, 27, 26]);

        let entry = caller.block(21).unwrap();
        assert_eq!(
            entry.instructions(),
            &vec![Instruction::variable(24, 23, StorageClass::Function, None)]
        );
        assert_eq!(entry.terminator(), &Instruction::branch(25));

        let first_return = caller.block(25).unwrap();
        assert_eq!(first_return.instructions(), &vec![Instruction::store(24, 5)]);
        assert_eq!(first_return.terminator(), &Instruction::branch(26));

        let second_return = caller.block(27).unwrap();
        assert_eq!(second_return.instructions(), &vec![Instruction::store(24, 6)]);
        assert_eq!(second_return.terminator(), &Instruction::branch(26));

        let back_half = caller.block(26).unwrap();
        assert_eq!(back_half.instructions(), &vec![Instruction::load(22, 1, 24)]);
        assert_eq!(back_half.terminator(), &Instruction::return_());

        // The pointer type for the return variable was created on demand.
        assert_eq!(
            module.global(23),
            Some(&Instruction::type_pointer(23, StorageClass::Function, 1))
        );
        assert!(module.validate().is_ok());
    }

    #[test]
    fn test_early_return_inside_a_construct_should_wrap_the_body_in_a_loop() {
        // GIVEN
        // %10 : %11 { SelectionMerge %14; BranchConditional %4 %12 %13 }
        //       %12 { Return }
        //       %13 { Branch %14 }
        //       %14 { Return }
        // %20 : %21 { %22 = call %10(); Return }
        let mut module = Module::new();
        module.add_global(Instruction::type_void(1));
        module.add_global(Instruction::type_function(2, 1, &[]));
        module.add_global(Instruction::type_bool(3));
        module.add_global(Instruction::constant_true(4, 3));

        let mut callee = Function::new(10, 1, 2);
        let header = callee.new_block(11);
        header.selection_merge(14);
        header.branch_conditional(4, 12, 13);
        callee.new_block(12).return_();
        callee.new_block(13).branch(14);
        callee.new_block(14).return_();
        module.add_function(callee);

        let mut caller = Function::new(20, 1, 2);
        let block = caller.new_block(21);
        block.call(22, 1, 10, &[]);
        block.return_();
        module.add_function(caller);

        // WHEN
        inline(&mut module);

        // THEN
        // %21 { Branch %23 }
        // %23 { LoopMerge %24 %25; Branch %27 }
        // %27 { SelectionMerge %28; BranchConditional %4 %29 %30 }
        // %29 { Branch %24 }
        // %30 { Branch %28 }
        // %28 { Branch %24 }
        // %25 { BranchConditional %26 %23 %24 }
        // %24 { Return }
        let caller = module.function(20).unwrap();
        let labels: Vec<Id> = caller.blocks().iter().map(Block::label).collect();
        assert_eq!(labels, vec![21, 23, 27, 29, 30, 28, 25, 24]);

        assert_eq!(caller.block(21).unwrap().terminator(), &Instruction::branch(23));

        let wrapper_header = caller.block(23).unwrap();
        assert_eq!(wrapper_header.merge(), Some(&Instruction::loop_merge(24, 25)));
        assert_eq!(wrapper_header.terminator(), &Instruction::branch(27));

        let body_header = caller.block(27).unwrap();
        assert_eq!(body_header.merge(), Some(&Instruction::selection_merge(28)));
        assert_eq!(
            body_header.terminator(),
            &Instruction::branch_conditional(4, 29, 30)
        );

        assert_eq!(caller.block(29).unwrap().terminator(), &Instruction::branch(24));
        assert_eq!(caller.block(30).unwrap().terminator(), &Instruction::branch(28));
        assert_eq!(caller.block(28).unwrap().terminator(), &Instruction::branch(24));

        let continue_block = caller.block(25).unwrap();
        assert_eq!(
            continue_block.terminator(),
            &Instruction::branch_conditional(26, 23, 24)
        );

        assert_eq!(caller.block(24).unwrap().terminator(), &Instruction::return_());

        // The false constant was created on demand, reusing the bool type.
        assert_eq!(module.global(26), Some(&Instruction::constant_false(26, 3)));
        assert!(module.validate().is_ok());
    }

    #[test]
    fn test_loop_merge_should_stay_on_the_call_block_while_it_branches() {
        // GIVEN
        // %20 : %21 { Branch %22 }
        //       %22 { %25 = call %10(); LoopMerge %26 %24; BranchConditional %4 %23 %26 }
        //       %23 { Branch %24 }
        //       %24 { Branch %22 }
        //       %26 { %27 = Phi [%4 %22]; Return }
        let mut module = Module::new();
        module.add_global(Instruction::type_void(1));
        module.add_global(Instruction::type_function(2, 1, &[]));
        module.add_global(Instruction::type_bool(3));
        module.add_global(Instruction::constant_true(4, 3));

        let mut callee = Function::new(10, 1, 2);
        callee.new_block(11).branch(12);
        callee.new_block(12).return_();
        module.add_function(callee);

        let mut caller = Function::new(20, 1, 2);
        caller.new_block(21).branch(22);
        let header = caller.new_block(22);
        header.call(25, 1, 10, &[]);
        header.loop_merge(26, 24);
        header.branch_conditional(4, 23, 26);
        caller.new_block(23).branch(24);
        caller.new_block(24).branch(22);
        let merge = caller.new_block(26);
        merge.phi(27, 3, &[(4, 22)]);
        merge.return_();
        module.add_function(caller);

        // WHEN
        inline(&mut module);

        // THEN
        // %22 { LoopMerge %26 %24; Branch %28 }
        // %28 { BranchConditional %4 %23 %26 }
        // %26 { %27 = Phi [%4 %28]; Return }
        let caller = module.function(20).unwrap();
        let labels: Vec<Id> = caller.blocks().iter().map(Block::label).collect();
        assert_eq!(labels, vec![21, 22, 28, 23, 24, 26]);

        let header = caller.block(22).unwrap();
        assert_eq!(header.merge(), Some(&Instruction::loop_merge(26, 24)));
        assert_eq!(header.terminator(), &Instruction::branch(28));

        let tail = caller.block(28).unwrap();
        assert!(tail.merge().is_none());
        assert_eq!(tail.terminator(), &Instruction::branch_conditional(4, 23, 26));

        let merge = caller.block(26).unwrap();
        assert_eq!(
            merge.instruction(0),
            Some(&Instruction::phi(27, 3, &[(4, 28)]))
        );
        assert!(module.validate().is_ok());
    }

    #[test]
    fn test_callee_entry_with_merge_should_get_a_fresh_block_under_a_loop_header() {
        // GIVEN
        // %10 : %11 { SelectionMerge %13; BranchConditional %4 %12 %13 }
        //       %12 { Branch %13 }
        //       %13 { Return }
        // %22 is a loop header containing the call.
        let mut module = Module::new();
        module.add_global(Instruction::type_void(1));
        module.add_global(Instruction::type_function(2, 1, &[]));
        module.add_global(Instruction::type_bool(3));
        module.add_global(Instruction::constant_true(4, 3));

        let mut callee = Function::new(10, 1, 2);
        let header = callee.new_block(11);
        header.selection_merge(13);
        header.branch_conditional(4, 12, 13);
        callee.new_block(12).branch(13);
        callee.new_block(13).return_();
        module.add_function(callee);

        let mut caller = Function::new(20, 1, 2);
        caller.new_block(21).branch(22);
        let loop_header = caller.new_block(22);
        loop_header.call(25, 1, 10, &[]);
        loop_header.loop_merge(26, 24);
        loop_header.branch_conditional(4, 23, 26);
        caller.new_block(23).branch(24);
        caller.new_block(24).branch(22);
        caller.new_block(26).return_();
        module.add_function(caller);

        // WHEN
        inline(&mut module);

        // THEN
        // %22 { LoopMerge %26 %24; Branch %27 }
        // %27 { SelectionMerge %28; BranchConditional %4 %29 %28 }
        // %29 { Branch %28 }
        // %28 { BranchConditional %4 %23 %26 }
        let caller = module.function(20).unwrap();
        let labels: Vec<Id> = caller.blocks().iter().map(Block::label).collect();
        assert_eq!(labels, vec![21, 22, 27, 29, 28, 23, 24, 26]);

        let loop_header = caller.block(22).unwrap();
        assert_eq!(loop_header.merge(), Some(&Instruction::loop_merge(26, 24)));
        assert_eq!(loop_header.terminator(), &Instruction::branch(27));

        let entry_clone = caller.block(27).unwrap();
        assert_eq!(entry_clone.merge(), Some(&Instruction::selection_merge(28)));
        assert_eq!(
            entry_clone.terminator(),
            &Instruction::branch_conditional(4, 29, 28)
        );

        let tail = caller.block(28).unwrap();
        assert_eq!(tail.terminator(), &Instruction::branch_conditional(4, 23, 26));
        assert!(module.validate().is_ok());
    }

    #[test]
    fn test_phi_operands_may_reference_results_cloned_later() {
        // GIVEN
        // %10 : %11 { Branch %12 }
        //       %12 { %13 = Phi [%5 %11] [%15 %16]; LoopMerge %17 %16;
        //             BranchConditional %7 %14 %17 }
        //       %14 { %15 = IAdd %13 %6; Branch %16 }
        //       %16 { Branch %12 }
        //       %17 { ReturnValue %13 }
        let mut module = Module::new();
        module.add_global(Instruction::type_int(1, 32, true));
        module.add_global(Instruction::type_bool(2));
        module.add_global(Instruction::type_void(3));
        module.add_global(Instruction::type_function(4, 1, &[]));
        module.add_global(Instruction::constant(5, 1, 0));
        module.add_global(Instruction::constant(6, 1, 1));
        module.add_global(Instruction::constant_true(7, 2));
        module.add_global(Instruction::type_function(8, 3, &[]));

        let mut callee = Function::new(10, 1, 4);
        callee.new_block(11).branch(12);
        let header = callee.new_block(12);
        header.phi(13, 1, &[(5, 11), (15, 16)]);
        header.loop_merge(17, 16);
        header.branch_conditional(7, 14, 17);
        let body = callee.new_block(14);
        body.i_add(15, 1, 13, 6);
        body.branch(16);
        callee.new_block(16).branch(12);
        callee.new_block(17).return_value(13);
        module.add_function(callee);

        let mut caller = Function::new(20, 3, 8);
        let block = caller.new_block(21);
        block.call(22, 1, 10, &[]);
        block.return_();
        module.add_function(caller);

        // WHEN
        inline(&mut module);

        // THEN
        // %21 { %24 = Variable; Branch %25 }
        // %25 { %28 = Phi [%5 %21] [%26 %27]; LoopMerge %29 %27;
        //       BranchConditional %7 %30 %29 }
        // %30 { %26 = IAdd %28 %6; Branch %27 }
        // %27 { Branch %25 }
        // %29 { Store %24 %28; %22 = Load %24; Return }
        let caller = module.function(20).unwrap();
        let labels: Vec<Id> = caller.blocks().iter().map(Block::label).collect();
        assert_eq!(labels, vec![21, 25, 30, 27, 29]);

        let header = caller.block(25).unwrap();
        assert_eq!(
            header.instruction(0),
            Some(&Instruction::phi(28, 1, &[(5, 21), (26, 27)]))
        );
        assert_eq!(header.merge(), Some(&Instruction::loop_merge(29, 27)));

        let body = caller.block(30).unwrap();
        assert_eq!(body.instruction(0), Some(&Instruction::i_add(26, 1, 28, 6)));

        let tail = caller.block(29).unwrap();
        assert_eq!(
            tail.instructions(),
            &vec![Instruction::store(24, 28), Instruction::load(22, 1, 24)]
        );
        assert!(module.validate().is_ok());
    }

    #[test]
    fn test_directly_recursive_callees_should_be_left_untouched() {
        // GIVEN
        let mut module = Module::new();
        module.add_global(Instruction::type_void(1));
        module.add_global(Instruction::type_function(2, 1, &[]));

        let mut callee = Function::new(10, 1, 2);
        let block = callee.new_block(11);
        block.call(12, 1, 10, &[]);
        block.return_();
        module.add_function(callee);

        let mut caller = Function::new(20, 1, 2);
        let block = caller.new_block(21);
        block.call(22, 1, 10, &[]);
        block.return_();
        module.add_function(caller);

        let original = module.clone();

        // WHEN
        let result = inline(&mut module);

        // THEN
        assert_eq!(result, OptimizationResult::Unchanged);
        assert_eq!(module, original);
    }

    #[test]
    fn test_mutually_recursive_callees_should_be_left_untouched() {
        // GIVEN
        let mut module = Module::new();
        module.add_global(Instruction::type_void(1));
        module.add_global(Instruction::type_function(2, 1, &[]));

        let mut first = Function::new(10, 1, 2);
        let block = first.new_block(11);
        block.call(12, 1, 20, &[]);
        block.return_();
        module.add_function(first);

        let mut second = Function::new(20, 1, 2);
        let block = second.new_block(21);
        block.call(22, 1, 10, &[]);
        block.return_();
        module.add_function(second);

        let mut outside = Function::new(30, 1, 2);
        let block = outside.new_block(31);
        block.call(32, 1, 10, &[]);
        block.return_();
        module.add_function(outside);

        let original = module.clone();

        // WHEN
        let result = inline(&mut module);

        // THEN
        assert_eq!(result, OptimizationResult::Unchanged);
        assert_eq!(module, original);
    }

    #[test]
    fn test_declarations_should_not_be_inlined() {
        // GIVEN
        let mut module = Module::new();
        module.add_global(Instruction::type_void(1));
        module.add_global(Instruction::type_function(2, 1, &[]));

        module.add_function(Function::new(10, 1, 2));

        let mut caller = Function::new(20, 1, 2);
        let block = caller.new_block(21);
        block.call(22, 1, 10, &[]);
        block.return_();
        module.add_function(caller);

        let original = module.clone();

        // WHEN
        let result = inline(&mut module);

        // THEN
        assert_eq!(result, OptimizationResult::Unchanged);
        assert_eq!(module, original);
    }

    #[test]
    fn test_a_return_inside_a_loop_should_make_the_callee_uninlinable() {
        // GIVEN
        // %10 : %11 { Branch %12 }
        //       %12 { LoopMerge %15 %14; BranchConditional %4 %13 %15 }
        //       %13 { Return }                (returns from inside the loop)
        //       %14 { Branch %12 }
        //       %15 { Return }
        let mut module = Module::new();
        module.add_global(Instruction::type_void(1));
        module.add_global(Instruction::type_function(2, 1, &[]));
        module.add_global(Instruction::type_bool(3));
        module.add_global(Instruction::constant_true(4, 3));

        let mut callee = Function::new(10, 1, 2);
        callee.new_block(11).branch(12);
        let header = callee.new_block(12);
        header.loop_merge(15, 14);
        header.branch_conditional(4, 13, 15);
        callee.new_block(13).return_();
        callee.new_block(14).branch(12);
        callee.new_block(15).return_();
        module.add_function(callee);

        let mut caller = Function::new(20, 1, 2);
        let block = caller.new_block(21);
        block.call(22, 1, 10, &[]);
        block.return_();
        module.add_function(caller);

        let original = module.clone();

        // WHEN
        let result = inline(&mut module);

        // THEN
        assert_eq!(result, OptimizationResult::Unchanged);
        assert_eq!(module, original);
    }

    #[test]
    fn test_kill_callees_should_not_be_inlined_into_a_continue_construct() {
        // GIVEN
        let mut module = Module::new();
        module.add_global(Instruction::type_void(1));
        module.add_global(Instruction::type_function(2, 1, &[]));
        module.add_global(Instruction::type_bool(3));
        module.add_global(Instruction::constant_true(4, 3));

        let mut callee = Function::new(10, 1, 2);
        callee.new_block(11).kill();
        module.add_function(callee);

        let mut caller = Function::new(20, 1, 2);
        caller.new_block(21).branch(22);
        let header = caller.new_block(22);
        header.loop_merge(26, 24);
        header.branch_conditional(4, 23, 26);
        caller.new_block(23).branch(24);
        let continue_block = caller.new_block(24);
        continue_block.call(25, 1, 10, &[]);
        continue_block.branch(22);
        caller.new_block(26).return_();
        module.add_function(caller);

        let original = module.clone();

        // WHEN
        let result = inline(&mut module);

        // THEN
        assert_eq!(result, OptimizationResult::Unchanged);
        assert_eq!(module, original);
    }

    #[test]
    fn test_kill_should_be_cloned_and_the_back_half_closed_off() {
        // GIVEN
        let mut module = Module::new();
        module.add_global(Instruction::type_void(1));
        module.add_global(Instruction::type_function(2, 1, &[]));

        let mut callee = Function::new(10, 1, 2);
        callee.new_block(11).kill();
        module.add_function(callee);

        let mut caller = Function::new(20, 1, 2);
        let block = caller.new_block(21);
        block.call(22, 1, 10, &[]);
        block.return_();
        module.add_function(caller);

        // WHEN
        inline(&mut module);

        // THEN
        // %21 { Kill }
        // %23 { Return }    (unreachable back half)
        let caller = module.function(20).unwrap();
        let labels: Vec<Id> = caller.blocks().iter().map(Block::label).collect();
        assert_eq!(labels, vec![21, 23]);
        assert_eq!(caller.block(21).unwrap().terminator(), &Instruction::kill());
        assert_eq!(caller.block(23).unwrap().terminator(), &Instruction::return_());
    }

    #[test]
    fn test_variable_initializers_should_become_stores_at_the_body_top() {
        // GIVEN
        // %10 : %11 { %12 = Variable init %5; %13 = Load %12; Return }
        let mut module = Module::new();
        module.add_global(Instruction::type_float(1, 32));
        module.add_global(Instruction::type_pointer(2, StorageClass::Function, 1));
        module.add_global(Instruction::type_void(3));
        module.add_global(Instruction::type_function(4, 3, &[]));
        module.add_global(Instruction::constant(5, 1, 7));

        let mut callee = Function::new(10, 3, 4);
        let body = callee.new_block(11);
        body.variable(12, 2, StorageClass::Function, Some(5));
        body.load(13, 1, 12);
        body.return_();
        module.add_function(callee);

        let mut caller = Function::new(20, 3, 4);
        let block = caller.new_block(21);
        block.call(22, 3, 10, &[]);
        block.return_();
        module.add_function(caller);

        // WHEN
        inline(&mut module);

        // THEN
        // %21 { %23 = Variable; Store %23 %5; %24 = Load %23; Return }
        let caller = module.function(20).unwrap();
        let entry = caller.block(21).unwrap();
        assert_eq!(
            entry.instructions(),
            &vec![
                Instruction::variable(23, 2, StorageClass::Function, None),
                Instruction::store(23, 5),
                Instruction::load(24, 1, 23),
            ]
        );
        assert!(module.validate().is_ok());
    }

    #[test]
    fn test_decorations_should_follow_cloned_ids_and_the_return_variable() {
        // GIVEN
        let mut module = Module::new();
        module.add_global(Instruction::type_int(1, 32, true));
        module.add_global(Instruction::type_function(2, 1, &[]));
        module.add_global(Instruction::type_void(3));
        module.add_global(Instruction::type_function(4, 3, &[]));
        module.add_global(Instruction::constant(5, 1, 7));

        let mut callee = Function::new(10, 1, 2);
        let body = callee.new_block(11);
        body.copy_object(13, 1, 5);
        body.return_value(13);
        module.add_function(callee);

        let mut caller = Function::new(20, 3, 4);
        let block = caller.new_block(21);
        block.call(22, 1, 10, &[]);
        block.return_();
        module.add_function(caller);

        module.add_decoration(Decoration::new(13, DecorationKind::RelaxedPrecision, vec![]));
        module.add_decoration(Decoration::new(10, DecorationKind::Location, vec![3]));

        // WHEN
        inline(&mut module);

        // THEN
        // %23 is the on-demand pointer type, %24 the return variable and %25
        // the clone of %13.
        let return_variable_decorations = module.decorations_of(24);
        assert_eq!(return_variable_decorations.len(), 1);
        assert_eq!(return_variable_decorations[0].kind(), DecorationKind::Location);
        assert_eq!(return_variable_decorations[0].literals(), &[3]);

        let clone_decorations = module.decorations_of(25);
        assert_eq!(clone_decorations.len(), 1);
        assert_eq!(clone_decorations[0].kind(), DecorationKind::RelaxedPrecision);

        // The callee keeps its own decorations.
        assert_eq!(module.decorations_of(13).len(), 1);
        assert_eq!(module.decorations_of(10).len(), 1);
        assert!(module.validate().is_ok());
    }

    #[test]
    fn test_same_block_producers_should_be_reemitted_after_the_split() {
        // GIVEN
        // %23 { %24 = SampledImage %21 %22; %25 = Image %24; %26 = call %10();
        //       %27 = ImageSampleImplicitLod %24 %8; %28 = CopyObject %25; Return }
        let mut module = Module::new();
        module.add_global(Instruction::type_float(1, 32));
        module.add_global(Instruction::type_void(2));
        module.add_global(Instruction::type_function(3, 2, &[]));
        module.add_global(Instruction::type_image(4, 1));
        module.add_global(Instruction::type_sampler(5));
        module.add_global(Instruction::type_sampled_image(6, 4));
        module.add_global(Instruction::type_function(7, 2, &[4, 5]));
        module.add_global(Instruction::constant(8, 1, 0));

        let mut callee = Function::new(10, 2, 3);
        callee.new_block(11).branch(12);
        callee.new_block(12).return_();
        module.add_function(callee);

        let mut caller = Function::new(20, 2, 7);
        caller.add_parameter(21, 4);
        caller.add_parameter(22, 5);
        let block = caller.new_block(23);
        block.sampled_image(24, 6, 21, 22);
        block.image(25, 4, 24);
        block.call(26, 2, 10, &[]);
        block.image_sample_implicit_lod(27, 1, 24, 8);
        block.copy_object(28, 4, 25);
        block.return_();
        module.add_function(caller);

        // WHEN
        inline(&mut module);

        // THEN
        // %23 { %24 = SampledImage; %25 = Image %24; Branch %29 }
        // %29 { %30 = SampledImage; %31 = Image %30;
        //       %27 = ImageSampleImplicitLod %30 %8; %28 = CopyObject %31; Return }
        let caller = module.function(20).unwrap();
        let labels: Vec<Id> = caller.blocks().iter().map(Block::label).collect();
        assert_eq!(labels, vec![23, 29]);

        let first_half = caller.block(23).unwrap();
        assert_eq!(
            first_half.instructions(),
            &vec![
                Instruction::sampled_image(24, 6, 21, 22),
                Instruction::image(25, 4, 24),
            ]
        );

        let back_half = caller.block(29).unwrap();
        assert_eq!(
            back_half.instructions(),
            &vec![
                Instruction::sampled_image(30, 6, 21, 22),
                Instruction::image(31, 4, 30),
                Instruction::image_sample_implicit_lod(27, 1, 30, 8),
                Instruction::copy_object(28, 4, 31),
            ]
        );
        assert!(module.validate().is_ok());
    }

    #[test]
    fn test_inlined_scopes_should_chain_through_a_new_inlining_record() {
        // GIVEN
        // %12 in the callee was itself inlined earlier, recorded by %32.
        let mut module = Module::new();
        module.add_global(Instruction::type_void(1));
        module.add_global(Instruction::type_function(2, 1, &[]));
        module.add_global(Instruction::type_int(3, 32, true));
        module.add_global(Instruction::constant(4, 3, 1));

        let mut callee = Function::new(10, 1, 2);
        let body = callee.new_block(11);
        body.copy_object(12, 3, 4)
            .set_scope(Some(DebugScope::new(31, Some(32))));
        body.return_();
        module.add_function(callee);

        let mut caller = Function::new(20, 1, 2);
        let block = caller.new_block(21);
        let call = block.call(22, 1, 10, &[]);
        call.set_scope(Some(DebugScope::new(30, None)));
        call.set_line(Some(SourceLocation::new(7, 3)));
        block.return_();
        module.add_function(caller);

        module.add_debug_entity(
            30,
            DebugEntity::Function {
                name: "f".to_owned(),
                line: 1,
                function: 20,
            },
        );
        module.add_debug_entity(
            31,
            DebugEntity::Function {
                name: "h".to_owned(),
                line: 2,
                function: 10,
            },
        );
        module.add_debug_entity(32, DebugEntity::InlinedAt(InlinedAtRecord::new(9, 31, None)));

        // WHEN
        inline(&mut module);

        // THEN
        // %33 is the clone of %12. %34 records this call site, %35 is the
        // clone of %32 re-parented onto %34.
        assert_eq!(
            module.debug_info().inlined_at(34),
            Some(&InlinedAtRecord::new(7, 30, None))
        );
        assert_eq!(
            module.debug_info().inlined_at(35),
            Some(&InlinedAtRecord::new(9, 31, Some(34)))
        );

        let caller = module.function(20).unwrap();
        let clone = caller.block(21).unwrap().instruction(0).unwrap();
        assert_eq!(clone.result(), Some(33));
        assert_eq!(clone.scope(), Some(DebugScope::new(31, Some(35))));
        assert!(module.validate().is_ok());
    }

    #[test]
    fn test_each_call_site_should_get_its_own_inlining_records() {
        // GIVEN
        let mut module = Module::new();
        module.add_global(Instruction::type_void(1));
        module.add_global(Instruction::type_function(2, 1, &[]));
        module.add_global(Instruction::type_int(3, 32, true));
        module.add_global(Instruction::constant(4, 3, 1));

        let mut callee = Function::new(10, 1, 2);
        let body = callee.new_block(11);
        body.copy_object(12, 3, 4)
            .set_scope(Some(DebugScope::new(31, None)));
        body.return_();
        module.add_function(callee);

        let mut caller = Function::new(20, 1, 2);
        let block = caller.new_block(21);
        let first_call = block.call(22, 1, 10, &[]);
        first_call.set_scope(Some(DebugScope::new(30, None)));
        first_call.set_line(Some(SourceLocation::new(4, 1)));
        let second_call = block.call(23, 1, 10, &[]);
        second_call.set_scope(Some(DebugScope::new(30, None)));
        second_call.set_line(Some(SourceLocation::new(8, 1)));
        block.return_();
        module.add_function(caller);

        module.add_debug_entity(
            30,
            DebugEntity::Function {
                name: "f".to_owned(),
                line: 1,
                function: 20,
            },
        );
        module.add_debug_entity(
            31,
            DebugEntity::Function {
                name: "g".to_owned(),
                line: 2,
                function: 10,
            },
        );

        // WHEN
        inline(&mut module);

        // THEN
        // Each call site created its own record, nothing is shared.
        assert_eq!(
            module.debug_info().inlined_at(33),
            Some(&InlinedAtRecord::new(4, 30, None))
        );
        assert_eq!(
            module.debug_info().inlined_at(35),
            Some(&InlinedAtRecord::new(8, 30, None))
        );

        let caller = module.function(20).unwrap();
        let entry = caller.block(21).unwrap();
        assert_eq!(
            entry.instruction(0).unwrap().scope(),
            Some(DebugScope::new(31, Some(33)))
        );
        assert_eq!(
            entry.instruction(1).unwrap().scope(),
            Some(DebugScope::new(31, Some(35)))
        );
        assert!(module.validate().is_ok());
    }

    #[test]
    fn test_return_plumbing_should_carry_the_callee_function_scope() {
        // GIVEN
        // The callee declares a local with a debug declaration and returns a
        // value loaded from it.
        let mut module = Module::new();
        module.add_global(Instruction::type_int(1, 32, true));
        module.add_global(Instruction::type_pointer(2, StorageClass::Function, 1));
        module.add_global(Instruction::type_function(3, 1, &[]));
        module.add_global(Instruction::type_void(4));
        module.add_global(Instruction::type_function(5, 4, &[]));

        let mut callee = Function::new(10, 1, 3);
        callee.add_debug_declaration(Instruction::debug_declare(31, 12));
        let body = callee.new_block(11);
        body.variable(12, 2, StorageClass::Function, None);
        body.load(13, 1, 12)
            .set_scope(Some(DebugScope::new(30, None)));
        let terminator = body.return_value(13);
        terminator.set_line(Some(SourceLocation::new(3, 5)));
        module.add_function(callee);

        let mut caller = Function::new(20, 4, 5);
        let block = caller.new_block(21);
        let call = block.call(22, 1, 10, &[]);
        call.set_scope(Some(DebugScope::new(32, None)));
        call.set_line(Some(SourceLocation::new(5, 1)));
        block.return_();
        module.add_function(caller);

        module.add_debug_entity(
            30,
            DebugEntity::Function {
                name: "g".to_owned(),
                line: 2,
                function: 10,
            },
        );
        module.add_debug_entity(
            31,
            DebugEntity::LocalVariable {
                name: "x".to_owned(),
                line: 3,
                parent: 30,
            },
        );
        module.add_debug_entity(
            32,
            DebugEntity::Function {
                name: "main".to_owned(),
                line: 1,
                function: 20,
            },
        );

        // WHEN
        inline(&mut module);

        // THEN
        // %33 is the hoisted local, %34 the return variable, %35 the cloned
        // load and %36 this call site's inlining record.
        assert_eq!(
            module.debug_info().inlined_at(36),
            Some(&InlinedAtRecord::new(5, 32, None))
        );

        let caller = module.function(20).unwrap();
        let entry = caller.block(21).unwrap();
        let instructions = entry.instructions();

        assert_eq!(instructions[0], Instruction::variable(33, 2, StorageClass::Function, None));
        assert_eq!(instructions[1], Instruction::variable(34, 2, StorageClass::Function, None));
        assert_eq!(instructions[2], Instruction::debug_declare(31, 33));

        let load_clone = &instructions[3];
        assert_eq!(load_clone, &{
            let mut load = Instruction::load(35, 1, 33);
            load.set_scope(Some(DebugScope::new(30, Some(36))));
            load
        });

        let store = &instructions[4];
        assert_eq!(store, &{
            let mut store = Instruction::store(34, 35);
            store.set_scope(Some(DebugScope::new(30, Some(36))));
            store.set_line(Some(SourceLocation::new(3, 5)));
            store
        });

        let result_load = &instructions[5];
        assert_eq!(result_load, &{
            let mut load = Instruction::load(22, 1, 34);
            load.set_scope(Some(DebugScope::new(30, Some(36))));
            load.set_line(Some(SourceLocation::new(5, 1)));
            load
        });
        assert!(module.validate().is_ok());
    }

    #[test]
    fn test_calls_without_scope_should_not_create_debug_records() {
        // GIVEN
        let mut module = Module::new();
        module.add_global(Instruction::type_void(1));
        module.add_global(Instruction::type_function(2, 1, &[]));
        module.add_global(Instruction::type_int(3, 32, true));
        module.add_global(Instruction::constant(4, 3, 1));

        let mut callee = Function::new(10, 1, 2);
        let body = callee.new_block(11);
        body.copy_object(12, 3, 4)
            .set_scope(Some(DebugScope::new(30, None)));
        body.return_();
        module.add_function(callee);

        let mut caller = Function::new(20, 1, 2);
        let block = caller.new_block(21);
        block.call(22, 1, 10, &[]);
        block.return_();
        module.add_function(caller);

        module.add_debug_entity(
            30,
            DebugEntity::Function {
                name: "g".to_owned(),
                line: 2,
                function: 10,
            },
        );

        // WHEN
        inline(&mut module);

        // THEN
        // The cloned instruction keeps its scope untouched.
        assert_eq!(module.debug_info().len(), 1);
        let caller = module.function(20).unwrap();
        let clone = caller.block(21).unwrap().instruction(0).unwrap();
        assert_eq!(clone.scope(), Some(DebugScope::new(30, None)));
    }

    #[test]
    fn test_nested_calls_should_be_flattened_exhaustively() {
        // GIVEN
        // %10 calls %20 which calls %30.
        let mut module = Module::new();
        module.add_global(Instruction::type_void(1));
        module.add_global(Instruction::type_function(2, 1, &[]));

        let mut outer = Function::new(10, 1, 2);
        let block = outer.new_block(11);
        block.call(12, 1, 20, &[]);
        block.return_();
        module.add_function(outer);

        let mut middle = Function::new(20, 1, 2);
        let block = middle.new_block(21);
        block.call(22, 1, 30, &[]);
        block.return_();
        module.add_function(middle);

        let mut leaf = Function::new(30, 1, 2);
        leaf.new_block(31).return_();
        module.add_function(leaf);

        // WHEN
        let first = inline(&mut module);
        let second = inline(&mut module);

        // THEN
        assert_eq!(first, OptimizationResult::Changed);
        assert_eq!(second, OptimizationResult::Unchanged);
        for id in &[10, 20, 30] {
            let function = module.function(*id).unwrap();
            assert_eq!(function.blocks().len(), 1);
            assert!(function.blocks()[0].is_empty());
            assert_eq!(function.blocks()[0].terminator().opcode(), Opcode::Return);
        }
    }

    #[test]
    fn test_an_arity_mismatch_should_be_reported_as_malformed() {
        // GIVEN
        let mut module = Module::new();
        module.add_global(Instruction::type_float(1, 32));
        module.add_global(Instruction::type_pointer(2, StorageClass::Function, 1));
        module.add_global(Instruction::type_void(3));
        module.add_global(Instruction::type_function(4, 3, &[2]));
        module.add_global(Instruction::type_function(5, 3, &[]));

        let mut callee = Function::new(10, 3, 4);
        callee.add_parameter(11, 2);
        callee.new_block(12).return_();
        module.add_function(callee);

        let mut caller = Function::new(20, 3, 5);
        let block = caller.new_block(21);
        block.call(22, 3, 10, &[]);
        block.return_();
        module.add_function(caller);

        // WHEN
        let result = FunctionInlining::new().optimize(&mut module);

        // THEN
        assert!(result.is_err());
    }
}
