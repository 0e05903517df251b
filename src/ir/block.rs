use crate::error::Result;
use crate::ir::{Id, Instruction, Operand, StorageClass};
use std::fmt;

/// A basic block.
///
/// The merge declaration and the terminator are kept out of the instruction
/// list. Every block has exactly one terminator, `Unreachable` until set.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Block {
    label: Id,
    instructions: Vec<Instruction>,
    merge: Option<Instruction>,
    terminator: Instruction,
}

impl Block {
    pub fn new(label: Id) -> Self {
        Self {
            label,
            instructions: Vec::new(),
            merge: None,
            terminator: Instruction::unreachable(),
        }
    }

    /// Clones the contents of this block under a new label.
    pub fn clone_new_label(&self, label: Id) -> Self {
        let mut block = self.clone();
        block.label = label;
        block
    }

    pub fn label(&self) -> Id {
        self.label
    }

    pub fn instructions(&self) -> &Vec<Instruction> {
        &self.instructions
    }

    pub fn instructions_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.instructions
    }

    pub fn instruction(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn instruction_mut(&mut self, index: usize) -> Option<&mut Instruction> {
        self.instructions.get_mut(index)
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn add_instruction(&mut self, instruction: Instruction) -> &mut Instruction {
        self.instructions.push(instruction);
        self.instructions.last_mut().unwrap()
    }

    pub fn remove_instruction(&mut self, index: usize) -> Result<Instruction> {
        if index >= self.instructions.len() {
            return Err(format!("No instruction at index {}", index).into());
        }
        Ok(self.instructions.remove(index))
    }

    /// Splits off all instructions from `index` to the end.
    pub fn split_off_instructions_at(&mut self, index: usize) -> Result<Vec<Instruction>> {
        if index > self.instructions.len() {
            return Err(format!("No instruction at index {}", index).into());
        }
        Ok(self.instructions.split_off(index))
    }

    pub fn merge(&self) -> Option<&Instruction> {
        self.merge.as_ref()
    }

    pub fn set_merge(&mut self, merge: Instruction) {
        self.merge = Some(merge);
    }

    pub fn take_merge(&mut self) -> Option<Instruction> {
        self.merge.take()
    }

    pub fn terminator(&self) -> &Instruction {
        &self.terminator
    }

    pub fn terminator_mut(&mut self) -> &mut Instruction {
        &mut self.terminator
    }

    pub fn set_terminator(&mut self, terminator: Instruction) {
        self.terminator = terminator;
    }

    /// Replaces the terminator with `Unreachable` and returns it.
    pub fn take_terminator(&mut self) -> Instruction {
        std::mem::replace(&mut self.terminator, Instruction::unreachable())
    }

    /// The labels of all successor blocks, in terminator operand order.
    pub fn successor_labels(&self) -> Vec<Id> {
        self.terminator
            .operands()
            .iter()
            .filter_map(Operand::block)
            .collect()
    }

    pub fn variable(
        &mut self,
        result: Id,
        pointer_type: Id,
        storage_class: StorageClass,
        initializer: Option<Id>,
    ) -> &mut Instruction {
        self.add_instruction(Instruction::variable(
            result,
            pointer_type,
            storage_class,
            initializer,
        ))
    }

    pub fn load(&mut self, result: Id, result_type: Id, pointer: Id) -> &mut Instruction {
        self.add_instruction(Instruction::load(result, result_type, pointer))
    }

    pub fn store(&mut self, pointer: Id, value: Id) -> &mut Instruction {
        self.add_instruction(Instruction::store(pointer, value))
    }

    pub fn access_chain(
        &mut self,
        result: Id,
        result_type: Id,
        base: Id,
        indexes: &[Id],
    ) -> &mut Instruction {
        self.add_instruction(Instruction::access_chain(result, result_type, base, indexes))
    }

    pub fn composite_extract(
        &mut self,
        result: Id,
        result_type: Id,
        composite: Id,
        indexes: &[u32],
    ) -> &mut Instruction {
        self.add_instruction(Instruction::composite_extract(
            result,
            result_type,
            composite,
            indexes,
        ))
    }

    pub fn copy_object(&mut self, result: Id, result_type: Id, source: Id) -> &mut Instruction {
        self.add_instruction(Instruction::copy_object(result, result_type, source))
    }

    pub fn f_add(&mut self, result: Id, result_type: Id, lhs: Id, rhs: Id) -> &mut Instruction {
        self.add_instruction(Instruction::f_add(result, result_type, lhs, rhs))
    }

    pub fn f_mul(&mut self, result: Id, result_type: Id, lhs: Id, rhs: Id) -> &mut Instruction {
        self.add_instruction(Instruction::f_mul(result, result_type, lhs, rhs))
    }

    pub fn i_add(&mut self, result: Id, result_type: Id, lhs: Id, rhs: Id) -> &mut Instruction {
        self.add_instruction(Instruction::i_add(result, result_type, lhs, rhs))
    }

    pub fn s_less_than(
        &mut self,
        result: Id,
        result_type: Id,
        lhs: Id,
        rhs: Id,
    ) -> &mut Instruction {
        self.add_instruction(Instruction::s_less_than(result, result_type, lhs, rhs))
    }

    pub fn call(
        &mut self,
        result: Id,
        result_type: Id,
        function: Id,
        arguments: &[Id],
    ) -> &mut Instruction {
        self.add_instruction(Instruction::function_call(result, result_type, function, arguments))
    }

    pub fn phi(&mut self, result: Id, result_type: Id, incoming: &[(Id, Id)]) -> &mut Instruction {
        self.add_instruction(Instruction::phi(result, result_type, incoming))
    }

    pub fn sampled_image(
        &mut self,
        result: Id,
        result_type: Id,
        image: Id,
        sampler: Id,
    ) -> &mut Instruction {
        self.add_instruction(Instruction::sampled_image(result, result_type, image, sampler))
    }

    pub fn image(&mut self, result: Id, result_type: Id, sampled_image: Id) -> &mut Instruction {
        self.add_instruction(Instruction::image(result, result_type, sampled_image))
    }

    pub fn image_sample_implicit_lod(
        &mut self,
        result: Id,
        result_type: Id,
        sampled_image: Id,
        coordinate: Id,
    ) -> &mut Instruction {
        self.add_instruction(Instruction::image_sample_implicit_lod(
            result,
            result_type,
            sampled_image,
            coordinate,
        ))
    }

    pub fn debug_declare(&mut self, entity: Id, variable: Id) -> &mut Instruction {
        self.add_instruction(Instruction::debug_declare(entity, variable))
    }

    pub fn debug_value(&mut self, entity: Id, value: Id) -> &mut Instruction {
        self.add_instruction(Instruction::debug_value(entity, value))
    }

    pub fn selection_merge(&mut self, merge_block: Id) -> &mut Instruction {
        self.merge = Some(Instruction::selection_merge(merge_block));
        self.merge.as_mut().unwrap()
    }

    pub fn loop_merge(&mut self, merge_block: Id, continue_target: Id) -> &mut Instruction {
        self.merge = Some(Instruction::loop_merge(merge_block, continue_target));
        self.merge.as_mut().unwrap()
    }

    pub fn branch(&mut self, target: Id) -> &mut Instruction {
        self.terminator = Instruction::branch(target);
        &mut self.terminator
    }

    pub fn branch_conditional(
        &mut self,
        condition: Id,
        true_target: Id,
        false_target: Id,
    ) -> &mut Instruction {
        self.terminator = Instruction::branch_conditional(condition, true_target, false_target);
        &mut self.terminator
    }

    pub fn return_(&mut self) -> &mut Instruction {
        self.terminator = Instruction::return_();
        &mut self.terminator
    }

    pub fn return_value(&mut self, value: Id) -> &mut Instruction {
        self.terminator = Instruction::return_value(value);
        &mut self.terminator
    }

    pub fn kill(&mut self) -> &mut Instruction {
        self.terminator = Instruction::kill();
        &mut self.terminator
    }

    pub fn terminate_invocation(&mut self) -> &mut Instruction {
        self.terminator = Instruction::terminate_invocation();
        &mut self.terminator
    }

    pub fn unreachable(&mut self) -> &mut Instruction {
        self.terminator = Instruction::unreachable();
        &mut self.terminator
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "block %{} {{", self.label)?;
        for instruction in &self.instructions {
            writeln!(f, "    {}", instruction)?;
        }
        if let Some(merge) = &self.merge {
            writeln!(f, "    {}", merge)?;
        }
        writeln!(f, "    {}", self.terminator)?;
        write!(f, "}}")
    }
}
