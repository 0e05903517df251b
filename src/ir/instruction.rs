use crate::ir::{DebugScope, Id, Opcode, Operand, SourceLocation, StorageClass};
use std::fmt;

/// A single IR instruction.
///
/// Block labels are not instructions. Types and constants are module-level
/// instructions without an enclosing block.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Instruction {
    opcode: Opcode,
    result: Option<Id>,
    result_type: Option<Id>,
    operands: Vec<Operand>,
    line: Option<SourceLocation>,
    scope: Option<DebugScope>,
}

impl Instruction {
    pub fn new(
        opcode: Opcode,
        result: Option<Id>,
        result_type: Option<Id>,
        operands: Vec<Operand>,
    ) -> Self {
        Self {
            opcode,
            result,
            result_type,
            operands,
            line: None,
            scope: None,
        }
    }

    pub fn type_void(result: Id) -> Self {
        Self::new(Opcode::TypeVoid, Some(result), None, Vec::new())
    }

    pub fn type_bool(result: Id) -> Self {
        Self::new(Opcode::TypeBool, Some(result), None, Vec::new())
    }

    pub fn type_int(result: Id, width: u32, signed: bool) -> Self {
        Self::new(
            Opcode::TypeInt,
            Some(result),
            None,
            vec![Operand::Literal(width), Operand::Literal(signed as u32)],
        )
    }

    pub fn type_float(result: Id, width: u32) -> Self {
        Self::new(
            Opcode::TypeFloat,
            Some(result),
            None,
            vec![Operand::Literal(width)],
        )
    }

    pub fn type_vector(result: Id, component_type: Id, component_count: u32) -> Self {
        Self::new(
            Opcode::TypeVector,
            Some(result),
            None,
            vec![Operand::Id(component_type), Operand::Literal(component_count)],
        )
    }

    pub fn type_pointer(result: Id, storage_class: StorageClass, pointee_type: Id) -> Self {
        Self::new(
            Opcode::TypePointer,
            Some(result),
            None,
            vec![Operand::Storage(storage_class), Operand::Id(pointee_type)],
        )
    }

    pub fn type_function(result: Id, return_type: Id, parameter_types: &[Id]) -> Self {
        let mut operands = vec![Operand::Id(return_type)];
        operands.extend(parameter_types.iter().map(|id| Operand::Id(*id)));
        Self::new(Opcode::TypeFunction, Some(result), None, operands)
    }

    pub fn type_image(result: Id, sampled_type: Id) -> Self {
        Self::new(
            Opcode::TypeImage,
            Some(result),
            None,
            vec![Operand::Id(sampled_type)],
        )
    }

    pub fn type_sampler(result: Id) -> Self {
        Self::new(Opcode::TypeSampler, Some(result), None, Vec::new())
    }

    pub fn type_sampled_image(result: Id, image_type: Id) -> Self {
        Self::new(
            Opcode::TypeSampledImage,
            Some(result),
            None,
            vec![Operand::Id(image_type)],
        )
    }

    pub fn constant(result: Id, result_type: Id, value: u32) -> Self {
        Self::new(
            Opcode::Constant,
            Some(result),
            Some(result_type),
            vec![Operand::Literal(value)],
        )
    }

    pub fn constant_true(result: Id, result_type: Id) -> Self {
        Self::new(Opcode::ConstantTrue, Some(result), Some(result_type), Vec::new())
    }

    pub fn constant_false(result: Id, result_type: Id) -> Self {
        Self::new(Opcode::ConstantFalse, Some(result), Some(result_type), Vec::new())
    }

    pub fn constant_composite(result: Id, result_type: Id, constituents: &[Id]) -> Self {
        Self::new(
            Opcode::ConstantComposite,
            Some(result),
            Some(result_type),
            constituents.iter().map(|id| Operand::Id(*id)).collect(),
        )
    }

    pub fn variable(
        result: Id,
        pointer_type: Id,
        storage_class: StorageClass,
        initializer: Option<Id>,
    ) -> Self {
        let mut operands = vec![Operand::Storage(storage_class)];
        if let Some(initializer) = initializer {
            operands.push(Operand::Id(initializer));
        }
        Self::new(Opcode::Variable, Some(result), Some(pointer_type), operands)
    }

    pub fn load(result: Id, result_type: Id, pointer: Id) -> Self {
        Self::new(
            Opcode::Load,
            Some(result),
            Some(result_type),
            vec![Operand::Id(pointer)],
        )
    }

    pub fn store(pointer: Id, value: Id) -> Self {
        Self::new(
            Opcode::Store,
            None,
            None,
            vec![Operand::Id(pointer), Operand::Id(value)],
        )
    }

    pub fn access_chain(result: Id, result_type: Id, base: Id, indexes: &[Id]) -> Self {
        let mut operands = vec![Operand::Id(base)];
        operands.extend(indexes.iter().map(|id| Operand::Id(*id)));
        Self::new(Opcode::AccessChain, Some(result), Some(result_type), operands)
    }

    pub fn composite_construct(result: Id, result_type: Id, constituents: &[Id]) -> Self {
        Self::new(
            Opcode::CompositeConstruct,
            Some(result),
            Some(result_type),
            constituents.iter().map(|id| Operand::Id(*id)).collect(),
        )
    }

    pub fn composite_extract(result: Id, result_type: Id, composite: Id, indexes: &[u32]) -> Self {
        let mut operands = vec![Operand::Id(composite)];
        operands.extend(indexes.iter().map(|index| Operand::Literal(*index)));
        Self::new(Opcode::CompositeExtract, Some(result), Some(result_type), operands)
    }

    pub fn copy_object(result: Id, result_type: Id, source: Id) -> Self {
        Self::new(
            Opcode::CopyObject,
            Some(result),
            Some(result_type),
            vec![Operand::Id(source)],
        )
    }

    pub fn f_add(result: Id, result_type: Id, lhs: Id, rhs: Id) -> Self {
        Self::new(
            Opcode::FAdd,
            Some(result),
            Some(result_type),
            vec![Operand::Id(lhs), Operand::Id(rhs)],
        )
    }

    pub fn f_mul(result: Id, result_type: Id, lhs: Id, rhs: Id) -> Self {
        Self::new(
            Opcode::FMul,
            Some(result),
            Some(result_type),
            vec![Operand::Id(lhs), Operand::Id(rhs)],
        )
    }

    pub fn i_add(result: Id, result_type: Id, lhs: Id, rhs: Id) -> Self {
        Self::new(
            Opcode::IAdd,
            Some(result),
            Some(result_type),
            vec![Operand::Id(lhs), Operand::Id(rhs)],
        )
    }

    pub fn s_less_than(result: Id, result_type: Id, lhs: Id, rhs: Id) -> Self {
        Self::new(
            Opcode::SLessThan,
            Some(result),
            Some(result_type),
            vec![Operand::Id(lhs), Operand::Id(rhs)],
        )
    }

    pub fn sampled_image(result: Id, result_type: Id, image: Id, sampler: Id) -> Self {
        Self::new(
            Opcode::SampledImage,
            Some(result),
            Some(result_type),
            vec![Operand::Id(image), Operand::Id(sampler)],
        )
    }

    pub fn image(result: Id, result_type: Id, sampled_image: Id) -> Self {
        Self::new(
            Opcode::Image,
            Some(result),
            Some(result_type),
            vec![Operand::Id(sampled_image)],
        )
    }

    pub fn image_sample_implicit_lod(
        result: Id,
        result_type: Id,
        sampled_image: Id,
        coordinate: Id,
    ) -> Self {
        Self::new(
            Opcode::ImageSampleImplicitLod,
            Some(result),
            Some(result_type),
            vec![Operand::Id(sampled_image), Operand::Id(coordinate)],
        )
    }

    pub fn function_call(result: Id, result_type: Id, function: Id, arguments: &[Id]) -> Self {
        let mut operands = vec![Operand::Id(function)];
        operands.extend(arguments.iter().map(|id| Operand::Id(*id)));
        Self::new(Opcode::FunctionCall, Some(result), Some(result_type), operands)
    }

    pub fn phi(result: Id, result_type: Id, incoming: &[(Id, Id)]) -> Self {
        let mut operands = Vec::with_capacity(incoming.len() * 2);
        for (value, predecessor) in incoming {
            operands.push(Operand::Id(*value));
            operands.push(Operand::Block(*predecessor));
        }
        Self::new(Opcode::Phi, Some(result), Some(result_type), operands)
    }

    pub fn selection_merge(merge_block: Id) -> Self {
        Self::new(
            Opcode::SelectionMerge,
            None,
            None,
            vec![Operand::Block(merge_block)],
        )
    }

    pub fn loop_merge(merge_block: Id, continue_target: Id) -> Self {
        Self::new(
            Opcode::LoopMerge,
            None,
            None,
            vec![Operand::Block(merge_block), Operand::Block(continue_target)],
        )
    }

    pub fn branch(target: Id) -> Self {
        Self::new(Opcode::Branch, None, None, vec![Operand::Block(target)])
    }

    pub fn branch_conditional(condition: Id, true_target: Id, false_target: Id) -> Self {
        Self::new(
            Opcode::BranchConditional,
            None,
            None,
            vec![
                Operand::Id(condition),
                Operand::Block(true_target),
                Operand::Block(false_target),
            ],
        )
    }

    pub fn return_() -> Self {
        Self::new(Opcode::Return, None, None, Vec::new())
    }

    pub fn return_value(value: Id) -> Self {
        Self::new(Opcode::ReturnValue, None, None, vec![Operand::Id(value)])
    }

    pub fn kill() -> Self {
        Self::new(Opcode::Kill, None, None, Vec::new())
    }

    pub fn terminate_invocation() -> Self {
        Self::new(Opcode::TerminateInvocation, None, None, Vec::new())
    }

    pub fn unreachable() -> Self {
        Self::new(Opcode::Unreachable, None, None, Vec::new())
    }

    pub fn debug_declare(entity: Id, variable: Id) -> Self {
        Self::new(
            Opcode::DebugDeclare,
            None,
            None,
            vec![Operand::Id(entity), Operand::Id(variable)],
        )
    }

    pub fn debug_value(entity: Id, value: Id) -> Self {
        Self::new(
            Opcode::DebugValue,
            None,
            None,
            vec![Operand::Id(entity), Operand::Id(value)],
        )
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn result(&self) -> Option<Id> {
        self.result
    }

    pub fn set_result(&mut self, result: Option<Id>) {
        self.result = result;
    }

    pub fn result_type(&self) -> Option<Id> {
        self.result_type
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn operands_mut(&mut self) -> &mut Vec<Operand> {
        &mut self.operands
    }

    pub fn line(&self) -> Option<SourceLocation> {
        self.line
    }

    pub fn set_line(&mut self, line: Option<SourceLocation>) {
        self.line = line;
    }

    pub fn scope(&self) -> Option<DebugScope> {
        self.scope
    }

    pub fn set_scope(&mut self, scope: Option<DebugScope>) {
        self.scope = scope;
    }

    /// The callee id of a `FunctionCall` instruction.
    pub fn call_target(&self) -> Option<Id> {
        match self.opcode {
            Opcode::FunctionCall => self.operands.first().and_then(Operand::id),
            _ => None,
        }
    }

    /// The argument ids of a `FunctionCall` instruction.
    ///
    /// Returns `None` if any argument operand is not a plain id.
    pub fn call_arguments(&self) -> Option<Vec<Id>> {
        match self.opcode {
            Opcode::FunctionCall => self
                .operands
                .iter()
                .skip(1)
                .map(Operand::id)
                .collect::<Option<Vec<Id>>>(),
            _ => None,
        }
    }

    pub fn storage_class(&self) -> Option<StorageClass> {
        self.operands.first().and_then(Operand::storage)
    }

    /// The initializer id of a `Variable` instruction, if it carries one.
    pub fn variable_initializer(&self) -> Option<Id> {
        match self.opcode {
            Opcode::Variable => self.operands.get(1).and_then(Operand::id),
            _ => None,
        }
    }

    /// Strips the initializer of a `Variable` instruction and returns it.
    pub fn take_variable_initializer(&mut self) -> Option<Id> {
        let initializer = self.variable_initializer()?;
        self.operands.truncate(1);
        Some(initializer)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.result, self.result_type) {
            (Some(result), Some(result_type)) => {
                write!(f, "%{} : %{} = {}", result, result_type, self.opcode)?
            }
            (Some(result), None) => write!(f, "%{} = {}", result, self.opcode)?,
            _ => write!(f, "{}", self.opcode)?,
        }
        if self.opcode == Opcode::Phi {
            for pair in self.operands.chunks(2) {
                match pair {
                    [value, predecessor] => write!(f, " [{} {}]", value, predecessor)?,
                    _ => {
                        for operand in pair {
                            write!(f, " {}", operand)?;
                        }
                    }
                }
            }
        } else {
            for operand in &self.operands {
                write!(f, " {}", operand)?;
            }
        }
        if let Some(scope) = self.scope {
            write!(f, " @ scope %{}", scope.lexical_scope())?;
            if let Some(inlined_at) = scope.inlined_at() {
                write!(f, " inlined %{}", inlined_at)?;
            }
        }
        if let Some(line) = self.line {
            write!(f, " @ line {}:{}", line.line(), line.column())?;
        }
        Ok(())
    }
}
