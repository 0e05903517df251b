use std::fmt;

/// Operation codes of the structured shader IR.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Opcode {
    TypeVoid,
    TypeBool,
    TypeInt,
    TypeFloat,
    TypeVector,
    TypePointer,
    TypeFunction,
    TypeImage,
    TypeSampler,
    TypeSampledImage,
    Constant,
    ConstantTrue,
    ConstantFalse,
    ConstantComposite,
    Variable,
    Load,
    Store,
    AccessChain,
    CompositeConstruct,
    CompositeExtract,
    CopyObject,
    FAdd,
    FMul,
    IAdd,
    SLessThan,
    SampledImage,
    Image,
    ImageSampleImplicitLod,
    FunctionCall,
    Phi,
    SelectionMerge,
    LoopMerge,
    Branch,
    BranchConditional,
    Return,
    ReturnValue,
    Kill,
    TerminateInvocation,
    Unreachable,
    DebugDeclare,
    DebugValue,
}

impl Opcode {
    /// Returns whether this opcode ends a block.
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Self::Branch
                | Self::BranchConditional
                | Self::Return
                | Self::ReturnValue
                | Self::Kill
                | Self::TerminateInvocation
                | Self::Unreachable
        )
    }

    /// Returns whether this opcode declares a structured construct.
    pub fn is_merge(self) -> bool {
        matches!(self, Self::SelectionMerge | Self::LoopMerge)
    }

    /// Returns whether this opcode returns from the enclosing function.
    pub fn is_return(self) -> bool {
        matches!(self, Self::Return | Self::ReturnValue)
    }

    /// Returns whether this opcode terminates the invocation.
    pub fn is_kill(self) -> bool {
        matches!(self, Self::Kill | Self::TerminateInvocation)
    }

    /// Returns whether results of this opcode may only be consumed within the
    /// defining block.
    pub fn is_same_block_op(self) -> bool {
        matches!(self, Self::SampledImage | Self::Image)
    }

    /// Returns whether this opcode declares a type.
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Self::TypeVoid
                | Self::TypeBool
                | Self::TypeInt
                | Self::TypeFloat
                | Self::TypeVector
                | Self::TypePointer
                | Self::TypeFunction
                | Self::TypeImage
                | Self::TypeSampler
                | Self::TypeSampledImage
        )
    }

    /// Returns whether the operand at `index` references a block label.
    pub fn is_block_operand(self, index: usize) -> bool {
        match self {
            Self::Branch | Self::SelectionMerge => index == 0,
            Self::LoopMerge => index < 2,
            Self::BranchConditional => index == 1 || index == 2,
            Self::Phi => index % 2 == 1,
            _ => false,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::TypeVoid => "TypeVoid",
            Self::TypeBool => "TypeBool",
            Self::TypeInt => "TypeInt",
            Self::TypeFloat => "TypeFloat",
            Self::TypeVector => "TypeVector",
            Self::TypePointer => "TypePointer",
            Self::TypeFunction => "TypeFunction",
            Self::TypeImage => "TypeImage",
            Self::TypeSampler => "TypeSampler",
            Self::TypeSampledImage => "TypeSampledImage",
            Self::Constant => "Constant",
            Self::ConstantTrue => "ConstantTrue",
            Self::ConstantFalse => "ConstantFalse",
            Self::ConstantComposite => "ConstantComposite",
            Self::Variable => "Variable",
            Self::Load => "Load",
            Self::Store => "Store",
            Self::AccessChain => "AccessChain",
            Self::CompositeConstruct => "CompositeConstruct",
            Self::CompositeExtract => "CompositeExtract",
            Self::CopyObject => "CopyObject",
            Self::FAdd => "FAdd",
            Self::FMul => "FMul",
            Self::IAdd => "IAdd",
            Self::SLessThan => "SLessThan",
            Self::SampledImage => "SampledImage",
            Self::Image => "Image",
            Self::ImageSampleImplicitLod => "ImageSampleImplicitLod",
            Self::FunctionCall => "FunctionCall",
            Self::Phi => "Phi",
            Self::SelectionMerge => "SelectionMerge",
            Self::LoopMerge => "LoopMerge",
            Self::Branch => "Branch",
            Self::BranchConditional => "BranchConditional",
            Self::Return => "Return",
            Self::ReturnValue => "ReturnValue",
            Self::Kill => "Kill",
            Self::TerminateInvocation => "TerminateInvocation",
            Self::Unreachable => "Unreachable",
            Self::DebugDeclare => "DebugDeclare",
            Self::DebugValue => "DebugValue",
        }
    }

    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        let opcode = match mnemonic {
            "TypeVoid" => Self::TypeVoid,
            "TypeBool" => Self::TypeBool,
            "TypeInt" => Self::TypeInt,
            "TypeFloat" => Self::TypeFloat,
            "TypeVector" => Self::TypeVector,
            "TypePointer" => Self::TypePointer,
            "TypeFunction" => Self::TypeFunction,
            "TypeImage" => Self::TypeImage,
            "TypeSampler" => Self::TypeSampler,
            "TypeSampledImage" => Self::TypeSampledImage,
            "Constant" => Self::Constant,
            "ConstantTrue" => Self::ConstantTrue,
            "ConstantFalse" => Self::ConstantFalse,
            "ConstantComposite" => Self::ConstantComposite,
            "Variable" => Self::Variable,
            "Load" => Self::Load,
            "Store" => Self::Store,
            "AccessChain" => Self::AccessChain,
            "CompositeConstruct" => Self::CompositeConstruct,
            "CompositeExtract" => Self::CompositeExtract,
            "CopyObject" => Self::CopyObject,
            "FAdd" => Self::FAdd,
            "FMul" => Self::FMul,
            "IAdd" => Self::IAdd,
            "SLessThan" => Self::SLessThan,
            "SampledImage" => Self::SampledImage,
            "Image" => Self::Image,
            "ImageSampleImplicitLod" => Self::ImageSampleImplicitLod,
            "FunctionCall" => Self::FunctionCall,
            "Phi" => Self::Phi,
            "SelectionMerge" => Self::SelectionMerge,
            "LoopMerge" => Self::LoopMerge,
            "Branch" => Self::Branch,
            "BranchConditional" => Self::BranchConditional,
            "Return" => Self::Return,
            "ReturnValue" => Self::ReturnValue,
            "Kill" => Self::Kill,
            "TerminateInvocation" => Self::TerminateInvocation,
            "Unreachable" => Self::Unreachable,
            "DebugDeclare" => Self::DebugDeclare,
            "DebugValue" => Self::DebugValue,
            _ => return None,
        };
        Some(opcode)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
