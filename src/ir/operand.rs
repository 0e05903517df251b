use crate::ir::Id;
use std::fmt;

/// Storage class of a pointer or variable.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum StorageClass {
    Function,
    Private,
    Input,
    Output,
    Uniform,
    UniformConstant,
}

impl StorageClass {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Function => "Function",
            Self::Private => "Private",
            Self::Input => "Input",
            Self::Output => "Output",
            Self::Uniform => "Uniform",
            Self::UniformConstant => "UniformConstant",
        }
    }

    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        let storage_class = match mnemonic {
            "Function" => Self::Function,
            "Private" => Self::Private,
            "Input" => Self::Input,
            "Output" => Self::Output,
            "Uniform" => Self::Uniform,
            "UniformConstant" => Self::UniformConstant,
            _ => return None,
        };
        Some(storage_class)
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A single instruction operand.
///
/// `Id` references a result id, `Block` references a block label. The two are
/// kept distinct so that rewrites can retarget control-flow edges without
/// touching value uses, and vice versa.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Operand {
    Id(Id),
    Block(Id),
    Literal(u32),
    Storage(StorageClass),
}

impl Operand {
    pub fn id(&self) -> Option<Id> {
        match self {
            Self::Id(id) => Some(*id),
            _ => None,
        }
    }

    pub fn block(&self) -> Option<Id> {
        match self {
            Self::Block(label) => Some(*label),
            _ => None,
        }
    }

    pub fn literal(&self) -> Option<u32> {
        match self {
            Self::Literal(value) => Some(*value),
            _ => None,
        }
    }

    pub fn storage(&self) -> Option<StorageClass> {
        match self {
            Self::Storage(storage_class) => Some(*storage_class),
            _ => None,
        }
    }

    pub fn is_id(&self) -> bool {
        matches!(self, Self::Id(_))
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "%{}", id),
            Self::Block(label) => write!(f, "%{}", label),
            Self::Literal(value) => write!(f, "{}", value),
            Self::Storage(storage_class) => write!(f, "{}", storage_class),
        }
    }
}
