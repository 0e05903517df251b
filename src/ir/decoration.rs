use crate::ir::Id;
use std::fmt;

/// The kind of a decoration.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum DecorationKind {
    RelaxedPrecision,
    Location,
    Binding,
    DescriptorSet,
    BuiltIn,
    Flat,
    NonWritable,
}

impl DecorationKind {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::RelaxedPrecision => "RelaxedPrecision",
            Self::Location => "Location",
            Self::Binding => "Binding",
            Self::DescriptorSet => "DescriptorSet",
            Self::BuiltIn => "BuiltIn",
            Self::Flat => "Flat",
            Self::NonWritable => "NonWritable",
        }
    }

    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        let kind = match mnemonic {
            "RelaxedPrecision" => Self::RelaxedPrecision,
            "Location" => Self::Location,
            "Binding" => Self::Binding,
            "DescriptorSet" => Self::DescriptorSet,
            "BuiltIn" => Self::BuiltIn,
            "Flat" => Self::Flat,
            "NonWritable" => Self::NonWritable,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for DecorationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A decoration attached to an id.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Decoration {
    target: Id,
    kind: DecorationKind,
    literals: Vec<u32>,
}

impl Decoration {
    pub fn new(target: Id, kind: DecorationKind, literals: Vec<u32>) -> Self {
        Self {
            target,
            kind,
            literals,
        }
    }

    pub fn target(&self) -> Id {
        self.target
    }

    pub fn kind(&self) -> DecorationKind {
        self.kind
    }

    pub fn literals(&self) -> &[u32] {
        &self.literals
    }

    /// Clones this decoration onto another target id.
    pub fn retargeted(&self, target: Id) -> Self {
        Self {
            target,
            kind: self.kind,
            literals: self.literals.clone(),
        }
    }
}

impl fmt::Display for Decoration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decorate %{} {}", self.target, self.kind)?;
        for literal in &self.literals {
            write!(f, " {}", literal)?;
        }
        Ok(())
    }
}
