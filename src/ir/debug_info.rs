use crate::ir::Id;
use std::collections::BTreeMap;
use std::fmt;

/// A line and column in the original source text.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct SourceLocation {
    line: u32,
    column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }
}

/// The debug scope of an instruction.
///
/// `lexical_scope` references a debug entity, `inlined_at` an `InlinedAt`
/// record describing the call chain through which the instruction was inlined.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct DebugScope {
    lexical_scope: Id,
    inlined_at: Option<Id>,
}

impl DebugScope {
    pub fn new(lexical_scope: Id, inlined_at: Option<Id>) -> Self {
        Self {
            lexical_scope,
            inlined_at,
        }
    }

    pub fn lexical_scope(&self) -> Id {
        self.lexical_scope
    }

    pub fn inlined_at(&self) -> Option<Id> {
        self.inlined_at
    }
}

/// One link of an inlining chain.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct InlinedAtRecord {
    line: u32,
    scope: Id,
    inlined: Option<Id>,
}

impl InlinedAtRecord {
    pub fn new(line: u32, scope: Id, inlined: Option<Id>) -> Self {
        Self {
            line,
            scope,
            inlined,
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn scope(&self) -> Id {
        self.scope
    }

    pub fn inlined(&self) -> Option<Id> {
        self.inlined
    }

    pub fn set_inlined(&mut self, inlined: Option<Id>) {
        self.inlined = inlined;
    }
}

/// A non-semantic debug entity.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum DebugEntity {
    Function {
        name: String,
        line: u32,
        function: Id,
    },
    LexicalBlock {
        line: u32,
        parent: Id,
    },
    LocalVariable {
        name: String,
        line: u32,
        parent: Id,
    },
    InlinedAt(InlinedAtRecord),
}

/// The debug entities of a module, keyed by entity id.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DebugInfo {
    entities: BTreeMap<Id, DebugEntity>,
}

impl DebugInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&mut self, id: Id, entity: DebugEntity) {
        self.entities.insert(id, entity);
    }

    pub fn entity(&self, id: Id) -> Option<&DebugEntity> {
        self.entities.get(&id)
    }

    pub fn entities(&self) -> &BTreeMap<Id, DebugEntity> {
        &self.entities
    }

    pub fn inlined_at(&self, id: Id) -> Option<&InlinedAtRecord> {
        match self.entities.get(&id) {
            Some(DebugEntity::InlinedAt(record)) => Some(record),
            _ => None,
        }
    }

    pub fn set_inlined_parent(&mut self, id: Id, inlined: Option<Id>) {
        if let Some(DebugEntity::InlinedAt(record)) = self.entities.get_mut(&id) {
            record.set_inlined(inlined);
        }
    }

    /// The debug entity describing `function`, if any.
    pub fn function_entity(&self, function: Id) -> Option<Id> {
        self.entities.iter().find_map(|(id, entity)| match entity {
            DebugEntity::Function { function: f, .. } if *f == function => Some(*id),
            _ => None,
        })
    }

    /// The source line recorded for a debug entity.
    pub fn entity_line(&self, id: Id) -> Option<u32> {
        match self.entities.get(&id)? {
            DebugEntity::Function { line, .. } => Some(*line),
            DebugEntity::LexicalBlock { line, .. } => Some(*line),
            DebugEntity::LocalVariable { line, .. } => Some(*line),
            DebugEntity::InlinedAt(record) => Some(record.line()),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl fmt::Display for DebugInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, entity) in &self.entities {
            match entity {
                DebugEntity::Function {
                    name,
                    line,
                    function,
                } => writeln!(
                    f,
                    "debug_function %{} \"{}\" line {} function %{}",
                    id, name, line, function
                )?,
                DebugEntity::LexicalBlock { line, parent } => {
                    writeln!(f, "debug_lexical_block %{} line {} parent %{}", id, line, parent)?
                }
                DebugEntity::LocalVariable { name, line, parent } => writeln!(
                    f,
                    "debug_local_variable %{} \"{}\" line {} parent %{}",
                    id, name, line, parent
                )?,
                DebugEntity::InlinedAt(record) => {
                    write!(f, "debug_inlined_at %{} line {} scope %{}", id, record.line(), record.scope())?;
                    if let Some(inlined) = record.inlined() {
                        write!(f, " inlined %{}", inlined)?;
                    }
                    writeln!(f)?;
                }
            }
        }
        Ok(())
    }
}
