//! Function Call Graph
//!
//! Tracks which module functions call which. Calls to ids that are not
//! module functions are ignored.

use crate::ir::{Id, Module};
use std::cmp;
use std::collections::{BTreeMap, BTreeSet};

pub struct CallGraph {
    callees: BTreeMap<Id, BTreeSet<Id>>,
}

impl CallGraph {
    pub fn new(module: &Module) -> Self {
        let mut callees: BTreeMap<Id, BTreeSet<Id>> = BTreeMap::new();

        for function in module.functions() {
            callees.entry(function.id()).or_default();
        }

        for function in module.functions() {
            for block in function.blocks() {
                for instruction in block.instructions() {
                    if let Some(target) = instruction.call_target() {
                        if module.function(target).is_some() {
                            callees.entry(function.id()).or_default().insert(target);
                        }
                    }
                }
            }
        }

        Self { callees }
    }

    pub fn callees(&self, function: Id) -> Option<&BTreeSet<Id>> {
        self.callees.get(&function)
    }

    pub fn calls(&self, caller: Id, callee: Id) -> bool {
        self.callees
            .get(&caller)
            .map_or(false, |callees| callees.contains(&callee))
    }

    /// All functions on a call cycle, including self-recursive ones.
    ///
    /// Computed via Tarjan's strongly connected components algorithm. A
    /// function is recursive iff its component has more than one member or
    /// it calls itself directly.
    pub fn recursive_functions(&self) -> BTreeSet<Id> {
        let mut recursive = BTreeSet::new();
        let mut next_index = 0;
        let mut index: BTreeMap<Id, usize> = BTreeMap::new();
        let mut lowlink: BTreeMap<Id, usize> = BTreeMap::new();
        let mut stack: Vec<Id> = Vec::new();
        let mut on_stack: BTreeSet<Id> = BTreeSet::new();

        for root in self.callees.keys().copied() {
            if index.contains_key(&root) {
                continue;
            }

            let mut frames = vec![self.new_frame(
                root,
                &mut next_index,
                &mut index,
                &mut lowlink,
                &mut stack,
                &mut on_stack,
            )];
            while !frames.is_empty() {
                let last = frames.len() - 1;
                let node = frames[last].node;
                let child = {
                    let frame = &mut frames[last];
                    let child = frame.children.get(frame.next_child).copied();
                    if child.is_some() {
                        frame.next_child += 1;
                    }
                    child
                };
                match child {
                    Some(child) if !index.contains_key(&child) => {
                        let frame = self.new_frame(
                            child,
                            &mut next_index,
                            &mut index,
                            &mut lowlink,
                            &mut stack,
                            &mut on_stack,
                        );
                        frames.push(frame);
                    }
                    Some(child) => {
                        if on_stack.contains(&child) {
                            let low = cmp::min(lowlink[&node], index[&child]);
                            lowlink.insert(node, low);
                        }
                    }
                    None => {
                        frames.pop();
                        if let Some(parent) = frames.last() {
                            let low = cmp::min(lowlink[&parent.node], lowlink[&node]);
                            lowlink.insert(parent.node, low);
                        }
                        if lowlink[&node] == index[&node] {
                            let mut component = Vec::new();
                            while let Some(member) = stack.pop() {
                                on_stack.remove(&member);
                                component.push(member);
                                if member == node {
                                    break;
                                }
                            }
                            if component.len() > 1 || self.calls(node, node) {
                                recursive.extend(component);
                            }
                        }
                    }
                }
            }
        }

        recursive
    }

    fn new_frame(
        &self,
        node: Id,
        next_index: &mut usize,
        index: &mut BTreeMap<Id, usize>,
        lowlink: &mut BTreeMap<Id, usize>,
        stack: &mut Vec<Id>,
        on_stack: &mut BTreeSet<Id>,
    ) -> Frame {
        index.insert(node, *next_index);
        lowlink.insert(node, *next_index);
        *next_index += 1;
        stack.push(node);
        on_stack.insert(node);
        Frame {
            node,
            children: self
                .callees
                .get(&node)
                .map(|callees| callees.iter().copied().collect())
                .unwrap_or_default(),
            next_child: 0,
        }
    }
}

struct Frame {
    node: Id,
    children: Vec<Id>,
    next_child: usize,
}
