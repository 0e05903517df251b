//! Structured Control Flow
//!
//! Classifies the blocks of a function by the structured constructs that
//! contain them. A construct spans the blocks reachable from its header
//! without passing through the merge block. For loops, the blocks reachable
//! from the continue target without passing through the header form the
//! continue construct.

use crate::ir::{Function, Id, Opcode, Operand};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

pub struct StructuredControlFlow {
    construct_blocks: BTreeSet<Id>,
    loop_blocks: BTreeSet<Id>,
    continue_blocks: BTreeSet<Id>,
}

impl StructuredControlFlow {
    pub fn new(function: &Function) -> Self {
        let successors: BTreeMap<Id, Vec<Id>> = function
            .blocks()
            .iter()
            .map(|block| (block.label(), block.successor_labels()))
            .collect();

        let mut construct_blocks = BTreeSet::new();
        let mut loop_blocks = BTreeSet::new();
        let mut continue_blocks = BTreeSet::new();

        for block in function.blocks() {
            let merge = match block.merge() {
                Some(merge) => merge,
                None => continue,
            };
            let header = block.label();
            let body_starts = successors.get(&header).cloned().unwrap_or_default();
            match merge.opcode() {
                Opcode::SelectionMerge => {
                    if let Some(merge_target) = merge.operands().get(0).and_then(Operand::block) {
                        let mut stops = BTreeSet::new();
                        stops.insert(merge_target);
                        stops.insert(header);
                        let interior = reachable(&successors, &body_starts, &stops);
                        construct_blocks.extend(interior);
                    }
                }
                Opcode::LoopMerge => {
                    let merge_target = merge.operands().get(0).and_then(Operand::block);
                    let continue_target = merge.operands().get(1).and_then(Operand::block);
                    if let (Some(merge_target), Some(continue_target)) =
                        (merge_target, continue_target)
                    {
                        let mut stops = BTreeSet::new();
                        stops.insert(merge_target);
                        stops.insert(header);
                        let body = reachable(&successors, &body_starts, &stops);
                        construct_blocks.extend(body.iter().copied());
                        loop_blocks.extend(body);

                        let mut stops = BTreeSet::new();
                        stops.insert(header);
                        stops.insert(merge_target);
                        let continue_construct =
                            reachable(&successors, &[continue_target], &stops);
                        construct_blocks.extend(continue_construct.iter().copied());
                        loop_blocks.extend(continue_construct.iter().copied());
                        continue_blocks.extend(continue_construct);
                    }
                }
                _ => {}
            }
        }

        Self {
            construct_blocks,
            loop_blocks,
            continue_blocks,
        }
    }

    /// Returns whether the block lies inside any structured construct.
    pub fn is_in_construct(&self, label: Id) -> bool {
        self.construct_blocks.contains(&label)
    }

    /// Returns whether the block lies inside any loop construct.
    pub fn is_in_loop(&self, label: Id) -> bool {
        self.loop_blocks.contains(&label)
    }

    /// Returns whether the block lies inside any continue construct.
    pub fn is_in_continue_construct(&self, label: Id) -> bool {
        self.continue_blocks.contains(&label)
    }
}

fn reachable(
    successors: &BTreeMap<Id, Vec<Id>>,
    starts: &[Id],
    stops: &BTreeSet<Id>,
) -> BTreeSet<Id> {
    let mut visited = BTreeSet::new();
    let mut queue: VecDeque<Id> = starts
        .iter()
        .copied()
        .filter(|label| !stops.contains(label))
        .collect();
    while let Some(label) = queue.pop_front() {
        if !visited.insert(label) {
            continue;
        }
        if let Some(next) = successors.get(&label) {
            for successor in next {
                if !stops.contains(successor) && !visited.contains(successor) {
                    queue.push_back(*successor);
                }
            }
        }
    }
    visited
}
