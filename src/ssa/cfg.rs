//! Control-flow graph induced by an instruction list.
//!
//! Synthetic bodies are mostly straight-line. Blocks end after a `Return`, `Throw`,
//! `Goto` or `Branch`, and start at every jump target. A `Return` that is followed by more
//! instructions also falls through to them, because consecutive returns model alternative
//! results of the same call. Every `Return` and `Throw` has an edge to the exit block,
//! which is a virtual block with index `blocks().len()`.

use std::collections::BTreeSet;

use crate::ssa::Instruction;

/// A maximal run of instructions without internal control transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BasicBlock {
    /// Index of the first instruction
    pub first: usize,
    /// Index of the last instruction, inclusive
    pub last: usize,
}

impl BasicBlock {
    /// Instruction indices covered by the block.
    #[must_use]
    pub fn range(&self) -> std::ops::RangeInclusive<usize> {
        self.first..=self.last
    }
}

/// Basic blocks and edges of a synthetic body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InducedCfg {
    blocks: Vec<BasicBlock>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl InducedCfg {
    /// Splits `instructions` into blocks and connects them.
    #[must_use]
    pub fn new(instructions: &[Instruction]) -> Self {
        let count = instructions.len();
        let mut leaders = BTreeSet::new();
        if count > 0 {
            leaders.insert(0);
        }
        for (index, instruction) in instructions.iter().enumerate() {
            if instruction.is_terminator() && index + 1 < count {
                leaders.insert(index + 1);
            }
            if let Some(target) = instruction.branch_target() {
                if target < count {
                    leaders.insert(target);
                }
            }
        }

        let starts: Vec<usize> = leaders.into_iter().collect();
        let blocks: Vec<BasicBlock> = starts
            .iter()
            .enumerate()
            .map(|(i, &first)| BasicBlock {
                first,
                last: starts.get(i + 1).map_or(count, |&next| next) - 1,
            })
            .collect();

        let exit = blocks.len();
        let block_of = |instruction: usize| -> usize {
            if instruction >= count {
                return exit;
            }
            starts.partition_point(|&start| start <= instruction) - 1
        };

        let mut successors = vec![Vec::new(); blocks.len() + 1];
        for (index, block) in blocks.iter().enumerate() {
            let fall_through = if index + 1 < blocks.len() { index + 1 } else { exit };
            let mut targets = Vec::new();
            match &instructions[block.last] {
                Instruction::Goto { target } => targets.push(block_of(*target)),
                Instruction::Branch { target, .. } => {
                    targets.push(fall_through);
                    targets.push(block_of(*target));
                }
                Instruction::Return { .. } => {
                    targets.push(exit);
                    if fall_through != exit {
                        targets.push(fall_through);
                    }
                }
                Instruction::Throw { .. } => targets.push(exit),
                _ => targets.push(fall_through),
            }
            targets.dedup();
            successors[index] = targets;
        }

        let mut predecessors = vec![Vec::new(); blocks.len() + 1];
        for (from, targets) in successors.iter().enumerate() {
            for &to in targets {
                if !predecessors[to].contains(&from) {
                    predecessors[to].push(from);
                }
            }
        }

        Self {
            blocks,
            successors,
            predecessors,
        }
    }

    /// The blocks in instruction order, exit excluded.
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Index of the entry block; equals [`InducedCfg::exit`] for an empty body.
    #[must_use]
    pub fn entry(&self) -> usize {
        0
    }

    /// Index of the virtual exit block.
    #[must_use]
    pub fn exit(&self) -> usize {
        self.blocks.len()
    }

    /// Successor blocks of `block`.
    #[must_use]
    pub fn successors(&self, block: usize) -> &[usize] {
        self.successors.get(block).map_or(&[], Vec::as_slice)
    }

    /// Predecessor blocks of `block`.
    #[must_use]
    pub fn predecessors(&self, block: usize) -> &[usize] {
        self.predecessors.get(block).map_or(&[], Vec::as_slice)
    }

    /// The block containing instruction `index`.
    #[must_use]
    pub fn block_of(&self, index: usize) -> Option<usize> {
        self.blocks
            .iter()
            .position(|block| block.range().contains(&index))
    }

    /// Total number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.successors.iter().map(Vec::len).sum()
    }
}
