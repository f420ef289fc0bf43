//! The finished control flow graph of one routine

use std::cell::Cell;
use std::collections::{BTreeMap, HashSet, VecDeque};

use mago_span::Span;

use crate::diagnostic::Diagnostic;
use crate::visitor::Visitor;

use super::block::{BasicBlock, BlockId};
use super::edge::Edge;

/// Label state bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelFlags(u8);

impl LabelFlags {
    pub const DEFINED: LabelFlags = LabelFlags(1 << 0);
    pub const USED: LabelFlags = LabelFlags(1 << 1);
    pub const REDEFINED: LabelFlags = LabelFlags(1 << 2);

    pub fn contains(self, other: LabelFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: LabelFlags) {
        self.0 |= other.0;
    }
}

#[derive(Debug, Clone)]
pub struct LabelInfo {
    pub block: BlockId,
    /// Span of the label definition, or of the first `goto` if never defined.
    pub span: Span,
    pub flags: LabelFlags,
}

impl LabelInfo {
    pub fn is_defined(&self) -> bool {
        self.flags.contains(LabelFlags::DEFINED)
    }

    pub fn is_used(&self) -> bool {
        self.flags.contains(LabelFlags::USED)
    }

    pub fn is_redefined(&self) -> bool {
        self.flags.contains(LabelFlags::REDEFINED)
    }
}

/// A `throw` and the try region it occurs in.
#[derive(Debug, Clone)]
pub struct ThrowSite {
    pub block: BlockId,
    pub span: Span,
    /// Block owning the innermost enclosing [`Edge::TryCatch`], if any.
    pub try_block: Option<BlockId>,
    /// Class name for `throw new X(...)`.
    pub exception_type: Option<String>,
}

impl ThrowSite {
    /// The catch block statically predicted to handle this throw.
    pub fn handler(&self, graph: &ControlFlowGraph) -> Option<BlockId> {
        let exception_type = self.exception_type.as_deref()?;
        match graph.block(self.try_block?).edge() {
            Some(Edge::TryCatch(edge)) => edge.handling_catch(graph, exception_type),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ControlFlowGraph {
    blocks: Vec<BasicBlock>,
    start: BlockId,
    exit: BlockId,
    labels: BTreeMap<String, LabelInfo>,
    unreachable: Vec<BlockId>,
    throw_sites: Vec<ThrowSite>,
    diagnostics: Vec<Diagnostic>,
    colors: Cell<u32>,
}

impl ControlFlowGraph {
    pub(crate) fn from_parts(
        blocks: Vec<BasicBlock>,
        start: BlockId,
        exit: BlockId,
        labels: BTreeMap<String, LabelInfo>,
        throw_sites: Vec<ThrowSite>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let unreachable = blocks.iter().filter(|b| b.is_dead()).map(|b| b.id()).collect();
        Self {
            blocks,
            start,
            exit,
            labels,
            unreachable,
            throw_sites,
            diagnostics,
            colors: Cell::new(0),
        }
    }

    pub fn start(&self) -> BlockId {
        self.start
    }

    pub fn exit(&self) -> BlockId {
        self.exit
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn labels(&self) -> &BTreeMap<String, LabelInfo> {
        &self.labels
    }

    pub fn label(&self, name: &str) -> Option<&LabelInfo> {
        self.labels.get(name)
    }

    /// Blocks with no path from the start block.
    pub fn unreachable_blocks(&self) -> &[BlockId] {
        &self.unreachable
    }

    pub fn throw_sites(&self) -> &[ThrowSite] {
        &self.throw_sites
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Distinct successors of a block.
    pub fn successors(&self, id: BlockId) -> Vec<BlockId> {
        let mut seen = HashSet::new();
        self.block(id)
            .edge()
            .map(|edge| edge.targets())
            .unwrap_or_default()
            .into_iter()
            .filter(|t| seen.insert(*t))
            .collect()
    }

    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        self.blocks
            .iter()
            .filter(|b| b.edge().map(|e| e.targets().contains(&id)).unwrap_or(false))
            .map(|b| b.id())
            .collect()
    }

    /// Blocks reachable from start, in breadth-first order.
    pub fn reachable_blocks(&self) -> Vec<BlockId> {
        breadth_first(&self.blocks, self.start)
    }

    /// A fresh color for marking blocks through their tag.
    pub fn new_color(&self) -> u32 {
        let color = self.colors.get() + 1;
        self.colors.set(color);
        color
    }

    /// Walk every reachable block once, breadth-first from start.
    ///
    /// Unreachable blocks are not visited; inspect them through
    /// [`ControlFlowGraph::unreachable_blocks`].
    pub fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        let color = self.new_color();
        let mut queue = VecDeque::from([self.start]);
        self.block(self.start).set_tag(color);

        while let Some(id) = queue.pop_front() {
            let block = self.block(id);
            visitor.traverse_block(block);
            for next in self.successors(id) {
                let target = self.block(next);
                if target.tag() != color && !target.is_dead() {
                    target.set_tag(color);
                    queue.push_back(next);
                }
            }
        }
    }

    /// Collapse chains of empty plain blocks joined by simple edges.
    ///
    /// Each candidate is replaced by the first block on its chain that has
    /// statements, another kind, another edge kind, or no edge. On a cycle of
    /// empty blocks the lowest-numbered block of the cycle stands for it.
    /// Results are de-duplicated and keep first-seen order.
    pub fn skip_empty(&self, candidates: &[BlockId]) -> Vec<BlockId> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();

        for &candidate in candidates {
            let representative = self.skip_chain(candidate);
            if seen.insert(representative) {
                result.push(representative);
            }
        }

        result
    }

    fn skip_chain(&self, start: BlockId) -> BlockId {
        let mut chain = vec![start];
        let mut current = start;

        loop {
            let block = self.block(current);
            let next = match block.edge() {
                Some(Edge::Simple(edge)) if block.is_plain() && block.statements().is_empty() => edge.target,
                _ => return current,
            };

            if let Some(pos) = chain.iter().position(|id| *id == next) {
                return chain[pos..].iter().copied().min().unwrap_or(current);
            }
            chain.push(next);
            current = next;
        }
    }
}

pub(crate) fn breadth_first(blocks: &[BasicBlock], start: BlockId) -> Vec<BlockId> {
    let mut order = Vec::new();
    let mut seen = vec![false; blocks.len()];
    let mut queue = VecDeque::from([start]);
    seen[start.index()] = true;

    while let Some(id) = queue.pop_front() {
        order.push(id);
        if let Some(edge) = blocks[id.index()].edge() {
            for target in edge.targets() {
                if !seen[target.index()] {
                    seen[target.index()] = true;
                    queue.push_back(target);
                }
            }
        }
    }

    order
}
