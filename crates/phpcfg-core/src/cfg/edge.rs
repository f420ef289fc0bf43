//! Edges between basic blocks
//!
//! Every block owns exactly one outgoing edge. Edges refer to their targets
//! by [`BlockId`] and are attached through [`Edge::connect`], never by
//! assigning to the block.

use mago_span::Span;

use crate::bound::BoundExpr;

use super::block::{BasicBlock, BlockId};
use super::graph::ControlFlowGraph;

#[derive(Debug)]
pub enum Edge {
    Simple(SimpleEdge),
    Leave(LeaveEdge),
    Conditional(ConditionalEdge),
    Switch(SwitchEdge),
    TryCatch(TryCatchEdge),
    ForeachEnumeree(ForeachEnumereeEdge),
    ForeachMoveNext(ForeachMoveNextEdge),
}

/// Unconditional jump. `syntax` is the `break`/`continue`/`goto` that caused it, if any.
#[derive(Debug)]
pub struct SimpleEdge {
    pub target: BlockId,
    pub syntax: Option<Span>,
}

/// Control leaving a try region; never lowered to a jump.
#[derive(Debug)]
pub struct LeaveEdge {
    pub target: BlockId,
}

#[derive(Debug)]
pub struct ConditionalEdge {
    pub true_target: BlockId,
    pub false_target: BlockId,
    pub condition: BoundExpr,
    pub is_loop: bool,
}

#[derive(Debug)]
pub struct SwitchEdge {
    pub value: BoundExpr,
    /// Case blocks in source order; the last one is the implicit default when none was written.
    pub case_blocks: Vec<BlockId>,
    pub end: BlockId,
}

#[derive(Debug)]
pub struct TryCatchEdge {
    pub body: BlockId,
    pub catch_blocks: Vec<BlockId>,
    pub finally: Option<BlockId>,
    pub end: BlockId,
}

/// Enumerator acquisition before the first iteration of a `foreach`.
#[derive(Debug)]
pub struct ForeachEnumereeEdge {
    pub target: BlockId,
    pub enumeree: BoundExpr,
    /// `foreach ($a as &$v)`.
    pub aliased: bool,
}

/// Iteration step of a `foreach`: true goes to the body, false to the end.
#[derive(Debug)]
pub struct ForeachMoveNextEdge {
    pub body: BlockId,
    pub end: BlockId,
    /// Block owning the matching [`ForeachEnumereeEdge`].
    pub enumeree_block: BlockId,
    pub key: Option<BoundExpr>,
    pub value: BoundExpr,
}

impl Edge {
    /// Attach this edge to its source block. A block accepts one edge only.
    pub fn connect(self, source: &mut BasicBlock) {
        source.set_edge(self);
    }

    /// Every block control may transfer to, in significant order.
    pub fn targets(&self) -> Vec<BlockId> {
        match self {
            Edge::Simple(e) => vec![e.target],
            Edge::Leave(e) => vec![e.target],
            Edge::Conditional(e) => vec![e.true_target, e.false_target],
            Edge::Switch(e) => e.case_blocks.clone(),
            Edge::TryCatch(e) => {
                let mut targets = Vec::with_capacity(e.catch_blocks.len() + 2);
                targets.push(e.body);
                targets.extend(&e.catch_blocks);
                targets.extend(e.finally);
                targets
            }
            Edge::ForeachEnumeree(e) => vec![e.target],
            Edge::ForeachMoveNext(e) => vec![e.body, e.end],
        }
    }

    /// The block where control continues once the construct completes.
    pub fn next_block(&self) -> BlockId {
        match self {
            Edge::Simple(e) => e.target,
            Edge::Leave(e) => e.target,
            Edge::Conditional(e) => e.false_target,
            Edge::Switch(e) => e.end,
            Edge::TryCatch(e) => e.end,
            Edge::ForeachEnumeree(e) => e.target,
            Edge::ForeachMoveNext(e) => e.end,
        }
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, Edge::Conditional(_) | Edge::ForeachMoveNext(_))
    }

    pub fn is_try_catch(&self) -> bool {
        matches!(self, Edge::TryCatch(_))
    }

    pub fn is_switch(&self) -> bool {
        matches!(self, Edge::Switch(_))
    }

    /// Plain unconditional jump (not a leave edge).
    pub fn is_simple(&self) -> bool {
        matches!(self, Edge::Simple(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Edge::Simple(_) => "simple",
            Edge::Leave(_) => "leave",
            Edge::Conditional(_) => "conditional",
            Edge::Switch(_) => "switch",
            Edge::TryCatch(_) => "trycatch",
            Edge::ForeachEnumeree(_) => "foreach-enumeree",
            Edge::ForeachMoveNext(_) => "foreach-movenext",
        }
    }

    /// Expressions evaluated by the edge itself (conditions, switch values, foreach parts).
    pub fn expressions(&self) -> Vec<&BoundExpr> {
        match self {
            Edge::Conditional(e) => vec![&e.condition],
            Edge::Switch(e) => vec![&e.value],
            Edge::ForeachEnumeree(e) => vec![&e.enumeree],
            Edge::ForeachMoveNext(e) => e.key.iter().chain(std::iter::once(&e.value)).collect(),
            Edge::Simple(_) | Edge::Leave(_) | Edge::TryCatch(_) => Vec::new(),
        }
    }
}

/// Case-insensitive class name comparison ignoring a leading `\`.
fn same_class(a: &str, b: &str) -> bool {
    a.trim_start_matches('\\')
        .eq_ignore_ascii_case(b.trim_start_matches('\\'))
}

/// Root types that catch every exception.
const ROOT_EXCEPTION_TYPES: [&str; 2] = ["Exception", "Throwable"];

impl TryCatchEdge {
    /// The first catch block, in declaration order, that handles `exception_type`.
    ///
    /// A catch matches when one of its types has the same name or is a root
    /// exception type. Subclass relations are not consulted.
    pub fn handling_catch(&self, graph: &ControlFlowGraph, exception_type: &str) -> Option<BlockId> {
        self.catch_blocks.iter().copied().find(|id| {
            graph
                .block(*id)
                .catch_info()
                .map(|info| {
                    info.types.iter().any(|t| {
                        same_class(&t.name, exception_type)
                            || ROOT_EXCEPTION_TYPES.iter().any(|root| same_class(&t.name, root))
                    })
                })
                .unwrap_or(false)
        })
    }
}

impl ForeachMoveNextEdge {
    /// The enumerator-acquisition edge this step belongs to.
    pub fn enumeree_edge<'g>(&self, graph: &'g ControlFlowGraph) -> Option<&'g ForeachEnumereeEdge> {
        match graph.block(self.enumeree_block).edge() {
            Some(Edge::ForeachEnumeree(edge)) => Some(edge),
            _ => None,
        }
    }
}
