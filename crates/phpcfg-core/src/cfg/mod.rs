//! Blocks, edges and the control flow graph

mod block;
mod edge;
mod graph;

pub use block::{BasicBlock, BlockId, BlockKind, CaseInfo, CatchInfo, CaughtType, Reachability};
pub use edge::{
    ConditionalEdge, Edge, ForeachEnumereeEdge, ForeachMoveNextEdge, LeaveEdge, SimpleEdge, SwitchEdge,
    TryCatchEdge,
};
pub use graph::{ControlFlowGraph, LabelFlags, LabelInfo, ThrowSite};

pub(crate) use graph::breadth_first;
