//! Basic blocks

use mago_span::Span;
use std::cell::Cell;
use std::fmt;

use crate::bound::{BoundExpr, BoundStmt};
use crate::symbols::TypeHandle;

use super::edge::Edge;

/// Index of a block in its graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a block takes part in the routine's control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    Live(u32),
    Dead,
}

/// One type listed in a catch clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaughtType {
    pub name: String,
    pub handle: Option<TypeHandle>,
    pub span: Span,
}

#[derive(Debug)]
pub struct CatchInfo {
    pub types: Vec<CaughtType>,
    /// Variable receiving the exception; absent for `catch (E)`.
    pub variable: Option<BoundExpr>,
}

#[derive(Debug)]
pub struct CaseInfo {
    /// `None` for the default arm, written or implicit.
    pub value: Option<BoundExpr>,
}

#[derive(Debug)]
pub enum BlockKind {
    Plain,
    Start,
    Exit,
    Catch(CatchInfo),
    Case(CaseInfo),
}

#[derive(Debug)]
pub struct BasicBlock {
    id: BlockId,
    kind: BlockKind,
    statements: Vec<BoundStmt>,
    next_edge: Option<Edge>,
    reachability: Reachability,
    tag: Cell<u32>,
}

impl BasicBlock {
    pub(crate) fn new(id: BlockId, kind: BlockKind, reachability: Reachability) -> Self {
        Self {
            id,
            kind,
            statements: Vec::new(),
            next_edge: None,
            reachability,
            tag: Cell::new(0),
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    pub fn statements(&self) -> &[BoundStmt] {
        &self.statements
    }

    pub(crate) fn push_statement(&mut self, stmt: BoundStmt) {
        self.statements.push(stmt);
    }

    /// The outgoing edge; absent only for the exit block.
    pub fn edge(&self) -> Option<&Edge> {
        self.next_edge.as_ref()
    }

    pub(crate) fn set_edge(&mut self, edge: Edge) {
        assert!(
            self.next_edge.is_none(),
            "block {} already has an outgoing edge",
            self.id
        );
        self.next_edge = Some(edge);
    }

    pub fn reachability(&self) -> Reachability {
        self.reachability
    }

    pub(crate) fn set_reachability(&mut self, reachability: Reachability) {
        self.reachability = reachability;
    }

    pub fn ordinal(&self) -> Option<u32> {
        match self.reachability {
            Reachability::Live(ordinal) => Some(ordinal),
            Reachability::Dead => None,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.reachability == Reachability::Dead
    }

    pub fn tag(&self) -> u32 {
        self.tag.get()
    }

    pub fn set_tag(&self, tag: u32) {
        self.tag.set(tag);
    }

    pub fn is_start(&self) -> bool {
        matches!(self.kind, BlockKind::Start)
    }

    pub fn is_exit(&self) -> bool {
        matches!(self.kind, BlockKind::Exit)
    }

    pub fn is_plain(&self) -> bool {
        matches!(self.kind, BlockKind::Plain)
    }

    pub fn catch_info(&self) -> Option<&CatchInfo> {
        match &self.kind {
            BlockKind::Catch(info) => Some(info),
            _ => None,
        }
    }

    pub fn case_info(&self) -> Option<&CaseInfo> {
        match &self.kind {
            BlockKind::Case(info) => Some(info),
            _ => None,
        }
    }

    /// Whether this is the default arm of a switch.
    pub fn is_default_case(&self) -> bool {
        self.case_info().map(|c| c.value.is_none()).unwrap_or(false)
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            BlockKind::Plain => "block",
            BlockKind::Start => "start",
            BlockKind::Exit => "exit",
            BlockKind::Catch(_) => "catch",
            BlockKind::Case(_) => "case",
        }
    }
}
