//! phpcfg-core: semantic binding and control flow graphs for PHP routines
//!
//! This crate provides:
//! - `ast`: the syntax tree a front end fills from a PHP parser
//! - `AccessDescriptor`: how a bound expression is used by its parent
//! - `bound`: the bound node model produced by the `Binder`
//! - `cfg`: basic blocks, edges and the `ControlFlowGraph`
//! - `GraphBuilder`: builds one routine's graph in a single forward pass
//! - `Visitor` / `NodeVisitor`: traversal and double dispatch over bound nodes
//! - `SymbolResolver`: the lookup interface binding depends on

pub mod access;
pub mod ast;
pub mod binder;
pub mod bound;
pub mod builder;
pub mod cfg;
pub mod diagnostic;
pub mod symbols;
pub mod types;
pub mod visitor;

pub use access::{AccessDescriptor, AccessFlags};
pub use binder::Binder;
pub use builder::GraphBuilder;
pub use cfg::{BasicBlock, BlockId, ControlFlowGraph, Edge, Reachability};
pub use diagnostic::{Diagnostic, DiagnosticSeverity};
pub use symbols::{RoutineSymbols, SymbolResolver, TypeTable};
pub use types::TypeMask;
pub use visitor::{NodeVisitor, Visitor};
