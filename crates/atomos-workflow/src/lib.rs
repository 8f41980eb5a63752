//! atomos Workflow
//!
//! This crate turns a parsed manifest into a data-flow graph and decides the
//! order blocks run in.
//!
//! - An edge joins two blocks whenever one connection's output label equals
//!   another connection's input label
//! - Roots are blocks with no upstream producer, in declaration order
//! - Cycles are rejected before a workflow is accepted
//! - Labels are checked before a run: nothing may read an unproduced label
//! - [`Traversal`] walks the graph breadth-first, producers before consumers

mod block;
mod error;
mod graph;
mod roots;
mod traversal;
mod validate;
mod workflow;

pub use block::{Block, Connection};
pub use error::GraphError;
pub use graph::{Edge, Graph};
pub use roots::{find_root, roots};
pub use traversal::{Traversal, Visit};
pub use validate::{detect_cycle, validate_labels};
pub use workflow::Workflow;
