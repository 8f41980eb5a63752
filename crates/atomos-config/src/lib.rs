//! atomos Config
//!
//! This crate contains the serializable workflow manifest types for atomos.
//! A manifest lists the blocks a workflow depends on and the connections that
//! wire one block's output to another block's input.
//!
//! Manifests can be loaded from:
//! - YAML files (the usual format, e.g. `pipeline.yaml`)
//! - JSON files (anything with a `.json` extension)
//!
//! The schema is permissive: missing scalar fields decode to their zero value.
//! The engine resolves these types into a locked graph before execution.

mod block;
mod connection;
mod enums;
mod error;
mod workflow;

pub use block::BlockDef;
pub use connection::ConnectionDef;
pub use enums::{ExecutionMode, ExecutionSettings};
pub use error::ManifestError;
pub use workflow::WorkflowManifest;
