//! Tag library domain model.
//!
//! # Responsibility
//! - Define node variants, icons and tag templates.
//! - Own the library tree and resolve links into shadow views.
//!
//! # Invariants
//! - Every node is identified by a stable UUID unique within its library.
//! - The tree is the only owner of nodes; shadows and keys are handles.

pub mod icon;
pub mod link;
pub mod node;
pub mod settings;
pub mod tag;
pub mod tree;
