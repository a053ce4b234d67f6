//! Error types.
//!
//! Each concern gets its own enum: the real-tree backend, the patch engine,
//! the runtime's microtask loop and configuration loading.

use thiserror::Error;

use crate::vdom::NodeId;

/// Failure reported by a real-tree backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The handle does not name a live node of this tree.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    /// `node` was expected to be a child of `parent`.
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// Element-only operation applied to a text node.
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    /// Text-only operation applied to an element.
    #[error("node {0:?} is not a text node")]
    NotText(NodeId),

    /// Inserting `node` under `parent` would make a node its own ancestor.
    #[error("inserting {node:?} under {parent:?} would create a cycle")]
    Cycle { parent: NodeId, node: NodeId },

    /// Any other backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Failure while reconciling a virtual tree against the real tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// A vnode that should already be materialized has no bound real node.
    #[error("vnode <{tag}> has no bound real node")]
    MissingRealNode { tag: String },

    /// The real root handed to a first render has no parent to insert into.
    #[error("real root {0:?} is not attached to a parent")]
    DetachedRoot(NodeId),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Failure while driving the runtime's microtask queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The microtask checkpoint kept producing work past the configured limit.
    #[error("possible infinite update loop: microtask queue still busy after {turns} turns")]
    UpdateLoop { turns: usize },
}

/// Failure while loading a [`RuntimeConfig`](crate::config::RuntimeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
