//! Virtual Tree
//!
//! Virtual nodes, the backend surface of a real tree, and the patch engine
//! that reconciles one with the other.
//!
//! # Pipeline
//!
//! ```text
//! render fn ──► VNode tree ──► patch(previous, next) ──► TreeBackend calls
//! ```
//!
//! The first render patches against a real node; every later render patches
//! against the previous vnode tree, whose bound real nodes are reused.

mod backend;
mod memory;
mod patch;
mod props;
mod vnode;

pub use backend::{NodeId, TreeBackend};
pub use memory::{MemoryTree, TreeOp};
pub use patch::{patch, patch_vnode, same_vnode, update_children, PatchTarget};
pub use props::{class_list, merged_style, ClassList};
pub use vnode::{ClassBinding, VNode, VNodeData};
