//! Real-Tree Backend
//!
//! The patch engine never touches a real tree directly. It drives one through
//! [`TreeBackend`], addressing nodes by the [`NodeId`] handles the backend
//! issues.

use serde::{Deserialize, Serialize};

use crate::error::TreeError;

/// Handle to a node of a real tree. Only meaningful to the backend that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Operations the patch engine needs from a real tree.
///
/// Every mutating operation may fail; failures propagate out of
/// [`patch`](super::patch) unchanged.
pub trait TreeBackend {
    fn create_element(&mut self, tag: &str) -> Result<NodeId, TreeError>;

    fn create_text(&mut self, text: &str) -> Result<NodeId, TreeError>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), TreeError>;

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), TreeError>;

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> Result<(), TreeError>;

    fn remove_style(&mut self, node: NodeId, property: &str) -> Result<(), TreeError>;

    /// Replace the node's class list.
    fn set_class(&mut self, node: NodeId, classes: &[String]) -> Result<(), TreeError>;

    /// Replace the content of a text node.
    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), TreeError>;

    /// Insert `node` under `parent` before `reference`, or append when
    /// `reference` is `None`. A node that already has a parent is moved.
    fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), TreeError>;

    fn remove_child(&mut self, parent: NodeId, node: NodeId) -> Result<(), TreeError>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
}
