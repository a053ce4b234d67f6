//! In-Memory Real Tree
//!
//! A complete [`TreeBackend`] that keeps nodes in an arena. It records every
//! mutation it receives as a [`TreeOp`], which makes it both a headless
//! renderer and a precise test double for the patch engine.

use indexmap::IndexMap;
use serde::Serialize;

use super::backend::{NodeId, TreeBackend};
use crate::error::TreeError;

/// One mutation received by a [`MemoryTree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TreeOp {
    CreateElement { node: NodeId, tag: String },
    CreateText { node: NodeId, text: String },
    SetAttribute { node: NodeId, name: String, value: String },
    RemoveAttribute { node: NodeId, name: String },
    SetStyle { node: NodeId, property: String, value: String },
    RemoveStyle { node: NodeId, property: String },
    SetClass { node: NodeId, classes: Vec<String> },
    SetText { node: NodeId, text: String },
    /// `moved` is true when the node already had a parent.
    Insert {
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
        moved: bool,
    },
    Remove { parent: NodeId, node: NodeId },
}

impl TreeOp {
    pub fn is_create(&self) -> bool {
        matches!(self, TreeOp::CreateElement { .. } | TreeOp::CreateText { .. })
    }

    pub fn is_move(&self) -> bool {
        matches!(self, TreeOp::Insert { moved: true, .. })
    }

    pub fn is_remove(&self) -> bool {
        matches!(self, TreeOp::Remove { .. })
    }
}

#[derive(Debug, Clone)]
enum Content {
    Element {
        tag: String,
        attrs: IndexMap<String, String>,
        style: IndexMap<String, String>,
        classes: Vec<String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct MemNode {
    content: Content,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed real tree.
#[derive(Debug, Clone)]
pub struct MemoryTree {
    nodes: Vec<MemNode>,
    root: NodeId,
    ops: Vec<TreeOp>,
}

impl MemoryTree {
    /// Create a tree holding only an empty `body` root.
    pub fn new() -> Self {
        let root = MemNode {
            content: Content::Element {
                tag: "body".to_string(),
                attrs: IndexMap::new(),
                style: IndexMap::new(),
                classes: Vec::new(),
            },
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: NodeId::from(0),
            ops: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Append an empty `<div>` to the root and return it, to serve as the
    /// real node a first render replaces. Not recorded in the op log.
    pub fn mount_point(&mut self) -> Result<NodeId, TreeError> {
        let node = self.create_element("div")?;
        let root = self.root;
        self.insert_before(root, node, None)?;
        self.clear_ops();
        Ok(node)
    }

    /// Mutations received since creation or the last [`clear_ops`](Self::clear_ops).
    pub fn ops(&self) -> &[TreeOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Number of nodes ever created, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.get(node).ok()?.content {
            Content::Element { tag, .. } => Some(tag.as_str()),
            Content::Text(_) => None,
        }
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.get(node).ok()?.content {
            Content::Text(text) => Some(text.as_str()),
            Content::Element { .. } => None,
        }
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.get(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.get(node).ok()?.content {
            Content::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            Content::Text(_) => None,
        }
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        match &self.get(node).ok()?.content {
            Content::Element { style, .. } => style.get(property).map(String::as_str),
            Content::Text(_) => None,
        }
    }

    pub fn classes(&self, node: NodeId) -> &[String] {
        match self.get(node).map(|n| &n.content) {
            Ok(Content::Element { classes, .. }) => classes.as_slice(),
            _ => &[],
        }
    }

    /// Whether `node` is connected to the root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Serialize the subtree under `node` as HTML.
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Ok(mem) = self.get(node) else { return };
        match &mem.content {
            Content::Text(text) => out.push_str(&escape(text)),
            Content::Element {
                tag,
                attrs,
                style,
                classes,
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push_str(&format!(" {}=\"{}\"", name, escape(value)));
                }
                if !classes.is_empty() {
                    out.push_str(&format!(" class=\"{}\"", escape(&classes.join(" "))));
                }
                if !style.is_empty() {
                    let css: Vec<String> = style.iter().map(|(p, v)| format!("{p}: {v};")).collect();
                    out.push_str(&format!(" style=\"{}\"", escape(&css.join(" "))));
                }
                out.push('>');
                for child in &mem.children {
                    self.write_html(*child, out);
                }
                out.push_str(&format!("</{tag}>"));
            }
        }
    }

    fn get(&self, node: NodeId) -> Result<&MemNode, TreeError> {
        usize::try_from(node.raw())
            .ok()
            .and_then(|index| self.nodes.get(index))
            .ok_or(TreeError::UnknownNode(node))
    }

    fn get_mut(&mut self, node: NodeId) -> Result<&mut MemNode, TreeError> {
        usize::try_from(node.raw())
            .ok()
            .and_then(|index| self.nodes.get_mut(index))
            .ok_or(TreeError::UnknownNode(node))
    }

    fn alloc(&mut self, content: Content) -> NodeId {
        let id = NodeId::from(self.nodes.len() as u64);
        self.nodes.push(MemNode {
            content,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn element_mut(
        &mut self,
        node: NodeId,
    ) -> Result<(&mut IndexMap<String, String>, &mut IndexMap<String, String>, &mut Vec<String>), TreeError> {
        match &mut self.get_mut(node)?.content {
            Content::Element {
                attrs,
                style,
                classes,
                ..
            } => Ok((attrs, style, classes)),
            Content::Text(_) => Err(TreeError::NotAnElement(node)),
        }
    }

    fn detach(&mut self, node: NodeId) -> Result<bool, TreeError> {
        let Some(parent) = self.get(node)?.parent else {
            return Ok(false);
        };
        self.get_mut(parent)?.children.retain(|child| *child != node);
        self.get_mut(node)?.parent = None;
        Ok(true)
    }
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBackend for MemoryTree {
    fn create_element(&mut self, tag: &str) -> Result<NodeId, TreeError> {
        let node = self.alloc(Content::Element {
            tag: tag.to_string(),
            attrs: IndexMap::new(),
            style: IndexMap::new(),
            classes: Vec::new(),
        });
        self.ops.push(TreeOp::CreateElement {
            node,
            tag: tag.to_string(),
        });
        Ok(node)
    }

    fn create_text(&mut self, text: &str) -> Result<NodeId, TreeError> {
        let node = self.alloc(Content::Text(text.to_string()));
        self.ops.push(TreeOp::CreateText {
            node,
            text: text.to_string(),
        });
        Ok(node)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), TreeError> {
        let (attrs, _, _) = self.element_mut(node)?;
        attrs.insert(name.to_string(), value.to_string());
        self.ops.push(TreeOp::SetAttribute {
            node,
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), TreeError> {
        let (attrs, _, _) = self.element_mut(node)?;
        attrs.shift_remove(name);
        self.ops.push(TreeOp::RemoveAttribute {
            node,
            name: name.to_string(),
        });
        Ok(())
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> Result<(), TreeError> {
        let (_, style, _) = self.element_mut(node)?;
        style.insert(property.to_string(), value.to_string());
        self.ops.push(TreeOp::SetStyle {
            node,
            property: property.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn remove_style(&mut self, node: NodeId, property: &str) -> Result<(), TreeError> {
        let (_, style, _) = self.element_mut(node)?;
        style.shift_remove(property);
        self.ops.push(TreeOp::RemoveStyle {
            node,
            property: property.to_string(),
        });
        Ok(())
    }

    fn set_class(&mut self, node: NodeId, classes: &[String]) -> Result<(), TreeError> {
        let (_, _, current) = self.element_mut(node)?;
        *current = classes.to_vec();
        self.ops.push(TreeOp::SetClass {
            node,
            classes: classes.to_vec(),
        });
        Ok(())
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), TreeError> {
        match &mut self.get_mut(node)?.content {
            Content::Text(current) => *current = text.to_string(),
            Content::Element { .. } => return Err(TreeError::NotText(node)),
        }
        self.ops.push(TreeOp::SetText {
            node,
            text: text.to_string(),
        });
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), TreeError> {
        if let Content::Text(_) = self.get(parent)?.content {
            return Err(TreeError::NotAnElement(parent));
        }
        self.get(node)?;
        if let Some(reference) = reference {
            if self.get(reference)?.parent != Some(parent) {
                return Err(TreeError::NotAChild {
                    parent,
                    child: reference,
                });
            }
        }

        // The node may not be the parent or one of its ancestors.
        let mut ancestor = Some(parent);
        while let Some(id) = ancestor {
            if id == node {
                return Err(TreeError::Cycle { parent, node });
            }
            ancestor = self.get(id)?.parent;
        }

        let moved = self.get(node)?.parent.is_some();
        if reference != Some(node) {
            self.detach(node)?;
            let siblings = &mut self.get_mut(parent)?.children;
            let index = reference
                .and_then(|r| siblings.iter().position(|child| *child == r))
                .unwrap_or(siblings.len());
            siblings.insert(index, node);
            self.get_mut(node)?.parent = Some(parent);
        }

        self.ops.push(TreeOp::Insert {
            parent,
            node,
            reference,
            moved,
        });
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, node: NodeId) -> Result<(), TreeError> {
        if self.get(node)?.parent != Some(parent) {
            return Err(TreeError::NotAChild {
                parent,
                child: node,
            });
        }
        self.detach(node)?;
        self.ops.push(TreeOp::Remove { parent, node });
        Ok(())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).ok()?.parent
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|child| *child == node)?;
        siblings.get(index + 1).copied()
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_render() {
        let mut tree = MemoryTree::new();
        let ul = tree.create_element("ul").unwrap();
        let li = tree.create_element("li").unwrap();
        let text = tree.create_text("a < b").unwrap();
        tree.set_attribute(ul, "id", "list").unwrap();
        tree.set_class(li, &["item".to_string(), "first".to_string()]).unwrap();
        tree.set_style(li, "color", "red").unwrap();
        tree.insert_before(li, text, None).unwrap();
        tree.insert_before(ul, li, None).unwrap();

        assert_eq!(
            tree.to_html(ul),
            "<ul id=\"list\"><li class=\"item first\" style=\"color: red;\">a &lt; b</li></ul>"
        );
    }

    #[test]
    fn insert_before_reference_and_move() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let a = tree.create_text("a").unwrap();
        let b = tree.create_text("b").unwrap();
        tree.insert_before(root, a, None).unwrap();
        tree.insert_before(root, b, Some(a)).unwrap();
        assert_eq!(tree.children(root), &[b, a]);
        assert_eq!(tree.next_sibling(b), Some(a));
        assert_eq!(tree.next_sibling(a), None);

        tree.clear_ops();
        tree.insert_before(root, b, None).unwrap();
        assert_eq!(tree.children(root), &[a, b]);
        assert!(tree.ops()[0].is_move());
    }

    #[test]
    fn insert_before_itself_is_noop() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let a = tree.create_text("a").unwrap();
        let b = tree.create_text("b").unwrap();
        tree.insert_before(root, a, None).unwrap();
        tree.insert_before(root, b, None).unwrap();

        tree.insert_before(root, a, Some(a)).unwrap();
        assert_eq!(tree.children(root), &[a, b]);
    }

    #[test]
    fn rejects_invalid_structure() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let div = tree.create_element("div").unwrap();
        let text = tree.create_text("t").unwrap();
        tree.insert_before(root, div, None).unwrap();

        assert_eq!(
            tree.insert_before(div, root, None),
            Err(TreeError::Cycle { parent: div, node: root })
        );
        assert_eq!(tree.insert_before(text, div, None), Err(TreeError::NotAnElement(text)));
        assert_eq!(
            tree.insert_before(root, text, Some(text)),
            Err(TreeError::NotAChild { parent: root, child: text })
        );
        assert_eq!(
            tree.remove_child(div, text),
            Err(TreeError::NotAChild { parent: div, child: text })
        );
        assert_eq!(tree.set_text(div, "x"), Err(TreeError::NotText(div)));
        assert_eq!(
            tree.set_attribute(NodeId::from(99), "a", "b"),
            Err(TreeError::UnknownNode(NodeId::from(99)))
        );
    }

    #[test]
    fn remove_detaches() {
        let mut tree = MemoryTree::new();
        let point = tree.mount_point().unwrap();
        assert!(tree.is_attached(point));
        assert!(tree.ops().is_empty());

        tree.remove_child(tree.root(), point).unwrap();
        assert!(!tree.is_attached(point));
        assert_eq!(tree.parent(point), None);
        assert!(tree.ops()[0].is_remove());
    }
}
