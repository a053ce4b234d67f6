//! Virtual Nodes
//!
//! A [`VNode`] describes one element or text node of the desired tree. Once
//! the patch engine has materialized or reused a real node for it, the vnode
//! remembers that node's handle (`elm`), which the next patch reads back.

use std::cell::Cell;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::backend::NodeId;

/// Dynamic class binding: a space-separated string, a list of names, or a
/// map of names to on/off flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassBinding {
    Str(String),
    List(Vec<String>),
    Map(IndexMap<String, bool>),
}

impl ClassBinding {
    pub fn list<S, I>(names: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        ClassBinding::List(names.into_iter().map(Into::into).collect())
    }

    pub fn map<S, I>(flags: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, bool)>,
    {
        ClassBinding::Map(flags.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<&str> for ClassBinding {
    fn from(s: &str) -> Self {
        ClassBinding::Str(s.to_string())
    }
}

impl From<String> for ClassBinding {
    fn from(s: String) -> Self {
        ClassBinding::Str(s)
    }
}

impl From<Vec<String>> for ClassBinding {
    fn from(names: Vec<String>) -> Self {
        ClassBinding::List(names)
    }
}

impl From<IndexMap<String, bool>> for ClassBinding {
    fn from(flags: IndexMap<String, bool>) -> Self {
        ClassBinding::Map(flags)
    }
}

/// Properties of an element vnode. Every field is optional; absent means
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VNodeData {
    /// Attributes other than `class` and `style`.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub attrs: IndexMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_class: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<ClassBinding>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub static_style: IndexMap<String, String>,

    /// Merged over `static_style`; a dynamic entry wins over a static one.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub style: IndexMap<String, String>,
}

impl VNodeData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn static_class(mut self, class: impl Into<String>) -> Self {
        self.static_class = Some(class.into());
        self
    }

    pub fn class(mut self, class: impl Into<ClassBinding>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn static_style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.static_style.insert(property.into(), value.into());
        self
    }

    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(property.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A node of the virtual tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VNode {
    /// Element tag; `None` for text nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<String>,

    #[serde(default, skip_serializing_if = "VNodeData::is_empty")]
    data: VNodeData,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<VNode>,

    /// Content of a text node.
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,

    /// Real node this vnode is bound to, set by the patch engine.
    #[serde(skip)]
    elm: Cell<Option<NodeId>>,
}

impl VNode {
    /// Create an element vnode.
    pub fn element<C>(tag: impl Into<String>, data: VNodeData, children: C) -> Self
    where
        C: IntoIterator,
        C::Item: Into<VNode>,
    {
        Self {
            tag: Some(tag.into()),
            data,
            children: children.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Create a text vnode.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Set the reconciliation key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn data(&self) -> &VNodeData {
        &self.data
    }

    pub fn children(&self) -> &[VNode] {
        &self.children
    }

    pub fn text_content(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn is_element(&self) -> bool {
        self.tag.is_some()
    }

    /// The bound real node, once patched.
    pub fn elm(&self) -> Option<NodeId> {
        self.elm.get()
    }

    pub(crate) fn set_elm(&self, node: NodeId) {
        self.elm.set(Some(node));
    }

    /// Human-readable name for diagnostics.
    pub(crate) fn describe(&self) -> String {
        match &self.tag {
            Some(tag) => tag.clone(),
            None => "#text".to_string(),
        }
    }
}

impl From<&str> for VNode {
    fn from(text: &str) -> Self {
        VNode::text(text)
    }
}

impl From<String> for VNode {
    fn from(text: String) -> Self {
        VNode::text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_children_become_text_nodes() {
        let node = VNode::element("p", VNodeData::new(), ["hello"]);
        assert_eq!(node.children().len(), 1);
        assert!(!node.children()[0].is_element());
        assert_eq!(node.children()[0].text_content(), Some("hello"));
    }

    #[test]
    fn new_vnodes_are_unbound() {
        let node = VNode::element("div", VNodeData::new(), Vec::<VNode>::new()).with_key("a");
        assert_eq!(node.elm(), None);
        assert_eq!(node.key(), Some("a"));
        assert_eq!(node.tag(), Some("div"));
    }

    #[test]
    fn class_binding_deserializes_every_shape() {
        let s: ClassBinding = serde_json::from_value(json!("a b")).unwrap();
        let l: ClassBinding = serde_json::from_value(json!(["a", "b"])).unwrap();
        let m: ClassBinding = serde_json::from_value(json!({"a": true, "b": false})).unwrap();

        assert_eq!(s, ClassBinding::from("a b"));
        assert_eq!(l, ClassBinding::list(["a", "b"]));
        assert_eq!(m, ClassBinding::map([("a", true), ("b", false)]));
    }

    #[test]
    fn snapshot_omits_empty_fields() {
        let node = VNode::element(
            "a",
            VNodeData::new().attr("href", "/").static_class("link"),
            ["home"],
        );
        let snapshot = serde_json::to_value(&node).unwrap();
        assert_eq!(
            snapshot,
            json!({
                "tag": "a",
                "data": {"attrs": {"href": "/"}, "static_class": "link"},
                "children": [{"text": "home"}]
            })
        );
    }
}
