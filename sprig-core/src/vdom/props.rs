//! Property Reconciliation
//!
//! Attributes, inline style and the class list are diffed independently.
//! Entries only in the old data are removed, entries whose value changed are
//! written, and unchanged entries cause no backend call at all.

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::trace;

use super::backend::{NodeId, TreeBackend};
use super::vnode::{ClassBinding, VNodeData};
use crate::error::TreeError;

/// Normalized class names; short in practice.
pub type ClassList = SmallVec<[String; 4]>;

/// Bring `node`'s properties from `old` to `new`.
pub(crate) fn update_props<B>(tree: &mut B, node: NodeId, old: &VNodeData, new: &VNodeData) -> Result<(), TreeError>
where
    B: TreeBackend + ?Sized,
{
    update_attrs(tree, node, old, new)?;
    update_style(tree, node, old, new)?;
    update_class(tree, node, old, new)?;
    Ok(())
}

fn update_attrs<B>(tree: &mut B, node: NodeId, old: &VNodeData, new: &VNodeData) -> Result<(), TreeError>
where
    B: TreeBackend + ?Sized,
{
    for name in old.attrs.keys() {
        if !new.attrs.contains_key(name) {
            trace!(?node, %name, "remove attribute");
            tree.remove_attribute(node, name)?;
        }
    }

    for (name, value) in &new.attrs {
        if old.attrs.get(name) != Some(value) {
            trace!(?node, %name, "set attribute");
            tree.set_attribute(node, name, value)?;
        }
    }
    Ok(())
}

fn update_style<B>(tree: &mut B, node: NodeId, old: &VNodeData, new: &VNodeData) -> Result<(), TreeError>
where
    B: TreeBackend + ?Sized,
{
    let old_style = merged_style(old);
    let new_style = merged_style(new);

    for property in old_style.keys() {
        if !new_style.contains_key(property) {
            tree.remove_style(node, property)?;
        }
    }

    for (property, value) in &new_style {
        if old_style.get(property) != Some(value) {
            tree.set_style(node, property, value)?;
        }
    }
    Ok(())
}

fn update_class<B>(tree: &mut B, node: NodeId, old: &VNodeData, new: &VNodeData) -> Result<(), TreeError>
where
    B: TreeBackend + ?Sized,
{
    let old_classes = class_list(old);
    let new_classes = class_list(new);

    if old_classes != new_classes {
        trace!(?node, classes = new_classes.len(), "set class");
        tree.set_class(node, &new_classes)?;
    }
    Ok(())
}

/// Static style overlaid with dynamic style. Empty values count as unset,
/// so an empty dynamic value clears a static one.
pub fn merged_style(data: &VNodeData) -> IndexMap<&str, &str> {
    let mut merged: IndexMap<&str, &str> = data
        .static_style
        .iter()
        .chain(data.style.iter())
        .map(|(property, value)| (property.as_str(), value.as_str()))
        .collect();
    merged.retain(|_, value| !value.is_empty());
    merged
}

/// Static classes followed by dynamic ones, without duplicates.
pub fn class_list(data: &VNodeData) -> ClassList {
    let mut classes = ClassList::new();
    let mut push = |name: &str| {
        if !name.is_empty() && !classes.iter().any(|c| c == name) {
            classes.push(name.to_string());
        }
    };

    if let Some(static_class) = &data.static_class {
        static_class.split_whitespace().for_each(&mut push);
    }

    match &data.class {
        Some(ClassBinding::Str(s)) => s.split_whitespace().for_each(&mut push),
        Some(ClassBinding::List(names)) => names.iter().for_each(|name| push(name.trim())),
        Some(ClassBinding::Map(flags)) => flags
            .iter()
            .filter(|(_, on)| **on)
            .for_each(|(name, _)| push(name.trim())),
        None => {}
    }

    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdom::{MemoryTree, TreeOp};

    fn element(tree: &mut MemoryTree) -> NodeId {
        let node = tree.create_element("div").unwrap();
        tree.clear_ops();
        node
    }

    #[test]
    fn class_list_merges_and_dedupes() {
        let data = VNodeData::new()
            .static_class("  card  card-wide ")
            .class(ClassBinding::map([("active", true), ("card", true), ("hidden", false)]));
        assert_eq!(class_list(&data).as_slice(), ["card", "card-wide", "active"]);

        let data = VNodeData::new().class(ClassBinding::list(["a", "a", " b "]));
        assert_eq!(class_list(&data).as_slice(), ["a", "b"]);
    }

    #[test]
    fn style_dynamic_overrides_static() {
        let data = VNodeData::new()
            .static_style("color", "red")
            .static_style("margin", "0")
            .style("color", "blue")
            .style("padding", "");
        let merged = merged_style(&data);
        assert_eq!(merged.get("color"), Some(&"blue"));
        assert_eq!(merged.get("margin"), Some(&"0"));
        assert!(!merged.contains_key("padding"));
    }

    #[test]
    fn empty_dynamic_style_clears_static() {
        let data = VNodeData::new().static_style("color", "red").style("color", "");
        assert!(merged_style(&data).is_empty());

        let mut tree = MemoryTree::new();
        let node = element(&mut tree);
        update_props(&mut tree, node, &VNodeData::new(), &data).unwrap();
        assert_eq!(tree.style(node, "color"), None);
        assert!(tree.ops().is_empty());

        let red = VNodeData::new().static_style("color", "red");
        update_props(&mut tree, node, &red, &data).unwrap();
        assert_eq!(tree.ops(), &[TreeOp::RemoveStyle { node, property: "color".into() }]);
    }

    #[test]
    fn unchanged_props_write_nothing() {
        let mut tree = MemoryTree::new();
        let node = element(&mut tree);
        let data = VNodeData::new()
            .attr("id", "x")
            .static_class("a")
            .style("color", "red");

        update_props(&mut tree, node, &data, &data.clone()).unwrap();
        assert!(tree.ops().is_empty());
    }

    #[test]
    fn each_property_kind_is_diffed() {
        let mut tree = MemoryTree::new();
        let node = element(&mut tree);
        let old = VNodeData::new()
            .attr("id", "x")
            .attr("title", "t")
            .style("color", "red")
            .class("a");
        let new = VNodeData::new()
            .attr("id", "y")
            .attr("title", "t")
            .style("margin", "0")
            .class("a b");

        update_props(&mut tree, node, &old, &new).unwrap();
        assert_eq!(
            tree.ops(),
            &[
                TreeOp::SetAttribute { node, name: "id".into(), value: "y".into() },
                TreeOp::RemoveStyle { node, property: "color".into() },
                TreeOp::SetStyle { node, property: "margin".into(), value: "0".into() },
                TreeOp::SetClass { node, classes: vec!["a".into(), "b".into()] },
            ]
        );
    }

    #[test]
    fn removing_all_classes_clears_the_list() {
        let mut tree = MemoryTree::new();
        let node = element(&mut tree);
        let old = VNodeData::new().static_class("a");

        update_props(&mut tree, node, &old, &VNodeData::new()).unwrap();
        assert_eq!(tree.ops(), &[TreeOp::SetClass { node, classes: vec![] }]);
    }
}
