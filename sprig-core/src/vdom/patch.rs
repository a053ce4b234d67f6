//! Reconciliation Engine
//!
//! `patch` brings a real tree in line with a new virtual tree, reusing real
//! nodes wherever the old and new vnodes describe the same node.
//!
//! # Algorithm
//!
//! Two vnodes are the same node when their key and tag are equal
//! ([`same_vnode`]). Same nodes are patched in place: properties are diffed
//! and children reconciled with four pointers over the old and new child
//! windows. The four direct comparisons (start/start, end/end, start/end,
//! end/start) cover appends, prepends and simple reorders in constant time per
//! step. Anything else falls back to a linear scan of the remaining old
//! window, which shrinks each time a match is consumed.
//!
//! A new subtree is always built completely before it is inserted, so a
//! failure while building leaves the existing tree untouched. There is no
//! rollback of mutations already applied.

use tracing::{debug, trace, warn};

use super::backend::{NodeId, TreeBackend};
use super::props::update_props;
use super::vnode::{VNode, VNodeData};
use crate::error::PatchError;

/// What a new virtual tree is patched against.
#[derive(Debug, Clone, Copy)]
pub enum PatchTarget<'a> {
    /// A real node with no virtual counterpart yet (first render). It is
    /// replaced by the new tree.
    Real(NodeId),
    /// The virtual tree from the previous render.
    Virtual(&'a VNode),
}

impl From<NodeId> for PatchTarget<'_> {
    fn from(node: NodeId) -> Self {
        PatchTarget::Real(node)
    }
}

impl<'a> From<&'a VNode> for PatchTarget<'a> {
    fn from(vnode: &'a VNode) -> Self {
        PatchTarget::Virtual(vnode)
    }
}

/// Reconcile the real tree with `next`. Returns the real root `next` ends up
/// bound to.
///
/// Against a real node, `next` is built in full, inserted where that node
/// stands, and the node is removed. Against a previous vnode that is the same
/// node, it is patched in place; otherwise the previous root is replaced the
/// same way a real node is.
pub fn patch<B>(tree: &mut B, previous: PatchTarget<'_>, next: &VNode) -> Result<NodeId, PatchError>
where
    B: TreeBackend + ?Sized,
{
    match previous {
        PatchTarget::Virtual(old) if same_vnode(old, next) => {
            debug!(tag = %next.describe(), "patch in place");
            patch_vnode(tree, old, next)?;
        }
        PatchTarget::Virtual(old) => {
            let old_root = bound(old)?;
            debug!(old = %old.describe(), new = %next.describe(), "replace root");
            replace(tree, old_root, next)?;
        }
        PatchTarget::Real(old_root) => {
            debug!(?old_root, tag = %next.describe(), "first render");
            replace(tree, old_root, next)?;
        }
    }
    bound(next)
}

/// Whether `a` and `b` describe the same real node: equal key and equal tag,
/// either of which may be absent on both.
pub fn same_vnode(a: &VNode, b: &VNode) -> bool {
    a.key() == b.key() && a.tag() == b.tag()
}

/// Patch `new` onto the real node bound to `old`.
///
/// The caller guarantees `same_vnode(old, new)`. `new` takes over `old`'s real
/// node; then element properties and children, or text content, are updated.
pub fn patch_vnode<B>(tree: &mut B, old: &VNode, new: &VNode) -> Result<(), PatchError>
where
    B: TreeBackend + ?Sized,
{
    let node = bound(old)?;
    new.set_elm(node);

    if new.is_element() {
        update_props(tree, node, old.data(), new.data())?;

        let old_children = old.children();
        let new_children = new.children();
        match (old_children.is_empty(), new_children.is_empty()) {
            (false, false) => update_children(tree, node, old_children, new_children)?,
            (false, true) => remove_vnodes(tree, node, old_children)?,
            (true, false) => add_vnodes(tree, node, new_children, None)?,
            (true, true) => {}
        }
    } else if old.text_content() != new.text_content() {
        tree.set_text(node, new.text_content().unwrap_or_default())?;
    }
    Ok(())
}

/// Reconcile the children of `parent` from `old_children` to `new_children`.
pub fn update_children<B>(
    tree: &mut B,
    parent: NodeId,
    old_children: &[VNode],
    new_children: &[VNode],
) -> Result<(), PatchError>
where
    B: TreeBackend + ?Sized,
{
    // Working copy of the old window; fallback matches are removed from it.
    let mut old: Vec<&VNode> = old_children.iter().collect();
    let new = new_children;

    // Exclusive ends.
    let (mut old_start, mut old_end) = (0, old.len());
    let (mut new_start, mut new_end) = (0, new.len());

    while old_start < old_end && new_start < new_end {
        let old_start_vnode = old[old_start];
        let old_end_vnode = old[old_end - 1];
        let new_start_vnode = &new[new_start];
        let new_end_vnode = &new[new_end - 1];

        if same_vnode(old_start_vnode, new_start_vnode) {
            patch_vnode(tree, old_start_vnode, new_start_vnode)?;
            old_start += 1;
            new_start += 1;
        } else if same_vnode(old_end_vnode, new_end_vnode) {
            patch_vnode(tree, old_end_vnode, new_end_vnode)?;
            old_end -= 1;
            new_end -= 1;
        } else if same_vnode(old_start_vnode, new_end_vnode) {
            patch_vnode(tree, old_start_vnode, new_end_vnode)?;
            let node = bound(old_start_vnode)?;
            let reference = tree.next_sibling(bound(old_end_vnode)?);
            trace!(?node, ?reference, "move start to end");
            tree.insert_before(parent, node, reference)?;
            old_start += 1;
            new_end -= 1;
        } else if same_vnode(old_end_vnode, new_start_vnode) {
            patch_vnode(tree, old_end_vnode, new_start_vnode)?;
            let node = bound(old_end_vnode)?;
            let reference = bound(old_start_vnode)?;
            trace!(?node, ?reference, "move end to start");
            tree.insert_before(parent, node, Some(reference))?;
            old_end -= 1;
            new_start += 1;
        } else {
            let reference = bound(old_start_vnode)?;
            let found = (old_start..old_end).find(|&i| same_vnode(old[i], new_start_vnode));
            match found {
                Some(index) => {
                    let matched = old.remove(index);
                    patch_vnode(tree, matched, new_start_vnode)?;
                    let node = bound(matched)?;
                    trace!(?node, ?reference, "move matched node");
                    tree.insert_before(parent, node, Some(reference))?;
                    old_end -= 1;
                }
                None => {
                    trace!(tag = %new_start_vnode.describe(), "create unmatched node");
                    create_elm(tree, new_start_vnode, parent, Some(reference))?;
                }
            }
            new_start += 1;
        }
    }

    if old_start >= old_end {
        let reference = new.get(new_end).and_then(VNode::elm);
        add_vnodes(tree, parent, &new[new_start..new_end], reference)?;
    } else if new_start >= new_end {
        remove_vnodes(tree, parent, old[old_start..old_end].iter().copied())?;
    }
    Ok(())
}

/// Build the real subtree for `vnode` and insert it under `parent`.
fn create_elm<B>(tree: &mut B, vnode: &VNode, parent: NodeId, reference: Option<NodeId>) -> Result<(), PatchError>
where
    B: TreeBackend + ?Sized,
{
    let node = build(tree, vnode)?;
    tree.insert_before(parent, node, reference)?;
    Ok(())
}

/// Materialize `vnode` and its descendants, detached.
fn build<B>(tree: &mut B, vnode: &VNode) -> Result<NodeId, PatchError>
where
    B: TreeBackend + ?Sized,
{
    let node = match vnode.tag() {
        Some(tag) => {
            let node = tree.create_element(tag)?;
            update_props(tree, node, &VNodeData::default(), vnode.data())?;
            node
        }
        None => tree.create_text(vnode.text_content().unwrap_or_default())?,
    };
    vnode.set_elm(node);

    if vnode.is_element() {
        for child in vnode.children() {
            let child_node = build(tree, child)?;
            tree.insert_before(node, child_node, None)?;
        }
    }
    Ok(node)
}

fn add_vnodes<B>(tree: &mut B, parent: NodeId, vnodes: &[VNode], reference: Option<NodeId>) -> Result<(), PatchError>
where
    B: TreeBackend + ?Sized,
{
    for vnode in vnodes {
        create_elm(tree, vnode, parent, reference)?;
    }
    Ok(())
}

fn remove_vnodes<'v, B, I>(tree: &mut B, parent: NodeId, vnodes: I) -> Result<(), PatchError>
where
    B: TreeBackend + ?Sized,
    I: IntoIterator<Item = &'v VNode>,
{
    for vnode in vnodes {
        let node = bound(vnode)?;
        if tree.parent(node) != Some(parent) {
            warn!(?node, ?parent, "skipping removal of node already detached");
            continue;
        }
        tree.remove_child(parent, node)?;
    }
    Ok(())
}

fn replace<B>(tree: &mut B, old_root: NodeId, next: &VNode) -> Result<(), PatchError>
where
    B: TreeBackend + ?Sized,
{
    let parent = tree.parent(old_root).ok_or(PatchError::DetachedRoot(old_root))?;
    let reference = tree.next_sibling(old_root);
    create_elm(tree, next, parent, reference)?;
    tree.remove_child(parent, old_root)?;
    Ok(())
}

fn bound(vnode: &VNode) -> Result<NodeId, PatchError> {
    vnode.elm().ok_or_else(|| PatchError::MissingRealNode {
        tag: vnode.describe(),
    })
}
