use slotmap::SlotMap;
use smol_str::SmolStr;

use crate::{Xcode, xattr};

slotmap::new_key_type! { pub struct NodeId; }

/// One element of the intermediate tree.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub(crate) opcode: Xcode,
    pub(crate) tag: SmolStr,
    pub(crate) value: Option<SmolStr>,
    pub(crate) attributes: Vec<(SmolStr, SmolStr)>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        Self {
            opcode: Xcode::from_tag(tag),
            tag: SmolStr::new(tag),
            value: None,
            attributes: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn opcode(&self) -> Xcode {
        self.opcode
    }

    #[inline(always)]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[inline(always)]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline(always)]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    fn detached_copy(&self) -> Self {
        Self {
            opcode: self.opcode,
            tag: self.tag.clone(),
            value: self.value.clone(),
            attributes: self.attributes.clone(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Arena holding every node of one unit.
///
/// Handles stay valid until the node (or one of its ancestors) is deleted. Reads through a
/// stale handle return empty results, edits through a stale handle are no-ops.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: SlotMap<NodeId, NodeData>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline(always)]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    #[inline(always)]
    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    pub fn new_node(&mut self, opcode: Xcode) -> NodeId {
        self.new_element(opcode.code())
    }

    pub fn new_element(&mut self, tag: &str) -> NodeId {
        self.nodes.insert(NodeData::new(tag))
    }

    pub fn new_leaf(&mut self, opcode: Xcode, value: &str) -> NodeId {
        let id = self.new_node(opcode);
        self.set_value(id, value);
        id
    }

    /// Returns the opcode of the node, [`Xcode::Unknown`] for a stale handle.
    #[inline(always)]
    pub fn opcode(&self, id: NodeId) -> Xcode {
        self.nodes.get(id).map_or(Xcode::Unknown, |node| node.opcode)
    }

    #[inline(always)]
    pub fn is(&self, id: NodeId, opcode: Xcode) -> bool {
        self.opcode(id) == opcode
    }

    pub fn tag_name(&self, id: NodeId) -> &str {
        self.nodes.get(id).map_or("", |node| node.tag.as_str())
    }

    pub fn value(&self, id: NodeId) -> &str {
        self.nodes
            .get(id)
            .and_then(|node| node.value.as_deref())
            .unwrap_or("")
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.value = Some(SmolStr::new(value));
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes.get(id).and_then(|node| {
            node.attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        })
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };

        match node.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, current)) => *current = SmolStr::new(value),
            None => node.attributes.push((SmolStr::new(name), SmolStr::new(value))),
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> bool {
        self.nodes.get_mut(id).is_some_and(|node| {
            let before = node.attributes.len();
            node.attributes.retain(|(key, _)| key != name);
            before != node.attributes.len()
        })
    }

    /// Reads a boolean attribute, `false` when absent.
    pub fn bool_attr(&self, id: NodeId, name: &str) -> bool {
        matches!(self.attr(id, name), Some("true") | Some("1"))
    }

    /// Source line of the node, 0 when unknown.
    pub fn line(&self, id: NodeId) -> u32 {
        self.attr(id, xattr::LINENO)
            .and_then(|line| line.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn file(&self, id: NodeId) -> Option<&str> {
        self.attr(id, xattr::FILE)
    }

    pub fn type_id(&self, id: NodeId) -> Option<&str> {
        self.attr(id, xattr::TYPE)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |node| node.children.as_slice())
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.child(id, 0)
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    #[inline(always)]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    /// Position of the node among its parent's children.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.parent(id)
            .and_then(|parent| self.children(parent).iter().position(|child| *child == id))
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let position = self.position(id)?;
        self.child(parent, position + 1)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let position = self.position(id)?;
        position.checked_sub(1).and_then(|p| self.child(parent, p))
    }

    pub fn following_siblings(&self, id: NodeId) -> &[NodeId] {
        match (self.parent(id), self.position(id)) {
            (Some(parent), Some(position)) => &self.children(parent)[position + 1..],
            _ => &[],
        }
    }

    /// Previous siblings in document order.
    pub fn preceding_siblings(&self, id: NodeId) -> &[NodeId] {
        match (self.parent(id), self.position(id)) {
            (Some(parent), Some(position)) => &self.children(parent)[..position],
            _ => &[],
        }
    }

    /// All descendants in document order, the node itself excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = self.children(id).iter().rev().copied().collect::<Vec<_>>();

        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }

        result
    }

    /// Nodes after `id` in document order, excluding its own descendants.
    pub fn following(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = id;

        while self.parent(current).is_some() {
            for sibling in self.following_siblings(current) {
                result.push(*sibling);
                result.extend(self.descendants(*sibling));
            }
            current = match self.parent(current) {
                Some(parent) => parent,
                None => break,
            };
        }

        result
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |node| self.parent(*node))
    }

    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|node| node == ancestor)
    }

    pub fn match_direct_descendant(&self, id: NodeId, opcode: Xcode) -> Option<NodeId> {
        self.children(id)
            .iter()
            .find(|child| self.is(**child, opcode))
            .copied()
    }

    /// Follows a chain of direct-descendant steps.
    pub fn match_seq(&self, id: NodeId, opcodes: &[Xcode]) -> Option<NodeId> {
        opcodes
            .iter()
            .try_fold(id, |current, opcode| self.match_direct_descendant(current, *opcode))
    }

    /// First descendant with the opcode, in document order.
    pub fn match_descendant(&self, id: NodeId, opcode: Xcode) -> Option<NodeId> {
        let mut stack = self.children(id).iter().rev().copied().collect::<Vec<_>>();

        while let Some(current) = stack.pop() {
            if self.is(current, opcode) {
                return Some(current);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }

        None
    }

    pub fn match_all(&self, id: NodeId, opcode: Xcode) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|node| self.is(*node, opcode))
            .collect()
    }

    fn can_attach(&self, node: NodeId, parent: NodeId) -> bool {
        self.contains(node) && self.contains(parent) && node != parent && !self.is_ancestor(node, parent)
    }

    /// Removes the node from its parent, keeping the subtree alive.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };

        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children.retain(|child| *child != id);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = None;
        }
    }

    fn attach_at(&mut self, parent: NodeId, index: usize, node: NodeId) {
        if let Some(parent_data) = self.nodes.get_mut(parent) {
            let index = index.min(parent_data.children.len());
            parent_data.children.insert(index, node);
        }
        if let Some(node_data) = self.nodes.get_mut(node) {
            node_data.parent = Some(parent);
        }
    }

    pub fn append(&mut self, parent: NodeId, node: NodeId) {
        if !self.can_attach(node, parent) {
            return;
        }

        self.detach(node);
        let index = self.children(parent).len();
        self.attach_at(parent, index, node);
    }

    pub fn prepend(&mut self, parent: NodeId, node: NodeId) {
        if !self.can_attach(node, parent) {
            return;
        }

        self.detach(node);
        self.attach_at(parent, 0, node);
    }

    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) {
        self.insert_relative(anchor, node, 0);
    }

    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        self.insert_relative(anchor, node, 1);
    }

    fn insert_relative(&mut self, anchor: NodeId, node: NodeId, offset: usize) {
        let Some(parent) = self.parent(anchor) else {
            return;
        };
        if anchor == node || !self.can_attach(node, parent) {
            return;
        }

        self.detach(node);
        if let Some(position) = self.position(anchor) {
            self.attach_at(parent, position + offset, node);
        }
    }

    /// Detaches the node and frees its whole subtree.
    pub fn delete(&mut self, id: NodeId) {
        self.detach(id);

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children);
            }
        }
    }

    /// Replaces `old` by `new` at the same position and deletes `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        self.insert_before(old, new);
        if self.parent(new).is_some() {
            self.delete(old);
        }
    }

    /// Deep copy with a fresh identity, detached from the tree.
    pub fn clone_node(&mut self, id: NodeId) -> Option<NodeId> {
        let data = self.nodes.get(id)?;
        let children = data.children.clone();
        let copy_data = data.detached_copy();
        let copy = self.nodes.insert(copy_data);

        for child in children {
            if let Some(child_copy) = self.clone_node(child) {
                self.attach_at(copy, usize::MAX, child_copy);
            }
        }

        Some(copy)
    }

    /// Deep copy of a node living in another arena.
    pub fn import_node(&mut self, source: &Tree, id: NodeId) -> Option<NodeId> {
        let data = source.get(id)?;
        let copy = self.nodes.insert(data.detached_copy());

        for child in data.children() {
            if let Some(child_copy) = self.import_node(source, *child) {
                self.attach_at(copy, usize::MAX, child_copy);
            }
        }

        Some(copy)
    }

    /// Structural and value equality of two subtrees, identity ignored.
    pub fn same_structure(&self, left: NodeId, other: &Tree, right: NodeId) -> bool {
        match (self.get(left), other.get(right)) {
            (Some(l), Some(r)) => {
                l.tag == r.tag
                    && l.value == r.value
                    && l.attributes == r.attributes
                    && l.children.len() == r.children.len()
                    && l.children
                        .iter()
                        .zip(r.children.iter())
                        .all(|(lc, rc)| self.same_structure(*lc, other, *rc))
            }
            _ => false,
        }
    }
}
