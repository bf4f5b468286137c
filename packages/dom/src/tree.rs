use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::error::{DomError, DomResult};

/// Handle to a node inside a [`Dom`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    /// Container for an ordered node sequence, like a document fragment
    Fragment { children: Vec<NodeId> },

    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        properties: HashMap<String, JsonValue>,
        children: Vec<NodeId>,
    },

    Text { content: String },

    Comment { content: String },
}

#[derive(Debug, Clone)]
struct NodeData {
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// Arena-backed node tree.
///
/// Nodes are created detached and wired up with [`Dom::append_child`] /
/// [`Dom::insert_before`]. Detached subtrees stay in the arena until the
/// whole `Dom` is dropped; a render discards the arena wholesale.
#[derive(Debug, Clone, Default)]
pub struct Dom {
    nodes: Vec<NodeData>,
}

impl Dom {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData { parent: None, kind });
        id
    }

    pub(crate) fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.push_node(NodeKind::Fragment {
            children: Vec::new(),
        })
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Element {
            tag: tag.into(),
            attributes: Vec::new(),
            properties: HashMap::new(),
            children: Vec::new(),
        })
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Text {
            content: content.into(),
        })
    }

    pub fn create_comment(&mut self, content: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Comment {
            content: content.into(),
        })
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element { .. })
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Text { .. })
    }

    pub fn is_fragment(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Fragment { .. })
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Text { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.kind(id) {
            NodeKind::Fragment { children } | NodeKind::Element { children, .. } => children,
            _ => &[],
        }
    }

    fn children_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Fragment { children } | NodeKind::Element { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings.get(pos + 1).copied()
    }

    /// Append a node as the last child of `parent`, detaching it first if
    /// needed. Appending to a leaf node is a no-op.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        if let Some(children) = self.children_mut(parent) {
            children.push(child);
            self.nodes[child.0].parent = Some(parent);
        }
    }

    /// Insert `new` immediately before `reference` under the same parent.
    pub fn insert_before(&mut self, reference: NodeId, new: NodeId) -> DomResult<()> {
        let parent = self
            .parent(reference)
            .ok_or(DomError::DetachedReference)?;
        self.detach(new);
        let children = self
            .children_mut(parent)
            .ok_or(DomError::DetachedReference)?;
        let pos = children
            .iter()
            .position(|&c| c == reference)
            .ok_or(DomError::DetachedReference)?;
        children.insert(pos, new);
        self.nodes[new.0].parent = Some(parent);
        Ok(())
    }

    /// Remove a node from its parent; the subtree stays intact but is no
    /// longer reachable from the tree it was in.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            if let Some(children) = self.children_mut(parent) {
                children.retain(|&c| c != id);
            }
        }
    }

    pub fn clear_children(&mut self, id: NodeId) {
        let children = match self.children_mut(id) {
            Some(children) => std::mem::take(children),
            None => return,
        };
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Deep clone of a subtree within this arena; the clone is detached.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let kind = self.kind(id).clone();
        self.clone_from_kind(kind, true)
    }

    /// Shallow clone: the node itself without its children.
    pub fn clone_shallow(&mut self, id: NodeId) -> NodeId {
        let kind = self.kind(id).clone();
        self.clone_from_kind(kind, false)
    }

    fn clone_from_kind(&mut self, kind: NodeKind, deep: bool) -> NodeId {
        match kind {
            NodeKind::Element {
                tag,
                attributes,
                properties,
                children,
            } => {
                let new = self.push_node(NodeKind::Element {
                    tag,
                    attributes,
                    properties,
                    children: Vec::new(),
                });
                if deep {
                    for child in children {
                        let clone = self.clone_subtree(child);
                        self.append_child(new, clone);
                    }
                }
                new
            }
            NodeKind::Fragment { children } => {
                let new = self.push_node(NodeKind::Fragment {
                    children: Vec::new(),
                });
                if deep {
                    for child in children {
                        let clone = self.clone_subtree(child);
                        self.append_child(new, clone);
                    }
                }
                new
            }
            NodeKind::Text { content } => self.push_node(NodeKind::Text { content }),
            NodeKind::Comment { content } => self.push_node(NodeKind::Comment { content }),
        }
    }

    /// Deep copy of a subtree from another arena into this one.
    pub fn import(&mut self, src: &Dom, id: NodeId) -> NodeId {
        match src.kind(id) {
            NodeKind::Element {
                tag,
                attributes,
                properties,
                children,
            } => {
                let new = self.push_node(NodeKind::Element {
                    tag: tag.clone(),
                    attributes: attributes.clone(),
                    properties: properties.clone(),
                    children: Vec::new(),
                });
                for &child in children {
                    let imported = self.import(src, child);
                    self.append_child(new, imported);
                }
                new
            }
            NodeKind::Fragment { children } => {
                let new = self.push_node(NodeKind::Fragment {
                    children: Vec::new(),
                });
                for &child in children {
                    let imported = self.import(src, child);
                    self.append_child(new, imported);
                }
                new
            }
            NodeKind::Text { content } => self.push_node(NodeKind::Text {
                content: content.clone(),
            }),
            NodeKind::Comment { content } => self.push_node(NodeKind::Comment {
                content: content.clone(),
            }),
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn set_attribute(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.0].kind {
            match attributes.iter_mut().find(|(n, _)| *n == name) {
                Some(entry) => entry.1 = value,
                None => attributes.push((name, value)),
            }
        }
    }

    /// Remove an attribute and hand back its value.
    pub fn take_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.0].kind {
            let pos = attributes.iter().position(|(n, _)| n == name)?;
            return Some(attributes.remove(pos).1);
        }
        None
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        self.take_attribute(id, name);
    }

    /// Attribute names in document order.
    pub fn attribute_names(&self, id: NodeId) -> Vec<String> {
        match self.kind(id) {
            NodeKind::Element { attributes, .. } => {
                attributes.iter().map(|(n, _)| n.clone()).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn has_attribute_with_prefix(&self, id: NodeId, prefix: &str) -> bool {
        match self.kind(id) {
            NodeKind::Element { attributes, .. } => {
                attributes.iter().any(|(n, _)| n.starts_with(prefix))
            }
            _ => false,
        }
    }

    /// Add a class to the element's class set, keeping existing classes.
    pub fn class_list_add(&mut self, id: NodeId, class: &str) {
        let current = self.attribute(id, "class").unwrap_or("").to_string();
        if current.split_whitespace().any(|c| c == class) {
            return;
        }
        let updated = if current.trim().is_empty() {
            class.to_string()
        } else {
            format!("{} {}", current.trim(), class)
        };
        self.set_attribute(id, "class", updated);
    }

    /// Set a live property on an element; properties are not serialized
    /// into markup.
    pub fn set_property(&mut self, id: NodeId, name: impl Into<String>, value: JsonValue) {
        if let NodeKind::Element { properties, .. } = &mut self.nodes[id.0].kind {
            properties.insert(name.into(), value);
        }
    }

    pub fn property(&self, id: NodeId, name: &str) -> Option<&JsonValue> {
        match self.kind(id) {
            NodeKind::Element { properties, .. } => properties.get(name),
            _ => None,
        }
    }
}

/// A detached node sequence with its own arena: the unit templates are
/// stored, cloned and rendered as.
#[derive(Debug, Clone)]
pub struct Fragment {
    dom: Dom,
    root: NodeId,
}

impl Fragment {
    pub fn new() -> Self {
        let mut dom = Dom::new();
        let root = dom.create_fragment();
        Self { dom, root }
    }

    /// Parse markup into a fresh fragment.
    pub fn parse(html: &str) -> DomResult<Self> {
        let mut fragment = Self::new();
        let root = fragment.root;
        fragment.dom.parse_markup(root, html)?;
        Ok(fragment)
    }

    /// New fragment holding a deep copy of one node from another arena.
    pub fn from_subtree(src: &Dom, node: NodeId) -> Self {
        let mut fragment = Self::new();
        let imported = fragment.dom.import(src, node);
        fragment.dom.append_child(fragment.root, imported);
        fragment
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn children(&self) -> &[NodeId] {
        self.dom.children(self.root)
    }

    pub fn to_html(&self) -> String {
        self.dom.to_html(self.root)
    }
}

impl Default for Fragment {
    fn default() -> Self {
        Self::new()
    }
}
