//! Owned document model
//!
//! Pages are parsed into an arena of nodes addressed by [`NodeId`]. Handles
//! stay valid for the life of the document, even after a node is detached,
//! so callers can hold on to them across passes and ask [`Document::is_attached`]
//! before writing.

mod parse;
mod serialize;

use url::Url;

/// Handle to a node in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

const ROOT: NodeId = NodeId(0);

impl Document {
    /// Empty document holding only the root node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Nearest ancestor that is an element
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id), NodeData::Element { .. })
    }

    /// Lowercase tag name of an element
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id) == Some(tag)
    }

    /// Contents of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.data(id) {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    /// Whether the whitespace-separated `class` attribute contains `class`
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Whether the whole node is still reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == ROOT {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// The node itself or its nearest ancestor matching `predicate`
    pub fn closest<F>(&self, id: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|candidate| self.is_element(*candidate) && predicate(self, *candidate))
    }

    /// All nodes below `id` in document order, `id` excluded
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// Attached elements with the given tag, in document order
    pub fn elements_named(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(ROOT)
            .into_iter()
            .filter(|id| self.is_tag(*id, tag))
            .collect()
    }

    /// Attached elements matching `predicate`, in document order
    pub fn select<F>(&self, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        self.descendants(ROOT)
            .into_iter()
            .filter(|id| self.is_element(*id) && predicate(self, *id))
            .collect()
    }

    /// Text nodes below `id` (or `id` itself when it is one)
    pub fn text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        if self.text(id).is_some() {
            return vec![id];
        }
        self.descendants(id)
            .into_iter()
            .filter(|node| self.text(*node).is_some())
            .collect()
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        self.text_nodes(id)
            .into_iter()
            .filter_map(|node| self.text(node))
            .collect()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    /// New detached element
    pub fn create_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        self.push(NodeData::Element {
            name: name.to_ascii_lowercase(),
            attrs: attrs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        })
    }

    /// New detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub(crate) fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment(text.to_string()))
    }

    /// Remove a node from its parent; the node and its subtree stay addressable
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|child| *child != id);
        }
    }

    /// Move `child` to the end of `parent`'s children
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return;
        }
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.node_mut(id).children);
        for child in children {
            self.node_mut(child).parent = None;
        }
    }

    /// Replace every child with a single text node
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if let NodeData::Text(current) = &mut self.node_mut(id).data {
            *current = text.to_string();
            return;
        }
        self.clear_children(id);
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }

    /// Overwrite a text node; returns false for other node types
    pub fn set_text(&mut self, id: NodeId, text: &str) -> bool {
        match &mut self.node_mut(id).data {
            NodeData::Text(current) => {
                *current = text.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.node_mut(id).data {
            match attrs.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.node_mut(id).data {
            attrs.retain(|(key, _)| key != name);
        }
    }
}

/// A parsed page together with the URL it was loaded from
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub document: Document,
}

impl Page {
    pub fn new(url: Url, document: Document) -> Self {
        Self { url, document }
    }

    pub fn parse(url: &str, html: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(url)?, Document::parse(html)))
    }

    /// Path of the page URL, e.g. `/facebook/react/pulls`
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Resolve a possibly relative href against the page
    pub fn resolve(&self, href: &str) -> Option<Url> {
        self.url.join(href).ok()
    }

    /// Absolute target of an element's `href` attribute
    pub fn href(&self, id: NodeId) -> Option<Url> {
        self.document.attr(id, "href").and_then(|href| self.resolve(href))
    }
}
