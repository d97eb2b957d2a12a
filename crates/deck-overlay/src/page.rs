//! Host-page model — the element tree both widgets render into.
//!
//! The page is the only resource the two widgets share; it is owned by the
//! engine and mutated exclusively on the engine task.  Every insertion is
//! recorded in a mutation log so a [`MutationWatch`] can diff "what appeared
//! since last time" without the widgets rescanning the whole tree.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Stable handle to a page element.  Ids are never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A subtree to insert, as accepted from widgets and the HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub children: Vec<ElementSpec>,
}

impl ElementSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub text: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Node {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

pub struct Page {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next_id: u64,
    /// Ids inserted since the last `take_inserted` drain, in insertion order.
    inserted: Vec<NodeId>,
}

impl Page {
    pub fn new() -> Self {
        let root = NodeId(1);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                id: root,
                tag: "body".to_string(),
                attrs: BTreeMap::new(),
                text: String::new(),
                children: Vec::new(),
                parent: None,
            },
        );
        Self {
            nodes,
            root,
            next_id: 2,
            inserted: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes.get(&id).and_then(|n| n.attr(name))
    }

    /// Set an attribute.  No-op when the node is gone (stale handle).
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.attrs.insert(name.to_string(), value.into());
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.text = text.into();
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Append a subtree as the last child of `parent`.  Returns the new root
    /// node, or `None` when the parent does not exist.
    pub fn insert_under(&mut self, parent: NodeId, spec: &ElementSpec) -> Option<NodeId> {
        if !self.nodes.contains_key(&parent) {
            return None;
        }
        let id = self.build(parent, spec);
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(id);
        }
        Some(id)
    }

    /// Insert a subtree as the next sibling of `sibling`.
    pub fn insert_after(&mut self, sibling: NodeId, spec: &ElementSpec) -> Option<NodeId> {
        let parent = self.parent(sibling)?;
        let id = self.build(parent, spec);
        if let Some(node) = self.nodes.get_mut(&parent) {
            let pos = node
                .children
                .iter()
                .position(|&c| c == sibling)
                .map(|p| p + 1)
                .unwrap_or(node.children.len());
            node.children.insert(pos, id);
        }
        Some(id)
    }

    fn build(&mut self, parent: NodeId, spec: &ElementSpec) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                id,
                tag: spec.tag.clone(),
                attrs: spec.attrs.clone(),
                text: spec.text.clone(),
                children: Vec::new(),
                parent: Some(parent),
            },
        );
        self.inserted.push(id);
        for child in &spec.children {
            let child_id = self.build(id, child);
            if let Some(node) = self.nodes.get_mut(&id) {
                node.children.push(child_id);
            }
        }
        id
    }

    /// Remove every child subtree of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self.children(id).to_vec();
        for child in children {
            self.remove(child);
        }
    }

    /// Remove a subtree.  No-op on the root or a stale handle.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|&c| c != id);
        }
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if let Some(node) = self.nodes.remove(&cur) {
                stack.extend(node.children);
            }
        }
    }

    /// All elements matching `pred`, in document (preorder) order.
    pub fn find_all(&self, pred: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                if pred(node) {
                    out.push(id);
                }
                // push in reverse so preorder pops left-to-right
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    pub fn find_first(&self, pred: impl Fn(&Node) -> bool) -> Option<NodeId> {
        self.find_all(pred).into_iter().next()
    }

    /// Drain the mutation log: ids inserted since the last drain that are
    /// still attached, deduplicated, in insertion order.
    pub fn take_inserted(&mut self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for id in std::mem::take(&mut self.inserted) {
            if self.nodes.contains_key(&id) && !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// JSON snapshot of the whole tree, for the HTTP inspection route.
    pub fn snapshot(&self) -> serde_json::Value {
        self.snapshot_node(self.root)
    }

    fn snapshot_node(&self, id: NodeId) -> serde_json::Value {
        let Some(node) = self.nodes.get(&id) else {
            return serde_json::Value::Null;
        };
        json!({
            "id": node.id.0,
            "tag": node.tag,
            "attrs": node.attrs,
            "text": node.text,
            "children": node
                .children
                .iter()
                .map(|&c| self.snapshot_node(c))
                .collect::<Vec<_>>(),
        })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

// ── mutation watch ────────────────────────────────────────────────────────────

/// Observe-and-diff over page insertions.
///
/// The predicate decides which elements are interesting; `drain` hands back
/// only the interesting elements inserted since the previous drain.  Whether
/// insertions arrive one at a time or in a large batch must not change what a
/// sequence of drains yields overall.
pub struct MutationWatch {
    matches: Box<dyn Fn(&Node) -> bool + Send + Sync>,
}

impl MutationWatch {
    pub fn new(matches: impl Fn(&Node) -> bool + Send + Sync + 'static) -> Self {
        Self {
            matches: Box::new(matches),
        }
    }

    /// Eager full-tree scan — covers elements that existed before the watch.
    pub fn scan_all(&self, page: &Page) -> Vec<NodeId> {
        page.find_all(|n| (self.matches)(n))
    }

    /// Newly inserted matching elements since the last drain.
    pub fn drain(&self, page: &mut Page) -> Vec<NodeId> {
        page.take_inserted()
            .into_iter()
            .filter(|&id| page.get(id).map(|n| (self.matches)(n)).unwrap_or(false))
            .collect()
    }
}
