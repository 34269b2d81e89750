//! The declaration tree.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Node 0 is
//! the root of the whole river; sub-builders hold the id of the node they are
//! rooted at.

use std::fmt;
use std::sync::Arc;

use crate::link::Link;
use crate::lock::SharedLock;
use crate::path::Path;

/// Stable index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

impl NodeId {
    pub(crate) const ROOT: NodeId = NodeId(0);
}

/// Metadata about a declared channel.
pub(crate) struct ChannelInfo {
    /// Initial value bytes; their length is the channel size.
    pub(crate) init: Box<[u8]>,
    pub(crate) type_name: &'static str,
}

impl ChannelInfo {
    pub(crate) fn size(&self) -> usize {
        self.init.len()
    }
}

/// One path segment of the tree.
pub(crate) struct Node {
    /// Empty for the root only.
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    /// In first-reference order.
    pub(crate) children: Vec<NodeId>,
    pub(crate) channel: Option<ChannelInfo>,
    /// Shared with every handle issued for this path since the last build.
    pub(crate) link: Option<Arc<Link>>,
    /// Guards this node and everything below it.
    pub(crate) lock: Option<SharedLock>,
}

impl Node {
    fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            channel: None,
            link: None,
            lock: None,
        }
    }
}

pub(crate) struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Node::new(String::new(), None)],
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .find(|child| self.node(*child).name == name)
    }

    /// Walks `path` from `from`, returning `None` at the first miss.
    pub(crate) fn resolve(&self, from: NodeId, path: &Path) -> Option<NodeId> {
        let mut current = from;
        for component in path.iter() {
            current = self.child(current, component)?;
        }
        Some(current)
    }

    /// Walks `path` from `from`, creating missing nodes on the way.
    pub(crate) fn resolve_or_insert(&mut self, from: NodeId, path: &Path) -> NodeId {
        let mut current = from;
        for component in path.iter() {
            current = match self.child(current, component) {
                Some(child) => child,
                None => {
                    let child = NodeId(self.nodes.len());
                    self.nodes
                        .push(Node::new(component.clone(), Some(current)));
                    self.node_mut(current).children.push(child);
                    child
                }
            };
        }
        current
    }

    /// The node's link, created if it doesn't have one yet.
    pub(crate) fn link(&mut self, id: NodeId) -> Arc<Link> {
        self.node_mut(id)
            .link
            .get_or_insert_with(|| Arc::new(Link::new()))
            .clone()
    }

    /// Every node of the subtree rooted at `id`, in pre-order.
    pub(crate) fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut visited = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            visited.push(current);
            stack.extend(self.node(current).children.iter().rev());
        }
        visited
    }

    /// Strict ancestors of `id`, nearest first.
    pub(crate) fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, |current| self.node(*current).parent)
    }

    /// Path of `id` relative to the tree root.
    pub(crate) fn path_of(&self, id: NodeId) -> Path {
        let mut components: Vec<String> = std::iter::once(id)
            .chain(self.ancestors(id))
            .filter(|current| *current != NodeId::ROOT)
            .map(|current| self.node(current).name.clone())
            .collect();
        components.reverse();
        Path { components }
    }

    /// Drops the tree's links and locks; handles keep theirs.
    pub(crate) fn detach_links(&mut self) {
        for node in &mut self.nodes {
            node.link = None;
            node.lock = None;
        }
    }

    /// Writes the subtree below `id`, one name per line, four spaces per
    /// level of depth.
    pub(crate) fn dump(&self, f: &mut fmt::Formatter<'_>, id: NodeId) -> fmt::Result {
        let mut stack: Vec<(NodeId, usize)> = self
            .node(id)
            .children
            .iter()
            .rev()
            .map(|child| (*child, 0))
            .collect();
        while let Some((current, depth)) = stack.pop() {
            writeln!(f, "{:indent$}{}", "", self.node(current).name, indent = depth * 4)?;
            stack.extend(
                self.node(current)
                    .children
                    .iter()
                    .rev()
                    .map(|child| (*child, depth + 1)),
            );
        }
        Ok(())
    }
}
