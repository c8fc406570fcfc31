use std::collections::hash_map::{self, HashMap};

use crate::id::NodeId;

/// Per-node properties. Ordering lives in the [`OrderingTree`](crate::OrderingTree) only.
/// 單一節點的屬性；順序資訊僅存在於排序樹中。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeProps {
    pub id: NodeId,
    pub parent: NodeId,
    pub text: String,
    pub is_collapsed: bool,
}

impl NodeProps {
    /// Creates a top-level node with a fresh identifier.
    /// 以新識別碼建立最上層節點。
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_id(NodeId::new(), text)
    }

    pub fn with_id(id: NodeId, text: impl Into<String>) -> Self {
        Self {
            id,
            parent: NodeId::ROOT,
            text: text.into(),
            is_collapsed: false,
        }
    }

    pub fn collapsed(mut self, is_collapsed: bool) -> Self {
        self.is_collapsed = is_collapsed;
        self
    }
}

/// Flat id-keyed property map.
/// 以識別碼為鍵的扁平屬性表。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeStore {
    entries: HashMap<NodeId, NodeProps>,
}

impl NodeStore {
    pub fn get(&self, id: NodeId) -> Option<&NodeProps> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> hash_map::Values<'_, NodeId, NodeProps> {
        self.entries.values()
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeProps> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn insert(&mut self, props: NodeProps) {
        self.entries.insert(props.id, props);
    }

    pub(crate) fn remove(&mut self, id: NodeId) -> Option<NodeProps> {
        self.entries.remove(&id)
    }
}

impl<'a> IntoIterator for &'a NodeStore {
    type Item = &'a NodeProps;
    type IntoIter = hash_map::Values<'a, NodeId, NodeProps>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
