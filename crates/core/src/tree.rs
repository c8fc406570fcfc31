use crate::id::NodeId;

/// Sibling indices locating a node, root-to-node order. Empty for the root sentinel.
/// 自根節點起算的兄弟索引序列；根節點為空序列。
pub type TreePath = Vec<usize>;

/// Deepest level a node may sit at, counted as the length of its [`TreePath`].
/// 節點允許的最大深度（以 [`TreePath`] 長度計）。
pub const MAX_DEPTH: usize = 1024;

/// Ordered tree of identifiers mirroring parent/child and sibling order.
/// 依父子與兄弟順序排列的識別碼樹。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingTree {
    id: NodeId,
    children: Vec<OrderingTree>,
}

impl OrderingTree {
    /// Childless entry for a newly appended node.
    pub fn fresh(id: NodeId) -> Self {
        Self {
            id,
            children: Vec::new(),
        }
    }

    /// Empty tree rooted at the sentinel.
    /// 以根節點識別碼建立的空樹。
    pub fn root() -> Self {
        Self::fresh(NodeId::ROOT)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn children(&self) -> &[OrderingTree] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<OrderingTree> {
        &mut self.children
    }

    /// Follows `path` downwards, returning `None` when an index is out of range.
    /// 依路徑往下尋找子樹；索引超出範圍時回傳 `None`。
    pub fn at(&self, path: &[usize]) -> Option<&OrderingTree> {
        path.iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    pub(crate) fn at_mut(&mut self, path: &[usize]) -> Option<&mut OrderingTree> {
        let mut node = self;
        for &index in path {
            node = node.children.get_mut(index)?;
        }
        Some(node)
    }

    /// Identifiers of this subtree in pre-order, including its own.
    /// 以前序走訪列出此子樹（含自身）的所有識別碼。
    pub fn subtree_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            ids.push(node.id);
            stack.extend(node.children.iter().rev());
        }
        ids
    }

    /// Number of entries below this node.
    pub fn descendant_count(&self) -> usize {
        self.subtree_ids().len() - 1
    }

    /// Levels below this node; `0` for a leaf.
    /// 此節點之下的層數；葉節點為 `0`。
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack = vec![(self, 0)];
        while let Some((node, depth)) = stack.pop() {
            height = height.max(depth);
            stack.extend(node.children.iter().map(|child| (child, depth + 1)));
        }
        height
    }
}

impl Drop for OrderingTree {
    // flatten before dropping so deep chains do not recurse
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (OrderingTree, [NodeId; 4]) {
        let ids = [NodeId::new(), NodeId::new(), NodeId::new(), NodeId::new()];
        let mut root = OrderingTree::root();
        let mut first = OrderingTree::fresh(ids[0]);
        first.children.push(OrderingTree::fresh(ids[1]));
        first.children.push(OrderingTree::fresh(ids[2]));
        root.children.push(first);
        root.children.push(OrderingTree::fresh(ids[3]));
        (root, ids)
    }

    #[test]
    fn at_follows_indices() {
        let (tree, ids) = sample();
        assert_eq!(tree.at(&[]).map(OrderingTree::id), Some(NodeId::ROOT));
        assert_eq!(tree.at(&[0, 1]).map(OrderingTree::id), Some(ids[2]));
        assert_eq!(tree.at(&[1]).map(OrderingTree::id), Some(ids[3]));
        assert!(tree.at(&[0, 2]).is_none());
        assert!(tree.at(&[1, 0]).is_none());
    }

    #[test]
    fn subtree_ids_are_pre_order() {
        let (tree, ids) = sample();
        assert_eq!(
            tree.subtree_ids(),
            vec![NodeId::ROOT, ids[0], ids[1], ids[2], ids[3]]
        );
        assert_eq!(tree.descendant_count(), 4);
        assert_eq!(tree.height(), 2);
        assert_eq!(tree.at(&[1]).unwrap().height(), 0);
        assert!(tree.at(&[1]).unwrap().is_leaf());
    }

    #[test]
    fn dropping_a_deep_chain_does_not_recurse() {
        let mut tree = OrderingTree::root();
        let mut cursor = &mut tree;
        for _ in 0..200_000 {
            let node = cursor;
            node.children.push(OrderingTree::fresh(NodeId::new()));
            cursor = &mut node.children[0];
        }
        drop(tree);
    }
}
