use std::collections::HashSet;

use thiserror::Error;

use crate::id::NodeId;
use crate::node::{NodeProps, NodeStore};
use crate::tree::{OrderingTree, TreePath};

/// Text of the single node seeded into a brand-new outline.
pub const INITIAL_TEXT: &str = "Hello, world!";

/// An outline: flat property map, ordering tree and favorites, kept in sync.
/// 大綱文件：扁平屬性表、排序樹與最愛清單，三者保持一致。
///
/// The two containers are only ever mutated together through the methods in
/// [`mutation`](crate::mutation); callers get read access only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub(crate) nodes: NodeStore,
    pub(crate) tree: OrderingTree,
    pub(crate) favorites: Vec<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty outline.
    /// 建立空白大綱。
    pub fn new() -> Self {
        Self {
            nodes: NodeStore::default(),
            tree: OrderingTree::root(),
            favorites: Vec::new(),
        }
    }

    /// Outline used when nothing has been persisted yet.
    /// 尚無儲存資料時使用的初始大綱。
    pub fn initial() -> Self {
        Self::with_initial_text(INITIAL_TEXT)
    }

    pub fn with_initial_text(text: impl Into<String>) -> Self {
        let mut doc = Self::new();
        let node = NodeProps::new(text);
        doc.nodes.insert(node.clone());
        doc.tree.children_mut().push(OrderingTree::fresh(node.id));
        doc
    }

    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    pub fn tree(&self) -> &OrderingTree {
        &self.tree
    }

    pub fn favorites(&self) -> &[NodeId] {
        &self.favorites
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeProps> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Child entries of `id` (or of the top level for the root sentinel).
    /// 取得指定節點的子節點；根節點代表最上層。
    pub fn children(&self, id: NodeId) -> Result<&[OrderingTree], OutlineError> {
        let path = self.path(id)?;
        self.subtree(id, &path).map(OrderingTree::children)
    }

    /// Favorites paired with their current text, skipping stale entries.
    /// 列出最愛節點與其文字，略過已不存在的項目。
    pub fn favorite_list(&self) -> Vec<(NodeId, &str)> {
        self.favorites
            .iter()
            .filter_map(|id| self.nodes.get(*id).map(|node| (*id, node.text.as_str())))
            .collect()
    }

    /// First node, in outline order, whose text equals `text`.
    pub fn find_by_text(&self, text: &str) -> Option<NodeId> {
        self.tree
            .subtree_ids()
            .into_iter()
            .skip(1)
            .find(|id| self.nodes.get(*id).is_some_and(|node| node.text == text))
    }

    /// Resolves the sibling indices locating `id`, walking its parent chain.
    /// 沿父節點鏈計算定位節點所需的兄弟索引路徑。
    ///
    /// The root sentinel resolves to the empty path. An unknown id is
    /// [`OutlineError::NodeNotFound`]; a parent chain that does not match the
    /// tree is [`OutlineError::Desynchronized`] and indicates a corrupted
    /// document.
    pub fn path(&self, id: NodeId) -> Result<TreePath, OutlineError> {
        if id.is_root() {
            return Ok(TreePath::new());
        }

        let mut ancestry = Vec::new();
        let mut cursor = id;
        while !cursor.is_root() {
            let node = self.nodes.get(cursor).ok_or_else(|| {
                if cursor == id {
                    OutlineError::NodeNotFound(id)
                } else {
                    desync(cursor)
                }
            })?;
            ancestry.push(cursor);
            if ancestry.len() > self.nodes.len() {
                return Err(desync(id));
            }
            cursor = node.parent;
        }
        ancestry.reverse();

        let mut current = &self.tree;
        let mut path = TreePath::with_capacity(ancestry.len());
        for ancestor in ancestry {
            let index = current
                .children()
                .iter()
                .position(|child| child.id() == ancestor)
                .ok_or_else(|| desync(ancestor))?;
            path.push(index);
            current = &current.children()[index];
        }
        Ok(path)
    }

    pub(crate) fn subtree(
        &self,
        id: NodeId,
        path: &[usize],
    ) -> Result<&OrderingTree, OutlineError> {
        self.tree.at(path).ok_or_else(|| desync(id))
    }

    /// Checks that the property map, the ordering tree and the favorites agree.
    /// 驗證屬性表、排序樹與最愛清單彼此一致。
    pub fn validate(&self) -> Result<(), OutlineError> {
        if !self.tree.id().is_root() {
            return Err(desync(self.tree.id()));
        }

        let mut seen = HashSet::with_capacity(self.nodes.len());
        let mut stack: Vec<&OrderingTree> = vec![&self.tree];
        while let Some(parent) = stack.pop() {
            for child in parent.children() {
                let props = self
                    .nodes
                    .get(child.id())
                    .ok_or_else(|| desync(child.id()))?;
                if props.parent != parent.id() || !seen.insert(child.id()) {
                    return Err(desync(child.id()));
                }
                stack.push(child);
            }
        }
        if seen.len() != self.nodes.len() {
            let orphan = self
                .nodes
                .ids()
                .find(|id| !seen.contains(id))
                .unwrap_or(NodeId::ROOT);
            return Err(desync(orphan));
        }

        match self.favorites.iter().find(|id| !self.nodes.contains(**id)) {
            Some(stale) => Err(OutlineError::NodeNotFound(*stale)),
            None => Ok(()),
        }
    }
}

pub(crate) fn desync(id: NodeId) -> OutlineError {
    OutlineError::Desynchronized(id)
}

/// Structural errors raised by outline operations. None of them leave a partial mutation behind.
/// 大綱操作錯誤；發生錯誤時不會留下部分修改。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OutlineError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("node {0} already exists")]
    DuplicateNode(NodeId),
    #[error("the root sentinel cannot be edited, moved or deleted")]
    RootSentinel,
    #[error("node {0} is the first of its siblings and cannot be indented")]
    CannotIncreaseLevel(NodeId),
    #[error("node {0} is already at the top level and cannot be outdented")]
    CannotDecreaseLevel(NodeId),
    #[error("node {0} would sit deeper than the outline allows")]
    TooDeep(NodeId),
    #[error("outline tree is out of sync with the node store at {0}")]
    Desynchronized(NodeId),
}
