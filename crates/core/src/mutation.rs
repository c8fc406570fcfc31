//! Structural edits on a [`Document`]. Every method validates first and only
//! then touches the node store and the ordering tree together.
//! 大綱結構編輯：先驗證前置條件，再同步更新節點表與排序樹。

use std::collections::HashSet;

use crate::document::{desync, Document, OutlineError};
use crate::id::NodeId;
use crate::node::NodeProps;
use crate::tree::{OrderingTree, MAX_DEPTH};

impl Document {
    /// Appends `node` as the last child of `parent` (the root sentinel for top level).
    /// 將節點加入為指定父節點的最後一個子節點。
    pub fn append_to(
        &mut self,
        mut node: NodeProps,
        parent: NodeId,
    ) -> Result<NodeId, OutlineError> {
        self.ensure_absent(node.id)?;
        let parent_path = self.path(parent)?;
        let id = node.id;
        if parent_path.len() >= MAX_DEPTH {
            return Err(OutlineError::TooDeep(id));
        }
        node.parent = parent;

        let entry = self.tree.at_mut(&parent_path).ok_or_else(|| desync(parent))?;
        entry.children_mut().push(OrderingTree::fresh(id));
        self.nodes.insert(node);
        self.debug_check();
        Ok(id)
    }

    /// Inserts `node` immediately after `sibling`, sharing its parent.
    /// 將節點插入在指定兄弟節點之後，並共用同一父節點。
    pub fn append_after(
        &mut self,
        mut node: NodeProps,
        sibling: NodeId,
    ) -> Result<NodeId, OutlineError> {
        self.ensure_absent(node.id)?;
        if sibling.is_root() {
            return Err(OutlineError::RootSentinel);
        }
        let sibling_path = self.path(sibling)?;
        let (&index, parent_path) = sibling_path.split_last().ok_or_else(|| desync(sibling))?;
        let id = node.id;
        node.parent = self.nodes.get(sibling).map_or(NodeId::ROOT, |props| props.parent);

        let entry = self.tree.at_mut(parent_path).ok_or_else(|| desync(sibling))?;
        entry.children_mut().insert(index + 1, OrderingTree::fresh(id));
        self.nodes.insert(node);
        self.debug_check();
        Ok(id)
    }

    /// `true` when the node has a preceding sibling to become its new parent
    /// and its subtree stays within [`MAX_DEPTH`].
    /// 節點前方有兄弟節點且子樹不超過最大深度時才可增加層級。
    pub fn can_increase_level(&self, id: NodeId) -> bool {
        let Ok(path) = self.path(id) else {
            return false;
        };
        matches!(path.last(), Some(index) if *index > 0)
            && self
                .tree
                .at(&path)
                .is_some_and(|tree| path.len() + tree.height() < MAX_DEPTH)
    }

    /// Indents the node: it becomes the last child of its preceding sibling.
    /// 增加層級：節點移入前一個兄弟節點，成為其最後一個子節點。
    pub fn increase_level(&mut self, id: NodeId) -> Result<(), OutlineError> {
        let path = self.path(id)?;
        let (index, parent_path) = match path.split_last() {
            Some((&index, parent_path)) if index > 0 => (index, parent_path),
            _ => return Err(OutlineError::CannotIncreaseLevel(id)),
        };
        let height = self.subtree(id, &path)?.height();
        if path.len() + height >= MAX_DEPTH {
            return Err(OutlineError::TooDeep(id));
        }

        let parent = self.tree.at_mut(parent_path).ok_or_else(|| desync(id))?;
        let siblings = parent.children_mut();
        let moved = siblings.remove(index);
        let new_parent = &mut siblings[index - 1];
        let new_parent_id = new_parent.id();
        new_parent.children_mut().push(moved);

        if let Some(props) = self.nodes.get_mut(id) {
            props.parent = new_parent_id;
        }
        self.debug_check();
        Ok(())
    }

    /// `true` when the node is nested below another node.
    /// 節點不在最上層時才可減少層級。
    pub fn can_decrease_level(&self, id: NodeId) -> bool {
        self.path(id).is_ok_and(|path| path.len() > 1)
    }

    /// Outdents the node to sit right after its former parent.
    /// 減少層級：節點移到原父節點之後。
    ///
    /// Every sibling that followed the node moves along and is appended,
    /// in order, after the node's existing children.
    /// 原本位於其後的兄弟節點會依序成為它的子節點，接在既有子節點之後。
    pub fn decrease_level(&mut self, id: NodeId) -> Result<(), OutlineError> {
        let path = self.path(id)?;
        let (index, former_parent_index, grandparent_path) = match path.as_slice() {
            [grandparent_path @ .., j, i] => (*i, *j, grandparent_path),
            _ => return Err(OutlineError::CannotDecreaseLevel(id)),
        };

        let grandparent = self.tree.at_mut(grandparent_path).ok_or_else(|| desync(id))?;
        let grandparent_id = grandparent.id();
        let former_parent = grandparent
            .children_mut()
            .get_mut(former_parent_index)
            .ok_or_else(|| desync(id))?;
        let mut detached = former_parent.children_mut().split_off(index);
        let trailing = detached.split_off(1);
        let mut moved = detached.pop().ok_or_else(|| desync(id))?;

        let adopted: Vec<NodeId> = trailing.iter().map(OrderingTree::id).collect();
        moved.children_mut().extend(trailing);
        grandparent
            .children_mut()
            .insert(former_parent_index + 1, moved);

        for child in adopted {
            if let Some(props) = self.nodes.get_mut(child) {
                props.parent = id;
            }
        }
        if let Some(props) = self.nodes.get_mut(id) {
            props.parent = grandparent_id;
        }
        self.debug_check();
        Ok(())
    }

    /// Removes the node and its whole subtree, returning the removed ids in pre-order.
    /// 刪除節點及其整個子樹，並回傳以前序排列的已刪除識別碼。
    pub fn delete(&mut self, id: NodeId) -> Result<Vec<NodeId>, OutlineError> {
        if id.is_root() {
            return Err(OutlineError::RootSentinel);
        }
        let path = self.path(id)?;
        let (&index, parent_path) = path.split_last().ok_or_else(|| desync(id))?;

        let parent = self.tree.at_mut(parent_path).ok_or_else(|| desync(id))?;
        let removed = parent.children_mut().remove(index);
        let removed_ids = removed.subtree_ids();

        for removed_id in &removed_ids {
            self.nodes.remove(*removed_id);
        }
        let removed_set: HashSet<NodeId> = removed_ids.iter().copied().collect();
        self.favorites.retain(|favorite| !removed_set.contains(favorite));
        self.debug_check();
        Ok(removed_ids)
    }

    /// Replaces the text of a node.
    /// 取代節點文字。
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<(), OutlineError> {
        if id.is_root() {
            return Err(OutlineError::RootSentinel);
        }
        let props = self.nodes.get_mut(id).ok_or(OutlineError::NodeNotFound(id))?;
        props.text = text.into();
        Ok(())
    }

    /// Marks the node collapsed. Returns `false` when the id is unknown.
    /// 折疊節點；找不到節點時回傳 `false`。
    pub fn collapse(&mut self, id: NodeId) -> bool {
        self.set_collapsed(id, true)
    }

    /// Clears the collapsed flag. Returns `false` when the id is unknown.
    /// 展開節點；找不到節點時回傳 `false`。
    pub fn expand(&mut self, id: NodeId) -> bool {
        self.set_collapsed(id, false)
    }

    /// Flips the collapsed flag and returns the new value.
    /// 切換折疊狀態並回傳新的狀態。
    pub fn toggle_collapse(&mut self, id: NodeId) -> Option<bool> {
        let props = self.nodes.get_mut(id)?;
        props.is_collapsed = !props.is_collapsed;
        Some(props.is_collapsed)
    }

    /// Adds the node to the favorites list; unknown ids are ignored.
    /// 加入最愛；未知節點將被忽略。
    pub fn favorite(&mut self, id: NodeId) -> bool {
        if !self.nodes.contains(id) {
            return false;
        }
        self.favorites.push(id);
        true
    }

    /// Removes every occurrence of the node from the favorites list.
    /// 從最愛清單移除該節點的所有項目。
    pub fn unfavorite(&mut self, id: NodeId) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|favorite| *favorite != id);
        self.favorites.len() != before
    }

    fn set_collapsed(&mut self, id: NodeId, collapsed: bool) -> bool {
        match self.nodes.get_mut(id) {
            Some(props) => {
                props.is_collapsed = collapsed;
                true
            }
            None => false,
        }
    }

    fn ensure_absent(&self, id: NodeId) -> Result<(), OutlineError> {
        if id.is_root() {
            return Err(OutlineError::RootSentinel);
        }
        if self.nodes.contains(id) {
            return Err(OutlineError::DuplicateNode(id));
        }
        Ok(())
    }

    fn debug_check(&self) {
        debug_assert_eq!(self.validate(), Ok(()), "outline invariants violated");
    }
}
