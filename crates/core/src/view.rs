use crate::document::{Document, OutlineError};
use crate::id::NodeId;
use crate::node::NodeProps;
use crate::tree::OrderingTree;

/// 節點的折疊狀態。 / Collapse state of a projected node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollapseStatus {
    Leaf,
    Collapsed,
    Expanded,
}

/// 顯示清單中的一列。 / One row of the flattened display list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeViewState {
    pub props: NodeProps,
    pub level: usize,
    pub collapse_status: CollapseStatus,
}

impl NodeViewState {
    pub fn id(&self) -> NodeId {
        self.props.id
    }
}

impl Document {
    /// Flattens the outline into display order, hiding children of collapsed nodes.
    /// 依顯示順序攤平大綱，並隱藏已折疊節點的子節點。
    ///
    /// With `focus` set, only the descendants of that node are listed and
    /// their levels start at zero.
    pub fn visible_nodes(
        &self,
        focus: Option<NodeId>,
    ) -> Result<Vec<NodeViewState>, OutlineError> {
        let focus = focus.unwrap_or(NodeId::ROOT);
        let path = self.path(focus)?;
        let start = self.subtree(focus, &path)?;

        let mut list = Vec::new();
        let mut stack: Vec<(&OrderingTree, usize)> =
            start.children().iter().rev().map(|child| (child, 0)).collect();
        while let Some((tree, level)) = stack.pop() {
            let props = self
                .nodes
                .get(tree.id())
                .ok_or(OutlineError::Desynchronized(tree.id()))?;
            let collapse_status = if tree.is_leaf() {
                CollapseStatus::Leaf
            } else if props.is_collapsed {
                CollapseStatus::Collapsed
            } else {
                CollapseStatus::Expanded
            };

            list.push(NodeViewState {
                props: props.clone(),
                level,
                collapse_status,
            });
            if collapse_status == CollapseStatus::Expanded {
                stack.extend(tree.children().iter().rev().map(|child| (child, level + 1)));
            }
        }
        Ok(list)
    }
}
