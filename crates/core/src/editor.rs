//! Editor state plus the actions a presentation layer issues against it.
//! 編輯器狀態，以及呈現層可送出的操作。

use crate::document::{Document, OutlineError};
use crate::id::NodeId;
use crate::node::NodeProps;
use crate::view::NodeViewState;

/// Operations addressed to a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeAction {
    SetText(String),
    ToggleCollapse,
    AddSibling,
    IncreaseLevel,
    DecreaseLevel,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditAction {
    Node(NodeId, NodeAction),
    SetFocus(Option<NodeId>),
    Favorite(NodeId),
    Unfavorite(NodeId),
}

/// Result of a successfully applied action.
/// 操作成功後的結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Unchanged,
    Updated,
    Added(NodeId),
    Removed(Vec<NodeId>),
}

/// Document plus the optional subtree the user has zoomed into.
/// 文件與使用者目前聚焦的子樹。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorState {
    pub document: Document,
    pub focus: Option<NodeId>,
}

impl EditorState {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            focus: None,
        }
    }

    /// Applies an action. Failed actions leave both document and focus untouched.
    /// 套用操作；失敗時文件與焦點皆維持不變。
    pub fn apply(&mut self, action: EditAction) -> Result<EditOutcome, OutlineError> {
        match action {
            EditAction::Node(id, action) => self.apply_node(id, action),
            EditAction::SetFocus(focus) => {
                if let Some(id) = focus {
                    if !self.document.contains(id) {
                        return Err(OutlineError::NodeNotFound(id));
                    }
                }
                self.focus = focus;
                Ok(EditOutcome::Updated)
            }
            EditAction::Favorite(id) => Ok(changed(self.document.favorite(id))),
            EditAction::Unfavorite(id) => Ok(changed(self.document.unfavorite(id))),
        }
    }

    /// Display list under the current focus.
    pub fn visible_nodes(&self) -> Result<Vec<NodeViewState>, OutlineError> {
        self.document.visible_nodes(self.focus)
    }

    fn apply_node(&mut self, id: NodeId, action: NodeAction) -> Result<EditOutcome, OutlineError> {
        match action {
            NodeAction::SetText(text) => {
                self.document.set_text(id, text)?;
                Ok(EditOutcome::Updated)
            }
            NodeAction::ToggleCollapse => {
                self.document
                    .toggle_collapse(id)
                    .ok_or(OutlineError::NodeNotFound(id))?;
                Ok(EditOutcome::Updated)
            }
            NodeAction::AddSibling => {
                let added = self.document.append_after(NodeProps::new(""), id)?;
                Ok(EditOutcome::Added(added))
            }
            NodeAction::IncreaseLevel => {
                self.document.increase_level(id)?;
                Ok(EditOutcome::Updated)
            }
            NodeAction::DecreaseLevel => {
                self.document.decrease_level(id)?;
                Ok(EditOutcome::Updated)
            }
            NodeAction::Delete => {
                let removed = self.document.delete(id)?;
                if self.focus.is_some_and(|focus| removed.contains(&focus)) {
                    self.focus = None;
                }
                Ok(EditOutcome::Removed(removed))
            }
        }
    }
}

fn changed(flag: bool) -> EditOutcome {
    if flag {
        EditOutcome::Updated
    } else {
        EditOutcome::Unchanged
    }
}
