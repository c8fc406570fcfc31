//! Outline engine: node store, ordering tree, structural edits, display projection and
//! the canonical persisted format.
//! 大綱核心：節點表、排序樹、結構編輯、顯示投影與標準儲存格式。

pub mod document;
pub mod editor;
pub mod id;
pub mod mutation;
pub mod node;
pub mod outline_text;
pub mod serialization;
pub mod tree;
pub mod view;

pub use document::{Document, OutlineError, INITIAL_TEXT};
pub use editor::{EditAction, EditOutcome, EditorState, NodeAction};
pub use id::NodeId;
pub use node::{NodeProps, NodeStore};
pub use outline_text::OutlineTextError;
pub use serialization::{
    DecodeReport, DropReason, DroppedRecord, SerializableDocument, SerializableNode,
    SerializationError, FORMAT_VERSION,
};
pub use tree::{OrderingTree, TreePath, MAX_DEPTH};
pub use view::{CollapseStatus, NodeViewState};
