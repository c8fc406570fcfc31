//! Canonical on-disk form of an outline.
//! 大綱的標準序列化格式。
//!
//! Order is stored only through local edges: the first child of a sibling
//! list names its `parent`, every later sibling names its `previous`
//! sibling, and the first top-level node names neither. Keys are written in
//! sorted order, so editing one branch leaves the rest of the file untouched.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{Document, OutlineError};
use crate::id::NodeId;
use crate::node::NodeProps;

/// Current persisted format version.
pub const FORMAT_VERSION: u64 = 1;

/// 序列化後的文件。 / Persisted document payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableDocument {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub favorites: Vec<String>,
    pub nodes: BTreeMap<String, SerializableNode>,
    #[serde(default)]
    pub version: u64,
}

/// 序列化後的單一節點。 / Persisted node record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializableNode {
    #[serde(default)]
    pub is_collapsed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    pub text: String,
}

/// Errors that abort a whole encode or decode.
/// 會中止整個編碼或解碼流程的錯誤。
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("malformed outline payload: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("failed to encode outline: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("unsupported outline format version {found} (newest supported is {supported})")]
    UnsupportedVersion { found: u64, supported: u64 },
}

/// Why a record was left out of a decoded document.
/// 記錄在解碼時被捨棄的原因。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    InvalidIdentifier,
    ReservedIdentifier,
    DuplicateIdentifier,
    InvalidReference(String),
    MissingTarget(NodeId),
    DroppedTarget(NodeId),
    Cycle,
    /// The record would sit deeper than [`MAX_DEPTH`](crate::tree::MAX_DEPTH).
    TooDeep,
    Rejected(OutlineError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRecord {
    pub key: String,
    pub reason: DropReason,
}

/// Records lost while decoding. Empty for a lossless load.
/// 解碼過程中遺失的資料；完整載入時為空。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    pub dropped: Vec<DroppedRecord>,
    pub dropped_favorites: Vec<String>,
}

impl DecodeReport {
    pub fn is_lossless(&self) -> bool {
        self.dropped.is_empty() && self.dropped_favorites.is_empty()
    }
}

impl Document {
    /// Encodes the outline as pretty, key-sorted JSON.
    /// Unchanged documents encode byte-identically.
    /// 以排序鍵的 JSON 編碼大綱；內容未變時輸出位元組完全相同。
    pub fn encode(&self) -> Result<Vec<u8>, SerializationError> {
        serde_json::to_vec_pretty(&SerializableDocument::from_document(self))
            .map_err(SerializationError::Encode)
    }

    /// Decodes an outline, dropping records that cannot be placed.
    /// 解碼大綱；無法放置的記錄會被捨棄。
    pub fn decode(bytes: &[u8]) -> Result<Self, SerializationError> {
        Self::decode_with_report(bytes).map(|(document, _)| document)
    }

    pub fn decode_with_report(bytes: &[u8]) -> Result<(Self, DecodeReport), SerializationError> {
        let payload: SerializableDocument =
            serde_json::from_slice(bytes).map_err(SerializationError::Malformed)?;
        payload.restore()
    }
}

impl SerializableDocument {
    pub fn from_document(document: &Document) -> Self {
        let mut nodes = BTreeMap::new();
        encode_nodes(document, &mut nodes);
        Self {
            favorites: document
                .favorites()
                .iter()
                .map(NodeId::to_string)
                .collect(),
            nodes,
            version: FORMAT_VERSION,
        }
    }

    /// Rebuilds the live document.
    /// 依記錄重建大綱文件。
    ///
    /// Records are visited in key order; each one first materialises the
    /// record it points at. Top-level nodes without any edge therefore land
    /// in lexicographic key order. A missing `version` reads as `0`, and
    /// records nested deeper than [`MAX_DEPTH`](crate::tree::MAX_DEPTH) are
    /// dropped.
    pub fn restore(&self) -> Result<(Document, DecodeReport), SerializationError> {
        if self.version > FORMAT_VERSION {
            return Err(SerializationError::UnsupportedVersion {
                found: self.version,
                supported: FORMAT_VERSION,
            });
        }

        let mut restorer = Restorer::default();
        let mut order = Vec::with_capacity(self.nodes.len());
        for (key, node) in &self.nodes {
            let Some(id) = NodeId::parse(key) else {
                restorer.drop_key(key, DropReason::InvalidIdentifier);
                continue;
            };
            if id.is_root() {
                restorer.drop_key(key, DropReason::ReservedIdentifier);
                continue;
            }
            let anchor = match Anchor::parse(node) {
                Ok(anchor) => anchor,
                Err(reference) => {
                    restorer.drop_key(key, DropReason::InvalidReference(reference));
                    continue;
                }
            };
            if restorer.records.contains_key(&id) {
                restorer.drop_key(key, DropReason::DuplicateIdentifier);
                continue;
            }
            restorer
                .records
                .insert(id, PendingRecord { key, node, anchor });
            order.push(id);
        }

        for id in order {
            restorer.resolve(id);
        }

        let Restorer {
            mut document,
            mut report,
            ..
        } = restorer;
        for favorite in &self.favorites {
            match NodeId::parse(favorite) {
                Some(id) if document.contains(id) => document.favorites.push(id),
                _ => {
                    tracing::warn!(
                        favorite = %favorite,
                        "dropping favorite without a matching node"
                    );
                    report.dropped_favorites.push(favorite.clone());
                }
            }
        }

        if !report.is_lossless() {
            tracing::warn!(
                dropped = report.dropped.len(),
                dropped_favorites = report.dropped_favorites.len(),
                kept = document.len(),
                "outline decoded with losses"
            );
        }
        debug_assert_eq!(document.validate(), Ok(()));
        Ok((document, report))
    }
}

fn encode_nodes(document: &Document, nodes: &mut BTreeMap<String, SerializableNode>) {
    let mut stack = vec![document.tree()];
    while let Some(tree) = stack.pop() {
        let mut previous: Option<NodeId> = None;
        for child in tree.children() {
            let Some(props) = document.node(child.id()) else {
                continue;
            };
            let parent = match previous {
                None if !tree.id().is_root() => Some(tree.id().to_string()),
                _ => None,
            };
            nodes.insert(
                child.id().to_string(),
                SerializableNode {
                    is_collapsed: props.is_collapsed,
                    parent,
                    previous: previous.map(|id| id.to_string()),
                    text: props.text.clone(),
                },
            );
            stack.push(child);
            previous = Some(child.id());
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Anchor {
    Top,
    Parent(NodeId),
    Previous(NodeId),
}

impl Anchor {
    /// `previous` wins when a record carries both edges.
    fn parse(node: &SerializableNode) -> Result<Self, String> {
        if let Some(previous) = &node.previous {
            return NodeId::parse(previous)
                .map(Anchor::Previous)
                .ok_or_else(|| previous.clone());
        }
        match &node.parent {
            Some(parent) => match NodeId::parse(parent) {
                Some(id) if id.is_root() => Ok(Anchor::Top),
                Some(id) => Ok(Anchor::Parent(id)),
                None => Err(parent.clone()),
            },
            None => Ok(Anchor::Top),
        }
    }
}

struct PendingRecord<'a> {
    key: &'a str,
    node: &'a SerializableNode,
    anchor: Anchor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
    Failed,
}

#[derive(Default)]
struct Restorer<'a> {
    records: HashMap<NodeId, PendingRecord<'a>>,
    state: HashMap<NodeId, Visit>,
    document: Document,
    report: DecodeReport,
}

impl Restorer<'_> {
    /// Walks the dependency chain of `start` down to something already placed
    /// (or the top level), then materialises the chain bottom-up. Each record
    /// depends on exactly one other, so a failure anywhere drops the whole
    /// pending chain.
    fn resolve(&mut self, start: NodeId) {
        let mut chain = Vec::new();
        let mut cursor = start;
        let outcome = loop {
            match self.state.get(&cursor) {
                Some(Visit::Done) => break Ok(()),
                Some(Visit::Failed) => break Err(DropReason::DroppedTarget(cursor)),
                Some(Visit::InProgress) => break Err(DropReason::Cycle),
                None => {}
            }
            let Some(record) = self.records.get(&cursor) else {
                break Err(DropReason::MissingTarget(cursor));
            };
            let anchor = record.anchor;
            self.state.insert(cursor, Visit::InProgress);
            chain.push(cursor);
            match anchor {
                Anchor::Top => break Ok(()),
                Anchor::Parent(target) | Anchor::Previous(target) => cursor = target,
            }
        };

        match outcome {
            Ok(()) => {
                let mut failed = None;
                for id in chain.into_iter().rev() {
                    if let Some(target) = failed {
                        self.fail(id, DropReason::DroppedTarget(target));
                    } else if let Err(reason) = self.materialize(id) {
                        self.fail(id, reason);
                        failed = Some(id);
                    }
                }
            }
            Err(reason) => {
                for id in chain {
                    self.fail(id, reason.clone());
                }
            }
        }
    }

    fn materialize(&mut self, id: NodeId) -> Result<(), DropReason> {
        let Some(record) = self.records.get(&id) else {
            return Err(DropReason::MissingTarget(id));
        };
        let props = NodeProps::with_id(id, record.node.text.clone())
            .collapsed(record.node.is_collapsed);
        let placed = match record.anchor {
            Anchor::Top => self.document.append_to(props, NodeId::ROOT),
            Anchor::Parent(parent) => self.document.append_to(props, parent),
            Anchor::Previous(previous) => self.document.append_after(props, previous),
        };
        match placed {
            Ok(_) => {
                self.state.insert(id, Visit::Done);
                Ok(())
            }
            Err(OutlineError::TooDeep(_)) => Err(DropReason::TooDeep),
            Err(err) => Err(DropReason::Rejected(err)),
        }
    }

    fn fail(&mut self, id: NodeId, reason: DropReason) {
        self.state.insert(id, Visit::Failed);
        if let Some(record) = self.records.get(&id) {
            let key = record.key.to_string();
            self.drop_key(&key, reason);
        }
    }

    fn drop_key(&mut self, key: &str, reason: DropReason) {
        tracing::warn!(key = %key, reason = ?reason, "dropping outline record");
        self.report.dropped.push(DroppedRecord {
            key: key.to_string(),
            reason,
        });
    }
}
