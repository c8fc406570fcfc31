use thiserror::Error;

use crate::document::{Document, OutlineError};
use crate::id::NodeId;
use crate::node::NodeProps;
use crate::tree::OrderingTree;

/// Marks a line whose text is kept verbatim after the indentation.
const ESCAPE: char = '\\';

/// 縮排大綱文字的解析錯誤。 / Errors raised while reading an indented outline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OutlineTextError {
    #[error("line {line}: indentation is not a multiple of {width} spaces")]
    RaggedIndent { line: usize, width: usize },
    #[error("line {line}: level {level} skips past the deepest open level {deepest}")]
    LevelJump {
        line: usize,
        level: usize,
        deepest: usize,
    },
    #[error("outline error: {0}")]
    Outline(#[from] OutlineError),
}

impl Document {
    /// Builds an outline from indented text, one node per non-blank line.
    /// 由縮排文字建立大綱，每個非空白行為一個節點。
    ///
    /// A backslash right after the indentation is dropped and the rest of the
    /// line is taken as-is, spaces included.
    pub fn from_outline_text(text: &str, indent_width: usize) -> Result<Self, OutlineTextError> {
        let width = indent_width.max(1);
        let mut doc = Document::new();
        // open[k] is the most recent node at level k
        let mut open: Vec<NodeId> = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            if raw.trim().is_empty() {
                continue;
            }
            let rest = raw.trim_start_matches(' ');
            let spaces = raw.len() - rest.len();
            if spaces % width != 0 {
                return Err(OutlineTextError::RaggedIndent { line, width });
            }
            let level = spaces / width;
            if level > open.len() {
                return Err(OutlineTextError::LevelJump {
                    line,
                    level,
                    deepest: open.len(),
                });
            }

            open.truncate(level);
            let parent = open.last().copied().unwrap_or(NodeId::ROOT);
            let body = match rest.strip_prefix(ESCAPE) {
                Some(verbatim) => verbatim,
                None => rest.trim_end(),
            };
            let id = doc.append_to(NodeProps::new(body), parent)?;
            open.push(id);
        }
        Ok(doc)
    }

    /// Renders the whole tree, collapsed branches included, as indented text.
    /// 將整棵樹（含已折疊分支）輸出為縮排文字。
    ///
    /// Line breaks inside node text are flattened to spaces. Text that would
    /// not survive a re-import (empty, padded with whitespace, or starting
    /// with a backslash) is written behind a backslash.
    pub fn to_outline_text(&self, indent_width: usize) -> String {
        let width = indent_width.max(1);
        let mut out = String::new();
        let mut stack: Vec<(&OrderingTree, usize)> = self
            .tree()
            .children()
            .iter()
            .rev()
            .map(|child| (child, 0))
            .collect();
        while let Some((tree, level)) = stack.pop() {
            if let Some(props) = self.node(tree.id()) {
                out.push_str(&" ".repeat(level * width));
                let text = props.text.replace(['\r', '\n'], " ");
                if text.is_empty()
                    || text.starts_with(char::is_whitespace)
                    || text.ends_with(char::is_whitespace)
                    || text.starts_with(ESCAPE)
                {
                    out.push(ESCAPE);
                }
                out.push_str(&text);
                out.push('\n');
            }
            stack.extend(tree.children().iter().rev().map(|child| (child, level + 1)));
        }
        out
    }
}
