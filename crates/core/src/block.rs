// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structural units produced by the parsers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    Heading,
    ListItem,
    CodeBlock,
    BlockQuote,
    Rule,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading => "heading",
            BlockKind::ListItem => "list_item",
            BlockKind::CodeBlock => "code_block",
            BlockKind::BlockQuote => "block_quote",
            BlockKind::Rule => "rule",
        };
        f.write_str(name)
    }
}

/// A contiguous region of a source file. Byte offsets refer to the raw
/// file content; line numbers are 1-based. Ordinals increase strictly
/// from zero within one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub body: String,
    pub kind: BlockKind,
    pub start: usize,
    pub end: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub ordinal: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// 1..=6 for headings, absent otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_level: Option<u8>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
}

impl Block {
    pub fn new(body: impl Into<String>, kind: BlockKind, ordinal: usize) -> Self {
        Self {
            body: body.into(),
            kind,
            start: 0,
            end: 0,
            start_line: 1,
            end_line: 1,
            ordinal,
            title: None,
            heading_level: None,
            attrs: BTreeMap::new(),
        }
    }

    /// Parser invariants: non-empty body, ordered offsets and lines.
    pub fn is_well_formed(&self) -> bool {
        !self.body.is_empty() && self.start <= self.end && self.start_line <= self.end_line
    }
}
