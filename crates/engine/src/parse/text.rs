// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text parser: paragraphs separated by blank lines.

use super::{split_lines, Line};
use silo_core::block::{Block, BlockKind};
use std::collections::BTreeMap;

pub(crate) fn parse(content: &str) -> Vec<Block> {
    let lines = split_lines(content);
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].text.trim().is_empty() {
            i += 1;
            continue;
        }
        let first = i;
        while i < lines.len() && !lines[i].text.trim().is_empty() {
            i += 1;
        }
        blocks.push(paragraph(&lines[first..i], blocks.len()));
    }

    blocks
}

fn paragraph(span: &[Line<'_>], ordinal: usize) -> Block {
    let body = span.iter().map(|l| l.text.trim_end()).collect::<Vec<_>>().join("\n");
    let last = span[span.len() - 1];
    Block {
        body,
        kind: BlockKind::Paragraph,
        start: span[0].start,
        end: last.end,
        start_line: span[0].number,
        end_line: last.number,
        ordinal,
        title: None,
        heading_level: None,
        attrs: BTreeMap::new(),
    }
}

#[cfg(test)]
#[path = "text_tests.rs"]
mod tests;
