// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Markdown block parser.
//!
//! Recognizes ATX and setext headings, paragraphs, fenced and indented
//! code blocks, list items, block quotes, and horizontal rules. One
//! structural element becomes one Block; inline formatting stays
//! verbatim in the body. This is a block-level scanner, not a full
//! CommonMark implementation.

use super::Line;
use silo_core::block::{Block, BlockKind};
use std::collections::BTreeMap;

pub(crate) fn parse(content: &str) -> Vec<Block> {
    let lines = super::split_lines(content);
    let mut blocks: Vec<Block> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let text = lines[i].text;
        if text.trim().is_empty() {
            i += 1;
            continue;
        }

        if let Some((fence, width, info)) = fence_open(text) {
            i = consume_fenced_code(&lines, i, fence, width, info, &mut blocks);
            continue;
        }

        if let Some((level, title)) = atx_heading(text) {
            let block = make(&lines[i..=i], BlockKind::Heading, verbatim(&lines[i..=i]), blocks.len())
                .with_heading(title, level);
            blocks.push(block);
            i += 1;
            continue;
        }

        if is_rule(text) {
            blocks.push(make(&lines[i..=i], BlockKind::Rule, text.trim().to_string(), blocks.len()));
            i += 1;
            continue;
        }

        if is_quote(text) {
            let first = i;
            while i < lines.len() && is_quote(lines[i].text) {
                i += 1;
            }
            let span = &lines[first..i];
            blocks.push(make(span, BlockKind::BlockQuote, verbatim(span), blocks.len()));
            continue;
        }

        if list_marker(text).is_some() {
            let first = i;
            i += 1;
            while i < lines.len() && is_list_continuation(lines[i].text) {
                i += 1;
            }
            let span = &lines[first..i];
            blocks.push(make(span, BlockKind::ListItem, verbatim(span), blocks.len()));
            continue;
        }

        if is_indented_code(text) && at_block_start(&lines, i) {
            let first = i;
            while i < lines.len() && is_indented_code(lines[i].text) {
                i += 1;
            }
            let span = &lines[first..i];
            blocks.push(make(span, BlockKind::CodeBlock, verbatim(span), blocks.len()));
            continue;
        }

        i = consume_paragraph(&lines, i, &mut blocks);
    }

    blocks
}

/// Paragraph, or setext heading when an underline closes it.
fn consume_paragraph(lines: &[Line<'_>], start: usize, blocks: &mut Vec<Block>) -> usize {
    let mut i = start + 1;
    let mut underline: Option<u8> = None;

    while i < lines.len() {
        let next = lines[i].text;
        if next.trim().is_empty() {
            break;
        }
        if let Some(level) = setext_underline(next) {
            underline = Some(level);
            i += 1;
            break;
        }
        if fence_open(next).is_some()
            || atx_heading(next).is_some()
            || is_rule(next)
            || is_quote(next)
            || list_marker(next).is_some()
        {
            break;
        }
        i += 1;
    }

    let span = &lines[start..i];
    match underline {
        Some(level) => {
            let title =
                lines[start..i - 1].iter().map(|l| l.text.trim()).collect::<Vec<_>>().join(" ");
            let block = make(span, BlockKind::Heading, verbatim(span), blocks.len())
                .with_heading(title, level);
            blocks.push(block);
        }
        None => {
            let body = span.iter().map(|l| l.text.trim_end()).collect::<Vec<_>>().join("\n");
            blocks.push(make(span, BlockKind::Paragraph, body, blocks.len()));
        }
    }
    i
}

fn consume_fenced_code(
    lines: &[Line<'_>],
    start: usize,
    fence: char,
    width: usize,
    info: &str,
    blocks: &mut Vec<Block>,
) -> usize {
    let mut i = start + 1;
    while i < lines.len() && !fence_close(lines[i].text, fence, width) {
        i += 1;
    }
    // An unterminated fence runs to EOF.
    let last = i.min(lines.len() - 1);
    let span = &lines[start..=last];

    let mut block = make(span, BlockKind::CodeBlock, verbatim(span), blocks.len());
    if !info.is_empty() {
        block.attrs.insert("language".to_string(), info.to_string());
    }
    blocks.push(block);
    last + 1
}

fn make(span: &[Line<'_>], kind: BlockKind, body: String, ordinal: usize) -> Block {
    let last = span[span.len() - 1];
    Block {
        body,
        kind,
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

trait WithHeading {
    fn with_heading(self, title: String, level: u8) -> Self;
}

impl WithHeading for Block {
    fn with_heading(mut self, title: String, level: u8) -> Self {
        self.title = Some(title);
        self.heading_level = Some(level);
        self
    }
}

fn verbatim(span: &[Line<'_>]) -> String {
    span.iter().map(|l| l.text).collect::<Vec<_>>().join("\n")
}

/// ```lang or ~~~lang, three or more fence characters.
fn fence_open(text: &str) -> Option<(char, usize, &str)> {
    let trimmed = text.trim_start();
    for fence in ['`', '~'] {
        let width = trimmed.chars().take_while(|c| *c == fence).count();
        if width >= 3 {
            return Some((fence, width, trimmed[width..].trim()));
        }
    }
    None
}

fn fence_close(text: &str, fence: char, open_width: usize) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty()
        && trimmed.chars().all(|c| c == fence)
        && trimmed.chars().count() >= open_width
}

/// `#{1,6}` followed by a space (or nothing); returns level and title
/// with any closing `#` sequence stripped.
fn atx_heading(text: &str) -> Option<(u8, String)> {
    let trimmed = text.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    let title = rest.trim().trim_end_matches('#').trim_end();
    Some((level as u8, title.to_string()))
}

/// A line of only `=` (level 1) or only `-` (level 2).
fn setext_underline(text: &str) -> Option<u8> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().all(|c| c == '=') {
        return Some(1);
    }
    if trimmed.chars().all(|c| c == '-') {
        return Some(2);
    }
    None
}

/// Three or more of the same `*`/`-`/`_`, whitespace allowed between.
fn is_rule(text: &str) -> bool {
    let trimmed = text.trim();
    let mut marks = trimmed.chars().filter(|c| !c.is_whitespace());
    let Some(first) = marks.next() else {
        return false;
    };
    if !matches!(first, '*' | '-' | '_') {
        return false;
    }
    let rest: Vec<char> = marks.collect();
    rest.len() >= 2
        && rest.iter().all(|c| *c == first)
        && trimmed.chars().all(|c| c == first || c == ' ' || c == '\t')
}

fn is_quote(text: &str) -> bool {
    text.trim_start().starts_with('>')
}

/// `-`/`*`/`+` bullet or `1.`/`1)` ordered marker followed by a space.
fn list_marker(text: &str) -> Option<usize> {
    let trimmed = text.trim_start();
    let indent = text.len() - trimmed.len();
    if let Some(rest) = trimmed.strip_prefix(['-', '*', '+']) {
        if rest.starts_with(' ') || rest.starts_with('\t') {
            return Some(indent);
        }
        return None;
    }
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if (1..=9).contains(&digits) {
        let rest = &trimmed[digits..];
        if rest.starts_with('.') || rest.starts_with(')') {
            let after = &rest[1..];
            if after.starts_with(' ') || after.starts_with('\t') {
                return Some(indent);
            }
        }
    }
    None
}

/// Indented, non-blank, and not itself a new list item.
fn is_list_continuation(text: &str) -> bool {
    !text.trim().is_empty()
        && (text.starts_with(' ') || text.starts_with('\t'))
        && list_marker(text).is_none()
}

fn is_indented_code(text: &str) -> bool {
    (text.starts_with("    ") || text.starts_with('\t')) && !text.trim().is_empty()
}

fn at_block_start(lines: &[Line<'_>], i: usize) -> bool {
    i == 0 || lines[i - 1].text.trim().is_empty()
}

#[cfg(test)]
#[path = "markdown_tests.rs"]
mod tests;
