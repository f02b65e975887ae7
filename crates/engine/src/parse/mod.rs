// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File parsers: plain text and Markdown.
//!
//! Both produce an ordered sequence of Blocks covering the file; byte
//! offsets are contiguous modulo the whitespace a parser drops (blank
//! separator lines, trailing newlines). Invalid UTF-8 falls back to
//! lossy decoding with a warning flag; it never fails the file.

mod markdown;
mod text;

use silo_core::block::Block;
use silo_core::error::{ErrorKind, Fault};
use silo_core::file::extension_of;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    Text,
    Markdown,
}

/// Parser selection is by extension; anything not recognized as
/// Markdown is treated as plain text.
pub fn parser_for(path: &Path) -> ParserKind {
    match extension_of(path).as_str() {
        ".md" | ".markdown" => ParserKind::Markdown,
        _ => ParserKind::Text,
    }
}

#[derive(Debug)]
pub struct ParsedFile {
    pub blocks: Vec<Block>,
    /// True when the content was not valid UTF-8 and was decoded lossily.
    pub lossy: bool,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parser gave up on {path}: {detail}")]
    Invalid { path: PathBuf, detail: String },
}

impl Fault for ParseError {
    fn kind(&self) -> ErrorKind {
        match self {
            ParseError::Read { .. } => ErrorKind::FileIo,
            ParseError::Invalid { .. } => ErrorKind::Parse,
        }
    }
}

/// Read and parse one file into Blocks.
pub fn parse_path(path: &Path) -> Result<ParsedFile, ParseError> {
    let bytes = std::fs::read(path)
        .map_err(|source| ParseError::Read { path: path.to_path_buf(), source })?;
    let decoded = String::from_utf8_lossy(&bytes);
    let lossy = matches!(&decoded, std::borrow::Cow::Owned(_));

    let blocks = parse_content(parser_for(path), &decoded);
    if let Some(bad) = blocks.iter().find(|b| !b.is_well_formed()) {
        return Err(ParseError::Invalid {
            path: path.to_path_buf(),
            detail: format!("malformed block at ordinal {}", bad.ordinal),
        });
    }
    Ok(ParsedFile { blocks, lossy })
}

/// Parse already-decoded content. Ordinals are assigned here, strictly
/// increasing from zero.
pub fn parse_content(kind: ParserKind, content: &str) -> Vec<Block> {
    let mut blocks = match kind {
        ParserKind::Text => text::parse(content),
        ParserKind::Markdown => markdown::parse(content),
    };
    for (ordinal, block) in blocks.iter_mut().enumerate() {
        block.ordinal = ordinal;
    }
    blocks
}

/// One physical line: text without its terminator, with the byte span
/// and 1-based number it occupied in the source.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line<'a> {
    pub text: &'a str,
    pub start: usize,
    /// Exclusive end of `text` (the dropped terminator is not included).
    pub end: usize,
    pub number: usize,
}

pub(crate) fn split_lines(content: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for (idx, raw) in content.split_inclusive('\n').enumerate() {
        let start = offset;
        offset += raw.len();
        let text = raw.strip_suffix('\n').unwrap_or(raw);
        let text = text.strip_suffix('\r').unwrap_or(text);
        lines.push(Line { text, start, end: start + text.len(), number: idx + 1 });
    }
    lines
}
