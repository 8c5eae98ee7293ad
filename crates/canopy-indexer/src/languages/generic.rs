//! Generic fallback parser for recognized-but-parser-less language keys
//! (config/doc/text formats). Slices at fixed character intervals rather
//! than parsing a grammar, and never emits entities, relationships, or
//! call-site references.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::parser::{LanguageParser, ParseEvent};

const CHUNK_SIZE: usize = 1000;
const CHUNK_OVERLAP: usize = 100;

pub struct GenericParser {
    language_key: String,
}

impl GenericParser {
    pub fn new(language_key: impl Into<String>) -> Self {
        GenericParser { language_key: language_key.into() }
    }
}

#[async_trait]
impl LanguageParser for GenericParser {
    fn language_key(&self) -> &'static str {
        // This parser is instantiated per language key at the call site;
        // the trait method exists for uniformity with tree-sitter parsers
        // but callers should prefer the stored `language_key` field.
        "generic"
    }

    async fn parse(&self, content: &str) -> anyhow::Result<Vec<ParseEvent>> {
        let _ = &self.language_key;
        Ok(vec![ParseEvent::SliceLines(slice_lines(content))])
    }
}

fn slice_lines(content: &str) -> Vec<usize> {
    if content.trim().is_empty() {
        return Vec::new();
    }
    if content.len() <= CHUNK_SIZE {
        return vec![0];
    }

    let mut lines = BTreeSet::new();
    lines.insert(0);
    let step = CHUNK_SIZE.saturating_sub(CHUNK_OVERLAP);
    if step == 0 {
        return lines.into_iter().collect();
    }

    let mut start_char = 0usize;
    while start_char < content.len() {
        if start_char > 0 {
            let boundary = floor_char_boundary(content, start_char.min(content.len()));
            let line_number = content[..boundary].matches('\n').count();
            lines.insert(line_number);
        }
        start_char += step;
    }
    lines.into_iter().collect()
}

/// Steps `index` backward until it lands on a UTF-8 char boundary, so
/// slicing `content[..index]` can never panic on multibyte input.
fn floor_char_boundary(content: &str, index: usize) -> usize {
    let mut idx = index.min(content.len());
    while idx > 0 && !content.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_content_yields_no_slice_lines() {
        let parser = GenericParser::new("text");
        let events = parser.parse("   \n").await.unwrap();
        assert_eq!(events, vec![ParseEvent::SliceLines(vec![])]);
    }

    #[tokio::test]
    async fn short_content_yields_a_single_slice_line() {
        let parser = GenericParser::new("yaml");
        let events = parser.parse("a: 1\nb: 2\n").await.unwrap();
        assert_eq!(events, vec![ParseEvent::SliceLines(vec![0])]);
    }

    #[tokio::test]
    async fn long_content_yields_multiple_slice_lines() {
        let parser = GenericParser::new("text");
        let content = "x\n".repeat(800);
        let events = parser.parse(&content).await.unwrap();
        match &events[0] {
            ParseEvent::SliceLines(lines) => assert!(lines.len() > 1),
            _ => panic!("expected slice lines"),
        }
    }

    #[tokio::test]
    async fn multibyte_content_past_a_chunk_boundary_does_not_panic() {
        let parser = GenericParser::new("text");
        // Each line is a handful of 3-byte UTF-8 codepoints, chosen so a
        // raw `step`-sized byte offset is likely to fall mid-codepoint.
        let content = "文字列のテスト行です\n".repeat(200);
        assert!(content.len() > CHUNK_SIZE);
        let events = parser.parse(&content).await.unwrap();
        match &events[0] {
            ParseEvent::SliceLines(lines) => assert!(lines.len() > 1),
            _ => panic!("expected slice lines"),
        }
    }
}
