//! Splits a source file's text into `TextChunk`s at parser-chosen slice
//! lines. A pure function: same content and slice lines always produce the
//! same chunks, in the same order.

use canopy_core::TextChunkData;

/// Builds chunks from `content`, splitting at each line in `slice_lines`
/// (0-indexed, the line a new chunk begins on). Output line ranges are
/// 1-based and inclusive. Falls back to a single whole-file chunk if no
/// slice line survives bounds-filtering.
pub fn chunk(content: &str, slice_lines: &[usize]) -> Vec<TextChunkData> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = split_keep_line_endings(content);
    let total_lines = lines.len();
    if total_lines == 0 {
        return Vec::new();
    }

    let mut valid_starts: Vec<usize> = slice_lines
        .iter()
        .copied()
        .filter(|&line| line < total_lines)
        .collect();
    valid_starts.sort_unstable();
    valid_starts.dedup();

    if valid_starts.is_empty() {
        return vec![TextChunkData {
            text: lines.concat(),
            chunk_index: 0,
            start_line: 1,
            end_line: total_lines as u32,
        }];
    }

    let mut chunks = Vec::new();
    let mut chunk_index = 0u32;
    for (i, &start0) in valid_starts.iter().enumerate() {
        let end0 = valid_starts
            .get(i + 1)
            .map(|&next| next - 1)
            .unwrap_or(total_lines - 1);
        if end0 < start0 {
            continue;
        }
        let text = lines[start0..=end0].concat();
        chunks.push(TextChunkData {
            text,
            chunk_index,
            start_line: (start0 + 1) as u32,
            end_line: (end0 + 1) as u32,
        });
        chunk_index += 1;
    }
    chunks
}

/// Splits `content` into lines, keeping line terminators attached (so
/// concatenating a chunk's lines reproduces the original bytes exactly).
fn split_keep_line_endings(content: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let bytes = content.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' {
            lines.push(&content[start..=i]);
            start = i + 1;
        }
    }
    if start < content.len() {
        lines.push(&content[start..]);
    }
    lines
}

/// Builds the `@<start>-<end>` slug suffix for a chunk, following this
/// project's slug-format convention even for the whole-file fallback chunk.
pub fn chunk_slug_suffix(chunk: &TextChunkData) -> String {
    format!("{}@{}-{}", chunk.chunk_index, chunk.start_line, chunk.end_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_yields_no_chunks() {
        assert!(chunk("", &[0]).is_empty());
        assert!(chunk("   \n  \n", &[0]).is_empty());
    }

    #[test]
    fn single_slice_line_splits_into_two_chunks() {
        let content = "a\nb\nc\nd\n";
        let chunks = chunk(content, &[0, 2]);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 2);
        assert_eq!(chunks[0].text, "a\nb\n");
        assert_eq!(chunks[1].start_line, 3);
        assert_eq!(chunks[1].end_line, 4);
        assert_eq!(chunks[1].text, "c\nd\n");
    }

    #[test]
    fn duplicate_and_unsorted_slice_lines_are_normalized() {
        let content = "a\nb\nc\n";
        let chunks = chunk(content, &[2, 0, 0, 2]);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].chunk_index, 1);
    }

    #[test]
    fn out_of_range_slice_lines_are_dropped() {
        let content = "a\nb\n";
        let chunks = chunk(content, &[0, 50]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].end_line, 2);
    }

    #[test]
    fn all_out_of_range_falls_back_to_whole_file() {
        let content = "a\nb\nc\n";
        let chunks = chunk(content, &[50, 100]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 3);
        assert_eq!(chunks[0].text, content);
    }

    #[test]
    fn no_slice_lines_falls_back_to_whole_file() {
        let content = "only line\n";
        let chunks = chunk(content, &[]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 1);
    }

    #[test]
    fn slug_suffix_format() {
        let c = TextChunkData {
            text: "x".into(),
            chunk_index: 3,
            start_line: 10,
            end_line: 12,
        };
        assert_eq!(chunk_slug_suffix(&c), "3@10-12");
    }
}
