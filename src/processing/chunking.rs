//! Separator-first character chunking with overlap.
//!
//! Text is cut on a separator (newline by default) and the fragments are packed greedily into
//! windows of at most `chunk_size` characters, re-joined with the separator. When a window is
//! emitted, fragments are released from its front until no more than `overlap` characters are
//! carried into the next window. Sizes count `char`s, so multi-byte text is measured the same
//! way it reads.
//!
//! A single fragment longer than `chunk_size` is emitted as-is. Nothing is truncated.

use super::types::{Chunk, ChunkingError, ChunkingOptions, Document};
use std::collections::VecDeque;

/// Split a document into ordered chunks tagged with the document identifier.
///
/// The document content is prefixed with its `[<id>]` header before splitting.
pub fn split(document: &Document, options: &ChunkingOptions) -> Result<Vec<Chunk>, ChunkingError> {
    let windows = split_text(
        &document.tagged_text(),
        options.chunk_size,
        options.overlap,
        &options.separator,
    )?;
    Ok(windows
        .into_iter()
        .map(|text| Chunk {
            text,
            source: document.id.clone(),
        })
        .collect())
}

/// Split a document set, preserving document order and per-document chunk order.
pub fn split_all(
    documents: &[Document],
    options: &ChunkingOptions,
) -> Result<Vec<Chunk>, ChunkingError> {
    let mut chunks = Vec::new();
    for document in documents {
        let produced = split(document, options)?;
        tracing::debug!(document = %document.id, chunks = produced.len(), "Document split");
        chunks.extend(produced);
    }
    Ok(chunks)
}

/// Split raw text into overlapping windows.
///
/// Returns an empty vector when the text is empty or contains only separators and whitespace.
pub fn split_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    separator: &str,
) -> Result<Vec<String>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if overlap > chunk_size {
        return Err(ChunkingError::OverlapTooLarge {
            chunk_size,
            overlap,
        });
    }
    if separator.is_empty() {
        return Err(ChunkingError::EmptySeparator);
    }

    let fragments: Vec<&str> = text
        .split(separator)
        .filter(|fragment| !fragment.is_empty())
        .collect();
    Ok(merge_fragments(&fragments, chunk_size, overlap, separator))
}

fn merge_fragments(
    fragments: &[&str],
    chunk_size: usize,
    overlap: usize,
    separator: &str,
) -> Vec<String> {
    let separator_len = char_len(separator);
    let mut windows = Vec::new();
    let mut current: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for fragment in fragments {
        let fragment_len = char_len(fragment);
        let joiner = |window: &VecDeque<&str>| if window.is_empty() { 0 } else { separator_len };

        if total + fragment_len + joiner(&current) > chunk_size {
            if total > chunk_size {
                tracing::warn!(
                    size = total,
                    chunk_size,
                    "Created a chunk larger than the configured chunk size"
                );
            }
            if !current.is_empty() {
                if let Some(window) = join_window(&current, separator) {
                    windows.push(window);
                }
                // Release leading fragments until the carried tail fits the overlap budget and
                // leaves room for the incoming fragment.
                while total > overlap
                    || (total > 0 && total + fragment_len + joiner(&current) > chunk_size)
                {
                    let Some(first) = current.pop_front() else {
                        break;
                    };
                    let released = char_len(first) + if current.is_empty() { 0 } else { separator_len };
                    total = total.saturating_sub(released);
                }
            }
        }

        let added = fragment_len + if current.is_empty() { 0 } else { separator_len };
        current.push_back(fragment);
        total += added;
    }

    if let Some(window) = join_window(&current, separator) {
        if total > chunk_size {
            tracing::warn!(
                size = total,
                chunk_size,
                "Created a chunk larger than the configured chunk size"
            );
        }
        windows.push(window);
    }

    windows
}

fn join_window(fragments: &VecDeque<&str>, separator: &str) -> Option<String> {
    if fragments.is_empty() {
        return None;
    }
    let joined = fragments
        .iter()
        .copied()
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(count: usize, width: usize) -> String {
        (0..count)
            .map(|idx| {
                let label = format!("line{idx:02}");
                format!("{label:-<width$}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn short_document_yields_single_chunk() {
        let document = Document::new("doc1.txt", "PeakSpan invests in healthcare startups.");
        let chunks = split(&document, &ChunkingOptions::default()).expect("chunks");
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].text,
            "[doc1.txt]\nPeakSpan invests in healthcare startups."
        );
        assert_eq!(chunks[0].source, "doc1.txt");
    }

    #[test]
    fn windows_respect_size_and_carry_overlap() {
        // Ten 9-char lines; each window fits three lines (9 + 1 + 9 + 1 + 9 = 29).
        let text = lines(10, 9);
        let chunks = split_text(&text, 30, 10, "\n").expect("chunks");

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 30, "oversized chunk: {chunk:?}");
        }
        // The last line of each window opens the next one.
        for pair in chunks.windows(2) {
            let tail = pair[0].lines().last().expect("tail line");
            assert!(pair[1].starts_with(tail), "{pair:?}");
        }
    }

    #[test]
    fn every_fragment_survives_splitting() {
        let text = lines(25, 17);
        let chunks = split_text(&text, 60, 20, "\n").expect("chunks");
        let joined = chunks.join("\n");
        for line in text.lines() {
            assert!(joined.contains(line), "missing {line}");
        }
        let total: usize = chunks.iter().map(|chunk| chunk.chars().count()).sum();
        assert!(total >= text.chars().count() - 24);
    }

    #[test]
    fn splitting_is_deterministic() {
        let text = lines(40, 23);
        let first = split_text(&text, 100, 30, "\n").expect("chunks");
        let second = split_text(&text, 100, 30, "\n").expect("chunks");
        assert_eq!(first, second);
    }

    #[test]
    fn oversized_fragment_is_kept_whole() {
        let long_line = "x".repeat(120);
        let text = format!("short\n{long_line}\ntail");
        let chunks = split_text(&text, 50, 0, "\n").expect("chunks");
        assert_eq!(chunks, vec!["short".to_string(), long_line, "tail".to_string()]);
    }

    #[test]
    fn whitespace_only_text_yields_nothing() {
        assert!(split_text("\n\n  \n", 10, 0, "\n").expect("chunks").is_empty());
        assert!(split_text("", 10, 0, "\n").expect("chunks").is_empty());
    }

    #[test]
    fn sizes_count_characters_not_bytes() {
        let text = "ééééé\nààààà";
        let chunks = split_text(text, 11, 0, "\n").expect("chunks");
        assert_eq!(chunks, vec!["ééééé\nààààà".to_string()]);
    }

    #[test]
    fn rejects_invalid_options() {
        assert!(matches!(
            split_text("abc", 0, 0, "\n"),
            Err(ChunkingError::InvalidChunkSize)
        ));
        assert!(matches!(
            split_text("abc", 10, 11, "\n"),
            Err(ChunkingError::OverlapTooLarge { .. })
        ));
        assert!(matches!(
            split_text("abc", 10, 0, ""),
            Err(ChunkingError::EmptySeparator)
        ));
    }

    #[test]
    fn split_all_preserves_document_order() {
        let documents = vec![
            Document::new("a.txt", "alpha"),
            Document::new("b.txt", "beta"),
        ];
        let chunks = split_all(&documents, &ChunkingOptions::default()).expect("chunks");
        let sources: Vec<_> = chunks.iter().map(|chunk| chunk.source.as_str()).collect();
        assert_eq!(sources, vec!["a.txt", "b.txt"]);
    }
}
