//! Fixed-window text chunking.
//!
//! Text is cut into windows of `size` characters, each starting
//! `size - overlap` characters after the previous one. Boundaries are plain
//! character offsets with no awareness of lines, tokens or syntax, so a
//! fragment may begin or end mid-identifier.

use std::ops::Range;

use crate::error::{ContextError, Result};

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between consecutive windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Validated chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    size: usize,
    overlap: usize,
}

impl ChunkerConfig {
    /// Create a config, rejecting `size == 0` and `overlap >= size`.
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(ContextError::Validation(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if overlap >= size {
            return Err(ContextError::Validation(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({size})"
            )));
        }
        Ok(Self { size, overlap })
    }

    /// Window size in characters.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Overlap in characters.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between consecutive window starts. Always at least 1.
    pub fn stride(&self) -> usize {
        self.size - self.overlap
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Splits text into overlapping fixed-size fragments.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedWindowChunker {
    config: ChunkerConfig,
}

impl FixedWindowChunker {
    /// Create a chunker from validated parameters.
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// The parameters this chunker uses.
    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    /// Character ranges of every window over `text`.
    ///
    /// Empty text yields no windows. The last window may be shorter than `size`.
    pub fn windows(&self, text: &str) -> Vec<Range<usize>> {
        let len = text.chars().count();
        let stride = self.config.stride();

        let mut windows = Vec::with_capacity(len.div_ceil(stride));
        let mut start = 0;
        while start < len {
            windows.push(start..(start + self.config.size).min(len));
            start += stride;
        }
        windows
    }

    /// Split `text` into fragments.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        // Byte offset of every char boundary, including the end of text.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();

        self.windows(text)
            .into_iter()
            .map(|w| text[boundaries[w.start]..boundaries[w.end]].to_string())
            .collect()
    }
}

/// Split `text` into windows of `size` characters overlapping by `overlap`.
pub fn chunk(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    let config = ChunkerConfig::new(size, overlap)?;
    Ok(FixedWindowChunker::new(config).chunk(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_basic_windows() {
        let chunks = chunk("abcdefghij", 4, 1).unwrap();
        assert_eq!(chunks, vec!["abcd", "defg", "ghij", "j"]);
    }

    #[test]
    fn test_no_overlap() {
        let chunks = chunk("abcdefgh", 4, 0).unwrap();
        assert_eq!(chunks, vec!["abcd", "efgh"]);
    }

    #[test]
    fn test_text_shorter_than_window() {
        let chunks = chunk("abc", 10, 2).unwrap();
        assert_eq!(chunks, vec!["abc"]);
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        assert!(chunk("", 10, 2).unwrap().is_empty());
    }

    #[test]
    fn test_overlap_not_smaller_than_size_is_rejected() {
        assert!(matches!(chunk("abc", 4, 4), Err(ContextError::Validation(_))));
        assert!(matches!(chunk("abc", 4, 9), Err(ContextError::Validation(_))));
        assert!(matches!(chunk("abc", 0, 0), Err(ContextError::Validation(_))));
    }

    #[test]
    fn test_multibyte_characters_are_not_split() {
        let text = "héllo wörld ✓✓✓";
        let chunks = chunk(text, 5, 2).unwrap();

        for c in &chunks {
            assert!(c.chars().count() <= 5);
        }
        assert_eq!(chunks[0], "héllo");
        assert_eq!(chunks[1], "lo wö");
        assert!(chunks.last().unwrap().ends_with('✓'));
    }

    #[test]
    fn test_windows_cover_text_and_overlap_exactly() {
        let text: String = (0..257u32).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let len = text.len();

        for (size, overlap) in [(1, 0), (7, 3), (10, 9), (64, 16), (300, 10)] {
            let chunker = FixedWindowChunker::new(ChunkerConfig::new(size, overlap).unwrap());
            let windows = chunker.windows(&text);
            let chunks = chunker.chunk(&text);
            assert_eq!(windows.len(), chunks.len());

            assert_eq!(windows[0].start, 0);
            assert_eq!(windows.last().unwrap().end, len);
            for pair in windows.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                assert_eq!(b.start - a.start, chunker.config().stride());
                assert!(b.start <= a.end, "gap between {a:?} and {b:?}");
                if a.end < len {
                    assert_eq!(a.len(), size);
                    assert_eq!(a.end - b.start, overlap);
                } else {
                    // Tail windows are clipped at end of text.
                    assert_eq!(b.end, len);
                }
            }

            for (w, c) in windows.iter().zip(&chunks) {
                assert_eq!(&text[w.clone()], c);
            }
        }
    }
}
