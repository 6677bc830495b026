//! Splitting extracted document elements into bounded generation inputs

use crate::config::ChunkingConfig;

use super::extractor::TextElement;

/// Text chunker working in characters (not bytes)
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Elements shorter than this are merged into the previous chunk
    min_input_length: usize,
    /// No chunk is longer than this
    max_input_length: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(min_input_length: usize, max_input_length: usize) -> Self {
        let max_input_length = max_input_length.max(1);
        Self {
            min_input_length: min_input_length.min(max_input_length),
            max_input_length,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.min_input_length, config.max_input_length)
    }

    pub fn max_input_length(&self) -> usize {
        self.max_input_length
    }

    /// Chunk elements in document order.
    ///
    /// - empty or missing text is skipped
    /// - short text is space-joined onto the last chunk when the result still
    ///   fits, otherwise it starts a new chunk
    /// - long text becomes its own chunk; text over the maximum is cut into
    ///   maximum-length slices followed by the remainder
    ///
    /// Only the last chunk is ever extended.
    pub fn chunk_elements(&self, elements: &[TextElement]) -> Vec<String> {
        let mut chunks: Vec<String> = Vec::new();
        // Character length of `chunks.last()`
        let mut last_len = 0usize;

        for element in elements {
            let Some(text) = element.text.as_deref() else {
                continue;
            };
            if text.is_empty() {
                continue;
            }

            let len = text.chars().count();

            if len < self.min_input_length {
                match chunks.last_mut() {
                    Some(last) if last_len + 1 + len <= self.max_input_length => {
                        last.push(' ');
                        last.push_str(text);
                        last_len += 1 + len;
                    }
                    _ => {
                        chunks.push(text.to_string());
                        last_len = len;
                    }
                }
                continue;
            }

            let mut rest = text;
            let mut rest_len = len;
            while rest_len > self.max_input_length {
                let split = rest
                    .char_indices()
                    .nth(self.max_input_length)
                    .map(|(idx, _)| idx)
                    .unwrap_or(rest.len());
                chunks.push(rest[..split].to_string());
                rest = &rest[split..];
                rest_len -= self.max_input_length;
            }
            chunks.push(rest.to_string());
            last_len = rest_len;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elements(texts: &[&str]) -> Vec<TextElement> {
        texts.iter().map(|t| TextElement::text(*t)).collect()
    }

    fn char_len(s: &str) -> usize {
        s.chars().count()
    }

    #[test]
    fn test_single_short_element() {
        let chunker = TextChunker::default();
        assert_eq!(chunker.chunk_elements(&elements(&["short"])), vec!["short"]);
    }

    #[test]
    fn test_medium_element_kept_whole() {
        let chunker = TextChunker::default();
        let text = "a".repeat(600);
        let chunks = chunker.chunk_elements(&elements(&[&text]));
        assert_eq!(chunks.len(), 1);
        assert_eq!(char_len(&chunks[0]), 600);
    }

    #[test]
    fn test_oversized_element_sliced() {
        let chunker = TextChunker::default();
        let text = "b".repeat(2000);
        let chunks = chunker.chunk_elements(&elements(&[&text]));
        assert_eq!(chunks.len(), 2);
        assert_eq!(char_len(&chunks[0]), 1096);
        assert_eq!(char_len(&chunks[1]), 904);
    }

    #[test]
    fn test_exact_multiple_of_max() {
        let chunker = TextChunker::default();
        let text = "c".repeat(2192);
        let chunks = chunker.chunk_elements(&elements(&[&text]));
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| char_len(c) == 1096));
    }

    #[test]
    fn test_short_elements_merge_with_space() {
        let chunker = TextChunker::default();
        let chunks = chunker.chunk_elements(&elements(&["Heading", "First line.", "Second line."]));
        assert_eq!(chunks, vec!["Heading First line. Second line."]);
    }

    #[test]
    fn test_merge_respects_max() {
        let chunker = TextChunker::new(500, 20);
        let chunks = chunker.chunk_elements(&elements(&["0123456789", "012345678", "x"]));
        // 10 + 1 + 9 = 20 fits, the next one would not
        assert_eq!(chunks, vec!["0123456789 012345678", "x"]);
    }

    #[test]
    fn test_long_element_never_merged_backwards() {
        let chunker = TextChunker::default();
        let long = "d".repeat(700);
        let chunks = chunker.chunk_elements(&elements(&["intro", &long, "tail"]));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "intro");
        // Later short text may join the most recent chunk
        assert_eq!(chunks[1], format!("{} tail", long));
    }

    #[test]
    fn test_remainder_not_joined_to_previous_chunk() {
        let chunker = TextChunker::default();
        let long = "e".repeat(1200);
        let chunks = chunker.chunk_elements(&elements(&["intro", &long]));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "intro");
        assert_eq!(char_len(&chunks[1]), 1096);
        assert_eq!(char_len(&chunks[2]), 104);
    }

    #[test]
    fn test_skips_empty_and_missing_text() {
        let chunker = TextChunker::default();
        let input = vec![
            TextElement::default(),
            TextElement::text(""),
            TextElement::text("kept"),
        ];
        assert_eq!(chunker.chunk_elements(&input), vec!["kept"]);
        assert!(chunker.chunk_elements(&[]).is_empty());
    }

    #[test]
    fn test_multibyte_text_split_on_char_boundaries() {
        let chunker = TextChunker::new(2, 4);
        let chunks = chunker.chunk_elements(&elements(&["éééééé"]));
        assert_eq!(chunks, vec!["éééé", "éé"]);
    }

    #[test]
    fn test_bounds_and_order_hold() {
        let chunker = TextChunker::default();
        let texts: Vec<String> = (0..40)
            .map(|i| format!("{}{}", i % 10, "z".repeat((i * 137) % 2500)))
            .collect();
        let input: Vec<TextElement> = texts.iter().map(|t| TextElement::text(t.as_str())).collect();

        let chunks = chunker.chunk_elements(&input);
        for chunk in &chunks {
            let len = char_len(chunk);
            assert!(len >= 1 && len <= 1096, "chunk length {} out of bounds", len);
        }

        // Removing the join spaces gives back the input text in order
        let joined: String = chunks.concat().replace(' ', "");
        let expected: String = texts.concat();
        assert_eq!(joined, expected);
    }
}
