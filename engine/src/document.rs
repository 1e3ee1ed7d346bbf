//! The shared manuscript buffer.
//!
//! Exactly three writers exist: direct user edits, suggestion splices at a
//! caret position, and the streaming continuation's monotonic append. No
//! other component mutates the document.

/// The story manuscript.
#[derive(Debug, Default)]
pub struct DocumentContent {
    text: String,
}

impl DocumentContent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Direct user edit: replace the whole buffer.
    pub(crate) fn set(&mut self, text: String) {
        self.text = text;
    }

    /// Splice accepted suggestion text at a caret position (in chars).
    ///
    /// Offsets past the end clamp to an append.
    pub(crate) fn splice(&mut self, char_offset: usize, insert: &str) {
        let byte_offset = self
            .text
            .char_indices()
            .nth(char_offset)
            .map_or(self.text.len(), |(i, _)| i);
        self.text.insert_str(byte_offset, insert);
    }

    /// Append one streamed continuation chunk.
    ///
    /// On the first chunk of a stream, a single separating space is inserted
    /// when the document ends in a non-whitespace character and the chunk
    /// does not itself begin with whitespace or punctuation; this prevents
    /// word-fusion at the append boundary without ever doubling a space or
    /// detaching punctuation.
    pub(crate) fn append_chunk(&mut self, chunk: &str, first_chunk: bool) {
        if first_chunk && needs_boundary_space(&self.text, chunk) {
            self.text.push(' ');
        }
        self.text.push_str(chunk);
    }
}

fn needs_boundary_space(document: &str, chunk: &str) -> bool {
    let Some(last) = document.chars().next_back() else {
        return false;
    };
    if last.is_whitespace() {
        return false;
    }
    let Some(first) = chunk.chars().next() else {
        return false;
    };
    !(first.is_whitespace() || first.is_ascii_punctuation())
}
