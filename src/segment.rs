//! Incremental sentence segmentation of the streamed token buffer.
//!
//! Completed sentences are peeled off for speech dispatch as soon as
//! the buffer crosses a boundary; a boundary is terminal punctuation
//! followed by whitespace, so decimals like `3.14` survive streaming.
//! An open `<tool_call>` span takes precedence over segmentation:
//! nothing at or past the marker is ever offered for speech.

use crate::tools::parse::TOOL_CALL_OPEN;

/// Splits a rolling stream of tokens into speakable sentences.
#[derive(Debug)]
pub struct StreamSegmenter {
    buffer: String,
    tool_span_open: bool,
    first_flushed: bool,
    eager_first_clause: bool,
}

impl StreamSegmenter {
    /// `eager_first_clause` additionally splits the first chunk of the
    /// turn on a comma, so speech starts before the first sentence ends.
    pub fn new(eager_first_clause: bool) -> Self {
        Self {
            buffer: String::new(),
            tool_span_open: false,
            first_flushed: false,
            eager_first_clause,
        }
    }

    /// Append one token and return the sentences completed by it, in
    /// reading order. Returns nothing while a tool-call span is open.
    pub fn push(&mut self, token: &str) -> Vec<String> {
        if self.tool_span_open {
            return Vec::new();
        }
        self.buffer.push_str(token);

        if let Some(idx) = self.buffer.find(TOOL_CALL_OPEN) {
            self.tool_span_open = true;
            self.buffer.truncate(idx);
        }

        self.drain_sentences()
    }

    /// Whether a tool-call marker has been seen this round.
    pub fn tool_span_open(&self) -> bool {
        self.tool_span_open
    }

    /// Take whatever speakable text remains (trailing unterminated
    /// sentence, or the fragment preceding a tool-call marker). A
    /// trailing prefix of the tool-call marker is held back: a stream
    /// that stopped mid-`<tool_call` must not have the stub spoken.
    pub fn take_remainder(&mut self) -> Option<String> {
        let mut kept = self.buffer.as_str();
        if !self.tool_span_open
            && let Some(start) = partial_marker_start(kept)
        {
            kept = &kept[..start];
        }
        let text = kept.trim().to_owned();
        self.buffer.clear();
        if text.is_empty() { None } else { Some(text) }
    }

    /// Re-arm segmentation for a tool-round continuation stream.
    pub fn continue_round(&mut self) {
        self.tool_span_open = false;
    }

    fn drain_sentences(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(cut) = self.next_boundary() {
            let sentence = self.buffer[..cut].trim().to_owned();
            self.buffer.drain(..cut);
            if !sentence.is_empty() {
                self.first_flushed = true;
                out.push(sentence);
            }
        }
        out
    }

    /// Byte index just past the next sentence boundary, if any.
    fn next_boundary(&self) -> Option<usize> {
        let eager = self.eager_first_clause && !self.first_flushed;
        let mut iter = self.buffer.char_indices().peekable();
        while let Some((i, c)) = iter.next() {
            let terminal = matches!(c, '.' | '!' | '?') || (eager && c == ',');
            if !terminal {
                continue;
            }
            // Mid-stream the buffer end is not end-of-stream: the next
            // token may extend this span, so require the whitespace.
            if let Some(&(_, next)) = iter.peek()
                && next.is_whitespace()
            {
                return Some(i + c.len_utf8());
            }
        }
        None
    }
}

/// Start of a trailing proper prefix of `<tool_call>`, if the text
/// ends in one.
fn partial_marker_start(text: &str) -> Option<usize> {
    for len in (1..TOOL_CALL_OPEN.len()).rev() {
        if text.ends_with(&TOOL_CALL_OPEN[..len]) {
            return Some(text.len() - len);
        }
    }
    None
}
