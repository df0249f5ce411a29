//! Incremental reassembly of a newline-delimited JSON token stream.
//!
//! Bytes arrive in arbitrary slices. Each slice is decoded as UTF-8 with a
//! streaming decoder (a character split across two slices is held until its
//! remaining bytes arrive), appended to a pending line buffer, and every
//! complete line is parsed as one record. The trailing incomplete line stays
//! pending until a later slice terminates it.
//!
//! Lines that do not parse are skipped. End of the byte stream ends the
//! answer; a `done` record is only noted.

use std::time::Duration;

use bytes::Bytes;
use encoding_rs::{CoderResult, Decoder, UTF_8};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::debug;

use crate::error::{GenerationError, Result};

/// Line framing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    /// No buffered text; the next byte starts a new line.
    AwaitingLine,

    /// Part of a line is buffered, waiting for its terminating newline.
    HavePartialLine,
}

/// One record of the generation stream.
#[derive(Debug, Deserialize)]
struct GenerationRecord {
    #[serde(default)]
    response: Option<String>,

    #[serde(default)]
    done: Option<bool>,
}

/// Rebuilds the growing answer text from raw stream bytes.
pub struct StreamReassembler {
    decoder: Decoder,
    pending: String,
    accumulated: String,
    done: bool,
    skipped_lines: usize,
}

impl StreamReassembler {
    /// Create an empty reassembler.
    pub fn new() -> Self {
        Self {
            decoder: UTF_8.new_decoder_without_bom_handling(),
            pending: String::new(),
            accumulated: String::new(),
            done: false,
            skipped_lines: 0,
        }
    }

    /// Current framing state.
    pub fn state(&self) -> LineState {
        if self.pending.is_empty() {
            LineState::AwaitingLine
        } else {
            LineState::HavePartialLine
        }
    }

    /// Answer text accumulated so far.
    pub fn text(&self) -> &str {
        &self.accumulated
    }

    /// Whether a record with `done: true` has been seen.
    pub fn saw_done(&self) -> bool {
        self.done
    }

    /// Number of complete lines that failed to parse.
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    /// Feed the next slice of bytes.
    ///
    /// `on_update` receives the full accumulated text once per record that
    /// added text, in arrival order. Returns the number of such updates.
    pub fn push<F: FnMut(&str)>(&mut self, bytes: &[u8], mut on_update: F) -> usize {
        self.decode(bytes, false);
        self.drain_complete_lines(&mut on_update)
    }

    /// Signal end of stream and return the final text.
    ///
    /// Any bytes of an unfinished character are replaced with U+FFFD, and a
    /// final line without a trailing newline is parsed like any other.
    pub fn finish<F: FnMut(&str)>(mut self, mut on_update: F) -> String {
        self.decode(&[], true);
        self.drain_complete_lines(&mut on_update);

        let last = std::mem::take(&mut self.pending);
        if self.apply_line(&last) {
            on_update(&self.accumulated);
        }
        self.accumulated
    }

    fn decode(&mut self, mut bytes: &[u8], last: bool) {
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(bytes.len())
                .unwrap_or(bytes.len() * 3 + 4);
            self.pending.reserve(needed);

            let (result, read, _) = self.decoder.decode_to_string(bytes, &mut self.pending, last);
            bytes = &bytes[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }
    }

    fn drain_complete_lines<F: FnMut(&str)>(&mut self, on_update: &mut F) -> usize {
        let Some(last_newline) = self.pending.rfind('\n') else {
            return 0;
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        let mut updates = 0;
        for line in complete.lines() {
            if self.apply_line(line) {
                on_update(&self.accumulated);
                updates += 1;
            }
        }
        updates
    }

    /// Parse one line. Returns whether it added text.
    fn apply_line(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return false;
        }

        let record: GenerationRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                debug!("Skipping unparseable stream line ({e}): {line}");
                self.skipped_lines += 1;
                return false;
            }
        };

        if record.done == Some(true) {
            self.done = true;
        }

        match record.response {
            Some(text) if !text.is_empty() => {
                self.accumulated.push_str(&text);
                true
            }
            _ => false,
        }
    }
}

impl Default for StreamReassembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive `stream` to completion through a [`StreamReassembler`].
///
/// With `idle_timeout`, each individual read must produce data within that
/// duration or the call fails with [`GenerationError::Timeout`].
pub async fn reassemble<S, F>(
    mut stream: S,
    idle_timeout: Option<Duration>,
    mut on_update: F,
) -> Result<String>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
    F: FnMut(&str),
{
    let mut reassembler = StreamReassembler::new();

    loop {
        let next = match idle_timeout {
            Some(limit) => tokio::time::timeout(limit, stream.next())
                .await
                .map_err(|_| GenerationError::Timeout {
                    timeout_secs: limit.as_secs(),
                })?,
            None => stream.next().await,
        };

        match next {
            Some(chunk) => {
                reassembler.push(&chunk?, &mut on_update);
            }
            None => break,
        }
    }

    if !reassembler.saw_done() {
        debug!("Generation stream ended without a done record");
    }
    Ok(reassembler.finish(&mut on_update))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STREAM: &str = concat!(
        "{\"model\":\"llama3.1\",\"response\":\"Héllo\",\"done\":false}\n",
        "{\"model\":\"llama3.1\",\"response\":\", wörld\",\"done\":false}\n",
        "{\"model\":\"llama3.1\",\"response\":\" ✓ 🦀\",\"done\":false}\n",
        "{\"model\":\"llama3.1\",\"response\":\"\",\"done\":true}\n",
    );
    const EXPECTED: &str = "Héllo, wörld ✓ 🦀";

    fn feed(slices: &[&[u8]]) -> (String, Vec<String>) {
        let mut updates = Vec::new();
        let mut reassembler = StreamReassembler::new();
        for slice in slices {
            reassembler.push(slice, |text| updates.push(text.to_string()));
        }
        let text = reassembler.finish(|text| updates.push(text.to_string()));
        (text, updates)
    }

    #[test]
    fn test_whole_stream() {
        let (text, updates) = feed(&[STREAM.as_bytes()]);

        assert_eq!(text, EXPECTED);
        assert_eq!(
            updates,
            vec!["Héllo", "Héllo, wörld", "Héllo, wörld ✓ 🦀"]
        );
    }

    #[test]
    fn test_every_single_split_point() {
        let bytes = STREAM.as_bytes();
        for split in 0..=bytes.len() {
            let (text, updates) = feed(&[&bytes[..split], &bytes[split..]]);
            assert_eq!(text, EXPECTED, "split at byte {split}");
            assert_eq!(updates.last().map(String::as_str), Some(EXPECTED));
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let slices: Vec<&[u8]> = STREAM.as_bytes().chunks(1).collect();
        let (text, updates) = feed(&slices);

        assert_eq!(text, EXPECTED);
        assert_eq!(updates.len(), 3);
    }

    #[test]
    fn test_uneven_slices() {
        let bytes = STREAM.as_bytes();
        for size in [2, 3, 5, 7, 11, 64] {
            let slices: Vec<&[u8]> = bytes.chunks(size).collect();
            let (text, _) = feed(&slices);
            assert_eq!(text, EXPECTED, "slice size {size}");
        }
    }

    #[test]
    fn test_malformed_line_is_skipped() {
        let stream = concat!(
            "{\"response\":\"one \"}\n",
            "{\"response\": \"tw\n",
            "not json at all\n",
            "{\"response\":\"two\"}\n",
        );

        let mut reassembler = StreamReassembler::new();
        reassembler.push(stream.as_bytes(), |_| {});
        assert_eq!(reassembler.skipped_lines(), 2);
        assert_eq!(reassembler.text(), "one two");
        assert_eq!(reassembler.finish(|_| {}), "one two");
    }

    #[test]
    fn test_partial_line_is_held_back() {
        let mut reassembler = StreamReassembler::new();
        assert_eq!(reassembler.state(), LineState::AwaitingLine);

        let updates = reassembler.push(b"{\"response\":\"ab", |_| {});
        assert_eq!(updates, 0);
        assert_eq!(reassembler.state(), LineState::HavePartialLine);
        assert_eq!(reassembler.text(), "");

        let updates = reassembler.push(b"c\"}\n", |_| {});
        assert_eq!(updates, 1);
        assert_eq!(reassembler.state(), LineState::AwaitingLine);
        assert_eq!(reassembler.text(), "abc");
    }

    #[test]
    fn test_split_multibyte_character_is_not_corrupted() {
        let line = "{\"response\":\"🦀\"}\n".as_bytes();
        let crab_start = line.iter().position(|&b| b == 0xF0).unwrap();

        let mut reassembler = StreamReassembler::new();
        reassembler.push(&line[..crab_start + 2], |_| {});
        reassembler.push(&line[crab_start + 2..], |_| {});
        assert_eq!(reassembler.text(), "🦀");
    }

    #[test]
    fn test_done_is_informational() {
        let stream = concat!(
            "{\"response\":\"a\",\"done\":true}\n",
            "{\"response\":\"b\"}\n",
        );
        let mut reassembler = StreamReassembler::new();
        reassembler.push(stream.as_bytes(), |_| {});

        assert!(reassembler.saw_done());
        assert_eq!(reassembler.text(), "ab");
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let stream = "{\"response\":\"a\"}\r\n\r\n\n{\"response\":\"b\"}\r\n";
        let (text, updates) = feed(&[stream.as_bytes()]);

        assert_eq!(text, "ab");
        assert_eq!(updates.len(), 2);
    }

    #[test]
    fn test_unterminated_final_line_is_flushed() {
        let (text, updates) = feed(&[b"{\"response\":\"a\"}\n{\"response\":\"b\"}"]);
        assert_eq!(text, "ab");
        assert_eq!(updates, vec!["a", "ab"]);
    }

    #[tokio::test]
    async fn test_reassemble_stream() {
        let chunks: Vec<Result<Bytes>> = STREAM
            .as_bytes()
            .chunks(9)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();

        let mut seen = Vec::new();
        let text = reassemble(futures::stream::iter(chunks), None, |t| {
            seen.push(t.to_string())
        })
        .await
        .unwrap();

        assert_eq!(text, EXPECTED);
        assert_eq!(seen.last().map(String::as_str), Some(EXPECTED));
    }

    #[tokio::test]
    async fn test_reassemble_idle_timeout() {
        let stream = futures::stream::pending::<Result<Bytes>>();
        let err = reassemble(stream, Some(Duration::from_millis(20)), |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Timeout { .. }));
    }
}
