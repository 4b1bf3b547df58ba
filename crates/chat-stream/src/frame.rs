//! Incremental decoder for event-stream frames
//!
//! The response body arrives in chunks that don't respect frame or even
//! UTF-8 boundaries. [`FrameDecoder`] buffers whatever is incomplete and
//! hands back only whole frames, in arrival order, exactly once.
//!
//! Frame grammar (blank-line terminated):
//!
//! ```text
//! event: message
//! data: {"token":"Hi"}
//!
//! ```

use crate::constants::wire;

/// One decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Value of the `event:` line, or `"message"` when absent
    pub event_type: String,
    /// `data:` lines joined with `\n`
    pub payload: String,
}

/// Reassembles frames from arbitrarily split chunks
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Text received but not yet terminated by a blank line
    buffer: String,
    /// Trailing bytes of an incomplete UTF-8 sequence
    partial_utf8: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a text chunk, returning every frame it completes
    pub fn feed(&mut self, chunk: &str) -> Vec<Frame> {
        // CR is dropped so CRLF and LF framing decode the same, even when
        // the pair is split across chunks.
        self.buffer.extend(chunk.chars().filter(|c| *c != '\r'));
        self.drain_frames()
    }

    /// Feed raw bytes, carrying incomplete UTF-8 sequences to the next call
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.partial_utf8.extend_from_slice(bytes);
        let pending = std::mem::take(&mut self.partial_utf8);

        let mut text = String::with_capacity(pending.len());
        let mut rest = pending.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // valid_up_to guarantees this prefix is UTF-8
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(bad) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[bad..];
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more bytes
                            self.partial_utf8 = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        self.feed(&text)
    }

    /// Text buffered towards the next frame
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Discard anything buffered
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.partial_utf8.clear();
    }

    fn drain_frames(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(end) = self.buffer.find("\n\n") {
            let block: String = self.buffer.drain(..end + 2).collect();
            if let Some(frame) = parse_block(&block[..end]) {
                frames.push(frame);
            }
        }
        frames
    }
}

/// Parse one blank-line-delimited block. Blocks with no `data:` are dropped.
fn parse_block(block: &str) -> Option<Frame> {
    let mut event_type: Option<String> = None;
    let mut data: Option<String> = None;

    for line in block.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event_type = Some(value.to_string()),
            "data" => match data.as_mut() {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(value);
                }
                None => data = Some(value.to_string()),
            },
            _ => {}
        }
    }

    let Some(payload) = data else {
        if !block.trim().is_empty() {
            log::debug!("Dropping frame without data: {:?}", block);
        }
        return None;
    };

    Some(Frame {
        event_type: event_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| wire::DEFAULT_EVENT.to_string()),
        payload,
    })
}
