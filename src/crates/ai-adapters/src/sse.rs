//! Incremental decoder for the gateway's `text/event-stream` body.
//!
//! Frames are delimited by a blank line. Within a frame, `event:` sets the
//! event name and every `data:` line is appended to the payload with no
//! separator.

use log::trace;

/// Event name used when a frame carries no `event:` line.
pub const DEFAULT_EVENT_NAME: &str = "message";

const FRAME_DELIMITER: &str = "\n\n";

/// One decoded `(event, data)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: String,
    pub data: String,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }
}

/// Streaming frame decoder that handles chunks split at arbitrary byte
/// boundaries, including inside a UTF-8 sequence or a delimiter.
///
/// Feed raw bytes via [`feed`](FrameDecoder::feed); call
/// [`finish`](FrameDecoder::finish) once the transport reports end of input
/// to flush a final frame that arrived without a trailing blank line.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
    /// Tail of an incomplete UTF-8 sequence from the previous chunk.
    pending_bytes: Vec<u8>,
    /// Offset up to which `buffer` is known to hold no delimiter.
    scanned: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: String::with_capacity(1024),
            pending_bytes: Vec::new(),
            scanned: 0,
        }
    }

    /// Decode a chunk and return every frame completed by it, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.decode_chunk(chunk);

        let mut frames = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.buffer[self.scanned..].find(FRAME_DELIMITER) {
            let delimiter_pos = self.scanned + offset;
            if let Some(frame) = parse_frame(&self.buffer[consumed..delimiter_pos]) {
                frames.push(frame);
            }
            consumed = delimiter_pos + FRAME_DELIMITER.len();
            self.scanned = consumed;
        }
        if consumed > 0 {
            self.buffer.drain(..consumed);
        }

        self.scanned = self.unscanned_tail_start();
        frames
    }

    /// Flush whatever is left in the buffer at end of input.
    pub fn finish(&mut self) -> Vec<Frame> {
        if !self.pending_bytes.is_empty() {
            let tail = std::mem::take(&mut self.pending_bytes);
            self.append_normalized(&String::from_utf8_lossy(&tail));
        }
        self.scanned = 0;

        let mut rest = std::mem::take(&mut self.buffer);
        if rest.ends_with('\r') {
            rest.pop();
        }
        if !rest.trim().is_empty() {
            trace!("Flushing {} buffered bytes at end of stream", rest.len());
        }
        rest.split(FRAME_DELIMITER).filter_map(parse_frame).collect()
    }

    /// A trailing '\n' may be the first half of the next delimiter.
    fn unscanned_tail_start(&self) -> usize {
        if self.buffer.ends_with('\n') {
            self.buffer.len() - 1
        } else {
            self.buffer.len()
        }
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() + self.pending_bytes.len()
    }

    fn decode_chunk(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.pending_bytes);
        bytes.extend_from_slice(chunk);

        let mut text = String::with_capacity(bytes.len());
        let mut start = 0;
        while start < bytes.len() {
            match std::str::from_utf8(&bytes[start..]) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&bytes[start..valid_end]));
                    match e.error_len() {
                        Some(invalid_len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + invalid_len;
                        }
                        None => {
                            // Sequence continues in the next chunk.
                            self.pending_bytes = bytes[valid_end..].to_vec();
                            break;
                        }
                    }
                }
            }
        }

        self.append_normalized(&text);
    }

    /// Append freshly decoded text with CRLF folded to LF. Only the new text
    /// is rewritten, plus a '\r' left at the end of the previous chunk.
    fn append_normalized(&mut self, text: &str) {
        if text.starts_with('\n') && self.buffer.ends_with('\r') {
            self.buffer.pop();
            self.scanned = self.scanned.min(self.unscanned_tail_start());
        }
        if text.contains("\r\n") {
            self.buffer.push_str(&text.replace("\r\n", "\n"));
        } else {
            self.buffer.push_str(text);
        }
    }
}

fn parse_frame(block: &str) -> Option<Frame> {
    let mut event: Option<String> = None;
    let mut data = String::new();
    let mut saw_data = false;

    for line in block.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            let name = name.trim();
            if !name.is_empty() {
                event = Some(name.to_string());
            }
        } else if let Some(payload) = line.strip_prefix("data:") {
            // Only the single conventional space after the colon is framing.
            data.push_str(payload.strip_prefix(' ').unwrap_or(payload));
            saw_data = true;
        }
    }

    // Comment-only and keep-alive blocks carry no payload.
    if !saw_data {
        return None;
    }

    Some(Frame {
        event: event.unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string()),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELTA_FRAME: &str =
        "event: chat.response.delta\ndata: {\"model\":\"m\",\"delta\":{\"text\":\"x\"}}\n\n";

    fn decode_in_chunks(input: &str, chunk_size: usize) -> Vec<Frame> {
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        for chunk in input.as_bytes().chunks(chunk_size) {
            frames.extend(decoder.feed(chunk));
        }
        frames.extend(decoder.finish());
        frames
    }

    #[test]
    fn decodes_single_frame() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(DELTA_FRAME.as_bytes());
        assert_eq!(
            frames,
            vec![Frame::new(
                "chat.response.delta",
                "{\"model\":\"m\",\"delta\":{\"text\":\"x\"}}"
            )]
        );
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn missing_event_line_defaults_to_message() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b"data: {\"a\":1}\n\n");
        assert_eq!(frames, vec![Frame::new(DEFAULT_EVENT_NAME, "{\"a\":1}")]);
    }

    #[test]
    fn data_lines_are_concatenated_without_separator() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b"event: consensus\ndata: {\"text\":\ndata: \"joined\"}\n\n");
        assert_eq!(frames, vec![Frame::new("consensus", "{\"text\":\"joined\"}")]);
    }

    #[test]
    fn whitespace_at_data_line_boundaries_is_kept() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(
            b"event: chat.response.delta\ndata: {\"model\":\"m\",\"delta\":{\"text\":\"hello \ndata: world\"}}\n\n",
        );
        assert_eq!(
            frames,
            vec![Frame::new(
                "chat.response.delta",
                "{\"model\":\"m\",\"delta\":{\"text\":\"hello world\"}}"
            )]
        );

        let frames = decoder.feed(b"data:  {\"text\":\" indented\"}\n\n");
        assert_eq!(frames[0].data, " {\"text\":\" indented\"}");
    }

    #[test]
    fn crlf_split_between_chunks_still_delimits() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"event: consensus\r").is_empty());
        assert!(decoder.feed(b"\ndata: {\"text\":\"ok\"}\r\n\r").is_empty());
        let frames = decoder.feed(b"\ndata: {\"text\":\"next\"}\r\n\r\n");
        assert_eq!(
            frames,
            vec![
                Frame::new("consensus", "{\"text\":\"ok\"}"),
                Frame::new(DEFAULT_EVENT_NAME, "{\"text\":\"next\"}"),
            ]
        );
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn large_frame_fed_byte_by_byte_is_decoded_once() {
        let text = "x".repeat(64 * 1024);
        let input = format!("event: consensus\ndata: {{\"text\":\"{}\"}}\n\n", text);
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        for chunk in input.as_bytes().chunks(1) {
            frames.extend(decoder.feed(chunk));
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data.len(), text.len() + 11);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn every_chunk_boundary_yields_the_same_frames() {
        let input = format!(
            "event: chat.response.created\ndata: {{\"model\":\"a\"}}\n\n{}event: chat.response.completed\ndata: {{\"model\":\"a\"}}\n\n",
            DELTA_FRAME
        );
        let expected = decode_in_chunks(&input, input.len());
        assert_eq!(expected.len(), 3);
        for chunk_size in 1..input.len() {
            assert_eq!(
                decode_in_chunks(&input, chunk_size),
                expected,
                "chunk size {}",
                chunk_size
            );
        }
    }

    #[test]
    fn delimiter_split_across_chunks() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: {\"a\":1}\n").is_empty());
        let frames = decoder.feed(b"\ndata: {\"b\":2}\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].data, "{\"b\":2}");
    }

    #[test]
    fn trailing_frame_without_delimiter_is_flushed_on_finish() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(
            b"event: chat.response.delta\ndata: {\"model\":\"m\",\"delta\":{\"text\":\"x\"}}",
        );
        assert!(frames.is_empty());
        let flushed = decoder.finish();
        assert_eq!(
            flushed,
            vec![Frame::new(
                "chat.response.delta",
                "{\"model\":\"m\",\"delta\":{\"text\":\"x\"}}"
            )]
        );
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn multibyte_characters_survive_chunk_splits() {
        let input = "event: chat.response.delta\ndata: {\"model\":\"m\",\"delta\":{\"text\":\"héllo 世界\"}}\n\n";
        for chunk_size in 1..8 {
            let frames = decode_in_chunks(input, chunk_size);
            assert_eq!(frames.len(), 1);
            assert!(frames[0].data.contains("héllo 世界"));
        }
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b"event: consensus\r\ndata: {\"text\":\"ok\"}\r\n\r\n");
        assert_eq!(frames, vec![Frame::new("consensus", "{\"text\":\"ok\"}")]);
    }

    #[test]
    fn comment_and_empty_blocks_are_skipped() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b": keep-alive\n\n\n\nid: 7\ndata: {\"ok\":true}\n\n");
        assert_eq!(frames, vec![Frame::new(DEFAULT_EVENT_NAME, "{\"ok\":true}")]);
    }
}
