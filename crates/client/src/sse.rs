//! Incremental SSE frame assembly
//!
//! The fallback stream arrives as HTTP chunks with no alignment to
//! event boundaries. This assembler buffers raw chunks, splits on line
//! boundaries (LF or CRLF), and emits complete frames at each blank
//! line, per the text/event-stream format.

/// One complete server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Concatenated `data:` lines, joined with `\n`.
    pub data: String,
    /// Last `event:` field seen in the frame, if any.
    pub event: Option<String>,
    /// Server-advised reconnect delay from a `retry:` field, ms.
    pub retry: Option<u64>,
}

#[derive(Debug, Default)]
pub struct SseAssembler {
    buffer: String,
    data_lines: Vec<String>,
    event: Option<String>,
    retry: Option<u64>,
    last_retry: Option<u64>,
}

impl SseAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of the response body; returns every frame it
    /// completed.
    pub fn push(&mut self, chunk: &str) -> Vec<SseFrame> {
        self.buffer.push_str(chunk);

        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches('\n').trim_end_matches('\r');
            if let Some(frame) = self.accept_line(line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn accept_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            if self.data_lines.is_empty() && self.event.is_none() {
                return None;
            }
            return Some(self.take_frame());
        }
        if line.starts_with(':') {
            // Comment / keepalive line
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data_lines.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "retry" => {
                if let Ok(ms) = value.trim().parse() {
                    self.retry = Some(ms);
                    self.last_retry = Some(ms);
                }
            }
            // id and unknown fields are ignored
            _ => {}
        }
        None
    }

    fn take_frame(&mut self) -> SseFrame {
        SseFrame {
            data: std::mem::take(&mut self.data_lines).join("\n"),
            event: self.event.take(),
            retry: self.retry.take(),
        }
    }

    /// Last `retry:` value observed anywhere in the stream, used to
    /// pace reconnects after the stream drops.
    pub fn retry_hint(&self) -> Option<u64> {
        self.last_retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_event_single_push() {
        let mut assembler = SseAssembler::new();
        let frames = assembler.push("data: {\"type\":\"pong\"}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"type\":\"pong\"}");
        assert_eq!(frames[0].event, None);
    }

    #[test]
    fn event_split_across_chunks() {
        let mut assembler = SseAssembler::new();
        assert!(assembler.push("data: {\"type\":").is_empty());
        assert!(assembler.push("\"text\",\"content\":\"hi\"}").is_empty());
        let frames = assembler.push("\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"type\":\"text\",\"content\":\"hi\"}");
    }

    #[test]
    fn multiple_events_in_one_chunk() {
        let mut assembler = SseAssembler::new();
        let frames = assembler.push("data: a\n\ndata: b\n\ndata: c\n\n");
        let datas: Vec<&str> = frames.iter().map(|f| f.data.as_str()).collect();
        assert_eq!(datas, ["a", "b", "c"]);
    }

    #[test]
    fn crlf_line_endings() {
        let mut assembler = SseAssembler::new();
        let frames = assembler.push("event: update\r\ndata: x\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("update"));
        assert_eq!(frames[0].data, "x");
    }

    #[test]
    fn multi_line_data_joined_with_newline() {
        let mut assembler = SseAssembler::new();
        let frames = assembler.push("data: first\ndata: second\n\n");
        assert_eq!(frames[0].data, "first\nsecond");
    }

    #[test]
    fn comments_and_blank_keepalives_emit_nothing() {
        let mut assembler = SseAssembler::new();
        assert!(assembler.push(": keepalive\n\n").is_empty());
        assert!(assembler.push("\n\n\n").is_empty());
    }

    #[test]
    fn retry_field_is_captured() {
        let mut assembler = SseAssembler::new();
        let frames = assembler.push("retry: 5000\ndata: x\n\n");
        assert_eq!(frames[0].retry, Some(5000));
        assert_eq!(assembler.retry_hint(), Some(5000));
    }

    #[test]
    fn retry_hint_survives_without_frame() {
        let mut assembler = SseAssembler::new();
        assert!(assembler.push("retry: 2500\n").is_empty());
        assert_eq!(assembler.retry_hint(), Some(2500));
    }

    #[test]
    fn unterminated_trailing_data_is_never_emitted() {
        // A frame is only complete at its blank line; data cut off by a
        // dropped stream stays buffered and is discarded with the
        // assembler.
        let mut assembler = SseAssembler::new();
        assert!(assembler.push("data: tail").is_empty());
        assert!(assembler.push("").is_empty());
        drop(assembler);
    }

    #[test]
    fn field_without_colon_is_ignored() {
        let mut assembler = SseAssembler::new();
        let frames = assembler.push("banana\ndata: y\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "y");
    }
}
