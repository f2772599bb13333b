// src/stream/parser.rs — Incremental decoder for the chat-stream wire format
//
// Newline-delimited. `data: ` lines carry `{"text": ..}`, `{"error": ..}` or
// the `[DONE]` sentinel. Any other non-blank line is raw fallback text from a
// non-conforming server and is passed through verbatim.

use serde::Deserialize;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Text(String),
    Error(String),
    Done,
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Text(_))
    }
}

#[derive(Deserialize)]
struct Frame {
    text: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to contain no newline.
    scanned: usize,
    terminated: bool,
    malformed: usize,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read chunk. Only complete lines are decoded; the tail is kept
    /// until the next chunk (or `finish`) completes it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.terminated {
            return events;
        }
        self.buffer.extend_from_slice(chunk);

        while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            self.scanned = 0;
            if let Some(event) = self.decode_line(&line[..line.len() - 1]) {
                let terminal = event.is_terminal();
                events.push(event);
                if terminal {
                    self.terminate();
                    return events;
                }
            }
        }
        self.scanned = self.buffer.len();
        events
    }

    /// End of data: decode whatever unterminated line is left.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.terminated {
            return Vec::new();
        }
        let rest = std::mem::take(&mut self.buffer);
        self.terminate();
        self.decode_line(&rest).into_iter().collect()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// `data:` lines that could not be decoded and were skipped.
    pub fn malformed_lines(&self) -> usize {
        self.malformed
    }

    fn terminate(&mut self) {
        self.terminated = true;
        self.buffer.clear();
        self.scanned = 0;
    }

    fn decode_line(&mut self, raw: &[u8]) -> Option<StreamEvent> {
        let decoded = String::from_utf8_lossy(raw);
        let line = decoded.strip_suffix('\r').unwrap_or(&decoded);

        let Some(data) = line.strip_prefix(DATA_PREFIX) else {
            if line.trim().is_empty() {
                return None;
            }
            return Some(StreamEvent::Text(format!("{line}\n")));
        };

        if data.trim() == DONE_SENTINEL {
            return Some(StreamEvent::Done);
        }

        match serde_json::from_str::<Frame>(data) {
            Ok(Frame {
                error: Some(message),
                ..
            }) if !message.is_empty() => Some(StreamEvent::Error(message)),
            Ok(Frame {
                text: Some(text), ..
            }) if !text.is_empty() => Some(StreamEvent::Text(text)),
            Ok(_) => {
                tracing::debug!("ignoring frame without text: {}", truncate(data, 120));
                None
            }
            Err(e) => {
                self.malformed += 1;
                tracing::debug!("skipping malformed frame ({e}): {}", truncate(data, 120));
                None
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(chunks: &[&[u8]]) -> Vec<StreamEvent> {
        let mut p = FrameParser::new();
        let mut out = Vec::new();
        for c in chunks {
            out.extend(p.push(c));
        }
        out.extend(p.finish());
        out
    }

    fn text_of(events: &[StreamEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_text_frames_then_done() {
        let events = run(&[
            b"data: {\"text\":\"Hel\"}\n",
            b"data: {\"text\":\"lo\"}\n",
            b"data: [DONE]\n",
        ]);
        assert_eq!(text_of(&events), "Hello");
        assert_eq!(events.last(), Some(&StreamEvent::Done));
    }

    #[test]
    fn test_json_split_across_chunks() {
        let events = run(&[b"data: {\"te", b"xt\":\"Hi\"}\n\ndata: [DO", b"NE]\n"]);
        assert_eq!(
            events,
            vec![StreamEvent::Text("Hi".into()), StreamEvent::Done]
        );
    }

    #[test]
    fn test_error_frame_is_terminal() {
        let mut p = FrameParser::new();
        let events = p.push(
            b"data: {\"text\":\"a\"}\ndata: {\"error\":\"quota exceeded\"}\ndata: {\"text\":\"b\"}\n",
        );
        assert_eq!(
            events,
            vec![
                StreamEvent::Text("a".into()),
                StreamEvent::Error("quota exceeded".into())
            ]
        );
        assert!(p.is_terminated());
        assert!(p.push(b"data: {\"text\":\"c\"}\n").is_empty());
        assert!(p.finish().is_empty());
    }

    #[test]
    fn test_empty_error_is_not_an_error() {
        let mut p = FrameParser::new();
        let events = p.push(b"data: {\"error\":\"\",\"text\":\"hi\"}\ndata: {\"error\":\"\"}\n");
        assert_eq!(events, vec![StreamEvent::Text("hi".into())]);
        assert!(!p.is_terminated());
    }

    #[test]
    fn test_nothing_after_done() {
        let events = run(&[b"data: {\"text\":\"x\"}\ndata: [DONE]\ndata: {\"text\":\"late\"}\n"]);
        assert_eq!(text_of(&events), "x");
    }

    #[test]
    fn test_raw_fallback_lines_pass_through() {
        let events = run(&[b"Internal Server Error\n\nplease retry\n"]);
        assert_eq!(text_of(&events), "Internal Server Error\nplease retry\n");
    }

    #[test]
    fn test_malformed_data_line_is_skipped() {
        let mut p = FrameParser::new();
        let mut events = p.push(b"data: {not json}\ndata: {\"text\":\"ok\"}\n");
        events.extend(p.finish());
        assert_eq!(events, vec![StreamEvent::Text("ok".into())]);
        assert_eq!(p.malformed_lines(), 1);
    }

    #[test]
    fn test_debug_frames_ignored() {
        let events = run(&[b"data: {\"debug\":\"Traceback...\"}\ndata: {\"text\":\"\"}\n"]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_crlf_lines() {
        let events = run(&[b"data: {\"text\":\"a\"}\r\ndata: [DONE]\r\n"]);
        assert_eq!(
            events,
            vec![StreamEvent::Text("a".into()), StreamEvent::Done]
        );
    }

    #[test]
    fn test_unterminated_tail_flushed_on_finish() {
        let events = run(&[b"data: {\"text\":\"tail\"}"]);
        assert_eq!(events, vec![StreamEvent::Text("tail".into())]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let bytes = "data: {\"text\":\"π≈3.14 🎓\"}\n".as_bytes();
        for split in 1..bytes.len() {
            let events = run(&[&bytes[..split], &bytes[split..]]);
            assert_eq!(text_of(&events), "π≈3.14 🎓", "split at {split}");
        }
    }

    #[test]
    fn test_chunk_boundary_invariance() {
        let wire: &[u8] = b"data: {\"text\":\"Reflecting...\"}\n\n\
data: {\"text\":\"The derivative of $x^2$ is \"}\n\n\
garbage line\n\
data: {\"text\":\"$2x$.\"}\n\n\
data: [DONE]\n\n";
        let whole = run(&[wire]);
        for size in 1..=wire.len() {
            let chunks: Vec<&[u8]> = wire.chunks(size).collect();
            assert_eq!(run(&chunks), whole, "chunk size {size}");
        }
        assert_eq!(
            text_of(&whole),
            "Reflecting...The derivative of $x^2$ is garbage line\n$2x$."
        );
    }
}
