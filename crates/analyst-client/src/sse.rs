/// Incremental decoder for `text/event-stream` bodies.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters split across network chunks decode intact. Only `data` fields
/// are kept; comments (`: ping`) and `event`/`id`/`retry` fields are ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning the payloads of every event it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(payload) = self.process_line(line) {
                events.push(payload);
            }
        }
        events
    }

    /// Flush an event left unterminated when the body ended.
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest);
            let line = line.strip_suffix('\r').unwrap_or(&line).to_string();
            if let Some(payload) = self.process_line(&line) {
                return Some(payload);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.data).join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::SseDecoder;

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: {\"type\":\"done\"}\n\n");
        assert_eq!(events, vec![r#"{"type":"done"}"#.to_string()]);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_crlf_and_split_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"type\":\"te").is_empty());
        assert!(decoder.feed(b"xt\",\"content\":\"a\"}\r\n").is_empty());
        let events = decoder.feed(b"\r\ndata: second\r\n\r\n");
        assert_eq!(
            events,
            vec![r#"{"type":"text","content":"a"}"#.to_string(), "second".to_string()]
        );
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: 销售额\n\n".as_bytes();
        let (head, tail) = bytes.split_at(8);
        assert!(decoder.feed(head).is_empty());
        assert_eq!(decoder.feed(tail), vec!["销售额".to_string()]);
    }

    #[test]
    fn test_comments_and_other_fields_are_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": ping\n\nevent: message\nid: 7\nretry: 1000\ndata: x\n\n");
        assert_eq!(events, vec!["x".to_string()]);
    }

    #[test]
    fn test_multiline_data_is_joined() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: line one\ndata:line two\n\n");
        assert_eq!(events, vec!["line one\nline two".to_string()]);
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: a\n").is_empty());
        assert!(decoder.feed(b"data: b").is_empty());
        assert_eq!(decoder.finish(), Some("a\nb".to_string()));
        assert!(decoder.finish().is_none());
    }
}
