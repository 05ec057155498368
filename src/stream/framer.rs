/// Splits decoded text into newline-terminated records.
///
/// Text after the last newline stays buffered and is prefixed to the next
/// fragment. Records are trimmed and blank ones are dropped.
#[derive(Debug, Default)]
pub struct RecordFramer {
    buffer: String,
}

impl RecordFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        self.buffer.push_str(fragment);

        let mut records = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line = self.buffer[..pos].trim().to_string();
            self.buffer.drain(..=pos);
            if !line.is_empty() {
                records.push(line);
            }
        }
        records
    }

    /// Ends the stream, returning the unterminated remainder as a final record.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = rest.trim();
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }

    pub fn buffered(&self) -> &str {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_complete_lines_in_order() {
        let mut framer = RecordFramer::new();
        assert_eq!(framer.push("a\nb\nc"), vec!["a", "b"]);
        assert_eq!(framer.buffered(), "c");
        assert_eq!(framer.push("d\n"), vec!["cd"]);
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn skips_blank_records_and_trims_crlf() {
        let mut framer = RecordFramer::new();
        assert_eq!(framer.push("one\r\n\n   \n two \n"), vec!["one", "two"]);
    }

    #[test]
    fn finish_returns_the_unterminated_tail() {
        let mut framer = RecordFramer::new();
        assert!(framer.push(r#"{"type":"chunk","content":"end"}"#).is_empty());
        assert_eq!(framer.finish().as_deref(), Some(r#"{"type":"chunk","content":"end"}"#));
        assert_eq!(framer.buffered(), "");
    }

    #[test]
    fn finish_ignores_trailing_whitespace() {
        let mut framer = RecordFramer::new();
        framer.push("x\n  \t");
        assert_eq!(framer.finish(), None);
    }
}
