use crate::error::DecodeAnomaly;

/// Incremental UTF-8 decoder for a body delivered in arbitrary byte slices.
///
/// A character split across two reads is held back until the rest of its
/// bytes arrive. Bytes that can never form a character are replaced with
/// U+FFFD and reported as an anomaly.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
    anomalies: Vec<DecodeAnomaly>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, input: &[u8]) -> String {
        self.pending.extend_from_slice(input);

        let mut out = String::new();
        let mut start = 0;
        while start < self.pending.len() {
            let rest = &self.pending[start..];
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    start = self.pending.len();
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.anomalies.push(DecodeAnomaly::InvalidSequence { bytes: len });
                            start += valid + len;
                        }
                        None => {
                            // incomplete character at the end, wait for more input
                            start += valid;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        out
    }

    /// Ends the stream. A dangling partial character is dropped.
    pub fn finish(&mut self) -> String {
        if !self.pending.is_empty() {
            self.anomalies.push(DecodeAnomaly::TruncatedTail { bytes: self.pending.len() });
            self.pending.clear();
        }
        String::new()
    }

    pub fn pending_bytes(&self) -> usize {
        self.pending.len()
    }

    pub fn drain_anomalies(&mut self) -> Vec<DecodeAnomaly> {
        std::mem::take(&mut self.anomalies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_characters_split_across_reads() {
        let text = "héllo → 世界 🎉";
        let bytes = text.as_bytes();

        for split in 0..=bytes.len() {
            let mut decoder = Utf8StreamDecoder::new();
            let mut out = decoder.decode(&bytes[..split]);
            out.push_str(&decoder.decode(&bytes[split..]));
            out.push_str(&decoder.finish());
            assert_eq!(out, text, "split at {}", split);
            assert!(decoder.drain_anomalies().is_empty());
        }
    }

    #[test]
    fn holds_back_a_partial_character() {
        let mut decoder = Utf8StreamDecoder::new();
        let emoji = "🎉".as_bytes();

        assert_eq!(decoder.decode(&emoji[..1]), "");
        assert_eq!(decoder.decode(&emoji[1..3]), "");
        assert_eq!(decoder.pending_bytes(), 3);
        assert_eq!(decoder.decode(&emoji[3..]), "🎉");
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn finish_drops_an_incomplete_tail() {
        let mut decoder = Utf8StreamDecoder::new();
        let mut input = b"ok".to_vec();
        input.extend_from_slice(&"世".as_bytes()[..2]);

        assert_eq!(decoder.decode(&input), "ok");
        assert_eq!(decoder.finish(), "");
        assert_eq!(decoder.drain_anomalies(), vec![DecodeAnomaly::TruncatedTail { bytes: 2 }]);
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn replaces_invalid_bytes_and_keeps_going() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
        assert_eq!(decoder.drain_anomalies(), vec![DecodeAnomaly::InvalidSequence { bytes: 1 }]);
    }
}
