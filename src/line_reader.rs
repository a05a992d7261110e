//! Turns the raw bytes drained from the device into newline-delimited lines.
//!
//! Reads are non-blocking, so a line can arrive split across several polls.
//! Bytes after the last newline are held until the rest shows up.

/// Accumulates bytes and hands out complete, trimmed lines.
#[derive(Debug, Default)]
pub struct LineReader {
    pending: Vec<u8>,
    dropped: usize,
}

impl LineReader {
    /// Creates an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends freshly read bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Number of bytes received but not yet handed out as a line.
    pub fn bytes_available(&self) -> usize {
        self.pending.len()
    }

    /// Pops the next complete line, without its terminator and surrounding
    /// whitespace. Undecodable bytes are dropped from the line.
    pub fn read_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=end).collect();
        Some(self.decode(&raw[..end]))
    }

    /// Hands out whatever is left without a terminator, if anything.
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        let line = self.decode(&raw);
        Some(line).filter(|l| !l.is_empty())
    }

    /// Total count of bytes dropped because they were not valid UTF-8.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn decode(&mut self, raw: &[u8]) -> String {
        let (text, dropped) = decode_ignoring_errors(raw);
        self.dropped += dropped;
        text.trim().to_owned()
    }
}

/// Decodes UTF-8, skipping invalid sequences instead of replacing them.
/// Returns the text and the number of bytes skipped.
pub fn decode_ignoring_errors(mut bytes: &[u8]) -> (String, usize) {
    let mut out = String::with_capacity(bytes.len());
    let mut dropped = 0;
    loop {
        match std::str::from_utf8(bytes) {
            Ok(s) => {
                out.push_str(s);
                return (out, dropped);
            }
            Err(e) => {
                let (valid, after) = bytes.split_at(e.valid_up_to());
                // `valid` is checked by `from_utf8` above
                out.push_str(&String::from_utf8_lossy(valid));
                let skip = e.error_len().unwrap_or(after.len());
                dropped += skip;
                bytes = &after[skip..];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_complete_lines() {
        let mut r = LineReader::new();
        r.extend(b"noise\nANGLE:42.3\n");
        assert_eq!(r.read_line().as_deref(), Some("noise"));
        assert_eq!(r.read_line().as_deref(), Some("ANGLE:42.3"));
        assert_eq!(r.read_line(), None);
        assert_eq!(r.bytes_available(), 0);
    }

    #[test]
    fn holds_partial_lines_across_reads() {
        let mut r = LineReader::new();
        r.extend(b"ANG");
        assert_eq!(r.read_line(), None);
        assert_eq!(r.bytes_available(), 3);
        r.extend(b"LE:1");
        r.extend(b"0.5\r\n12");
        assert_eq!(r.read_line().as_deref(), Some("ANGLE:10.5"));
        assert_eq!(r.read_line(), None);
        assert_eq!(r.take_remainder().as_deref(), Some("12"));
        assert_eq!(r.take_remainder(), None);
    }

    #[test]
    fn blank_lines_survive() {
        let mut r = LineReader::new();
        r.extend(b"\n  \n");
        assert_eq!(r.read_line().as_deref(), Some(""));
        assert_eq!(r.read_line().as_deref(), Some(""));
    }

    #[test]
    fn drops_invalid_utf8() {
        let mut r = LineReader::new();
        r.extend(b"\xff\xfe12.5\xc3\n");
        assert_eq!(r.read_line().as_deref(), Some("12.5"));
        assert_eq!(r.dropped(), 3);
    }

    #[test]
    fn decode_keeps_multibyte_chars() {
        let (s, dropped) = decode_ignoring_errors("45.0°".as_bytes());
        assert_eq!(s, "45.0°");
        assert_eq!(dropped, 0);
    }
}
