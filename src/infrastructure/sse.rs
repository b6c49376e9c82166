//! Line-oriented `data:` record splitting shared by upstream stream parsing
//! and the event stream client.

/// Longest line held while waiting for its newline
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Payload carried by one `data:` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseData {
    /// The `[DONE]` sentinel
    Done,
    Payload(String),
    /// A line outgrew the limit; its bytes up to the next newline are dropped
    Overflow { limit: usize },
}

/// Buffers raw bytes and hands back complete `data:` lines.
///
/// Bytes are held until a newline arrives, so a record or a multi-byte
/// character split across network reads is reassembled before decoding.
/// Lines that are not `data:` lines (comments, blank separators, other
/// fields) are dropped.
#[derive(Debug)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
    /// Prefix of `pending` already known to hold no newline
    scanned: usize,
    limit: usize,
    discarding: bool,
}

impl Default for SseLineBuffer {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_BYTES)
    }
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            scanned: 0,
            limit,
            discarding: false,
        }
    }

    /// Feed a chunk and collect the data of every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseData> {
        self.pending.extend_from_slice(chunk);

        let mut records = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;

        while let Some(offset) = self.pending[from..].iter().position(|b| *b == b'\n') {
            let end = from + offset;
            if self.discarding {
                self.discarding = false;
            } else if let Some(data) = parse_line(&self.pending[start..end]) {
                records.push(data);
            }
            start = end + 1;
            from = start;
        }

        self.pending.drain(..start);

        if self.discarding {
            self.pending.clear();
        } else if self.pending.len() > self.limit {
            self.pending.clear();
            self.discarding = true;
            records.push(SseData::Overflow { limit: self.limit });
        }

        self.scanned = self.pending.len();
        records
    }

    /// Flush a final line that was not newline-terminated
    pub fn finish(&mut self) -> Option<SseData> {
        let rest = std::mem::take(&mut self.pending);
        self.scanned = 0;

        if std::mem::take(&mut self.discarding) {
            return None;
        }
        parse_line(&rest)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

fn parse_line(line: &[u8]) -> Option<SseData> {
    let decoded = String::from_utf8_lossy(line);
    let line = decoded.strip_suffix('\r').unwrap_or(&decoded);
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);

    if data.trim() == "[DONE]" {
        Some(SseData::Done)
    } else {
        Some(SseData::Payload(data.to_string()))
    }
}
