//! Quote-aware CSV record boundaries.
//!
//! A record ends at a newline that is outside a double-quoted field. A `"`
//! opens a quoted field only at the start of a field; elsewhere it is an
//! ordinary byte, so `1,5" screen` is one unquoted value. Inside a quoted
//! field `""` is an escaped quote. The bytes of each record are never
//! rewritten.

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    #[default]
    FieldStart,
    Unquoted,
    Quoted,
    /// A `"` seen inside a quoted field: either an escape or the closing quote.
    QuoteInQuoted,
}

impl FieldState {
    /// Advance over `b`, returning `true` when it terminates a record.
    fn step(&mut self, b: u8) -> bool {
        use FieldState::*;
        match (*self, b) {
            (Quoted, b'"') => *self = QuoteInQuoted,
            (Quoted, _) => {}
            (QuoteInQuoted, b'"') => *self = Quoted,
            (FieldStart, b'"') => *self = Quoted,
            (_, b',') => *self = FieldStart,
            (_, b'\n') => {
                *self = FieldStart;
                return true;
            }
            _ => *self = Unquoted,
        }
        false
    }
}

/// Counts complete records across arbitrarily split byte chunks.
#[derive(Debug, Default, Clone)]
pub struct RecordScanner {
    state: FieldState,
    terminated: u64,
    pending: bool,
}

impl RecordScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the next chunk of the stream.
    pub fn feed(&mut self, chunk: &[u8]) {
        for &b in chunk {
            if self.state.step(b) {
                self.terminated += 1;
                self.pending = false;
            } else {
                self.pending = true;
            }
        }
    }

    /// Records seen so far, counting an unterminated trailing record.
    pub fn records(&self) -> u64 {
        self.terminated + u64::from(self.pending)
    }

    /// Records after the header.
    pub fn data_rows(&self) -> u64 {
        self.records().saturating_sub(1)
    }
}

/// Read one complete record, including its terminator, onto the end of `buf`.
///
/// Returns the number of bytes appended; zero means end of input. A quoted
/// field left open at end of input is returned as-is.
pub async fn read_record<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let start = buf.len();
    let mut state = FieldState::default();

    loop {
        let segment = buf.len();
        if reader.read_until(b'\n', buf).await? == 0 {
            break;
        }
        let mut ended = false;
        for &b in &buf[segment..] {
            ended = state.step(b);
        }
        if ended {
            break;
        }
    }

    Ok(buf.len() - start)
}
