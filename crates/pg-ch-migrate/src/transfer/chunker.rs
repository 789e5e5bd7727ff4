//! Splits an intermediate file into self-contained CSV batches.

use bytes::Bytes;
use tokio::io::{self, AsyncBufRead};

use crate::core::record::read_record;

/// One insert payload: the header record followed by up to `batch_size`
/// data records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1-based position of the batch in the file.
    pub index: usize,

    /// Data records in the payload.
    pub rows: usize,

    /// Header plus records, byte-for-byte as read.
    pub payload: Bytes,
}

/// Reads records from `reader` and groups them into [`Batch`]es.
pub struct Chunker<R> {
    reader: R,
    header: Vec<u8>,
    batch_size: usize,
    next_index: usize,
    exhausted: bool,
}

impl<R> Chunker<R>
where
    R: AsyncBufRead + Unpin,
{
    /// Read and retain the header record. A zero-byte input has no header
    /// and yields no batches.
    pub async fn new(mut reader: R, batch_size: usize) -> io::Result<Self> {
        let mut header = Vec::new();
        let exhausted = read_record(&mut reader, &mut header).await? == 0;
        Ok(Self {
            reader,
            header,
            batch_size: batch_size.max(1),
            next_index: 1,
            exhausted,
        })
    }

    /// Index the next batch will carry.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Read the next batch; `None` once no data records remain.
    pub async fn next_batch(&mut self) -> io::Result<Option<Batch>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut payload = self.header.clone();
        let mut rows = 0;
        while rows < self.batch_size {
            if read_record(&mut self.reader, &mut payload).await? == 0 {
                self.exhausted = true;
                break;
            }
            rows += 1;
        }

        if rows == 0 {
            return Ok(None);
        }

        let batch = Batch {
            index: self.next_index,
            rows,
            payload: Bytes::from(payload),
        };
        self.next_index += 1;
        Ok(Some(batch))
    }
}
