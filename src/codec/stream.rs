use std::io::{self, Read};

use crate::errors::DbError;
use crate::value::Document;

use super::state::malformed;
use super::{ReaderSettings, decode_document_with};

/// Iterates a byte stream of concatenated binary documents, e.g. a dump file.
///
/// A clean end of input between documents ends the iteration; a partial length prefix or
/// body is a `MalformedStream` error, after which the stream yields nothing more.
pub struct DocumentStream<R> {
    reader: R,
    settings: ReaderSettings,
    buf: Vec<u8>,
    failed: bool,
}

impl<R: Read> DocumentStream<R> {
    pub fn new(reader: R) -> Self {
        Self::with_settings(reader, ReaderSettings::default())
    }

    pub fn with_settings(reader: R, settings: ReaderSettings) -> Self {
        Self { reader, settings, buf: Vec::with_capacity(4096), failed: false }
    }

    fn read_prefix(&mut self) -> Result<Option<[u8; 4]>, DbError> {
        let mut len_buf = [0u8; 4];
        let mut filled = 0;
        while filled < 4 {
            match self.reader.read(&mut len_buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(malformed("truncated length prefix at end of stream")),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Some(len_buf))
    }

    fn next_document(&mut self) -> Result<Option<Document>, DbError> {
        let Some(len_buf) = self.read_prefix()? else {
            return Ok(None);
        };
        let len = i32::from_le_bytes(len_buf);
        let len = usize::try_from(len).map_err(|_| malformed(format!("invalid document length {len}")))?;
        if len < 5 || len > self.settings.max_document_size {
            return Err(malformed(format!("invalid document length {len}")));
        }
        self.buf.clear();
        self.buf.extend_from_slice(&len_buf);
        self.buf.resize(len, 0);
        self.reader.read_exact(&mut self.buf[4..]).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => malformed("truncated document at end of stream"),
            _ => e.into(),
        })?;
        decode_document_with(&self.buf, self.settings).map(Some)
    }
}

impl<R: Read> Iterator for DocumentStream<R> {
    type Item = Result<Document, DbError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_document() {
            Ok(doc) => doc.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
