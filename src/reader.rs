//! Record Reader
//!
//! Turns an input into a lazy sequence of raw `(station, temperature)`
//! records, one per line. Lines are split on the first delimiter and both
//! halves are forwarded untouched; deciding whether a record is usable is the
//! engine's job.

use std::io::BufRead;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub station: &'a [u8],
    pub temperature: &'a [u8],
}

impl<'a> Record<'a> {
    /// A line without the delimiter becomes a record with an empty
    /// temperature field.
    pub fn split(line: &'a [u8], delimiter: u8) -> Self {
        match line.iter().position(|&c| c == delimiter) {
            Some(idx) => Self {
                station: &line[..idx],
                temperature: &line[idx + 1..],
            },
            None => Self {
                station: line,
                temperature: &[],
            },
        }
    }
}

/// A finite, non-restartable sequence of records.
///
/// Records borrow from the source, so this is a lending interface rather
/// than an [`Iterator`]: each record is only valid until the next call.
pub trait RecordSource {
    /// `Ok(None)` once the input is exhausted. An `Err` means the underlying
    /// input could not be read and is fatal for the run.
    fn next_record(&mut self) -> Result<Option<Record<'_>>>;
}

impl<S: RecordSource + ?Sized> RecordSource for &mut S {
    fn next_record(&mut self) -> Result<Option<Record<'_>>> {
        (**self).next_record()
    }
}

/// Records over an in-memory buffer, e.g. a memory mapped file.
pub struct SliceRecords<'a> {
    buf: &'a [u8],
    delimiter: u8,
}

impl<'a> SliceRecords<'a> {
    pub fn new(buf: &'a [u8], delimiter: u8) -> Self {
        Self { buf, delimiter }
    }
}

impl<'a> Iterator for SliceRecords<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.is_empty() {
            return None;
        }
        let (line, rest) = match self.buf.iter().position(|&c| c == b'\n') {
            Some(idx) => (&self.buf[..idx], &self.buf[idx + 1..]),
            None => (self.buf, &[][..]),
        };
        self.buf = rest;
        Some(Record::split(line, self.delimiter))
    }
}

impl RecordSource for SliceRecords<'_> {
    fn next_record(&mut self) -> Result<Option<Record<'_>>> {
        Ok(self.next())
    }
}

/// Number of records [`SliceRecords`] yields for `buf`.
pub fn count_lines(buf: &[u8]) -> u64 {
    let newlines = buf.iter().filter(|&&c| c == b'\n').count() as u64;
    match buf.last() {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}

/// Records read line by line from any buffered reader. A single line buffer
/// is reused across records.
pub struct StreamRecords<R> {
    reader: R,
    line: Vec<u8>,
    delimiter: u8,
}

impl<R: BufRead> StreamRecords<R> {
    pub fn new(reader: R, delimiter: u8) -> Self {
        Self {
            reader,
            line: Vec::with_capacity(128),
            delimiter,
        }
    }
}

impl<R: BufRead> RecordSource for StreamRecords<R> {
    fn next_record(&mut self) -> Result<Option<Record<'_>>> {
        self.line.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.line)
            .map_err(Error::unreadable_stream)?;
        if read == 0 {
            return Ok(None);
        }
        let line = self.line.strip_suffix(b"\n").unwrap_or(&self.line[..]);
        Ok(Some(Record::split(line, self.delimiter)))
    }
}
