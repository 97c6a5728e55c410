use std::cmp;
use std::fmt;
use std::io;
use std::io::{Error, ErrorKind};

use super::*;

/// Wraps an arbitrary `std::io::Read`er.
///
/// This is the usual bottom of a reader stack when the source is
/// neither a file nor an in-core buffer.
pub struct Generic<T: io::Read> {
    buffer: Vec<u8>,
    // The next unconsumed byte within `buffer`.  Data before the
    // cursor is kept until the next buffering operation so that
    // `consume` can hand out a slice that includes it.
    cursor: usize,
    reader: T,
    chunk_size: usize,
    // A saved error, returned once the buffer has drained.
    error: Option<io::Error>,
    eof: bool,
}

impl<T: io::Read> fmt::Debug for Generic<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Generic")
            .field("buffered", &(self.buffer.len() - self.cursor))
            .field("eof", &self.eof)
            .finish()
    }
}

impl<T: io::Read> Generic<T> {
    /// Instantiates a new generic reader.
    ///
    /// `chunk_size` is a hint for how much data to request from the
    /// source at a time; if `None`, a reasonable default is used.
    pub fn new(reader: T, chunk_size: Option<usize>) -> Self {
        Generic {
            buffer: Vec::new(),
            cursor: 0,
            reader,
            chunk_size: chunk_size.unwrap_or(DEFAULT_BUF_SIZE),
            error: None,
            eof: false,
        }
    }

    /// Returns a reference to the wrapped reader.
    pub fn reader_ref(&self) -> &T {
        &self.reader
    }

    /// Returns a mutable reference to the wrapped reader.
    pub fn reader_mut(&mut self) -> &mut T {
        &mut self.reader
    }

    /// Unwraps this layer, returning the wrapped reader.
    ///
    /// Any buffered data is lost.
    pub fn into_reader(self) -> T {
        self.reader
    }

    fn data_helper(&mut self, amount: usize, hard: bool, and_consume: bool)
                   -> Result<&[u8], io::Error> {
        // Drop data that was consumed before the last call returned.
        if self.cursor > 0 {
            self.buffer.drain(..self.cursor);
            self.cursor = 0;
        }

        while self.buffer.len() < amount && !self.eof && self.error.is_none() {
            let old_len = self.buffer.len();
            let read_size = cmp::max(self.chunk_size, amount - old_len);
            self.buffer.resize(old_len + read_size, 0);

            match self.reader.read(&mut self.buffer[old_len..]) {
                Ok(0) => {
                    self.buffer.truncate(old_len);
                    self.eof = true;
                }
                Ok(n) => {
                    self.buffer.truncate(old_len + n);
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {
                    self.buffer.truncate(old_len);
                }
                Err(e) => {
                    self.buffer.truncate(old_len);
                    self.error = Some(e);
                }
            }
        }

        if self.buffer.is_empty() {
            if let Some(e) = self.error.take() {
                return Err(e);
            }
        }

        if hard && self.buffer.len() < amount {
            return Err(Error::new(ErrorKind::UnexpectedEof,
                                  "unexpected EOF"));
        }

        if and_consume {
            self.cursor = cmp::min(amount, self.buffer.len());
        }

        Ok(&self.buffer[..])
    }
}

impl<T: io::Read> io::Read for Generic<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        buffered_reader_generic_read_impl(self, buf)
    }
}

impl<T: io::Read> BufferedReader for Generic<T> {
    fn buffer(&self) -> &[u8] {
        &self.buffer[self.cursor..]
    }

    fn data(&mut self, amount: usize) -> Result<&[u8], io::Error> {
        self.data_helper(amount, false, false)
    }

    fn data_hard(&mut self, amount: usize) -> Result<&[u8], io::Error> {
        self.data_helper(amount, true, false)
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        let unconsumed = self.buffer.len() - self.cursor;
        assert!(amount <= unconsumed,
                "consuming {} bytes, but only {} are buffered",
                amount, unconsumed);
        let start = self.cursor;
        self.cursor += amount;
        &self.buffer[start..]
    }

    fn data_consume(&mut self, amount: usize) -> Result<&[u8], io::Error> {
        self.data_helper(amount, false, true)
    }

    fn data_consume_hard(&mut self, amount: usize)
                         -> Result<&[u8], io::Error> {
        self.data_helper(amount, true, true)
    }

    fn get_mut(&mut self) -> Option<&mut dyn BufferedReader> {
        None
    }

    fn get_ref(&self) -> Option<&dyn BufferedReader> {
        None
    }

    fn into_inner<'a>(self: Box<Self>)
                      -> Option<Box<dyn BufferedReader + 'a>>
        where Self: 'a
    {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tiny_chunks() {
        let data: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let mut bio = Generic::new(data, Some(3));

        // data() must return at least the requested amount even when
        // it exceeds the chunk size.
        assert_eq!(&bio.data(10).unwrap()[..10], &data[..10]);

        // Repeated calls return the same prefix.
        let first = bio.data(10).unwrap().len();
        let second = bio.data(5).unwrap().len();
        assert_eq!(first, second);

        bio.consume(10);
        assert_eq!(&bio.data_hard(5).unwrap()[..5], &data[10..15]);
    }

    #[test]
    fn consume_includes_consumed_data() {
        let data: &[u8] = b"0123456789";
        let mut bio = Generic::new(data, None);

        bio.data(10).unwrap();
        let buffer = bio.consume(4);
        assert_eq!(&buffer[..4], b"0123");
        assert_eq!(bio.buffer(), b"456789");
    }
}
