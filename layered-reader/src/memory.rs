use std::cmp;
use std::fmt;
use std::io;

use super::*;

/// Reads from an in-core buffer.
///
/// The input is already in memory, so nothing is ever copied: `data`
/// returns slices of the original buffer.
pub struct Memory<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> fmt::Debug for Memory<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Memory")
            .field("total", &self.buffer.len())
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl<'a> Memory<'a> {
    /// Instantiates a new memory-based reader.
    pub fn new(buffer: &'a [u8]) -> Self {
        Memory {
            buffer,
            cursor: 0,
        }
    }

    /// Returns the number of bytes that have been consumed.
    pub fn total_out(&self) -> usize {
        self.cursor
    }
}

impl<'a> io::Read for Memory<'a> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        let amount = cmp::min(buf.len(), self.buffer.len() - self.cursor);
        buf[..amount].copy_from_slice(
            &self.buffer[self.cursor..self.cursor + amount]);
        self.cursor += amount;
        Ok(amount)
    }
}

impl<'a> BufferedReader for Memory<'a> {
    fn buffer(&self) -> &[u8] {
        &self.buffer[self.cursor..]
    }

    fn data(&mut self, _amount: usize) -> Result<&[u8], io::Error> {
        Ok(&self.buffer[self.cursor..])
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

    fn get_mut(&mut self) -> Option<&mut dyn BufferedReader> {
        None
    }

    fn get_ref(&self) -> Option<&dyn BufferedReader> {
        None
    }

    fn into_inner<'b>(self: Box<Self>)
                      -> Option<Box<dyn BufferedReader + 'b>>
        where Self: 'b
    {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_copy() {
        let data = b"0123456789";
        let mut bio = Memory::new(data);

        // Everything is always available.
        assert_eq!(bio.data(100).unwrap(), &data[..]);
        bio.consume(5);
        assert_eq!(bio.data_hard(5).unwrap(), &data[5..]);
        assert!(bio.data_hard(6).is_err());
    }
}
