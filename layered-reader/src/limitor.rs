use std::cmp;
use std::fmt;
use std::io;

use super::*;

/// Limits the amount of data that can be read from a reader.
///
/// A `Limitor` is a view of at most `limit` bytes of the underlying
/// reader; after that it reports EOF.  It is the standard way to frame
/// a length-delimited object so that the object's parser cannot
/// overrun it.
pub struct Limitor<T: BufferedReader> {
    reader: T,
    limit: u64,
}

impl<T: BufferedReader> fmt::Debug for Limitor<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Limitor")
            .field("limit", &self.limit)
            .field("reader", &self.reader)
            .finish()
    }
}

impl<T: BufferedReader> Limitor<T> {
    /// Instantiates a new limitor.
    pub fn new(reader: T, limit: u64) -> Self {
        Limitor {
            reader,
            limit,
        }
    }

    /// Returns the number of bytes this limitor will still yield.
    pub fn remaining(&self) -> u64 {
        self.limit
    }
}

impl<T: BufferedReader> io::Read for Limitor<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        buffered_reader_generic_read_impl(self, buf)
    }
}

impl<T: BufferedReader> BufferedReader for Limitor<T> {
    fn buffer(&self) -> &[u8] {
        let buffer = self.reader.buffer();
        &buffer[..cmp::min(buffer.len() as u64, self.limit) as usize]
    }

    fn data(&mut self, amount: usize) -> Result<&[u8], io::Error> {
        let amount = cmp::min(amount as u64, self.limit) as usize;
        let buffer = self.reader.data(amount)?;
        Ok(&buffer[..cmp::min(buffer.len() as u64, self.limit) as usize])
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        assert!(amount as u64 <= self.limit);
        self.limit -= amount as u64;
        let data = self.reader.consume(amount);
        let visible = cmp::min(data.len() as u64,
                               amount as u64 + self.limit) as usize;
        &data[..visible]
    }

    fn get_mut(&mut self) -> Option<&mut dyn BufferedReader> {
        Some(&mut self.reader)
    }

    fn get_ref(&self) -> Option<&dyn BufferedReader> {
        Some(&self.reader)
    }

    fn into_inner<'a>(self: Box<Self>)
                      -> Option<Box<dyn BufferedReader + 'a>>
        where Self: 'a
    {
        Some(Box::new(self.reader))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn enforces_limit() {
        let data = b"0123456789";
        let mut bio = Limitor::new(Memory::new(data), 6);

        assert_eq!(bio.data(100).unwrap(), b"012345");
        bio.consume(4);
        assert_eq!(bio.data(100).unwrap(), b"45");
        bio.consume(2);
        assert_eq!(bio.data(1).unwrap().len(), 0);

        // The rest is still available on the underlying reader.
        let inner = Box::new(bio).into_inner().unwrap();
        assert_eq!(inner.buffer(), b"6789");
    }
}
