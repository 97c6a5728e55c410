use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::*;

/// Reads from a file.
///
/// This is a thin veneer over [`Generic`] that remembers the path for
/// diagnostics.
pub struct File(Generic<fs::File>, PathBuf);

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("File")
            .field(&self.0)
            .field(&self.1.display())
            .finish()
    }
}

impl File {
    /// Opens the given file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, io::Error> {
        let path = path.as_ref();
        Ok(File(Generic::new(fs::File::open(path)?, None),
                path.into()))
    }

    /// Returns the path this reader is reading from.
    pub fn path(&self) -> &Path {
        &self.1
    }
}

impl io::Read for File {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        self.0.read(buf)
    }
}

impl BufferedReader for File {
    fn buffer(&self) -> &[u8] {
        self.0.buffer()
    }

    fn data(&mut self, amount: usize) -> Result<&[u8], io::Error> {
        self.0.data(amount)
    }

    fn data_hard(&mut self, amount: usize) -> Result<&[u8], io::Error> {
        self.0.data_hard(amount)
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        self.0.consume(amount)
    }

    fn data_consume(&mut self, amount: usize) -> Result<&[u8], io::Error> {
        self.0.data_consume(amount)
    }

    fn data_consume_hard(&mut self, amount: usize)
                         -> Result<&[u8], io::Error> {
        self.0.data_consume_hard(amount)
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
