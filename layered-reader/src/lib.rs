//! A `BufferedReader` is a super-powered `Read`er.
//!
//! Like the [`BufRead`] trait, the `BufferedReader` trait has an
//! internal buffer that is directly exposed to the user.  Unlike
//! [`BufRead`], the *user* controls how much data is buffered: a call
//! to [`BufferedReader::data`] guarantees that at least the requested
//! amount of data is available in the internal buffer (or the rest of
//! the input, if EOF intervenes).  This makes it possible to parse
//! data in place, and to look ahead arbitrarily far without consuming
//! anything.
//!
//! Because reading and consuming are separate operations, a parser can
//! get a chunk of data, inspect it, and then consume only what it
//! understood.  Speculative lookahead needs no extra bookkeeping: data
//! that was examined but not consumed simply stays in the buffer.
//!
//! `BufferedReader`s stack.  A layer that deals with framing (say, a
//! length-limited view of the input, or a decompressor) wraps the
//! reader below it and is itself a `BufferedReader`.  The trait
//! provides generic methods ([`BufferedReader::into_inner`],
//! [`BufferedReader::get_ref`], [`BufferedReader::get_mut`]) to walk
//! such a stack even through trait objects.
//!
//! The bottom of a stack is usually a [`File`], a [`Memory`] buffer,
//! or a [`Generic`] wrapping an arbitrary `std::io::Read`er.
//!
//! [`BufRead`]: std::io::BufRead

use std::cmp;
use std::fmt;
use std::io;
use std::io::{Error, ErrorKind};

mod generic;
mod memory;
mod file;
mod limitor;
mod decompress;

pub use self::generic::Generic;
pub use self::memory::Memory;
pub use self::file::File;
pub use self::limitor::Limitor;
pub use self::decompress::Deflate;
pub use self::decompress::Zlib;
pub use self::decompress::Bzip;

/// The default chunk size for reads from the underlying source.
pub(crate) const DEFAULT_BUF_SIZE: usize = 8 * 1024;

/// The generic `BufferedReader` interface.
pub trait BufferedReader: io::Read + fmt::Debug {
    /// Returns a reference to the internal buffer.
    ///
    /// This returns the same data as `self.data(0)`, but without
    /// mutably borrowing self.
    fn buffer(&self) -> &[u8];

    /// Ensures that the internal buffer has at least `amount` bytes
    /// of data, and returns it.
    ///
    /// The returned slice has *at least* `amount` bytes unless EOF has
    /// been reached or an error occurred, in which case the returned
    /// slice contains the rest of the input.  Errors are not
    /// discarded: a read error is saved and returned once the internal
    /// buffer has been drained.
    ///
    /// This function does not advance the cursor; use `consume` for
    /// that.  The internal buffer never shrinks behind the caller's
    /// back: once `data` has returned some bytes, subsequent calls
    /// return at least the same bytes until they are consumed.
    fn data(&mut self, amount: usize) -> Result<&[u8], io::Error>;

    /// Like `data()`, but returns an error if less than `amount` bytes
    /// are available.
    fn data_hard(&mut self, amount: usize) -> Result<&[u8], io::Error> {
        let result = self.data(amount);
        if let Ok(buffer) = result.as_ref() {
            if buffer.len() < amount {
                return Err(Error::new(ErrorKind::UnexpectedEof,
                                      "unexpected EOF"));
            }
        }
        result
    }

    /// Returns all of the data until EOF.  Like `data()`, this does
    /// not consume anything.
    ///
    /// This buffers the whole rest of the input; only use it when the
    /// amount of data is known to be limited.
    fn data_eof(&mut self) -> Result<&[u8], io::Error> {
        // Try with increasingly larger amounts until the read comes up
        // short.
        let mut s = DEFAULT_BUF_SIZE;
        while s < usize::MAX {
            let amount = self.data(s)?.len();
            if amount < s {
                s = amount;
                break;
            }
            s *= 2;
        }

        let buffer = self.data(s)?;
        assert_eq!(buffer.len(), s);
        Ok(buffer)
    }

    /// Consumes `amount` bytes of data.
    ///
    /// It is an error to consume data that has not been returned by
    /// `data()` or a related function.  The returned slice starts at
    /// the old cursor, i.e. it *includes* the consumed data, which
    /// stays valid until the reference goes out of scope.
    fn consume(&mut self, amount: usize) -> &[u8];

    /// Combines `data()` and `consume()`.
    ///
    /// If less than `amount` bytes are available, everything up to EOF
    /// is consumed.
    fn data_consume(&mut self, amount: usize)
                    -> Result<&[u8], io::Error> {
        let amount = cmp::min(amount, self.data(amount)?.len());

        let buffer = self.consume(amount);
        assert!(buffer.len() >= amount);
        Ok(buffer)
    }

    /// Combines `data_hard()` and `consume()`.
    fn data_consume_hard(&mut self, amount: usize)
                         -> Result<&[u8], io::Error> {
        let len = self.data_hard(amount)?.len();
        assert!(len >= amount);

        let buffer = self.consume(amount);
        assert!(buffer.len() >= amount);
        Ok(buffer)
    }

    /// Reads and consumes a big-endian 16-bit unsigned integer.
    fn read_be_u16(&mut self) -> Result<u16, io::Error> {
        let input = self.data_consume_hard(2)?;
        Ok(((input[0] as u16) << 8) | (input[1] as u16))
    }

    /// Reads and consumes a big-endian 32-bit unsigned integer.
    fn read_be_u32(&mut self) -> Result<u32, io::Error> {
        let input = self.data_consume_hard(4)?;
        Ok(((input[0] as u32) << 24) | ((input[1] as u32) << 16)
           | ((input[2] as u32) << 8) | (input[3] as u32))
    }

    /// Reads until either `terminal` is encountered or EOF.
    ///
    /// Returns either a slice terminating in `terminal`, or the rest
    /// of the data if EOF was encountered first.  Does not consume.
    fn read_to(&mut self, terminal: u8) -> Result<&[u8], io::Error> {
        let mut n = 128;
        let len;

        loop {
            let data = self.data(n)?;

            if let Some(newline)
                = data.iter().position(|c| *c == terminal)
            {
                len = newline + 1;
                break;
            } else if data.len() < n {
                // EOF.
                len = data.len();
                break;
            } else {
                n = cmp::max(2 * n, data.len() + 1024);
            }
        }

        Ok(&self.data(n)?[..len])
    }

    /// Like `data_consume_hard()`, but returns the data in a
    /// caller-owned buffer.
    fn steal(&mut self, amount: usize) -> Result<Vec<u8>, io::Error> {
        let mut data = self.data_consume_hard(amount)?;
        assert!(data.len() >= amount);
        if data.len() > amount {
            data = &data[..amount];
        }
        Ok(data.to_vec())
    }

    /// Like `steal()`, but steals all of the data up to EOF.
    fn steal_eof(&mut self) -> Result<Vec<u8>, io::Error> {
        let len = self.data_eof()?.len();
        self.steal(len)
    }

    /// Discards all of the data up to EOF, one chunk at a time.
    ///
    /// On success, returns whether at least one byte was discarded.
    fn drop_eof(&mut self) -> Result<bool, io::Error> {
        let mut at_least_one_byte = false;
        loop {
            let n = self.data_consume(DEFAULT_BUF_SIZE)?.len();
            at_least_one_byte |= n > 0;
            if n < DEFAULT_BUF_SIZE {
                // EOF.
                break;
            }
        }

        Ok(at_least_one_byte)
    }

    /// Returns a mutable reference to the inner `BufferedReader`, if
    /// any.
    ///
    /// Reading from the inner reader is a bad idea: this layer may
    /// have data buffered.  But walking the stack is useful.
    fn get_mut(&mut self) -> Option<&mut dyn BufferedReader>;

    /// Returns a reference to the inner `BufferedReader`, if any.
    fn get_ref(&self) -> Option<&dyn BufferedReader>;

    /// Destroys this layer and returns the underlying reader, if any.
    fn into_inner<'a>(self: Box<Self>)
                      -> Option<Box<dyn BufferedReader + 'a>>
        where Self: 'a;
}

/// A generic implementation of `std::io::Read::read` appropriate for
/// any `BufferedReader` implementation.
///
/// `io::Read` cannot be implemented in terms of itself here, because a
/// `BufferedReader` may hold data in its internal buffer that a plain
/// `read` on the source would skip.
pub fn buffered_reader_generic_read_impl<T: BufferedReader>
    (bio: &mut T, buf: &mut [u8]) -> Result<usize, io::Error>
{
    let inner = bio.data_consume(buf.len())?;
    let amount = cmp::min(buf.len(), inner.len());
    buf[..amount].copy_from_slice(&inner[..amount]);
    Ok(amount)
}

/// Make a `&mut BufferedReader` look like a `BufferedReader`.
///
/// This allows stacking a temporary layer (say, a [`Limitor`] framing
/// one object) on top of a reader without giving up ownership.
impl<'b, T: BufferedReader + ?Sized> BufferedReader for &'b mut T {
    fn buffer(&self) -> &[u8] {
        (**self).buffer()
    }

    fn data(&mut self, amount: usize) -> Result<&[u8], io::Error> {
        (**self).data(amount)
    }

    fn data_hard(&mut self, amount: usize) -> Result<&[u8], io::Error> {
        (**self).data_hard(amount)
    }

    fn data_eof(&mut self) -> Result<&[u8], io::Error> {
        (**self).data_eof()
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        (**self).consume(amount)
    }

    fn data_consume(&mut self, amount: usize) -> Result<&[u8], io::Error> {
        (**self).data_consume(amount)
    }

    fn data_consume_hard(&mut self, amount: usize)
                         -> Result<&[u8], io::Error> {
        (**self).data_consume_hard(amount)
    }

    fn read_be_u16(&mut self) -> Result<u16, io::Error> {
        (**self).read_be_u16()
    }

    fn read_be_u32(&mut self) -> Result<u32, io::Error> {
        (**self).read_be_u32()
    }

    fn read_to(&mut self, terminal: u8) -> Result<&[u8], io::Error> {
        (**self).read_to(terminal)
    }

    fn steal(&mut self, amount: usize) -> Result<Vec<u8>, io::Error> {
        (**self).steal(amount)
    }

    fn steal_eof(&mut self) -> Result<Vec<u8>, io::Error> {
        (**self).steal_eof()
    }

    fn drop_eof(&mut self) -> Result<bool, io::Error> {
        (**self).drop_eof()
    }

    fn get_mut(&mut self) -> Option<&mut dyn BufferedReader> {
        (**self).get_mut()
    }

    fn get_ref(&self) -> Option<&dyn BufferedReader> {
        (**self).get_ref()
    }

    fn into_inner<'c>(self: Box<Self>)
                      -> Option<Box<dyn BufferedReader + 'c>>
        where Self: 'c
    {
        None
    }
}

/// Make a `Box<dyn BufferedReader>` look like a `BufferedReader`.
impl<'a> BufferedReader for Box<dyn BufferedReader + 'a> {
    fn buffer(&self) -> &[u8] {
        self.as_ref().buffer()
    }

    fn data(&mut self, amount: usize) -> Result<&[u8], io::Error> {
        self.as_mut().data(amount)
    }

    fn data_hard(&mut self, amount: usize) -> Result<&[u8], io::Error> {
        self.as_mut().data_hard(amount)
    }

    fn data_eof(&mut self) -> Result<&[u8], io::Error> {
        self.as_mut().data_eof()
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        self.as_mut().consume(amount)
    }

    fn data_consume(&mut self, amount: usize) -> Result<&[u8], io::Error> {
        self.as_mut().data_consume(amount)
    }

    fn data_consume_hard(&mut self, amount: usize)
                         -> Result<&[u8], io::Error> {
        self.as_mut().data_consume_hard(amount)
    }

    fn read_be_u16(&mut self) -> Result<u16, io::Error> {
        self.as_mut().read_be_u16()
    }

    fn read_be_u32(&mut self) -> Result<u32, io::Error> {
        self.as_mut().read_be_u32()
    }

    fn read_to(&mut self, terminal: u8) -> Result<&[u8], io::Error> {
        self.as_mut().read_to(terminal)
    }

    fn steal(&mut self, amount: usize) -> Result<Vec<u8>, io::Error> {
        self.as_mut().steal(amount)
    }

    fn steal_eof(&mut self) -> Result<Vec<u8>, io::Error> {
        self.as_mut().steal_eof()
    }

    fn drop_eof(&mut self) -> Result<bool, io::Error> {
        self.as_mut().drop_eof()
    }

    fn get_mut(&mut self) -> Option<&mut dyn BufferedReader> {
        // Strip the outer box.
        self.as_mut().get_mut()
    }

    fn get_ref(&self) -> Option<&dyn BufferedReader> {
        // Strip the outer box.
        self.as_ref().get_ref()
    }

    fn into_inner<'b>(self: Box<Self>)
                      -> Option<Box<dyn BufferedReader + 'b>>
        where Self: 'b
    {
        // Strip the outer box.
        (*self).into_inner()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_data() -> Vec<u8> {
        // A few KB of predictable content, bigger than one internal
        // chunk.
        let mut data = Vec::new();
        for i in 0..10000u32 {
            data.extend_from_slice(format!("{:04}\n", i).as_bytes());
        }
        data
    }

    #[test]
    fn data_eof_drains_everything() {
        let data = test_data();

        {
            let mut bio = Memory::new(&data);
            let amount = bio.data_eof().unwrap().len();
            assert_eq!(amount, data.len());
            bio.consume(amount);
            assert_eq!(bio.data(1).unwrap().len(), 0);
        }

        // Try it again with a limitor.
        {
            let bio: Box<dyn BufferedReader> = Box::new(Memory::new(&data));
            let mut bio2 = Limitor::new(bio, (data.len() / 2) as u64);
            let amount = bio2.data_eof().unwrap().len();
            assert_eq!(amount, data.len() / 2);
            bio2.consume(amount);
            assert_eq!(bio2.data(1).unwrap().len(), 0);
        }
    }

    fn read_test_aux<T: BufferedReader>(mut bio: T, data: &[u8]) {
        let mut buffer = [0; 99];

        assert!(buffer.len() < data.len());

        let iters = (data.len() + buffer.len() - 1) / buffer.len();
        // Iterate beyond the number of required reads to check what
        // happens past the end of the input.
        for i in 1..iters + 2 {
            let data_start = (i - 1) * buffer.len();

            // Mix .data and .read calls.
            {
                let got = bio.data(buffer.len()).unwrap();
                if !got.is_empty() {
                    assert_eq!(got, &data[data_start..data_start + got.len()]);
                }
            }

            let got = bio.read(&mut buffer[..]).unwrap();
            if got > 0 {
                assert_eq!(&buffer[..got],
                           &data[data_start..data_start + got]);
            }

            if i > iters {
                assert_eq!(got, 0);
            } else if i == iters {
                assert!(0 < got && got <= buffer.len());
            } else {
                assert_eq!(got, buffer.len());
            }
        }
    }

    #[test]
    fn mixed_read_and_data() {
        let data = test_data();

        read_test_aux(Memory::new(&data), &data);
        read_test_aux(Generic::new(&data[..], None), &data);
        read_test_aux(Generic::new(&data[..], Some(11)), &data);
    }

    #[test]
    fn read_to_does_not_consume() {
        let orig = b"0123456789";
        let mut br = Memory::new(&orig[..]);

        assert_eq!(br.read_to(b'3').unwrap(), b"0123");
        assert_eq!(br.read_to(b'5').unwrap(), b"012345");
        assert_eq!(br.read_to(b'1').unwrap(), b"01");
        // Terminal not found: everything is returned.
        assert_eq!(br.read_to(b'A').unwrap(), &orig[..]);

        br.consume(3);
        assert_eq!(br.read_to(b'5').unwrap(), b"345");
    }
}
