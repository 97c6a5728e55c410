//! Partial body length encoding for streamed packet bodies.

use std::fmt;
use std::io::{self, Write};

use crate::packet::BodyLength;
use crate::serialize::writer::{Stack, Stackable};
use crate::serialize::Serialize;
use crate::Error;
use crate::Result;

/// The default chunk size.
const DEFAULT_CHUNK_SIZE: usize = 4096;

/// The smallest chunk the writer emits when more chunks follow.
///
/// RFC 4880, section 4.2.2.4: the first partial length must be at
/// least 512 octets.  We apply that to every non-final chunk.
const MIN_CHUNK_SIZE: usize = 512;

/// Emits a packet body using partial length encoding.
///
/// The caller writes the packet's CTB, then pushes this filter: it
/// buffers up to one chunk and emits full chunks with partial length
/// headers.  On finalization the remainder goes out with a definite
/// length, so a body that fits into a single chunk is framed with a
/// definite length and no partial chunks at all.
pub struct PartialBodyFilter<'a, C> {
    inner: Option<Stack<'a, C>>,
    cookie: C,
    buffer: Vec<u8>,
    chunk_size: usize,
    // Whether a partial chunk has been emitted; after that, the
    // packet cannot fall back to a plain definite length.
    streamed: bool,
}

impl<'a, C: 'a + fmt::Debug> PartialBodyFilter<'a, C> {
    /// Makes a partial body filter with the default chunk size.
    pub fn new(inner: Stack<'a, C>, cookie: C) -> Stack<'a, C> {
        Self::with_chunk_size(inner, cookie, DEFAULT_CHUNK_SIZE)
            .expect("the default chunk size is valid")
    }

    /// Makes a partial body filter with the given chunk size, which
    /// must be a power of two not smaller than 512.
    pub fn with_chunk_size(inner: Stack<'a, C>, cookie: C,
                           chunk_size: usize) -> Result<Stack<'a, C>> {
        if !chunk_size.is_power_of_two()
            || chunk_size < MIN_CHUNK_SIZE
            || chunk_size > 1 << 30
        {
            return Err(Error::InvalidArgument(format!(
                "invalid chunk size {}", chunk_size)).into());
        }
        Ok(Box::new(PartialBodyFilter {
            inner: Some(inner),
            cookie,
            buffer: Vec::with_capacity(chunk_size),
            chunk_size,
            streamed: false,
        }))
    }

    // Writes out all full chunks, keeping at most one chunk buffered.
    fn drain(&mut self) -> io::Result<()> {
        let inner = match self.inner.as_mut() {
            Some(inner) => inner,
            None => return Err(io::Error::new(
                io::ErrorKind::BrokenPipe, "writer is closed")),
        };

        let mut offset = 0;
        while self.buffer.len() - offset > self.chunk_size {
            BodyLength::Partial(self.chunk_size as u32)
                .serialize(inner)
                .map_err(|e| io::Error::new(io::ErrorKind::Other,
                                            e.to_string()))?;
            inner.write_all(
                &self.buffer[offset..offset + self.chunk_size])?;
            offset += self.chunk_size;
            self.streamed = true;
        }
        self.buffer.drain(..offset);
        Ok(())
    }

    // Emits the remaining data with a definite length.
    fn finish(&mut self) -> Result<()> {
        self.drain()?;
        let inner = self.inner.as_mut().ok_or_else(
            || Error::InvalidOperation("writer is closed".into()))?;

        // What remains fits one definite length: either the tail of a
        // chunked body, or the whole body of a short packet.
        BodyLength::Full(self.buffer.len() as u32).serialize(inner)?;
        inner.write_all(&self.buffer)?;
        self.buffer.clear();
        Ok(())
    }
}

impl<'a, C> fmt::Debug for PartialBodyFilter<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PartialBodyFilter")
            .field("inner", &self.inner)
            .field("buffered", &self.buffer.len())
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

impl<'a, C: 'a + fmt::Debug> Write for PartialBodyFilter<'a, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.drain()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Data is held back until a chunk fills up or the filter is
        // finalized; only pass the flush down.
        match self.inner.as_mut() {
            Some(inner) => inner.flush(),
            None => Ok(()),
        }
    }
}

impl<'a, C: 'a + fmt::Debug> Stackable<'a, C> for PartialBodyFilter<'a, C> {
    fn into_inner(mut self: Box<Self>) -> Result<Option<Stack<'a, C>>> {
        self.finish()?;
        Ok(self.inner.take())
    }

    fn pop(&mut self) -> Result<Option<Stack<'a, C>>> {
        self.finish()?;
        Ok(self.inner.take())
    }

    fn mount(&mut self, new: Stack<'a, C>) {
        self.inner = Some(new);
    }

    fn inner_ref(&self) -> Option<&dyn Stackable<'a, C>> {
        self.inner.as_ref().map(|r| r as &dyn Stackable<'a, C>)
    }

    fn inner_mut(&mut self) -> Option<&mut dyn Stackable<'a, C>> {
        self.inner.as_mut().map(|r| r as &mut dyn Stackable<'a, C>)
    }

    fn cookie_set(&mut self, cookie: C) -> C {
        std::mem::replace(&mut self.cookie, cookie)
    }

    fn cookie_ref(&self) -> &C {
        &self.cookie
    }

    fn cookie_mut(&mut self) -> &mut C {
        &mut self.cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::writer::Generic;

    fn run(chunk_size: usize, total: usize) -> Vec<u8> {
        let mut o = Vec::new();
        {
            let sink = Generic::new(&mut o, ());
            let mut f = PartialBodyFilter::with_chunk_size(
                sink, (), chunk_size).unwrap();
            let data = vec![0xaau8; total];
            f.write_all(&data).unwrap();
            Box::new(f).into_inner().unwrap();
        }
        o
    }

    #[test]
    fn short_bodies_use_definite_lengths() {
        // 100 octets: a one-octet length plus the data.
        let o = run(512, 100);
        assert_eq!(o.len(), 1 + 100);
        assert_eq!(o[0], 100);
    }

    #[test]
    fn long_bodies_are_chunked() {
        // 1197 = 512 + 512 + 173.
        let o = run(512, 1197);
        assert_eq!(o[0], 224 + 9);
        assert_eq!(&o[1 + 512..1 + 512 + 1], &[224 + 9]);
        let tail = &o[2 * (1 + 512)..];
        assert_eq!(tail[0], 173);
        assert_eq!(tail.len(), 1 + 173);
    }

    #[test]
    fn exact_multiple_ends_with_a_full_chunk() {
        // 1024 = 512 + 512; the second chunk is the definite tail.
        let o = run(512, 1024);
        assert_eq!(o[0], 224 + 9);
        let tail = &o[1 + 512..];
        // Definite two-octet length of 512: 0xc1 0x40.
        assert_eq!(&tail[..2], &[0xc1, 0x40]);
        assert_eq!(tail.len(), 2 + 512);
    }

    #[test]
    fn rejects_bad_chunk_sizes() {
        let sink = Generic::new(Vec::new(), ());
        assert!(PartialBodyFilter::with_chunk_size(sink, (), 100)
                .is_err());
        let sink = Generic::new(Vec::new(), ());
        assert!(PartialBodyFilter::with_chunk_size(sink, (), 256)
                .is_err());
    }
}
