//! Stackable writers.
//!
//! The writer stack is the push-mode dual of the reader stack: each
//! layer transforms the bytes written to it and pushes them to the
//! layer below.  [`Stackable::into_inner`] finalizes a layer and pops
//! it; closing a whole stack finalizes every layer in LIFO order.

use std::fmt;
use std::io::{self, Write};

use crate::crypto::symmetric;
use crate::types::SymmetricAlgorithm;
use crate::Error;
use crate::Result;

/// A boxed stack of writers.
pub type Stack<'a, C> = Box<dyn Stackable<'a, C> + 'a>;

/// A writer layer.
///
/// Every layer carries a cookie of type `C`; the streaming code uses
/// it to recognize layers when (un)winding the stack.
pub trait Stackable<'a, C>: Write + fmt::Debug {
    /// Finalizes this layer and returns the underlying writer.
    ///
    /// A layer that buffers or has framing to finish does so here.
    fn into_inner(self: Box<Self>) -> Result<Option<Stack<'a, C>>>;

    /// Removes this layer from the stack without finalizing it, if
    /// the layer supports that.
    fn pop(&mut self) -> Result<Option<Stack<'a, C>>>;

    /// Sets the inner writer.
    fn mount(&mut self, new: Stack<'a, C>);

    /// Returns a reference to the inner writer, if any.
    fn inner_ref(&self) -> Option<&dyn Stackable<'a, C>>;

    /// Returns a mutable reference to the inner writer, if any.
    fn inner_mut(&mut self) -> Option<&mut dyn Stackable<'a, C>>;

    /// Sets the cookie and returns the old value.
    fn cookie_set(&mut self, cookie: C) -> C;

    /// Returns a reference to the cookie.
    fn cookie_ref(&self) -> &C;

    /// Returns a mutable reference to the cookie.
    fn cookie_mut(&mut self) -> &mut C;
}

/// Make a `Stack` look like a `Stackable`.
impl<'a, C> Stackable<'a, C> for Stack<'a, C> {
    fn into_inner(self: Box<Self>) -> Result<Option<Stack<'a, C>>> {
        (*self).into_inner()
    }

    fn pop(&mut self) -> Result<Option<Stack<'a, C>>> {
        self.as_mut().pop()
    }

    fn mount(&mut self, new: Stack<'a, C>) {
        self.as_mut().mount(new);
    }

    fn inner_ref(&self) -> Option<&dyn Stackable<'a, C>> {
        self.as_ref().inner_ref()
    }

    fn inner_mut(&mut self) -> Option<&mut dyn Stackable<'a, C>> {
        self.as_mut().inner_mut()
    }

    fn cookie_set(&mut self, cookie: C) -> C {
        self.as_mut().cookie_set(cookie)
    }

    fn cookie_ref(&self) -> &C {
        self.as_ref().cookie_ref()
    }

    fn cookie_mut(&mut self) -> &mut C {
        self.as_mut().cookie_mut()
    }
}

/// Maps an arbitrary `io::Write` into the stack.
///
/// This is the bottom of every stack: a file, a vector, anything that
/// accepts bytes.
pub struct Generic<W: Write, C> {
    inner: W,
    cookie: C,
}

impl<'a, W: 'a + Write, C: 'a + fmt::Debug> Generic<W, C> {
    /// Wraps an `io::Write`r.
    pub fn new(inner: W, cookie: C) -> Stack<'a, C> {
        Box::new(Generic { inner, cookie })
    }
}

impl<W: Write, C> fmt::Debug for Generic<W, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("writer::Generic").finish()
    }
}

impl<W: Write, C> Write for Generic<W, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<'a, W: Write, C: fmt::Debug> Stackable<'a, C> for Generic<W, C> {
    fn into_inner(self: Box<Self>) -> Result<Option<Stack<'a, C>>> {
        Ok(None)
    }

    fn pop(&mut self) -> Result<Option<Stack<'a, C>>> {
        Ok(None)
    }

    fn mount(&mut self, _new: Stack<'a, C>) {
    }

    fn inner_ref(&self) -> Option<&dyn Stackable<'a, C>> {
        None
    }

    fn inner_mut(&mut self) -> Option<&mut dyn Stackable<'a, C>> {
        None
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

/// Passes data through unchanged.
///
/// Stands in for a transformation that turned out to be the identity,
/// e.g. the `Uncompressed` compression algorithm.
pub struct Identity<'a, C> {
    inner: Option<Stack<'a, C>>,
    cookie: C,
}

impl<'a, C: 'a + fmt::Debug> Identity<'a, C> {
    /// Makes an identity writer.
    pub fn new(inner: Stack<'a, C>, cookie: C) -> Stack<'a, C> {
        Box::new(Identity { inner: Some(inner), cookie })
    }
}

impl<'a, C> fmt::Debug for Identity<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("writer::Identity")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<'a, C> Write for Identity<'a, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.as_mut() {
            Some(inner) => inner.write(buf),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe,
                                       "writer is closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(inner) => inner.flush(),
            None => Ok(()),
        }
    }
}

impl<'a, C: fmt::Debug> Stackable<'a, C> for Identity<'a, C> {
    fn into_inner(mut self: Box<Self>) -> Result<Option<Stack<'a, C>>> {
        Ok(self.inner.take())
    }

    fn pop(&mut self) -> Result<Option<Stack<'a, C>>> {
        Ok(self.inner.take())
    }

    fn mount(&mut self, new: Stack<'a, C>) {
        self.inner = Some(new);
    }

    fn inner_ref(&self) -> Option<&dyn Stackable<'a, C>> {
        self.inner.as_ref().map(|r| r.as_ref() as &dyn Stackable<'a, C>)
    }

    fn inner_mut(&mut self) -> Option<&mut dyn Stackable<'a, C>> {
        self.inner.as_mut().map(|r| r.as_mut() as &mut dyn Stackable<'a, C>)
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

macro_rules! compressor {
    ($name:ident, $encoder:ty, $make:expr, $doc:expr) => {
        #[doc = $doc]
        pub struct $name<'a, C> {
            inner: $encoder,
            cookie: C,
        }

        impl<'a, C: 'a + fmt::Debug> $name<'a, C> {
            /// Makes a compressing writer.
            pub fn new(inner: Stack<'a, C>, cookie: C) -> Stack<'a, C> {
                #[allow(clippy::redundant_closure_call)]
                Box::new($name {
                    inner: ($make)(inner),
                    cookie,
                })
            }
        }

        impl<'a, C> fmt::Debug for $name<'a, C> {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.debug_struct(stringify!($name)).finish()
            }
        }

        impl<'a, C> Write for $name<'a, C> {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.inner.write(buf)
            }

            fn flush(&mut self) -> io::Result<()> {
                self.inner.flush()
            }
        }

        impl<'a, C: fmt::Debug> Stackable<'a, C> for $name<'a, C> {
            fn into_inner(self: Box<Self>)
                          -> Result<Option<Stack<'a, C>>> {
                Ok(Some(self.inner.finish()?))
            }

            fn pop(&mut self) -> Result<Option<Stack<'a, C>>> {
                Err(Error::InvalidOperation(
                    "a compressor must be finalized, not popped"
                        .into()).into())
            }

            fn mount(&mut self, _new: Stack<'a, C>) {
            }

            fn inner_ref(&self) -> Option<&dyn Stackable<'a, C>> {
                Some(self.inner.get_ref())
            }

            fn inner_mut(&mut self) -> Option<&mut dyn Stackable<'a, C>> {
                Some(self.inner.get_mut())
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
    };
}

compressor!(ZIP, flate2::write::DeflateEncoder<Stack<'a, C>>,
            |inner| flate2::write::DeflateEncoder::new(
                inner, flate2::Compression::default()),
            "Compresses data with raw deflate.");
compressor!(ZLIB, flate2::write::ZlibEncoder<Stack<'a, C>>,
            |inner| flate2::write::ZlibEncoder::new(
                inner, flate2::Compression::default()),
            "Compresses data with zlib.");
compressor!(BZ, bzip2::write::BzEncoder<Stack<'a, C>>,
            |inner| bzip2::write::BzEncoder::new(
                inner, bzip2::Compression::default()),
            "Compresses data with bzip2.");

/// Encrypts data with a block cipher in OpenPGP CFB mode.
pub struct Encryptor<'a, C> {
    inner: symmetric::Encryptor<Stack<'a, C>>,
    cookie: C,
}

impl<'a, C: 'a + fmt::Debug> Encryptor<'a, C> {
    /// Makes an encrypting writer.
    pub fn new(inner: Stack<'a, C>, cookie: C,
               algo: SymmetricAlgorithm, key: &[u8])
               -> Result<Stack<'a, C>> {
        Ok(Box::new(Encryptor {
            inner: symmetric::Encryptor::new(algo, key, inner)?,
            cookie,
        }))
    }
}

impl<'a, C> fmt::Debug for Encryptor<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("writer::Encryptor").finish()
    }
}

impl<'a, C> Write for Encryptor<'a, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<'a, C: fmt::Debug> Stackable<'a, C> for Encryptor<'a, C> {
    fn into_inner(mut self: Box<Self>) -> Result<Option<Stack<'a, C>>> {
        Ok(Some(self.inner.finish()?))
    }

    fn pop(&mut self) -> Result<Option<Stack<'a, C>>> {
        Err(Error::InvalidOperation(
            "an encryptor must be finalized, not popped".into()).into())
    }

    fn mount(&mut self, _new: Stack<'a, C>) {
    }

    fn inner_ref(&self) -> Option<&dyn Stackable<'a, C>> {
        None
    }

    fn inner_mut(&mut self) -> Option<&mut dyn Stackable<'a, C>> {
        None
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

    #[test]
    fn identity_passthrough() {
        let mut o = Vec::new();
        {
            let sink = Generic::new(&mut o, ());
            let mut id = Identity::new(sink, ());
            id.write_all(b"hello").unwrap();
            let inner = id.into_inner().unwrap();
            assert!(inner.is_some());
        }
        assert_eq!(o, b"hello");
    }

    #[test]
    fn zip_roundtrips_through_the_reader() {
        let data: Vec<u8> = (0..4000u32).map(|i| (i % 7) as u8).collect();

        let mut o = Vec::new();
        {
            let sink = Generic::new(&mut o, ());
            let mut z = ZIP::new(sink, ());
            z.write_all(&data).unwrap();
            Box::new(z).into_inner().unwrap();
        }

        let mut r = layered_reader::Deflate::new(
            layered_reader::Memory::new(&o));
        use layered_reader::BufferedReader;
        assert_eq!(r.steal_eof().unwrap(), data);
    }
}
