use std::fmt;
use std::io;

use flate2::read::DeflateDecoder;
use flate2::read::ZlibDecoder;
use bzip2::read::BzDecoder;

use super::*;

macro_rules! decompressor {
    ($name:ident, $decoder:ident, $doc:expr) => {
        #[doc = $doc]
        ///
        /// Decompression happens lazily, as the layers above pull data.
        pub struct $name<R: BufferedReader> {
            reader: Generic<$decoder<R>>,
        }

        impl<R: BufferedReader> fmt::Debug for $name<R> {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("reader", &self.reader)
                    .finish()
            }
        }

        impl<R: BufferedReader> $name<R> {
            /// Instantiates a new decompressing reader.
            pub fn new(reader: R) -> Self {
                $name {
                    reader: Generic::new($decoder::new(reader), None),
                }
            }
        }

        impl<R: BufferedReader> io::Read for $name<R> {
            fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
                self.reader.read(buf)
            }
        }

        impl<R: BufferedReader> BufferedReader for $name<R> {
            fn buffer(&self) -> &[u8] {
                self.reader.buffer()
            }

            fn data(&mut self, amount: usize) -> Result<&[u8], io::Error> {
                self.reader.data(amount)
            }

            fn data_hard(&mut self, amount: usize)
                         -> Result<&[u8], io::Error> {
                self.reader.data_hard(amount)
            }

            fn consume(&mut self, amount: usize) -> &[u8] {
                self.reader.consume(amount)
            }

            fn data_consume(&mut self, amount: usize)
                            -> Result<&[u8], io::Error> {
                self.reader.data_consume(amount)
            }

            fn data_consume_hard(&mut self, amount: usize)
                                 -> Result<&[u8], io::Error> {
                self.reader.data_consume_hard(amount)
            }

            fn get_mut(&mut self) -> Option<&mut dyn BufferedReader> {
                Some(self.reader.reader_mut().get_mut())
            }

            fn get_ref(&self) -> Option<&dyn BufferedReader> {
                Some(self.reader.reader_ref().get_ref())
            }

            fn into_inner<'a>(self: Box<Self>)
                              -> Option<Box<dyn BufferedReader + 'a>>
                where Self: 'a
            {
                Some(Box::new(self.reader.into_reader().into_inner()))
            }
        }
    };
}

decompressor!(Deflate, DeflateDecoder,
              "Decompresses a raw deflate stream.");
decompressor!(Zlib, ZlibDecoder,
              "Decompresses a zlib stream.");
decompressor!(Bzip, BzDecoder,
              "Decompresses a bzip2 stream.");

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn deflate_roundtrip() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();

        let mut compressed = Vec::new();
        {
            let mut enc = flate2::write::DeflateEncoder::new(
                &mut compressed, flate2::Compression::default());
            enc.write_all(&data).unwrap();
            enc.finish().unwrap();
        }

        let mut bio = Deflate::new(Memory::new(&compressed));
        assert_eq!(bio.steal_eof().unwrap(), data);
    }

    #[test]
    fn bzip_roundtrip() {
        let data = b"hello hello hello hello";

        let mut compressed = Vec::new();
        {
            let mut enc = bzip2::write::BzEncoder::new(
                &mut compressed, bzip2::Compression::default());
            enc.write_all(data).unwrap();
            enc.finish().unwrap();
        }

        let mut bio = Bzip::new(Memory::new(&compressed));
        assert_eq!(bio.steal_eof().unwrap(), data);
    }
}
