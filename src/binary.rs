//! cursor based decoding of the binary sections of snapshot files
//!
//! [`BinaryReader`] wraps any `Read + Seek` handle and knows the total length of the
//! stream, so that both reads and skips past the end of the data are reported as
//! [`Truncated`](crate::parse::Truncated) instead of silently producing short arrays.

use crate::parse::{LineSummary, LineTooLong, ParseError, Truncated};
use crate::Error;

use byteorder::{BigEndian, ByteOrder, LittleEndian, NativeEndian};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

/// longest ASCII declaration line accepted, not counting the trailing `\n`
pub const MAX_LINE_BYTES: usize = 256;

/// byte order of a numeric block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
    /// the byte order of the machine that is reading the file. Dump files are written
    /// in the byte order of the machine that produced them.
    Native,
}

/// primitive numeric types that can be decoded from a packed block of bytes
pub trait Packed: Copy + Default + 'static {
    /// width of a single element in bytes
    const SIZE: usize;

    /// decode `dst.len()` elements from `src`. `src` must hold exactly
    /// `dst.len() * SIZE` bytes.
    fn decode_into(endian: Endian, src: &[u8], dst: &mut [Self]);
}

macro_rules! impl_packed {
    ($ty:ty, $size:expr, $method:ident) => {
        impl Packed for $ty {
            const SIZE: usize = $size;

            fn decode_into(endian: Endian, src: &[u8], dst: &mut [Self]) {
                match endian {
                    Endian::Big => BigEndian::$method(src, dst),
                    Endian::Little => LittleEndian::$method(src, dst),
                    Endian::Native => NativeEndian::$method(src, dst),
                }
            }
        }
    };
}

impl_packed!(i32, 4, read_i32_into);
impl_packed!(f32, 4, read_f32_into);
impl_packed!(f64, 8, read_f64_into);

/// sequential reader over a seekable byte stream
///
/// None of the methods are safe to interleave with other users of the same handle:
/// every call moves the shared cursor.
pub struct BinaryReader<R> {
    inner: R,
    len: u64,
    scratch: Vec<u8>,
}

impl BinaryReader<BufReader<File>> {
    /// open a file for a single buffered pass
    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> BinaryReader<R> {
    /// wrap a handle. The cursor is left where it was.
    pub fn new(mut inner: R) -> Result<Self, Error> {
        let position = inner.stream_position()?;
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(position))?;

        Ok(Self {
            inner,
            len,
            scratch: Vec::new(),
        })
    }

    /// total length of the underlying stream in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// current cursor position
    pub fn position(&mut self) -> Result<u64, Error> {
        Ok(self.inner.stream_position()?)
    }

    /// move the cursor to an absolute offset
    pub fn seek_to(&mut self, offset: u64) -> Result<(), Error> {
        if offset > self.len {
            return Err(ParseError::from(Truncated::new("seek target", offset, self.len)).into());
        }
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// advance the cursor by `byte_count` bytes without reading them
    pub fn skip(&mut self, byte_count: u64) -> Result<(), Error> {
        let position = self.position()?;
        let remaining = self.len.saturating_sub(position);

        if byte_count > remaining {
            return Err(ParseError::from(Truncated::new("skipped block", byte_count, remaining)).into());
        }

        self.inner.seek(SeekFrom::Current(byte_count as i64))?;
        Ok(())
    }

    /// fail with `Truncated` unless `byte_count` bytes remain after the cursor
    fn ensure_remaining(&mut self, context: &'static str, byte_count: usize) -> Result<(), Error> {
        let position = self.position()?;
        let remaining = self.len.saturating_sub(position);

        if byte_count as u64 > remaining {
            return Err(ParseError::from(Truncated::new(context, byte_count as u64, remaining)).into());
        }
        Ok(())
    }

    /// product of `factors`, or `Truncated` when it overflows a `usize`
    pub fn checked_size(&self, context: &'static str, factors: &[usize]) -> Result<usize, Error> {
        factors
            .iter()
            .try_fold(1usize, |acc, n| acc.checked_mul(*n))
            .ok_or_else(|| ParseError::from(Truncated::new(context, u64::MAX, self.len)).into())
    }

    /// fill `buffer` completely or fail with `Truncated`
    fn fill(&mut self, context: &'static str, buffer: &mut [u8]) -> Result<(), Error> {
        let mut filled = 0;

        while filled < buffer.len() {
            match self.inner.read(&mut buffer[filled..]) {
                Ok(0) => {
                    let err = Truncated::new(context, buffer.len() as u64, filled as u64);
                    return Err(ParseError::from(err).into());
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// read exactly `byte_count` raw bytes
    pub fn read_bytes(&mut self, byte_count: usize) -> Result<Vec<u8>, Error> {
        self.ensure_remaining("raw bytes", byte_count)?;
        let mut out = vec![0; byte_count];
        self.fill("raw bytes", &mut out)?;
        Ok(out)
    }

    /// read a fixed-width string field of `max_bytes` bytes.
    ///
    /// Invalid UTF-8 is replaced rather than rejected, and the string ends at the first
    /// null byte. The cursor always advances by `max_bytes`.
    pub fn read_fixed_string(&mut self, max_bytes: usize) -> Result<String, Error> {
        let bytes = self.read_bytes(max_bytes)?;
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// read `count` values of type `T` stored in the given byte order
    pub fn read_packed<T: Packed>(&mut self, endian: Endian, count: usize) -> Result<Vec<T>, Error> {
        let byte_count = self.checked_size("numeric block", &[count, T::SIZE])?;
        self.ensure_remaining("numeric block", byte_count)?;

        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        scratch.resize(byte_count, 0);

        let filled = self.fill("numeric block", &mut scratch);
        let out = filled.map(|_| {
            let mut out = vec![T::default(); count];
            T::decode_into(endian, &scratch, &mut out);
            out
        });

        self.scratch = scratch;
        out
    }

    /// read a single value of type `T`
    pub fn read_one<T: Packed>(&mut self, endian: Endian) -> Result<T, Error> {
        let values = self.read_packed::<T>(endian, 1)?;
        Ok(values[0])
    }

    /// read one ASCII line, including the trailing `\n`. An empty vector means the
    /// end of the stream was reached.
    ///
    /// Lines longer than [`MAX_LINE_BYTES`] are rejected with `LineTooLong`.
    pub fn read_line(&mut self) -> Result<Vec<u8>, Error> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                    if line.len() > MAX_LINE_BYTES {
                        let err = LineTooLong::new(LineSummary::new(&line), MAX_LINE_BYTES);
                        return Err(ParseError::from(err).into());
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(line)
    }

    /// check whether the upcoming bytes equal `tag` without moving the cursor
    pub fn starts_with(&mut self, tag: &[u8]) -> Result<bool, Error> {
        let position = self.position()?;
        if self.len.saturating_sub(position) < tag.len() as u64 {
            return Ok(false);
        }

        let upcoming = self.read_bytes(tag.len())?;
        self.inner.seek(SeekFrom::Start(position))?;

        Ok(upcoming == tag)
    }

    /// give back the wrapped handle
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Cursor;

    fn reader(bytes: Vec<u8>) -> BinaryReader<Cursor<Vec<u8>>> {
        BinaryReader::new(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn fixed_string_stops_at_null() {
        let mut bytes = b"Vc-RHO".to_vec();
        bytes.resize(16, 0);
        bytes.extend_from_slice(b"tail");

        let mut reader = reader(bytes);
        assert_eq!(reader.read_fixed_string(16).unwrap(), "Vc-RHO");
        assert_eq!(reader.position().unwrap(), 16);
    }

    #[test]
    fn fixed_string_replaces_invalid_bytes() {
        let bytes = vec![b'a', 0xff, b'b', 0, b'c'];
        let mut reader = reader(bytes);
        assert_eq!(reader.read_fixed_string(5).unwrap(), "a\u{fffd}b");
    }

    #[test]
    fn packed_big_endian() {
        let mut bytes = Vec::new();
        bytes.write_f32::<BigEndian>(1.5).unwrap();
        bytes.write_f32::<BigEndian>(-2.0).unwrap();
        bytes.write_i32::<BigEndian>(7).unwrap();

        let mut reader = reader(bytes);
        assert_eq!(reader.read_packed::<f32>(Endian::Big, 2).unwrap(), vec![1.5, -2.0]);
        assert_eq!(reader.read_one::<i32>(Endian::Big).unwrap(), 7);
    }

    #[test]
    fn packed_truncated() {
        let mut bytes = Vec::new();
        bytes.write_f64::<LittleEndian>(1.0).unwrap();

        let mut reader = reader(bytes);
        let err = reader.read_packed::<f64>(Endian::Little, 2).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::Truncated(_))));
    }

    #[test]
    fn huge_count_fails_before_allocating() {
        let mut bytes = Vec::new();
        bytes.write_f64::<LittleEndian>(1.0).unwrap();

        let mut reader = reader(bytes);
        let err = reader.read_packed::<f64>(Endian::Little, 1 << 40).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::Truncated(_))));

        let err = reader.read_packed::<f64>(Endian::Little, usize::MAX).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::Truncated(_))));

        let err = reader.read_bytes(1 << 40).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::Truncated(_))));

        // nothing was consumed by the failed reads
        assert_eq!(reader.position().unwrap(), 0);
        assert_eq!(reader.read_one::<f64>(Endian::Little).unwrap(), 1.0);
    }

    #[test]
    fn size_products_overflow_into_truncated() {
        let reader = reader(vec![0; 4]);
        assert_eq!(reader.checked_size("grid", &[2, 3, 4]).unwrap(), 24);
        assert_eq!(reader.checked_size("grid", &[]).unwrap(), 1);

        let err = reader
            .checked_size("grid", &[1 << 32, 1 << 32, 2])
            .unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::Truncated(_))));
    }

    #[test]
    fn skip_past_end_is_truncated() {
        let mut reader = reader(vec![0; 10]);
        reader.skip(4).unwrap();
        assert_eq!(reader.position().unwrap(), 4);

        let err = reader.skip(7).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::Truncated(_))));
    }

    #[test]
    fn lines_and_peeking() {
        let mut reader = reader(b"LOOKUP_TABLE default\nrest".to_vec());
        assert!(reader.starts_with(b"LOOKUP_TABLE").unwrap());
        assert!(!reader.starts_with(b"SCALARS").unwrap());
        assert_eq!(reader.read_line().unwrap(), b"LOOKUP_TABLE default\n");
        assert_eq!(reader.read_line().unwrap(), b"rest");
        assert!(reader.read_line().unwrap().is_empty());
    }

    #[test]
    fn overlong_line_is_refused() {
        let mut reader = reader(vec![b'a'; 1000]);
        let err = reader.read_line().unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::LineTooLong(_))));

        let mut longest = vec![b'b'; MAX_LINE_BYTES];
        longest.push(b'\n');
        let mut reader = self::reader(longest.clone());
        assert_eq!(reader.read_line().unwrap(), longest);
    }
}
