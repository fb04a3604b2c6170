//! Fortran-style sequential record reader
//!
//! Per-rank binary files are sequences of records framed as
//! `u32 length | payload | u32 length`, little-endian. The reader decodes typed arrays out
//! of a record and can skip whole records without materializing them, which the decoders
//! use to drop refinement levels above the cap.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use thiserror::Error;

/// Low-level framing errors, wrapped with file context by the decoders
#[derive(Debug, Error)]
pub enum RecordError {
    /// The stream ended inside or before a record.
    #[error("unexpected end of file")]
    Eof,

    /// Leading and trailing length markers differ.
    #[error("record markers disagree: leading {leading}, trailing {trailing}")]
    MarkerMismatch {
        /// Leading marker value.
        leading: u32,
        /// Trailing marker value.
        trailing: u32,
    },

    /// The record does not hold the expected number of bytes.
    #[error("record holds {found} bytes, expected {expected}")]
    Length {
        /// Expected payload size.
        expected: usize,
        /// Actual payload size.
        found: usize,
    },

    /// Any other read failure.
    #[error(transparent)]
    Io(io::Error),
}

impl From<io::Error> for RecordError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            RecordError::Eof
        } else {
            RecordError::Io(e)
        }
    }
}

/// Record reader over any seekable byte stream
pub struct RecordReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl RecordReader<BufReader<File>> {
    /// Open a file for record reading
    ///
    /// # Errors
    /// Returns the I/O error from opening the file.
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read + Seek> RecordReader<R> {
    /// Wrap a stream
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
        }
    }

    /// Read the next record's payload into the internal buffer
    ///
    /// # Errors
    /// Returns [`RecordError::Eof`] on truncation and [`RecordError::MarkerMismatch`] if the
    /// framing is inconsistent.
    pub fn read_record(&mut self) -> Result<&[u8], RecordError> {
        let leading = self.inner.read_u32::<LittleEndian>()?;
        // Grow with the data actually present; a corrupt marker must not allocate 4 GiB
        self.buf.clear();
        let read = (&mut self.inner)
            .take(u64::from(leading))
            .read_to_end(&mut self.buf)?;
        if read != leading as usize {
            return Err(RecordError::Eof);
        }
        let trailing = self.inner.read_u32::<LittleEndian>()?;
        if leading != trailing {
            return Err(RecordError::MarkerMismatch { leading, trailing });
        }
        Ok(&self.buf)
    }

    /// Skip the next record, which must hold `count` values of `width` bytes, without
    /// reading its payload
    ///
    /// # Errors
    /// Framing errors, or [`RecordError::Length`] if the leading marker announces a
    /// different size.
    pub fn skip_sized(&mut self, count: usize, width: usize) -> Result<(), RecordError> {
        let leading = self.inner.read_u32::<LittleEndian>()?;
        let expected = count * width;
        if leading as usize != expected {
            return Err(RecordError::Length {
                expected,
                found: leading as usize,
            });
        }
        self.inner.seek(SeekFrom::Current(i64::from(leading)))?;
        let trailing = self.inner.read_u32::<LittleEndian>()?;
        if leading != trailing {
            return Err(RecordError::MarkerMismatch { leading, trailing });
        }
        Ok(())
    }

    fn read_sized(&mut self, count: usize, width: usize) -> Result<&[u8], RecordError> {
        let payload = self.read_record()?;
        let expected = count * width;
        if payload.len() != expected {
            return Err(RecordError::Length {
                expected,
                found: payload.len(),
            });
        }
        Ok(payload)
    }

    /// Read a record of exactly `count` i32 values
    ///
    /// # Errors
    /// Framing errors, or [`RecordError::Length`] if the record size differs.
    pub fn read_i32s(&mut self, count: usize) -> Result<Vec<i32>, RecordError> {
        let payload = self.read_sized(count, 4)?;
        let mut out = vec![0; count];
        LittleEndian::read_i32_into(payload, &mut out);
        Ok(out)
    }

    /// Read a record of exactly `count` i64 values
    ///
    /// # Errors
    /// Framing errors, or [`RecordError::Length`] if the record size differs.
    pub fn read_i64s(&mut self, count: usize) -> Result<Vec<i64>, RecordError> {
        let payload = self.read_sized(count, 8)?;
        let mut out = vec![0; count];
        LittleEndian::read_i64_into(payload, &mut out);
        Ok(out)
    }

    /// Read a record of exactly `count` f64 values
    ///
    /// # Errors
    /// Framing errors, or [`RecordError::Length`] if the record size differs.
    pub fn read_f64s(&mut self, count: usize) -> Result<Vec<f64>, RecordError> {
        let payload = self.read_sized(count, 8)?;
        let mut out = vec![0.0; count];
        LittleEndian::read_f64_into(payload, &mut out);
        Ok(out)
    }

    /// Read a record of `mask.len()` f64 values, appending only the kept ones to `out`
    ///
    /// # Errors
    /// Framing errors, or [`RecordError::Length`] if the record size differs.
    pub fn read_f64s_masked(&mut self, mask: &[bool], out: &mut Vec<f64>) -> Result<(), RecordError> {
        let payload = self.read_sized(mask.len(), 8)?;
        out.extend(
            payload
                .chunks_exact(8)
                .zip(mask)
                .filter(|&(_, &keep)| keep)
                .map(|(bytes, _)| LittleEndian::read_f64(bytes)),
        );
        Ok(())
    }

    /// Read a record of `mask.len()` i64 values, appending only the kept ones to `out`
    ///
    /// # Errors
    /// Framing errors, or [`RecordError::Length`] if the record size differs.
    pub fn read_i64s_masked(&mut self, mask: &[bool], out: &mut Vec<i64>) -> Result<(), RecordError> {
        let payload = self.read_sized(mask.len(), 8)?;
        out.extend(
            payload
                .chunks_exact(8)
                .zip(mask)
                .filter(|&(_, &keep)| keep)
                .map(|(bytes, _)| LittleEndian::read_i64(bytes)),
        );
        Ok(())
    }

    /// Read a record of `mask.len()` i32 values, appending only the kept ones to `out`
    ///
    /// # Errors
    /// Framing errors, or [`RecordError::Length`] if the record size differs.
    pub fn read_i32s_masked(&mut self, mask: &[bool], out: &mut Vec<i32>) -> Result<(), RecordError> {
        let payload = self.read_sized(mask.len(), 4)?;
        out.extend(
            payload
                .chunks_exact(4)
                .zip(mask)
                .filter(|&(_, &keep)| keep)
                .map(|(bytes, _)| LittleEndian::read_i32(bytes)),
        );
        Ok(())
    }

    /// Read a record of `mask.len()` i8 values, appending only the kept ones to `out`
    ///
    /// # Errors
    /// Framing errors, or [`RecordError::Length`] if the record size differs.
    pub fn read_i8s_masked(&mut self, mask: &[bool], out: &mut Vec<i8>) -> Result<(), RecordError> {
        let payload = self.read_sized(mask.len(), 1)?;
        out.extend(
            payload
                .iter()
                .zip(mask)
                .filter(|&(_, &keep)| keep)
                .map(|(&b, _)| b as i8),
        );
        Ok(())
    }
}

/// Encoders mirroring the reader, for building fixtures in unit tests
#[cfg(test)]
pub(crate) mod encode {
    use byteorder::{LittleEndian, WriteBytesExt};

    pub(crate) fn record(out: &mut Vec<u8>, payload: &[u8]) {
        let len = payload.len() as u32;
        out.write_u32::<LittleEndian>(len).unwrap();
        out.extend_from_slice(payload);
        out.write_u32::<LittleEndian>(len).unwrap();
    }

    pub(crate) fn i32s(out: &mut Vec<u8>, values: &[i32]) {
        let mut payload = Vec::with_capacity(values.len() * 4);
        for &v in values {
            payload.write_i32::<LittleEndian>(v).unwrap();
        }
        record(out, &payload);
    }

    pub(crate) fn i64s(out: &mut Vec<u8>, values: &[i64]) {
        let mut payload = Vec::with_capacity(values.len() * 8);
        for &v in values {
            payload.write_i64::<LittleEndian>(v).unwrap();
        }
        record(out, &payload);
    }

    pub(crate) fn f64s(out: &mut Vec<u8>, values: &[f64]) {
        let mut payload = Vec::with_capacity(values.len() * 8);
        for &v in values {
            payload.write_f64::<LittleEndian>(v).unwrap();
        }
        record(out, &payload);
    }

    pub(crate) fn i8s(out: &mut Vec<u8>, values: &[i8]) {
        let payload: Vec<u8> = values.iter().map(|&v| v as u8).collect();
        record(out, &payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_typed_records() {
        let mut bytes = Vec::new();
        encode::i32s(&mut bytes, &[4, 2]);
        encode::f64s(&mut bytes, &[0.5, -1.25, 3.0]);
        encode::i64s(&mut bytes, &[1 << 40]);

        let mut reader = RecordReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_i32s(2).unwrap(), vec![4, 2]);
        assert_eq!(reader.read_f64s(3).unwrap(), vec![0.5, -1.25, 3.0]);
        assert_eq!(reader.read_i64s(1).unwrap(), vec![1 << 40]);
        assert!(matches!(reader.read_record(), Err(RecordError::Eof)));
    }

    #[test]
    fn test_skip_and_masked_reads() {
        let mut bytes = Vec::new();
        encode::f64s(&mut bytes, &[9.0; 16]);
        encode::f64s(&mut bytes, &[1.0, 2.0, 3.0, 4.0]);
        encode::i8s(&mut bytes, &[-1, 2, -3, 4]);

        let mut reader = RecordReader::new(Cursor::new(bytes));
        reader.skip_sized(16, 8).unwrap();
        let mask = [true, false, false, true];
        let mut floats = Vec::new();
        reader.read_f64s_masked(&mask, &mut floats).unwrap();
        assert_eq!(floats, vec![1.0, 4.0]);
        let mut tags = Vec::new();
        reader.read_i8s_masked(&mask, &mut tags).unwrap();
        assert_eq!(tags, vec![-1, 4]);
    }

    #[test]
    fn test_skip_checks_announced_size() {
        let mut bytes = Vec::new();
        encode::f64s(&mut bytes, &[1.0, 2.0, 3.0]);
        encode::i32s(&mut bytes, &[5]);
        let mut reader = RecordReader::new(Cursor::new(bytes.clone()));
        assert!(matches!(
            reader.skip_sized(2, 8),
            Err(RecordError::Length {
                expected: 16,
                found: 24
            })
        ));

        // Payload cut short inside the skipped record
        bytes.truncate(10);
        let mut reader = RecordReader::new(Cursor::new(bytes));
        assert!(matches!(reader.skip_sized(3, 8), Err(RecordError::Eof)));
    }

    #[test]
    fn test_length_mismatch() {
        let mut bytes = Vec::new();
        encode::i32s(&mut bytes, &[1, 2, 3]);
        let mut reader = RecordReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.read_i32s(2),
            Err(RecordError::Length {
                expected: 8,
                found: 12
            })
        ));
    }

    #[test]
    fn test_truncated_and_corrupt_framing() {
        let mut bytes = Vec::new();
        encode::f64s(&mut bytes, &[1.0, 2.0]);
        bytes.truncate(bytes.len() - 6);
        let mut reader = RecordReader::new(Cursor::new(bytes));
        assert!(matches!(reader.read_f64s(2), Err(RecordError::Eof)));

        let mut bytes = Vec::new();
        encode::i32s(&mut bytes, &[7]);
        let last = bytes.len() - 4;
        bytes[last] = 99;
        let mut reader = RecordReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.read_i32s(1),
            Err(RecordError::MarkerMismatch {
                leading: 4,
                trailing: 99
            })
        ));
    }
}
