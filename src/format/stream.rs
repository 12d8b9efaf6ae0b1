//! Word streams over files and buffers.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use fixed16::Fixed;

use super::layout::{SENTINEL, WORD_SIZE};
use crate::util::{Error, Result};

/// Input file, memory-mapped or buffered.
pub enum Source {
    /// Memory-mapped file (preferred for large files)
    #[cfg(feature = "mmap")]
    Mmap { map: memmap2::Mmap, pos: usize },
    /// Buffered file access (fallback)
    File(BufReader<File>),
}

impl Source {
    /// Open a file, memory-mapping it when asked and possible.
    pub fn open(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        #[cfg(feature = "mmap")]
        {
            if use_mmap && file.metadata()?.len() > 0 {
                // Safety: the file is opened read-only and only read through the map
                let map = unsafe { memmap2::Mmap::map(&file) }?;
                return Ok(Self::Mmap { map, pos: 0 });
            }
        }
        #[cfg(not(feature = "mmap"))]
        let _ = use_mmap;

        Ok(Self::File(BufReader::new(file)))
    }
}

impl Read for Source {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            #[cfg(feature = "mmap")]
            Self::Mmap { map, pos } => {
                let rest = &map[(*pos).min(map.len())..];
                let n = rest.len().min(buf.len());
                buf[..n].copy_from_slice(&rest[..n]);
                *pos += n;
                Ok(n)
            }
            Self::File(reader) => reader.read(buf),
        }
    }
}

/// Reads little-endian 32-bit words and tracks the byte offset for errors.
pub struct WordReader<R> {
    inner: R,
    pos: u64,
}

impl<R: Read> WordReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }

    /// Byte offset of the next read.
    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn read_word(&mut self) -> Result<i32> {
        let start = self.pos;
        let value = self.inner.read_i32::<LittleEndian>().map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                Error::UnexpectedEof(start)
            } else {
                Error::Io(e)
            }
        })?;
        self.pos += WORD_SIZE as u64;
        Ok(value)
    }

    /// Read a word, or `None` if the input ends cleanly before it.
    ///
    /// Input ending inside the word is still an error.
    pub fn try_read_word(&mut self) -> Result<Option<i32>> {
        let mut buf = [0u8; WORD_SIZE];
        let mut filled = 0;
        while filled < WORD_SIZE {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        match filled {
            0 => Ok(None),
            WORD_SIZE => {
                self.pos += WORD_SIZE as u64;
                Ok(Some(LittleEndian::read_i32(&buf)))
            }
            _ => Err(Error::UnexpectedEof(self.pos)),
        }
    }

    pub fn read_words<const N: usize>(&mut self) -> Result<[i32; N]> {
        let mut out = [0i32; N];
        for w in &mut out {
            *w = self.read_word()?;
        }
        Ok(out)
    }

    /// Read a fixed-point word and decode it.
    #[inline]
    pub fn read_real(&mut self) -> Result<f64> {
        self.read_word().map(fixed16::to_real)
    }

    pub fn skip_words(&mut self, count: usize) -> Result<()> {
        let len = count
            .checked_mul(WORD_SIZE)
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| Error::invalid(format!("cannot skip {count} words")))?;
        let skipped = io::copy(&mut (&mut self.inner).take(len), &mut io::sink())?;
        self.pos += skipped;
        if skipped < len {
            return Err(Error::UnexpectedEof(self.pos));
        }
        Ok(())
    }

    /// Read a count word; negative counts are invalid.
    pub fn read_count(&mut self, what: &str) -> Result<usize> {
        let at = self.pos;
        let value = self.read_word()?;
        usize::try_from(value)
            .map_err(|_| Error::invalid(format!("negative {what} count {value} at byte {at}")))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let start = self.pos;
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                Error::UnexpectedEof(start)
            } else {
                Error::Io(e)
            }
        })?;
        self.pos += len as u64;
        Ok(buf)
    }

    /// Read a section terminator and check it is zero.
    pub fn expect_sentinel(&mut self) -> Result<()> {
        let actual = self.read_word()?;
        if actual != SENTINEL {
            return Err(Error::SentinelMismatch { expected: SENTINEL, actual });
        }
        Ok(())
    }
}

/// Writes little-endian 32-bit words.
pub struct WordWriter<W> {
    inner: W,
}

impl<W: Write> WordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    #[inline]
    pub fn write_word(&mut self, value: i32) -> Result<()> {
        self.inner.write_i32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_words(&mut self, values: &[i32]) -> Result<()> {
        for &v in values {
            self.write_word(v)?;
        }
        Ok(())
    }

    #[inline]
    pub fn write_fixed(&mut self, value: Fixed) -> Result<()> {
        self.write_word(value.raw())
    }

    /// Encode a real value (truncating toward zero) and write it.
    #[inline]
    pub fn write_real(&mut self, value: f64) -> Result<()> {
        self.write_word(fixed16::from_real(value))
    }

    /// Write a count word.
    pub fn write_count(&mut self, count: usize) -> Result<()> {
        let value = i32::try_from(count)
            .map_err(|_| Error::invalid(format!("count {count} does not fit in a word")))?;
        self.write_word(value)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
