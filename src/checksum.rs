// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! spec.md §3 fixes `checksum` as a 32-bit quantity (unlike the teacher's
//! 128-bit `xxh3` digest): every column run, header offset table and
//! block-index segment is trailed by a `uint32` checksum. We keep the
//! teacher's streaming `ChecksummedWriter`/`ChecksummedReader` shape but
//! truncate the xxh3 digest to its low 32 bits, the same truncation the
//! teacher itself performs for its own block trailer checksum.

/// A 32-bit checksum.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Checksum(u32);

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl Checksum {
    /// Wraps a checksum value.
    #[must_use]
    pub fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw 32-bit integer.
    #[must_use]
    pub fn into_u32(self) -> u32 {
        self.0
    }

    /// Hashes `bytes` with xxh3 and truncates to 32 bits.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "we purposefully only use the lower 4 bytes as checksum"
        )]
        Self(xxhash_rust::xxh3::xxh3_64(bytes) as u32)
    }

    pub(crate) fn check(&self, expected: Self) -> crate::Result<()> {
        if self.0 == expected.0 {
            Ok(())
        } else {
            Err(crate::Error::ChecksumMismatch {
                expected,
                got: *self,
            })
        }
    }
}

/// Wraps a writer, accumulating an xxh3 checksum of everything written
/// through it without an intermediate buffer.
pub struct ChecksummedWriter<W: std::io::Write> {
    inner: W,
    hasher: xxhash_rust::xxh3::Xxh3Default,
}

impl<W: std::io::Write> ChecksummedWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: writer,
            hasher: xxhash_rust::xxh3::Xxh3Default::new(),
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "we purposefully only use the lower 4 bytes as checksum"
    )]
    pub fn checksum(&self) -> Checksum {
        Checksum::from_raw(self.hasher.digest() as u32)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: std::io::Write> std::io::Write for ChecksummedWriter<W> {
    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }

    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.hasher.update(buf);
        self.inner.write(buf)
    }
}

/// Wraps a reader, accumulating an xxh3 checksum of everything read
/// through it, for verifying a trailer checksum after the fact.
pub struct ChecksummedReader<R: std::io::Read> {
    inner: R,
    hasher: xxhash_rust::xxh3::Xxh3Default,
}

impl<R: std::io::Read> ChecksummedReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: reader,
            hasher: xxhash_rust::xxh3::Xxh3Default::new(),
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "we purposefully only use the lower 4 bytes as checksum"
    )]
    pub fn checksum(&self) -> Checksum {
        Checksum::from_raw(self.hasher.digest() as u32)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: std::io::Read> std::io::Read for ChecksummedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}
