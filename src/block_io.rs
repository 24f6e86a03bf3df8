//! §6.4: the block-I/O adapter contract, consumed (not implemented)
//! by the core.

use std::fmt;

/// Error returned by a [`BlockSource`] implementation.
#[derive(Debug)]
pub struct IoError(pub Box<dyn std::error::Error + Send + Sync + 'static>);

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.0.as_ref())
    }
}

impl IoError {
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Box::new(error))
    }
}

impl From<std::io::Error> for IoError {
    fn from(error: std::io::Error) -> Self {
        Self(Box::new(error))
    }
}

/// Absolute, random-access read over a block device, raw file, or
/// forensic container. The adapter must fully fill the buffer or
/// return an error; partial reads are not tolerated by the core.
pub trait BlockSource {
    /// Reads exactly `into.len()` bytes starting at `absolute_offset`.
    fn read_at(&self, absolute_offset: u64, into: &mut [u8]) -> Result<(), IoError>;

    /// Total size of the underlying image, in bytes.
    fn size(&self) -> u64;
}

/// A `BlockSource` over an in-memory byte slice, used by tests and by
/// any caller that has already mapped or loaded the whole image.
impl BlockSource for &[u8] {
    fn read_at(&self, absolute_offset: u64, into: &mut [u8]) -> Result<(), IoError> {
        let start = usize::try_from(absolute_offset)
            .map_err(|_| IoError::new(std::io::Error::other("offset overflows usize")))?;
        let end = start
            .checked_add(into.len())
            .ok_or_else(|| IoError::new(std::io::Error::other("read range overflows usize")))?;
        let slice = self
            .get(start..end)
            .ok_or_else(|| IoError::new(std::io::Error::other("read past end of block source")))?;
        into.copy_from_slice(slice);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.len() as u64
    }
}
