//! File handles.

use crate::{data, Volume};
use e2fs_error::{Ext2Error, Result};
use e2fs_ondisk::{FileKind, Inode};
use e2fs_types::InodeNumber;
use std::sync::Weak;

/// A handle to an open regular file.
///
/// Holds a loaded copy of the inode and a non-owning reference to the
/// volume, upgraded on each read.
pub struct File {
    pub(crate) ino: InodeNumber,
    pub(crate) inode: Inode,
    pub(crate) vol: Weak<Volume>,
}

impl File {
    #[must_use]
    pub fn ino(&self) -> InodeNumber {
        self.ino
    }

    #[must_use]
    pub fn inode(&self) -> &Inode {
        &self.inode
    }

    /// File length in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.inode.size_bytes()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn kind(&self) -> FileKind {
        self.inode.kind()
    }

    /// Read up to `buf.len()` bytes at `offset`, clamped to end of file.
    ///
    /// Returns the number of bytes read; 0 at or past end of file.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let vol = self.vol.upgrade().ok_or(Ext2Error::VolumeGone)?;

        let size = self.len();
        if offset >= size || buf.is_empty() {
            return Ok(0);
        }
        let n = usize::try_from((size - offset).min(buf.len() as u64)).unwrap_or(buf.len());
        data::read_inode_data(&vol, &self.inode, offset, &mut buf[..n])?;
        Ok(n)
    }
}
