//! Directory enumeration and lookup.
//!
//! Directories are packed sequences of variable-length linked entries.
//! The cursor implements the advance step shared by the public iterator and
//! by name lookup: skip tombstones, stop at `i_size`, and refuse to loop on
//! a zero `rec_len`.

use crate::{data, Volume};
use e2fs_error::{Ext2Error, Result};
use e2fs_ondisk::{DirEntryHeader, Inode, DIR_ENTRY_HEADER_SIZE};
use e2fs_types::{InodeNumber, EXT2_NAME_MAX};
use std::sync::Weak;
use tracing::warn;

/// One live directory entry with its name bytes.
#[derive(Debug, Clone)]
pub(crate) struct RawEntry {
    pub header: DirEntryHeader,
    pub name: Vec<u8>,
}

pub(crate) struct EntryCursor<'v> {
    vol: &'v Volume,
    inode: &'v Inode,
    pub offset: u64,
}

impl<'v> EntryCursor<'v> {
    pub fn new(vol: &'v Volume, inode: &'v Inode, offset: u64) -> Self {
        Self { vol, inode, offset }
    }

    /// Advance to the next live entry, skipping tombstones.
    ///
    /// `Ok(None)` is end of directory; errors mark corruption or I/O failure
    /// at the current offset.
    pub fn next_entry(&mut self) -> Result<Option<RawEntry>> {
        let size = self.inode.size_bytes();
        loop {
            if self.offset >= size {
                return Ok(None);
            }
            if self.offset + DIR_ENTRY_HEADER_SIZE as u64 > size {
                return Err(Ext2Error::CorruptEntry {
                    offset: self.offset,
                    detail: "truncated entry header",
                });
            }

            let mut header_buf = [0_u8; DIR_ENTRY_HEADER_SIZE];
            data::read_inode_data(self.vol, self.inode, self.offset, &mut header_buf)?;
            let header = DirEntryHeader::parse_from_bytes(&header_buf)
                .map_err(|e| Ext2Error::Format(e.to_string()))?;

            if header.rec_len == 0 {
                return Err(Ext2Error::CorruptEntry {
                    offset: self.offset,
                    detail: "zero rec_len",
                });
            }

            if header.is_tombstone() {
                self.offset += u64::from(header.rec_len);
                continue;
            }

            // Clamp corrupted name lengths to the entry's own bounds.
            let name_len = usize::from(header.name_len)
                .min(EXT2_NAME_MAX)
                .min(usize::from(header.rec_len).saturating_sub(DIR_ENTRY_HEADER_SIZE));
            let name_offset = self.offset + DIR_ENTRY_HEADER_SIZE as u64;
            if name_offset + name_len as u64 > size {
                return Err(Ext2Error::CorruptEntry {
                    offset: self.offset,
                    detail: "name extends past directory end",
                });
            }
            let mut name = vec![0_u8; name_len];
            data::read_inode_data(self.vol, self.inode, name_offset, &mut name)?;

            self.offset += u64::from(header.rec_len);
            return Ok(Some(RawEntry { header, name }));
        }
    }
}

/// Scan a directory for an exact byte match on `name`.
///
/// Corrupt entries terminate the scan and report as `NotFound`, matching
/// the iterator's treat-as-end-of-directory behavior.
pub(crate) fn find_entry(vol: &Volume, inode: &Inode, name: &[u8]) -> Result<RawEntry> {
    let mut cursor = EntryCursor::new(vol, inode, 0);
    loop {
        match cursor.next_entry() {
            Ok(Some(entry)) => {
                if entry.name == name {
                    return Ok(entry);
                }
            }
            Ok(None) => {
                return Err(Ext2Error::NotFound(
                    String::from_utf8_lossy(name).into_owned(),
                ));
            }
            Err(Ext2Error::CorruptEntry { offset, detail }) => {
                warn!(
                    target: "e2fs::dir",
                    offset,
                    detail,
                    "corrupt directory entry, treating as end of directory"
                );
                return Err(Ext2Error::NotFound(
                    String::from_utf8_lossy(name).into_owned(),
                ));
            }
            Err(error) => return Err(error),
        }
    }
}

/// A handle to an open directory.
///
/// Holds a loaded copy of the directory inode and a non-owning reference to
/// the volume, upgraded on each iterator advance.
pub struct Dir {
    pub(crate) ino: InodeNumber,
    pub(crate) inode: Inode,
    pub(crate) vol: Weak<Volume>,
}

impl Dir {
    #[must_use]
    pub fn ino(&self) -> InodeNumber {
        self.ino
    }

    #[must_use]
    pub fn inode(&self) -> &Inode {
        &self.inode
    }

    /// A lazy, forward-only iterator over this directory's live entries, in
    /// on-disk order. Restartable: each call starts a fresh pass.
    #[must_use]
    pub fn entries(&self) -> Entries<'_> {
        Entries {
            dir: self,
            offset: 0,
            done: false,
        }
    }
}

/// One enumerated directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub ino: InodeNumber,
    pub name: Vec<u8>,
    /// Raw type byte; meaningful only on volumes advertising typed entries.
    pub file_type: u8,
}

impl DirEntry {
    /// The name as a UTF-8 string (lossy).
    #[must_use]
    pub fn name_str(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    #[must_use]
    pub fn is_dot(&self) -> bool {
        self.name == b"."
    }

    #[must_use]
    pub fn is_dotdot(&self) -> bool {
        self.name == b".."
    }
}

/// Iterator over a directory's entries. Corruption and I/O failures end the
/// iteration; lookup-level callers see them as `NotFound`.
pub struct Entries<'d> {
    dir: &'d Dir,
    offset: u64,
    done: bool,
}

impl Iterator for Entries<'_> {
    type Item = DirEntry;

    fn next(&mut self) -> Option<DirEntry> {
        if self.done {
            return None;
        }

        let Some(vol) = self.dir.vol.upgrade() else {
            warn!(target: "e2fs::dir", "volume released, ending directory iteration");
            self.done = true;
            return None;
        };

        let mut cursor = EntryCursor::new(&vol, &self.dir.inode, self.offset);
        match cursor.next_entry() {
            Ok(Some(entry)) => {
                self.offset = cursor.offset;
                Some(DirEntry {
                    ino: InodeNumber(entry.header.inode),
                    name: entry.name,
                    file_type: entry.header.file_type,
                })
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                warn!(
                    target: "e2fs::dir",
                    dir = self.dir.ino.0,
                    offset = self.offset,
                    %error,
                    "directory iteration terminated"
                );
                self.done = true;
                None
            }
        }
    }
}
