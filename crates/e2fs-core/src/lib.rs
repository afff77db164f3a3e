#![forbid(unsafe_code)]
//! ext2 filesystem core.
//!
//! Mounts an ext2 volume over a byte-addressed device, resolves paths to
//! inodes, reads file and directory contents through the block indirection
//! tree, and stats files. Read-mostly: the driver writes the superblock on
//! unmount and inode access times on stat, nothing else.
//!
//! The mounted volume is shared: `try_mount` returns an `Arc<Volume>`, and
//! directory/file handles keep `Weak` back-references that are upgraded on
//! use. Dropping the last `Arc` unmounts — the superblock state flips back
//! to clean and is flushed, best-effort.

mod data;
mod dir;
mod file;
mod path;

pub use dir::{Dir, DirEntry, Entries};
pub use e2fs_error::{Ext2Error, Result};
pub use file::File;

use e2fs_block::{read_superblock_region, ByteDevice};
use e2fs_ondisk::{
    DirEntryHeader, FileKind, GroupDescriptor, Inode, Superblock, STATE_HAS_ERRORS, STATE_VALID,
};
use e2fs_types::{
    BlockNumber, ByteOffset, GroupNumber, InodeNumber, ParseError, EXT2_GROUP_DESC_SIZE,
    EXT2_SUPERBLOCK_OFFSET,
};
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Wall-clock seconds since the epoch, saturated to the on-disk u32 width.
fn unix_now_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

/// Platform-agnostic stat record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileStat {
    pub ino: u32,
    pub mode: u16,
    pub nlink: u16,
    pub uid: u16,
    pub gid: u16,
    pub size: u64,
    pub block_size: u32,
    /// 512-byte sectors, as stored in `i_blocks`.
    pub blocks: u32,
    pub atime: u32,
    pub mtime: u32,
    pub ctime: u32,
}

/// A mounted ext2 volume.
pub struct Volume {
    dev: Box<dyn ByteDevice>,
    sb: Superblock,
    this: Weak<Volume>,
}

impl Volume {
    /// Mount the filesystem on `dev`.
    ///
    /// Validates the superblock (magic, features, state), then flips the
    /// in-memory state to has-errors, bumps the mount count, and stamps the
    /// mount time. Nothing is written to the device until unmount; a failed
    /// mount leaves the device untouched.
    pub fn try_mount(dev: Box<dyn ByteDevice>) -> Result<Arc<Self>> {
        let region = read_superblock_region(dev.as_ref())?;
        let mut sb = match Superblock::parse_region(&region) {
            Ok(sb) => sb,
            Err(ParseError::InvalidMagic { actual, .. }) => {
                return Err(Ext2Error::BadMagic { actual });
            }
            Err(e) => return Err(Ext2Error::Format(e.to_string())),
        };

        // Incompat and ro_compat bits both refuse the mount; compat bits are
        // advisory and ignored.
        if sb.feature_incompat != 0 || sb.feature_ro_compat != 0 {
            return Err(Ext2Error::UnsupportedFeatures {
                incompat: sb.feature_incompat,
                ro_compat: sb.feature_ro_compat,
            });
        }

        if sb.state == STATE_HAS_ERRORS {
            return Err(Ext2Error::DirtyFilesystem);
        }

        sb.validate_geometry()
            .map_err(|e| Ext2Error::Format(e.to_string()))?;

        log_mount_summary(&sb);

        // Marked dirty while mounted; a clean unmount flips it back. The
        // flag reaches the disk only through the unmount flush.
        sb.state = STATE_HAS_ERRORS;
        sb.mnt_count = sb.mnt_count.wrapping_add(1);
        sb.mtime = unix_now_secs();

        Ok(Arc::new_cyclic(|this| Self {
            dev,
            sb,
            this: this.clone(),
        }))
    }

    /// The mounted superblock (with in-memory mount bookkeeping applied).
    #[must_use]
    pub fn superblock(&self) -> &Superblock {
        &self.sb
    }

    pub(crate) fn device(&self) -> &dyn ByteDevice {
        self.dev.as_ref()
    }

    // ── Group descriptors ───────────────────────────────────────────────

    /// Read one entry of the block group descriptor table.
    pub fn group_descriptor(&self, group: GroupNumber) -> Result<GroupDescriptor> {
        if group.0 >= self.sb.block_groups() {
            return Err(Ext2Error::InvalidArgument("block group out of range"));
        }
        let mut raw = [0_u8; EXT2_GROUP_DESC_SIZE];
        self.dev
            .read_exact_at(self.sb.group_desc_offset(group), &mut raw)?;
        GroupDescriptor::parse_from_bytes(&raw).map_err(|e| Ext2Error::Format(e.to_string()))
    }

    /// Write one entry of the block group descriptor table.
    pub fn write_group_descriptor(&self, group: GroupNumber, gd: &GroupDescriptor) -> Result<()> {
        if group.0 >= self.sb.block_groups() {
            return Err(Ext2Error::InvalidArgument("block group out of range"));
        }
        self.dev
            .write_all_at(self.sb.group_desc_offset(group), &gd.encode())
    }

    // ── Inode table ─────────────────────────────────────────────────────

    /// Device byte offset of the inode record for `ino`.
    fn inode_location(&self, ino: InodeNumber) -> Result<ByteOffset> {
        if ino.0 == 0 || ino.0 > self.sb.inodes_count {
            return Err(Ext2Error::InvalidArgument("inode number out of range"));
        }
        let (group, _index, table_offset) = self.sb.inode_table_offset(ino);
        let gd = self.group_descriptor(group)?;
        let table = self
            .sb
            .block_size()
            .block_to_byte(BlockNumber(gd.inode_table));
        Ok(ByteOffset(table.0 + table_offset))
    }

    /// Read and parse an inode record.
    pub fn inode(&self, ino: InodeNumber) -> Result<Inode> {
        let location = self.inode_location(ino)?;
        let mut raw = vec![0_u8; usize::from(self.sb.inode_record_size())];
        self.dev.read_exact_at(location, &mut raw)?;
        Inode::parse_from_bytes(&raw).map_err(|e| Ext2Error::Format(e.to_string()))
    }

    /// Write an inode record back to the inode table.
    ///
    /// Read-modify-write of the full record: the 128 interpreted bytes are
    /// re-encoded, any revision-1 trailer is carried through unchanged.
    pub fn write_inode(&self, ino: InodeNumber, inode: &Inode) -> Result<()> {
        let location = self.inode_location(ino)?;
        let mut raw = vec![0_u8; usize::from(self.sb.inode_record_size())];
        self.dev.read_exact_at(location, &mut raw)?;
        inode
            .encode_into(&mut raw)
            .map_err(|e| Ext2Error::Format(e.to_string()))?;
        self.dev.write_all_at(location, &raw)
    }

    // ── Path resolution ─────────────────────────────────────────────────

    /// Resolve `path` to an inode number.
    ///
    /// `path` and `origin` are byte strings; see `resolve_at` for an inode
    /// origin. An empty `origin` is only valid with an absolute `path`.
    pub fn resolve(&self, path: impl AsRef<[u8]>, origin: impl AsRef<[u8]>) -> Result<InodeNumber> {
        path::resolve(self, path.as_ref(), origin.as_ref())
    }

    /// Resolve `path` against an origin inode (absolute paths still resolve
    /// from the root).
    pub fn resolve_at(&self, origin: InodeNumber, path: impl AsRef<[u8]>) -> Result<InodeNumber> {
        path::resolve_at(self, origin, path.as_ref())
    }

    /// File format of a directory entry.
    ///
    /// The entry's type byte is authoritative only on volumes advertising
    /// typed entries; everywhere else (including every volume this driver
    /// currently mounts, since incompat features are refused) the target
    /// inode's mode decides.
    pub(crate) fn classify_entry(&self, header: &DirEntryHeader) -> Result<FileKind> {
        if self.sb.dirent_has_file_type() {
            if let Some(kind) = FileKind::from_dirent_byte(header.file_type) {
                return Ok(kind);
            }
        }
        Ok(self.inode(InodeNumber(header.inode))?.kind())
    }

    // ── Public surface ──────────────────────────────────────────────────

    /// Open a directory by path.
    pub fn open_dir(&self, path: impl AsRef<[u8]>, origin: impl AsRef<[u8]>) -> Result<Dir> {
        let path = path.as_ref();
        let ino = self.resolve(path, origin)?;
        let inode = self.inode(ino)?;
        if !inode.is_directory() {
            return Err(Ext2Error::NotADirectory(
                String::from_utf8_lossy(path).into_owned(),
            ));
        }
        Ok(Dir {
            ino,
            inode,
            vol: self.this.clone(),
        })
    }

    /// Open a regular file by path.
    pub fn open_file(&self, path: impl AsRef<[u8]>, origin: impl AsRef<[u8]>) -> Result<File> {
        let ino = self.resolve(path, origin)?;
        let inode = self.inode(ino)?;
        match inode.kind() {
            FileKind::Regular => Ok(File {
                ino,
                inode,
                vol: self.this.clone(),
            }),
            FileKind::Directory => Err(Ext2Error::IsDirectory),
            _ => Err(Ext2Error::InvalidArgument("not a regular file")),
        }
    }

    /// Stat a path: touch the access time, write the inode back, project
    /// into a platform-agnostic record. A failed write-back fails the stat.
    pub fn stat(&self, path: impl AsRef<[u8]>, origin: impl AsRef<[u8]>) -> Result<FileStat> {
        let ino = self.resolve(path, origin)?;
        let mut inode = self.inode(ino)?;
        inode.atime = unix_now_secs();
        self.write_inode(ino, &inode)?;

        Ok(FileStat {
            ino: ino.0,
            mode: inode.mode,
            nlink: inode.links_count,
            uid: inode.uid,
            gid: inode.gid,
            size: inode.size_bytes(),
            block_size: self.sb.block_size().get(),
            blocks: inode.blocks,
            atime: inode.atime,
            mtime: inode.mtime,
            ctime: inode.ctime,
        })
    }
}

impl Drop for Volume {
    /// Unmount: flip the state back to clean and flush the superblock.
    /// Best-effort — the caller has already released the volume, so failures
    /// are logged and swallowed; a failed flush leaves the on-disk state
    /// dirty, which the next mount refuses.
    fn drop(&mut self) {
        self.sb.state = STATE_VALID;
        self.sb.wtime = unix_now_secs();

        let region = self.sb.encode_region();
        if let Err(error) = self
            .dev
            .write_all_at(ByteOffset(EXT2_SUPERBLOCK_OFFSET), &region)
        {
            warn!(target: "e2fs::mount", %error, "superblock write-back failed on unmount");
            return;
        }
        if let Err(error) = self.dev.sync() {
            warn!(target: "e2fs::mount", %error, "device sync failed on unmount");
        }
        debug!(target: "e2fs::mount", "unmounted cleanly");
    }
}

/// Mount-time superblock summary, on the debug channel.
fn log_mount_summary(sb: &Superblock) {
    debug!(
        target: "e2fs::mount",
        inodes = sb.inodes_count,
        free_inodes = sb.free_inodes_count,
        blocks = sb.blocks_count,
        free_blocks = sb.free_blocks_count,
        block_groups = sb.block_groups(),
        inodes_per_group = sb.inodes_per_group,
        blocks_per_group = sb.blocks_per_group,
        block_size = sb.block_size().get(),
        inode_size = sb.inode_record_size(),
        rev_level = sb.rev_level,
        minor_rev = sb.minor_rev_level,
        mnt_count = sb.mnt_count,
        max_mnt_count = sb.max_mnt_count,
        last_mount_time = sb.mtime,
        last_check_time = sb.lastcheck,
        check_interval = sb.checkinterval,
        creator_os = e2fs_ondisk::creator_os_name(sb.creator_os),
        resuid = sb.def_resuid,
        resgid = sb.def_resgid,
        uuid = %sb.uuid_str(),
        volume_name = %sb.volume_name_str(),
        last_mounted = %sb.last_mounted_str(),
        "mounting ext2 volume"
    );
    debug!(
        target: "e2fs::mount",
        compat = %format!("{:#010x}", sb.feature_compat),
        incompat = %format!("{:#010x}", sb.feature_incompat),
        ro_compat = %format!("{:#010x}", sb.feature_ro_compat),
        algo_bitmap = %format!("{:#010x}", sb.algo_bitmap),
        prealloc_blocks = sb.prealloc_blocks,
        prealloc_dir_blocks = sb.prealloc_dir_blocks,
        "feature flags"
    );
}
