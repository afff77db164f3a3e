#![forbid(unsafe_code)]
//! Byte-exact ext2 on-disk structures.
//!
//! All multi-byte integers are little-endian. Parsing validates shape and
//! magic; feature and state policy live in `e2fs-core`. Encoding reproduces
//! the parsed bytes exactly (reserved regions are carried through) so the
//! superblock can be written back on unmount without clobbering fields this
//! driver does not interpret.

use e2fs_types::{
    ensure_slice, read_fixed, read_le_u16, read_le_u32, trim_nul_padded, BlockSize, ByteOffset,
    GroupNumber, InodeNumber, ParseError, EXT2_GROUP_DESC_SIZE, EXT2_INODE_BASE_SIZE,
    EXT2_N_BLOCKS, EXT2_SUPERBLOCK_OFFSET, EXT2_SUPERBLOCK_SIZE, EXT2_SUPER_MAGIC,
};
use serde::{Deserialize, Serialize};

// ── Filesystem state (s_state) ──────────────────────────────────────────────

pub const STATE_VALID: u16 = 1;
pub const STATE_HAS_ERRORS: u16 = 2;

// ── Error handling policy (s_errors) ────────────────────────────────────────

pub const ERRORS_IGNORE: u16 = 1;
pub const ERRORS_REMOUNT_RO: u16 = 2;
pub const ERRORS_PANIC: u16 = 3;

// ── Revision levels (s_rev_level) ───────────────────────────────────────────

pub const REV_GOOD_OLD: u32 = 0;
pub const REV_DYNAMIC: u32 = 1;

// ── Creator OS (s_creator_os) ───────────────────────────────────────────────

pub const OS_LINUX: u32 = 0;
pub const OS_HURD: u32 = 1;
pub const OS_MASIX: u32 = 2;
pub const OS_FREEBSD: u32 = 3;
pub const OS_LITES: u32 = 4;

/// Human-readable creator-OS name for diagnostics.
#[must_use]
pub fn creator_os_name(os: u32) -> &'static str {
    match os {
        OS_LINUX => "Linux",
        OS_HURD => "GNU Hurd",
        OS_MASIX => "Masix",
        OS_FREEBSD => "FreeBSD",
        OS_LITES => "Lites",
        _ => "unknown",
    }
}

// ── Feature flags ───────────────────────────────────────────────────────────

pub const FEATURE_COMPAT_DIR_PREALLOC: u32 = 0x0001;
pub const FEATURE_COMPAT_IMAGIC_INODES: u32 = 0x0002;
pub const FEATURE_COMPAT_HAS_JOURNAL: u32 = 0x0004;
pub const FEATURE_COMPAT_EXT_ATTR: u32 = 0x0008;
pub const FEATURE_COMPAT_RESIZE_INO: u32 = 0x0010;
pub const FEATURE_COMPAT_DIR_INDEX: u32 = 0x0020;

pub const FEATURE_INCOMPAT_COMPRESSION: u32 = 0x0001;
pub const FEATURE_INCOMPAT_FILETYPE: u32 = 0x0002;
pub const FEATURE_INCOMPAT_RECOVER: u32 = 0x0004;
pub const FEATURE_INCOMPAT_JOURNAL_DEV: u32 = 0x0008;
pub const FEATURE_INCOMPAT_META_BG: u32 = 0x0010;

pub const FEATURE_RO_COMPAT_SPARSE_SUPER: u32 = 0x0001;
pub const FEATURE_RO_COMPAT_LARGE_FILE: u32 = 0x0002;
pub const FEATURE_RO_COMPAT_BTREE_DIR: u32 = 0x0004;

/// First non-reserved inode on revision-0 volumes.
pub const GOOD_OLD_FIRST_INO: u32 = 11;

// ── Superblock ──────────────────────────────────────────────────────────────

/// The 1024-byte superblock at device offset 1024.
///
/// Every on-disk field is carried, including ones this driver never
/// interprets, so `encode_region` round-trips the record byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    pub inodes_count: u32,
    pub blocks_count: u32,
    pub r_blocks_count: u32,
    pub free_blocks_count: u32,
    pub free_inodes_count: u32,
    pub first_data_block: u32,
    pub log_block_size: u32,
    pub log_frag_size: u32,
    pub blocks_per_group: u32,
    pub frags_per_group: u32,
    pub inodes_per_group: u32,
    pub mtime: u32,
    pub wtime: u32,
    pub mnt_count: u16,
    pub max_mnt_count: u16,
    pub magic: u16,
    pub state: u16,
    pub errors: u16,
    pub minor_rev_level: u16,
    pub lastcheck: u32,
    pub checkinterval: u32,
    pub creator_os: u32,
    pub rev_level: u32,
    pub def_resuid: u16,
    pub def_resgid: u16,

    // Revision-1 fields (zero on revision-0 volumes).
    pub first_ino: u32,
    pub inode_size: u16,
    pub block_group_nr: u16,
    pub feature_compat: u32,
    pub feature_incompat: u32,
    pub feature_ro_compat: u32,
    pub uuid: [u8; 16],
    pub volume_name: [u8; 16],
    pub last_mounted: [u8; 64],
    pub algo_bitmap: u32,
    pub prealloc_blocks: u8,
    pub prealloc_dir_blocks: u8,
    pub padding1: u16,
    pub journal_uuid: [u8; 16],
    pub journal_inum: u32,
    pub journal_dev: u32,
    pub last_orphan: u32,
    pub hash_seed: [u32; 4],
    pub def_hash_version: u8,
    pub padding2: [u8; 3],
    pub default_mount_options: u32,
    pub first_meta_bg: u32,
    /// Bytes 264..1024, preserved verbatim for write-back.
    pub reserved: Vec<u8>,

    /// Derived from `log_block_size` at parse time.
    block_size: BlockSize,
}

impl Superblock {
    /// Parse a superblock from a 1024-byte superblock region.
    pub fn parse_region(region: &[u8]) -> Result<Self, ParseError> {
        if region.len() < EXT2_SUPERBLOCK_SIZE {
            return Err(ParseError::InsufficientData {
                needed: EXT2_SUPERBLOCK_SIZE,
                offset: 0,
                actual: region.len(),
            });
        }

        let magic = read_le_u16(region, 56)?;
        if magic != EXT2_SUPER_MAGIC {
            return Err(ParseError::InvalidMagic {
                expected: EXT2_SUPER_MAGIC,
                actual: magic,
            });
        }

        let log_block_size = read_le_u32(region, 24)?;
        let block_size = BlockSize::from_log(log_block_size)?;

        let hash_seed_raw = read_fixed::<16>(region, 236)?;
        let mut hash_seed = [0_u32; 4];
        for (i, seed) in hash_seed.iter_mut().enumerate() {
            *seed = read_le_u32(&hash_seed_raw, i * 4)?;
        }

        Ok(Self {
            inodes_count: read_le_u32(region, 0)?,
            blocks_count: read_le_u32(region, 4)?,
            r_blocks_count: read_le_u32(region, 8)?,
            free_blocks_count: read_le_u32(region, 12)?,
            free_inodes_count: read_le_u32(region, 16)?,
            first_data_block: read_le_u32(region, 20)?,
            log_block_size,
            log_frag_size: read_le_u32(region, 28)?,
            blocks_per_group: read_le_u32(region, 32)?,
            frags_per_group: read_le_u32(region, 36)?,
            inodes_per_group: read_le_u32(region, 40)?,
            mtime: read_le_u32(region, 44)?,
            wtime: read_le_u32(region, 48)?,
            mnt_count: read_le_u16(region, 52)?,
            max_mnt_count: read_le_u16(region, 54)?,
            magic,
            state: read_le_u16(region, 58)?,
            errors: read_le_u16(region, 60)?,
            minor_rev_level: read_le_u16(region, 62)?,
            lastcheck: read_le_u32(region, 64)?,
            checkinterval: read_le_u32(region, 68)?,
            creator_os: read_le_u32(region, 72)?,
            rev_level: read_le_u32(region, 76)?,
            def_resuid: read_le_u16(region, 80)?,
            def_resgid: read_le_u16(region, 82)?,

            first_ino: read_le_u32(region, 84)?,
            inode_size: read_le_u16(region, 88)?,
            block_group_nr: read_le_u16(region, 90)?,
            feature_compat: read_le_u32(region, 92)?,
            feature_incompat: read_le_u32(region, 96)?,
            feature_ro_compat: read_le_u32(region, 100)?,
            uuid: read_fixed::<16>(region, 104)?,
            volume_name: read_fixed::<16>(region, 120)?,
            last_mounted: read_fixed::<64>(region, 136)?,
            algo_bitmap: read_le_u32(region, 200)?,
            prealloc_blocks: ensure_slice(region, 204, 1)?[0],
            prealloc_dir_blocks: ensure_slice(region, 205, 1)?[0],
            padding1: read_le_u16(region, 206)?,
            journal_uuid: read_fixed::<16>(region, 208)?,
            journal_inum: read_le_u32(region, 224)?,
            journal_dev: read_le_u32(region, 228)?,
            last_orphan: read_le_u32(region, 232)?,
            hash_seed,
            def_hash_version: ensure_slice(region, 252, 1)?[0],
            padding2: read_fixed::<3>(region, 253)?,
            default_mount_options: read_le_u32(region, 256)?,
            first_meta_bg: read_le_u32(region, 260)?,
            reserved: region[264..EXT2_SUPERBLOCK_SIZE].to_vec(),

            block_size,
        })
    }

    /// Parse a superblock from a full disk image.
    pub fn parse_from_image(image: &[u8]) -> Result<Self, ParseError> {
        let offset = EXT2_SUPERBLOCK_OFFSET as usize;
        let region = ensure_slice(image, offset, EXT2_SUPERBLOCK_SIZE)?;
        Self::parse_region(region)
    }

    /// Encode the superblock into its 1024-byte on-disk form.
    #[must_use]
    pub fn encode_region(&self) -> [u8; EXT2_SUPERBLOCK_SIZE] {
        let mut out = [0_u8; EXT2_SUPERBLOCK_SIZE];

        out[0..4].copy_from_slice(&self.inodes_count.to_le_bytes());
        out[4..8].copy_from_slice(&self.blocks_count.to_le_bytes());
        out[8..12].copy_from_slice(&self.r_blocks_count.to_le_bytes());
        out[12..16].copy_from_slice(&self.free_blocks_count.to_le_bytes());
        out[16..20].copy_from_slice(&self.free_inodes_count.to_le_bytes());
        out[20..24].copy_from_slice(&self.first_data_block.to_le_bytes());
        out[24..28].copy_from_slice(&self.log_block_size.to_le_bytes());
        out[28..32].copy_from_slice(&self.log_frag_size.to_le_bytes());
        out[32..36].copy_from_slice(&self.blocks_per_group.to_le_bytes());
        out[36..40].copy_from_slice(&self.frags_per_group.to_le_bytes());
        out[40..44].copy_from_slice(&self.inodes_per_group.to_le_bytes());
        out[44..48].copy_from_slice(&self.mtime.to_le_bytes());
        out[48..52].copy_from_slice(&self.wtime.to_le_bytes());
        out[52..54].copy_from_slice(&self.mnt_count.to_le_bytes());
        out[54..56].copy_from_slice(&self.max_mnt_count.to_le_bytes());
        out[56..58].copy_from_slice(&self.magic.to_le_bytes());
        out[58..60].copy_from_slice(&self.state.to_le_bytes());
        out[60..62].copy_from_slice(&self.errors.to_le_bytes());
        out[62..64].copy_from_slice(&self.minor_rev_level.to_le_bytes());
        out[64..68].copy_from_slice(&self.lastcheck.to_le_bytes());
        out[68..72].copy_from_slice(&self.checkinterval.to_le_bytes());
        out[72..76].copy_from_slice(&self.creator_os.to_le_bytes());
        out[76..80].copy_from_slice(&self.rev_level.to_le_bytes());
        out[80..82].copy_from_slice(&self.def_resuid.to_le_bytes());
        out[82..84].copy_from_slice(&self.def_resgid.to_le_bytes());

        out[84..88].copy_from_slice(&self.first_ino.to_le_bytes());
        out[88..90].copy_from_slice(&self.inode_size.to_le_bytes());
        out[90..92].copy_from_slice(&self.block_group_nr.to_le_bytes());
        out[92..96].copy_from_slice(&self.feature_compat.to_le_bytes());
        out[96..100].copy_from_slice(&self.feature_incompat.to_le_bytes());
        out[100..104].copy_from_slice(&self.feature_ro_compat.to_le_bytes());
        out[104..120].copy_from_slice(&self.uuid);
        out[120..136].copy_from_slice(&self.volume_name);
        out[136..200].copy_from_slice(&self.last_mounted);
        out[200..204].copy_from_slice(&self.algo_bitmap.to_le_bytes());
        out[204] = self.prealloc_blocks;
        out[205] = self.prealloc_dir_blocks;
        out[206..208].copy_from_slice(&self.padding1.to_le_bytes());
        out[208..224].copy_from_slice(&self.journal_uuid);
        out[224..228].copy_from_slice(&self.journal_inum.to_le_bytes());
        out[228..232].copy_from_slice(&self.journal_dev.to_le_bytes());
        out[232..236].copy_from_slice(&self.last_orphan.to_le_bytes());
        for (i, seed) in self.hash_seed.iter().enumerate() {
            out[236 + i * 4..240 + i * 4].copy_from_slice(&seed.to_le_bytes());
        }
        out[252] = self.def_hash_version;
        out[253..256].copy_from_slice(&self.padding2);
        out[256..260].copy_from_slice(&self.default_mount_options.to_le_bytes());
        out[260..264].copy_from_slice(&self.first_meta_bg.to_le_bytes());

        let tail = self.reserved.len().min(EXT2_SUPERBLOCK_SIZE - 264);
        out[264..264 + tail].copy_from_slice(&self.reserved[..tail]);

        out
    }

    #[must_use]
    pub fn block_size(&self) -> BlockSize {
        self.block_size
    }

    /// Number of block groups (`ceil(blocks_count / blocks_per_group)`).
    #[must_use]
    pub fn block_groups(&self) -> u32 {
        if self.blocks_per_group == 0 {
            return 0;
        }
        self.blocks_count.div_ceil(self.blocks_per_group)
    }

    /// Size of one on-disk inode record.
    ///
    /// Revision 0 fixes this at 128; revision 1 carries it in the superblock.
    #[must_use]
    pub fn inode_record_size(&self) -> u16 {
        if self.rev_level >= REV_DYNAMIC {
            self.inode_size
        } else {
            EXT2_INODE_BASE_SIZE
        }
    }

    #[must_use]
    pub fn has_compat(&self, mask: u32) -> bool {
        (self.feature_compat & mask) != 0
    }

    #[must_use]
    pub fn has_incompat(&self, mask: u32) -> bool {
        (self.feature_incompat & mask) != 0
    }

    #[must_use]
    pub fn has_ro_compat(&self, mask: u32) -> bool {
        (self.feature_ro_compat & mask) != 0
    }

    /// Whether directory entries carry an authoritative file-type byte.
    ///
    /// Valid only when the FileType incompatible feature is advertised, not
    /// merely when the revision is >= 1.
    #[must_use]
    pub fn dirent_has_file_type(&self) -> bool {
        self.rev_level >= REV_DYNAMIC && self.has_incompat(FEATURE_INCOMPAT_FILETYPE)
    }

    #[must_use]
    pub fn volume_name_str(&self) -> String {
        trim_nul_padded(&self.volume_name)
    }

    #[must_use]
    pub fn last_mounted_str(&self) -> String {
        trim_nul_padded(&self.last_mounted)
    }

    #[must_use]
    pub fn uuid_str(&self) -> String {
        let u = &self.uuid;
        format!(
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            u[0], u[1], u[2], u[3], u[4], u[5], u[6], u[7],
            u[8], u[9], u[10], u[11], u[12], u[13], u[14], u[15],
        )
    }

    /// Validate basic geometry: per-group counts, inode size, first data block.
    pub fn validate_geometry(&self) -> Result<(), ParseError> {
        if self.blocks_per_group == 0 {
            return Err(ParseError::InvalidField {
                field: "s_blocks_per_group",
                reason: "cannot be zero",
            });
        }
        if self.inodes_per_group == 0 {
            return Err(ParseError::InvalidField {
                field: "s_inodes_per_group",
                reason: "cannot be zero",
            });
        }
        if self.first_data_block >= self.blocks_count {
            return Err(ParseError::InvalidField {
                field: "s_first_data_block",
                reason: "first_data_block >= blocks_count",
            });
        }
        if self.rev_level >= REV_DYNAMIC {
            if self.inode_size < EXT2_INODE_BASE_SIZE {
                return Err(ParseError::InvalidField {
                    field: "s_inode_size",
                    reason: "must be >= 128",
                });
            }
            if !self.inode_size.is_power_of_two() {
                return Err(ParseError::InvalidField {
                    field: "s_inode_size",
                    reason: "must be a power of two",
                });
            }
            if u32::from(self.inode_size) > self.block_size.get() {
                return Err(ParseError::InvalidField {
                    field: "s_inode_size",
                    reason: "exceeds block size",
                });
            }
        }
        Ok(())
    }

    /// Byte offset of a group descriptor within the descriptor table.
    ///
    /// The table occupies the block after the one holding the superblock:
    /// block `s_first_data_block + 1` (block 2 for 1K blocks, block 1
    /// otherwise).
    #[must_use]
    pub fn group_desc_offset(&self, group: GroupNumber) -> ByteOffset {
        let gdt_block = u64::from(self.first_data_block) + 1;
        let start = gdt_block * u64::from(self.block_size.get());
        ByteOffset(start + u64::from(group.0) * EXT2_GROUP_DESC_SIZE as u64)
    }

    /// Locate an inode within its group's inode table.
    ///
    /// Returns `(group, index_in_group, byte_offset_in_table)`. The caller
    /// reads the group descriptor for the table's starting block and adds the
    /// returned byte offset.
    #[must_use]
    pub fn inode_table_offset(&self, ino: InodeNumber) -> (GroupNumber, u32, u64) {
        let group = e2fs_types::inode_to_group(ino, self.inodes_per_group);
        let index = e2fs_types::inode_index_in_group(ino, self.inodes_per_group);
        let byte_offset = u64::from(index) * u64::from(self.inode_record_size());
        (group, index, byte_offset)
    }
}

// ── Block group descriptor ──────────────────────────────────────────────────

/// One 32-byte entry of the block group descriptor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDescriptor {
    pub block_bitmap: u32,
    pub inode_bitmap: u32,
    pub inode_table: u32,
    pub free_blocks_count: u16,
    pub free_inodes_count: u16,
    pub used_dirs_count: u16,
    pub pad: u16,
    pub reserved: [u8; 12],
}

impl GroupDescriptor {
    pub fn parse_from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() < EXT2_GROUP_DESC_SIZE {
            return Err(ParseError::InsufficientData {
                needed: EXT2_GROUP_DESC_SIZE,
                offset: 0,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            block_bitmap: read_le_u32(bytes, 0)?,
            inode_bitmap: read_le_u32(bytes, 4)?,
            inode_table: read_le_u32(bytes, 8)?,
            free_blocks_count: read_le_u16(bytes, 12)?,
            free_inodes_count: read_le_u16(bytes, 14)?,
            used_dirs_count: read_le_u16(bytes, 16)?,
            pad: read_le_u16(bytes, 18)?,
            reserved: read_fixed::<12>(bytes, 20)?,
        })
    }

    #[must_use]
    pub fn encode(&self) -> [u8; EXT2_GROUP_DESC_SIZE] {
        let mut out = [0_u8; EXT2_GROUP_DESC_SIZE];
        out[0..4].copy_from_slice(&self.block_bitmap.to_le_bytes());
        out[4..8].copy_from_slice(&self.inode_bitmap.to_le_bytes());
        out[8..12].copy_from_slice(&self.inode_table.to_le_bytes());
        out[12..14].copy_from_slice(&self.free_blocks_count.to_le_bytes());
        out[14..16].copy_from_slice(&self.free_inodes_count.to_le_bytes());
        out[16..18].copy_from_slice(&self.used_dirs_count.to_le_bytes());
        out[18..20].copy_from_slice(&self.pad.to_le_bytes());
        out[20..32].copy_from_slice(&self.reserved);
        out
    }
}

// ── File kinds ──────────────────────────────────────────────────────────────

/// File format, from the high nibble of `i_mode` or a directory entry's
/// type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    Unknown,
    Fifo,
    CharDev,
    Directory,
    BlockDev,
    Regular,
    Symlink,
    Socket,
}

/// File format mask within `i_mode`.
pub const MODE_FORMAT_MASK: u16 = 0xF000;

pub const MODE_SOCKET: u16 = 0xC000;
pub const MODE_SYMLINK: u16 = 0xA000;
pub const MODE_REGULAR: u16 = 0x8000;
pub const MODE_BLOCK_DEV: u16 = 0x6000;
pub const MODE_DIRECTORY: u16 = 0x4000;
pub const MODE_CHAR_DEV: u16 = 0x2000;
pub const MODE_FIFO: u16 = 0x1000;

impl FileKind {
    /// Classify from an inode's `i_mode`.
    #[must_use]
    pub fn from_mode(mode: u16) -> Self {
        match mode & MODE_FORMAT_MASK {
            MODE_SOCKET => Self::Socket,
            MODE_SYMLINK => Self::Symlink,
            MODE_REGULAR => Self::Regular,
            MODE_BLOCK_DEV => Self::BlockDev,
            MODE_DIRECTORY => Self::Directory,
            MODE_CHAR_DEV => Self::CharDev,
            MODE_FIFO => Self::Fifo,
            _ => Self::Unknown,
        }
    }

    /// Classify from a typed directory entry's `file_type` byte.
    ///
    /// Returns `None` for values outside the defined 1..=7 range; callers
    /// fall back to reading the target inode.
    #[must_use]
    pub fn from_dirent_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Regular),
            2 => Some(Self::Directory),
            3 => Some(Self::CharDev),
            4 => Some(Self::BlockDev),
            5 => Some(Self::Fifo),
            6 => Some(Self::Socket),
            7 => Some(Self::Symlink),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_directory(self) -> bool {
        self == Self::Directory
    }
}

// ── Inode ───────────────────────────────────────────────────────────────────

/// The 128 interpreted bytes of an on-disk inode record.
///
/// Revision-1 volumes may store larger records; the trailer is left on disk
/// untouched by `write` paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inode {
    pub mode: u16,
    pub uid: u16,
    pub size: u32,
    pub atime: u32,
    pub ctime: u32,
    pub mtime: u32,
    pub dtime: u32,
    pub gid: u16,
    pub links_count: u16,
    /// Count of 512-byte sectors, not filesystem blocks.
    pub blocks: u32,
    pub flags: u32,
    pub osd1: u32,
    pub block: [u32; EXT2_N_BLOCKS],
    pub generation: u32,
    pub file_acl: u32,
    pub dir_acl: u32,
    pub faddr: u32,
    pub osd2: [u8; 12],
}

impl Inode {
    /// Parse the first 128 bytes of an inode record.
    pub fn parse_from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let base = usize::from(EXT2_INODE_BASE_SIZE);
        if bytes.len() < base {
            return Err(ParseError::InsufficientData {
                needed: base,
                offset: 0,
                actual: bytes.len(),
            });
        }

        let mut block = [0_u32; EXT2_N_BLOCKS];
        for (i, slot) in block.iter_mut().enumerate() {
            *slot = read_le_u32(bytes, 40 + i * 4)?;
        }

        Ok(Self {
            mode: read_le_u16(bytes, 0)?,
            uid: read_le_u16(bytes, 2)?,
            size: read_le_u32(bytes, 4)?,
            atime: read_le_u32(bytes, 8)?,
            ctime: read_le_u32(bytes, 12)?,
            mtime: read_le_u32(bytes, 16)?,
            dtime: read_le_u32(bytes, 20)?,
            gid: read_le_u16(bytes, 24)?,
            links_count: read_le_u16(bytes, 26)?,
            blocks: read_le_u32(bytes, 28)?,
            flags: read_le_u32(bytes, 32)?,
            osd1: read_le_u32(bytes, 36)?,
            block,
            generation: read_le_u32(bytes, 100)?,
            file_acl: read_le_u32(bytes, 104)?,
            dir_acl: read_le_u32(bytes, 108)?,
            faddr: read_le_u32(bytes, 112)?,
            osd2: read_fixed::<12>(bytes, 116)?,
        })
    }

    /// Encode the 128 interpreted bytes into `out[..128]`.
    ///
    /// `out` may be a full revision-1 record; bytes past 128 are untouched.
    pub fn encode_into(&self, out: &mut [u8]) -> Result<(), ParseError> {
        let base = usize::from(EXT2_INODE_BASE_SIZE);
        if out.len() < base {
            return Err(ParseError::InsufficientData {
                needed: base,
                offset: 0,
                actual: out.len(),
            });
        }

        out[0..2].copy_from_slice(&self.mode.to_le_bytes());
        out[2..4].copy_from_slice(&self.uid.to_le_bytes());
        out[4..8].copy_from_slice(&self.size.to_le_bytes());
        out[8..12].copy_from_slice(&self.atime.to_le_bytes());
        out[12..16].copy_from_slice(&self.ctime.to_le_bytes());
        out[16..20].copy_from_slice(&self.mtime.to_le_bytes());
        out[20..24].copy_from_slice(&self.dtime.to_le_bytes());
        out[24..26].copy_from_slice(&self.gid.to_le_bytes());
        out[26..28].copy_from_slice(&self.links_count.to_le_bytes());
        out[28..32].copy_from_slice(&self.blocks.to_le_bytes());
        out[32..36].copy_from_slice(&self.flags.to_le_bytes());
        out[36..40].copy_from_slice(&self.osd1.to_le_bytes());
        for (i, slot) in self.block.iter().enumerate() {
            out[40 + i * 4..44 + i * 4].copy_from_slice(&slot.to_le_bytes());
        }
        out[100..104].copy_from_slice(&self.generation.to_le_bytes());
        out[104..108].copy_from_slice(&self.file_acl.to_le_bytes());
        out[108..112].copy_from_slice(&self.dir_acl.to_le_bytes());
        out[112..116].copy_from_slice(&self.faddr.to_le_bytes());
        out[116..128].copy_from_slice(&self.osd2);
        Ok(())
    }

    #[must_use]
    pub fn kind(&self) -> FileKind {
        FileKind::from_mode(self.mode)
    }

    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.kind().is_directory()
    }

    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        u64::from(self.size)
    }
}

// ── Directory entries ───────────────────────────────────────────────────────

/// Fixed 8-byte header of a linked directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntryHeader {
    pub inode: u32,
    pub rec_len: u16,
    pub name_len: u8,
    /// Meaningful only when the superblock advertises typed entries.
    pub file_type: u8,
}

/// Size of the fixed directory entry header.
pub const DIR_ENTRY_HEADER_SIZE: usize = 8;

impl DirEntryHeader {
    pub fn parse_from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() < DIR_ENTRY_HEADER_SIZE {
            return Err(ParseError::InsufficientData {
                needed: DIR_ENTRY_HEADER_SIZE,
                offset: 0,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            inode: read_le_u32(bytes, 0)?,
            rec_len: read_le_u16(bytes, 4)?,
            name_len: bytes[6],
            file_type: bytes[7],
        })
    }

    /// Whether this entry names no object (`inode == 0`); its `rec_len`
    /// still chains to the next entry.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.inode == 0
    }
}
