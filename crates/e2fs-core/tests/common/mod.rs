//! Synthetic ext2 image builder.
//!
//! Builds minimal single-group images in memory: superblock, one group
//! descriptor, an inode table of 32 records, and bump-allocated data blocks.
//! No bitmaps — the driver never reads them. Layout for 1K blocks:
//!
//!   block 0: boot area
//!   block 1: superblock (byte offset 1024)
//!   block 2: group descriptor table
//!   block 3..7: inode table (32 inodes * 128 bytes)
//!   block 7..: data and pointer blocks
//!
//! For larger blocks the superblock sits inside block 0 and everything
//! shifts down by one.
#![allow(dead_code)]

pub const SB_OFFSET: usize = 1024;

pub const MODE_DIR: u16 = 0x4000 | 0o755;
pub const MODE_FILE: u16 = 0x8000 | 0o644;

pub struct ImageBuilder {
    bs: usize,
    image: Vec<u8>,
    next_block: u32,
    next_ino: u32,
    inodes_count: u32,
    first_data_block: u32,
    itable_block: u32,
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self::with_block_size(1024)
    }

    pub fn with_block_size(bs: usize) -> Self {
        assert!(bs.is_power_of_two() && (1024..=65536).contains(&bs));
        let first_data_block = if bs == 1024 { 1_u32 } else { 0 };
        let gdt_block = first_data_block + 1;
        let itable_block = gdt_block + 1;
        let inodes_count = 32_u32;
        let itable_blocks = (inodes_count as usize * 128).div_ceil(bs) as u32;

        let mut builder = Self {
            bs,
            image: Vec::new(),
            next_block: itable_block + itable_blocks,
            next_ino: 11,
            inodes_count,
            first_data_block,
            itable_block,
        };
        builder.ensure_block(builder.next_block - 1);
        builder
    }

    pub fn block_size(&self) -> usize {
        self.bs
    }

    fn ensure_block(&mut self, block: u32) {
        let need = (block as usize + 1) * self.bs;
        if self.image.len() < need {
            self.image.resize(need, 0);
        }
    }

    pub fn alloc_block(&mut self) -> u32 {
        let block = self.next_block;
        self.next_block += 1;
        self.ensure_block(block);
        block
    }

    /// Next free inode number (reserved range 1..=10 is left alone, root
    /// aside).
    pub fn alloc_ino(&mut self) -> u32 {
        let ino = self.next_ino;
        assert!(ino <= self.inodes_count, "inode table exhausted");
        self.next_ino += 1;
        ino
    }

    fn put(&mut self, offset: usize, bytes: &[u8]) {
        self.image[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Byte offset of an inode record; usable for post-hoc on-disk checks.
    pub fn inode_offset(&self, ino: u32) -> usize {
        self.itable_block as usize * self.bs + (ino as usize - 1) * 128
    }

    pub fn set_inode(&mut self, ino: u32, mode: u16, size: u32, links: u16, sectors: u32, map: [u32; 15]) {
        let off = self.inode_offset(ino);
        self.put(off, &mode.to_le_bytes());
        self.put(off + 4, &size.to_le_bytes());
        self.put(off + 12, &1_600_000_000_u32.to_le_bytes()); // ctime
        self.put(off + 16, &1_600_000_000_u32.to_le_bytes()); // mtime
        self.put(off + 26, &links.to_le_bytes());
        self.put(off + 28, &sectors.to_le_bytes());
        for (i, block) in map.iter().enumerate() {
            self.put(off + 40 + i * 4, &block.to_le_bytes());
        }
    }

    fn ptr_entry(&self, ptr_block: u32, index: u64) -> u32 {
        let off = ptr_block as usize * self.bs + index as usize * 4;
        u32::from_le_bytes(self.image[off..off + 4].try_into().unwrap())
    }

    fn set_ptr(&mut self, ptr_block: u32, index: u64, value: u32) {
        let off = ptr_block as usize * self.bs + index as usize * 4;
        self.put(off, &value.to_le_bytes());
    }

    fn get_or_alloc_child(&mut self, ptr_block: u32, index: u64) -> u32 {
        let current = self.ptr_entry(ptr_block, index);
        if current != 0 {
            return current;
        }
        let block = self.alloc_block();
        self.set_ptr(ptr_block, index, block);
        block
    }

    /// Install `data_block` as logical block `idx`, growing the indirect
    /// chains as needed.
    fn map_block(&mut self, map: &mut [u32; 15], idx: u64, data_block: u32) {
        let p = (self.bs / 4) as u64;
        if idx < 12 {
            map[idx as usize] = data_block;
            return;
        }
        let mut k = idx - 12;
        if k < p {
            if map[12] == 0 {
                map[12] = self.alloc_block();
            }
            self.set_ptr(map[12], k, data_block);
            return;
        }
        k -= p;
        if k < p * p {
            if map[13] == 0 {
                map[13] = self.alloc_block();
            }
            let inner = self.get_or_alloc_child(map[13], k / p);
            self.set_ptr(inner, k % p, data_block);
            return;
        }
        k -= p * p;
        assert!(k < p * p * p, "logical block beyond triple indirection");
        if map[14] == 0 {
            map[14] = self.alloc_block();
        }
        let middle = self.get_or_alloc_child(map[14], k / (p * p));
        let inner = self.get_or_alloc_child(middle, (k % (p * p)) / p);
        self.set_ptr(inner, k % p, data_block);
    }

    /// Dense regular file holding `data`.
    pub fn add_file(&mut self, data: &[u8]) -> u32 {
        let ino = self.alloc_ino();
        let mut map = [0_u32; 15];
        let mut count = 0_u32;
        for (i, chunk) in data.chunks(self.bs).enumerate() {
            let block = self.alloc_block();
            let off = block as usize * self.bs;
            self.put(off, chunk);
            self.map_block(&mut map, i as u64, block);
            count += 1;
        }
        let sectors = count * (self.bs as u32 / 512);
        self.set_inode(ino, MODE_FILE, data.len() as u32, 1, sectors, map);
        ino
    }

    /// Sparse regular file of `size` bytes where only the listed logical
    /// blocks are materialized; everything else is a hole.
    pub fn add_sparse_file(&mut self, size: u32, chunks: &[(u64, &[u8])]) -> u32 {
        let ino = self.alloc_ino();
        let mut map = [0_u32; 15];
        let mut count = 0_u32;
        for (idx, data) in chunks {
            assert!(data.len() <= self.bs);
            let block = self.alloc_block();
            let off = block as usize * self.bs;
            self.put(off, data);
            self.map_block(&mut map, *idx, block);
            count += 1;
        }
        let sectors = count * (self.bs as u32 / 512);
        self.set_inode(ino, MODE_FILE, size, 1, sectors, map);
        ino
    }

    /// Pack `(name, inode, file_type)` entries into one directory block;
    /// the last entry's `rec_len` fills the block. An entry with inode 0 is
    /// written as a tombstone with its natural `rec_len`.
    pub fn dir_block(bs: usize, entries: &[(&[u8], u32, u8)]) -> Vec<u8> {
        let mut block = vec![0_u8; bs];
        let mut off = 0_usize;
        for (i, (name, ino, ftype)) in entries.iter().enumerate() {
            let need = (8 + name.len() + 3) & !3;
            let rec_len = if i == entries.len() - 1 { bs - off } else { need };
            assert!(rec_len >= need && off + rec_len <= bs, "directory block overflow");
            block[off..off + 4].copy_from_slice(&ino.to_le_bytes());
            block[off + 4..off + 6].copy_from_slice(&(rec_len as u16).to_le_bytes());
            block[off + 6] = name.len() as u8;
            block[off + 7] = *ftype;
            block[off + 8..off + 8 + name.len()].copy_from_slice(name);
            off += rec_len;
        }
        block
    }

    /// Directory whose single data block is given verbatim (corruption
    /// scenarios build their own bytes).
    pub fn add_dir_from_block(&mut self, ino: u32, block_bytes: &[u8], size: u32, links: u16) {
        assert!(block_bytes.len() <= self.bs);
        let block = self.alloc_block();
        let off = block as usize * self.bs;
        self.put(off, block_bytes);
        let mut map = [0_u32; 15];
        map[0] = block;
        self.set_inode(ino, MODE_DIR, size, links, self.bs as u32 / 512, map);
    }

    /// Directory at a fixed inode number (pass 2 for the root).
    pub fn add_dir(&mut self, ino: u32, entries: &[(&[u8], u32, u8)]) {
        let block = Self::dir_block(self.bs, entries);
        self.add_dir_from_block(ino, &block, self.bs as u32, 2);
    }

    /// Write the superblock and group descriptor, returning the image.
    pub fn finalize(mut self) -> Vec<u8> {
        let blocks_count = self.next_block;
        let log_block_size = (self.bs as u32 / 1024).trailing_zeros();
        let inodes_count = self.inodes_count;
        let first_data_block = self.first_data_block;
        let free_inodes = inodes_count - self.next_ino + 1;

        self.put(SB_OFFSET, &inodes_count.to_le_bytes());
        self.put(SB_OFFSET + 4, &blocks_count.to_le_bytes());
        self.put(SB_OFFSET + 16, &free_inodes.to_le_bytes());
        self.put(SB_OFFSET + 20, &first_data_block.to_le_bytes());
        self.put(SB_OFFSET + 24, &log_block_size.to_le_bytes());
        self.put(SB_OFFSET + 32, &blocks_count.max(8).to_le_bytes()); // one group
        self.put(SB_OFFSET + 40, &inodes_count.to_le_bytes());
        self.put(SB_OFFSET + 54, &20_u16.to_le_bytes()); // max_mnt_count
        self.put(SB_OFFSET + 56, &0xEF53_u16.to_le_bytes());
        self.put(SB_OFFSET + 58, &1_u16.to_le_bytes()); // state: valid
        self.put(SB_OFFSET + 60, &1_u16.to_le_bytes()); // errors: ignore

        let gdt_block = first_data_block + 1;
        let gd_off = gdt_block as usize * self.bs;
        let itable_block = self.itable_block;
        self.put(gd_off + 8, &itable_block.to_le_bytes());
        self.put(gd_off + 14, &(free_inodes as u16).to_le_bytes());

        self.image
    }
}
