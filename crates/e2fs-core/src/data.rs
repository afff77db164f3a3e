//! The inode data engine.
//!
//! Maps a logical byte range of a file onto device offsets through the
//! direct/indirect/doubly-indirect/triply-indirect block tree, caching the
//! pointer block loaded at each level so that contiguous ranges cost one
//! pointer read per indirect page.

use crate::Volume;
use e2fs_error::{Ext2Error, Result};
use e2fs_ondisk::Inode;
use e2fs_types::{
    read_le_u32, BlockNumber, ByteOffset, EXT2_DIND_BLOCK, EXT2_IND_BLOCK, EXT2_NDIR_BLOCKS,
    EXT2_TIND_BLOCK,
};

/// Cache levels, innermost first. The inner slot holds the pointer block
/// whose entries are data block numbers; the middle and top slots hold the
/// outer pages of double and triple indirection. Slots are keyed by block
/// number, so a change of outer index misses and reloads.
const L_INNER: usize = 0;
const L_MIDDLE: usize = 1;
const L_TOP: usize = 2;

#[derive(Default)]
struct PointerCache {
    slots: [Option<(u32, Vec<u8>)>; 3],
}

impl PointerCache {
    /// Read entry `index` of the pointer block `block`, loading it into the
    /// given cache level unless it is already resident.
    fn entry(
        &mut self,
        vol: &Volume,
        level: usize,
        block: BlockNumber,
        index: u64,
    ) -> Result<BlockNumber> {
        if let Some((cached, data)) = &self.slots[level] {
            if *cached == block.0 {
                return read_pointer(data, index);
            }
        }

        let block_size = vol.superblock().block_size();
        let mut data = vec![0_u8; block_size.get() as usize];
        vol.device()
            .read_exact_at(block_size.block_to_byte(block), &mut data)?;
        let value = read_pointer(&data, index)?;
        self.slots[level] = Some((block.0, data));
        Ok(value)
    }
}

fn read_pointer(data: &[u8], index: u64) -> Result<BlockNumber> {
    let offset = usize::try_from(index)
        .ok()
        .and_then(|i| i.checked_mul(4))
        .ok_or(Ext2Error::InvalidArgument("pointer index out of range"))?;
    read_le_u32(data, offset)
        .map(BlockNumber)
        .map_err(|e| Ext2Error::Format(e.to_string()))
}

/// Resolve logical block `index` of `inode` to a physical block number.
///
/// A zero anywhere along the chain is a hole and propagates as block 0.
fn lookup_block(
    vol: &Volume,
    inode: &Inode,
    index: u64,
    cache: &mut PointerCache,
) -> Result<BlockNumber> {
    let p = u64::from(vol.superblock().block_size().pointers_per_block());
    let direct = EXT2_NDIR_BLOCKS as u64;

    if index < direct {
        return Ok(BlockNumber(inode.block[index as usize]));
    }

    let mut k = index - direct;
    if k < p {
        let ind = inode.block[EXT2_IND_BLOCK];
        if ind == 0 {
            return Ok(BlockNumber(0));
        }
        return cache.entry(vol, L_INNER, BlockNumber(ind), k);
    }

    k -= p;
    if k < p * p {
        let dind = inode.block[EXT2_DIND_BLOCK];
        if dind == 0 {
            return Ok(BlockNumber(0));
        }
        let inner = cache.entry(vol, L_MIDDLE, BlockNumber(dind), k / p)?;
        if inner.0 == 0 {
            return Ok(BlockNumber(0));
        }
        return cache.entry(vol, L_INNER, inner, k % p);
    }

    k -= p * p;
    if k < p * p * p {
        let tind = inode.block[EXT2_TIND_BLOCK];
        if tind == 0 {
            return Ok(BlockNumber(0));
        }
        let middle = cache.entry(vol, L_TOP, BlockNumber(tind), k / (p * p))?;
        if middle.0 == 0 {
            return Ok(BlockNumber(0));
        }
        let inner = cache.entry(vol, L_MIDDLE, middle, (k % (p * p)) / p)?;
        if inner.0 == 0 {
            return Ok(BlockNumber(0));
        }
        return cache.entry(vol, L_INNER, inner, k % p);
    }

    Err(Ext2Error::FileTooLarge { block_index: index })
}

/// Read `buf.len()` bytes of `inode`'s data starting at logical `offset`.
///
/// The range must lie within `i_size`; callers clamp. A fresh physical block
/// number is fetched for every block index — only the pointer pages are
/// cached. Holes (zero block numbers) read as zeroes.
pub(crate) fn read_inode_data(
    vol: &Volume,
    inode: &Inode,
    offset: u64,
    buf: &mut [u8],
) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }

    let len = buf.len() as u64;
    let end = offset
        .checked_add(len)
        .ok_or(Ext2Error::InvalidArgument("read range overflows"))?;
    if end > inode.size_bytes() {
        return Err(Ext2Error::InvalidArgument("read past end of inode data"));
    }

    let block_size = vol.superblock().block_size();
    let b = u64::from(block_size.get());
    let mut cache = PointerCache::default();

    let mut pos = 0_usize;
    let mut block_index = offset / b;
    let mut in_block = offset % b;

    while pos < buf.len() {
        let chunk = usize::try_from(b - in_block)
            .unwrap_or(buf.len())
            .min(buf.len() - pos);
        let phys = lookup_block(vol, inode, block_index, &mut cache)?;
        if phys.0 == 0 {
            buf[pos..pos + chunk].fill(0);
        } else {
            let dev_offset = ByteOffset(block_size.block_to_byte(phys).0 + in_block);
            vol.device()
                .read_exact_at(dev_offset, &mut buf[pos..pos + chunk])?;
        }
        pos += chunk;
        block_index += 1;
        in_block = 0;
    }

    Ok(())
}
