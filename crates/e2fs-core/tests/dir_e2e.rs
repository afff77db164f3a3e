//! Directory enumeration, lookup edge cases, and handle lifecycles.

mod common;

use common::{ImageBuilder, MODE_DIR};
use e2fs_block::{FileByteDevice, MemByteDevice};
use e2fs_core::{Ext2Error, Volume};
use e2fs_types::{GroupNumber, InodeNumber};
use std::sync::Arc;

fn mount(image: Vec<u8>) -> Arc<Volume> {
    Volume::try_mount(Box::new(MemByteDevice::new(image))).expect("mount")
}

/// Write one raw directory entry; `name_len` may lie for corruption tests.
fn put_entry(
    block: &mut [u8],
    off: usize,
    ino: u32,
    rec_len: u16,
    name: &[u8],
    name_len: u8,
) {
    block[off..off + 4].copy_from_slice(&ino.to_le_bytes());
    block[off + 4..off + 6].copy_from_slice(&rec_len.to_le_bytes());
    block[off + 6] = name_len;
    block[off + 7] = 0;
    block[off + 8..off + 8 + name.len()].copy_from_slice(name);
}

#[test]
fn tombstones_skipped_but_paginated_over() {
    let mut b = ImageBuilder::new();
    let kept = b.add_file(b"kept");
    b.add_dir(
        2,
        &[
            (b".", 2, 2),
            (b"..", 2, 2),
            (b"gone", 0, 0), // tombstone: inode 0, rec_len still chains
            (b"kept", kept, 1),
        ],
    );
    let vol = mount(b.finalize());

    let names: Vec<_> = vol
        .open_dir("/", "")
        .expect("open /")
        .entries()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec![b".".to_vec(), b"..".to_vec(), b"kept".to_vec()]);

    // Lookup walks past the tombstone too.
    assert!(vol.resolve("/kept", "").is_ok());
    assert!(matches!(
        vol.resolve("/gone", ""),
        Err(Ext2Error::NotFound(_))
    ));
}

#[test]
fn zero_rec_len_terminates_iteration() {
    let bs = 1024;
    let mut block = vec![0_u8; bs];
    put_entry(&mut block, 0, 2, 12, b".", 1);
    put_entry(&mut block, 12, 2, 12, b"..", 2);
    put_entry(&mut block, 24, 5, 0, b"x", 1); // rec_len == 0: corrupt

    let mut b = ImageBuilder::new();
    b.add_dir_from_block(2, &block, bs as u32, 2);
    let vol = mount(b.finalize());

    let names: Vec<_> = vol
        .open_dir("/", "")
        .expect("open /")
        .entries()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec![b".".to_vec(), b"..".to_vec()]);

    // Lookup reports the corruption as absence.
    assert!(matches!(
        vol.resolve("/x", ""),
        Err(Ext2Error::NotFound(_))
    ));
}

#[test]
fn overlong_name_len_is_clamped() {
    let bs = 1024;
    let mut block = vec![0_u8; bs];
    put_entry(&mut block, 0, 2, 12, b".", 1);
    put_entry(&mut block, 12, 2, 12, b"..", 2);
    // name_len claims 200 bytes but the entry only spans rec_len 16.
    put_entry(&mut block, 24, 5, 16, b"abcdefgh", 200);
    // Terminator entry filling the rest of the block.
    put_entry(&mut block, 40, 6, (bs - 40) as u16, b"tail", 4);

    let mut b = ImageBuilder::new();
    b.add_dir_from_block(2, &block, bs as u32, 2);
    let vol = mount(b.finalize());

    let entries: Vec<_> = vol.open_dir("/", "").expect("open /").entries().collect();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[2].name, b"abcdefgh", "clamped to rec_len - 8");
    assert_eq!(entries[3].name, b"tail");
}

#[test]
fn resolution_is_associative_over_slash() {
    let mut b = ImageBuilder::new();
    let c = b.add_file(b"payload");
    let dir_b = b.alloc_ino();
    let dir_a = b.alloc_ino();
    b.add_dir(dir_b, &[(b".", dir_b, 2), (b"..", dir_a, 2), (b"c", c, 1)]);
    b.add_dir(dir_a, &[(b".", dir_a, 2), (b"..", 2, 2), (b"b", dir_b, 2)]);
    b.add_dir(2, &[(b".", 2, 2), (b"..", 2, 2), (b"a", dir_a, 2)]);
    let vol = mount(b.finalize());

    let direct = vol.resolve("/a/b/c", "").expect("direct");
    let a = vol.resolve("/a", "").expect("a");
    let via_inode = vol.resolve_at(a, "b/c").expect("via inode origin");
    let via_origin = vol.resolve("b/c", "/a").expect("via path origin");

    assert_eq!(direct, via_inode);
    assert_eq!(direct, via_origin);
    assert_eq!(direct, InodeNumber(c));

    // An absolute path ignores the origin.
    assert_eq!(vol.resolve("/a", "/a/b").expect("absolute"), a);
    assert_eq!(vol.resolve_at(InodeNumber(dir_b), "/a").expect("absolute at"), a);
}

#[test]
fn path_argument_validation() {
    let mut b = ImageBuilder::new();
    b.add_dir(2, &[(b".", 2, 2), (b"..", 2, 2)]);
    let vol = mount(b.finalize());

    assert!(matches!(
        vol.resolve("", ""),
        Err(Ext2Error::InvalidArgument(_))
    ));
    assert!(matches!(
        vol.resolve("relative", ""),
        Err(Ext2Error::InvalidArgument(_))
    ));
    assert!(matches!(
        vol.resolve("relative", "also/relative"),
        Err(Ext2Error::InvalidArgument(_))
    ));
    assert!(matches!(
        vol.resolve("/missing", ""),
        Err(Ext2Error::NotFound(_))
    ));
}

#[test]
fn all_slashes_resolve_to_root() {
    let mut b = ImageBuilder::new();
    b.add_dir(2, &[(b".", 2, 2), (b"..", 2, 2)]);
    let vol = mount(b.finalize());

    assert_eq!(vol.resolve("/", "").expect("slash"), InodeNumber::ROOT);
    assert_eq!(vol.resolve("////", "").expect("slashes"), InodeNumber::ROOT);
}

#[test]
fn intermediate_file_is_not_a_directory() {
    let mut b = ImageBuilder::new();
    let f = b.add_file(b"data");
    b.add_dir(2, &[(b".", 2, 2), (b"..", 2, 2), (b"f", f, 1)]);
    let vol = mount(b.finalize());

    assert!(matches!(
        vol.resolve("/f/child", ""),
        Err(Ext2Error::NotADirectory(_))
    ));
    // A trailing slash demands a directory as well.
    assert!(matches!(
        vol.resolve("/f/", ""),
        Err(Ext2Error::NotADirectory(_))
    ));
}

#[test]
fn handles_outlive_volume_but_report_it_gone() {
    let mut b = ImageBuilder::new();
    let f = b.add_file(b"data");
    b.add_dir(2, &[(b".", 2, 2), (b"..", 2, 2), (b"f", f, 1)]);
    let vol = mount(b.finalize());

    let root = vol.open_dir("/", "").expect("open /");
    let file = vol.open_file("/f", "").expect("open /f");
    assert_eq!(root.entries().count(), 3);

    drop(vol);

    assert_eq!(root.entries().count(), 0, "iteration ends once the volume is gone");
    let mut buf = [0_u8; 4];
    assert!(matches!(
        file.read_at(0, &mut buf),
        Err(Ext2Error::VolumeGone)
    ));
}

#[test]
fn stat_touches_atime_on_disk() {
    let mut b = ImageBuilder::new();
    b.add_dir(2, &[(b".", 2, 2), (b"..", 2, 2)]);
    let root_atime_offset = b.inode_offset(2) + 8;
    let image = b.finalize();

    let tmp = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(tmp.path(), &image).unwrap();
    let dev = FileByteDevice::open(tmp.path()).expect("open");
    let vol = Volume::try_mount(Box::new(dev)).expect("mount");

    let first = vol.stat("/", "").expect("stat");
    let on_disk = std::fs::read(tmp.path()).unwrap();
    let atime = u32::from_le_bytes(
        on_disk[root_atime_offset..root_atime_offset + 4]
            .try_into()
            .unwrap(),
    );
    assert!(atime >= 1_700_000_000, "access time written back");
    assert_eq!(atime, first.atime);

    // Idempotent apart from a non-decreasing access time.
    let second = vol.stat("/", "").expect("stat again");
    assert_eq!(second.ino, first.ino);
    assert_eq!(second.size, first.size);
    assert_eq!(second.mtime, first.mtime);
    assert!(second.atime >= first.atime);
}

#[test]
fn group_descriptor_round_trip() {
    let mut b = ImageBuilder::new();
    b.add_dir(2, &[(b".", 2, 2), (b"..", 2, 2)]);
    let vol = mount(b.finalize());

    let gd = vol.group_descriptor(GroupNumber(0)).expect("read gd");
    assert_eq!(gd.inode_table, 3);

    let mut updated = gd;
    updated.free_blocks_count = 123;
    vol.write_group_descriptor(GroupNumber(0), &updated)
        .expect("write gd");
    assert_eq!(
        vol.group_descriptor(GroupNumber(0)).expect("reread"),
        updated
    );

    assert!(matches!(
        vol.group_descriptor(GroupNumber(7)),
        Err(Ext2Error::InvalidArgument(_))
    ));
}

#[test]
fn inode_number_bounds_checked() {
    let mut b = ImageBuilder::new();
    b.add_dir(2, &[(b".", 2, 2), (b"..", 2, 2)]);
    let vol = mount(b.finalize());

    assert!(matches!(
        vol.inode(InodeNumber(0)),
        Err(Ext2Error::InvalidArgument(_))
    ));
    assert!(matches!(
        vol.inode(InodeNumber(33)),
        Err(Ext2Error::InvalidArgument(_))
    ));
    assert!(vol.inode(InodeNumber(2)).is_ok());
}

#[test]
fn multi_block_directory_enumerates_across_blocks() {
    // Two directory blocks; entries never straddle a block boundary, the
    // iterator just keeps walking offsets through the data engine.
    let bs = 1024;
    let mut b = ImageBuilder::new();
    let f1 = b.add_file(b"one");
    let f2 = b.add_file(b"two");
    let block1 = ImageBuilder::dir_block(bs, &[(b".", 2, 2), (b"..", 2, 2), (b"one", f1, 1)]);
    let block2 = ImageBuilder::dir_block(bs, &[(b"two", f2, 1)]);

    let blk_a = b.alloc_block();
    let blk_b = b.alloc_block();
    let mut map = [0_u32; 15];
    map[0] = blk_a;
    map[1] = blk_b;
    b.set_inode(2, MODE_DIR, (2 * bs) as u32, 2, 4, map);

    let mut image = b.finalize();
    image[blk_a as usize * bs..(blk_a as usize + 1) * bs].copy_from_slice(&block1);
    image[blk_b as usize * bs..(blk_b as usize + 1) * bs].copy_from_slice(&block2);

    let vol = mount(image);
    let names: Vec<_> = vol
        .open_dir("/", "")
        .expect("open /")
        .entries()
        .map(|e| e.name)
        .collect();
    assert_eq!(
        names,
        vec![
            b".".to_vec(),
            b"..".to_vec(),
            b"one".to_vec(),
            b"two".to_vec()
        ]
    );
    assert!(vol.resolve("/two", "").is_ok());
}
