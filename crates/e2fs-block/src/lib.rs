#![forbid(unsafe_code)]
//! Byte-addressed device I/O.
//!
//! Provides the `ByteDevice` trait plus the file-backed and memory-backed
//! implementations the driver mounts on top of.

use e2fs_error::{Ext2Error, Result};
use e2fs_types::{ByteOffset, EXT2_SUPERBLOCK_OFFSET, EXT2_SUPERBLOCK_SIZE};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::trace;

/// Byte-addressed device for fixed-offset I/O (pread/pwrite semantics).
pub trait ByteDevice: Send + Sync {
    /// Total length in bytes.
    fn len_bytes(&self) -> u64;

    /// Read exactly `buf.len()` bytes from `offset` into `buf`.
    fn read_exact_at(&self, offset: ByteOffset, buf: &mut [u8]) -> Result<()>;

    /// Write all bytes in `buf` to `offset`.
    fn write_all_at(&self, offset: ByteOffset, buf: &[u8]) -> Result<()>;

    /// Flush pending writes to stable storage.
    fn sync(&self) -> Result<()>;
}

fn check_range(offset: ByteOffset, len: usize, device_len: u64, op: &str) -> Result<()> {
    let len = u64::try_from(len)
        .map_err(|_| Ext2Error::Format(format!("{op} length overflows u64")))?;
    let end = offset
        .checked_add(len)
        .ok_or_else(|| Ext2Error::Format(format!("{op} range overflows u64")))?;
    if end.0 > device_len {
        return Err(Ext2Error::Format(format!(
            "{op} out of bounds: offset={offset} len={len} device_len={device_len}"
        )));
    }
    Ok(())
}

/// File-backed byte device using `pread`/`pwrite` style I/O.
///
/// `std::os::unix::fs::FileExt` loops over short and interrupted transfers,
/// and positioned I/O keeps reads independent of any shared seek position.
#[derive(Debug, Clone)]
pub struct FileByteDevice {
    file: Arc<File>,
    len: u64,
    writable: bool,
}

impl FileByteDevice {
    /// Open `path` read-write, falling back to read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let (file, writable) = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path.as_ref())
            .map(|file| (file, true))
            .or_else(|_| {
                OpenOptions::new()
                    .read(true)
                    .open(path.as_ref())
                    .map(|file| (file, false))
            })?;
        let len = file.metadata()?.len();
        Ok(Self {
            file: Arc::new(file),
            len,
            writable,
        })
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.writable
    }
}

impl ByteDevice for FileByteDevice {
    fn len_bytes(&self) -> u64 {
        self.len
    }

    fn read_exact_at(&self, offset: ByteOffset, buf: &mut [u8]) -> Result<()> {
        check_range(offset, buf.len(), self.len, "read")?;
        trace!(target: "e2fs::block::io", event = "read", offset = offset.0, len = buf.len());
        self.file.read_exact_at(buf, offset.0)?;
        Ok(())
    }

    fn write_all_at(&self, offset: ByteOffset, buf: &[u8]) -> Result<()> {
        if !self.writable {
            return Err(Ext2Error::Io(std::io::Error::from(
                std::io::ErrorKind::PermissionDenied,
            )));
        }
        check_range(offset, buf.len(), self.len, "write")?;
        trace!(target: "e2fs::block::io", event = "write", offset = offset.0, len = buf.len());
        self.file.write_all_at(buf, offset.0)?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

/// Memory-backed byte device over a fixed-size buffer.
///
/// Used by tests and tooling that operate on in-memory images.
#[derive(Debug)]
pub struct MemByteDevice {
    bytes: Mutex<Vec<u8>>,
    len: u64,
}

impl MemByteDevice {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        let len = bytes.len() as u64;
        Self {
            bytes: Mutex::new(bytes),
            len,
        }
    }

    /// Consume the device and return the backing buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.bytes.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl ByteDevice for MemByteDevice {
    fn len_bytes(&self) -> u64 {
        self.len
    }

    fn read_exact_at(&self, offset: ByteOffset, buf: &mut [u8]) -> Result<()> {
        check_range(offset, buf.len(), self.len, "read")?;
        let bytes = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        let start = usize::try_from(offset.0)
            .map_err(|_| Ext2Error::Format("read offset exceeds addressable range".to_owned()))?;
        buf.copy_from_slice(&bytes[start..start + buf.len()]);
        Ok(())
    }

    fn write_all_at(&self, offset: ByteOffset, buf: &[u8]) -> Result<()> {
        check_range(offset, buf.len(), self.len, "write")?;
        let mut bytes = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        let start = usize::try_from(offset.0)
            .map_err(|_| Ext2Error::Format("write offset exceeds addressable range".to_owned()))?;
        bytes[start..start + buf.len()].copy_from_slice(buf);
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

/// Read the raw 1024-byte superblock region at device offset 1024.
pub fn read_superblock_region(dev: &dyn ByteDevice) -> Result<[u8; EXT2_SUPERBLOCK_SIZE]> {
    let mut region = [0_u8; EXT2_SUPERBLOCK_SIZE];
    dev.read_exact_at(ByteOffset(EXT2_SUPERBLOCK_OFFSET), &mut region)?;
    Ok(region)
}
