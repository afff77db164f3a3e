#![forbid(unsafe_code)]
//! Error types for e2fs.
//!
//! Defines `Ext2Error` and a `Result<T>` alias used throughout the workspace.

use thiserror::Error;

/// Unified error type for all e2fs operations.
#[derive(Debug, Error)]
pub enum Ext2Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad superblock magic: expected 0xef53, got {actual:#06x}")]
    BadMagic { actual: u16 },

    #[error("unsupported features: incompat {incompat:#010x}, ro_compat {ro_compat:#010x}")]
    UnsupportedFeatures { incompat: u32, ro_compat: u32 },

    #[error("filesystem has errors, refusing to mount")]
    DirtyFilesystem,

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory")]
    IsDirectory,

    #[error("corrupt directory entry at byte {offset}: {detail}")]
    CorruptEntry { offset: u64, detail: &'static str },

    #[error("logical block {block_index} exceeds the triply-indirect range")]
    FileTooLarge { block_index: u64 },

    #[error("volume released")]
    VolumeGone,

    #[error("invalid on-disk format: {0}")]
    Format(String),
}

/// Result alias using `Ext2Error`.
pub type Result<T> = std::result::Result<T, Ext2Error>;
