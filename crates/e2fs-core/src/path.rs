//! Path resolution.
//!
//! Walks a byte-string path component by component from the root or a
//! caller-supplied origin inode. Names match byte-exactly: no case folding,
//! no normalization, no symlink traversal.

use crate::{dir, Volume};
use e2fs_error::{Ext2Error, Result};
use e2fs_types::InodeNumber;

/// Resolve `path` against `origin`.
///
/// Absolute paths resolve from the root regardless of `origin`; relative
/// paths require `origin` to be an absolute path, which is resolved first.
pub(crate) fn resolve(vol: &Volume, path: &[u8], origin: &[u8]) -> Result<InodeNumber> {
    if path.is_empty() {
        return Err(Ext2Error::InvalidArgument("empty path"));
    }
    if path[0] == b'/' {
        return walk(vol, InodeNumber::ROOT, strip_slashes(path));
    }
    if origin.first() != Some(&b'/') {
        return Err(Ext2Error::InvalidArgument(
            "relative path requires an absolute origin",
        ));
    }
    let base = walk(vol, InodeNumber::ROOT, strip_slashes(origin))?;
    walk(vol, base, path)
}

/// Resolve `path` against an origin inode.
pub(crate) fn resolve_at(vol: &Volume, origin: InodeNumber, path: &[u8]) -> Result<InodeNumber> {
    if path.is_empty() {
        return Err(Ext2Error::InvalidArgument("empty path"));
    }
    if path[0] == b'/' {
        return walk(vol, InodeNumber::ROOT, strip_slashes(path));
    }
    walk(vol, origin, path)
}

fn walk(vol: &Volume, mut current: InodeNumber, mut path: &[u8]) -> Result<InodeNumber> {
    while !path.is_empty() {
        let inode = vol.inode(current)?;
        if !inode.is_directory() {
            return Err(Ext2Error::NotADirectory(lossy(path)));
        }

        let (component, rest) = split_component(path);
        let entry = dir::find_entry(vol, &inode, component)?;
        current = InodeNumber(entry.header.inode);
        path = rest;

        // A remaining path means the entry just crossed must itself be a
        // directory; the next loop iteration re-reads it, but the entry's
        // classification catches non-directories without loading data.
        if !path.is_empty() {
            if !vol.classify_entry(&entry.header)?.is_directory() {
                return Err(Ext2Error::NotADirectory(lossy(component)));
            }
            path = strip_slashes(path);
        }
    }
    Ok(current)
}

/// First component and the remainder (keeping its leading slashes).
fn split_component(path: &[u8]) -> (&[u8], &[u8]) {
    match path.iter().position(|b| *b == b'/') {
        Some(pos) => (&path[..pos], &path[pos..]),
        None => (path, &[]),
    }
}

fn strip_slashes(path: &[u8]) -> &[u8] {
    let start = path.iter().position(|b| *b != b'/').unwrap_or(path.len());
    &path[start..]
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_component_basic() {
        assert_eq!(split_component(b"a/b/c"), (&b"a"[..], &b"/b/c"[..]));
        assert_eq!(split_component(b"name"), (&b"name"[..], &b""[..]));
        assert_eq!(split_component(b"a//b"), (&b"a"[..], &b"//b"[..]));
    }

    #[test]
    fn strip_slashes_basic() {
        assert_eq!(strip_slashes(b"///a/b"), b"a/b");
        assert_eq!(strip_slashes(b"a"), b"a");
        assert_eq!(strip_slashes(b"////"), b"");
        assert_eq!(strip_slashes(b""), b"");
    }
}
