/*
 * Copyright 2025 Luc Lenôtre
 *
 * This file is part of Maestro.
 *
 * Maestro is free software: you can redistribute it and/or modify it under the
 * terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or (at your option) any later
 * version.
 *
 * Maestro is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
 * A PARTICULAR PURPOSE. See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * Maestro. If not, see <https://www.gnu.org/licenses/>.
 */

//! Directory record parsing.
//!
//! A directory's data is a sequence of variable-length records. Each record advances the cursor
//! by its own `rec_len`; the last record of a block stretches to the block's end, so padding never
//! has to be represented.

use crate::error::Error;
use crate::error::Result;
use crate::inode::FileKind;
use crate::inode::Inode;
use crate::superblock::Superblock;
use crate::volume::Volume;
use crate::volume::decode;

/// The length of a record's fixed head, before the name bytes.
const DIRENT_HEAD_LEN: usize = 8;

/// A classic directory record head. The file kind is derived from the target inode.
#[repr(C, packed)]
struct RawDirEntry {
    /// The inode the entry points to. Zero for removed entries.
    inode: u32,
    /// The length of the whole record.
    rec_len: u16,
    /// The length of the name.
    name_len: u16,
}

/// A directory record head with the FILETYPE feature.
#[repr(C, packed)]
struct RawDirEntryV2 {
    /// The inode the entry points to. Zero for removed entries.
    inode: u32,
    /// The length of the whole record.
    rec_len: u16,
    /// The length of the name.
    name_len: u8,
    /// The kind of the pointed object.
    file_type: u8,
}

/// One entry of a directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DirEntry {
    /// The inode the entry points to.
    ///
    /// Zero marks a removed entry. Such entries are yielded with the kind
    /// [`FileKind::Unknown`] and are meant to be skipped by callers.
    pub inode: u32,
    /// The entry's name.
    pub name: String,
    /// The kind of the pointed object.
    pub kind: FileKind,
}

/// Parses the directory records in `blob`, in on-disk order.
///
/// Without the FILETYPE feature, the kind of each live entry is read from the target inode's
/// mode, which costs one inode lookup per record.
pub fn parse(vol: &Volume, sb: &Superblock, blob: &[u8]) -> Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    let mut offset = 0;
    while offset < blob.len() {
        let (inode_num, rec_len, name_len, kind) = if sb.has_filetype() {
            let raw: RawDirEntryV2 = decode(blob, offset)?;
            (
                raw.inode,
                raw.rec_len as usize,
                raw.name_len as usize,
                FileKind::from_dirent_type(raw.file_type),
            )
        } else {
            let raw: RawDirEntry = decode(blob, offset)?;
            let kind = if raw.inode != 0 {
                let (target, _) = Inode::read(vol, sb, raw.inode)?;
                target.kind()
            } else {
                FileKind::Unknown
            };
            (raw.inode, raw.rec_len as usize, raw.name_len as usize, kind)
        };
        // A record is at least its head plus the name, rounded up to 4 bytes
        if rec_len < (DIRENT_HEAD_LEN + name_len + 3) & !3 {
            return Err(Error::Decode {
                offset: offset as u64,
            });
        }
        let name_start = offset + DIRENT_HEAD_LEN;
        let name_end = name_start + name_len;
        if name_end > blob.len() {
            return Err(Error::Decode {
                offset: offset as u64,
            });
        }
        let name = String::from_utf8_lossy(&blob[name_start..name_end]).into_owned();
        entries.push(DirEntry {
            inode: inode_num,
            name,
            kind,
        });
        offset += rec_len;
    }
    Ok(entries)
}
