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

//! Per-inode metadata projection, as exported to the metadata table.

use crate::inode::FileKind;
use crate::inode::Inode;
use std::collections::HashMap;

/// The metadata of one filesystem object.
#[derive(Clone, Debug)]
pub struct Metadata {
    /// The object's inode number.
    pub inode: u32,
    /// The kind of the object.
    pub kind: FileKind,
    /// The object's size in bytes.
    pub size: u32,
    /// Timestamp of the last inode change.
    pub ctime: u32,
    /// Timestamp of the last data modification.
    pub mtime: u32,
    /// The UID of the owner.
    pub uid: u16,
    /// The GID of the group.
    pub gid: u16,
    /// The file mode.
    pub mode: u16,
    /// Extended attributes. An absent value renders as a bare key in the metadata table.
    ///
    /// Parsing xattr blocks is out of scope, so nothing populates this mapping yet.
    pub xattr: HashMap<String, Option<Vec<u8>>>,
}

impl Metadata {
    /// Projects the metadata of the inode record `inode`, numbered `inode_num`.
    pub fn of(inode_num: u32, inode: &Inode) -> Self {
        Self {
            inode: inode_num,
            kind: inode.kind(),
            size: inode.size_lo,
            ctime: inode.ctime,
            mtime: inode.mtime,
            uid: inode.uid,
            gid: inode.gid,
            mode: inode.mode,
            xattr: HashMap::new(),
        }
    }
}
