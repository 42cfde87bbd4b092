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

//! Inode records.

use crate::error::Error;
use crate::error::Result;
use crate::group::GroupDescriptor;
use crate::superblock::Superblock;
use crate::volume::Volume;

/// Inode flag: the file's data is stored inline in `block`.
pub const INODE_FLAG_INLINE_DATA: u32 = 0x10000000;
/// Inode flag: the file's data is mapped by an extent tree.
pub const INODE_FLAG_EXTENTS: u32 = 0x00080000;

/// Mask of the file kind in an inode's mode.
pub const S_IFMT: u16 = 0xf000;
/// File kind: FIFO.
pub const S_IFIFO: u16 = 0x1000;
/// File kind: character device.
pub const S_IFCHR: u16 = 0x2000;
/// File kind: directory.
pub const S_IFDIR: u16 = 0x4000;
/// File kind: block device.
pub const S_IFBLK: u16 = 0x6000;
/// File kind: regular file.
pub const S_IFREG: u16 = 0x8000;
/// File kind: symbolic link.
pub const S_IFLNK: u16 = 0xa000;
/// File kind: socket.
pub const S_IFSOCK: u16 = 0xc000;

/// The kind of a filesystem object.
///
/// The numeric codes are the values stored in directory records and written to the sidecar
/// tables, see [`FileKind::code`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FileKind {
    /// Unknown kind, or removed directory entry.
    Unknown,
    /// Regular file.
    Regular,
    /// Directory.
    Directory,
    /// Character device.
    CharDev,
    /// Block device.
    BlockDev,
    /// Named pipe.
    Fifo,
    /// Unix socket.
    Socket,
    /// Symbolic link.
    Symlink,
}

impl FileKind {
    /// Returns the kind recorded in a directory entry's `file_type` field.
    pub fn from_dirent_type(ty: u8) -> Self {
        match ty {
            1 => Self::Regular,
            2 => Self::Directory,
            3 => Self::CharDev,
            4 => Self::BlockDev,
            5 => Self::Fifo,
            6 => Self::Socket,
            7 => Self::Symlink,
            _ => Self::Unknown,
        }
    }

    /// Returns the kind encoded in an inode's mode.
    pub fn from_mode(mode: u16) -> Self {
        match mode & S_IFMT {
            S_IFIFO => Self::Fifo,
            S_IFCHR => Self::CharDev,
            S_IFDIR => Self::Directory,
            S_IFBLK => Self::BlockDev,
            S_IFREG => Self::Regular,
            S_IFLNK => Self::Symlink,
            S_IFSOCK => Self::Socket,
            _ => Self::Unknown,
        }
    }

    /// Returns the numeric code of the kind.
    pub fn code(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Regular => 1,
            Self::Directory => 2,
            Self::CharDev => 3,
            Self::BlockDev => 4,
            Self::Fifo => 5,
            Self::Socket => 6,
            Self::Symlink => 7,
        }
    }
}

/// An inode record.
///
/// Exactly 128 bytes are consumed regardless of the superblock's `inode_size`, which is only the
/// stride between records on disk. All fields are little-endian.
#[repr(C, packed)]
#[derive(Debug)]
pub struct Inode {
    /// File mode. The upper nibble encodes the file kind.
    pub mode: u16,
    /// The UID of the file's owner (low 16 bits).
    pub uid: u16,
    /// The file's size in bytes (low 32 bits).
    pub size_lo: u32,
    /// Timestamp of the last access.
    pub atime: u32,
    /// Timestamp of the last inode change.
    pub ctime: u32,
    /// Timestamp of the last data modification.
    pub mtime: u32,
    /// Timestamp of the deletion.
    pub dtime: u32,
    /// The GID of the file's group (low 16 bits).
    pub gid: u16,
    /// The number of hard links to the file.
    pub links_count: u16,
    /// The number of 512-byte sectors used by the file (low 32 bits).
    pub blocks_lo: u32,
    /// Inode flags.
    pub flags: u32,
    /// OS-dependent field.
    pub osd1: [u8; 4],
    /// The direct block area, holding either inline data, an inline symlink target or the extent
    /// tree's root node.
    pub block: [u8; 60],
    /// File version.
    pub generation: u32,
    /// The block containing the file's extended attributes (low 32 bits).
    pub file_acl_lo: u32,
    /// The file's size in bytes (high 32 bits). Ignored, the effective size is `size_lo`.
    pub size_high: u32,
    /// Obsolete fragment address.
    pub obso_faddr: u32,
    /// OS-dependent field.
    pub osd2: [u8; 12],
}

impl Inode {
    /// Reads the inode `inode_num` from the given volume.
    ///
    /// Returns the record along with the index of the block group it belongs to.
    pub fn read(vol: &Volume, sb: &Superblock, inode_num: u32) -> Result<(Self, u32)> {
        if inode_num < 1 || inode_num > sb.inodes_count {
            return Err(Error::InodeOutOfRange {
                inode: inode_num,
                count: sb.inodes_count,
            });
        }
        let bg_num = (inode_num - 1) / sb.inodes_per_group;
        let idx = (inode_num - 1) % sb.inodes_per_group;
        let group_desc = GroupDescriptor::read(vol, sb, bg_num)?;
        let offset = bg_num as u64 * sb.blocks_per_group as u64 * sb.block_size()
            + group_desc.inode_table_lo as u64 * sb.block_size()
            + idx as u64 * sb.inode_size as u64;
        let inode = vol.read_struct(offset)?;
        Ok((inode, bg_num))
    }

    /// Returns the kind of the file.
    pub fn kind(&self) -> FileKind {
        FileKind::from_mode(self.mode)
    }
}
