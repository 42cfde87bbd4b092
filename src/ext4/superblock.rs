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

//! Superblock parsing.
//!
//! The superblock holds the filesystem's global geometry. It is read once when the volume is
//! loaded and is immutable afterwards.

use crate::error::Error;
use crate::error::Result;
use crate::volume::Volume;
use uuid::Uuid;

/// The offset of the superblock from the beginning of the device.
pub const SUPERBLOCK_OFFSET: u64 = 1024;
/// The filesystem's signature.
pub const EXT4_SIGNATURE: u16 = 0xef53;

/// Incompat feature: directory entries record the entry's file type.
pub const FEATURE_INCOMPAT_FILETYPE: u32 = 0x2;
/// Incompat feature: the filesystem uses 64-bit block addresses.
pub const FEATURE_INCOMPAT_64BIT: u32 = 0x80;

/// The ext4 superblock structure.
///
/// Only the first 204 bytes of the on-disk superblock are consumed. All fields are little-endian.
#[repr(C, packed)]
#[derive(Debug)]
pub struct Superblock {
    /// Total number of inodes in the filesystem.
    pub inodes_count: u32,
    /// Total number of blocks in the filesystem (low 32 bits).
    pub blocks_count_lo: u32,
    /// Number of blocks reserved for the superuser (low 32 bits).
    pub r_blocks_count_lo: u32,
    /// Number of unallocated blocks (low 32 bits).
    pub free_blocks_count_lo: u32,
    /// Number of unallocated inodes.
    pub free_inodes_count: u32,
    /// The block containing the superblock.
    pub first_data_block: u32,
    /// log2(block_size) - 10
    pub log_block_size: u32,
    /// log2(cluster_size) - 10
    pub log_cluster_size: u32,
    /// The number of blocks per block group.
    pub blocks_per_group: u32,
    /// The number of clusters per block group.
    pub clusters_per_group: u32,
    /// The number of inodes per block group.
    pub inodes_per_group: u32,
    /// The timestamp of the last mount operation.
    pub mtime: u32,
    /// The timestamp of the last write operation.
    pub wtime: u32,
    /// The number of mounts since the last consistency check.
    pub mnt_count: u16,
    /// The number of mounts allowed before a consistency check must be done.
    pub max_mnt_count: u16,
    /// The ext4 signature.
    pub magic: u16,
    /// The filesystem's state.
    pub state: u16,
    /// The action to perform when an error is detected.
    pub errors: u16,
    /// The minor revision level.
    pub minor_rev_level: u16,
    /// The timestamp of the last consistency check.
    pub lastcheck: u32,
    /// The interval between mandatory consistency checks.
    pub checkinterval: u32,
    /// The id of the operating system which created the filesystem.
    pub creator_os: u32,
    /// The revision level.
    pub rev_level: u32,
    /// The UID that can use reserved blocks.
    pub def_resuid: u16,
    /// The GID that can use reserved blocks.
    pub def_resgid: u16,
    /// The first non-reserved inode.
    pub first_ino: u32,
    /// The size of an inode record on disk, in bytes.
    pub inode_size: u16,
    /// The block group containing this superblock.
    pub block_group_nr: u16,
    /// Features the implementation may support.
    pub feature_compat: u32,
    /// Features the implementation must support to mount.
    pub feature_incompat: u32,
    /// Features the implementation must support to write.
    pub feature_ro_compat: u32,
    /// The volume's UUID.
    pub uuid: [u8; 16],
    /// The volume's name, NUL-padded.
    pub volume_name: [u8; 16],
    /// The path the volume was last mounted to, NUL-padded.
    pub last_mounted: [u8; 64],
    /// Compression usage bitmap.
    pub algorithm_usage_bitmap: u32,
}

/// Returns the string ending at the first NUL byte of `raw`, decoded lossily.
fn trim_nul(raw: &[u8]) -> String {
    let end = raw.iter().position(|b| *b == b'\0').unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

impl Superblock {
    /// Reads the superblock from the given volume.
    pub fn read(vol: &Volume) -> Result<Self> {
        let sb: Superblock = vol.read_struct(SUPERBLOCK_OFFSET)?;
        let magic = sb.magic;
        if magic != EXT4_SIGNATURE {
            return Err(Error::BadMagic {
                found: magic,
            });
        }
        // Block sizes up to 64 KiB
        if sb.log_block_size > 6 {
            return Err(Error::Unsupported("block size"));
        }
        Ok(sb)
    }

    /// Returns the size of a block in bytes.
    pub fn block_size(&self) -> u64 {
        1u64 << (10 + self.log_block_size)
    }

    /// Tells whether directory entries embed the entry's file type.
    pub fn has_filetype(&self) -> bool {
        self.feature_incompat & FEATURE_INCOMPAT_FILETYPE != 0
    }

    /// Returns the volume's name.
    pub fn volume_name(&self) -> String {
        let raw = self.volume_name;
        trim_nul(&raw)
    }

    /// Returns the path the volume was last mounted to, if any.
    pub fn last_mounted(&self) -> Option<String> {
        let raw = self.last_mounted;
        let path = trim_nul(&raw);
        (!path.is_empty()).then_some(path)
    }

    /// Returns the volume's UUID.
    pub fn volume_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.uuid)
    }
}
