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

//! Block group descriptor table.

use crate::error::Result;
use crate::superblock::Superblock;
use crate::volume::Volume;

/// The stride between two descriptors on disk.
///
/// The descriptor itself is either 32 or 64 bytes depending on the 64BIT feature. Only the low 32
/// bytes are consumed either way.
const GROUP_DESC_STRIDE: u64 = 64;

/// A block group descriptor.
#[repr(C, packed)]
pub struct GroupDescriptor {
    /// The block containing the block usage bitmap (low 32 bits).
    pub block_bitmap_lo: u32,
    /// The block containing the inode usage bitmap (low 32 bits).
    pub inode_bitmap_lo: u32,
    /// The first block of the group's inode table (low 32 bits).
    pub inode_table_lo: u32,
    /// Number of unallocated blocks in the group (low 16 bits).
    pub free_blocks_count_lo: u16,
    /// Number of unallocated inodes in the group (low 16 bits).
    pub free_inodes_count_lo: u16,
    /// Number of directories in the group (low 16 bits).
    pub used_dirs_count_lo: u16,
    /// Group flags.
    pub flags: u16,
    /// The block containing the snapshot exclusion bitmap (low 32 bits).
    pub exclude_bitmap_lo: u32,
    /// Checksum of the block usage bitmap (low 16 bits).
    pub block_bitmap_csum_lo: u16,
    /// Checksum of the inode usage bitmap (low 16 bits).
    pub inode_bitmap_csum_lo: u16,
    /// Number of unused entries at the end of the inode table (low 16 bits).
    pub itable_unused_lo: u16,
    /// Checksum of the descriptor.
    pub checksum: u16,
}

impl GroupDescriptor {
    /// Reads the descriptor of the block group `bg_num`.
    pub fn read(vol: &Volume, sb: &Superblock, bg_num: u32) -> Result<Self> {
        let offset = (sb.first_data_block as u64 + 1) * sb.block_size()
            + bg_num as u64 * GROUP_DESC_STRIDE;
        vol.read_struct(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn descriptor_size() {
        assert_eq!(size_of::<GroupDescriptor>(), 32);
    }
}
