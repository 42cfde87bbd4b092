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

//! File data reading.
//!
//! An inode's data is located either inline in the inode's direct block area, or through the
//! extent tree rooted in that same area. Legacy block mapping is not supported.

use crate::error::Error;
use crate::error::Result;
use crate::inode::FileKind;
use crate::inode::INODE_FLAG_EXTENTS;
use crate::inode::INODE_FLAG_INLINE_DATA;
use crate::inode::Inode;
use crate::superblock::Superblock;
use crate::volume::Volume;
use crate::volume::decode;

/// The signature of an extent tree node.
const EXTENT_SIGNATURE: u16 = 0xf30a;
/// The size of an extent node header, in bytes.
const EXTENT_HEADER_SIZE: usize = 12;
/// The size of an extent node entry, in bytes.
const EXTENT_ENTRY_SIZE: usize = 12;
/// The maximum length of a symlink target stored inline in the inode.
const INLINE_SYMLINK_MAX: u32 = 60;

/// Interpretation of the 32-bit physical block number in extent entries.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExtentAddressing {
    /// The physical block is relative to the start of the inode's own block group.
    ///
    /// This matches extraction tools which assume every extent of a file is allocated inside the
    /// file's own group, and only holds on such images.
    #[default]
    GroupRelative,
    /// The physical block is an absolute filesystem block, as the format specifies.
    Absolute,
}

/// The header of an extent tree node.
#[repr(C, packed)]
pub struct ExtentHeader {
    /// The node's signature.
    pub magic: u16,
    /// The number of entries following the header.
    pub entries: u16,
    /// The maximum number of entries the node can hold.
    pub max: u16,
    /// The depth of the subtree below the node. Zero for leaves.
    pub depth: u16,
    /// Generation of the tree.
    pub generation: u32,
}

/// A leaf entry, mapping a run of logical blocks to physical blocks.
#[repr(C, packed)]
pub struct ExtentEntry {
    /// The first logical block covered by the run.
    pub block: u32,
    /// The length of the run in blocks.
    pub len: u16,
    /// The physical start block (high 16 bits).
    pub start_hi: u16,
    /// The physical start block (low 32 bits).
    pub start_lo: u32,
}

/// An index entry, pointing at a child node stored in one whole block.
#[repr(C, packed)]
pub struct ExtentIndex {
    /// The first logical block covered by the child.
    pub block: u32,
    /// The physical block holding the child node (low 32 bits).
    pub leaf_lo: u32,
    /// The physical block holding the child node (high 16 bits).
    pub leaf_hi: u16,
    /// Unused.
    pub unused: u16,
}

/// The payload of one extent tree node.
enum ExtentNode {
    /// Runs of physical blocks, in logical order.
    Leaf(Vec<ExtentEntry>),
    /// Pointers to child nodes.
    Index(Vec<ExtentIndex>),
}

impl ExtentNode {
    /// Parses a node from the raw bytes of a block, or of an inode's direct block area.
    fn parse(raw: &[u8]) -> Result<Self> {
        let hdr: ExtentHeader = decode(raw, 0)?;
        let magic = hdr.magic;
        if magic != EXTENT_SIGNATURE {
            return Err(Error::BadExtentMagic {
                found: magic,
            });
        }
        let entries = hdr.entries as usize;
        let node = if hdr.depth == 0 {
            let mut leaf = Vec::with_capacity(entries);
            for i in 0..entries {
                leaf.push(decode(raw, EXTENT_HEADER_SIZE + i * EXTENT_ENTRY_SIZE)?);
            }
            Self::Leaf(leaf)
        } else {
            let mut index = Vec::with_capacity(entries);
            for i in 0..entries {
                index.push(decode(raw, EXTENT_HEADER_SIZE + i * EXTENT_ENTRY_SIZE)?);
            }
            Self::Index(index)
        };
        Ok(node)
    }
}

/// Resolves a 32-bit physical block number from an extent entry.
fn physical_block(addressing: ExtentAddressing, sb: &Superblock, bg_num: u32, lo: u32) -> u64 {
    match addressing {
        ExtentAddressing::GroupRelative => {
            bg_num as u64 * sb.blocks_per_group as u64 + lo as u64
        }
        ExtentAddressing::Absolute => lo as u64,
    }
}

/// Traverses the extent node in `raw`, appending the covered data to `data`.
///
/// Entries are visited in on-disk order, which is logical block order.
fn walk_extents(
    vol: &Volume,
    sb: &Superblock,
    addressing: ExtentAddressing,
    bg_num: u32,
    raw: &[u8],
    data: &mut Vec<u8>,
) -> Result<()> {
    let block_size = sb.block_size();
    match ExtentNode::parse(raw)? {
        ExtentNode::Leaf(entries) => {
            for entry in entries {
                let start_hi = entry.start_hi;
                if start_hi != 0 {
                    return Err(Error::Unsupported("48-bit extent addresses"));
                }
                let start = physical_block(addressing, sb, bg_num, entry.start_lo);
                let len = entry.len as usize * block_size as usize;
                let run = vol.read_at(start * block_size, len)?;
                data.extend_from_slice(&run);
            }
        }
        ExtentNode::Index(entries) => {
            for index in entries {
                let leaf_hi = index.leaf_hi;
                if leaf_hi != 0 {
                    return Err(Error::Unsupported("48-bit extent addresses"));
                }
                let child = physical_block(addressing, sb, bg_num, index.leaf_lo);
                let node = vol.read_at(child * block_size, block_size as usize)?;
                walk_extents(vol, sb, addressing, bg_num, &node, data)?;
            }
        }
    }
    Ok(())
}

/// Reads the data of `inode`, which belongs to the block group `bg_num`.
///
/// The result covers whole blocks. The caller truncates to the inode's size.
pub fn read_data(
    vol: &Volume,
    sb: &Superblock,
    addressing: ExtentAddressing,
    inode: &Inode,
    bg_num: u32,
) -> Result<Vec<u8>> {
    let size = inode.size_lo;
    let flags = inode.flags;
    if size == 0 {
        return Ok(Vec::new());
    }
    if flags & INODE_FLAG_INLINE_DATA != 0
        || (inode.kind() == FileKind::Symlink && size <= INLINE_SYMLINK_MAX)
    {
        return Ok(inode.block.to_vec());
    }
    if flags & INODE_FLAG_EXTENTS != 0 {
        let mut data = Vec::new();
        walk_extents(vol, sb, addressing, bg_num, &inode.block, &mut data)?;
        return Ok(data);
    }
    Err(Error::Unsupported("mapped inodes"))
}
