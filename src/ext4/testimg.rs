//! In-memory assembly of small ext4 images for tests.
//!
//! The geometry is fixed: the group descriptor table sits in the block after the superblock and
//! every group's inode table starts at [`ITABLE_BLOCK`] relative to the group's base, so tests
//! only have to place inodes and data blocks.

use crate::Ext4;
use crate::error::Result;
use crate::superblock::EXT4_SIGNATURE;
use crate::superblock::FEATURE_INCOMPAT_FILETYPE;
use crate::superblock::SUPERBLOCK_OFFSET;

/// First block of each group's inode table, relative to the group's base.
const ITABLE_BLOCK: u32 = 4;
/// The on-disk stride of inode records.
///
/// Larger than the 128 bytes the parser consumes, so the stride handling is exercised
/// everywhere.
const INODE_SIZE: u16 = 256;

/// An ext4 image under construction.
#[derive(Clone)]
pub struct TestImage {
    /// The raw image.
    pub data: Vec<u8>,
    /// The size of a block in bytes.
    block_size: u32,
    /// The number of inodes per block group.
    inodes_per_group: u32,
    /// The number of blocks per block group.
    blocks_per_group: u32,
}

impl TestImage {
    /// Creates an image of `blocks` blocks with a valid superblock and group descriptor table.
    pub fn new(blocks: u32, block_size: u32, inodes_per_group: u32, blocks_per_group: u32) -> Self {
        let mut img = Self {
            data: vec![0; (blocks * block_size) as usize],
            block_size,
            inodes_per_group,
            blocks_per_group,
        };
        let groups = blocks.div_ceil(blocks_per_group);
        let first_data_block: u32 = if block_size == 1024 { 1 } else { 0 };
        let sb = SUPERBLOCK_OFFSET as usize;
        img.write_u32(sb, groups * inodes_per_group);
        img.write_u32(sb + 4, blocks);
        img.write_u32(sb + 20, first_data_block);
        img.write_u32(sb + 24, block_size.trailing_zeros() - 10);
        img.write_u32(sb + 32, blocks_per_group);
        img.write_u32(sb + 40, inodes_per_group);
        img.write_u16(sb + 56, EXT4_SIGNATURE);
        img.write_u16(sb + 88, INODE_SIZE);
        img.write_u32(sb + 96, FEATURE_INCOMPAT_FILETYPE);
        img.data[sb + 104..sb + 120].copy_from_slice(&[0x42; 16]);
        let gdt = ((first_data_block + 1) * block_size) as usize;
        for g in 0..groups as usize {
            let base = gdt + g * 64;
            img.write_u32(base + 8, ITABLE_BLOCK);
        }
        img
    }

    /// Writes a little-endian `u16` at byte `offset`.
    pub fn write_u16(&mut self, offset: usize, val: u16) {
        self.data[offset..offset + 2].copy_from_slice(&val.to_le_bytes());
    }

    /// Writes a little-endian `u32` at byte `offset`.
    pub fn write_u32(&mut self, offset: usize, val: u32) {
        self.data[offset..offset + 4].copy_from_slice(&val.to_le_bytes());
    }

    /// Writes `bytes` starting at the beginning of `block`.
    pub fn write_block(&mut self, block: u32, bytes: &[u8]) {
        let offset = (block * self.block_size) as usize;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Clears the FILETYPE feature, switching directories to the classic record layout.
    pub fn clear_filetype(&mut self) {
        self.write_u32(SUPERBLOCK_OFFSET as usize + 96, 0);
    }

    /// Sets the volume's name.
    pub fn set_volume_name(&mut self, name: &str) {
        let offset = SUPERBLOCK_OFFSET as usize + 120;
        self.data[offset..offset + name.len()].copy_from_slice(name.as_bytes());
    }

    /// Returns the byte offset of the inode record `num`.
    fn inode_offset(&self, num: u32) -> usize {
        let bg = (num - 1) / self.inodes_per_group;
        let idx = (num - 1) % self.inodes_per_group;
        (bg * self.blocks_per_group * self.block_size
            + ITABLE_BLOCK * self.block_size
            + idx * INODE_SIZE as u32) as usize
    }

    /// Fills the inode record `num`.
    ///
    /// `block` is the 60-byte direct block area: inline data, an inline symlink target or an
    /// extent tree root.
    pub fn set_inode(&mut self, num: u32, mode: u16, size_lo: u32, flags: u32, block: [u8; 60]) {
        let off = self.inode_offset(num);
        self.write_u16(off, mode);
        self.write_u32(off + 4, size_lo);
        self.write_u16(off + 26, 1);
        self.write_u32(off + 32, flags);
        self.data[off + 40..off + 100].copy_from_slice(&block);
    }

    /// Sets the timestamps of the inode record `num`.
    pub fn set_inode_times(&mut self, num: u32, atime: u32, ctime: u32, mtime: u32) {
        let off = self.inode_offset(num);
        self.write_u32(off + 8, atime);
        self.write_u32(off + 12, ctime);
        self.write_u32(off + 16, mtime);
    }

    /// Sets the owner of the inode record `num`.
    pub fn set_inode_owner(&mut self, num: u32, uid: u16, gid: u16) {
        let off = self.inode_offset(num);
        self.write_u16(off + 2, uid);
        self.write_u16(off + 24, gid);
    }

    /// Writes an extent node covering a whole block.
    pub fn write_extent_node(&mut self, block: u32, depth: u16, runs: &[(u32, u16, u32)]) {
        let node = extent_node(depth, runs);
        self.write_block(block, &node);
    }

    /// Loads the image as a filesystem.
    pub fn load(self) -> Result<Ext4> {
        Ext4::load(Box::new(self.data))
    }
}

/// Serializes an extent node: a header followed by one 12-byte slot per run.
///
/// With `depth == 0`, each run is `(logical block, length, physical start)`. With a non-zero
/// depth, each run is an index slot and its physical start is the child's block.
fn extent_node(depth: u16, runs: &[(u32, u16, u32)]) -> Vec<u8> {
    let mut node = Vec::new();
    node.extend_from_slice(&0xf30au16.to_le_bytes());
    node.extend_from_slice(&(runs.len() as u16).to_le_bytes());
    node.extend_from_slice(&(runs.len() as u16).to_le_bytes());
    node.extend_from_slice(&depth.to_le_bytes());
    node.extend_from_slice(&0u32.to_le_bytes());
    for (logical, len, start) in runs {
        if depth == 0 {
            node.extend_from_slice(&logical.to_le_bytes());
            node.extend_from_slice(&len.to_le_bytes());
            node.extend_from_slice(&0u16.to_le_bytes());
            node.extend_from_slice(&start.to_le_bytes());
        } else {
            node.extend_from_slice(&logical.to_le_bytes());
            node.extend_from_slice(&start.to_le_bytes());
            node.extend_from_slice(&0u16.to_le_bytes());
            node.extend_from_slice(&0u16.to_le_bytes());
        }
    }
    node
}

/// Builds a leaf extent root fitting an inode's direct block area.
///
/// Each run is `(logical block, length, physical start)`.
pub fn extent_root(runs: &[(u32, u16, u32)]) -> [u8; 60] {
    let node = extent_node(0, runs);
    let mut root = [0; 60];
    root[..node.len()].copy_from_slice(&node);
    root
}

/// Builds an extent root with a single index slot pointing at the node in block `child`.
pub fn extent_index_root(child: u32) -> [u8; 60] {
    let node = extent_node(1, &[(0, 0, child)]);
    let mut root = [0; 60];
    root[..node.len()].copy_from_slice(&node);
    root
}

/// Builds a directory blob of `block_size` bytes in the FILETYPE record layout.
///
/// Each entry is `(inode, name, file_type)`. The last record's `rec_len` stretches to the end of
/// the block. A classic record is byte-identical to a FILETYPE one with a zero type byte, so
/// classic directories are built by passing zero types.
pub fn dir_blob(entries: &[(u32, &str, u8)], block_size: usize) -> Vec<u8> {
    let mut blob = Vec::new();
    for (i, (inode, name, file_type)) in entries.iter().enumerate() {
        let name = name.as_bytes();
        let rec_len = if i == entries.len() - 1 {
            block_size - blob.len()
        } else {
            (8 + name.len() + 3) & !3
        };
        blob.extend_from_slice(&inode.to_le_bytes());
        blob.extend_from_slice(&(rec_len as u16).to_le_bytes());
        blob.push(name.len() as u8);
        blob.push(*file_type);
        blob.extend_from_slice(name);
        blob.resize(blob.len() + rec_len - 8 - name.len(), 0);
    }
    blob
}
