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

//! Read-only parser for the ext4 on-disk format.
//!
//! The [`Ext4`] facade resolves directories, file contents, symlink targets and per-inode
//! metadata out of a raw image or block device. It does not verify checksums, replay the journal
//! nor support writing.

pub mod data;
pub mod dirent;
pub mod error;
pub mod group;
pub mod inode;
pub mod metadata;
pub mod superblock;
pub mod volume;

#[cfg(test)]
pub mod testimg;

pub use data::ExtentAddressing;
pub use dirent::DirEntry;
pub use error::Error;
pub use error::Result;
pub use inode::FileKind;
pub use metadata::Metadata;

use inode::Inode;
use std::fmt;
use std::fs::File;
use std::path::Path;
use superblock::Superblock;
use uuid::Uuid;
use volume::Source;
use volume::Volume;

/// The inode of the root directory.
pub const ROOT_INODE: u32 = 2;

/// Identification of a loaded volume.
pub struct VolumeInfo {
    /// The volume's name.
    pub name: String,
    /// The volume's UUID.
    pub uuid: Uuid,
    /// The path the volume was last mounted to, if any.
    pub last_mounted: Option<String>,
}

impl fmt::Display for VolumeInfo {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "Volume name: {}, UUID: {}, last mounted at: ", self.name, self.uuid)?;
        match &self.last_mounted {
            Some(path) => write!(fmt, "{path}"),
            None => write!(fmt, "not mounted"),
        }
    }
}

/// A loaded ext4 filesystem.
///
/// The facade owns the backing source. All operations take `&self`: reads are addressed by
/// offset, so no cursor is shared between calls. Dropping the facade releases the source.
#[derive(Debug)]
pub struct Ext4 {
    /// The backing volume.
    vol: Volume,
    /// The filesystem's superblock.
    sb: Superblock,
    /// Interpretation of physical block numbers in extents.
    addressing: ExtentAddressing,
}

impl Ext4 {
    /// Opens the image or block device at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::Io {
            offset: 0,
            source,
        })?;
        Self::load(Box::new(file))
    }

    /// Loads a filesystem from the given backing source.
    pub fn load(src: Box<dyn Source>) -> Result<Self> {
        let vol = Volume::new(src);
        let sb = Superblock::read(&vol)?;
        Ok(Self {
            vol,
            sb,
            addressing: Default::default(),
        })
    }

    /// Selects the interpretation of physical block numbers in extents.
    pub fn set_addressing(&mut self, addressing: ExtentAddressing) {
        self.addressing = addressing;
    }

    /// Returns the current extent addressing mode.
    pub fn addressing(&self) -> ExtentAddressing {
        self.addressing
    }

    /// Returns the backing volume.
    pub fn volume(&self) -> &Volume {
        &self.vol
    }

    /// Returns the filesystem's superblock.
    pub fn superblock(&self) -> &Superblock {
        &self.sb
    }

    /// Returns the volume's identification.
    pub fn info(&self) -> VolumeInfo {
        VolumeInfo {
            name: self.sb.volume_name(),
            uuid: self.sb.volume_uuid(),
            last_mounted: self.sb.last_mounted(),
        }
    }

    /// Reads the inode `inode_num` along with its block group index.
    fn read_inode(&self, inode_num: u32) -> Result<(Inode, u32)> {
        Inode::read(&self.vol, &self.sb, inode_num)
    }

    /// Reads the raw data of an inode, covering whole blocks.
    fn read_data(&self, inode: &Inode, bg_num: u32) -> Result<Vec<u8>> {
        data::read_data(&self.vol, &self.sb, self.addressing, inode, bg_num)
    }

    /// Returns the entries of the root directory.
    pub fn root(&self) -> Result<Vec<DirEntry>> {
        self.read_dir(ROOT_INODE)
    }

    /// Returns the entries of the directory at `inode_num`, in on-disk order.
    ///
    /// Removed entries are yielded with a zero inode and should be skipped by the caller.
    pub fn read_dir(&self, inode_num: u32) -> Result<Vec<DirEntry>> {
        let (inode, bg_num) = self.read_inode(inode_num)?;
        let blob = self.read_data(&inode, bg_num)?;
        dirent::parse(&self.vol, &self.sb, &blob)
    }

    /// Returns the content of the regular file at `inode_num`, along with its access and
    /// modification timestamps.
    pub fn read_file(&self, inode_num: u32) -> Result<(Vec<u8>, u32, u32)> {
        let (inode, bg_num) = self.read_inode(inode_num)?;
        let mut data = self.read_data(&inode, bg_num)?;
        data.truncate(inode.size_lo as usize);
        Ok((data, inode.atime, inode.mtime))
    }

    /// Returns the target of the symlink at `inode_num`.
    pub fn read_link(&self, inode_num: u32) -> Result<String> {
        let (inode, bg_num) = self.read_inode(inode_num)?;
        let mut data = self.read_data(&inode, bg_num)?;
        data.truncate(inode.size_lo as usize);
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Returns the metadata of the object at `inode_num`.
    pub fn read_meta(&self, inode_num: u32) -> Result<Metadata> {
        let (inode, _) = self.read_inode(inode_num)?;
        Ok(Metadata::of(inode_num, &inode))
    }
}
