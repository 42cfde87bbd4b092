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

//! Errors returned by the parser.

use std::error;
use std::fmt;
use std::io;
use std::result;

/// An error raised while reading the filesystem.
#[derive(Debug)]
pub enum Error {
    /// The superblock's signature does not match.
    BadMagic {
        /// The value found on disk.
        found: u16,
    },
    /// An extent tree node's signature does not match.
    BadExtentMagic {
        /// The value found on disk.
        found: u16,
    },
    /// The requested inode number is out of bounds.
    InodeOutOfRange {
        /// The requested inode number.
        inode: u32,
        /// The total number of inodes on the filesystem.
        count: u32,
    },
    /// The filesystem uses a feature the parser does not implement.
    Unsupported(&'static str),
    /// A structure could not be decoded because its buffer is too short.
    Decode {
        /// The offset of the structure in its buffer.
        offset: u64,
    },
    /// The backing source failed.
    Io {
        /// The byte offset of the attempted read.
        offset: u64,
        /// The underlying error.
        source: io::Error,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic {
                found,
            } => write!(fmt, "bad superblock magic `{found:#06x}`"),
            Self::BadExtentMagic {
                found,
            } => write!(fmt, "bad extent magic `{found:#06x}`"),
            Self::InodeOutOfRange {
                inode,
                count,
            } => write!(fmt, "inode `{inode}` out of range (filesystem has {count} inodes)"),
            Self::Unsupported(feature) => write!(fmt, "{feature} not supported"),
            Self::Decode {
                offset,
            } => write!(fmt, "truncated structure at offset {offset}"),
            Self::Io {
                offset,
                source,
            } => write!(fmt, "read at offset {offset}: {source}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io {
                source, ..
            } => Some(source),
            _ => None,
        }
    }
}

/// Result alias for filesystem operations.
pub type Result<T> = result::Result<T, Error>;
