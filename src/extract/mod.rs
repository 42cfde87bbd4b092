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

//! Extraction walker, materializing the filesystem tree on the host.

pub mod sidecar;

use ext4::DirEntry;
use ext4::Error;
use ext4::Ext4;
use ext4::FileKind;
use std::ffi::CString;
use std::fmt;
use std::fs;
use std::io;
use std::io::ErrorKind;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::symlink;
use std::path::Path;
use std::path::PathBuf;

/// An error during extraction.
#[derive(Debug)]
pub enum ExtractError {
    /// The filesystem parser failed.
    Fs(Error),
    /// A host-side operation failed, with the path concerned.
    Host(PathBuf, io::Error),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fs(err) => write!(fmt, "{err}"),
            Self::Host(path, err) => write!(fmt, "{}: {err}", path.display()),
        }
    }
}

impl From<Error> for ExtractError {
    fn from(err: Error) -> Self {
        Self::Fs(err)
    }
}

/// The way symlinks are materialized on the host.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SymlinkMode {
    /// Write a native symlink.
    #[default]
    Save,
    /// Write a regular file holding the target.
    Text,
    /// Write an empty regular file.
    Empty,
    /// Do not materialize the link.
    Skip,
}

/// The extraction walker.
///
/// Walks the source tree from the root directory, materializing regular files, directories and
/// symlinks. Other kinds are not materialized. Re-running over an existing output tree replaces
/// its contents.
pub struct Extractor {
    /// The parsed filesystem.
    pub fs: Ext4,
    /// Print each extracted path.
    pub verbose: bool,
    /// How symlinks are materialized.
    pub symlink_mode: SymlinkMode,
    /// The symlink table sink, if enabled.
    pub symlink_table: Option<sidecar::Sink>,
    /// The metadata table sink, if enabled.
    pub metadata_table: Option<sidecar::Sink>,
}

impl Extractor {
    /// Extracts the whole tree into the directory at `root`.
    pub fn run(&mut self, root: &Path) -> Result<(), ExtractError> {
        let entries = self.fs.root()?;
        self.extract_dir(&entries, root, "")
    }

    /// Extracts the directory whose entries are `entries` into `path`.
    ///
    /// `rpath` is the virtual path of the directory in the source tree, rooted at `/`.
    fn extract_dir(
        &mut self,
        entries: &[DirEntry],
        path: &Path,
        rpath: &str,
    ) -> Result<(), ExtractError> {
        if let Err(err) = fs::create_dir(path) {
            if err.kind() != ErrorKind::AlreadyExists {
                return Err(ExtractError::Host(path.to_path_buf(), err));
            }
        }
        for de in entries {
            if de.name == "." || de.name == ".." {
                continue;
            }
            let vpath = format!("{rpath}/{}", de.name);
            // Removed entries carry a zero inode and have no metadata to read
            if de.inode != 0 {
                if let Some(table) = &mut self.metadata_table {
                    let meta = self.fs.read_meta(de.inode)?;
                    table.write_meta(&vpath, &meta)?;
                }
            }
            let mut processed = false;
            match de.kind {
                FileKind::Regular => {
                    let (data, atime, mtime) = self.fs.read_file(de.inode)?;
                    let target = path.join(&de.name);
                    write_file(&target, &data)?;
                    apply_times(&target, atime, mtime)?;
                    processed = true;
                }
                FileKind::Directory => {
                    let sub = self.fs.read_dir(de.inode)?;
                    self.extract_dir(&sub, &path.join(&de.name), &vpath)?;
                }
                FileKind::Symlink => {
                    let target = self.fs.read_link(de.inode)?;
                    if let Some(table) = &mut self.symlink_table {
                        table.write_symlink(&vpath, &target)?;
                    }
                    processed = self.write_symlink_file(&path.join(&de.name), &target)?;
                }
                _ => {}
            }
            if processed && self.verbose {
                println!("{vpath}");
            }
        }
        Ok(())
    }

    /// Materializes the symlink at `link` pointing at `target`, according to the configured
    /// mode.
    ///
    /// Returns `false` when the mode skips the link entirely.
    fn write_symlink_file(&self, link: &Path, target: &str) -> Result<bool, ExtractError> {
        match self.symlink_mode {
            SymlinkMode::Skip => return Ok(false),
            SymlinkMode::Text => write_file(link, target.as_bytes())?,
            SymlinkMode::Empty => write_file(link, b"")?,
            SymlinkMode::Save => {
                // Link under a temporary name, then rename over, so re-extraction replaces an
                // existing link atomically
                let mut tmp = link.as_os_str().to_owned();
                tmp.push(".tmp");
                let tmp = PathBuf::from(tmp);
                symlink(target, &tmp).map_err(|err| ExtractError::Host(tmp.clone(), err))?;
                fs::rename(&tmp, link)
                    .map_err(|err| ExtractError::Host(link.to_path_buf(), err))?;
            }
        }
        Ok(true)
    }
}

/// Writes `data` to the file at `path`, creating or truncating it.
fn write_file(path: &Path, data: &[u8]) -> Result<(), ExtractError> {
    fs::write(path, data).map_err(|err| ExtractError::Host(path.to_path_buf(), err))
}

/// Applies the access and modification timestamps to the file at `path`.
fn apply_times(path: &Path, atime: u32, mtime: u32) -> Result<(), ExtractError> {
    let cpath = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        ExtractError::Host(path.to_path_buf(), io::Error::from(ErrorKind::InvalidInput))
    })?;
    let times = [
        libc::timeval {
            tv_sec: atime as _,
            tv_usec: 0,
        },
        libc::timeval {
            tv_sec: mtime as _,
            tv_usec: 0,
        },
    ];
    let ret = unsafe { libc::utimes(cpath.as_ptr(), times.as_ptr()) };
    if ret < 0 {
        return Err(ExtractError::Host(
            path.to_path_buf(),
            io::Error::last_os_error(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::process;

    #[test]
    fn symlink_modes() {
        let dir = env::temp_dir().join(format!("ext4extract-test-{}", process::id()));
        fs::create_dir_all(&dir).unwrap();

        let link = dir.join("text");
        let extractor = |mode| Extractor {
            fs: ext4::Ext4::load(Box::new(fake_image())).unwrap(),
            verbose: false,
            symlink_mode: mode,
            symlink_table: None,
            metadata_table: None,
        };

        assert!(extractor(SymlinkMode::Text).write_symlink_file(&link, "target").unwrap());
        assert_eq!(fs::read(&link).unwrap(), b"target");

        let link = dir.join("empty");
        assert!(extractor(SymlinkMode::Empty).write_symlink_file(&link, "target").unwrap());
        assert_eq!(fs::read(&link).unwrap(), b"");

        let link = dir.join("native");
        assert!(extractor(SymlinkMode::Save).write_symlink_file(&link, "target").unwrap());
        assert_eq!(fs::read_link(&link).unwrap().to_str(), Some("target"));
        // Re-running replaces the existing link
        assert!(extractor(SymlinkMode::Save).write_symlink_file(&link, "other").unwrap());
        assert_eq!(fs::read_link(&link).unwrap().to_str(), Some("other"));

        let link = dir.join("skipped");
        assert!(!extractor(SymlinkMode::Skip).write_symlink_file(&link, "target").unwrap());
        assert!(!link.exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    /// A bare image holding nothing but a valid superblock.
    fn fake_image() -> Vec<u8> {
        let mut img = vec![0; 4096];
        img[1080] = 0x53;
        img[1081] = 0xef;
        img
    }
}
