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

//! Sidecar table writers.
//!
//! The symlink and metadata tables are line-oriented text reports. Paths are virtual paths in the
//! source tree, rooted at `/`. The value escaping is kept here so it can be changed without
//! touching the parser.

use super::ExtractError;
use ext4::Metadata;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

/// A sidecar table sink.
pub struct Sink {
    /// The path of the table, for error reporting.
    path: PathBuf,
    /// The opened table.
    file: File,
}

impl Sink {
    /// Creates the table at `path`, truncating a previous one.
    pub fn create(path: PathBuf) -> Result<Self, ExtractError> {
        let file = File::create(&path).map_err(|err| ExtractError::Host(path.clone(), err))?;
        Ok(Self {
            path,
            file,
        })
    }

    /// Appends one line to the table.
    fn write_line(&mut self, line: &str) -> Result<(), ExtractError> {
        writeln!(self.file, "{line}").map_err(|err| ExtractError::Host(self.path.clone(), err))
    }

    /// Records the symlink at `path` pointing at `target`.
    pub fn write_symlink(&mut self, path: &str, target: &str) -> Result<(), ExtractError> {
        self.write_line(&symlink_line(path, target))
    }

    /// Records the metadata of the entry at `path`.
    pub fn write_meta(&mut self, path: &str, meta: &Metadata) -> Result<(), ExtractError> {
        self.write_line(&meta_line(path, meta))
    }
}

/// Builds a symlink table line.
fn symlink_line(path: &str, target: &str) -> String {
    format!("path=\"{path}\" target=\"{target}\"")
}

/// Escapes a raw attribute value into printable ASCII.
fn escape_value(value: &[u8]) -> String {
    value.escape_ascii().to_string()
}

/// Builds a metadata table line.
fn meta_line(path: &str, meta: &Metadata) -> String {
    let mut line = format!(
        "path=\"{path}\" inode=\"{}\" type=\"{}\" size=\"{}\" ctime=\"{}\" mtime=\"{}\" uid=\"{}\" gid=\"{}\" mode=\"{}\"",
        meta.inode,
        meta.kind.code(),
        meta.size,
        meta.ctime,
        meta.mtime,
        meta.uid,
        meta.gid,
        meta.mode,
    );
    for (key, value) in &meta.xattr {
        match value {
            Some(value) => {
                line.push_str(&format!(" {key}=\"{}\"", escape_value(value)));
            }
            None => {
                line.push(' ');
                line.push_str(key);
            }
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use ext4::FileKind;
    use std::collections::HashMap;

    fn sample_meta() -> Metadata {
        Metadata {
            inode: 11,
            kind: FileKind::Regular,
            size: 6,
            ctime: 1700000000,
            mtime: 1700000000,
            uid: 1000,
            gid: 100,
            mode: 0x81a4,
            xattr: HashMap::new(),
        }
    }

    #[test]
    fn symlink_line_format() {
        assert_eq!(
            symlink_line("/etc/mtab", "/proc/self/mounts"),
            "path=\"/etc/mtab\" target=\"/proc/self/mounts\""
        );
    }

    #[test]
    fn meta_line_format() {
        assert_eq!(
            meta_line("/hello", &sample_meta()),
            "path=\"/hello\" inode=\"11\" type=\"1\" size=\"6\" ctime=\"1700000000\" \
             mtime=\"1700000000\" uid=\"1000\" gid=\"100\" mode=\"33188\""
        );
    }

    #[test]
    fn meta_line_xattr() {
        let mut meta = sample_meta();
        meta.xattr
            .insert("security.selinux".to_string(), Some(b"system_u\n".to_vec()));
        let line = meta_line("/hello", &meta);
        assert!(line.ends_with(" security.selinux=\"system_u\\n\""));

        let mut meta = sample_meta();
        meta.xattr.insert("user.flag".to_string(), None);
        let line = meta_line("/hello", &meta);
        assert!(line.ends_with(" user.flag"));
    }
}
