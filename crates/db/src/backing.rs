// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use muck_props::PROPS_BLOCK_END;
use thiserror::Error;

/// First line of a property block as seen from its recorded position, which is just past the
/// block's leading `*`.
const BLOCK_START_TAIL: &str = "Props*";

#[derive(Debug, Error)]
pub enum BackingFileError {
    #[error("backing file I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("unexpected end of backing file in block at offset {0}")]
    UnexpectedEof(u64),
    #[error("no property block at offset {0}: found {1:?}")]
    NotAPropsBlock(u64, String),
}

/// One line of a property block and the offset it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLine {
    pub pos: u64,
    pub text: String,
}

/// The dump file that unloaded property sets and stub values are read back from.
pub struct BackingFile {
    path: PathBuf,
    reader: BufReader<File>,
}

fn trim_newline(bytes: &[u8]) -> String {
    let mut end = bytes.len();
    while end > 0 && matches!(bytes[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn is_block_end(bytes: &[u8]) -> bool {
    trim_newline(bytes).eq_ignore_ascii_case(PROPS_BLOCK_END)
}

impl BackingFile {
    pub fn open(path: &Path) -> Result<Self, BackingFileError> {
        let file = File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The next raw line, newline included. An empty result means end of file.
    fn next_raw(&mut self) -> Result<Vec<u8>, BackingFileError> {
        let mut buf = Vec::new();
        self.reader.read_until(b'\n', &mut buf)?;
        Ok(buf)
    }

    /// The single line starting at `pos`, without its newline.
    pub fn read_line_at(&mut self, pos: u64) -> Result<String, BackingFileError> {
        self.reader.seek(SeekFrom::Start(pos))?;
        let raw = self.next_raw()?;
        if raw.is_empty() {
            return Err(BackingFileError::UnexpectedEof(pos));
        }
        Ok(trim_newline(&raw))
    }

    /// Position at a block and consume its opening line.
    fn open_block(&mut self, pos: u64) -> Result<u64, BackingFileError> {
        self.reader.seek(SeekFrom::Start(pos))?;
        let first = self.next_raw()?;
        if first.is_empty() {
            return Err(BackingFileError::UnexpectedEof(pos));
        }
        let text = trim_newline(&first);
        if text != BLOCK_START_TAIL {
            return Err(BackingFileError::NotAPropsBlock(pos, text));
        }
        Ok(pos + first.len() as u64)
    }

    /// The property lines of the block at `pos`, each with its own offset, stopping before the
    /// end marker.
    pub fn read_props_block(&mut self, pos: u64) -> Result<Vec<BlockLine>, BackingFileError> {
        let mut cursor = self.open_block(pos)?;
        let mut lines = vec![];
        loop {
            let raw = self.next_raw()?;
            if raw.is_empty() {
                return Err(BackingFileError::UnexpectedEof(pos));
            }
            if is_block_end(&raw) {
                return Ok(lines);
            }
            lines.push(BlockLine {
                pos: cursor,
                text: trim_newline(&raw),
            });
            cursor += raw.len() as u64;
        }
    }

    /// Copy the property lines of the block at `pos` to `out` byte for byte, without the start
    /// and end markers.
    pub fn copy_props_block(
        &mut self,
        pos: u64,
        out: &mut dyn Write,
    ) -> Result<(), BackingFileError> {
        self.open_block(pos)?;
        loop {
            let raw = self.next_raw()?;
            if raw.is_empty() || !raw.ends_with(b"\n") {
                return Err(BackingFileError::UnexpectedEof(pos));
            }
            if is_block_end(&raw) {
                return Ok(());
            }
            out.write_all(&raw)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const DUMP: &str = "#0\nRoom Zero\n*Props*\n_/de:10:A plain room.\nsex:2:neuter\n*End*\n3\n";

    fn backing(contents: &str) -> (tempfile::NamedTempFile, BackingFile) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        let backing = BackingFile::open(file.path()).unwrap();
        (file, backing)
    }

    fn block_pos() -> u64 {
        DUMP.find("*Props*").unwrap() as u64 + 1
    }

    #[test]
    fn reads_block_lines_with_offsets() {
        let (_file, mut b) = backing(DUMP);
        let lines = b.read_props_block(block_pos()).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "_/de:10:A plain room.");
        assert_eq!(lines[0].pos, DUMP.find("_/de").unwrap() as u64);
        assert_eq!(lines[1].text, "sex:2:neuter");
        assert_eq!(b.read_line_at(lines[1].pos).unwrap(), "sex:2:neuter");
    }

    #[test]
    fn copies_block_verbatim() {
        let (_file, mut b) = backing(DUMP);
        let mut out = vec![];
        b.copy_props_block(block_pos(), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "_/de:10:A plain room.\nsex:2:neuter\n"
        );
    }

    #[test]
    fn rejects_wrong_offset() {
        let (_file, mut b) = backing(DUMP);
        assert!(matches!(
            b.read_props_block(0),
            Err(BackingFileError::NotAPropsBlock(0, _))
        ));
    }

    #[test]
    fn truncated_block() {
        let (_file, mut b) = backing("*Props*\nfoo:2:bar\n");
        assert!(matches!(
            b.read_props_block(1),
            Err(BackingFileError::UnexpectedEof(1))
        ));
    }
}
