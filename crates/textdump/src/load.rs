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

//! Whole-file operations: loading a base dump and its deltas, and saving either kind.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use muck_db::{BackingFile, Database, Timestamps};
use tracing::{Level, info, span, trace};

use crate::header::{DumpKind, DumpVersion, TuneParams};
use crate::read::{DumpEntry, DumpObject, DumpReader, DumpReaderError, PropsLoadMode};
use crate::write::{DumpWriter, DumpWriterError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub version: DumpVersion,
    pub objects: usize,
    /// The parameter block as stored, including parameters that belong to other layers.
    pub params: TuneParams,
    /// How many of them the store took.
    pub applied_params: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    pub objects: usize,
    pub bytes: u64,
}

fn open_dump(path: &Path) -> Result<File, DumpReaderError> {
    File::open(path)
        .map_err(|e| DumpReaderError::CouldNotOpenFile(format!("{}: {e}", path.display())))
}

fn install_objects<R: Read>(
    db: &mut Database,
    reader: &mut DumpReader<R>,
    version: DumpVersion,
) -> Result<usize, DumpReaderError> {
    let mut count = 0;
    loop {
        let DumpEntry::Object(entry) = reader.read_entry(version)? else {
            return Ok(count);
        };
        let DumpObject {
            dbref,
            mut object,
            props,
        } = *entry;
        if !version.has_timestamps() {
            object.timestamps = Timestamps::new_object(db.now());
        }
        trace!(%dbref, name = %object.name, "installing object");
        db.install_object(dbref, object, props);
        count += 1;
    }
}

/// Replace the store's contents with a full dump. In paged mode the dump file stays open as
/// the backing file that properties are fetched from.
pub fn load_database(
    db: &mut Database,
    path: &Path,
    mode: PropsLoadMode,
) -> Result<LoadReport, DumpReaderError> {
    let span = span!(Level::INFO, "dump_load", path = %path.display());
    let _enter = span.enter();

    let mut reader = DumpReader::new(BufReader::new(open_dump(path)?), mode);
    let header = reader.read_header()?;
    if header.kind != DumpKind::Full {
        return Err(DumpReaderError::VersionError(format!(
            "{} is a delta dump, not a full one",
            path.display()
        )));
    }

    db.set_loading(true);
    db.grow(header.grow);
    let objects = match install_objects(db, &mut reader, header.version) {
        Ok(n) => n,
        Err(e) => {
            db.set_loading(false);
            return Err(e);
        }
    };
    if mode == PropsLoadMode::Paged {
        let backing = BackingFile::open(path)
            .map_err(|e| DumpReaderError::CouldNotOpenFile(format!("{}: {e}", path.display())))?;
        db.set_backing_file(Some(backing));
    }
    db.finish_load();

    let applied_params = header.params.apply_to(db.config_mut());
    info!(
        version = %header.version,
        objects,
        params = header.params.len(),
        applied_params,
        "dump loaded"
    );
    Ok(LoadReport {
        version: header.version,
        objects,
        params: header.params,
        applied_params,
    })
}

/// Overlay every delta section in `path`, in order, on the loaded store. Later entries for the
/// same object win. Returns how many entries were applied; a missing file counts as none.
pub fn load_deltas(db: &mut Database, path: &Path) -> Result<usize, DumpReaderError> {
    let span = span!(Level::INFO, "deltas_load", path = %path.display());
    let _enter = span.enter();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(DumpReaderError::CouldNotOpenFile(format!(
                "{}: {e}",
                path.display()
            )));
        }
    };
    // Delta entries are not in the backing file, so their properties have to be read now.
    let mut reader = DumpReader::new(BufReader::new(file), PropsLoadMode::Resident);
    db.set_loading(true);
    let mut count = 0;
    while !reader.at_eof()? {
        let header = reader.read_header()?;
        if header.kind != DumpKind::Deltas {
            db.set_loading(false);
            return Err(DumpReaderError::VersionError(format!(
                "expected a delta section, found a {} full dump header",
                header.version
            )));
        }
        match install_objects(db, &mut reader, header.version) {
            Ok(n) => count += n,
            Err(e) => {
                db.set_loading(false);
                return Err(e);
            }
        }
    }
    db.finish_load();
    info!(entries = count, "deltas applied");
    Ok(count)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".new");
    PathBuf::from(name)
}

fn finish_file(writer: DumpWriter<BufWriter<File>>) -> Result<(), DumpWriterError> {
    let file = writer
        .into_inner()?
        .into_inner()
        .map_err(io::IntoInnerError::into_error)?;
    file.sync_all()?;
    Ok(())
}

/// Write a full dump to `path` by way of a temporary file, then switch the store over to it as
/// the new backing file. The store's own tuning parameters overwrite those in `params`.
pub fn save_database(
    db: &mut Database,
    path: &Path,
    params: &TuneParams,
) -> Result<SaveReport, DumpWriterError> {
    let span = span!(Level::INFO, "dump_save", path = %path.display());
    let _enter = span.enter();

    let tmp = temp_path(path);
    let params = params.with_config(db.config());
    let mut writer = DumpWriter::new(BufWriter::new(File::create(&tmp)?));
    let layout = match writer.write_dump(db, &params) {
        Ok(layout) => layout,
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
    };
    let bytes = writer.pos();
    finish_file(writer)?;
    fs::rename(&tmp, path)?;

    let backing = BackingFile::open(path)?;
    let objects = layout.len();
    db.install_dump(backing, layout);
    info!(objects, bytes, "dump written");
    Ok(SaveReport { objects, bytes })
}

/// Append a delta section with every changed object to `path`. Returns how many were written.
pub fn append_deltas(db: &mut Database, path: &Path) -> Result<usize, DumpWriterError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = DumpWriter::new(BufWriter::new(file));
    let written = writer.write_deltas(db)?;
    finish_file(writer)?;
    info!(objects = written.len(), "delta dump appended");
    Ok(written.len())
}

/// Empty the delta file once a full dump has superseded it.
pub fn discard_deltas(path: &Path) -> io::Result<()> {
    match OpenOptions::new().write(true).truncate(true).open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
