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

use std::io::{self, Write};

use muck_common::{Dbref, ObjFlag};
use muck_db::{BackingFileError, Database, DumpedProps, Object, TypeData};
use muck_props::{PROPS_BLOCK_END, PROPS_BLOCK_START, PropDir, encode_prop_line};

use crate::header::{
    DB_PARMSINFO, DELTAS_FORMAT_HEADER, DUMP_FORMAT_HEADER, END_OF_DUMP, TuneParams,
};

#[derive(Debug, thiserror::Error)]
pub enum DumpWriterError {
    #[error("io error writing dump: {0}")]
    IoError(#[from] io::Error),
    #[error("could not copy an unloaded property block: {0}")]
    BackingError(#[from] BackingFileError),
}

/// Counts bytes on their way through, so property positions can be recorded as they are
/// written.
struct CountingWriter<W: Write> {
    inner: W,
    pos: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub struct DumpWriter<W: Write> {
    writer: CountingWriter<W>,
}

impl<W: Write> DumpWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: CountingWriter {
                inner: writer,
                pos: 0,
            },
        }
    }

    /// Bytes written so far.
    pub fn pos(&self) -> u64 {
        self.writer.pos
    }

    pub fn into_inner(mut self) -> Result<W, DumpWriterError> {
        self.writer.flush()?;
        Ok(self.writer.inner)
    }

    fn write_ref(&mut self, r: Dbref) -> Result<(), io::Error> {
        writeln!(self.writer, "{}", r.id())
    }

    fn write_header(&mut self, db_top: usize, params: &TuneParams) -> Result<(), io::Error> {
        writeln!(self.writer, "{DUMP_FORMAT_HEADER}")?;
        writeln!(self.writer, "{db_top}")?;
        writeln!(self.writer, "{DB_PARMSINFO}")?;
        writeln!(self.writer, "{}", params.len())?;
        for param in params.iter() {
            writeln!(self.writer, "{}", param.to_line())?;
        }
        Ok(())
    }

    fn write_fields(&mut self, o: &Object) -> Result<(), io::Error> {
        writeln!(self.writer, "{}", o.name)?;
        self.write_ref(o.location)?;
        self.write_ref(o.contents)?;
        self.write_ref(o.next)?;
        let word = o.flag_word() & !ObjFlag::dump_mask().to_u32();
        writeln!(self.writer, "{}", word as i32)?;
        let ts = &o.timestamps;
        for t in [ts.created, ts.last_used, ts.use_count, ts.modified] {
            writeln!(self.writer, "{t}")?;
        }
        Ok(())
    }

    fn write_trailer(&mut self, o: &Object) -> Result<(), io::Error> {
        match &o.data {
            TypeData::Thing { home, exits } => {
                self.write_ref(*home)?;
                self.write_ref(*exits)?;
                self.write_ref(o.owner)
            }
            TypeData::Room { dropto, exits } => {
                self.write_ref(*dropto)?;
                self.write_ref(*exits)?;
                self.write_ref(o.owner)
            }
            TypeData::Exit { dests } => {
                writeln!(self.writer, "{}", dests.len())?;
                for d in dests {
                    self.write_ref(*d)?;
                }
                self.write_ref(o.owner)
            }
            TypeData::Player {
                home,
                exits,
                password,
            } => {
                self.write_ref(*home)?;
                self.write_ref(*exits)?;
                writeln!(self.writer, "{password}")
            }
            TypeData::Program => self.write_ref(o.owner),
            TypeData::Garbage => Ok(()),
        }
    }

    /// Nodes in order, each directory's contents right after its own line. Positions of the
    /// pageable values are collected into `values`.
    fn write_propdir(
        &mut self,
        dir: &PropDir,
        prefix: &str,
        values: &mut Vec<(String, u64)>,
    ) -> Result<(), io::Error> {
        for node in dir.iter() {
            let line_pos = self.writer.pos;
            if let Some(line) = encode_prop_line(prefix, node) {
                writeln!(self.writer, "{line}")?;
                if node.prop_type().is_pageable() {
                    values.push((format!("{prefix}{}", node.name()), line_pos));
                }
            }
            if node.has_propdir() {
                let sub = format!("{prefix}{}/", node.name());
                self.write_propdir(node.propdir(), &sub, values)?;
            }
        }
        Ok(())
    }

    fn write_props(
        &mut self,
        db: &mut Database,
        obj: Dbref,
    ) -> Result<DumpedProps, DumpWriterError> {
        let pos = self.writer.pos + 1;
        writeln!(self.writer, "{PROPS_BLOCK_START}")?;
        let mut values = vec![];
        match db.props_for_dump(obj) {
            Some(props) => self.write_propdir(props, "/", &mut values)?,
            None => {
                db.copy_unloaded_props(obj, &mut self.writer)?;
            }
        }
        writeln!(self.writer, "{PROPS_BLOCK_END}")?;
        Ok(DumpedProps { pos, values })
    }

    fn write_object(
        &mut self,
        db: &mut Database,
        obj: Dbref,
    ) -> Result<DumpedProps, DumpWriterError> {
        let Some(o) = db.get(obj) else {
            return Ok(DumpedProps::default());
        };
        writeln!(self.writer, "#{}", obj.id())?;
        self.write_fields(o)?;
        let dumped = self.write_props(db, obj)?;
        if let Some(o) = db.get(obj) {
            self.write_trailer(o)?;
        }
        Ok(dumped)
    }

    /// Write every object, highest number first, and return where each one's properties
    /// landed. Nothing in the store changes; hand the layout to
    /// [`Database::install_dump`] once the output is safely on disk.
    pub fn write_dump(
        &mut self,
        db: &mut Database,
        params: &TuneParams,
    ) -> Result<Vec<(Dbref, DumpedProps)>, DumpWriterError> {
        let db_top = db.db_top();
        self.write_header(db_top, params)?;
        let mut layout = Vec::with_capacity(db_top);
        for i in (0..db_top).rev() {
            let obj = Dbref::mk_id(i as i32);
            let dumped = self.write_object(db, obj)?;
            layout.push((obj, dumped));
        }
        writeln!(self.writer, "{END_OF_DUMP}")?;
        self.writer.flush()?;
        Ok(layout)
    }

    /// Write a delta section holding every object changed since the last dump, and clear their
    /// changed flags. Returns the objects written.
    pub fn write_deltas(&mut self, db: &mut Database) -> Result<Vec<Dbref>, DumpWriterError> {
        let changed: Vec<Dbref> = db
            .objects()
            .filter(|(_, o)| o.flags.contains(ObjFlag::ObjectChanged))
            .map(|(d, _)| d)
            .collect();
        writeln!(self.writer, "{DELTAS_FORMAT_HEADER}")?;
        for obj in &changed {
            self.write_object(db, *obj)?;
        }
        writeln!(self.writer, "{END_OF_DUMP}")?;
        self.writer.flush()?;
        for obj in &changed {
            if let Some(o) = db.get_mut(*obj) {
                o.flags.clear(ObjFlag::ObjectChanged);
            }
        }
        Ok(changed)
    }
}
