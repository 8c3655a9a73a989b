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

use std::io::{self, BufRead, BufReader, Cursor, Read};

use muck_boolexp::{LegacyLockReader, Lock};
use muck_common::{BitEnum, Dbref, ObjFlag, ObjectType, TYPE_MASK};
use muck_db::{LoadedProps, Object, Timestamps, TypeData};
use muck_props::{
    DEFAULT_GENDER_PROP, PROPS_BLOCK_END, PropBlockLine, PropDir, PropFlags, PropValue,
    decode_legacy_line, is_listen_prop, parse_block_line,
};
use tracing::{info, warn};

use crate::header::{
    DB_COMPRESSED, DB_PARMSINFO, DumpKind, DumpVersion, END_OF_DUMP, TuneParam, TuneParams,
};

const NUMBER_TOKEN: u8 = b'#';
const LOOKUP_TOKEN: u8 = b'*';
const PROPS_BLOCK_TAIL: &str = "Props*";
const LEGACY_PROPS_END: &str = "***Property list end ***";

// Header-less dumps keep these in the flag word instead of in properties.
const ANTILOCK: u32 = 0x8;
const GENDER_MASK: u32 = 0x3000;
const GENDER_SHIFT: u32 = 12;
const GENDER_NAMES: [&str; 3] = ["neuter", "female", "male"];

const LOCK_PROP: &str = "_/lok";
const DESC_PROP: &str = "_/de";
const MESSAGE_PROPS: [&str; 4] = ["_/fl", "_/sc", "_/ofl", "_/osc"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropsLoadMode {
    /// Leave property blocks in the file to be fetched on first use.
    #[default]
    Paged,
    /// Read every property while loading.
    Resident,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpHeader {
    pub version: DumpVersion,
    pub kind: DumpKind,
    /// How many object slots the dump expects.
    pub grow: usize,
    pub params: TuneParams,
}

#[derive(Debug)]
pub struct DumpObject {
    pub dbref: Dbref,
    pub object: Object,
    pub props: LoadedProps,
}

#[derive(Debug)]
pub enum DumpEntry {
    Object(Box<DumpObject>),
    End,
}

#[derive(Debug, thiserror::Error)]
pub enum DumpReaderError {
    #[error("could not open dump: {0}")]
    CouldNotOpenFile(String),
    #[error("io error: {0} @ line {1}")]
    IoError(io::Error, usize),
    #[error("parse error: {0} @ line {1}")]
    ParseError(String, usize),
    #[error("dump version error: {0}")]
    VersionError(String),
}

/// What an object's `*` block turned out to hold.
enum PropsBlock {
    Skipped { pos: u64 },
    Read(PropDir),
}

/// Fields that only header-less dumps carry inline. They become properties.
#[derive(Default)]
struct InlineFields {
    description: String,
    lock: Lock,
    messages: Vec<String>,
    gender: u32,
}

impl InlineFields {
    fn store_into(self, dir: &mut PropDir) {
        let mut put = |path: &str, value: PropValue| {
            if let Some(node) = dir.new_elem(path) {
                node.assign(value, PropFlags::new());
            }
        };
        if !self.lock.is_unlocked() {
            put(LOCK_PROP, PropValue::Lock(self.lock));
        }
        if !self.description.is_empty() {
            put(DESC_PROP, PropValue::Str(self.description));
        }
        for (path, message) in MESSAGE_PROPS.into_iter().zip(self.messages) {
            if !message.is_empty() {
                put(path, PropValue::Str(message));
            }
        }
        if let Some(gender) = (self.gender as usize)
            .checked_sub(1)
            .and_then(|g| GENDER_NAMES.get(g))
        {
            put(DEFAULT_GENDER_PROP, PropValue::Str(gender.to_string()));
        }
    }
}

pub struct DumpReader<R: Read> {
    /// Lines consumed so far.
    pub line_num: usize,
    pos: u64,
    reader: BufReader<R>,
    mode: PropsLoadMode,
}

impl<R: Read> DumpReader<R> {
    pub fn new(reader: BufReader<R>, mode: PropsLoadMode) -> Self {
        Self {
            line_num: 0,
            pos: 0,
            reader,
            mode,
        }
    }

    /// Byte offset of the next unread character.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    fn parse_error(&self, msg: String) -> DumpReaderError {
        DumpReaderError::ParseError(msg, self.line_num)
    }

    fn peek_byte(&mut self) -> Result<Option<u8>, DumpReaderError> {
        let line_num = self.line_num;
        let buf = self
            .reader
            .fill_buf()
            .map_err(|e| DumpReaderError::IoError(e, line_num))?;
        Ok(buf.first().copied())
    }

    pub fn at_eof(&mut self) -> Result<bool, DumpReaderError> {
        Ok(self.peek_byte()?.is_none())
    }

    fn consume_byte(&mut self) {
        self.reader.consume(1);
        self.pos += 1;
    }

    /// The next line without its line ending, or None at the end of input.
    fn next_line(&mut self) -> Result<Option<String>, DumpReaderError> {
        let mut buf = Vec::new();
        let n = self
            .reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| DumpReaderError::IoError(e, self.line_num))?;
        if n == 0 {
            return Ok(None);
        }
        self.pos += n as u64;
        self.line_num += 1;
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    fn read_next_line(&mut self) -> Result<String, DumpReaderError> {
        match self.next_line()? {
            Some(line) => Ok(line),
            None => Err(DumpReaderError::IoError(
                io::Error::new(io::ErrorKind::UnexpectedEof, "dump ends early"),
                self.line_num,
            )),
        }
    }

    fn read_num(&mut self) -> Result<i64, DumpReaderError> {
        let line = self.read_next_line()?;
        line.trim()
            .parse::<i64>()
            .map_err(|_| self.parse_error(format!("expected a number, found {line:?}")))
    }

    /// A numeric field. A field cut short by the next object or the end marker reads as 0, and
    /// nothing is consumed.
    fn read_field(&mut self) -> Result<i64, DumpReaderError> {
        if matches!(self.peek_byte()?, Some(NUMBER_TOKEN | LOOKUP_TOKEN)) {
            return Ok(0);
        }
        self.read_num()
    }

    fn to_dbref(&self, n: i64) -> Result<Dbref, DumpReaderError> {
        i32::try_from(n)
            .map(Dbref::mk_id)
            .map_err(|_| self.parse_error(format!("object reference out of range: {n}")))
    }

    fn read_ref(&mut self) -> Result<Dbref, DumpReaderError> {
        let n = self.read_field()?;
        self.to_dbref(n)
    }

    /// The first trailer field, which may already have been read in place of a property block.
    fn trailer_ref(&mut self, first: &mut Option<i64>) -> Result<Dbref, DumpReaderError> {
        match first.take() {
            Some(n) => self.to_dbref(n),
            None => self.read_ref(),
        }
    }

    fn read_legacy_lock(&mut self) -> Result<Lock, DumpReaderError> {
        let line = self.read_next_line()?;
        let mut text = Cursor::new(format!("{line}\n").into_bytes());
        LegacyLockReader::new(&mut text)
            .read_lock()
            .map_err(|e| self.parse_error(format!("bad lock {line:?}: {e}")))
    }

    pub fn read_header(&mut self) -> Result<DumpHeader, DumpReaderError> {
        let mut header = DumpHeader {
            version: DumpVersion::HeaderLess,
            kind: DumpKind::Full,
            grow: 0,
            params: TuneParams::new(),
        };
        if self.peek_byte()? != Some(LOOKUP_TOKEN) {
            info!("no header line, reading a header-less dump");
            return Ok(header);
        }
        let line = self.read_next_line()?;
        let Some((version, kind)) = DumpVersion::identify(&line) else {
            return Err(DumpReaderError::VersionError(format!(
                "unrecognized dump header {line:?}"
            )));
        };
        info!(%version, ?kind, "dump header");
        header.version = version;
        header.kind = kind;
        if kind == DumpKind::Deltas {
            return Ok(header);
        }

        let grow = self.read_num()?;
        header.grow = usize::try_from(grow)
            .map_err(|_| self.parse_error(format!("bad growth hint {grow}")))?;
        let dbflags = self.read_num()?;
        if dbflags & DB_COMPRESSED != 0 {
            return Err(DumpReaderError::VersionError(
                "compressed dumps are not supported, decompress it first".to_string(),
            ));
        }
        if dbflags & DB_PARMSINFO != 0 {
            let count = self.read_num()?;
            for _ in 0..count {
                let Some(line) = self.next_line()? else {
                    break;
                };
                if let Some(param) = TuneParam::parse(&line) {
                    header.params.push(param);
                }
            }
        }
        Ok(header)
    }

    /// The next object, or the end marker.
    pub fn read_entry(&mut self, version: DumpVersion) -> Result<DumpEntry, DumpReaderError> {
        let line = self.read_next_line()?;
        if let Some(id) = line.strip_prefix(NUMBER_TOKEN as char) {
            let dbref = match id.trim().parse::<i32>() {
                Ok(n) if n >= 0 => Dbref::mk_id(n),
                _ => return Err(self.parse_error(format!("bad object number {line:?}"))),
            };
            let (object, props) = self.read_object(dbref, version)?;
            return Ok(DumpEntry::Object(Box::new(DumpObject {
                dbref,
                object,
                props,
            })));
        }
        if line == END_OF_DUMP {
            return Ok(DumpEntry::End);
        }
        Err(self.parse_error(format!(
            "expected an object or the end of the dump, found {line:?}"
        )))
    }

    fn read_object(
        &mut self,
        dbref: Dbref,
        version: DumpVersion,
    ) -> Result<(Object, LoadedProps), DumpReaderError> {
        let inline = version == DumpVersion::HeaderLess;
        let mut object = Object::cleared(0);
        let mut fields = InlineFields::default();

        object.name = self.read_next_line()?;
        if inline {
            fields.description = self.read_next_line()?;
        }
        object.location = self.read_ref()?;
        object.contents = self.read_ref()?;
        object.next = self.read_ref()?;
        if inline {
            fields.lock = self.read_legacy_lock()?;
            for _ in MESSAGE_PROPS {
                let message = self.read_next_line()?;
                fields.messages.push(message);
            }
        }

        let mut word = self.read_field()? as u32;
        if inline {
            if word & ANTILOCK != 0 {
                fields.lock = fields.lock.negate();
            }
            fields.gender = (word & GENDER_MASK) >> GENDER_SHIFT;
            word &= !(ANTILOCK | GENDER_MASK);
        }
        let ty = ObjectType::from_flag_word(word);
        object.flags = BitEnum::from_raw(word & !TYPE_MASK).without(ObjFlag::dump_mask());

        if version.has_timestamps() {
            object.timestamps = Timestamps {
                created: self.read_field()?,
                last_used: self.read_field()?,
                use_count: self.read_field()?,
                modified: self.read_field()?,
            };
        }

        let mut first_field = None;
        let mut listener = false;
        let block = if self.peek_byte()? == Some(LOOKUP_TOKEN) {
            self.consume_byte();
            Some(self.read_props_block(inline, &mut listener)?)
        } else {
            first_field = Some(self.read_field()?);
            None
        };
        if listener {
            object.flags.set(ObjFlag::Listener);
        }

        object.data = match ty {
            ObjectType::Thing => {
                let home = self.trailer_ref(&mut first_field)?;
                let exits = self.read_ref()?;
                object.owner = self.read_ref()?;
                TypeData::Thing { home, exits }
            }
            ObjectType::Room => {
                let dropto = self.trailer_ref(&mut first_field)?;
                let exits = self.read_ref()?;
                object.owner = self.read_ref()?;
                TypeData::Room { dropto, exits }
            }
            ObjectType::Exit => {
                let ndest = match first_field.take() {
                    Some(n) => n,
                    None => self.read_field()?,
                };
                let mut dests = Vec::with_capacity(ndest.clamp(0, 64) as usize);
                for _ in 0..ndest {
                    dests.push(self.read_ref()?);
                }
                object.owner = self.read_ref()?;
                TypeData::Exit { dests }
            }
            ObjectType::Player => {
                let home = self.trailer_ref(&mut first_field)?;
                let exits = self.read_ref()?;
                let password = self.read_next_line()?;
                object.owner = dbref;
                TypeData::Player {
                    home,
                    exits,
                    password,
                }
            }
            ObjectType::Program => {
                object.owner = self.trailer_ref(&mut first_field)?;
                object.flags.clear(ObjFlag::Internal);
                TypeData::Program
            }
            ObjectType::Garbage => TypeData::Garbage,
        };

        let props = match block {
            Some(PropsBlock::Skipped { pos }) => LoadedProps::OnDisk { pos },
            Some(PropsBlock::Read(mut dir)) => {
                if inline {
                    fields.store_into(&mut dir);
                }
                LoadedProps::Resident(dir)
            }
            None if inline || self.mode == PropsLoadMode::Resident => {
                let mut dir = PropDir::new();
                if inline {
                    fields.store_into(&mut dir);
                }
                LoadedProps::Resident(dir)
            }
            None => LoadedProps::OnDisk { pos: 0 },
        };
        Ok((object, props))
    }

    /// Everything after the `*` that opens a property block. Structured blocks are left on disk
    /// in paged mode; legacy lists are always read.
    fn read_props_block(
        &mut self,
        inline: bool,
        listener: &mut bool,
    ) -> Result<PropsBlock, DumpReaderError> {
        let pos = self.pos;
        let first = self.read_next_line()?;
        if first != PROPS_BLOCK_TAIL {
            return self.read_legacy_props(listener).map(PropsBlock::Read);
        }

        let resident = inline || self.mode == PropsLoadMode::Resident;
        let mut dir = PropDir::new();
        loop {
            let line = self.read_next_line()?;
            if line.eq_ignore_ascii_case(PROPS_BLOCK_END) {
                break;
            }
            if !resident {
                if let Some((name, _)) = line.split_once(muck_common::PROP_DELIMITER) {
                    *listener |= is_listen_prop(name);
                }
                continue;
            }
            let raw = match parse_block_line(&line) {
                Ok(PropBlockLine::Prop(raw)) => raw,
                Ok(PropBlockLine::End) => break,
                Ok(PropBlockLine::Skip) => continue,
                Err(e) => {
                    warn!(line = self.line_num, error = %e, "skipping corrupt property line");
                    continue;
                }
            };
            match raw.decode_value(|d| d.index().is_some()) {
                Ok(value) => {
                    *listener |= is_listen_prop(raw.name);
                    if let Some(node) = dir.new_elem(raw.name) {
                        node.assign(value, raw.flags());
                    }
                }
                Err(e) => {
                    warn!(line = self.line_num, error = %e, "skipping corrupt property line")
                }
            }
        }
        if resident {
            Ok(PropsBlock::Read(dir))
        } else {
            Ok(PropsBlock::Skipped { pos })
        }
    }

    /// `name:value` lines, `^N` for integers.
    fn read_legacy_props(&mut self, listener: &mut bool) -> Result<PropDir, DumpReaderError> {
        let mut dir = PropDir::new();
        loop {
            let line = self.read_next_line()?;
            if line.eq_ignore_ascii_case(PROPS_BLOCK_END) || line == LEGACY_PROPS_END {
                return Ok(dir);
            }
            let Some((name, value)) = decode_legacy_line(&line) else {
                warn!(line = self.line_num, "skipping legacy property line without a delimiter");
                continue;
            };
            if name.is_empty() || matches!(value, PropValue::Dir) {
                continue;
            }
            *listener |= is_listen_prop(name);
            if let Some(node) = dir.new_elem(name) {
                node.assign(value, PropFlags::new());
            }
        }
    }
}
