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

//! Dump headers: the version line, the growth hint, and the tuning parameters stored with a full
//! dump.

use muck_db::DatabaseConfig;
use strum::{Display, EnumIter, IntoEnumIterator};
use tracing::debug;

/// The format every full dump is written in.
pub const DUMP_FORMAT_HEADER: &str = "***Foxen9 TinyMUCK DUMP Format***";
/// The format every delta section is written in.
pub const DELTAS_FORMAT_HEADER: &str = "****Foxen8 Deltas Dump Extention***";
pub const END_OF_DUMP: &str = "***END OF DUMP***";

/// Header flag: a parameter count and that many parameter lines follow.
pub const DB_PARMSINFO: i64 = 0x1;
/// Header flag: strings are dictionary compressed.
pub const DB_COMPRESSED: i64 = 0x2;

const TP_FLAG_DEFAULT: char = '%';
const TP_COMMENT: char = '#';
const TP_DELIMITER: char = '=';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum DumpVersion {
    /// No header line at all. Objects carry their lock and messages inline and have no
    /// timestamps.
    HeaderLess,
    Foxen5,
    Foxen6,
    Foxen7,
    Foxen8,
    Foxen9,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpKind {
    Full,
    Deltas,
}

impl DumpVersion {
    /// The historical load format number.
    pub fn load_format(&self) -> u8 {
        match self {
            DumpVersion::HeaderLess => 0,
            DumpVersion::Foxen5 => 7,
            DumpVersion::Foxen6 => 8,
            DumpVersion::Foxen7 => 9,
            DumpVersion::Foxen8 => 10,
            DumpVersion::Foxen9 => 11,
        }
    }

    pub fn has_timestamps(&self) -> bool {
        *self != DumpVersion::HeaderLess
    }

    pub fn full_header(&self) -> Option<String> {
        match self {
            DumpVersion::HeaderLess => None,
            v => Some(format!("***{v} TinyMUCK DUMP Format***")),
        }
    }

    /// Foxen9 never had a delta format of its own.
    pub fn deltas_header(&self) -> Option<String> {
        match self {
            DumpVersion::HeaderLess | DumpVersion::Foxen9 => None,
            v => Some(format!("****{v} Deltas Dump Extention***")),
        }
    }

    /// Identify a header line. Returns None for anything unrecognized.
    pub fn identify(line: &str) -> Option<(DumpVersion, DumpKind)> {
        let line = line.trim_end_matches(['\n', '\r']);
        DumpVersion::iter().find_map(|v| {
            if v.full_header().as_deref() == Some(line) {
                Some((v, DumpKind::Full))
            } else if v.deltas_header().as_deref() == Some(line) {
                Some((v, DumpKind::Deltas))
            } else {
                None
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuneParam {
    pub name: String,
    pub value: String,
    /// Written with a leading `%`: the value was the server default when dumped.
    pub at_default: bool,
}

impl TuneParam {
    /// Parse a `name=value` line. Comments and lines without a name or delimiter yield None.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.starts_with(TP_COMMENT) {
            return None;
        }
        let (name, value) = line.split_once(TP_DELIMITER)?;
        let name = name.trim();
        let (name, at_default) = match name.strip_prefix(TP_FLAG_DEFAULT) {
            Some(rest) => (rest, true),
            None => (name, false),
        };
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            value: value.trim_start().to_string(),
            at_default,
        })
    }

    pub fn to_line(&self) -> String {
        let flag = if self.at_default {
            TP_FLAG_DEFAULT.to_string()
        } else {
            String::new()
        };
        format!("{flag}{}{TP_DELIMITER}{}", self.name, self.value)
    }
}

/// The parameter block of a dump, in file order. Parameters this crate does not understand are
/// carried through to the next dump untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TuneParams {
    params: Vec<TuneParam>,
}

impl TuneParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TuneParam> {
        self.params.iter()
    }

    pub fn push(&mut self, param: TuneParam) {
        self.params.push(param);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.value.as_str())
    }

    /// Replace a parameter's value in place, or append it.
    pub fn set(&mut self, name: &str, value: &str) {
        match self
            .params
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
        {
            Some(p) => {
                p.value = value.to_string();
                p.at_default = false;
            }
            None => self.params.push(TuneParam {
                name: name.to_string(),
                value: value.to_string(),
                at_default: false,
            }),
        }
    }

    /// Apply every parameter the store understands. Returns how many took.
    pub fn apply_to(&self, config: &mut DatabaseConfig) -> usize {
        let mut applied = 0;
        for p in &self.params {
            if config.apply_tune_param(&p.name, &p.value) {
                applied += 1;
            } else {
                debug!(name = %p.name, "tuning parameter left for other layers");
            }
        }
        applied
    }

    /// These parameters with the store's current settings written over them.
    pub fn with_config(&self, config: &DatabaseConfig) -> TuneParams {
        let mut params = self.clone();
        for (name, value) in config.tune_params() {
            params.set(name, &value);
        }
        params
    }
}
