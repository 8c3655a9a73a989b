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
//! The property line format used inside `*Props*` ... `*End*` blocks of a dump:
//! `path:flags:value`, one property per line.

use muck_boolexp::parse_lock_for_load;
use muck_common::{Dbref, PROP_DELIMITER, is_number};
use thiserror::Error;

use crate::flags::{PropFlag, PropFlags, PropType, internal_flags};
use crate::node::{PropNode, PropValue};

pub const PROPS_BLOCK_START: &str = "*Props*";
pub const PROPS_BLOCK_END: &str = "*End*";

/// One property line that could not be used. The rest of the block is unaffected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PropLineError {
    #[error("flag delimiter not found: {0}")]
    MissingFlagDelimiter(String),
    #[error("value delimiter not found: {0}")]
    MissingValueDelimiter(String),
    #[error("corrupt property flags: {0}")]
    BadFlags(String),
    #[error("corrupt integer value: {0}")]
    BadInteger(String),
    #[error("corrupt dbref value: {0}")]
    BadRef(String),
    #[error("corrupt float value: {0}")]
    BadFloat(String),
    #[error("unknown property type in flags {0}")]
    UnknownType(u16),
}

/// A line of a property block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropBlockLine<'a> {
    End,
    /// A bare `*`, ignored.
    Skip,
    Prop(RawPropLine<'a>),
}

/// A property line split into its three fields; the value is not interpreted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPropLine<'a> {
    pub name: &'a str,
    pub raw_flags: u16,
    pub value: &'a str,
}

pub fn parse_block_line(line: &str) -> Result<PropBlockLine<'_>, PropLineError> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line == PROPS_BLOCK_END {
        return Ok(PropBlockLine::End);
    }
    if line == "*" {
        return Ok(PropBlockLine::Skip);
    }
    let Some((name, rest)) = line.split_once(PROP_DELIMITER) else {
        return Err(PropLineError::MissingFlagDelimiter(line.to_string()));
    };
    let Some((flags, value)) = rest.split_once(PROP_DELIMITER) else {
        return Err(PropLineError::MissingValueDelimiter(line.to_string()));
    };
    if !is_number(flags) {
        return Err(PropLineError::BadFlags(line.to_string()));
    }
    let raw_flags = flags
        .parse::<i64>()
        .map_err(|_| PropLineError::BadFlags(line.to_string()))? as u16;
    Ok(PropBlockLine::Prop(RawPropLine {
        name,
        raw_flags,
        value,
    }))
}

impl RawPropLine<'_> {
    pub fn prop_type(&self) -> Result<PropType, PropLineError> {
        PropType::from_flag_word(self.raw_flags).ok_or(PropLineError::UnknownType(self.raw_flags))
    }

    /// The modifier flags as stored. In-memory markers are dropped.
    pub fn flags(&self) -> PropFlags {
        let mut flags = PropFlags::from_raw(u32::from(self.raw_flags) & !0x7);
        flags.clear(PropFlag::Unloaded);
        flags
    }

    /// Interpret the value text. Lock keys are checked with `is_valid_ref`.
    pub fn decode_value(
        &self,
        is_valid_ref: impl Fn(Dbref) -> bool,
    ) -> Result<PropValue, PropLineError> {
        let value = self.value;
        match self.prop_type()? {
            PropType::Dir => Ok(PropValue::Dir),
            PropType::Str => Ok(PropValue::Str(value.to_string())),
            PropType::Lock => Ok(PropValue::Lock(parse_lock_for_load(value, is_valid_ref))),
            PropType::Int => match value.parse::<i32>() {
                Ok(i) if is_number(value) => Ok(PropValue::Int(i)),
                _ => Err(PropLineError::BadInteger(value.to_string())),
            },
            PropType::Ref => match value.parse::<i32>() {
                Ok(r) if is_number(value) => Ok(PropValue::Ref(Dbref::mk_id(r))),
                _ => Err(PropLineError::BadRef(value.to_string())),
            },
            PropType::Float => value
                .trim()
                .parse::<f64>()
                .map(PropValue::Float)
                .map_err(|_| PropLineError::BadFloat(value.to_string())),
        }
    }
}

/// Floats are written so that they read back exactly; infinities and NaN by name.
#[must_use]
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{value:?}")
    }
}

/// Encode one node as a property line under the directory `dir` (`"/"` or `"/a/b/"`). Values
/// that read back as "no value" are not written at all, and neither are stubs: those must be
/// fetched before writing.
pub fn encode_prop_line(dir: &str, node: &PropNode) -> Option<String> {
    let value = match node.value() {
        PropValue::Dir | PropValue::Stub { .. } => return None,
        PropValue::Lock(lock) if lock.is_unlocked() => return None,
        v if v.is_empty() => return None,
        PropValue::Str(s) => s.clone(),
        PropValue::Int(i) => i.to_string(),
        PropValue::Float(f) => format_float(*f),
        PropValue::Ref(r) => r.id().to_string(),
        PropValue::Lock(lock) => lock.unparse(),
    };
    let flags = u32::from(node.raw_flags()) & !internal_flags().to_u32();
    let dir = dir.strip_prefix('/').unwrap_or(dir);
    Some(format!(
        "{dir}{}{PROP_DELIMITER}{flags}{PROP_DELIMITER}{value}",
        node.name()
    ))
}

/// A line of the oldest property list format, `name:value` with `^N` for integers. Returns None
/// if the line has no delimiter.
pub fn decode_legacy_line(line: &str) -> Option<(&str, PropValue)> {
    let (name, value) = line.trim_end_matches(['\n', '\r']).split_once(PROP_DELIMITER)?;
    if let Some(number) = value.strip_prefix('^') {
        if is_number(number) {
            if let Ok(i) = number.parse::<i32>() {
                return Some((name, PropValue::Int(i)));
            }
        }
    }
    if value.is_empty() {
        return Some((name, PropValue::Dir));
    }
    Some((name, PropValue::Str(value.to_string())))
}
