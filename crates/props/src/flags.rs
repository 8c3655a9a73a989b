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
use enum_primitive_derive::Primitive;
use muck_common::BitEnum;
use strum::{Display, FromRepr};

/// The low bits of a stored property flag word carry the value type.
pub const PROP_TYPMASK: u16 = 0x7;

#[repr(u8)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, FromRepr)]
pub enum PropType {
    #[strum(serialize = "dir")]
    Dir = 0,
    #[strum(serialize = "str")]
    Str = 2,
    #[strum(serialize = "int")]
    Int = 3,
    #[strum(serialize = "lok")]
    Lock = 4,
    #[strum(serialize = "ref")]
    Ref = 5,
    #[strum(serialize = "flt")]
    Float = 6,
}

impl PropType {
    /// Decode the type tag of a raw flag word. Codes 1 and 7 are unassigned.
    #[must_use]
    pub fn from_flag_word(raw: u16) -> Option<Self> {
        Self::from_repr((raw & PROP_TYPMASK) as u8)
    }

    /// Only string and lock values are ever left on disk.
    #[must_use]
    pub fn is_pageable(&self) -> bool {
        matches!(self, PropType::Str | PropType::Lock)
    }
}

/// Modifier bits stored above the type tag. Discriminants are bit positions, and the resulting
/// bit values are part of the dump format.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Primitive)]
pub enum PropFlag {
    /// The value slot holds a file position rather than data.
    Unloaded = 9,
    /// Read since the last touch sweep.
    Touched = 10,
    /// The property directory below this node has not been read yet.
    DirUnloaded = 11,
    /// Embedded script content runs with elevated trust.
    Blessed = 12,
}

pub type PropFlags = BitEnum<PropFlag>;

/// Bits that only have meaning in memory and are never written out.
#[must_use]
pub fn internal_flags() -> PropFlags {
    BitEnum::new_with(PropFlag::Unloaded) | PropFlag::Touched | PropFlag::DirUnloaded
}
