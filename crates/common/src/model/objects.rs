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
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, FromRepr};

use crate::util::BitEnum;

/// The low bits of the stored flag word carry the object type.
pub const TYPE_MASK: u32 = 0x7;

#[repr(u8)]
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Hash, Display, FromRepr, EnumIter, Serialize, Deserialize,
)]
pub enum ObjectType {
    #[strum(serialize = "ROOM")]
    Room = 0,
    #[strum(serialize = "THING")]
    Thing = 1,
    #[strum(serialize = "EXIT")]
    Exit = 2,
    #[strum(serialize = "PLAYER")]
    Player = 3,
    #[strum(serialize = "PROGRAM")]
    Program = 4,
    #[strum(serialize = "GARBAGE")]
    Garbage = 6,
}

impl ObjectType {
    /// Decode the type from a raw flag word. The unused type code 5 and anything else unknown
    /// reads as garbage.
    #[must_use]
    pub fn from_flag_word(word: u32) -> Self {
        Self::from_repr((word & TYPE_MASK) as u8).unwrap_or(ObjectType::Garbage)
    }

    /// The one-letter code used when displaying an object with its flags.
    #[must_use]
    pub fn flag_char(&self) -> Option<char> {
        match self {
            ObjectType::Room => Some('R'),
            ObjectType::Exit => Some('E'),
            ObjectType::Player => Some('P'),
            ObjectType::Program => Some('F'),
            ObjectType::Garbage => Some('G'),
            ObjectType::Thing => None,
        }
    }
}

/// Object flags. Each discriminant is the bit position within the stored flag word.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash, Primitive, EnumIter, Display)]
pub enum ObjFlag {
    Wizard = 4,
    LinkOk = 5,
    Dark = 6,
    Internal = 7,
    Sticky = 8,
    Builder = 9,
    ChownOk = 10,
    JumpOk = 11,
    KillOk = 14,
    Guest = 15,
    Haven = 16,
    Abode = 17,
    Mucker = 18,
    Quell = 19,
    Smucker = 20,
    Interactive = 21,
    ObjectChanged = 22,
    Vehicle = 24,
    Zombie = 25,
    Listener = 26,
    Xforcible = 27,
    Readmode = 28,
    Sanebit = 29,
    Yield = 30,
    Overt = 31,
}

impl ObjFlag {
    /// Runtime-only flags that are stripped whenever an object is written out.
    #[must_use]
    pub fn dump_mask() -> BitEnum<ObjFlag> {
        BitEnum::new_with(ObjFlag::Interactive)
            | ObjFlag::ObjectChanged
            | ObjFlag::Listener
            | ObjFlag::Readmode
            | ObjFlag::Sanebit
    }

    /// Letter shown for the flag in an object's display name, if it has one.
    #[must_use]
    pub fn flag_char(&self) -> Option<char> {
        let c = match self {
            ObjFlag::Wizard => 'W',
            ObjFlag::LinkOk => 'L',
            ObjFlag::Dark => 'D',
            ObjFlag::Sticky => 'S',
            ObjFlag::Builder => 'B',
            ObjFlag::ChownOk => 'C',
            ObjFlag::JumpOk => 'J',
            ObjFlag::KillOk => 'K',
            ObjFlag::Guest => 'G',
            ObjFlag::Haven => 'H',
            ObjFlag::Abode => 'A',
            ObjFlag::Quell => 'Q',
            ObjFlag::Vehicle => 'V',
            ObjFlag::Zombie => 'Z',
            ObjFlag::Xforcible => 'X',
            ObjFlag::Yield => 'Y',
            ObjFlag::Overt => 'O',
            _ => return None,
        };
        Some(c)
    }
}
