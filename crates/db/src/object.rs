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

use muck_common::{BitEnum, Dbref, NOTHING, ObjFlag, ObjectType};
use muck_props::PropDir;

/// The four per-object timestamps, in seconds since the epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timestamps {
    pub created: i64,
    pub last_used: i64,
    pub use_count: i64,
    pub modified: i64,
}

impl Timestamps {
    pub fn new_object(now: i64) -> Self {
        Self {
            created: now,
            last_used: now,
            use_count: 0,
            modified: now,
        }
    }
}

/// The fields that only some object types carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeData {
    Room { dropto: Dbref, exits: Dbref },
    Thing { home: Dbref, exits: Dbref },
    Exit { dests: Vec<Dbref> },
    Player { home: Dbref, exits: Dbref, password: String },
    Program,
    Garbage,
}

impl TypeData {
    /// Fresh, unlinked type data for an object of type `ty`.
    pub fn empty(ty: ObjectType) -> Self {
        match ty {
            ObjectType::Room => TypeData::Room {
                dropto: NOTHING,
                exits: NOTHING,
            },
            ObjectType::Thing => TypeData::Thing {
                home: NOTHING,
                exits: NOTHING,
            },
            ObjectType::Exit => TypeData::Exit { dests: vec![] },
            ObjectType::Player => TypeData::Player {
                home: NOTHING,
                exits: NOTHING,
                password: String::new(),
            },
            ObjectType::Program => TypeData::Program,
            ObjectType::Garbage => TypeData::Garbage,
        }
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            TypeData::Room { .. } => ObjectType::Room,
            TypeData::Thing { .. } => ObjectType::Thing,
            TypeData::Exit { .. } => ObjectType::Exit,
            TypeData::Player { .. } => ObjectType::Player,
            TypeData::Program => ObjectType::Program,
            TypeData::Garbage => ObjectType::Garbage,
        }
    }
}

/// One slot of the object store.
#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    pub location: Dbref,
    pub contents: Dbref,
    /// Next object in whatever list this one is on: a contents list, an exits list, or the
    /// free list once the object is garbage.
    pub next: Dbref,
    pub flags: BitEnum<ObjFlag>,
    pub owner: Dbref,
    pub timestamps: Timestamps,
    pub data: TypeData,
    pub(crate) props: PropDir,
    /// Where this object's property block starts in the backing file, just past the leading
    /// `*` of its `*Props*` line. Zero when there is nothing on disk.
    pub(crate) props_pos: u64,
    /// When the property set was last fetched.
    pub(crate) props_time: i64,
}

impl Object {
    /// A blank slot, the way a freshly grown or reused slot looks before anyone fills it in.
    pub fn cleared(now: i64) -> Self {
        Self {
            name: String::new(),
            location: NOTHING,
            contents: NOTHING,
            next: NOTHING,
            flags: BitEnum::new(),
            owner: NOTHING,
            timestamps: Timestamps::new_object(now),
            data: TypeData::Room {
                dropto: NOTHING,
                exits: NOTHING,
            },
            props: PropDir::new(),
            props_pos: 0,
            props_time: 0,
        }
    }

    pub fn object_type(&self) -> ObjectType {
        self.data.object_type()
    }

    pub fn is_garbage(&self) -> bool {
        matches!(self.data, TypeData::Garbage)
    }

    /// The flag word as stored on disk: flags above, type code in the low bits.
    pub fn flag_word(&self) -> u32 {
        self.flags.to_u32() | self.object_type() as u32
    }

    pub fn home(&self) -> Option<Dbref> {
        match &self.data {
            TypeData::Thing { home, .. } | TypeData::Player { home, .. } => Some(*home),
            _ => None,
        }
    }

    pub fn set_home(&mut self, new_home: Dbref) {
        if let TypeData::Thing { home, .. } | TypeData::Player { home, .. } = &mut self.data {
            *home = new_home;
        }
    }

    /// Head of the exits list, for the types that have one.
    pub fn exits(&self) -> Option<Dbref> {
        match &self.data {
            TypeData::Room { exits, .. }
            | TypeData::Thing { exits, .. }
            | TypeData::Player { exits, .. } => Some(*exits),
            _ => None,
        }
    }

    pub fn set_exits(&mut self, head: Dbref) {
        if let TypeData::Room { exits, .. }
        | TypeData::Thing { exits, .. }
        | TypeData::Player { exits, .. } = &mut self.data
        {
            *exits = head;
        }
    }

    pub fn password(&self) -> Option<&str> {
        match &self.data {
            TypeData::Player { password, .. } => Some(password),
            _ => None,
        }
    }

    /// The resident property tree. Callers outside the store go through the fetch gate instead.
    pub fn resident_props(&self) -> &PropDir {
        &self.props
    }

    pub fn props_pos(&self) -> u64 {
        self.props_pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muck_common::ObjFlag;
    use pretty_assertions::assert_eq;

    #[test]
    fn flag_word_carries_type() {
        let mut o = Object::cleared(0);
        o.data = TypeData::empty(ObjectType::Player);
        o.flags.set(ObjFlag::Wizard);
        assert_eq!(o.flag_word(), 0x10 | 3);
        assert_eq!(o.object_type(), ObjectType::Player);
    }

    #[test]
    fn type_specific_accessors() {
        let mut o = Object::cleared(0);
        o.data = TypeData::empty(ObjectType::Thing);
        o.set_home(Dbref::mk_id(7));
        o.set_exits(Dbref::mk_id(9));
        assert_eq!(o.home(), Some(Dbref::mk_id(7)));
        assert_eq!(o.exits(), Some(Dbref::mk_id(9)));

        o.data = TypeData::empty(ObjectType::Exit);
        o.set_home(Dbref::mk_id(3));
        assert_eq!(o.home(), None);
        assert_eq!(o.exits(), None);
    }
}
