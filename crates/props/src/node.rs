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
use muck_boolexp::Lock;
use muck_common::{Dbref, NOTHING};

use crate::flags::{PROP_TYPMASK, PropFlag, PropFlags, PropType};
use crate::tree::{Link, PropDir};

/// A property value. `Stub` stands in for a string or lock value that is still on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// No value: the node only exists to hold a property directory.
    Dir,
    Str(String),
    Int(i32),
    Float(f64),
    Ref(Dbref),
    Lock(Lock),
    Stub { ty: PropType, pos: u64 },
}

impl PropValue {
    #[must_use]
    pub fn prop_type(&self) -> PropType {
        match self {
            PropValue::Dir => PropType::Dir,
            PropValue::Str(_) => PropType::Str,
            PropValue::Int(_) => PropType::Int,
            PropValue::Float(_) => PropType::Float,
            PropValue::Ref(_) => PropType::Ref,
            PropValue::Lock(_) => PropType::Lock,
            PropValue::Stub { ty, .. } => *ty,
        }
    }

    /// Values that mean "no value": storing one deletes the property unless it still has a
    /// directory below it. Locks and stubs are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            PropValue::Dir => true,
            PropValue::Str(s) => s.is_empty(),
            PropValue::Int(i) => *i == 0,
            PropValue::Float(f) => *f == 0.0,
            PropValue::Ref(r) => *r == NOTHING,
            PropValue::Lock(_) | PropValue::Stub { .. } => false,
        }
    }

    #[must_use]
    pub fn is_stub(&self) -> bool {
        matches!(self, PropValue::Stub { .. })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            PropValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_dbref(&self) -> Option<Dbref> {
        match self {
            PropValue::Ref(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_lock(&self) -> Option<&Lock> {
        match self {
            PropValue::Lock(l) => Some(l),
            _ => None,
        }
    }

    /// Bytes owned by the value beyond the node itself.
    #[must_use]
    pub fn payload_size(&self) -> usize {
        match self {
            PropValue::Str(s) => s.len() + 1,
            PropValue::Lock(l) => l.size_of(),
            _ => 0,
        }
    }

    /// The value as it can be stored: a property is one dump line, so line feeds in a string
    /// become `\r`, the line break of MUCK text, and trailing breaks are dropped.
    #[must_use]
    pub fn single_line(self) -> PropValue {
        match self {
            PropValue::Str(s) if s.contains(['\n', '\r']) => {
                let joined = s.replace("\r\n", "\r").replace('\n', "\r");
                PropValue::Str(joined.trim_end_matches('\r').to_string())
            }
            other => other,
        }
    }
}

/// One node of a property level: a named value plus, optionally, a nested directory.
#[derive(Debug, Clone)]
pub struct PropNode {
    name: String,
    pub(crate) flags: PropFlags,
    pub(crate) value: PropValue,
    pub(crate) height: i32,
    pub(crate) left: Link,
    pub(crate) right: Link,
    pub(crate) dir: PropDir,
}

impl PropNode {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            flags: PropFlags::new(),
            value: PropValue::Dir,
            height: 1,
            left: None,
            right: None,
            dir: PropDir::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &PropValue {
        &self.value
    }

    pub fn prop_type(&self) -> PropType {
        self.value.prop_type()
    }

    /// Modifier flags, without the type tag. Stubs report `Unloaded`.
    pub fn flags(&self) -> PropFlags {
        let mut flags = self.flags;
        if self.value.is_stub() {
            flags.set(PropFlag::Unloaded);
        }
        flags
    }

    /// The full flag word as it would be stored: type tag in the low bits.
    pub fn raw_flags(&self) -> u16 {
        (self.flags().to_u32() as u16 & !PROP_TYPMASK) | self.prop_type() as u16
    }

    /// Replace the value and the modifier flags together, the way a property store does.
    pub fn assign(&mut self, value: PropValue, flags: PropFlags) {
        let mut flags = flags;
        flags.clear(PropFlag::Unloaded);
        self.flags = flags;
        self.value = value;
    }

    /// Replace the value, keeping the modifier flags.
    pub fn set_value(&mut self, value: PropValue) {
        self.value = value;
    }

    pub fn set_flags(&mut self, flags: PropFlags) {
        let mut flags = flags;
        flags.clear(PropFlag::Unloaded);
        self.flags = self.flags | flags;
    }

    pub fn clear_flags(&mut self, flags: PropFlags) {
        self.flags = self.flags.without(flags);
    }

    pub fn is_blessed(&self) -> bool {
        self.flags.contains(PropFlag::Blessed)
    }

    pub fn is_touched(&self) -> bool {
        self.flags.contains(PropFlag::Touched)
    }

    pub fn touch(&mut self) {
        self.flags.set(PropFlag::Touched);
    }

    pub fn is_dir_unloaded(&self) -> bool {
        self.flags.contains(PropFlag::DirUnloaded)
    }

    pub fn propdir(&self) -> &PropDir {
        &self.dir
    }

    pub fn propdir_mut(&mut self) -> &mut PropDir {
        &mut self.dir
    }

    /// True if the node owns a non-empty directory.
    pub fn has_propdir(&self) -> bool {
        !self.dir.is_empty()
    }

    /// Node overhead plus name and payload, not counting siblings or the directory below.
    pub fn node_size(&self) -> usize {
        std::mem::size_of::<PropNode>() + self.name.len() + self.value.payload_size()
    }
}
