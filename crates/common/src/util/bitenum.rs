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
use std::marker::PhantomData;
use std::ops::{BitOr, BitOrAssign};

use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

/// A minimal bitset over an enum whose discriminants are bit positions.
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BitEnum<T: ToPrimitive> {
    value: u32,
    #[serde(skip)]
    phantom: PhantomData<T>,
}

fn bit<T: ToPrimitive>(value: &T) -> u32 {
    match value.to_u32() {
        Some(shift) if shift < 32 => 1 << shift,
        _ => 0,
    }
}

impl<T: ToPrimitive> BitEnum<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: 0,
            phantom: PhantomData,
        }
    }

    /// Wrap a raw bit word as read from storage. Bits without a matching variant are kept.
    #[must_use]
    pub fn from_raw(value: u32) -> Self {
        Self {
            value,
            phantom: PhantomData,
        }
    }

    #[must_use]
    pub fn to_u32(&self) -> u32 {
        self.value
    }

    pub fn new_with(value: T) -> Self {
        let mut s = Self::new();
        s.set(value);
        s
    }

    #[must_use]
    pub fn all() -> Self {
        Self::from_raw(u32::MAX)
    }

    pub fn set(&mut self, value: T) {
        self.value |= bit(&value);
    }

    pub fn clear(&mut self, value: T) {
        self.value &= !bit(&value);
    }

    pub fn contains(&self, value: T) -> bool {
        self.value & bit(&value) != 0
    }

    pub fn contains_all(&self, values: BitEnum<T>) -> bool {
        values.value & self.value == values.value
    }

    /// The bits of `self` that are not in `mask`.
    #[must_use]
    pub fn without(&self, mask: BitEnum<T>) -> Self {
        Self::from_raw(self.value & !mask.value)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value == 0
    }
}

impl<T: ToPrimitive> BitOr for BitEnum<T> {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::from_raw(self.value | rhs.value)
    }
}

impl<T: ToPrimitive> Default for BitEnum<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ToPrimitive> BitOrAssign<T> for BitEnum<T> {
    fn bitor_assign(&mut self, rhs: T) {
        self.set(rhs);
    }
}

impl<T: ToPrimitive> BitOr<T> for BitEnum<T> {
    type Output = Self;

    fn bitor(self, rhs: T) -> Self::Output {
        let mut s = self;
        s.set(rhs);
        s
    }
}

impl<T: ToPrimitive> From<T> for BitEnum<T> {
    fn from(value: T) -> Self {
        Self::new_with(value)
    }
}

#[cfg(test)]
mod tests {
    use super::BitEnum;
    use crate::ObjFlag;
    use pretty_assertions::assert_eq;

    #[test]
    fn set_and_clear() {
        let mut flags = BitEnum::new_with(ObjFlag::Wizard);
        flags |= ObjFlag::Dark;
        assert!(flags.contains(ObjFlag::Wizard));
        assert!(flags.contains(ObjFlag::Dark));
        assert_eq!(flags.to_u32(), 0x10 | 0x40);
        flags.clear(ObjFlag::Wizard);
        assert!(!flags.contains(ObjFlag::Wizard));
        assert_eq!(flags.to_u32(), 0x40);
    }

    #[test]
    fn high_bit_survives() {
        let flags = BitEnum::new_with(ObjFlag::Overt);
        assert_eq!(flags.to_u32(), 0x8000_0000);
        let raw = BitEnum::<ObjFlag>::from_raw(0x8000_0013);
        assert!(raw.contains(ObjFlag::Overt));
        assert!(raw.contains(ObjFlag::Wizard));
        // Low type bits are preserved even though no flag names them.
        assert_eq!(raw.to_u32() & 0x7, 3);
    }

    #[test]
    fn masking() {
        let flags = BitEnum::new_with(ObjFlag::Listener) | ObjFlag::Builder;
        let cleaned = flags.without(ObjFlag::dump_mask());
        assert_eq!(cleaned, BitEnum::new_with(ObjFlag::Builder));
        assert!(flags.contains_all(cleaned));
    }
}
