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
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// The object every permission check ultimately defers to.
pub const GOD: Dbref = Dbref::mk_id(1);
/// Used throughout to refer to a missing object value.
pub const NOTHING: Dbref = Dbref::mk_id(-1);
/// Used in matching to indicate that the match was ambiguous on multiple objects in the
/// environment.
pub const AMBIGUOUS: Dbref = Dbref::mk_id(-2);
/// Stands in for "the home of whatever is being moved".
pub const HOME: Dbref = Dbref::mk_id(-3);
pub const NIL: Dbref = Dbref::mk_id(-4);

/// A reference to an object slot in the database. Negative values are the special references
/// above and never index a slot.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dbref(i32);

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum DbrefParseError {
    #[error("object reference must start with '#': {0}")]
    MissingHash(String),
    #[error("invalid object number: {0}")]
    InvalidNumber(String),
}

impl Dbref {
    pub const fn mk_id(id: i32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn id(&self) -> i32 {
        self.0
    }

    #[must_use]
    pub fn to_literal(&self) -> String {
        format!("#{}", self.0)
    }

    pub fn is_nothing(&self) -> bool {
        self.0 == -1
    }

    pub fn is_positive(&self) -> bool {
        self.0 >= 0
    }

    /// The slot index this reference names, if it could name one at all.
    pub fn index(&self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl From<i32> for Dbref {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl Display for Dbref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl TryFrom<&str> for Dbref {
    type Error = DbrefParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let Some(number) = value.strip_prefix('#') else {
            return Err(DbrefParseError::MissingHash(value.to_string()));
        };
        let id = number
            .trim()
            .parse::<i32>()
            .map_err(|_| DbrefParseError::InvalidNumber(value.to_string()))?;
        Ok(Self(id))
    }
}
