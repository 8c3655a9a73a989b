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

pub use model::{
    AMBIGUOUS, Dbref, DbrefParseError, GOD, HOME, NIL, NOTHING, ObjFlag, ObjectType, TYPE_MASK,
    propname,
};
pub use util::{BitEnum, is_number, string_match, string_prefix};

pub mod model;
pub mod tracing;
pub mod util;

/// Separates a property name from its value, in property lines and in lock property checks.
pub const PROP_DELIMITER: char = ':';
/// Separates the segments of a property path.
pub const PROPDIR_DELIMITER: char = '/';
