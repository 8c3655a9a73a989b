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
use muck_boolexp::UNLOCKED_DISPLAY;
use muck_common::{Dbref, PROPDIR_DELIMITER};

use crate::codec::format_float;
use crate::flags::PropType;
use crate::node::{PropNode, PropValue};

/// One line of a property listing: `B str name/:value`, where `B` marks a blessed property and
/// the trailing delimiter marks a property directory.
pub fn display_prop(
    name: &str,
    node: Option<&PropNode>,
    name_of: &dyn Fn(Dbref) -> String,
) -> String {
    let Some(node) = node else {
        return format!("{name}: No such property.");
    };
    let blessed = if node.is_blessed() { 'B' } else { '-' };
    let dir_mark = if node.has_propdir() {
        PROPDIR_DELIMITER.to_string()
    } else {
        String::new()
    };
    let value = match node.value() {
        PropValue::Str(s) => s.clone(),
        PropValue::Int(i) => i.to_string(),
        PropValue::Float(f) => format_float(*f),
        PropValue::Ref(r) => name_of(*r),
        PropValue::Lock(lock) => lock.unparse_with(name_of),
        PropValue::Stub {
            ty: PropType::Lock, ..
        } => UNLOCKED_DISPLAY.to_string(),
        PropValue::Stub { .. } => "(not loaded)".to_string(),
        PropValue::Dir => "(no value)".to_string(),
    };
    format!(
        "{blessed} {} {name}{dir_mark}:{value}",
        node.prop_type()
    )
}
