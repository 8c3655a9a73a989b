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
//! Lists of object references kept in string properties: `"#12 #40 #7"`.

use muck_common::Dbref;

use crate::node::PropValue;

const NUMBER_TOKEN: char = '#';
/// Lists never grow past the length of a command buffer.
const MAX_REFLIST_LEN: usize = 8192;

/// Find `#<id>` as a whole entry: its 1-based position among the `#` marks, and the byte range.
fn locate(list: &str, target: Dbref) -> Option<(usize, usize, usize)> {
    let digits = target.id().to_string();
    list.match_indices(NUMBER_TOKEN)
        .enumerate()
        .find_map(|(ordinal, (start, _))| {
            let tail = list[start + 1..].strip_prefix(digits.as_str())?;
            let end = start + 1 + digits.len();
            (tail.is_empty() || tail.starts_with(' ')).then_some((ordinal + 1, start, end))
        })
}

fn without_entry(list: &str, start: usize, end: usize) -> String {
    // Drop the separator in front of the entry as well.
    let head = &list[..start];
    let head = head.strip_suffix(|_: char| true).unwrap_or(head);
    format!("{head}{}", &list[end..])
}

/// 1-based position of `target` in the list, 0 if absent. A ref-typed value is a list of one.
#[must_use]
pub fn reflist_find(value: Option<&PropValue>, target: Dbref) -> usize {
    match value {
        Some(PropValue::Str(list)) => locate(list, target).map_or(0, |(pos, _, _)| pos),
        Some(PropValue::Ref(r)) if *r == target => 1,
        _ => 0,
    }
}

/// The list with `target` appended, moved to the end if it was already present. None means
/// the stored value should stay as it is.
#[must_use]
pub fn reflist_add(value: Option<&PropValue>, target: Dbref) -> Option<PropValue> {
    match value {
        Some(PropValue::Str(list)) => {
            let mut out = match locate(list, target) {
                Some((_, start, end)) => without_entry(list, start, end),
                None => list.clone(),
            };
            out.push_str(&format!(" {NUMBER_TOKEN}{}", target.id()));
            if out.len() >= MAX_REFLIST_LEN {
                return None;
            }
            Some(PropValue::Str(out.trim_start().to_string()))
        }
        Some(PropValue::Ref(r)) if *r == target => None,
        Some(PropValue::Ref(r)) => Some(PropValue::Str(format!("{r} {target}"))),
        _ => Some(PropValue::Str(target.to_string())),
    }
}

/// The list without `target`, or None if it was not there.
#[must_use]
pub fn reflist_del(value: Option<&PropValue>, target: Dbref) -> Option<PropValue> {
    match value {
        Some(PropValue::Str(list)) => {
            let (_, start, end) = locate(list, target)?;
            let out = without_entry(list, start, end);
            Some(PropValue::Str(out.trim_start().to_string()))
        }
        Some(PropValue::Ref(r)) if *r == target => Some(PropValue::Str(String::new())),
        _ => None,
    }
}
