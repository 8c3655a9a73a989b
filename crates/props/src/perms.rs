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
use muck_common::propname::{is_hidden, is_private, is_readonly, is_seeonly, is_system};
use muck_common::string_prefix;

/// Mucker level of a master (M3) program or player.
pub const MLEV_MASTER: u8 = 3;
/// Mucker level granted by the wizard bit.
pub const MLEV_WIZARD: u8 = 4;

/// May a program running at `mlev` read `name`? `controls` says whether its effective user
/// controls the object. System properties are never readable.
#[must_use]
pub fn prop_read_perms(name: &str, mlev: u8, controls: bool) -> bool {
    if is_system(name) {
        return false;
    }
    if mlev < MLEV_MASTER && is_private(name) && !controls {
        return false;
    }
    if mlev < MLEV_WIZARD && is_hidden(name) {
        return false;
    }
    true
}

/// Write counterpart of [`prop_read_perms`]. Read-only, private and gender properties need
/// control below master level; message macros need master; see-only and hidden need wizard.
#[must_use]
pub fn prop_write_perms(name: &str, mlev: u8, controls: bool, gender_prop: &str) -> bool {
    if is_system(name) {
        return false;
    }
    if mlev < MLEV_MASTER {
        let restricted =
            is_private(name) || is_readonly(name) || name.eq_ignore_ascii_case(gender_prop);
        if !controls && restricted {
            return false;
        }
        if string_prefix(name, "_msgmacs/") {
            return false;
        }
    }
    if mlev < MLEV_WIZARD && (is_seeonly(name) || is_hidden(name)) {
        return false;
    }
    true
}
