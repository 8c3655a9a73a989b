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
mod bitenum;

pub use bitenum::BitEnum;

/// Case-insensitive (ASCII) prefix test, used by the name matchers.
#[must_use]
pub fn string_prefix(string: &str, prefix: &str) -> bool {
    string.len() >= prefix.len()
        && string.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Word-start prefix match: true if `sub` is a nonempty case-insensitive prefix of `src` or of
/// any word inside it.
#[must_use]
pub fn string_match(src: &str, sub: &str) -> bool {
    if sub.is_empty() {
        return false;
    }
    let mut rest = src;
    while !rest.is_empty() {
        if string_prefix(rest, sub) {
            return true;
        }
        rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
        rest = rest.trim_start_matches(|c: char| !c.is_ascii_alphanumeric());
    }
    false
}

/// Parse a leading decimal integer the way the dump formats expect it: optional sign, then
/// digits. Surrounding whitespace is ignored. Returns None for anything that is not a number.
#[must_use]
pub fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<i64>().ok()
}

/// True if the string is an optionally signed run of decimal digits.
#[must_use]
pub fn is_number(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
