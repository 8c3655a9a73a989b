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
//! Visibility classes encoded in the leading character of property path segments.

use crate::PROPDIR_DELIMITER;

pub const PROP_RDONLY: char = '_';
pub const PROP_RDONLY2: char = '%';
pub const PROP_PRIVATE: char = '.';
pub const PROP_HIDDEN: char = '@';
pub const PROP_SEEONLY: char = '~';

/// Root of the reserved system property tree.
pub const SYSTEM_PROP_PREFIX: &str = "@__sys__";

/// True if the name, or any segment of it after a directory delimiter, starts with `what`.
#[must_use]
pub fn prop_check(name: &str, what: char) -> bool {
    name.starts_with(what)
        || name
            .match_indices(PROPDIR_DELIMITER)
            .any(|(i, _)| name[i + 1..].starts_with(what))
}

/// Prefix test on whole path segments, ignoring leading delimiters on both sides.
#[must_use]
pub fn is_prop_prefix(property: &str, prefix: &str) -> bool {
    let property = property.trim_start_matches(PROPDIR_DELIMITER);
    let prefix = prefix.trim_start_matches(PROPDIR_DELIMITER);
    match property.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(PROPDIR_DELIMITER),
        None => false,
    }
}

pub fn is_readonly(name: &str) -> bool {
    prop_check(name, PROP_RDONLY) || prop_check(name, PROP_RDONLY2)
}

pub fn is_private(name: &str) -> bool {
    prop_check(name, PROP_PRIVATE)
}

pub fn is_seeonly(name: &str) -> bool {
    prop_check(name, PROP_SEEONLY)
}

pub fn is_hidden(name: &str) -> bool {
    prop_check(name, PROP_HIDDEN)
}

pub fn is_system(name: &str) -> bool {
    is_prop_prefix(name, SYSTEM_PROP_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("_lock", PROP_RDONLY, true; "leading")]
    #[test_case("foo/_bar", PROP_RDONLY, true; "nested segment")]
    #[test_case("foo_bar", PROP_RDONLY, false; "inside a segment")]
    #[test_case("a/b/@c", PROP_HIDDEN, true; "deep hidden")]
    #[test_case("~x", PROP_SEEONLY, true; "seeonly")]
    fn segment_checks(name: &str, what: char, expected: bool) {
        assert_eq!(prop_check(name, what), expected);
    }

    #[test]
    fn system_prefix() {
        assert!(is_system("@__sys__"));
        assert!(is_system("/@__sys__/x"));
        assert!(!is_system("@__sys__x"));
        assert!(!is_system("@__sys__:value"));
        assert!(!is_system("_sys"));
    }

    #[test]
    fn readonly_either_char() {
        assert!(is_readonly("%foo"));
        assert!(is_readonly("dir/_x"));
        assert!(!is_readonly("dir/x"));
    }
}
