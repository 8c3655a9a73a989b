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
//! Per-object property storage.
//!
//! Every object owns a tree of named properties. Each level of the tree is an AVL tree keyed by
//! a single path segment (compared case-insensitively), and every node may own a nested level,
//! its property directory, so a property path like `_details/north` names a node two levels down.
//!
//! Values may be left on disk as stubs that carry the byte offset of their dump line; resolving
//! those is the database layer's job, this crate only models them.

pub use codec::{
    PROPS_BLOCK_END, PROPS_BLOCK_START, PropBlockLine, PropLineError, RawPropLine,
    decode_legacy_line, encode_prop_line, format_float, parse_block_line,
};
pub use display::display_prop;
pub use flags::{PROP_TYPMASK, PropFlag, PropFlags, PropType, internal_flags};
pub use node::{PropNode, PropValue};
pub use path::{normalize_prop_name, path_segments, propdir_name};
pub use perms::{MLEV_MASTER, MLEV_WIZARD, prop_read_perms, prop_write_perms};
pub use reflist::{reflist_add, reflist_del, reflist_find};
pub use tree::{Iter, PropDir};

mod codec;
mod display;
mod flags;
mod node;
mod path;
mod perms;
mod reflist;
mod tree;

/// Setting any property under one of these names marks the object as a listener.
pub const LISTEN_PROPS: [&str; 3] = ["_listen", "~listen", "~olisten"];
/// Presence of this property on a player sets its GUEST flag.
pub const GUEST_PROP: &str = "~/isguest";
/// Default name of the gender property, which unprivileged writers may not touch.
pub const DEFAULT_GENDER_PROP: &str = "sex";

/// True if a property name falls under one of the listener queues.
#[must_use]
pub fn is_listen_prop(name: &str) -> bool {
    let name = name.trim_start_matches(muck_common::PROPDIR_DELIMITER);
    LISTEN_PROPS
        .iter()
        .any(|prefix| muck_common::string_prefix(name, prefix))
}
