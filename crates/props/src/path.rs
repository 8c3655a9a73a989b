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
use muck_common::propname::{PROP_HIDDEN, PROP_SEEONLY, is_system};
use muck_common::{PROP_DELIMITER, PROPDIR_DELIMITER};

use crate::flags::{PropFlag, PropFlags, PropType};
use crate::node::{PropNode, PropValue};
use crate::tree::PropDir;

/// The nonempty segments of a property path. Repeated, leading and trailing delimiters vanish.
pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(PROPDIR_DELIMITER).filter(|s| !s.is_empty())
}

/// The name a value gets stored under: leading delimiters dropped, and anything from the first
/// value delimiter or line break on cut off.
#[must_use]
pub fn normalize_prop_name(name: &str) -> &str {
    let name = name.trim_start_matches(PROPDIR_DELIMITER);
    match name.find([PROP_DELIMITER, '\n', '\r']) {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// The directory part of a path in canonical form: `"a//b/c"` gives `"/a/b/"`, a top-level name
/// gives `"/"`, and a path ending in a delimiter names itself.
#[must_use]
pub fn propdir_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);
    let mut rest = name;
    while !rest.is_empty() {
        rest = rest.trim_start_matches(PROPDIR_DELIMITER);
        out.push(PROPDIR_DELIMITER);
        let end = rest.find(PROPDIR_DELIMITER).unwrap_or(rest.len());
        out.push_str(&rest[..end]);
        rest = &rest[end..];
    }
    match out.rfind(PROPDIR_DELIMITER) {
        Some(idx) => out.truncate(idx + 1),
        None => out.push(PROPDIR_DELIMITER),
    }
    out
}

fn delete_in(dir: &mut PropDir, segments: &[&str]) -> bool {
    match segments {
        [] => false,
        [last] => dir.remove(last).is_some(),
        [first, rest @ ..] => {
            let Some(node) = dir.find_mut(first) else {
                return false;
            };
            if !node.has_propdir() {
                return false;
            }
            let removed = delete_in(node.propdir_mut(), rest);
            if !node.has_propdir() && node.prop_type() == PropType::Dir {
                dir.remove(first);
            }
            removed
        }
    }
}

fn copy_node_into(dest: &mut PropDir, src: &PropNode) {
    let node = dest.insert(src.name());
    let value = match src.value() {
        PropValue::Stub {
            ty: PropType::Lock, ..
        } => PropValue::Lock(Lock::unlocked()),
        other => other.clone(),
    };
    let flags = src.flags;
    node.flags = flags;
    node.value = value;
    for child in src.propdir() {
        copy_node_into(&mut node.dir, child);
    }
}

/// Path-level operations. A `PropDir` used this way is an object's root property level.
impl PropDir {
    pub fn get(&self, path: &str) -> Option<&PropNode> {
        let segments: Vec<&str> = path_segments(path).collect();
        let (last, parents) = segments.split_last()?;
        let mut dir = self;
        for segment in parents {
            dir = dir.find(segment)?.propdir();
        }
        dir.find(last)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut PropNode> {
        let segments: Vec<&str> = path_segments(path).collect();
        let (last, parents) = segments.split_last()?;
        let mut dir = self;
        for segment in parents {
            dir = dir.find_mut(segment)?.propdir_mut();
        }
        dir.find_mut(last)
    }

    /// Find or create the node at `path`, creating valueless directory nodes along the way.
    /// Returns None for a path with no segments.
    pub fn new_elem(&mut self, path: &str) -> Option<&mut PropNode> {
        let segments: Vec<&str> = path_segments(path).collect();
        let (last, parents) = segments.split_last()?;
        let mut dir = self;
        for segment in parents {
            dir = dir.insert(segment).propdir_mut();
        }
        Some(dir.insert(last))
    }

    /// Delete the node at `path` and everything below it. Walking back up, every directory
    /// node on the path that was left empty and has no value of its own goes too.
    pub fn delete_elem(&mut self, path: &str) -> bool {
        let segments: Vec<&str> = path_segments(path).collect();
        delete_in(self, &segments)
    }

    /// The first node inside the directory at `dir_path`; `""` or `"/"` is the root level.
    pub fn first_elem(&self, dir_path: &str) -> Option<&PropNode> {
        if path_segments(dir_path).next().is_none() {
            return self.first();
        }
        self.get(dir_path)?.propdir().first()
    }

    /// The node that sorts after the last segment of `path`, in the same directory.
    pub fn next_elem(&self, path: &str) -> Option<&PropNode> {
        let segments: Vec<&str> = path_segments(path).collect();
        let (last, parents) = segments.split_last()?;
        let mut dir = self;
        for segment in parents {
            dir = dir.find(segment)?.propdir();
        }
        dir.next_after(last)
    }

    pub fn is_propdir(&self, path: &str) -> bool {
        self.get(path).is_some_and(PropNode::has_propdir)
    }

    /// Walk `path` and return the first directory along it whose contents have not been read,
    /// clearing its marker. The result has no leading delimiter: `"a/b"`.
    pub fn propdir_unloaded(&mut self, path: &str) -> Option<String> {
        let mut dir = self;
        let mut walked = String::new();
        for segment in path_segments(path) {
            if !walked.is_empty() {
                walked.push(PROPDIR_DELIMITER);
            }
            walked.push_str(segment);
            let node = dir.find_mut(segment)?;
            if node.is_dir_unloaded() {
                node.flags.clear(PropFlag::DirUnloaded);
                return Some(walked);
            }
            dir = node.propdir_mut();
        }
        None
    }

    /// Store a value. An empty value (see [`PropValue::is_empty`]) deletes the property, or
    /// reduces it to a bare directory when it still has children. The modifier flags replace the
    /// node's previous ones.
    pub fn set_value(&mut self, name: &str, value: PropValue, flags: PropFlags) {
        let name = normalize_prop_name(name);
        let value = value.single_line();
        let Some(node) = self.new_elem(name) else {
            return;
        };
        if value.is_empty() {
            node.assign(PropValue::Dir, flags);
            if !node.has_propdir() {
                self.delete_elem(name);
            }
        } else {
            node.assign(value, flags);
        }
    }

    /// The name of the property after `name`, as a full path. `""` lists the root level, and a
    /// name ending in a delimiter lists that directory.
    pub fn next_prop_name(&self, name: &str) -> Option<String> {
        if name.is_empty() || name.ends_with(PROPDIR_DELIMITER) {
            let first = self.first_elem(name)?;
            let prefix = if name.is_empty() { "/" } else { name };
            return Some(format!("{prefix}{}", first.name()));
        }
        let next = self.next_elem(name)?;
        let base = match name.rfind(PROPDIR_DELIMITER) {
            Some(idx) => &name[..idx],
            None => "",
        };
        Some(format!("{base}{PROPDIR_DELIMITER}{}", next.name()))
    }

    /// A deep copy for a new owner. Lock values still on disk become unlocked.
    #[must_use]
    pub fn copy_all(&self) -> PropDir {
        let mut copy = PropDir::new();
        self.merge_into(&mut copy);
        copy
    }

    /// Copy every property here onto `dest`, overwriting values that exist in both.
    pub fn merge_into(&self, dest: &mut PropDir) {
        for node in self {
            copy_node_into(dest, node);
        }
    }

    /// Remove top-level properties. Unless `all` is set, hidden, see-only and `_` are spared;
    /// system properties always are. Returns the removed names.
    pub fn remove_top_level(&mut self, all: bool) -> Vec<String> {
        let doomed: Vec<String> = self
            .iter()
            .map(|node| node.name().to_string())
            .filter(|name| !is_system(name))
            .filter(|name| {
                all || !(name.starts_with(PROP_HIDDEN)
                    || name.starts_with(PROP_SEEONLY)
                    || name == "_")
            })
            .collect();
        for name in &doomed {
            self.remove(name);
        }
        doomed
    }

    /// Clear the touched marker on every node, recursively.
    pub fn untouch_all(&mut self) {
        self.for_each_mut(&mut |node| {
            node.flags.clear(PropFlag::Touched);
            node.dir.untouch_all();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muck_boolexp::BoolExpr;
    use muck_common::Dbref;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn str_value(s: &str) -> PropValue {
        PropValue::Str(s.to_string())
    }

    fn set(dir: &mut PropDir, path: &str, value: PropValue) {
        dir.set_value(path, value, PropFlags::new());
    }

    #[test_case("a/b/c", "/a/b/"; "nested")]
    #[test_case("foo", "/"; "top level")]
    #[test_case("//a///b", "/a/"; "repeated delimiters")]
    #[test_case("a/b/", "/a/b/"; "trailing delimiter")]
    #[test_case("", "/"; "empty")]
    fn directory_names(name: &str, expected: &str) {
        assert_eq!(propdir_name(name), expected);
    }

    #[test_case("/foo", "foo"; "leading delimiter")]
    #[test_case("foo:bar", "foo"; "value delimiter")]
    #[test_case("a/b", "a/b"; "plain")]
    #[test_case("note\n*End*", "note"; "line break")]
    fn normalized_names(name: &str, expected: &str) {
        assert_eq!(normalize_prop_name(name), expected);
    }

    #[test]
    fn empty_string_deletes_and_cascades() {
        let mut props = PropDir::new();
        set(&mut props, "foo/bar", str_value(""));
        assert!(props.get("foo/bar").is_none());
        assert!(props.get("foo").is_none());
        assert!(props.is_empty());
    }

    #[test]
    fn empty_string_keeps_a_directory_with_siblings() {
        let mut props = PropDir::new();
        set(&mut props, "foo/baz", str_value("kept"));
        set(&mut props, "foo/bar", str_value(""));
        assert!(props.get("foo/bar").is_none());
        let foo = props.get("foo").unwrap();
        assert_eq!(foo.prop_type(), PropType::Dir);
        assert!(foo.has_propdir());
    }

    #[test]
    fn clearing_a_directory_value_keeps_its_children() {
        let mut props = PropDir::new();
        set(&mut props, "d", PropValue::Int(5));
        set(&mut props, "d/x", PropValue::Int(6));
        set(&mut props, "d", PropValue::Int(0));
        let d = props.get("d").unwrap();
        assert_eq!(d.value(), &PropValue::Dir);
        assert_eq!(props.get("d/x").unwrap().value(), &PropValue::Int(6));
    }

    #[test]
    fn removal_cascades_through_valueless_ancestors_only() {
        let mut props = PropDir::new();
        set(&mut props, "a/b/c/d", str_value("leaf"));
        set(&mut props, "a", str_value("has a value"));
        assert!(props.delete_elem("a/b/c/d"));
        assert!(props.get("a/b").is_none());
        assert_eq!(props.get("a").unwrap().value(), &str_value("has a value"));
        assert!(!props.is_propdir("a"));
    }

    #[test]
    fn removing_a_directory_takes_its_subtree() {
        let mut props = PropDir::new();
        set(&mut props, "x/y", str_value("1"));
        set(&mut props, "x/z", str_value("2"));
        set(&mut props, "x", str_value("top"));
        assert!(props.delete_elem("/x"));
        assert!(props.get("x/y").is_none());
        assert!(props.is_empty());
        assert!(!props.delete_elem("x"));
    }

    #[test]
    fn names_are_normalized_on_set() {
        let mut props = PropDir::new();
        set(&mut props, "//_Desc:ignored", str_value("A room."));
        assert_eq!(props.get("_desc").unwrap().name(), "_Desc");
        set(&mut props, ":", str_value("nothing"));
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn locks_are_never_empty() {
        let mut props = PropDir::new();
        set(&mut props, "_/lok", PropValue::Lock(Lock::unlocked()));
        assert!(props.get("_/lok").is_some());
    }

    #[test]
    fn listing_walks_directories() {
        let mut props = PropDir::new();
        for path in ["b", "a/x", "a/y", "c"] {
            set(&mut props, path, str_value("v"));
        }
        let mut seen = vec![];
        let mut cur = props.next_prop_name("");
        while let Some(name) = cur {
            cur = props.next_prop_name(&name);
            seen.push(name);
        }
        assert_eq!(seen, vec!["/a", "/b", "/c"]);

        assert_eq!(props.next_prop_name("a/").as_deref(), Some("a/x"));
        assert_eq!(props.next_prop_name("a/x").as_deref(), Some("a/y"));
        assert_eq!(props.next_prop_name("a/y"), None);
        assert_eq!(props.next_prop_name("nothere/"), None);
    }

    #[test]
    fn unloaded_directory_markers_clear_once() {
        let mut props = PropDir::new();
        let node = props.new_elem("a/b").unwrap();
        node.flags.set(PropFlag::DirUnloaded);
        assert_eq!(props.propdir_unloaded("/a/b/c"), Some("a/b".to_string()));
        assert_eq!(props.propdir_unloaded("/a/b/c"), None);
    }

    #[test]
    fn copies_drop_unloaded_locks() {
        let mut props = PropDir::new();
        set(&mut props, "d/s", str_value("text"));
        props.set_value(
            "lk",
            PropValue::Stub {
                ty: PropType::Lock,
                pos: 99,
            },
            PropFlags::new_with(PropFlag::Blessed),
        );
        let copy = props.copy_all();
        assert_eq!(copy.get("d/s").unwrap().value(), &str_value("text"));
        let lk = copy.get("lk").unwrap();
        assert_eq!(lk.value(), &PropValue::Lock(Lock::unlocked()));
        assert!(lk.is_blessed());
        assert!(copy.is_well_formed());
    }

    #[test]
    fn merge_overwrites_shared_names() {
        let mut src = PropDir::new();
        set(&mut src, "a", PropValue::Int(1));
        set(&mut src, "b/c", PropValue::Ref(Dbref::mk_id(4)));
        let mut dest = PropDir::new();
        set(&mut dest, "a", PropValue::Int(7));
        set(&mut dest, "b/d", PropValue::Int(8));
        src.merge_into(&mut dest);
        assert_eq!(dest.get("a").unwrap().value(), &PropValue::Int(1));
        assert_eq!(dest.get("b/c").unwrap().value(), &PropValue::Ref(Dbref::mk_id(4)));
        assert_eq!(dest.get("b/d").unwrap().value(), &PropValue::Int(8));
    }

    #[test]
    fn top_level_removal_spares_protected_names() {
        let mut props = PropDir::new();
        for path in ["@hidden", "~seeonly", "_", "@__sys__/x", "plain", "_lock"] {
            set(&mut props, path, str_value("v"));
        }
        let mut removed = props.remove_top_level(false);
        removed.sort();
        assert_eq!(removed, vec!["_lock", "plain"]);
        let mut removed = props.remove_top_level(true);
        removed.sort();
        assert_eq!(removed, vec!["@hidden", "_", "~seeonly"]);
        assert!(props.get("@__sys__/x").is_some());
    }

    #[test]
    fn untouch_clears_every_level() {
        let mut props = PropDir::new();
        set(&mut props, "a/b", str_value("x"));
        props.get_mut("a").unwrap().touch();
        props.get_mut("a/b").unwrap().touch();
        props.untouch_all();
        assert!(!props.get("a").unwrap().is_touched());
        assert!(!props.get("a/b").unwrap().is_touched());
    }

    #[test]
    fn size_counts_payloads() {
        let mut props = PropDir::new();
        let before = props.size_of();
        set(&mut props, "s", str_value("0123456789"));
        set(
            &mut props,
            "l",
            PropValue::Lock(Lock::new(BoolExpr::Const(Dbref::mk_id(2)))),
        );
        assert!(props.size_of() > before + 11);
    }
}
