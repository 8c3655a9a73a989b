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

//! Property access for objects. Every read and write first makes the object's properties
//! resident, and every write marks them changed, so callers never deal with paging directly.

use muck_boolexp::Lock;
use muck_common::{Dbref, NOTHING, ObjFlag, ObjectType, PROPDIR_DELIMITER};
use muck_props::{
    GUEST_PROP, PropFlags, PropNode, PropType, PropValue, display_prop, is_listen_prop,
    propdir_name, reflist_add, reflist_del, reflist_find,
};

use crate::store::{Database, MAX_PARENT_DEPTH};

fn strip_delimiters(name: &str) -> &str {
    name.trim_start_matches(PROPDIR_DELIMITER)
}

impl Database {
    /// The property at `path`, with its value read in from disk if it was a stub.
    pub fn get_property(&mut self, obj: Dbref, path: &str) -> Option<&PropNode> {
        self.fetch_props(obj, &propdir_name(path));
        self.propfetch(obj, path);
        self.get(obj)?.props.get(path)
    }

    pub fn get_property_value(&mut self, obj: Dbref, path: &str) -> Option<PropValue> {
        self.get_property(obj, path).map(|node| node.value().clone())
    }

    pub fn has_property(&mut self, obj: Dbref, path: &str) -> bool {
        self.get_property(obj, path).is_some()
    }

    pub fn get_string(&mut self, obj: Dbref, path: &str) -> Option<String> {
        match self.get_property(obj, path)?.value() {
            PropValue::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Integer value, or 0 if unset or of another type.
    pub fn get_int(&mut self, obj: Dbref, path: &str) -> i32 {
        self.get_property(obj, path)
            .and_then(|node| node.value().as_int())
            .unwrap_or(0)
    }

    pub fn get_float(&mut self, obj: Dbref, path: &str) -> f64 {
        self.get_property(obj, path)
            .and_then(|node| node.value().as_float())
            .unwrap_or(0.0)
    }

    pub fn get_ref(&mut self, obj: Dbref, path: &str) -> Dbref {
        self.get_property(obj, path)
            .and_then(|node| node.value().as_dbref())
            .unwrap_or(NOTHING)
    }

    /// The lock stored at `path`. Anything that is not a readable lock reads as unlocked.
    pub fn get_lock(&mut self, obj: Dbref, path: &str) -> Lock {
        self.get_property(obj, path)
            .and_then(|node| node.value().as_lock().cloned())
            .unwrap_or_else(Lock::unlocked)
    }

    /// Modifier flags of the property at `path`, or none if it does not exist.
    pub fn get_property_flags(&mut self, obj: Dbref, path: &str) -> PropFlags {
        self.fetch_props(obj, &propdir_name(path));
        self.get(obj)
            .and_then(|o| o.props.get(path))
            .map(PropNode::flags)
            .unwrap_or_default()
    }

    pub fn set_property_flags(&mut self, obj: Dbref, path: &str, flags: PropFlags) -> bool {
        if !self.fetch_props_for_write(obj, &propdir_name(path)) {
            return false;
        }
        if let Some(node) = self.get_mut(obj).and_then(|o| o.props.get_mut(path)) {
            node.set_flags(flags);
        }
        self.dirty_props(obj);
        true
    }

    pub fn clear_property_flags(&mut self, obj: Dbref, path: &str, flags: PropFlags) -> bool {
        if !self.fetch_props_for_write(obj, &propdir_name(path)) {
            return false;
        }
        if let Some(node) = self.get_mut(obj).and_then(|o| o.props.get_mut(path)) {
            node.clear_flags(flags);
        }
        self.dirty_props(obj);
        true
    }

    /// Store `value` at `path` with no modifier flags. Storing an empty value deletes the
    /// property, or leaves a bare directory if it has children.
    pub fn set_property(&mut self, obj: Dbref, path: &str, value: PropValue) -> bool {
        self.set_property_with_flags(obj, path, value, PropFlags::new())
    }

    /// Store `value` at `path`, replacing the property's modifier flags with `flags`. Returns
    /// false, changing nothing, if `obj` does not exist or its properties could not be read.
    pub fn set_property_with_flags(
        &mut self,
        obj: Dbref,
        path: &str,
        value: PropValue,
        flags: PropFlags,
    ) -> bool {
        if !self.exists(obj) || !self.fetch_props_for_write(obj, &propdir_name(path)) {
            return false;
        }
        self.set_property_nofetch(obj, path, value, flags, false);
        self.dirty_props(obj);
        self.mark_changed(obj);
        true
    }

    fn set_property_nofetch(
        &mut self,
        obj: Dbref,
        path: &str,
        value: PropValue,
        flags: PropFlags,
        sync: bool,
    ) {
        let name = strip_delimiters(path);
        let Some(o) = self.get_mut(obj) else {
            return;
        };
        if is_listen_prop(name) {
            o.flags.set(ObjFlag::Listener);
        }
        let stored = muck_props::normalize_prop_name(name);
        if stored.is_empty() {
            return;
        }
        o.props.set_value(stored, value.clone(), flags);

        if o.object_type() != ObjectType::Player {
            return;
        }
        if name.eq_ignore_ascii_case(strip_delimiters(GUEST_PROP)) {
            o.flags.set(ObjFlag::Guest);
        } else if !sync {
            if let Some(twin) = self.gender_twin(name) {
                self.fetch_props(obj, &propdir_name(&twin));
                self.set_property_nofetch(obj, &twin, value, flags, true);
            }
        }
    }

    /// With a custom gender property configured, writes to it and to the legacy `sex` property
    /// mirror each other. Returns the other name of the pair if `name` is one of them.
    fn gender_twin(&self, name: &str) -> Option<String> {
        let legacy = muck_props::DEFAULT_GENDER_PROP;
        let current = strip_delimiters(&self.config.gender_prop);
        if current.eq_ignore_ascii_case(legacy) {
            return None;
        }
        if name.eq_ignore_ascii_case(current) {
            Some(legacy.to_string())
        } else if name.eq_ignore_ascii_case(legacy) {
            Some(current.to_string())
        } else {
            None
        }
    }

    /// Store a string if `strval` is non-empty, else an integer if `value` is non-zero, else
    /// remove the property.
    pub fn add_property(&mut self, obj: Dbref, path: &str, strval: &str, value: i32) -> bool {
        let prop = if !strval.is_empty() {
            PropValue::Str(strval.to_string())
        } else if value != 0 {
            PropValue::Int(value)
        } else {
            PropValue::Dir
        };
        self.set_property(obj, path, prop)
    }

    /// Delete the property at `path` and everything under it.
    pub fn remove_property(&mut self, obj: Dbref, path: &str) -> bool {
        if !self.exists(obj) || !self.fetch_props_for_write(obj, &propdir_name(path)) {
            return false;
        }
        self.remove_property_nofetch(obj, path, false);
        self.dirty_props(obj);
        self.mark_changed(obj);
        true
    }

    fn remove_property_nofetch(&mut self, obj: Dbref, path: &str, sync: bool) {
        let Some(o) = self.get_mut(obj) else {
            return;
        };
        o.props.delete_elem(path);
        if o.object_type() != ObjectType::Player {
            return;
        }
        let name = strip_delimiters(path);
        if name.eq_ignore_ascii_case(strip_delimiters(GUEST_PROP)) {
            o.flags.clear(ObjFlag::Guest);
        } else if !sync {
            if let Some(twin) = self.gender_twin(name) {
                self.fetch_props(obj, &propdir_name(&twin));
                self.remove_property_nofetch(obj, &twin, true);
            }
        }
    }

    /// Clear the top level of `obj`'s properties. System properties always survive; hidden,
    /// see-only and `_` survive unless `all` is set.
    pub fn remove_property_list(&mut self, obj: Dbref, all: bool) -> bool {
        if !self.exists(obj) || !self.fetch_props_for_write(obj, "/") {
            return false;
        }
        let removed = match self.get_mut(obj) {
            Some(o) => o.props.remove_top_level(all),
            None => vec![],
        };
        if self.object_type(obj) == Some(ObjectType::Player)
            && removed
                .iter()
                .any(|n| n.eq_ignore_ascii_case(strip_delimiters(GUEST_PROP)))
        {
            if let Some(o) = self.get_mut(obj) {
                o.flags.clear(ObjFlag::Guest);
            }
        }
        self.dirty_props(obj);
        self.mark_changed(obj);
        true
    }

    pub fn is_propdir(&mut self, obj: Dbref, path: &str) -> bool {
        self.fetch_props(obj, &propdir_name(path));
        self.get(obj).is_some_and(|o| o.props.is_propdir(path))
    }

    /// The full name of the property after `name`; see [`muck_props::PropDir::next_prop_name`].
    pub fn next_prop_name(&mut self, obj: Dbref, name: &str) -> Option<String> {
        self.fetch_props(obj, &propdir_name(name));
        self.get(obj)?.props.next_prop_name(name)
    }

    /// Search `obj` and then each enclosing location for a property at `path`, optionally only
    /// accepting one of type `ty`. Returns where it was found along with its value.
    pub fn envprop(
        &mut self,
        obj: Dbref,
        path: &str,
        ty: Option<PropType>,
    ) -> Option<(Dbref, PropValue)> {
        let mut cursor = obj;
        for _ in 0..MAX_PARENT_DEPTH {
            if !self.exists(cursor) {
                return None;
            }
            if let Some(node) = self.get_property(cursor, path) {
                if ty.is_none_or(|ty| node.prop_type() == ty) {
                    return Some((cursor, node.value().clone()));
                }
            }
            cursor = self.parent_of(cursor);
        }
        None
    }

    pub fn envprop_str(&mut self, obj: Dbref, path: &str) -> Option<String> {
        match self.envprop(obj, path, Some(PropType::Str))? {
            (_, PropValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Copy every property of `from` onto `to`, overwriting properties both have.
    pub fn copy_properties(&mut self, from: Dbref, to: Dbref) -> bool {
        if !self.exists(from) || !self.exists(to) {
            return false;
        }
        if !self.fetch_props_for_write(from, "/") || !self.fetch_props_for_write(to, "/") {
            return false;
        }
        let copy = match self.get(from) {
            Some(o) => o.props.copy_all(),
            None => return false,
        };
        if let Some(o) = self.get_mut(to) {
            copy.merge_into(&mut o.props);
        }
        self.dirty_props(to);
        self.mark_changed(to);
        true
    }

    /// Approximate memory held by `obj`'s properties. With `load`, every value is read in first.
    pub fn size_properties(&mut self, obj: Dbref, load: bool) -> usize {
        if load {
            self.fetch_props(obj, "/");
            self.fetch_propvals(obj, "/");
        }
        self.get(obj).map(|o| o.props.size_of()).unwrap_or(0)
    }

    /// 1-based position of `target` in the reference list at `path`, or 0.
    pub fn reflist_find(&mut self, obj: Dbref, path: &str, target: Dbref) -> usize {
        let value = self.get_property_value(obj, path);
        reflist_find(value.as_ref(), target)
    }

    /// Append `target` to the reference list at `path`, moving it to the end if present. True if
    /// the list was rewritten.
    pub fn reflist_add(&mut self, obj: Dbref, path: &str, target: Dbref) -> bool {
        let value = self.get_property_value(obj, path);
        match reflist_add(value.as_ref(), target) {
            Some(updated) => self.set_property(obj, path, updated),
            None => false,
        }
    }

    pub fn reflist_del(&mut self, obj: Dbref, path: &str, target: Dbref) -> bool {
        let value = self.get_property_value(obj, path);
        match reflist_del(value.as_ref(), target) {
            Some(updated) => self.set_property(obj, path, updated),
            None => false,
        }
    }

    /// One line of a property listing, with references shown by name.
    pub fn display_property(&mut self, obj: Dbref, path: &str) -> String {
        let node = self.get_property(obj, path).cloned();
        display_prop(path, node.as_ref(), &|d| self.unparse_object(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use muck_common::GOD;
    use pretty_assertions::assert_eq;

    fn db_with_player() -> (Database, Dbref, Dbref) {
        let mut db = Database::new(DatabaseConfig::default());
        let room = db.create_object("Room Zero", NOTHING, ObjectType::Room);
        let wizard = db.create_object("One", NOTHING, ObjectType::Player);
        assert_eq!(wizard, GOD);
        (db, room, wizard)
    }

    #[test]
    fn empty_string_deletes() {
        let (mut db, room, _) = db_with_player();
        db.set_property(room, "foo/bar", PropValue::Str(String::new()));
        assert!(db.get_property(room, "foo/bar").is_none());
        assert!(db.get_property(room, "foo").is_none());

        db.set_property(room, "foo/bar", PropValue::Str("x".into()));
        db.set_property(room, "foo/baz", PropValue::Str("y".into()));
        db.set_property(room, "foo/bar", PropValue::Str(String::new()));
        assert!(db.get_property(room, "foo/bar").is_none());
        assert_eq!(db.get_string(room, "foo/baz").as_deref(), Some("y"));
        assert!(db.is_propdir(room, "foo"));
    }

    #[test]
    fn typed_getters_default() {
        let (mut db, room, _) = db_with_player();
        db.set_property(room, "n", PropValue::Int(7));
        db.set_property(room, "f", PropValue::Float(1.5));
        db.set_property(room, "r", PropValue::Ref(GOD));
        assert_eq!(db.get_int(room, "n"), 7);
        assert_eq!(db.get_int(room, "missing"), 0);
        assert_eq!(db.get_float(room, "f"), 1.5);
        assert_eq!(db.get_ref(room, "r"), GOD);
        assert_eq!(db.get_ref(room, "n"), NOTHING);
        assert!(db.get_lock(room, "n").is_unlocked());
    }

    #[test]
    fn listen_props_set_listener() {
        let (mut db, room, _) = db_with_player();
        assert!(!db.has_flag(room, ObjFlag::Listener));
        db.set_property(room, "_listen/foo", PropValue::Str("x".into()));
        assert!(db.has_flag(room, ObjFlag::Listener));
    }

    #[test]
    fn guest_prop_drives_guest_flag() {
        let (mut db, room, wizard) = db_with_player();
        db.set_property(wizard, "~/IsGuest", PropValue::Str("yes".into()));
        assert!(db.has_flag(wizard, ObjFlag::Guest));
        db.remove_property(wizard, "/~/isguest");
        assert!(!db.has_flag(wizard, ObjFlag::Guest));

        db.set_property(room, "~/isguest", PropValue::Str("yes".into()));
        assert!(!db.has_flag(room, ObjFlag::Guest));
    }

    #[test]
    fn gender_prop_mirrors_legacy() {
        let (mut db, _, wizard) = db_with_player();
        db.config_mut().gender_prop = "_/gender".to_string();
        db.set_property(wizard, "_/gender", PropValue::Str("female".into()));
        assert_eq!(db.get_string(wizard, "sex").as_deref(), Some("female"));
        db.set_property(wizard, "sex", PropValue::Str("male".into()));
        assert_eq!(db.get_string(wizard, "_/gender").as_deref(), Some("male"));
        db.remove_property(wizard, "sex");
        assert!(db.get_property(wizard, "_/gender").is_none());
    }

    #[test]
    fn gender_sync_off_by_default() {
        let (mut db, _, wizard) = db_with_player();
        db.set_property(wizard, "_/gender", PropValue::Str("female".into()));
        assert!(db.get_property(wizard, "sex").is_none());
    }

    #[test]
    fn envprop_walks_locations() {
        let (mut db, room, wizard) = db_with_player();
        let thing = db.create_object("box", wizard, ObjectType::Thing);
        db.move_to(thing, room);
        db.set_property(room, "_reg/box", PropValue::Ref(thing));
        db.set_property(room, "greeting", PropValue::Str("hi".into()));

        assert_eq!(
            db.envprop(thing, "_reg/box", Some(PropType::Ref)),
            Some((room, PropValue::Ref(thing)))
        );
        assert_eq!(db.envprop(thing, "greeting", Some(PropType::Int)), None);
        assert_eq!(db.envprop_str(thing, "greeting").as_deref(), Some("hi"));
    }

    #[test]
    fn remove_list_spares_hidden_props() {
        let (mut db, room, _) = db_with_player();
        db.set_property(room, "visible", PropValue::Int(1));
        db.set_property(room, "@hidden", PropValue::Int(1));
        db.set_property(room, "~seeonly", PropValue::Int(1));
        db.remove_property_list(room, false);
        assert!(!db.has_property(room, "visible"));
        assert!(db.has_property(room, "@hidden"));
        assert!(db.has_property(room, "~seeonly"));
        db.remove_property_list(room, true);
        assert!(!db.has_property(room, "~seeonly"));
    }

    #[test]
    fn reflists_through_the_store() {
        let (mut db, room, wizard) = db_with_player();
        db.reflist_add(room, "_list", wizard);
        db.reflist_add(room, "_list", room);
        assert_eq!(db.reflist_find(room, "_list", room), 2);
        db.reflist_del(room, "_list", wizard);
        assert_eq!(db.reflist_find(room, "_list", room), 1);
        assert_eq!(db.reflist_find(room, "_list", wizard), 0);
    }

    #[test]
    fn writes_mark_object_changed() {
        let (mut db, room, _) = db_with_player();
        if let Some(o) = db.get_mut(room) {
            o.flags.clear(ObjFlag::ObjectChanged);
        }
        db.set_property(room, "a", PropValue::Int(1));
        assert!(db.has_flag(room, ObjFlag::ObjectChanged));
        assert_eq!(db.paging_mode(room), crate::diskbase::PagingMode::Changed);
    }
}
