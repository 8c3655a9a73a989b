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

use muck_boolexp::{
    LockEnvironment, MatchEnvironment, ProgramRunner, evaluate, parse_lock,
};
use muck_common::{Dbref, NOTHING, ObjFlag, ObjectType};
use muck_props::PropType;
use tracing::info;

use crate::store::Database;

/// Where registered `$names` are kept in an object's environment.
const REGISTRATION_PROPDIR: &str = "_reg";

impl LockEnvironment for Database {
    fn object_type(&self, obj: Dbref) -> Option<ObjectType> {
        self.get(obj)
            .filter(|o| !o.is_garbage())
            .map(|o| o.object_type())
    }

    fn owner_of(&self, obj: Dbref) -> Dbref {
        self.owner(obj)
    }

    fn location_of(&self, obj: Dbref) -> Dbref {
        self.location(obj)
    }

    fn contents_of(&self, obj: Dbref) -> Vec<Dbref> {
        self.contents(obj)
    }

    fn string_property(&mut self, obj: Dbref, name: &str) -> Option<String> {
        self.get_string(obj, name)
    }

    fn lock_envcheck(&self) -> bool {
        self.config.lock_envcheck
    }
}

impl MatchEnvironment for Database {
    fn obj_valid(&self, obj: Dbref) -> bool {
        self.valid(obj)
    }

    fn name_of(&self, obj: Dbref) -> Option<String> {
        self.get(obj).map(|o| o.name.clone())
    }

    fn location_of(&self, obj: Dbref) -> Dbref {
        self.location(obj)
    }

    fn contents_of(&self, obj: Dbref) -> Vec<Dbref> {
        self.contents(obj)
    }

    fn owner_of(&self, obj: Dbref) -> Dbref {
        self.owner(obj)
    }

    fn is_wizard(&self, obj: Dbref) -> bool {
        self.has_flag(obj, ObjFlag::Wizard)
    }

    fn lookup_player(&self, name: &str) -> Dbref {
        Database::lookup_player(self, name)
    }

    fn find_registered(&mut self, from: Dbref, name: &str) -> Dbref {
        let path = format!("{REGISTRATION_PROPDIR}/{name}");
        match self.envprop(from, &path, Some(PropType::Ref)) {
            Some((_, value)) => value.as_dbref().unwrap_or(NOTHING),
            None => NOTHING,
        }
    }

    fn notify(&mut self, player: Dbref, message: &str) {
        info!(?player, message, "lock parse");
    }
}

impl Database {
    /// Parse lock text typed by `player`, resolving names from where they stand.
    pub fn parse_lock(&mut self, player: Dbref, text: &str) -> muck_boolexp::Lock {
        parse_lock(self, player, text)
    }

    /// Whether `actor` passes the lock stored on `subject` at `lockprop`. No lock means pass.
    pub fn test_lock(
        &mut self,
        runner: &mut dyn ProgramRunner,
        actor: Dbref,
        subject: Dbref,
        lockprop: &str,
    ) -> bool {
        let lock = self.get_lock(subject, lockprop);
        evaluate(self, runner, actor, &lock, subject)
    }

    /// Like [`Database::test_lock`], except that no lock means fail.
    pub fn test_lock_false_default(
        &mut self,
        runner: &mut dyn ProgramRunner,
        actor: Dbref,
        subject: Dbref,
        lockprop: &str,
    ) -> bool {
        let lock = self.get_lock(subject, lockprop);
        if lock.is_unlocked() {
            return false;
        }
        evaluate(self, runner, actor, &lock, subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use muck_boolexp::NoPrograms;
    use muck_props::PropValue;
    use pretty_assertions::assert_eq;

    fn world() -> (Database, Dbref, Dbref, Dbref) {
        let mut db = Database::new(DatabaseConfig::default());
        let room = db.create_object("Lobby", NOTHING, ObjectType::Room);
        let wizard = db.create_object("Wizard", NOTHING, ObjectType::Player);
        let guest = db.create_object("Guest", NOTHING, ObjectType::Player);
        db.move_to(wizard, room);
        db.move_to(guest, room);
        (db, room, wizard, guest)
    }

    #[test]
    fn typed_lock_keys_resolve_against_the_store() {
        let (mut db, room, wizard, guest) = world();
        let lock = db.parse_lock(wizard, "*Wizard");
        db.set_property(room, "_/lok", PropValue::Lock(lock));
        assert!(db.test_lock(&mut NoPrograms, wizard, room, "_/lok"));
        assert!(!db.test_lock(&mut NoPrograms, guest, room, "_/lok"));
    }

    #[test]
    fn missing_lock_defaults() {
        let (mut db, room, wizard, _) = world();
        assert!(db.test_lock(&mut NoPrograms, wizard, room, "_/lok"));
        assert!(!db.test_lock_false_default(&mut NoPrograms, wizard, room, "_/lok"));
    }

    #[test]
    fn property_keys_read_through_the_store() {
        let (mut db, room, wizard, guest) = world();
        db.set_property(wizard, "species", PropValue::Str("fox".into()));
        let lock = db.parse_lock(wizard, "species:fox");
        db.set_property(room, "_/lok", PropValue::Lock(lock));
        assert!(db.test_lock(&mut NoPrograms, wizard, room, "_/lok"));
        assert!(!db.test_lock(&mut NoPrograms, guest, room, "_/lok"));
    }

    #[test]
    fn registered_names_come_from_the_environment() {
        let (mut db, room, wizard, _) = world();
        db.set_property(room, "_reg/boss", PropValue::Ref(wizard));
        assert_eq!(db.find_registered(wizard, "boss"), wizard);
        assert_eq!(db.find_registered(wizard, "nobody"), NOTHING);
    }
}
