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

//! Saving and loading whole dump files, with and without delta sections.

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use muck_boolexp::{BoolExpr, Lock, PropCheck};
    use muck_common::{Dbref, NOTHING, ObjFlag, ObjectType};
    use muck_db::{Database, DatabaseConfig, PagingMode, TypeData};
    use muck_props::PropValue;
    use muck_textdump::{
        DumpReaderError, DumpVersion, PropsLoadMode, TuneParams, append_deltas, discard_deltas,
        load_database, load_deltas, save_database,
    };
    use pretty_assertions::assert_eq;

    struct World {
        db: Database,
        den: Dbref,
        alice: Dbref,
        lamp: Dbref,
        lock: Lock,
    }

    /// A start room, a wizard, a den with a player, a lamp and an exit, an exit back into the
    /// den, and a spread of property types on the den.
    fn world() -> World {
        let mut db = Database::new(DatabaseConfig::default());
        let start = db.create_object("Start", NOTHING, ObjectType::Room);
        let wizard = db.create_object("Wizard", NOTHING, ObjectType::Player);
        db.move_to(wizard, start);
        let den = db.create_object("Den", wizard, ObjectType::Room);
        let alice = db.create_object("Alice", NOTHING, ObjectType::Player);
        if let Some(o) = db.get_mut(alice) {
            o.set_home(den);
            if let TypeData::Player { password, .. } = &mut o.data {
                *password = "potrzebie".to_string();
            }
        }
        db.move_to(alice, den);
        let lamp = db.create_object("lamp", alice, ObjectType::Thing);
        if let Some(o) = db.get_mut(lamp) {
            o.set_home(den);
            o.flags.set(ObjFlag::Dark);
        }
        db.move_to(lamp, den);
        let door = db.create_object("out", alice, ObjectType::Exit);
        db.get_mut(door).unwrap().data = TypeData::Exit { dests: vec![start] };
        db.move_to(door, den);
        let way_in = db.create_object("in", wizard, ObjectType::Exit);
        db.get_mut(way_in).unwrap().data = TypeData::Exit { dests: vec![den] };
        db.move_to(way_in, start);

        let lock = Lock::new(BoolExpr::and(
            BoolExpr::Const(alice),
            BoolExpr::Prop(PropCheck::new_str("species", "fox")),
        ));
        db.set_property(den, "_/de", PropValue::Str("A cozy den.".into()));
        db.set_property(den, "count", PropValue::Int(42));
        db.set_property(den, "ratio", PropValue::Float(2.5));
        db.set_property(den, "keeper", PropValue::Ref(alice));
        db.set_property(den, "_/lok", PropValue::Lock(lock.clone()));
        db.set_property(den, "notes/a/b", PropValue::Str("deep".into()));
        db.set_property(alice, "_listen/hi", PropValue::Str("hello".into()));
        World {
            db,
            den,
            alice,
            lamp,
            lock,
        }
    }

    fn load(path: &Path) -> Database {
        let mut db = Database::new(DatabaseConfig::default());
        load_database(&mut db, path, PropsLoadMode::Paged).unwrap();
        db
    }

    #[test]
    fn save_then_load_restores_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("muck.db");
        let mut w = world();
        let saved = save_database(&mut w.db, &path, &TuneParams::new()).unwrap();
        assert_eq!(saved.objects, 7);
        assert_eq!(saved.bytes, fs::metadata(&path).unwrap().len());
        assert!(!w.db.has_flag(w.den, ObjFlag::ObjectChanged));

        let mut db = Database::new(DatabaseConfig::default());
        let report = load_database(&mut db, &path, PropsLoadMode::Paged).unwrap();
        assert_eq!(report.version, DumpVersion::Foxen9);
        assert_eq!(report.objects, 7);
        assert_eq!(report.applied_params, 5);
        assert_eq!(db.db_top(), 7);

        for (obj, original) in w.db.objects() {
            let loaded = db.get(obj).unwrap();
            assert_eq!(loaded.name, original.name);
            assert_eq!(loaded.location, original.location);
            assert_eq!(loaded.contents, original.contents);
            assert_eq!(loaded.next, original.next);
            assert_eq!(loaded.owner, original.owner);
            assert_eq!(loaded.data, original.data);
            assert_eq!(loaded.timestamps, original.timestamps);
            assert_eq!(db.paging_mode(obj), PagingMode::Unloaded);
        }
        assert!(db.has_flag(w.lamp, ObjFlag::Dark));
        assert!(db.has_flag(w.alice, ObjFlag::Listener));
        assert_eq!(db.lookup_player("alice"), w.alice);

        assert_eq!(db.get_string(w.den, "_/de").as_deref(), Some("A cozy den."));
        assert_eq!(db.get_int(w.den, "count"), 42);
        assert_eq!(db.get_float(w.den, "ratio"), 2.5);
        assert_eq!(db.get_ref(w.den, "keeper"), w.alice);
        assert_eq!(db.get_lock(w.den, "_/lok"), w.lock);
        assert_eq!(db.get_string(w.den, "notes/a/b").as_deref(), Some("deep"));
        assert_eq!(db.paging_mode(w.den), PagingMode::Loaded);
    }

    #[test]
    fn multi_line_text_stays_inside_its_property() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("muck.db");
        let mut w = world();
        assert!(w.db.set_property(
            w.den,
            "_/de",
            PropValue::Str("line1\n*End*\nx:0:y\n".into())
        ));
        assert_eq!(
            w.db.get_string(w.den, "_/de").as_deref(),
            Some("line1\r*End*\rx:0:y")
        );
        save_database(&mut w.db, &path, &TuneParams::new()).unwrap();

        let mut db = load(&path);
        assert_eq!(db.db_top(), 7);
        assert_eq!(
            db.get_string(w.den, "_/de").as_deref(),
            Some("line1\r*End*\rx:0:y")
        );
        assert_eq!(db.get_int(w.den, "count"), 42);
        assert_eq!(db.get_string(w.den, "x"), None);
        assert_eq!(db.get_lock(w.den, "_/lok"), w.lock);
    }

    #[test]
    fn resaving_unloaded_objects_copies_their_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.db");
        let second = dir.path().join("second.db");
        let mut w = world();
        save_database(&mut w.db, &first, &TuneParams::new()).unwrap();

        let mut db = Database::new(DatabaseConfig::default());
        let report = load_database(&mut db, &first, PropsLoadMode::Paged).unwrap();
        save_database(&mut db, &second, &report.params).unwrap();
        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());

        // The store now pages from the second file.
        assert_eq!(db.get_string(w.den, "_/de").as_deref(), Some("A cozy den."));
    }

    #[test]
    fn untouched_values_go_back_to_disk_after_a_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("muck.db");
        let mut w = world();
        let top = w.db.db_top();
        w.db.untouch_props_incremental(top);
        save_database(&mut w.db, &path, &TuneParams::new()).unwrap();

        assert_eq!(w.db.paging_mode(w.den), PagingMode::Loaded);
        let stubbed = |db: &Database, path: &str| {
            db.get(w.den)
                .and_then(|o| o.resident_props().get(path))
                .is_some_and(|n| n.value().is_stub())
        };
        assert!(stubbed(&w.db, "_/de"));
        assert!(stubbed(&w.db, "_/lok"));
        assert!(!stubbed(&w.db, "count"));

        assert_eq!(w.db.get_string(w.den, "_/de").as_deref(), Some("A cozy den."));
        assert_eq!(w.db.get_lock(w.den, "_/lok"), w.lock);
        assert!(!stubbed(&w.db, "_/de"));
    }

    #[test]
    fn deltas_overlay_the_base_dump() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("muck.db");
        let deltas = dir.path().join("muck.db.deltas");
        let mut w = world();
        save_database(&mut w.db, &base, &TuneParams::new()).unwrap();

        w.db.get_mut(w.alice).unwrap().name = "Alicia".to_string();
        w.db.mark_changed(w.alice);
        w.db.set_property(w.lamp, "color", PropValue::Str("red".into()));
        let bob = w.db.create_object("Bob", NOTHING, ObjectType::Player);
        assert_eq!(append_deltas(&mut w.db, &deltas).unwrap(), 3);
        assert!(!w.db.has_flag(bob, ObjFlag::ObjectChanged));

        w.db.get_mut(w.lamp).unwrap().name = "lantern".to_string();
        w.db.mark_changed(w.lamp);
        assert_eq!(append_deltas(&mut w.db, &deltas).unwrap(), 1);

        let mut db = load(&base);
        assert_eq!(load_deltas(&mut db, &deltas).unwrap(), 4);
        assert_eq!(db.db_top(), 8);
        assert_eq!(db.lookup_player("Alicia"), w.alice);
        assert_eq!(db.lookup_player("Alice"), NOTHING);
        assert_eq!(db.lookup_player("bob"), bob);
        assert_eq!(db.name(w.lamp), Some("lantern"));
        assert_eq!(db.get_string(w.lamp, "color").as_deref(), Some("red"));
        assert_eq!(db.paging_mode(w.lamp), PagingMode::Changed);
        // Untouched by the deltas, still paged from the base dump.
        assert_eq!(db.get_string(w.den, "_/de").as_deref(), Some("A cozy den."));

        // A full save supersedes the deltas.
        save_database(&mut db, &base, &TuneParams::new()).unwrap();
        discard_deltas(&deltas).unwrap();
        assert_eq!(fs::metadata(&deltas).unwrap().len(), 0);
        let mut again = load(&base);
        assert_eq!(load_deltas(&mut again, &deltas).unwrap(), 0);
        assert_eq!(again.name(w.lamp), Some("lantern"));
    }

    #[test]
    fn missing_deltas_are_nothing_to_apply() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::new(DatabaseConfig::default());
        assert_eq!(
            load_deltas(&mut db, &dir.path().join("absent")).unwrap(),
            0
        );
        discard_deltas(&dir.path().join("absent")).unwrap();
    }

    #[test]
    fn dump_kinds_are_not_interchangeable() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("muck.db");
        let deltas = dir.path().join("muck.db.deltas");
        let mut w = world();
        append_deltas(&mut w.db, &deltas).unwrap();
        save_database(&mut w.db, &base, &TuneParams::new()).unwrap();

        let mut db = Database::new(DatabaseConfig::default());
        assert!(matches!(
            load_database(&mut db, &deltas, PropsLoadMode::Paged),
            Err(DumpReaderError::VersionError(_))
        ));
        let mut db = load(&base);
        assert!(matches!(
            load_deltas(&mut db, &base),
            Err(DumpReaderError::VersionError(_))
        ));
    }

    const FOXEN5: &str = "***Foxen5 TinyMUCK DUMP Format***
4
1
2
lock_envcheck=yes
muckname=Test
#3
<garbage>
-1
-1
-1
6
0
0
0
0
*Props*
*End*
#2
<garbage>
-1
-1
-1
6
0
0
0
0
*Props*
*End*
#1
Wizard
0
-1
-1
19
10
20
5
30
*Props*
sex:2:male
*End*
0
-1
potrzebie
#0
Room Zero
-1
1
-1
0
10
10
0
10
*Props*
_/de:2:The first room.
*End*
-1
-1
1
***END OF DUMP***
";

    #[test]
    fn older_full_dumps_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.db");
        fs::write(&path, FOXEN5).unwrap();
        let mut db = Database::new(DatabaseConfig::default());
        let report = load_database(&mut db, &path, PropsLoadMode::Paged).unwrap();
        assert_eq!(report.version, DumpVersion::Foxen5);
        assert_eq!(report.objects, 4);
        assert_eq!(report.params.get("muckname"), Some("Test"));
        assert_eq!(report.applied_params, 1);
        assert!(db.config().lock_envcheck);

        let wizard = Dbref::mk_id(1);
        assert_eq!(db.lookup_player("WIZARD"), wizard);
        assert_eq!(db.owner(wizard), wizard);
        assert!(db.has_flag(wizard, ObjFlag::Wizard));
        assert_eq!(db.get(wizard).unwrap().timestamps.use_count, 5);
        assert_eq!(db.free_list(), vec![Dbref::mk_id(3), Dbref::mk_id(2)]);
        assert_eq!(db.get_string(wizard, "sex").as_deref(), Some("male"));
        assert_eq!(
            db.get_string(Dbref::mk_id(0), "_/de").as_deref(),
            Some("The first room.")
        );
    }

    #[test]
    fn headerless_dumps_load_resident() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ancient.db");
        fs::write(
            &path,
            "#0\nRoom\nA room.\n-1\n-1\n-1\n\nYou can't.\n\n\n\n0\n-1\n-1\n1\n***END OF DUMP***\n",
        )
        .unwrap();
        let mut db = Database::new(DatabaseConfig::default());
        let report = load_database(&mut db, &path, PropsLoadMode::Paged).unwrap();
        assert_eq!(report.version, DumpVersion::HeaderLess);
        let room = Dbref::mk_id(0);
        assert_eq!(db.paging_mode(room), PagingMode::Changed);
        assert_eq!(db.get_string(room, "_/de").as_deref(), Some("A room."));
        assert_eq!(db.get_string(room, "_/fl").as_deref(), Some("You can't."));
        assert_eq!(db.owner(room), Dbref::mk_id(1));
        assert!(db.get(room).unwrap().timestamps.created > 0);
    }

    #[test]
    fn truncated_dumps_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.db");
        let cut = FOXEN5.find("#0").unwrap();
        fs::write(&path, &FOXEN5[..cut]).unwrap();
        let mut db = Database::new(DatabaseConfig::default());
        assert!(matches!(
            load_database(&mut db, &path, PropsLoadMode::Paged),
            Err(DumpReaderError::IoError(..))
        ));
        assert!(matches!(
            load_database(&mut db, &dir.path().join("absent.db"), PropsLoadMode::Paged),
            Err(DumpReaderError::CouldNotOpenFile(_))
        ));
    }
}
