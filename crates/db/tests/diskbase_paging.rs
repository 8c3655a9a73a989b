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

//! Property sets paged in from a backing file: whole-set fetches, single value fetches, the
//! housekeeping sweep and the queue bookkeeping behind them.

#[cfg(test)]
mod tests {
    use std::io::Write;

    use muck_common::{Dbref, NOTHING, ObjFlag, ObjectType};
    use muck_db::{
        BackingFile, Database, DatabaseConfig, LoadedProps, ManualClock, Object, PagingMode,
        TypeData,
    };
    use muck_props::{PropFlag, PropType, PropValue};
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    const PREAMBLE: &str = "#0\n";

    /// A file holding one property block after a short preamble. Returns the block position and
    /// the position of each property line.
    fn backing_with(lines: &[&str]) -> (NamedTempFile, u64, Vec<u64>) {
        let mut file = NamedTempFile::new().unwrap();
        let mut text = format!("{PREAMBLE}*Props*\n");
        let block_pos = PREAMBLE.len() as u64 + 1;
        let mut positions = vec![];
        for line in lines {
            positions.push(text.len() as u64);
            text.push_str(line);
            text.push('\n');
        }
        text.push_str("*End*\n");
        file.write_all(text.as_bytes()).unwrap();
        file.flush().unwrap();
        (file, block_pos, positions)
    }

    fn room(name: &str) -> Object {
        let mut o = Object::cleared(0);
        o.name = name.to_string();
        o.data = TypeData::empty(ObjectType::Room);
        o
    }

    fn db_on(file: &NamedTempFile, block_pos: u64, clock: &ManualClock) -> Database {
        let mut db = Database::with_clock(DatabaseConfig::default(), Box::new(clock.clone()));
        db.install_object(
            Dbref::mk_id(0),
            room("Lobby"),
            LoadedProps::OnDisk { pos: block_pos },
        );
        db.set_backing_file(Some(BackingFile::open(file.path()).unwrap()));
        db
    }

    #[test]
    fn stub_fetch_reads_the_written_line() {
        let (file, block_pos, positions) =
            backing_with(&["desc:2:A plain room.", "_/lok:4:#0", "count:3:12"]);
        let clock = ManualClock::new(1000);
        let mut db = db_on(&file, block_pos, &clock);
        let lobby = Dbref::mk_id(0);

        assert_eq!(db.paging_mode(lobby), PagingMode::Unloaded);
        assert!(db.fetch_props(lobby, "/"));
        assert_eq!(db.paging_mode(lobby), PagingMode::Loaded);

        let props = db.get(lobby).unwrap().resident_props();
        assert_eq!(
            props.get("desc").unwrap().value(),
            &PropValue::Stub {
                ty: PropType::Str,
                pos: positions[0]
            }
        );
        assert!(props.get("desc").unwrap().flags().contains(PropFlag::Unloaded));
        assert_eq!(props.get("count").unwrap().value(), &PropValue::Int(12));

        assert!(db.propfetch(lobby, "desc"));
        let node = db.get(lobby).unwrap().resident_props().get("desc").unwrap();
        assert_eq!(node.value(), &PropValue::Str("A plain room.".into()));
        assert!(!node.flags().contains(PropFlag::Unloaded));
        assert!(node.is_touched());
        assert_eq!(db.fetch_stats().stub_loads(), 1);

        // Already resident: touched again but nothing read.
        assert!(!db.propfetch(lobby, "desc"));
        assert_eq!(db.fetch_stats().stub_loads(), 1);

        let lock = db.get_lock(lobby, "_/lok");
        assert_eq!(lock.unparse(), "#0");
    }

    #[test]
    fn fetching_twice_is_a_hit() {
        let (file, block_pos, _) = backing_with(&["desc:2:x"]);
        let clock = ManualClock::new(1000);
        let mut db = db_on(&file, block_pos, &clock);
        let lobby = Dbref::mk_id(0);

        assert!(db.fetch_props(lobby, "/"));
        assert!(!db.fetch_props(lobby, "/"));
        assert_eq!(db.fetch_stats().misses(), 1);
        assert_eq!(db.fetch_stats().hits(), 1);
        assert_eq!(db.get(lobby).unwrap().resident_props().len(), 1);
    }

    #[test]
    fn values_load_eagerly_without_stubbing() {
        let (file, block_pos, _) = backing_with(&["desc:2:eager"]);
        let clock = ManualClock::new(1000);
        let mut db = db_on(&file, block_pos, &clock);
        db.config_mut().diskbase_propvals = false;
        let lobby = Dbref::mk_id(0);

        db.fetch_props(lobby, "/");
        assert_eq!(
            db.get(lobby).unwrap().resident_props().get("desc").unwrap().value(),
            &PropValue::Str("eager".into())
        );
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let (file, block_pos, _) = backing_with(&[
            "good:2:yes",
            "no delimiters here",
            "bad:3:twelve",
            "worse:1:unknown type",
            "nested/deep:3:5",
        ]);
        let clock = ManualClock::new(1000);
        let mut db = db_on(&file, block_pos, &clock);
        let lobby = Dbref::mk_id(0);

        assert_eq!(db.get_string(lobby, "good").as_deref(), Some("yes"));
        assert_eq!(db.get_int(lobby, "nested/deep"), 5);
        assert!(!db.has_property(lobby, "bad"));
        assert!(!db.has_property(lobby, "worse"));
    }

    #[test]
    fn unreadable_stub_becomes_empty() {
        let (file, block_pos, _) = backing_with(&["desc:2:original"]);
        let clock = ManualClock::new(1000);
        let mut db = db_on(&file, block_pos, &clock);
        let lobby = Dbref::mk_id(0);
        db.fetch_props(lobby, "/");

        // Same layout, but the line the stub points at is no longer a property line.
        let (other, _, _) = backing_with(&["desc-without-delimiters"]);
        db.set_backing_file(Some(BackingFile::open(other.path()).unwrap()));

        assert!(db.propfetch(lobby, "desc"));
        assert_eq!(
            db.get(lobby).unwrap().resident_props().get("desc").unwrap().value(),
            &PropValue::Str(String::new())
        );
    }

    #[test]
    fn missing_backing_file_leaves_object_unloaded() {
        let clock = ManualClock::new(1000);
        let mut db = Database::with_clock(DatabaseConfig::default(), Box::new(clock.clone()));
        let lobby = Dbref::mk_id(0);
        db.install_object(lobby, room("Lobby"), LoadedProps::OnDisk { pos: 4 });

        assert!(!db.fetch_props(lobby, "/"));
        assert_eq!(db.paging_mode(lobby), PagingMode::Unloaded);
        assert_eq!(db.get_property(lobby, "desc").map(|n| n.name().to_string()), None);
    }

    #[test]
    fn writes_are_refused_when_the_block_cannot_be_read() {
        let (file, block_pos, _) = backing_with(&["desc:2:x"]);
        let clock = ManualClock::new(1000);
        let mut db = db_on(&file, block_pos, &clock);
        let lobby = Dbref::mk_id(0);
        std::fs::write(file.path(), "garbage").unwrap();

        assert!(!db.set_property(lobby, "new", PropValue::Str("written".into())));
        assert!(!db.remove_property(lobby, "desc"));
        assert!(!db.remove_property_list(lobby, true));
        assert_eq!(db.paging_mode(lobby), PagingMode::Unloaded);
        assert!(db.get(lobby).unwrap().resident_props().is_empty());
        assert!(!db.has_flag(lobby, ObjFlag::ObjectChanged));
        assert_eq!(db.get_string(lobby, "new"), None);
    }

    #[test]
    fn dispose_respects_the_clean_interval() {
        let (file, block_pos, _) = backing_with(&["desc:2:x"]);
        let clock = ManualClock::new(1000);
        let mut db = db_on(&file, block_pos, &clock);
        let lobby = Dbref::mk_id(0);
        db.fetch_props(lobby, "/");

        clock.advance(100);
        assert!(!db.dispose_props(lobby));
        assert_eq!(db.paging_mode(lobby), PagingMode::Loaded);

        clock.advance(db.config().clean_interval);
        assert!(db.dispose_props(lobby));
        assert_eq!(db.paging_mode(lobby), PagingMode::Unloaded);
        assert!(db.get(lobby).unwrap().resident_props().is_empty());

        // Still reachable afterwards.
        assert_eq!(db.get_string(lobby, "desc").as_deref(), Some("x"));
    }

    #[test]
    fn changed_props_are_never_disposed() {
        let (file, block_pos, _) = backing_with(&["desc:2:x"]);
        let clock = ManualClock::new(1000);
        let mut db = db_on(&file, block_pos, &clock);
        let lobby = Dbref::mk_id(0);

        db.set_property(lobby, "new", PropValue::Int(1));
        assert_eq!(db.paging_mode(lobby), PagingMode::Changed);
        clock.advance(10_000);
        assert!(!db.dispose_props_notime(lobby));
        assert_eq!(db.dispose_all_old_props(), 0);
        assert_eq!(db.get_string(lobby, "desc").as_deref(), Some("x"));

        db.undirty_props(lobby);
        assert_eq!(db.paging_mode(lobby), PagingMode::Loaded);
    }

    #[test]
    fn priority_fetch_lands_on_its_own_queue() {
        let (file, block_pos, _) = backing_with(&["desc:2:x"]);
        let clock = ManualClock::new(1000);
        let mut db = db_on(&file, block_pos, &clock);
        let lobby = Dbref::mk_id(0);

        db.fetch_props_priority(lobby, true, None);
        assert_eq!(db.paging_mode(lobby), PagingMode::Priority);
        assert_eq!(db.queues().count(PagingMode::Priority), 1);
        assert_eq!(db.queues().count(PagingMode::Loaded), 0);
        assert!(db.queues().is_consistent());
    }

    fn many_loaded(count: usize) -> (Database, ManualClock) {
        let clock = ManualClock::new(1000);
        let mut db = Database::with_clock(DatabaseConfig::default(), Box::new(clock.clone()));
        db.config_mut().min_loaded_floor = usize::MAX;
        for i in 0..count {
            let obj = db.create_object(&format!("thing {i}"), NOTHING, ObjectType::Thing);
            db.fetch_props(obj, "/");
            clock.advance(1);
        }
        db.config_mut().min_loaded_floor = 100;
        (db, clock)
    }

    #[test]
    fn housekeeping_evicts_a_bounded_batch() {
        let (mut db, _clock) = many_loaded(1000);
        assert_eq!(db.queues().count(PagingMode::Loaded), 1000);

        assert_eq!(db.house_clean_props(), 40);
        assert_eq!(db.queues().count(PagingMode::Loaded), 960);
        // Oldest first.
        for i in 0..40 {
            assert_eq!(db.paging_mode(Dbref::mk_id(i)), PagingMode::Unloaded);
        }
        assert_eq!(db.paging_mode(Dbref::mk_id(40)), PagingMode::Loaded);
        assert!(db.queues().is_consistent());
    }

    #[test]
    fn housekeeping_waits_for_the_floor() {
        let (mut db, _clock) = many_loaded(99);
        assert_eq!(db.house_clean_props(), 0);
        assert_eq!(db.queues().count(PagingMode::Loaded), 99);
    }

    #[test]
    fn housekeeping_skips_changed_objects() {
        let (mut db, _clock) = many_loaded(200);
        for i in 0..50 {
            db.set_property(Dbref::mk_id(i), "touched", PropValue::Int(1));
        }
        assert_eq!(db.queues().count(PagingMode::Loaded), 150);
        assert_eq!(db.house_clean_props(), 40);
        for i in 0..50 {
            assert_eq!(db.paging_mode(Dbref::mk_id(i)), PagingMode::Changed);
        }
        assert_eq!(db.paging_mode(Dbref::mk_id(50)), PagingMode::Unloaded);
        assert!(db.queues().is_consistent());
    }

    #[test]
    fn refetch_moves_an_object_to_the_back() {
        let (mut db, _clock) = many_loaded(150);
        db.fetch_props(Dbref::mk_id(0), "/");
        db.house_clean_props();
        assert_eq!(db.paging_mode(Dbref::mk_id(0)), PagingMode::Loaded);
        assert_eq!(db.paging_mode(Dbref::mk_id(1)), PagingMode::Unloaded);
    }

    #[test]
    fn queue_membership_tracks_modes() {
        let (mut db, clock) = many_loaded(120);
        db.fetch_props_priority(Dbref::mk_id(3), true, None);
        db.set_property(Dbref::mk_id(4), "x", PropValue::Int(1));
        db.unload_props_with_prejudice(Dbref::mk_id(5));
        clock.advance(5000);
        db.dispose_all_old_props();

        let mut counts = [0usize; 4];
        for (obj, _) in db.objects() {
            let slot = match db.paging_mode(obj) {
                PagingMode::Unloaded => 0,
                PagingMode::Loaded => 1,
                PagingMode::Priority => 2,
                PagingMode::Changed => 3,
            };
            counts[slot] += 1;
        }
        assert_eq!(counts, [119, 0, 0, 1]);
        assert_eq!(db.queues().count(PagingMode::Changed), 1);
        assert_eq!(db.queues().count(PagingMode::Unloaded), 119);
        assert!(db.queues().is_consistent());
    }

    #[test]
    fn untouch_sweep_wraps_around() {
        let (mut db, _clock) = many_loaded(3);
        for i in 0..3 {
            db.set_property(Dbref::mk_id(i), "a", PropValue::Int(1));
            db.get_int(Dbref::mk_id(i), "a");
        }
        let touched = |db: &Database, i: i32| {
            db.get(Dbref::mk_id(i))
                .unwrap()
                .resident_props()
                .get("a")
                .unwrap()
                .is_touched()
        };
        assert!(touched(&db, 0));
        db.untouch_props_incremental(2);
        assert!(!touched(&db, 0));
        assert!(!touched(&db, 1));
        assert!(touched(&db, 2));
        db.untouch_props_incremental(2);
        assert!(!touched(&db, 2));
    }

    #[test]
    fn cache_report_lists_queue_counts() {
        let (mut db, _clock) = many_loaded(5);
        let report = db.cache_report();
        assert_eq!(report[0], "Cache info:");
        assert!(report.contains(&"PropLoaded count: 5".to_string()));
        assert!(report.contains(&"PropPriority count: 0".to_string()));
        assert!(report.contains(&"PropChanged count: 0".to_string()));
        assert_eq!(report.last().map(String::as_str), Some("Done."));
    }
}
