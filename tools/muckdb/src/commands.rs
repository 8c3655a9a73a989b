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

//! The work behind each subcommand. Everything returns its report as lines so `main` decides
//! where they go.

use muck_boolexp::NoPrograms;
use muck_common::{Dbref, HOME, NIL, NOTHING, ObjectType, PROPDIR_DELIMITER};
use muck_db::{Database, TypeData};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

/// Structural problems found by [`check_database`], one per line.
pub fn check_database(db: &Database) -> Vec<String> {
    let mut problems = vec![];
    for (obj, o) in db.objects() {
        if o.is_garbage() {
            continue;
        }
        let ty = o.object_type();

        if o.location != NOTHING {
            if !db.valid(o.location) {
                problems.push(format!("{obj}: location {} does not exist", o.location));
            } else {
                let list = if ty == ObjectType::Exit {
                    db.exits(o.location)
                } else {
                    db.contents(o.location)
                };
                if !list.contains(&obj) {
                    problems.push(format!(
                        "{obj}: not listed in the {} of its location {}",
                        if ty == ObjectType::Exit { "exits" } else { "contents" },
                        o.location
                    ));
                }
            }
        }

        if o.owner != NOTHING && db.object_type(o.owner) != Some(ObjectType::Player) {
            problems.push(format!("{obj}: owner {} is not a player", o.owner));
        }

        for member in db.contents(obj) {
            if db.location(member) != obj {
                problems.push(format!(
                    "{obj}: contents member {member} thinks it is in {}",
                    db.location(member)
                ));
            }
        }

        let linked: &[Dbref] = match &o.data {
            TypeData::Exit { dests } => dests,
            TypeData::Thing { home, .. } | TypeData::Player { home, .. } => {
                std::slice::from_ref(home)
            }
            TypeData::Room { dropto, .. } if *dropto != NOTHING => std::slice::from_ref(dropto),
            _ => &[],
        };
        for target in linked {
            if *target != HOME && *target != NIL && !db.valid(*target) {
                problems.push(format!("{obj}: links to missing object {target}"));
            }
        }
    }
    problems
}

/// How many objects of each type, the free list and the player index.
pub fn census(db: &Database) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for (_, o) in db.objects() {
        *counts.entry(o.object_type().to_string()).or_default() += 1;
    }
    let mut lines = vec![format!("{} objects", db.db_top())];
    for ty in ObjectType::iter() {
        if let Some(count) = counts.get(&ty.to_string()) {
            lines.push(format!("{ty:>8}: {count}"));
        }
    }
    lines.push(format!("free list: {} slots", db.free_list().len()));
    lines
}

/// Page in every object's properties.
pub fn fetch_everything(db: &mut Database) -> usize {
    let targets: Vec<Dbref> = db
        .objects()
        .filter(|(_, o)| !o.is_garbage())
        .map(|(obj, _)| obj)
        .collect();
    targets
        .into_iter()
        .filter(|obj| db.fetch_props(*obj, "/"))
        .count()
}

/// The lock at `prop` on `object`, shown both ways, and whether `actor` passes it.
pub fn describe_lock(
    db: &mut Database,
    object: Dbref,
    prop: &str,
    actor: Option<Dbref>,
) -> Vec<String> {
    let lock = db.get_lock(object, prop);
    let mut lines = vec![
        format!("{}: {}", db.unparse_object(object), prop),
        format!("  stored:  {}", lock.unparse()),
        format!("  display: {}", lock.unparse_with(&|d| db.unparse_object(d))),
    ];
    if let Some(actor) = actor {
        let passes = db.test_lock(&mut NoPrograms, actor, object, prop);
        lines.push(format!(
            "  {} {}",
            db.unparse_object(actor),
            if passes { "passes" } else { "fails" }
        ));
    }
    lines
}

/// A property listing below `dir`, one `display_property` line per property.
pub fn list_props(db: &mut Database, object: Dbref, dir: &str, recursive: bool) -> Vec<String> {
    let mut lines = vec![];
    let mut start = dir.to_string();
    if !start.is_empty() && !start.ends_with(PROPDIR_DELIMITER) {
        start.push(PROPDIR_DELIMITER);
    }
    list_dir(db, object, &start, recursive, &mut lines);
    lines.push(format!(
        "{} properties, object size {} bytes",
        lines.len(),
        db.size_object(object, true)
    ));
    lines
}

fn list_dir(db: &mut Database, object: Dbref, dir: &str, recursive: bool, out: &mut Vec<String>) {
    let mut cursor = db.next_prop_name(object, dir);
    while let Some(name) = cursor {
        out.push(db.display_property(object, &name));
        if recursive && db.is_propdir(object, &name) {
            list_dir(
                db,
                object,
                &format!("{name}{PROPDIR_DELIMITER}"),
                recursive,
                out,
            );
        }
        cursor = db.next_prop_name(object, &name);
    }
}
