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

//! Paging of object property sets between memory and the backing file.
//!
//! Every object is in one [`PagingMode`]. Resident objects also sit on the queue for their mode,
//! oldest first, and the housekeeping sweep unloads the oldest clean ones. Independently, single
//! string and lock values may stay on disk as stubs until [`Database::propfetch`] reads them.

use std::io::Write;

use muck_common::{Dbref, ObjFlag};
use muck_props::{
    PropBlockLine, PropDir, PropFlag, PropFlags, PropType, PropValue, parse_block_line,
};
use tracing::{debug, error, warn};

use crate::backing::{BackingFile, BackingFileError};
use crate::store::Database;

mod queue;
mod stats;

pub use queue::{PagingMode, PagingQueues, QueueIter};
pub use stats::{FetchStats, FetchWindow, age_histogram};

/// Where a property set landed in a freshly written dump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpedProps {
    /// Position of the block, just past its leading `*`.
    pub pos: u64,
    /// String and lock values written, with the position of each one's line.
    pub values: Vec<(String, u64)>,
}

/// A decoded property line waiting to be put into a tree.
struct DecodedProp {
    name: String,
    value: PropValue,
    flags: PropFlags,
}

/// Stub values found under a directory: full path, type and line position.
fn collect_stubs(dir: &PropDir, prefix: &str, out: &mut Vec<(String, PropType, u64)>) {
    for node in dir {
        let path = format!("{prefix}/{}", node.name());
        if let PropValue::Stub { ty, pos } = node.value() {
            out.push((path.clone(), *ty, *pos));
        }
        collect_stubs(node.propdir(), &path, out);
    }
}

/// Directories under `dir` whose contents have not been read, as paths without a leading
/// delimiter. Nothing below an unread directory is listed.
fn collect_unloaded_dirs(dir: &PropDir, prefix: &str, out: &mut Vec<String>) {
    for node in dir {
        let path = if prefix.is_empty() {
            node.name().to_string()
        } else {
            format!("{prefix}/{}", node.name())
        };
        if node.is_dir_unloaded() {
            out.push(path);
        } else {
            collect_unloaded_dirs(node.propdir(), &path, out);
        }
    }
}

fn empty_value(ty: PropType) -> PropValue {
    match ty {
        PropType::Str => PropValue::Str(String::new()),
        PropType::Lock => PropValue::Lock(muck_boolexp::Lock::unlocked()),
        PropType::Int => PropValue::Int(0),
        PropType::Float => PropValue::Float(0.0),
        PropType::Ref => PropValue::Ref(muck_common::NOTHING),
        PropType::Dir => PropValue::Dir,
    }
}

impl Database {
    pub fn paging_mode(&self, obj: Dbref) -> PagingMode {
        match self.slot(obj) {
            Some(idx) => self.queues.mode(idx),
            None => PagingMode::Unloaded,
        }
    }

    pub fn queues(&self) -> &PagingQueues {
        &self.queues
    }

    pub fn fetch_stats(&self) -> &FetchStats {
        &self.stats
    }

    /// Ensure `obj`'s properties are resident, counting as a use.
    pub fn fetch_props(&mut self, obj: Dbref, dir: &str) -> bool {
        self.fetch_props_priority(obj, false, Some(dir))
    }

    /// Make `obj`'s properties resident ahead of a change to them. Returns false if they are
    /// still not resident afterwards; the tree must then be left alone, since the next dump would
    /// copy the old block over any change made to it.
    pub(crate) fn fetch_props_for_write(&mut self, obj: Dbref, dir: &str) -> bool {
        self.fetch_props(obj, dir);
        if self.paging_mode(obj) == PagingMode::Unloaded {
            warn!(?obj, dir, "properties could not be read; change refused");
            return false;
        }
        true
    }

    /// Ensure `obj`'s properties are resident. Returns true if anything had to be read.
    ///
    /// A resident object is requeued as the newest of its queue, and any directory along `dir`
    /// still marked unread is read in. An unloaded one is read from its block in the backing
    /// file and queued as loaded, or as priority if asked. Priority fetches do not count towards
    /// the fetch rate statistics.
    pub fn fetch_props_priority(&mut self, obj: Dbref, priority: bool, dir: Option<&str>) -> bool {
        let Some(idx) = self.slot(obj) else {
            return false;
        };
        let now = self.now();
        self.objects[idx].props_time = now;

        let mode = self.queues.mode(idx);
        if mode != PagingMode::Unloaded {
            self.queues.requeue(idx, mode);
            let dir = dir.unwrap_or("/");
            let mut fetched = false;
            while let Some(sub) = self.objects[idx].props.propdir_unloaded(dir) {
                self.stats.miss();
                if !priority {
                    self.stats.record_fetch(now);
                }
                fetched = true;
                if let Err(e) = self.load_props_block(idx, Some(&sub)) {
                    error!(?obj, dir = sub, error = %e, "could not read property directory");
                }
            }
            if !fetched {
                self.stats.hit();
            }
            return fetched;
        }

        self.stats.miss();
        self.house_clean_props();

        if let Err(e) = self.load_props_block(idx, None) {
            error!(?obj, pos = self.objects[idx].props_pos, error = %e, "could not read properties");
            return false;
        }
        if !priority {
            self.stats.record_fetch(now);
        }
        let mode = if priority {
            PagingMode::Priority
        } else {
            PagingMode::Loaded
        };
        self.queues.requeue(idx, mode);
        true
    }

    /// Read the block for slot `idx` into its tree. With `prefix`, only lines inside that
    /// directory are taken.
    fn load_props_block(&mut self, idx: usize, prefix: Option<&str>) -> Result<(), BackingFileError> {
        let pos = self.objects[idx].props_pos;
        if pos == 0 {
            return Ok(());
        }
        let Some(backing) = self.backing.as_mut() else {
            return Err(BackingFileError::NotAPropsBlock(pos, "no backing file".to_string()));
        };
        let lines = backing.read_props_block(pos)?;

        let obj = Dbref::mk_id(idx as i32);
        let stub_values = self.config.diskbase_propvals;
        let mut decoded = Vec::with_capacity(lines.len());
        for line in &lines {
            let raw = match parse_block_line(&line.text) {
                Ok(PropBlockLine::Prop(raw)) => raw,
                Ok(_) => continue,
                Err(e) => {
                    warn!(?obj, pos = line.pos, line = line.text, error = %e, "skipping corrupt property line");
                    continue;
                }
            };
            if let Some(prefix) = prefix {
                let name = raw.name.trim_start_matches('/');
                let inside = name
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'));
                if !inside {
                    continue;
                }
            }
            let ty = match raw.prop_type() {
                Ok(ty) => ty,
                Err(e) => {
                    warn!(?obj, pos = line.pos, line = line.text, error = %e, "skipping corrupt property line");
                    continue;
                }
            };
            let value = if stub_values && ty.is_pageable() {
                PropValue::Stub { ty, pos: line.pos }
            } else {
                match raw.decode_value(|d| self.lock_ref_ok(d)) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(?obj, pos = line.pos, line = line.text, error = %e, "skipping corrupt property line");
                        continue;
                    }
                }
            };
            decoded.push(DecodedProp {
                name: raw.name.to_string(),
                value,
                flags: raw.flags(),
            });
        }

        let props = &mut self.objects[idx].props;
        for prop in decoded {
            if let Some(node) = props.new_elem(&prop.name) {
                node.assign(prop.value, prop.flags);
            }
        }
        Ok(())
    }

    /// Whether a lock key may refer to `d`. While a dump is still being read, later objects do
    /// not exist yet, so only the range is checked.
    pub(crate) fn lock_ref_ok(&self, d: Dbref) -> bool {
        if self.loading {
            d.index().is_some()
        } else {
            self.valid(d)
        }
    }

    /// Mark `obj`'s properties as having unwritten changes.
    pub fn dirty_props(&mut self, obj: Dbref) {
        let Some(idx) = self.slot(obj) else {
            return;
        };
        match self.queues.mode(idx) {
            PagingMode::Changed => {}
            PagingMode::Unloaded => {
                self.fetch_props(obj, "/");
                if self.queues.mode(idx) != PagingMode::Unloaded {
                    self.queues.requeue(idx, PagingMode::Changed);
                }
            }
            _ => self.queues.requeue(idx, PagingMode::Changed),
        }
    }

    /// The changes are on disk. Moves a changed object back to the loaded queue, then unloads it
    /// if it has not been used lately.
    pub fn undirty_props(&mut self, obj: Dbref) {
        let Some(idx) = self.slot(obj) else {
            return;
        };
        match self.queues.mode(idx) {
            PagingMode::Unloaded => return,
            PagingMode::Changed => self.queues.requeue(idx, PagingMode::Loaded),
            _ => {}
        }
        self.dispose_props(obj);
    }

    /// Unload `obj`'s properties if they are clean and have not been fetched for a while.
    pub fn dispose_props(&mut self, obj: Dbref) -> bool {
        let Some(o) = self.get(obj) else {
            return false;
        };
        if self.now() - o.props_time < self.config.clean_interval {
            return false;
        }
        self.dispose_props_notime(obj)
    }

    /// Unload `obj`'s properties if they are resident and clean.
    pub fn dispose_props_notime(&mut self, obj: Dbref) -> bool {
        match self.paging_mode(obj) {
            PagingMode::Unloaded | PagingMode::Changed => false,
            PagingMode::Loaded | PagingMode::Priority => {
                self.unload_props_with_prejudice(obj);
                true
            }
        }
    }

    /// Drop `obj`'s resident properties whatever their state. Unwritten changes are lost.
    pub fn unload_props_with_prejudice(&mut self, obj: Dbref) {
        let Some(idx) = self.slot(obj) else {
            return;
        };
        self.objects[idx].props = PropDir::new();
        self.objects[idx].props_time = 0;
        self.queues.remove(idx);
    }

    /// Unload a bounded batch of the oldest loaded objects, once the loaded queue has grown past
    /// both the absolute floor and the configured share of the database.
    pub fn house_clean_props(&mut self) -> usize {
        let loaded = self.queues.count(PagingMode::Loaded);
        let share = self.config.max_loaded_objs * self.objects.len() / 100;
        if loaded < self.config.min_loaded_floor || loaded < share {
            return 0;
        }
        let mut limit = self.config.housekeeping_batch;
        let mut examined = self.objects.len();
        let mut disposed = 0;
        let mut cursor = self.queues.oldest(PagingMode::Loaded);
        while limit > 0 && examined > 0 {
            let Some(idx) = cursor else {
                break;
            };
            examined -= 1;
            cursor = self.queues.next_in(PagingMode::Loaded, idx);
            if self.dispose_props_notime(Dbref::mk_id(idx as i32)) {
                limit -= 1;
                disposed += 1;
            }
        }
        debug!(loaded, disposed, "property housekeeping");
        disposed
    }

    /// Unload every clean object whose properties have not been fetched within the clean
    /// interval.
    pub fn dispose_all_old_props(&mut self) -> usize {
        let now = self.now();
        let mut disposed = 0;
        for idx in 0..self.objects.len() {
            if now - self.objects[idx].props_time >= self.config.clean_interval
                && self.dispose_props_notime(Dbref::mk_id(idx as i32))
            {
                disposed += 1;
            }
        }
        debug!(disposed, "disposed of old properties");
        disposed
    }

    /// Mark the property at `path` as used and read its value in if it is still a stub. The
    /// object's properties must already be resident. Returns true if a value was read.
    ///
    /// A stub line that cannot be read back leaves the property with the empty value of its
    /// type.
    pub fn propfetch(&mut self, obj: Dbref, path: &str) -> bool {
        self.propfetch_inner(obj, path, true)
    }

    fn propfetch_inner(&mut self, obj: Dbref, path: &str, touch: bool) -> bool {
        let Some(idx) = self.slot(obj) else {
            return false;
        };
        let Some(node) = self.objects[idx].props.get_mut(path) else {
            return false;
        };
        if touch {
            node.touch();
        }
        let PropValue::Stub { ty, pos } = *node.value() else {
            return false;
        };
        self.stats.stub_load();
        let value = match self.read_stub(obj, ty, pos) {
            Ok(value) => value,
            Err(reason) => {
                warn!(?obj, path, pos, reason, "could not read property value");
                empty_value(ty)
            }
        };
        if let Some(node) = self.objects[idx].props.get_mut(path) {
            node.set_value(value);
        }
        true
    }

    fn read_stub(&mut self, obj: Dbref, ty: PropType, pos: u64) -> Result<PropValue, String> {
        let Some(backing) = self.backing.as_mut() else {
            return Err("no backing file".to_string());
        };
        let line = backing.read_line_at(pos).map_err(|e| e.to_string())?;
        let raw = match parse_block_line(&line) {
            Ok(PropBlockLine::Prop(raw)) => raw,
            Ok(_) => return Err(format!("not a property line: {line:?}")),
            Err(e) => return Err(e.to_string()),
        };
        match raw.prop_type() {
            Ok(found) if found == ty => {}
            Ok(found) => return Err(format!("expected {ty} value, found {found} in {line:?}")),
            Err(e) => return Err(e.to_string()),
        }
        let value = raw
            .decode_value(|d| self.lock_ref_ok(d))
            .map_err(|e| e.to_string())?;
        debug!(?obj, pos, "read property value");
        Ok(value)
    }

    /// Read in every stub value under `dir`, marking each as used.
    pub fn fetch_propvals(&mut self, obj: Dbref, dir: &str) {
        self.load_stubs(obj, dir, true);
    }

    /// Read in every unread directory and every stub value under `dir`. Without `touch`, the
    /// used markers are left alone.
    pub(crate) fn load_stubs(&mut self, obj: Dbref, dir: &str, touch: bool) {
        let Some(idx) = self.slot(obj) else {
            return;
        };
        let prefix = dir.trim_end_matches('/');
        loop {
            let props = &self.objects[idx].props;
            let start = if prefix.is_empty() {
                Some(props)
            } else {
                props.get(prefix).map(|n| n.propdir())
            };
            let mut pending = vec![];
            if let Some(start) = start {
                collect_unloaded_dirs(start, prefix.trim_start_matches('/'), &mut pending);
            }
            if pending.is_empty() {
                break;
            }
            for sub in pending {
                if let Some(node) = self.objects[idx].props.get_mut(&sub) {
                    node.clear_flags(PropFlags::new_with(PropFlag::DirUnloaded));
                }
                self.stats.miss();
                if let Err(e) = self.load_props_block(idx, Some(&sub)) {
                    error!(?obj, dir = sub, error = %e, "could not read property directory");
                }
            }
        }

        let props = &self.objects[idx].props;
        let start = if prefix.is_empty() {
            Some(props)
        } else {
            props.get(prefix).map(|n| n.propdir())
        };
        let mut stubs = vec![];
        if let Some(start) = start {
            let base = if prefix.starts_with('/') || prefix.is_empty() {
                prefix.to_string()
            } else {
                format!("/{prefix}")
            };
            collect_stubs(start, &base, &mut stubs);
        }
        for (path, _, _) in stubs {
            self.propfetch_inner(obj, &path, touch);
        }
    }

    /// Clear the used markers on the properties of up to `limit` objects, carrying on from where
    /// the last call stopped and starting over after the last object.
    pub fn untouch_props_incremental(&mut self, limit: usize) {
        let mut limit = limit;
        while self.untouch_cursor < self.objects.len() {
            let idx = self.untouch_cursor;
            if self.queues.mode(idx) != PagingMode::Unloaded {
                self.objects[idx].props.untouch_all();
            }
            self.untouch_cursor += 1;
            limit = limit.saturating_sub(1);
            if limit == 0 {
                return;
            }
        }
        self.untouch_cursor = 0;
    }

    /// The operator's view of the cache: hit ratio, fetch rates, queue sizes and an age graph of
    /// the loaded queue.
    pub fn cache_report(&mut self) -> Vec<String> {
        let now = self.now();
        let mut lines = vec!["Cache info:".to_string()];
        lines.extend(self.stats.report(now));
        for mode in [PagingMode::Loaded, PagingMode::Priority, PagingMode::Changed] {
            lines.push(format!("Prop{mode} count: {}", self.queues.count(mode)));
        }
        lines.push("LRU proploaded cache time distribution graph.".to_string());
        let times: Vec<i64> = self
            .queues
            .iter(PagingMode::Loaded)
            .map(|idx| self.objects[idx].props_time)
            .collect();
        lines.extend(age_histogram(now, times.into_iter()));
        lines.push("Done.".to_string());
        lines
    }

    /// Prepare `obj`'s properties to be written out. Returns None if nothing is resident, in
    /// which case the block should be copied from the backing file. Stubs are read in without
    /// marking them used, so values nobody asked for can go back to being stubs afterwards.
    pub fn props_for_dump(&mut self, obj: Dbref) -> Option<&PropDir> {
        if self.paging_mode(obj) == PagingMode::Unloaded {
            return None;
        }
        self.load_stubs(obj, "/", false);
        self.get(obj).map(|o| &o.props)
    }

    /// Copy the on-disk block of an unloaded object, without its markers. Returns false if the
    /// object has no block.
    pub fn copy_unloaded_props(
        &mut self,
        obj: Dbref,
        out: &mut dyn Write,
    ) -> Result<bool, BackingFileError> {
        let pos = self.get(obj).map(|o| o.props_pos).unwrap_or(0);
        if pos == 0 {
            return Ok(false);
        }
        match self.backing.as_mut() {
            Some(backing) => {
                backing.copy_props_block(pos, out)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Switch over to a dump that was just written. Each object's block position is updated,
    /// values that nobody used since the last sweep go back to being stubs pointing into the new
    /// file, and everything written counts as clean.
    pub fn install_dump(&mut self, backing: BackingFile, layout: Vec<(Dbref, DumpedProps)>) {
        let stub_values = self.config.diskbase_propvals;
        for (obj, dumped) in layout {
            let Some(idx) = self.slot(obj) else {
                continue;
            };
            self.objects[idx].props_pos = dumped.pos;
            if stub_values && self.queues.mode(idx) != PagingMode::Unloaded {
                let props = &mut self.objects[idx].props;
                for (path, pos) in dumped.values {
                    if let Some(node) = props.get_mut(&path) {
                        let ty = node.prop_type();
                        if ty.is_pageable() && !node.value().is_stub() && !node.is_touched() {
                            node.set_value(PropValue::Stub { ty, pos });
                        }
                    }
                }
            }
            self.undirty_props(obj);
            self.objects[idx].flags.clear(ObjFlag::ObjectChanged);
        }
        self.backing = Some(backing);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use muck_common::ObjectType;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::config::DatabaseConfig;
    use crate::object::{Object, TypeData};
    use crate::store::LoadedProps;

    #[test]
    fn value_fetch_reads_unread_directories_below() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"#0\n*Props*\na:3:5\na/x:2:one\na/b/y:3:7\ntop:3:1\n*End*\n")
            .unwrap();
        file.flush().unwrap();
        let mut db = Database::new(DatabaseConfig::default());
        let room = Dbref::mk_id(0);
        let mut object = Object::cleared(0);
        object.data = TypeData::empty(ObjectType::Room);
        db.install_object(room, object, LoadedProps::OnDisk { pos: 4 });
        db.set_backing_file(Some(BackingFile::open(file.path()).unwrap()));
        assert!(db.fetch_props(room, "/"));

        // Only the value of `a` is left, as if its directory had not been read yet.
        let props = &mut db.objects[0].props;
        props.delete_elem("a/x");
        props.delete_elem("a/b");
        props
            .get_mut("a")
            .unwrap()
            .set_flags(PropFlags::new_with(PropFlag::DirUnloaded));
        assert!(!props.is_propdir("a"));

        db.fetch_propvals(room, "/");
        let props = db.get(room).unwrap().resident_props();
        let a = props.get("a").unwrap();
        assert!(!a.is_dir_unloaded());
        assert_eq!(a.value(), &PropValue::Int(5));
        assert_eq!(props.get("a/x").unwrap().value(), &PropValue::Str("one".into()));
        assert_eq!(props.get("a/b/y").unwrap().value(), &PropValue::Int(7));
        assert_eq!(props.get("top").unwrap().value(), &PropValue::Int(1));
    }
}
