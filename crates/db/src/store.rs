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

use std::collections::HashMap;
use std::hash::BuildHasherDefault;

use ahash::AHasher;
use muck_common::{AMBIGUOUS, BitEnum, Dbref, GOD, HOME, NIL, NOTHING, ObjFlag, ObjectType};
use muck_props::PropDir;
use strum::IntoEnumIterator;
use tracing::{debug, info};
use unicase::UniCase;

use crate::backing::BackingFile;
use crate::clock::{Clock, SystemClock};
use crate::config::DatabaseConfig;
use crate::diskbase::{FetchStats, PagingMode, PagingQueues};
use crate::error::StoreError;
use crate::object::{Object, TypeData};

/// Where players whose home is destroyed are sent.
pub const PLAYER_START: Dbref = Dbref::mk_id(0);

/// Longest location chain followed before giving up on a loop.
pub(crate) const MAX_PARENT_DEPTH: usize = 88;

type PlayerIndex = HashMap<UniCase<String>, Dbref, BuildHasherDefault<AHasher>>;

/// How an object's properties arrive when it is installed by a loader.
#[derive(Debug)]
pub enum LoadedProps {
    /// Still in the backing file, in the block at this position.
    OnDisk { pos: u64 },
    /// Already read. Nothing on disk holds these, so the object is treated as changed.
    Resident(PropDir),
}

/// The object store: every object slot, the free list, the player name index, and the paging
/// state for every object's properties.
pub struct Database {
    pub(crate) config: DatabaseConfig,
    pub(crate) objects: Vec<Object>,
    /// Head of the free list, threaded through the `next` field of garbage objects.
    pub(crate) recyclable: Dbref,
    pub(crate) players: PlayerIndex,
    pub(crate) queues: PagingQueues,
    pub(crate) stats: FetchStats,
    pub(crate) backing: Option<BackingFile>,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) untouch_cursor: usize,
    /// Set while a dump is being read, when objects later in the file do not exist yet.
    pub(crate) loading: bool,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    pub fn with_clock(config: DatabaseConfig, clock: Box<dyn Clock>) -> Self {
        let objects = Vec::with_capacity(config.initial_capacity);
        Self {
            config,
            objects,
            recyclable: NOTHING,
            players: PlayerIndex::default(),
            queues: PagingQueues::new(),
            stats: FetchStats::new(),
            backing: None,
            clock,
            untouch_cursor: 0,
            loading: false,
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut DatabaseConfig {
        &mut self.config
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Number of object slots, garbage included.
    pub fn db_top(&self) -> usize {
        self.objects.len()
    }

    pub fn capacity(&self) -> usize {
        self.objects.capacity()
    }

    /// Make sure slots up to `new_top` exist. Never shrinks.
    pub fn grow(&mut self, new_top: usize) {
        let len = self.objects.len();
        if new_top <= len {
            return;
        }
        if new_top > self.objects.capacity() {
            let extra = (new_top - len).max(self.config.growth_step);
            self.objects.reserve_exact(extra);
        }
        let now = self.now();
        self.objects.resize_with(new_top, || Object::cleared(now));
        self.queues.grow(new_top);
    }

    pub(crate) fn slot(&self, obj: Dbref) -> Option<usize> {
        obj.index().filter(|idx| *idx < self.objects.len())
    }

    /// True if `obj` names a slot, garbage or not.
    pub fn exists(&self, obj: Dbref) -> bool {
        self.slot(obj).is_some()
    }

    /// True if `obj` names a slot holding a live object.
    pub fn valid(&self, obj: Dbref) -> bool {
        self.get(obj).is_some_and(|o| !o.is_garbage())
    }

    pub fn get(&self, obj: Dbref) -> Option<&Object> {
        self.slot(obj).map(|idx| &self.objects[idx])
    }

    /// Direct access to an object's fields. Property changes go through the property methods,
    /// which keep the paging state right.
    pub fn get_mut(&mut self, obj: Dbref) -> Option<&mut Object> {
        self.slot(obj).map(|idx| &mut self.objects[idx])
    }

    pub fn objects(&self) -> impl Iterator<Item = (Dbref, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(idx, o)| (Dbref::mk_id(idx as i32), o))
    }

    pub fn object_type(&self, obj: Dbref) -> Option<ObjectType> {
        self.get(obj).map(Object::object_type)
    }

    pub fn owner(&self, obj: Dbref) -> Dbref {
        self.get(obj).map(|o| o.owner).unwrap_or(NOTHING)
    }

    pub fn location(&self, obj: Dbref) -> Dbref {
        self.get(obj).map(|o| o.location).unwrap_or(NOTHING)
    }

    pub fn name(&self, obj: Dbref) -> Option<&str> {
        self.get(obj).map(|o| o.name.as_str())
    }

    pub fn has_flag(&self, obj: Dbref, flag: ObjFlag) -> bool {
        self.get(obj).is_some_and(|o| o.flags.contains(flag))
    }

    /// Note that an object differs from the last full dump.
    pub fn mark_changed(&mut self, obj: Dbref) {
        if let Some(o) = self.get_mut(obj) {
            o.flags.set(ObjFlag::ObjectChanged);
        }
    }

    /// Every object after `first` in a contents or exits list.
    pub fn list_iter(&self, first: Dbref) -> ListIter<'_> {
        ListIter {
            db: self,
            cursor: first,
            remaining: self.objects.len(),
        }
    }

    pub fn contents(&self, obj: Dbref) -> Vec<Dbref> {
        match self.get(obj) {
            Some(o) => self.list_iter(o.contents).collect(),
            None => vec![],
        }
    }

    pub fn exits(&self, obj: Dbref) -> Vec<Dbref> {
        match self.get(obj).and_then(Object::exits) {
            Some(head) => self.list_iter(head).collect(),
            None => vec![],
        }
    }

    /// The object an environment search moves to after `obj`.
    pub fn parent_of(&self, obj: Dbref) -> Dbref {
        let parent = self.location(obj);
        if parent == obj { NOTHING } else { parent }
    }

    /// `Name(#N<type><flags>)` for display. Special references get their `*NAME*` forms.
    pub fn unparse_object(&self, obj: Dbref) -> String {
        match obj {
            NOTHING => return "*NOTHING*".to_string(),
            HOME => return "*HOME*".to_string(),
            NIL => return "*NIL*".to_string(),
            AMBIGUOUS => return "*AMBIGUOUS*".to_string(),
            _ => {}
        }
        let Some(o) = self.get(obj) else {
            return "*INVALID*".to_string();
        };
        let mut flags = String::new();
        if let Some(c) = o.object_type().flag_char() {
            flags.push(c);
        }
        for flag in ObjFlag::iter() {
            if o.flags.contains(flag) {
                if let Some(c) = flag.flag_char() {
                    flags.push(c);
                }
            }
        }
        format!("{}(#{}{})", o.name, obj.id(), flags)
    }

    /// Take a slot for a new object: the head of the free list if there is one, otherwise a new
    /// slot at the end. The slot comes back blank, unloaded and marked changed.
    pub fn allocate(&mut self) -> Dbref {
        let reusable = self
            .slot(self.recyclable)
            .filter(|idx| self.objects[*idx].is_garbage());
        let obj = match reusable {
            Some(idx) => {
                let obj = self.recyclable;
                self.recyclable = self.objects[idx].next;
                self.unload_props_with_prejudice(obj);
                obj
            }
            None => {
                let obj = Dbref::mk_id(self.objects.len() as i32);
                self.grow(self.objects.len() + 1);
                obj
            }
        };
        let now = self.now();
        if let Some(o) = self.get_mut(obj) {
            *o = Object::cleared(now);
            o.flags.set(ObjFlag::ObjectChanged);
        }
        obj
    }

    /// Allocate and fill in a new object of type `ty`, owned by `owner`'s owner. Players own
    /// themselves.
    pub fn create_object(&mut self, name: &str, owner: Dbref, ty: ObjectType) -> Dbref {
        let owner = match self.get(owner) {
            Some(o) if o.owner != NOTHING => o.owner,
            _ => owner,
        };
        let obj = self.allocate();
        if let Some(o) = self.get_mut(obj) {
            o.name = name.to_string();
            o.data = TypeData::empty(ty);
            o.owner = if ty == ObjectType::Player { obj } else { owner };
        }
        if ty == ObjectType::Player {
            self.add_player(obj);
        }
        obj
    }

    fn list_head_mut(o: &mut Object, exits: bool) -> Option<&mut Dbref> {
        if !exits {
            return Some(&mut o.contents);
        }
        match &mut o.data {
            TypeData::Room { exits, .. }
            | TypeData::Thing { exits, .. }
            | TypeData::Player { exits, .. } => Some(exits),
            _ => None,
        }
    }

    /// Splice `what` out of the list whose head lives on `owner`.
    fn list_remove(&mut self, owner: Dbref, what: Dbref, exits: bool) {
        let after = self.get(what).map(|o| o.next).unwrap_or(NOTHING);
        let Some(head) = self
            .get(owner)
            .and_then(|o| if exits { o.exits() } else { Some(o.contents) })
        else {
            return;
        };
        if head == what {
            if let Some(slot) = self.get_mut(owner).and_then(|o| Self::list_head_mut(o, exits)) {
                *slot = after;
            }
            return;
        }
        let members: Vec<Dbref> = self.list_iter(head).collect();
        for prev in members {
            if self.get(prev).map(|o| o.next) == Some(what) {
                if let Some(p) = self.get_mut(prev) {
                    p.next = after;
                }
                return;
            }
        }
    }

    /// Move an object into `dest`'s contents, or exits list for an exit. `HOME` sends it to its
    /// home; `NOTHING` just takes it out of wherever it was.
    pub fn move_to(&mut self, what: Dbref, dest: Dbref) {
        let Some(ty) = self.object_type(what) else {
            return;
        };
        let dest = if dest == HOME {
            match self.get(what).and_then(Object::home) {
                Some(home) if self.valid(home) => home,
                _ => PLAYER_START,
            }
        } else {
            dest
        };
        let exits = ty == ObjectType::Exit;
        let old = self.location(what);
        if old != NOTHING {
            self.list_remove(old, what, exits);
        }
        let head = self
            .get_mut(dest)
            .and_then(|o| Self::list_head_mut(o, exits))
            .map(|slot| std::mem::replace(slot, what));
        if let Some(o) = self.get_mut(what) {
            o.next = head.unwrap_or(NOTHING);
            o.location = if head.is_some() { dest } else { NOTHING };
        }
        self.mark_changed(what);
        self.mark_changed(old);
        self.mark_changed(dest);
    }

    /// Destroy an object and put its slot on the free list.
    ///
    /// Exits attached to it are recycled along with it, its contents are sent home, and every
    /// other object's references to it are repointed: owners to GOD, thing homes to their owner,
    /// player homes to the start room, droptos and exit destinations dropped.
    pub fn recycle(&mut self, obj: Dbref) -> Result<(), StoreError> {
        let Some(idx) = self.slot(obj) else {
            return Err(StoreError::InvalidObject(obj));
        };
        if self.objects[idx].is_garbage() {
            return Err(StoreError::AlreadyGarbage(obj));
        }
        if obj == GOD || obj == PLAYER_START {
            return Err(StoreError::Protected(obj));
        }
        debug!(?obj, "recycling");

        for exit in self.exits(obj) {
            let loc = self.location(exit);
            if (loc == obj || loc == NOTHING) && self.valid(exit) {
                self.recycle(exit)?;
            }
        }

        let old_location = self.location(obj);
        if old_location != NOTHING {
            let exits = self.objects[idx].object_type() == ObjectType::Exit;
            self.list_remove(old_location, obj, exits);
            self.mark_changed(old_location);
        }

        let now = self.now();
        for i in 0..self.objects.len() {
            if i == idx {
                continue;
            }
            let thing_owner = self.objects[i].owner;
            let o = &mut self.objects[i];
            let mut touched = false;
            if o.owner == obj {
                o.owner = GOD;
                touched = true;
            }
            match &mut o.data {
                TypeData::Thing { home, .. } if *home == obj => {
                    *home = if thing_owner == obj { GOD } else { thing_owner };
                    touched = true;
                }
                TypeData::Player { home, .. } if *home == obj => {
                    *home = PLAYER_START;
                    touched = true;
                }
                TypeData::Room { dropto, .. } if *dropto == obj => {
                    *dropto = NOTHING;
                    touched = true;
                }
                TypeData::Exit { dests } if dests.contains(&obj) => {
                    dests.retain(|d| *d != obj);
                    touched = true;
                }
                _ => {}
            }
            if touched {
                o.flags.set(ObjFlag::ObjectChanged);
                o.timestamps.modified = now;
            }
        }

        for item in self.contents(obj) {
            let home = self.get(item).and_then(Object::home).unwrap_or(NOTHING);
            let dest = if home != obj && self.valid(home) {
                home
            } else if self.valid(PLAYER_START) {
                PLAYER_START
            } else {
                NOTHING
            };
            self.move_to(item, dest);
        }
        for i in 0..self.objects.len() {
            if i != idx && self.objects[i].location == obj {
                self.objects[i].location = NOTHING;
            }
        }

        if self.objects[idx].object_type() == ObjectType::Player {
            self.delete_player(obj);
        }
        self.unload_props_with_prejudice(obj);

        let mut garbage = Object::cleared(now);
        garbage.name = "<garbage>".to_string();
        garbage.data = TypeData::Garbage;
        garbage.owner = GOD;
        garbage.flags = BitEnum::new_with(ObjFlag::ObjectChanged);
        garbage.next = self.recyclable;
        self.objects[idx] = garbage;
        self.recyclable = obj;
        Ok(())
    }

    /// The free list, head first.
    pub fn free_list(&self) -> Vec<Dbref> {
        let mut out = vec![];
        let mut cursor = self.recyclable;
        while let Some(o) = self.get(cursor) {
            if !o.is_garbage() || out.len() > self.objects.len() {
                break;
            }
            out.push(cursor);
            cursor = o.next;
        }
        out
    }

    /// Thread every garbage object onto the free list in slot order, so the last one found is
    /// the head.
    pub fn rebuild_free_list(&mut self) {
        self.recyclable = NOTHING;
        for idx in 0..self.objects.len() {
            if self.objects[idx].is_garbage() {
                self.objects[idx].next = self.recyclable;
                self.recyclable = Dbref::mk_id(idx as i32);
            }
        }
    }

    /// Put an object read from a dump into its slot, replacing whatever was there.
    pub fn install_object(&mut self, obj: Dbref, mut object: Object, props: LoadedProps) {
        let Some(idx) = obj.index() else {
            return;
        };
        self.grow(idx + 1);
        if self.objects[idx].object_type() == ObjectType::Player {
            self.delete_player(obj);
        }
        self.unload_props_with_prejudice(obj);
        match props {
            LoadedProps::OnDisk { pos } => {
                object.props = PropDir::new();
                object.props_pos = pos;
                object.props_time = 0;
                self.objects[idx] = object;
            }
            LoadedProps::Resident(dir) => {
                object.props = dir;
                object.props_pos = 0;
                object.props_time = self.now();
                self.objects[idx] = object;
                self.queues.requeue(idx, PagingMode::Changed);
            }
        }
        if self.objects[idx].object_type() == ObjectType::Player {
            self.add_player(obj);
        }
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Wrap up after a dump and any deltas have been read.
    pub fn finish_load(&mut self) {
        self.loading = false;
        self.rebuild_free_list();
        self.rebuild_player_index();
        info!(
            objects = self.objects.len(),
            free = self.free_list().len(),
            players = self.players.len(),
            "database loaded"
        );
    }

    pub fn backing_file(&self) -> Option<&BackingFile> {
        self.backing.as_ref()
    }

    pub fn backing_file_mut(&mut self) -> Option<&mut BackingFile> {
        self.backing.as_mut()
    }

    /// Switch to a new backing file. Any on-disk positions recorded so far must refer to it.
    pub fn set_backing_file(&mut self, backing: Option<BackingFile>) {
        self.backing = backing;
    }

    pub fn add_player(&mut self, player: Dbref) {
        if let Some(o) = self.get(player) {
            self.players.insert(UniCase::new(o.name.clone()), player);
        }
    }

    pub fn delete_player(&mut self, player: Dbref) {
        let Some(name) = self.get(player).map(|o| o.name.clone()) else {
            return;
        };
        let key = UniCase::new(name);
        if self.players.get(&key) == Some(&player) {
            self.players.remove(&key);
        }
    }

    pub fn lookup_player(&self, name: &str) -> Dbref {
        self.players
            .get(&UniCase::new(name.to_string()))
            .copied()
            .unwrap_or(NOTHING)
    }

    pub fn rebuild_player_index(&mut self) {
        self.players.clear();
        for idx in 0..self.objects.len() {
            if self.objects[idx].object_type() == ObjectType::Player {
                self.add_player(Dbref::mk_id(idx as i32));
            }
        }
    }

    /// Approximate memory held by an object. With `load`, its properties are read in first so
    /// that stub values count at full size.
    pub fn size_object(&mut self, obj: Dbref, load: bool) -> usize {
        if load {
            self.fetch_props(obj, "/");
            self.fetch_propvals(obj, "/");
        }
        let Some(o) = self.get(obj) else {
            return 0;
        };
        let extra = match &o.data {
            TypeData::Exit { dests } => dests.len() * std::mem::size_of::<Dbref>(),
            TypeData::Player { password, .. } => password.len() + 1,
            _ => 0,
        };
        std::mem::size_of::<Object>() + o.name.len() + 1 + o.props.size_of() + extra
    }
}

pub struct ListIter<'a> {
    db: &'a Database,
    cursor: Dbref,
    /// Bounds the walk in case a list was corrupted into a loop.
    remaining: usize,
}

impl Iterator for ListIter<'_> {
    type Item = Dbref;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.cursor;
        let o = self.db.get(current)?;
        self.cursor = o.next;
        self.remaining -= 1;
        Some(current)
    }
}
