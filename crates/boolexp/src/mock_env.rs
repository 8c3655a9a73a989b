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
//! An in-memory world for exercising lock parsing and evaluation.

use std::collections::HashMap;

use muck_common::{Dbref, NOTHING, ObjectType};

use crate::eval::{LockEnvironment, ProgramInvocation, ProgramRunner};
use crate::matching::MatchEnvironment;

pub const MOCK_ROOM1: Dbref = Dbref::mk_id(1);
pub const MOCK_ROOM2: Dbref = Dbref::mk_id(2);
pub const MOCK_PLAYER: Dbref = Dbref::mk_id(3);
pub const MOCK_THING1: Dbref = Dbref::mk_id(4);
pub const MOCK_THING2: Dbref = Dbref::mk_id(5);
pub const MOCK_THING3: Dbref = Dbref::mk_id(6);
pub const MOCK_PROGRAM: Dbref = Dbref::mk_id(7);
pub const MOCK_WIZARD: Dbref = Dbref::mk_id(8);

#[derive(Debug, Clone)]
pub struct MockObject {
    pub name: String,
    pub otype: ObjectType,
    pub location: Dbref,
    pub owner: Dbref,
    pub wizard: bool,
    pub props: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct MockLockEnv {
    objects: HashMap<Dbref, MockObject>,
    registered: HashMap<String, Dbref>,
    messages: Vec<(Dbref, String)>,
    envcheck: bool,
}

impl MockLockEnv {
    pub fn add_object(
        &mut self,
        obj: Dbref,
        name: &str,
        otype: ObjectType,
        location: Dbref,
        owner: Dbref,
    ) {
        self.objects.insert(
            obj,
            MockObject {
                name: name.to_string(),
                otype,
                location,
                owner,
                wizard: false,
                props: HashMap::new(),
            },
        );
    }

    pub fn add_thing(&mut self, obj: Dbref, name: &str, location: Dbref, owner: Dbref) {
        self.add_object(obj, name, ObjectType::Thing, location, owner);
    }

    pub fn set_prop(&mut self, obj: Dbref, name: &str, value: &str) {
        if let Some(o) = self.objects.get_mut(&obj) {
            o.props.insert(name.to_string(), value.to_string());
        }
    }

    pub fn set_wizard(&mut self, obj: Dbref) {
        if let Some(o) = self.objects.get_mut(&obj) {
            o.wizard = true;
        }
    }

    pub fn register(&mut self, name: &str, obj: Dbref) {
        self.registered.insert(name.to_lowercase(), obj);
    }

    pub fn set_envcheck(&mut self, envcheck: bool) {
        self.envcheck = envcheck;
    }

    pub fn messages(&self) -> Vec<(Dbref, String)> {
        self.messages.clone()
    }

    pub fn program_runner(&self, result: Option<bool>) -> MockProgramRunner {
        MockProgramRunner {
            result,
            invocations: vec![],
        }
    }
}

/// Records invocations and answers each with a fixed result.
#[derive(Debug, Default)]
pub struct MockProgramRunner {
    pub result: Option<bool>,
    pub invocations: Vec<ProgramInvocation>,
}

impl ProgramRunner for MockProgramRunner {
    fn run_lock_program(&mut self, invocation: &ProgramInvocation) -> Option<bool> {
        self.invocations.push(*invocation);
        self.result
    }
}

impl MatchEnvironment for MockLockEnv {
    fn obj_valid(&self, obj: Dbref) -> bool {
        self.objects
            .get(&obj)
            .is_some_and(|o| o.otype != ObjectType::Garbage)
    }

    fn name_of(&self, obj: Dbref) -> Option<String> {
        self.objects.get(&obj).map(|o| o.name.clone())
    }

    fn location_of(&self, obj: Dbref) -> Dbref {
        self.objects.get(&obj).map_or(NOTHING, |o| o.location)
    }

    fn contents_of(&self, obj: Dbref) -> Vec<Dbref> {
        let mut contents: Vec<Dbref> = self
            .objects
            .iter()
            .filter(|(_, o)| o.location == obj)
            .map(|(d, _)| *d)
            .collect();
        contents.sort();
        contents
    }

    fn owner_of(&self, obj: Dbref) -> Dbref {
        self.objects.get(&obj).map_or(NOTHING, |o| o.owner)
    }

    fn is_wizard(&self, obj: Dbref) -> bool {
        self.objects.get(&obj).is_some_and(|o| o.wizard)
    }

    fn lookup_player(&self, name: &str) -> Dbref {
        self.objects
            .iter()
            .find(|(_, o)| o.otype == ObjectType::Player && o.name.eq_ignore_ascii_case(name))
            .map_or(NOTHING, |(d, _)| *d)
    }

    fn find_registered(&mut self, _from: Dbref, name: &str) -> Dbref {
        self.registered
            .get(&name.to_lowercase())
            .copied()
            .unwrap_or(NOTHING)
    }

    fn notify(&mut self, player: Dbref, message: &str) {
        self.messages.push((player, message.to_string()));
    }
}

impl LockEnvironment for MockLockEnv {
    fn object_type(&self, obj: Dbref) -> Option<ObjectType> {
        self.objects.get(&obj).map(|o| o.otype)
    }

    fn owner_of(&self, obj: Dbref) -> Dbref {
        MatchEnvironment::owner_of(self, obj)
    }

    fn location_of(&self, obj: Dbref) -> Dbref {
        MatchEnvironment::location_of(self, obj)
    }

    fn contents_of(&self, obj: Dbref) -> Vec<Dbref> {
        MatchEnvironment::contents_of(self, obj)
    }

    fn string_property(&mut self, obj: Dbref, name: &str) -> Option<String> {
        self.objects.get(&obj)?.props.get(name).cloned()
    }

    fn lock_envcheck(&self) -> bool {
        self.envcheck
    }
}

/// Two rooms; a player carrying a bag (thing1) that holds thing3; thing2 lying in the player's
/// room; a program; and a wizard standing in room2.
pub fn setup_mock_environment() -> MockLockEnv {
    let mut env = MockLockEnv::default();
    env.add_object(MOCK_ROOM1, "room1", ObjectType::Room, NOTHING, MOCK_WIZARD);
    env.add_object(MOCK_ROOM2, "room2", ObjectType::Room, NOTHING, MOCK_WIZARD);
    env.add_object(
        MOCK_PLAYER,
        "porcupine",
        ObjectType::Player,
        MOCK_ROOM1,
        MOCK_PLAYER,
    );
    env.add_thing(MOCK_THING1, "thing1", MOCK_PLAYER, MOCK_PLAYER);
    env.add_thing(MOCK_THING2, "thing2", MOCK_ROOM1, MOCK_PLAYER);
    env.add_thing(MOCK_THING3, "thing3", MOCK_THING1, MOCK_PLAYER);
    env.add_object(
        MOCK_PROGRAM,
        "lockprog.muf",
        ObjectType::Program,
        MOCK_WIZARD,
        MOCK_WIZARD,
    );
    env.add_object(
        MOCK_WIZARD,
        "wizard",
        ObjectType::Player,
        MOCK_ROOM2,
        MOCK_WIZARD,
    );
    env.set_wizard(MOCK_WIZARD);
    env.register("bag", MOCK_THING1);
    env
}
