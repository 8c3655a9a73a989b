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
use muck_common::{AMBIGUOUS, Dbref, NOTHING, string_match};

const ME: &str = "me";
const HERE: &str = "here";
const NUMBER_TOKEN: char = '#';
const REGISTERED_TOKEN: char = '$';
const LOOKUP_TOKEN: char = '*';

/// What the lock parser needs to know about the world to turn a name into an object.
pub trait MatchEnvironment {
    /// True if the reference names an existing, non-garbage object.
    fn obj_valid(&self, obj: Dbref) -> bool;
    fn name_of(&self, obj: Dbref) -> Option<String>;
    fn location_of(&self, obj: Dbref) -> Dbref;
    fn contents_of(&self, obj: Dbref) -> Vec<Dbref>;
    fn owner_of(&self, obj: Dbref) -> Dbref;
    fn is_wizard(&self, obj: Dbref) -> bool;
    /// Look a player up by exact name, NOTHING if there is none.
    fn lookup_player(&self, name: &str) -> Dbref;
    /// Resolve a registered name (without its leading `$`) from `from`'s environment.
    fn find_registered(&mut self, from: Dbref, name: &str) -> Dbref;
    fn notify(&mut self, player: Dbref, message: &str);
}

#[derive(Clone, Eq, PartialEq, Debug, Default)]
struct MatchData {
    exact: Vec<Dbref>,
    partial: Vec<Dbref>,
    /// Set by the special matchers (me, here, #N, $name, *name). Later ones win.
    special: Option<Dbref>,
}

/// Resolves a bare object name the way lock keys are resolved: neighbors, possessions, `me`,
/// `here`, absolute `#N`, registered `$name` and player `*name`.
pub struct LockNameMatcher<'a, M: MatchEnvironment> {
    pub env: &'a mut M,
    pub player: Dbref,
}

impl<'a, M: MatchEnvironment> LockNameMatcher<'a, M> {
    pub fn new(env: &'a mut M, player: Dbref) -> Self {
        Self { env, player }
    }

    /// Returns the matched object, NOTHING if nothing matched or AMBIGUOUS.
    pub fn match_name(&mut self, name: &str) -> Dbref {
        let mut md = MatchData::default();

        let location = self.env.location_of(self.player);
        if location != NOTHING {
            self.match_contents(location, name, &mut md);
        }
        self.match_contents(self.player, name, &mut md);

        if name.eq_ignore_ascii_case(ME) {
            md.special = Some(self.player);
        }
        if name.eq_ignore_ascii_case(HERE) && location != NOTHING {
            md.special = Some(location);
        }
        if let Some(absolute) = self.absolute_name(name) {
            md.special = Some(absolute);
        }
        if let Some(registered) = name.strip_prefix(REGISTERED_TOKEN)
            && !registered.is_empty()
        {
            let found = self.env.find_registered(self.player, registered);
            if found != NOTHING {
                md.special = Some(found);
            }
        }
        if let Some(player_name) = name.strip_prefix(LOOKUP_TOKEN) {
            let found = self.env.lookup_player(player_name);
            if found != NOTHING {
                md.special = Some(found);
            }
        }

        match_result(&md)
    }

    fn match_contents(&self, container: Dbref, name: &str, md: &mut MatchData) {
        for oid in self.env.contents_of(container) {
            if !self.env.obj_valid(oid) {
                continue;
            }
            let Some(object_name) = self.env.name_of(oid) else {
                continue;
            };
            if object_name.eq_ignore_ascii_case(name) {
                if !md.exact.contains(&oid) {
                    md.exact.push(oid);
                }
            } else if string_match(&object_name, name) && !md.partial.contains(&oid) {
                md.partial.push(oid);
            }
        }
    }

    /// `#N` naming an existing object.
    fn absolute_name(&self, name: &str) -> Option<Dbref> {
        let digits = name.strip_prefix(NUMBER_TOKEN)?;
        if digits.starts_with(char::is_whitespace) {
            return None;
        }
        let end = digits
            .char_indices()
            .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
            .map_or(digits.len(), |(i, _)| i);
        let id = digits[..end].parse::<i32>().ok()?;
        let obj = Dbref::mk_id(id);
        self.env.obj_valid(obj).then_some(obj)
    }
}

fn match_result(md: &MatchData) -> Dbref {
    if let Some(special) = md.special {
        return special;
    }
    match (md.exact.as_slice(), md.partial.as_slice()) {
        ([one], _) => *one,
        ([_, _, ..], _) => AMBIGUOUS,
        ([], []) => NOTHING,
        ([], [one]) => *one,
        ([], _) => AMBIGUOUS,
    }
}
