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
use muck_common::{Dbref, NOTHING, ObjectType};

use crate::{BoolExpr, Lock, PropCheckValue};

/// Bound on environment-chain walks, in case a location loop slipped into the database.
const MAX_PARENT_DEPTH: usize = 88;

/// What lock evaluation needs to read from the world.
pub trait LockEnvironment {
    /// The object's type, or None if the reference does not name a valid object.
    fn object_type(&self, obj: Dbref) -> Option<ObjectType>;
    fn owner_of(&self, obj: Dbref) -> Dbref;
    fn location_of(&self, obj: Dbref) -> Dbref;
    fn contents_of(&self, obj: Dbref) -> Vec<Dbref>;
    /// The value of a string property on `obj`, fetching it from disk if needed. None when the
    /// property is unset or holds some other type.
    fn string_property(&mut self, obj: Dbref, name: &str) -> Option<String>;
    /// Whether property checks on the actor also look up the actor's environment chain.
    fn lock_envcheck(&self) -> bool;
}

/// A request to run a program as part of a lock check.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ProgramInvocation {
    pub program: Dbref,
    /// Whose permissions the program runs with.
    pub run_as: Dbref,
    pub location: Dbref,
    /// The locked object.
    pub trigger: Dbref,
    /// The actor trying to pass the lock.
    pub supplicant: Dbref,
}

/// Runs programs referenced from locks.
pub trait ProgramRunner {
    /// Run to completion. `None` if no execution frame could be created, otherwise whether the
    /// program left a true result.
    fn run_lock_program(&mut self, invocation: &ProgramInvocation) -> Option<bool>;
}

/// A runner for contexts with no interpreter. Program keys never pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrograms;

impl ProgramRunner for NoPrograms {
    fn run_lock_program(&mut self, _invocation: &ProgramInvocation) -> Option<bool> {
        None
    }
}

/// Evaluate `lock` for `actor` trying to use `subject`.
///
/// The lock is copied before evaluation starts, so a program key that rewrites the lock on the
/// subject cannot disturb the walk in progress.
pub fn evaluate<E: LockEnvironment>(
    env: &mut E,
    runner: &mut dyn ProgramRunner,
    actor: Dbref,
    lock: &Lock,
    subject: Dbref,
) -> bool {
    let lock = lock.clone();
    match lock.expr() {
        None => true,
        Some(expr) => eval_expr(env, runner, actor, expr, subject),
    }
}

fn eval_expr<E: LockEnvironment>(
    env: &mut E,
    runner: &mut dyn ProgramRunner,
    actor: Dbref,
    expr: &BoolExpr,
    subject: Dbref,
) -> bool {
    match expr {
        BoolExpr::And(left, right) => {
            eval_expr(env, runner, actor, left, subject)
                && eval_expr(env, runner, actor, right, subject)
        }
        BoolExpr::Or(left, right) => {
            eval_expr(env, runner, actor, left, subject)
                || eval_expr(env, runner, actor, right, subject)
        }
        BoolExpr::Not(operand) => !eval_expr(env, runner, actor, operand, subject),
        BoolExpr::Const(thing) => eval_const(env, runner, actor, *thing, subject),
        BoolExpr::Prop(check) => {
            let PropCheckValue::Str(value) = &check.value else {
                return false;
            };
            if env.object_type(subject).is_some()
                && has_property_strict(env, subject, &check.name, value)
            {
                return true;
            }
            has_property(env, actor, &check.name, value)
        }
    }
}

fn eval_const<E: LockEnvironment>(
    env: &mut E,
    runner: &mut dyn ProgramRunner,
    actor: Dbref,
    thing: Dbref,
    subject: Dbref,
) -> bool {
    if thing == NOTHING {
        return false;
    }
    if env.object_type(thing) == Some(ObjectType::Program) {
        let run_as = match env.object_type(actor) {
            Some(ObjectType::Player | ObjectType::Thing) => actor,
            _ => env.owner_of(actor),
        };
        let invocation = ProgramInvocation {
            program: thing,
            run_as,
            location: env.location_of(actor),
            trigger: subject,
            supplicant: actor,
        };
        return runner.run_lock_program(&invocation).unwrap_or(false);
    }
    thing == actor
        || thing == env.owner_of(actor)
        || is_member(env, thing, actor)
        || thing == env.location_of(actor)
}

/// Is `thing` somewhere inside `container`, at any depth?
fn is_member<E: LockEnvironment>(env: &E, thing: Dbref, container: Dbref) -> bool {
    env.contents_of(container)
        .into_iter()
        .any(|item| item == thing || is_member(env, thing, item))
}

fn has_property_strict<E: LockEnvironment>(env: &mut E, obj: Dbref, name: &str, value: &str) -> bool {
    env.string_property(obj, name)
        .is_some_and(|stored| stored.eq_ignore_ascii_case(value))
}

/// The object, anything it carries (recursively), and optionally its environment.
fn has_property<E: LockEnvironment>(env: &mut E, obj: Dbref, name: &str, value: &str) -> bool {
    if has_property_strict(env, obj, name, value) {
        return true;
    }
    for item in env.contents_of(obj) {
        if has_property(env, item, name, value) {
            return true;
        }
    }
    if env.lock_envcheck() {
        let mut parent = env.location_of(obj);
        for _ in 0..MAX_PARENT_DEPTH {
            if parent == NOTHING {
                break;
            }
            if has_property_strict(env, parent, name, value) {
                return true;
            }
            parent = env.location_of(parent);
        }
    }
    false
}
