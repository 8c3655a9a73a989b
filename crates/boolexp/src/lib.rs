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
//! Lock expressions: the small boolean language that gates access to objects.
//!
//! A lock is either the "unlocked" sentinel or a tree of `&`, `|`, `!`, object constants and
//! property checks. Parsing never fails outright: malformed input degrades to the sentinel.

pub use eval::{LockEnvironment, NoPrograms, ProgramInvocation, ProgramRunner, evaluate};
pub use legacy::{LegacyLockReader, LockReadError, write_legacy_lock};
pub use matching::{LockNameMatcher, MatchEnvironment};
pub use parse::{parse_lock, parse_lock_for_load};

use muck_common::Dbref;
use std::fmt::{Display, Formatter};

mod eval;
mod legacy;
mod matching;
#[doc(hidden)]
pub mod mock_env;
mod parse;
mod unparse;

pub const AND_TOKEN: char = '&';
pub const OR_TOKEN: char = '|';
pub const NOT_TOKEN: char = '!';
/// How the sentinel lock is displayed, and how an unloaded lock property reads.
pub const UNLOCKED_DISPLAY: &str = "*UNLOCKED*";

/// The value half of a property check leaf.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum PropCheckValue {
    Str(String),
    /// Only produced by the legacy tree format. Never matches during evaluation.
    Int(i64),
}

impl Display for PropCheckValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PropCheckValue::Str(s) => f.write_str(s),
            PropCheckValue::Int(i) => write!(f, "{i}"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct PropCheck {
    pub name: String,
    pub value: PropCheckValue,
}

impl PropCheck {
    pub fn new_str(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: PropCheckValue::Str(value.to_string()),
        }
    }
}

/// A lock expression node. Children are owned exclusively by their parent.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum BoolExpr {
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
    Not(Box<BoolExpr>),
    Const(Dbref),
    Prop(PropCheck),
}

impl BoolExpr {
    pub fn and(left: BoolExpr, right: BoolExpr) -> Self {
        BoolExpr::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: BoolExpr, right: BoolExpr) -> Self {
        BoolExpr::Or(Box::new(left), Box::new(right))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: BoolExpr) -> Self {
        BoolExpr::Not(Box::new(operand))
    }

    /// In-memory footprint used for memory accounting.
    pub fn size_of(&self) -> usize {
        let node = std::mem::size_of::<BoolExpr>();
        match self {
            BoolExpr::And(l, r) | BoolExpr::Or(l, r) => node + l.size_of() + r.size_of(),
            BoolExpr::Not(operand) => node + operand.size_of(),
            BoolExpr::Const(_) => node,
            BoolExpr::Prop(check) => {
                let value = match &check.value {
                    PropCheckValue::Str(s) => s.len() + 1,
                    PropCheckValue::Int(_) => 0,
                };
                node + std::mem::size_of::<PropCheck>() + check.name.len() + 1 + value
            }
        }
    }
}

/// A possibly-empty lock. `None` is the always-true sentinel.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct Lock(Option<BoolExpr>);

impl Lock {
    #[must_use]
    pub fn unlocked() -> Self {
        Lock(None)
    }

    pub fn new(expr: BoolExpr) -> Self {
        Lock(Some(expr))
    }

    pub fn is_unlocked(&self) -> bool {
        self.0.is_none()
    }

    pub fn expr(&self) -> Option<&BoolExpr> {
        self.0.as_ref()
    }

    pub fn into_expr(self) -> Option<BoolExpr> {
        self.0
    }

    /// Wrap in a NOT. The sentinel stays the sentinel.
    #[must_use]
    pub fn negate(self) -> Self {
        match self.0 {
            None => Lock(None),
            Some(expr) => Lock(Some(BoolExpr::not(expr))),
        }
    }

    pub fn size_of(&self) -> usize {
        self.0.as_ref().map_or(0, BoolExpr::size_of)
    }
}

impl From<BoolExpr> for Lock {
    fn from(expr: BoolExpr) -> Self {
        Lock::new(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn negating_the_sentinel_is_a_no_op() {
        assert_eq!(Lock::unlocked().negate(), Lock::unlocked());
        let lock = Lock::new(BoolExpr::Const(Dbref::mk_id(3)));
        assert_eq!(
            lock.negate(),
            Lock::new(BoolExpr::not(BoolExpr::Const(Dbref::mk_id(3))))
        );
    }

    #[test]
    fn sizes_grow_with_payload() {
        assert_eq!(Lock::unlocked().size_of(), 0);
        let small = BoolExpr::Prop(PropCheck::new_str("a", "b"));
        let big = BoolExpr::Prop(PropCheck::new_str("a", "bbbbbbbb"));
        assert_eq!(big.size_of() - small.size_of(), 7);
        let and = BoolExpr::and(small.clone(), BoolExpr::Const(Dbref::mk_id(1)));
        assert_eq!(
            and.size_of(),
            std::mem::size_of::<BoolExpr>() * 2 + small.size_of()
        );
    }
}
