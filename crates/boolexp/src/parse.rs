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
//! Recursive descent lock parser.
//!
//! ```text
//! Expr   := Term ('|' Expr)?
//! Term   := Factor ('&' Term)?
//! Factor := '(' Expr ')' | '!' Factor | Leaf
//! ```

use muck_common::propname::{is_hidden, is_system};
use muck_common::{AMBIGUOUS, Dbref, NOTHING, PROP_DELIMITER, is_number};
use tracing::warn;

use crate::matching::{LockNameMatcher, MatchEnvironment};
use crate::{AND_TOKEN, BoolExpr, Lock, NOT_TOKEN, OR_TOKEN, PropCheck, PropCheckValue};

const HIDDEN_PROP_DENIED: &str = "Permission denied. (You cannot use a hidden property in a lock.)";

/// Why a parse produced no tree. Any failure anywhere makes the whole lock unlocked.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum ParseOutcome {
    AlwaysTrue,
}

type Parsed = Result<BoolExpr, ParseOutcome>;

/// Turns leaf text into a node. Interactive parsing matches names; load parsing only accepts
/// `#N`.
trait LeafResolver {
    fn allow_prop_check(&mut self, leaf: &str) -> bool;
    fn resolve_object(&mut self, leaf: &str) -> Parsed;
}

struct InteractiveResolver<'a, M: MatchEnvironment> {
    matcher: LockNameMatcher<'a, M>,
}

impl<M: MatchEnvironment> LeafResolver for InteractiveResolver<'_, M> {
    fn allow_prop_check(&mut self, leaf: &str) -> bool {
        let player = self.matcher.player;
        let env = &mut self.matcher.env;
        let wizard_owner = env.is_wizard(env.owner_of(player));
        if is_system(leaf) || (!wizard_owner && is_hidden(leaf)) {
            env.notify(player, HIDDEN_PROP_DENIED);
            return false;
        }
        true
    }

    fn resolve_object(&mut self, leaf: &str) -> Parsed {
        let player = self.matcher.player;
        match self.matcher.match_name(leaf) {
            NOTHING => {
                self.matcher
                    .env
                    .notify(player, &format!("I don't see {leaf} here."));
                Err(ParseOutcome::AlwaysTrue)
            }
            AMBIGUOUS => {
                self.matcher
                    .env
                    .notify(player, &format!("I don't know which {leaf} you mean!"));
                Err(ParseOutcome::AlwaysTrue)
            }
            thing => Ok(BoolExpr::Const(thing)),
        }
    }
}

struct LoadResolver<F: Fn(Dbref) -> bool> {
    is_valid_ref: F,
}

impl<F: Fn(Dbref) -> bool> LeafResolver for LoadResolver<F> {
    fn allow_prop_check(&mut self, leaf: &str) -> bool {
        if is_system(leaf) {
            warn!(leaf, "system property check dropped from stored lock");
            return false;
        }
        true
    }

    fn resolve_object(&mut self, leaf: &str) -> Parsed {
        let Some(number) = leaf.strip_prefix('#') else {
            return Err(ParseOutcome::AlwaysTrue);
        };
        if !is_number(number) {
            return Err(ParseOutcome::AlwaysTrue);
        }
        let id = number
            .parse::<i32>()
            .map_err(|_| ParseOutcome::AlwaysTrue)?;
        let thing = Dbref::mk_id(id);
        if !(self.is_valid_ref)(thing) {
            return Err(ParseOutcome::AlwaysTrue);
        }
        Ok(BoolExpr::Const(thing))
    }
}

struct Parser<'t, R: LeafResolver> {
    text: &'t str,
    pos: usize,
    resolver: R,
}

impl<'t, R: LeafResolver> Parser<'t, R> {
    fn new(text: &'t str, resolver: R) -> Self {
        Self {
            text,
            pos: 0,
            resolver,
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn parse_expr(&mut self) -> Parsed {
        let term = self.parse_term()?;
        self.skip_whitespace();
        if self.peek() != Some(OR_TOKEN) {
            return Ok(term);
        }
        self.advance();
        let rest = self.parse_expr()?;
        Ok(BoolExpr::or(term, rest))
    }

    fn parse_term(&mut self) -> Parsed {
        let factor = self.parse_factor()?;
        self.skip_whitespace();
        if self.peek() != Some(AND_TOKEN) {
            return Ok(factor);
        }
        self.advance();
        let rest = self.parse_term()?;
        Ok(BoolExpr::and(factor, rest))
    }

    fn parse_factor(&mut self) -> Parsed {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => {
                self.advance();
                let inner = self.parse_expr();
                self.skip_whitespace();
                let closed = self.peek() == Some(')');
                self.advance();
                match inner {
                    Ok(expr) if closed => Ok(expr),
                    _ => Err(ParseOutcome::AlwaysTrue),
                }
            }
            Some(NOT_TOKEN) => {
                self.advance();
                let operand = self.parse_factor()?;
                Ok(BoolExpr::not(operand))
            }
            _ => self.parse_leaf(),
        }
    }

    fn parse_leaf(&mut self) -> Parsed {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == AND_TOKEN || c == OR_TOKEN || c == ')' {
                break;
            }
            self.advance();
        }
        let leaf = self.text[start..self.pos].trim_end();

        if leaf.contains(PROP_DELIMITER) {
            if !self.resolver.allow_prop_check(leaf) {
                return Err(ParseOutcome::AlwaysTrue);
            }
            return parse_prop_check(leaf);
        }
        self.resolver.resolve_object(leaf)
    }
}

/// `name:value`, both sides trimmed, the value cut at its first whitespace.
fn parse_prop_check(leaf: &str) -> Parsed {
    let leaf = leaf.trim_start();
    let Some((name, value)) = leaf.split_once(PROP_DELIMITER) else {
        return Err(ParseOutcome::AlwaysTrue);
    };
    let name = name.trim_end();
    if name.is_empty() {
        return Err(ParseOutcome::AlwaysTrue);
    }
    let value = value.trim_start();
    let value = value.split(char::is_whitespace).next().unwrap_or_default();
    if value.is_empty() {
        return Err(ParseOutcome::AlwaysTrue);
    }
    Ok(BoolExpr::Prop(PropCheck {
        name: name.to_string(),
        value: PropCheckValue::Str(value.to_string()),
    }))
}

fn finish(parsed: Parsed) -> Lock {
    match parsed {
        Ok(expr) => Lock::new(expr),
        Err(ParseOutcome::AlwaysTrue) => Lock::unlocked(),
    }
}

/// Parse lock text typed by `player`, resolving names from their point of view. Problems are
/// reported to the player through the environment and yield the unlocked sentinel.
pub fn parse_lock<M: MatchEnvironment>(env: &mut M, player: Dbref, text: &str) -> Lock {
    let resolver = InteractiveResolver {
        matcher: LockNameMatcher::new(env, player),
    };
    finish(Parser::new(text, resolver).parse_expr())
}

/// Parse lock text read back from storage. Object keys must be literal `#N` references accepted
/// by `is_valid_ref`.
pub fn parse_lock_for_load(text: &str, is_valid_ref: impl Fn(Dbref) -> bool) -> Lock {
    let resolver = LoadResolver { is_valid_ref };
    finish(Parser::new(text, resolver).parse_expr())
}
