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
use std::fmt::{Display, Formatter};

use muck_common::{Dbref, PROP_DELIMITER};

use crate::{AND_TOKEN, BoolExpr, Lock, NOT_TOKEN, OR_TOKEN, UNLOCKED_DISPLAY};

#[derive(Clone, Copy, Eq, PartialEq)]
enum Outer {
    None,
    And,
    Or,
    Not,
}

fn unparse_into(
    out: &mut String,
    expr: &BoolExpr,
    outer: Outer,
    name_of: &dyn Fn(Dbref) -> String,
) {
    match expr {
        BoolExpr::And(left, right) => {
            let wrap = outer == Outer::Not;
            if wrap {
                out.push('(');
            }
            unparse_into(out, left, Outer::And, name_of);
            out.push(AND_TOKEN);
            unparse_into(out, right, Outer::And, name_of);
            if wrap {
                out.push(')');
            }
        }
        BoolExpr::Or(left, right) => {
            let wrap = matches!(outer, Outer::Not | Outer::And);
            if wrap {
                out.push('(');
            }
            unparse_into(out, left, Outer::Or, name_of);
            out.push(OR_TOKEN);
            unparse_into(out, right, Outer::Or, name_of);
            if wrap {
                out.push(')');
            }
        }
        BoolExpr::Not(operand) => {
            out.push(NOT_TOKEN);
            unparse_into(out, operand, Outer::Not, name_of);
        }
        BoolExpr::Const(thing) => out.push_str(&name_of(*thing)),
        BoolExpr::Prop(check) => {
            out.push_str(&check.name);
            out.push(PROP_DELIMITER);
            out.push_str(&check.value.to_string());
        }
    }
}

impl Lock {
    /// The stored form: object keys as `#N`. This is what the load-mode parser reads back.
    pub fn unparse(&self) -> String {
        self.unparse_with(&|thing: Dbref| thing.to_literal())
    }

    /// The display form, with object keys rendered by `name_of` (typically `Name(#N<flags>)`).
    pub fn unparse_with(&self, name_of: &dyn Fn(Dbref) -> String) -> String {
        let Some(expr) = self.expr() else {
            return UNLOCKED_DISPLAY.to_string();
        };
        let mut out = String::new();
        unparse_into(&mut out, expr, Outer::None, name_of);
        out
    }
}

impl Display for Lock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.unparse())
    }
}
