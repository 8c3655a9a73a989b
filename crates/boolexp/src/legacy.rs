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
//! The line-oriented tree format locks were stored in by old database versions.
//!
//! `(!x)`, `(x&y)`, `(x|y)`, `[name:value]` with `\` escaping inside the value, bare decimal
//! object numbers, and `-...` for the obsolete NOTHING key. An expression ends with a newline.

use std::io;
use std::io::{BufRead, Write};

use muck_common::{Dbref, PROP_DELIMITER, is_number};
use thiserror::Error;

use crate::{AND_TOKEN, BoolExpr, Lock, NOT_TOKEN, OR_TOKEN, PropCheck, PropCheckValue};

#[derive(Debug, Error)]
pub enum LockReadError {
    #[error("unexpected end of file in lock expression")]
    UnexpectedEof,
    #[error("malformed lock expression: {0}")]
    Malformed(String),
    #[error("io error reading lock expression: {0}")]
    IoError(#[from] io::Error),
}

pub struct LegacyLockReader<'r, R: BufRead> {
    reader: &'r mut R,
}

impl<'r, R: BufRead> LegacyLockReader<'r, R> {
    pub fn new(reader: &'r mut R) -> Self {
        Self { reader }
    }

    fn peek(&mut self) -> Result<Option<u8>, LockReadError> {
        let buf = self.reader.fill_buf()?;
        Ok(buf.first().copied())
    }

    fn next_byte(&mut self) -> Result<Option<u8>, LockReadError> {
        let c = self.peek()?;
        if c.is_some() {
            self.reader.consume(1);
        }
        Ok(c)
    }

    fn expect_byte(&mut self) -> Result<u8, LockReadError> {
        self.next_byte()?.ok_or(LockReadError::UnexpectedEof)
    }

    fn expect(&mut self, wanted: u8) -> Result<(), LockReadError> {
        let c = self.expect_byte()?;
        if c != wanted {
            return Err(LockReadError::Malformed(format!(
                "expected '{}', found '{}'",
                wanted as char, c as char
            )));
        }
        Ok(())
    }

    /// Read one expression and its terminating newline.
    pub fn read_lock(&mut self) -> Result<Lock, LockReadError> {
        let lock = self.read_subexpr()?;
        self.expect(b'\n')?;
        Ok(lock)
    }

    /// A subexpression inside parentheses. The sentinel can only appear at top level.
    fn read_operand(&mut self) -> Result<BoolExpr, LockReadError> {
        self.read_subexpr()?.into_expr().ok_or_else(|| {
            LockReadError::Malformed("empty operand inside lock expression".to_string())
        })
    }

    fn read_subexpr(&mut self) -> Result<Lock, LockReadError> {
        let Some(c) = self.peek()? else {
            return Err(LockReadError::UnexpectedEof);
        };
        match c {
            b'\n' => Ok(Lock::unlocked()),
            b'(' => {
                self.reader.consume(1);
                if self.peek()? == Some(NOT_TOKEN as u8) {
                    self.reader.consume(1);
                    let operand = self.read_operand()?;
                    self.expect(b')')?;
                    return Ok(Lock::new(BoolExpr::not(operand)));
                }
                let left = self.read_operand()?;
                let op = self.expect_byte()?;
                let right = self.read_operand()?;
                self.expect(b')')?;
                match op as char {
                    AND_TOKEN => Ok(Lock::new(BoolExpr::and(left, right))),
                    OR_TOKEN => Ok(Lock::new(BoolExpr::or(left, right))),
                    other => Err(LockReadError::Malformed(format!(
                        "unknown operator '{other}'"
                    ))),
                }
            }
            b'-' => {
                // Obsolete NOTHING key: skip to the end of the line.
                while self.peek()?.ok_or(LockReadError::UnexpectedEof)? != b'\n' {
                    self.reader.consume(1);
                }
                Ok(Lock::unlocked())
            }
            b'[' => {
                self.reader.consume(1);
                let mut name = Vec::new();
                loop {
                    let c = self.expect_byte()?;
                    if c == PROP_DELIMITER as u8 {
                        break;
                    }
                    name.push(c);
                }
                let mut value = Vec::new();
                loop {
                    let mut c = self.expect_byte()?;
                    if c == b']' {
                        break;
                    }
                    if c == b'\\' {
                        c = self.expect_byte()?;
                    }
                    value.push(c);
                }
                let name = String::from_utf8_lossy(&name).into_owned();
                let value = String::from_utf8_lossy(&value).into_owned();
                let value = match is_number(&value).then(|| value.parse::<i64>().ok()) {
                    Some(Some(n)) => PropCheckValue::Int(n),
                    _ => PropCheckValue::Str(value),
                };
                Ok(Lock::new(BoolExpr::Prop(PropCheck { name, value })))
            }
            _ => {
                let mut id: i32 = 0;
                while let Some(d) = self.peek()?.filter(u8::is_ascii_digit) {
                    self.reader.consume(1);
                    id = id
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(i32::from(d - b'0')))
                        .ok_or_else(|| LockReadError::Malformed("object number overflow".into()))?;
                }
                Ok(Lock::new(BoolExpr::Const(Dbref::mk_id(id))))
            }
        }
    }
}

fn write_expr<W: Write>(w: &mut W, expr: &BoolExpr) -> io::Result<()> {
    match expr {
        BoolExpr::And(l, r) | BoolExpr::Or(l, r) => {
            let op = if matches!(expr, BoolExpr::And(..)) {
                AND_TOKEN
            } else {
                OR_TOKEN
            };
            write!(w, "(")?;
            write_expr(w, l)?;
            write!(w, "{op}")?;
            write_expr(w, r)?;
            write!(w, ")")
        }
        BoolExpr::Not(operand) => {
            write!(w, "({NOT_TOKEN}")?;
            write_expr(w, operand)?;
            write!(w, ")")
        }
        BoolExpr::Const(thing) => write!(w, "{}", thing.id()),
        BoolExpr::Prop(check) => {
            let mut escaped = String::with_capacity(check.value.to_string().len());
            for c in check.value.to_string().chars() {
                if c == ']' || c == '\\' {
                    escaped.push('\\');
                }
                escaped.push(c);
            }
            write!(w, "[{}{PROP_DELIMITER}{escaped}]", check.name)
        }
    }
}

/// Write a lock in the legacy tree format, including its terminating newline.
pub fn write_legacy_lock<W: Write>(w: &mut W, lock: &Lock) -> io::Result<()> {
    if let Some(expr) = lock.expr() {
        write_expr(w, expr)?;
    }
    writeln!(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn read(text: &str) -> Result<Lock, LockReadError> {
        let mut cursor = Cursor::new(text.as_bytes().to_vec());
        LegacyLockReader::new(&mut cursor).read_lock()
    }

    fn c(id: i32) -> BoolExpr {
        BoolExpr::Const(Dbref::mk_id(id))
    }

    #[test]
    fn reads_nested_trees() {
        assert_eq!(
            read("((12&(!7))|[_sex:male])\n").unwrap(),
            Lock::new(BoolExpr::or(
                BoolExpr::and(c(12), BoolExpr::not(c(7))),
                BoolExpr::Prop(PropCheck::new_str("_sex", "male"))
            ))
        );
    }

    #[test]
    fn empty_line_is_unlocked() {
        assert!(read("\n").unwrap().is_unlocked());
        assert!(read("-1\n").unwrap().is_unlocked());
    }

    #[test]
    fn numeric_prop_values_become_int_checks() {
        assert_eq!(
            read("[_level:-3]\n").unwrap(),
            Lock::new(BoolExpr::Prop(PropCheck {
                name: "_level".into(),
                value: PropCheckValue::Int(-3),
            }))
        );
    }

    #[test]
    fn escapes_inside_values() {
        let lock = Lock::new(BoolExpr::Prop(PropCheck::new_str("_x", "a]b\\c")));
        let mut out = Vec::new();
        write_legacy_lock(&mut out, &lock).unwrap();
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "[_x:a\\]b\\\\c]\n");
        assert_eq!(read(&String::from_utf8(out).unwrap()).unwrap(), lock);
    }

    #[test]
    fn writer_output_reads_back() {
        let lock = Lock::new(BoolExpr::and(
            BoolExpr::or(c(1), BoolExpr::not(c(22))),
            BoolExpr::Prop(PropCheck {
                name: "_n".into(),
                value: PropCheckValue::Int(4),
            }),
        ));
        let mut out = Vec::new();
        write_legacy_lock(&mut out, &lock).unwrap();
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "((1|(!22))&[_n:4])\n");
        assert_eq!(read(&String::from_utf8(out).unwrap()).unwrap(), lock);
    }

    #[test]
    fn truncation_is_an_error() {
        assert!(matches!(read("(12&"), Err(LockReadError::UnexpectedEof)));
        assert!(matches!(read("[_a:b"), Err(LockReadError::UnexpectedEof)));
        assert!(matches!(read("(12#7)\n"), Err(LockReadError::Malformed(_))));
        assert!(matches!(read("12x\n"), Err(LockReadError::Malformed(_))));
    }

    #[test]
    fn empty_operands_are_malformed() {
        assert!(matches!(read("(12&\n)\n"), Err(LockReadError::Malformed(_))));
        assert!(matches!(read("(!-1\n)\n"), Err(LockReadError::Malformed(_))));
    }
}
