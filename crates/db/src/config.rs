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

use muck_props::DEFAULT_GENDER_PROP;
use serde::{Deserialize, Serialize};

/// Seconds a property set must stay resident before ordinary disposal may page it out.
pub const DEFAULT_CLEAN_INTERVAL: i64 = 900;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Minimum age, in seconds, of a resident property set before `dispose` will unload it.
    pub clean_interval: i64,
    /// Housekeeping only runs once the loaded queue holds more than this percentage of the
    /// database.
    pub max_loaded_objs: usize,
    /// ... and at least this many objects.
    pub min_loaded_floor: usize,
    /// Most objects a single housekeeping sweep will unload.
    pub housekeeping_batch: usize,
    /// Leave string and lock values on disk until they are read.
    pub diskbase_propvals: bool,
    /// Property checks in locks also search the actor's environment.
    pub lock_envcheck: bool,
    /// Slots reserved up front when a store is created.
    pub initial_capacity: usize,
    /// Slots added whenever the store outgrows its reservation.
    pub growth_step: usize,
    /// Property holding a player's gender. When it differs from the historical `sex`, writes to
    /// either name on a player are mirrored to the other.
    pub gender_prop: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            clean_interval: DEFAULT_CLEAN_INTERVAL,
            max_loaded_objs: 5,
            min_loaded_floor: 100,
            housekeeping_batch: 40,
            diskbase_propvals: true,
            lock_envcheck: false,
            initial_capacity: 10000,
            growth_step: 1000,
            gender_prop: DEFAULT_GENDER_PROP.to_string(),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "on" | "1" => Some(true),
        "no" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Timespans are stored as plain seconds, or with a `s`/`m`/`h`/`d` suffix.
/// `"%3dd %2d:%02d:%02d"`, the way dumps carry time parameters.
pub fn format_timespan(secs: i64) -> String {
    let (days, rest) = (secs / 86400, secs % 86400);
    format!(
        "{days:>3}d {:>2}:{:02}:{:02}",
        rest / 3600,
        rest % 3600 / 60,
        rest % 60
    )
}

fn parse_clock(value: &str) -> Option<i64> {
    let (days, clock) = value.split_once('d')?;
    let days = days.trim().parse::<i64>().ok()?;
    let mut secs = 0;
    for part in clock.trim().split(':') {
        secs = secs * 60 + part.trim().parse::<i64>().ok()?;
    }
    Some(days * 86400 + secs)
}

fn parse_timespan(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.contains(':') {
        return parse_clock(value);
    }
    let (digits, scale) = match value.chars().last()? {
        's' => (&value[..value.len() - 1], 1),
        'm' => (&value[..value.len() - 1], 60),
        'h' => (&value[..value.len() - 1], 3600),
        'd' => (&value[..value.len() - 1], 86400),
        _ => (value, 1),
    };
    digits.trim().parse::<i64>().ok().map(|n| n * scale)
}

fn yes_no(b: bool) -> String {
    if b { "yes" } else { "no" }.to_string()
}

impl DatabaseConfig {
    /// The tuning parameters this layer owns, formatted for a dump header.
    pub fn tune_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("clean_interval", format_timespan(self.clean_interval)),
            ("max_loaded_objs", self.max_loaded_objs.to_string()),
            ("diskbase_propvals", yes_no(self.diskbase_propvals)),
            ("lock_envcheck", yes_no(self.lock_envcheck)),
            ("gender_prop", self.gender_prop.clone()),
        ]
    }

    /// Apply one tuning parameter by name. Returns false for names this layer does not own, or
    /// values that do not parse; the setting is left alone in both cases.
    pub fn apply_tune_param(&mut self, name: &str, value: &str) -> bool {
        match name.to_ascii_lowercase().as_str() {
            "clean_interval" => match parse_timespan(value) {
                Some(secs) => {
                    self.clean_interval = secs;
                    true
                }
                None => false,
            },
            "max_loaded_objs" => match value.trim().parse::<usize>() {
                Ok(pct) => {
                    self.max_loaded_objs = pct;
                    true
                }
                Err(_) => false,
            },
            "diskbase_propvals" => match parse_bool(value) {
                Some(b) => {
                    self.diskbase_propvals = b;
                    true
                }
                None => false,
            },
            "lock_envcheck" => match parse_bool(value) {
                Some(b) => {
                    self.lock_envcheck = b;
                    true
                }
                None => false,
            },
            "gender_prop" => {
                let value = value.trim();
                if value.is_empty() {
                    return false;
                }
                self.gender_prop = value.to_string();
                true
            }
            _ => false,
        }
    }
}
