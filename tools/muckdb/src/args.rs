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

use clap_derive::{Parser, Subcommand};
use figment::Figment;
use figment::providers::{Format, Serialized, Yaml};
use muck_common::Dbref;
use muck_db::DatabaseConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "muckdb")]
#[command(about = "Inspect, check and convert MUCK database dumps", long_about = None)]
pub struct Args {
    #[arg(value_name = "dump", help = "The full dump file to load")]
    pub db: PathBuf,

    #[arg(
        long,
        value_name = "deltas",
        help = "Delta dump to replay over the full dump after loading it"
    )]
    pub deltas: Option<PathBuf>,

    #[arg(
        long,
        help = "Read every property into memory at load time instead of paging from the dump"
    )]
    pub resident: bool,

    #[arg(long, help = "Yaml config file to use, overridden by values in CLI args")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub db_config: DbConfigArgs,

    #[arg(long, help = "Enable debug logging")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides for the store configuration. Anything left unset comes from the config file or
/// the built-in defaults.
#[derive(Parser, Debug, Default, Clone, Serialize, Deserialize)]
pub struct DbConfigArgs {
    #[arg(long, help = "Seconds a property set stays resident before it may be paged out")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean_interval: Option<i64>,

    #[arg(long, help = "Percentage of the database allowed to stay resident")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_loaded_objs: Option<usize>,

    #[arg(long, help = "Keep string and lock values on disk until they are read")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diskbase_propvals: Option<bool>,

    #[arg(long, help = "Property checks in locks also search the actor's environment")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_envcheck: Option<bool>,
}

impl DbConfigArgs {
    /// Reimpose the values given on the command line, e.g. over parameters stored in a dump.
    pub fn apply_to(&self, config: &mut DatabaseConfig) {
        if let Some(v) = self.clean_interval {
            config.clean_interval = v;
        }
        if let Some(v) = self.max_loaded_objs {
            config.max_loaded_objs = v;
        }
        if let Some(v) = self.diskbase_propvals {
            config.diskbase_propvals = v;
        }
        if let Some(v) = self.lock_envcheck {
            config.lock_envcheck = v;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the dump and report structural problems: broken lists, bad references, bad owners.
    Check,
    /// Load the dump and print the property cache report.
    Stats {
        #[arg(long, help = "Page in every object's properties before reporting")]
        fetch_all: bool,
    },
    /// Load the dump (and any deltas) and write it back out as a current-format full dump.
    Convert {
        #[arg(value_name = "output")]
        output: PathBuf,

        #[arg(long, help = "Empty the delta file once the new dump is written")]
        discard_deltas: bool,
    },
    /// Show the lock stored on an object, and optionally test an actor against it.
    Lock {
        #[arg(value_name = "object", value_parser = parse_dbref)]
        object: Dbref,

        #[arg(long, default_value = "_/lok")]
        prop: String,

        #[arg(long, value_name = "actor", value_parser = parse_dbref)]
        actor: Option<Dbref>,
    },
    /// List an object's properties.
    Props {
        #[arg(value_name = "object", value_parser = parse_dbref)]
        object: Dbref,

        #[arg(long, default_value = "", help = "Directory to list; the root if not given")]
        dir: String,

        #[arg(long, help = "Descend into subdirectories")]
        recursive: bool,
    },
}

fn parse_dbref(s: &str) -> Result<Dbref, String> {
    Dbref::try_from(s).map_err(|e| e.to_string())
}

/// Layer the built-in defaults, the config file and the command line, in that order.
pub fn database_config(
    config_file: Option<&Path>,
    overrides: &DbConfigArgs,
) -> Result<DatabaseConfig, figment::Error> {
    let mut figment = Figment::new().merge(Serialized::defaults(DatabaseConfig::default()));
    if let Some(config_file) = config_file {
        figment = figment.merge(Yaml::file(config_file));
    }
    figment.merge(Serialized::defaults(overrides)).extract()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults_without_a_file() {
        let config = database_config(None, &DbConfigArgs::default()).unwrap();
        assert_eq!(config, DatabaseConfig::default());
    }

    #[test]
    fn command_line_beats_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "clean_interval: 60").unwrap();
        writeln!(file, "lock_envcheck: true").unwrap();
        writeln!(file, "max_loaded_objs: 20").unwrap();
        let overrides = DbConfigArgs {
            max_loaded_objs: Some(50),
            ..Default::default()
        };
        let config = database_config(Some(file.path()), &overrides).unwrap();
        assert_eq!(config.clean_interval, 60);
        assert!(config.lock_envcheck);
        assert_eq!(config.max_loaded_objs, 50);
        assert_eq!(config.housekeeping_batch, DatabaseConfig::default().housekeeping_batch);
    }

    #[test]
    fn reapplied_overrides_only_touch_what_was_given() {
        let mut config = DatabaseConfig {
            clean_interval: 30,
            lock_envcheck: true,
            ..Default::default()
        };
        let overrides = DbConfigArgs {
            lock_envcheck: Some(false),
            ..Default::default()
        };
        overrides.apply_to(&mut config);
        assert_eq!(config.clean_interval, 30);
        assert!(!config.lock_envcheck);
    }

    #[test]
    fn object_arguments_need_a_hash() {
        assert_eq!(parse_dbref("#12"), Ok(Dbref::mk_id(12)));
        assert!(parse_dbref("12").is_err());
    }
}
