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

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
mod args;
mod commands;

use crate::args::{Args, Command, database_config};
use clap::Parser;
use eyre::{Report, bail, eyre};
use muck_db::Database;
use muck_textdump::{
    LoadReport, PropsLoadMode, discard_deltas, load_database, load_deltas, save_database,
};
use std::path::Path;
use tracing::{info, warn};

fn load(args: &Args, db: &mut Database) -> Result<LoadReport, Report> {
    let mode = if args.resident {
        PropsLoadMode::Resident
    } else {
        PropsLoadMode::Paged
    };
    let report = load_database(db, &args.db, mode)?;
    args.db_config.apply_to(db.config_mut());
    info!(
        version = %report.version,
        objects = report.objects,
        params = report.params.len(),
        "loaded {}",
        args.db.display()
    );
    if let Some(deltas) = &args.deltas {
        let replayed = load_deltas(db, deltas)?;
        info!(replayed, "replayed {}", deltas.display());
    }
    Ok(report)
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

fn convert(
    db: &mut Database,
    report: &LoadReport,
    output: &Path,
    deltas: Option<&Path>,
    discard: bool,
) -> Result<(), Report> {
    let saved = save_database(db, output, &report.params)?;
    println!(
        "wrote {} objects ({} bytes) to {}",
        saved.objects,
        saved.bytes,
        output.display()
    );
    if discard {
        let Some(deltas) = deltas else {
            warn!("--discard-deltas given without --deltas; nothing to discard");
            return Ok(());
        };
        discard_deltas(deltas)?;
        info!("emptied {}", deltas.display());
    }
    Ok(())
}

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let args = Args::parse();

    muck_common::tracing::init_tracing(args.debug)?;

    let config = database_config(args.config_file.as_deref(), &args.db_config)
        .map_err(|e| eyre!("unable to read configuration: {e}"))?;
    let mut db = Database::new(config);
    let report = load(&args, &mut db)?;

    match &args.command {
        Command::Check => {
            print_lines(&commands::census(&db));
            let problems = commands::check_database(&db);
            print_lines(&problems);
            if !problems.is_empty() {
                bail!("{} problems found", problems.len());
            }
            println!("no problems found");
        }
        Command::Stats { fetch_all } => {
            if *fetch_all {
                let fetched = commands::fetch_everything(&mut db);
                info!(fetched, "paged in every property set");
            }
            print_lines(&db.cache_report());
        }
        Command::Convert {
            output,
            discard_deltas,
        } => {
            convert(
                &mut db,
                &report,
                output,
                args.deltas.as_deref(),
                *discard_deltas,
            )?;
        }
        Command::Lock {
            object,
            prop,
            actor,
        } => {
            if !db.valid(*object) {
                bail!("{object} is not a valid object");
            }
            print_lines(&commands::describe_lock(&mut db, *object, prop, *actor));
        }
        Command::Props {
            object,
            dir,
            recursive,
        } => {
            if !db.valid(*object) {
                bail!("{object} is not a valid object");
            }
            print_lines(&commands::list_props(&mut db, *object, dir, *recursive));
        }
    }
    Ok(())
}
