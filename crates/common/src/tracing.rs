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

//! Logging setup for the database tools.

use std::io::IsTerminal;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// The filter from `RUST_LOG`, or `debug`/`info` when it is unset or unparseable.
fn filter(debug_fallback: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug_fallback { "debug" } else { "info" })
    })
}

/// Install a global subscriber that logs to stderr, keeping stdout free for reports.
///
/// Fails if a subscriber has already been installed.
pub fn init_tracing(debug_fallback: bool) -> Result<(), eyre::Report> {
    let stderr = std::io::stderr();
    let ansi = stderr.is_terminal();
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_ansi(ansi)
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(fmt::format::FmtSpan::NONE),
        )
        .with(filter(debug_fallback))
        .try_init()
        .map_err(|e| eyre::eyre!("unable to configure logging: {e}"))
}
