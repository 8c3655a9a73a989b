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

//! The object database: object slots and their free list, property sets paged in and out of the
//! backing dump file, and property and lock access on top of both.

pub use backing::{BackingFile, BackingFileError, BlockLine};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DEFAULT_CLEAN_INTERVAL, DatabaseConfig, format_timespan};
pub use diskbase::{
    DumpedProps, FetchStats, FetchWindow, PagingMode, PagingQueues, QueueIter, age_histogram,
};
pub use error::StoreError;
pub use object::{Object, Timestamps, TypeData};
pub use store::{Database, ListIter, LoadedProps, PLAYER_START};

mod backing;
mod clock;
mod config;
mod diskbase;
mod error;
mod locks;
mod object;
mod props;
mod store;
