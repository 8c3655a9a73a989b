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

//! Database dumps: the versioned text format a whole store is saved in, and the delta sections
//! that record changes between full saves.
//!
//! A dump is written highest object first. Each object's property block is remembered by
//! position, and once the dump is on disk it becomes the backing file those properties are
//! paged in from.

pub use header::{
    DELTAS_FORMAT_HEADER, DUMP_FORMAT_HEADER, DumpKind, DumpVersion, END_OF_DUMP, TuneParam,
    TuneParams,
};
pub use load::{
    LoadReport, SaveReport, append_deltas, discard_deltas, load_database, load_deltas,
    save_database,
};
pub use read::{DumpEntry, DumpHeader, DumpObject, DumpReader, DumpReaderError, PropsLoadMode};
pub use write::{DumpWriter, DumpWriterError};

mod header;
mod load;
mod read;
mod write;
