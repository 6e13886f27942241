// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Reading and interpolating radio-interferometric calibration tables.

Calibration tables hold per-antenna solutions (gains, bandpasses, delays ...)
as rows keyed by time, field, spectral window and antenna. This crate groups
those rows with [`CalTableIterator`], exposes their columns as vectors and
`[nPar, nChan, nRow]` cubes, and turns a whole table into a
[`CalInterpolationEngine`] that answers "what is the solution for antenna
`a` at time `t` and frequency `f`?".
 */

pub mod callib;
pub mod columns;
pub mod constants;
mod error;
pub mod interp;
pub mod iterator;
pub mod maps;
mod messages;
pub mod solutions;
pub mod table;
mod time;
pub mod unit_parsing;

// Re-exports.
pub use callib::{CalLibEntry, CalLibrary};
pub use columns::{CalColumn, CalHistoryColumns, CalMainColumns, ColumnAccessor};
pub use error::CaltabError;
pub use interp::{
    AxisKind, CacheBuilder, CalInterpolationEngine, CallingConvention, EdgePolicy, InterpError,
    InterpType, InterpolatedResult, InterpolationAxis, QueryPoint, Weighting,
};
pub use iterator::{CalTableIterator, IteratorState};
pub use maps::{CalIndexMap, CalMap, FieldDirection};
pub use solutions::{CalSolutionRow, RowSelection, SpectralWindows};
pub use table::{
    CalTableError, CalTableHandle, ColumnStore, DataType, MemTable, OpenColumnStore,
    TableOpenMode,
};
