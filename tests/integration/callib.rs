// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use indoc::indoc;
use tempfile::tempdir;

use caltab::{
    CalLibrary, CallingConvention, CaltabError, InterpError, MemTable, QueryPoint,
};

use super::{save_table, T0};

#[test]
fn test_callib_to_lookups() {
    let dir = tempdir().unwrap();
    save_table(dir.path());
    let callib = dir.path().join("callib.toml");
    std::fs::write(
        &callib,
        indoc! {r#"
            [[caltable]]
            path = "bandpass.json"
            tinterp = "nearest"
            finterp = "linear"
            time_window = "1min"
            # Science spws 0 and 1 both use spw 1.
            spwmap = [1, 1]
        "#},
    )
    .unwrap();

    let library = CalLibrary::read(&callib);
    assert!(library.is_ok(), "{:?}", library.err());
    let engines = library.unwrap().open_engines::<MemTable>(None);
    assert!(engines.is_ok(), "{:?}", engines.err());
    let engines = engines.unwrap();
    assert_eq!(engines.len(), 1);
    let engine = &engines[0];

    // Nearest in time: T0 + 70 uses T0 + 60.
    let result = engine
        .lookup(&QueryPoint::new(1, 0, 0, T0 + 70.0, 200e6))
        .unwrap();
    assert_abs_diff_eq!(result.value[0], 1.0 + 0.06, epsilon = 1e-5);

    // More than a minute after the last solution.
    let query = QueryPoint::new(1, 0, 0, T0 + 200.0, 200e6);
    let result = engine.lookup(&query);
    assert!(matches!(result, Err(InterpError::OutOfWindow { .. })));
    let result = engine
        .lookup_with(&query, CallingConvention::Lenient)
        .unwrap();
    assert!(result.flagged);
    assert_abs_diff_eq!(result.weight[0], 0.0);
}

#[test]
fn test_callib_with_missing_table() {
    let dir = tempdir().unwrap();
    let callib = dir.path().join("callib.json");
    std::fs::write(&callib, r#"{"caltable": [{"path": "missing.json"}]}"#).unwrap();
    let library = CalLibrary::read(&callib).unwrap();
    let result = library.open_engines::<MemTable>(None);
    assert!(matches!(result, Err(CaltabError::Table(_))));
}
