//! Skip decision for outputs left by an earlier run.
//!
//! An output whose modification time is strictly newer than its source is
//! taken as proof of a finished encode. There is no content check, so a
//! source restored with an old timestamp will not be re-encoded.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// Returns true iff `output` exists and is strictly newer than `source`.
///
/// Any metadata failure yields `false`, which means "encode again".
pub fn should_skip(output: &Path, source: &Path) -> bool {
    let Some(output_mtime) = modified(output) else {
        return false;
    };
    let Some(source_mtime) = modified(source) else {
        log::warn!(
            "Cannot read modification time of {}; re-encoding",
            source.display()
        );
        return false;
    };
    output_mtime > source_mtime
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}
