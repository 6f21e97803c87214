//! Maps a discovered source file to its location in the output tree.
//!
//! Mapping is lexical only. `.` components and trailing separators are
//! ignored, so `.`, `./` and `` describe the same root.

use crate::config::OUTPUT_EXTENSION;
use crate::error::{CoreError, CoreResult};

use std::path::{Component, Path, PathBuf};

/// Returns the output path mirroring `source` under `output_root`, with the
/// final extension replaced by `mp4`.
///
/// Fails if `source` is not inside `input_root`.
pub fn map_output_path(input_root: &Path, output_root: &Path, source: &Path) -> CoreResult<PathBuf> {
    let mapping_error = |message: &str| CoreError::PathMapping {
        root: input_root.to_path_buf(),
        source_path: source.to_path_buf(),
        message: message.to_string(),
    };

    let root = normalize(input_root);
    let source_normalized = normalize(source);

    let relative = source_normalized
        .strip_prefix(&root)
        .map_err(|_| mapping_error("source is not under the input root"))?;

    if relative.as_os_str().is_empty() {
        return Err(mapping_error("source is the input root itself"));
    }

    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(mapping_error("relative path escapes the input root"));
    }

    let mut output = normalize(output_root);
    if output.as_os_str().is_empty() {
        output.push(".");
    }
    output.push(relative);
    output.set_extension(OUTPUT_EXTENSION);
    Ok(output)
}

/// Drops `.` components. `..` is kept so escaping paths are still detected.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrors_subdirectories_and_normalizes_extension() {
        let out = map_output_path(Path::new("."), Path::new("reencoded"), Path::new("clips/a.mov")).unwrap();
        assert_eq!(out, PathBuf::from("reencoded/clips/a.mp4"));
    }

    #[test]
    fn dot_root_forms_are_equivalent() {
        let expected = PathBuf::from("reencoded/clips/a.mp4");
        for root in [".", "./", ""] {
            for source in ["clips/a.mov", "./clips/a.mov"] {
                let out = map_output_path(Path::new(root), Path::new("reencoded"), Path::new(source)).unwrap();
                assert_eq!(out, expected, "root={root:?} source={source:?}");
            }
        }
    }

    #[test]
    fn trailing_slash_on_root_is_ignored() {
        let a = map_output_path(Path::new("/media/in/"), Path::new("/media/out"), Path::new("/media/in/x/b.mkv")).unwrap();
        let b = map_output_path(Path::new("/media/in"), Path::new("/media/out/"), Path::new("/media/in/x/b.mkv")).unwrap();
        assert_eq!(a, PathBuf::from("/media/out/x/b.mp4"));
        assert_eq!(a, b);
    }

    #[test]
    fn container_of_source_does_not_change_output() {
        let root = Path::new("in");
        let out = Path::new("out");
        let from_mov = map_output_path(root, out, Path::new("in/a.mov")).unwrap();
        let from_mkv = map_output_path(root, out, Path::new("in/a.MKV")).unwrap();
        let from_mp4 = map_output_path(root, out, Path::new("in/a.mp4")).unwrap();
        assert_eq!(from_mov, from_mkv);
        assert_eq!(from_mov, from_mp4);
    }

    #[test]
    fn mapping_is_repeatable() {
        let first = map_output_path(Path::new("in"), Path::new("out"), Path::new("in/d/e.avi")).unwrap();
        let second = map_output_path(Path::new("in"), Path::new("out"), Path::new("in/d/e.avi")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn only_last_extension_is_replaced() {
        let out = map_output_path(Path::new("in"), Path::new("out"), Path::new("in/show.s01.webm")).unwrap();
        assert_eq!(out, PathBuf::from("out/show.s01.mp4"));
    }

    #[test]
    fn source_outside_root_is_rejected() {
        let err = map_output_path(Path::new("in"), Path::new("out"), Path::new("elsewhere/a.mp4")).unwrap_err();
        assert!(matches!(err, CoreError::PathMapping { .. }));

        let err = map_output_path(Path::new("in"), Path::new("out"), Path::new("in/../a.mp4")).unwrap_err();
        assert!(matches!(err, CoreError::PathMapping { .. }));

        let err = map_output_path(Path::new("in"), Path::new("out"), Path::new("in")).unwrap_err();
        assert!(matches!(err, CoreError::PathMapping { .. }));
    }

    #[test]
    fn dot_output_root_stays_relative() {
        let out = map_output_path(Path::new("in"), Path::new("."), Path::new("in/a.mov")).unwrap();
        assert_eq!(out, PathBuf::from("./a.mp4"));
    }
}
