//! Output file naming.

use std::path::{Path, PathBuf};

/// Default suffix appended to the source name.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_final";

/// `<dir>/<name up to its first '.'><suffix>.mp4`.
///
/// A name with nothing before its first dot (`.hidden.mp4`) keeps its
/// full stem instead of producing an empty prefix.
pub fn derive_output_path(input: &Path, suffix: &str) -> PathBuf {
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let prefix = match file_name.split('.').next() {
        Some(prefix) if !prefix.is_empty() => prefix.to_string(),
        _ => input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let name = format!("{prefix}{suffix}.mp4");
    match input.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}
