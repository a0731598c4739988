//! Removal of intermediate artifacts after a successful reassembly.

use std::fs;
use std::path::{Path, PathBuf};

use super::PipelineError;

/// Extensions of the intermediate files a run can leave behind: the IL dump,
/// extracted resources, and debug symbols.
pub const INTERMEDIATE_EXTENSIONS: [&str; 3] = ["il", "res", "pdb"];

/// Remove every intermediate file in `dir` whose name starts with `prefix`.
///
/// Only called once reassembly has succeeded; a failed run deliberately
/// leaves its intermediates on disk for diagnosis. Returns the removed paths.
pub fn remove_intermediates(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, PipelineError> {
    let mut removed = Vec::new();

    let entries = fs::read_dir(dir).map_err(|e| PipelineError::io("read", dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::io("read", dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(prefix) {
            continue;
        }

        let is_intermediate = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| INTERMEDIATE_EXTENSIONS.contains(&ext))
            .unwrap_or(false);
        if is_intermediate {
            fs::remove_file(&path).map_err(|e| PipelineError::io("remove", &path, e))?;
            removed.push(path);
        }
    }

    removed.sort();
    Ok(removed)
}
