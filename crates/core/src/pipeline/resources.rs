//! Renaming companion resource files so their names carry the new prefix.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::model::RewriteMap;

use super::PipelineError;

/// A successful resource rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamedResource {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// A rename that failed; recorded and skipped, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedResource {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceRenames {
    pub renamed: Vec<RenamedResource>,
    pub skipped: Vec<SkippedResource>,
}

/// Rename every regular file in `dir` whose name starts with a rewrite-map
/// key, substituting the mapped value into the name.
///
/// Binary modules (`.dll`) are never touched even when their name matches. A
/// single rename failure must not abort the pipeline, so failures come back
/// in the `skipped` list for the frontend to report.
pub fn rename_resources(dir: &Path, map: &RewriteMap) -> Result<ResourceRenames, PipelineError> {
    let mut result = ResourceRenames::default();
    if map.is_empty() {
        return Ok(result);
    }

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
        if name.ends_with(".dll") {
            continue;
        }

        for (ns, new_ns) in map.iter() {
            if !name.starts_with(ns.as_str()) {
                continue;
            }
            let target = dir.join(name.replace(ns.as_str(), new_ns));
            match fs::rename(&path, &target) {
                Ok(()) => {
                    result.renamed.push(RenamedResource { from: path.clone(), to: target });
                    break;
                }
                Err(e) => {
                    result
                        .skipped
                        .push(SkippedResource { path: path.clone(), reason: e.to_string() });
                }
            }
        }
    }

    Ok(result)
}
