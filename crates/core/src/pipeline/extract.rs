//! Namespace discovery over a textual IL dump.
//!
//! This is not an IL parser. It recognizes just enough structure to tell
//! which top-level namespaces the module itself declares: the `.typelist`
//! section bounds, `.assembly extern` references (which must be excluded so
//! foreign namespaces are never rewritten), and the `.module` line after
//! which no namespace can be declared.

use std::collections::BTreeSet;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::NamespaceSet;

use super::PipelineError;

static EXTERN_ASSEMBLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.assembly extern\s(.+)$").expect("static regex"));

/// Scan `il_path` and return the namespaces the module declares itself.
///
/// Returns an empty set when the dump lists no namespaces, in which case
/// rewriting downstream degenerates to a no-op.
pub fn extract_namespaces(il_path: &Path) -> Result<NamespaceSet, PipelineError> {
    let file =
        fs::File::open(il_path).map_err(|e| PipelineError::io("open", il_path, e))?;
    let reader = BufReader::new(file);

    let mut declared = NamespaceSet::new();
    let mut externs: BTreeSet<String> = BTreeSet::new();
    let mut recording = false;

    for line in reader.lines() {
        let line = line.map_err(|e| PipelineError::io("read", il_path, e))?;

        if line.starts_with(".typelist") {
            recording = true;
        } else if line.starts_with('}') {
            recording = false;
        }

        if recording {
            // Each listed type is `Namespace.Rest.Of.Name`; only an
            // alphanumeric first token is a namespace (braces and indented
            // noise fall out here).
            if let Some(first) = line.trim().split('.').next() {
                if !first.is_empty() && first.chars().all(char::is_alphanumeric) {
                    declared.insert(first.to_string());
                }
            }
        }

        if let Some(caps) = EXTERN_ASSEMBLY_RE.captures(&line) {
            externs.insert(caps[1].trim_end().to_string());
        }

        // Namespaces cannot be declared past the module header.
        if line.starts_with(".module") {
            break;
        }
    }

    for ext in &externs {
        declared.remove(ext);
    }
    Ok(declared)
}
