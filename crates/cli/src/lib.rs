//! Small display helpers shared by the CLI binary and its tests.

use std::path::Path;

/// File name of `path` for banners and diagnostics, falling back to the full
/// path when there is no final component.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

/// Wrap `text` in the ANSI bold escape used for per-file banners.
pub fn bold(text: &str) -> String {
    format!("\x1b[1m{text}\x1b[0m")
}
