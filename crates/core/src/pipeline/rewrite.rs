//! Line-oriented IL corrections: public-key stripping, literal fix-ups, and
//! boundary-aware namespace substitution.
//!
//! The substitution is pattern-based, not a grammar parse: a namespace is
//! only replaced when the occurrence is preceded by whitespace, `:`, or `(`,
//! which keeps identifiers that merely contain a namespace as a substring
//! untouched.

use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::model::RewriteMap;

use super::PipelineError;

const PUBLIC_KEY_START: &str = ".publickey =";
const PUBLIC_KEY_END: &str = ".hash algorithm";

/// ildasm emits this stub for custom attributes whose owner it failed to
/// resolve; the line must pass through untouched.
const UNKNOWN_OWNER_ATTRIBUTE: &str = ".custom (UNKNOWN_OWNER)";

struct LiteralFix {
    pattern: Regex,
    replacement: &'static str,
}

// ildasm renders float infinities as `inf`/`-inf`, which ilasm rejects; the
// replacements are the raw little-endian byte encodings.
// https://developercommunity.visualstudio.com/solutions/806165/view.html
static LITERAL_FIXES: LazyLock<Vec<LiteralFix>> = LazyLock::new(|| {
    [
        (r"ldc\.r4(\s+)inf", "ldc.r4${1}(00 00 80 7F)"),
        (r"ldc\.r4(\s+)-inf", "ldc.r4${1}(00 00 80 FF)"),
        (r"ldc\.r8(\s+)inf", "ldc.r8${1}(00 00 00 00 00 00 F0 7F)"),
        (r"ldc\.r8(\s+)-inf", "ldc.r8${1}(00 00 00 00 00 00 F0 FF)"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| LiteralFix {
        pattern: Regex::new(pattern).expect("static regex"),
        replacement,
    })
    .collect()
});

/// Which of the independent correction stages to run.
///
/// The full pipeline runs all of them; the restricted CLI modes run one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteStages {
    pub strip_public_key: bool,
    pub literal_fixes: bool,
    pub namespaces: bool,
}

impl RewriteStages {
    pub fn all() -> Self {
        Self { strip_public_key: true, literal_fixes: true, namespaces: true }
    }

    pub fn namespaces_only() -> Self {
        Self { strip_public_key: false, literal_fixes: false, namespaces: true }
    }

    pub fn literal_fixes_only() -> Self {
        Self { strip_public_key: false, literal_fixes: true, namespaces: false }
    }

    pub fn public_key_only() -> Self {
        Self { strip_public_key: true, literal_fixes: false, namespaces: false }
    }
}

/// Per-run accumulator of what the rewrite touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Lines that received a literal fix-up or an owner-stub passthrough.
    pub fixes_applied: u32,
    pub public_key_stripped: bool,
}

/// Rewrite `il_path` in place.
///
/// The new contents are staged in a sibling temp file and swapped in with a
/// rename, so other components never observe a partially written dump.
pub fn rewrite_file(
    il_path: &Path,
    map: &RewriteMap,
    stages: RewriteStages,
) -> Result<RewriteOutcome, PipelineError> {
    let contents =
        fs::read_to_string(il_path).map_err(|e| PipelineError::io("read", il_path, e))?;

    let (rewritten, outcome) = rewrite_contents(&contents, map, stages);
    if rewritten != contents {
        let staged = il_path.with_extension("il.tmp");
        fs::write(&staged, rewritten).map_err(|e| PipelineError::io("write", &staged, e))?;
        fs::rename(&staged, il_path).map_err(|e| PipelineError::io("replace", il_path, e))?;
    }

    Ok(outcome)
}

/// Pure line loop over `contents`; line endings (LF or CRLF) are preserved.
pub fn rewrite_contents(
    contents: &str,
    map: &RewriteMap,
    stages: RewriteStages,
) -> (String, RewriteOutcome) {
    let substitutions: Vec<(Regex, &str)> = if stages.namespaces {
        map.iter().map(|(ns, new_ns)| (substitution_pattern(ns), new_ns.as_str())).collect()
    } else {
        Vec::new()
    };

    let mut out = String::with_capacity(contents.len());
    let mut outcome = RewriteOutcome::default();
    let mut skipping_public_key = false;

    for raw in contents.split_inclusive('\n') {
        let (body, eol) = split_eol(raw);

        if stages.strip_public_key {
            if body.contains(PUBLIC_KEY_START) {
                skipping_public_key = true;
                outcome.public_key_stripped = true;
                continue;
            }
            if skipping_public_key {
                if body.contains(PUBLIC_KEY_END) {
                    skipping_public_key = false;
                }
                continue;
            }
        }

        // Tool-generated owner stubs signal an ildasm artifact that must not
        // be touched further, namespace substitution included.
        if body.starts_with(UNKNOWN_OWNER_ATTRIBUTE) {
            outcome.fixes_applied += 1;
            out.push_str(body);
            out.push_str(eol);
            continue;
        }

        let mut line = Cow::Borrowed(body);

        if stages.literal_fixes {
            let mut fixed = false;
            for fix in LITERAL_FIXES.iter() {
                if fix.pattern.is_match(&line) {
                    line = Cow::Owned(
                        fix.pattern.replace_all(&line, fix.replacement).into_owned(),
                    );
                    fixed = true;
                }
            }
            if fixed {
                outcome.fixes_applied += 1;
            }
        }

        for (pattern, new_ns) in &substitutions {
            if pattern.is_match(&line) {
                let replaced = pattern
                    .replace_all(&line, |caps: &Captures<'_>| {
                        format!("{}{}", &caps[1], new_ns)
                    })
                    .into_owned();
                line = Cow::Owned(replaced);
            }
        }

        out.push_str(&line);
        out.push_str(eol);
    }

    (out, outcome)
}

/// Boundary-constrained pattern for one namespace: a match requires the
/// preceding character to be whitespace, `:`, or `(`, so occurrences at a
/// line start or inside longer identifiers are left alone.
fn substitution_pattern(namespace: &str) -> Regex {
    Regex::new(&format!(r"([\s:(]){}", regex::escape(namespace)))
        .expect("escaped namespace is a valid regex")
}

fn split_eol(raw: &str) -> (&str, &str) {
    if let Some(body) = raw.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = raw.strip_suffix('\n') {
        (body, "\n")
    } else {
        (raw, "")
    }
}
