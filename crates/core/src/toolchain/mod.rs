//! Locating the IL disassembler and assembler on disk.
//!
//! The Windows SDK scatters `ildasm.exe`/`ilasm.exe` across version-named
//! directories, so discovery probes those roots newest-first. Discovery is
//! kept behind the [`ToolLocator`] trait so alternate strategies (explicit
//! paths from the CLI, fixed paths in tests) can be substituted without
//! touching the rewrite logic.

pub mod process;

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// SDK version probed for by default.
pub const DEFAULT_DOTNET_VERSION: &str = "4.7";

/// The .NET 4.8 SDK ildasm has known IL regressions and is refused outright.
pub const REJECTED_DOTNET_VERSION: &str = "4.8";

/// The two external tools the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Ildasm,
    Ilasm,
}

impl Tool {
    /// Executable file name searched for under the SDK directories.
    pub fn exe_name(self) -> &'static str {
        match self {
            Tool::Ildasm => "ildasm.exe",
            Tool::Ilasm => "ilasm.exe",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::Ildasm => write!(f, "ildasm"),
            Tool::Ilasm => write!(f, "ilasm"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("could not find {tool} under {}", root.display())]
    ToolNotFound { tool: Tool, root: PathBuf },
    #[error(".NET {found} SDK has known IL regressions; install the .NET {wanted} SDK instead")]
    UnsupportedToolchainVersion { found: String, wanted: String },
}

/// Capability interface for tool discovery.
pub trait ToolLocator: Send + Sync {
    /// Returns an absolute path to an existing executable for `tool`, using
    /// `version_hint` (e.g. `4.7`) where the strategy distinguishes versions.
    fn locate(&self, tool: Tool, version_hint: &str) -> Result<PathBuf, ToolError>;
}

// ildasm root holds vN.* SDK dirs; ilasm root holds v4.* framework dirs.
static SDK_VERSION_DIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v\d+\.").expect("static regex"));
static FRAMEWORK_VERSION_DIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v4\.\d+").expect("static regex"));
static REJECTED_NETFX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^NETFX\s4\.8").expect("static regex"));

/// Locator that probes version-named SDK directories, newest first.
///
/// Roots default to the Windows SDK install locations and can be overridden
/// through the `ILDASM_ROOT` / `ILASM_ROOT` environment variables.
#[derive(Debug, Clone)]
pub struct SdkLocator {
    pub ildasm_root: PathBuf,
    pub ilasm_root: PathBuf,
}

impl SdkLocator {
    pub fn new(ildasm_root: impl Into<PathBuf>, ilasm_root: impl Into<PathBuf>) -> Self {
        Self { ildasm_root: ildasm_root.into(), ilasm_root: ilasm_root.into() }
    }

    /// Roots from the environment, falling back to the stock install paths.
    pub fn from_env() -> Self {
        Self { ildasm_root: default_ildasm_root(), ilasm_root: default_ilasm_root() }
    }

    fn locate_ildasm(&self, version_hint: &str) -> Result<PathBuf, ToolError> {
        let hint_re = netfx_pattern(version_hint);
        let not_found =
            || ToolError::ToolNotFound { tool: Tool::Ildasm, root: self.ildasm_root.clone() };

        for version_dir in version_dirs(&self.ildasm_root, &SDK_VERSION_DIR_RE) {
            let bin_dir = self.ildasm_root.join(&version_dir).join("bin");
            if !bin_dir.is_dir() {
                continue;
            }
            for entry in sorted_entry_names(&bin_dir) {
                if hint_re.is_match(&entry) {
                    let candidate = bin_dir.join(&entry).join(Tool::Ildasm.exe_name());
                    if candidate.is_file() {
                        return Ok(candidate);
                    }
                } else if REJECTED_NETFX_RE.is_match(&entry) {
                    return Err(ToolError::UnsupportedToolchainVersion {
                        found: REJECTED_DOTNET_VERSION.to_string(),
                        wanted: version_hint.to_string(),
                    });
                }
            }
        }
        Err(not_found())
    }

    fn locate_ilasm(&self) -> Result<PathBuf, ToolError> {
        for version_dir in version_dirs(&self.ilasm_root, &FRAMEWORK_VERSION_DIR_RE) {
            let candidate = self.ilasm_root.join(&version_dir).join(Tool::Ilasm.exe_name());
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(ToolError::ToolNotFound { tool: Tool::Ilasm, root: self.ilasm_root.clone() })
    }
}

impl ToolLocator for SdkLocator {
    fn locate(&self, tool: Tool, version_hint: &str) -> Result<PathBuf, ToolError> {
        match tool {
            Tool::Ildasm => self.locate_ildasm(version_hint),
            // The framework dirs carry the full version in their name; the
            // hint does not narrow them further.
            Tool::Ilasm => self.locate_ilasm(),
        }
    }
}

/// Locator honoring explicit per-tool paths, falling back to SDK probing.
///
/// Backs the CLI `--ildasm-path` / `--ilasm-path` overrides.
#[derive(Debug, Clone)]
pub struct OverrideLocator {
    ildasm: Option<PathBuf>,
    ilasm: Option<PathBuf>,
    fallback: SdkLocator,
}

impl OverrideLocator {
    pub fn new(ildasm: Option<PathBuf>, ilasm: Option<PathBuf>) -> Self {
        Self { ildasm, ilasm, fallback: SdkLocator::from_env() }
    }

    pub fn with_fallback(
        ildasm: Option<PathBuf>,
        ilasm: Option<PathBuf>,
        fallback: SdkLocator,
    ) -> Self {
        Self { ildasm, ilasm, fallback }
    }
}

impl ToolLocator for OverrideLocator {
    fn locate(&self, tool: Tool, version_hint: &str) -> Result<PathBuf, ToolError> {
        let explicit = match tool {
            Tool::Ildasm => &self.ildasm,
            Tool::Ilasm => &self.ilasm,
        };
        match explicit {
            Some(path) if path.is_file() => Ok(path.clone()),
            Some(path) => Err(ToolError::ToolNotFound { tool, root: path.clone() }),
            None => self.fallback.locate(tool, version_hint),
        }
    }
}

fn netfx_pattern(version_hint: &str) -> Regex {
    Regex::new(&format!(r"^NETFX\s{}", regex::escape(version_hint)))
        .expect("escaped version hint is a valid regex")
}

/// Names of subdirectories of `root` matching `pattern`, sorted descending so
/// the newest version is tried first. An unreadable root yields no entries
/// (and therefore a ToolNotFound from the caller).
fn version_dirs(root: &Path, pattern: &Regex) -> Vec<String> {
    let mut versions: Vec<String> = sorted_entry_names(root)
        .into_iter()
        .filter(|name| pattern.is_match(name))
        .collect();
    versions.sort_by(|a, b| b.cmp(a));
    versions
}

fn sorted_entry_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .filter_map(|e| e.file_name().to_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn default_ildasm_root() -> PathBuf {
    if let Some(root) = env::var_os("ILDASM_ROOT") {
        return PathBuf::from(root);
    }
    let program_files = env::var_os("PROGRAMFILES(X86)")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Program Files (x86)"));
    program_files.join("Microsoft SDKs").join("Windows")
}

fn default_ilasm_root() -> PathBuf {
    env::var_os("ILASM_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Windows\Microsoft.NET\Framework"))
}
