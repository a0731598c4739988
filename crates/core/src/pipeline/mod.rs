//! End-to-end namespace-prefixing pipeline.
//!
//! Data flows strictly one way:
//! binary → IL text → extracted namespaces → rewritten text (+
//! renamed resources) → binary. Each stage blocks until its external process
//! exits; nothing is retried. A failed stage is terminal for that binary and
//! leaves any intermediate files on disk for diagnosis; only a fully
//! successful run cleans up after itself.

pub mod asm;
pub mod cleanup;
pub mod disasm;
pub mod extract;
pub mod resources;
pub mod rewrite;

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::model::{AssemblyBinary, RewriteMap};
use crate::toolchain::process::{ProcessError, DEFAULT_TOOL_TIMEOUT};
use crate::toolchain::{Tool, ToolError, ToolLocator, DEFAULT_DOTNET_VERSION};

use resources::{RenamedResource, SkippedResource};
use rewrite::{RewriteOutcome, RewriteStages};

/// States of the per-binary run, in order. Any stage can transition to a
/// terminal failure carrying the originating [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Disassemble,
    ExtractNamespaces,
    Rewrite,
    RenameResources,
    Assemble,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Disassemble => "disassemble",
            Stage::ExtractNamespaces => "extract-namespaces",
            Stage::Rewrite => "rewrite",
            Stage::RenameResources => "rename-resources",
            Stage::Assemble => "assemble",
            Stage::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("ildasm failed on {} (exit code {code})", binary.display())]
    DisassemblyFailed { binary: PathBuf, code: i32, stderr: String },
    #[error("ilasm failed on {} (exit code {code})", il_file.display())]
    AssemblyFailed { il_file: PathBuf, code: i32, output: String },
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { action, path: path.into(), source }
    }

    /// The stage this error is attributable to, where that is knowable from
    /// the error alone (process-level failures can come from either tool).
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::DisassemblyFailed { .. } => Some(Stage::Disassemble),
            PipelineError::AssemblyFailed { .. } => Some(Stage::Assemble),
            PipelineError::Tool(ToolError::ToolNotFound { tool: Tool::Ildasm, .. }) => {
                Some(Stage::Disassemble)
            }
            PipelineError::Tool(ToolError::ToolNotFound { tool: Tool::Ilasm, .. }) => {
                Some(Stage::Assemble)
            }
            PipelineError::Tool(ToolError::UnsupportedToolchainVersion { .. }) => {
                Some(Stage::Disassemble)
            }
            _ => None,
        }
    }
}

/// Knobs shared by every stage of a run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// SDK version hint handed to the tool locator.
    pub dotnet_version: String,
    /// Upper bound on each external tool invocation.
    pub tool_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            dotnet_version: DEFAULT_DOTNET_VERSION.to_string(),
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

/// Everything a run did, for frontends to print or serialize.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub il_file: PathBuf,
    pub ildasm: PathBuf,
    pub ilasm: PathBuf,
    /// Combined stdout and stderr of each tool, for frontends to echo.
    pub ildasm_output: String,
    pub ilasm_output: String,
    pub namespaces: Vec<String>,
    pub fixes_applied: u32,
    pub public_key_stripped: bool,
    pub renamed_resources: Vec<RenamedResource>,
    pub skipped_resources: Vec<SkippedResource>,
    pub removed_intermediates: Vec<PathBuf>,
}

/// Orchestrator sequencing the stages for one binary at a time.
///
/// Holds no state between runs; the per-run accumulators (fix counts, rename
/// lists) live in the report, so independent binaries are safe to process
/// from separate runs as long as they do not share a directory/prefix pair.
pub struct Pipeline<'a> {
    locator: &'a dyn ToolLocator,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(locator: &'a dyn ToolLocator, options: PipelineOptions) -> Self {
        Self { locator, options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run the full state machine for one binary and report the new binary.
    ///
    /// Tools are located at their own stage (ildasm before disassembly, ilasm
    /// before reassembly) so a missing assembler still leaves the rewritten
    /// intermediates behind for inspection.
    pub fn run(
        &self,
        prefix: &str,
        binary: &AssemblyBinary,
    ) -> Result<PipelineReport, PipelineError> {
        let dir = binary.dir();

        let ildasm = self.locator.locate(Tool::Ildasm, &self.options.dotnet_version)?;
        let (il, ildasm_run) = disasm::disassemble(&ildasm, &self.options, prefix, binary)?;

        let namespaces = extract::extract_namespaces(il.path())?;
        let map = RewriteMap::build(prefix, &namespaces);

        // A module that declares no namespaces has nothing to rewrite; the
        // dump is reassembled as-is.
        let outcome = if map.is_empty() {
            RewriteOutcome::default()
        } else {
            rewrite::rewrite_file(il.path(), &map, RewriteStages::all())?
        };

        let renames = resources::rename_resources(&dir, &map)?;

        let ilasm = self.locator.locate(Tool::Ilasm, &self.options.dotnet_version)?;
        let (output, ilasm_run) = asm::assemble(&ilasm, &self.options, &il)?;

        let removed = cleanup::remove_intermediates(&dir, prefix)?;

        Ok(PipelineReport {
            input: binary.path().to_path_buf(),
            output: output.path().to_path_buf(),
            il_file: il.path().to_path_buf(),
            ildasm,
            ilasm,
            ildasm_output: ildasm_run.combined_text(),
            ilasm_output: ilasm_run.combined_text(),
            namespaces: map.namespaces(),
            fixes_applied: outcome.fixes_applied,
            public_key_stripped: outcome.public_key_stripped,
            renamed_resources: renames.renamed,
            skipped_resources: renames.skipped,
            removed_intermediates: removed,
        })
    }
}
