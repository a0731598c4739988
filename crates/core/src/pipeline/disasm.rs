//! Drives ildasm to dump a binary into its textual IL form.

use std::ffi::OsString;
use std::path::Path;

use crate::model::{AssemblyBinary, IlFile};
use crate::toolchain::process::{run_tool, ToolOutput};

use super::{PipelineError, PipelineOptions};

/// Disassemble `binary` to the deterministically named `<prefix>.<base>.il`
/// next to it, returning the dump and the tool's captured output.
///
/// The dump is restricted to a type list without a progress bar, which is all
/// the later stages need. A non-zero exit is fatal for the run.
pub fn disassemble(
    ildasm: &Path,
    options: &PipelineOptions,
    prefix: &str,
    binary: &AssemblyBinary,
) -> Result<(IlFile, ToolOutput), PipelineError> {
    let il = IlFile::derived_from(prefix, binary);

    let mut out_flag = OsString::from("/OUT=");
    out_flag.push(il.path());
    let args = vec![
        binary.path().as_os_str().to_os_string(),
        OsString::from("/NOBAR"),
        OsString::from("/TYPELIST"),
        out_flag,
    ];

    let run = run_tool(ildasm, &args, options.tool_timeout)?;
    if !run.success() {
        return Err(PipelineError::DisassemblyFailed {
            binary: binary.path().to_path_buf(),
            code: run.code,
            stderr: run.stderr,
        });
    }

    Ok((il, run))
}
