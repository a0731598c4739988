//! Drives ilasm to compile a textual IL dump back into a library.

use std::ffi::OsString;
use std::path::Path;

use crate::model::{AssemblyBinary, IlFile};
use crate::toolchain::process::{run_tool, ToolOutput};

use super::{PipelineError, PipelineOptions};

/// Confirmation line ilasm prints on success. A zero exit code alone is not
/// sufficient evidence with this toolchain, so both are checked.
pub const SUCCESS_MARKER: &str = "Operation completed successfully";

/// Assemble `il` into a `.dll` next to it, embedding the sibling `.res`
/// resource file when one exists. Returns the new binary and the tool's
/// captured output.
pub fn assemble(
    ilasm: &Path,
    options: &PipelineOptions,
    il: &IlFile,
) -> Result<(AssemblyBinary, ToolOutput), PipelineError> {
    let output = il.output_binary();

    let mut out_flag = OsString::from("/OUTPUT=");
    out_flag.push(output.path());
    let mut args =
        vec![il.path().as_os_str().to_os_string(), OsString::from("/DLL"), out_flag];

    let resource = il.companion_resource();
    if resource.is_file() {
        let mut res_flag = OsString::from("/RESOURCE=");
        res_flag.push(&resource);
        args.push(res_flag);
    }

    let run = run_tool(ilasm, &args, options.tool_timeout)?;
    if !run.success() || !run.stdout.contains(SUCCESS_MARKER) {
        return Err(PipelineError::AssemblyFailed {
            il_file: il.path().to_path_buf(),
            code: run.code,
            output: run.combined_text(),
        });
    }

    Ok((output, run))
}
