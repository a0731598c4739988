use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use ilprefix::{bold, display_name};

use ilpfx_core::model::{AssemblyBinary, IlFile, RewriteMap};
use ilpfx_core::pipeline::rewrite::RewriteStages;
use ilpfx_core::pipeline::{asm, disasm, extract, resources, rewrite, Pipeline, PipelineOptions};
use ilpfx_core::toolchain::{OverrideLocator, Tool, ToolLocator, DEFAULT_DOTNET_VERSION};

/// Fixed exit code for help requests and invalid arguments.
const INVALID_ARGS_EXIT: u8 = 2;

/// Prefix the namespaces of compiled IL assemblies.
///
/// This CLI is a thin wrapper around `ilpfx-core` (exposed in code as
/// `ilpfx_core`). All substantive logic lives in the library so it can be
/// tested thoroughly and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "ilprefix",
    version,
    about = "Prefix the namespaces of compiled IL assemblies",
    long_about = None
)]
struct Cli {
    /// Prefix applied to every namespace the assembly declares.
    prefix: String,

    /// Binaries to process (or `.il` files for the restricted modes).
    #[arg(required = true, value_name = "DLL_FILE")]
    files: Vec<PathBuf>,

    /// Only perform disassembly.
    #[arg(long, group = "mode")]
    dasm: bool,

    /// Only perform namespace changes (expects an .il file).
    #[arg(long, group = "mode")]
    nsfix: bool,

    /// Only perform IL literal fixes (expects an .il file).
    #[arg(long, group = "mode")]
    ilfix: bool,

    /// Only rename resource files next to the given .il file.
    #[arg(long, group = "mode")]
    resfix: bool,

    /// Only perform assembly (expects .il and optional .res files).
    #[arg(long, group = "mode")]
    asm: bool,

    /// Only remove the public key block (expects an .il file).
    #[arg(long = "remove-pk", group = "mode")]
    remove_pk: bool,

    /// Probe for this .NET SDK version when locating the tools.
    #[arg(long = "dotnet-ver", value_name = "VER", default_value = DEFAULT_DOTNET_VERSION)]
    dotnet_ver: String,

    /// Explicit path to ildasm.exe (skips SDK probing).
    #[arg(long = "ildasm-path", value_name = "PATH")]
    ildasm_path: Option<PathBuf>,

    /// Explicit path to ilasm.exe (skips SDK probing).
    #[arg(long = "ilasm-path", value_name = "PATH")]
    ilasm_path: Option<PathBuf>,

    /// Upper bound, in seconds, on each external tool invocation.
    #[arg(long = "tool-timeout", value_name = "SECS", default_value_t = 300)]
    tool_timeout: u64,

    /// Print parsed arguments and extra diagnostics.
    #[arg(long)]
    debug: bool,

    /// Print per-stage detail (tool paths, cleaned files).
    #[arg(long)]
    verbose: bool,

    /// Emit a JSON report per file instead of text output (full mode only).
    #[arg(long, conflicts_with = "mode")]
    json: bool,
}

/// Which operation the mode flags select; default is the full pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Full,
    Disassemble,
    NamespaceFix,
    LiteralFix,
    ResourceFix,
    Assemble,
    RemovePublicKey,
}

impl Mode {
    fn from_cli(cli: &Cli) -> Mode {
        // The flags form a clap group, so at most one is set.
        if cli.dasm {
            Mode::Disassemble
        } else if cli.nsfix {
            Mode::NamespaceFix
        } else if cli.ilfix {
            Mode::LiteralFix
        } else if cli.resfix {
            Mode::ResourceFix
        } else if cli.asm {
            Mode::Assemble
        } else if cli.remove_pk {
            Mode::RemovePublicKey
        } else {
            Mode::Full
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and usage errors share one invalid-arguments exit code.
            let _ = err.print();
            return ExitCode::from(INVALID_ARGS_EXIT);
        }
    };
    run(cli)
}

fn run(cli: Cli) -> ExitCode {
    if cli.debug {
        println!("{cli:#?}");
    }

    let locator = OverrideLocator::new(cli.ildasm_path.clone(), cli.ilasm_path.clone());
    let options = PipelineOptions {
        dotnet_version: cli.dotnet_ver.clone(),
        tool_timeout: Duration::from_secs(cli.tool_timeout),
    };
    let mode = Mode::from_cli(&cli);

    // A failure on one file must not prevent the remaining files from being
    // attempted, but the process exit status reflects any failure.
    let mut failed = false;
    for file in &cli.files {
        println!("{}", bold(&format!("==> fixing {}", display_name(file))));
        if let Err(err) = process_file(&cli, mode, &locator, &options, file) {
            if cli.debug {
                if let Some(stage) = err
                    .downcast_ref::<ilpfx_core::pipeline::PipelineError>()
                    .and_then(|e| e.stage())
                {
                    eprintln!("failed during {stage}");
                }
            }
            eprintln!("{}: {:#}", display_name(file), err);
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn process_file(
    cli: &Cli,
    mode: Mode,
    locator: &OverrideLocator,
    options: &PipelineOptions,
    file: &Path,
) -> Result<()> {
    match mode {
        Mode::Full => full_pipeline(cli, locator, options, file),
        Mode::Disassemble => disassemble_only(cli, locator, options, file),
        Mode::NamespaceFix => namespace_fix_only(cli, file),
        Mode::LiteralFix => literal_fix_only(file),
        Mode::ResourceFix => resource_fix_only(cli, file),
        Mode::Assemble => assemble_only(cli, locator, options, file),
        Mode::RemovePublicKey => remove_public_key_only(file),
    }
}

fn full_pipeline(
    cli: &Cli,
    locator: &OverrideLocator,
    options: &PipelineOptions,
    file: &Path,
) -> Result<()> {
    println!("applying \"{}\" prefix to IL namespaces", cli.prefix);

    let pipeline = Pipeline::new(locator, options.clone());
    let report = pipeline.run(&cli.prefix, &AssemblyBinary::new(file))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
        return Ok(());
    }

    if cli.verbose {
        println!("using ildasm: {}", report.ildasm.display());
        echo_tool_output(&report.ildasm_output);
        println!("using ilasm: {}", report.ilasm.display());
        echo_tool_output(&report.ilasm_output);
    }
    for renamed in &report.renamed_resources {
        println!("renamed {} to {}", renamed.from.display(), renamed.to.display());
    }
    for skipped in &report.skipped_resources {
        eprintln!("failed to rename {}: {}", skipped.path.display(), skipped.reason);
    }
    if report.fixes_applied > 0 {
        println!("IL fixes have been applied");
    }
    if cli.verbose {
        for path in &report.removed_intermediates {
            println!("cleaning {}", path.display());
        }
    }
    println!("successfully generated new IL binary: {}", report.output.display());

    Ok(())
}

fn disassemble_only(
    cli: &Cli,
    locator: &OverrideLocator,
    options: &PipelineOptions,
    file: &Path,
) -> Result<()> {
    let ildasm = locator.locate(Tool::Ildasm, &options.dotnet_version)?;
    let (il, run) =
        disasm::disassemble(&ildasm, options, &cli.prefix, &AssemblyBinary::new(file))?;
    if cli.verbose {
        echo_tool_output(&run.combined_text());
    }
    println!("disassembled to {}", il.path().display());
    Ok(())
}

fn namespace_fix_only(cli: &Cli, file: &Path) -> Result<()> {
    let map = rewrite_map_for(&cli.prefix, file)?;
    if map.is_empty() {
        println!("no namespaces declared; nothing to rewrite");
        return Ok(());
    }
    rewrite::rewrite_file(file, &map, RewriteStages::namespaces_only())?;
    println!("prefixed {} namespace(s) in {}", map.len(), file.display());
    Ok(())
}

fn literal_fix_only(file: &Path) -> Result<()> {
    let outcome =
        rewrite::rewrite_file(file, &RewriteMap::default(), RewriteStages::literal_fixes_only())?;
    if outcome.fixes_applied > 0 {
        println!("IL fixes have been applied");
    } else {
        println!("no IL fixes were needed");
    }
    Ok(())
}

fn remove_public_key_only(file: &Path) -> Result<()> {
    let outcome =
        rewrite::rewrite_file(file, &RewriteMap::default(), RewriteStages::public_key_only())?;
    if outcome.public_key_stripped {
        println!("removed public key block from {}", file.display());
    } else {
        println!("no public key block found");
    }
    Ok(())
}

fn resource_fix_only(cli: &Cli, file: &Path) -> Result<()> {
    let map = rewrite_map_for(&cli.prefix, file)?;
    let dir = IlFile::new(file).dir();
    let renames = resources::rename_resources(&dir, &map)?;
    for renamed in &renames.renamed {
        println!("renamed {} to {}", renamed.from.display(), renamed.to.display());
    }
    for skipped in &renames.skipped {
        eprintln!("failed to rename {}: {}", skipped.path.display(), skipped.reason);
    }
    if renames.renamed.is_empty() {
        println!("no resource files needed renaming");
    }
    Ok(())
}

fn assemble_only(
    cli: &Cli,
    locator: &OverrideLocator,
    options: &PipelineOptions,
    file: &Path,
) -> Result<()> {
    let ilasm = locator.locate(Tool::Ilasm, &options.dotnet_version)?;
    let (output, run) = asm::assemble(&ilasm, options, &IlFile::new(file))?;
    if cli.verbose {
        echo_tool_output(&run.combined_text());
    }
    println!("successfully generated new IL binary: {}", output.path().display());
    Ok(())
}

/// Echo captured tool output verbatim, ensuring it ends with a newline.
fn echo_tool_output(text: &str) {
    if text.is_empty() {
        return;
    }
    print!("{text}");
    if !text.ends_with('\n') {
        println!();
    }
}

/// Extract the namespaces declared in `il_file` and build the rewrite map
/// for them under the caller's prefix.
fn rewrite_map_for(prefix: &str, il_file: &Path) -> Result<RewriteMap> {
    let namespaces = extract::extract_namespaces(il_file)
        .with_context(|| format!("Failed to scan {}", il_file.display()))?;
    Ok(RewriteMap::build(prefix, &namespaces))
}
