//! Core data model for the prefixing pipeline.
//!
//! These types only derive paths and names; they do *not* perform any IO
//! themselves. The pipeline stages are responsible for actually touching the
//! filesystem based on what is computed here, which keeps the naming rules
//! trivially testable.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// A compiled .NET module on disk.
///
/// Input to disassembly and output of reassembly. The pipeline never mutates
/// an input binary; it only ever produces new files alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyBinary {
    path: PathBuf,
}

impl AssemblyBinary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without the extension (e.g. `Contoso.Common` for
    /// `Contoso.Common.dll`).
    pub fn base_name(&self) -> String {
        self.path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string()
    }

    /// Directory containing the binary; a bare file name resolves to `.`.
    pub fn dir(&self) -> PathBuf {
        parent_or_current(&self.path)
    }
}

/// A textual IL dump, owned by one pipeline run.
///
/// Created by disassembly, rewritten in place, consumed by reassembly and
/// finally removed by cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IlFile {
    path: PathBuf,
}

impl IlFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Deterministic dump name for a run: `<prefix>.<base>.il`, next to the
    /// binary. Repeated runs with the same prefix derive the same name.
    pub fn derived_from(prefix: &str, binary: &AssemblyBinary) -> Self {
        let name = format!("{}.{}.il", prefix, binary.base_name());
        Self { path: binary.dir().join(name) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without the `.il` extension.
    pub fn base_name(&self) -> String {
        self.path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string()
    }

    pub fn dir(&self) -> PathBuf {
        parent_or_current(&self.path)
    }

    /// Sibling resource file ilasm should embed if it exists.
    pub fn companion_resource(&self) -> PathBuf {
        self.dir().join(format!("{}.res", self.base_name()))
    }

    /// The binary this dump assembles back into (`.il` swapped for `.dll`).
    pub fn output_binary(&self) -> AssemblyBinary {
        AssemblyBinary::new(self.path.with_extension("dll"))
    }
}

fn parent_or_current(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Distinct top-level namespaces a module declares (case-sensitive).
pub type NamespaceSet = BTreeSet<String>;

/// Mapping from each owned namespace to its prefixed replacement.
///
/// Built once per run from the extracted [`NamespaceSet`] and the
/// caller-supplied prefix; read-only afterwards. By construction this is a
/// bijection from the namespace set onto `{prefix.ns}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteMap {
    entries: BTreeMap<String, String>,
}

impl RewriteMap {
    pub fn build(prefix: &str, namespaces: &NamespaceSet) -> Self {
        let entries =
            namespaces.iter().map(|ns| (ns.clone(), format!("{prefix}.{ns}"))).collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, namespace: &str) -> Option<&str> {
        self.entries.get(namespace).map(String::as_str)
    }

    /// Entries in namespace order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }

    /// The original namespaces, in order.
    pub fn namespaces(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
