use std::path::Path;

use ilpfx_core::model::{AssemblyBinary, IlFile, NamespaceSet, RewriteMap};

#[test]
fn base_name_strips_extension() {
    let binary = AssemblyBinary::new("/work/Contoso.Common.dll");
    assert_eq!(binary.base_name(), "Contoso.Common");
}

#[test]
fn dir_of_bare_file_name_is_current_dir() {
    let binary = AssemblyBinary::new("Foo.dll");
    assert_eq!(binary.dir(), Path::new("."));
}

/// Derivation is deterministic: the same prefix and binary always yield the
/// same intermediate name, so repeated runs collide on purpose.
#[test]
fn derived_il_name_is_deterministic() {
    let binary = AssemblyBinary::new("/work/Foo.dll");
    let first = IlFile::derived_from("Acme", &binary);
    let second = IlFile::derived_from("Acme", &binary);

    assert_eq!(first.path(), Path::new("/work/Acme.Foo.il"));
    assert_eq!(first, second);
}

#[test]
fn output_binary_swaps_extension() {
    let il = IlFile::new("/work/Acme.Foo.il");
    assert_eq!(il.output_binary().path(), Path::new("/work/Acme.Foo.dll"));
}

#[test]
fn companion_resource_shares_base_name() {
    let il = IlFile::new("/work/Acme.Foo.il");
    assert_eq!(il.companion_resource(), Path::new("/work/Acme.Foo.res"));
}

/// RewriteMap is a bijection from the namespace set onto the prefixed set.
#[test]
fn rewrite_map_maps_every_namespace_onto_prefixed_name() {
    let namespaces: NamespaceSet =
        ["Foo", "Bar", "Baz"].into_iter().map(str::to_string).collect();
    let map = RewriteMap::build("Acme", &namespaces);

    assert_eq!(map.len(), namespaces.len());
    for ns in &namespaces {
        assert_eq!(map.get(ns), Some(format!("Acme.{ns}").as_str()));
    }

    // Values are pairwise distinct (injective) and exactly the prefixed set.
    let mut values: Vec<&String> = map.iter().map(|(_, v)| v).collect();
    values.sort();
    values.dedup();
    assert_eq!(values.len(), namespaces.len());
}

#[test]
fn empty_namespace_set_builds_empty_map() {
    let map = RewriteMap::build("Acme", &NamespaceSet::new());
    assert!(map.is_empty());
    assert_eq!(map.namespaces(), Vec::<String>::new());
}
