use std::fs;

use ilpfx_core::model::{NamespaceSet, RewriteMap};
use ilpfx_core::pipeline::rewrite::{rewrite_contents, rewrite_file, RewriteStages};
use tempfile::tempdir;

fn map_for(prefix: &str, namespaces: &[&str]) -> RewriteMap {
    let set: NamespaceSet = namespaces.iter().map(|s| s.to_string()).collect();
    RewriteMap::build(prefix, &set)
}

#[test]
fn namespace_replaced_after_whitespace_colon_and_paren() {
    let map = map_for("Acme", &["Foo"]);
    let input = "  newobj instance void Foo.Widget::.ctor()\n\
                 extends :Foo.Base\n\
                 catch (Foo.MyException)\n";

    let (out, _) = rewrite_contents(input, &map, RewriteStages::all());
    assert_eq!(
        out,
        "  newobj instance void Acme.Foo.Widget::.ctor()\n\
         extends :Acme.Foo.Base\n\
         catch (Acme.Foo.MyException)\n"
    );
}

/// The boundary constraint: an occurrence embedded in a longer identifier
/// (or at the very start of a line, with no preceding character) must not be
/// rewritten.
#[test]
fn namespace_inside_longer_identifier_is_untouched() {
    let map = map_for("Acme", &["xyz"]);
    let input = "Prefixxyz.Foo stays\n\
                 xyz.Foo at line start stays\n";

    let (out, _) = rewrite_contents(input, &map, RewriteStages::all());
    assert_eq!(out, input);
}

#[test]
fn multiple_namespaces_rewrite_independently() {
    let map = map_for("Acme", &["Foo", "Bar"]);
    let input = " call void Foo.A::m()\n call void Bar.B::m()\n";

    let (out, _) = rewrite_contents(input, &map, RewriteStages::all());
    assert_eq!(out, " call void Acme.Foo.A::m()\n call void Acme.Bar.B::m()\n");
}

#[test]
fn public_key_block_is_removed_entirely() {
    let map = map_for("Acme", &["Foo"]);
    let input = ".assembly Foo\n\
                 {\n\
                 .publickey = (00 24 00 00\n\
                 AA BB CC DD\n\
                 EE FF 00 11 )\n\
                 .hash algorithm 0x00008004\n\
                 .ver 1:0:0:0\n\
                 }\n";

    let (out, outcome) = rewrite_contents(input, &map, RewriteStages::all());
    assert!(outcome.public_key_stripped);
    assert!(!out.contains(".publickey"));
    assert!(!out.contains(".hash algorithm"));
    assert!(!out.contains("AA BB CC DD"));
    // Everything outside the block is preserved in its original order.
    assert_eq!(out, ".assembly Acme.Foo\n{\n.ver 1:0:0:0\n}\n");
}

#[test]
fn infinity_literals_get_raw_byte_encodings() {
    let map = RewriteMap::default();
    let input = "    ldc.r4     inf\n\
                 \tldc.r4 -inf\n\
                 IL_0004: ldc.r8  inf\n\
                 IL_0008: ldc.r8  -inf\n";

    let (out, outcome) = rewrite_contents(input, &map, RewriteStages::all());
    assert_eq!(
        out,
        "    ldc.r4     (00 00 80 7F)\n\
         \tldc.r4 (00 00 80 FF)\n\
         IL_0004: ldc.r8  (00 00 00 00 00 00 F0 7F)\n\
         IL_0008: ldc.r8  (00 00 00 00 00 00 F0 FF)\n"
    );
    assert_eq!(outcome.fixes_applied, 4);
}

#[test]
fn finite_literals_are_left_alone() {
    let map = RewriteMap::default();
    let input = " ldc.r4 1.5\n ldc.r8 0.0\n infinity_helper()\n";

    let (out, outcome) = rewrite_contents(input, &map, RewriteStages::all());
    assert_eq!(out, input);
    assert_eq!(outcome.fixes_applied, 0);
}

#[test]
fn unknown_owner_attribute_passes_through_untouched() {
    let map = map_for("Acme", &["Foo"]);
    let input = ".custom (UNKNOWN_OWNER) instance void Foo.Attr::.ctor()\n";

    let (out, outcome) = rewrite_contents(input, &map, RewriteStages::all());
    assert_eq!(out, input);
    assert_eq!(outcome.fixes_applied, 1);
}

#[test]
fn crlf_line_endings_are_preserved() {
    let map = map_for("Acme", &["Foo"]);
    let input = " call void Foo.A::m()\r\nplain line\r\n";

    let (out, _) = rewrite_contents(input, &map, RewriteStages::all());
    assert_eq!(out, " call void Acme.Foo.A::m()\r\nplain line\r\n");
}

#[test]
fn stages_gate_each_correction_independently() {
    let map = map_for("Acme", &["Foo"]);
    let input = ".publickey = (00 11 )\n\
                 .hash algorithm 0x8004\n\
                 ldc.r4 inf\n\
                 call void Foo.A::m()\n";

    // Namespace-only: key block and literal stay.
    let (out, _) = rewrite_contents(input, &map, RewriteStages::namespaces_only());
    assert!(out.contains(".publickey"));
    assert!(out.contains("ldc.r4 inf"));
    assert!(out.contains("Acme.Foo.A"));

    // Literal-only: namespaces and key block stay.
    let (out, _) = rewrite_contents(input, &map, RewriteStages::literal_fixes_only());
    assert!(out.contains(".publickey"));
    assert!(out.contains("ldc.r4 (00 00 80 7F)"));
    assert!(out.contains("void Foo.A"));

    // Key-only: everything else stays.
    let (out, outcome) = rewrite_contents(input, &map, RewriteStages::public_key_only());
    assert!(outcome.public_key_stripped);
    assert!(out.contains("ldc.r4 inf"));
    assert!(out.contains("void Foo.A"));
}

#[test]
fn rewrite_file_replaces_contents_in_place() {
    let dir = tempdir().expect("tempdir");
    let il = dir.path().join("Acme.Foo.il");
    fs::write(&il, " call void Foo.A::m()\n").expect("write il");

    let map = map_for("Acme", &["Foo"]);
    rewrite_file(&il, &map, RewriteStages::all()).expect("rewrite");

    let contents = fs::read_to_string(&il).expect("read back");
    assert_eq!(contents, " call void Acme.Foo.A::m()\n");
    // The staging file must not be left behind.
    assert!(!il.with_extension("il.tmp").exists());
}

#[test]
fn rewrite_file_with_empty_map_is_a_no_op() {
    let dir = tempdir().expect("tempdir");
    let il = dir.path().join("Acme.Foo.il");
    let original = " call void Foo.A::m()\n";
    fs::write(&il, original).expect("write il");

    let outcome =
        rewrite_file(&il, &RewriteMap::default(), RewriteStages::namespaces_only())
            .expect("rewrite");
    assert_eq!(outcome.fixes_applied, 0);
    assert_eq!(fs::read_to_string(&il).expect("read back"), original);
}
