mod common;

use std::fs;
use std::sync::Arc;

use common::{write_macho, MACHO_64_LE};
use object::write::{Object, Symbol, SymbolSection};
use object::{
    Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope,
};
use probe_core::diagnostics::{CollectingDiagnostics, Severity};
use probe_core::model::Bundle;
use probe_core::services::identify::{is_macho, largest_candidate, BinaryIdentifier, Candidate};
use tempfile::tempdir;

#[test]
fn fast_path_wins_over_larger_nested_binaries() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("Foo.framework");
    write_macho(&root.join("Versions/A/Foo"), 64);
    write_macho(&root.join("Versions/A/Resources/Huge"), 4096);

    let payload = BinaryIdentifier::new().identify(&Bundle::new(&root)).expect("payload");
    assert_eq!(payload.path, root.join("Versions/A/Foo"));
    assert!(payload.verified);
}

#[test]
fn top_level_payload_precedes_versioned_one() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("Foo.framework");
    write_macho(&root.join("Foo"), 16);
    write_macho(&root.join("Versions/A/Foo"), 16);

    let payload = BinaryIdentifier::new().identify(&Bundle::new(&root)).unwrap();
    assert_eq!(payload.path, root.join("Foo"));
}

#[test]
fn conventional_path_without_magic_falls_through() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("Foo.framework");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("Foo"), b"#!/bin/sh\n").unwrap();
    write_macho(&root.join("Helpers/helper"), 32);

    let payload = BinaryIdentifier::new().identify(&Bundle::new(&root)).unwrap();
    assert_eq!(payload.path, root.join("Helpers/helper"));
}

#[test]
fn fallback_prefers_file_named_after_bundle() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("Foo.framework");
    write_macho(&root.join("Contents/Big"), 8192);
    write_macho(&root.join("Contents/MacOS/Foo"), 128);

    let payload = BinaryIdentifier::new().identify(&Bundle::new(&root)).unwrap();
    assert_eq!(payload.path, root.join("Contents/MacOS/Foo"));
}

#[test]
fn fallback_selects_strictly_largest_candidate() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("Foo.framework");
    write_macho(&root.join("PlugIns/a"), 100);
    write_macho(&root.join("PlugIns/b"), 900);
    write_macho(&root.join("XPCServices/c"), 300);
    fs::write(root.join("PlugIns/notes.txt"), vec![0u8; 10_000]).unwrap();

    let payload = BinaryIdentifier::new().identify(&Bundle::new(&root)).unwrap();
    assert_eq!(payload.path, root.join("PlugIns/b"));
}

#[test]
fn no_binary_anywhere_yields_none() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("Empty.framework");
    fs::create_dir_all(root.join("Resources")).unwrap();
    fs::write(root.join("Resources/Info.plist"), b"<plist/>").unwrap();

    assert!(BinaryIdentifier::new().identify(&Bundle::new(&root)).is_none());
}

#[test]
fn fallback_policy_is_replaceable() {
    fn smallest(candidates: &[Candidate]) -> Option<&Candidate> {
        candidates.iter().min_by_key(|c| c.size)
    }
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("Foo.framework");
    write_macho(&root.join("x/small"), 8);
    write_macho(&root.join("x/large"), 800);

    let payload =
        BinaryIdentifier::with_fallback_policy(smallest).identify(&Bundle::new(&root)).unwrap();
    assert_eq!(payload.path, root.join("x/small"));
}

#[test]
fn largest_candidate_tie_returns_one_of_the_maxima() {
    let candidates = vec![
        Candidate { path: "a".into(), size: 5 },
        Candidate { path: "b".into(), size: 9 },
        Candidate { path: "c".into(), size: 9 },
    ];
    let chosen = largest_candidate(&candidates).unwrap();
    assert_eq!(chosen.size, 9);
    assert!(largest_candidate(&[]).is_none());
}

#[test]
fn magic_check_accepts_every_known_variant_and_rejects_short_files() {
    let tmp = tempdir().unwrap();
    for (idx, magic) in probe_core::services::identify::MACHO_MAGICS.iter().enumerate() {
        let path = tmp.path().join(format!("m{idx}"));
        fs::write(&path, magic).unwrap();
        assert!(is_macho(&path), "magic {magic:02x?} should be accepted");
    }
    let short = tmp.path().join("short");
    fs::write(&short, &MACHO_64_LE[..3]).unwrap();
    assert!(!is_macho(&short));
    let elf = tmp.path().join("elf");
    fs::write(&elf, b"\x7fELF\x02\x01\x01").unwrap();
    assert!(!is_macho(&elf));
    assert!(!is_macho(tmp.path()));
}

#[test]
fn magic_check_accepts_generated_macho_object() {
    let tmp = tempdir().unwrap();
    let mut obj = Object::new(BinaryFormat::MachO, Architecture::X86_64, Endianness::Little);
    let text_id = obj.add_section(Vec::new(), b"__TEXT,__text".to_vec(), SectionKind::Text);
    obj.section_mut(text_id).append_data(&[0xC3], 1);
    obj.add_symbol(Symbol {
        name: b"_probe_fn".to_vec(),
        value: 0,
        size: 0,
        kind: SymbolKind::Text,
        scope: SymbolScope::Linkage,
        weak: false,
        section: SymbolSection::Section(text_id),
        flags: SymbolFlags::MachO { n_desc: 0 },
    });
    let root = tmp.path().join("Gen.framework");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("Gen"), obj.write().unwrap()).unwrap();

    assert!(is_macho(&root.join("Gen")));
    let payload = BinaryIdentifier::new().identify(&Bundle::new(&root)).unwrap();
    assert_eq!(payload.path, root.join("Gen"));
}

#[cfg(unix)]
#[test]
fn symlinked_payload_is_never_a_candidate() {
    let tmp = tempdir().unwrap();
    let real = tmp.path().join("real_binary");
    write_macho(&real, 64);
    let root = tmp.path().join("Foo.framework");
    fs::create_dir_all(&root).unwrap();
    std::os::unix::fs::symlink(&real, root.join("Foo")).unwrap();

    assert!(!is_macho(&root.join("Foo")));
    assert!(BinaryIdentifier::new().identify(&Bundle::new(&root)).is_none());
}

#[cfg(unix)]
#[test]
fn unreadable_subtree_is_skipped_and_other_candidates_still_found() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("Foo.framework");
    write_macho(&root.join("Resources/Locked/Huge"), 8192);
    write_macho(&root.join("Helpers/Tool"), 256);
    let Some(_guard) = common::lock_dir(&root.join("Resources/Locked")) else {
        return;
    };

    let diagnostics = Arc::new(CollectingDiagnostics::new());
    let identifier = BinaryIdentifier::new().with_diagnostics(diagnostics.clone());
    let payload = identifier.identify(&Bundle::new(&root)).expect("payload");
    assert_eq!(payload.path(), root.join("Helpers/Tool"));
    assert!(diagnostics.contains(Severity::Warn, "Skipping unreadable entry"));
}
