use patmut::error::PersistError;
use patmut::generator::{self, SourceUnit};
use patmut::mutants::MutantStatus;
use patmut::operators;
use patmut::store;
use tempfile::TempDir;

const SOURCE: &str = "\
procedure Check (X : Integer) is
begin
   if X > 0 then
      Deallocate (Obj);
   end if;
end Check;
";

fn unit() -> SourceUnit {
    SourceUnit::new("check.adb", SOURCE)
}

fn candidates() -> Vec<patmut::MutantCandidate> {
    generator::generate(&unit(), &operators::default_catalog(), None)
}

#[test]
fn persist_writes_one_artifact_per_candidate() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("mutants");
    let expected = candidates();

    let session = store::persist(&unit(), expected.clone(), &out).unwrap();

    assert_eq!(session.records().len(), expected.len());
    for (record, candidate) in session.records().iter().zip(&expected) {
        let name = store::artifact_name(candidate, ".adb");
        assert!(name.starts_with(&format!("mutant_{:03}_", candidate.id)));
        assert!(name.ends_with(".adb"));
        assert_eq!(record.artifact.as_deref().map(|p| p.as_str()), Some(name.as_str()));
        assert_eq!(std::fs::read_to_string(out.join(&name)).unwrap(), candidate.text);
        assert_eq!(record.status, MutantStatus::Pending);
    }
}

#[test]
fn manifest_lists_metadata_without_text() {
    let dir = TempDir::new().unwrap();
    let expected = candidates();
    store::persist(&unit(), expected.clone(), dir.path()).unwrap();

    let raw = std::fs::read_to_string(dir.path().join(store::MANIFEST_FILE)).unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entries = manifest.as_array().unwrap();
    assert_eq!(entries.len(), expected.len());

    let first = &entries[0];
    assert_eq!(first["id"], 1);
    assert_eq!(first["category"], "memory-lifecycle");
    assert_eq!(first["priority"], "CRITICAL");
    assert_eq!(first["line"], 4);
    assert!(first["fingerprint"].as_str().unwrap().len() == 32);
    assert!(first["artifact"].as_str().unwrap().starts_with("mutant_001_"));
    assert!(first.get("text").is_none());
    assert!(!raw.contains("procedure Check"));
}

#[test]
fn persist_is_idempotent() {
    let dir = TempDir::new().unwrap();
    store::persist(&unit(), candidates(), dir.path()).unwrap();
    let snapshot = |dir: &std::path::Path| {
        let mut files: Vec<(String, Vec<u8>)> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                (
                    e.file_name().to_string_lossy().into_owned(),
                    std::fs::read(e.path()).unwrap(),
                )
            })
            .collect();
        files.sort();
        files
    };
    let before = snapshot(dir.path());

    store::persist(&unit(), candidates(), dir.path()).unwrap();
    assert_eq!(snapshot(dir.path()), before);
}

#[test]
fn persist_creates_nested_output_dir() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("a").join("b").join("mutants");
    store::persist(&unit(), candidates(), &out).unwrap();
    assert!(out.join(store::MANIFEST_FILE).exists());
}

#[test]
fn persist_with_no_candidates_writes_empty_manifest() {
    let dir = TempDir::new().unwrap();
    let session = store::persist(&unit(), vec![], dir.path()).unwrap();
    assert!(session.records().is_empty());
    let raw = std::fs::read_to_string(dir.path().join(store::MANIFEST_FILE)).unwrap();
    assert_eq!(raw.trim(), "[]");
}

#[test]
fn persist_into_a_file_path_fails() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();

    let err = store::persist(&unit(), candidates(), &blocker).unwrap_err();
    assert!(matches!(err, PersistError::CreateDir { .. }));
}

#[test]
fn artifact_name_without_extension() {
    let unit = SourceUnit::new("Makefile", "if X > 0 then");
    let c = generator::generate(&unit, &operators::default_catalog(), None);
    assert_eq!(unit.extension(), "");
    let name = store::artifact_name(&c[0], &unit.extension());
    assert_eq!(name, format!("mutant_001_{}", c[0].fingerprint.short()));
}
