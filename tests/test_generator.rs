use std::path::Path;

use patmut::error::GenerationError;
use patmut::generator::{self, SourceUnit};
use patmut::mutants::Fingerprint;
use patmut::operators::{self, Category};

const RELEASE: &str = "\
procedure Release (Obj : in out Handle) is
begin
   if Obj.Ref_Count > 0 then
      Obj.Ref_Count := Obj.Ref_Count - 1;
   end if;
   if Obj.Ref_Count = 0 and not Obj.Shared then
      Deallocate (Obj);
   end if;
   if Obj.Data'Length > 1 then
      raise Constraint_Error;
   end if;
end Release;
";

fn unit() -> SourceUnit {
    SourceUnit::new("release.adb", RELEASE)
}

#[test]
fn ids_start_at_one_and_follow_generation_order() {
    let candidates = generator::generate(&unit(), &operators::default_catalog(), None);
    assert!(!candidates.is_empty());
    for (i, c) in candidates.iter().enumerate() {
        assert_eq!(c.id, i + 1);
    }
}

#[test]
fn candidates_follow_catalog_then_line_order() {
    let catalog = operators::default_catalog();
    let candidates = generator::generate(&unit(), &catalog, None);

    let rank = |name: &str| catalog.iter().position(|op| op.name == name).unwrap();
    for pair in candidates.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let (ra, rb) = (rank(&a.operator), rank(&b.operator));
        assert!(ra < rb || (ra == rb && a.line <= b.line), "{a:?} before {b:?}");
    }
    assert_eq!(candidates[0].category, Category::MemoryLifecycle);
}

#[test]
fn generate_is_deterministic() {
    let first = generator::generate(&unit(), &operators::default_catalog(), None);
    let second = generator::generate(&unit(), &operators::default_catalog(), None);
    assert_eq!(first, second);
}

#[test]
fn every_candidate_changes_exactly_one_line() {
    let original: Vec<&str> = RELEASE.split('\n').collect();
    for c in generator::generate(&unit(), &operators::default_catalog(), None) {
        let mutated: Vec<&str> = c.text.split('\n').collect();
        assert_eq!(mutated.len(), original.len(), "line count changed for #{}", c.id);
        let changed: Vec<usize> = (0..original.len())
            .filter(|&i| original[i] != mutated[i])
            .collect();
        assert_eq!(changed, vec![c.line - 1], "#{} {}", c.id, c.label);
    }
}

#[test]
fn fingerprint_hashes_mutated_text() {
    for c in generator::generate(&unit(), &operators::default_catalog(), Some(5)) {
        assert_eq!(c.fingerprint, Fingerprint::of(&c.text));
    }
}

#[test]
fn limit_keeps_a_prefix() {
    let all = generator::generate(&unit(), &operators::default_catalog(), None);
    let some = generator::generate(&unit(), &operators::default_catalog(), Some(3));
    assert_eq!(some.len(), 3);
    assert_eq!(some[..], all[..3]);
}

#[test]
fn limit_larger_than_total_keeps_everything() {
    let all = generator::generate(&unit(), &operators::default_catalog(), None);
    let capped = generator::generate(&unit(), &operators::default_catalog(), Some(10_000));
    assert_eq!(all, capped);
}

#[test]
fn no_matches_is_not_an_error() {
    let unit = SourceUnit::new("empty.adb", "package Empty is\nend Empty;\n");
    assert!(generator::generate(&unit, &operators::default_catalog(), None).is_empty());
}

#[test]
fn memory_mutant_comes_first_and_keeps_priority() {
    let candidates = generator::generate(&unit(), &operators::default_catalog(), None);
    let first = &candidates[0];
    assert_eq!(first.operator, "Memory Management");
    assert_eq!(first.line, 7);
    assert_eq!(first.description(), "Line 7: Deallocate → (removed) [MEMORY LEAK]");
}

#[test]
fn distribution_counts_by_category() {
    let candidates = generator::generate(&unit(), &operators::default_catalog(), None);
    let counts = generator::distribution(&candidates);
    assert_eq!(counts.values().sum::<usize>(), candidates.len());
    assert_eq!(counts.get(&Category::MemoryLifecycle), Some(&1));
    assert_eq!(counts.get(&Category::ExceptionHandling), Some(&2));
}

#[test]
fn load_reads_file_and_extension() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("release.adb");
    std::fs::write(&path, RELEASE).unwrap();

    let unit = SourceUnit::load(&path).unwrap();
    assert_eq!(unit.text(), RELEASE);
    assert_eq!(unit.extension(), ".adb");
}

#[test]
fn load_missing_file_is_generation_error() {
    let err = SourceUnit::load(Path::new("/definitely/not/here.adb")).unwrap_err();
    assert!(matches!(err, GenerationError::Read { .. }));
    assert!(err.to_string().contains("here.adb"));
}
