use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::error::PersistError;
use crate::generator::SourceUnit;
use crate::mutants::{MutantCandidate, MutantRecord};
use crate::state::MutationSession;

pub const MANIFEST_FILE: &str = "mutants_metadata.json";

#[derive(Serialize)]
struct ManifestEntry<'a> {
    #[serde(flatten)]
    candidate: &'a MutantCandidate,
    artifact: &'a str,
}

/// `mutant_007_1a2b3c4d.adb`
pub fn artifact_name(candidate: &MutantCandidate, extension: &str) -> String {
    format!(
        "mutant_{:03}_{}{}",
        candidate.id,
        candidate.fingerprint.short(),
        extension
    )
}

/// Write one artifact per candidate plus the manifest, and hand back the
/// session that owns the resulting records. Safe to repeat: the same
/// candidates always land in the same files with the same bytes.
pub fn persist(
    unit: &SourceUnit,
    candidates: Vec<MutantCandidate>,
    output_dir: &Path,
) -> Result<MutationSession, PersistError> {
    std::fs::create_dir_all(output_dir).map_err(|source| PersistError::CreateDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let extension = unit.extension();
    let mut records = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let name = artifact_name(&candidate, &extension);
        write(&output_dir.join(&name), candidate.text.as_bytes())?;
        let mut record = MutantRecord::new(candidate);
        record.artifact = Some(Utf8PathBuf::from(name));
        records.push(record);
    }

    let manifest: Vec<ManifestEntry<'_>> = records
        .iter()
        .map(|r| ManifestEntry {
            candidate: &r.candidate,
            artifact: r.artifact.as_ref().map_or("", |a| a.as_str()),
        })
        .collect();
    let json = serde_json::to_string_pretty(&manifest)?;
    write(&output_dir.join(MANIFEST_FILE), json.as_bytes())?;
    log::info!(
        "persisted {} mutant(s) to {}",
        records.len(),
        output_dir.display()
    );

    Ok(MutationSession::new(
        unit.clone(),
        utf8(output_dir.to_path_buf())?,
        records,
    ))
}

fn write(path: &Path, contents: &[u8]) -> Result<(), PersistError> {
    std::fs::write(path, contents).map_err(|source| PersistError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn utf8(path: PathBuf) -> Result<Utf8PathBuf, PersistError> {
    Utf8PathBuf::from_path_buf(path).map_err(PersistError::NonUtf8Path)
}
