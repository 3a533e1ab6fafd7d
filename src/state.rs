use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::generator::SourceUnit;
use crate::mutants::MutantRecord;
use crate::score::{self, ScoreCard, TestGap};

pub const REPORT_FILE: &str = "mutation_report.json";

/// All records of one run. Owned by the caller, lent to the pipeline, and
/// turned into a [`Report`] at the end.
#[derive(Debug)]
pub struct MutationSession {
    source: SourceUnit,
    output_dir: Utf8PathBuf,
    records: Vec<MutantRecord>,
}

impl MutationSession {
    pub fn new(source: SourceUnit, output_dir: Utf8PathBuf, records: Vec<MutantRecord>) -> Self {
        MutationSession {
            source,
            output_dir,
            records,
        }
    }

    pub fn source(&self) -> &SourceUnit {
        &self.source
    }

    pub fn output_dir(&self) -> &Utf8PathBuf {
        &self.output_dir
    }

    pub fn records(&self) -> &[MutantRecord] {
        &self.records
    }

    pub fn take_records(&mut self) -> Vec<MutantRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn replace_records(&mut self, records: Vec<MutantRecord>) {
        self.records = records;
    }

    pub fn score(&self) -> ScoreCard {
        ScoreCard::tally(&self.records)
    }
}

/// The exported outcome of a run.
#[derive(Debug, Serialize, Deserialize)]
pub struct Report {
    pub source: String,
    pub generated_at_ms: u64,
    /// No build tree was given: mutants were generated but not executed.
    pub dry_run: bool,
    pub summary: ScoreCard,
    pub gaps: Vec<TestGap>,
    pub mutants: Vec<MutantRecord>,
}

impl Report {
    pub fn from_session(session: &MutationSession, dry_run: bool) -> Self {
        Report {
            source: session.source().path().display().to_string(),
            generated_at_ms: now_ms(),
            dry_run,
            summary: session.score(),
            gaps: score::test_gaps(session.records(), session.source().text()),
            mutants: session.records().to_vec(),
        }
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(REPORT_FILE)
    }

    pub fn save(&self, dir: &Path) -> Result<PathBuf, ReportError> {
        let path = Report::path_in(dir);
        let json = serde_json::to_string_pretty(self).map_err(|source| ReportError::Json {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    pub fn load(dir: &Path) -> Result<Self, ReportError> {
        let path = Report::path_in(dir);
        let data = std::fs::read_to_string(&path).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ReportError::Json { path, source })
    }

    pub fn find(&self, id: usize) -> Option<&MutantRecord> {
        self.mutants.iter().find(|m| m.id() == id)
    }

    pub fn gap(&self, id: usize) -> Option<&TestGap> {
        self.gaps.iter().find(|g| g.id == id)
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
