use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::mutants::{MutantRecord, MutantStatus};
use crate::operators::{Category, Priority};
use crate::runner::generate_diff;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub killed: usize,
    pub survived: usize,
    pub compile_error: usize,
    pub timeout: usize,
    pub pending: usize,
}

impl StatusCounts {
    fn add(&mut self, status: MutantStatus) {
        self.total += 1;
        match status {
            MutantStatus::Killed => self.killed += 1,
            MutantStatus::Survived => self.survived += 1,
            MutantStatus::CompileError => self.compile_error += 1,
            MutantStatus::Timeout => self.timeout += 1,
            // Anything short of a terminal status never finished.
            MutantStatus::Pending | MutantStatus::Applied | MutantStatus::Compiled => {
                self.pending += 1
            }
        }
    }

    pub fn conclusive(&self) -> usize {
        self.killed + self.survived
    }

    pub fn inconclusive(&self) -> usize {
        self.compile_error + self.timeout
    }
}

/// Killed share of conclusive mutants, in percent. Zero when nothing was
/// conclusive.
pub fn mutation_score(killed: usize, survived: usize) -> f64 {
    let conclusive = killed + survived;
    if conclusive == 0 {
        return 0.0;
    }
    killed as f64 / conclusive as f64 * 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub score: f64,
    pub by_category: BTreeMap<Category, StatusCounts>,
}

impl ScoreCard {
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a MutantRecord>) -> Self {
        let mut counts = StatusCounts::default();
        let mut by_category: BTreeMap<Category, StatusCounts> = BTreeMap::new();
        for record in records {
            counts.add(record.status);
            by_category
                .entry(record.candidate.category)
                .or_default()
                .add(record.status);
        }
        ScoreCard {
            score: mutation_score(counts.killed, counts.survived),
            counts,
            by_category,
        }
    }

    /// `None` means no gate: the run fails on any survivor.
    pub fn passes(&self, min_score: Option<f64>) -> bool {
        match min_score {
            Some(min) => self.score >= min,
            None => self.counts.survived == 0,
        }
    }
}

/// A survived mutant: a defect the test suite did not notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestGap {
    pub id: usize,
    pub line: usize,
    pub operator: String,
    pub category: Category,
    pub priority: Priority,
    pub label: String,
    pub fingerprint: String,
    pub diff: String,
}

/// Survivors, most severe first, then by id. `original` is the unmutated
/// source used to render diffs.
pub fn test_gaps(records: &[MutantRecord], original: &str) -> Vec<TestGap> {
    let mut survivors: Vec<&MutantRecord> = records
        .iter()
        .filter(|r| r.status == MutantStatus::Survived)
        .collect();
    survivors.sort_by_key(|r| (r.candidate.priority, r.id()));
    survivors
        .into_iter()
        .map(|r| {
            let c = &r.candidate;
            TestGap {
                id: c.id,
                line: c.line,
                operator: c.operator.clone(),
                category: c.category,
                priority: c.priority,
                label: c.label.clone(),
                fingerprint: c.fingerprint.to_string(),
                diff: generate_diff(original, &c.text),
            }
        })
        .collect()
}
