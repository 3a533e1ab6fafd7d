use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::GenerationError;
use crate::mutants::{Fingerprint, MutantCandidate};
use crate::operators::{Category, MutationOperator};

/// A source file and the text it had when the session started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    path: PathBuf,
    text: String,
}

impl SourceUnit {
    pub fn load(path: &Path) -> Result<Self, GenerationError> {
        let text = std::fs::read_to_string(path).map_err(|source| GenerationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(SourceUnit::new(path, text))
    }

    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        SourceUnit {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// File extension including the dot, or an empty string.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default()
    }
}

/// Run `operators` over `unit` in order and number the results from 1.
/// `limit` keeps only the first N candidates.
pub fn generate(
    unit: &SourceUnit,
    operators: &[MutationOperator],
    limit: Option<usize>,
) -> Vec<MutantCandidate> {
    let cap = limit.unwrap_or(usize::MAX);
    let mut candidates = Vec::new();

    'operators: for op in operators {
        for mutation in op.apply(unit.text()) {
            if candidates.len() >= cap {
                break 'operators;
            }
            candidates.push(MutantCandidate {
                id: candidates.len() + 1,
                fingerprint: Fingerprint::of(&mutation.text),
                operator: op.name.to_string(),
                category: op.category,
                priority: op.priority,
                line: mutation.line,
                label: mutation.label.to_string(),
                text: mutation.text,
            });
        }
    }

    log::info!(
        "generated {} mutant(s) from {}",
        candidates.len(),
        unit.path().display()
    );
    candidates
}

/// Number of candidates per category.
pub fn distribution(candidates: &[MutantCandidate]) -> BTreeMap<Category, usize> {
    let mut counts = BTreeMap::new();
    for c in candidates {
        *counts.entry(c.category).or_insert(0) += 1;
    }
    counts
}
