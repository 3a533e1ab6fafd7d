use std::fmt;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::StatusError;
use crate::operators::{Category, Priority};

/// MD5 hex digest of a mutant's full text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(text: &str) -> Self {
        Fingerprint(format!("{:x}", md5::compute(text.as_bytes())))
    }

    /// First eight hex digits, used in artifact names.
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutantCandidate {
    pub id: usize,
    pub fingerprint: Fingerprint,
    pub operator: String,
    pub category: Category,
    pub priority: Priority,
    pub line: usize,
    pub label: String,
    #[serde(skip)]
    pub text: String,
}

impl MutantCandidate {
    pub fn description(&self) -> String {
        format!("Line {}: {}", self.line, self.label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutantStatus {
    Pending,
    Applied,
    Compiled,
    CompileError,
    Killed,
    Survived,
    Timeout,
}

impl MutantStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MutantStatus::CompileError
                | MutantStatus::Killed
                | MutantStatus::Survived
                | MutantStatus::Timeout
        )
    }

    /// Killed or survived: the only outcomes that count towards the score.
    pub fn is_conclusive(&self) -> bool {
        matches!(self, MutantStatus::Killed | MutantStatus::Survived)
    }

    fn can_advance_to(&self, next: MutantStatus) -> bool {
        use MutantStatus::*;
        matches!(
            (self, next),
            (Pending, Applied)
                | (Applied, CompileError)
                | (Applied, Compiled)
                | (Compiled, Killed)
                | (Compiled, Survived)
                | (Compiled, Timeout)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MutantStatus::Pending => "PENDING",
            MutantStatus::Applied => "APPLIED",
            MutantStatus::Compiled => "COMPILED",
            MutantStatus::CompileError => "COMPILE_ERROR",
            MutantStatus::Killed => "KILLED",
            MutantStatus::Survived => "SURVIVED",
            MutantStatus::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for MutantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutantRecord {
    #[serde(flatten)]
    pub candidate: MutantCandidate,
    pub status: MutantStatus,
    /// Set once the tracked file has been put back after this mutant ran.
    pub restored: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Utf8PathBuf>,
    #[serde(default)]
    pub build_ms: u64,
    #[serde(default)]
    pub test_ms: u64,
}

impl MutantRecord {
    pub fn new(candidate: MutantCandidate) -> Self {
        MutantRecord {
            candidate,
            status: MutantStatus::Pending,
            restored: false,
            note: None,
            artifact: None,
            build_ms: 0,
            test_ms: 0,
        }
    }

    pub fn id(&self) -> usize {
        self.candidate.id
    }

    /// Move forward along PENDING → APPLIED → … ; never backwards.
    pub fn advance(&mut self, next: MutantStatus) -> Result<(), StatusError> {
        if !self.status.can_advance_to(next) {
            return Err(StatusError {
                id: self.id(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn mark_restored(&mut self) {
        self.restored = true;
    }
}
