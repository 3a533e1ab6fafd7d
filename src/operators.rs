//! Mutation operator catalog for Ada sources.
//! Every rule rewrites at most one code match on one line.
use std::fmt;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::scan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Arithmetic,
    Relational,
    Logical,
    BoundaryAttribute,
    ConstantBoundary,
    MemoryLifecycle,
    ReferenceCount,
    ExceptionHandling,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Arithmetic => "arithmetic",
            Category::Relational => "relational",
            Category::Logical => "logical",
            Category::BoundaryAttribute => "boundary-attribute",
            Category::ConstantBoundary => "constant-boundary",
            Category::MemoryLifecycle => "memory-lifecycle",
            Category::ReferenceCount => "reference-count",
            Category::ExceptionHandling => "exception-handling",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered most severe first, so an ascending sort puts `Critical` on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Critical => "CRITICAL",
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
enum Edit {
    /// Replace the first match; `${n}` in the template expands capture groups.
    Replace { pattern: Regex, template: &'static str },
    /// Turn the whole line into a comment.
    CommentOut { reason: &'static str },
}

#[derive(Debug)]
pub struct Rule {
    pub label: &'static str,
    guard: Option<Regex>,
    edit: Edit,
}

impl Rule {
    fn replace(label: &'static str, pattern: &str, template: &'static str) -> Self {
        Rule {
            label,
            guard: None,
            edit: Edit::Replace { pattern: re(pattern), template },
        }
    }

    fn comment_out(label: &'static str, guard: &str, reason: &'static str) -> Self {
        Rule {
            label,
            guard: Some(re(guard)),
            edit: Edit::CommentOut { reason },
        }
    }

    /// Only fire on lines whose code matches `guard`.
    fn when(mut self, guard: &str) -> Self {
        self.guard = Some(re(guard));
        self
    }

    /// Mutate one line. `masked` is `scan::mask(line)`.
    fn mutate(&self, line: &str, masked: &str) -> Option<String> {
        if let Some(guard) = &self.guard {
            if !guard.is_match(masked) {
                return None;
            }
        }
        let mutated = match &self.edit {
            Edit::Replace { pattern, template } => {
                let caps = pattern.captures(masked)?;
                let whole = caps.get(0)?;
                let replacement = expand(template, &caps, line);
                format!("{}{}{}", &line[..whole.start()], replacement, &line[whole.end()..])
            }
            Edit::CommentOut { reason } => format!(
                "{}-- {}  -- MUTANT: {}",
                scan::indentation(line),
                line.trim_start(),
                reason
            ),
        };
        (mutated != line).then_some(mutated)
    }
}

#[derive(Debug)]
pub struct MutationOperator {
    pub name: &'static str,
    pub category: Category,
    pub priority: Priority,
    /// Skip lines that contain `:=` entirely.
    pub skip_assignments: bool,
    pub rules: Vec<Rule>,
}

/// One rule application: the 1-based line it touched and the whole mutated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMutation {
    pub line: usize,
    pub label: &'static str,
    pub text: String,
}

impl MutationOperator {
    /// Every single-line mutation this operator produces for `source`, by
    /// line number, then rule order.
    pub fn apply(&self, source: &str) -> Vec<LineMutation> {
        let lines: Vec<&str> = source.split('\n').collect();
        let mut mutations = Vec::new();

        for (idx, raw) in lines.iter().enumerate() {
            let (body, eol) = scan::split_line_ending(raw);
            let masked = scan::mask(body);
            if self.skip_assignments && masked.contains(":=") {
                continue;
            }
            for rule in &self.rules {
                if let Some(edited) = rule.mutate(body, &masked) {
                    mutations.push(LineMutation {
                        line: idx + 1,
                        label: rule.label,
                        text: splice_line(&lines, idx, &format!("{edited}{eol}")),
                    });
                }
            }
        }

        mutations
    }
}

fn splice_line(lines: &[&str], idx: usize, replacement: &str) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(if i == idx { replacement } else { line });
    }
    out
}

/// Fill `${n}` in `template` with the text of group `n`, read from `line`
/// rather than the masked copy so blanked bytes never leak into a mutant.
fn expand(template: &str, caps: &Captures<'_>, line: &str) -> String {
    let mut out = String::new();
    let mut rest = template;
    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        if let Some(m) = after[..close].parse().ok().and_then(|n: usize| caps.get(n)) {
            out.push_str(line.get(m.range()).unwrap_or(m.as_str()));
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("catalog pattern is a valid regex")
}

/// Memory lifecycle: skipped deallocation (leak), allocation turned into null.
pub fn memory_management() -> MutationOperator {
    MutationOperator {
        name: "Memory Management",
        category: Category::MemoryLifecycle,
        priority: Priority::Critical,
        skip_assignments: false,
        rules: vec![
            Rule::comment_out(
                "Deallocate → (removed) [MEMORY LEAK]",
                r"\b(Deallocate|Free)\s*\(",
                "Skip deallocation",
            ),
            Rule::replace(
                "new T → null [NULL POINTER]",
                r"\bnew\s+[\w.]+('\([^)]*\))?",
                "null",
            ),
        ],
    }
}

/// Reference counting: off-by-one updates and dropped updates.
pub fn reference_counting() -> MutationOperator {
    MutationOperator {
        name: "Reference Counting",
        category: Category::ReferenceCount,
        priority: Priority::Critical,
        skip_assignments: false,
        rules: vec![
            Rule::replace("+1 → +2 [REF COUNT ERROR]", r"\+\s*1\b", "+ 2")
                .when(r"Ref_Count.*\+\s*1\b"),
            Rule::replace("-1 → -2 [REF COUNT ERROR]", r"-\s*1\b", "- 2")
                .when(r"Ref_Count.*-\s*1\b"),
            Rule::comment_out(
                "Ref_Count update → (removed)",
                r"\bRef_Count\s*:=",
                "Skip ref count",
            ),
        ],
    }
}

pub fn exception_handling() -> MutationOperator {
    MutationOperator {
        name: "Exception",
        category: Category::ExceptionHandling,
        priority: Priority::High,
        skip_assignments: false,
        rules: vec![
            Rule::comment_out(
                "raise → (removed) [ERROR MASKING]",
                r"\braise\s+\w+",
                "Exception suppressed",
            ),
            Rule::replace(
                "Constraint_Error → Program_Error",
                r"\braise(\s+)Constraint_Error\b",
                "raise${1}Program_Error",
            ),
        ],
    }
}

pub fn relational() -> MutationOperator {
    MutationOperator {
        name: "Relational",
        category: Category::Relational,
        priority: Priority::High,
        skip_assignments: true,
        rules: vec![
            Rule::replace("> → >=", r"(\s+)>(\s+)", "${1}>=${2}"),
            Rule::replace(">= → >", r"(\s+)>=(\s+)", "${1}>${2}"),
            Rule::replace("< → <=", r"(\s+)<(\s+)", "${1}<=${2}"),
            Rule::replace("<= → <", r"(\s+)<=(\s+)", "${1}<${2}"),
            Rule::replace("= → /=", r"(\s+)=(\s+)", "${1}/=${2}"),
            Rule::replace("/= → =", r"(\s+)/=(\s+)", "${1}=${2}"),
        ],
    }
}

pub fn logical() -> MutationOperator {
    MutationOperator {
        name: "Logical",
        category: Category::Logical,
        priority: Priority::High,
        skip_assignments: false,
        rules: vec![
            Rule::replace("and → or", r"\band\b", "or"),
            Rule::replace("or → and", r"\bor\b", "and"),
            Rule::replace("not → (removed)", r"\bnot\b\s*", ""),
        ],
    }
}

/// Range attributes: swap bounds, shorten lengths.
pub fn ada_attribute() -> MutationOperator {
    MutationOperator {
        name: "Ada Attribute",
        category: Category::BoundaryAttribute,
        priority: Priority::Medium,
        skip_assignments: false,
        rules: vec![
            Rule::replace("'First → 'Last", r"'First\b", "'Last"),
            Rule::replace("'Last → 'First", r"'Last\b", "'First"),
            Rule::replace("'Length → 'Length - 1", r"'Length\b", "'Length - 1"),
        ],
    }
}

pub fn arithmetic() -> MutationOperator {
    MutationOperator {
        name: "Arithmetic",
        category: Category::Arithmetic,
        priority: Priority::Medium,
        skip_assignments: false,
        rules: vec![
            Rule::replace("+ → -", r"(\s+)\+(\s+)", "${1}-${2}"),
            Rule::replace("- → +", r"(\s+)-(\s+)", "${1}+${2}"),
            Rule::replace("* → /", r"(\s+)\*(\s+)", "${1}/${2}"),
            Rule::replace("/ → *", r"(\s+)/(\s+)", "${1}*${2}"),
        ],
    }
}

/// 0 and 1 as the right operand of a comparison. `:=` and `=>` are not
/// comparisons and never match.
pub fn constant() -> MutationOperator {
    MutationOperator {
        name: "Constant",
        category: Category::ConstantBoundary,
        priority: Priority::Medium,
        skip_assignments: false,
        rules: vec![
            Rule::replace(
                "0 → 1",
                r"(^|[^:=<>/])(/=|<=|>=|=|<|>)(\s*)0\b",
                "${1}${2}${3}1",
            ),
            Rule::replace(
                "1 → 0",
                r"(^|[^:=<>/])(/=|<=|>=|=|<|>)(\s*)1\b",
                "${1}${2}${3}0",
            ),
        ],
    }
}

/// The full catalog in execution order.
pub fn default_catalog() -> Vec<MutationOperator> {
    vec![
        memory_management(),
        reference_counting(),
        exception_handling(),
        relational(),
        logical(),
        ada_attribute(),
        arithmetic(),
        constant(),
    ]
}
