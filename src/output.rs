use std::collections::BTreeMap;

use console::Style;

use crate::mutants::{MutantRecord, MutantStatus};
use crate::operators::{Category, MutationOperator};
use crate::score::TestGap;
use crate::state::Report;

pub fn print_error(msg: &str) {
    let style = Style::new().red().bold();
    eprintln!("{} {}", style.apply_to("✗"), msg);
}

pub fn print_success(msg: &str) {
    let style = Style::new().green().bold();
    println!("{} {}", style.apply_to("✓"), msg);
}

pub fn print_distribution(counts: &BTreeMap<Category, usize>) {
    let dim = Style::new().dim();
    println!("Mutant distribution:");
    for (category, count) in counts {
        println!("  {} {:20} {:3}", dim.apply_to("·"), category.as_str(), count);
    }
}

fn status_symbol(status: MutantStatus) -> console::StyledObject<&'static str> {
    match status {
        MutantStatus::Killed => Style::new().green().bold().apply_to("✓"),
        MutantStatus::Survived => Style::new().red().bold().apply_to("✗"),
        MutantStatus::CompileError => Style::new().yellow().apply_to("⚠"),
        MutantStatus::Timeout => Style::new().yellow().apply_to("⏱"),
        _ => Style::new().dim().apply_to("·"),
    }
}

/// One line per finished mutant, printed as workers report back.
pub fn print_progress(record: &MutantRecord) {
    let c = &record.candidate;
    println!(
        "  Mutant {:3} [{:18}] {} {:13} - {}",
        c.id,
        c.category.as_str(),
        status_symbol(record.status),
        record.status.as_str(),
        c.description(),
    );
}

pub fn print_run_result(report: &Report) {
    let s = &report.summary;
    let counts = &s.counts;
    let dim = Style::new().dim();

    if report.dry_run {
        print_success(&format!(
            "{}: {} mutants generated (no build tree, nothing executed)",
            report.source, counts.total
        ));
        return;
    }

    let headline = format!(
        "{}: {:.1}% mutation score ({} killed / {} conclusive)",
        report.source,
        s.score,
        counts.killed,
        counts.conclusive(),
    );
    if counts.survived == 0 {
        print_success(&headline);
    } else {
        let style = Style::new().yellow().bold();
        println!("{} {}", style.apply_to("!"), headline);
    }

    println!("  {} {} total", dim.apply_to("·"), counts.total);
    println!("  {} {} killed", dim.apply_to("·"), counts.killed);
    println!("  {} {} survived (test gaps)", dim.apply_to("·"), counts.survived);
    if counts.inconclusive() > 0 {
        println!(
            "  {} {} inconclusive: {} compile errors, {} timeouts (excluded from score)",
            dim.apply_to("·"),
            counts.inconclusive(),
            counts.compile_error,
            counts.timeout,
        );
    }
    if counts.pending > 0 {
        println!("  {} {} not executed", dim.apply_to("·"), counts.pending);
    }

    if report.gaps.is_empty() {
        return;
    }
    println!();
    println!("Test gaps (survived mutants):");
    for gap in &report.gaps {
        print_gap_line(gap);
    }
}

fn print_gap_line(gap: &TestGap) {
    let ref_style = Style::new().cyan().bold();
    let loc_style = Style::new().dim();
    let op_style = Style::new().magenta();
    println!(
        "  {} line {} {} {} {}",
        ref_style.apply_to(format!("#{}", gap.id)),
        gap.line,
        loc_style.apply_to(format!("[{} {}]", gap.priority, gap.category)),
        op_style.apply_to(&gap.label),
        loc_style.apply_to(&gap.operator),
    );
}

pub fn print_mutant_detail(record: &MutantRecord, gap: Option<&TestGap>) {
    let c = &record.candidate;
    let ref_style = Style::new().cyan().bold();
    let dim = Style::new().dim();

    println!(
        "{} {} [{} {}] {}",
        ref_style.apply_to(format!("#{}", c.id)),
        c.description(),
        c.priority,
        c.category,
        status_symbol(record.status),
    );
    println!("  {} status      {}", dim.apply_to("·"), record.status);
    println!("  {} operator    {}", dim.apply_to("·"), c.operator);
    println!("  {} fingerprint {}", dim.apply_to("·"), c.fingerprint);
    if let Some(artifact) = &record.artifact {
        println!("  {} artifact    {}", dim.apply_to("·"), artifact);
    }
    if let Some(note) = &record.note {
        println!("  {} note        {}", dim.apply_to("·"), note);
    }

    if let Some(gap) = gap {
        println!();
        for line in gap.diff.lines() {
            if line.starts_with('-') {
                println!("  {}", Style::new().red().apply_to(line));
            } else if line.starts_with('+') {
                println!("  {}", Style::new().green().apply_to(line));
            }
        }
    }
}

pub fn print_status(report: &Report) {
    let counts = &report.summary.counts;
    println!(
        "Last run: {} mutants, {} killed, {} survived, {} inconclusive ({:.1}% score)",
        counts.total,
        counts.killed,
        counts.survived,
        counts.inconclusive(),
        report.summary.score,
    );

    if !report.gaps.is_empty() {
        println!();
        for gap in &report.gaps {
            print_gap_line(gap);
        }
        println!();
        println!("Use `patmut show <id>` for details on a specific mutant.");
    }
}

pub fn print_catalog(operators: &[MutationOperator]) {
    let name_style = Style::new().bold();
    let dim = Style::new().dim();
    for op in operators {
        println!(
            "{} {}",
            name_style.apply_to(op.name),
            dim.apply_to(format!("[{} {}]", op.priority, op.category)),
        );
        for rule in &op.rules {
            println!("  {} {}", dim.apply_to("·"), rule.label);
        }
    }
}
