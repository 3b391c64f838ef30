//! Reporting helpers for the import command

use console::style;
use tabled::{builder::Builder, settings::Style};

use crate::import::{Outcome, PipelineReport};

/// Print the JSON body of every payload a dry run would have submitted
pub fn print_planned(report: &PipelineReport) {
    for stage in &report.stages {
        for outcome in &stage.outcomes {
            if let Outcome::Planned { line, payload, .. } = outcome {
                println!(
                    "{} Row {}: Would create {} {}",
                    style("○").dim(),
                    line,
                    style(&stage.resource).cyan(),
                    payload
                );
            }
        }
    }
}

/// Render the per-stage summary table
pub fn summary_table(report: &PipelineReport) -> String {
    let mut builder = Builder::default();
    builder.push_record([
        "Stage",
        "Created",
        "Unresolved links",
        "Failed",
        "Skipped",
        "Duplicates",
        "Planned",
    ]);

    for stage in &report.stages {
        builder.push_record([
            stage.resource.clone(),
            stage.created().to_string(),
            stage.unresolved().to_string(),
            stage.failed().to_string(),
            stage.skipped().to_string(),
            stage.duplicates().to_string(),
            stage.planned().to_string(),
        ]);
    }

    if let Some(fix) = &report.state_fix {
        builder.push_record([
            "state fix".to_string(),
            fix.updated().to_string(),
            fix.unresolved().to_string(),
            fix.failed().to_string(),
            String::new(),
            String::new(),
            String::new(),
        ]);
    }

    builder.build().with(Style::markdown()).to_string()
}

pub fn print_summary(report: &PipelineReport) {
    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!("{}", style("Import Summary").bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("{}", summary_table(report));

    let failed: usize = report.stages.iter().map(|s| s.failed()).sum::<usize>()
        + report.state_fix.as_ref().map(|f| f.failed()).unwrap_or(0);
    if failed > 0 {
        println!("  Failed submissions: {}", style(failed).red());
    }
}
