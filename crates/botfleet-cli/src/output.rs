//! Output formatting utilities

use crate::error::CliResult;
use botfleet_reconcile::{ApplyReport, ArtifactChange, Onboarding};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;
use tabled::{Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Print rows as a table, or serialize the raw records for json/yaml
pub fn print_output<R: Tabled, T: Serialize>(rows: Vec<R>, raw: &T, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Table => println!("{}", Table::new(rows)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(raw)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(raw)?),
    }
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// Spinner for the long waits; hidden automatically when not a terminal
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Summarize an apply pass
pub fn print_apply(name: &str, report: &ApplyReport) {
    if report.image_built {
        print_success("Built base image");
    }
    if report.seeded {
        print_success(&format!("Scaffolded workspace for {}", name.bold()));
    }
    for (label, change) in [("Secrets file", report.secrets), ("Gateway config", report.config)] {
        match change {
            ArtifactChange::Created => print_success(&format!("{} created", label)),
            ArtifactChange::Updated => print_success(&format!("{} updated", label)),
            ArtifactChange::Unchanged => {}
        }
    }
    if report.onboarding == Onboarding::Completed {
        print_success("Onboarding complete");
    }
    for warning in &report.warnings {
        print_warning(warning);
    }
    if report.restarted {
        print_success(&format!("Restarted {}", name.bold()));
    }
    if let Some(cmd) = &report.next_step {
        print_info(&format!("Start with: {}", cmd.cyan()));
    }
}
