//! Markdown summary generation
//!
//! This module generates a human-readable markdown report of a crawl run:
//! run metadata, unit outcomes, document counts and a per-unit table.

use crate::output::summary::{CrawlSummary, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Generates a markdown summary of a crawl run
///
/// # Arguments
///
/// * `summary` - The crawl summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();

    md.push_str("# Wenshu-Trawl Run Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", summary.run_id));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} hours)\n",
            duration,
            duration as f64 / 3600.0
        ));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Units**: {}\n", summary.total_units()));
    md.push_str(&format!("- **Result Pages**: {}\n", summary.pages_visited));
    md.push_str(&format!("- **Links Collected**: {}\n", summary.links_found));
    md.push_str(&format!("- **Documents Saved**: {}\n", summary.documents_saved));
    md.push_str(&format!("- **Documents Failed**: {}\n", summary.documents_failed));
    md.push_str(&format!("- **Documents Skipped**: {}\n", summary.documents_skipped));
    md.push_str(&format!("- **Success Rate**: {:.2}%\n\n", summary.success_rate()));

    if !summary.units_by_status.is_empty() {
        md.push_str("## Unit Outcomes\n\n");
        md.push_str("| Status | Units |\n");
        md.push_str("|--------|-------|\n");
        for (status, count) in &summary.units_by_status {
            md.push_str(&format!("| {} | {} |\n", status, count));
        }
        md.push('\n');
    }

    if !summary.units.is_empty() {
        md.push_str("## Units\n\n");
        md.push_str("| Date | Region | Category | Status | Pages | Links | Saved | Failed | Skipped |\n");
        md.push_str("|------|--------|----------|--------|-------|-------|-------|--------|---------|\n");
        for unit in &summary.units {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
                unit.date,
                unit.region,
                unit.case_category.as_deref().unwrap_or("-"),
                unit.status,
                unit.tally.pages_visited,
                unit.tally.links_found,
                unit.tally.documents_saved,
                unit.tally.documents_failed,
                unit.tally.documents_skipped
            ));
        }
        md.push('\n');
    }

    md
}
