//! Report generation for allocation layouts.
//!
//! Renders a registry's layout as human-readable text or JSON.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::Serialize;

use crate::ip::AllocationRegistry;
use crate::layout::LayoutSegment;

/// Serializable snapshot of a registry and its layout
#[derive(Debug, Clone, Serialize)]
pub struct LayoutReport {
    pub summary: String,
    pub total_addresses: u128,
    pub allocated_addresses: u128,
    pub free_addresses: u128,
    pub utilisation: f64,
    pub canvas_extent: f64,
    pub segments: Vec<LayoutSegment>,
}

impl LayoutReport {
    pub fn new(registry: &AllocationRegistry, canvas_extent: f64) -> Self {
        LayoutReport {
            summary: registry.summary().to_string(),
            total_addresses: registry.summary().num_addresses(),
            allocated_addresses: registry.allocated_addresses(),
            free_addresses: registry.free_addresses(),
            utilisation: registry.utilisation(),
            canvas_extent,
            segments: registry.layout(canvas_extent),
        }
    }
}

/// Caption shown for a segment
pub fn segment_caption(segment: &LayoutSegment) -> String {
    match segment {
        LayoutSegment::Occupied { label, range, .. } => format!("{} ({})", label, range),
        LayoutSegment::Gap { addresses, .. } => format!("Available ({} addresses)", addresses),
    }
}

/// Render the layout as text, one line per segment
pub fn render_text(report: &LayoutReport) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!(
        "Summary: {} ({} addresses, {:.1}% allocated)",
        report.summary,
        report.total_addresses,
        report.utilisation * 100.0
    ));
    lines.push("-".repeat(80));

    for segment in &report.segments {
        let marker = if segment.is_gap() { ' ' } else { '#' };
        let range_text = match segment {
            LayoutSegment::Occupied { range, .. } => {
                format!("{} - {}", range.network_address(), range.broadcast_address())
            }
            LayoutSegment::Gap { first, last, .. } => format!("{} - {}", first, last),
        };
        lines.push(format!(
            "{} [{:>8.1} +{:>7.1}] {:<40} {}",
            marker,
            segment.offset(),
            segment.extent(),
            segment_caption(segment),
            range_text
        ));
    }

    lines.push("-".repeat(80));
    lines.push(format!(
        "Allocated: {}  Free: {}",
        report.allocated_addresses, report.free_addresses
    ));

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Render the layout as pretty-printed JSON
pub fn render_json(report: &LayoutReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize layout to JSON")
}

/// Write a text or JSON report to disk
pub fn write_report(report: &LayoutReport, output_path: &Path, json: bool) -> Result<()> {
    let content = if json {
        render_json(report)?
    } else {
        render_text(report)
    };

    fs::write(output_path, content)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    log::info!("Layout report written to {}", output_path.display());
    Ok(())
}

/// Print a short summary to stdout
pub fn print_summary(report: &LayoutReport) {
    println!("\n=== SUBNET ALLOCATION SUMMARY ===\n");
    println!("Summary: {}", report.summary);
    println!("Subnets: {}", report.segments.iter().filter(|s| !s.is_gap()).count());
    println!("Gaps: {}", report.segments.iter().filter(|s| s.is_gap()).count());
    println!("Utilisation: {:.1}%", report.utilisation * 100.0);
    println!();
}
