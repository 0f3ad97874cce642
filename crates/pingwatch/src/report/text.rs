use std::fmt::Write;

use super::{RunReport, fmt_hms};

/// Plain-text summary, also printed to the console at shutdown
pub fn render(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = render_into(report, &mut out);
    out
}

fn render_into(report: &RunReport, out: &mut String) -> std::fmt::Result {
    writeln!(out, "Ping monitor report for {} ({})", report.target, report.method)?;
    writeln!(out, "Run:      {}", report.run_id)?;
    writeln!(out, "System:   {}", report.platform)?;
    writeln!(out, "Started:  {}", report.timestamp(report.started_at))?;
    writeln!(out, "Ended:    {}", report.timestamp(report.ended_at))?;
    writeln!(out, "Duration: {}", fmt_hms(report.duration()))?;
    writeln!(out)?;

    for warning in &report.warnings {
        writeln!(out, "WARNING: {warning}")?;
    }

    if !report.has_data() {
        writeln!(out, "No data collected.")?;
        return Ok(());
    }

    writeln!(out, "{:<24} {:>12}", "Total probes", report.total_probes)?;
    writeln!(out, "{:<24} {:>12}", "Dropped", report.total_drops)?;
    writeln!(out, "{:<24} {:>11.2}%", "Success rate", report.success_rate.unwrap_or(1.0) * 100.0)?;
    writeln!(out, "{:<24} {:>12}", "Max consecutive drops", report.longest_streak)?;
    if let Some(latency) = &report.latency {
        writeln!(
            out,
            "{:<24} {:>12}",
            "RTT min/avg/max",
            format!("{:.1}/{:.1}/{:.1} ms", latency.min_ms, latency.avg_ms, latency.max_ms)
        )?;
    }
    if let Some(band) = report.band {
        writeln!(out, "{:<24} {:>12}", "Assessment", band.label())?;
    }
    writeln!(out)?;

    if report.hourly.is_empty() {
        writeln!(out, "No drops detected.")?;
    } else {
        writeln!(out, "Drops by hour:")?;
        for bucket in &report.hourly {
            writeln!(out, "  {:02}:00  {}", bucket.hour, bucket.drops)?;
        }
    }
    writeln!(out)?;
    writeln!(out, "{}", report.conclusion)?;

    Ok(())
}
