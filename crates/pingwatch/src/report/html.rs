//! HTML rendering of a [`RunReport`].

use std::fmt::Write;

use super::{RunReport, fmt_hms};
use crate::scheduler::StopReason;

const STYLE: &str = r#"
        body { font-family: Arial, sans-serif; margin: 20px; background-color: #f5f5f5; }
        .container { max-width: 1200px; margin: 0 auto; background-color: white; padding: 20px; border-radius: 10px; }
        .header { background-color: #2c3e50; color: white; padding: 20px; border-radius: 5px; margin-bottom: 20px; }
        .system-info { background-color: #ecf0f1; padding: 10px; border-radius: 5px; margin-bottom: 20px; font-size: 14px; }
        .stats { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 15px; margin-bottom: 30px; }
        .stat-box { background-color: #ecf0f1; padding: 15px; border-radius: 5px; text-align: center; }
        .stat-number { font-size: 24px; font-weight: bold; color: #2c3e50; }
        .stat-label { color: #7f8c8d; margin-top: 5px; }
        table { width: 100%; border-collapse: collapse; margin-top: 20px; }
        th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
        th { background-color: #34495e; color: white; }
        .alert { background-color: #e74c3c; color: white; padding: 10px; border-radius: 5px; margin-bottom: 20px; }
        .success { background-color: #27ae60; color: white; padding: 10px; border-radius: 5px; margin-bottom: 20px; }
        .warning { background-color: #f39c12; color: white; padding: 10px; border-radius: 5px; margin-bottom: 20px; }
        .summary { margin-top: 30px; padding: 15px; background-color: #f8f9fa; border-radius: 5px; }
"#;

/// Escape text for inclusion in HTML content and attributes
fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn stat_box(out: &mut String, value: &str, label: &str) {
    let _ = write!(
        out,
        "<div class=\"stat-box\"><div class=\"stat-number\">{}</div><div class=\"stat-label\">{}</div></div>",
        escape(value),
        label
    );
}

/// Render the report as a standalone HTML page
pub fn render(report: &RunReport) -> String {
    let target = escape(&report.target);
    let mut out = String::new();

    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html>\n<head>\n<title>Ping Monitor Report - {target}</title>\n\
         <meta charset=\"UTF-8\">\n<style>{STYLE}</style>\n</head>\n<body>\n<div class=\"container\">\n"
    );

    // Configuration summary
    let _ = write!(
        out,
        "<div class=\"header\"><h1>Ping Monitor Report</h1><p><strong>Target:</strong> {target} | \
         <strong>Method:</strong> {} | <strong>Interval:</strong> {} ms | <strong>Run:</strong> {}</p>\
         <p><strong>Started:</strong> {} | <strong>Ended:</strong> {} ({})</p></div>\n",
        report.method,
        report.probe_interval_ms,
        report.run_id,
        escape(&report.timestamp(report.started_at)),
        escape(&report.timestamp(report.ended_at)),
        match report.stop_reason {
            StopReason::DurationElapsed => "duration elapsed",
            StopReason::Cancelled => "stopped by user",
        }
    );
    let _ = writeln!(
        out,
        "<div class=\"system-info\"><strong>System:</strong> {} | <strong>Time basis:</strong> {}</div>",
        escape(&report.platform),
        report.time_basis
    );

    for warning in &report.warnings {
        let _ = writeln!(out, "<div class=\"warning\"><strong>Warning:</strong> {}</div>", escape(warning));
    }

    if !report.has_data() {
        let _ = writeln!(out, "<div class=\"alert\"><strong>No data collected.</strong></div>");
        let _ = writeln!(out, "<div class=\"summary\"><p>{}</p></div>", escape(&report.conclusion));
        out.push_str("</div>\n</body>\n</html>\n");
        return out;
    }

    // Aggregate statistics
    out.push_str("<div class=\"stats\">");
    stat_box(&mut out, &fmt_hms(report.duration()), "Monitoring Duration");
    stat_box(&mut out, &report.total_probes.to_string(), "Total Pings");
    stat_box(&mut out, &report.total_drops.to_string(), "Dropped Packets");
    stat_box(
        &mut out,
        &format!("{:.2}%", report.success_rate.unwrap_or(1.0) * 100.0),
        "Success Rate",
    );
    stat_box(&mut out, &report.longest_streak.to_string(), "Max Consecutive Drops");
    if let Some(latency) = &report.latency {
        stat_box(
            &mut out,
            &format!("{:.1} / {:.1} / {:.1} ms", latency.min_ms, latency.avg_ms, latency.max_ms),
            "RTT min / avg / max",
        );
    }
    out.push_str("</div>\n");

    if report.total_drops > 0 {
        let _ = writeln!(
            out,
            "<div class=\"alert\"><strong>Issue Detected:</strong> Packet loss detected during monitoring period.</div>"
        );
    } else {
        let _ = writeln!(
            out,
            "<div class=\"success\"><strong>Good News:</strong> No packet loss detected during monitoring period.</div>"
        );
    }

    // Drop events
    out.push_str("<h2>Drop Events</h2>\n");
    if report.events.is_empty() {
        out.push_str("<p>No drops detected.</p>\n");
    } else {
        out.push_str(
            "<table><thead><tr><th>Start</th><th>End</th><th>Consecutive Drops</th><th>Duration</th>\
             <th>Notes</th></tr></thead><tbody>",
        );
        for event in &report.events {
            let end = event.end_time.map(|t| report.timestamp(t)).unwrap_or_default();
            let duration = event
                .duration()
                .and_then(|d| d.to_std().ok())
                .map(fmt_hms)
                .unwrap_or_default();
            let note = if event.unresolved { "Unresolved at end of run" } else { "Recovered" };
            let _ = write!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&report.timestamp(event.start_time)),
                escape(&end),
                event.consecutive_count,
                duration,
                note
            );
        }
        out.push_str("</tbody></table>\n");
    }

    // Hourly breakdown
    out.push_str("<h2>Hourly Drop Analysis</h2>\n");
    if report.hourly.is_empty() {
        out.push_str("<p>No drops detected.</p>\n");
    } else {
        out.push_str("<table><thead><tr><th>Hour</th><th>Drops</th></tr></thead><tbody>");
        for bucket in &report.hourly {
            let _ = write!(out, "<tr><td>{:02}:00</td><td>{}</td></tr>", bucket.hour, bucket.drops);
        }
        out.push_str("</tbody></table>\n");
    }

    // ISP-facing summary
    let band = report.band.map(|b| b.label()).unwrap_or("n/a");
    let _ = write!(
        out,
        "<div class=\"summary\"><h3>Report Summary for ISP</h3>\
         <p><strong>Test Method:</strong> Continuous {} probing of {target} over {}.</p>\
         <p><strong>Results:</strong> {} drops out of {} probes ({:.3}% loss rate).</p>\
         <p><strong>Assessment:</strong> {band}</p>\
         <p><strong>Recommendation:</strong> {}</p></div>\n",
        report.method,
        fmt_hms(report.duration()),
        report.total_drops,
        report.total_probes,
        report.loss_percent().unwrap_or(0.0),
        escape(&report.conclusion)
    );

    out.push_str("</div>\n</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeBasis;
    use crate::probe::ProbeMethod;
    use crate::report::{HourlyDrops, SuccessBand};
    use crate::tracker::DropEvent;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn report(total_probes: u64, total_drops: u64) -> RunReport {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        RunReport {
            run_id: Uuid::nil(),
            target: "<script>".to_string(),
            method: ProbeMethod::System,
            platform: "linux x86_64".to_string(),
            probe_interval_ms: 1000,
            max_duration_secs: None,
            time_basis: TimeBasis::Utc,
            started_at: start,
            ended_at: start + chrono::Duration::seconds(3600),
            stop_reason: StopReason::Cancelled,
            total_probes,
            total_drops,
            success_rate: (total_probes > 0)
                .then(|| 1.0 - total_drops as f64 / total_probes as f64),
            band: SuccessBand::from_counts(total_probes, total_drops),
            longest_streak: total_drops as u32,
            hourly: if total_drops > 0 { vec![HourlyDrops { hour: 9, drops: total_drops }] } else { vec![] },
            events: if total_drops > 0 {
                vec![DropEvent {
                    start_time: start,
                    end_time: Some(start + chrono::Duration::seconds(total_drops as i64)),
                    consecutive_count: total_drops as u32,
                    unresolved: true,
                }]
            } else {
                vec![]
            },
            latency: None,
            conclusion: "done".to_string(),
            warnings: vec!["log writes failed".to_string()],
        }
    }

    #[test]
    fn test_render_escapes_target() {
        let html = render(&report(10, 0));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<title>Ping Monitor Report - <script>"));
    }

    #[test]
    fn test_render_zero_drops() {
        let html = render(&report(10, 0));
        assert!(html.contains("No drops detected."));
        assert!(html.contains("Good News"));
        assert!(html.contains("log writes failed"));
    }

    #[test]
    fn test_render_zero_probes() {
        let html = render(&report(0, 0));
        assert!(html.contains("No data collected."));
        assert!(!html.contains("Hourly Drop Analysis"));
    }

    #[test]
    fn test_render_with_drops() {
        let html = render(&report(100, 3));
        assert!(html.contains("<td>09:00</td><td>3</td>"));
        assert!(html.contains("Unresolved at end of run"));
        assert!(html.contains("3.000% loss rate"));
        assert!(html.contains("Noticeable issues"));
    }
}
