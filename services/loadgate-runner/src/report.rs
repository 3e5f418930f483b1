//! Report generation for gate runs

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use loadgate_core::{MetricRecord, Summary, Verdict};

/// Report format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Html,
    Json,
}

impl ReportFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Html => "performance_report.html",
            Self::Json => "performance_report.json",
        }
    }
}

/// Renders a run's records, summary and (optional) verdict.
pub struct ReportEmitter<'a> {
    records: &'a [MetricRecord],
    summary: &'a Summary,
    verdict: Option<&'a Verdict>,
    generated_at: DateTime<Local>,
}

impl<'a> ReportEmitter<'a> {
    pub fn new(records: &'a [MetricRecord], summary: &'a Summary, verdict: Option<&'a Verdict>) -> Self {
        Self {
            records,
            summary,
            verdict,
            generated_at: Local::now(),
        }
    }

    /// Write report into `dir`, returning the file path
    pub fn write_report(&self, dir: impl AsRef<Path>, format: ReportFormat) -> std::io::Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let path = dir.join(format.file_name());
        let mut file = File::create(&path)?;
        file.write_all(self.render(format).as_bytes())?;
        Ok(path)
    }

    pub fn render(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Html => self.generate_html(),
            ReportFormat::Json => self.generate_json(),
        }
    }

    /// Operator-facing summary block
    pub fn console_summary(&self) -> String {
        let rule = "=".repeat(60);
        format!(
            "{rule}\n🎯 TEST SUMMARY\n{rule}\n\
             Total Requests: {}\n\
             Success Rate: {:.2}%\n\
             Failed Requests: {}\n\
             Avg Response Time: {:.0} ms\n\
             P95 Response Time: {:.0} ms\n\
             Max Response Time: {:.0} ms\n\
             {rule}",
            group_thousands(self.summary.total_requests),
            self.summary.success_rate_pct,
            group_thousands(self.summary.total_failures),
            self.summary.avg_response_ms,
            self.summary.p95_response_ms,
            self.summary.max_response_ms,
        )
    }

    /// Generate JSON report
    fn generate_json(&self) -> String {
        let report = serde_json::json!({
            "timestamp": self.generated_at.to_rfc3339(),
            "summary": self.summary,
            "metrics": self.records,
            "verdict": self.verdict,
        });
        format!("{:#}", report)
    }

    /// Generate HTML report
    fn generate_html(&self) -> String {
        let s = self.summary;
        let success_class = if s.success_rate_pct >= 99.0 {
            "success"
        } else if s.success_rate_pct >= 95.0 {
            "warning"
        } else {
            "error"
        };

        let rows: String = self
            .records
            .iter()
            .map(|r| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.2}%</td>\
                     <td>{:.0}</td><td>{:.0}</td><td>{:.0}</td><td>{:.0}</td><td>{:.0}</td><td>{:.0}</td></tr>\n",
                    escape_html(r.method()),
                    escape_html(r.name()),
                    r.request_count(),
                    r.failure_count(),
                    r.failure_rate_pct(),
                    r.min_ms(),
                    r.average_ms(),
                    r.median_ms(),
                    r.p95_ms(),
                    r.p99_ms(),
                    r.max_ms(),
                )
            })
            .collect();

        let sla_section = match self.verdict {
            None => String::new(),
            Some(verdict) if verdict.passed() => {
                "<h2>SLA Validation</h2>\n<p class=\"pass\">✅ All SLAs met</p>\n".to_string()
            }
            Some(verdict) => {
                let items: String = verdict
                    .violations()
                    .iter()
                    .map(|v| format!("<li>{}</li>\n", escape_html(&v.to_string())))
                    .collect();
                format!(
                    "<h2>SLA Validation</h2>\n<p class=\"fail\">❌ {} violation(s)</p>\n<ul>\n{}</ul>\n",
                    verdict.violations().len(),
                    items
                )
            }
        };

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>API Performance Test Report</title>
<style>
body {{ font-family: sans-serif; margin: 20px; }}
.summary-grid {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); gap: 16px; }}
.summary-card {{ padding: 16px; border-left: 5px solid #667eea; background: #f5f7fa; }}
.summary-card.success {{ border-left-color: #10b981; }}
.summary-card.warning {{ border-left-color: #f59e0b; }}
.summary-card.error {{ border-left-color: #ef4444; }}
table {{ border-collapse: collapse; width: 100%; margin-top: 24px; }}
th, td {{ border: 1px solid #ddd; padding: 6px 10px; text-align: right; }}
td:nth-child(2), th:nth-child(2) {{ text-align: left; }}
.pass {{ color: #10b981; }}
.fail {{ color: #ef4444; }}
</style>
</head>
<body>
<h1>API Performance Test Report</h1>
<p class="timestamp">Generated: {}</p>
<div class="summary-grid">
<div class="summary-card"><h3>Total Requests</h3><p>{}</p></div>
<div class="summary-card {}"><h3>Success Rate</h3><p>{:.2}%</p></div>
<div class="summary-card"><h3>Failed Requests</h3><p>{}</p></div>
<div class="summary-card"><h3>Avg Response Time</h3><p>{:.0} ms</p></div>
<div class="summary-card"><h3>P95 Response Time</h3><p>{:.0} ms</p></div>
<div class="summary-card"><h3>P99 Response Time</h3><p>{:.0} ms</p></div>
<div class="summary-card"><h3>Min / Max Response Time</h3><p>{:.0} / {:.0} ms</p></div>
</div>
<table>
<tr><th>Method</th><th>Name</th><th>Requests</th><th>Failures</th><th>Failure Rate</th><th>Min</th><th>Avg</th><th>Median</th><th>P95</th><th>P99</th><th>Max</th></tr>
{}</table>
{}</body>
</html>
"#,
            self.generated_at.format("%Y-%m-%d %H:%M:%S"),
            group_thousands(s.total_requests),
            success_class,
            s.success_rate_pct,
            group_thousands(s.total_failures),
            s.avg_response_ms,
            s.p95_response_ms,
            s.p99_response_ms,
            s.min_response_ms,
            s.max_response_ms,
            rows,
            sla_section,
        )
    }
}

/// Itemized verdict for the console; every violation gets its own line.
pub fn verdict_lines(verdict: &Verdict) -> String {
    if verdict.passed() {
        return "✅ All SLAs met successfully!".to_string();
    }

    let mut out = String::from("❌ SLA Violations Found:");
    for violation in verdict.violations() {
        out.push_str("\n  - ");
        out.push_str(&violation.to_string());
    }
    out
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadgate_core::{aggregate, LatencyStats, Violation, ViolationKind};

    fn records() -> Vec<MetricRecord> {
        vec![MetricRecord::new(
            "GET /search?q=<x>",
            "GET",
            1500,
            15,
            LatencyStats {
                min_ms: 3.0,
                max_ms: 900.0,
                average_ms: 42.0,
                median_ms: 35.0,
                p95_ms: 180.0,
                p99_ms: 420.0,
            },
            1.0,
        )
        .unwrap()]
    }

    fn failed_verdict() -> Verdict {
        Verdict::from_violations(vec![Violation {
            endpoint: "GET /search?q=<x>".to_string(),
            kind: ViolationKind::P95,
            observed: 180.0,
            threshold: 100.0,
        }])
    }

    #[test]
    fn test_json_report_structure() {
        let records = records();
        let summary = aggregate(&records);
        let verdict = failed_verdict();
        let emitter = ReportEmitter::new(&records, &summary, Some(&verdict));

        let value: serde_json::Value =
            serde_json::from_str(&emitter.render(ReportFormat::Json)).unwrap();
        assert_eq!(value["summary"]["total_requests"], 1500);
        assert_eq!(value["metrics"][0]["name"], "GET /search?q=<x>");
        assert_eq!(value["metrics"][0]["p95_ms"], 180.0);
        assert_eq!(value["verdict"]["passed"], false);
        assert_eq!(value["verdict"]["violations"][0]["kind"], "p95");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_json_report_without_verdict() {
        let records = records();
        let summary = aggregate(&records);
        let emitter = ReportEmitter::new(&records, &summary, None);

        let value: serde_json::Value =
            serde_json::from_str(&emitter.render(ReportFormat::Json)).unwrap();
        assert!(value["verdict"].is_null());
    }

    #[test]
    fn test_html_report_escapes_and_lists_violations() {
        let records = records();
        let summary = aggregate(&records);
        let verdict = failed_verdict();
        let html = ReportEmitter::new(&records, &summary, Some(&verdict)).render(ReportFormat::Html);

        assert!(html.contains("GET /search?q=&lt;x&gt;"));
        assert!(!html.contains("<x>"));
        assert!(html.contains("1 violation(s)"));
        assert!(html.contains("P95 breach"));
        assert!(html.contains("1,500"));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::TempDir::new().unwrap();
        let records = records();
        let summary = aggregate(&records);
        let emitter = ReportEmitter::new(&records, &summary, None);

        let path = emitter
            .write_report(dir.path().join("nested"), ReportFormat::Html)
            .unwrap();
        assert!(path.ends_with("performance_report.html"));
        assert!(path.exists());
    }

    #[test]
    fn test_console_output() {
        let records = records();
        let summary = aggregate(&records);
        let text = ReportEmitter::new(&records, &summary, None).console_summary();
        assert!(text.contains("Total Requests: 1,500"));
        assert!(text.contains("Success Rate: 99.00%"));

        assert_eq!(
            verdict_lines(&failed_verdict()),
            "❌ SLA Violations Found:\n  - P95 breach: GET /search?q=<x> (180ms > 100ms)"
        );
        assert_eq!(
            verdict_lines(&Verdict::default()),
            "✅ All SLAs met successfully!"
        );
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
