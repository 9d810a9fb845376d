use crate::benchmark::{ComparisonReport, RunResult};
use crate::error::HarnessError;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};
use vb_runtime::{RunEvent, RunMode};

pub const REPORT_SCHEMA_VERSION: u8 = 1;

const CASE_WIDTH: usize = 30;
const LABEL_WIDTH: usize = 24;
const TIME_WIDTH: usize = 14;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub cases: usize,
    pub candidates: usize,
    pub passed: usize,
    pub mismatched: usize,
    pub errored: usize,
    pub failed_cases: usize,
}

impl RunSummary {
    #[must_use]
    pub fn from_reports(reports: &[ComparisonReport]) -> Self {
        let mut summary = Self {
            cases: reports.len(),
            ..Self::default()
        };
        for report in reports {
            if report.error.is_some() {
                summary.failed_cases += 1;
            }
            for cand in &report.candidates {
                summary.candidates += 1;
                match &cand.result.error {
                    None => summary.passed += 1,
                    Some(HarnessError::OutputMismatch { .. }) => summary.mismatched += 1,
                    Some(_) => summary.errored += 1,
                }
            }
        }
        summary
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_cases == 0 && self.passed == self.candidates
    }
}

fn timing_cell(result: &RunResult) -> String {
    match &result.error {
        Some(err) => err.report_marker().to_string(),
        None => format!("{:.6}s", result.elapsed_seconds),
    }
}

/// Aligned plain-text rendering, one row per implementation.
#[must_use]
pub fn render_text(reports: &[ComparisonReport]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<CASE_WIDTH$} {:<LABEL_WIDTH$} {:>TIME_WIDTH$}  speedup",
        "case", "implementation", "elapsed"
    );

    for report in reports {
        let _ = writeln!(
            out,
            "{:<CASE_WIDTH$} {:<LABEL_WIDTH$} {:>TIME_WIDTH$}",
            report.case_name,
            report.reference.impl_label,
            timing_cell(&report.reference)
        );
        if let Some(err) = &report.reference.error {
            let _ = writeln!(out, "{:<CASE_WIDTH$}   ! {err}", "");
        }

        for cand in &report.candidates {
            let speedup = match (&cand.speedup, &cand.result.error) {
                (Some(s), _) => s.to_string(),
                (None, Some(_)) => String::new(),
                (None, None) => "n/a".to_string(),
            };
            let _ = writeln!(
                out,
                "{:<CASE_WIDTH$} {:<LABEL_WIDTH$} {:>TIME_WIDTH$}  {speedup}",
                "",
                cand.result.impl_label,
                timing_cell(&cand.result)
            );
            if let Some(err) = &cand.result.error {
                let _ = writeln!(out, "{:<CASE_WIDTH$}   ! {err}", "");
            }
        }
    }

    let summary = RunSummary::from_reports(reports);
    let _ = writeln!(
        out,
        "{} cases, {} candidates: {} passed, {} mismatched, {} errors, {} failed cases",
        summary.cases,
        summary.candidates,
        summary.passed,
        summary.mismatched,
        summary.errored,
        summary.failed_cases
    );
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkArtifact<'a> {
    pub schema_version: u8,
    pub generated_at_unix_ms: u128,
    pub git_commit: String,
    pub mode: RunMode,
    pub summary: RunSummary,
    pub reports: &'a [ComparisonReport],
    /// Harness ledger, in the order events were recorded.
    pub events: &'a [RunEvent],
}

fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn git_commit_short(repo_root: &Path) -> String {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .current_dir(repo_root)
        .output();

    match output {
        Ok(out) if out.status.success() => {
            String::from_utf8_lossy(&out.stdout).trim().to_string()
        }
        _ => "unknown".to_string(),
    }
}

#[must_use]
pub fn build_artifact<'a>(
    repo_root: &Path,
    mode: RunMode,
    reports: &'a [ComparisonReport],
    events: &'a [RunEvent],
) -> BenchmarkArtifact<'a> {
    BenchmarkArtifact {
        schema_version: REPORT_SCHEMA_VERSION,
        generated_at_unix_ms: now_unix_ms(),
        git_commit: git_commit_short(repo_root),
        mode,
        summary: RunSummary::from_reports(reports),
        reports,
        events,
    }
}

pub fn render_json(artifact: &BenchmarkArtifact<'_>) -> Result<String, HarnessError> {
    serde_json::to_string_pretty(artifact)
        .map_err(|err| HarnessError::Serialize(format!("failed serializing report: {err}")))
}

pub fn write_report_json(
    path: &Path,
    artifact: &BenchmarkArtifact<'_>,
) -> Result<(), HarnessError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            HarnessError::Io(format!("failed creating {}: {err}", parent.display()))
        })?;
    }
    let raw = render_json(artifact)?;
    fs::write(path, raw)
        .map_err(|err| HarnessError::Io(format!("failed writing {}: {err}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::{RunSummary, build_artifact, render_text, write_report_json};
    use crate::benchmark::{Harness, RunOptions, Speedup, run_case};
    use crate::case::IdiomCase;
    use crate::digest::EqualityPolicy;
    use crate::output::Output;
    use std::fs;

    fn temp_file(name: &str) -> std::path::PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        std::env::temp_dir().join(format!("vb_{name}_{ts}.json"))
    }

    fn mixed_case() -> IdiomCase<i64> {
        IdiomCase::new(
            "mixed",
            "one good, one wrong, one failing",
            EqualityPolicy::Exact,
            || Ok(5),
            |x| Ok(Output::Int(i128::from(x) * 2)),
        )
        .candidate("good", |x| Ok(Output::Int(i128::from(x) + i128::from(x))))
        .candidate("wrong", |x| Ok(Output::Int(i128::from(x))))
        .candidate("failing", |_| Err("unsupported".to_string()))
    }

    #[test]
    fn text_report_marks_failures_instead_of_timings() {
        let report = run_case(&mixed_case(), &RunOptions::default()).expect("run");
        let text = render_text(std::slice::from_ref(&report));
        let wrong = text
            .lines()
            .find(|l| l.contains("wrong"))
            .expect("wrong row");
        assert!(wrong.contains("MISMATCH"), "{text}");
        let failing = text
            .lines()
            .find(|l| l.contains("failing") && !l.contains('!'))
            .expect("failing row");
        assert!(failing.contains("ERROR"), "{text}");
        assert!(text.contains("1 passed, 1 mismatched, 1 errors"), "{text}");
    }

    #[test]
    fn sentinel_renders_without_infinity() {
        let mut report = run_case(&mixed_case(), &RunOptions::default()).expect("run");
        report.candidates[0].result.elapsed_seconds = 0.0;
        report.candidates[0].speedup = Some(Speedup::TooFastToMeasure);
        let text = render_text(std::slice::from_ref(&report));
        assert!(text.contains("too fast to measure"));
        assert!(!text.contains("inf"));
        assert!(!text.contains("NaN"));
    }

    #[test]
    fn check_only_rows_show_na() {
        let report = run_case(&mixed_case(), &RunOptions::check_only()).expect("run");
        let text = render_text(std::slice::from_ref(&report));
        let good = text.lines().find(|l| l.contains("good")).expect("good row");
        assert!(good.trim_end().ends_with("n/a"), "{good}");
    }

    #[test]
    fn summary_counts_outcomes() {
        let report = run_case(&mixed_case(), &RunOptions::check_only()).expect("run");
        let summary = RunSummary::from_reports(std::slice::from_ref(&report));
        assert_eq!(summary.candidates, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.mismatched, 1);
        assert_eq!(summary.errored, 1);
        assert!(!summary.all_passed());
    }

    #[test]
    fn json_report_is_written() {
        let mut harness = Harness::new(&RunOptions::default()).expect("harness");
        let reports = vec![harness.run_case(&mixed_case())];
        let output_path = temp_file("report");
        let repo_root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..");
        let artifact = build_artifact(
            &repo_root,
            harness.plan().mode,
            &reports,
            harness.ledger().events(),
        );
        write_report_json(&output_path, &artifact).expect("write");

        let raw = fs::read_to_string(&output_path).expect("report readable");
        let parsed: serde_json::Value = serde_json::from_str(&raw).expect("report json parse");
        assert_eq!(parsed["schema_version"], 1);
        assert_eq!(parsed["mode"], "benchmark");
        assert_eq!(parsed["reports"][0]["case_name"], "mixed");
        assert_eq!(
            parsed["reports"][0]["candidates"][1]["result"]["error"]["output_mismatch"]["label"],
            "wrong"
        );
        let kinds: Vec<&str> = parsed["events"]
            .as_array()
            .expect("events array")
            .iter()
            .filter_map(|e| e["kind"].as_str())
            .collect();
        assert_eq!(kinds, vec!["case_started", "output_mismatch", "case_finished"]);
        assert_eq!(parsed["events"][1]["case_name"], "mixed");

        let _ = fs::remove_file(output_path);
    }
}
