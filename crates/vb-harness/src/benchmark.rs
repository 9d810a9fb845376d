use crate::case::{CaseRunner, Slot, call_guarded};
use crate::digest::{EqualityPolicy, OutputDigest, compare_digests, digest_output};
use crate::error::HarnessError;
use crate::registry::{Catalog, registered_cases};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use vb_runtime::{ExecutionPlan, RunEventKind, RunLedger, RunMode, plan_execution};

/// Elapsed times below this are indistinguishable from zero.
pub const TIMER_RESOLUTION_SECONDS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    pub mode: RunMode,
    pub warmup: bool,
    pub repetitions: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::Benchmark,
            warmup: true,
            repetitions: 1,
        }
    }
}

impl RunOptions {
    #[must_use]
    pub fn check_only() -> Self {
        Self {
            mode: RunMode::CheckOnly,
            warmup: false,
            repetitions: 1,
        }
    }

    pub fn plan(&self) -> Result<ExecutionPlan, HarnessError> {
        plan_execution(self.mode, self.warmup, self.repetitions).map_err(|err| {
            HarnessError::InvalidOptions(format!("{err} ({})", err.reason_code()))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileSummary {
    pub p50_seconds: f64,
    pub p95_seconds: f64,
    pub p99_seconds: f64,
    pub min_seconds: f64,
    pub max_seconds: f64,
}

fn percentile_index(len: usize, percentile_num: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let last = len - 1;
    (last * percentile_num + 50) / 100
}

#[must_use]
pub fn summarize_samples(samples: &[f64]) -> PercentileSummary {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let at = |p: usize| {
        sorted
            .get(percentile_index(sorted.len(), p))
            .copied()
            .unwrap_or(0.0)
    };

    PercentileSummary {
        p50_seconds: at(50),
        p95_seconds: at(95),
        p99_seconds: at(99),
        min_seconds: sorted.first().copied().unwrap_or(0.0),
        max_seconds: sorted.last().copied().unwrap_or(0.0),
    }
}

/// Outcome of timing one implementation of one case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub case_name: String,
    pub impl_label: String,
    /// Median of `samples_seconds`; 0 when nothing completed.
    pub elapsed_seconds: f64,
    pub samples_seconds: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentiles: Option<PercentileSummary>,
    pub output_digest: Option<OutputDigest>,
    pub succeeded: bool,
    pub error: Option<HarnessError>,
}

impl RunResult {
    fn failed(case_name: &str, impl_label: &str, samples: Vec<f64>, err: HarnessError) -> Self {
        Self {
            case_name: case_name.to_string(),
            impl_label: impl_label.to_string(),
            elapsed_seconds: summarize_samples(&samples).p50_seconds,
            samples_seconds: samples,
            percentiles: None,
            output_digest: None,
            succeeded: false,
            error: Some(err),
        }
    }

    fn fail_with(&mut self, err: HarnessError) {
        self.succeeded = false;
        self.error = Some(err);
    }
}

/// Reference time over candidate time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Speedup {
    Ratio(f64),
    /// The candidate or the reference finished below timer resolution.
    TooFastToMeasure,
}

impl fmt::Display for Speedup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ratio(r) if *r >= 1.0 => write!(f, "{r:.2}x faster"),
            Self::Ratio(r) if *r > 0.0 => write!(f, "{:.2}x slower", 1.0 / r),
            Self::Ratio(r) => write!(f, "{r:.2}x"),
            Self::TooFastToMeasure => f.write_str("too fast to measure"),
        }
    }
}

#[must_use]
pub fn speedup_ratio(reference_seconds: f64, candidate_seconds: f64) -> Speedup {
    let measurable = |seconds: f64| seconds >= TIMER_RESOLUTION_SECONDS;
    if !(measurable(reference_seconds) && measurable(candidate_seconds)) {
        return Speedup::TooFastToMeasure;
    }
    Speedup::Ratio(reference_seconds / candidate_seconds)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateComparison {
    pub result: RunResult,
    pub speedup: Option<Speedup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub case_name: String,
    pub description: String,
    pub policy: EqualityPolicy,
    pub mode: RunMode,
    /// False when timings were not compared (check-only runs).
    pub measured: bool,
    pub reference: RunResult,
    pub candidates: Vec<CandidateComparison>,
    /// Case-level failure, set when the reference could not run.
    pub error: Option<HarnessError>,
}

impl ComparisonReport {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.error.is_none()
            && self.reference.succeeded
            && self.candidates.iter().all(|c| c.result.succeeded)
    }

    #[must_use]
    pub fn result_count(&self) -> usize {
        1 + self.candidates.len()
    }
}

/// Sequential executor bound to one [`ExecutionPlan`].
#[derive(Debug)]
pub struct Harness {
    plan: ExecutionPlan,
    ledger: RunLedger,
}

impl Harness {
    pub fn new(options: &RunOptions) -> Result<Self, HarnessError> {
        Ok(Self {
            plan: options.plan()?,
            ledger: RunLedger::new(),
        })
    }

    #[must_use]
    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    #[must_use]
    pub fn ledger(&self) -> &RunLedger {
        &self.ledger
    }

    pub fn run_case(&mut self, case: &dyn CaseRunner) -> ComparisonReport {
        let name = case.name();
        let policy = case.policy();
        let mode = self.plan.mode;
        info!(case = name, mode = mode.as_str(), "case started");
        self.ledger
            .record(mode, RunEventKind::CaseStarted, name, case.description());

        let slots: Vec<Slot> = std::iter::once(Slot::Reference)
            .chain((0..case.candidate_labels().len()).map(Slot::Candidate))
            .collect();

        if self.plan.warmup {
            for &slot in &slots {
                if let Ok(call) = case.prepare(slot) {
                    let _ = call_guarded(call);
                }
            }
        }

        let reference = self.measure(case, Slot::Reference);
        let mut candidates = Vec::with_capacity(slots.len() - 1);
        for &slot in &slots[1..] {
            let mut result = self.measure(case, slot);
            if result.succeeded {
                match (&reference.output_digest, &result.output_digest) {
                    (Some(expected), Some(actual)) => {
                        if let Err(detail) = compare_digests(expected, actual, policy) {
                            warn!(
                                case = name,
                                label = %result.impl_label,
                                %detail,
                                "output mismatch"
                            );
                            self.ledger.record(
                                mode,
                                RunEventKind::OutputMismatch,
                                name,
                                format!("{}: {detail}", result.impl_label),
                            );
                            result.fail_with(HarnessError::OutputMismatch {
                                label: result.impl_label.clone(),
                                detail,
                            });
                        }
                    }
                    _ => {
                        result.fail_with(HarnessError::ReferenceUnavailable(
                            result.impl_label.clone(),
                        ));
                    }
                }
            }

            let speedup = (result.succeeded && self.plan.measure_speedup)
                .then(|| speedup_ratio(reference.elapsed_seconds, result.elapsed_seconds));
            candidates.push(CandidateComparison { result, speedup });
        }

        let report = ComparisonReport {
            case_name: name.to_string(),
            description: case.description().to_string(),
            policy,
            mode,
            measured: self.plan.measure_speedup,
            error: reference.error.clone(),
            reference,
            candidates,
        };

        if let Some(err) = &report.error {
            self.ledger
                .record(mode, RunEventKind::CaseFailed, name, err.to_string());
        } else {
            let passed = report
                .candidates
                .iter()
                .filter(|c| c.result.succeeded)
                .count();
            info!(
                case = name,
                passed,
                candidates = report.candidates.len(),
                "case finished"
            );
            self.ledger.record(
                mode,
                RunEventKind::CaseFinished,
                name,
                format!("{passed}/{} candidates passed", report.candidates.len()),
            );
        }
        report
    }

    /// Runs every case in catalog order. A failing case yields an error-only
    /// report and never stops the run.
    pub fn run_all(&mut self, catalog: &Catalog) -> Vec<ComparisonReport> {
        catalog.iter().map(|case| self.run_case(case)).collect()
    }

    pub fn run_cases(&mut self, cases: &[Arc<dyn CaseRunner>]) -> Vec<ComparisonReport> {
        cases.iter().map(|case| self.run_case(case.as_ref())).collect()
    }

    fn measure(&self, case: &dyn CaseRunner, slot: Slot) -> RunResult {
        let case_name = case.name();
        let label = case.label(slot);
        let mut samples = Vec::with_capacity(self.plan.repetitions);
        let mut digest = None;

        for rep in 0..self.plan.repetitions {
            let call = match case.prepare(slot) {
                Ok(call) => call,
                Err(err) => {
                    error!(
                        case = case_name,
                        label = %label,
                        error = %err,
                        "input generation failed"
                    );
                    return RunResult::failed(case_name, &label, samples, err);
                }
            };

            let start = Instant::now();
            let outcome = call_guarded(call);
            let elapsed_seconds = start.elapsed().as_secs_f64();
            debug!(case = case_name, label = %label, rep, elapsed_seconds, "timed run");

            match outcome {
                Ok(output) => {
                    samples.push(elapsed_seconds);
                    if digest.is_none() {
                        digest = Some(digest_output(&output, case.policy()));
                    }
                }
                Err(detail) => {
                    let err = HarnessError::Execution {
                        label: label.clone(),
                        detail,
                    };
                    error!(
                        case = case_name,
                        label = %label,
                        error = %err,
                        "implementation failed"
                    );
                    return RunResult::failed(case_name, &label, samples, err);
                }
            }
        }

        let summary = summarize_samples(&samples);
        RunResult {
            case_name: case_name.to_string(),
            impl_label: label,
            elapsed_seconds: summary.p50_seconds,
            percentiles: (samples.len() > 1).then_some(summary),
            samples_seconds: samples,
            output_digest: digest,
            succeeded: true,
            error: None,
        }
    }
}

pub fn run_case(
    case: &dyn CaseRunner,
    options: &RunOptions,
) -> Result<ComparisonReport, HarnessError> {
    Ok(Harness::new(options)?.run_case(case))
}

pub fn run_all(
    catalog: &Catalog,
    options: &RunOptions,
) -> Result<Vec<ComparisonReport>, HarnessError> {
    Ok(Harness::new(options)?.run_all(catalog))
}

/// Runs the process-wide catalog in registration order. The registry lock is
/// released before the first case starts, so cases may register or look up
/// other cases.
pub fn run_registered(options: &RunOptions) -> Result<Vec<ComparisonReport>, HarnessError> {
    let mut harness = Harness::new(options)?;
    let cases = registered_cases::<&str>(&[])?;
    Ok(harness.run_cases(&cases))
}
