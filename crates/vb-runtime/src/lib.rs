#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// How a harness invocation is allowed to spend time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Warm up when asked, time every repetition and compute speedups.
    Benchmark,
    /// Execute once per implementation to verify equivalence; no warmup and
    /// no speedup figures.
    CheckOnly,
}

impl RunMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Benchmark => "benchmark",
            Self::CheckOnly => "check_only",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("repetitions must be >= 1")]
    ZeroRepetitions,
}

impl PlanError {
    #[must_use]
    pub const fn reason_code(self) -> &'static str {
        match self {
            Self::ZeroRepetitions => "runtime_repetitions_invalid",
        }
    }
}

/// The concrete schedule derived from a mode plus caller preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub mode: RunMode,
    pub warmup: bool,
    pub repetitions: usize,
    pub measure_speedup: bool,
}

pub fn plan_execution(
    mode: RunMode,
    warmup: bool,
    repetitions: usize,
) -> Result<ExecutionPlan, PlanError> {
    if repetitions == 0 {
        return Err(PlanError::ZeroRepetitions);
    }
    Ok(match mode {
        RunMode::Benchmark => ExecutionPlan {
            mode,
            warmup,
            repetitions,
            measure_speedup: true,
        },
        RunMode::CheckOnly => ExecutionPlan {
            mode,
            warmup: false,
            repetitions: 1,
            measure_speedup: false,
        },
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEventKind {
    CaseStarted,
    CaseFinished,
    CaseFailed,
    OutputMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEvent {
    pub ts_millis: u128,
    pub mode: RunMode,
    pub kind: RunEventKind,
    pub case_name: String,
    pub note: String,
}

/// Append-only record of what one harness invocation did.
#[derive(Debug, Default, Clone)]
pub struct RunLedger {
    events: Vec<RunEvent>,
}

impl RunLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        mode: RunMode,
        kind: RunEventKind,
        case_name: &str,
        note: impl Into<String>,
    ) {
        let ts_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        self.events.push(RunEvent {
            ts_millis,
            mode,
            kind,
            case_name: case_name.to_string(),
            note: note.into(),
        });
    }

    #[must_use]
    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    #[must_use]
    pub fn count(&self, kind: RunEventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}
