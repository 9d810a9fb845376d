#![forbid(unsafe_code)]

pub mod benchmark;
pub mod case;
pub mod catalog;
pub mod digest;
pub mod error;
pub mod logging;
pub mod output;
pub mod registry;
pub mod report;

use std::env;
use std::path::PathBuf;

pub use benchmark::{
    CandidateComparison, ComparisonReport, Harness, PercentileSummary, RunOptions, RunResult,
    Speedup, TIMER_RESOLUTION_SECONDS, run_all, run_case, run_registered, speedup_ratio,
};
pub use case::{CaseRunner, IdiomCase, PreparedCall, Slot};
pub use catalog::{CatalogSizes, FLOAT_TOLERANCE, builtin_catalog, install_builtin_catalog};
pub use digest::{EqualityPolicy, OutputDigest, compare_digests, digest_output};
pub use error::HarnessError;
pub use output::Output;
pub use registry::{Catalog, register, registered_cases, with_registry};
pub use vb_runtime::RunMode;

pub const REPORT_PATH_ENV: &str = "VECBENCH_REPORT_PATH";
pub const REPETITIONS_ENV: &str = "VECBENCH_REPETITIONS";
pub const SMOKE_ENV: &str = "VECBENCH_SMOKE";

#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    pub repo_root: PathBuf,
    pub report_path: PathBuf,
    pub sizes: CatalogSizes,
    pub options: RunOptions,
}

impl HarnessConfig {
    #[must_use]
    pub fn default_paths() -> Self {
        let repo_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..");
        Self {
            report_path: repo_root.join("artifacts/reports/idiom_benchmark_report.json"),
            repo_root,
            sizes: CatalogSizes::default(),
            options: RunOptions::default(),
        }
    }

    /// Defaults overlaid with `VECBENCH_*` environment variables.
    pub fn from_env() -> Result<Self, HarnessError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HarnessError> {
        let mut cfg = Self::default_paths();
        if let Some(path) = lookup(REPORT_PATH_ENV) {
            cfg.report_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(REPETITIONS_ENV) {
            cfg.options.repetitions = raw.trim().parse().map_err(|err| {
                HarnessError::InvalidOptions(format!("{REPETITIONS_ENV}={raw}: {err}"))
            })?;
            cfg.options.plan()?;
        }
        if let Some(raw) = lookup(SMOKE_ENV)
            && matches!(raw.trim(), "1" | "true" | "yes")
        {
            cfg.sizes = CatalogSizes::smoke();
        }
        Ok(cfg)
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}
