use std::{fmt, path::PathBuf, time::Duration};

use extsync_config::extension::StoreKind;

/// Exit status reserved for failures that happen before any synchronization work.
pub const FATAL_EXIT_CODE: u8 = 255;

/// Outcome of installing one extension into one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    Skipped,
    Failed {
        error: String,
        /// The store cannot install on this platform at all.
        capability: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Fetch,
    Install,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Fetch => f.write_str("fetch"),
            FailureStage::Install => f.write_str("install"),
        }
    }
}

/// Info about a failed fetch or install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedInfo {
    pub store: StoreKind,
    pub identifier: String,
    pub stage: FailureStage,
    /// Set for install failures.
    pub profile: Option<PathBuf>,
    pub error: String,
    pub capability: bool,
}

/// Everything that happened to one extension: its fetch and the installs fanned out from it.
#[derive(Debug)]
pub struct ExtensionReport {
    pub store: StoreKind,
    pub identifier: String,
    pub fetch_error: Option<String>,
    pub installs: Vec<(PathBuf, InstallOutcome)>,
}

impl ExtensionReport {
    pub fn failed(&self) -> bool {
        self.fetch_error.is_some()
            || self
                .installs
                .iter()
                .any(|(_, outcome)| matches!(outcome, InstallOutcome::Failed { .. }))
    }
}

/// Aggregated result of a synchronization run.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub updates: u32,
    pub skipped: u32,
    pub errors: u32,
    pub duration: Duration,
    pub failures: Vec<FailedInfo>,
}

impl RunSummary {
    /// Folds one extension's report into the totals.
    pub fn absorb(&mut self, report: ExtensionReport) {
        if let Some(error) = report.fetch_error {
            self.record_failure(FailedInfo {
                store: report.store,
                identifier: report.identifier.clone(),
                stage: FailureStage::Fetch,
                profile: None,
                error,
                capability: false,
            });
        }

        for (profile, outcome) in report.installs {
            match outcome {
                InstallOutcome::Installed => self.updates += 1,
                InstallOutcome::Skipped => self.skipped += 1,
                InstallOutcome::Failed { error, capability } => {
                    self.record_failure(FailedInfo {
                        store: report.store,
                        identifier: report.identifier.clone(),
                        stage: FailureStage::Install,
                        profile: Some(profile),
                        error,
                        capability,
                    })
                }
            }
        }
    }

    pub fn record_failure(&mut self, failure: FailedInfo) {
        self.errors += 1;
        self.failures.push(failure);
    }

    /// Process exit status: the error count, capped below [`FATAL_EXIT_CODE`].
    pub fn exit_code(&self) -> u8 {
        self.errors.min(u32::from(FATAL_EXIT_CODE - 1)) as u8
    }
}
