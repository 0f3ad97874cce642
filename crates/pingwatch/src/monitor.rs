//! Run orchestration: setup, sampling loop, finalize.
//!
//! Setup failures (bad config, missing probe capability, unusable output
//! paths) abort before any output file is created. Once the loop has
//! started, both duration expiry and cancellation end in the same
//! finalize path, which always builds a report.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::MonitorConfig;
use crate::error::Result;
use crate::probe::{self, Prober};
use crate::recorder::{RecordedRun, Recorder};
use crate::report::{self, DropLog, LogHeader, ReportGenerator, RunReport};
use crate::scheduler::{CancelHandle, ProgressSnapshot, Scheduler, StopReason};

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: RunReport,
    pub log_path: PathBuf,
    pub report_path: PathBuf,
    pub report_written: bool,
}

impl RunSummary {
    /// Both output files are complete
    pub fn is_complete(&self) -> bool {
        self.report_written && self.report.warnings.is_empty()
    }
}

/// A single monitoring run against one target
pub struct Monitor {
    config: MonitorConfig,
    prober: Box<dyn Prober>,
    cancel: CancelHandle,
    scheduler: Scheduler,
    run_id: Uuid,
}

impl Monitor {
    /// Validate `config` and build the prober it asks for. Must be called
    /// inside a tokio runtime.
    pub fn new(config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        let prober = probe::build_prober(&config)?;
        Ok(Self::assemble(config, prober))
    }

    /// Use a caller-supplied prober
    pub fn with_prober(config: MonitorConfig, prober: Box<dyn Prober>) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, prober))
    }

    fn assemble(config: MonitorConfig, prober: Box<dyn Prober>) -> Self {
        let cancel = CancelHandle::new();
        let scheduler = Scheduler::new(&config, cancel.signal());

        Self { config, prober, cancel, scheduler, run_id: Uuid::new_v4() }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Handle used to stop the run gracefully
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.scheduler.subscribe_progress()
    }

    /// Run to completion and write the report
    pub async fn run(mut self) -> Result<RunSummary> {
        self.prober.preflight().await?;
        report::check_report_path(&self.config.report_path)?;

        let platform = crate::platform();
        let started_at = Utc::now();
        let header = LogHeader {
            run_id: self.run_id,
            started_at,
            target: &self.config.target_address,
            platform: &platform,
        };
        let log = DropLog::create(&self.config.log_path, &header, self.config.time_basis)?;

        info!(
            host = %self.config.target_address,
            method = self.prober.name(),
            interval = ?self.config.probe_interval,
            timeout = ?self.config.effective_timeout(),
            max_duration = ?self.config.max_duration,
            run_id = %self.run_id,
            "Monitoring started"
        );

        let mut recorder = Recorder::new(started_at, self.config.time_basis, Some(log));
        let stop_reason = self
            .scheduler
            .run(self.prober.as_ref(), &self.config.target_address, &mut recorder)
            .await;

        Ok(self.finalize(recorder, stop_reason, platform))
    }

    fn finalize(&self, recorder: Recorder, stop_reason: StopReason, platform: String) -> RunSummary {
        let run = recorder.finish(Utc::now());
        let warnings = completeness_warnings(&run, &self.config.log_path);

        let mut report = ReportGenerator::new(&self.config, self.run_id, platform)
            .build(&run.stats, &run.events, stop_reason, warnings);

        let report_written = match report::write_report(&report, &self.config.report_path) {
            Ok(()) => {
                info!(path = %self.config.report_path.display(), "Report written");
                true
            }
            Err(e) => {
                error!("{}", e);
                report
                    .warnings
                    .push(format!("Report could not be written ({e}); report completeness cannot be guaranteed"));
                false
            }
        };

        for warning in &report.warnings {
            warn!("{}", warning);
        }

        RunSummary {
            report,
            log_path: self.config.log_path.clone(),
            report_path: self.config.report_path.clone(),
            report_written,
        }
    }
}

/// Warnings owed to the reader when part of the run was not persisted
fn completeness_warnings(run: &RecordedRun, log_path: &Path) -> Vec<String> {
    let mut warnings = Vec::new();
    if run.log_write_failures > 0 {
        warnings.push(format!(
            "{} drop log writes failed at {}; report completeness cannot be guaranteed",
            run.log_write_failures,
            log_path.display()
        ));
    }
    warnings
}
