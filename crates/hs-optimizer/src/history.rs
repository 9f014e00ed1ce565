//! On-disk run history.
//!
//! Every sweep writes a `runhistory.json` under
//! `<output_dir>/<name>/<seed>/` recording each trial's overrides,
//! objective, and terminal status, plus aggregate counts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use hs_types::HsResult;

use crate::trial::TrialStatus;

/// One finished (or failed) trial as persisted to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial_number: usize,
    pub trial_id: Uuid,
    /// The `key=value` overrides this trial was evaluated with.
    pub overrides: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<f64>,
    pub status: TrialStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

/// Aggregate trial counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub finished: usize,
    pub failed: usize,
}

/// Complete record of one sweep, serialized as `runhistory.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunHistory {
    pub run_id: Uuid,
    pub name: String,
    pub seed: u64,
    pub started_at: DateTime<Utc>,
    pub trials: Vec<TrialRecord>,
    pub stats: RunStats,
}

impl RunHistory {
    pub fn new(name: impl Into<String>, seed: u64) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            name: name.into(),
            seed,
            started_at: Utc::now(),
            trials: Vec::new(),
            stats: RunStats::default(),
        }
    }

    /// Append a trial record and update the aggregate counts.
    pub fn record(&mut self, record: TrialRecord) {
        match record.status {
            TrialStatus::Completed => self.stats.finished += 1,
            TrialStatus::Failed => self.stats.failed += 1,
            TrialStatus::Pending | TrialStatus::Running => {}
        }
        self.trials.push(record);
    }

    /// Directory this run's artifacts live under: `<base>/<name>/<seed>/`.
    pub fn run_directory(&self, base: &Path) -> PathBuf {
        base.join(&self.name).join(self.seed.to_string())
    }

    /// Write `runhistory.json` under [`Self::run_directory`], creating
    /// intermediate directories as needed. Returns the written path.
    pub fn save(&self, base: &Path) -> HsResult<PathBuf> {
        let dir = self.run_directory(base);
        fs::create_dir_all(&dir)?;
        let path = dir.join("runhistory.json");
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        info!(
            path = %path.display(),
            finished = self.stats.finished,
            failed = self.stats.failed,
            "saved run history"
        );
        Ok(path)
    }

    /// Read a previously saved `runhistory.json`.
    pub fn load(path: &Path) -> HsResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: usize, status: TrialStatus, objective: Option<f64>) -> TrialRecord {
        TrialRecord {
            trial_number: n,
            trial_id: Uuid::new_v4(),
            overrides: vec![format!("x={n}")],
            budget: None,
            objective,
            status,
            worker_id: Some("worker-0".to_string()),
            error: None,
            duration_secs: Some(0.01),
        }
    }

    #[test]
    fn stats_track_terminal_statuses() {
        let mut history = RunHistory::new("branin", 7);
        history.record(record(0, TrialStatus::Completed, Some(0.5)));
        history.record(record(1, TrialStatus::Failed, None));
        history.record(record(2, TrialStatus::Completed, Some(0.4)));
        assert_eq!(history.stats, RunStats { finished: 2, failed: 1 });
    }

    #[test]
    fn save_writes_under_name_and_seed() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = RunHistory::new("branin", 42);
        history.record(record(0, TrialStatus::Completed, Some(1.25)));

        let path = history.save(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("branin").join("42").join("runhistory.json"));

        let loaded = RunHistory::load(&path).unwrap();
        assert_eq!(loaded.run_id, history.run_id);
        assert_eq!(loaded.trials.len(), 1);
        assert_eq!(loaded.trials[0].overrides, vec!["x=0".to_string()]);
        assert_eq!(loaded.stats.finished, 1);
    }
}
