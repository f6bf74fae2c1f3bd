//! File-backed trial history with atomic appends and best-trial queries.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use hs_types::{
    Configuration, ObjectiveDirection, StorageError, SweepResult, TrialRecord,
};

/// Durable, append-only trial history.
///
/// Holds the full history in memory (campaigns are hundreds of trials, each
/// one paid for by minutes of training) and mirrors it to disk after every
/// append.
#[derive(Debug)]
pub struct TrialStore {
    path: PathBuf,
    records: Vec<TrialRecord>,
}

impl TrialStore {
    /// Load persisted history from `path`, or start empty if no store file
    /// exists yet. An existing but unreadable or unparseable file is a fatal
    /// error: losing history silently is worse than stopping.
    pub fn open<P: AsRef<Path>>(path: P) -> SweepResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        if !path.exists() {
            info!(path = %path.display(), "no prior trial store, starting empty");
            return Ok(Self {
                path,
                records: Vec::new(),
            });
        }

        let raw = fs::read_to_string(&path).map_err(|source| StorageError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let mut records = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: TrialRecord =
                serde_json::from_str(line).map_err(|e| StorageError::Corrupt {
                    path: path.display().to_string(),
                    line: idx + 1,
                    message: e.to_string(),
                })?;
            records.push(record);
        }

        info!(
            path = %path.display(),
            trials = records.len(),
            "resumed trial store"
        );
        Ok(Self { path, records })
    }

    /// Durably persist one new trial record.
    ///
    /// The record is added to the in-memory history first, then the whole
    /// history is flushed through a temp file and an atomic rename. If the
    /// flush fails the in-memory record is rolled back so memory and disk
    /// never disagree.
    pub fn append(&mut self, record: TrialRecord) -> SweepResult<()> {
        self.records.push(record);
        if let Err(e) = self.flush() {
            self.records.pop();
            return Err(e);
        }
        debug!(trials = self.records.len(), "trial store flushed");
        Ok(())
    }

    fn flush(&self) -> SweepResult<()> {
        let display = self.path.display().to_string();
        let write_err = |source: std::io::Error| StorageError::Write {
            path: display.clone(),
            source,
        };

        let mut body = String::new();
        for record in &self.records {
            body.push_str(&serde_json::to_string(record)?);
            body.push('\n');
        }

        // Temp file lives next to the store so the rename stays on one
        // filesystem and is atomic.
        let tmp = self.path.with_extension("jsonl.tmp");
        {
            let mut file = fs::File::create(&tmp).map_err(write_err)?;
            file.write_all(body.as_bytes()).map_err(write_err)?;
            file.sync_all().map_err(write_err)?;
        }
        fs::rename(&tmp, &self.path).map_err(write_err)?;
        Ok(())
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sequence number for the next trial. Monotonic across process
    /// invocations because it counts persisted records.
    pub fn next_trial_number(&self) -> usize {
        self.records.len()
    }

    /// (configuration, loss) pairs of every ok-status trial, in recorded
    /// order, for replaying into an adaptive strategy on resume. Non-finite
    /// losses (possible in histories written by older versions) are skipped
    /// so they cannot skew the strategy's good/bad split.
    pub fn ok_observations(&self) -> Vec<(Configuration, f64)> {
        self.records
            .iter()
            .filter_map(|r| Some((r.config.clone(), r.loss.filter(|l| l.is_finite())?)))
            .collect()
    }

    /// The best ok-status trial ever recorded, or `None` if no trial has
    /// succeeded yet. Failed trials and non-finite losses are excluded;
    /// exact ties keep the first-seen record.
    pub fn best(&self, direction: ObjectiveDirection) -> Option<&TrialRecord> {
        let mut best: Option<&TrialRecord> = None;
        for record in &self.records {
            let Some(loss) = record.loss.filter(|l| l.is_finite()) else {
                continue;
            };
            match best {
                None => best = Some(record),
                Some(incumbent) => {
                    // Ok records always carry a loss.
                    let incumbent_loss = incumbent.loss.unwrap_or(f64::INFINITY);
                    if direction.improves(loss, incumbent_loss) {
                        best = Some(record);
                    }
                }
            }
        }
        best
    }
}
