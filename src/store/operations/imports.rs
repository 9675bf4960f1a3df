use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowErrorRecord {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: String,
    pub wordbook_id: String,
    pub filename: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: ImportStatus,
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub message: Option<String>,
    pub row_errors: Vec<RowErrorRecord>,
}

impl ImportJob {
    pub fn new(id: String, wordbook_id: String, filename: String) -> Self {
        Self {
            id,
            wordbook_id,
            filename,
            started_at: Utc::now(),
            finished_at: None,
            status: ImportStatus::Pending,
            total: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            message: None,
            row_errors: Vec::new(),
        }
    }

    /// `100 * (succeeded+failed+skipped) / max(total,1)`, clamped to `[0,100]`.
    pub fn progress_percent(&self) -> u8 {
        let done = self.succeeded + self.failed + self.skipped;
        let pct = (100 * done) / self.total.max(1);
        pct.min(100) as u8
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ImportStatus::Completed | ImportStatus::Failed)
    }
}

impl Store {
    pub fn create_import_job(&self, job: &ImportJob) -> Result<(), StoreError> {
        let key = keys::import_job_key(&job.id);
        self.import_jobs.insert(key.as_bytes(), Self::serialize(job)?)?;
        let time_key = keys::import_jobs_by_time_key(job.started_at.timestamp_millis(), &job.id);
        self.import_jobs_by_time_idx
            .insert(time_key.as_bytes(), job.id.as_bytes())?;
        Ok(())
    }

    /// Terminal jobs are immutable; attempting to update one is a bug in
    /// the caller, not a user-facing failure, so it is surfaced as
    /// `PreconditionFailed` rather than silently ignored.
    pub fn update_import_job(&self, job: &ImportJob) -> Result<(), StoreError> {
        let key = keys::import_job_key(&job.id);
        if let Some(raw) = self.import_jobs.get(key.as_bytes())? {
            let existing: ImportJob = Self::deserialize(&raw)?;
            if existing.is_terminal() && existing.status != job.status {
                return Err(StoreError::PreconditionFailed(format!(
                    "import job {} is already terminal",
                    job.id
                )));
            }
        }
        self.import_jobs.insert(key.as_bytes(), Self::serialize(job)?)?;
        Ok(())
    }

    pub fn get_import_job(&self, id: &str) -> Result<Option<ImportJob>, StoreError> {
        let key = keys::import_job_key(id);
        match self.import_jobs.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// The in-flight job for a wordbook, if any, used to enforce the
    /// single-active-import-per-wordbook rule.
    pub fn get_active_import_job_for_wordbook(
        &self,
        wordbook_id: &str,
    ) -> Result<Option<ImportJob>, StoreError> {
        for item in self.import_jobs.iter() {
            let (_, v) = item?;
            let job: ImportJob = Self::deserialize(&v)?;
            if job.wordbook_id == wordbook_id && !job.is_terminal() {
                return Ok(Some(job));
            }
        }
        Ok(None)
    }

    pub fn list_import_jobs(&self, limit: usize) -> Result<Vec<ImportJob>, StoreError> {
        let mut jobs = Vec::new();
        for item in self.import_jobs_by_time_idx.iter() {
            let (_, v) = item?;
            let job_id = String::from_utf8_lossy(&v).to_string();
            if let Some(job) = self.get_import_job(&job_id)? {
                jobs.push(job);
            }
            if jobs.len() >= limit {
                break;
            }
        }
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn progress_percent_clamps_and_never_exceeds_100() {
        let mut job = ImportJob::new("j1".to_string(), "wb1".to_string(), "f.csv".to_string());
        job.total = 0;
        job.succeeded = 5;
        assert_eq!(job.progress_percent(), 100);

        job.total = 10;
        job.succeeded = 3;
        job.skipped = 2;
        assert_eq!(job.progress_percent(), 50);
    }

    #[test]
    fn terminal_job_rejects_further_transitions() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();

        let mut job = ImportJob::new("j1".to_string(), "wb1".to_string(), "f.csv".to_string());
        store.create_import_job(&job).unwrap();

        job.status = ImportStatus::Completed;
        store.update_import_job(&job).unwrap();

        job.status = ImportStatus::Processing;
        let err = store.update_import_job(&job).unwrap_err();
        assert!(matches!(err, StoreError::PreconditionFailed(_)));
    }
}
