//! Background import supervisor.
//!
//! Grounded on the teacher's `workers::WorkerManager`/`workers::session_cleanup`
//! shape (a supervisor owning shared state, spawning detached tokio tasks,
//! guarding against concurrent re-entry) but simplified to a one-shot job
//! per upload rather than a cron-scheduled sweep: there is no scheduler
//! here, just a semaphore-capped spawn per `start()` call.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};

use crate::constants::{IMPORT_BATCH_SIZE, IMPORT_ROW_ERROR_CAP};
use crate::parser::{self, Format, RowResult};
use crate::store::operations::imports::{ImportJob, ImportStatus, RowErrorRecord};
use crate::store::operations::words::NormalizedWord;
use crate::store::{Store, StoreError};

pub struct ImportSupervisor {
    semaphore: Arc<Semaphore>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl ImportSupervisor {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Writes a pending `ImportJob` and spawns the background task, then
    /// returns immediately. A second call for a wordbook already
    /// `processing` returns `Conflict` carrying the in-flight job id.
    pub async fn start(
        &self,
        store: Arc<Store>,
        wordbook_id: String,
        filename: String,
        bytes: Vec<u8>,
        format: Format,
    ) -> Result<String, StoreError> {
        {
            let mut guard = self.in_flight.lock().await;
            if let Some(existing) = store.get_active_import_job_for_wordbook(&wordbook_id)? {
                return Err(StoreError::Conflict {
                    entity: "ImportJob".to_string(),
                    key: existing.id,
                });
            }
            guard.insert(wordbook_id.clone());
        }

        let job = ImportJob::new(uuid::Uuid::new_v4().to_string(), wordbook_id.clone(), filename);
        store.create_import_job(&job)?;
        let job_id = job.id.clone();

        let semaphore = self.semaphore.clone();
        let in_flight = self.in_flight.clone();
        let task_store = store.clone();
        let task_wordbook_id = wordbook_id.clone();
        let task_job_id = job_id.clone();

        tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            tracing::info!(import_id = %task_job_id, wordbook_id = %task_wordbook_id, "import: start");
            run_import(&task_store, &task_job_id, &task_wordbook_id, bytes, format).await;
            tracing::info!(import_id = %task_job_id, "import: done");
            in_flight.lock().await.remove(&task_wordbook_id);
        });

        Ok(job_id)
    }
}

async fn run_import(store: &Store, job_id: &str, wordbook_id: &str, bytes: Vec<u8>, format: Format) {
    let Ok(Some(mut job)) = store.get_import_job(job_id) else {
        tracing::error!(import_id = job_id, "import: job vanished before processing");
        return;
    };

    job.status = ImportStatus::Processing;
    if let Err(err) = store.update_import_job(&job) {
        tracing::error!(import_id = job_id, error = %err, "import: failed to mark processing");
        return;
    }

    let rows = match parser::parse(&bytes, format, None) {
        Ok(rows) => rows,
        Err(err) => {
            job.status = ImportStatus::Failed;
            job.finished_at = Some(chrono::Utc::now());
            job.message = Some(err.to_string());
            let _ = store.update_import_job(&job);
            return;
        }
    };

    job.total = rows.len() as u64;

    for batch in rows.chunks(IMPORT_BATCH_SIZE) {
        let mut normalized_batch = Vec::with_capacity(batch.len());
        let mut row_offset_errors = Vec::new();

        for (offset, item) in batch.iter().enumerate() {
            match item {
                RowResult::Record(record) => normalized_batch.push(NormalizedWord {
                    lemma: record.lemma.clone(),
                    pos: record.pos.clone(),
                    gender: record.gender.clone(),
                    ipa: record.ipa.clone(),
                    meaning_text: record.meaning_text.clone(),
                    translations: record.translations.clone(),
                    lesson: record.lesson.clone(),
                    cefr: record.cefr,
                    tags: record.tags.clone(),
                }),
                RowResult::Error(err) => row_offset_errors.push((offset, err.reason.clone())),
            }
        }

        job.failed += row_offset_errors.len() as u64;
        for (offset, reason) in row_offset_errors {
            if job.row_errors.len() < IMPORT_ROW_ERROR_CAP {
                job.row_errors.push(RowErrorRecord { row: offset, reason });
            }
        }

        let outcome = match store.bulk_upsert_words(wordbook_id, normalized_batch.clone()) {
            Ok(outcome) => outcome,
            Err(StoreError::Sled(_)) => {
                // Transient: retry the batch once with the same content.
                match store.bulk_upsert_words(wordbook_id, normalized_batch) {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        let failed_rows = batch.len() as u64;
                        job.failed += failed_rows;
                        (0, 0, Vec::new())
                    }
                }
            }
            Err(_) => {
                let failed_rows = batch.len() as u64;
                job.failed += failed_rows;
                (0, 0, Vec::new())
            }
        };

        let (inserted, skipped, row_failures) = outcome;
        job.succeeded += inserted;
        job.skipped += skipped;
        job.failed += row_failures.len() as u64;
        for (row, reason) in row_failures {
            if job.row_errors.len() < IMPORT_ROW_ERROR_CAP {
                job.row_errors.push(RowErrorRecord { row, reason });
            }
        }

        for word in store.list_words_by_wordbook(wordbook_id).unwrap_or_default() {
            let _ = store.create_card_if_missing(
                &word.id,
                crate::store::operations::cards::CardTemplate::Basic,
                None,
            );
        }

        if let Err(err) = store.update_import_job(&job) {
            tracing::error!(import_id = job_id, error = %err, "import: progress update failed");
        }
    }

    job.finished_at = Some(chrono::Utc::now());
    job.status = ImportStatus::Completed;
    let _ = store.update_import_job(&job);
}
