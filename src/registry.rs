//! Job registry
//!
//! The single shared map from [`JobId`] to [`JobRecord`]. Workers write through
//! [`JobRegistry::update`], pollers read cloned snapshots through
//! [`JobRegistry::get`]. Every method takes the lock once, so each call is one
//! atomic step as seen by any other caller.

use crate::error::JobError;
use crate::types::{JobId, JobRecord, JobState};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Concurrent mapping from job identifier to job record
#[derive(Debug, Default)]
pub struct JobRegistry {
    records: RwLock<HashMap<JobId, JobRecord>>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record, rejecting an identifier that is already live
    pub async fn register(&self, record: JobRecord) -> Result<(), JobError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(JobError::DuplicateId {
                id: record.id.clone(),
            });
        }
        records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Consistent snapshot of one record
    pub async fn get(&self, id: &JobId) -> Result<JobRecord, JobError> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| JobError::NotFound { id: id.clone() })
    }

    /// Apply `mutator` to the record under a single write lock
    pub async fn update<R>(
        &self,
        id: &JobId,
        mutator: impl FnOnce(&mut JobRecord) -> R,
    ) -> Result<R, JobError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound { id: id.clone() })?;
        Ok(mutator(record))
    }

    /// Remove a record unconditionally
    pub async fn remove(&self, id: &JobId) -> Option<JobRecord> {
        self.records.write().await.remove(id)
    }

    /// Remove a record only if `predicate` holds for it, as one atomic step
    pub async fn remove_if(
        &self,
        id: &JobId,
        predicate: impl FnOnce(&JobRecord) -> bool,
    ) -> Option<JobRecord> {
        let mut records = self.records.write().await;
        match records.get(id) {
            Some(record) if predicate(record) => records.remove(id),
            _ => None,
        }
    }

    /// Identifiers of terminal records that reached their terminal state before `cutoff`
    pub async fn terminal_before(&self, cutoff: DateTime<Utc>) -> Vec<JobId> {
        self.records
            .read()
            .await
            .values()
            .filter(|r| r.is_terminal() && r.terminal_at.is_some_and(|t| t < cutoff))
            .map(|r| r.id.clone())
            .collect()
    }

    /// Number of records currently in `state`
    pub async fn count_in_state(&self, state: JobState) -> usize {
        self.records
            .read()
            .await
            .values()
            .filter(|r| r.state == state)
            .count()
    }

    /// Number of live records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the registry holds no records
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
