//! Background job registry.
//!
//! Large resolutions run off the request path: the resolver enqueues a
//! job, hands back its id and output location, and the caller polls.
//! Each job owns exactly one output file, so jobs never contend on
//! disk. Failures are recorded and logged, never propagated; there is
//! no cancellation and no timeout.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

/// Opaque random job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Rebuild an id from its wire form (e.g. a queued response).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    fn random() -> Self {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex(&bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub state: JobState,
    pub output_location: PathBuf,
    pub created_at: DateTime<Utc>,
    pub error: Option<String>,
}

/// Shared registry of background jobs; cheap to clone.
#[derive(Clone, Default)]
pub struct JobRegistry {
    inner: Arc<Mutex<HashMap<JobId, JobRecord>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new queued job owning `output_location`.
    pub fn enqueue(&self, output_location: PathBuf) -> JobId {
        self.enqueue_with(|_| output_location)
    }

    /// Register a queued job whose output path derives from its id.
    pub fn enqueue_with<F>(&self, output_for: F) -> JobId
    where
        F: FnOnce(&JobId) -> PathBuf,
    {
        let id = JobId::random();
        let record = JobRecord {
            id: id.clone(),
            state: JobState::Queued,
            output_location: output_for(&id),
            created_at: Utc::now(),
            error: None,
        };
        self.lock().insert(id.clone(), record);
        id
    }

    pub fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.lock().get(id).cloned()
    }

    /// Run `work` on a detached thread, tracking state transitions.
    ///
    /// The job moves Queued -> Running immediately and ends Done or
    /// Failed. A failure is logged with the job id; the error text is
    /// kept on the record for pollers.
    pub fn run_detached<F, E>(&self, id: JobId, work: F)
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: fmt::Display,
    {
        let registry = self.clone();
        thread::spawn(move || {
            registry.set_state(&id, JobState::Running, None);
            match work() {
                Ok(()) => registry.set_state(&id, JobState::Done, None),
                Err(e) => {
                    log::error!("background job {id} failed: {e}");
                    registry.set_state(&id, JobState::Failed, Some(e.to_string()));
                }
            }
        });
    }

    fn set_state(&self, id: &JobId, state: JobState, error: Option<String>) {
        if let Some(record) = self.lock().get_mut(id) {
            record.state = state;
            record.error = error;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<JobId, JobRecord>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
