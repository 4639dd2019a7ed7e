use std::collections::HashSet;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::error::TaskError;
use crate::storage::KeyValueStore;
use crate::task::{Task, TaskDraft, TaskId, TaskPatch};

pub const TASKS_STORAGE_KEY: &str = "taskManager_tasks";

/// Ordered in-memory task list, written through to a key-value backend on
/// every mutation.
///
/// Persistence never fails a mutation: read errors start an empty list,
/// write errors are logged and the in-memory state stays authoritative.
#[derive(Debug)]
pub struct TaskStore<K: KeyValueStore> {
    backend: K,
    tasks: Vec<Task>,
}

impl<K: KeyValueStore> TaskStore<K> {
    #[tracing::instrument(skip(backend))]
    pub fn load(backend: K) -> Self {
        let tasks = load_tasks(&backend);
        info!(count = tasks.len(), "task store loaded");
        Self { backend, tasks }
    }

    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn backend(&self) -> &K {
        &self.backend
    }

    pub fn into_backend(self) -> K {
        self.backend
    }

    #[tracing::instrument(skip(self, draft), fields(title = %draft.title))]
    pub fn add(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Result<Task, TaskError> {
        draft.validate()?;
        let id = self.unused_id(TaskId::from_timestamp(now));
        let task = draft.into_task(id, now)?;

        self.tasks.push(task.clone());
        debug!(id = %task.id, "task added");
        self.persist();
        Ok(task)
    }

    #[tracing::instrument(skip(self, patch))]
    pub fn edit(&mut self, id: &TaskId, patch: TaskPatch) -> Result<(), TaskError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| &task.id == id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;

        patch.apply(task)?;
        debug!(id = %id, "task edited");
        self.persist();
        Ok(())
    }

    /// Flips `completed` and returns the new value.
    #[tracing::instrument(skip(self))]
    pub fn toggle(&mut self, id: &TaskId) -> Result<bool, TaskError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| &task.id == id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;

        task.completed = !task.completed;
        let completed = task.completed;
        debug!(id = %id, completed, "task toggled");
        self.persist();
        Ok(completed)
    }

    #[tracing::instrument(skip(self))]
    pub fn remove(&mut self, id: &TaskId) -> Result<Task, TaskError> {
        let idx = self
            .tasks
            .iter()
            .position(|task| &task.id == id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;

        let task = self.tasks.remove(idx);
        debug!(id = %id, "task removed");
        self.persist();
        Ok(task)
    }

    /// Drops every task and the persisted entry.
    #[tracing::instrument(skip(self))]
    pub fn clear(&mut self) {
        let before = self.tasks.len();
        self.tasks.clear();
        if let Err(err) = self.backend.remove(TASKS_STORAGE_KEY) {
            error!(error = %err, "failed clearing stored tasks");
        }
        info!(before, "cleared all tasks");
    }

    fn unused_id(&self, candidate: TaskId) -> TaskId {
        let mut id = candidate;
        while self.get(&id).is_some() {
            id = id.bumped();
        }
        id
    }

    fn persist(&mut self) {
        if let Err(err) = save_tasks(&mut self.backend, &self.tasks) {
            error!(
                error = %err,
                count = self.tasks.len(),
                "failed saving tasks; keeping in-memory state"
            );
        }
    }
}

/// Reads the task list. Missing or unreadable data yields an empty list.
#[tracing::instrument(skip(backend))]
pub fn load_tasks<K: KeyValueStore>(backend: &K) -> Vec<Task> {
    let raw = match backend.get(TASKS_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("no stored tasks");
            return Vec::new();
        }
        Err(err) => {
            warn!(error = %err, "failed reading stored tasks; starting empty");
            return Vec::new();
        }
    };

    match decode_tasks(&raw) {
        Ok(tasks) => tasks,
        Err(err) => {
            warn!(error = %err, "stored tasks unparsable; starting empty");
            Vec::new()
        }
    }
}

#[tracing::instrument(skip(backend, tasks), fields(count = tasks.len()))]
pub fn save_tasks<K: KeyValueStore>(backend: &mut K, tasks: &[Task]) -> anyhow::Result<()> {
    let blob = encode_tasks(tasks)?;
    backend
        .set(TASKS_STORAGE_KEY, &blob)
        .with_context(|| format!("failed writing {TASKS_STORAGE_KEY}"))
}

pub fn encode_tasks(tasks: &[Task]) -> anyhow::Result<String> {
    serde_json::to_string(tasks).context("failed serializing tasks")
}

/// Parses a stored blob. Duplicate ids keep their first occurrence.
pub fn decode_tasks(raw: &str) -> anyhow::Result<Vec<Task>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed: Vec<Task> = serde_json::from_str(raw).context("failed parsing stored tasks")?;

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(parsed.len());
    for task in parsed {
        if seen.insert(task.id.clone()) {
            tasks.push(task);
        } else {
            warn!(id = %task.id, "dropping task with duplicate id");
        }
    }
    Ok(tasks)
}
