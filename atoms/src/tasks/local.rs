use chrono::Utc;
use taskboard_shared::kv::KvStore;

use super::model::{CreateTaskPayload, Task, UpdateTaskPayload};
use crate::error::StoreError;
use crate::session::{materialize_embedded, EditSession};

pub const TASKS_KEY: &str = "task_manager_tasks";

fn load(store: &dyn KvStore) -> Result<Vec<Task>, StoreError> {
    match store.get(TASKS_KEY) {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| StoreError::Storage(format!("stored tasks are malformed: {}", e))),
    }
}

fn save(store: &dyn KvStore, tasks: &[Task]) -> Result<(), StoreError> {
    let raw = serde_json::to_string(tasks)
        .map_err(|e| StoreError::Storage(format!("task serialization failed: {}", e)))?;
    store
        .set(TASKS_KEY, &raw)
        .map_err(|e| StoreError::Storage(format!("key-value write failed: {}", e)))
}

/// All tasks, newest first, attachments embedded in each record.
pub fn list_tasks(store: &dyn KvStore) -> Result<Vec<Task>, StoreError> {
    let mut tasks = load(store)?;
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(tasks)
}

pub fn get_task(store: &dyn KvStore, task_id: &str) -> Result<Task, StoreError> {
    load(store)?
        .into_iter()
        .find(|t| t.id == task_id)
        .ok_or_else(|| StoreError::NotFound(format!("task {}", task_id)))
}

/// Create a task, committing the session's staged attachments as embedded
/// records in the same save. The session is only borrowed, so a failed
/// save leaves the working set intact for retry.
pub fn create_task(
    store: &dyn KvStore,
    payload: CreateTaskPayload,
    session: &EditSession,
) -> Result<Task, StoreError> {
    let mut task = payload.into_task(Utc::now())?;
    task.attachments = materialize_embedded(session.plan(&[]));

    let mut tasks = load(store)?;
    tasks.push(task.clone());
    save(store, &tasks)?;
    Ok(task)
}

/// Merge a patch and commit the session's working set, replacing the
/// stored attachment list. Cancelling instead (dropping the session)
/// leaves the record untouched.
pub fn update_task(
    store: &dyn KvStore,
    task_id: &str,
    patch: UpdateTaskPayload,
    session: &EditSession,
) -> Result<Task, StoreError> {
    let mut tasks = load(store)?;
    let task = tasks
        .iter_mut()
        .find(|t| t.id == task_id)
        .ok_or_else(|| StoreError::NotFound(format!("task {}", task_id)))?;

    task.apply(patch)?;
    let persisted = std::mem::take(&mut task.attachments);
    task.attachments = materialize_embedded(session.plan(&persisted));
    let updated = task.clone();

    save(store, &tasks)?;
    Ok(updated)
}

/// Delete is a no-op when the id is absent. Embedded attachments live
/// inside the record, so removing the task removes them with it.
pub fn delete_task(store: &dyn KvStore, task_id: &str) -> Result<(), StoreError> {
    let mut tasks = load(store)?;
    let before = tasks.len();
    tasks.retain(|t| t.id != task_id);
    if tasks.len() != before {
        save(store, &tasks)?;
    }
    Ok(())
}

/// Repair pass for the denormalized `assigned_name` projection: re-resolve
/// every task's snapshot from the employee directory. Returns how many
/// records were corrected.
pub fn reconcile_assignees(store: &dyn KvStore) -> Result<usize, StoreError> {
    let employees = crate::employees::local::list_employees(store)?;
    let mut tasks = load(store)?;
    let mut repaired = 0;
    for task in &mut tasks {
        if let Some(assigned_id) = &task.assigned_id {
            if let Some(employee) = employees.iter().find(|e| &e.id == assigned_id) {
                if task.assigned_name != employee.name {
                    task.assigned_name = employee.name.clone();
                    repaired += 1;
                }
            }
        }
    }
    if repaired > 0 {
        save(store, &tasks)?;
    }
    Ok(repaired)
}
