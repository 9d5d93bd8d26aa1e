//! In-memory to-do table with an asynchronous, callback based API.
//!
//! Every operation returns immediately and reports its result from a
//! worker thread, after the configured latency, the way a remote table
//! would.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;
use uuid::Uuid;

/// A to-do row. `id`, `created_at`, `updated_at`, `version` and `deleted`
/// are system properties maintained by the table; callers only change
/// `text` and `complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: Uuid,
    pub text: String,
    pub complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Starts at 1 and grows with every stored change.
    pub version: u64,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TodoError {
    #[error("to-do text must not be empty")]
    EmptyText,

    #[error("no to-do item with id {0}")]
    NotFound(Uuid),

    #[error("to-do item {id} is at version {found}, update was based on version {expected}")]
    VersionConflict { id: Uuid, expected: u64, found: u64 },
}

pub type TodoResult<T> = Result<T, TodoError>;

#[derive(Debug, Clone, Default)]
pub struct TodoTable {
    items: Arc<Mutex<HashMap<Uuid, TodoItem>>>,
    latency: Duration,
}

impl TodoTable {
    pub fn new(latency: Duration) -> Self {
        TodoTable {
            items: Arc::default(),
            latency,
        }
    }

    /// Inserts a new, incomplete item at version 1. Blank text is rejected.
    pub fn insert<F>(&self, text: &str, callback: F)
    where
        F: FnOnce(TodoResult<TodoItem>) + Send + 'static,
    {
        let text = text.to_string();
        self.dispatch(callback, move |items| {
            if text.trim().is_empty() {
                return Err(TodoError::EmptyText);
            }
            let now = Utc::now();
            let item = TodoItem {
                id: Uuid::new_v4(),
                text,
                complete: false,
                created_at: now,
                updated_at: now,
                version: 1,
                deleted: false,
            };
            items.insert(item.id, item.clone());
            Ok(item)
        });
    }

    /// Looks up a live item; soft-deleted items are reported as not found.
    pub fn lookup<F>(&self, id: Uuid, callback: F)
    where
        F: FnOnce(TodoResult<TodoItem>) + Send + 'static,
    {
        self.dispatch(callback, move |items| {
            items
                .get(&id)
                .filter(|item| !item.deleted)
                .cloned()
                .ok_or(TodoError::NotFound(id))
        });
    }

    /// Like `lookup`, but also returns soft-deleted items.
    pub fn lookup_with_deleted<F>(&self, id: Uuid, callback: F)
    where
        F: FnOnce(TodoResult<TodoItem>) + Send + 'static,
    {
        self.dispatch(callback, move |items| {
            items.get(&id).cloned().ok_or(TodoError::NotFound(id))
        });
    }

    /// Stores `text` and `complete` of `item` over the live item with the
    /// same id. `item.version` must match the stored version; the stored
    /// version is then bumped and `updated_at` refreshed.
    pub fn update<F>(&self, item: TodoItem, callback: F)
    where
        F: FnOnce(TodoResult<TodoItem>) + Send + 'static,
    {
        self.dispatch(callback, move |items| {
            let stored = live_item(items, item.id)?;
            if stored.version != item.version {
                return Err(TodoError::VersionConflict {
                    id: item.id,
                    expected: item.version,
                    found: stored.version,
                });
            }
            stored.text = item.text;
            stored.complete = item.complete;
            touch(stored);
            Ok(stored.clone())
        });
    }

    /// Soft-deletes a live item. The row stays readable through
    /// `lookup_with_deleted`.
    pub fn delete<F>(&self, id: Uuid, callback: F)
    where
        F: FnOnce(TodoResult<TodoItem>) + Send + 'static,
    {
        self.dispatch(callback, move |items| {
            let stored = live_item(items, id)?;
            stored.deleted = true;
            touch(stored);
            Ok(stored.clone())
        });
    }

    /// Number of live (not deleted) items.
    pub fn len(&self) -> usize {
        lock(&self.items).values().filter(|item| !item.deleted).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dispatch<T, F, Op>(&self, callback: F, op: Op)
    where
        T: Send + 'static,
        F: FnOnce(TodoResult<T>) + Send + 'static,
        Op: FnOnce(&mut HashMap<Uuid, TodoItem>) -> TodoResult<T> + Send + 'static,
    {
        let items = Arc::clone(&self.items);
        let latency = self.latency;
        thread::spawn(move || {
            if !latency.is_zero() {
                thread::sleep(latency);
            }
            let result = {
                let mut items = lock(&items);
                op(&mut *items)
            };
            trace!(ok = result.is_ok(), "table operation finished");
            callback(result);
        });
    }
}

fn live_item(items: &mut HashMap<Uuid, TodoItem>, id: Uuid) -> TodoResult<&mut TodoItem> {
    items
        .get_mut(&id)
        .filter(|item| !item.deleted)
        .ok_or(TodoError::NotFound(id))
}

fn touch(item: &mut TodoItem) {
    item.version += 1;
    item.updated_at = Utc::now();
}

fn lock(items: &Mutex<HashMap<Uuid, TodoItem>>) -> MutexGuard<'_, HashMap<Uuid, TodoItem>> {
    items.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn wait(
        call: impl FnOnce(Box<dyn FnOnce(TodoResult<TodoItem>) + Send>),
    ) -> TodoResult<TodoItem> {
        let (tx, rx) = mpsc::channel();
        call(Box::new(move |result| {
            tx.send(result).unwrap();
        }));
        rx.recv_timeout(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_insert_and_lookup() {
        let table = TodoTable::default();
        let item = wait(|cb| table.insert("Buy milk", cb)).unwrap();
        assert_eq!(item.text, "Buy milk");
        assert!(!item.complete);
        assert_eq!(table.len(), 1);

        let found = wait(|cb| table.lookup(item.id, cb)).unwrap();
        assert_eq!(found, item);
    }

    #[test]
    fn test_blank_text_is_rejected() {
        let table = TodoTable::default();
        assert_eq!(wait(|cb| table.insert("  ", cb)), Err(TodoError::EmptyText));
        assert!(table.is_empty());
    }

    #[test]
    fn test_insert_sets_system_properties() {
        let table = TodoTable::default();
        let item = wait(|cb| table.insert("Feed the cat", cb)).unwrap();
        assert_eq!(item.version, 1);
        assert!(!item.deleted);
        assert_eq!(item.created_at, item.updated_at);
    }

    #[test]
    fn test_update_bumps_version() {
        let table = TodoTable::new(Duration::from_millis(1));
        let mut item = wait(|cb| table.insert("Walk the dog", cb)).unwrap();
        item.complete = true;
        item.text = "Walk the dog twice".to_string();

        let updated = wait(|cb| table.update(item.clone(), cb)).unwrap();
        assert!(updated.complete);
        assert_eq!(updated.text, "Walk the dog twice");
        assert_eq!(updated.version, 2);
        assert_eq!(updated.created_at, item.created_at);
        assert!(updated.updated_at >= item.updated_at);
    }

    #[test]
    fn test_update_with_stale_version_conflicts() {
        let table = TodoTable::default();
        let item = wait(|cb| table.insert("Pay rent", cb)).unwrap();
        wait(|cb| table.update(item.clone(), cb)).unwrap();

        assert_eq!(
            wait(|cb| table.update(item.clone(), cb)),
            Err(TodoError::VersionConflict {
                id: item.id,
                expected: 1,
                found: 2,
            })
        );
    }

    #[test]
    fn test_delete_is_soft() {
        let table = TodoTable::default();
        let item = wait(|cb| table.insert("Water the plants", cb)).unwrap();

        let deleted = wait(|cb| table.delete(item.id, cb)).unwrap();
        assert!(deleted.deleted);
        assert_eq!(deleted.version, 2);
        assert!(table.is_empty());
        assert_eq!(
            wait(|cb| table.lookup(item.id, cb)),
            Err(TodoError::NotFound(item.id))
        );
        assert_eq!(wait(|cb| table.lookup_with_deleted(item.id, cb)), Ok(deleted));

        // a deleted item can be neither updated nor deleted again
        assert_eq!(
            wait(|cb| table.update(item.clone(), cb)),
            Err(TodoError::NotFound(item.id))
        );
        assert_eq!(
            wait(|cb| table.delete(item.id, cb)),
            Err(TodoError::NotFound(item.id))
        );
    }

    #[test]
    fn test_update_unknown_item() {
        let table = TodoTable::default();
        let now = Utc::now();
        let ghost = TodoItem {
            id: Uuid::new_v4(),
            text: "ghost".to_string(),
            complete: false,
            created_at: now,
            updated_at: now,
            version: 1,
            deleted: false,
        };
        assert_eq!(
            wait(|cb| table.update(ghost.clone(), cb)),
            Err(TodoError::NotFound(ghost.id))
        );
    }

    #[test]
    fn test_item_serializes_as_json() {
        let stamp = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let item = TodoItem {
            id: Uuid::nil(),
            text: "Buy milk".to_string(),
            complete: false,
            created_at: stamp,
            updated_at: stamp,
            version: 1,
            deleted: false,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "00000000-0000-0000-0000-000000000000",
                "text": "Buy milk",
                "complete": false,
                "createdAt": "2024-05-01T12:00:00Z",
                "updatedAt": "2024-05-01T12:00:00Z",
                "version": 1,
                "deleted": false
            })
        );
    }
}
