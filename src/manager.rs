//! Task tree manager
//!
//! `Core` owns the forest. Every mutation runs under one lock together with the
//! snapshot write, so the file always holds some consistent state of the tree.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::decompose::Decomposer;
use crate::models::{self, Task, TaskId};
use crate::store::{Store, StoreError};

/// Errors from the manager's mutating operations. A missing id is never an error.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Task name must not be empty")]
    EmptyName,

    #[error(transparent)]
    Store(#[from] StoreError),
}

struct Forest {
    tasks: Vec<Task>,
    store: Store,
}

/// Shared handle to the task forest
#[derive(Clone)]
pub struct Core {
    inner: Arc<Mutex<Forest>>,
    update_tx: Arc<broadcast::Sender<()>>,
    decomposer: Decomposer,
    runtime: Handle,
}

impl Core {
    /// Loads the forest from `store`; background decompositions run on `runtime`
    pub fn new(store: Store, decomposer: Decomposer, runtime: Handle) -> Self {
        let tasks = store.load();
        info!(path = %store.path().display(), nodes = models::count(&tasks), "task forest loaded");

        // Create a broadcast channel with capacity for 100 messages
        let (tx, _rx) = broadcast::channel(100);

        Self {
            inner: Arc::new(Mutex::new(Forest { tasks, store })),
            update_tx: Arc::new(tx),
            decomposer,
            runtime,
        }
    }

    /// Like [`Core::new`], on the runtime of the calling context.
    ///
    /// Panics when called outside a tokio runtime.
    pub fn open(store: Store, decomposer: Decomposer) -> Self {
        Self::new(store, decomposer, Handle::current())
    }

    fn lock(&self) -> MutexGuard<'_, Forest> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // Applies `f` under the lock to a copy of the forest. `Some` means it changed:
    // the copy is saved, swapped in and observers are notified before the lock is
    // released. If the save fails the forest is left as it was.
    fn mutate<F, R>(&self, f: F) -> Result<Option<R>, CoreError>
    where
        F: FnOnce(&mut Vec<Task>) -> Option<R>,
    {
        let mut forest = self.lock();

        let mut candidate = forest.tasks.clone();
        let Some(result) = f(&mut candidate) else {
            return Ok(None);
        };

        if let Err(e) = forest.store.save(&candidate) {
            error!(error = %e, "failed to save snapshot, change discarded");
            return Err(e.into());
        }
        forest.tasks = candidate;

        let _ = self.update_tx.send(());
        Ok(Some(result))
    }

    /// Appends a new top-level task and returns it
    pub fn add_task(&self, name: &str) -> Result<Task, CoreError> {
        let task = Task::new(valid_name(name)?);
        self.mutate(|tasks| {
            tasks.push(task.clone());
            Some(())
        })?;
        info!(id = %task.id(), name = %task.name(), "task added");
        Ok(task)
    }

    /// Appends a new child under `parent`. `None` if the parent does not exist.
    pub fn add_subtask(&self, parent: &TaskId, name: &str) -> Result<Option<Task>, CoreError> {
        let task = Task::new(valid_name(name)?);
        let added = self.mutate(|tasks| {
            let target = models::find_mut(tasks, parent)?;
            target.add_subtask(task.clone());
            Some(task)
        })?;
        if let Some(task) = &added {
            info!(id = %task.id(), %parent, name = %task.name(), "subtask added");
        }
        Ok(added)
    }

    /// Depth-first pre-order lookup, returning a copy of the node and its subtree
    pub fn find_task(&self, id: &TaskId) -> Option<Task> {
        models::find(&self.lock().tasks, id).cloned()
    }

    /// Flips the completion flag of one node. Returns whether the node was found.
    pub fn toggle_completion(&self, id: &TaskId) -> Result<bool, CoreError> {
        let toggled = self.mutate(|tasks| models::find_mut(tasks, id).map(Task::toggle))?;
        Ok(toggled.is_some())
    }

    /// Removes a node and its whole subtree. Returns whether anything was removed.
    pub fn delete_task(&self, id: &TaskId) -> Result<bool, CoreError> {
        let removed = self.mutate(|tasks| models::remove(tasks, id))?;
        if let Some(task) = &removed {
            info!(%id, nodes = task.count(), "task deleted");
        }
        Ok(removed.is_some())
    }

    /// Copy of the top-level sequence
    pub fn get_all_tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    /// Subscribe to a notification sent after every persisted mutation
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.update_tx.subscribe()
    }

    /// Expands a task into subtasks proposed by the decomposition service.
    ///
    /// Returns immediately. `on_done` receives the number of appended subtasks or a
    /// human-readable error. If `id` is unknown it is called before this returns;
    /// otherwise it runs on a runtime worker, not on the caller's thread.
    pub fn decompose<F>(&self, id: &TaskId, on_done: F)
    where
        F: FnOnce(Result<usize, String>) + Send + 'static,
    {
        let Some(task) = self.find_task(id) else {
            on_done(Err("task not found".to_string()));
            return;
        };

        let core = self.clone();
        let id = id.clone();
        self.runtime.spawn(async move {
            let outcome = core.run_decomposition(&id, task.name()).await;
            on_done(outcome);
        });
    }

    async fn run_decomposition(&self, id: &TaskId, name: &str) -> Result<usize, String> {
        // network I/O and backoff happen without the lock
        let names = self
            .decomposer
            .request_decomposition(name)
            .await
            .map_err(|e| {
                warn!(%id, error = %e, "decomposition failed");
                e.to_string()
            })?;

        let count = names.len();
        let appended = self
            .mutate(|tasks| {
                let target = models::find_mut(tasks, id)?;
                for name in names {
                    target.add_subtask(Task::new(name));
                }
                Some(())
            })
            .map_err(|e| e.to_string())?;

        match appended {
            Some(()) => {
                info!(%id, count, "subtasks appended");
                Ok(count)
            }
            None => {
                warn!(%id, "decomposed task was deleted before the reply arrived");
                Err("task no longer exists".to_string())
            }
        }
    }
}

fn valid_name(name: &str) -> Result<&str, CoreError> {
    let name = name.trim();
    if name.is_empty() {
        Err(CoreError::EmptyName)
    } else {
        Ok(name)
    }
}
