//! # Object Workers
//!
//! Script objects (media type `s`) each run an isolated task that owns the
//! object's script. The host talks to it only through the task's inbox and
//! the hub's shared outbox; the script never sees game state. Workers are
//! aborted when their object is deleted or the room metadata reloads.

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use tilespace_shared::ObjectId;

/// Message posted to a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum WorkerCommand {
    /// The object was triggered; carries its current activation state
    Trigger(bool),
}

/// Message posted back by a worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    /// When true the host applies `active` and republishes it to the room
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast: Option<bool>,
}

impl WorkerReply {
    pub fn is_broadcast(&self) -> bool {
        self.broadcast.unwrap_or(false)
    }
}

/// Behavior run inside a worker task
pub trait ObjectScript: Send {
    fn handle(&mut self, command: WorkerCommand) -> Option<WorkerReply>;
}

pub type ScriptFactory = fn() -> Box<dyn ObjectScript>;

/// Toggles a shared on/off state for everyone in the room
struct SharedActive;

impl ObjectScript for SharedActive {
    fn handle(&mut self, command: WorkerCommand) -> Option<WorkerReply> {
        match command {
            WorkerCommand::Trigger(active) => Some(WorkerReply {
                active: Some(!active),
                broadcast: Some(true),
            }),
        }
    }
}

fn shared_active() -> Box<dyn ObjectScript> {
    Box::new(SharedActive)
}

// Scripts by file name or full resolved location
static SCRIPT_REGISTRY: Lazy<Mutex<HashMap<String, ScriptFactory>>> = Lazy::new(|| {
    let mut scripts: HashMap<String, ScriptFactory> = HashMap::new();
    scripts.insert("sharedActive.js".to_string(), shared_active);
    Mutex::new(scripts)
});

/// Register a script under a file name or a resolved location.
pub fn register_script(name: &str, factory: ScriptFactory) {
    let mut scripts = SCRIPT_REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
    scripts.insert(name.to_string(), factory);
    debug!("Registered object script: {}", name);
}

/// Instantiate the script at `location`, matching the full location first
/// and then its file name.
pub fn script_for(location: &str) -> Option<Box<dyn ObjectScript>> {
    let scripts = SCRIPT_REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
    let file_name = location.rsplit('/').next().unwrap_or(location);
    scripts
        .get(location)
        .or_else(|| scripts.get(file_name))
        .map(|factory| factory())
}

/// Resolve an object uri against the room's base directory. Absolute paths
/// and full URLs are kept as they are.
pub fn resolve_uri(base_dir: &str, uri: &str) -> String {
    if uri.contains("://") || uri.starts_with('/') || base_dir.is_empty() {
        return uri.to_string();
    }
    if base_dir.ends_with('/') {
        format!("{}{}", base_dir, uri)
    } else {
        format!("{}/{}", base_dir, uri)
    }
}

struct WorkerMessage {
    generation: u64,
    id: ObjectId,
    reply: WorkerReply,
}

struct WorkerHandle {
    inbox: UnboundedSender<WorkerCommand>,
    task: JoinHandle<()>,
}

/// Owns every running worker and collects their replies.
pub struct WorkerHub {
    runtime: Option<Handle>,
    /// Bumped on every rebuild so replies from torn-down workers are dropped
    generation: u64,
    workers: HashMap<ObjectId, WorkerHandle>,
    outbox_tx: UnboundedSender<WorkerMessage>,
    outbox_rx: UnboundedReceiver<WorkerMessage>,
}

impl WorkerHub {
    /// Workers run on the ambient tokio runtime; without one, script
    /// objects behave like plain toggles.
    pub fn new() -> Self {
        let runtime = Handle::try_current().ok();
        if runtime.is_none() {
            info!("No async runtime available, object workers disabled");
        }
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        Self {
            runtime,
            generation: 0,
            workers: HashMap::new(),
            outbox_tx,
            outbox_rx,
        }
    }

    pub fn has_worker(&self, id: ObjectId) -> bool {
        self.workers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Start the worker for object `id`. Returns false when no worker could
    /// be started (no runtime or unknown script).
    pub fn spawn(&mut self, id: ObjectId, base_dir: &str, uri: &str) -> bool {
        let Some(runtime) = self.runtime.clone() else {
            return false;
        };
        let location = resolve_uri(base_dir, uri);
        let Some(mut script) = script_for(&location) else {
            warn!("No script found for object {} at {}", id, location);
            return false;
        };

        self.terminate(id);

        let (inbox, mut inbox_rx) = mpsc::unbounded_channel::<WorkerCommand>();
        let outbox = self.outbox_tx.clone();
        let generation = self.generation;
        let task = runtime.spawn(async move {
            while let Some(command) = inbox_rx.recv().await {
                if let Some(reply) = script.handle(command) {
                    if outbox.send(WorkerMessage { generation, id, reply }).is_err() {
                        break;
                    }
                }
            }
        });

        debug!("Started worker for object {} ({})", id, location);
        self.workers.insert(id, WorkerHandle { inbox, task });
        true
    }

    /// Post a command; false when the object has no live worker.
    pub fn post(&mut self, id: ObjectId, command: WorkerCommand) -> bool {
        let Some(worker) = self.workers.get(&id) else {
            return false;
        };
        if worker.inbox.send(command).is_err() {
            warn!("Worker for object {} has stopped", id);
            self.terminate(id);
            return false;
        }
        true
    }

    /// Hard-cancel the worker of object `id`.
    pub fn terminate(&mut self, id: ObjectId) {
        if let Some(worker) = self.workers.remove(&id) {
            worker.task.abort();
            debug!("Terminated worker for object {}", id);
        }
    }

    /// Cancel every worker; replies still in flight are discarded.
    pub fn clear(&mut self) {
        for (_, worker) in self.workers.drain() {
            worker.task.abort();
        }
        self.generation += 1;
    }

    /// Tear everything down and start workers for the given script objects.
    pub fn rebuild<'a>(&mut self, base_dir: &str, scripts: impl IntoIterator<Item = (ObjectId, &'a str)>) {
        self.clear();
        for (id, uri) in scripts {
            self.spawn(id, base_dir, uri);
        }
    }

    fn accept(&self, message: &WorkerMessage) -> bool {
        message.generation == self.generation && self.workers.contains_key(&message.id)
    }

    /// Replies that have arrived so far, without waiting.
    pub fn drain(&mut self) -> Vec<(ObjectId, WorkerReply)> {
        let mut replies = Vec::new();
        while let Ok(message) = self.outbox_rx.try_recv() {
            if self.accept(&message) {
                replies.push((message.id, message.reply));
            }
        }
        replies
    }

    /// Wait for the next reply from a live worker; `None` when no worker
    /// is running.
    pub async fn recv(&mut self) -> Option<(ObjectId, WorkerReply)> {
        loop {
            if self.workers.is_empty() {
                return None;
            }
            let message = self.outbox_rx.recv().await?;
            if self.accept(&message) {
                return Some((message.id, message.reply));
            }
        }
    }
}

impl Default for WorkerHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WorkerHub {
    fn drop(&mut self) {
        for (_, worker) in self.workers.drain() {
            worker.task.abort();
        }
    }
}
