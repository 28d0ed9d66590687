#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{oneshot, Notify};
use tokio::time::Instant;
use todotree::decompose::{ChatRequest, Transport};
use todotree::{Core, DecomposeError, Decomposer, DecomposerConfig, Store, TaskId};

/// Transport replaying scripted outcomes, optionally held back until released
pub struct FakeTransport {
    outcomes: Mutex<VecDeque<Result<String, DecomposeError>>>,
    calls: Mutex<Vec<Instant>>,
    gate: Option<Arc<Notify>>,
}

impl FakeTransport {
    pub fn new(outcomes: Vec<Result<String, DecomposeError>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    /// Every call waits for `gate` to be notified before answering
    pub fn gated(outcomes: Vec<Result<String, DecomposeError>>, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
            gate: Some(gate),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(
        &self,
        _url: &str,
        _api_key: &str,
        _request: &ChatRequest,
    ) -> Result<String, DecomposeError> {
        self.calls.lock().unwrap().push(Instant::now());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.outcomes.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(DecomposeError::Transport("script exhausted".to_string())))
    }
}

/// A 2xx chat-completion body whose reply text is `content`
pub fn reply(content: &str) -> Result<String, DecomposeError> {
    Ok(serde_json::json!({
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
    .to_string())
}

pub fn network_error(message: &str) -> Result<String, DecomposeError> {
    Err(DecomposeError::Transport(message.to_string()))
}

pub struct Fixture {
    pub core: Core,
    pub path: PathBuf,
    _dir: tempfile::TempDir,
}

impl Fixture {
    pub fn new(transport: Arc<FakeTransport>, api_key: Option<&str>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let config = DecomposerConfig {
            api_key: api_key.map(str::to_string),
            ..DecomposerConfig::default()
        };
        let core = Core::open(Store::new(&path), Decomposer::new(config, transport));
        Self {
            core,
            path,
            _dir: dir,
        }
    }

    /// Snapshot as currently stored on disk
    pub fn on_disk(&self) -> Vec<todotree::Task> {
        Store::new(&self.path).try_load().unwrap()
    }

    /// Runs `decompose` and waits for its callback
    pub async fn decompose(&self, id: &TaskId) -> Result<usize, String> {
        let (tx, rx) = oneshot::channel();
        self.core.decompose(id, move |outcome| {
            let _ = tx.send(outcome);
        });
        rx.await.unwrap()
    }
}
