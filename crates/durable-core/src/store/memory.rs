use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tokio::sync::RwLock;

use crate::types::DurabilityLevel;

use super::{status, Cas, Document, DocumentStore, RawError};

/// Replication layout the in-memory store pretends to have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTopology {
    /// Replica copies configured for the bucket
    pub replicas: u8,
    /// Nodes currently able to acknowledge (active + replicas)
    pub available_nodes: u8,
    /// Whether the server understands synchronous durability levels
    pub sync_durability: bool,
}

impl Default for StoreTopology {
    fn default() -> Self {
        Self {
            replicas: 1,
            available_nodes: 2,
            sync_durability: true,
        }
    }
}

impl StoreTopology {
    /// Nodes that must acknowledge a majority write
    pub fn majority(&self) -> u8 {
        (self.replicas.saturating_add(1)) / 2 + 1
    }
}

#[derive(Debug)]
struct WriteFault {
    error: RawError,
    /// Store the value before reporting the error
    applied: bool,
}

#[derive(Debug, Default)]
struct MemStoreInner {
    docs: HashMap<String, Document>,
    last_cas: u64,
    read_faults: HashMap<String, VecDeque<RawError>>,
    write_faults: HashMap<String, VecDeque<WriteFault>>,
}

impl MemStoreInner {
    fn next_cas(&mut self) -> Cas {
        self.last_cas += 1;
        Cas(self.last_cas)
    }
}

/// In-memory `DocumentStore` with CAS versioning and fault injection
///
/// Intended for tests and local runs; nothing is persisted.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<MemStoreInner>,
    topology: StoreTopology,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_topology(topology: StoreTopology) -> Self {
        Self {
            topology,
            ..Self::default()
        }
    }

    pub fn topology(&self) -> StoreTopology {
        self.topology
    }

    /// Unconditionally store a document, bypassing faults and counters.
    pub async fn seed(&self, key: impl Into<String>, value: Value) -> Cas {
        let mut g = self.inner.write().await;
        let cas = g.next_cas();
        g.docs.insert(key.into(), Document { value, cas });
        cas
    }

    /// Current value of a document, bypassing faults and counters.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().await.docs.get(key).map(|d| d.value.clone())
    }

    /// Queue an error for the next read of `key`.
    pub async fn inject_read_fault(&self, key: impl Into<String>, error: RawError) {
        self.inner
            .write()
            .await
            .read_faults
            .entry(key.into())
            .or_default()
            .push_back(error);
    }

    /// Queue an error for the next write of `key`. The write is not applied.
    pub async fn inject_write_fault(&self, key: impl Into<String>, error: RawError) {
        self.push_write_fault(key.into(), error, false).await;
    }

    /// Queue an error for the next write of `key` that stores its value. The
    /// error is reported after the value has been stored, as happens with
    /// ambiguous outcomes.
    pub async fn inject_applied_write_fault(&self, key: impl Into<String>, error: RawError) {
        self.push_write_fault(key.into(), error, true).await;
    }

    async fn push_write_fault(&self, key: String, error: RawError, applied: bool) {
        self.inner
            .write()
            .await
            .write_faults
            .entry(key)
            .or_default()
            .push_back(WriteFault { error, applied });
    }

    /// Number of `read` calls served, including failed ones
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `write` calls served, including failed ones
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_durability(&self, durability: DurabilityLevel) -> Result<(), RawError> {
        if !durability.is_synchronous() {
            return Ok(());
        }
        if !self.topology.sync_durability {
            return Err(RawError::status(
                status::DURABILITY_INVALID_LEVEL,
                format!("durability level {durability} is not supported by the server"),
            ));
        }
        if self.topology.replicas == 0 {
            return Err(RawError::ReplicaNotConfigured {
                requested: durability,
            });
        }
        if self.topology.available_nodes < self.topology.majority() {
            return Err(RawError::status(
                status::DURABILITY_IMPOSSIBLE,
                format!(
                    "{} of {} nodes available, {} required",
                    self.topology.available_nodes,
                    self.topology.replicas.saturating_add(1),
                    self.topology.majority()
                ),
            ));
        }
        Ok(())
    }
}

impl DocumentStore for InMemoryStore {
    async fn read(&self, key: &str) -> Result<Option<Document>, RawError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut g = self.inner.write().await;
        if let Some(err) = g.read_faults.get_mut(key).and_then(VecDeque::pop_front) {
            tracing::debug!(key, error = %err, "injected read fault");
            return Err(err);
        }
        Ok(g.docs.get(key).cloned())
    }

    async fn write(
        &self,
        key: &str,
        value: Value,
        expected: Option<Cas>,
        durability: DurabilityLevel,
    ) -> Result<Cas, RawError> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        let mut g = self.inner.write().await;
        // A fault that is not applied answers in place of the server
        if let Some(queue) = g.write_faults.get_mut(key) {
            if queue.front().is_some_and(|fault| !fault.applied) {
                if let Some(WriteFault { error, .. }) = queue.pop_front() {
                    tracing::debug!(key, error = %error, "injected write fault");
                    return Err(error);
                }
            }
        }

        self.check_durability(durability)?;

        match (expected, g.docs.get(key)) {
            (Some(_), None) => {
                return Err(RawError::status_with_cas(
                    status::KEY_ENOENT,
                    format!("document {key} not found"),
                ));
            }
            (Some(cas), Some(doc)) if doc.cas != cas => {
                return Err(RawError::status_with_cas(
                    status::KEY_EEXISTS,
                    format!("cas mismatch on {key}: expected {cas}, found {}", doc.cas),
                ));
            }
            (None, Some(_)) => {
                return Err(RawError::status(
                    status::KEY_EEXISTS,
                    format!("document {key} already exists"),
                ));
            }
            _ => {}
        }

        let cas = g.next_cas();
        g.docs.insert(key.to_string(), Document { value, cas });
        tracing::trace!(key, %cas, %durability, "document stored");

        // Applied faults stay queued until a write actually lands
        match g.write_faults.get_mut(key).and_then(VecDeque::pop_front) {
            Some(WriteFault { error, .. }) => {
                tracing::debug!(key, error = %error, "injected fault after apply");
                Err(error)
            }
            None => Ok(cas),
        }
    }
}
